use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "Sukses";
pub const STATUS_FAILED: &str = "Gagal";

/// Cluster id used for documents that no topic claims.
pub const OUTLIER_TOPIC: i64 = -1;

const UTF8_BOM: &str = "\u{feff}";

/// One search hit collected by the link scraper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleLink {
    #[serde(rename = "Kategori", default)]
    pub category: String,
    #[serde(rename = "Keyword", default)]
    pub keyword: String,
    #[serde(rename = "Periode_Scrape", default)]
    pub period: String,
    #[serde(rename = "Sumber", default)]
    pub source: String,
    #[serde(rename = "Tanggal_Tayang", default)]
    pub published: String,
    #[serde(rename = "Judul", default)]
    pub title: String,
    #[serde(rename = "Link")]
    pub link: String,
}

/// A link row plus the downloaded body and its scrape status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(rename = "Kategori", default)]
    pub category: String,
    #[serde(rename = "Keyword", default)]
    pub keyword: String,
    #[serde(rename = "Periode_Scrape", default)]
    pub period: String,
    #[serde(rename = "Sumber", default)]
    pub source: String,
    #[serde(rename = "Tanggal_Tayang", default)]
    pub published: String,
    #[serde(rename = "Judul", default)]
    pub title: String,
    #[serde(rename = "Link", default)]
    pub link: String,
    #[serde(rename = "Isi_Berita", alias = "content", default)]
    pub content: String,
    #[serde(rename = "Status_Scrape", default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_text: Option<String>,
}

impl ArticleRecord {
    pub fn from_link(link: ArticleLink) -> Self {
        ArticleRecord {
            category: link.category,
            keyword: link.keyword,
            period: link.period,
            source: link.source,
            published: link.published,
            title: link.title,
            link: link.link,
            content: String::new(),
            status: String::new(),
            processed_text: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn succeeded(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// A topic produced by either model family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeledTopic {
    pub id: i64,
    pub name: String,
    pub words: Vec<(String, f64)>, // ranked by weight, descending
    pub count: usize,              // documents whose dominant topic this is
}

impl ModeledTopic {
    pub fn is_outlier(&self) -> bool {
        self.id == OUTLIER_TOPIC
    }

    pub fn top_words(&self, n: usize) -> Vec<String> {
        self.words.iter().take(n).map(|(w, _)| w.clone()).collect()
    }

    pub fn keywords(&self, n: usize) -> String {
        self.top_words(n).join(", ")
    }
}

/// Builds the `"{id}_w1_w2_w3_w4"` label used in charts and topic tables.
pub fn topic_label(id: i64, words: &[(String, f64)]) -> String {
    let mut parts = vec![id.to_string()];
    parts.extend(words.iter().take(4).map(|(w, _)| w.clone()));
    parts.join("_")
}

/// Reads the header row only; an empty or missing file yields no headers.
pub fn read_headers(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv_reader(path)?;
    Ok(reader.headers()?.iter().map(|h| h.to_string()).collect())
}

pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv_reader(path)?;
    let mut rows = Vec::new();
    for (i, row) in reader.deserialize().enumerate() {
        let row: T = row.with_context(|| format!("row {} of {}", i + 1, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut file = BufWriter::new(
        File::create(path).with_context(|| format!("create {}", path.display()))?,
    );
    file.write_all(UTF8_BOM.as_bytes())?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Untyped access for files whose column set is not known in advance.
pub fn read_records(path: &Path) -> Result<(csv::StringRecord, Vec<csv::StringRecord>)> {
    let mut reader = csv_reader(path)?;
    let headers = reader.headers()?.clone();
    let records = reader.records().collect::<Result<Vec<_>, _>>()?;
    Ok((headers, records))
}

pub fn write_records(
    path: &Path,
    headers: &csv::StringRecord,
    records: &[csv::StringRecord],
) -> Result<()> {
    let mut file = BufWriter::new(
        File::create(path).with_context(|| format!("create {}", path.display()))?,
    );
    file.write_all(UTF8_BOM.as_bytes())?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(headers)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_reader(path: &Path) -> Result<csv::Reader<std::io::Cursor<Vec<u8>>>> {
    let mut raw = String::new();
    File::open(path)
        .with_context(|| format!("open {}", path.display()))?
        .read_to_string(&mut raw)
        .with_context(|| format!("read {}", path.display()))?;
    let body = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw).to_string();
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(std::io::Cursor::new(body.into_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip_keeps_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("konten.csv");
        let mut record = ArticleRecord::from_link(ArticleLink {
            category: "Economic".into(),
            keyword: "Anggaran Makan Bergizi".into(),
            period: "June 2025".into(),
            source: "Kompas".into(),
            published: "2 hari lalu".into(),
            title: "Judul, dengan koma".into(),
            link: "https://example.com/a".into(),
        });
        record.content = "isi berita".into();
        record.status = STATUS_SUCCESS.into();
        write_rows(&path, &[record.clone()]).unwrap();

        let headers = read_headers(&path).unwrap();
        assert_eq!(headers[0], "Kategori");
        assert!(headers.contains(&"Status_Scrape".to_string()));
        assert!(!headers.contains(&"processed_text".to_string()));

        let rows: Vec<ArticleRecord> = read_rows(&path).unwrap();
        assert_eq!(rows, vec![record]);
    }

    #[test]
    fn test_link_file_reads_as_pending_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link.csv");
        std::fs::write(
            &path,
            "\u{feff}Kategori,Keyword,Periode_Scrape,Sumber,Tanggal_Tayang,Judul,Link\nLegal,KPK,June 2025,Tempo,kemarin,Judul,https://x.id/1\n",
        )
        .unwrap();
        let rows: Vec<ArticleRecord> = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "Legal");
        assert!(rows[0].is_pending());
        assert!(rows[0].processed_text.is_none());
    }

    #[test]
    fn test_missing_file_error_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hilang.csv");
        let err = read_rows::<ArticleLink>(&path).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("open"));
        assert!(message.contains("hilang.csv"));
    }

    #[test]
    fn test_topic_label() {
        let words = vec![
            ("gizi".to_string(), 0.3),
            ("anak".to_string(), 0.2),
            ("sekolah".to_string(), 0.1),
            ("menu".to_string(), 0.05),
            ("dapur".to_string(), 0.01),
        ];
        assert_eq!(topic_label(3, &words), "3_gizi_anak_sekolah_menu");
    }
}
