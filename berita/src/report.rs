//! Plain-text reports. Section headings stay in Indonesian because the
//! reports are read by the analysts doing the manual PESTLE tagging.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterParams;
use crate::metrics::TopicScores;
use crate::models::ModeledTopic;
use crate::text::CorpusStats;

const RULE_60: &str = "============================================================";
const RULE_70: &str = "======================================================================";

const PESTLE_CHECKLIST: &str = "[ ] Political\n[ ] Economic\n[ ] Social\n[ ] Technological\n[ ] Legal\n[ ] Environmental\n";

const PESTLE_CHECKLIST_HINTED: &str = "[ ] Political (Kebijakan, Partai, Tokoh)\n\
[ ] Economic (Anggaran, Harga, Pasar)\n\
[ ] Social (Masyarakat, Gizi, Kesehatan)\n\
[ ] Technological (Sistem, Data, Aplikasi)\n\
[ ] Legal (Hukum, Aturan, Sanksi)\n\
[ ] Environmental (Limbah, Lingkungan)\n";

/// One row of `tabel_tuning_lda.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningRow {
    #[serde(rename = "Num_Topics")]
    pub num_topics: usize,
    #[serde(rename = "NPMI")]
    pub npmi: f64,
    #[serde(rename = "Cv")]
    pub cv: f64,
    #[serde(rename = "Diversity")]
    pub diversity: f64,
}

/// One row of `tabel_komparasi_semua.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Jml_Topik")]
    pub num_topics: usize,
    #[serde(rename = "Coherence_Cv")]
    pub cv: f64,
    #[serde(rename = "Coherence_NPMI")]
    pub npmi: f64,
    #[serde(rename = "Diversity")]
    pub diversity: f64,
}

/// Document counts at each preprocessing stage.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DataFlow {
    pub raw: usize,
    pub scraped: usize,
    pub deduped: usize,
    pub clean: usize,
}

/// Index of the highest NPMI; the first one wins a tie.
pub fn best_by_npmi<T>(rows: &[T], npmi: impl Fn(&T) -> f64) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, row) in rows.iter().enumerate() {
        match best {
            Some(b) if npmi(row) <= npmi(&rows[b]) => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Right-aligned plain table, the way a dataframe prints.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }
    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:>w$}"))
            .collect::<Vec<_>>()
            .join(" ")
    };
    let mut out = line(headers.to_vec());
    for row in rows {
        out.push('\n');
        out.push_str(&line(row.iter().map(String::as_str).collect()));
    }
    out
}

fn write_report(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, body).with_context(|| format!("write {}", path.display()))
}

fn flatten(text: &str, max_chars: usize) -> String {
    text.replace('\n', " ").chars().take(max_chars).collect()
}

pub fn write_preprocessing_report(
    path: &Path,
    flow: &DataFlow,
    before: &CorpusStats,
    after: &CorpusStats,
    samples: &[(String, String)],
) -> Result<()> {
    let mut r = String::new();
    writeln!(r, "{RULE_70}")?;
    writeln!(r, "       LAPORAN & METODOLOGI PREPROCESSING DATA BERITA")?;
    writeln!(r, "{RULE_70}\n")?;

    writeln!(r, "[1] ALUR PROSES (PIPELINE)")?;
    writeln!(r, "    Proses preprocessing dilakukan dengan tahapan berikut:")?;
    writeln!(r, "    1. Filtering Status  : Menghapus data yang gagal di-scrape ('Status_Scrape' != 'Sukses').")?;
    writeln!(r, "    2. Deduplikasi       : Menghapus data ganda berdasarkan isi konten yang persis sama.")?;
    writeln!(r, "    3. Lowercasing       : Mengubah semua huruf menjadi kecil.")?;
    writeln!(r, "    4. Regex Cleaning    : Menghapus URL, Email, HTML Tags, dan Angka.")?;
    writeln!(r, "    5. Punctuation Removal: Menghapus tanda baca secara total (diganti spasi).")?;
    writeln!(r, "                           Tujuan: Mencegah error pada perhitungan metrik NPMI.")?;
    writeln!(r, "    6. Noise Filtering   : Menghapus kata navigasi web spesifik (contoh: 'baca juga', 'halaman').")?;
    writeln!(r, "    7. Elongation Fix    : Normalisasi huruf berulang (contoh: 'mantappp' -> 'mantap').\n")?;
    writeln!(r, "    Alur jumlah dokumen: raw={} -> sukses={} -> unik={} -> bersih={}\n", flow.raw, flow.scraped, flow.deduped, flow.clean)?;

    writeln!(r, "[2] JUSTIFIKASI METODOLOGI (MENGAPA LIGHT CLEANING?)")?;
    writeln!(r, "    - Mengapa Stopwords (yang, dan, di, tidak) DIPERTAHANKAN?")?;
    writeln!(r, "      Model embedding membutuhkan struktur kalimat yang utuh (termasuk kata sambung)")?;
    writeln!(r, "      untuk memahami konteks semantik (seperti negasi atau hubungan waktu).")?;
    writeln!(r, "      Penghapusan stopwords dilakukan terpisah di tahap Vectorizer (c-TF-IDF).\n")?;

    writeln!(r, "[3] PERBANDINGAN STATISTIK DATA")?;
    writeln!(r, "    {:<25} | {:<15} | {:<15}", "METRIK", "SEBELUM (RAW)", "SESUDAH (CLEAN)")?;
    writeln!(r, "{}", "-".repeat(65))?;
    writeln!(r, "    {:<25} | {:<15} | {:<15}", "Total Dokumen", before.documents, after.documents)?;
    writeln!(r, "    {:<25} | {:<15} | {:<15}", "Total Kata (Est)", before.total_words, after.total_words)?;
    writeln!(r, "    {:<25} | {:<15.2} | {:<15.2}", "Rata-rata Kata/Dok", before.mean_words, after.mean_words)?;
    writeln!(r, "    {:<25} | {:<15} | {:<15}\n", "Ukuran Vocabulary", before.vocabulary, after.vocabulary)?;

    writeln!(r, "[4] SAMPEL DATA (BEFORE vs AFTER)")?;
    writeln!(r, "    Berikut adalah contoh perubahan teks pada {} dokumen acak:", samples.len())?;
    writeln!(r, "{}", "-".repeat(70))?;
    for (i, (raw, clean)) in samples.iter().enumerate() {
        writeln!(r, "    Contoh #{}:", i + 1)?;
        writeln!(r, "    [RAW]   : {}...", flatten(raw, 200))?;
        writeln!(r, "    [CLEAN] : {}...", flatten(clean, 200))?;
        writeln!(r, "{}", "-".repeat(70))?;
    }
    writeln!(r)?;

    writeln!(r, "[5] INSIGHT & VALIDASI")?;
    writeln!(r, "    - Deduplikasi dilakukan untuk menghindari bias topik pada berita viral.")?;
    writeln!(r, "    - Teks bersih siap digunakan untuk tahap embedding dan clustering.")?;

    write_report(path, &r)
}

pub fn write_lda_report(
    path: &Path,
    seed: u64,
    use_bigrams: bool,
    tuning: &[TuningRow],
    best: &TuningRow,
    topics: &[ModeledTopic],
) -> Result<()> {
    let mut r = String::new();
    writeln!(r, "{RULE_60}")?;
    writeln!(r, "      LAPORAN EKSPERIMEN TOPIC MODELING (LDA)")?;
    writeln!(r, "{RULE_60}\n")?;

    writeln!(r, "[1] SPESIFIKASI MODEL & METODOLOGI")?;
    writeln!(r, "    - Metode              : Latent Dirichlet Allocation (LDA)")?;
    writeln!(r, "    - Inferensi           : Collapsed Gibbs Sampling")?;
    writeln!(r, "    - Input Preprocessing : Stopword Removal (Heavy Cleaning) + Filter Extremes")?;
    writeln!(r, "    - Bigram Mode         : {}", if use_bigrams { "AKTIF" } else { "NON-AKTIF" })?;
    writeln!(r, "    - Random Seed         : {seed}\n")?;

    writeln!(r, "[2] HASIL TUNING (KOMPARASI JUMLAH TOPIK)")?;
    let rows: Vec<Vec<String>> = tuning
        .iter()
        .map(|t| {
            vec![
                t.num_topics.to_string(),
                format!("{:.6}", t.npmi),
                format!("{:.6}", t.cv),
                format!("{:.6}", t.diversity),
            ]
        })
        .collect();
    writeln!(r, "{}\n", format_table(&["Num_Topics", "NPMI", "Cv", "Diversity"], &rows))?;

    writeln!(r, "[3] PERFORMA MODEL TERBAIK (SELECTED MODEL)")?;
    writeln!(r, "    - Jumlah Topik (K)  : {}", best.num_topics)?;
    writeln!(r, "    - Coherence NPMI    : {:.4}", best.npmi)?;
    writeln!(r, "    - Coherence Cv      : {:.4}", best.cv)?;
    writeln!(r, "    - Topic Diversity   : {:.4}", best.diversity)?;
    writeln!(r, "{RULE_60}\n")?;

    for topic in topics {
        writeln!(r, "[TOPIK #{}]", topic.id)?;
        writeln!(r, "Keywords: {}", topic.keywords(topic.words.len()))?;
        writeln!(r, "Analisis PESTLE (Silakan Centang):")?;
        write!(r, "{PESTLE_CHECKLIST_HINTED}")?;
        writeln!(r, "{}", "-".repeat(40))?;
    }

    write_report(path, &r)
}

fn write_topic_entries(r: &mut String, heading: &str, topics: &[ModeledTopic], limit: usize) -> Result<()> {
    for topic in topics.iter().filter(|t| !t.is_outlier()).take(limit) {
        writeln!(r, "[{heading} #{}] - Jumlah Berita: {}", topic.id, topic.count)?;
        writeln!(r, "Keywords: {}", topic.keywords(10))?;
        writeln!(r, "Analisis PESTLE:")?;
        write!(r, "{PESTLE_CHECKLIST}")?;
        writeln!(r, "{}", "-".repeat(40))?;
    }
    Ok(())
}

pub fn write_model_report(
    path: &Path,
    model_label: &str,
    params: &ClusterParams,
    stopword_count: usize,
    scores: &TopicScores,
    topics: &[ModeledTopic],
) -> Result<()> {
    let n_topics = topics.iter().filter(|t| !t.is_outlier()).count();
    let mut r = String::new();
    writeln!(r, "{RULE_60}")?;
    writeln!(r, "      LAPORAN DETAIL MODEL: {model_label}")?;
    writeln!(r, "{RULE_60}\n")?;

    writeln!(r, "[1] SPESIFIKASI ARSITEKTUR")?;
    writeln!(r, "    - Embedding Model   : {model_label}")?;
    writeln!(
        r,
        "    - Clustering Config : MinCluster={}, MinSamples={}, Eps={}",
        params.min_cluster_size,
        params.min_samples,
        params.eps.map_or("auto".to_string(), |e| format!("{e:.3}"))
    )?;
    writeln!(r, "    - Vectorizer        : Ngram=(1, 1)")?;
    writeln!(r, "    - Stopwords Applied : YA ({stopword_count} kata)\n")?;

    writeln!(r, "[2] HASIL EVALUASI")?;
    writeln!(r, "    - Jumlah Topik      : {n_topics}")?;
    writeln!(r, "    - Coherence NPMI    : {:.4}", scores.npmi)?;
    writeln!(r, "    - Coherence Cv      : {:.4}", scores.cv)?;
    writeln!(r, "    - Topic Diversity   : {:.4}\n", scores.diversity)?;

    writeln!(r, "[3] DAFTAR TOPIK (Untuk Analisis Manual PESTLE)")?;
    writeln!(r, "{}", "-".repeat(60))?;
    write_topic_entries(&mut r, "TOPIK", topics, 20)?;

    write_report(path, &r)
}

pub fn write_comparison_report(path: &Path, rows: &[ComparisonRow], params: &ClusterParams) -> Result<()> {
    let Some(best) = best_by_npmi(rows, |r| r.npmi).map(|i| &rows[i]) else {
        return Ok(());
    };
    let mut r = String::new();
    writeln!(r, "{RULE_60}")?;
    writeln!(r, "      LAPORAN PERBANDINGAN MODEL EMBEDDING (SUMMARY)")?;
    writeln!(r, "{RULE_60}\n")?;

    writeln!(r, "[1] SKEMA EKSPERIMEN")?;
    writeln!(r, "    - Tujuan            : Membandingkan kualitas topik dari {} model embedding berbeda.", rows.len())?;
    writeln!(
        r,
        "    - Model Diuji       : {}",
        rows.iter().map(|r| r.model.as_str()).collect::<Vec<_>>().join(", ")
    )?;
    writeln!(r, "    - Metrik Utama      : NPMI (Normalized Pointwise Mutual Information)")?;
    writeln!(
        r,
        "    - Parameter Fixed   : Clustering(min={}, samples={}), Vectorizer(ngram=1, stopwords=YES)\n",
        params.min_cluster_size, params.min_samples
    )?;

    writeln!(r, "[2] TABEL HASIL KOMPARASI")?;
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.model.clone(),
                row.num_topics.to_string(),
                format!("{:.4}", row.cv),
                format!("{:.4}", row.npmi),
                format!("{:.4}", row.diversity),
            ]
        })
        .collect();
    writeln!(
        r,
        "{}\n",
        format_table(&["Model", "Jml_Topik", "Coherence_Cv", "Coherence_NPMI", "Diversity"], &table)
    )?;

    writeln!(r, "[3] KESIMPULAN & PEMENANG")?;
    writeln!(r, "    - Model Terbaik     : {}", best.model)?;
    writeln!(r, "    - Skor NPMI         : {:.4}", best.npmi)?;
    writeln!(r, "    - Skor Cv           : {:.4}", best.cv)?;
    writeln!(r, "    - Diversity         : {:.4}\n", best.diversity)?;

    writeln!(r, "[4] ANALISIS SINGKAT")?;
    writeln!(r, "    Model '{}' terpilih karena memiliki skor NPMI tertinggi,", best.model)?;
    writeln!(r, "    yang mengindikasikan bahwa topik-topik yang dihasilkannya memiliki koherensi")?;
    writeln!(r, "    semantik yang paling kuat dan mudah diinterpretasikan manusia dibandingkan model lainnya.")?;

    write_report(path, &r)
}

/// Configuration echoed at the top of the hybrid report.
#[derive(Debug, Clone)]
pub struct HybridSummary {
    pub lda_topics: usize,
    pub embedder: String,
    pub use_bigrams: bool,
    pub documents: usize,
    pub guide_weight: f32,
}

pub fn write_hybrid_report(
    path: &Path,
    summary: &HybridSummary,
    scores: &TopicScores,
    topics: &[ModeledTopic],
) -> Result<()> {
    let mut r = String::new();
    writeln!(r, "{RULE_60}")?;
    writeln!(r, "      LAPORAN HYBRID TOPIC MODELING (LDA-Guided Clustering)")?;
    writeln!(r, "{RULE_60}\n")?;

    writeln!(r, "[1] ARSITEKTUR & METODOLOGI")?;
    writeln!(r, "    - Clustering Guide  : LDA - {} Topik", summary.lda_topics)?;
    writeln!(r, "    - Representation    : c-TF-IDF")?;
    writeln!(r, "    - Embedding Model   : {}", summary.embedder)?;
    writeln!(r, "    - Guide Weight      : {:.2}", summary.guide_weight)?;
    writeln!(r, "    - Bigram Mode       : {}", if summary.use_bigrams { "AKTIF" } else { "NON-AKTIF" })?;
    writeln!(r, "    - Alignment Strategy: Pre-filtered Sync (Docs & Tokens matched, n={})\n", summary.documents)?;

    writeln!(r, "[2] HASIL EVALUASI")?;
    writeln!(r, "    - Coherence NPMI    : {:.4}", scores.npmi)?;
    writeln!(r, "    - Coherence Cv      : {:.4}", scores.cv)?;
    writeln!(r, "    - Diversity         : {:.4}\n", scores.diversity)?;

    writeln!(r, "[3] DAFTAR TOPIK HYBRID (Analisis PESTLE)")?;
    writeln!(r, "{}", "-".repeat(60))?;
    write_topic_entries(&mut r, "HYBRID TOPIK", topics, usize::MAX)?;

    write_report(path, &r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: i64, count: usize) -> ModeledTopic {
        ModeledTopic {
            id,
            name: format!("{id}_gizi"),
            words: vec![("gizi".into(), 0.5), ("anak".into(), 0.3)],
            count,
        }
    }

    #[test]
    fn test_best_by_npmi_first_max_wins() {
        let rows = vec![
            TuningRow { num_topics: 5, npmi: 0.01, cv: 0.4, diversity: 0.9 },
            TuningRow { num_topics: 10, npmi: 0.05, cv: 0.3, diversity: 0.8 },
            TuningRow { num_topics: 15, npmi: 0.05, cv: 0.5, diversity: 0.7 },
        ];
        assert_eq!(best_by_npmi(&rows, |r| r.npmi), Some(1));
        assert_eq!(best_by_npmi::<TuningRow>(&[], |r| r.npmi), None);
    }

    #[test]
    fn test_format_table_aligns_columns() {
        let table = format_table(&["Model", "K"], &[vec!["a".into(), "10".into()], vec!["long".into(), "5".into()]]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Model  K");
        assert_eq!(lines[1], "    a 10");
        assert_eq!(lines[2], " long  5");
    }

    #[test]
    fn test_hybrid_report_skips_outliers_and_has_checklist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("LAPORAN_HYBRID.txt");
        let summary = HybridSummary {
            lda_topics: 25,
            embedder: "Hash-Unigram".into(),
            use_bigrams: true,
            documents: 42,
            guide_weight: 0.75,
        };
        let scores = TopicScores { npmi: 0.1234, cv: 0.5, diversity: 0.9 };
        write_hybrid_report(&path, &summary, &scores, &[topic(-1, 7), topic(0, 30)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Coherence NPMI    : 0.1234"));
        assert!(text.contains("[HYBRID TOPIK #0] - Jumlah Berita: 30"));
        assert!(!text.contains("#-1"));
        assert!(text.contains("[ ] Environmental"));
        assert!(text.contains("Bigram Mode       : AKTIF"));
    }

    #[test]
    fn test_lda_report_lists_every_topic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ANALISIS_PESTLE_MANUAL_LDA.txt");
        let best = TuningRow { num_topics: 2, npmi: 0.2, cv: 0.6, diversity: 1.0 };
        write_lda_report(&path, 42, false, &[best], &best, &[topic(0, 1), topic(1, 1)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[TOPIK #0]"));
        assert!(text.contains("[TOPIK #1]"));
        assert!(text.contains("Keywords: gizi, anak"));
        assert_eq!(text.matches("[ ] Legal (Hukum, Aturan, Sanksi)").count(), 2);
    }
}
