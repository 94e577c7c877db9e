use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::dates::DateNormalizer;
use crate::models::{read_records, write_records};

/// Candidate date columns, first match wins.
pub const DATE_COLUMNS: [&str; 6] = ["Tanggal", "Tanggal_Tayang", "Date", "Waktu", "date", "tanggal"];

/// CSV files in `dir` whose name mentions "dataset" or "lampiran".
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(".csv") && (name.contains("dataset") || name.contains("lampiran")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedFile {
    pub column: String,
    pub changed: usize,
    pub unparsed: usize,
}

/// Rewrites the date column of one file in place. `None` when the file has
/// no recognised date column.
pub fn fix_file(path: &Path, normalizer: &DateNormalizer) -> Result<Option<FixedFile>> {
    let (headers, mut records) = read_records(path)?;
    let Some((index, column)) = DATE_COLUMNS
        .iter()
        .find_map(|c| headers.iter().position(|h| h == *c).map(|i| (i, c.to_string())))
    else {
        return Ok(None);
    };

    let mut changed = 0;
    let mut unparsed = 0;
    for record in records.iter_mut() {
        let Some(raw) = record.get(index) else { continue };
        let fixed = normalizer.normalize(raw);
        if normalizer.normalize_opt(raw).is_none() && !raw.trim().is_empty() {
            unparsed += 1;
        }
        if fixed == raw {
            continue;
        }
        let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
        fields[index] = fixed;
        *record = csv::StringRecord::from(fields);
        changed += 1;
    }
    write_records(path, &headers, &records)?;
    Ok(Some(FixedFile { column, changed, unparsed }))
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FixSummary {
    pub fixed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Directories are expanded with [`discover_files`]; plain paths are used as given.
pub fn run(targets: &[PathBuf], normalizer: &DateNormalizer) -> Result<FixSummary> {
    let mut files = Vec::new();
    for target in targets {
        if target.is_dir() {
            files.extend(discover_files(target)?);
        } else {
            files.push(target.clone());
        }
    }
    println!("🔍 Ditemukan {} file CSV yang akan diperbaiki tanggalnya:", files.len());
    for f in &files {
        println!("   - {}", f.display());
    }

    info!(reference = %normalizer.reference(), "relative dates resolve against");
    let mut summary = FixSummary::default();
    for file in &files {
        info!(file = %file.display(), "processing");
        match fix_file(file, normalizer) {
            Ok(Some(result)) => {
                info!(column = %result.column, changed = result.changed, unparsed = result.unparsed, "saved");
                summary.fixed += 1;
            }
            Ok(None) => {
                warn!(file = %file.display(), "no date column, skipping");
                summary.skipped += 1;
            }
            Err(e) => {
                error!(file = %file.display(), error = %e, "could not process file");
                summary.failed += 1;
            }
        }
    }
    println!(
        "🎉 Selesai: {} diperbaiki, {} dilewati, {} gagal (format YYYY-MM-DD)",
        summary.fixed, summary.skipped, summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn normalizer() -> DateNormalizer {
        DateNormalizer::new(NaiveDate::from_ymd_opt(2025, 11, 30).unwrap())
    }

    #[test]
    fn test_fix_file_rewrites_first_date_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset_berita.csv");
        fs::write(
            &path,
            "Judul,Tanggal_Tayang,tanggal\nA,2 hari lalu,kemarin\nB,17 November 2025,x\nC,entah kapan,y\n",
        )
        .unwrap();

        let result = fix_file(&path, &normalizer()).unwrap().unwrap();
        assert_eq!(result.column, "Tanggal_Tayang");
        assert_eq!(result.changed, 2);
        assert_eq!(result.unparsed, 1);

        let (_, records) = read_records(&path).unwrap();
        assert_eq!(&records[0][1], "2025-11-28");
        assert_eq!(&records[0][2], "kemarin");
        assert_eq!(&records[1][1], "2025-11-17");
        assert_eq!(&records[2][1], "entah kapan");
    }

    #[test]
    fn test_run_expands_directories_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dataset_a.csv"), "Date\nkemarin\n").unwrap();
        fs::write(dir.path().join("lampiran_b.csv"), "Judul\ntanpa tanggal\n").unwrap();
        fs::write(dir.path().join("lain.csv"), "Date\nkemarin\n").unwrap();

        let found = discover_files(dir.path()).unwrap();
        assert_eq!(found.len(), 2);

        let missing = dir.path().join("dataset_hilang.csv");
        let summary = run(&[dir.path().to_path_buf(), missing], &normalizer()).unwrap();
        assert_eq!(summary, FixSummary { fixed: 1, skipped: 1, failed: 1 });
        assert_eq!(fs::read_to_string(dir.path().join("lain.csv")).unwrap(), "Date\nkemarin\n");
    }
}
