use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterParams;
use crate::embedding::EmbedderSpec;
use crate::lda::Prior;

pub const DEFAULT_CONFIG_FILE: &str = "berita.toml";

/// Pipeline settings. Every field has a default, so an absent file or a
/// partial file both work. Secrets (Browserless token, embedding API key)
/// stay in the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Day the articles were scraped; relative dates are resolved against it.
    pub reference_date: NaiveDate,
    pub seed: u64,
    pub paths: PathsConfig,
    pub scrape: ScrapeConfig,
    pub lda: LdaRunConfig,
    pub embed: EmbedRunConfig,
    pub hybrid: HybridRunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub links: PathBuf,
    pub content: PathBuf,
    pub preprocessed: PathBuf,
    pub preprocess_dir: PathBuf,
    pub lda_dir: PathBuf,
    pub embed_dir: PathBuf,
    pub hybrid_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub category: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrapeConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub pages_per_period: usize,
    /// Rendering endpoint, e.g. `http://localhost:3000`. Direct fetches when unset.
    pub browserless_url: Option<String>,
    pub page_pause_secs: [f64; 2],
    pub keyword_pause_secs: [f64; 2],
    pub checkpoint_every: usize,
    pub checkpoint_pause_secs: [f64; 2],
    pub min_content_chars: usize,
    /// PESTLE categories in crawl order.
    pub keywords: Vec<KeywordGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhrasesConfig {
    pub min_count: usize,
    pub threshold: f64,
}

impl Default for PhrasesConfig {
    fn default() -> Self {
        PhrasesConfig { min_count: 5, threshold: 50.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LdaRunConfig {
    pub topic_range: Vec<usize>,
    pub no_below: usize,
    pub no_above: f64,
    pub use_bigrams: bool,
    pub phrases: PhrasesConfig,
    pub passes: usize,
    pub sweeps_per_pass: usize,
    pub report_words: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbedRunConfig {
    pub cluster: ClusterParams,
    pub embedders: Vec<EmbedderSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HybridRunConfig {
    pub num_topics: usize,
    pub no_below: usize,
    pub no_above: f64,
    pub use_bigrams: bool,
    pub phrases: PhrasesConfig,
    pub passes: usize,
    pub sweeps_per_pass: usize,
    pub alpha: Prior,
    pub eta: Prior,
    /// Scale of the one-hot LDA label block appended to each embedding.
    pub guide_weight: f32,
    pub cluster: ClusterParams,
    pub embedder: EmbedderSpec,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            reference_date: date(2025, 11, 30),
            seed: 42,
            paths: PathsConfig::default(),
            scrape: ScrapeConfig::default(),
            lda: LdaRunConfig::default(),
            embed: EmbedRunConfig::default(),
            hybrid: HybridRunConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            links: "pestle_link.csv".into(),
            content: "pestle_konten.csv".into(),
            preprocessed: "preprocessing_berita_revisi.csv".into(),
            preprocess_dir: "preprocessing_berita_visualisasi_revisi".into(),
            lda_dir: "Result_LDA_Analysis_revisi".into(),
            embed_dir: "Result_BERTopic_Analysis_revisi".into(),
            hybrid_dir: "bigram_Result_Hybrid_Analysis".into(),
        }
    }
}

fn group(category: &str, keywords: &[&str]) -> KeywordGroup {
    KeywordGroup {
        category: category.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        ScrapeConfig {
            start: date(2025, 1, 6),
            end: date(2025, 11, 30),
            pages_per_period: 10,
            browserless_url: None,
            page_pause_secs: [2.0, 4.0],
            keyword_pause_secs: [1.5, 3.0],
            checkpoint_every: 10,
            checkpoint_pause_secs: [0.5, 1.5],
            min_content_chars: 50,
            keywords: vec![
                group(
                    "Political",
                    &[
                        "Badan Gizi Nasional",
                        "Makan Bergizi Gratis",
                        "Prabowo Makan Gratis",
                        "SPPG Makan Bergizi Gratis",
                        "Janji Makan Siang Gratis",
                        "Kebijakan Makan Bergizi",
                        "Dukungan Partai Makan Bergizi",
                    ],
                ),
                group(
                    "Economic",
                    &[
                        "Anggaran Makan Bergizi",
                        "Kebocoran Dana Makan Gratis",
                        "Dampak Ekonomi Makan Bergizi Gratis",
                        "Subsidi dan Efisiensi Makan Bergizi Gratis",
                        "UMKM Makan Bergizi",
                        "Inflasi Pangan Makan Gratis",
                    ],
                ),
                group(
                    "Social",
                    &[
                        "Peran Media Sosial Makan Bergizi Gratis",
                        "Gizi Anak Sekolah",
                        "Menu Makan Bergizi Sekolah",
                        "Stunting Makan Bergizi",
                        "Isu Keracunan Makan Siang Gratis",
                        "Keluhan Makan Siang Gratis",
                        "Dapur Makan Bergizi Gratis",
                    ],
                ),
                group(
                    "Technological",
                    &[
                        "Aplikasi Makan Bergizi",
                        "Data Siswa Makan Gratis",
                        "Sistem Distribusi Makanan",
                        "Digitalisasi Badan Gizi",
                        "Dashboard Pantau Makan Gratis",
                        "Teknologi Pangan Makan Bergizi",
                    ],
                ),
                group(
                    "Legal",
                    &[
                        "BPOM Pengawasan Makanan Sekolah",
                        "Aturan Makan Bergizi Gratis",
                        "Sertifikasi Halal Makan Bergizi Gratis",
                        "Audit Program Makan Bergizi Gratis",
                        "Sanksi Pelanggaran Makan Siang Gratis",
                        "Korupsi Dana Makan Gratis",
                        "penyidikan KPK dana makan gratis",
                        "UU Pangan No 18 2012 penerapan",
                        "pengaduan masyarakat ke Ombudsman program makan",
                        "putusan pengadilan program makan bergizi",
                    ],
                ),
                group(
                    "Environmental",
                    &[
                        "Limbah dan Sampah Sisa Makan Siang Gratis",
                        "Penggunaan Bahan Makanan MBG",
                        "Food Waste Makan Bergizi",
                        "Dampak Lingkungan Makan Bergizi Gratis",
                        "Daur Ulang Makan Siang Gratis",
                        "Kotak Makan Ramah Lingkungan MBG",
                    ],
                ),
            ],
        }
    }
}

impl Default for LdaRunConfig {
    fn default() -> Self {
        LdaRunConfig {
            topic_range: vec![5, 10, 15, 20, 25, 30],
            no_below: 5,
            no_above: 0.5,
            use_bigrams: false,
            phrases: PhrasesConfig::default(),
            passes: 20,
            sweeps_per_pass: 10,
            report_words: 15,
        }
    }
}

impl Default for EmbedRunConfig {
    fn default() -> Self {
        EmbedRunConfig {
            cluster: ClusterParams::default(),
            embedders: EmbedderSpec::defaults(),
        }
    }
}

impl Default for HybridRunConfig {
    fn default() -> Self {
        HybridRunConfig {
            num_topics: 25,
            no_below: 10,
            no_above: 0.4,
            use_bigrams: true,
            phrases: PhrasesConfig::default(),
            passes: 20,
            sweeps_per_pass: 10,
            alpha: Prior::Auto,
            eta: Prior::Auto,
            guide_weight: 0.75,
            cluster: ClusterParams {
                min_cluster_size: 10,
                min_samples: 10,
                ..ClusterParams::default()
            },
            embedder: EmbedderSpec::fallback(),
        }
    }
}

impl Settings {
    /// Reads `path` when given, otherwise `berita.toml` in the working
    /// directory if it exists, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    return Ok(Settings::default());
                }
                fallback
            }
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Settings::from_toml(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Settings> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Features;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let s = Settings::default();
        assert_eq!(s.reference_date, date(2025, 11, 30));
        assert_eq!(s.scrape.keywords.len(), 6);
        assert_eq!(s.scrape.keywords[0].category, "Political");
        assert_eq!(s.scrape.keywords[4].keywords.len(), 10);
        assert_eq!(s.lda.topic_range, vec![5, 10, 15, 20, 25, 30]);
        assert_eq!(s.hybrid.num_topics, 25);
        assert!(s.hybrid.use_bigrams);
        assert!(!s.lda.use_bigrams);
        assert_eq!(s.embed.embedders.len(), 3);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let s = Settings::from_toml(
            r#"
            reference_date = "2025-12-01"

            [lda]
            topic_range = [4, 8]
            use_bigrams = true

            [scrape]
            browserless_url = "http://localhost:3000"

            [[embed.embedders]]
            kind = "hashing"
            label = "Hash-Char"
            features = { type = "char_ngrams", min_n = 2, max_n = 4 }
            "#,
        )
        .unwrap();
        assert_eq!(s.reference_date, date(2025, 12, 1));
        assert_eq!(s.lda.topic_range, vec![4, 8]);
        assert!(s.lda.use_bigrams);
        assert_eq!(s.lda.no_below, 5);
        assert_eq!(s.scrape.browserless_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(s.scrape.pages_per_period, 10);
        assert_eq!(s.embed.embedders.len(), 1);
        match &s.embed.embedders[0] {
            EmbedderSpec::Hashing { features, .. } => {
                assert_eq!(*features, Features::CharNgrams { min_n: 2, max_n: 4 })
            }
            other => panic!("unexpected embedder {other:?}"),
        }
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(Settings::from_toml("sed = 1").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
