use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use super::input_missing;
use crate::config::{PhrasesConfig, Settings};
use crate::corpus::{Bow, Dictionary, Phrases};
use crate::error::PipelineError;
use crate::lda::{LdaConfig, LdaModel, Prior};
use crate::metrics::TopicScores;
use crate::models::{read_records, write_rows};
use crate::report::{best_by_npmi, write_lda_report, TuningRow};
use crate::text::LdaCleaner;
use crate::viz;

/// Words per topic scored by the coherence measures.
const COHERENCE_WORDS: usize = 20;
const BAR_WORDS: usize = 10;
const CLOUD_WORDS: usize = 30;
/// Vocabulary cap after pruning, most frequent tokens first.
pub(crate) const KEEP_N: usize = 100_000;

/// Token lists, dictionary and bag-of-words corpus fed to LDA.
pub(crate) struct PreparedCorpus {
    pub texts: Vec<Vec<String>>,
    pub dictionary: Dictionary,
    pub bows: Vec<Bow>,
}

/// Optional bigram merge, then dictionary pruning. Documents keep their
/// position even when pruning leaves them empty.
pub(crate) fn prepare_corpus(
    docs: Vec<Vec<String>>,
    bigrams: Option<PhrasesConfig>,
    no_below: usize,
    no_above: f64,
) -> PreparedCorpus {
    let texts = match bigrams {
        Some(p) => {
            info!(min_count = p.min_count, threshold = p.threshold, "bigram mode on");
            Phrases::learn(&docs, p.min_count, p.threshold).apply_all(&docs)
        }
        None => {
            info!("bigram mode off");
            docs
        }
    };
    let mut dictionary = Dictionary::from_documents(&texts);
    let before = dictionary.len();
    dictionary.filter_extremes(no_below, no_above, Some(KEEP_N));
    info!(before, after = dictionary.len(), no_below, no_above, "dictionary filtered");
    let bows = texts.iter().map(|t| dictionary.doc2bow(t)).collect();
    PreparedCorpus { texts, dictionary, bows }
}

/// Token lists from the preprocessed CSV, preferring `processed_text`,
/// then `clean_tokens`, then the first column.
fn load_documents(path: &Path) -> Result<Vec<Vec<String>>> {
    let (headers, records) = read_records(path)?;
    let column = ["processed_text", "clean_tokens"]
        .iter()
        .find_map(|c| headers.iter().position(|h| h == *c))
        .unwrap_or(0);
    debug!(column = headers.get(column).unwrap_or(""), "text column");
    let cleaner = LdaCleaner::new();
    Ok(cleaner.prepare_documents(records.iter().filter_map(|r| r.get(column))))
}

/// Sweeps the topic count, keeps the model with the best NPMI, and writes
/// the tuning table, charts, topic map and PESTLE worksheet.
pub fn run(settings: &Settings) -> Result<Option<TuningRow>> {
    let input = &settings.paths.preprocessed;
    let out_dir = &settings.paths.lda_dir;
    let cfg = &settings.lda;
    if input_missing(input) {
        return Ok(None);
    }

    let docs = load_documents(input)?;
    info!(documents = docs.len(), "documents after heavy cleaning");
    if docs.is_empty() {
        return Err(PipelineError::EmptyCorpus { stage: "lda" }.into());
    }
    let corpus = prepare_corpus(docs, cfg.use_bigrams.then_some(cfg.phrases), cfg.no_below, cfg.no_above);

    let mut tuning: Vec<TuningRow> = Vec::new();
    let mut best: Option<LdaModel> = None;
    for &k in &cfg.topic_range {
        info!(k, "training");
        let config = LdaConfig {
            num_topics: k,
            passes: cfg.passes,
            sweeps_per_pass: cfg.sweeps_per_pass,
            alpha: Prior::Symmetric,
            eta: Prior::Symmetric,
            seed: settings.seed,
        };
        let model = LdaModel::train(&corpus.bows, &corpus.dictionary, &config)?;
        let scores = TopicScores::evaluate(&model.show_topics(COHERENCE_WORDS), &corpus.texts);
        info!(k, npmi = scores.npmi, cv = scores.cv, diversity = scores.diversity, "scored");

        let row = TuningRow { num_topics: k, npmi: scores.npmi, cv: scores.cv, diversity: scores.diversity };
        let improves = tuning.iter().all(|r| row.npmi > r.npmi);
        tuning.push(row);
        if improves {
            best = Some(model);
        }
    }
    let (Some(best_idx), Some(model)) = (best_by_npmi(&tuning, |r| r.npmi), best) else {
        return Err(PipelineError::Config("lda.topic_range is empty".into()).into());
    };
    let best_row = tuning[best_idx];

    write_rows(&out_dir.join("tabel_tuning_lda.csv"), &tuning)?;
    viz::write_json(out_dir.join("grafik_evaluasi_tuning.json"), &viz::tuning_curves(&tuning))?;

    let plots = out_dir.join("plots_visualization");
    let topics = model.show_topics(CLOUD_WORDS);
    viz::write_json(plots.join("keyword_bars.json"), &viz::keyword_bars(&topics, BAR_WORDS))?;
    viz::write_json(plots.join("wordclouds.json"), &viz::word_clouds(&topics, CLOUD_WORDS, topics.len()))?;
    viz::write_topic_map(
        &plots.join("lda_interactive_map.html"),
        &format!("Peta Topik LDA (K={})", best_row.num_topics),
        &topics,
        &model.topic_word_matrix(),
        &model.topic_prevalence(),
    )?;

    write_lda_report(
        &out_dir.join("ANALISIS_PESTLE_MANUAL_LDA.txt"),
        settings.seed,
        cfg.use_bigrams,
        &tuning,
        &best_row,
        &model.show_topics(cfg.report_words),
    )?;

    println!("🏆 Model LDA terbaik: K={}", best_row.num_topics);
    println!(
        "   NPMI: {:.4} | Cv: {:.4} | Diversity: {:.4}",
        best_row.npmi, best_row.cv, best_row.diversity
    );
    println!("   Laporan: {}", out_dir.join("ANALISIS_PESTLE_MANUAL_LDA.txt").display());
    Ok(Some(best_row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleLink, ArticleRecord};

    const THEMES: [&str; 3] = [
        "anggaran subsidi harga pasar inflasi beras",
        "sekolah siswa menu gizi anak dapur",
        "hukum korupsi audit sanksi penyidikan pengadilan",
    ];

    fn corpus_records() -> Vec<ArticleRecord> {
        (0..30)
            .map(|i| {
                let mut r = ArticleRecord::from_link(ArticleLink {
                    category: String::new(),
                    keyword: String::new(),
                    period: String::new(),
                    source: String::new(),
                    published: String::new(),
                    title: String::new(),
                    link: format!("https://x.id/{i}"),
                });
                let theme = THEMES[i % 3];
                r.processed_text = Some(format!("{theme} {theme} yang dan"));
                r
            })
            .collect()
    }

    #[test]
    fn test_prepare_corpus_keeps_document_positions() {
        let docs = vec![
            vec!["gizi".to_string(), "anak".to_string()],
            vec!["langka".to_string()],
            vec!["gizi".to_string(), "anak".to_string()],
        ];
        let prepared = prepare_corpus(docs, None, 2, 1.0);
        assert_eq!(prepared.bows.len(), 3);
        assert!(prepared.bows[1].is_empty());
        assert_eq!(prepared.dictionary.len(), 2);
    }

    #[test]
    fn test_prepare_corpus_caps_vocabulary() {
        let mut big: Vec<String> = (0..KEEP_N + 5).map(|i| format!("w{i}")).collect();
        big.push("gizi".into());
        let docs = vec![big, vec!["gizi".to_string()]];
        let prepared = prepare_corpus(docs, None, 1, 1.0);
        assert_eq!(prepared.dictionary.len(), KEEP_N);
        assert!(prepared.dictionary.id("gizi").is_some());
    }

    #[test]
    fn test_run_writes_tuning_table_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.paths.preprocessed = dir.path().join("pre.csv");
        settings.paths.lda_dir = dir.path().join("lda");
        settings.lda.topic_range = vec![2, 3];
        settings.lda.no_below = 1;
        settings.lda.passes = 3;
        settings.lda.sweeps_per_pass = 5;
        write_rows(&settings.paths.preprocessed, &corpus_records()).unwrap();

        let best = run(&settings).unwrap().unwrap();
        assert!([2, 3].contains(&best.num_topics));

        let table: Vec<TuningRow> = crate::models::read_rows(&settings.paths.lda_dir.join("tabel_tuning_lda.csv")).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|r| r.diversity > 0.0 && r.diversity <= 1.0));

        let report = std::fs::read_to_string(settings.paths.lda_dir.join("ANALISIS_PESTLE_MANUAL_LDA.txt")).unwrap();
        assert_eq!(report.matches("[TOPIK #").count(), best.num_topics);
        assert!(settings.paths.lda_dir.join("plots_visualization/lda_interactive_map.html").exists());
    }
}
