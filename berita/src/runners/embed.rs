use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use super::{input_missing, read_text_column};
use crate::cluster::ClusterTopicModel;
use crate::config::Settings;
use crate::embedding::{embed_with_fallback, Embedder, EmbedderSpec};
use crate::metrics::TopicScores;
use crate::models::{write_rows, ModeledTopic};
use crate::report::{best_by_npmi, write_comparison_report, write_model_report, ComparisonRow};
use crate::stopwords::VECTORIZER_STOPWORDS;
use crate::text::word_tokens;
use crate::viz;

const BAR_TOPICS: usize = 15;
const CLOUD_TOPICS: usize = 6;
const CLOUD_WORDS: usize = 10;

pub(crate) fn api_key() -> Option<String> {
    std::env::var("EMBEDDING_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Builds the configured embedder, or the fallback when that fails.
pub(crate) fn build_embedder(spec: &EmbedderSpec) -> Result<Box<dyn Embedder>> {
    match spec.build(api_key()) {
        Ok(embedder) => Ok(embedder),
        Err(e) => {
            warn!(embedder = spec.label(), error = %e, "could not build embedder, using fallback");
            Ok(EmbedderSpec::fallback().build(None)?)
        }
    }
}

/// Bar chart, word clouds and topic map for a clustering model.
pub(crate) fn write_cluster_charts(
    dir: &Path,
    bar_file: &str,
    map_file: &str,
    title: &str,
    topics: &[ModeledTopic],
) -> Result<()> {
    viz::write_json(dir.join(bar_file), &viz::topic_bars(topics, BAR_TOPICS))?;
    viz::write_json(dir.join("2_wordclouds.json"), &viz::word_clouds(topics, CLOUD_WORDS, CLOUD_TOPICS))?;

    let real: Vec<ModeledTopic> = topics.iter().filter(|t| !t.is_outlier()).cloned().collect();
    if real.is_empty() {
        warn!(title, "no topics to map");
        return Ok(());
    }
    viz::write_topic_map(
        &dir.join(map_file),
        title,
        &real,
        &viz::topic_distributions(&real),
        &viz::count_prevalence(&real),
    )
}

/// Runs the clustering topic model once per configured embedder and
/// compares them.
pub fn run(settings: &Settings) -> Result<Option<ComparisonRow>> {
    let input = &settings.paths.preprocessed;
    let out_dir = &settings.paths.embed_dir;
    let params = &settings.embed.cluster;
    if input_missing(input) {
        return Ok(None);
    }

    let docs = read_text_column(input, "processed_text")?;
    let docs_tokens: Vec<Vec<String>> = docs.iter().map(|d| word_tokens(d)).collect();
    info!(documents = docs.len(), "loaded corpus");

    let mut rows: Vec<ComparisonRow> = Vec::new();
    for spec in &settings.embed.embedders {
        info!(embedder = spec.label(), "experiment");
        let embedder = build_embedder(spec)?;
        let (used, embeddings) = embed_with_fallback(embedder.as_ref(), &docs)?;
        if used != spec.label() {
            warn!(configured = spec.label(), used = %used, "results come from the fallback embedder");
        }

        let model = ClusterTopicModel::fit(&docs, &embeddings, params)?;
        let scores = TopicScores::evaluate(model.topics(), &docs_tokens);
        let n_topics = model.num_topics();
        info!(topics = n_topics, npmi = scores.npmi, cv = scores.cv, "result");

        let label = spec.label();
        let model_dir = out_dir.join(label);
        write_rows(&model_dir.join("topic_info.csv"), &model.topic_info())?;
        write_model_report(
            &model_dir.join(format!("LAPORAN_{label}.txt")),
            label,
            params,
            VECTORIZER_STOPWORDS.len(),
            &scores,
            model.topics(),
        )?;
        write_cluster_charts(
            &model_dir,
            "1_barchart_top_topics.json",
            "interactive_map.html",
            &format!("Peta Topik {label}"),
            model.topics(),
        )?;

        rows.push(ComparisonRow {
            model: label.to_string(),
            num_topics: n_topics,
            cv: scores.cv,
            npmi: scores.npmi,
            diversity: scores.diversity,
        });
    }

    let Some(best) = best_by_npmi(&rows, |r| r.npmi).map(|i| rows[i].clone()) else {
        warn!("no embedders configured");
        return Ok(None);
    };
    write_rows(&out_dir.join("tabel_komparasi_semua.csv"), &rows)?;
    viz::write_json(out_dir.join("GRAFIK_PERBANDINGAN_SKOR.json"), &viz::score_comparison(&rows))?;
    write_comparison_report(&out_dir.join("RANGKUMAN_PERBANDINGAN_MODEL.txt"), &rows, params)?;

    println!("📊 Perbandingan model embedding:");
    for row in &rows {
        println!(
            "   {:<20} Topik: {:<4} NPMI: {:.4}  Cv: {:.4}  Diversity: {:.4}",
            row.model, row.num_topics, row.npmi, row.cv, row.diversity
        );
    }
    println!("🏆 PEMENANG: {} (NPMI {:.4})", best.model, best.npmi);
    Ok(Some(best))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterParams;

    fn write_corpus(path: &Path) {
        let themes = [
            "harga beras pasar naik inflasi pangan",
            "menu gizi siswa sekolah dapur sehat",
            "korupsi audit hukum sanksi jaksa sidang",
        ];
        let mut text = String::from("Link,processed_text\n");
        for i in 0..36 {
            text.push_str(&format!("https://x.id/{i},{} hari {i}\n", themes[i % 3]));
        }
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn test_run_compares_every_embedder() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.paths.preprocessed = dir.path().join("pre.csv");
        settings.paths.embed_dir = dir.path().join("embed");
        settings.embed.cluster = ClusterParams { min_cluster_size: 5, min_samples: 3, ..ClusterParams::default() };
        settings.embed.embedders.truncate(2);
        write_corpus(&settings.paths.preprocessed);

        let best = run(&settings).unwrap().unwrap();
        assert!(best.model.starts_with("Hash-"));

        let table: Vec<ComparisonRow> =
            crate::models::read_rows(&settings.paths.embed_dir.join("tabel_komparasi_semua.csv")).unwrap();
        assert_eq!(table.len(), 2);
        assert!(settings.paths.embed_dir.join("Hash-Unigram/LAPORAN_Hash-Unigram.txt").exists());
        let summary =
            std::fs::read_to_string(settings.paths.embed_dir.join("RANGKUMAN_PERBANDINGAN_MODEL.txt")).unwrap();
        assert!(summary.contains(&format!("Model Terbaik     : {}", best.model)));
    }

    #[test]
    fn test_unreachable_http_embedder_falls_back() {
        let spec = EmbedderSpec::Http {
            label: "Remote".into(),
            base_url: "http://127.0.0.1:9".into(),
            model: "m".into(),
        };
        let embedder = build_embedder(&spec).unwrap();
        let docs = vec!["harga beras".to_string(), "menu gizi".to_string()];
        let (used, vectors) = embed_with_fallback(embedder.as_ref(), &docs).unwrap();
        assert_eq!(used, "Hash-Unigram");
        assert_eq!(vectors.len(), 2);
    }
}
