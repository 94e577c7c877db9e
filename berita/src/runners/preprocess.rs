use std::collections::HashSet;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use tracing::{info, warn};

use super::input_missing;
use crate::config::Settings;
use crate::dates::parse_listing_date;
use crate::error::PipelineError;
use crate::models::{read_headers, read_rows, write_rows, ArticleRecord};
use crate::report::{write_preprocessing_report, DataFlow};
use crate::text::{CorpusStats, NewsPreprocessor};
use crate::viz;

const SAMPLE_COUNT: usize = 5;
const HISTOGRAM_BINS: usize = 50;
const TOP_WORDS: usize = 15;

/// Cleans scraped articles for the embedding models and documents how the
/// corpus changed along the way.
pub fn run(settings: &Settings) -> Result<Option<DataFlow>> {
    let input = &settings.paths.content;
    let out_dir = &settings.paths.preprocess_dir;
    if input_missing(input) {
        return Ok(None);
    }

    info!(path = %input.display(), "loading articles");
    let has_status = read_headers(input)?.iter().any(|h| h == "Status_Scrape");
    let raw: Vec<ArticleRecord> = read_rows(input)?;

    // Phase 1: volume trend of everything that was scraped
    let dated: Vec<(String, Option<chrono::NaiveDate>)> = raw
        .iter()
        .map(|r| (r.published.clone(), parse_listing_date(&r.published, settings.reference_date)))
        .collect();
    let trend = viz::monthly_trend(&dated);
    info!(total = trend.total, parsed = trend.parsed, failed = trend.failed, "date parsing");
    if !trend.failed_examples.is_empty() {
        warn!(examples = ?trend.failed_examples, "unparsed dates");
    }
    viz::write_json(out_dir.join("0_tren_berita_raw.json"), &trend)?;

    // Phase 2: status filter, empty bodies, exact duplicates
    let mut flow = DataFlow { raw: raw.len(), ..DataFlow::default() };
    let scraped: Vec<ArticleRecord> = raw
        .into_iter()
        .filter(|r| !has_status || r.succeeded())
        .collect();
    flow.scraped = scraped.len();

    let mut seen = HashSet::new();
    let unique: Vec<ArticleRecord> = scraped
        .into_iter()
        .filter(|r| !r.content.trim().is_empty())
        .filter(|r| seen.insert(r.content.clone()))
        .collect();
    flow.deduped = unique.len();

    // Phase 3: clean
    let before = CorpusStats::compute(unique.iter().map(|r| r.content.as_str()));
    let preprocessor = NewsPreprocessor::new();
    let pb = super::progress_bar(unique.len(), "Cleaning");
    let mut cleaned: Vec<ArticleRecord> = Vec::with_capacity(unique.len());
    for mut record in unique {
        let text = preprocessor.process_row(&record.content);
        pb.inc(1);
        if text.is_empty() {
            continue;
        }
        record.processed_text = Some(text);
        cleaned.push(record);
    }
    pb.finish_and_clear();
    flow.clean = cleaned.len();
    if cleaned.is_empty() {
        return Err(PipelineError::EmptyCorpus { stage: "preprocess" }.into());
    }
    let after = CorpusStats::compute(cleaned.iter().filter_map(|r| r.processed_text.as_deref()));

    // Phase 4: charts, samples, report, output
    viz::write_json(out_dir.join("1_pipeline_data_reduction.json"), &viz::data_reduction(&flow))?;
    viz::write_json(
        out_dir.join("2_distribusi_panjang_kata.json"),
        &viz::length_histogram(&before.doc_lengths, &after.doc_lengths, HISTOGRAM_BINS),
    )?;
    viz::write_json(
        out_dir.join("3_top_words_comparison.json"),
        &viz::top_words_comparison(&before, &after, TOP_WORDS),
    )?;

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let samples: Vec<(String, String)> = sample(&mut rng, cleaned.len(), SAMPLE_COUNT.min(cleaned.len()))
        .into_iter()
        .map(|i| {
            let r = &cleaned[i];
            (r.content.clone(), r.processed_text.clone().unwrap_or_default())
        })
        .collect();
    write_preprocessing_report(
        &out_dir.join("RANGKUMAN_METODOLOGI_PREPROCESSING.txt"),
        &flow,
        &before,
        &after,
        &samples,
    )?;

    write_rows(&settings.paths.preprocessed, &cleaned)?;

    println!("📊 Preprocessing selesai:");
    println!("   Raw: {} -> Sukses: {} -> Unik: {} -> Bersih: {}", flow.raw, flow.scraped, flow.deduped, flow.clean);
    println!("   Vocabulary: {} -> {}", before.vocabulary, after.vocabulary);
    println!("   Output: {}", settings.paths.preprocessed.display());
    Ok(Some(flow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleLink, STATUS_FAILED, STATUS_SUCCESS};

    fn record(content: &str, status: &str, published: &str) -> ArticleRecord {
        let mut r = ArticleRecord::from_link(ArticleLink {
            category: "Social".into(),
            keyword: "Gizi Anak Sekolah".into(),
            period: "June 2025".into(),
            source: "Kompas".into(),
            published: published.into(),
            title: "Judul".into(),
            link: format!("https://x.id/{}", content.len()),
        });
        r.content = content.into();
        r.status = status.into();
        r
    }

    fn settings_in(dir: &std::path::Path) -> Settings {
        let mut s = Settings::default();
        s.paths.content = dir.join("pestle_konten.csv");
        s.paths.preprocessed = dir.join("preprocessing.csv");
        s.paths.preprocess_dir = dir.join("viz");
        s
    }

    #[test]
    fn test_missing_input_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&settings_in(dir.path())).unwrap().is_none());
    }

    #[test]
    fn test_run_filters_dedups_and_cleans() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        write_rows(
            &settings.paths.content,
            &[
                record("Menu MBG di sekolah enakkk sekali!", STATUS_SUCCESS, "2 hari lalu"),
                record("Menu MBG di sekolah enakkk sekali!", STATUS_SUCCESS, "kemarin"),
                record("ERROR: timeout", STATUS_FAILED, "17 Juni 2025"),
                record("Baca juga: 2025", STATUS_SUCCESS, "Senin, 3 Maret 2025"),
                record("Harga beras naik di pasar", STATUS_SUCCESS, "tidak jelas"),
            ],
        )
        .unwrap();

        let flow = run(&settings).unwrap().unwrap();
        assert_eq!(flow.raw, 5);
        assert_eq!(flow.scraped, 4);
        assert_eq!(flow.deduped, 3);
        assert_eq!(flow.clean, 2);

        let rows: Vec<ArticleRecord> = read_rows(&settings.paths.preprocessed).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].processed_text.as_deref(), Some("menu mbg di sekolah enak sekali"));
        assert_eq!(rows[1].processed_text.as_deref(), Some("harga beras naik di pasar"));

        let report = std::fs::read_to_string(
            settings.paths.preprocess_dir.join("RANGKUMAN_METODOLOGI_PREPROCESSING.txt"),
        )
        .unwrap();
        assert!(report.contains("[3] PERBANDINGAN STATISTIK DATA"));
        assert_eq!(report.matches("Contoh #").count(), 2);
        assert!(settings.paths.preprocess_dir.join("0_tren_berita_raw.json").exists());
    }
}
