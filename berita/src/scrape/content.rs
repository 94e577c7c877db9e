use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use scraper::{Html, Selector};
use tracing::{info, warn};

use super::page::PageSource;
use super::pause;
use crate::config::ScrapeConfig;
use crate::error::{PipelineError, ScrapeError};
use crate::models::{read_rows, write_rows, ArticleLink, ArticleRecord, STATUS_FAILED, STATUS_SUCCESS};
use crate::runners::progress_bar;

const TOO_SHORT: &str = "ERROR: Konten terlalu pendek/Gagal Parsing";

static ARTICLE_PARAGRAPHS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article p, [itemprop=articleBody] p, .read__content p, .detail__body-text p").unwrap());
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

/// Body text of a news page: paragraphs inside the article container,
/// or every paragraph when the page has no recognisable container.
pub fn extract_article_text(html: &str) -> Result<String, ScrapeError> {
    let doc = Html::parse_document(html);
    let collect = |selector: &Selector| -> Vec<String> {
        doc.select(selector)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    };
    let mut paragraphs = collect(&ARTICLE_PARAGRAPHS);
    if paragraphs.is_empty() {
        paragraphs = collect(&PARAGRAPHS);
    }
    if paragraphs.is_empty() {
        return Err(ScrapeError::NoContent);
    }
    Ok(paragraphs.join(" ").replace(['\n', '\r'], " "))
}

/// Downloads one article. Failures come back as an `ERROR: ...` string,
/// never as an `Err`, so one bad URL cannot stop the batch.
pub fn download_article<S: PageSource + ?Sized>(source: &S, url: &str, min_chars: usize) -> String {
    let text = source
        .fetch(url)
        .and_then(|html| extract_article_text(&html))
        .and_then(|text| require_length(text, min_chars));
    match text {
        Ok(text) => text,
        Err(ScrapeError::TooShort { .. } | ScrapeError::NoContent) => TOO_SHORT.to_string(),
        Err(e) => format!("ERROR: {e}"),
    }
}

fn require_length(text: String, min_chars: usize) -> Result<String, ScrapeError> {
    let chars = text.chars().count();
    if chars < min_chars {
        return Err(ScrapeError::TooShort { chars });
    }
    Ok(text)
}

pub fn status_for(content: &str) -> &'static str {
    if content.contains("ERROR") {
        STATUS_FAILED
    } else {
        STATUS_SUCCESS
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ContentSummary {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Fills `Isi_Berita` for every row that has none, checkpointing to
/// `output` as it goes. Rerunning resumes from the checkpoint.
pub struct ContentDownloader<'a, S: PageSource> {
    source: S,
    config: &'a ScrapeConfig,
    input: PathBuf,
    output: PathBuf,
    rng: StdRng,
}

impl<'a, S: PageSource> ContentDownloader<'a, S> {
    pub fn new(source: S, config: &'a ScrapeConfig, input: &Path, output: &Path, seed: u64) -> Self {
        ContentDownloader {
            source,
            config,
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn load(&self) -> Result<Vec<ArticleRecord>> {
        if self.output.exists() {
            info!(path = %self.output.display(), "resuming content download");
            return read_rows(&self.output);
        }
        if !self.input.exists() {
            return Err(PipelineError::MissingInput(self.input.clone()).into());
        }
        info!(path = %self.input.display(), "reading link file");
        let links: Vec<ArticleLink> = read_rows(&self.input)?;
        Ok(links.into_iter().map(ArticleRecord::from_link).collect())
    }

    pub fn run(mut self) -> Result<ContentSummary> {
        let mut rows = self.load()?;
        let pending: Vec<usize> = rows.iter().enumerate().filter(|(_, r)| r.is_pending()).map(|(i, _)| i).collect();
        info!(total = rows.len(), pending = pending.len(), "starting download");

        let pb = progress_bar(pending.len(), "Downloading");
        let every = self.config.checkpoint_every.max(1);
        for (n, &index) in pending.iter().enumerate() {
            let content = download_article(&self.source, &rows[index].link, self.config.min_content_chars);
            if content.starts_with("ERROR") {
                warn!(link = %rows[index].link, %content, "download failed");
            }
            rows[index].status = status_for(&content).to_string();
            rows[index].content = content;
            pb.inc(1);

            if (n + 1) % every == 0 {
                write_rows(&self.output, &rows)?;
                pause(&mut self.rng, self.config.checkpoint_pause_secs);
            }
        }
        pb.finish_and_clear();
        write_rows(&self.output, &rows)?;

        Ok(ContentSummary {
            total: rows.len(),
            processed: pending.len(),
            succeeded: rows.iter().filter(|r| r.status == STATUS_SUCCESS).count(),
            failed: rows.iter().filter(|r| r.status == STATUS_FAILED).count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::page::fake::FakeSource;

    const LONG: &str = "Program makan bergizi gratis mulai berjalan di sekolah dasar negeri pekan ini.";

    fn link(url: &str) -> ArticleLink {
        ArticleLink {
            category: "Social".into(),
            keyword: "Gizi Anak Sekolah".into(),
            period: "June 2025".into(),
            source: "Kompas".into(),
            published: "2 hari lalu".into(),
            title: "Judul".into(),
            link: url.into(),
        }
    }

    fn quiet() -> ScrapeConfig {
        ScrapeConfig {
            checkpoint_every: 2,
            checkpoint_pause_secs: [0.0, 0.0],
            ..ScrapeConfig::default()
        }
    }

    #[test]
    fn test_extract_prefers_article_body() {
        let html = format!("<html><body><p>menu navigasi</p><article><p>{LONG}</p>\n<p>Kedua.</p></article></body></html>");
        assert_eq!(extract_article_text(&html).unwrap(), format!("{LONG} Kedua."));
    }

    #[test]
    fn test_extract_falls_back_to_all_paragraphs() {
        let html = "<div><p>satu\ndua</p><p>tiga</p></div>";
        assert_eq!(extract_article_text(html).unwrap(), "satu dua tiga");
        assert!(matches!(extract_article_text("<div>kosong</div>"), Err(ScrapeError::NoContent)));
    }

    #[test]
    fn test_require_length_counts_characters() {
        assert!(matches!(require_length("pendek".into(), 50), Err(ScrapeError::TooShort { chars: 6 })));
        assert!(matches!(require_length("ékonomi".into(), 7), Ok(t) if t == "ékonomi"));
    }

    #[test]
    fn test_download_article_marks_short_and_failed_pages() {
        let source = FakeSource::default()
            .with_page("https://a.id/ok", &format!("<p>{LONG}</p>"))
            .with_page("https://a.id/short", "<p>pendek</p>");
        assert_eq!(download_article(&source, "https://a.id/ok", 50), LONG);
        assert_eq!(download_article(&source, "https://a.id/short", 50), TOO_SHORT);
        let missing = download_article(&source, "https://a.id/404", 50);
        assert!(missing.starts_with("ERROR: "));
        assert_eq!(status_for(&missing), STATUS_FAILED);
        assert_eq!(status_for(LONG), STATUS_SUCCESS);
    }

    #[test]
    fn test_run_fills_pending_rows_and_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pestle_link.csv");
        let output = dir.path().join("pestle_konten.csv");
        write_rows(&input, &[link("https://a.id/1"), link("https://a.id/2"), link("https://a.id/3")]).unwrap();

        let source = FakeSource::default()
            .with_page("https://a.id/1", &format!("<p>{LONG}</p>"))
            .with_page("https://a.id/2", "<p>pendek</p>");
        let config = quiet();
        let summary = ContentDownloader::new(source, &config, &input, &output, 7).run().unwrap();
        assert_eq!(summary, ContentSummary { total: 3, processed: 3, succeeded: 1, failed: 2 });

        let rows: Vec<ArticleRecord> = read_rows(&output).unwrap();
        assert_eq!(rows[0].content, LONG);
        assert_eq!(rows[1].content, TOO_SHORT);
        assert_eq!(rows[1].status, STATUS_FAILED);

        // nothing is pending on the second pass
        let again = ContentDownloader::new(FakeSource::default(), &config, &input, &output, 7).run().unwrap();
        assert_eq!(again.processed, 0);
        assert_eq!(again.total, 3);
    }

    #[test]
    fn test_run_without_input_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = quiet();
        let err = ContentDownloader::new(
            FakeSource::default(),
            &config,
            &dir.path().join("none.csv"),
            &dir.path().join("out.csv"),
            1,
        )
        .run()
        .unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::MissingInput(_))));
    }
}
