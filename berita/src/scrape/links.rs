use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use scraper::{Html, Selector};
use tracing::{info, warn};

use super::page::PageSource;
use super::{pause, wait_for_operator};
use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::models::{read_rows, write_rows, ArticleLink};

const SEARCH_BASE: &str = "https://www.google.com";
const CAPTCHA_MARKERS: [&str; 3] = ["unusual traffic", "recaptcha", "bukan robot"];

static CARD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.SoaBEf").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.n0jPhd").unwrap());
static SOURCE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.MgUUmf").unwrap());
static DATE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.OSrXXb").unwrap());
static NEXT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#pnnext").unwrap());

/// A month-sized slice of the scrape window.
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

/// Splits `[start, end]` at month boundaries. The first bucket starts at
/// `start`, later ones on the 1st, and the last is clipped to `end`.
pub fn monthly_periods(start: NaiveDate, end: NaiveDate) -> Vec<Period> {
    let mut periods = Vec::new();
    let mut current = start;
    while current <= end {
        let next_month = if current.month() == 12 {
            NaiveDate::from_ymd_opt(current.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(current.year(), current.month() + 1, 1)
        };
        let Some(next_month) = next_month else { break };
        let month_end = (next_month - Duration::days(1)).min(end);
        periods.push(Period {
            start: current,
            end: month_end,
            label: current.format("%B %Y").to_string(),
        });
        current = next_month;
    }
    periods
}

pub fn task_id(keyword: &str, period: &str) -> String {
    format!("{keyword}|{period}")
}

pub fn search_url(keyword: &str, period: &Period) -> String {
    format!(
        "{SEARCH_BASE}/search?q={}&tbm=nws&hl=id&gl=ID&tbs=cdr:1,cd_min:{},cd_max:{}",
        keyword.replace(' ', "+"),
        period.start.format("%m/%d/%Y"),
        period.end.format("%m/%d/%Y"),
    )
}

/// Unwraps Google redirect links (`/url?q=<target>&...`).
pub fn clean_google_link(url: &str) -> String {
    let redirect = url.contains("google.com/url") || url.contains("google.co.id/url") || url.starts_with("/url?");
    if !redirect {
        return url.to_string();
    }
    let Some(start) = url.find("q=").map(|i| i + 2) else {
        return url.to_string();
    };
    let target = match url[start..].find('&') {
        Some(end) => &url[start..start + end],
        None => &url[start..],
    };
    urlencoding::decode(target).map(|s| s.into_owned()).unwrap_or_else(|_| target.to_string())
}

pub fn is_captcha(html: &str) -> bool {
    let lower = html.to_lowercase();
    CAPTCHA_MARKERS.iter().any(|m| lower.contains(m))
}

/// One news result card.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultCard {
    pub link: String,
    pub title: String,
    pub source: String,
    pub date: String,
}

fn element_text(card: &scraper::ElementRef, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|e| e.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Result cards on a search page; cards missing a field are skipped.
pub fn parse_results(html: &str) -> Vec<ResultCard> {
    let doc = Html::parse_document(html);
    doc.select(&CARD)
        .filter_map(|card| {
            let href = card.select(&ANCHOR).next()?.value().attr("href")?;
            Some(ResultCard {
                link: clean_google_link(href),
                title: element_text(&card, &TITLE)?,
                source: element_text(&card, &SOURCE)?,
                date: element_text(&card, &DATE)?,
            })
        })
        .collect()
}

/// Absolute URL of the "next page" link, if any.
pub fn next_page_url(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let href = doc.select(&NEXT).next()?.value().attr("href")?;
    if href.starts_with("http") {
        Some(href.to_string())
    } else {
        Some(format!("{SEARCH_BASE}{href}"))
    }
}

/// What a previous run left behind.
#[derive(Debug, Default)]
pub struct ResumeState {
    pub known_links: HashSet<String>,
    pub completed: HashSet<String>,
    /// The last (keyword, period) seen, which is scraped again.
    pub unfinished: Option<(String, String)>,
}

impl ResumeState {
    pub fn from_rows(rows: &[ArticleLink]) -> Self {
        let known_links = rows.iter().map(|r| r.link.clone()).collect();
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for row in rows {
            let pair = (row.keyword.clone(), row.period.clone());
            if seen.insert(pair.clone()) {
                ordered.push(pair);
            }
        }
        let unfinished = ordered.pop();
        let completed = ordered.iter().map(|(k, p)| task_id(k, p)).collect();
        ResumeState { known_links, completed, unfinished }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LinkSummary {
    pub total: usize,
    pub added: usize,
    pub tasks_run: usize,
    pub tasks_skipped: usize,
}

/// Walks period -> PESTLE category -> keyword over the search pages,
/// persisting to `output` after every page that adds links.
pub struct LinkScraper<'a, S: PageSource> {
    source: S,
    config: &'a ScrapeConfig,
    output: PathBuf,
    rng: StdRng,
    on_captcha: fn(),
    rows: Vec<ArticleLink>,
    state: ResumeState,
    summary: LinkSummary,
}

impl<'a, S: PageSource> LinkScraper<'a, S> {
    pub fn new(source: S, config: &'a ScrapeConfig, output: &Path, seed: u64) -> Self {
        LinkScraper {
            source,
            config,
            output: output.to_path_buf(),
            rng: StdRng::seed_from_u64(seed),
            on_captcha: wait_for_operator,
            rows: Vec::new(),
            state: ResumeState::default(),
            summary: LinkSummary::default(),
        }
    }

    pub fn with_captcha_hook(mut self, hook: fn()) -> Self {
        self.on_captcha = hook;
        self
    }

    pub fn run(mut self) -> Result<LinkSummary> {
        self.resume();
        let periods = monthly_periods(self.config.start, self.config.end);
        info!(periods = periods.len(), "target window");

        let outcome = self.crawl(&periods);

        // flush whatever was collected, even after an error
        if !self.rows.is_empty() {
            write_rows(&self.output, &self.rows)?;
        }
        outcome?;
        self.summary.total = self.rows.len();
        Ok(self.summary)
    }

    fn resume(&mut self) {
        if !self.output.exists() {
            return;
        }
        match read_rows::<ArticleLink>(&self.output) {
            Ok(rows) => {
                self.state = ResumeState::from_rows(&rows);
                if let Some((keyword, period)) = &self.state.unfinished {
                    warn!(keyword, period, "last task treated as unfinished");
                }
                info!(links = rows.len(), "resuming from existing file");
                self.rows = rows;
            }
            Err(e) => warn!(error = %e, "could not load existing links, starting fresh"),
        }
    }

    fn crawl(&mut self, periods: &[Period]) -> Result<()> {
        let config = self.config;
        for period in periods {
            info!(period = %period.label, start = %period.start, end = %period.end, "entering period");
            for group in &config.keywords {
                for keyword in &group.keywords {
                    let id = task_id(keyword, &period.label);
                    if self.state.completed.contains(&id) {
                        self.summary.tasks_skipped += 1;
                        continue;
                    }
                    info!(category = %group.category, keyword, "scrape");
                    self.scrape_task(&group.category, keyword, period)?;
                    self.state.completed.insert(id);
                    self.summary.tasks_run += 1;
                    pause(&mut self.rng, config.keyword_pause_secs);
                }
            }
        }
        Ok(())
    }

    /// Fetches a page, waiting for the operator and refetching once if
    /// the search engine answers with a CAPTCHA.
    fn fetch_checked(&self, url: &str) -> Result<String, ScrapeError> {
        let html = self.source.fetch(url)?;
        if is_captcha(&html) {
            (self.on_captcha)();
            return self.source.fetch(url);
        }
        Ok(html)
    }

    fn scrape_task(&mut self, category: &str, keyword: &str, period: &Period) -> Result<()> {
        let mut url = search_url(keyword, period);
        for page in 1..=self.config.pages_per_period {
            let html = match self.fetch_checked(&url) {
                Ok(html) => html,
                Err(e) => {
                    warn!(keyword, page, error = %e, "page fetch failed");
                    break;
                }
            };
            let cards = parse_results(&html);
            if cards.is_empty() {
                break;
            }

            let found = cards.len();
            let mut saved = 0;
            for card in cards {
                if !self.state.known_links.insert(card.link.clone()) {
                    continue;
                }
                self.rows.push(ArticleLink {
                    category: category.to_string(),
                    keyword: keyword.to_string(),
                    period: period.label.clone(),
                    source: card.source,
                    published: card.date,
                    title: card.title,
                    link: card.link,
                });
                saved += 1;
            }
            info!(page, found, new = saved, skipped = found - saved, "page done");

            if saved > 0 {
                write_rows(&self.output, &self.rows)?;
                self.summary.added += saved;
            }

            match next_page_url(&html) {
                Some(next) => url = next,
                None => break,
            }
            pause(&mut self.rng, self.config.page_pause_secs);
        }
        Ok(())
    }
}
