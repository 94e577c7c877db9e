//! Normalisation of the free-text publish dates shown by Indonesian news
//! listings ("2 hari lalu", "Senin, 17 November 2025 10:30 WIB", "30/11/2025").
//!
//! Two policies live here on purpose. [`DateNormalizer`] rewrites date
//! columns in place and hands back the original text when it cannot parse it.
//! [`parse_listing_date`] feeds the volume-trend chart and returns `None`
//! instead. They recognise different relative units and must stay separate.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+(detik|menit|jam|hari|minggu|bulan|tahun)\s+(?:yang\s+)?lalu").unwrap()
});

static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(senin|selasa|rabu|kamis|jum'?at|sabtu|minggu)\b\s*,?").unwrap()
});

static TIME_OF_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}[:.]\d{2}(?:[:.]\d{2})?\b").unwrap());

static TIMEZONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(wib|wita|wit)\b|pukul.*").unwrap());

static DAY_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\s+([a-z]+)\.?\s+(\d{4})").unwrap());

static NUMERIC_DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})[/-](\d{1,2})[/-](\d{4})").unwrap());

static LISTING_RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+(hari|minggu|bulan)\s+(?:yang\s+)?lalu").unwrap());

/// Long and abbreviated Indonesian month names.
pub fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "januari" | "jan" => 1,
        "februari" | "feb" | "pebruari" => 2,
        "maret" | "mar" => 3,
        "april" | "apr" => 4,
        "mei" => 5,
        "juni" | "jun" => 6,
        "juli" | "jul" => 7,
        "agustus" | "agu" | "agt" | "agust" | "ags" => 8,
        "september" | "sep" | "sept" => 9,
        "oktober" | "okt" => 10,
        "november" | "nov" | "nop" => 11,
        "desember" | "des" => 12,
        _ => return None,
    };
    Some(month)
}

/// Rewrites scraped date strings to `YYYY-MM-DD` relative to a fixed
/// scrape date.
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer {
    reference: NaiveDate,
}

impl DateNormalizer {
    pub fn new(reference: NaiveDate) -> Self {
        DateNormalizer { reference }
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    /// Returns an ISO date, or `raw` unchanged when nothing matches.
    /// Callers treat an unchanged non-ISO value as a parse failure.
    pub fn normalize(&self, raw: &str) -> String {
        let text = raw.trim().to_lowercase();
        if text.is_empty() {
            return String::new();
        }
        if ISO_DATE.is_match(&text) {
            return raw.trim().to_string();
        }
        match self.resolve(&text) {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => raw.to_string(),
        }
    }

    /// The parsed-column view of [`normalize`](Self::normalize).
    pub fn normalize_opt(&self, raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.normalize(raw), "%Y-%m-%d").ok()
    }

    fn resolve(&self, text: &str) -> Option<NaiveDate> {
        if let Some(caps) = RELATIVE.captures(text) {
            let amount: i64 = caps[1].parse().ok()?;
            let offset = match &caps[2] {
                "detik" | "menit" | "jam" => Duration::zero(),
                "hari" => Duration::try_days(amount)?,
                "minggu" => Duration::try_weeks(amount)?,
                // flat 30-day months and 365-day years
                "bulan" => Duration::try_days(amount.checked_mul(30)?)?,
                "tahun" => Duration::try_days(amount.checked_mul(365)?)?,
                _ => return None,
            };
            return self.reference.checked_sub_signed(offset);
        }

        if text.contains("kemarin") {
            return self.reference.checked_sub_signed(Duration::days(1));
        }

        parse_absolute(text)
    }
}

/// Strips weekday names, clock times and timezone markers, then tries
/// `D Month YYYY` followed by day-first `D/M/YYYY`.
fn parse_absolute(text: &str) -> Option<NaiveDate> {
    let text = TIMEZONE.replace_all(text, " ");
    let text = TIME_OF_DAY.replace_all(&text, " ");
    let text = WEEKDAY.replace_all(&text, " ");
    let text = text.trim();

    if let Some(caps) = DAY_MONTH_YEAR.captures(text) {
        if let Some(month) = month_number(&caps[2]) {
            let day: u32 = caps[1].parse().ok()?;
            let year: i32 = caps[3].parse().ok()?;
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }

    let caps = NUMERIC_DMY.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Date parser used for the volume-trend chart during preprocessing.
///
/// Sub-day phrases ("baru saja", "beberapa saat", "N jam lalu") resolve to the
/// scrape date itself; "N tahun lalu" is not recognised by this policy.
pub fn parse_listing_date(raw: &str, scrape_date: NaiveDate) -> Option<NaiveDate> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    const SAME_DAY: [&str; 5] = ["baru saja", "menit lalu", "jam lalu", "detik lalu", "beberapa saat"];
    if SAME_DAY.iter().any(|k| text.contains(k)) {
        return Some(scrape_date);
    }
    if text.contains("kemarin") {
        return scrape_date.checked_sub_signed(Duration::days(1));
    }
    if let Some(caps) = LISTING_RELATIVE.captures(&text) {
        let amount: i64 = caps[1].parse().ok()?;
        let offset = match &caps[2] {
            "hari" => Duration::try_days(amount)?,
            "minggu" => Duration::try_weeks(amount)?,
            _ => Duration::try_days(amount.checked_mul(30)?)?,
        };
        return scrape_date.checked_sub_signed(offset);
    }

    if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return Some(date);
    }
    parse_absolute(&text)
}
