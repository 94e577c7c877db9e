//! Chart data as JSON plus a self-contained HTML topic map.
//!
//! Every chart is written as a pretty JSON document that a notebook or a
//! D3 page can render. The topic map is the one chart rendered here, as
//! inline SVG, so it can be opened straight from the output folder.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;

use crate::models::ModeledTopic;
use crate::report::{ComparisonRow, DataFlow, TuningRow};
use crate::text::CorpusStats;

/* -------------------------------------------------------------------------- */
/* Output                                                                     */
/* -------------------------------------------------------------------------- */

pub fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    fs::write(path, serde_json::to_vec_pretty(value)?).with_context(|| format!("write {:?}", path))
}

/* -------------------------------------------------------------------------- */
/* Preprocessing charts                                                       */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Serialize)]
pub struct MonthCount {
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct TrendChart {
    pub months: Vec<MonthCount>,
    pub total: usize,
    pub parsed: usize,
    pub failed: usize,
    pub failed_examples: Vec<String>,
}

/// Articles per calendar month. Entries pair the raw date text with its parse.
pub fn monthly_trend(entries: &[(String, Option<NaiveDate>)]) -> TrendChart {
    let mut per_month: BTreeMap<String, usize> = BTreeMap::new();
    let mut failed_examples = Vec::new();
    let mut failed = 0;
    for (raw, parsed) in entries {
        match parsed {
            Some(date) => *per_month.entry(date.format("%Y-%m").to_string()).or_default() += 1,
            None => {
                failed += 1;
                if failed_examples.len() < 5 {
                    failed_examples.push(raw.clone());
                }
            }
        }
    }
    TrendChart {
        months: per_month.into_iter().map(|(month, count)| MonthCount { month, count }).collect(),
        total: entries.len(),
        parsed: entries.len() - failed,
        failed,
        failed_examples,
    }
}

pub fn data_reduction(flow: &DataFlow) -> serde_json::Value {
    json!({
        "stages": ["Raw Data", "Sukses Scrape", "Unik", "Clean Data"],
        "counts": [flow.raw, flow.scraped, flow.deduped, flow.clean],
    })
}

#[derive(Debug, Serialize)]
pub struct LengthHistogram {
    pub bin_width: usize,
    pub before: Vec<usize>,
    pub after: Vec<usize>,
}

/// Document lengths before and after cleaning, on shared bins.
pub fn length_histogram(before: &[usize], after: &[usize], bins: usize) -> LengthHistogram {
    let bins = bins.max(1);
    let max = before.iter().chain(after).copied().max().unwrap_or(0);
    let bin_width = (max + 1).div_ceil(bins).max(1);
    let count = |lengths: &[usize]| {
        let mut hist = vec![0; bins];
        for &len in lengths {
            hist[(len / bin_width).min(bins - 1)] += 1;
        }
        hist
    };
    LengthHistogram { bin_width, before: count(before), after: count(after) }
}

pub fn top_words_comparison(before: &CorpusStats, after: &CorpusStats, n: usize) -> serde_json::Value {
    json!({
        "before": before.most_common(n),
        "after": after.most_common(n),
    })
}

/* -------------------------------------------------------------------------- */
/* Topic model charts                                                         */
/* -------------------------------------------------------------------------- */

pub fn tuning_curves(rows: &[TuningRow]) -> serde_json::Value {
    json!({
        "num_topics": rows.iter().map(|r| r.num_topics).collect::<Vec<_>>(),
        "npmi": rows.iter().map(|r| r.npmi).collect::<Vec<_>>(),
        "cv": rows.iter().map(|r| r.cv).collect::<Vec<_>>(),
        "diversity": rows.iter().map(|r| r.diversity).collect::<Vec<_>>(),
    })
}

#[derive(Debug, Serialize)]
pub struct KeywordBars {
    pub topic: i64,
    pub words: Vec<(String, f64)>,
}

pub fn keyword_bars(topics: &[ModeledTopic], n: usize) -> Vec<KeywordBars> {
    topics
        .iter()
        .filter(|t| !t.is_outlier())
        .map(|t| KeywordBars { topic: t.id, words: t.words.iter().take(n).cloned().collect() })
        .collect()
}

/// Word cloud input for the `limit` largest topics.
pub fn word_clouds(topics: &[ModeledTopic], words: usize, limit: usize) -> Vec<KeywordBars> {
    let mut ranked: Vec<&ModeledTopic> = topics.iter().filter(|t| !t.is_outlier()).collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.id.cmp(&b.id)));
    ranked
        .into_iter()
        .take(limit)
        .map(|t| KeywordBars { topic: t.id, words: t.words.iter().take(words).cloned().collect() })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct TopicBar {
    pub topic: i64,
    pub label: String,
    pub count: usize,
}

/// Largest topics by document count, labelled by their leading words.
pub fn topic_bars(topics: &[ModeledTopic], limit: usize) -> Vec<TopicBar> {
    let mut ranked: Vec<&ModeledTopic> = topics.iter().filter(|t| !t.is_outlier()).collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.id.cmp(&b.id)));
    ranked
        .into_iter()
        .take(limit)
        .map(|t| TopicBar {
            topic: t.id,
            label: t.name.split('_').skip(1).take(5).collect::<Vec<_>>().join(" "),
            count: t.count,
        })
        .collect()
}

pub fn score_comparison(rows: &[ComparisonRow]) -> serde_json::Value {
    json!({
        "models": rows.iter().map(|r| r.model.as_str()).collect::<Vec<_>>(),
        "npmi": rows.iter().map(|r| r.npmi).collect::<Vec<_>>(),
        "cv": rows.iter().map(|r| r.cv).collect::<Vec<_>>(),
        "diversity": rows.iter().map(|r| r.diversity).collect::<Vec<_>>(),
    })
}

/* -------------------------------------------------------------------------- */
/* Intertopic distance map                                                    */
/* -------------------------------------------------------------------------- */

/// Jensen-Shannon distance (base 2), in [0, 1].
pub fn js_distance(p: &[f64], q: &[f64]) -> f64 {
    let mut divergence = 0.0_f64;
    for (&a, &b) in p.iter().zip(q) {
        let m = 0.5 * (a + b);
        if a > 0.0 {
            divergence += 0.5 * a * (a / m).log2();
        }
        if b > 0.0 {
            divergence += 0.5 * b * (b / m).log2();
        }
    }
    divergence.max(0.0).sqrt()
}

/// Word distributions over the union vocabulary of the given topics.
pub fn topic_distributions(topics: &[ModeledTopic]) -> Vec<Vec<f64>> {
    let mut vocab: BTreeMap<&str, usize> = BTreeMap::new();
    for topic in topics {
        for (word, _) in &topic.words {
            let next = vocab.len();
            vocab.entry(word.as_str()).or_insert(next);
        }
    }
    topics
        .iter()
        .map(|topic| {
            let mut dist = vec![0.0; vocab.len()];
            for (word, weight) in &topic.words {
                dist[vocab[word.as_str()]] += weight.max(0.0);
            }
            let total: f64 = dist.iter().sum();
            if total > 0.0 {
                dist.iter_mut().for_each(|x| *x /= total);
            }
            dist
        })
        .collect()
}

/// Classical multidimensional scaling to two dimensions.
pub fn classical_mds(distances: &[Vec<f64>]) -> Vec<[f64; 2]> {
    let n = distances.len();
    if n < 2 {
        return vec![[0.0, 0.0]; n];
    }

    // double-centred squared distances
    let sq: Vec<Vec<f64>> = distances.iter().map(|row| row.iter().map(|d| d * d).collect()).collect();
    let row_mean: Vec<f64> = sq.iter().map(|r| r.iter().sum::<f64>() / n as f64).collect();
    let grand = row_mean.iter().sum::<f64>() / n as f64;
    let mut b: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| -0.5 * (sq[i][j] - row_mean[i] - row_mean[j] + grand)).collect())
        .collect();

    let mut coords = vec![[0.0; 2]; n];
    for axis in 0..2 {
        let (value, vector) = dominant_eigen(&b);
        if value <= 1e-12 {
            break;
        }
        let scale = value.sqrt();
        for i in 0..n {
            coords[i][axis] = vector[i] * scale;
        }
        for i in 0..n {
            for j in 0..n {
                b[i][j] -= value * vector[i] * vector[j];
            }
        }
    }
    coords
}

fn dominant_eigen(m: &[Vec<f64>]) -> (f64, Vec<f64>) {
    let n = m.len();
    let mut v: Vec<f64> = (0..n).map(|i| 1.0 + i as f64 / n as f64).collect();
    for _ in 0..500 {
        let next: Vec<f64> = m.iter().map(|row| row.iter().zip(&v).map(|(a, b)| a * b).sum()).collect();
        let norm = next.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm < 1e-15 {
            return (0.0, v);
        }
        let next: Vec<f64> = next.into_iter().map(|x| x / norm).collect();
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        if delta < 1e-12 {
            break;
        }
    }
    // Rayleigh quotient keeps the sign for negative eigenvalues
    let mv: Vec<f64> = m.iter().map(|row| row.iter().zip(&v).map(|(a, b)| a * b).sum()).collect();
    (mv.iter().zip(&v).map(|(a, b)| a * b).sum(), v)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Writes a bubble chart of the topics placed by Jensen-Shannon distance.
///
/// `distributions[i]` is the word distribution of `topics[i]`, `prevalence[i]`
/// its share of the corpus. Outlier topics should be filtered out by the caller.
pub fn write_topic_map(
    path: &Path,
    title: &str,
    topics: &[ModeledTopic],
    distributions: &[Vec<f64>],
    prevalence: &[f64],
) -> Result<()> {
    const WIDTH: f64 = 800.0;
    const HEIGHT: f64 = 600.0;
    const MARGIN: f64 = 70.0;

    let n = topics.len();
    let distances: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| js_distance(&distributions[i], &distributions[j])).collect())
        .collect();
    let coords = classical_mds(&distances);

    let (min_x, max_x) = bounds(coords.iter().map(|c| c[0]));
    let (min_y, max_y) = bounds(coords.iter().map(|c| c[1]));
    let project = |v: f64, lo: f64, hi: f64, extent: f64| {
        if hi - lo < 1e-12 {
            extent / 2.0
        } else {
            MARGIN + (v - lo) / (hi - lo) * (extent - 2.0 * MARGIN)
        }
    };
    let max_prev = prevalence.iter().copied().fold(0.0, f64::max);

    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>\n<html lang=\"id\">\n<head>\n<meta charset=\"utf-8\">")?;
    writeln!(html, "<title>{}</title>", escape_html(title))?;
    writeln!(
        html,
        "<style>body{{font-family:sans-serif;margin:2em}}circle{{fill:#4682b4;fill-opacity:.55;stroke:#1f3a5f}}\
         circle:hover{{fill:#d62728}}text{{font-size:12px;text-anchor:middle;pointer-events:none}}\
         td{{padding:2px 8px;vertical-align:top}}</style>"
    )?;
    writeln!(html, "</head>\n<body>\n<h2>{}</h2>", escape_html(title))?;
    writeln!(html, "<svg width=\"{WIDTH}\" height=\"{HEIGHT}\" viewBox=\"0 0 {WIDTH} {HEIGHT}\">")?;
    writeln!(
        html,
        "<line x1=\"0\" y1=\"{h}\" x2=\"{WIDTH}\" y2=\"{h}\" stroke=\"#ccc\"/><line x1=\"{w}\" y1=\"0\" x2=\"{w}\" y2=\"{HEIGHT}\" stroke=\"#ccc\"/>",
        h = HEIGHT / 2.0,
        w = WIDTH / 2.0
    )?;

    // big bubbles first so small ones stay clickable
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| prevalence[b].total_cmp(&prevalence[a]));
    for i in order {
        let topic = &topics[i];
        let x = project(coords[i][0], min_x, max_x, WIDTH);
        let y = project(coords[i][1], min_y, max_y, HEIGHT);
        let r = if max_prev > 0.0 { 8.0 + 40.0 * (prevalence[i] / max_prev).sqrt() } else { 8.0 };
        writeln!(
            html,
            "<circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"{r:.1}\"><title>Topik {}: {} ({:.1}%)</title></circle>",
            topic.id,
            escape_html(&topic.keywords(10)),
            prevalence[i] * 100.0
        )?;
        writeln!(html, "<text x=\"{x:.1}\" y=\"{:.1}\">{}</text>", y + 4.0, topic.id)?;
    }
    writeln!(html, "</svg>")?;

    writeln!(html, "<table>\n<tr><th>Topik</th><th>Porsi</th><th>Keywords</th></tr>")?;
    for (topic, share) in topics.iter().zip(prevalence) {
        writeln!(
            html,
            "<tr><td>{}</td><td>{:.1}%</td><td>{}</td></tr>",
            topic.id,
            share * 100.0,
            escape_html(&topic.keywords(10))
        )?;
    }
    writeln!(html, "</table>\n</body>\n</html>")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    fs::write(path, html).with_context(|| format!("write {:?}", path))
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Corpus share of each topic from its document count.
pub fn count_prevalence(topics: &[ModeledTopic]) -> Vec<f64> {
    let total: usize = topics.iter().map(|t| t.count).sum();
    topics
        .iter()
        .map(|t| if total == 0 { 0.0 } else { t.count as f64 / total as f64 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: i64, words: &[(&str, f64)], count: usize) -> ModeledTopic {
        ModeledTopic {
            id,
            name: format!("{id}_{}", words.iter().map(|(w, _)| *w).collect::<Vec<_>>().join("_")),
            words: words.iter().map(|(w, s)| (w.to_string(), *s)).collect(),
            count,
        }
    }

    #[test]
    fn test_js_distance_bounds() {
        assert!(js_distance(&[0.5, 0.5], &[0.5, 0.5]).abs() < 1e-12);
        assert!((js_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mds_recovers_collinear_points() {
        let points = [0.0f64, 1.0, 3.0];
        let d: Vec<Vec<f64>> = points.iter().map(|a| points.iter().map(|b| (a - b).abs()).collect()).collect();
        let coords = classical_mds(&d);
        for i in 0..3 {
            for j in 0..3 {
                let dx = coords[i][0] - coords[j][0];
                let dy = coords[i][1] - coords[j][1];
                assert!(((dx * dx + dy * dy).sqrt() - d[i][j]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_monthly_trend_counts_failures() {
        let d = |m| NaiveDate::from_ymd_opt(2025, m, 3);
        let entries = vec![
            ("a".to_string(), d(1)),
            ("b".to_string(), d(1)),
            ("c".to_string(), d(3)),
            ("kemarin dulu".to_string(), None),
        ];
        let chart = monthly_trend(&entries);
        assert_eq!(chart.total, 4);
        assert_eq!(chart.parsed, 3);
        assert_eq!(chart.failed_examples, vec!["kemarin dulu".to_string()]);
        assert_eq!(chart.months[0].month, "2025-01");
        assert_eq!(chart.months[0].count, 2);
        assert_eq!(chart.months[1].month, "2025-03");
    }

    #[test]
    fn test_length_histogram_keeps_every_document() {
        let hist = length_histogram(&[1, 5, 9, 100], &[0, 3], 10);
        assert_eq!(hist.before.iter().sum::<usize>(), 4);
        assert_eq!(hist.after.iter().sum::<usize>(), 2);
        assert_eq!(*hist.before.last().unwrap(), 1);
    }

    #[test]
    fn test_topic_bars_rank_by_count_and_skip_outliers() {
        let topics = vec![
            topic(-1, &[("x", 1.0)], 99),
            topic(0, &[("harga", 0.5), ("beras", 0.4)], 3),
            topic(1, &[("gizi", 0.5), ("anak", 0.4)], 10),
        ];
        let bars = topic_bars(&topics, 15);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].topic, 1);
        assert_eq!(bars[0].label, "gizi anak");
    }

    #[test]
    fn test_topic_map_writes_one_bubble_per_topic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots").join("map.html");
        let topics = vec![
            topic(0, &[("harga", 0.6), ("beras", 0.4)], 3),
            topic(1, &[("gizi", 0.5), ("anak", 0.5)], 5),
            topic(2, &[("sekolah", 0.7), ("anak", 0.3)], 2),
        ];
        let dists = topic_distributions(&topics);
        write_topic_map(&path, "Peta <Topik>", &topics, &dists, &count_prevalence(&topics)).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert_eq!(html.matches("<circle").count(), 3);
        assert!(html.contains("Peta &lt;Topik&gt;"));
        assert!(html.contains("gizi, anak"));
    }
}
