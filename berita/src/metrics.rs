//! Topic quality: coherence against a reference corpus and lexical
//! diversity of the top words.
//!
//! Coherence follows the usual pipeline: segment each topic's word list,
//! estimate probabilities with a boolean sliding window over the reference
//! texts, confirm each segment with a log-ratio measure and average.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::error::MetricError;
use crate::models::ModeledTopic;

const EPSILON: f64 = 1e-12;

/// Number of top words per topic that diversity looks at.
pub const DIVERSITY_TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Npmi,
    Cv,
}

impl Measure {
    fn window_size(self) -> usize {
        match self {
            Measure::Npmi => 10,
            Measure::Cv => 110,
        }
    }
}

/// Unique words among each topic's first `top_n`, over `top_n` slots per
/// topic. The outlier bucket is ignored.
pub fn topic_diversity(topics: &[ModeledTopic], top_n: usize) -> f64 {
    let mut unique: HashSet<&str> = HashSet::new();
    let mut slots = 0;
    for topic in topics.iter().filter(|t| !t.is_outlier()) {
        unique.extend(topic.words.iter().take(top_n).map(|(w, _)| w.as_str()));
        slots += top_n;
    }
    if slots == 0 {
        return 0.0;
    }
    unique.len() as f64 / slots as f64
}

/// Co-occurrence statistics over sliding windows, restricted to the words
/// that appear in some topic.
struct WindowStats {
    num_windows: usize,
    occurrences: Vec<usize>,
    co_occurrences: HashMap<(usize, usize), usize>,
}

impl WindowStats {
    fn accumulate(texts: &[Vec<String>], relevant: &HashMap<&str, usize>, window: usize) -> Self {
        let mut stats = WindowStats {
            num_windows: 0,
            occurrences: vec![0; relevant.len()],
            co_occurrences: HashMap::new(),
        };

        for text in texts {
            if text.is_empty() {
                continue;
            }
            let ids: Vec<Option<usize>> = text.iter().map(|t| relevant.get(t.as_str()).copied()).collect();
            let size = window.min(ids.len());
            let mut in_window: HashMap<usize, usize> = HashMap::new();
            for id in ids[..size].iter().flatten() {
                *in_window.entry(*id).or_insert(0) += 1;
            }
            stats.record(&in_window);

            for start in 1..=(ids.len() - size) {
                if let Some(out) = ids[start - 1] {
                    if let Some(count) = in_window.get_mut(&out) {
                        *count -= 1;
                        if *count == 0 {
                            in_window.remove(&out);
                        }
                    }
                }
                if let Some(incoming) = ids[start + size - 1] {
                    *in_window.entry(incoming).or_insert(0) += 1;
                }
                stats.record(&in_window);
            }
        }
        stats
    }

    fn record(&mut self, in_window: &HashMap<usize, usize>) {
        self.num_windows += 1;
        let mut present: Vec<usize> = in_window.keys().copied().collect();
        present.sort_unstable();
        for (i, &a) in present.iter().enumerate() {
            self.occurrences[a] += 1;
            for &b in &present[i + 1..] {
                *self.co_occurrences.entry((a, b)).or_insert(0) += 1;
            }
        }
    }

    fn probability(&self, id: usize) -> f64 {
        self.occurrences[id] as f64 / self.num_windows as f64
    }

    fn joint_probability(&self, a: usize, b: usize) -> f64 {
        let count = if a == b {
            self.occurrences[a]
        } else {
            let key = if a < b { (a, b) } else { (b, a) };
            self.co_occurrences.get(&key).copied().unwrap_or(0)
        };
        count as f64 / self.num_windows as f64
    }

    fn npmi(&self, a: usize, b: usize) -> f64 {
        let joint = self.joint_probability(a, b) + EPSILON;
        let pmi = (joint / (self.probability(a) * self.probability(b))).ln();
        pmi / -joint.ln()
    }
}

/// Mean coherence of `topics` (lists of top words) measured on `texts`.
/// Words missing from the reference texts are skipped; a topic with no
/// known word at all is an error.
pub fn coherence(topics: &[Vec<String>], texts: &[Vec<String>], measure: Measure) -> Result<f64, MetricError> {
    if topics.is_empty() {
        return Err(MetricError::NoTopics);
    }
    let vocabulary: HashSet<&str> = texts.iter().flatten().map(String::as_str).collect();
    if vocabulary.is_empty() {
        return Err(MetricError::EmptyCorpus);
    }

    let mut relevant: HashMap<&str, usize> = HashMap::new();
    let mut topic_ids: Vec<Vec<usize>> = Vec::with_capacity(topics.len());
    for topic in topics {
        let mut ids = Vec::new();
        for word in topic {
            if !vocabulary.contains(word.as_str()) {
                continue;
            }
            let next = relevant.len();
            let id = *relevant.entry(word.as_str()).or_insert(next);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            let first = topic.first().cloned().unwrap_or_default();
            return Err(MetricError::UnknownToken(first));
        }
        topic_ids.push(ids);
    }

    let stats = WindowStats::accumulate(texts, &relevant, measure.window_size());
    let per_topic: Vec<f64> = topic_ids
        .iter()
        .map(|ids| match measure {
            Measure::Npmi => npmi_one_one(&stats, ids),
            Measure::Cv => cv_one_set(&stats, ids),
        })
        .collect();
    Ok(per_topic.iter().sum::<f64>() / per_topic.len() as f64)
}

/// Mean NPMI over every ordered pair of distinct topic words.
fn npmi_one_one(stats: &WindowStats, ids: &[usize]) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0;
    for (i, &a) in ids.iter().enumerate() {
        for (j, &b) in ids.iter().enumerate() {
            if i != j {
                total += stats.npmi(a, b);
                pairs += 1;
            }
        }
    }
    if pairs == 0 {
        return f64::NAN;
    }
    total / pairs as f64
}

/// Mean indirect cosine between each word's NPMI context vector and the
/// summed vector of the whole topic.
fn cv_one_set(stats: &WindowStats, ids: &[usize]) -> f64 {
    let vectors: Vec<Vec<f64>> = ids
        .iter()
        .map(|&w| ids.iter().map(|&c| stats.npmi(w, c)).collect())
        .collect();
    let topic_vector: Vec<f64> = (0..ids.len())
        .map(|j| vectors.iter().map(|v| v[j]).sum())
        .collect();

    let scores: Vec<f64> = vectors.iter().map(|v| cosine(v, &topic_vector)).collect();
    scores.iter().sum::<f64>() / scores.len() as f64
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    dot / (na * nb)
}

/// Scores reported for every fitted model. Failures and NaN become 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TopicScores {
    pub npmi: f64,
    pub cv: f64,
    pub diversity: f64,
}

impl TopicScores {
    pub fn evaluate(topics: &[ModeledTopic], texts: &[Vec<String>]) -> Self {
        let kept: Vec<&ModeledTopic> = topics.iter().filter(|t| !t.is_outlier()).collect();
        if kept.is_empty() {
            return TopicScores::default();
        }
        let word_lists: Vec<Vec<String>> = kept.iter().map(|t| t.top_words(t.words.len())).collect();

        TopicScores {
            npmi: or_zero(coherence(&word_lists, texts, Measure::Npmi), "npmi"),
            cv: or_zero(coherence(&word_lists, texts, Measure::Cv), "cv"),
            diversity: topic_diversity(topics, DIVERSITY_TOP_N),
        }
    }
}

fn or_zero(result: Result<f64, MetricError>, name: &str) -> f64 {
    match result {
        Ok(v) if v.is_finite() => v,
        Ok(_) => {
            warn!(metric = name, "coherence is NaN, using 0.0");
            0.0
        }
        Err(e) => {
            warn!(metric = name, error = %e, "coherence failed, using 0.0");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: i64, words: &[&str]) -> ModeledTopic {
        ModeledTopic {
            id,
            name: String::new(),
            words: words.iter().map(|w| (w.to_string(), 1.0)).collect(),
            count: 1,
        }
    }

    fn texts(raw: &[&str]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|d| d.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    fn ten_words(prefix: &str) -> Vec<String> {
        (0..10).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_diversity_disjoint_topics() {
        let a = ten_words("a");
        let b = ten_words("b");
        let topics = vec![
            topic(0, &a.iter().map(String::as_str).collect::<Vec<_>>()),
            topic(1, &b.iter().map(String::as_str).collect::<Vec<_>>()),
        ];
        assert_eq!(topic_diversity(&topics, 10), 1.0);
    }

    #[test]
    fn test_diversity_full_overlap() {
        let words = ten_words("w");
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        let topics: Vec<ModeledTopic> = (0..4).map(|i| topic(i, &refs)).collect();
        assert!((topic_diversity(&topics, 10) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_diversity_ignores_outliers() {
        let words = ten_words("w");
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        let topics = vec![topic(-1, &refs), topic(0, &refs)];
        assert_eq!(topic_diversity(&topics, 10), 1.0);
        assert_eq!(topic_diversity(&[], 10), 0.0);
    }

    #[test]
    fn test_npmi_always_together_is_one() {
        let t = texts(&["gizi anak", "gizi anak", "dana negara", "dana negara"]);
        let topics = vec![vec!["gizi".to_string(), "anak".to_string()]];
        let score = coherence(&topics, &t, Measure::Npmi).unwrap();
        assert!((score - 1.0).abs() < 1e-6, "{score}");
    }

    #[test]
    fn test_npmi_never_together_is_negative() {
        let t = texts(&["gizi sekolah", "anak sekolah", "gizi menu", "anak menu"]);
        let topics = vec![vec!["gizi".to_string(), "anak".to_string()]];
        let score = coherence(&topics, &t, Measure::Npmi).unwrap();
        assert!(score < -0.9, "{score}");
    }

    #[test]
    fn test_cv_in_unit_range() {
        let t = texts(&["gizi anak sekolah", "gizi anak", "dana negara", "anak sekolah menu"]);
        let topics = vec![
            vec!["gizi".to_string(), "anak".to_string(), "sekolah".to_string()],
            vec!["dana".to_string(), "negara".to_string()],
        ];
        let score = coherence(&topics, &t, Measure::Cv).unwrap();
        assert!(score > 0.0 && score <= 1.0 + 1e-9, "{score}");
    }

    #[test]
    fn test_sliding_window_counts() {
        let mut relevant = HashMap::new();
        relevant.insert("a", 0);
        relevant.insert("b", 1);
        let t = texts(&["a x x b", "a b"]);
        let stats = WindowStats::accumulate(&t, &relevant, 2);
        // windows: [a x] [x x] [x b] [a b]
        assert_eq!(stats.num_windows, 4);
        assert_eq!(stats.occurrences, vec![2, 2]);
        assert_eq!(stats.co_occurrences.get(&(0, 1)), Some(&1));
    }

    #[test]
    fn test_unknown_topic_is_error() {
        let t = texts(&["gizi anak"]);
        let topics = vec![vec!["asing".to_string()]];
        assert_eq!(
            coherence(&topics, &t, Measure::Npmi),
            Err(MetricError::UnknownToken("asing".into()))
        );
        assert_eq!(coherence(&[], &t, Measure::Npmi), Err(MetricError::NoTopics));
    }

    #[test]
    fn test_scores_default_to_zero_on_failure() {
        let t = texts(&["gizi anak"]);
        let topics = vec![topic(0, &["asing", "lain"]), topic(-1, &["gizi"])];
        let scores = TopicScores::evaluate(&topics, &t);
        assert_eq!(scores.npmi, 0.0);
        assert_eq!(scores.cv, 0.0);
        assert!((scores.diversity - 0.2).abs() < 1e-12);
    }
}
