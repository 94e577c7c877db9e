use std::collections::{BTreeMap, VecDeque};
use std::sync::LazyLock;

use counter::Counter;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embedding::l2_normalize;
use crate::error::PipelineError;
use crate::models::{topic_label, ModeledTopic, OUTLIER_TOPIC};
use crate::stopwords::VECTORIZER_STOPWORDS;

static VECTORIZER_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

const MIN_EPS: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    pub min_cluster_size: usize,
    pub min_samples: usize,
    /// Neighbourhood radius in cosine distance. `None` picks the median
    /// distance to the `min_samples`-th neighbour.
    pub eps: Option<f32>,
    pub top_n_words: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        ClusterParams {
            min_cluster_size: 15,
            min_samples: 10,
            eps: None,
            top_n_words: 10,
        }
    }
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (na * nb)).clamp(0.0, 2.0)
}

/// Density-based clustering over cosine distance. Returns one label per
/// point: clusters numbered from 0 by descending size, outliers as -1.
pub fn density_clusters(embeddings: &[Vec<f32>], params: &ClusterParams) -> Vec<i64> {
    let n = embeddings.len();
    if n == 0 {
        return Vec::new();
    }
    let min_samples = params.min_samples.clamp(1, n);

    let eps = match params.eps {
        Some(eps) => eps,
        None => {
            let mut core_distances: Vec<f32> = (0..n)
                .into_par_iter()
                .map(|i| {
                    let mut d: Vec<f32> = embeddings.iter().map(|e| cosine_distance(&embeddings[i], e)).collect();
                    let (_, kth, _) = d.select_nth_unstable_by(min_samples - 1, f32::total_cmp);
                    *kth
                })
                .collect();
            core_distances.sort_by(f32::total_cmp);
            core_distances[n / 2]
        }
    }
    .max(MIN_EPS);

    let neighbours: Vec<Vec<usize>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .filter(|&j| cosine_distance(&embeddings[i], &embeddings[j]) <= eps)
                .collect()
        })
        .collect();
    let core: Vec<bool> = neighbours.iter().map(|nb| nb.len() >= min_samples).collect();
    debug!(
        points = n,
        eps,
        core_points = core.iter().filter(|c| **c).count(),
        "computed neighbourhoods"
    );

    // Expand clusters from unvisited core points
    let mut raw = vec![OUTLIER_TOPIC; n];
    let mut next_id: i64 = 0;
    for start in 0..n {
        if !core[start] || raw[start] != OUTLIER_TOPIC {
            continue;
        }
        raw[start] = next_id;
        let mut queue = VecDeque::from([start]);
        while let Some(p) = queue.pop_front() {
            if !core[p] {
                continue;
            }
            for &q in &neighbours[p] {
                if raw[q] == OUTLIER_TOPIC {
                    raw[q] = next_id;
                    queue.push_back(q);
                }
            }
        }
        next_id += 1;
    }

    // Drop small clusters, renumber the rest by size
    let mut sizes: Vec<(i64, usize)> = (0..next_id)
        .map(|c| (c, raw.iter().filter(|&&l| l == c).count()))
        .filter(|&(_, size)| size >= params.min_cluster_size)
        .collect();
    sizes.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let remap: BTreeMap<i64, i64> = sizes
        .iter()
        .enumerate()
        .map(|(new, &(old, _))| (old, new as i64))
        .collect();

    let labels: Vec<i64> = raw
        .iter()
        .map(|l| remap.get(l).copied().unwrap_or(OUTLIER_TOPIC))
        .collect();
    info!(
        clusters = remap.len(),
        outliers = labels.iter().filter(|&&l| l == OUTLIER_TOPIC).count(),
        "density clustering done"
    );
    labels
}

/// Appends a scaled one-hot block for each document's supervising label
/// and re-normalises, so documents sharing a label move closer together.
pub fn guide_embeddings(embeddings: &[Vec<f32>], labels: &[usize], weight: f32) -> Vec<Vec<f32>> {
    let num_labels = labels.iter().max().map_or(0, |m| m + 1);
    embeddings
        .iter()
        .zip(labels)
        .map(|(e, &label)| {
            let mut v = e.clone();
            l2_normalize(&mut v);
            let mut block = vec![0.0f32; num_labels];
            block[label] = weight;
            v.extend(block);
            l2_normalize(&mut v);
            v
        })
        .collect()
}

/// Count-vectoriser tokens: two or more word characters, lowercased,
/// stopwords removed.
pub fn vectorizer_tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    VECTORIZER_TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !VECTORIZER_STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Class-based TF-IDF: each cluster's documents form one class document;
/// a word scores `tf_l1 * ln(1 + A / f)` where `A` is the mean class size in
/// words and `f` the word's frequency over all classes.
pub fn class_tfidf(docs: &[String], labels: &[i64], top_n: usize) -> BTreeMap<i64, Vec<(String, f64)>> {
    let mut classes: BTreeMap<i64, Counter<String>> = BTreeMap::new();
    for (doc, &label) in docs.iter().zip(labels) {
        classes.entry(label).or_default().update(vectorizer_tokens(doc));
    }

    let mut frequency: Counter<String> = Counter::new();
    for counts in classes.values() {
        for (word, &c) in counts.iter() {
            frequency[word] += c;
        }
    }
    let class_totals: BTreeMap<i64, usize> = classes.iter().map(|(l, c)| (*l, c.values().sum())).collect();
    let avg_words = if classes.is_empty() {
        0.0
    } else {
        (class_totals.values().sum::<usize>() / classes.len()) as f64
    };

    classes
        .iter()
        .map(|(&label, counts)| {
            let total = class_totals[&label].max(1) as f64;
            let mut scored: Vec<(String, f64)> = counts
                .iter()
                .map(|(word, &c)| {
                    let idf = (avg_words / frequency[word] as f64 + 1.0).ln();
                    (word.clone(), c as f64 / total * idf)
                })
                .filter(|(_, s)| *s > 0.0)
                .collect();
            scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            scored.truncate(top_n);
            (label, scored)
        })
        .collect()
}

/// One row of the topic overview table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicInfo {
    #[serde(rename = "Topic")]
    pub topic: i64,
    #[serde(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Embedding clusters with c-TF-IDF word representations.
#[derive(Debug, Clone)]
pub struct ClusterTopicModel {
    labels: Vec<i64>,
    topics: Vec<ModeledTopic>, // ascending id, outlier bucket first when present
}

impl ClusterTopicModel {
    pub fn fit(docs: &[String], embeddings: &[Vec<f32>], params: &ClusterParams) -> Result<Self, PipelineError> {
        if docs.is_empty() {
            return Err(PipelineError::EmptyCorpus { stage: "clustering" });
        }
        if docs.len() != embeddings.len() {
            return Err(PipelineError::Config(format!(
                "{} documents but {} embeddings",
                docs.len(),
                embeddings.len()
            )));
        }

        let labels = density_clusters(embeddings, params);
        let representations = class_tfidf(docs, &labels, params.top_n_words);
        let topics = representations
            .into_iter()
            .map(|(id, words)| ModeledTopic {
                id,
                name: topic_label(id, &words),
                count: labels.iter().filter(|&&l| l == id).count(),
                words,
            })
            .collect();
        Ok(ClusterTopicModel { labels, topics })
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn topics(&self) -> &[ModeledTopic] {
        &self.topics
    }

    pub fn get_topic(&self, id: i64) -> Option<&ModeledTopic> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// Topics that are not the outlier bucket.
    pub fn num_topics(&self) -> usize {
        self.topics.iter().filter(|t| !t.is_outlier()).count()
    }

    pub fn topic_info(&self) -> Vec<TopicInfo> {
        self.topics
            .iter()
            .map(|t| TopicInfo {
                topic: t.id,
                count: t.count,
                name: t.name.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(dim: usize, i: usize, jitter: f32) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[i] = 1.0;
        v[(i + 1) % dim] = jitter;
        v
    }

    fn groups() -> Vec<Vec<f32>> {
        let mut e = Vec::new();
        for k in 0..16 {
            e.push(axis(4, 1, k as f32 * 0.001));
        }
        for k in 0..20 {
            e.push(axis(4, 0, k as f32 * 0.001));
        }
        e.push(axis(4, 3, 0.0));
        e
    }

    #[test]
    fn test_clusters_numbered_by_size_with_outlier() {
        let params = ClusterParams {
            min_cluster_size: 15,
            min_samples: 5,
            eps: Some(0.1),
            top_n_words: 10,
        };
        let labels = density_clusters(&groups(), &params);
        assert!(labels[..16].iter().all(|&l| l == 1));
        assert!(labels[16..36].iter().all(|&l| l == 0));
        assert_eq!(labels[36], -1);
    }

    #[test]
    fn test_small_clusters_become_outliers() {
        let params = ClusterParams {
            min_cluster_size: 18,
            min_samples: 5,
            eps: Some(0.1),
            top_n_words: 10,
        };
        let labels = density_clusters(&groups(), &params);
        assert!(labels[..16].iter().all(|&l| l == -1));
        assert!(labels[16..36].iter().all(|&l| l == 0));
    }

    #[test]
    fn test_automatic_eps() {
        let params = ClusterParams {
            min_cluster_size: 15,
            min_samples: 5,
            eps: None,
            top_n_words: 10,
        };
        let labels = density_clusters(&groups(), &params);
        assert!(labels[16..36].iter().all(|&l| l == 0));
        assert_eq!(labels[36], -1);
        assert!(density_clusters(&[], &params).is_empty());
    }

    #[test]
    fn test_guidance_pulls_same_label_together() {
        let e = vec![vec![1.0, 0.0], vec![0.8, 0.6], vec![0.8, 0.6]];
        let guided = guide_embeddings(&e, &[0, 0, 1], 1.0);
        assert_eq!(guided[0].len(), 4);
        let same = cosine_distance(&guided[0], &guided[1]);
        let other = cosine_distance(&guided[0], &guided[2]);
        assert!(same < other);
        assert!(cosine_distance(&e[0], &e[1]) > same);
    }

    #[test]
    fn test_vectorizer_tokens_drop_stopwords_and_single_chars() {
        assert_eq!(vectorizer_tokens("Menu yang a Gizi di sekolah"), vec!["menu", "gizi", "sekolah"]);
    }

    #[test]
    fn test_class_tfidf_prefers_distinctive_words() {
        let docs = vec![
            "gizi anak sekolah gizi".to_string(),
            "gizi menu sekolah".to_string(),
            "anggaran negara sekolah".to_string(),
            "anggaran dana".to_string(),
        ];
        let reps = class_tfidf(&docs, &[0, 0, 1, 1], 3);
        assert_eq!(reps[&0][0].0, "gizi");
        assert_eq!(reps[&1][0].0, "anggaran");
        assert!(reps[&0].iter().all(|(w, _)| w != "anggaran"));
    }

    #[test]
    fn test_fit_builds_topic_table() {
        let e = groups();
        let mut docs = Vec::new();
        for _ in 0..16 {
            docs.push("anggaran negara triliun".to_string());
        }
        for _ in 0..20 {
            docs.push("gizi anak sekolah".to_string());
        }
        docs.push("cuaca hujan".to_string());
        let params = ClusterParams {
            min_cluster_size: 15,
            min_samples: 5,
            eps: Some(0.1),
            top_n_words: 10,
        };
        let model = ClusterTopicModel::fit(&docs, &e, &params).unwrap();
        let info = model.topic_info();
        assert_eq!(info.iter().map(|t| t.topic).collect::<Vec<_>>(), vec![-1, 0, 1]);
        assert_eq!(info[1].count, 20);
        assert!(info[1].name.starts_with("0_"));
        assert_eq!(model.num_topics(), 2);
        assert!(model.get_topic(1).unwrap().top_words(3).contains(&"anggaran".to_string()));
        assert!(ClusterTopicModel::fit(&docs, &e[..3], &params).is_err());
    }
}
