use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::corpus::{Bow, Dictionary};
use crate::error::PipelineError;
use crate::models::{topic_label, ModeledTopic};

/// Dirichlet prior policy. `Symmetric` is `1 / num_topics`; `Auto` starts
/// there and is re-estimated from the sampler state after every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prior {
    Symmetric,
    Auto,
}

#[derive(Debug, Clone)]
pub struct LdaConfig {
    pub num_topics: usize,
    pub passes: usize,
    pub sweeps_per_pass: usize,
    pub alpha: Prior, // document-topic
    pub eta: Prior,   // topic-word
    pub seed: u64,
}

impl Default for LdaConfig {
    fn default() -> Self {
        LdaConfig {
            num_topics: 10,
            passes: 20,
            sweeps_per_pass: 10,
            alpha: Prior::Symmetric,
            eta: Prior::Symmetric,
            seed: 42,
        }
    }
}

/// Collapsed Gibbs LDA over a bag-of-words corpus.
#[derive(Debug, Clone)]
pub struct LdaModel {
    num_topics: usize,
    vocabulary: Vec<String>,
    alpha: Vec<f64>,
    eta: f64,
    word_topic_counts: Vec<Vec<usize>>, // words x topics
    topic_counts: Vec<usize>,
    doc_topic_matrix: Vec<Vec<f64>>,    // documents x topics
}

/// Mutable sampler state; dropped once the model is trained.
struct Sampler {
    docs: Vec<Vec<usize>>,
    assignments: Vec<Vec<usize>>,
    word_topic_counts: Vec<Vec<usize>>,
    doc_topic_counts: Vec<Vec<usize>>,
    topic_counts: Vec<usize>,
    alpha: Vec<f64>,
    eta: f64,
}

impl LdaModel {
    pub fn train(bows: &[Bow], dictionary: &Dictionary, config: &LdaConfig) -> Result<Self, PipelineError> {
        if config.num_topics == 0 {
            return Err(PipelineError::Config("num_topics must be positive".into()));
        }
        if dictionary.is_empty() || bows.iter().all(|b| b.is_empty()) {
            return Err(PipelineError::EmptyCorpus { stage: "lda" });
        }

        let vocab_size = dictionary.len();
        let k = config.num_topics;
        let mut rng = StdRng::seed_from_u64(config.seed);

        // Step 1: expand bag-of-words into token sequences
        let docs: Vec<Vec<usize>> = bows
            .iter()
            .map(|bow| {
                bow.iter()
                    .flat_map(|&(id, count)| std::iter::repeat(id).take(count))
                    .collect()
            })
            .collect();

        // Step 2: random initial assignment
        let mut sampler = Sampler {
            assignments: Vec::with_capacity(docs.len()),
            word_topic_counts: vec![vec![0; k]; vocab_size],
            doc_topic_counts: vec![vec![0; k]; docs.len()],
            topic_counts: vec![0; k],
            alpha: vec![1.0 / k as f64; k],
            eta: 1.0 / k as f64,
            docs,
        };
        for (doc_id, doc) in sampler.docs.iter().enumerate() {
            let mut topics = Vec::with_capacity(doc.len());
            for &word_id in doc {
                let topic = rng.gen_range(0..k);
                sampler.word_topic_counts[word_id][topic] += 1;
                sampler.doc_topic_counts[doc_id][topic] += 1;
                sampler.topic_counts[topic] += 1;
                topics.push(topic);
            }
            sampler.assignments.push(topics);
        }

        // Step 3: sample, re-estimating priors between passes
        for pass in 0..config.passes {
            for _ in 0..config.sweeps_per_pass {
                sampler.sweep(&mut rng);
            }
            if config.alpha == Prior::Auto {
                sampler.update_alpha();
            }
            if config.eta == Prior::Auto {
                sampler.update_eta();
            }
            debug!(pass = pass + 1, passes = config.passes, eta = sampler.eta, "lda pass complete");
        }

        let doc_topic_matrix = sampler.normalize_doc_topic_matrix();
        info!(
            topics = k,
            documents = doc_topic_matrix.len(),
            vocabulary = vocab_size,
            "trained lda model"
        );

        Ok(LdaModel {
            num_topics: k,
            vocabulary: dictionary.tokens().to_vec(),
            alpha: sampler.alpha,
            eta: sampler.eta,
            word_topic_counts: sampler.word_topic_counts,
            topic_counts: sampler.topic_counts,
            doc_topic_matrix,
        })
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    pub fn eta(&self) -> f64 {
        self.eta
    }

    /// Topic-word probabilities, topics x vocabulary.
    pub fn topic_word_matrix(&self) -> Vec<Vec<f64>> {
        let v = self.vocabulary.len() as f64;
        (0..self.num_topics)
            .map(|topic| {
                let denom = self.topic_counts[topic] as f64 + v * self.eta;
                self.word_topic_counts
                    .iter()
                    .map(|counts| (counts[topic] as f64 + self.eta) / denom)
                    .collect()
            })
            .collect()
    }

    /// Posterior topic mixture of each training document.
    pub fn doc_topic_matrix(&self) -> &[Vec<f64>] {
        &self.doc_topic_matrix
    }

    /// Topic mixture of any document, folded in against the trained
    /// topic-word distributions with the document prior held fixed.
    pub fn document_topics(&self, bow: &Bow) -> Vec<f64> {
        let phi = self.topic_word_matrix();
        let total: usize = bow.iter().map(|(_, c)| c).sum();
        let mut gamma: Vec<f64> = self
            .alpha
            .iter()
            .map(|a| a + total as f64 / self.num_topics as f64)
            .collect();

        for _ in 0..50 {
            let mut next = self.alpha.clone();
            for &(word_id, count) in bow {
                if word_id >= self.vocabulary.len() {
                    continue;
                }
                let weights: Vec<f64> = (0..self.num_topics).map(|k| phi[k][word_id] * gamma[k]).collect();
                let norm: f64 = weights.iter().sum();
                if norm <= 0.0 {
                    continue;
                }
                for (k, w) in weights.iter().enumerate() {
                    next[k] += count as f64 * w / norm;
                }
            }
            let delta: f64 = next.iter().zip(&gamma).map(|(a, b)| (a - b).abs()).sum();
            gamma = next;
            if delta < 1e-6 {
                break;
            }
        }

        let sum: f64 = gamma.iter().sum();
        gamma.into_iter().map(|g| g / sum).collect()
    }

    /// Highest-probability topic; ties go to the lower id.
    pub fn dominant_topic(&self, bow: &Bow) -> usize {
        argmax(&self.document_topics(bow))
    }

    pub fn dominant_topics(&self) -> Vec<usize> {
        self.doc_topic_matrix.iter().map(|row| argmax(row)).collect()
    }

    /// Mean share of each topic over the training documents.
    pub fn topic_prevalence(&self) -> Vec<f64> {
        let n = self.doc_topic_matrix.len().max(1) as f64;
        (0..self.num_topics)
            .map(|k| self.doc_topic_matrix.iter().map(|row| row[k]).sum::<f64>() / n)
            .collect()
    }

    /// Every topic with its `num_words` heaviest words.
    pub fn show_topics(&self, num_words: usize) -> Vec<ModeledTopic> {
        let phi = self.topic_word_matrix();
        let mut counts = vec![0; self.num_topics];
        for topic in self.dominant_topics() {
            counts[topic] += 1;
        }

        phi.iter()
            .enumerate()
            .map(|(topic_id, row)| {
                let mut word_probs: Vec<(String, f64)> = self
                    .vocabulary
                    .iter()
                    .zip(row)
                    .map(|(word, &p)| (word.clone(), p))
                    .collect();
                word_probs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                word_probs.truncate(num_words);
                ModeledTopic {
                    id: topic_id as i64,
                    name: topic_label(topic_id as i64, &word_probs),
                    words: word_probs,
                    count: counts[topic_id],
                }
            })
            .collect()
    }
}

impl Sampler {
    fn sweep(&mut self, rng: &mut StdRng) {
        let k = self.topic_counts.len();
        let v_eta = self.word_topic_counts.len() as f64 * self.eta;
        let mut weights = vec![0.0; k];

        for doc_id in 0..self.docs.len() {
            for pos in 0..self.docs[doc_id].len() {
                let word_id = self.docs[doc_id][pos];
                let old_topic = self.assignments[doc_id][pos];

                // Remove current assignment
                self.word_topic_counts[word_id][old_topic] -= 1;
                self.doc_topic_counts[doc_id][old_topic] -= 1;
                self.topic_counts[old_topic] -= 1;

                let mut total = 0.0;
                for topic in 0..k {
                    let word_prob = (self.word_topic_counts[word_id][topic] as f64 + self.eta)
                        / (self.topic_counts[topic] as f64 + v_eta);
                    let doc_prob = self.doc_topic_counts[doc_id][topic] as f64 + self.alpha[topic];
                    total += word_prob * doc_prob;
                    weights[topic] = total;
                }
                let draw = rng.gen::<f64>() * total;
                let new_topic = weights.iter().position(|&w| draw < w).unwrap_or(k - 1);

                self.word_topic_counts[word_id][new_topic] += 1;
                self.doc_topic_counts[doc_id][new_topic] += 1;
                self.topic_counts[new_topic] += 1;
                self.assignments[doc_id][pos] = new_topic;
            }
        }
    }

    /// Minka's fixed-point update for an asymmetric document prior.
    fn update_alpha(&mut self) {
        let alpha_sum: f64 = self.alpha.iter().sum();
        let denom: f64 = self
            .docs
            .iter()
            .map(|doc| digamma(doc.len() as f64 + alpha_sum) - digamma(alpha_sum))
            .sum();
        if denom <= 0.0 {
            return;
        }
        for topic in 0..self.alpha.len() {
            let a = self.alpha[topic];
            let numer: f64 = self
                .doc_topic_counts
                .iter()
                .map(|counts| digamma(counts[topic] as f64 + a) - digamma(a))
                .sum();
            let updated = a * numer / denom;
            if updated.is_finite() {
                self.alpha[topic] = updated.max(MIN_PRIOR);
            }
        }
    }

    /// Minka's fixed-point update for a symmetric topic-word prior.
    fn update_eta(&mut self) {
        let v = self.word_topic_counts.len() as f64;
        let eta = self.eta;
        let denom: f64 = self
            .topic_counts
            .iter()
            .map(|&n| digamma(n as f64 + v * eta) - digamma(v * eta))
            .sum::<f64>()
            * v;
        if denom <= 0.0 {
            return;
        }
        let numer: f64 = self
            .word_topic_counts
            .iter()
            .flat_map(|row| row.iter())
            .map(|&n| digamma(n as f64 + eta) - digamma(eta))
            .sum();
        let updated = eta * numer / denom;
        if updated.is_finite() {
            self.eta = updated.max(MIN_PRIOR);
        }
    }

    fn normalize_doc_topic_matrix(&self) -> Vec<Vec<f64>> {
        let alpha_sum: f64 = self.alpha.iter().sum();
        self.doc_topic_counts
            .iter()
            .map(|counts| {
                let total: usize = counts.iter().sum();
                counts
                    .iter()
                    .zip(&self.alpha)
                    .map(|(&c, a)| (c as f64 + a) / (total as f64 + alpha_sum))
                    .collect()
            })
            .collect()
    }
}

const MIN_PRIOR: f64 = 1e-5;

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Digamma via upward recurrence and the asymptotic series.
pub fn digamma(mut x: f64) -> f64 {
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    result + x.ln() - 0.5 * inv
        - inv2 * (1.0 / 12.0 - inv2 * (1.0 / 120.0 - inv2 * (1.0 / 252.0 - inv2 * (1.0 / 240.0 - inv2 / 132.0))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_theme_corpus() -> (Vec<Vec<String>>, Dictionary) {
        let mut docs = Vec::new();
        for i in 0..10 {
            let a = ["gizi", "anak", "sekolah", "menu"];
            let b = ["anggaran", "dana", "triliun", "negara"];
            let theme = if i % 2 == 0 { a } else { b };
            let doc: Vec<String> = theme.iter().chain(theme.iter()).map(|w| w.to_string()).collect();
            docs.push(doc);
        }
        let dict = Dictionary::from_documents(&docs);
        (docs, dict)
    }

    #[test]
    fn test_digamma_known_values() {
        assert!((digamma(1.0) + 0.577_215_664_9).abs() < 1e-8);
        assert!((digamma(0.5) + 1.963_510_026_0).abs() < 1e-8);
        assert!((digamma(10.0) - 2.251_752_589_1).abs() < 1e-8);
    }

    #[test]
    fn test_separates_disjoint_themes() {
        let (docs, dict) = two_theme_corpus();
        let bows: Vec<Bow> = docs.iter().map(|d| dict.doc2bow(d)).collect();
        let config = LdaConfig { num_topics: 2, ..LdaConfig::default() };
        let model = LdaModel::train(&bows, &dict, &config).unwrap();

        let labels = model.dominant_topics();
        assert!(labels.iter().step_by(2).all(|&t| t == labels[0]));
        assert!(labels.iter().skip(1).step_by(2).all(|&t| t == labels[1]));
        assert_ne!(labels[0], labels[1]);
        for (bow, label) in bows.iter().zip(&labels) {
            assert_eq!(model.dominant_topic(bow), *label);
        }
    }

    #[test]
    fn test_distributions_are_normalised() {
        let (docs, dict) = two_theme_corpus();
        let bows: Vec<Bow> = docs.iter().map(|d| dict.doc2bow(d)).collect();
        let config = LdaConfig { num_topics: 3, passes: 2, ..LdaConfig::default() };
        let model = LdaModel::train(&bows, &dict, &config).unwrap();

        for row in model.topic_word_matrix() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        for row in model.doc_topic_matrix() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        assert!((model.topic_prevalence().iter().sum::<f64>() - 1.0).abs() < 1e-9);
        let topics = model.show_topics(3);
        assert_eq!(topics.len(), 3);
        assert_eq!(topics.iter().map(|t| t.count).sum::<usize>(), docs.len());
        assert!(topics.iter().all(|t| t.words.len() == 3));
    }

    #[test]
    fn test_same_seed_same_model() {
        let (docs, dict) = two_theme_corpus();
        let bows: Vec<Bow> = docs.iter().map(|d| dict.doc2bow(d)).collect();
        let config = LdaConfig { num_topics: 2, passes: 3, ..LdaConfig::default() };
        let a = LdaModel::train(&bows, &dict, &config).unwrap();
        let b = LdaModel::train(&bows, &dict, &config).unwrap();
        assert_eq!(a.doc_topic_matrix(), b.doc_topic_matrix());
    }

    #[test]
    fn test_auto_priors_stay_positive() {
        let (docs, dict) = two_theme_corpus();
        let bows: Vec<Bow> = docs.iter().map(|d| dict.doc2bow(d)).collect();
        let config = LdaConfig {
            num_topics: 2,
            passes: 5,
            alpha: Prior::Auto,
            eta: Prior::Auto,
            ..LdaConfig::default()
        };
        let model = LdaModel::train(&bows, &dict, &config).unwrap();
        assert!(model.alpha().iter().all(|a| a.is_finite() && *a > 0.0));
        assert!(model.eta().is_finite() && model.eta() > 0.0);
    }

    #[test]
    fn test_empty_corpus_is_an_error() {
        let dict = Dictionary::default();
        let err = LdaModel::train(&[], &dict, &LdaConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyCorpus { .. }));
    }
}
