use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::EmbedError;
use crate::runners::progress_bar;

/// Turns documents into dense vectors for clustering.
pub trait Embedder {
    fn label(&self) -> &str;

    /// One vector per input text, in input order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Which features a [`HashingEmbedder`] hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Features {
    /// Word n-grams from 1 up to `max_n`.
    Words { max_n: usize },
    /// Character n-grams inside word boundaries.
    CharNgrams { min_n: usize, max_n: usize },
}

impl Default for Features {
    fn default() -> Self {
        Features::Words { max_n: 1 }
    }
}

fn default_dim() -> usize {
    512
}

/// An embedder as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EmbedderSpec {
    Hashing {
        label: String,
        #[serde(default)]
        features: Features,
        #[serde(default = "default_dim")]
        dim: usize,
    },
    Http {
        label: String,
        base_url: String,
        model: String,
    },
}

impl EmbedderSpec {
    pub fn label(&self) -> &str {
        match self {
            EmbedderSpec::Hashing { label, .. } | EmbedderSpec::Http { label, .. } => label,
        }
    }

    /// The three variants compared when the config names none.
    pub fn defaults() -> Vec<EmbedderSpec> {
        vec![
            EmbedderSpec::Hashing {
                label: "Hash-Unigram".into(),
                features: Features::Words { max_n: 1 },
                dim: default_dim(),
            },
            EmbedderSpec::Hashing {
                label: "Hash-Bigram".into(),
                features: Features::Words { max_n: 2 },
                dim: default_dim(),
            },
            EmbedderSpec::Hashing {
                label: "Hash-CharNgram".into(),
                features: Features::CharNgrams { min_n: 3, max_n: 5 },
                dim: default_dim(),
            },
        ]
    }

    /// The embedder used when a configured one cannot be built or fails.
    pub fn fallback() -> EmbedderSpec {
        EmbedderSpec::Hashing {
            label: "Hash-Unigram".into(),
            features: Features::default(),
            dim: default_dim(),
        }
    }

    pub fn build(&self, api_key: Option<String>) -> Result<Box<dyn Embedder>, EmbedError> {
        match self {
            EmbedderSpec::Hashing { label, features, dim } => {
                Ok(Box::new(HashingEmbedder::new(label.clone(), features.clone(), *dim)))
            }
            EmbedderSpec::Http { label, base_url, model } => Ok(Box::new(HttpEmbedder::new(
                label.clone(),
                base_url,
                model.clone(),
                api_key,
            )?)),
        }
    }
}

/// TF-IDF weighted feature hashing, L2 normalised. IDF is learned from the
/// batch being embedded, so embed the whole corpus in one call.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    label: String,
    features: Features,
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(label: String, features: Features, dim: usize) -> Self {
        HashingEmbedder { label, features, dim: dim.max(1) }
    }

    fn features_of(&self, text: &str) -> HashMap<u64, usize> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut counts: HashMap<u64, usize> = HashMap::new();
        match &self.features {
            Features::Words { max_n } => {
                for n in 1..=(*max_n).max(1) {
                    for gram in words.windows(n) {
                        *counts.entry(xxh3_64(gram.join(" ").as_bytes())).or_insert(0) += 1;
                    }
                }
            }
            Features::CharNgrams { min_n, max_n } => {
                for word in &words {
                    let padded: Vec<char> = format!(" {word} ").chars().collect();
                    for n in (*min_n).max(1)..=*max_n {
                        for gram in padded.windows(n) {
                            let gram: String = gram.iter().collect();
                            *counts.entry(xxh3_64(gram.as_bytes())).or_insert(0) += 1;
                        }
                    }
                }
            }
        }
        counts
    }
}

impl Embedder for HashingEmbedder {
    fn label(&self) -> &str {
        &self.label
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let docs: Vec<HashMap<u64, usize>> = texts.iter().map(|t| self.features_of(t)).collect();

        let mut doc_freq: HashMap<u64, usize> = HashMap::new();
        for doc in &docs {
            for feature in doc.keys() {
                *doc_freq.entry(*feature).or_insert(0) += 1;
            }
        }
        let n = docs.len() as f64;

        let vectors = docs
            .iter()
            .map(|doc| {
                let mut v = vec![0.0f32; self.dim];
                for (feature, &tf) in doc {
                    let df = doc_freq[feature] as f64;
                    let idf = ((1.0 + n) / (1.0 + df)).ln() + 1.0;
                    let weight = (1.0 + (tf as f64).ln()) * idf;
                    let bucket = (feature % self.dim as u64) as usize;
                    let sign = if feature >> 63 == 0 { 1.0 } else { -1.0 };
                    v[bucket] += (sign * weight) as f32;
                }
                l2_normalize(&mut v);
                v
            })
            .collect();
        debug!(label = %self.label, documents = texts.len(), dim = self.dim, "hashed embeddings");
        Ok(vectors)
    }
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    label: String,
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    batch_size: usize,
}

impl HttpEmbedder {
    pub const BATCH_SIZE: usize = 32;

    pub fn new(label: String, base_url: &str, model: String, api_key: Option<String>) -> Result<Self, EmbedError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(EmbedError::Http("empty base_url".into()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(HttpEmbedder {
            label,
            client,
            base_url,
            model,
            api_key,
            batch_size: Self::BATCH_SIZE,
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let url = format!("{}/embeddings", self.base_url);
        let mut request = self.client.post(&url).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().unwrap_or_default();
            return Err(EmbedError::Api { status, message });
        }

        let mut body: EmbeddingResponse = response.json()?;
        if body.data.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                got: body.data.len(),
            });
        }
        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for HttpEmbedder {
    fn label(&self) -> &str {
        &self.label
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        info!(label = %self.label, model = %self.model, documents = texts.len(), "requesting embeddings");
        let pb = progress_bar(texts.len(), &format!("encoding {}", self.label));
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let mut batch_vectors = self.embed_batch(batch)?;
            for v in batch_vectors.iter_mut() {
                l2_normalize(v);
            }
            vectors.extend(batch_vectors);
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();
        Ok(vectors)
    }
}

/// Embeds with `embedder`, switching to the fallback embedder on failure.
/// Returns the label of the embedder that produced the vectors.
pub fn embed_with_fallback(embedder: &dyn Embedder, texts: &[String]) -> Result<(String, Vec<Vec<f32>>), EmbedError> {
    match embedder.embed(texts) {
        Ok(vectors) => Ok((embedder.label().to_string(), vectors)),
        Err(EmbedError::EmptyInput) => Err(EmbedError::EmptyInput),
        Err(e) => {
            let fallback = EmbedderSpec::fallback().build(None)?;
            warn!(
                failed = embedder.label(),
                fallback = fallback.label(),
                error = %e,
                "embedder failed, switching to fallback"
            );
            let vectors = fallback.embed(texts)?;
            Ok((fallback.label().to_string(), vectors))
        }
    }
}
