use std::collections::HashMap;

use counter::Counter;
use tracing::debug;

/// Bag-of-words entry: (token id, count in document).
pub type Bow = Vec<(usize, usize)>;

/// Token <-> id mapping with document frequencies.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    token2id: HashMap<String, usize>,
    id2token: Vec<String>,
    dfs: Vec<usize>,
    num_docs: usize,
}

impl Dictionary {
    pub fn from_documents(documents: &[Vec<String>]) -> Self {
        let mut dict = Dictionary::default();
        for doc in documents {
            dict.add_document(doc);
        }
        dict
    }

    pub fn add_document(&mut self, tokens: &[String]) {
        self.num_docs += 1;
        let mut seen: Vec<usize> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let id = match self.token2id.get(token) {
                Some(&id) => id,
                None => {
                    let id = self.id2token.len();
                    self.token2id.insert(token.clone(), id);
                    self.id2token.push(token.clone());
                    self.dfs.push(0);
                    id
                }
            };
            seen.push(id);
        }
        seen.sort_unstable();
        seen.dedup();
        for id in seen {
            self.dfs[id] += 1;
        }
    }

    /// Drops tokens in fewer than `no_below` documents or in more than
    /// `no_above` (a fraction) of them, then keeps the `keep_n` most
    /// frequent. Ids are reassigned densely, preserving relative order.
    pub fn filter_extremes(&mut self, no_below: usize, no_above: f64, keep_n: Option<usize>) {
        let max_df = (no_above * self.num_docs as f64) as usize;
        let mut good: Vec<usize> = (0..self.id2token.len())
            .filter(|&id| self.dfs[id] >= no_below && self.dfs[id] <= max_df)
            .collect();

        if let Some(keep_n) = keep_n {
            good.sort_by(|a, b| self.dfs[*b].cmp(&self.dfs[*a]).then(a.cmp(b)));
            good.truncate(keep_n);
            good.sort_unstable();
        }

        let before = self.id2token.len();
        let id2token: Vec<String> = good.iter().map(|&id| self.id2token[id].clone()).collect();
        let dfs: Vec<usize> = good.iter().map(|&id| self.dfs[id]).collect();
        self.token2id = id2token.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();
        self.id2token = id2token;
        self.dfs = dfs;
        debug!(before, after = self.id2token.len(), "filtered dictionary extremes");
    }

    /// Counts known tokens; unknown ones are ignored. Sorted by id.
    pub fn doc2bow(&self, tokens: &[String]) -> Bow {
        let mut counts: Counter<usize> = Counter::new();
        for token in tokens {
            if let Some(id) = self.id(token) {
                counts[&id] += 1;
            }
        }
        let mut bow: Bow = counts.into_iter().collect();
        bow.sort_unstable();
        bow
    }

    pub fn id(&self, token: &str) -> Option<usize> {
        self.token2id.get(token).copied()
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.id2token.get(id).map(String::as_str)
    }

    pub fn doc_freq(&self, id: usize) -> usize {
        self.dfs.get(id).copied().unwrap_or(0)
    }

    pub fn tokens(&self) -> &[String] {
        &self.id2token
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn len(&self) -> usize {
        self.id2token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2token.is_empty()
    }
}

/// Collocation detector joining frequent adjacent pairs into `a_b` tokens.
#[derive(Debug, Clone)]
pub struct Phrases {
    min_count: usize,
    threshold: f64,
    unigrams: Counter<String>,
    bigrams: HashMap<(String, String), usize>,
}

impl Phrases {
    pub const DELIMITER: char = '_';

    pub fn learn(documents: &[Vec<String>], min_count: usize, threshold: f64) -> Self {
        let mut unigrams: Counter<String> = Counter::new();
        let mut bigrams: HashMap<(String, String), usize> = HashMap::new();
        for doc in documents {
            unigrams.update(doc.iter().cloned());
            for pair in doc.windows(2) {
                *bigrams.entry((pair[0].clone(), pair[1].clone())).or_insert(0) += 1;
            }
        }
        debug!(unigrams = unigrams.len(), bigrams = bigrams.len(), "learned phrase statistics");
        Phrases { min_count, threshold, unigrams, bigrams }
    }

    /// `(count(ab) - min_count) / (count(a) * count(b)) * vocab_len`, or
    /// `None` when the pair was never seen or is below `min_count`.
    pub fn score(&self, a: &str, b: &str) -> Option<f64> {
        let ab = *self.bigrams.get(&(a.to_string(), b.to_string()))?;
        if ab < self.min_count {
            return None;
        }
        let ca = self.unigrams.get(a).copied().unwrap_or(0);
        let cb = self.unigrams.get(b).copied().unwrap_or(0);
        if ca == 0 || cb == 0 {
            return None;
        }
        let vocab_len = (self.unigrams.len() + self.bigrams.len()) as f64;
        Some((ab as f64 - self.min_count as f64) / (ca as f64 * cb as f64) * vocab_len)
    }

    /// Greedy left-to-right merge: a token joins at most one phrase.
    pub fn apply(&self, tokens: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            if i + 1 < tokens.len() {
                if let Some(score) = self.score(&tokens[i], &tokens[i + 1]) {
                    if score > self.threshold {
                        out.push(format!("{}{}{}", tokens[i], Self::DELIMITER, tokens[i + 1]));
                        i += 2;
                        continue;
                    }
                }
            }
            out.push(tokens[i].clone());
            i += 1;
        }
        out
    }

    pub fn apply_all(&self, documents: &[Vec<String>]) -> Vec<Vec<String>> {
        documents.iter().map(|d| self.apply(d)).collect()
    }
}
