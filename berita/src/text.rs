//! Text cleaning for the two modelling families.
//!
//! The embedding pipeline gets a light clean that keeps function words
//! ([`NewsPreprocessor`]). The probabilistic model gets a heavy one with a
//! large stoplist and a length filter ([`LdaCleaner`]). Do not merge them.

use std::sync::LazyLock;

use counter::Counter;
use regex::Regex;

use crate::stopwords::{LDA_STOPWORDS, NOISE};

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"http\S+|www\S+|https\S+").unwrap());
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.*?>").unwrap());
static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+@\S+").unwrap());
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());
static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"'([^']*)'|"([^"]*)""#).unwrap());

/// Light cleaner producing space-joined tokens for contextual embeddings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NewsPreprocessor;

impl NewsPreprocessor {
    pub fn new() -> Self {
        NewsPreprocessor
    }

    /// Lowercase, strip URLs/HTML/emails/digits, punctuation to spaces,
    /// drop non-ASCII, collapse whitespace.
    pub fn clean_text_basic(&self, text: &str) -> String {
        let text = text.to_lowercase();
        let text = URL.replace_all(&text, "");
        let text = HTML_TAG.replace_all(&text, "");
        let text = EMAIL.replace_all(&text, "");
        let text = DIGITS.replace_all(&text, "");
        let text: String = text
            .chars()
            .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
            .filter(|c| c.is_ascii())
            .collect();
        WHITESPACE.replace_all(&text, " ").trim().to_string()
    }

    /// Collapses any run of three or more identical characters to one.
    pub fn normalize_elongation(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let mut run = 1;
            while i + run < chars.len() && chars[i + run] == c {
                run += 1;
            }
            let keep = if run >= 3 { 1 } else { run };
            out.extend(std::iter::repeat(c).take(keep));
            i += run;
        }
        out
    }

    /// Full clean. An empty result means the caller should drop the document.
    pub fn process_row(&self, text: &str) -> String {
        let text = self.clean_text_basic(text);
        let text = self.normalize_elongation(&text);
        if text.is_empty() {
            return String::new();
        }
        text.split_whitespace()
            .filter(|t| !NOISE.contains(t))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Heavy cleaner for the probabilistic model: stopwords out, tokens of two
/// characters or fewer out.
#[derive(Debug, Default, Clone, Copy)]
pub struct LdaCleaner;

impl LdaCleaner {
    pub const MIN_DOC_TOKENS: usize = 4;

    pub fn new() -> Self {
        LdaCleaner
    }

    /// Accepts a space-joined string or a list literal like `['a', 'b']`.
    pub fn tokens(&self, item: &str) -> Vec<String> {
        let raw: Vec<String> = if item.trim_start().starts_with('[') {
            QUOTED
                .captures_iter(item)
                .filter_map(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str().to_string())
                .collect()
        } else {
            item.split_whitespace().map(str::to_string).collect()
        };

        raw.into_iter()
            .filter(|w| !LDA_STOPWORDS.contains(w.to_lowercase().as_str()) && w.chars().count() > 2)
            .collect()
    }

    /// Tokenises every text and keeps documents with more than three tokens.
    pub fn prepare_documents<'a, I>(&self, texts: I) -> Vec<Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        texts
            .into_iter()
            .map(|t| self.tokens(t))
            .filter(|tokens| tokens.len() >= Self::MIN_DOC_TOKENS)
            .collect()
    }
}

/// `\w+` tokens, lowercased.
pub fn word_tokens(text: &str) -> Vec<String> {
    WORD.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// [`word_tokens`] longer than two characters.
pub fn lda_tokens(text: &str) -> Vec<String> {
    word_tokens(text)
        .into_iter()
        .filter(|t| t.chars().count() > 2)
        .collect()
}

/// Size and vocabulary figures for a set of documents.
#[derive(Debug, Clone)]
pub struct CorpusStats {
    pub documents: usize,
    pub total_words: usize,
    pub mean_words: f64,
    pub vocabulary: usize,
    pub doc_lengths: Vec<usize>,
    pub word_counts: Counter<String>,
}

impl CorpusStats {
    pub fn compute<'a, I>(texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut doc_lengths = Vec::new();
        let mut word_counts: Counter<String> = Counter::new();
        for text in texts {
            let words: Vec<&str> = text.split_whitespace().collect();
            doc_lengths.push(words.len());
            word_counts.update(words.into_iter().map(str::to_string));
        }
        let total_words: usize = doc_lengths.iter().sum();
        let documents = doc_lengths.len();
        CorpusStats {
            documents,
            total_words,
            mean_words: if documents == 0 { 0.0 } else { total_words as f64 / documents as f64 },
            vocabulary: word_counts.len(),
            doc_lengths,
            word_counts,
        }
    }

    pub fn most_common(&self, n: usize) -> Vec<(String, usize)> {
        let mut top = self.word_counts.most_common_ordered();
        top.truncate(n);
        top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_drops_url_noise_and_punctuation() {
        let p = NewsPreprocessor::new();
        let out = p.process_row("Baca juga: Halo!! http://x.com");
        assert_eq!(out, "halo");
    }

    #[test]
    fn test_clean_text_basic_strips_markup_digits_and_non_ascii() {
        let p = NewsPreprocessor::new();
        let out = p.clean_text_basic("<p>Harga Rp15.000</p> naik 20% — kata budi@mail.com di www.site.id");
        assert_eq!(out, "harga rp naik kata di");
        assert!(!out.chars().any(|c| c.is_ascii_digit() || c.is_ascii_punctuation()));
    }

    #[test]
    fn test_elongation() {
        let p = NewsPreprocessor::new();
        assert_eq!(p.normalize_elongation("mantappp"), "mantap");
        assert_eq!(p.normalize_elongation("hallooo"), "hallo");
        // doubled letters are real Indonesian spelling
        assert_eq!(p.normalize_elongation("saat tanggal"), "saat tanggal");
    }

    #[test]
    fn test_process_row_keeps_function_words() {
        let p = NewsPreprocessor::new();
        let out = p.process_row("Menu yang dibagikan di sekolah, Senin (17/11). Simak selengkapnya!");
        assert_eq!(out, "menu yang dibagikan di sekolah");
    }

    #[test]
    fn test_process_row_empty() {
        let p = NewsPreprocessor::new();
        assert_eq!(p.process_row("12345 !!! http://a.b"), "");
        assert_eq!(p.process_row("Baca juga halaman ini"), "");
    }

    #[test]
    fn test_lda_cleaner_filters_stopwords_and_short_tokens() {
        let c = LdaCleaner::new();
        let tokens = c.tokens("program makan bergizi yang di sekolah dan anak");
        assert_eq!(tokens, vec!["program", "makan", "bergizi", "sekolah", "anak"]);
    }

    #[test]
    fn test_lda_cleaner_reads_list_literal() {
        let c = LdaCleaner::new();
        let tokens = c.tokens("['anggaran', 'yang', 'gizi', 'ke']");
        assert_eq!(tokens, vec!["anggaran", "gizi"]);
    }

    #[test]
    fn test_prepare_documents_drops_short_docs() {
        let c = LdaCleaner::new();
        let docs = c.prepare_documents(vec![
            "anggaran makan gizi sekolah",
            "anggaran dan gizi",
        ]);
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_word_tokens() {
        assert_eq!(word_tokens("Gizi Anak, di-SD"), vec!["gizi", "anak", "di", "sd"]);
        assert_eq!(lda_tokens("Gizi Anak, di-SD"), vec!["gizi", "anak"]);
    }

    #[test]
    fn test_corpus_stats() {
        let stats = CorpusStats::compute(vec!["a b c", "a b", ""]);
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.total_words, 5);
        assert_eq!(stats.vocabulary, 3);
        assert!((stats.mean_words - 5.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.most_common(1), vec![("a".to_string(), 2)]);
    }
}
