use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the batch runners before any per-row policy kicks in.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("no documents left after filtering ({stage})")]
    EmptyCorpus { stage: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failures while fetching or extracting a single page.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("content too short ({chars} chars)")]
    TooShort { chars: usize },

    #[error("no article text found")]
    NoContent,
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Network(err.to_string())
    }
}

/// Reasons a coherence score cannot be computed for a topic set.
#[derive(Debug, Error, PartialEq)]
pub enum MetricError {
    #[error("no topics to score")]
    NoTopics,

    #[error("reference corpus is empty")]
    EmptyCorpus,

    #[error("topic word '{0}' does not occur in the reference corpus")]
    UnknownToken(String),
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Http(String),

    #[error("embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("expected {expected} embeddings, got {got}")]
    CountMismatch { expected: usize, got: usize },

    #[error("nothing to embed")]
    EmptyInput,
}

impl From<reqwest::Error> for EmbedError {
    fn from(err: reqwest::Error) -> Self {
        EmbedError::Http(err.to_string())
    }
}
