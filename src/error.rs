//! Error taxonomy for the fetch and delivery pipelines.
//!
//! Leaf collaborators carry their own `Cancelled` variant. Converting any of
//! them into [`PipelineError`] routes cancellation to
//! [`PipelineError::Cancelled`] so callers never log it as a failure.

use reqwest::StatusCode;

use crate::llm::openai::OpenAiError;

/// Source adapter failures (network or feed parse).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to parse feed {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: rss::Error,
    },

    #[error("fetch cancelled")]
    Cancelled,
}

/// Content extraction failures (article download or readable-text parse).
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("no readable content at {url}")]
    NoContent { url: String },

    #[error("extraction cancelled")]
    Cancelled,
}

/// External summarization service failures.
#[derive(Debug, thiserror::Error)]
pub enum SummarizationError {
    #[error("completion request failed: {0}")]
    Api(#[from] OpenAiError),

    #[error("summarization cancelled")]
    Cancelled,
}

/// Persistence read/write failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

/// Outbound channel failures.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("send to channel {channel_id} failed: {source}")]
    Http {
        channel_id: i64,
        #[source]
        source: reqwest::Error,
    },

    #[error("channel {channel_id} rejected message ({status}): {description}")]
    Api {
        channel_id: i64,
        status: StatusCode,
        description: String,
    },

    #[error("publish cancelled")]
    Cancelled,
}

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Outcome of a failed or cancelled pipeline cycle.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("fetch error: {0}")]
    Fetch(FetchError),

    #[error("extraction error: {0}")]
    Extraction(ExtractionError),

    #[error("summarization error: {0}")]
    Summarization(SummarizationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("publish error: {0}")]
    Publish(PublishError),

    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

impl From<FetchError> for PipelineError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Fetch(other),
        }
    }
}

impl From<ExtractionError> for PipelineError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Extraction(other),
        }
    }
}

impl From<SummarizationError> for PipelineError {
    fn from(err: SummarizationError) -> Self {
        match err {
            SummarizationError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Summarization(other),
        }
    }
}

impl From<PublishError> for PipelineError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Publish(other),
        }
    }
}
