use thiserror::Error;

/// Pipeline-scoped failures. Anything in here aborts the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("storage unavailable for '{key}': {message}")]
    Storage { key: String, message: String },

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("dataset is unreadable: {0}")]
    Dataset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    pub fn storage(key: impl Into<String>, message: impl ToString) -> Self {
        PipelineError::Storage {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Errors from the failure taxonomy the scheduler must see: credentials
    /// and durable store access. Anything else is a configuration or
    /// programming error that still aborts the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingCredential(_)
                | PipelineError::Auth(_)
                | PipelineError::Storage { .. }
                | PipelineError::Io(_)
                | PipelineError::Dataset(_)
        )
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Storage { .. } | PipelineError::Io(_) => "storage_unavailable",
            PipelineError::MissingCredential(_) => "missing_credential",
            PipelineError::Auth(_) => "auth_failure",
            PipelineError::Config(_) | PipelineError::Toml(_) => "config",
            PipelineError::Dataset(_) | PipelineError::Csv(_) => "dataset",
            PipelineError::Json(_) => "json",
            PipelineError::Http(_) => "http",
        }
    }
}

/// A single raw batch could not be flattened. Skipped, never fatal.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("item {index}: {reason}")]
    MalformedItem { index: usize, reason: String },
}

/// One metadata lookup attempt failed. Only `Unauthorized` is not retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("metadata service returned status {0}")]
    Status(u16),

    /// The token was rejected; retrying with the same token cannot succeed
    #[error("metadata service rejected the credential (status {0})")]
    Unauthorized(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Body(String),
}

impl LookupError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LookupError::Unauthorized(_))
    }
}


pub type Result<T> = std::result::Result<T, PipelineError>;
