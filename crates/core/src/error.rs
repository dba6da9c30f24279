//! Error types for the core crate.
//!
//! Each collaborator has its own error enum so that callers can map failures precisely (the
//! REST layer turns them into status codes). None of these errors carry secrets.

/// Invalid startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidInput(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Failure of a single completion round trip.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("failed to send completion request: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("completion API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode completion response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("completion API unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a flashcard generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("source text cannot be empty")]
    EmptySourceText,
    #[error("model output could not be parsed as flashcards")]
    MalformedModelOutput { raw: String },
    #[error("completion request failed: {0}")]
    UpstreamUnavailable(#[from] CompletionError),
    #[error("flashcard {index} has invalid category '{category}'")]
    InvalidCategory { index: usize, category: String },
    #[error("flashcard {index} has an empty question or answer")]
    IncompleteFlashcard { index: usize },
}

impl GenerationError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::EmptySourceText => "empty_source_text",
            GenerationError::MalformedModelOutput { .. } => "malformed_model_output",
            GenerationError::UpstreamUnavailable(_) => "upstream_unavailable",
            GenerationError::InvalidCategory { .. } => "invalid_category",
            GenerationError::IncompleteFlashcard { .. } => "incomplete_flashcard",
        }
    }
}

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

/// Failure of a document store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("failed to create storage directory: {0}")]
    DirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove record: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure reported by, or while talking to, the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    EmailExists,
    #[error("missing, invalid or expired session token")]
    Unauthenticated,
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    #[error("failed to reach identity provider: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected identity provider response: {0}")]
    InvalidResponse(String),
}

pub type IdentityResult<T> = std::result::Result<T, IdentityError>;
