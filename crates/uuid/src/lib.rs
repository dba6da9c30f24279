//! UUID and sharded-path utilities.
//!
//! CardCrafter stores each persisted flashcard under a sharded directory derived from its id.
//!
//! Ids use a *canonical* representation: **32 lowercase hexadecimal characters** (no hyphens),
//! the same value you would get from `Uuid::new_v4().simple().to_string()`. Externally supplied
//! ids (URL path segments, CLI arguments) must already be canonical; use
//! [`ShardableUuid::parse`] to validate them.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, data lives under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `flashcard_data/flashcards/55/0e/550e8400e29b41d4a716446655440000/`
//!
//! This keeps the fan-out of any single directory small.

mod shardable;

pub use shardable::{ShardableUuid, Uuid};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
