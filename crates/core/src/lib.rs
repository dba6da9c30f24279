//! # CardCrafter Core
//!
//! Core business logic for the CardCrafter flashcard service.
//!
//! This crate contains:
//! - Flashcard generation from free-form text through a chat completion provider
//! - Repair and validation of model output into a bounded [`FlashcardSet`]
//! - File-backed storage for saved flashcards and user profiles under the data directory
//! - The identity provider client used for accounts and sessions
//! - The link to the payment provider's customer portal
//!
//! **No API concerns**: HTTP routing, request parsing and status codes belong in `api-rest`;
//! request/response shapes belong in `api-shared`.

pub mod billing;
pub mod completion;
pub mod config;
pub mod constants;
pub mod error;
pub mod flashcard;
pub mod generation;
pub mod identity;
pub mod repositories;

pub use completion::{CompletionClient, CompletionRequest, OpenAiCompletionClient};
pub use config::{CategoryPolicy, CoreConfig, GenerationConfig, IdentityConfig};
pub use error::{
    CompletionError, ConfigError, GenerationError, GenerationResult, IdentityError,
    IdentityResult, StoreError, StoreResult,
};
pub use flashcard::{Category, Flashcard, FlashcardSet};
pub use generation::{parse_model_output, FlashcardGenerationService};
pub use identity::{IdentityProvider, IdentityToolkitClient, IdentityUser, Session};
pub use repositories::flashcards::{FileFlashcardStore, FlashcardStore, StoredFlashcard};
pub use repositories::users::{FileUserProfileStore, UserProfile, UserProfileStore};

pub use cardcrafter_types::{NonEmptyText, TextError, UserId};
pub use cardcrafter_uuid::ShardableUuid;
