//! Document stores.
//!
//! Persistence sits behind the [`FlashcardStore`](flashcards::FlashcardStore) and
//! [`UserProfileStore`](users::UserProfileStore) traits. The file-backed implementations keep
//! one JSON document per record under the configured data directory.

pub mod flashcards;
pub mod shared;
pub mod users;
