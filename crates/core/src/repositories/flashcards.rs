//! Persisted flashcards.
//!
//! ## Storage Layout
//!
//! Each card is one JSON document in a sharded directory keyed by its id:
//!
//! ```text
//! flashcards/
//!   <s1>/
//!     <s2>/
//!       <uuid>/
//!         flashcard.json
//! ```
//!
//! The owning user is recorded inside the document. Every read checks ownership, and a card
//! owned by someone else is reported as not found.

use crate::config::CoreConfig;
use crate::constants::FLASHCARD_JSON_FILENAME;
use crate::error::{StoreError, StoreResult};
use crate::flashcard::Flashcard;
use crate::repositories::shared::{create_uuid_and_shard_dir, read_json, write_json};
use cardcrafter_types::UserId;
use cardcrafter_uuid::ShardableUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A flashcard owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFlashcard {
    pub id: ShardableUuid,
    pub user_id: UserId,
    #[serde(flatten)]
    pub card: Flashcard,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-owner flashcard persistence.
pub trait FlashcardStore: Send + Sync {
    /// Persists `card` for `owner` under a freshly allocated id.
    fn create(&self, owner: &UserId, card: Flashcard) -> StoreResult<StoredFlashcard>;

    /// Persists every card in order. Stops at the first failure; cards stored before it stay.
    fn create_many(
        &self,
        owner: &UserId,
        cards: Vec<Flashcard>,
    ) -> StoreResult<Vec<StoredFlashcard>> {
        cards
            .into_iter()
            .map(|card| self.create(owner, card))
            .collect()
    }

    fn get(&self, owner: &UserId, id: &ShardableUuid) -> StoreResult<StoredFlashcard>;

    /// All cards of `owner`, newest first.
    fn list(&self, owner: &UserId) -> StoreResult<Vec<StoredFlashcard>>;

    /// Replaces the question, answer and category of an existing card.
    fn update(
        &self,
        owner: &UserId,
        id: &ShardableUuid,
        card: Flashcard,
    ) -> StoreResult<StoredFlashcard>;

    fn delete(&self, owner: &UserId, id: &ShardableUuid) -> StoreResult<()>;
}

/// [`FlashcardStore`] backed by JSON files on the local filesystem.
#[derive(Clone, Debug)]
pub struct FileFlashcardStore {
    root: PathBuf,
}

impl FileFlashcardStore {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self::with_root(cfg.flashcards_dir())
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    fn card_path(&self, id: &ShardableUuid) -> PathBuf {
        id.sharded_dir(&self.root).join(FLASHCARD_JSON_FILENAME)
    }

    fn read_owned(&self, owner: &UserId, id: &ShardableUuid) -> StoreResult<StoredFlashcard> {
        let stored: StoredFlashcard =
            read_json(&self.card_path(id), &format!("flashcard {id}"))?;

        if &stored.user_id != owner {
            return Err(StoreError::NotFound(format!("flashcard {id}")));
        }
        Ok(stored)
    }
}

impl FlashcardStore for FileFlashcardStore {
    fn create(&self, owner: &UserId, card: Flashcard) -> StoreResult<StoredFlashcard> {
        let (id, dir) = create_uuid_and_shard_dir(&self.root, ShardableUuid::new)?;

        let now = Utc::now();
        let stored = StoredFlashcard {
            id,
            user_id: owner.clone(),
            card,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = write_json(&dir.join(FLASHCARD_JSON_FILENAME), &stored) {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                tracing::warn!("failed to clean up {}: {cleanup}", dir.display());
            }
            return Err(e);
        }

        tracing::debug!(%id, user_id = %owner, "stored flashcard");
        Ok(stored)
    }

    fn get(&self, owner: &UserId, id: &ShardableUuid) -> StoreResult<StoredFlashcard> {
        self.read_owned(owner, id)
    }

    fn list(&self, owner: &UserId) -> StoreResult<Vec<StoredFlashcard>> {
        let mut cards = Vec::new();

        let s1_iter = match fs::read_dir(&self.root) {
            Ok(it) => it,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(cards),
            Err(e) => return Err(StoreError::FileRead(e)),
        };

        for s1 in s1_iter.flatten() {
            for s2 in read_subdirs(&s1.path()) {
                for card_dir in read_subdirs(&s2) {
                    let path = card_dir.join(FLASHCARD_JSON_FILENAME);
                    if !path.is_file() {
                        continue;
                    }

                    match read_json::<StoredFlashcard>(&path, "flashcard") {
                        Ok(card) if &card.user_id == owner => cards.push(card),
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!("skipping unreadable flashcard {}: {e}", path.display())
                        }
                    }
                }
            }
        }

        cards.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
        });
        Ok(cards)
    }

    fn update(
        &self,
        owner: &UserId,
        id: &ShardableUuid,
        card: Flashcard,
    ) -> StoreResult<StoredFlashcard> {
        let mut stored = self.read_owned(owner, id)?;
        stored.card = card;
        stored.updated_at = Utc::now();

        write_json(&self.card_path(id), &stored)?;
        tracing::debug!(%id, user_id = %owner, "updated flashcard");
        Ok(stored)
    }

    fn delete(&self, owner: &UserId, id: &ShardableUuid) -> StoreResult<()> {
        self.read_owned(owner, id)?;

        fs::remove_dir_all(id.sharded_dir(&self.root)).map_err(StoreError::FileRemove)?;
        tracing::debug!(%id, user_id = %owner, "deleted flashcard");
        Ok(())
    }
}

fn read_subdirs(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(it) => it
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect(),
        Err(_) => Vec::new(),
    }
}
