//! User profile documents.
//!
//! A profile is written once at registration and read back for the account page. Profiles are
//! stored flat, one file per user: `users/<user_id>.json`.

use crate::config::CoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::repositories::shared::{read_json, write_json};
use cardcrafter_types::{NonEmptyText, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: String,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    /// Avatar URL. Empty until the user sets one.
    #[serde(default)]
    pub photo: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        first_name: NonEmptyText,
        last_name: NonEmptyText,
    ) -> Self {
        Self {
            user_id,
            email: email.into(),
            first_name,
            last_name,
            photo: String::new(),
            created_at: Utc::now(),
        }
    }
}

pub trait UserProfileStore: Send + Sync {
    /// Creates or replaces the profile for `profile.user_id`.
    fn put(&self, profile: &UserProfile) -> StoreResult<()>;

    fn get(&self, user_id: &UserId) -> StoreResult<UserProfile>;
}

/// [`UserProfileStore`] backed by JSON files on the local filesystem.
#[derive(Clone, Debug)]
pub struct FileUserProfileStore {
    root: PathBuf,
}

impl FileUserProfileStore {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self::with_root(cfg.users_dir())
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    fn profile_path(&self, user_id: &UserId) -> PathBuf {
        self.root.join(format!("{user_id}.json"))
    }
}

impl UserProfileStore for FileUserProfileStore {
    fn put(&self, profile: &UserProfile) -> StoreResult<()> {
        fs::create_dir_all(&self.root).map_err(StoreError::DirCreation)?;
        write_json(&self.profile_path(&profile.user_id), profile)?;

        tracing::debug!(user_id = %profile.user_id, "stored user profile");
        Ok(())
    }

    fn get(&self, user_id: &UserId) -> StoreResult<UserProfile> {
        read_json(&self.profile_path(user_id), &format!("profile {user_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn profile(user_id: &str) -> UserProfile {
        UserProfile::new(
            UserId::parse(user_id).unwrap(),
            "ada@example.com",
            NonEmptyText::new("Ada").unwrap(),
            NonEmptyText::new("Lovelace").unwrap(),
        )
    }

    #[test]
    fn test_put_then_get() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileUserProfileStore::with_root(temp_dir.path().join("users"));
        let ada = profile("uid-ada");

        store.put(&ada).unwrap();

        assert!(temp_dir.path().join("users").join("uid-ada.json").is_file());
        assert_eq!(store.get(&ada.user_id).unwrap(), ada);
    }

    #[test]
    fn test_put_replaces_existing_profile() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileUserProfileStore::with_root(temp_dir.path().to_path_buf());
        let mut ada = profile("uid-ada");
        store.put(&ada).unwrap();

        ada.photo = "https://example.com/ada.png".into();
        store.put(&ada).unwrap();

        assert_eq!(
            store.get(&ada.user_id).unwrap().photo,
            "https://example.com/ada.png"
        );
    }

    #[test]
    fn test_get_missing_profile_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileUserProfileStore::with_root(temp_dir.path().to_path_buf());

        let err = store.get(&UserId::parse("nobody").unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_missing_photo_defaults_to_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileUserProfileStore::with_root(temp_dir.path().to_path_buf());
        fs::write(
            temp_dir.path().join("uid-old.json"),
            r#"{"user_id":"uid-old","email":"o@example.com","first_name":"Old","last_name":"Timer","created_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let loaded = store.get(&UserId::parse("uid-old").unwrap()).unwrap();
        assert_eq!(loaded.photo, "");
        assert_eq!(loaded.first_name.as_str(), "Old");
    }
}
