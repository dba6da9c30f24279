//! Shared storage utilities.
//!
//! Directory allocation and JSON document I/O used by the file-backed stores.

use crate::error::{StoreError, StoreResult};
use cardcrafter_uuid::ShardableUuid;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// Creates a unique sharded directory within `base_dir`.
///
/// Ids come from `uuid_source`. A candidate that already exists (a UUID collision, or a
/// directory left behind by something else) is skipped; after 5 attempts the allocation fails.
///
/// # Errors
///
/// Returns [`StoreError::DirCreation`] if:
/// - creating the shard parents fails,
/// - no free directory was found in 5 attempts.
pub(crate) fn create_uuid_and_shard_dir(
    base_dir: &Path,
    mut uuid_source: impl FnMut() -> ShardableUuid,
) -> StoreResult<(ShardableUuid, PathBuf)> {
    for _attempt in 0..5 {
        let uuid = uuid_source();
        let candidate = uuid.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(StoreError::DirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((uuid, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(StoreError::DirCreation(e)),
        }
    }

    Err(StoreError::DirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique record directory after 5 attempts",
    )))
}

/// Serialises `value` as pretty JSON and writes it to `path`.
///
/// The document is written to a sibling `.tmp` file first and renamed into place, so readers
/// never observe a half-written file.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let json = serde_json::to_vec_pretty(value).map_err(StoreError::Serialization)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(StoreError::FileWrite)?;
    fs::rename(&tmp, path).map_err(StoreError::FileWrite)
}

/// Reads and deserialises the JSON document at `path`.
///
/// A missing file is reported as [`StoreError::NotFound`] with `what` as the message.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> StoreResult<T> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::NotFound(what.to_owned()))
        }
        Err(e) => return Err(StoreError::FileRead(e)),
    };

    serde_json::from_slice(&contents).map_err(StoreError::Deserialization)
}
