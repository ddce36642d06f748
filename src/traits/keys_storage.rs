// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use thiserror::Error as ThisError;

use crate::keys::Key;

/// Storage for skipped-over message keys, indexed by an indexing key and message number.
///
/// The indexing key `IK` is the ratchet public key of the sender in the plain protocol and the
/// header key in the header-encrypted variant; the storage itself is agnostic of the difference.
///
/// The recommended implementation is the in-memory
/// [`InMemoryKeysStorage`](crate::InMemoryKeysStorage). Implementations may be persistent; a
/// session never assumes durability across restarts unless one is configured. All operations must
/// be atomic with respect to the mutations of a single session.
pub trait KeysStorage<IK> {
    /// Returns the message key stored under the indexing key and message number, if any.
    fn get(&self, ik: &IK, n: u32) -> Result<Option<Key>, StorageError>;

    /// Stores a message key under the indexing key and message number.
    ///
    /// When `max_keys` is non-zero and storing would bring the session over that total,
    /// implementations evict the oldest stored key of the session first.
    fn put(
        &mut self,
        session_id: &[u8],
        ik: &IK,
        n: u32,
        mk: Key,
        max_keys: u32,
    ) -> Result<(), StorageError>;

    /// Ensures no message key is stored under the indexing key and message number.
    fn delete_mk(&mut self, ik: &IK, n: u32) -> Result<(), StorageError>;

    /// Deletes all message keys stored under the indexing key.
    fn delete_pk(&mut self, ik: &IK) -> Result<(), StorageError>;

    /// Returns the number of message keys stored under the indexing key.
    fn count(&self, ik: &IK) -> Result<u32, StorageError>;

    /// Returns all stored entries, grouped by indexing key.
    fn all(&self) -> Result<Vec<(IK, Vec<(u32, Key)>)>, StorageError>;
}

/// Failure inside a pluggable storage backend, propagated to the session caller unchanged.
#[derive(Debug, ThisError)]
#[error(transparent)]
pub struct StorageError(Box<dyn Error + Send + Sync>);

impl StorageError {
    pub fn new(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self(error.into())
    }
}
