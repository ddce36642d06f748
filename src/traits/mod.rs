// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contracts between the session engine and its pluggable collaborators: cryptographic
//! primitives, skipped-key storage and session-snapshot storage.
mod crypto;
mod keys_storage;
mod session_storage;

pub use crypto::{CryptoError, CryptoProvider};
pub use keys_storage::{KeysStorage, StorageError};
pub use session_storage::SessionStorage;
