// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::session_storage::SessionSnapshot;
use crate::traits::StorageError;

/// Storage for serialized session snapshots.
///
/// A snapshot restores every part of a session, including the skipped-key table, so a party can
/// resume a conversation after a restart. See [`Session::snapshot`](crate::Session::snapshot)
/// and [`Session::restore`](crate::Session::restore).
pub trait SessionStorage<IK> {
    /// Persists a snapshot under the session id, replacing any previous one.
    fn save(&mut self, id: &[u8], snapshot: &SessionSnapshot<IK>) -> Result<(), StorageError>;

    /// Loads the snapshot stored under the session id, if any.
    fn load(&self, id: &[u8]) -> Result<Option<SessionSnapshot<IK>>, StorageError>;
}
