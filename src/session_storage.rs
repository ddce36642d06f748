// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session snapshots and their in-memory storage.
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cbor::{decode_cbor, encode_cbor};
use crate::keys::Key;
use crate::session::SessionConfig;
use crate::state::State;
use crate::traits::{SessionStorage, StorageError};

/// Serializable snapshot of a complete session.
///
/// Restoring a snapshot faithfully reproduces the session: ratchet state, configuration, the
/// retention schedule and every stored skipped message key. `IK` is the indexing-key type of the
/// session variant the snapshot was taken from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSnapshot<IK> {
    pub(crate) session_id: Vec<u8>,
    pub(crate) state: State,
    pub(crate) config: SessionConfig,
    pub(crate) step: u32,
    pub(crate) delete_keys: HashMap<u32, IK>,
    pub(crate) skipped: Vec<(IK, Vec<(u32, Key)>)>,
}

/// In-memory [`SessionStorage`] holding CBOR-encoded snapshots.
#[derive(Debug, Default)]
pub struct InMemorySessionStorage {
    snapshots: HashMap<Vec<u8>, Vec<u8>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<IK> SessionStorage<IK> for InMemorySessionStorage
where
    IK: Serialize + DeserializeOwned,
{
    fn save(&mut self, id: &[u8], snapshot: &SessionSnapshot<IK>) -> Result<(), StorageError> {
        let bytes = encode_cbor(snapshot).map_err(StorageError::new)?;
        self.snapshots.insert(id.to_vec(), bytes);
        Ok(())
    }

    fn load(&self, id: &[u8]) -> Result<Option<SessionSnapshot<IK>>, StorageError> {
        self.snapshots
            .get(id)
            .map(|bytes| decode_cbor(bytes).map_err(StorageError::new))
            .transpose()
    }
}
