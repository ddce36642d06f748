// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage for skipped-over message keys.
use std::collections::{HashMap, VecDeque};
use std::hash::Hash as StdHash;

use crate::keys::Key;
use crate::traits::{KeysStorage, StorageError};

/// In-memory [`KeysStorage`]: a two-level mapping from indexing key and message number to
/// message key, plus a per-session insertion-order queue driving oldest-first eviction when a
/// session-wide cap is configured.
///
/// Keys stored here live as long as the process; nothing is persisted.
#[derive(Debug)]
pub struct InMemoryKeysStorage<IK> {
    keys: HashMap<IK, HashMap<u32, Key>>,
    insertion_order: HashMap<Vec<u8>, VecDeque<(IK, u32)>>,
}

impl<IK> InMemoryKeysStorage<IK> {
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
            insertion_order: HashMap::new(),
        }
    }
}

impl<IK> Default for InMemoryKeysStorage<IK> {
    fn default() -> Self {
        Self::new()
    }
}

impl<IK> KeysStorage<IK> for InMemoryKeysStorage<IK>
where
    IK: Clone + Eq + StdHash,
{
    fn get(&self, ik: &IK, n: u32) -> Result<Option<Key>, StorageError> {
        Ok(self.keys.get(ik).and_then(|mks| mks.get(&n)).cloned())
    }

    fn put(
        &mut self,
        session_id: &[u8],
        ik: &IK,
        n: u32,
        mk: Key,
        max_keys: u32,
    ) -> Result<(), StorageError> {
        self.keys.entry(ik.clone()).or_default().insert(n, mk);

        let queue = self.insertion_order.entry(session_id.to_vec()).or_default();
        queue.push_back((ik.clone(), n));

        if max_keys > 0 {
            // Entries consumed or purged since their insertion are stale in the queue.
            let keys = &self.keys;
            queue.retain(|(ik, n)| keys.get(ik).is_some_and(|mks| mks.contains_key(n)));

            while queue.len() > max_keys as usize {
                let (oldest_ik, oldest_n) =
                    queue.pop_front().expect("queue longer than the cap");
                if let Some(mks) = self.keys.get_mut(&oldest_ik) {
                    mks.remove(&oldest_n);
                    if mks.is_empty() {
                        self.keys.remove(&oldest_ik);
                    }
                }
            }
        }

        Ok(())
    }

    fn delete_mk(&mut self, ik: &IK, n: u32) -> Result<(), StorageError> {
        if let Some(mks) = self.keys.get_mut(ik) {
            mks.remove(&n);
            if mks.is_empty() {
                self.keys.remove(ik);
            }
        }
        Ok(())
    }

    fn delete_pk(&mut self, ik: &IK) -> Result<(), StorageError> {
        self.keys.remove(ik);
        Ok(())
    }

    fn count(&self, ik: &IK) -> Result<u32, StorageError> {
        Ok(self.keys.get(ik).map_or(0, |mks| mks.len() as u32))
    }

    fn all(&self) -> Result<Vec<(IK, Vec<(u32, Key)>)>, StorageError> {
        Ok(self
            .keys
            .iter()
            .map(|(ik, mks)| {
                (
                    ik.clone(),
                    mks.iter().map(|(n, mk)| (*n, mk.clone())).collect(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::keys::Key;
    use crate::traits::KeysStorage;

    use super::InMemoryKeysStorage;

    #[test]
    fn put_get_delete() {
        let mut storage = InMemoryKeysStorage::new();

        storage
            .put(b"session", &[1u8; 32], 0, Key::from_bytes([10; 32]), 0)
            .unwrap();
        storage
            .put(b"session", &[1u8; 32], 1, Key::from_bytes([11; 32]), 0)
            .unwrap();

        assert_eq!(
            storage.get(&[1u8; 32], 0).unwrap(),
            Some(Key::from_bytes([10; 32]))
        );
        assert_eq!(storage.get(&[1u8; 32], 2).unwrap(), None);
        assert_eq!(storage.get(&[2u8; 32], 0).unwrap(), None);
        assert_eq!(storage.count(&[1u8; 32]).unwrap(), 2);

        storage.delete_mk(&[1u8; 32], 0).unwrap();
        assert_eq!(storage.get(&[1u8; 32], 0).unwrap(), None);
        assert_eq!(storage.count(&[1u8; 32]).unwrap(), 1);
    }

    #[test]
    fn delete_pk_removes_all_entries() {
        let mut storage = InMemoryKeysStorage::new();

        for n in 0..3 {
            storage
                .put(b"session", &[1u8; 32], n, Key::from_bytes([n as u8; 32]), 0)
                .unwrap();
        }
        storage
            .put(b"session", &[2u8; 32], 0, Key::from_bytes([99; 32]), 0)
            .unwrap();

        storage.delete_pk(&[1u8; 32]).unwrap();

        assert_eq!(storage.count(&[1u8; 32]).unwrap(), 0);
        assert_eq!(storage.count(&[2u8; 32]).unwrap(), 1);
    }

    #[test]
    fn all_groups_by_indexing_key() {
        let mut storage = InMemoryKeysStorage::new();

        storage
            .put(b"session", &[1u8; 32], 0, Key::from_bytes([10; 32]), 0)
            .unwrap();
        storage
            .put(b"session", &[1u8; 32], 1, Key::from_bytes([11; 32]), 0)
            .unwrap();
        storage
            .put(b"session", &[2u8; 32], 5, Key::from_bytes([12; 32]), 0)
            .unwrap();

        let mut all = storage.all().unwrap();
        all.sort_by_key(|(ik, _)| *ik);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, [1u8; 32]);
        assert_eq!(all[0].1.len(), 2);
        assert_eq!(all[1].0, [2u8; 32]);
        assert_eq!(all[1].1, vec![(5, Key::from_bytes([12; 32]))]);
    }

    #[test]
    fn session_cap_evicts_oldest() {
        let mut storage = InMemoryKeysStorage::new();

        for n in 0..4 {
            storage
                .put(b"session", &[1u8; 32], n, Key::from_bytes([n as u8; 32]), 3)
                .unwrap();
        }

        // The oldest entry was evicted to keep the session at three stored keys.
        assert_eq!(storage.get(&[1u8; 32], 0).unwrap(), None);
        assert_eq!(storage.count(&[1u8; 32]).unwrap(), 3);

        // Consumed keys free capacity for new ones without further eviction.
        storage.delete_mk(&[1u8; 32], 1).unwrap();
        storage
            .put(b"session", &[1u8; 32], 4, Key::from_bytes([4; 32]), 3)
            .unwrap();
        assert_eq!(storage.count(&[1u8; 32]).unwrap(), 3);
        assert_eq!(
            storage.get(&[1u8; 32], 2).unwrap(),
            Some(Key::from_bytes([2; 32]))
        );
    }
}
