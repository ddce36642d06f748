// SPDX-License-Identifier: MIT OR Apache-2.0

//! Double Ratchet session with plaintext message headers.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::aead::AeadError;
use crate::crypto::default::DefaultCrypto;
use crate::crypto::x25519::{KeyPair, PublicKey};
use crate::keys::Key;
use crate::keys_storage::InMemoryKeysStorage;
use crate::message::{Message, MessageHeader, associated_data};
use crate::session_storage::SessionSnapshot;
use crate::state::State;
use crate::traits::{CryptoProvider, KeysStorage, StorageError};

/// Limits for skipped-key handling of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of message keys that can be skipped in a single chain.
    ///
    /// Should be set high enough to tolerate routine lost or delayed messages, but low enough
    /// that a malicious sender cannot trigger excessive recipient computation.
    pub max_skip: u32,

    /// Number of Diffie-Hellman ratchet steps after which the skipped message keys stored under
    /// the receiving key of an older generation are deleted.
    pub max_keep: u32,

    /// Session-wide cap on stored skipped message keys; storing beyond it evicts the oldest key
    /// first. Zero disables the cap.
    pub max_message_keys: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_skip: 1000,
            max_keep: 100,
            max_message_keys: 2000,
        }
    }
}

/// Double Ratchet session between two parties.
///
/// A session combines a Diffie-Hellman ratchet with two symmetric KDF chains: every sent or
/// received message advances a chain (forward secrecy), every observed rotation of the remote
/// ratchet key refreshes both chains through the root chain (post-compromise security). Messages
/// arriving out of order are handled by deriving and storing the keys of skipped-over messages,
/// within the [configured limits](SessionConfig).
///
/// Operations on a session are not thread-safe; a session is a single-owner object and callers
/// serialize access themselves.
pub struct Session<C = DefaultCrypto, S = InMemoryKeysStorage<PublicKey>> {
    pub(crate) session_id: Vec<u8>,
    pub(crate) state: State,
    pub(crate) crypto: C,
    pub(crate) mk_skipped: S,
    pub(crate) config: SessionConfig,

    /// Number of completed Diffie-Hellman receive-ratchets.
    pub(crate) step: u32,

    /// Which receiving key became current at which ratchet step, driving skipped-key retention.
    pub(crate) delete_keys: HashMap<u32, PublicKey>,
}

impl<C, S> Session<C, S>
where
    C: CryptoProvider,
    S: KeysStorage<PublicKey>,
{
    /// Creates the session of the party sending the first message.
    ///
    /// `remote_public_key` is the ratchet public key of the other party, usually learned through
    /// a key-agreement protocol alongside the shared secret. The sending chain is immediately
    /// advanced through the root chain, so the first message can be sent right away.
    pub fn new_initiator(
        session_id: impl Into<Vec<u8>>,
        shared_key: Key,
        remote_public_key: PublicKey,
        crypto: C,
        keys_storage: S,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if shared_key.is_zero() {
            return Err(SessionError::SharedKeyZero);
        }

        let dhs = crypto.generate_dh().map_err(SessionError::Crypto)?;
        let mut state = State::new(dhs, &shared_key);
        let dh_out = crypto.dh(&state.dhs, &remote_public_key);
        let (send_ch, nhks) = state.root_ch.step(&crypto, &dh_out);
        state.send_ch = send_ch;
        state.nhks = Some(nhks);
        state.dhr = Some(remote_public_key);

        Ok(Self {
            session_id: session_id.into(),
            state,
            crypto,
            mk_skipped: keys_storage,
            config,
            step: 0,
            delete_keys: HashMap::new(),
        })
    }

    /// Creates the session of the party receiving the first message.
    ///
    /// `own_key_pair` is the ratchet key pair whose public half the other party initiates with.
    /// Both chains start out keyed with the shared secret, so the responder can also send before
    /// having received anything; the first received message performs the first Diffie-Hellman
    /// ratchet step.
    pub fn new_responder(
        session_id: impl Into<Vec<u8>>,
        shared_key: Key,
        own_key_pair: KeyPair,
        crypto: C,
        keys_storage: S,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if shared_key.is_zero() {
            return Err(SessionError::SharedKeyZero);
        }

        Ok(Self {
            session_id: session_id.into(),
            state: State::new(own_key_pair, &shared_key),
            crypto,
            mk_skipped: keys_storage,
            config,
            step: 0,
            delete_keys: HashMap::new(),
        })
    }

    /// Performs a symmetric-key ratchet step and AEAD-encrypts `plaintext` with the resulting
    /// message key. `ad` is authenticated alongside the message header but not transmitted.
    pub fn ratchet_encrypt(&mut self, plaintext: &[u8], ad: &[u8]) -> Message {
        let header = MessageHeader {
            dh: self.state.dhs.public(),
            n: self.state.send_ch.n,
            pn: self.state.pn,
        };
        let mk = self.state.send_ch.step(&self.crypto);
        let full_ad = associated_data(ad, &header.encode());

        Message {
            header,
            ciphertext: self.crypto.encrypt(&mk, plaintext, &full_ad),
        }
    }

    /// AEAD-decrypts a received message, advancing the ratchet as the message header dictates.
    ///
    /// On any error the session is left exactly as it was: all ratchet movement happens on a
    /// copy of the state which is only written back after the ciphertext authenticated.
    pub fn ratchet_decrypt(&mut self, message: &Message, ad: &[u8]) -> Result<Vec<u8>, SessionError> {
        let full_ad = associated_data(ad, &message.header.encode());

        // The message may carry one of the skipped-over keys. If its ciphertext does not
        // authenticate the header may be spoofed, so fall through to the main path instead of
        // failing.
        if let Some(mk) = self.mk_skipped.get(&message.header.dh, message.header.n)? {
            if let Ok(plaintext) = self.crypto.decrypt(&mk, &message.ciphertext, &full_ad) {
                self.mk_skipped
                    .delete_mk(&message.header.dh, message.header.n)?;
                return Ok(plaintext);
            }
        }

        // All changes happen on a copy so a failure further down leaves the session untouched.
        let mut next = self.state.clone();
        let mut skipped_previous = Vec::new();
        let previous_dhr = next.dhr;
        let stepped = next.dhr != Some(message.header.dh);

        if stepped {
            if let Some(dhr) = previous_dhr {
                let stored = self.mk_skipped.count(&dhr)?;
                skipped_previous = next.skip_message_keys(
                    &self.crypto,
                    message.header.pn,
                    stored,
                    self.config.max_skip,
                )?;
            }
            next.dh_ratchet(&self.crypto, &message.header)?;
        }

        let stored = self.mk_skipped.count(&message.header.dh)?;
        let skipped_current = next.skip_message_keys(
            &self.crypto,
            message.header.n,
            stored,
            self.config.max_skip,
        )?;

        let mk = next.recv_ch.step(&self.crypto);
        let plaintext = self.crypto.decrypt(&mk, &message.ciphertext, &full_ad)?;

        // The message authenticated: commit the advanced state and stash the skipped keys.
        self.state = next;
        if let Some(dhr) = previous_dhr {
            for (n, mk) in skipped_previous {
                self.mk_skipped.put(
                    &self.session_id,
                    &dhr,
                    n,
                    mk,
                    self.config.max_message_keys,
                )?;
            }
        }
        for (n, mk) in skipped_current {
            self.mk_skipped.put(
                &self.session_id,
                &message.header.dh,
                n,
                mk,
                self.config.max_message_keys,
            )?;
        }
        if stepped {
            self.commit_ratchet_step(message.header.dh)?;
        }

        Ok(plaintext)
    }

    /// Returns our current ratchet public key. It rotates with every Diffie-Hellman ratchet
    /// step.
    pub fn public_key(&self) -> PublicKey {
        self.state.dhs.public()
    }

    /// Returns a serializable snapshot of the complete session, including the skipped-key table.
    pub fn snapshot(&self) -> Result<SessionSnapshot<PublicKey>, StorageError> {
        Ok(SessionSnapshot {
            session_id: self.session_id.clone(),
            state: self.state.clone(),
            config: self.config.clone(),
            step: self.step,
            delete_keys: self.delete_keys.clone(),
            skipped: self.mk_skipped.all()?,
        })
    }

    /// Rebuilds a session from a snapshot, loading the skipped keys into the given storage.
    pub fn restore(
        snapshot: SessionSnapshot<PublicKey>,
        crypto: C,
        mut keys_storage: S,
    ) -> Result<Self, SessionError> {
        for (ik, entries) in snapshot.skipped {
            for (n, mk) in entries {
                keys_storage.put(
                    &snapshot.session_id,
                    &ik,
                    n,
                    mk,
                    snapshot.config.max_message_keys,
                )?;
            }
        }

        Ok(Self {
            session_id: snapshot.session_id,
            state: snapshot.state,
            crypto,
            mk_skipped: keys_storage,
            config: snapshot.config,
            step: snapshot.step,
            delete_keys: snapshot.delete_keys,
        })
    }

    /// Records the receiving key of the completed ratchet step and evicts the skipped keys of
    /// the generation that fell out of the retention window.
    fn commit_ratchet_step(&mut self, receiving_key: PublicKey) -> Result<(), StorageError> {
        self.delete_keys.insert(self.step, receiving_key);
        self.step += 1;
        if let Some(expired) = self
            .step
            .checked_sub(self.config.max_keep)
            .and_then(|expired_step| self.delete_keys.remove(&expired_step))
        {
            self.mk_skipped.delete_pk(&expired)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The shared secret seeding a session must not be all zeroes.
    #[error("shared key must be non-zero")]
    SharedKeyZero,

    /// Key generation failed, e.g. the random source did not deliver.
    #[error(transparent)]
    Crypto(#[from] crate::traits::CryptoError),

    /// The ciphertext did not authenticate: tampering, wrong associated data, a wrong message
    /// key or a spoofed header.
    #[error(transparent)]
    InvalidSignature(#[from] AeadError),

    /// A header-encrypted message header decrypts under neither the current nor the next
    /// receiving header key.
    #[error("invalid message header")]
    InvalidHeader,

    /// Header-encrypted sending requires a sending header key, which a responder only has after
    /// its first received message.
    #[error("sending header key not yet established")]
    HeaderKeyUnavailable,

    /// The message number lies before the current receiving chain; its key was already used or
    /// discarded.
    #[error("message number {requested} is behind the receiving chain at {current}")]
    OutOfOrder { requested: u32, current: u32 },

    /// Decrypting would require skipping more message keys than the configured limit.
    #[error("skipping {skipping} message keys exceeds the limit of {max_skip}")]
    TooManySkipped { skipping: u32, max_skip: u32 },

    /// A pluggable storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use crate::keys::Key;
    use crate::test_utils::session_pair;

    use super::SessionConfig;

    #[test]
    fn default_limits() {
        let config = SessionConfig::default();
        assert_eq!(config.max_skip, 1000);
        assert_eq!(config.max_keep, 100);
        assert_eq!(config.max_message_keys, 2000);
    }

    #[test]
    fn initiator_chains_diverge_from_shared_key() {
        let shared_key = [9; 32];
        let (alice, bob) = session_pair(shared_key, SessionConfig::default());

        // The initiator advanced root and sending chain at construction, the responder waits
        // for the first received message before ratcheting.
        assert_ne!(alice.state.root_ch.ck, Key::from_bytes(shared_key));
        assert_ne!(alice.state.send_ch.ck, Key::from_bytes(shared_key));
        assert_eq!(bob.state.recv_ch.ck, Key::from_bytes(shared_key));
        assert!(bob.state.dhr.is_none());
        assert_eq!(alice.state.dhr, Some(bob.public_key()));
    }
}
