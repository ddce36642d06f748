// SPDX-License-Identifier: MIT OR Apache-2.0

//! Double Ratchet session with encrypted message headers.
//!
//! The header-encrypted variant conceals per-message metadata: ratchet public key and message
//! counters travel inside an AEAD ciphertext keyed by header keys which rotate with every
//! Diffie-Hellman ratchet step. Next to the shared secret, both parties agree on two initial
//! header keys (`shared_hka` for messages from initiator to responder, `shared_nhkb` for the
//! opposite direction) during key agreement.
//!
//! Skipped message keys are indexed by header key here, since a receiver cannot read the ratchet
//! public key off an encrypted header.
use std::collections::HashMap;

use crate::crypto::default::DefaultCrypto;
use crate::crypto::x25519::{KeyPair, PublicKey};
use crate::keys::Key;
use crate::keys_storage::InMemoryKeysStorage;
use crate::message::{MessageHE, MessageHeader, associated_data};
use crate::session::{SessionConfig, SessionError};
use crate::session_storage::SessionSnapshot;
use crate::state::State;
use crate::traits::{CryptoProvider, KeysStorage, StorageError};

/// Double Ratchet session with encrypted message headers.
///
/// Apart from header handling the ratchet is the same as [`Session`](crate::Session): the same
/// chains, the same skipped-key discipline, the same shadow-commit guarantee that a failed
/// decrypt leaves no trace.
pub struct SessionHE<C = DefaultCrypto, S = InMemoryKeysStorage<Key>> {
    pub(crate) session_id: Vec<u8>,
    pub(crate) state: State,
    pub(crate) crypto: C,
    pub(crate) mk_skipped: S,
    pub(crate) config: SessionConfig,

    /// Number of completed Diffie-Hellman receive-ratchets.
    pub(crate) step: u32,

    /// Which receiving header key became current at which ratchet step, driving skipped-key
    /// retention.
    pub(crate) delete_keys: HashMap<u32, Key>,
}

impl<C, S> SessionHE<C, S>
where
    C: CryptoProvider,
    S: KeysStorage<Key>,
{
    /// Creates the header-encrypted session of the party sending the first message.
    ///
    /// `shared_hka` keys the headers of our first sending chain, `shared_nhkb` the headers of
    /// the first chain of the other party.
    #[allow(clippy::too_many_arguments)]
    pub fn new_initiator(
        session_id: impl Into<Vec<u8>>,
        shared_key: Key,
        remote_public_key: PublicKey,
        shared_hka: Key,
        shared_nhkb: Key,
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
        state.hks = Some(shared_hka);
        state.nhkr = Some(shared_nhkb);

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

    /// Creates the header-encrypted session of the party receiving the first message.
    ///
    /// Header keys mirror the initiator's: we expect headers under `shared_hka` and will send
    /// under `shared_nhkb` once the first ratchet step established it as our sending header key.
    /// Until then [`ratchet_encrypt_he`](SessionHE::ratchet_encrypt_he) is unavailable.
    #[allow(clippy::too_many_arguments)]
    pub fn new_responder(
        session_id: impl Into<Vec<u8>>,
        shared_key: Key,
        own_key_pair: KeyPair,
        shared_hka: Key,
        shared_nhkb: Key,
        crypto: C,
        keys_storage: S,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if shared_key.is_zero() {
            return Err(SessionError::SharedKeyZero);
        }

        let mut state = State::new(own_key_pair, &shared_key);
        state.nhks = Some(shared_nhkb);
        state.nhkr = Some(shared_hka);

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

    /// Performs a symmetric-key ratchet step, encrypts the message header under the sending
    /// header key and AEAD-encrypts `plaintext` with the derived message key. The encrypted
    /// header doubles as part of the associated data of the message.
    pub fn ratchet_encrypt_he(
        &mut self,
        plaintext: &[u8],
        ad: &[u8],
    ) -> Result<MessageHE, SessionError> {
        let hks = self
            .state
            .hks
            .clone()
            .ok_or(SessionError::HeaderKeyUnavailable)?;

        let header = MessageHeader {
            dh: self.state.dhs.public(),
            n: self.state.send_ch.n,
            pn: self.state.pn,
        };
        let mk = self.state.send_ch.step(&self.crypto);
        let encrypted_header = self.crypto.encrypt(&hks, &header.encode(), &[]);
        let ciphertext =
            self.crypto
                .encrypt(&mk, plaintext, &associated_data(ad, &encrypted_header));

        Ok(MessageHE {
            header: encrypted_header,
            ciphertext,
        })
    }

    /// Decrypts a header-encrypted message, advancing the ratchet as its header dictates.
    ///
    /// The header is tried against the current receiving header key first, then against the next
    /// one; success under the latter means the sender has rotated and a Diffie-Hellman ratchet
    /// step is due. All state movement happens on a copy committed only after the ciphertext
    /// authenticated.
    pub fn ratchet_decrypt_he(
        &mut self,
        message: &MessageHE,
        ad: &[u8],
    ) -> Result<Vec<u8>, SessionError> {
        // The message may carry one of the skipped-over keys. Which skipped chain it belongs to
        // only shows once its header decrypts under that chain's header key.
        for (hk, entries) in self.mk_skipped.all()? {
            let Ok(decoded) = self.crypto.decrypt(&hk, &message.header, &[]) else {
                continue;
            };
            let Ok(header) = MessageHeader::decode(&decoded) else {
                continue;
            };
            let Some((n, mk)) = entries.into_iter().find(|(n, _)| *n == header.n) else {
                continue;
            };
            let full_ad = associated_data(ad, &message.header);
            if let Ok(plaintext) = self.crypto.decrypt(&mk, &message.ciphertext, &full_ad) {
                self.mk_skipped.delete_mk(&hk, n)?;
                return Ok(plaintext);
            }
        }

        let (header, stepped) = self.decrypt_header(&message.header)?;
        let full_ad = associated_data(ad, &message.header);

        // All changes happen on a copy so a failure further down leaves the session untouched.
        let mut next = self.state.clone();
        let mut skipped_previous = Vec::new();
        let previous_hkr = next.hkr.clone();

        if stepped {
            if let Some(hkr) = &previous_hkr {
                let stored = self.mk_skipped.count(hkr)?;
                skipped_previous =
                    next.skip_message_keys(&self.crypto, header.pn, stored, self.config.max_skip)?;
            }
            next.dh_ratchet(&self.crypto, &header)?;
        }

        let hkr = next
            .hkr
            .clone()
            .expect("a decrypted header implies an established receiving header key");
        let stored = self.mk_skipped.count(&hkr)?;
        let skipped_current =
            next.skip_message_keys(&self.crypto, header.n, stored, self.config.max_skip)?;

        let mk = next.recv_ch.step(&self.crypto);
        let plaintext = self.crypto.decrypt(&mk, &message.ciphertext, &full_ad)?;

        // The message authenticated: commit the advanced state and stash the skipped keys.
        self.state = next;
        if let Some(previous_hkr) = previous_hkr {
            for (n, mk) in skipped_previous {
                self.mk_skipped.put(
                    &self.session_id,
                    &previous_hkr,
                    n,
                    mk,
                    self.config.max_message_keys,
                )?;
            }
        }
        for (n, mk) in skipped_current {
            self.mk_skipped.put(
                &self.session_id,
                &hkr,
                n,
                mk,
                self.config.max_message_keys,
            )?;
        }
        if stepped {
            self.commit_ratchet_step(hkr)?;
        }

        Ok(plaintext)
    }

    /// Returns our current ratchet public key. It rotates with every Diffie-Hellman ratchet
    /// step.
    pub fn public_key(&self) -> PublicKey {
        self.state.dhs.public()
    }

    /// Returns a serializable snapshot of the complete session, including the skipped-key table.
    pub fn snapshot(&self) -> Result<SessionSnapshot<Key>, StorageError> {
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
        snapshot: SessionSnapshot<Key>,
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

    /// Tries the current receiving header key, then the next one. Success under the next key
    /// signals a pending Diffie-Hellman ratchet step.
    fn decrypt_header(&self, encrypted: &[u8]) -> Result<(MessageHeader, bool), SessionError> {
        if let Some(hkr) = &self.state.hkr {
            if let Ok(bytes) = self.crypto.decrypt(hkr, encrypted, &[]) {
                let header =
                    MessageHeader::decode(&bytes).map_err(|_| SessionError::InvalidHeader)?;
                return Ok((header, false));
            }
        }
        if let Some(nhkr) = &self.state.nhkr {
            if let Ok(bytes) = self.crypto.decrypt(nhkr, encrypted, &[]) {
                let header =
                    MessageHeader::decode(&bytes).map_err(|_| SessionError::InvalidHeader)?;
                return Ok((header, true));
            }
        }
        Err(SessionError::InvalidHeader)
    }

    /// Records the receiving header key of the completed ratchet step and evicts the skipped
    /// keys of the generation that fell out of the retention window.
    fn commit_ratchet_step(&mut self, receiving_key: Key) -> Result<(), StorageError> {
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
