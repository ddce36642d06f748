// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ratchet state shared by both protocol variants.
use serde::{Deserialize, Serialize};

use crate::chains::{Chain, RootChain};
use crate::crypto::x25519::{KeyPair, PublicKey};
use crate::keys::Key;
use crate::message::MessageHeader;
use crate::session::SessionError;
use crate::traits::CryptoProvider;

/// The ratchet state of one party.
///
/// This is a plain value: a receiving session clones it, advances the clone and writes it back
/// only once the message authenticated. A failed decrypt therefore never leaves partial state
/// behind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct State {
    /// Our current ratchet key pair.
    pub(crate) dhs: KeyPair,

    /// Ratchet public key of the other party, empty on a responder before the first received
    /// message.
    pub(crate) dhr: Option<PublicKey>,

    /// Root chain, keyed with the shared secret at session start.
    pub(crate) root_ch: RootChain,

    /// Sending and receiving chains. Both start out keyed with the shared secret so either party
    /// can send before having received anything.
    pub(crate) send_ch: Chain,
    pub(crate) recv_ch: Chain,

    /// Number of messages in the previous sending chain.
    pub(crate) pn: u32,

    /// Sending and receiving header keys with their successors. Only used by the
    /// header-encrypted variant, carried here so one ratchet step updates both alike.
    pub(crate) hks: Option<Key>,
    pub(crate) nhks: Option<Key>,
    pub(crate) hkr: Option<Key>,
    pub(crate) nhkr: Option<Key>,
}

impl State {
    pub(crate) fn new(dhs: KeyPair, shared_key: &Key) -> Self {
        Self {
            dhs,
            dhr: None,
            root_ch: RootChain::new(shared_key.clone()),
            send_ch: Chain::new(shared_key.clone()),
            recv_ch: Chain::new(shared_key.clone()),
            pn: 0,
            hks: None,
            nhks: None,
            hkr: None,
            nhkr: None,
        }
    }

    /// Performs a single Diffie-Hellman ratchet step towards the rotated remote key carried in
    /// the message header: refreshes the receiving chain, generates a new ratchet key pair and
    /// refreshes the sending chain. Header keys rotate to their successors.
    pub(crate) fn dh_ratchet<C: CryptoProvider>(
        &mut self,
        crypto: &C,
        header: &MessageHeader,
    ) -> Result<(), SessionError> {
        self.pn = self.send_ch.n;
        self.dhr = Some(header.dh);
        self.hks = self.nhks.take();
        self.hkr = self.nhkr.take();

        let dh_out = crypto.dh(&self.dhs, &header.dh);
        let (recv_ch, nhkr) = self.root_ch.step(crypto, &dh_out);
        self.recv_ch = recv_ch;
        self.nhkr = Some(nhkr);

        self.dhs = crypto.generate_dh().map_err(SessionError::Crypto)?;

        let dh_out = crypto.dh(&self.dhs, &header.dh);
        let (send_ch, nhks) = self.root_ch.step(crypto, &dh_out);
        self.send_ch = send_ch;
        self.nhks = Some(nhks);

        Ok(())
    }

    /// Advances the receiving chain up to (excluding) message number `until`, collecting the
    /// derived message keys for later storage. `stored` is how many keys the skipped-key store
    /// already holds for the chain's indexing key.
    ///
    /// The collected keys must only reach the store after the triggering message authenticated.
    pub(crate) fn skip_message_keys<C: CryptoProvider>(
        &mut self,
        crypto: &C,
        until: u32,
        stored: u32,
        max_skip: u32,
    ) -> Result<Vec<(u32, Key)>, SessionError> {
        if until < self.recv_ch.n {
            return Err(SessionError::OutOfOrder {
                requested: until,
                current: self.recv_ch.n,
            });
        }
        let skipping = until - self.recv_ch.n + stored;
        if skipping > max_skip {
            return Err(SessionError::TooManySkipped {
                skipping,
                max_skip,
            });
        }

        let mut skipped = Vec::with_capacity((until - self.recv_ch.n) as usize);
        while self.recv_ch.n < until {
            let mk = self.recv_ch.step(crypto);
            skipped.push((self.recv_ch.n - 1, mk));
        }
        Ok(skipped)
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;
    use crate::crypto::default::DefaultCrypto;
    use crate::crypto::x25519::KeyPair;
    use crate::keys::Key;
    use crate::message::MessageHeader;
    use crate::session::SessionError;
    use crate::traits::CryptoProvider;

    use super::State;

    fn state(crypto: &DefaultCrypto) -> State {
        let dhs = crypto.generate_dh().unwrap();
        State::new(dhs, &Key::from_bytes([42; 32]))
    }

    #[test]
    fn ratchet_rotates_chains_and_key_pair() {
        let crypto = DefaultCrypto::from_rng(Rng::from_seed([1; 32]));
        let mut state = state(&crypto);
        let remote = KeyPair::from_rng(&Rng::from_seed([2; 32])).unwrap();

        let old_public = state.dhs.public();
        state
            .dh_ratchet(
                &crypto,
                &MessageHeader {
                    dh: remote.public(),
                    n: 0,
                    pn: 0,
                },
            )
            .unwrap();

        assert_eq!(state.dhr, Some(remote.public()));
        assert_ne!(state.dhs.public(), old_public);
        assert_ne!(state.send_ch.ck, state.recv_ch.ck);
        assert_eq!(state.send_ch.n, 0);
        assert_eq!(state.recv_ch.n, 0);
        assert!(state.nhks.is_some());
        assert!(state.nhkr.is_some());
    }

    #[test]
    fn skipping_collects_keys_in_order() {
        let crypto = DefaultCrypto::from_rng(Rng::from_seed([1; 32]));
        let mut state = state(&crypto);

        let skipped = state.skip_message_keys(&crypto, 3, 0, 10).unwrap();

        assert_eq!(state.recv_ch.n, 3);
        let numbers: Vec<u32> = skipped.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
    }

    #[test]
    fn skipping_backwards_is_out_of_order() {
        let crypto = DefaultCrypto::from_rng(Rng::from_seed([1; 32]));
        let mut state = state(&crypto);

        state.skip_message_keys(&crypto, 2, 0, 10).unwrap();

        assert!(matches!(
            state.skip_message_keys(&crypto, 1, 0, 10),
            Err(SessionError::OutOfOrder {
                requested: 1,
                current: 2
            })
        ));
    }

    #[test]
    fn skip_limit_counts_stored_keys() {
        let crypto = DefaultCrypto::from_rng(Rng::from_seed([1; 32]));
        let mut state = state(&crypto);

        // Two to derive plus two already stored exceeds a limit of three.
        assert!(matches!(
            state.skip_message_keys(&crypto, 2, 2, 3),
            Err(SessionError::TooManySkipped {
                skipping: 4,
                max_skip: 3
            })
        ));

        // Within the limit the same request goes through.
        assert_eq!(state.skip_message_keys(&crypto, 2, 1, 3).unwrap().len(), 2);
    }
}
