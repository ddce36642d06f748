// SPDX-License-Identifier: MIT OR Apache-2.0

//! Symmetric KDF chains of the ratchet.
use serde::{Deserialize, Serialize};

use crate::keys::Key;
use crate::traits::CryptoProvider;

/// Root chain, advanced once per Diffie-Hellman ratchet step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RootChain {
    pub(crate) ck: Key,
}

impl RootChain {
    pub(crate) fn new(ck: Key) -> Self {
        Self { ck }
    }

    /// Advances the root chain with a Diffie-Hellman output, yielding a fresh sending or
    /// receiving chain and the next header key.
    pub(crate) fn step<C: CryptoProvider>(&mut self, crypto: &C, dh_out: &Key) -> (Chain, Key) {
        let (root_key, chain_key, header_key) = crypto.kdf_rk(&self.ck, dh_out);
        self.ck = root_key;
        (Chain::new(chain_key), header_key)
    }
}

/// Sending or receiving chain, advanced once per message.
///
/// `n` counts message-key derivations since the last Diffie-Hellman ratchet step. It fills
/// message headers and detects out-of-order delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Chain {
    pub(crate) ck: Key,
    pub(crate) n: u32,
}

impl Chain {
    pub(crate) fn new(ck: Key) -> Self {
        Self { ck, n: 0 }
    }

    /// Advances the chain and returns the derived message key.
    pub(crate) fn step<C: CryptoProvider>(&mut self, crypto: &C) -> Key {
        let (chain_key, message_key) = crypto.kdf_ck(&self.ck);
        self.ck = chain_key;
        self.n += 1;
        message_key
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;
    use crate::crypto::default::DefaultCrypto;
    use crate::keys::Key;

    use super::{Chain, RootChain};

    #[test]
    fn root_step_replaces_chain_key() {
        let crypto = DefaultCrypto::from_rng(Rng::from_seed([1; 32]));
        let mut root = RootChain::new(Key::from_bytes([1; 32]));

        let (chain, header_key) = root.step(&crypto, &Key::from_bytes([2; 32]));

        assert_ne!(root.ck, Key::from_bytes([1; 32]));
        assert_eq!(chain.n, 0);
        assert_ne!(chain.ck, root.ck);
        assert_ne!(chain.ck, header_key);
    }

    #[test]
    fn chain_steps_count_and_differ() {
        let crypto = DefaultCrypto::from_rng(Rng::from_seed([1; 32]));
        let mut chain = Chain::new(Key::from_bytes([3; 32]));

        let mk_0 = chain.step(&crypto);
        let mk_1 = chain.step(&crypto);

        assert_eq!(chain.n, 2);
        assert_ne!(mk_0, mk_1);
    }
}
