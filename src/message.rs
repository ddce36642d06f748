// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messages exchanged by the parties of a session and the header wire codec.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::x25519::{PUBLIC_KEY_SIZE, PublicKey};

/// Size of an encoded message header on the wire.
pub const HEADER_SIZE: usize = 40;

/// Header prepended to every message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Ratchet public key of the sender at the time the message was sent.
    pub dh: PublicKey,

    /// Number of the message in the current sending chain.
    pub n: u32,

    /// Length of the previous sending chain.
    pub pn: u32,
}

impl MessageHeader {
    /// Encodes the header into its fixed 40-byte little-endian wire form:
    ///
    /// ```text
    /// n (4 bytes) || pn (4 bytes) || dh (32 bytes)
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(&self.n.to_le_bytes());
        out[4..8].copy_from_slice(&self.pn.to_le_bytes());
        out[8..].copy_from_slice(self.dh.as_bytes());
        out
    }

    /// Decodes a header from its wire form.
    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() != HEADER_SIZE {
            return Err(HeaderError::InvalidLength(bytes.len()));
        }
        let n = u32::from_le_bytes(bytes[..4].try_into().expect("length checked"));
        let pn = u32::from_le_bytes(bytes[4..8].try_into().expect("length checked"));
        let dh_bytes: [u8; PUBLIC_KEY_SIZE] = bytes[8..].try_into().expect("length checked");
        Ok(Self {
            dh: PublicKey::from_bytes(dh_bytes),
            n,
            pn,
        })
    }
}

/// Message of the plain protocol: a structured header next to the AEAD ciphertext.
///
/// The ciphertext layout is `iv (16) || encrypted payload || mac (32)`. How header and
/// ciphertext are framed for transport (JSON, CBOR, a fixed layout using
/// [`MessageHeader::encode`]) is the choice of the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub header: MessageHeader,
    pub ciphertext: Vec<u8>,
}

/// Message of the header-encrypted protocol. The header is itself an AEAD ciphertext of the
/// encoded [`MessageHeader`], concealing the ratchet public key and message counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHE {
    pub header: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Builds the full associated data for the AEAD step: caller-provided associated data followed
/// by the (possibly encrypted) encoded header.
pub(crate) fn associated_data(ad: &[u8], header: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ad.len() + header.len());
    out.extend_from_slice(ad);
    out.extend_from_slice(header);
    out
}

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("encoded message header must be 40 bytes, got {0}")]
    InvalidLength(usize),
}
