// SPDX-License-Identifier: MIT OR Apache-2.0

//! SHA2 message-authentication functions.
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SHA256_DIGEST_SIZE: usize = 32;

/// HMAC-SHA2-256 message authentication code over a multi-part message.
pub fn hmac_sha2_256(key: &[u8], messages: &[&[u8]]) -> [u8; SHA256_DIGEST_SIZE] {
    let mut hmac =
        Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts keys of any length");
    for message in messages {
        hmac.update(message);
    }
    let result = hmac.finalize().into_bytes();
    result[..].try_into().expect("sha256 digest size")
}
