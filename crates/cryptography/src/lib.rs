// -------------------------------------------------------------------------------------------------
//  Copyright (c) 2026 HyQuery Contributors
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// -------------------------------------------------------------------------------------------------

//! HMAC-SHA256 signing, verification, and key material helpers.
//!
//! Two independent consumers build on this crate:
//!
//! - the challenge-token service (`hyquery::challenge`), which truncates the
//!   tag to 24 bytes and recomputes it over a sliding set of time windows;
//! - the UDP coordinator (`hyquery-coordinator`), which signs and verifies
//!   full 32-byte tags over worker status/ACK frames.
//!
//! [`HmacKey`] wraps an `aws-lc-rs` HMAC key. The underlying key material is
//! immutable after construction and `Send + Sync`, so a single instance may
//! be shared across dispatch threads without any additional locking -- no
//! thread-local MAC objects are required.

use aws_lc_rs::hmac;
use rand::RngCore;

/// An HMAC-SHA256 key, safe to share across threads.
///
/// Construction is the only mutable step; every signing/verification
/// operation afterwards takes `&self`.
#[derive(Debug)]
pub struct HmacKey {
    key: hmac::Key,
}

impl HmacKey {
    /// Builds a key from raw secret bytes.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        }
    }

    /// Generates a new key from 32 cryptographically random bytes.
    ///
    /// Used when the operator configures an empty secret: tokens/ACKs
    /// signed with this key become invalid the next time the process
    /// restarts, since the key is never persisted.
    #[must_use]
    pub fn generate_random() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        Self::new(&bytes)
    }

    /// Computes the full 32-byte HMAC-SHA256 tag over `data`.
    #[must_use]
    pub fn sign(&self, data: &[u8]) -> [u8; 32] {
        let tag = hmac::sign(&self.key, data);
        let mut out = [0u8; 32];
        out.copy_from_slice(tag.as_ref());
        out
    }

    /// Computes the first `len` bytes of the HMAC-SHA256 tag over `data`.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds 32, the length of a SHA-256 tag.
    #[must_use]
    pub fn sign_truncated(&self, data: &[u8], len: usize) -> Vec<u8> {
        assert!(len <= 32, "truncated HMAC length must not exceed 32 bytes");
        let tag = hmac::sign(&self.key, data);
        tag.as_ref()[..len].to_vec()
    }

    /// Verifies a full 32-byte tag in constant time.
    #[must_use]
    pub fn verify(&self, data: &[u8], tag: &[u8]) -> bool {
        hmac::verify(&self.key, data, tag).is_ok()
    }
}

/// Compares two byte slices in constant time, regardless of where they first differ.
///
/// Returns `false` immediately (non-constant-time) if the lengths differ --
/// lengths are not secret in any of this crate's callers.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    aws_lc_rs::constant_time::verify_slices_are_equal(a, b).is_ok()
}
