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

//! The stateless, address-bound challenge-token service.
//!
//! A token authenticates "the holder received this token from us, recently,
//! and is replying from the address we minted it for" without the server
//! keeping any per-client state: everything needed to verify a token is
//! recomputable from the token's own window field, the verifying key, and
//! the peer address the datagram arrived from.
//!
//! Token layout (32 bytes): `[4-byte BE window index][4 reserved zero
//! bytes][24-byte truncated HMAC-SHA256(window ‖ address)]`.

use std::net::SocketAddr;

use hyquery_core::Clock;
use hyquery_cryptography::{constant_time_eq, HmacKey};
use hyquery_protocol::ChallengeToken;

/// Width of each challenge-token time window, in seconds.
pub const WINDOW_SECS: i64 = 30;

/// Derives how many windows (including the current one) are accepted for a
/// given `challengeTokenValiditySeconds`: `ceil(validity-seconds / 30)`.
/// Always at least 1, so the current window is always accepted even at the
/// smallest configured validity.
fn accepted_windows_back(validity_seconds: u64) -> u32 {
    let validity = validity_seconds.max(1) as i64;
    let windows = (validity + WINDOW_SECS - 1) / WINDOW_SECS;
    windows.max(1) as u32
}

fn encode_addr(addr: SocketAddr) -> Vec<u8> {
    let mut bytes = match addr.ip() {
        std::net::IpAddr::V4(v4) => v4.octets().to_vec(),
        std::net::IpAddr::V6(v6) => v6.octets().to_vec(),
    };
    bytes.extend_from_slice(&addr.port().to_be_bytes());
    bytes
}

/// Mints and verifies challenge tokens for a single signing key.
pub struct ChallengeService {
    key: HmacKey,
    clock: std::sync::Arc<dyn Clock>,
    windows_back: u32,
}

impl ChallengeService {
    /// Builds a challenge service signing with `key`, accepting tokens up to
    /// `validity_seconds` old (rounded up to whole 30-second windows).
    #[must_use]
    pub fn new(key: HmacKey, clock: std::sync::Arc<dyn Clock>, validity_seconds: u64) -> Self {
        Self {
            key,
            clock,
            windows_back: accepted_windows_back(validity_seconds),
        }
    }

    fn current_window(&self) -> u32 {
        let seconds = self.clock.unix_millis().as_i64().div_euclid(1000);
        seconds.div_euclid(WINDOW_SECS) as u32
    }

    fn token_for_window(&self, window: u32, addr: SocketAddr) -> ChallengeToken {
        let mut mac_input = Vec::with_capacity(4 + 18);
        mac_input.extend_from_slice(&window.to_be_bytes());
        mac_input.extend_from_slice(&encode_addr(addr));
        let tag = self.key.sign_truncated(&mac_input, 24);

        let mut bytes = [0u8; 32];
        bytes[0..4].copy_from_slice(&window.to_be_bytes());
        bytes[8..32].copy_from_slice(&tag);
        ChallengeToken(bytes)
    }

    /// Mints a fresh token bound to `addr` for the current time window.
    #[must_use]
    pub fn mint(&self, addr: SocketAddr) -> ChallengeToken {
        self.token_for_window(self.current_window(), addr)
    }

    /// Verifies that `token` was minted by this service for `addr` within
    /// the accepted window range.
    #[must_use]
    pub fn verify(&self, token: &ChallengeToken, addr: SocketAddr) -> bool {
        let token_window = u32::from_be_bytes([token.0[0], token.0[1], token.0[2], token.0[3]]);
        let current = self.current_window();

        // i in [0, windows_back) -- a half-open range of exactly
        // `windows_back` offsets, never accepting a token from the future.
        let accepted = (0..self.windows_back).any(|back| current.wrapping_sub(back) == token_window);
        if !accepted {
            return false;
        }

        let expected = self.token_for_window(token_window, addr);
        constant_time_eq(&expected.0, &token.0)
    }
}
