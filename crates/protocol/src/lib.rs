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

//! Wire encoding and decoding for every HyQuery frame shape.
//!
//! This crate is deliberately inert: it has no sockets, no clock, no
//! configuration, and panics only on programmer error (e.g. requesting a
//! truncated HMAC longer than 32 bytes in the cryptography crate). Every
//! fallible entry point returns a [`crate::error::WireError`] (or the status
//! frames' own [`crate::status::StatusVerifyError`]), and callers are
//! expected to treat decode failures as "drop the datagram", never as a
//! reason to reply.
//!
//! Three independent wire families live here, sharing [`primitives`]'s
//! integer/string/UUID helpers but not much else:
//!
//! - [`v1`] -- the legacy, unauthenticated `HYQUERY\0`/`HYREPLY\0` protocol.
//! - [`v2`] -- the challenge-authenticated, TLV-based protocol, spoken over
//!   two interchangeable magic-byte families (see [`magic::V2Family`]).
//! - [`status`] -- the HMAC-signed frames the UDP coordinator uses between a
//!   worker and its primary.
//!
//! [`magic::classify`] is the single entry point a caller should use to
//! decide which of the three a freshly-received datagram belongs to, by
//! peeking its first 8 bytes without consuming them.

pub mod error;
pub mod magic;
pub mod primitives;
pub mod status;
pub mod types;
pub mod v1;
pub mod v2;

pub use error::WireError;
pub use magic::{classify, Classification, V2Family};
pub use status::{AckStatus, StatusAck, StatusPayload, StatusUpdate, StatusVerifyError};
pub use types::{PlayerEntry, RemoteServerEntry, RemoteServerStatus};
pub use v1::{V1FullFields, V1Kind, V1Request, V1Response};
pub use v2::{
    decode_challenge_response, encode_challenge_response, paginate_players, ChallengeToken,
    PlayerListPage, QueryRequest, RequestKind, ResponseFlags, ResponsePayload, ServerInfo,
    REQUEST_FLAG_INCLUDE_ADDRESS,
};
pub use v2::{V2Request, V2Response};
