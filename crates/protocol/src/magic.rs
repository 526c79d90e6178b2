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

//! The 8-byte magic prefixes every HyQuery frame begins with.

/// Legacy V1 query request.
pub const V1_QUERY: &[u8; 8] = b"HYQUERY\0";
/// Legacy V1 query response.
pub const V1_REPLY: &[u8; 8] = b"HYREPLY\0";

/// V2 query request/response, `HYQUERY2` family.
pub const V2_QUERY_HYQUERY2: &[u8; 8] = b"HYQUERY2";
/// V2 query response, `HYQUERY2` family.
pub const V2_REPLY_HYQUERY2: &[u8; 8] = b"HYREPLY2";

/// V2 query request/response, `ONEQUERY` family.
pub const V2_QUERY_ONEQUERY: &[u8; 8] = b"ONEQUERY";
/// V2 query response, `ONEQUERY` family.
pub const V2_REPLY_ONEQUERY: &[u8; 8] = b"ONEREPLY";

/// Worker status update, sent worker -> primary.
pub const STATUS: &[u8; 8] = b"HYSTATUS";
/// Status acknowledgement, sent primary -> worker.
pub const STATOK: &[u8; 8] = b"HYSTATOK";

/// Which V2 magic-byte pair a request/response belongs to.
///
/// A response must echo the family of its request: `HYQUERY2` requests get
/// `HYREPLY2` responses, `ONEQUERY` requests get `ONEREPLY` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum V2Family {
    /// The `HYQUERY2`/`HYREPLY2` pair.
    HyQuery2,
    /// The `ONEQUERY`/`ONEREPLY` pair.
    OneQuery,
}

impl V2Family {
    /// Returns the request magic for this family.
    #[must_use]
    pub const fn request_magic(self) -> &'static [u8; 8] {
        match self {
            Self::HyQuery2 => V2_QUERY_HYQUERY2,
            Self::OneQuery => V2_QUERY_ONEQUERY,
        }
    }

    /// Returns the response magic for this family.
    #[must_use]
    pub const fn reply_magic(self) -> &'static [u8; 8] {
        match self {
            Self::HyQuery2 => V2_REPLY_HYQUERY2,
            Self::OneQuery => V2_REPLY_ONEQUERY,
        }
    }

    /// Identifies the family from a request's magic bytes, if recognized.
    #[must_use]
    pub fn from_request_magic(magic: &[u8]) -> Option<Self> {
        if magic == V2_QUERY_HYQUERY2 {
            Some(Self::HyQuery2)
        } else if magic == V2_QUERY_ONEQUERY {
            Some(Self::OneQuery)
        } else {
            None
        }
    }
}

/// The classification the packet demultiplexer assigns to an inbound datagram
/// after inspecting its 8-byte magic prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// `HYQUERY\0` -- a V1 query.
    V1Query,
    /// A V2 query in the given family.
    V2Query(V2Family),
    /// `HYSTATUS` -- a worker status update (primary only).
    WorkerStatus,
    /// A recognized-but-not-accepted-here response/ACK magic: `HYSTATOK`,
    /// `HYREPLY\0`, `HYREPLY2`, `ONEREPLY`. Dropped, not forwarded.
    RecognizedNotAccepted,
    /// Anything else: forwarded unchanged to the next transport layer.
    Foreign,
}

/// Classifies a datagram by its leading bytes without consuming them.
///
/// Datagrams shorter than 8 bytes cannot carry any recognized magic and are
/// classified as [`Classification::Foreign`].
#[must_use]
pub fn classify(prefix: &[u8]) -> Classification {
    if prefix.len() < 8 {
        return Classification::Foreign;
    }
    let head = &prefix[..8];
    if head == V1_QUERY {
        Classification::V1Query
    } else if head == V2_QUERY_HYQUERY2 {
        Classification::V2Query(V2Family::HyQuery2)
    } else if head == V2_QUERY_ONEQUERY {
        Classification::V2Query(V2Family::OneQuery)
    } else if head == STATUS {
        Classification::WorkerStatus
    } else if head == STATOK || head == V1_REPLY || head == V2_REPLY_HYQUERY2 || head == V2_REPLY_ONEQUERY {
        Classification::RecognizedNotAccepted
    } else {
        Classification::Foreign
    }
}
