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

//! The challenge-authenticated, TLV-based V2 query/reply codec.
//!
//! Two magic-byte families (`HYQUERY2`/`HYREPLY2` and `ONEQUERY`/`ONEREPLY`)
//! share this exact wire shape; only the magic bytes differ. A response must
//! always echo the family of its request.

use bytes::{BufMut, BytesMut};
use uuid::Uuid;

use crate::{
    error::WireError,
    magic::V2Family,
    primitives::{write_string, write_uuid_be, Reader},
    types::PlayerEntry,
};

/// Length of the opaque challenge token, in bytes.
pub const CHALLENGE_TOKEN_LEN: usize = 32;

/// Maximum number of bytes a response datagram may occupy (MTU ceiling).
pub const MAX_MTU: usize = 1400;

/// Length of the 17-byte V2 response header (magic + version + flags + request-id + payload-length).
pub const RESPONSE_HEADER_LEN: usize = 17;

/// Total bytes of the fixed-shape challenge response (magic + 0x00 + token + 7 reserved bytes).
pub const CHALLENGE_RESPONSE_LEN: usize = 8 + 1 + CHALLENGE_TOKEN_LEN + 7;

/// Budget, in bytes, available to `PLAYER_LIST` entries within one page.
///
/// `SAFE_MTU(1400) - RESPONSE_HEADER_LEN(17) - 50`. The
/// trailing 50-byte margin is a deliberate safety allowance for the
/// TLV/PLAYER_LIST fixed fields and is not re-derived here.
pub const MAX_PAYLOAD_SIZE: usize = MAX_MTU - RESPONSE_HEADER_LEN - 50;

/// `0x0001` in the request's 16-bit flags field: an auth token follows the offset.
pub const REQUEST_FLAG_HAS_AUTH_TOKEN: u16 = 0x0001;

/// `0x0002` in the request's 16-bit flags field: the caller wants `HAS_ADDRESS`
/// populated in the reply, if the host has a known public address.
pub const REQUEST_FLAG_INCLUDE_ADDRESS: u16 = 0x0002;

/// An opaque 32-byte challenge token.
///
/// The protocol crate treats this purely as a byte string on the wire;
/// minting and verifying its internal structure is the challenge service's
/// responsibility (see `hyquery-network::challenge`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChallengeToken(pub [u8; CHALLENGE_TOKEN_LEN]);

impl ChallengeToken {
    /// Wraps a byte slice as a token, failing if its length isn't exactly 32.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() != CHALLENGE_TOKEN_LEN {
            return Err(WireError::LengthOutOfBounds {
                field: "challenge_token",
                declared: bytes.len(),
                remaining: bytes.len(),
            });
        }
        let mut arr = [0u8; CHALLENGE_TOKEN_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

/// Which endpoint a V2 request's type byte named.
///
/// `0x00` CHALLENGE, `0x01` BASIC, `0x02` PLAYERS; anything else decodes as
/// `Unknown` and is treated as BASIC by the request handler
/// step 5, not rejected at the wire layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `0x00` -- mint-and-return-a-token, no auth required.
    Challenge,
    /// `0x01` -- server identity and counts.
    Basic,
    /// `0x02` -- paginated player listing.
    Players,
    /// Any other type byte.
    Unknown(u8),
}

impl RequestKind {
    fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Challenge,
            0x01 => Self::Basic,
            0x02 => Self::Players,
            other => Self::Unknown(other),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Challenge => 0x00,
            Self::Basic => 0x01,
            Self::Players => 0x02,
            Self::Unknown(b) => b,
        }
    }
}

/// The body of a non-challenge V2 request (BASIC or PLAYERS).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Which magic-byte family this request arrived on.
    pub family: V2Family,
    /// The requested endpoint.
    pub kind: RequestKind,
    /// The challenge token presented for authentication.
    pub token: ChallengeToken,
    /// Echoed back in the response.
    pub request_id: u32,
    /// Raw request flags; bits `0x0001` (has-auth-token) and `0x0002`
    /// (include-address) are currently defined.
    pub flags: u16,
    /// Pagination offset for `PLAYERS` requests; ignored by `BASIC`.
    pub offset: u32,
    /// Bearer token presented for elevated permissions, if `flags & 0x0001`.
    pub auth_token: Option<String>,
}

impl QueryRequest {
    /// Returns whether the request carries an auth token.
    #[must_use]
    pub fn has_auth_token(&self) -> bool {
        self.flags & REQUEST_FLAG_HAS_AUTH_TOKEN != 0
    }

    /// Returns whether the request asked for `HAS_ADDRESS` in the reply.
    #[must_use]
    pub fn wants_address(&self) -> bool {
        self.flags & REQUEST_FLAG_INCLUDE_ADDRESS != 0
    }
}

/// A decoded V2 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum V2Request {
    /// A `CHALLENGE` request: magic + type byte only.
    Challenge {
        /// Which magic-byte family this request arrived on.
        family: V2Family,
    },
    /// A `BASIC` or `PLAYERS` request (or an unrecognized type byte, treated as `BASIC`).
    Query(QueryRequest),
}

impl V2Request {
    /// Returns the magic-byte family this request arrived on.
    #[must_use]
    pub fn family(&self) -> V2Family {
        match self {
            Self::Challenge { family } => *family,
            Self::Query(q) => q.family,
        }
    }

    /// Decodes a V2 request. `family` must already be known (from
    /// [`crate::magic::classify`]); this does not re-check the magic bytes
    /// beyond skipping them.
    pub fn decode(buf: &[u8], family: V2Family) -> Result<Self, WireError> {
        let mut reader = Reader::new(buf);
        let magic = reader.read_slice(8, "magic")?;
        if magic != family.request_magic() {
            return Err(WireError::WrongMagicFamily);
        }
        let kind = RequestKind::from_byte(reader.read_u8("type")?);

        if let RequestKind::Challenge = kind {
            reader.expect_exhausted()?;
            return Ok(Self::Challenge { family });
        }

        let token = ChallengeToken::from_slice(reader.read_slice(CHALLENGE_TOKEN_LEN, "token")?)?;
        let request_id = reader.read_u32_le("request_id")?;
        let flags = reader.read_u16_le("flags")?;
        let offset = reader.read_u32_le("offset")?;

        let auth_token = if flags & REQUEST_FLAG_HAS_AUTH_TOKEN != 0 {
            Some(reader.read_string("auth_token")?)
        } else {
            None
        };

        reader.expect_exhausted()?;
        Ok(Self::Query(QueryRequest {
            family,
            kind,
            token,
            request_id,
            flags,
            offset,
            auth_token,
        }))
    }

    /// Encodes this request (used by test harnesses and the demo client).
    #[must_use]
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(64);
        match self {
            Self::Challenge { family } => {
                buf.put_slice(family.request_magic());
                buf.put_u8(RequestKind::Challenge.to_byte());
            }
            Self::Query(q) => {
                buf.put_slice(q.family.request_magic());
                buf.put_u8(q.kind.to_byte());
                buf.put_slice(&q.token.0);
                buf.put_u32_le(q.request_id);
                buf.put_u16_le(q.flags);
                buf.put_u32_le(q.offset);
                if let Some(token) = &q.auth_token {
                    write_string(&mut buf, token);
                }
            }
        }
        buf
    }
}

/// Response-side flags carried in the 17-byte response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseFlags(pub u16);

impl ResponseFlags {
    /// More `PLAYER_LIST` pages remain beyond this response.
    pub const HAS_MORE_PLAYERS: u16 = 0x0001;
    /// The caller must retry with a valid auth token for this endpoint.
    pub const AUTH_REQUIRED: u16 = 0x0002;
    /// At least one field in this response was contributed by the fleet aggregate.
    pub const IS_NETWORK: u16 = 0x0010;
    /// The `SERVER_INFO` TLV includes a host/port address.
    pub const HAS_ADDRESS: u16 = 0x0020;

    /// An empty flag set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns whether `flag` is set.
    #[must_use]
    pub const fn has(self, flag: u16) -> bool {
        self.0 & flag != 0
    }

    /// Returns a copy with `flag` set.
    #[must_use]
    pub const fn with(self, flag: u16) -> Self {
        Self(self.0 | flag)
    }
}

/// TLV type tag for a `SERVER_INFO` payload.
pub const TLV_SERVER_INFO: u16 = 0x0001;
/// TLV type tag for a `PLAYER_LIST` payload.
pub const TLV_PLAYER_LIST: u16 = 0x0002;

/// The `SERVER_INFO` TLV value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server display name.
    pub name: String,
    /// Server message of the day.
    pub motd: String,
    /// Players currently online (local, plus aggregate if primary).
    pub online: i32,
    /// Maximum players accepted (local, plus aggregate if primary).
    pub max: i32,
    /// Server version string.
    pub version: String,
    /// Numeric protocol version.
    pub protocol_version: i32,
    /// Opaque protocol hash/build identifier.
    pub protocol_hash: String,
    /// Host and port, present iff the request asked for it and both are known.
    pub address: Option<(String, u16)>,
}

impl ServerInfo {
    fn encode_value(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(64);
        write_string(&mut buf, &self.name);
        write_string(&mut buf, &self.motd);
        buf.put_i32_le(self.online);
        buf.put_i32_le(self.max);
        write_string(&mut buf, &self.version);
        buf.put_i32_le(self.protocol_version);
        write_string(&mut buf, &self.protocol_hash);
        if let Some((host, port)) = &self.address {
            write_string(&mut buf, host);
            buf.put_u16_le(*port);
        }
        buf
    }

    fn decode_value(buf: &[u8], has_address: bool) -> Result<Self, WireError> {
        let mut reader = Reader::new(buf);
        let name = reader.read_string("server_info.name")?;
        let motd = reader.read_string("server_info.motd")?;
        let online = reader.read_i32_le("server_info.online")?;
        let max = reader.read_i32_le("server_info.max")?;
        let version = reader.read_string("server_info.version")?;
        let protocol_version = reader.read_i32_le("server_info.protocol_version")?;
        let protocol_hash = reader.read_string("server_info.protocol_hash")?;
        let address = if has_address {
            let host = reader.read_string("server_info.host")?;
            let port = reader.read_u16_le("server_info.port")?;
            Some((host, port))
        } else {
            None
        };
        reader.expect_exhausted()?;
        Ok(Self {
            name,
            motd,
            online,
            max,
            version,
            protocol_version,
            protocol_hash,
            address,
        })
    }
}

/// A single page of a paginated player list, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerListPage {
    /// Total players across every page.
    pub total: i32,
    /// Offset of the first entry in this page.
    pub start_offset: i32,
    /// Entries included in this page.
    pub entries: Vec<PlayerEntry>,
    /// Whether pages remain after this one.
    pub has_more: bool,
}

/// Selects the entries of `players[offset..]` that fit within
/// [`MAX_PAYLOAD_SIZE`], per the pagination rule below.
///
/// `players` must already be in the response's intended display order;
/// sorting is the caller's responsibility.
#[must_use]
pub fn paginate_players(players: &[PlayerEntry], offset: u32) -> PlayerListPage {
    let total = players.len();
    let start = (offset as usize).min(total);

    let mut budget_used = 0usize;
    let mut end = start;
    for entry in &players[start..] {
        let cost = 2 + entry.username.len() + 16;
        if budget_used + cost > MAX_PAYLOAD_SIZE {
            break;
        }
        budget_used += cost;
        end += 1;
    }

    PlayerListPage {
        total: total as i32,
        start_offset: start as i32,
        entries: players[start..end].to_vec(),
        has_more: end < total,
    }
}

impl PlayerListPage {
    fn encode_value(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(16 + self.entries.len() * 20);
        buf.put_i32_le(self.total);
        buf.put_i32_le(self.entries.len() as i32);
        buf.put_i32_le(self.start_offset);
        for entry in &self.entries {
            write_string(&mut buf, &entry.username);
            write_uuid_be(&mut buf, &entry.uuid);
        }
        buf
    }

    fn decode_value(buf: &[u8]) -> Result<Self, WireError> {
        let mut reader = Reader::new(buf);
        let total = reader.read_i32_le("player_list.total")?;
        let count = reader.read_i32_le("player_list.count")? as usize;
        let start_offset = reader.read_i32_le("player_list.start_offset")?;
        let mut entries = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            let username = reader.read_string("player_list.entry.username")?;
            let uuid: Uuid = reader.read_uuid_be("player_list.entry.uuid")?;
            entries.push(PlayerEntry {
                username,
                uuid,
                source_server_id: None,
            });
        }
        reader.expect_exhausted()?;
        Ok(Self {
            total,
            start_offset,
            entries,
            has_more: false,
        })
    }
}

/// The single TLV payload a V2 response carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    /// A `SERVER_INFO` TLV (the `BASIC` endpoint's response).
    ServerInfo(ServerInfo),
    /// A `PLAYER_LIST` TLV (the `PLAYERS` endpoint's response).
    PlayerList(PlayerListPage),
    /// No TLV at all -- used for the minimal `AUTH_REQUIRED` response body.
    Empty,
}

fn write_tlv(buf: &mut BytesMut, tlv_type: u16, value: &[u8]) {
    buf.put_u16_le(tlv_type);
    buf.put_u16_le(value.len() as u16);
    buf.put_slice(value);
}

/// A fully-formed V2 query response (everything but the challenge response shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V2Response {
    /// Which magic-byte family this response answers.
    pub family: V2Family,
    /// Echoes the request's id.
    pub request_id: u32,
    /// Response-side flags.
    pub flags: ResponseFlags,
    /// The single TLV payload, if any.
    pub payload: ResponsePayload,
}

impl V2Response {
    /// Encodes the full response datagram: 17-byte header + TLV payload.
    #[must_use]
    pub fn encode(&self) -> BytesMut {
        let payload_bytes = match &self.payload {
            ResponsePayload::ServerInfo(info) => {
                let mut buf = BytesMut::new();
                write_tlv(&mut buf, TLV_SERVER_INFO, &info.encode_value());
                buf
            }
            ResponsePayload::PlayerList(page) => {
                let mut buf = BytesMut::new();
                write_tlv(&mut buf, TLV_PLAYER_LIST, &page.encode_value());
                buf
            }
            ResponsePayload::Empty => BytesMut::new(),
        };

        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_LEN + payload_bytes.len());
        buf.put_slice(self.family.reply_magic());
        buf.put_u8(0x01); // version
        buf.put_u16_le(self.flags.0);
        buf.put_u32_le(self.request_id);
        buf.put_u16_le(payload_bytes.len() as u16);
        buf.put_slice(&payload_bytes);
        buf
    }

    /// Decodes a response, given the family it's expected to answer.
    pub fn decode(buf: &[u8], expected_family: V2Family) -> Result<Self, WireError> {
        let mut reader = Reader::new(buf);
        let magic = reader.read_slice(8, "magic")?;
        if magic != expected_family.reply_magic() {
            return Err(WireError::WrongMagicFamily);
        }
        let _version = reader.read_u8("version")?;
        let flags = ResponseFlags(reader.read_u16_le("flags")?);
        let request_id = reader.read_u32_le("request_id")?;
        let payload_len = reader.read_u16_le("payload_length")? as usize;
        let payload_bytes = reader.read_slice(payload_len, "payload")?;
        reader.expect_exhausted()?;

        let payload = if payload_bytes.is_empty() {
            ResponsePayload::Empty
        } else {
            let mut tlv_reader = Reader::new(payload_bytes);
            let tlv_type = tlv_reader.read_u16_le("tlv.type")?;
            let value_len = tlv_reader.read_u16_le("tlv.length")? as usize;
            let value = tlv_reader.read_slice(value_len, "tlv.value")?;
            tlv_reader.expect_exhausted()?;
            match tlv_type {
                TLV_SERVER_INFO => {
                    ResponsePayload::ServerInfo(ServerInfo::decode_value(value, flags.has(ResponseFlags::HAS_ADDRESS))?)
                }
                TLV_PLAYER_LIST => {
                    let mut page = PlayerListPage::decode_value(value)?;
                    page.has_more = flags.has(ResponseFlags::HAS_MORE_PLAYERS);
                    ResponsePayload::PlayerList(page)
                }
                other => return Err(WireError::UnknownType(other as u8)),
            }
        };

        Ok(Self {
            family: expected_family,
            request_id,
            flags,
            payload,
        })
    }
}

/// Encodes the fixed-shape challenge response: magic + 0x00 + token + 7 reserved zero bytes.
#[must_use]
pub fn encode_challenge_response(family: V2Family, token: ChallengeToken) -> BytesMut {
    let mut buf = BytesMut::with_capacity(CHALLENGE_RESPONSE_LEN);
    buf.put_slice(family.reply_magic());
    buf.put_u8(0x00);
    buf.put_slice(&token.0);
    buf.put_bytes(0, 7);
    buf
}

/// Decodes a fixed-shape challenge response.
pub fn decode_challenge_response(buf: &[u8], expected_family: V2Family) -> Result<ChallengeToken, WireError> {
    let mut reader = Reader::new(buf);
    let magic = reader.read_slice(8, "magic")?;
    if magic != expected_family.reply_magic() {
        return Err(WireError::WrongMagicFamily);
    }
    let _zero = reader.read_u8("reserved_type")?;
    let token = ChallengeToken::from_slice(reader.read_slice(CHALLENGE_TOKEN_LEN, "token")?)?;
    let _reserved = reader.read_slice(7, "reserved")?;
    reader.expect_exhausted()?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(byte: u8) -> ChallengeToken {
        ChallengeToken([byte; CHALLENGE_TOKEN_LEN])
    }

    #[test]
    fn challenge_request_round_trips() {
        let req = V2Request::Challenge {
            family: V2Family::OneQuery,
        };
        let encoded = req.encode();
        assert_eq!(&encoded[..], b"ONEQUERY\x00");
        assert_eq!(V2Request::decode(&encoded, V2Family::OneQuery).unwrap(), req);
    }

    #[test]
    fn challenge_response_is_exactly_48_bytes() {
        let encoded = encode_challenge_response(V2Family::OneQuery, token(0xAB));
        assert_eq!(encoded.len(), CHALLENGE_RESPONSE_LEN);
        assert_eq!(encoded.len(), 48);
        let decoded = decode_challenge_response(&encoded, V2Family::OneQuery).unwrap();
        assert_eq!(decoded, token(0xAB));
    }

    /// Challenge then a BASIC query.
    #[test]
    fn basic_query_request_round_trips_without_auth_token() {
        let req = QueryRequest {
            family: V2Family::OneQuery,
            kind: RequestKind::Basic,
            token: token(7),
            request_id: 1,
            flags: 0,
            offset: 0,
            auth_token: None,
        };
        let encoded = V2Request::Query(req.clone()).encode();
        let decoded = V2Request::decode(&encoded, V2Family::OneQuery).unwrap();
        assert_eq!(decoded, V2Request::Query(req));
    }

    #[test]
    fn query_request_with_auth_token_round_trips() {
        let req = QueryRequest {
            family: V2Family::HyQuery2,
            kind: RequestKind::Players,
            token: token(9),
            request_id: 42,
            flags: REQUEST_FLAG_HAS_AUTH_TOKEN,
            offset: 10,
            auth_token: Some("secret-bearer".to_string()),
        };
        assert!(req.has_auth_token());
        let encoded = V2Request::Query(req.clone()).encode();
        let decoded = V2Request::decode(&encoded, V2Family::HyQuery2).unwrap();
        assert_eq!(decoded, V2Request::Query(req));
    }

    #[test]
    fn unknown_type_byte_decodes_as_unknown_not_an_error() {
        let req = QueryRequest {
            family: V2Family::OneQuery,
            kind: RequestKind::Unknown(0x7F),
            token: token(1),
            request_id: 1,
            flags: 0,
            offset: 0,
            auth_token: None,
        };
        let encoded = V2Request::Query(req.clone()).encode();
        let decoded = V2Request::decode(&encoded, V2Family::OneQuery).unwrap();
        assert_eq!(decoded, V2Request::Query(req));
    }

    #[test]
    fn server_info_response_round_trips_without_address() {
        let response = V2Response {
            family: V2Family::OneQuery,
            request_id: 1,
            flags: ResponseFlags::empty(),
            payload: ResponsePayload::ServerInfo(ServerInfo {
                name: "Hytale Server".into(),
                motd: "hi".into(),
                online: 2,
                max: 100,
                version: "1.0".into(),
                protocol_version: 1,
                protocol_hash: "abc123".into(),
                address: None,
            }),
        };
        let encoded = response.encode();
        assert_eq!(&encoded[0..8], b"ONEREPLY");
        let decoded = V2Response::decode(&encoded, V2Family::OneQuery).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn server_info_response_with_address_round_trips() {
        let response = V2Response {
            family: V2Family::HyQuery2,
            request_id: 5,
            flags: ResponseFlags::empty().with(ResponseFlags::HAS_ADDRESS),
            payload: ResponsePayload::ServerInfo(ServerInfo {
                name: "s".into(),
                motd: "m".into(),
                online: 0,
                max: 10,
                version: "1.0".into(),
                protocol_version: 1,
                protocol_hash: "h".into(),
                address: Some(("play.example.com".into(), 25565)),
            }),
        };
        let encoded = response.encode();
        let decoded = V2Response::decode(&encoded, V2Family::HyQuery2).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn response_with_wrong_family_magic_is_rejected() {
        let response = V2Response {
            family: V2Family::OneQuery,
            request_id: 1,
            flags: ResponseFlags::empty(),
            payload: ResponsePayload::Empty,
        };
        let encoded = response.encode();
        assert!(matches!(
            V2Response::decode(&encoded, V2Family::HyQuery2),
            Err(WireError::WrongMagicFamily)
        ));
    }

    #[test]
    fn paginate_players_clamps_offset_to_total() {
        let players: Vec<PlayerEntry> = (0..5)
            .map(|i| PlayerEntry::local(format!("p{i}"), Uuid::from_u128(i)))
            .collect();
        let page = paginate_players(&players, 999);
        assert_eq!(page.start_offset, 5);
        assert!(page.entries.is_empty());
        assert!(!page.has_more);
    }

    /// 500 players: pagination must cover all of them exactly once.
    #[test]
    fn pagination_over_many_players_covers_every_player_exactly_once() {
        let players: Vec<PlayerEntry> = (0..500)
            .map(|i| PlayerEntry::local(format!("player-{i:04}"), Uuid::from_u128(i)))
            .collect();

        let mut offset = 0u32;
        let mut seen = std::collections::HashSet::new();
        loop {
            let page = paginate_players(&players, offset);
            assert!(!page.entries.is_empty() || players.is_empty());
            for entry in &page.entries {
                assert!(seen.insert(entry.username.clone()), "duplicate player in pagination");
            }
            offset += page.entries.len() as u32;
            if !page.has_more {
                assert_eq!(offset as usize, players.len());
                break;
            }
        }
        assert_eq!(seen.len(), players.len());
    }

    #[test]
    fn single_page_when_entries_fit_under_budget() {
        let players: Vec<PlayerEntry> = (0..3)
            .map(|i| PlayerEntry::local(format!("p{i}"), Uuid::from_u128(i)))
            .collect();
        let page = paginate_players(&players, 0);
        assert_eq!(page.entries.len(), 3);
        assert!(!page.has_more);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn player_list_response_round_trips_has_more_flag() {
        let page = PlayerListPage {
            total: 500,
            start_offset: 0,
            entries: vec![PlayerEntry::local("alice", Uuid::from_u128(1))],
            has_more: true,
        };
        let response = V2Response {
            family: V2Family::OneQuery,
            request_id: 9,
            flags: ResponseFlags::empty().with(ResponseFlags::HAS_MORE_PLAYERS),
            payload: ResponsePayload::PlayerList(page.clone()),
        };
        let encoded = response.encode();
        let decoded = V2Response::decode(&encoded, V2Family::OneQuery).unwrap();
        match decoded.payload {
            ResponsePayload::PlayerList(decoded_page) => {
                assert_eq!(decoded_page.total, page.total);
                assert_eq!(decoded_page.entries, page.entries);
                assert!(decoded_page.has_more);
            }
            _ => panic!("expected a player list payload"),
        }
    }

    #[test]
    fn response_never_exceeds_mtu_for_a_full_budget_page() {
        let players: Vec<PlayerEntry> = (0..2000)
            .map(|i| PlayerEntry::local(format!("player-{i:05}"), Uuid::from_u128(i)))
            .collect();
        let page = paginate_players(&players, 0);
        let response = V2Response {
            family: V2Family::OneQuery,
            request_id: 1,
            flags: ResponseFlags::empty().with(ResponseFlags::HAS_MORE_PLAYERS),
            payload: ResponsePayload::PlayerList(page),
        };
        assert!(response.encode().len() <= MAX_MTU);
    }
}
