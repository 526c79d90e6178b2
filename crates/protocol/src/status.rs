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

//! Signed status/ACK frames exchanged between a worker and the primary in
//! the UDP coordinator.
//!
//! `HYSTATUS` (worker -> primary) carries a worker's current snapshot, tagged
//! with a 32-byte HMAC. `HYSTATOK` (primary -> worker) acknowledges receipt.
//!
//! Both frames place the HMAC between the timestamp and the payload it
//! covers, rather than trailing it. The tag is still computed over
//! `magic ‖ version ‖ timestamp ‖ payload` -- the wire position of the tag
//! is cosmetic, not part of what it authenticates. This placement is a
//! carried-over wire quirk, not refactored away: worker and primary
//! implementations must agree on it exactly.

use bytes::{BufMut, BytesMut};
use hyquery_cryptography::HmacKey;
use uuid::Uuid;

use crate::{
    error::WireError,
    magic::{STATOK, STATUS},
    primitives::{write_string, write_uuid_be, Reader},
    types::PlayerEntry,
};

const HMAC_LEN: usize = 32;

/// A worker's self-reported snapshot, as carried inside a `HYSTATUS` frame's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPayload {
    /// The worker's configured id, used by the primary to select a verification key.
    pub worker_id: String,
    /// Server display name.
    pub name: String,
    /// Server message of the day.
    pub motd: String,
    /// Players currently online.
    pub online: u32,
    /// Maximum players accepted.
    pub max: u32,
    /// Players connected to this worker.
    pub players: Vec<PlayerEntry>,
}

impl StatusPayload {
    fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(64);
        write_string(&mut buf, &self.worker_id);
        write_string(&mut buf, &self.name);
        write_string(&mut buf, &self.motd);
        buf.put_u32_le(self.online);
        buf.put_u32_le(self.max);
        buf.put_u32_le(self.players.len() as u32);
        for player in &self.players {
            write_string(&mut buf, &player.username);
            write_uuid_be(&mut buf, &player.uuid);
        }
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut reader = Reader::new(buf);
        let worker_id = reader.read_string("status.worker_id")?;
        let name = reader.read_string("status.name")?;
        let motd = reader.read_string("status.motd")?;
        let online = reader.read_u32_le("status.online")?;
        let max = reader.read_u32_le("status.max")?;
        let player_count = reader.read_u32_le("status.player_count")? as usize;
        let mut players = Vec::with_capacity(player_count.min(4096));
        for _ in 0..player_count {
            let username = reader.read_string("status.player.username")?;
            let uuid: Uuid = reader.read_uuid_be("status.player.uuid")?;
            players.push(PlayerEntry {
                username,
                uuid,
                source_server_id: None,
            });
        }
        reader.expect_exhausted()?;
        Ok(Self {
            worker_id,
            name,
            motd,
            online,
            max,
            players,
        })
    }
}

/// A fully-formed, already-signed `HYSTATUS` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Milliseconds since the UNIX epoch when the worker sent this frame.
    pub timestamp_millis: i64,
    /// The worker's snapshot.
    pub payload: StatusPayload,
}

fn signed_region(timestamp_millis: i64, payload_bytes: &[u8]) -> BytesMut {
    let mut region = BytesMut::with_capacity(8 + 1 + 8 + payload_bytes.len());
    region.put_slice(STATUS);
    region.put_u8(0x01);
    region.put_i64_le(timestamp_millis);
    region.put_slice(payload_bytes);
    region
}

impl StatusUpdate {
    /// Encodes and signs this status update with `key`.
    #[must_use]
    pub fn encode_signed(&self, key: &HmacKey) -> BytesMut {
        let payload_bytes = self.payload.encode();
        let tag = key.sign(&signed_region(self.timestamp_millis, &payload_bytes));

        let mut buf = BytesMut::with_capacity(8 + 1 + 8 + HMAC_LEN + payload_bytes.len());
        buf.put_slice(STATUS);
        buf.put_u8(0x01);
        buf.put_i64_le(self.timestamp_millis);
        buf.put_slice(&tag);
        buf.put_slice(&payload_bytes);
        buf
    }

    /// Decodes a `HYSTATUS` frame and verifies its tag against `key`.
    ///
    /// `key` must already be the one registered for the claimed worker id --
    /// callers read [`StatusUpdate::peek_worker_id`] first to select it.
    pub fn decode_and_verify(buf: &[u8], key: &HmacKey) -> Result<Self, StatusVerifyError> {
        let mut reader = Reader::new(buf);
        let magic = reader
            .read_slice(8, "magic")
            .map_err(StatusVerifyError::Wire)?;
        if magic != STATUS {
            return Err(StatusVerifyError::Wire(WireError::WrongMagicFamily));
        }
        let _version = reader.read_u8("version").map_err(StatusVerifyError::Wire)?;
        let timestamp_millis = reader
            .read_i64_le("timestamp")
            .map_err(StatusVerifyError::Wire)?;
        let tag = reader
            .read_slice(HMAC_LEN, "hmac")
            .map_err(StatusVerifyError::Wire)?
            .to_vec();
        let payload_bytes = &buf[reader.position()..];

        if !key.verify(&signed_region(timestamp_millis, payload_bytes), &tag) {
            return Err(StatusVerifyError::BadHmac);
        }

        let payload = StatusPayload::decode(payload_bytes).map_err(StatusVerifyError::Wire)?;
        Ok(Self {
            timestamp_millis,
            payload,
        })
    }

    /// Reads just the claimed worker id out of an unverified `HYSTATUS` frame,
    /// so the primary can look up which key to verify against.
    pub fn peek_worker_id(buf: &[u8]) -> Result<String, WireError> {
        let mut reader = Reader::new(buf);
        let magic = reader.read_slice(8, "magic")?;
        if magic != STATUS {
            return Err(WireError::WrongMagicFamily);
        }
        let _version = reader.read_u8("version")?;
        let _timestamp = reader.read_i64_le("timestamp")?;
        let _tag = reader.read_slice(HMAC_LEN, "hmac")?;
        let mut payload_reader = Reader::new(&buf[reader.position()..]);
        payload_reader.read_string("status.worker_id")
    }

    /// Reads the claimed timestamp out of an unverified `HYSTATUS` frame, so
    /// the primary can echo it in an ACK even when verification fails.
    pub fn peek_timestamp_millis(buf: &[u8]) -> Result<i64, WireError> {
        let mut reader = Reader::new(buf);
        let magic = reader.read_slice(8, "magic")?;
        if magic != STATUS {
            return Err(WireError::WrongMagicFamily);
        }
        let _version = reader.read_u8("version")?;
        reader.read_i64_le("timestamp")
    }
}

/// Failure verifying a received `HYSTATUS` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusVerifyError {
    /// The frame was structurally malformed.
    Wire(WireError),
    /// The frame parsed cleanly but its tag did not match the expected key.
    BadHmac,
}

/// Disposition the primary reports back to a worker in a `HYSTATOK` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AckStatus {
    /// The status update was accepted.
    Ok = 0x00,
    /// No worker is registered under the claimed id (and no wildcard matched).
    UnknownId = 0x01,
    /// The tag did not verify.
    BadHmac = 0x02,
    /// The embedded timestamp fell outside the primary's acceptance window.
    Stale = 0x03,
}

impl AckStatus {
    fn to_byte(self) -> u8 {
        self as u8
    }

    fn from_byte(b: u8) -> Result<Self, WireError> {
        match b {
            0x00 => Ok(Self::Ok),
            0x01 => Ok(Self::UnknownId),
            0x02 => Ok(Self::BadHmac),
            0x03 => Ok(Self::Stale),
            other => Err(WireError::UnknownType(other)),
        }
    }
}

/// A `HYSTATOK` acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusAck {
    /// The disposition the primary assigned to the triggering status update.
    pub status: AckStatus,
    /// Echoes the triggering status update's timestamp.
    pub timestamp_millis: i64,
}

impl StatusAck {
    fn signed_region(&self) -> BytesMut {
        let mut region = BytesMut::with_capacity(8 + 1 + 1 + 8);
        region.put_slice(STATOK);
        region.put_u8(0x01);
        region.put_u8(self.status.to_byte());
        region.put_i64_le(self.timestamp_millis);
        region
    }

    /// Encodes and signs this ACK.
    ///
    /// Per the coordinator's worker-registry design, the primary always
    /// signs an ACK with the first configured worker entry's key, not the
    /// key of the worker being acknowledged -- this is a known limitation
    /// carried over unchanged, not a bug introduced here.
    #[must_use]
    pub fn encode_signed(&self, key: &HmacKey) -> BytesMut {
        let region = self.signed_region();
        let tag = key.sign(&region);
        let mut buf = BytesMut::with_capacity(region.len() + HMAC_LEN);
        buf.put_slice(&region);
        buf.put_slice(&tag);
        buf
    }

    /// Decodes a `HYSTATOK` frame and verifies its tag.
    pub fn decode_and_verify(buf: &[u8], key: &HmacKey) -> Result<Self, StatusVerifyError> {
        let mut reader = Reader::new(buf);
        let magic = reader
            .read_slice(8, "magic")
            .map_err(StatusVerifyError::Wire)?;
        if magic != STATOK {
            return Err(StatusVerifyError::Wire(WireError::WrongMagicFamily));
        }
        let _version = reader.read_u8("version").map_err(StatusVerifyError::Wire)?;
        let status = AckStatus::from_byte(reader.read_u8("status").map_err(StatusVerifyError::Wire)?)
            .map_err(StatusVerifyError::Wire)?;
        let timestamp_millis = reader
            .read_i64_le("timestamp")
            .map_err(StatusVerifyError::Wire)?;
        let tag = reader
            .read_slice(HMAC_LEN, "hmac")
            .map_err(StatusVerifyError::Wire)?;

        let ack = Self {
            status,
            timestamp_millis,
        };
        if !key.verify(&ack.signed_region(), tag) {
            return Err(StatusVerifyError::BadHmac);
        }
        reader.expect_exhausted().map_err(StatusVerifyError::Wire)?;
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> StatusPayload {
        StatusPayload {
            worker_id: "lobby-1".into(),
            name: "Lobby".into(),
            motd: "welcome".into(),
            online: 3,
            max: 50,
            players: vec![PlayerEntry::local("alice", Uuid::from_u128(1))],
        }
    }

    #[test]
    fn status_update_round_trips_and_verifies_with_the_right_key() {
        let key = HmacKey::new(b"worker-secret");
        let update = StatusUpdate {
            timestamp_millis: 1_700_000_000_000,
            payload: sample_payload(),
        };
        let encoded = update.encode_signed(&key);
        assert_eq!(&encoded[0..8], b"HYSTATUS");

        let decoded = StatusUpdate::decode_and_verify(&encoded, &key).unwrap();
        assert_eq!(decoded, update);
    }

    #[test]
    fn peek_timestamp_millis_reads_the_claimed_timestamp_without_verifying() {
        let key = HmacKey::new(b"worker-secret");
        let update = StatusUpdate {
            timestamp_millis: 1_700_000_000_000,
            payload: sample_payload(),
        };
        let encoded = update.encode_signed(&key);
        assert_eq!(
            StatusUpdate::peek_timestamp_millis(&encoded).unwrap(),
            1_700_000_000_000
        );
    }

    #[test]
    fn peek_worker_id_reads_the_claimed_id_without_verifying() {
        let key = HmacKey::new(b"worker-secret");
        let update = StatusUpdate {
            timestamp_millis: 1_700_000_000_000,
            payload: sample_payload(),
        };
        let encoded = update.encode_signed(&key);
        assert_eq!(StatusUpdate::peek_worker_id(&encoded).unwrap(), "lobby-1");
    }

    #[test]
    fn status_update_with_wrong_key_fails_verification() {
        let signing_key = HmacKey::new(b"worker-secret");
        let wrong_key = HmacKey::new(b"not-the-secret");
        let update = StatusUpdate {
            timestamp_millis: 1_700_000_000_000,
            payload: sample_payload(),
        };
        let encoded = update.encode_signed(&signing_key);
        assert_eq!(
            StatusUpdate::decode_and_verify(&encoded, &wrong_key),
            Err(StatusVerifyError::BadHmac)
        );
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let key = HmacKey::new(b"worker-secret");
        let update = StatusUpdate {
            timestamp_millis: 1_700_000_000_000,
            payload: sample_payload(),
        };
        let mut encoded = update.encode_signed(&key);
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        assert_eq!(
            StatusUpdate::decode_and_verify(&encoded, &key),
            Err(StatusVerifyError::BadHmac)
        );
    }

    #[test]
    fn ack_round_trips_and_verifies() {
        let key = HmacKey::new(b"primary-key");
        let ack = StatusAck {
            status: AckStatus::Ok,
            timestamp_millis: 1_700_000_000_000,
        };
        let encoded = ack.encode_signed(&key);
        assert_eq!(&encoded[0..8], b"HYSTATOK");
        let decoded = StatusAck::decode_and_verify(&encoded, &key).unwrap();
        assert_eq!(decoded, ack);
    }

    #[test]
    fn ack_every_status_variant_round_trips() {
        let key = HmacKey::new(b"primary-key");
        for status in [AckStatus::Ok, AckStatus::UnknownId, AckStatus::BadHmac, AckStatus::Stale] {
            let ack = StatusAck {
                status,
                timestamp_millis: 42,
            };
            let encoded = ack.encode_signed(&key);
            let decoded = StatusAck::decode_and_verify(&encoded, &key).unwrap();
            assert_eq!(decoded.status, status);
        }
    }
}
