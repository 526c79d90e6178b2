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

//! The legacy V1 query/reply codec.
//!
//! Request: 8-byte magic `HYQUERY\0` + 1-byte type (`0x00` basic, `0x01` full).
//! Response: 8-byte magic `HYREPLY\0` + 1-byte type + fields per [`V1Response`].
//!
//! Player and remote-server counts in the "full" response are `uint32`,
//! unlike the V2 TLV payload's `int32` counts -- this is a documented wire
//! quirk (see the crate root docs), not normalized away.

use bytes::{BufMut, BytesMut};
use uuid::Uuid;

use crate::{
    error::WireError,
    magic::{V1_QUERY, V1_REPLY},
    primitives::{write_string, write_uuid_be, Reader},
    types::{PlayerEntry, RemoteServerEntry, RemoteServerStatus},
};

/// The `0x00`/`0x01` type byte of a V1 request or response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum V1Kind {
    /// `0x00` -- name, MOTD, and counts only.
    Basic,
    /// `0x01` -- basic fields plus players, plugins, and remote servers.
    Full,
}

impl V1Kind {
    fn to_byte(self) -> u8 {
        match self {
            Self::Basic => 0x00,
            Self::Full => 0x01,
        }
    }

    fn from_byte(b: u8) -> Result<Self, WireError> {
        match b {
            0x00 => Ok(Self::Basic),
            0x01 => Ok(Self::Full),
            other => Err(WireError::UnknownType(other)),
        }
    }
}

/// A decoded V1 request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V1Request {
    /// Which response shape the client asked for.
    pub kind: V1Kind,
}

impl V1Request {
    /// Decodes a V1 request. Does not check the magic prefix -- callers
    /// classify the datagram with [`crate::magic::classify`] first.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut reader = Reader::new(buf);
        let magic = reader.read_slice(8, "magic")?;
        if magic != V1_QUERY {
            return Err(WireError::WrongMagicFamily);
        }
        let kind = V1Kind::from_byte(reader.read_u8("type")?)?;
        reader.expect_exhausted()?;
        Ok(Self { kind })
    }

    /// Encodes a V1 request (used by test harnesses and the demo binary).
    #[must_use]
    pub fn encode(self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(9);
        buf.put_slice(V1_QUERY);
        buf.put_u8(self.kind.to_byte());
        buf
    }
}

/// The fields only present in a `Full` V1 response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct V1FullFields {
    /// All players the response should list; empty if `showPlayerList` is off.
    pub players: Vec<PlayerEntry>,
    /// All plugin names the response should list; empty if `showPlugins` is off.
    pub plugins: Vec<String>,
    /// Fleet members contributed by the aggregation view; empty if not a primary.
    pub remote_servers: Vec<RemoteServerEntry>,
}

/// A V1 response, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V1Response {
    /// Server display name.
    pub name: String,
    /// Server message of the day.
    pub motd: String,
    /// Players currently online.
    pub online: u32,
    /// Maximum players accepted.
    pub max: u32,
    /// The bind port clients connect to.
    pub port: u32,
    /// Server version string.
    pub version: String,
    /// `Some` for a `Full` response, `None` for `Basic`.
    pub full: Option<V1FullFields>,
}

impl V1Response {
    fn kind(&self) -> V1Kind {
        if self.full.is_some() {
            V1Kind::Full
        } else {
            V1Kind::Basic
        }
    }

    /// Encodes this response to its wire representation.
    #[must_use]
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_slice(V1_REPLY);
        buf.put_u8(self.kind().to_byte());
        write_string(&mut buf, &self.name);
        write_string(&mut buf, &self.motd);
        buf.put_u32_le(self.online);
        buf.put_u32_le(self.max);
        buf.put_u32_le(self.port);
        write_string(&mut buf, &self.version);

        if let Some(full) = &self.full {
            buf.put_u32_le(full.players.len() as u32);
            for player in &full.players {
                write_string(&mut buf, &player.username);
                write_uuid_be(&mut buf, &player.uuid);
                write_string(&mut buf, player.source_server_id.as_deref().unwrap_or(""));
            }

            buf.put_u32_le(full.plugins.len() as u32);
            for plugin in &full.plugins {
                write_string(&mut buf, plugin);
            }

            buf.put_u32_le(full.remote_servers.len() as u32);
            for remote in &full.remote_servers {
                write_string(&mut buf, &remote.id);
                write_string(&mut buf, &remote.name);
                write_string(&mut buf, &remote.motd);
                buf.put_u32_le(remote.online);
                buf.put_u32_le(remote.max);
                buf.put_u8(remote.status as u8);
                buf.put_i64_le(remote.updated_at_millis);
                buf.put_u32_le(remote.players.len() as u32);
                for player in &remote.players {
                    write_string(&mut buf, &player.username);
                    write_uuid_be(&mut buf, &player.uuid);
                }
            }
        }

        buf
    }

    /// Decodes a V1 response (used by tests and the demo client).
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut reader = Reader::new(buf);
        let magic = reader.read_slice(8, "magic")?;
        if magic != V1_REPLY {
            return Err(WireError::WrongMagicFamily);
        }
        let kind = V1Kind::from_byte(reader.read_u8("type")?)?;
        let name = reader.read_string("name")?;
        let motd = reader.read_string("motd")?;
        let online = reader.read_u32_le("online")?;
        let max = reader.read_u32_le("max")?;
        let port = reader.read_u32_le("port")?;
        let version = reader.read_string("version")?;

        let full = if kind == V1Kind::Full {
            let player_count = reader.read_u32_le("player_count")? as usize;
            let mut players = Vec::with_capacity(player_count.min(4096));
            for _ in 0..player_count {
                let username = reader.read_string("player.username")?;
                let uuid = reader.read_uuid_be("player.uuid")?;
                let source = reader.read_string("player.source_server_id")?;
                players.push(PlayerEntry {
                    username,
                    uuid,
                    source_server_id: if source.is_empty() { None } else { Some(source) },
                });
            }

            let plugin_count = reader.read_u32_le("plugin_count")? as usize;
            let mut plugins = Vec::with_capacity(plugin_count.min(4096));
            for _ in 0..plugin_count {
                plugins.push(reader.read_string("plugin")?);
            }

            let remote_count = reader.read_u32_le("remote_count")? as usize;
            let mut remote_servers = Vec::with_capacity(remote_count.min(4096));
            for _ in 0..remote_count {
                let id = reader.read_string("remote.id")?;
                let name = reader.read_string("remote.name")?;
                let motd = reader.read_string("remote.motd")?;
                let online = reader.read_u32_le("remote.online")?;
                let max = reader.read_u32_le("remote.max")?;
                let status = RemoteServerStatus::from_byte(reader.read_u8("remote.status")?);
                let updated_at_millis = reader.read_i64_le("remote.updated_at_millis")?;
                let remote_player_count = reader.read_u32_le("remote.player_count")? as usize;
                let mut remote_players = Vec::with_capacity(remote_player_count.min(4096));
                for _ in 0..remote_player_count {
                    let username = reader.read_string("remote.player.username")?;
                    let uuid: Uuid = reader.read_uuid_be("remote.player.uuid")?;
                    remote_players.push(PlayerEntry {
                        username,
                        uuid,
                        source_server_id: None,
                    });
                }
                remote_servers.push(RemoteServerEntry {
                    id,
                    name,
                    motd,
                    online,
                    max,
                    status,
                    updated_at_millis,
                    players: remote_players,
                });
            }

            Some(V1FullFields {
                players,
                plugins,
                remote_servers,
            })
        } else {
            None
        };

        reader.expect_exhausted()?;
        Ok(Self {
            name,
            motd,
            online,
            max,
            port,
            version,
            full,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_request_round_trips() {
        let req = V1Request { kind: V1Kind::Basic };
        let encoded = req.encode();
        assert_eq!(&encoded[..], b"HYQUERY\0\x00");
        let decoded = V1Request::decode(&encoded).unwrap();
        assert_eq!(decoded.kind, V1Kind::Basic);
    }

    /// The literal happy-path basic query.
    #[test]
    fn basic_response_matches_expected_wire_bytes() {
        let response = V1Response {
            name: "Hytale Server".to_string(),
            motd: "hi".to_string(),
            online: 2,
            max: 100,
            port: 5520,
            version: "1.0".to_string(),
            full: None,
        };
        let encoded = response.encode();

        let mut expected = BytesMut::new();
        expected.put_slice(b"HYREPLY\0\x00");
        write_string(&mut expected, "Hytale Server");
        write_string(&mut expected, "hi");
        expected.put_u32_le(2);
        expected.put_u32_le(100);
        expected.put_u32_le(5520);
        write_string(&mut expected, "1.0");

        assert_eq!(&encoded[..], &expected[..]);
    }

    #[test]
    fn full_response_with_empty_lists_encodes_zero_counts() {
        let response = V1Response {
            name: "s".into(),
            motd: "m".into(),
            online: 0,
            max: 20,
            port: 25565,
            version: "1.0".into(),
            full: Some(V1FullFields::default()),
        };
        let encoded = response.encode();
        let decoded = V1Response::decode(&encoded).unwrap();
        let full = decoded.full.unwrap();
        assert!(full.players.is_empty());
        assert!(full.plugins.is_empty());
        assert!(full.remote_servers.is_empty());
    }

    #[test]
    fn full_response_round_trips_players_plugins_and_remotes() {
        let response = V1Response {
            name: "s".into(),
            motd: "m".into(),
            online: 1,
            max: 20,
            port: 25565,
            version: "1.0".into(),
            full: Some(V1FullFields {
                players: vec![PlayerEntry::local("alice", Uuid::from_u128(1))],
                plugins: vec!["econ".into(), "chat".into()],
                remote_servers: vec![RemoteServerEntry {
                    id: "lobby-1".into(),
                    name: "Lobby".into(),
                    motd: "welcome".into(),
                    online: 5,
                    max: 50,
                    status: RemoteServerStatus::Online,
                    updated_at_millis: 1_700_000_000_000,
                    players: vec![PlayerEntry::local("bob", Uuid::from_u128(2))],
                }],
            }),
        };
        let encoded = response.encode();
        let decoded = V1Response::decode(&encoded).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn decoding_wrong_magic_is_rejected() {
        assert_eq!(
            V1Request::decode(b"HYQUERY2\x00"),
            Err(WireError::WrongMagicFamily)
        );
    }

    #[test]
    fn decoding_unknown_type_byte_is_rejected() {
        assert_eq!(
            V1Request::decode(b"HYQUERY\0\x02"),
            Err(WireError::UnknownType(0x02))
        );
    }
}
