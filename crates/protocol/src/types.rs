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

//! Codec-level data types shared by the V1 and V2 encoders.
//!
//! These are intentionally decoupled from any particular `Host` or
//! aggregation-view implementation -- the protocol crate only knows how to
//! turn these plain structs into bytes and back.

use uuid::Uuid;

/// A single player entry as it appears in a V1 "full" response or a V2
/// `PLAYER_LIST` TLV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEntry {
    /// The player's display name.
    pub username: String,
    /// The player's 128-bit identifier.
    pub uuid: Uuid,
    /// Which fleet member this player is connected to, if the entry came
    /// from an aggregated network view; `None` for a locally-connected player.
    pub source_server_id: Option<String>,
}

impl PlayerEntry {
    /// Creates a player entry for a player connected to this server directly.
    #[must_use]
    pub fn local(username: impl Into<String>, uuid: Uuid) -> Self {
        Self {
            username: username.into(),
            uuid,
            source_server_id: None,
        }
    }
}

/// Disposition of a remote fleet member as last observed by the coordinator,
/// encoded into the V1 "full" response's remote-server list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RemoteServerStatus {
    /// The remote snapshot was within the staleness threshold when encoded.
    Online = 0x00,
    /// Reserved for a future disposition; never emitted by this implementation
    /// today, since stale entries are filtered out of the aggregate before
    /// encoding rather than being encoded with this status.
    Unknown = 0x01,
}

impl RemoteServerStatus {
    /// Decodes the status byte, defaulting to `Unknown` for unrecognized values.
    #[must_use]
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Online,
            _ => Self::Unknown,
        }
    }
}

/// A remote fleet member's state, as embedded in a V1 "full" response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteServerEntry {
    /// The remote server's configured worker id.
    pub id: String,
    /// The remote server's display name.
    pub name: String,
    /// The remote server's MOTD.
    pub motd: String,
    /// Players currently online on the remote server.
    pub online: u32,
    /// Maximum players the remote server accepts.
    pub max: u32,
    /// Disposition at encode time.
    pub status: RemoteServerStatus,
    /// Milliseconds since the UNIX epoch of the remote server's last update.
    pub updated_at_millis: i64,
    /// Players connected to the remote server (`source_server_id` is always `None` here).
    pub players: Vec<PlayerEntry>,
}
