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

//! The seam between this crate and the embedding game server.
//!
//! Per the injected-host design note, the game runtime's static/global
//! accessors for server identity become a single trait the embedder
//! implements once. Nothing downstream of [`Host`] touches process-wide
//! state, which is what makes the request handler and aggregation view
//! unit-testable against a fake.

use hyquery_protocol::PlayerEntry;

/// The defaults substituted when a [`Host`] method fails or the embedder
/// cannot answer.
pub const DEFAULT_MAX_PLAYERS: u32 = 100;
pub const DEFAULT_BIND_PORT: u32 = 5520;
pub const DEFAULT_VERSION: &str = "Unknown";

/// Identity and live state of the locally embedded game server.
///
/// Every method is allowed to be cheap and synchronous: the request handler
/// calls these on the dispatch path, so a [`Host`] implementation must not
/// block (enumerating players should read an already-maintained in-memory
/// list, not make a blocking call out to another system).
pub trait Host: Send + Sync {
    /// The display name advertised in query responses.
    fn server_name(&self) -> String;

    /// The message of the day. Config's `useCustomMotd`/`customMotd` override
    /// this upstream of the handler; the host only reports its own live MOTD.
    fn motd(&self) -> String;

    /// Maximum player slots.
    fn max_players(&self) -> u32;

    /// The UDP port this server is bound to, if known.
    fn bind_port(&self) -> Option<u32>;

    /// Currently connected local players, in no particular required order
    /// (the handler sorts before pagination).
    fn players(&self) -> Vec<PlayerEntry>;

    /// The server's version string.
    fn version(&self) -> String;

    /// Installed plugin names, gated by `showPlugins` in V1 responses.
    fn plugins(&self) -> Vec<String>;

    /// The externally reachable host/address, used for V2's `HAS_ADDRESS`
    /// flag. `None` if the embedder has no opinion (e.g. behind NAT without
    /// a configured public host).
    fn public_address(&self) -> Option<(String, u16)> {
        None
    }
}

/// A fixed-value [`Host`] for tests and the demo binary: no I/O, no
/// surprises, just the fields it was built with.
#[derive(Debug, Clone)]
pub struct StaticHost {
    pub server_name: String,
    pub motd: String,
    pub max_players: u32,
    pub bind_port: Option<u32>,
    pub players: Vec<PlayerEntry>,
    pub version: String,
    pub plugins: Vec<String>,
    pub public_address: Option<(String, u16)>,
}

impl Default for StaticHost {
    fn default() -> Self {
        Self {
            server_name: "Hytale Server".to_string(),
            motd: String::new(),
            max_players: DEFAULT_MAX_PLAYERS,
            bind_port: Some(DEFAULT_BIND_PORT),
            players: Vec::new(),
            version: DEFAULT_VERSION.to_string(),
            plugins: Vec::new(),
            public_address: None,
        }
    }
}

impl Host for StaticHost {
    fn server_name(&self) -> String {
        self.server_name.clone()
    }

    fn motd(&self) -> String {
        self.motd.clone()
    }

    fn max_players(&self) -> u32 {
        self.max_players
    }

    fn bind_port(&self) -> Option<u32> {
        self.bind_port
    }

    fn players(&self) -> Vec<PlayerEntry> {
        self.players.clone()
    }

    fn version(&self) -> String {
        self.version.clone()
    }

    fn plugins(&self) -> Vec<String> {
        self.plugins.clone()
    }

    fn public_address(&self) -> Option<(String, u16)> {
        self.public_address.clone()
    }
}
