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

//! The common shape both coordinator backends produce, and the trait the
//! request handler's aggregation view is built against.
//!
//! Neither backend (`udp::UdpFleetCoordinator`, `shared_store::SharedStoreCoordinator`)
//! knows about the other; both just hand back an [`Aggregate`], so the
//! server crate's aggregation view can treat "how do we know about the rest
//! of the fleet" as a single seam to plug in or swap.

use async_trait::async_trait;
use hyquery_protocol::{PlayerEntry, RemoteServerEntry};
use thiserror::Error;

/// The network-wide view composed from remote fleet members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    /// Sum of `online` across every fresh remote server.
    pub total_online: u32,
    /// Sum of `max` across every fresh remote server.
    pub total_max: u32,
    /// Every fresh remote server, in the backend's natural order.
    pub remote_servers: Vec<RemoteServerEntry>,
    /// Players on remote servers, tagged with their source server id. Empty
    /// unless the caller asked for players.
    pub network_players: Vec<PlayerEntry>,
}

impl Aggregate {
    /// The aggregate a non-primary (or primary with no coordinator) serves:
    /// no remote contribution at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this aggregate actually contributed anything, i.e. whether
    /// the response's `IS_NETWORK` flag should be set.
    #[must_use]
    pub fn contributed(&self) -> bool {
        !self.remote_servers.is_empty()
    }
}

/// Failure querying a coordinator backend for the current aggregate.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The shared store could not be reached or returned malformed data.
    /// This must abort the query path,
    /// not fall back to a locally-only answer.
    #[error("shared store unavailable: {0}")]
    StoreUnavailable(String),
}

/// The interface the request handler's aggregation view consumes.
///
/// Both the UDP coordinator (synchronous under the hood, wrapped here) and
/// the shared-store coordinator (genuinely async, backed by a 1-second
/// cache) implement this the same way.
#[async_trait]
pub trait FleetCoordinator: Send + Sync {
    /// Returns the current fleet aggregate. `include_players` controls
    /// whether `network_players` is populated -- omitted for BASIC queries
    /// that don't need the per-player list, to skip the sort/collect work.
    async fn get_aggregate(&self, include_players: bool) -> Result<Aggregate, CoordinatorError>;
}
