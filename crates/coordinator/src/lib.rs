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

//! Fleet coordination backends: a directly-connected UDP push protocol
//! between worker and primary servers, and a shared-store (Redis) backed
//! alternative for deployments that already run one. Both produce the same
//! [`aggregation::Aggregate`] shape behind [`aggregation::FleetCoordinator`].

pub mod aggregation;
pub mod shared_store;
pub mod udp;

pub use aggregation::{Aggregate, CoordinatorError, FleetCoordinator};
pub use shared_store::{
    PublisherConfig, RedisStore, RemoteSnapshot, SharedStore, SharedStoreCoordinator, SharedStorePublisher, SnapshotPlayer,
    StoreError,
};
pub use udp::{PrimaryCoordinator, UdpFleetCoordinator, WorkerEntry, WorkerPublisher, WorkerRegistry};
