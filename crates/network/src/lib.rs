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

//! Everything between "a UDP datagram arrived" and "a well-formed request
//! is ready for the handler": demultiplexing, anti-amplification via
//! challenge tokens, and per-source rate limiting. Also home to the
//! exponential backoff shared by the coordinator's publisher loops.

pub mod backoff;
pub mod challenge;
pub mod demux;
pub mod error;
pub mod ratelimiter;

pub use backoff::ExponentialBackoff;
pub use challenge::ChallengeService;
pub use demux::{demux, DemuxDecision};
pub use error::BackoffError;
pub use ratelimiter::{RateLimiter, RateLimiterConfig};
