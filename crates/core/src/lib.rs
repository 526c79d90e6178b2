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

//! Foundational types shared across the HyQuery workspace.
//!
//! This crate is intentionally small: a `Clock` abstraction that every
//! time-sensitive component (challenge tokens, rate limiter, response cache,
//! worker registry, publisher backoff) is built against instead of calling
//! `Instant::now()`/`SystemTime::now()` directly, plus a handful of
//! correctness-check helpers in the style of a design-by-contract precondition.

pub mod clock;
pub mod correctness;

pub use clock::{Clock, MonotonicNanos, StaticClock, SystemClock, UnixMillis};
