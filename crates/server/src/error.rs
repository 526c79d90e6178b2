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

//! Errors a caller of the facade crate is expected to match on.
//!
//! Everything else (config I/O, store setup) returns `anyhow::Result`
//! since it has a single call site with no structured recovery.

use thiserror::Error;

/// Failure starting or running the embedded query service.
#[derive(Debug, Error)]
pub enum HyQueryError {
    /// `start()` was called before `setup()`, or twice without an intervening `shutdown()`.
    #[error("HyQuery lifecycle misuse: {0}")]
    LifecycleMisuse(&'static str),

    /// Shared-store mode failed its startup health probe. This always
    /// aborts startup rather than degrading to a locally-only answer.
    #[error("shared store unavailable at startup: {0}")]
    StoreUnavailableAtStartup(String),

    /// Configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Config(String),
}
