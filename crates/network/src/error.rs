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

use thiserror::Error;

/// Invalid parameters passed to [`crate::backoff::ExponentialBackoff::new`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackoffError {
    /// `factor` fell outside the accepted `[1.0, 100.0]` range.
    #[error("backoff factor {0} is outside the accepted range [1.0, 100.0]")]
    FactorOutOfRange(String),

    /// `initial` exceeded `max`.
    #[error("initial delay ({initial_ms}ms) exceeds max delay ({max_ms}ms)")]
    InitialExceedsMax { initial_ms: u128, max_ms: u128 },
}
