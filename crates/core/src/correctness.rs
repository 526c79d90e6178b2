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

//! Functions for correctness checks in the style of a design-by-contract precondition.
//!
//! A condition is a predicate which must hold just prior to executing some
//! section of code. An [`anyhow::Result`] is returned with a descriptive
//! message when the condition check fails, so call sites can propagate it
//! with `?` instead of unwinding.

/// A message prefix used alongside assertions for failures that should be impossible
/// given the crate's own invariants rather than caller-supplied input.
pub const FAILED: &str = "Condition failed";

/// Checks that `s` is non-empty.
///
/// # Errors
///
/// Returns an error if `s` is empty.
#[inline(always)]
pub fn check_nonempty_string<T: AsRef<str>>(s: T, param: &str) -> anyhow::Result<()> {
    if s.as_ref().is_empty() {
        anyhow::bail!("invalid string for '{param}', was empty");
    }
    Ok(())
}

/// Checks that `len` does not exceed `max`.
///
/// # Errors
///
/// Returns an error if `len` exceeds `max`.
#[inline(always)]
pub fn check_length_le(len: usize, max: usize, param: &str) -> anyhow::Result<()> {
    if len > max {
        anyhow::bail!("invalid length for '{param}', was {len} which exceeds the maximum of {max}");
    }
    Ok(())
}

/// Checks that `len` is exactly `expected`.
///
/// # Errors
///
/// Returns an error if `len` does not equal `expected`.
#[inline(always)]
pub fn check_length_eq(len: usize, expected: usize, param: &str) -> anyhow::Result<()> {
    if len != expected {
        anyhow::bail!("invalid length for '{param}', was {len} but expected {expected}");
    }
    Ok(())
}

/// Checks that `value` is strictly positive.
///
/// # Errors
///
/// Returns an error if `value` is zero or negative.
#[inline(always)]
pub fn check_positive_f64(value: f64, param: &str) -> anyhow::Result<()> {
    if value <= 0.0 {
        anyhow::bail!("invalid value for '{param}', was {value} which is not positive");
    }
    Ok(())
}
