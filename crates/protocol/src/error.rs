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

//! Errors produced while decoding a HyQuery wire frame.
//!
//! Every variant here corresponds to "malformed input" in the wire error
//! handling design: callers treat any `WireError` as a silent drop, never a
//! response.

use thiserror::Error;

/// Failure decoding a wire frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before the expected field could be read.
    #[error("unexpected end of buffer while reading '{0}'")]
    UnexpectedEof(&'static str),

    /// The leading magic bytes did not match any recognized prefix.
    #[error("unrecognized magic prefix")]
    UnknownMagic,

    /// The magic bytes matched a known family but not the one the caller expected.
    #[error("magic prefix did not match the expected family")]
    WrongMagicFamily,

    /// A length-prefixed field declared a length that does not fit the remaining buffer.
    #[error("declared length {declared} for '{field}' exceeds remaining buffer of {remaining}")]
    LengthOutOfBounds {
        field: &'static str,
        declared: usize,
        remaining: usize,
    },

    /// A length-prefixed string was not valid UTF-8.
    #[error("'{0}' was not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// A request/response type byte did not correspond to a known variant.
    #[error("unknown type byte {0:#04x}")]
    UnknownType(u8),

    /// Trailing bytes remained after a frame that must consume the whole buffer.
    #[error("{0} trailing byte(s) after decoding a complete frame")]
    TrailingBytes(usize),
}
