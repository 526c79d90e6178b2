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

//! The packet demultiplexer: the pipeline element that sits ahead of the
//! native game transport on the shared UDP socket and decides, by peeking
//! a datagram's first 8 bytes, whether HyQuery should intercept it.

use hyquery_protocol::{classify, Classification};

/// What the demultiplexer decided to do with an inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxDecision {
    /// HyQuery recognizes and should handle this datagram.
    Intercept(Classification),
    /// HyQuery recognizes the magic but this datagram must never be replied
    /// to here (it's one of HyQuery's own response/ACK shapes). Discarded
    /// silently, not forwarded to the game transport.
    Drop,
    /// HyQuery does not recognize this datagram; the native game transport
    /// should receive it unchanged.
    PassThrough,
}

/// Classifies `datagram` and decides how it should be routed.
///
/// Never consumes or copies `datagram` -- only its first 8 bytes are
/// inspected, exactly as a real demultiplexer installed ahead of a game
/// server's own socket read loop must behave.
#[must_use]
pub fn demux(datagram: &[u8]) -> DemuxDecision {
    match classify(datagram) {
        Classification::Foreign => DemuxDecision::PassThrough,
        Classification::RecognizedNotAccepted => DemuxDecision::Drop,
        recognized => DemuxDecision::Intercept(recognized),
    }
}
