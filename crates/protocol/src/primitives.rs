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

//! Shared primitive encode/decode helpers.
//!
//! All integers are little-endian unless noted. Strings are length-prefixed
//! with a 16-bit length followed by UTF-8 bytes. UUIDs serialize as two
//! big-endian `u64`s (MSB then LSB) -- neither convention matches the other,
//! which is intentional: match the wire exactly.

use bytes::{Buf, BufMut, BytesMut};
use uuid::Uuid;

use crate::error::WireError;

/// A cursor over an immutable byte slice, used to decode every wire frame.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Wraps `buf` for sequential reading from the start.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Current read position, in bytes from the start of the buffer.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn require(&self, n: usize, field: &'static str) -> Result<(), WireError> {
        if self.remaining() < n {
            Err(WireError::UnexpectedEof(field))
        } else {
            Ok(())
        }
    }

    /// Reads exactly `n` bytes without copying, advancing the cursor.
    pub fn read_slice(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], WireError> {
        self.require(n, field)?;
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Peeks at up to `n` bytes without advancing the cursor. Returns fewer
    /// bytes than requested if the buffer is shorter -- used by the
    /// demultiplexer, which must not consume the datagram on a short peek.
    #[must_use]
    pub fn peek_slice(&self, n: usize) -> &'a [u8] {
        let n = n.min(self.remaining());
        &self.buf[self.pos..self.pos + n]
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, WireError> {
        self.require(1, field)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16_le(&mut self, field: &'static str) -> Result<u16, WireError> {
        let slice = self.read_slice(2, field)?;
        Ok(u16::from_le_bytes([slice[0], slice[1]]))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32_le(&mut self, field: &'static str) -> Result<u32, WireError> {
        let slice = self.read_slice(4, field)?;
        Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32_le(&mut self, field: &'static str) -> Result<i32, WireError> {
        Ok(self.read_u32_le(field)? as i32)
    }

    /// Reads a little-endian `i64`.
    pub fn read_i64_le(&mut self, field: &'static str) -> Result<i64, WireError> {
        let slice = self.read_slice(8, field)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(slice);
        Ok(i64::from_le_bytes(arr))
    }

    /// Reads a length-prefixed UTF-8 string (16-bit little-endian length).
    pub fn read_string(&mut self, field: &'static str) -> Result<String, WireError> {
        let len = self.read_u16_le(field)? as usize;
        if len > self.remaining() {
            return Err(WireError::LengthOutOfBounds {
                field,
                declared: len,
                remaining: self.remaining(),
            });
        }
        let bytes = self.read_slice(len, field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8(field))
    }

    /// Reads a UUID as two big-endian `u64`s (MSB then LSB).
    pub fn read_uuid_be(&mut self, field: &'static str) -> Result<Uuid, WireError> {
        let slice = self.read_slice(16, field)?;
        let msb = u64::from_be_bytes(slice[0..8].try_into().unwrap());
        let lsb = u64::from_be_bytes(slice[8..16].try_into().unwrap());
        Ok(Uuid::from_u64_pair(msb, lsb))
    }

    /// Returns an error if any bytes remain unconsumed.
    pub fn expect_exhausted(&self) -> Result<(), WireError> {
        if self.remaining() > 0 {
            Err(WireError::TrailingBytes(self.remaining()))
        } else {
            Ok(())
        }
    }
}

/// Appends a length-prefixed UTF-8 string (16-bit little-endian length).
pub fn write_string(buf: &mut BytesMut, s: &str) {
    buf.put_u16_le(s.len() as u16);
    buf.put_slice(s.as_bytes());
}

/// Appends a UUID as two big-endian `u64`s (MSB then LSB).
pub fn write_uuid_be(buf: &mut BytesMut, uuid: &Uuid) {
    let (msb, lsb) = uuid.as_u64_pair();
    buf.put_u64(msb);
    buf.put_u64(lsb);
}

/// Number of bytes a length-prefixed UTF-8 string occupies on the wire.
#[must_use]
pub fn string_wire_len(s: &str) -> usize {
    2 + s.len()
}
