// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::error::CodecError;
use bytemuck::Pod;

/// An append-only cursor over a fixed byte buffer.
///
/// Every write checks the remaining capacity up front and fails with
/// [`CodecError::CapacityExceeded`] before touching the buffer, so a failed
/// write never leaves partial bytes behind and the offset never moves past
/// the end of the buffer.
#[derive(Debug)]
pub struct StreamWriter<'a> {
    buf: &'a mut [u8],
    offset: usize,
}

impl<'a> StreamWriter<'a> {
    /// Creates a writer positioned at the start of `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Creates a writer resuming at `offset`, e.g. to continue a stream a
    /// previous writer left off.
    ///
    /// Panics if `offset` lies past the end of `buf`.
    pub fn resume(buf: &'a mut [u8], offset: usize) -> Self {
        assert!(offset <= buf.len(), "resume offset past end of buffer");
        Self { buf, offset }
    }

    /// Total capacity of the underlying buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes written so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Rewinds the cursor to zero without clearing the buffer.
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    fn ensure(&self, additional: usize) -> Result<(), CodecError> {
        let needed = self.offset.saturating_add(additional);
        if needed > self.buf.len() {
            return Err(CodecError::CapacityExceeded {
                needed,
                capacity: self.buf.len(),
            });
        }
        Ok(())
    }

    /// Copies a raw span of bytes at the cursor.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.ensure(bytes.len())?;
        self.buf[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.offset += bytes.len();
        Ok(())
    }

    /// Copies the bytes of a POD value at the cursor.
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> Result<(), CodecError> {
        self.write_bytes(bytemuck::bytes_of(value))
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, value: u8) -> Result<(), CodecError> {
        self.write_bytes(&[value])
    }

    /// Writes a `u32` in host byte order.
    pub fn write_u32(&mut self, value: u32) -> Result<(), CodecError> {
        self.write_pod(&value)
    }

    /// Writes an `i32` in host byte order.
    pub fn write_i32(&mut self, value: i32) -> Result<(), CodecError> {
        self.write_pod(&value)
    }

    /// Writes an `f32` in host byte order.
    pub fn write_f32(&mut self, value: f32) -> Result<(), CodecError> {
        self.write_pod(&value)
    }

    /// Writes a length-prefixed blob: a `u32` byte count followed by the
    /// raw bytes. The capacity check covers prefix and payload together,
    /// so a failure writes neither.
    pub fn write_blob(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.ensure(std::mem::size_of::<u32>() + bytes.len())?;
        self.write_u32(bytes.len() as u32)?;
        self.write_bytes(bytes)
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_blob(value.as_bytes())
    }
}
