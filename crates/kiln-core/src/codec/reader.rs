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

/// A sequential cursor over a recorded stream.
///
/// Mirrors [`StreamWriter`](super::StreamWriter): every read checks the
/// remaining bytes and fails with [`CodecError::Truncated`] instead of
/// running off the end. [`has_remaining`](StreamReader::has_remaining)
/// lets decode loops terminate independently of the sentinel opcode.
#[derive(Debug)]
pub struct StreamReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> StreamReader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to consume.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Returns `true` while unconsumed bytes remain.
    pub fn has_remaining(&self) -> bool {
        self.offset < self.buf.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if len > self.remaining() {
            return Err(CodecError::Truncated {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    /// Borrows a raw span of `len` bytes from the stream.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        self.take(len)
    }

    /// Reads a POD value, tolerating unaligned stream positions.
    pub fn read_pod<T: Pod>(&mut self) -> Result<T, CodecError> {
        let bytes = self.take(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a `u32` in host byte order.
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        self.read_pod()
    }

    /// Reads an `i32` in host byte order.
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        self.read_pod()
    }

    /// Reads an `f32` in host byte order.
    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        self.read_pod()
    }

    /// Reads a length-prefixed blob, borrowing the payload from the
    /// stream.
    pub fn read_blob(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    /// Reads a length-prefixed UTF-8 string, borrowing from the stream.
    pub fn read_str(&mut self) -> Result<&'a str, CodecError> {
        let bytes = self.read_blob()?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidString)
    }
}
