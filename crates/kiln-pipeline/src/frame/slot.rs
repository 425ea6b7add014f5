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

use std::fmt;

/// One frame's worth of fixed-capacity command-stream storage.
///
/// A slot is alternately owned by the simulation thread (recording) and
/// the render thread (decoding); the [`frame channel`](super::frame_channel)
/// moves it between them. The buffer never grows: running out of space is
/// surfaced by the encoder as a typed error.
pub struct FrameSlot {
    buffer: Vec<u8>,
    len: usize,
}

impl FrameSlot {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            len: 0,
        }
    }

    /// Discards the previous frame's contents. The encoder overwrites the
    /// stream from the start, so only the length needs rewinding.
    pub(crate) fn begin(&mut self) {
        self.len = 0;
    }

    /// Records how many bytes of the buffer hold the sealed frame.
    pub(crate) fn seal(&mut self, len: usize) {
        debug_assert!(len <= self.buffer.len());
        self.len = len;
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// The sealed frame's encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Encoded length of the sealed frame.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no frame has been sealed into this slot.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fixed capacity of the slot's stream buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

impl fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSlot")
            .field("len", &self.len)
            .field("capacity", &self.buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_exposes_the_written_prefix() {
        let mut slot = FrameSlot::new(64);
        slot.buffer_mut()[..4].copy_from_slice(&[1, 2, 3, 4]);
        slot.seal(4);
        assert_eq!(slot.bytes(), &[1, 2, 3, 4]);
        assert_eq!(slot.len(), 4);

        slot.begin();
        assert!(slot.is_empty());
        assert_eq!(slot.capacity(), 64);
    }
}
