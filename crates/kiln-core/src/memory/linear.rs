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

//! Bump allocator for per-frame scratch memory.

use super::{align_up, check_request, AllocStats, Block};
use crate::error::AllocError;

/// A forward-only bump allocator over a fixed region.
///
/// Allocation advances a cursor by padding + size and cannot fail for any
/// reason other than running out of capacity. Individual frees are not
/// supported; the whole region is reclaimed at once by [`reset`], which
/// zeroes the used prefix and rewinds the cursor. Both operations are O(1)
/// in the number of live allocations and the region cannot fragment.
///
/// The decode side of the pipeline resets one of these once per frame.
///
/// [`reset`]: LinearAllocator::reset
#[derive(Debug)]
pub struct LinearAllocator {
    storage: Vec<u8>,
    cursor: usize,
    peak: usize,
}

impl LinearAllocator {
    /// Creates an allocator over a zeroed region of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![0; capacity],
            cursor: 0,
            peak: 0,
        }
    }

    /// Allocates `size` bytes aligned to `align`.
    ///
    /// ## Errors
    /// [`AllocError::CapacityExceeded`] when the remaining space cannot fit
    /// the padded request. The cursor is left untouched on failure.
    pub fn allocate(&mut self, size: usize, align: usize) -> Result<Block, AllocError> {
        check_request(size, align);

        let offset = align_up(self.cursor, align);
        let end = match offset.checked_add(size) {
            Some(end) if end <= self.storage.len() => end,
            _ => {
                return Err(AllocError::CapacityExceeded {
                    requested: size,
                    align,
                    capacity: self.storage.len(),
                    used: self.cursor,
                })
            }
        };

        self.cursor = end;
        self.peak = self.peak.max(self.cursor);
        Ok(Block::new(offset, size))
    }

    /// Copies `bytes` into a freshly allocated block.
    ///
    /// Empty input yields [`Block::EMPTY`] without consuming any space.
    pub fn store(&mut self, bytes: &[u8]) -> Result<Block, AllocError> {
        if bytes.is_empty() {
            return Ok(Block::EMPTY);
        }
        let block = self.allocate(bytes.len(), 1)?;
        self.storage[block.offset()..block.offset() + block.size()].copy_from_slice(bytes);
        Ok(block)
    }

    /// Rewinds the cursor to the base of the region, zeroing the used
    /// prefix so stale frame data cannot leak into the next frame.
    pub fn reset(&mut self) {
        self.storage[..self.cursor].fill(0);
        self.cursor = 0;
    }

    /// Read access to an allocated block.
    pub fn bytes(&self, block: &Block) -> &[u8] {
        &self.storage[block.offset()..block.offset() + block.size()]
    }

    /// Write access to an allocated block.
    pub fn bytes_mut(&mut self, block: &Block) -> &mut [u8] {
        &mut self.storage[block.offset()..block.offset() + block.size()]
    }

    /// Total capacity of the region in bytes.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes consumed since the last reset, including alignment padding.
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Current usage statistics.
    pub fn stats(&self) -> AllocStats {
        AllocStats {
            capacity: self.storage.len(),
            used: self.cursor,
            peak: self.peak,
        }
    }
}
