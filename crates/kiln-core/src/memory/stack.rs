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

//! LIFO allocator for nested scoped allocations.

use super::{align_up, check_request, AllocStats, Block};
use crate::error::AllocError;

/// A stack allocator over a fixed region.
///
/// Each allocation stores a one-byte header immediately before the returned
/// offset, recording the forward adjustment (header plus alignment padding)
/// from the previous cursor position. [`deallocate`] recomputes the prior
/// cursor from that header and rewinds, so callers must free in exact
/// reverse allocation order. Out-of-order frees are rejected in debug
/// builds. [`reset`] rewinds unconditionally.
///
/// The one-byte header limits alignment to 128 bytes.
///
/// [`deallocate`]: StackAllocator::deallocate
/// [`reset`]: StackAllocator::reset
#[derive(Debug)]
pub struct StackAllocator {
    storage: Vec<u8>,
    cursor: usize,
    peak: usize,
    #[cfg(debug_assertions)]
    live: Vec<usize>,
}

impl StackAllocator {
    /// Creates an allocator over a zeroed region of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![0; capacity],
            cursor: 0,
            peak: 0,
            #[cfg(debug_assertions)]
            live: Vec::new(),
        }
    }

    /// Allocates `size` bytes aligned to `align` on top of the stack.
    ///
    /// ## Errors
    /// [`AllocError::CapacityExceeded`] when the padded request does not
    /// fit. The cursor is left untouched on failure.
    pub fn allocate(&mut self, size: usize, align: usize) -> Result<Block, AllocError> {
        check_request(size, align);
        assert!(
            align <= 128,
            "stack allocator alignment is limited to 128 bytes, got {align}"
        );

        // One byte is always reserved for the header, so the adjustment is
        // at least 1 and fits the header byte for any permitted alignment.
        let user = align_up(self.cursor + 1, align);
        let adjustment = user - self.cursor;
        let end = match user.checked_add(size) {
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

        self.storage[user - 1] = adjustment as u8;
        self.cursor = end;
        self.peak = self.peak.max(self.cursor);
        #[cfg(debug_assertions)]
        self.live.push(user);
        Ok(Block::new(user, size))
    }

    /// Frees the most recent allocation, rewinding the cursor to where it
    /// was before that allocation.
    ///
    /// Freeing anything but the top of the stack is a programming defect,
    /// rejected in debug builds.
    pub fn deallocate(&mut self, block: &Block) {
        #[cfg(debug_assertions)]
        {
            let top = self.live.pop();
            debug_assert!(
                top == Some(block.offset()),
                "out-of-order stack free: freed offset {}, top of stack is {:?}",
                block.offset(),
                top
            );
        }

        let adjustment = self.storage[block.offset() - 1] as usize;
        self.cursor = block.offset() - adjustment;
    }

    /// Rewinds the whole stack, discarding every live allocation.
    pub fn reset(&mut self) {
        self.cursor = 0;
        #[cfg(debug_assertions)]
        self.live.clear();
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

    /// Bytes in use, headers and padding included.
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
