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

//! Free-list allocator for long-lived allocations.

use super::{align_up, check_request, AllocStats, Block};
use crate::error::AllocError;
use bytemuck::{Pod, Zeroable};

/// Header preceding every live allocation.
///
/// Invariant: `header_offset + HEADER_SIZE == aligned_user_offset`, and
/// `user_offset - adjustment` is the start of the carved block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct AllocHeader {
    /// Full size of the carved block, headers and padding included.
    block_size: u32,
    /// Forward distance from the block start to the user offset.
    adjustment: u32,
}

/// Free-list record stored at the start of every free block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct FreeBlock {
    size: u32,
    next: u32,
}

const HEADER_SIZE: usize = std::mem::size_of::<AllocHeader>();
/// Leftovers smaller than this are not worth splitting off: they could
/// never hold a header plus a payload byte.
const MIN_BLOCK_SIZE: usize = 16;
/// End-of-list sentinel for free-list links.
const NIL: u32 = u32::MAX;

/// A general-purpose allocator over a fixed region, tracking free space in
/// a singly linked, address-ordered free list threaded through the region
/// itself.
///
/// Allocation is first-fit. If the remainder after carving a block is too
/// small to ever be reused, the whole block is consumed instead of split.
/// Deallocation reinserts the block in address order and always merges it
/// with adjacent free neighbours, so a fully freed region collapses back to
/// a single spanning block.
///
/// Double frees corrupt the list and are detected by debug assertions.
#[derive(Debug)]
pub struct GeneralAllocator {
    storage: Vec<u8>,
    head: u32,
    used: usize,
    peak: usize,
}

impl GeneralAllocator {
    /// Creates an allocator over a zeroed region of `capacity` bytes.
    ///
    /// `capacity` must be at least the minimum block size and fit in a
    /// 32-bit offset.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity >= MIN_BLOCK_SIZE,
            "capacity must be at least {MIN_BLOCK_SIZE} bytes"
        );
        assert!(capacity < NIL as usize, "capacity must fit a 32-bit offset");

        let mut allocator = Self {
            storage: vec![0; capacity],
            head: 0,
            used: 0,
            peak: 0,
        };
        allocator.write_free(
            0,
            FreeBlock {
                size: capacity as u32,
                next: NIL,
            },
        );
        allocator
    }

    /// Allocates `size` bytes aligned to `align`.
    ///
    /// ## Errors
    /// [`AllocError::CapacityExceeded`] when no free block can fit the
    /// request together with its header and alignment padding.
    pub fn allocate(&mut self, size: usize, align: usize) -> Result<Block, AllocError> {
        check_request(size, align);

        let mut prev = NIL;
        let mut cur = self.head;
        while cur != NIL {
            let blk = self.read_free(cur);
            let user = align_up(cur as usize + HEADER_SIZE, align);
            let adjustment = user - cur as usize;
            let total = adjustment + size;

            if blk.size as usize >= total {
                let leftover = blk.size as usize - total;
                let consumed = if leftover >= MIN_BLOCK_SIZE {
                    let split = cur + total as u32;
                    self.write_free(
                        split,
                        FreeBlock {
                            size: leftover as u32,
                            next: blk.next,
                        },
                    );
                    self.relink(prev, split);
                    total
                } else {
                    self.relink(prev, blk.next);
                    blk.size as usize
                };

                self.write_header(
                    user - HEADER_SIZE,
                    AllocHeader {
                        block_size: consumed as u32,
                        adjustment: adjustment as u32,
                    },
                );
                self.used += consumed;
                self.peak = self.peak.max(self.used);
                return Ok(Block::new(user, size));
            }

            prev = cur;
            cur = blk.next;
        }

        Err(AllocError::CapacityExceeded {
            requested: size,
            align,
            capacity: self.storage.len(),
            used: self.used,
        })
    }

    /// Returns a block to the free list, merging with adjacent free
    /// neighbours.
    ///
    /// The block must have been returned by [`allocate`](Self::allocate) on
    /// this allocator and not freed before; a double free is a programming
    /// defect and is rejected by debug assertions.
    pub fn deallocate(&mut self, block: &Block) {
        let user = block.offset();
        assert!(
            user >= HEADER_SIZE && user + block.size() <= self.storage.len(),
            "block does not belong to this allocator"
        );

        let header = self.read_header(user - HEADER_SIZE);
        debug_assert!(
            (HEADER_SIZE..=user).contains(&(header.adjustment as usize))
                && header.block_size as usize <= self.storage.len(),
            "double free or corrupted header at user offset {user}"
        );
        let start = (user - header.adjustment as usize) as u32;
        let size = header.block_size;

        // Locate the address-ordered insertion point.
        let mut prev = NIL;
        let mut next = self.head;
        while next != NIL && next < start {
            prev = next;
            next = self.read_free(next).next;
        }
        debug_assert!(next != start, "double free at offset {start}");
        if next != NIL {
            debug_assert!(
                start + size <= next,
                "freed block overlaps the free list at offset {next}"
            );
        }

        let mut merged = FreeBlock { size, next };

        // Merge with the successor when adjacent.
        if next != NIL && start + size == next {
            let succ = self.read_free(next);
            merged.size = size + succ.size;
            merged.next = succ.next;
        }

        if prev != NIL {
            let pred = self.read_free(prev);
            debug_assert!(
                prev + pred.size <= start,
                "double free or corrupted header at offset {start}"
            );
            if prev + pred.size == start {
                // Merge with the predecessor: extend it over the new block.
                self.write_free(
                    prev,
                    FreeBlock {
                        size: pred.size + merged.size,
                        next: merged.next,
                    },
                );
            } else {
                self.write_free(start, merged);
                self.write_free(
                    prev,
                    FreeBlock {
                        size: pred.size,
                        next: start,
                    },
                );
            }
        } else {
            self.write_free(start, merged);
            self.head = start;
        }

        self.used -= size as usize;
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

    /// Current usage statistics. `used` counts carved blocks, headers and
    /// padding included.
    pub fn stats(&self) -> AllocStats {
        AllocStats {
            capacity: self.storage.len(),
            used: self.used,
            peak: self.peak,
        }
    }

    fn read_free(&self, offset: u32) -> FreeBlock {
        self.read_record(offset as usize)
    }

    fn write_free(&mut self, offset: u32, record: FreeBlock) {
        self.write_record(offset as usize, record);
    }

    fn read_header(&self, offset: usize) -> AllocHeader {
        self.read_record(offset)
    }

    fn write_header(&mut self, offset: usize, record: AllocHeader) {
        self.write_record(offset, record);
    }

    fn read_record<T: Pod>(&self, offset: usize) -> T {
        bytemuck::pod_read_unaligned(&self.storage[offset..offset + std::mem::size_of::<T>()])
    }

    fn write_record<T: Pod>(&mut self, offset: usize, record: T) {
        self.storage[offset..offset + std::mem::size_of::<T>()]
            .copy_from_slice(bytemuck::bytes_of(&record));
    }

    /// Points `prev`'s link (or the list head) at `to`.
    fn relink(&mut self, prev: u32, to: u32) {
        if prev == NIL {
            self.head = to;
        } else {
            let mut record = self.read_free(prev);
            record.next = to;
            self.write_free(prev, record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The largest single allocation the region can serve: one header plus
    /// payload spanning every byte. Only possible when the free list is a
    /// single block covering the full region.
    fn spanning_request(allocator: &GeneralAllocator) -> usize {
        allocator.capacity() - HEADER_SIZE
    }

    #[test]
    fn allocations_carry_headers_and_do_not_overlap() {
        let mut allocator = GeneralAllocator::with_capacity(1024);
        let a = allocator.allocate(64, 8).unwrap();
        let b = allocator.allocate(64, 8).unwrap();

        assert_eq!(a.offset() % 8, 0);
        assert_eq!(b.offset() % 8, 0);
        assert!(a.offset() + a.size() <= b.offset() - HEADER_SIZE);
    }

    #[test]
    fn freeing_in_arbitrary_order_coalesces_to_one_block() {
        let mut allocator = GeneralAllocator::with_capacity(1024);
        let blocks: Vec<Block> = (0..6)
            .map(|_| allocator.allocate(100, 8).unwrap())
            .collect();

        // Interleaved order: middle, ends, remainder.
        for index in [3, 0, 5, 1, 4, 2] {
            allocator.deallocate(&blocks[index]);
        }

        assert_eq!(allocator.stats().used, 0);
        // Only a single spanning free block can serve this request.
        let all = allocator.allocate(spanning_request(&allocator), 1).unwrap();
        assert_eq!(all.offset(), HEADER_SIZE);
    }

    #[test]
    fn freed_space_is_reused_first_fit() {
        let mut allocator = GeneralAllocator::with_capacity(1024);
        let first = allocator.allocate(128, 8).unwrap();
        let _second = allocator.allocate(128, 8).unwrap();

        allocator.deallocate(&first);
        let reused = allocator.allocate(64, 8).unwrap();
        assert_eq!(reused.offset(), first.offset());
    }

    #[test]
    fn tiny_leftover_consumes_whole_block() {
        let mut allocator = GeneralAllocator::with_capacity(256);
        // Leaves less than MIN_BLOCK_SIZE behind the carved block.
        let nearly_all = allocator
            .allocate(allocator.capacity() - HEADER_SIZE - (MIN_BLOCK_SIZE - 1), 1)
            .unwrap();
        assert_eq!(allocator.stats().used, allocator.capacity());

        // Nothing left to serve even the smallest request.
        assert!(allocator.allocate(1, 1).is_err());

        allocator.deallocate(&nearly_all);
        assert_eq!(allocator.stats().used, 0);
    }

    #[test]
    fn exhaustion_is_an_error() {
        let mut allocator = GeneralAllocator::with_capacity(128);
        let err = allocator.allocate(256, 8).unwrap_err();
        assert!(matches!(err, AllocError::CapacityExceeded { .. }));
    }

    #[test]
    fn stats_track_peak_across_frees() {
        let mut allocator = GeneralAllocator::with_capacity(1024);
        let a = allocator.allocate(256, 8).unwrap();
        let peak_used = allocator.stats().used;
        allocator.deallocate(&a);

        let stats = allocator.stats();
        assert_eq!(stats.used, 0);
        assert_eq!(stats.peak, peak_used);
    }

    #[test]
    fn payload_round_trips_through_the_region() {
        let mut allocator = GeneralAllocator::with_capacity(256);
        let block = allocator.allocate(16, 4).unwrap();
        allocator.bytes_mut(&block).copy_from_slice(&[7u8; 16]);
        assert_eq!(allocator.bytes(&block), &[7u8; 16]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "double free")]
    fn double_free_is_rejected_in_debug_builds() {
        let mut allocator = GeneralAllocator::with_capacity(256);
        let a = allocator.allocate(32, 8).unwrap();
        allocator.deallocate(&a);
        allocator.deallocate(&a);
    }
}
