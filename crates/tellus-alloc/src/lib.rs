//! Fixed-block sub-allocation for the streaming mesh buffers.
//!
//! A [`BlockAllocator`] divides a linear range of buffer units into
//! equally-sized blocks and hands out one block at a time. Mesh owners
//! acquire as many blocks as their geometry needs and return them when the
//! mesh is destroyed, so one large pre-allocated GPU buffer can be shared by
//! many independently-sized meshes without per-mesh buffer churn.

/// Errors produced by [`BlockAllocator`] construction and block operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BlockAllocatorError {
    /// Capacity or block size is zero, or capacity is not a multiple of block size.
    #[error("invalid allocator configuration: capacity {capacity}, block size {block_size}")]
    InvalidConfig { capacity: usize, block_size: usize },

    /// No free block remains.
    #[error("all {total_blocks} blocks are allocated")]
    Exhausted { total_blocks: usize },

    /// Offset passed to `deallocate` is not the start of a block.
    #[error("offset {offset} is not aligned to block size {block_size}")]
    Misaligned { offset: usize, block_size: usize },

    /// Offset lies past the end of the allocator's range.
    #[error("offset {offset} is outside capacity {capacity}")]
    OutOfRange { offset: usize, capacity: usize },

    /// The block containing the offset is already free.
    #[error("block at offset {offset} is already free")]
    AlreadyFree { offset: usize },
}

/// Fixed-size block allocator over a linear range of buffer units.
///
/// Blocks are tracked by index; `allocate` returns absolute unit offsets
/// (`block_index * block_size`) so callers can pass them straight to buffer
/// writes. Every block is in exactly one of the free or used sets at all
/// times: the free set is a LIFO list, and a per-block flag lets
/// `deallocate` reject a double release instead of corrupting the list.
///
/// Capacity and block size are fixed for the allocator's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAllocator {
    capacity: usize,
    block_size: usize,
    num_blocks: usize,
    /// Free block indices, most recently released on top.
    free: Vec<usize>,
    /// `used[i]` is true while block `i` is allocated.
    used: Vec<bool>,
}

impl BlockAllocator {
    /// Create an allocator over `capacity` units divided into blocks of
    /// `block_size` units.
    ///
    /// Fails unless both are nonzero and `capacity` is an exact multiple of
    /// `block_size`.
    pub fn new(capacity: usize, block_size: usize) -> Result<Self, BlockAllocatorError> {
        if block_size == 0 || capacity == 0 || capacity % block_size != 0 {
            return Err(BlockAllocatorError::InvalidConfig {
                capacity,
                block_size,
            });
        }
        let num_blocks = capacity / block_size;
        let mut allocator = Self {
            capacity,
            block_size,
            num_blocks,
            free: Vec::with_capacity(num_blocks),
            used: vec![false; num_blocks],
        };
        allocator.reset();
        Ok(allocator)
    }

    /// Allocate one block and return its starting offset in units.
    ///
    /// No ordering is guaranteed on which free block is returned.
    pub fn allocate(&mut self) -> Result<usize, BlockAllocatorError> {
        let block = self.free.pop().ok_or(BlockAllocatorError::Exhausted {
            total_blocks: self.num_blocks,
        })?;
        self.used[block] = true;
        Ok(block * self.block_size)
    }

    /// Return the block starting at `offset` to the free set.
    ///
    /// The offset must be block-aligned, within range, and currently
    /// allocated; releasing an already-free block is rejected without
    /// touching the free list.
    pub fn deallocate(&mut self, offset: usize) -> Result<(), BlockAllocatorError> {
        if offset % self.block_size != 0 {
            return Err(BlockAllocatorError::Misaligned {
                offset,
                block_size: self.block_size,
            });
        }
        let block = offset / self.block_size;
        if block >= self.num_blocks {
            return Err(BlockAllocatorError::OutOfRange {
                offset,
                capacity: self.capacity,
            });
        }
        if !self.used[block] {
            return Err(BlockAllocatorError::AlreadyFree { offset });
        }
        self.used[block] = false;
        self.free.push(block);
        Ok(())
    }

    /// Mark every block free again.
    ///
    /// Offsets handed out before the reset must not be used afterward.
    pub fn reset(&mut self) {
        self.free.clear();
        self.free.extend(0..self.num_blocks);
        self.used.fill(false);
    }

    /// Total capacity in units.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Units per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks the range is divided into.
    pub fn total_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Number of blocks currently free.
    pub fn free_block_count(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_block_accounting() {
        for (capacity, block_size) in [(1200, 400), (4096, 256), (10, 10), (64, 1)] {
            let allocator = BlockAllocator::new(capacity, block_size).unwrap();
            assert_eq!(allocator.total_blocks(), capacity / block_size);
            assert_eq!(allocator.free_block_count(), allocator.total_blocks());
            assert_eq!(allocator.capacity(), capacity);
            assert_eq!(allocator.block_size(), block_size);
        }
    }

    #[test]
    fn test_invalid_configurations_rejected() {
        for (capacity, block_size) in [(0, 4), (16, 0), (0, 0), (100, 32)] {
            assert_eq!(
                BlockAllocator::new(capacity, block_size),
                Err(BlockAllocatorError::InvalidConfig {
                    capacity,
                    block_size
                }),
            );
        }
    }

    #[test]
    fn test_allocated_offsets_aligned_and_in_range() {
        let mut allocator = BlockAllocator::new(1024, 128).unwrap();
        let mut seen = Vec::new();
        for _ in 0..allocator.total_blocks() {
            let offset = allocator.allocate().unwrap();
            assert_eq!(offset % 128, 0);
            assert!(offset < 1024);
            assert!(!seen.contains(&offset), "offset {offset} handed out twice");
            seen.push(offset);
        }
    }

    #[test]
    fn test_allocate_deallocate_round_trip() {
        let mut allocator = BlockAllocator::new(800, 100).unwrap();
        let offsets: Vec<usize> = (0..8).map(|_| allocator.allocate().unwrap()).collect();
        assert_eq!(allocator.free_block_count(), 0);

        // Release out of order; the free count must fully recover.
        for &offset in offsets.iter().rev().step_by(2) {
            allocator.deallocate(offset).unwrap();
        }
        for &offset in offsets.iter().step_by(2) {
            allocator.deallocate(offset).unwrap();
        }
        assert_eq!(allocator.free_block_count(), allocator.total_blocks());

        let offset = allocator.allocate().unwrap();
        assert_eq!(offset % 100, 0);
        assert!(offset < 800);
    }

    #[test]
    fn test_exhaustion_is_an_error_not_a_crash() {
        let mut allocator = BlockAllocator::new(300, 100).unwrap();
        for _ in 0..3 {
            allocator.allocate().unwrap();
        }
        assert_eq!(
            allocator.allocate(),
            Err(BlockAllocatorError::Exhausted { total_blocks: 3 }),
        );
        // The failed allocation must not have corrupted anything.
        allocator.deallocate(100).unwrap();
        assert_eq!(allocator.allocate(), Ok(100));
    }

    #[test]
    fn test_misaligned_offset_rejected() {
        let mut allocator = BlockAllocator::new(400, 100).unwrap();
        allocator.allocate().unwrap();
        assert_eq!(
            allocator.deallocate(150),
            Err(BlockAllocatorError::Misaligned {
                offset: 150,
                block_size: 100
            }),
        );
    }

    #[test]
    fn test_out_of_range_offset_rejected() {
        let mut allocator = BlockAllocator::new(400, 100).unwrap();
        assert_eq!(
            allocator.deallocate(400),
            Err(BlockAllocatorError::OutOfRange {
                offset: 400,
                capacity: 400
            }),
        );
    }

    #[test]
    fn test_double_free_detected() {
        let mut allocator = BlockAllocator::new(400, 100).unwrap();
        let offset = allocator.allocate().unwrap();
        allocator.deallocate(offset).unwrap();
        assert_eq!(
            allocator.deallocate(offset),
            Err(BlockAllocatorError::AlreadyFree { offset }),
        );
        // Free list must still hold each block exactly once.
        assert_eq!(allocator.free_block_count(), allocator.total_blocks());
        let mut offsets: Vec<usize> = (0..4).map(|_| allocator.allocate().unwrap()).collect();
        offsets.sort_unstable();
        assert_eq!(offsets, vec![0, 100, 200, 300]);
    }

    #[test]
    fn test_reset_restores_all_blocks() {
        let mut allocator = BlockAllocator::new(600, 200).unwrap();
        allocator.allocate().unwrap();
        allocator.allocate().unwrap();
        allocator.reset();
        assert_eq!(allocator.free_block_count(), 3);
        // Everything is allocatable again after reset.
        for _ in 0..3 {
            allocator.allocate().unwrap();
        }
        assert!(allocator.allocate().is_err());
    }
}
