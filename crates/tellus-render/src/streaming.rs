//! Streaming vertex and index buffers with block sub-allocation.
//!
//! Each buffer is one large pre-allocated GPU allocation divided into
//! fixed-size blocks by an owned [`BlockAllocator`]. Mesh owners acquire
//! blocks, write bounded sub-ranges into them, and release them when the
//! mesh goes away, so a whole scene of independently-sized meshes shares
//! two persistent GPU buffers.
//!
//! Writes are fail-soft: a request that is empty or would land outside the
//! buffer is logged and dropped without touching the allocator or the
//! backing storage. Running out of blocks, by contrast, is a hard error the
//! caller must handle.

use std::marker::PhantomData;
use std::mem;

use tellus_alloc::{BlockAllocator, BlockAllocatorError};
use tellus_mesh::VertexLayout;

/// Errors from streaming buffer construction.
#[derive(Debug, thiserror::Error)]
pub enum StreamBufferError {
    /// Capacity/block-size pair rejected by the allocator.
    #[error("invalid streaming buffer configuration: {0}")]
    InvalidConfig(#[from] BlockAllocatorError),
}

/// One indexed draw over a sub-range of a [`StreamIndexBuffer`].
///
/// This is the whole interface between shipped meshes and the render loop:
/// the loop binds the shared buffers once and issues one indexed draw per
/// range, without knowing anything about blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    /// Byte offset of the first index within the index buffer.
    pub index_byte_offset: u64,
    /// Number of indices to draw.
    pub index_count: u32,
}

impl DrawRange {
    /// The element offset of the first index.
    pub fn first_index(&self) -> u32 {
        (self.index_byte_offset / mem::size_of::<u32>() as u64) as u32
    }
}

/// A shared vertex buffer of `capacity` vertices, sub-allocated in blocks.
pub struct StreamVertexBuffer<V: VertexLayout> {
    buffer: wgpu::Buffer,
    capacity: usize,
    allocator: BlockAllocator,
    _vertex: PhantomData<V>,
}

impl<V: VertexLayout> StreamVertexBuffer<V> {
    /// Create a buffer holding `capacity` vertices, divided into blocks of
    /// `block_size` vertices.
    pub fn new(
        device: &wgpu::Device,
        capacity: usize,
        block_size: usize,
        label: &str,
    ) -> Result<Self, StreamBufferError> {
        let allocator = BlockAllocator::new(capacity, block_size)?;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * mem::size_of::<V>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Self {
            buffer,
            capacity,
            allocator,
            _vertex: PhantomData,
        })
    }

    /// Copy `data` into the buffer starting at `offset` (in vertices).
    ///
    /// Out-of-contract requests are logged and dropped: empty data, data as
    /// large as the whole buffer, or a range running past the end. A
    /// rejected write leaves buffer contents and allocator state untouched.
    pub fn write(&self, queue: &wgpu::Queue, data: &[V], offset: usize) {
        if data.is_empty() {
            log::warn!("dropping empty vertex write at offset {offset}");
            return;
        }
        if data.len() >= self.capacity {
            log::warn!(
                "dropping vertex write of {} vertices into buffer of {}",
                data.len(),
                self.capacity
            );
            return;
        }
        if offset + data.len() > self.capacity {
            log::warn!(
                "dropping vertex write of {} vertices at offset {offset}: past capacity {}",
                data.len(),
                self.capacity
            );
            return;
        }
        queue.write_buffer(
            &self.buffer,
            (offset * mem::size_of::<V>()) as u64,
            bytemuck::cast_slice(data),
        );
    }

    /// Acquire one block; returns its starting offset in vertices.
    pub fn allocate_block(&mut self) -> Result<usize, BlockAllocatorError> {
        self.allocator.allocate()
    }

    /// Return a previously acquired block.
    pub fn release_block(&mut self, offset: usize) -> Result<(), BlockAllocatorError> {
        self.allocator.deallocate(offset)
    }

    /// Select this buffer as the render pass's vertex source (slot 0).
    pub fn bind<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.buffer.slice(..));
    }

    /// Capacity in vertices.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Vertices per block.
    pub fn block_size(&self) -> usize {
        self.allocator.block_size()
    }

    /// Blocks not currently held by any mesh.
    pub fn free_block_count(&self) -> usize {
        self.allocator.free_block_count()
    }
}

/// A shared `u32` index buffer of `capacity` indices, sub-allocated in blocks.
pub struct StreamIndexBuffer {
    buffer: wgpu::Buffer,
    capacity: usize,
    allocator: BlockAllocator,
}

impl StreamIndexBuffer {
    /// Create a buffer holding `capacity` indices, divided into blocks of
    /// `block_size` indices.
    pub fn new(
        device: &wgpu::Device,
        capacity: usize,
        block_size: usize,
        label: &str,
    ) -> Result<Self, StreamBufferError> {
        let allocator = BlockAllocator::new(capacity, block_size)?;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Self {
            buffer,
            capacity,
            allocator,
        })
    }

    /// Copy `data` into the buffer starting at `offset` (in indices), under
    /// the same fail-soft contract as [`StreamVertexBuffer::write`].
    pub fn write(&self, queue: &wgpu::Queue, data: &[u32], offset: usize) {
        if data.is_empty() {
            log::warn!("dropping empty index write at offset {offset}");
            return;
        }
        if data.len() >= self.capacity {
            log::warn!(
                "dropping index write of {} indices into buffer of {}",
                data.len(),
                self.capacity
            );
            return;
        }
        if offset + data.len() > self.capacity {
            log::warn!(
                "dropping index write of {} indices at offset {offset}: past capacity {}",
                data.len(),
                self.capacity
            );
            return;
        }
        queue.write_buffer(
            &self.buffer,
            (offset * mem::size_of::<u32>()) as u64,
            bytemuck::cast_slice(data),
        );
    }

    /// Acquire one block; returns its starting offset in indices.
    pub fn allocate_block(&mut self) -> Result<usize, BlockAllocatorError> {
        self.allocator.allocate()
    }

    /// Return a previously acquired block.
    pub fn release_block(&mut self, offset: usize) -> Result<(), BlockAllocatorError> {
        self.allocator.deallocate(offset)
    }

    /// Select this buffer as the render pass's index source.
    pub fn bind<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_index_buffer(self.buffer.slice(..), wgpu::IndexFormat::Uint32);
    }

    /// Capacity in indices.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Indices per block.
    pub fn block_size(&self) -> usize {
        self.allocator.block_size()
    }

    /// Blocks not currently held by any mesh.
    pub fn free_block_count(&self) -> usize {
        self.allocator.free_block_count()
    }
}
