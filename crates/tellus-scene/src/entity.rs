//! Mesh-owning entities and the ship protocol.
//!
//! An entity holds a CPU-side mesh plus the block ranges it has acquired
//! from the two shared stream buffers. `ship` acquires enough blocks for
//! the geometry, rewrites the local indices into absolute buffer offsets,
//! and uploads block-sized slices. The blocks go back to their allocators
//! when the entity releases them (or is dropped).
//!
//! Shipping is single-use: the `Unshipped -> Shipped -> Released` state
//! machine rejects a second `ship`, so indices are remapped in place
//! exactly once and can never be double-remapped.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{EulerRot, Mat4, Vec3};
use tellus_alloc::BlockAllocatorError;
use tellus_mesh::VertexLayout;
use tellus_render::{DrawRange, StreamIndexBuffer, StreamVertexBuffer};

use crate::id::EntityId;

/// Handle to the scene-wide vertex buffer. The buffers outlive every entity
/// holding one of these; entities own only their acquired blocks.
pub type SharedVertexBuffer<V> = Rc<RefCell<StreamVertexBuffer<V>>>;
/// Handle to the scene-wide index buffer.
pub type SharedIndexBuffer = Rc<RefCell<StreamIndexBuffer>>;

/// Where an entity is in its upload lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShipState {
    /// CPU mesh only; no blocks held beyond any partial acquisition.
    Unshipped,
    /// Geometry uploaded; indices are in absolute buffer coordinates.
    Shipped,
    /// Blocks returned. Terminal.
    Released,
}

/// Errors from the ship protocol.
#[derive(Debug, thiserror::Error)]
pub enum ShipError {
    /// `ship` was already called; re-shipping is unsupported.
    #[error("entity already shipped")]
    AlreadyShipped,

    /// The entity released its blocks and cannot be shipped again.
    #[error("entity blocks already released")]
    Released,

    /// Block acquisition failed (typically buffer exhaustion).
    #[error("block acquisition failed: {0}")]
    Allocation(#[from] BlockAllocatorError),

    /// A local index references a vertex the mesh does not have.
    #[error("index {index} out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds { index: u32, vertex_count: usize },

    /// The mesh can no longer be replaced.
    #[error("mesh is frozen once shipped")]
    MeshFrozen,
}

/// A positioned mesh owner backed by the shared stream buffers.
pub struct Entity<V: VertexLayout> {
    id: EntityId,
    position: Vec3,
    euler_angles: Vec3,
    model_matrix: Mat4,
    vertices: Vec<V>,
    indices: Vec<u32>,
    vertex_blocks: Vec<usize>,
    index_blocks: Vec<usize>,
    vertex_buffer: SharedVertexBuffer<V>,
    index_buffer: SharedIndexBuffer,
    state: ShipState,
}

impl<V: VertexLayout> Entity<V> {
    /// Create an empty entity at a transform, attached to the shared
    /// buffers.
    pub fn new(
        position: Vec3,
        euler_angles: Vec3,
        vertex_buffer: SharedVertexBuffer<V>,
        index_buffer: SharedIndexBuffer,
    ) -> Self {
        Self {
            id: EntityId::next(),
            position,
            euler_angles,
            model_matrix: model_matrix(position, euler_angles),
            vertices: Vec::new(),
            indices: Vec::new(),
            vertex_blocks: Vec::new(),
            index_blocks: Vec::new(),
            vertex_buffer,
            index_buffer,
            state: ShipState::Unshipped,
        }
    }

    /// Replace the CPU-side mesh. Only legal before shipping, since shipped
    /// indices are already rewritten to absolute offsets.
    pub fn set_mesh(&mut self, vertices: Vec<V>, indices: Vec<u32>) -> Result<(), ShipError> {
        if self.state != ShipState::Unshipped {
            return Err(ShipError::MeshFrozen);
        }
        self.vertices = vertices;
        self.indices = indices;
        Ok(())
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix
    }

    pub fn state(&self) -> ShipState {
        self.state
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// CPU-side vertex array.
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    /// CPU-side index array: local before shipping, absolute buffer
    /// offsets after.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Blocks currently held in the vertex buffer.
    pub fn vertex_block_offsets(&self) -> &[usize] {
        &self.vertex_blocks
    }

    /// Blocks currently held in the index buffer.
    pub fn index_block_offsets(&self) -> &[usize] {
        &self.index_blocks
    }

    /// Move the entity and rebuild its model matrix.
    pub fn set_transform(&mut self, position: Vec3, euler_angles: Vec3) {
        self.position = position;
        self.euler_angles = euler_angles;
        self.model_matrix = model_matrix(position, euler_angles);
    }

    /// Upload the finalized mesh into the shared buffers.
    ///
    /// Acquires vertex and index blocks until the held capacity covers the
    /// mesh (blocks held from an aborted earlier attempt are kept, not
    /// re-acquired), rewrites local indices into absolute vertex-buffer
    /// offsets, and writes one block-sized slice per held block.
    ///
    /// On allocator exhaustion the ship aborts before any index rewrite or
    /// upload; already-held blocks stay with the entity and return to the
    /// allocator on release.
    pub fn ship(&mut self, queue: &wgpu::Queue) -> Result<(), ShipError> {
        match self.state {
            ShipState::Unshipped => {}
            ShipState::Shipped => return Err(ShipError::AlreadyShipped),
            ShipState::Released => return Err(ShipError::Released),
        }

        let vertex_block_size = self.vertex_buffer.borrow().block_size();
        let index_block_size = self.index_buffer.borrow().block_size();

        // Every local index must land inside some acquired vertex block.
        if let Some(&bad) = self
            .indices
            .iter()
            .find(|&&index| index as usize >= self.vertices.len())
        {
            return Err(ShipError::IndexOutOfBounds {
                index: bad,
                vertex_count: self.vertices.len(),
            });
        }

        {
            let mut vertex_buffer = self.vertex_buffer.borrow_mut();
            while self.vertex_blocks.len() * vertex_block_size < self.vertices.len() {
                self.vertex_blocks.push(vertex_buffer.allocate_block()?);
            }
        }
        {
            let mut index_buffer = self.index_buffer.borrow_mut();
            while self.index_blocks.len() * index_block_size < self.indices.len() {
                self.index_blocks.push(index_buffer.allocate_block()?);
            }
        }

        remap_indices(&mut self.indices, &self.vertex_blocks, vertex_block_size);

        let vertex_buffer = self.vertex_buffer.borrow();
        for (i, &block_offset) in self.vertex_blocks.iter().enumerate() {
            let start = i * vertex_block_size;
            let end = (start + vertex_block_size).min(self.vertices.len());
            vertex_buffer.write(queue, &self.vertices[start..end], block_offset);
        }

        let index_buffer = self.index_buffer.borrow();
        for (i, &block_offset) in self.index_blocks.iter().enumerate() {
            let start = i * index_block_size;
            let end = (start + index_block_size).min(self.indices.len());
            index_buffer.write(queue, &self.indices[start..end], block_offset);
        }

        self.state = ShipState::Shipped;
        log::debug!(
            "entity {} shipped: {} vertices in {} blocks, {} indices in {} blocks",
            self.id.raw(),
            self.vertices.len(),
            self.vertex_blocks.len(),
            self.indices.len(),
            self.index_blocks.len(),
        );
        Ok(())
    }

    /// One draw descriptor per held index block.
    ///
    /// The render loop consumes these without knowing about blocks: each is
    /// a byte offset into the shared index buffer plus an element count,
    /// the last block clamped to the indices actually present.
    pub fn draw_ranges(&self) -> Vec<DrawRange> {
        let block_size = self.index_buffer.borrow().block_size();
        self.index_blocks
            .iter()
            .enumerate()
            .map(|(i, &block_offset)| DrawRange {
                index_byte_offset: (block_offset * std::mem::size_of::<u32>()) as u64,
                index_count: block_size.min(self.indices.len() - i * block_size) as u32,
            })
            .collect()
    }

    /// Return every held block to its allocator. Terminal: the entity can
    /// no longer be shipped.
    pub fn release_blocks(&mut self) {
        let mut vertex_buffer = self.vertex_buffer.borrow_mut();
        for &block in &self.vertex_blocks {
            if let Err(error) = vertex_buffer.release_block(block) {
                log::warn!("entity {}: vertex block release failed: {error}", self.id.raw());
            }
        }
        drop(vertex_buffer);

        let mut index_buffer = self.index_buffer.borrow_mut();
        for &block in &self.index_blocks {
            if let Err(error) = index_buffer.release_block(block) {
                log::warn!("entity {}: index block release failed: {error}", self.id.raw());
            }
        }

        self.vertex_blocks.clear();
        self.index_blocks.clear();
        self.state = ShipState::Released;
    }
}

impl<V: VertexLayout> Drop for Entity<V> {
    fn drop(&mut self) {
        if self.state != ShipState::Released {
            self.release_blocks();
        }
    }
}

/// Rewrite local mesh indices into absolute buffer offsets.
///
/// Local index `i` was authored against a contiguous 0-based vertex array;
/// after shipping, that array lives in `blocks` (each `block_size` vertices
/// long), so `i` becomes its offset within its block plus the block's
/// absolute start.
fn remap_indices(indices: &mut [u32], blocks: &[usize], block_size: usize) {
    for index in indices {
        let local = *index as usize;
        *index = (local % block_size + blocks[local / block_size]) as u32;
    }
}

fn model_matrix(position: Vec3, euler_angles: Vec3) -> Mat4 {
    Mat4::from_translation(position)
        * Mat4::from_euler(
            EulerRot::XYZ,
            euler_angles.x,
            euler_angles.y,
            euler_angles.z,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tellus_mesh::PlanetVertex;
    use tellus_render::StreamVertexBuffer;

    fn create_test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok()?;
            adapter
                .request_device(&wgpu::DeviceDescriptor::default())
                .await
                .ok()
        })
    }

    fn shared_buffers(
        device: &wgpu::Device,
        vertex_capacity: usize,
        vertex_block: usize,
        index_capacity: usize,
        index_block: usize,
    ) -> (SharedVertexBuffer<PlanetVertex>, SharedIndexBuffer) {
        let vertex_buffer = Rc::new(RefCell::new(
            StreamVertexBuffer::new(device, vertex_capacity, vertex_block, "test-vb").unwrap(),
        ));
        let index_buffer = Rc::new(RefCell::new(
            StreamIndexBuffer::new(device, index_capacity, index_block, "test-ib").unwrap(),
        ));
        (vertex_buffer, index_buffer)
    }

    fn dummy_vertices(count: usize) -> Vec<PlanetVertex> {
        vec![
            PlanetVertex {
                position: [0.0; 3],
                normal: [0.0, 1.0, 0.0],
                color: [1.0; 3],
            };
            count
        ]
    }

    #[test]
    fn test_remap_single_block() {
        let mut indices = vec![0, 1, 2, 2, 3, 0];
        remap_indices(&mut indices, &[800], 400);
        assert_eq!(indices, vec![800, 801, 802, 802, 803, 800]);
    }

    #[test]
    fn test_remap_spans_blocks() {
        // Block size 4: local 0..3 in the first block, 4..7 in the second.
        let mut indices = vec![0, 3, 4, 7, 5];
        remap_indices(&mut indices, &[100, 20], 4);
        assert_eq!(indices, vec![100, 103, 20, 23, 21]);
    }

    #[test]
    fn test_remap_identity_when_block_at_zero() {
        let mut indices = vec![0, 1, 2];
        remap_indices(&mut indices, &[0], 400);
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_thousand_vertices_need_three_blocks() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let (vertex_buffer, index_buffer) = shared_buffers(&device, 2000, 400, 4000, 1000);
        let free_before = vertex_buffer.borrow().free_block_count();

        let mut entity = Entity::new(
            Vec3::ZERO,
            Vec3::ZERO,
            vertex_buffer.clone(),
            index_buffer.clone(),
        );
        let indices: Vec<u32> = (0..1000).collect();
        entity.set_mesh(dummy_vertices(1000), indices).unwrap();
        entity.ship(&queue).unwrap();

        assert_eq!(entity.vertex_block_offsets().len(), 3);
        assert_eq!(entity.state(), ShipState::Shipped);
        assert_eq!(vertex_buffer.borrow().free_block_count(), free_before - 3);

        drop(entity);
        assert_eq!(vertex_buffer.borrow().free_block_count(), free_before);
        assert_eq!(index_buffer.borrow().free_block_count(), 4);
    }

    #[test]
    fn test_remapped_indices_stay_inside_acquired_blocks() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let (vertex_buffer, index_buffer) = shared_buffers(&device, 4000, 256, 8000, 512);

        // A second entity first, so block offsets are not trivially zero.
        let mut spacer = Entity::new(
            Vec3::ZERO,
            Vec3::ZERO,
            vertex_buffer.clone(),
            index_buffer.clone(),
        );
        spacer
            .set_mesh(dummy_vertices(300), (0..300).collect())
            .unwrap();
        spacer.ship(&queue).unwrap();

        let mut entity = Entity::new(
            Vec3::ZERO,
            Vec3::ZERO,
            vertex_buffer.clone(),
            index_buffer.clone(),
        );
        entity
            .set_mesh(dummy_vertices(700), (0..700).rev().collect())
            .unwrap();
        entity.ship(&queue).unwrap();

        let blocks = entity.vertex_block_offsets().to_vec();
        let capacity = vertex_buffer.borrow().capacity();
        // Inspect through draw ranges is index-side; check vertex side via
        // the remapped CPU copy.
        for &index in entity.indices() {
            let absolute = index as usize;
            assert!(absolute < capacity);
            let in_some_block = blocks
                .iter()
                .any(|&block| absolute >= block && absolute < block + 256);
            assert!(in_some_block, "index {absolute} outside blocks {blocks:?}");
        }
    }

    #[test]
    fn test_ship_twice_rejected() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let (vertex_buffer, index_buffer) = shared_buffers(&device, 1000, 100, 1000, 100);
        let mut entity = Entity::new(Vec3::ZERO, Vec3::ZERO, vertex_buffer, index_buffer);
        entity
            .set_mesh(dummy_vertices(50), (0..50).collect())
            .unwrap();
        entity.ship(&queue).unwrap();
        assert!(matches!(
            entity.ship(&queue),
            Err(ShipError::AlreadyShipped)
        ));
        // The mesh is frozen too.
        assert!(matches!(
            entity.set_mesh(dummy_vertices(1), vec![0]),
            Err(ShipError::MeshFrozen)
        ));
    }

    #[test]
    fn test_exhaustion_aborts_ship() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        // Only 2 vertex blocks of 100 for a 300-vertex mesh.
        let (vertex_buffer, index_buffer) = shared_buffers(&device, 200, 100, 1000, 100);
        let mut entity = Entity::new(
            Vec3::ZERO,
            Vec3::ZERO,
            vertex_buffer.clone(),
            index_buffer.clone(),
        );
        entity
            .set_mesh(dummy_vertices(300), (0..300).collect())
            .unwrap();
        assert!(matches!(entity.ship(&queue), Err(ShipError::Allocation(_))));
        assert_eq!(entity.state(), ShipState::Unshipped);
        // Indices were not remapped by the failed attempt.
        assert_eq!(entity.indices()[299], 299);
        // Held blocks go back on release.
        drop(entity);
        assert_eq!(vertex_buffer.borrow().free_block_count(), 2);
    }

    #[test]
    fn test_out_of_bounds_index_rejected_before_allocation() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let (vertex_buffer, index_buffer) = shared_buffers(&device, 1000, 100, 1000, 100);
        let free_before = vertex_buffer.borrow().free_block_count();
        let mut entity = Entity::new(
            Vec3::ZERO,
            Vec3::ZERO,
            vertex_buffer.clone(),
            index_buffer,
        );
        entity.set_mesh(dummy_vertices(10), vec![0, 10]).unwrap();
        assert!(matches!(
            entity.ship(&queue),
            Err(ShipError::IndexOutOfBounds { index: 10, .. })
        ));
        assert_eq!(vertex_buffer.borrow().free_block_count(), free_before);
    }

    #[test]
    fn test_draw_ranges_clamp_last_block() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let (vertex_buffer, index_buffer) = shared_buffers(&device, 1000, 100, 1000, 100);
        let mut entity = Entity::new(Vec3::ZERO, Vec3::ZERO, vertex_buffer, index_buffer);
        // 250 indices across blocks of 100: counts 100, 100, 50.
        entity
            .set_mesh(dummy_vertices(90), (0..90).cycle().take(250).collect())
            .unwrap();
        entity.ship(&queue).unwrap();

        let ranges = entity.draw_ranges();
        assert_eq!(ranges.len(), 3);
        let counts: Vec<u32> = ranges.iter().map(|range| range.index_count).collect();
        assert_eq!(counts, vec![100, 100, 50]);
        for range in &ranges {
            assert_eq!(range.index_byte_offset % 4, 0);
            assert_eq!(
                u64::from(range.first_index()) * 4,
                range.index_byte_offset
            );
        }
    }

    #[test]
    fn test_released_entity_cannot_ship() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let (vertex_buffer, index_buffer) = shared_buffers(&device, 1000, 100, 1000, 100);
        let mut entity = Entity::new(Vec3::ZERO, Vec3::ZERO, vertex_buffer, index_buffer);
        entity
            .set_mesh(dummy_vertices(10), (0..10).collect())
            .unwrap();
        entity.release_blocks();
        assert_eq!(entity.state(), ShipState::Released);
        assert!(matches!(entity.ship(&queue), Err(ShipError::Released)));
    }
}
