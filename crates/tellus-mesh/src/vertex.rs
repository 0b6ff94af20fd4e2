//! Vertex formats for the streaming mesh buffers.
//!
//! Any vertex type that can describe its own attribute layout can back a
//! streaming vertex buffer; the [`VertexLayout`] trait is that capability.

use std::mem;

use bytemuck::{Pod, Zeroable};

/// A vertex type that knows its own GPU attribute layout.
///
/// The `Pod` bound lets buffers upload slices of the type with
/// `bytemuck::cast_slice`; `layout()` feeds the render pipeline's vertex
/// state so buffer and pipeline can never drift apart.
pub trait VertexLayout: Pod {
    /// The `wgpu` vertex buffer layout describing this type's attributes.
    fn layout() -> wgpu::VertexBufferLayout<'static>;
}

/// Planet surface vertex: position, approximate normal, biome color.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PlanetVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

/// Attributes at locations 0..2, all `Float32x3`.
const PLANET_VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: mem::size_of::<[f32; 3]>() as u64,
        shader_location: 1,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: (mem::size_of::<[f32; 3]>() * 2) as u64,
        shader_location: 2,
    },
];

impl VertexLayout for PlanetVertex {
    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<PlanetVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &PLANET_VERTEX_ATTRIBUTES,
        }
    }
}

/// Stride must match the struct size.
const _: () = assert!(
    mem::size_of::<PlanetVertex>() == 36,
    "PlanetVertex size changed - update PLANET_VERTEX_ATTRIBUTES"
);

/// Last attribute must fit within the stride.
const _: () = assert!(
    PLANET_VERTEX_ATTRIBUTES[2].offset as usize + mem::size_of::<[f32; 3]>()
        <= mem::size_of::<PlanetVertex>()
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_stride_matches_struct_size() {
        let layout = PlanetVertex::layout();
        assert_eq!(layout.array_stride, mem::size_of::<PlanetVertex>() as u64);
        assert_eq!(layout.array_stride, 36);
    }

    #[test]
    fn test_attribute_offsets_and_locations() {
        let layout = PlanetVertex::layout();
        assert_eq!(layout.attributes.len(), 3);
        for (i, attribute) in layout.attributes.iter().enumerate() {
            assert_eq!(attribute.shader_location, i as u32);
            assert_eq!(attribute.offset, (i * 12) as u64);
            assert_eq!(attribute.format, wgpu::VertexFormat::Float32x3);
        }
    }

    #[test]
    fn test_cast_slice_round_trip() {
        let vertices = [PlanetVertex {
            position: [1.0, 2.0, 3.0],
            normal: [0.0, 1.0, 0.0],
            color: [0.5, 0.5, 0.5],
        }];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 36);
        let back: &[PlanetVertex] = bytemuck::cast_slice(bytes);
        assert_eq!(back[0], vertices[0]);
    }
}
