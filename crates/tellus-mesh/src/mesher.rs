//! Triangulation of a [`RadialHeightfield`] into a colored surface mesh.
//!
//! Positions come from spherical-to-Cartesian conversion of the per-cell
//! radii, normals from the normalized position vector (the surface is a
//! radius perturbation of an origin-centered sphere, so this is a cheap
//! approximation of the true surface normal), and colors from the biome
//! classifier. Trig goes through `libm` so the same field meshes to
//! bit-identical geometry on every platform.

use std::f64::consts::PI;

use tellus_noise::TileablePerlin;
use tellus_terrain::{BiomePalette, IceCapParams, RadialHeightfield};

use crate::vertex::PlanetVertex;

/// Tiling period of the secondary color-variation noise, in either axis.
const COLOR_NOISE_PERIOD: u32 = 32;

/// A CPU-side triangle mesh ready to ship into the streaming buffers.
#[derive(Debug, Clone, Default)]
pub struct SurfaceMesh {
    pub vertices: Vec<PlanetVertex>,
    pub indices: Vec<u32>,
}

impl SurfaceMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Vertex data as raw bytes.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as raw bytes.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Triangulate a heightfield into positions, normals, and biome colors.
///
/// Rows map the polar angle over [0, pi], columns map azimuth over
/// [0, 2*pi). Each grid quad becomes two triangles; the azimuthal seam is
/// closed by wrapping the column index, while the polar rows stay an open
/// boundary (no pole fan). `color_seed` seeds the secondary noise used for
/// biome band variation and the ice-cap edge wobble.
pub fn mesh_heightfield(
    field: &RadialHeightfield,
    palette: &BiomePalette,
    ice: &IceCapParams,
    color_seed: u64,
) -> SurfaceMesh {
    let rows = field.rows();
    let cols = field.cols();
    let nominal = field.nominal_radius();
    let color_noise = TileablePerlin::new(color_seed, COLOR_NOISE_PERIOD, COLOR_NOISE_PERIOD);

    let mut vertices = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let theta = PI * row as f64 / (rows - 1) as f64;
        let (sin_theta, cos_theta) = (libm::sin(theta), libm::cos(theta));
        let latitude = row as f64 / (rows - 1) as f64;

        for col in 0..cols {
            let phi = 2.0 * PI * col as f64 / cols as f64;
            let radius = field.radius(row, col);

            let x = radius * sin_theta * libm::cos(phi);
            let y = radius * cos_theta;
            let z = radius * sin_theta * libm::sin(phi);

            // Degenerate cells (radius driven to zero) get a zero normal
            // instead of dividing by a vanishing length.
            let length = libm::sqrt(x * x + y * y + z * z);
            let normal = if length > f64::EPSILON {
                [(x / length) as f32, (y / length) as f32, (z / length) as f32]
            } else {
                [0.0; 3]
            };

            let u = f64::from(COLOR_NOISE_PERIOD) * (row as f64 / rows as f64) + 0.5;
            let v = f64::from(COLOR_NOISE_PERIOD) * (col as f64 / cols as f64) + 0.5;
            let variation = color_noise.sample(u, v);
            let mut color = palette.classify(radius - nominal, variation);

            let azimuth_fraction = col as f64 / cols as f64;
            let boundary_noise = color_noise.sample(
                azimuth_fraction * f64::from(COLOR_NOISE_PERIOD) + 0.5,
                0.5,
            );
            color = ice.blend(color, ice.mask(latitude, boundary_noise));

            vertices.push(PlanetVertex {
                position: [x as f32, y as f32, z as f32],
                normal,
                color: color.to_array(),
            });
        }
    }

    let mut indices = Vec::with_capacity((rows - 1) * cols * 6);
    for row in 0..rows - 1 {
        for col in 0..cols {
            let next_col = (col + 1) % cols;
            let idx0 = (row * cols + col) as u32;
            let idx1 = ((row + 1) * cols + col) as u32;
            let idx2 = ((row + 1) * cols + next_col) as u32;
            let idx3 = (row * cols + next_col) as u32;

            indices.extend_from_slice(&[idx0, idx1, idx2]);
            indices.extend_from_slice(&[idx0, idx2, idx3]);
        }
    }

    SurfaceMesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_field(rows: usize, cols: usize, radius: f64) -> RadialHeightfield {
        RadialHeightfield::new(rows, cols, radius).unwrap()
    }

    fn mesh_flat(rows: usize, cols: usize, radius: f64) -> SurfaceMesh {
        mesh_heightfield(
            &flat_field(rows, cols, radius),
            &BiomePalette::default(),
            &IceCapParams::default(),
            7,
        )
    }

    #[test]
    fn test_unperturbed_sphere_positions_and_normals() {
        let mesh = mesh_flat(8, 8, 10.0);
        assert_eq!(mesh.vertex_count(), 64);
        for vertex in &mesh.vertices {
            let [x, y, z] = vertex.position;
            let length = (x * x + y * y + z * z).sqrt();
            assert!(
                (length - 10.0).abs() < 1e-4,
                "vertex at distance {length}, expected 10"
            );
            let [nx, ny, nz] = vertex.normal;
            let normal_length = (nx * nx + ny * ny + nz * nz).sqrt();
            assert!((normal_length - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_index_count_and_bounds() {
        let mesh = mesh_flat(8, 8, 10.0);
        assert_eq!(mesh.index_count(), 7 * 8 * 6);
        let vertex_count = mesh.vertex_count() as u32;
        assert!(mesh.indices.iter().all(|&index| index < vertex_count));
    }

    #[test]
    fn test_azimuthal_seam_wraps_to_column_zero() {
        let cols = 8u32;
        let mesh = mesh_flat(4, cols as usize, 5.0);
        // The last column's quads must reference column 0 of the same rows.
        let seam_quad_start = ((cols - 1) * 6) as usize;
        let quad = &mesh.indices[seam_quad_start..seam_quad_start + 6];
        assert!(quad.contains(&0), "seam quad {quad:?} does not wrap");
        assert!(quad.contains(&cols), "seam quad {quad:?} does not wrap");
    }

    #[test]
    fn test_degenerate_radius_yields_zero_normal() {
        let mut field = flat_field(4, 4, 1.0);
        field.set_radius(1, 2, 0.0);
        let mesh = mesh_heightfield(
            &field,
            &BiomePalette::default(),
            &IceCapParams::default(),
            7,
        );
        let vertex = &mesh.vertices[1 * 4 + 2];
        assert_eq!(vertex.normal, [0.0; 3]);
        assert!(vertex.position.iter().all(|component| component.is_finite()));
    }

    #[test]
    fn test_polar_vertices_are_capped_with_ice() {
        let mesh = mesh_flat(32, 32, 10.0);
        let ice = IceCapParams::default();
        // Row 0 sits at the pole; a flat field's elevation is 0 (shallow
        // ocean edge), so the pole being ice-colored proves the mask ran.
        let polar = &mesh.vertices[0];
        let expected = ice.color.to_array();
        for (channel, target) in polar.color.iter().zip(expected) {
            assert!((channel - target).abs() < 1e-5);
        }
    }

    #[test]
    fn test_same_seed_same_mesh() {
        let a = mesh_flat(16, 16, 10.0);
        let b = mesh_flat(16, 16, 10.0);
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.indices, b.indices);
    }

    #[test]
    fn test_byte_views_cover_all_elements() {
        let mesh = mesh_flat(4, 4, 1.0);
        assert_eq!(mesh.vertex_bytes().len(), mesh.vertex_count() * 36);
        assert_eq!(mesh.index_bytes().len(), mesh.index_count() * 4);
    }
}
