//! Planet entities: fractal heightfield synthesis wired into the entity
//! lifecycle.

use glam::Vec3;
use tellus_mesh::{PlanetVertex, mesh_heightfield};
use tellus_noise::FbmParams;
use tellus_terrain::{BiomePalette, IceCapParams, RadialHeightfield, TerrainError};

use crate::entity::{Entity, SharedIndexBuffer, SharedVertexBuffer};

/// Everything that shapes one planet.
#[derive(Clone, Debug)]
pub struct PlanetParams {
    /// Master seed: drives the terrain octaves and the color variation
    /// noise, so one number reproduces the whole planet.
    pub seed: u64,
    /// Polar-angle rows of the heightfield grid.
    pub rows: usize,
    /// Azimuthal columns of the heightfield grid.
    pub cols: usize,
    /// Unperturbed sphere radius.
    pub radius: f64,
    /// Octave ladder for the terrain noise. The `seed` field here is
    /// ignored in favor of the master seed above.
    pub fbm: FbmParams,
    pub palette: BiomePalette,
    pub ice: IceCapParams,
}

impl Default for PlanetParams {
    fn default() -> Self {
        Self {
            seed: 0,
            rows: 1024,
            cols: 1024,
            radius: 32.0,
            fbm: FbmParams::default(),
            palette: BiomePalette::default(),
            ice: IceCapParams::default(),
        }
    }
}

/// Synthesize a planet mesh and wrap it in an entity attached to the shared
/// buffers. The caller ships it when the scene is ready.
pub fn spawn_planet(
    position: Vec3,
    euler_angles: Vec3,
    vertex_buffer: SharedVertexBuffer<PlanetVertex>,
    index_buffer: SharedIndexBuffer,
    params: &PlanetParams,
) -> Result<Entity<PlanetVertex>, TerrainError> {
    let mut field = RadialHeightfield::new(params.rows, params.cols, params.radius)?;
    let fbm = FbmParams {
        seed: params.seed,
        ..params.fbm.clone()
    };
    field.apply_fbm(&fbm);

    let mesh = mesh_heightfield(&field, &params.palette, &params.ice, params.seed);
    log::info!(
        "planet mesh (seed {}): {} vertices, {} indices",
        params.seed,
        mesh.vertices.len(),
        mesh.indices.len(),
    );

    let mut entity = Entity::new(position, euler_angles, vertex_buffer, index_buffer);
    entity
        .set_mesh(mesh.vertices, mesh.indices)
        .expect("freshly created entity is unshipped");
    Ok(entity)
}
