//! Scene entities that own CPU meshes and ranges of the shared stream
//! buffers.

mod entity;
mod id;
mod planet;

pub use entity::{Entity, SharedIndexBuffer, SharedVertexBuffer, ShipError, ShipState};
pub use id::EntityId;
pub use planet::{PlanetParams, spawn_planet};
