//! Seeded, tileable gradient noise and the fractal compositor built on it.

mod fbm;
mod perlin;

pub use fbm::{FbmParams, FbmSampler};
pub use perlin::TileablePerlin;
