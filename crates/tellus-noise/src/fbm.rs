//! Multi-octave fractal compositor over [`TileablePerlin`].
//!
//! Composites K independent noise octaves, each at a higher frequency and
//! lower amplitude than the last, so broad continental shapes pick up
//! progressively finer ridging. Octave tiling periods are derived from the
//! target grid dimensions so the composite field stays seamless at the wrap
//! boundary at every octave.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::perlin::TileablePerlin;

/// Configuration for the fractal compositor.
#[derive(Clone, Debug, PartialEq)]
pub struct FbmParams {
    /// Master seed. Each octave draws its own sub-seed from a `ChaCha8Rng`
    /// stream seeded with this value.
    pub seed: u64,
    /// Number of octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves; amplitude divides by
    /// the same factor, so higher octaves contribute finer, weaker detail.
    pub lacunarity: f64,
    /// Overall output scale applied to every octave's contribution.
    pub base_scale: f64,
    /// Frequency of the first (broadest) octave in cycles per grid cell.
    pub base_frequency: f64,
}

impl Default for FbmParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 10,
            lacunarity: 2.0,
            base_scale: 0.5,
            base_frequency: 1.0 / 512.0,
        }
    }
}

struct Octave {
    noise: TileablePerlin,
    frequency: f64,
    amplitude: f64,
}

/// Amplitude-weighted sum of seeded noise octaves over a wrapping grid.
///
/// Built against a specific grid size: octave k gets tiling periods
/// `rows * frequency_k` and `cols * frequency_k` so a full trip around
/// either grid axis lands exactly on the octave's tiling boundary.
pub struct FbmSampler {
    octaves: Vec<Octave>,
    base_scale: f64,
}

impl FbmSampler {
    /// Build the octave ladder for a `rows x cols` grid.
    pub fn new(params: &FbmParams, rows: usize, cols: usize) -> Self {
        let mut seed_stream = ChaCha8Rng::seed_from_u64(params.seed);
        let mut frequency = params.base_frequency;
        let mut amplitude = 1.0;
        let mut octaves = Vec::with_capacity(params.octaves as usize);

        for _ in 0..params.octaves {
            // Periods truncate toward zero; a sub-cell period clamps to 1.
            let period_x = ((rows as f64 * frequency) as u32).max(1);
            let period_y = ((cols as f64 * frequency) as u32).max(1);
            octaves.push(Octave {
                noise: TileablePerlin::new(seed_stream.next_u64(), period_x, period_y),
                frequency,
                amplitude,
            });
            frequency *= params.lacunarity;
            amplitude /= params.lacunarity;
        }

        Self {
            octaves,
            base_scale: params.base_scale,
        }
    }

    /// Evaluate the composite field at fractional grid coordinates.
    pub fn sample(&self, row: f64, col: f64) -> f64 {
        let mut total = 0.0;
        for octave in &self.octaves {
            let x = row * octave.frequency + 0.5;
            let y = col * octave.frequency + 0.5;
            total += self.base_scale * octave.amplitude * octave.noise.sample(x, y);
        }
        total
    }

    /// Theoretical maximum absolute output (geometric sum of octave weights,
    /// assuming unit-range octaves). Useful for pre-sizing value ranges.
    pub fn max_amplitude(&self) -> f64 {
        self.octaves
            .iter()
            .map(|octave| self.base_scale * octave.amplitude)
            .sum()
    }

    /// Number of octaves in the ladder.
    pub fn octave_count(&self) -> usize {
        self.octaves.len()
    }
}
