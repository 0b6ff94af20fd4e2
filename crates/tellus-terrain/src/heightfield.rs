//! A 2D grid of per-cell radii over spherical angular coordinates.
//!
//! Rows sweep the polar angle from 0 to pi, columns sweep azimuth from 0 to
//! 2*pi. Each cell stores the planet's radius in that direction; noise
//! passes perturb the radii in place, and the mesher reads the finished grid
//! without mutating it.

use std::f64::consts::PI;

use tellus_noise::{FbmParams, FbmSampler};

/// Errors from heightfield construction.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TerrainError {
    /// Fewer than 2 rows or fewer than 1 column.
    #[error("invalid grid resolution: {rows} rows x {cols} columns")]
    InvalidResolution { rows: usize, cols: usize },

    /// Nominal radius is negative or not finite.
    #[error("invalid nominal radius {radius}")]
    InvalidRadius { radius: f64 },
}

/// Heightfield over a spherical angular grid.
///
/// Every cell holds a finite radius >= 0; the synthesis pass guards against
/// noise driving a cell negative or non-finite.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialHeightfield {
    rows: usize,
    cols: usize,
    nominal_radius: f64,
    /// Row-major radii, `rows * cols` entries.
    data: Vec<f64>,
}

impl RadialHeightfield {
    /// Create a grid with every cell at the nominal radius.
    pub fn new(rows: usize, cols: usize, nominal_radius: f64) -> Result<Self, TerrainError> {
        if rows < 2 || cols < 1 {
            return Err(TerrainError::InvalidResolution { rows, cols });
        }
        if !nominal_radius.is_finite() || nominal_radius < 0.0 {
            return Err(TerrainError::InvalidRadius {
                radius: nominal_radius,
            });
        }
        Ok(Self {
            rows,
            cols,
            nominal_radius,
            data: vec![nominal_radius; rows * cols],
        })
    }

    /// Number of polar-angle rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of azimuthal columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The unperturbed sphere radius the grid was created with.
    pub fn nominal_radius(&self) -> f64 {
        self.nominal_radius
    }

    /// Radius stored at a grid cell.
    pub fn radius(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Overwrite the radius at a grid cell.
    pub fn set_radius(&mut self, row: usize, col: usize, radius: f64) {
        self.data[row * self.cols + col] = radius;
    }

    /// Radius in the direction of `(theta, phi)`, theta in [0, pi] and phi
    /// in [0, 2*pi). Angles outside those ranges wrap.
    pub fn radius_at_angles(&self, theta: f64, phi: f64) -> f64 {
        let row = angle_to_index(theta, PI, self.rows);
        let col = angle_to_index(phi, 2.0 * PI, self.cols);
        self.radius(row, col)
    }

    /// Overwrite the radius in the direction of `(theta, phi)`.
    pub fn set_radius_at_angles(&mut self, theta: f64, phi: f64, radius: f64) {
        let row = angle_to_index(theta, PI, self.rows);
        let col = angle_to_index(phi, 2.0 * PI, self.cols);
        self.set_radius(row, col, radius);
    }

    /// Add a fractal noise field to every cell.
    ///
    /// The sampler tiles on this grid's dimensions, so the perturbed field
    /// stays continuous across the azimuthal seam. A sample that would leave
    /// a cell non-finite is discarded; a sample that would drive it negative
    /// clamps to zero.
    pub fn apply_fbm(&mut self, params: &FbmParams) {
        let sampler = FbmSampler::new(params, self.rows, self.cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = &mut self.data[row * self.cols + col];
                let perturbed = *cell + sampler.sample(row as f64, col as f64);
                if perturbed.is_finite() {
                    *cell = perturbed.max(0.0);
                }
            }
        }
    }
}

/// Map an angle to a grid index over `[0, span)`, clamped into range.
fn angle_to_index(angle: f64, span: f64, divisions: usize) -> usize {
    let wrapped = angle.rem_euclid(span);
    let normalized = wrapped / span;
    ((normalized * divisions as f64) as usize).min(divisions - 1)
}
