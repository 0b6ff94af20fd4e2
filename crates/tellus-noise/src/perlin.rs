//! Seeded 2D gradient noise with integer tiling periods on both axes.
//!
//! The azimuthal axis of a spherical grid wraps, so the noise field feeding
//! it has to wrap too. [`TileablePerlin`] evaluates classic permutation-table
//! gradient noise whose lattice coordinates are reduced modulo a per-axis
//! period, making the field seamless across the wrap boundary.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Seeded, tileable 2D gradient noise in roughly [-1, 1].
///
/// Built from a 256-entry permutation table (duplicated to 512 so corner
/// hashing never wraps mid-lookup), the quintic fade `6t^5 - 15t^4 + 10t^3`,
/// and an 8-direction gradient set selected by hashing integer lattice
/// coordinates through the table.
///
/// The same `(seed, period_x, period_y)` triple always reproduces the same
/// field; the table shuffle runs on a `ChaCha8Rng` so this holds across
/// platforms.
#[derive(Debug, Clone)]
pub struct TileablePerlin {
    perm: [u8; 512],
    period_x: u32,
    period_y: u32,
}

impl TileablePerlin {
    /// Create a noise source tiling after `period_x` units in x and
    /// `period_y` units in y.
    ///
    /// Periods are clamped to at least 1. Periods above 256 alias through
    /// the 256-entry table mask, exactly like lattice coordinates do.
    pub fn new(seed: u64, period_x: u32, period_y: u32) -> Self {
        let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        table.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        perm[..256].copy_from_slice(&table);
        perm[256..].copy_from_slice(&table);

        Self {
            perm,
            period_x: period_x.max(1),
            period_y: period_y.max(1),
        }
    }

    /// Evaluate the noise field at `(x, y)`.
    ///
    /// Output is in approximately [-1, 1]. `sample(x + period_x, y)` and
    /// `sample(x, y)` agree (up to floating rounding in the coordinate
    /// reduction), and likewise on the y axis.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let x = wrap(x, self.period_x);
        let y = wrap(y, self.period_y);

        let xi = x.floor() as i64;
        let yi = y.floor() as i64;
        let xf = x - x.floor();
        let yf = y - y.floor();

        let u = fade(xf);
        let v = fade(yf);

        let aa = self.hash(xi, yi);
        let ab = self.hash(xi, yi + 1);
        let ba = self.hash(xi + 1, yi);
        let bb = self.hash(xi + 1, yi + 1);

        let x1 = lerp(grad(aa, xf, yf), grad(ba, xf - 1.0, yf), u);
        let x2 = lerp(grad(ab, xf, yf - 1.0), grad(bb, xf - 1.0, yf - 1.0), u);
        lerp(x1, x2, v)
    }

    /// Tiling period on the x axis.
    pub fn period_x(&self) -> u32 {
        self.period_x
    }

    /// Tiling period on the y axis.
    pub fn period_y(&self) -> u32 {
        self.period_y
    }

    /// Hash integer lattice coordinates through the permutation table,
    /// reducing by the tiling periods first so the lattice itself wraps.
    fn hash(&self, x: i64, y: i64) -> u8 {
        let x = x.rem_euclid(i64::from(self.period_x)) as usize;
        let y = y.rem_euclid(i64::from(self.period_y)) as usize;
        self.perm[usize::from(self.perm[x & 255]) + (y & 255)]
    }
}

/// Reduce a coordinate into `[0, period)`.
fn wrap(value: f64, period: u32) -> f64 {
    let period = f64::from(period);
    let wrapped = value % period;
    if wrapped < 0.0 {
        wrapped + period
    } else {
        wrapped
    }
}

/// Quintic smoothstep: zero first and second derivatives at the cell edges.
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// One of 8 gradient directions, selected by the low 3 hash bits.
fn grad(hash: u8, x: f64, y: f64) -> f64 {
    let h = hash & 7;
    let (u, v) = if h < 4 { (x, y) } else { (y, x) };
    let u = if h & 1 != 0 { -u } else { u };
    let v = if h & 2 != 0 { -2.0 * v } else { 2.0 * v };
    u + v
}
