/*
 * Noise Field Module
 *
 * This module defines the NoiseField struct, a seeded 3D simplex noise source.
 * On top of the raw simplex evaluation it provides fractal sums (fBm), a
 * three-channel vector fBm used as a displacement / vector potential, and the
 * curl of that potential, which is a divergence-free flow field.
 *
 * Each NoiseField owns its permutation table, so independent generation runs
 * never share hidden state. A default-constructed field behaves as if it had
 * been seeded with 0.
 */

use glam::Vec3;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

// Skew and unskew factors for three dimensions
const F3: f64 = 1.0 / 3.0;
const G3: f64 = 1.0 / 6.0;

// Step used for the central differences in curl3
pub const CURL_EPSILON: f64 = 0.001;

// Gradient directions: midpoints of the edges of a cube
const GRAD3: [[f64; 3]; 12] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
];

// Coordinate offsets that decorrelate the three channels of the vector fields.
// fbm3vec and curl3 must share these so the curl is taken of the same potential.
const CHANNEL_OFFSETS: [[f64; 3]; 3] = [
    [0.0, 0.0, 0.0],
    [217.3, -131.9, 457.1],
    [-389.7, 263.3, -173.5],
];

// Octave settings for fractal noise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FbmOptions {
    pub octaves: u32,
    pub persistence: f32,
    pub lacunarity: f32,
    pub frequency: f32,
    pub amplitude: f32,
}

impl Default for FbmOptions {
    fn default() -> Self {
        Self {
            octaves: 3,
            persistence: 0.5,
            lacunarity: 2.0,
            frequency: 1.0,
            amplitude: 1.0,
        }
    }
}

impl FbmOptions {
    // Single octave at the given frequency, unit amplitude
    pub fn single(frequency: f32) -> Self {
        Self {
            octaves: 1,
            frequency,
            ..Self::default()
        }
    }

    pub fn with_octaves(self, octaves: u32) -> Self {
        Self { octaves, ..self }
    }

    pub fn with_frequency(self, frequency: f32) -> Self {
        Self { frequency, ..self }
    }

    pub fn with_amplitude(self, amplitude: f32) -> Self {
        Self { amplitude, ..self }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoiseField {
    seed: u64,
    // 256 shuffled entries, doubled so corner lookups never wrap
    perm: [u8; 512],
}

impl Default for NoiseField {
    fn default() -> Self {
        Self::new(0)
    }
}

impl NoiseField {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            perm: build_permutation(seed),
        }
    }

    // Re-initialize the permutation table in place
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.perm = build_permutation(seed);
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    fn perm(&self, index: usize) -> usize {
        self.perm[index] as usize
    }

    // Classic 3D simplex noise, output in [-1, 1]
    pub fn simplex3(&self, x: f64, y: f64, z: f64) -> f64 {
        // Skew the input space to find the containing simplex cell
        let s = (x + y + z) * F3;
        let i = (x + s).floor();
        let j = (y + s).floor();
        let k = (z + s).floor();

        // Unskew the cell origin back to (x, y, z) space
        let t = (i + j + k) * G3;
        let x0 = x - (i - t);
        let y0 = y - (j - t);
        let z0 = z - (k - t);

        // Pick the simplex by ranking the offsets from the cell origin
        let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
            if y0 >= z0 {
                (1, 0, 0, 1, 1, 0)
            } else if x0 >= z0 {
                (1, 0, 0, 1, 0, 1)
            } else {
                (0, 0, 1, 1, 0, 1)
            }
        } else if y0 < z0 {
            (0, 0, 1, 0, 1, 1)
        } else if x0 < z0 {
            (0, 1, 0, 0, 1, 1)
        } else {
            (0, 1, 0, 1, 1, 0)
        };

        // Offsets for the remaining three corners
        let x1 = x0 - i1 as f64 + G3;
        let y1 = y0 - j1 as f64 + G3;
        let z1 = z0 - k1 as f64 + G3;
        let x2 = x0 - i2 as f64 + 2.0 * G3;
        let y2 = y0 - j2 as f64 + 2.0 * G3;
        let z2 = z0 - k2 as f64 + 2.0 * G3;
        let x3 = x0 - 1.0 + 3.0 * G3;
        let y3 = y0 - 1.0 + 3.0 * G3;
        let z3 = z0 - 1.0 + 3.0 * G3;

        // Hashed gradient indices of the four corners
        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;
        let kk = (k as i64 & 255) as usize;
        let gi0 = self.perm(ii + self.perm(jj + self.perm(kk))) % 12;
        let gi1 = self.perm(ii + i1 + self.perm(jj + j1 + self.perm(kk + k1))) % 12;
        let gi2 = self.perm(ii + i2 + self.perm(jj + j2 + self.perm(kk + k2))) % 12;
        let gi3 = self.perm(ii + 1 + self.perm(jj + 1 + self.perm(kk + 1))) % 12;

        let n0 = corner(gi0, x0, y0, z0);
        let n1 = corner(gi1, x1, y1, z1);
        let n2 = corner(gi2, x2, y2, z2);
        let n3 = corner(gi3, x3, y3, z3);

        // Scale the sum into [-1, 1]
        32.0 * (n0 + n1 + n2 + n3)
    }

    // Fractal Brownian motion, normalized by the accumulated octave weight
    pub fn fbm3(&self, x: f64, y: f64, z: f64, opts: &FbmOptions) -> f64 {
        let mut frequency = opts.frequency as f64;
        let mut weight = 1.0;
        let mut sum = 0.0;
        let mut total_weight = 0.0;

        for _ in 0..opts.octaves {
            sum += self.simplex3(x * frequency, y * frequency, z * frequency) * weight;
            total_weight += weight;
            frequency *= opts.lacunarity as f64;
            weight *= opts.persistence as f64;
        }

        if total_weight == 0.0 {
            return 0.0;
        }
        sum / total_weight * opts.amplitude as f64
    }

    // Three fBm channels sampled at shifted coordinates
    fn potential(&self, x: f64, y: f64, z: f64, opts: &FbmOptions) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (channel, offset) in CHANNEL_OFFSETS.iter().enumerate() {
            out[channel] = self.fbm3(x + offset[0], y + offset[1], z + offset[2], opts);
        }
        out
    }

    pub fn fbm3vec(&self, p: Vec3, opts: &FbmOptions) -> Vec3 {
        let [nx, ny, nz] = self.potential(p.x as f64, p.y as f64, p.z as f64, opts);
        Vec3::new(nx as f32, ny as f32, nz as f32)
    }

    // Curl of the fbm3vec potential via central differences
    pub fn curl3(&self, p: Vec3, opts: &FbmOptions) -> Vec3 {
        let (x, y, z) = (p.x as f64, p.y as f64, p.z as f64);
        let e = CURL_EPSILON;
        let inv = 1.0 / (2.0 * e);

        let dx_pos = self.potential(x + e, y, z, opts);
        let dx_neg = self.potential(x - e, y, z, opts);
        let dy_pos = self.potential(x, y + e, z, opts);
        let dy_neg = self.potential(x, y - e, z, opts);
        let dz_pos = self.potential(x, y, z + e, opts);
        let dz_neg = self.potential(x, y, z - e, opts);

        // Partial derivative of channel c along one axis
        let d = |pos: &[f64; 3], neg: &[f64; 3], c: usize| (pos[c] - neg[c]) * inv;

        let curl_x = d(&dy_pos, &dy_neg, 2) - d(&dz_pos, &dz_neg, 1);
        let curl_y = d(&dz_pos, &dz_neg, 0) - d(&dx_pos, &dx_neg, 2);
        let curl_z = d(&dx_pos, &dx_neg, 1) - d(&dy_pos, &dy_neg, 0);

        Vec3::new(curl_x as f32, curl_y as f32, curl_z as f32)
    }

    // Convenience for sampling simplex noise at a point
    #[inline]
    pub fn simplex_at(&self, p: Vec3) -> f32 {
        self.simplex3(p.x as f64, p.y as f64, p.z as f64) as f32
    }
}

// Contribution of one simplex corner
#[inline]
fn corner(gradient: usize, x: f64, y: f64, z: f64) -> f64 {
    let t = 0.6 - x * x - y * y - z * z;
    if t <= 0.0 {
        return 0.0;
    }
    let g = GRAD3[gradient];
    let t2 = t * t;
    t2 * t2 * (g[0] * x + g[1] * y + g[2] * z)
}

// Fisher-Yates shuffle of 0..=255 driven by a seeded stream
fn build_permutation(seed: u64) -> [u8; 512] {
    let mut base: Vec<u8> = (0..=255).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    base.shuffle(&mut rng);

    let mut perm = [0u8; 512];
    for (i, slot) in perm.iter_mut().enumerate() {
        *slot = base[i & 255];
    }
    perm
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice() -> impl Iterator<Item = (f64, f64, f64)> {
        (0..12).flat_map(|i| {
            (0..12).flat_map(move |j| {
                (0..6).map(move |k| (i as f64 * 0.37 - 2.0, j as f64 * 0.41 + 1.3, k as f64 * 0.53))
            })
        })
    }

    #[test]
    fn same_seed_reproduces_values() {
        let a = NoiseField::new(42);
        let mut b = NoiseField::new(7);
        b.reseed(42);
        for (x, y, z) in lattice() {
            assert_eq!(a.simplex3(x, y, z).to_bits(), b.simplex3(x, y, z).to_bits());
        }
        assert_eq!(a, b);
    }

    #[test]
    fn default_field_matches_seed_zero() {
        assert_eq!(NoiseField::default(), NoiseField::new(0));
    }

    #[test]
    fn different_seeds_differ() {
        let a = NoiseField::new(1);
        let b = NoiseField::new(2);
        let differing = lattice()
            .filter(|&(x, y, z)| a.simplex3(x, y, z) != b.simplex3(x, y, z))
            .count();
        assert!(differing > 100, "only {differing} samples differ");
    }

    #[test]
    fn simplex_stays_in_unit_range() {
        let field = NoiseField::new(9);
        let mut max_abs: f64 = 0.0;
        for (x, y, z) in lattice() {
            let v = field.simplex3(x * 3.1, y * 2.7, z * 1.9);
            assert!(v.abs() <= 1.0, "value {v} out of range");
            max_abs = max_abs.max(v.abs());
        }
        assert!(max_abs > 0.2, "noise looks flat: {max_abs}");
    }

    #[test]
    fn fbm_is_normalized_by_octave_weight() {
        let field = NoiseField::new(3);
        let opts = FbmOptions::default().with_octaves(6).with_frequency(0.8);
        for (x, y, z) in lattice() {
            let v = field.fbm3(x, y, z, &opts);
            assert!(v.abs() <= 1.0, "fbm value {v} out of range");
        }

        let scaled = opts.with_amplitude(5.0);
        let (x, y, z) = (0.3, -1.2, 2.2);
        let ratio = field.fbm3(x, y, z, &scaled) / field.fbm3(x, y, z, &opts);
        assert!((ratio - 5.0).abs() < 1e-9);
    }

    #[test]
    fn fbm_without_octaves_is_zero() {
        let field = NoiseField::new(3);
        let opts = FbmOptions::default().with_octaves(0);
        assert_eq!(field.fbm3(1.0, 2.0, 3.0, &opts), 0.0);
    }

    #[test]
    fn vector_channels_are_decorrelated() {
        let field = NoiseField::new(11);
        let opts = FbmOptions::single(0.5);
        let v = field.fbm3vec(Vec3::new(1.5, -0.5, 2.0), &opts);
        assert!(v.x != v.y && v.y != v.z && v.x != v.z);
    }

    #[test]
    fn curl_field_is_divergence_free() {
        let field = NoiseField::new(5);
        let opts = FbmOptions::default().with_octaves(2).with_frequency(0.2);
        let h = 0.01;
        for &(x, y, z) in &[(0.5f32, 1.0f32, -2.0f32), (3.3, -4.1, 0.7), (-6.0, 2.5, 8.0)] {
            let p = Vec3::new(x, y, z);
            let div = (field.curl3(p + Vec3::X * h, &opts).x - field.curl3(p - Vec3::X * h, &opts).x
                + field.curl3(p + Vec3::Y * h, &opts).y
                - field.curl3(p - Vec3::Y * h, &opts).y
                + field.curl3(p + Vec3::Z * h, &opts).z
                - field.curl3(p - Vec3::Z * h, &opts).z)
                / (2.0 * h);
            let magnitude = field.curl3(p, &opts).length();
            assert!(magnitude > 1e-4, "curl vanished at {p:?}");
            assert!(div.abs() < 0.02, "divergence {div} at {p:?}");
        }
    }
}
