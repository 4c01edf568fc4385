/*
 * Shape Sampler Module
 *
 * This module generates raw 3D point sets for the primitive flock shapes:
 * spheres, ellipsoids, tori and a tube swept along a fixed Catmull-Rom spine.
 *
 * Every candidate point passes through a density acceptance test built from
 * a radial falloff (volume fill only) and a noise-shaped clumping term.
 * Rejection sampling is capped at MAX_ATTEMPTS_PER_POINT trials per requested
 * point; when the cap is hit the sampler returns a shorter cloud instead of
 * looping forever.
 */

use std::f32::consts::TAU;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::noise::NoiseField;
use crate::{Point3, PointCloud};

// Upper bound on acceptance trials, as a multiple of the requested count
pub const MAX_ATTEMPTS_PER_POINT: usize = 20;

// Spine of the swept tube in units of half its length
const SPINE: [[f32; 3]; 5] = [
    [-1.0, -0.2, 0.0],
    [-0.5, 0.25, 0.15],
    [0.0, 0.0, -0.1],
    [0.5, -0.25, 0.1],
    [1.0, 0.2, 0.0],
];

// Parameter step for the spine tangent
const TANGENT_STEP: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Sphere,
    Ellipsoid,
    Torus,
    Swept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillMode {
    Surface,
    Volume,
}

// Dimensional parameters; each shape reads the fields it needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeDims {
    pub radius_x: f32,
    pub radius_y: f32,
    pub radius_z: f32,
    pub major_radius: f32,
    pub minor_radius: f32,
    pub length: f32,
    pub cross_section_radius: f32,
}

impl Default for ShapeDims {
    fn default() -> Self {
        Self {
            radius_x: 150.0,
            radius_y: 90.0,
            radius_z: 110.0,
            major_radius: 130.0,
            minor_radius: 45.0,
            length: 360.0,
            cross_section_radius: 40.0,
        }
    }
}

impl ShapeDims {
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            radius_x: self.radius_x * factor,
            radius_y: self.radius_y * factor,
            radius_z: self.radius_z * factor,
            major_radius: self.major_radius * factor,
            minor_radius: self.minor_radius * factor,
            length: self.length * factor,
            cross_section_radius: self.cross_section_radius * factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    pub kind: ShapeKind,
    pub fill: FillMode,
    pub count: usize,
    pub seed: u64,
    pub dims: ShapeDims,
    pub density_falloff: f32,
    pub density_noise: f32,
    pub density_noise_freq: f32,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            kind: ShapeKind::Ellipsoid,
            fill: FillMode::Volume,
            count: 2000,
            seed: 1,
            dims: ShapeDims::default(),
            density_falloff: 0.0,
            density_noise: 0.0,
            density_noise_freq: 0.01,
        }
    }
}

impl ShapeConfig {
    pub fn with_kind(self, kind: ShapeKind) -> Self {
        Self { kind, ..self }
    }

    pub fn with_fill(self, fill: FillMode) -> Self {
        Self { fill, ..self }
    }

    pub fn with_count(self, count: usize) -> Self {
        Self { count, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    pub fn with_dims(self, dims: ShapeDims) -> Self {
        Self { dims, ..self }
    }

    // Copy with every dimensional parameter multiplied by factor
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            dims: self.dims.scaled(factor),
            ..self.clone()
        }
    }

    // Bounding radius of the shape around the origin
    pub fn max_radius(&self) -> f32 {
        let d = &self.dims;
        match self.kind {
            ShapeKind::Sphere => d.radius_x,
            ShapeKind::Ellipsoid => d.radius_x.max(d.radius_y).max(d.radius_z),
            ShapeKind::Torus => d.major_radius + d.minor_radius,
            ShapeKind::Swept => d.length * 0.5 + d.cross_section_radius,
        }
    }
}

pub struct SampleOutcome {
    pub points: PointCloud,
    pub attempts: usize,
}

// A generated point plus its normalized distance from the shape's core
struct Candidate {
    position: Point3,
    radial: f32,
}

pub fn sample(config: &ShapeConfig, noise: &NoiseField) -> PointCloud {
    sample_counted(config, noise).points
}

// Rejection-sample up to config.count points, reporting the trials used
pub fn sample_counted(config: &ShapeConfig, noise: &NoiseField) -> SampleOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let max_attempts = config.count.saturating_mul(MAX_ATTEMPTS_PER_POINT);
    let spine = spine_points(&config.dims);

    let mut points = Vec::with_capacity(config.count);
    let mut attempts = 0;

    while points.len() < config.count && attempts < max_attempts {
        attempts += 1;

        let candidate = match config.kind {
            ShapeKind::Sphere => {
                let r = config.dims.radius_x;
                ellipsoid_candidate(&mut rng, Vec3::splat(r), config.fill)
            }
            ShapeKind::Ellipsoid => {
                let d = &config.dims;
                let radii = Vec3::new(d.radius_x, d.radius_y, d.radius_z);
                ellipsoid_candidate(&mut rng, radii, config.fill)
            }
            ShapeKind::Torus => torus_candidate(&mut rng, &config.dims, config.fill),
            ShapeKind::Swept => swept_candidate(&mut rng, &spine, config.dims.cross_section_radius),
        };

        let probability = acceptance(config, &candidate, noise);
        if rng.gen::<f32>() < probability {
            points.push(candidate.position);
        }
    }

    if points.len() < config.count {
        debug!(
            requested = config.count,
            produced = points.len(),
            attempts,
            "rejection sampling exhausted its attempt budget"
        );
    }

    SampleOutcome { points, attempts }
}

// Probability of keeping a candidate under the density settings
fn acceptance(config: &ShapeConfig, candidate: &Candidate, noise: &NoiseField) -> f32 {
    let mut p = 1.0;

    if config.density_falloff > 0.0 && config.fill == FillMode::Volume {
        p *= (1.0 - candidate.radial).max(0.0).powf(config.density_falloff);
    }

    if config.density_noise > 0.0 {
        let n = noise.simplex_at(candidate.position * config.density_noise_freq);
        // Remap [-1, 1] to a multiplier in [1 - density_noise, 1]
        let n01 = (n + 1.0) * 0.5;
        p *= 1.0 - config.density_noise + config.density_noise * n01;
    }

    p
}

// Uniform point on the unit sphere (Marsaglia 1972)
fn unit_sphere<R: Rng>(rng: &mut R) -> Vec3 {
    loop {
        let u: f32 = rng.gen_range(-1.0..1.0);
        let v: f32 = rng.gen_range(-1.0..1.0);
        let s = u * u + v * v;
        if s >= 1.0 {
            continue;
        }
        let k = 2.0 * (1.0 - s).sqrt();
        return Vec3::new(u * k, v * k, 1.0 - 2.0 * s);
    }
}

fn ellipsoid_candidate<R: Rng>(rng: &mut R, radii: Vec3, fill: FillMode) -> Candidate {
    let direction = unit_sphere(rng);
    // Cube root keeps volume density uniform
    let r = match fill {
        FillMode::Surface => 1.0,
        FillMode::Volume => rng.gen::<f32>().cbrt(),
    };
    Candidate {
        position: direction * radii * r,
        radial: r,
    }
}

fn torus_candidate<R: Rng>(rng: &mut R, dims: &ShapeDims, fill: FillMode) -> Candidate {
    let u = rng.gen_range(0.0..TAU);
    let v = rng.gen_range(0.0..TAU);
    // Square root keeps the cross-section density uniform
    let fraction = match fill {
        FillMode::Surface => 1.0,
        FillMode::Volume => rng.gen::<f32>().sqrt(),
    };
    let minor = dims.minor_radius * fraction;
    let ring = dims.major_radius + minor * v.cos();

    Candidate {
        position: Vec3::new(ring * u.cos(), ring * u.sin(), minor * v.sin()),
        radial: fraction,
    }
}

fn swept_candidate<R: Rng>(rng: &mut R, spine: &[Vec3], cross_section_radius: f32) -> Candidate {
    let t: f32 = rng.gen();
    let center = catmull_rom(spine, t);
    let tangent = catmull_rom(spine, (t + TANGENT_STEP).min(1.0))
        - catmull_rom(spine, (t - TANGENT_STEP).max(0.0));
    let (normal, binormal) = orthonormal_frame(tangent);

    let angle = rng.gen_range(0.0..TAU);
    let fraction = rng.gen::<f32>().sqrt();
    let offset = (normal * angle.cos() + binormal * angle.sin()) * cross_section_radius * fraction;

    Candidate {
        position: center + offset,
        radial: fraction,
    }
}

fn spine_points(dims: &ShapeDims) -> Vec<Vec3> {
    let half = dims.length * 0.5;
    SPINE.iter().map(|&p| Vec3::from(p) * half).collect()
}

// Evaluate a clamped uniform Catmull-Rom spline at t in [0, 1]
pub fn catmull_rom(points: &[Vec3], t: f32) -> Vec3 {
    match points.len() {
        0 => return Vec3::ZERO,
        1 => return points[0],
        _ => {}
    }

    let segments = points.len() - 1;
    let scaled = t.clamp(0.0, 1.0) * segments as f32;
    let segment = (scaled.floor() as usize).min(segments - 1);
    let local = scaled - segment as f32;

    let p0 = points[segment.saturating_sub(1)];
    let p1 = points[segment];
    let p2 = points[segment + 1];
    let p3 = points[(segment + 2).min(segments)];

    let t2 = local * local;
    let t3 = t2 * local;
    0.5 * (2.0 * p1
        + (p2 - p0) * local
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

// Two unit vectors perpendicular to the tangent and to each other
pub fn orthonormal_frame(tangent: Vec3) -> (Vec3, Vec3) {
    let t = tangent.try_normalize().unwrap_or(Vec3::X);
    // Fall back to X as the up axis when the tangent is nearly vertical
    let up = if t.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
    let normal = t.cross(up).normalize();
    let binormal = t.cross(normal);
    (normal, binormal)
}
