/*
 * Deformer Stack Module
 *
 * This module defines the spatial deformers applied to a generated flock:
 * a low-frequency pre-smoothing pass, the primary noise displacement, and
 * the axis-based twist, taper, bend and wave operators.
 *
 * A DeformerConfig expands into an ordered list of Deformer stages. The
 * list is data: apply_stages folds any list over a cloud, each stage reading
 * the previous stage's output and producing a new cloud. Per-point work is
 * spread over rayon's pool with order-preserving collects, so results do not
 * depend on the thread count.
 */

use std::f32::consts::TAU;

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::noise::{FbmOptions, NoiseField};
use crate::{Point3, PointCloud};

// Offset that decorrelates the pre-smoothing field from the primary noise
pub const SMOOTH_OFFSET: f32 = 200.0;

// Bends below this angle (radians) are treated as identity
pub const BEND_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    pub fn component(self, p: Vec3) -> f32 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
            Axis::Z => p.z,
        }
    }

    // Split into (along axis, first off-axis, second off-axis)
    #[inline]
    fn split(self, p: Vec3) -> (f32, f32, f32) {
        match self {
            Axis::X => (p.x, p.y, p.z),
            Axis::Y => (p.y, p.x, p.z),
            Axis::Z => (p.z, p.x, p.y),
        }
    }

    #[inline]
    fn join(self, along: f32, a: f32, b: f32) -> Vec3 {
        match self {
            Axis::X => Vec3::new(along, a, b),
            Axis::Y => Vec3::new(a, along, b),
            Axis::Z => Vec3::new(a, b, along),
        }
    }
}

// Extent of a cloud along one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub min: f32,
    pub max: f32,
}

impl AxisBounds {
    pub fn of(cloud: &[Point3], axis: Axis) -> Self {
        let (min, max) = cloud.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &p| {
            let v = axis.component(p);
            (lo.min(v), hi.max(v))
        });
        if cloud.is_empty() {
            Self { min: 0.0, max: 0.0 }
        } else {
            Self { min, max }
        }
    }

    pub fn extent(&self) -> f32 {
        self.max - self.min
    }

    pub fn mid(&self) -> f32 {
        (self.min + self.max) * 0.5
    }

    // Position in [0, 1] along the bounds; 0 everywhere for a flat cloud
    #[inline]
    pub fn normalized(&self, v: f32) -> f32 {
        let extent = self.extent();
        let range = if extent > 0.0 { extent } else { 1.0 };
        (v - self.min) / range
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothConfig {
    pub enabled: bool,
    pub frequency: f32,
    pub amplitude: f32,
}

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency: 0.004,
            amplitude: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseDisplaceConfig {
    pub amplitude: f32,
    pub frequency: f32,
    pub octaves: u32,
    pub persistence: f32,
    pub lacunarity: f32,
    pub offset: [f32; 3],
}

impl Default for NoiseDisplaceConfig {
    fn default() -> Self {
        Self {
            amplitude: 25.0,
            frequency: 0.01,
            octaves: 3,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: [0.0; 3],
        }
    }
}

impl NoiseDisplaceConfig {
    pub fn fbm_options(&self) -> FbmOptions {
        FbmOptions {
            octaves: self.octaves,
            persistence: self.persistence,
            lacunarity: self.lacunarity,
            frequency: self.frequency,
            amplitude: self.amplitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwistConfig {
    pub enabled: bool,
    pub axis: Axis,
    // Full turns across the cloud's extent
    pub amount: f32,
}

impl Default for TwistConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            axis: Axis::Y,
            amount: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaperConfig {
    pub enabled: bool,
    pub axis: Axis,
    pub start: f32,
    pub end: f32,
}

impl Default for TaperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            axis: Axis::Y,
            start: 1.0,
            end: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BendConfig {
    pub enabled: bool,
    pub axis: Axis,
    // Total arc angle in radians
    pub angle: f32,
}

impl Default for BendConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            axis: Axis::X,
            angle: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    pub enabled: bool,
    pub axis: Axis,
    pub amplitude: f32,
    pub frequency: f32,
    pub phase: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            axis: Axis::X,
            amplitude: 15.0,
            frequency: 0.03,
            phase: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeformerConfig {
    pub smooth: SmoothConfig,
    pub noise: NoiseDisplaceConfig,
    pub twist: TwistConfig,
    pub taper: TaperConfig,
    pub bend: BendConfig,
    pub wave: WaveConfig,
}

impl DeformerConfig {
    // The enabled stages in their fixed pipeline order
    pub fn stages(&self) -> Vec<Deformer> {
        let mut stages = Vec::with_capacity(6);

        if self.smooth.enabled {
            stages.push(Deformer::Smooth {
                frequency: self.smooth.frequency,
                amplitude: self.smooth.amplitude,
            });
        }
        // The primary pass has no toggle, only its amplitude
        if self.noise.amplitude > 0.0 {
            stages.push(Deformer::Noise {
                options: self.noise.fbm_options(),
                offset: Vec3::from(self.noise.offset),
            });
        }
        if self.twist.enabled {
            stages.push(Deformer::Twist {
                axis: self.twist.axis,
                amount: self.twist.amount,
            });
        }
        if self.taper.enabled {
            stages.push(Deformer::Taper {
                axis: self.taper.axis,
                start: self.taper.start,
                end: self.taper.end,
            });
        }
        if self.bend.enabled {
            stages.push(Deformer::Bend {
                axis: self.bend.axis,
                angle: self.bend.angle,
            });
        }
        if self.wave.enabled {
            stages.push(Deformer::Wave {
                axis: self.wave.axis,
                amplitude: self.wave.amplitude,
                frequency: self.wave.frequency,
                phase: self.wave.phase,
            });
        }

        stages
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deformer {
    Smooth { frequency: f32, amplitude: f32 },
    Noise { options: FbmOptions, offset: Vec3 },
    Twist { axis: Axis, amount: f32 },
    Taper { axis: Axis, start: f32, end: f32 },
    Bend { axis: Axis, angle: f32 },
    Wave { axis: Axis, amplitude: f32, frequency: f32, phase: f32 },
}

impl Deformer {
    pub fn name(&self) -> &'static str {
        match self {
            Deformer::Smooth { .. } => "smooth",
            Deformer::Noise { .. } => "noise",
            Deformer::Twist { .. } => "twist",
            Deformer::Taper { .. } => "taper",
            Deformer::Bend { .. } => "bend",
            Deformer::Wave { .. } => "wave",
        }
    }

    pub fn apply(&self, cloud: &[Point3], noise: &NoiseField) -> PointCloud {
        match *self {
            Deformer::Smooth { frequency, amplitude } => {
                let options = FbmOptions::single(frequency).with_amplitude(amplitude);
                let offset = Vec3::splat(SMOOTH_OFFSET);
                map_points(cloud, |p| p + noise.fbm3vec(p + offset, &options))
            }
            Deformer::Noise { options, offset } => {
                map_points(cloud, |p| p + noise.fbm3vec(p + offset, &options))
            }
            Deformer::Twist { axis, amount } => {
                let bounds = AxisBounds::of(cloud, axis);
                map_points(cloud, |p| {
                    let (along, a, b) = axis.split(p);
                    let theta = (bounds.normalized(along) - 0.5) * amount * TAU;
                    let (sin, cos) = theta.sin_cos();
                    axis.join(along, a * cos - b * sin, a * sin + b * cos)
                })
            }
            Deformer::Taper { axis, start, end } => {
                let bounds = AxisBounds::of(cloud, axis);
                map_points(cloud, |p| {
                    let (along, a, b) = axis.split(p);
                    let t = bounds.normalized(along);
                    let s = start + (end - start) * t;
                    axis.join(along, a * s, b * s)
                })
            }
            Deformer::Bend { axis, angle } => bend(cloud, axis, angle),
            Deformer::Wave {
                axis,
                amplitude,
                frequency,
                phase,
            } => map_points(cloud, |p| {
                let (along, a, b) = axis.split(p);
                axis.join(along, a + amplitude * (along * frequency + phase).sin(), b)
            }),
        }
    }
}

// Wrap the cloud onto an arc whose length matches its extent along the axis
fn bend(cloud: &[Point3], axis: Axis, angle: f32) -> PointCloud {
    if angle.abs() < BEND_EPSILON {
        return cloud.to_vec();
    }
    let bounds = AxisBounds::of(cloud, axis);
    let extent = bounds.extent();
    if extent <= 0.0 {
        return cloud.to_vec();
    }

    let radius = extent / angle;
    let mid = bounds.mid();

    map_points(cloud, |p| {
        let (along, a, b) = axis.split(p);
        let theta = (along - mid) / radius;
        // The perpendicular offset becomes a radial offset from the arc
        let r = radius - a;
        let (sin, cos) = theta.sin_cos();
        axis.join(mid + r * sin, radius - r * cos, b)
    })
}

fn map_points<F>(cloud: &[Point3], f: F) -> PointCloud
where
    F: Fn(Point3) -> Point3 + Sync + Send,
{
    cloud.par_iter().map(|&p| f(p)).collect()
}

// Run an ordered list of stages, each replacing the whole cloud
pub fn apply_stages(cloud: &[Point3], stages: &[Deformer], noise: &NoiseField) -> PointCloud {
    let mut current = cloud.to_vec();
    for stage in stages {
        trace!(stage = stage.name(), points = current.len(), "applying deformer");
        current = stage.apply(&current, noise);
    }
    current
}

pub fn deform(cloud: &[Point3], config: &DeformerConfig, noise: &NoiseField) -> PointCloud {
    apply_stages(cloud, &config.stages(), noise)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column() -> PointCloud {
        (0..40)
            .map(|i| {
                let f = i as f32;
                Vec3::new((f * 0.7).sin() * 20.0, f * 5.0 - 100.0, (f * 1.3).cos() * 15.0)
            })
            .collect()
    }

    fn max_distance(a: &[Point3], b: &[Point3]) -> f32 {
        a.iter().zip(b).map(|(p, q)| (*p - *q).length()).fold(0.0, f32::max)
    }

    #[test]
    fn primary_noise_runs_without_a_toggle() {
        let config = DeformerConfig::default();
        let names: Vec<_> = config.stages().iter().map(Deformer::name).collect();
        assert_eq!(names, vec!["noise"]);

        let silent = DeformerConfig {
            noise: NoiseDisplaceConfig {
                amplitude: 0.0,
                ..NoiseDisplaceConfig::default()
            },
            ..DeformerConfig::default()
        };
        assert!(silent.stages().is_empty());
    }

    #[test]
    fn stages_follow_the_fixed_order() {
        let config = DeformerConfig {
            smooth: SmoothConfig { enabled: true, ..SmoothConfig::default() },
            wave: WaveConfig { enabled: true, ..WaveConfig::default() },
            bend: BendConfig { enabled: true, ..BendConfig::default() },
            taper: TaperConfig { enabled: true, ..TaperConfig::default() },
            twist: TwistConfig { enabled: true, ..TwistConfig::default() },
            ..DeformerConfig::default()
        };
        let names: Vec<_> = config.stages().iter().map(Deformer::name).collect();
        assert_eq!(names, vec!["smooth", "noise", "twist", "taper", "bend", "wave"]);
    }

    #[test]
    fn twist_and_taper_do_not_commute() {
        let noise = NoiseField::new(0);
        let twist = Deformer::Twist { axis: Axis::Y, amount: 0.5 };
        let taper = Deformer::Taper { axis: Axis::X, start: 1.0, end: 0.3 };

        let forward = apply_stages(&column(), &[twist, taper], &noise);
        let reverse = apply_stages(&column(), &[taper, twist], &noise);
        assert!(max_distance(&forward, &reverse) > 1e-2);
    }

    #[test]
    fn tiny_bend_is_identity() {
        let noise = NoiseField::new(0);
        let cloud = column();
        let bent = Deformer::Bend { axis: Axis::Y, angle: 0.0005 }.apply(&cloud, &noise);
        assert_eq!(bent, cloud);
    }

    #[test]
    fn bend_maps_the_axis_onto_an_arc() {
        let noise = NoiseField::new(0);
        let line: PointCloud = (0..11).map(|i| Vec3::new(0.0, i as f32 * 10.0, 0.0)).collect();
        let angle = 1.2;
        let bent = Deformer::Bend { axis: Axis::Y, angle }.apply(&line, &noise);

        let radius = 100.0 / angle;
        let center = Vec3::new(radius, 50.0, 0.0);
        for p in &bent {
            assert!(((*p - center).length() - radius).abs() < 1e-3);
        }
        // The midpoint of the axis stays put
        assert!((bent[5] - line[5]).length() < 1e-4);
    }

    #[test]
    fn bend_keeps_offsets_as_radial_offsets() {
        let noise = NoiseField::new(0);
        let cloud = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 100.0, 0.0),
            Vec3::new(7.0, 50.0, 3.0),
        ];
        let bent = Deformer::Bend { axis: Axis::Y, angle: 0.9 }.apply(&cloud, &noise);
        assert!((bent[2] - Vec3::new(7.0, 50.0, 3.0)).length() < 1e-4);
    }

    #[test]
    fn flat_cloud_twists_from_zero() {
        let noise = NoiseField::new(0);
        let flat = vec![Vec3::new(1.0, 5.0, 0.0), Vec3::new(0.0, 5.0, 2.0)];
        let twisted = Deformer::Twist { axis: Axis::Y, amount: 0.25 }.apply(&flat, &noise);

        // t = 0 everywhere, so every point turns by -quarter turn * 0.5
        let theta = -0.5 * 0.25 * TAU;
        let expected = Vec3::new(theta.cos(), 5.0, theta.sin());
        assert!(twisted.iter().all(|p| p.is_finite()));
        assert!((twisted[0] - expected).length() < 1e-5);
    }

    #[test]
    fn taper_scales_from_start_to_end() {
        let noise = NoiseField::new(0);
        let cloud = vec![Vec3::new(10.0, 0.0, 4.0), Vec3::new(10.0, 100.0, 4.0)];
        let tapered = Deformer::Taper { axis: Axis::Y, start: 1.0, end: 0.5 }.apply(&cloud, &noise);
        assert_eq!(tapered[0], Vec3::new(10.0, 0.0, 4.0));
        assert_eq!(tapered[1], Vec3::new(5.0, 100.0, 2.0));
    }

    #[test]
    fn wave_displaces_the_first_off_axis() {
        let noise = NoiseField::new(0);
        let cloud = vec![Vec3::new(30.0, 1.0, 2.0)];
        let waved = Deformer::Wave { axis: Axis::X, amplitude: 4.0, frequency: 0.1, phase: 0.5 }
            .apply(&cloud, &noise);
        let expected_y = 1.0 + 4.0 * (30.0f32 * 0.1 + 0.5).sin();
        assert!((waved[0].y - expected_y).abs() < 1e-5);
        assert_eq!(waved[0].x, 30.0);
        assert_eq!(waved[0].z, 2.0);
    }

    #[test]
    fn deform_is_deterministic_and_moves_points() {
        let noise = NoiseField::new(12);
        let config = DeformerConfig {
            smooth: SmoothConfig { enabled: true, ..SmoothConfig::default() },
            twist: TwistConfig { enabled: true, ..TwistConfig::default() },
            ..DeformerConfig::default()
        };
        let a = deform(&column(), &config, &noise);
        let b = deform(&column(), &config, &noise);
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert!(max_distance(&a, &column()) > 0.1);
    }

    #[test]
    fn bounds_of_empty_cloud_are_zero() {
        let bounds = AxisBounds::of(&[], Axis::Z);
        assert_eq!(bounds.extent(), 0.0);
        assert_eq!(bounds.normalized(0.0), 0.0);
    }
}
