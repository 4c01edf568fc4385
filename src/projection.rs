/*
 * Projection Engine Module
 *
 * This module turns a deformed 3D cloud into the ordered list of oriented
 * 2D primitives that the drawing and export layers consume.
 *
 * Per point it samples the curl field for a flow direction, rotates both the
 * position and the flow vector into camera space, derives the heading, and
 * projects to the screen. A pose index is picked from noise at the world
 * position so poses do not change when only the camera moves.
 *
 * Once every point is gathered, depth is normalized across the batch to
 * derive scale and opacity, the optional density grid assigns each primitive
 * its local density, and the list is sorted by ascending depth.
 */

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::camera::{CameraConfig, ProjectionKind};
use crate::noise::{FbmOptions, NoiseField};
use crate::spatial_grid::DensityGrid;
use crate::Point3;

// Upper bounds of the [0, 1] noise bands for poses 0, 1 and 2
pub const POSE_THRESHOLDS: [f32; 3] = [0.35, 0.55, 0.75];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub enabled: bool,
    pub frequency: f32,
    pub octaves: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: 0.008,
            octaves: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    // How much far primitives shrink in orthographic mode
    pub depth_scale: f32,
    // Opacity of the farthest primitive
    pub depth_opacity: f32,
    pub depth_opacity_curve: f32,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            depth_scale: 0.4,
            depth_opacity: 0.35,
            depth_opacity_curve: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityBandConfig {
    pub enabled: bool,
    pub cell_size: f32,
}

impl Default for DensityBandConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cell_size: 24.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub camera: CameraConfig,
    pub flow: FlowConfig,
    pub depth: DepthConfig,
    pub density_band: DensityBandConfig,
    pub bird_scale: f32,
    // Heading jitter in full turns
    pub heading_jitter: f32,
    pub pose_frequency: f32,
    pub seed: u64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            flow: FlowConfig::default(),
            depth: DepthConfig::default(),
            density_band: DensityBandConfig::default(),
            bird_scale: 6.0,
            heading_jitter: 0.05,
            pose_frequency: 0.02,
            seed: 1,
        }
    }
}

impl ProjectionConfig {
    pub fn with_camera(self, camera: CameraConfig) -> Self {
        Self { camera, ..self }
    }

    fn flow_options(&self) -> FbmOptions {
        FbmOptions::default()
            .with_octaves(self.flow.octaves)
            .with_frequency(self.flow.frequency)
    }
}

// One renderable bird silhouette
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedPrimitive {
    pub screen_x: f32,
    pub screen_y: f32,
    // Camera-space depth before projection
    pub depth: f32,
    // Radians, measured in screen space
    pub heading: f32,
    pub scale: f32,
    pub opacity: f32,
    pub pose_index: u8,
    pub local_density: f32,
}

impl ProjectedPrimitive {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.screen_x, self.screen_y)
    }
}

// Per-point result before the batch-wide pass
struct Projected {
    primitive: ProjectedPrimitive,
    perspective_scale: f32,
}

// Map a [0, 1] noise value to one of four poses
pub fn pose_from_value(value: f32) -> u8 {
    POSE_THRESHOLDS
        .iter()
        .position(|&threshold| value < threshold)
        .unwrap_or(POSE_THRESHOLDS.len()) as u8
}

// Pose for a world-space point; independent of the camera
pub fn pose_index(noise: &NoiseField, world: Point3, frequency: f32) -> u8 {
    let n = noise.simplex_at(world * frequency);
    pose_from_value((n + 1.0) * 0.5)
}

// Cheap sine hash in [0, 1), keyed on seed and point index
pub fn heading_jitter(seed: u64, index: usize) -> f32 {
    let n = seed as f64 + index as f64 * 7.0;
    let x = n.sin() * 43758.5453;
    (x - x.floor()) as f32
}

pub fn project(
    cloud: &[Point3],
    config: &ProjectionConfig,
    noise: &NoiseField,
) -> Vec<ProjectedPrimitive> {
    let camera = &config.camera;
    let rotation = camera.rotation_matrix();
    let flow_options = config.flow_options();

    let projected: Vec<Projected> = cloud
        .par_iter()
        .enumerate()
        .filter_map(|(index, &world)| {
            let flow = if config.flow.enabled {
                noise.curl3(world, &flow_options)
            } else {
                Vec3::X
            };

            // Position and flow share the camera rotation
            let view = rotation * world;
            let view_flow = rotation * flow;

            let mut heading = view_flow.y.atan2(view_flow.x);
            if config.heading_jitter != 0.0 {
                heading += (heading_jitter(config.seed, index) - 0.5) * TAU * config.heading_jitter;
            }

            let screen = camera.project(view)?;

            Some(Projected {
                primitive: ProjectedPrimitive {
                    screen_x: screen.position.x,
                    screen_y: screen.position.y,
                    depth: screen.depth,
                    heading,
                    scale: 0.0,
                    opacity: 1.0,
                    pose_index: pose_index(noise, world, config.pose_frequency),
                    local_density: 0.0,
                },
                perspective_scale: screen.perspective_scale,
            })
        })
        .collect();

    let culled = cloud.len() - projected.len();
    let mut primitives = finish_batch(projected, config);

    if config.density_band.enabled {
        apply_density_band(&mut primitives, config);
    }

    // Back-to-front
    primitives.sort_by(|a, b| a.depth.total_cmp(&b.depth));

    debug!(projected = primitives.len(), culled, "projected cloud");
    primitives
}

// Depth-normalized scale and opacity; needs the whole batch
fn finish_batch(projected: Vec<Projected>, config: &ProjectionConfig) -> Vec<ProjectedPrimitive> {
    let (min_depth, max_depth) = projected
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.primitive.depth), hi.max(p.primitive.depth))
        });
    let range = max_depth - min_depth;
    let range = if range > 0.0 { range } else { 1.0 };

    let depth = &config.depth;
    let camera = &config.camera;

    projected
        .into_iter()
        .map(|p| {
            let mut primitive = p.primitive;
            let norm_depth = (primitive.depth - min_depth) / range;

            primitive.scale = match camera.projection {
                ProjectionKind::Perspective => config.bird_scale * p.perspective_scale * 0.5,
                ProjectionKind::Orthographic => {
                    let shrink = 1.0 - depth.depth_scale * (1.0 - norm_depth);
                    config.bird_scale * camera.zoom * 0.5 * shrink
                }
            };
            primitive.opacity = depth.depth_opacity
                + (1.0 - depth.depth_opacity) * norm_depth.powf(depth.depth_opacity_curve);
            primitive
        })
        .collect()
}

fn apply_density_band(primitives: &mut [ProjectedPrimitive], config: &ProjectionConfig) {
    let camera = &config.camera;
    let grid = DensityGrid::build(
        config.density_band.cell_size,
        camera.viewport_width,
        camera.viewport_height,
        primitives.iter().map(ProjectedPrimitive::position),
    );
    for primitive in primitives.iter_mut() {
        primitive.local_density = grid.density(primitive.position());
    }
}
