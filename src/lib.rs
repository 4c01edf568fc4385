/*
 * Murmuration - Module Definitions
 *
 * This file defines the module structure of the flock silhouette generator.
 * The pipeline runs leaves first: noise field, shape sampler, flock
 * composer, deformer stack, and the projection engine that turns the final
 * 3D cloud into ordered, oriented 2D primitives.
 */

// Re-export key components for easier access
pub use camera::{CameraConfig, ProjectionKind};
pub use deform::{deform, Axis, Deformer, DeformerConfig};
pub use flock::{compose, compose_layout, FlockConfig, FlockLayout};
pub use noise::{FbmOptions, NoiseField};
pub use params::{FlockParams, ParamError};
pub use projection::{project, ProjectedPrimitive, ProjectionConfig};
pub use scene::{generate, Regenerated, Scene};
pub use shape::{sample, FillMode, ShapeConfig, ShapeDims, ShapeKind};
pub use spatial_grid::DensityGrid;

// Define modules
pub mod camera;
pub mod deform;
pub mod flock;
pub mod noise;
pub mod params;
pub mod projection;
pub mod scene;
pub mod shape;
pub mod spatial_grid;

// A single point of the flock
pub type Point3 = glam::Vec3;

// Points in generation order: clusters first, then bridge points
pub type PointCloud = Vec<Point3>;
