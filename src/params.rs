/*
 * Flock Parameters Module
 *
 * This module defines the FlockParams struct that bundles every adjustable
 * setting of the generation pipeline: the flock/shape settings, the deformer
 * stack and the projection. An external parameter surface edits these values
 * and hands them to the pipeline.
 *
 * It also provides validation for callers that want to reject unusable
 * values up front, slider ranges, and snapshot-based change detection that
 * tells which pipeline stages a parameter edit invalidates.
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deform::DeformerConfig;
use crate::flock::FlockConfig;
use crate::projection::ProjectionConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("point count must be greater than zero")]
    ZeroCount,
    #[error("{field} must be positive, got {value}")]
    NonPositiveDimension { field: &'static str, value: f32 },
    #[error("{field} frequency must be positive, got {value}")]
    NonPositiveFrequency { field: &'static str, value: f32 },
    #[error("{field} must lie in [0, 1], got {value}")]
    FractionOutOfRange { field: &'static str, value: f32 },
    #[error("noise octaves must be at least 1")]
    ZeroOctaves,
    #[error("viewport must have a positive size, got {width}x{height}")]
    InvalidViewport { width: f32, height: f32 },
    #[error("density cell size must be positive")]
    NonPositiveCellSize,
}

// The stage configs as they were when a snapshot was taken
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSnapshot {
    seed: u64,
    flock: FlockConfig,
    deform: DeformerConfig,
    projection: ProjectionConfig,
}

// Which pipeline stages are stale after an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamChanges {
    pub geometry: bool,
    pub deform: bool,
    pub projection: bool,
}

impl ParamChanges {
    pub fn any(&self) -> bool {
        self.geometry || self.deform || self.projection
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockParams {
    // Seed of the noise field shared by every stage
    pub seed: u64,
    pub flock: FlockConfig,
    pub deform: DeformerConfig,
    pub projection: ProjectionConfig,

    // Internal state for tracking changes
    #[serde(skip)]
    previous_values: Option<ParamSnapshot>,
}

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            seed: 1,
            flock: FlockConfig::default(),
            deform: DeformerConfig::default(),
            projection: ProjectionConfig::default(),
            previous_values: None,
        }
    }
}

impl FlockParams {
    // One seed for the noise field, the sampler and the heading jitter
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.flock.shape.seed = seed;
        self.projection.seed = seed;
        self
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            seed: self.seed,
            flock: self.flock.clone(),
            deform: self.deform,
            projection: self.projection,
        }
    }

    // Compare against an earlier snapshot; a changed stage invalidates all later ones
    pub fn changes_since(&self, previous: &ParamSnapshot) -> ParamChanges {
        let geometry = self.seed != previous.seed || self.flock != previous.flock;
        let deform = geometry || self.deform != previous.deform;
        let projection = deform || self.projection != previous.projection;
        ParamChanges {
            geometry,
            deform,
            projection,
        }
    }

    // Take a snapshot of current parameter values for change detection
    pub fn take_snapshot(&mut self) {
        self.previous_values = Some(self.snapshot());
    }

    // Check which stages changed since the last snapshot
    pub fn detect_changes(&self) -> ParamChanges {
        // If we don't have previous values, nothing has changed
        match &self.previous_values {
            Some(previous) => self.changes_since(previous),
            None => ParamChanges::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        let shape = &self.flock.shape;
        if shape.count == 0 {
            return Err(ParamError::ZeroCount);
        }

        let d = &shape.dims;
        for (field, value) in [
            ("radius_x", d.radius_x),
            ("radius_y", d.radius_y),
            ("radius_z", d.radius_z),
            ("major_radius", d.major_radius),
            ("minor_radius", d.minor_radius),
            ("length", d.length),
            ("cross_section_radius", d.cross_section_radius),
        ] {
            if value <= 0.0 {
                return Err(ParamError::NonPositiveDimension { field, value });
            }
        }

        for (field, value) in [
            ("size_variance", self.flock.size_variance),
            ("bridge_fraction", self.flock.bridge_fraction),
            ("density_noise", shape.density_noise),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParamError::FractionOutOfRange { field, value });
            }
        }

        let mut frequencies = vec![("displacement", self.deform.noise.frequency)];
        if shape.density_noise > 0.0 {
            frequencies.push(("density noise", shape.density_noise_freq));
        }
        if self.deform.smooth.enabled {
            frequencies.push(("smoothing", self.deform.smooth.frequency));
        }
        if self.projection.flow.enabled {
            frequencies.push(("flow", self.projection.flow.frequency));
        }
        for (field, value) in frequencies {
            if value <= 0.0 {
                return Err(ParamError::NonPositiveFrequency { field, value });
            }
        }

        if self.deform.noise.amplitude > 0.0 && self.deform.noise.octaves == 0 {
            return Err(ParamError::ZeroOctaves);
        }

        let camera = &self.projection.camera;
        if camera.viewport_width <= 0.0 || camera.viewport_height <= 0.0 {
            return Err(ParamError::InvalidViewport {
                width: camera.viewport_width,
                height: camera.viewport_height,
            });
        }

        if self.projection.density_band.enabled && self.projection.density_band.cell_size <= 0.0 {
            return Err(ParamError::NonPositiveCellSize);
        }

        Ok(())
    }

    // Get parameter ranges for UI sliders
    pub fn count_range() -> std::ops::RangeInclusive<usize> {
        10..=20000
    }

    pub fn sub_flock_range() -> std::ops::RangeInclusive<u32> {
        1..=8
    }

    pub fn frequency_range() -> std::ops::RangeInclusive<f32> {
        0.001..=0.1
    }

    pub fn amplitude_range() -> std::ops::RangeInclusive<f32> {
        0.0..=150.0
    }

    pub fn fraction_range() -> std::ops::RangeInclusive<f32> {
        0.0..=1.0
    }

    pub fn rotation_range() -> std::ops::RangeInclusive<f32> {
        -180.0..=180.0
    }

    pub fn zoom_range() -> std::ops::RangeInclusive<f32> {
        crate::camera::MIN_ZOOM..=crate::camera::MAX_ZOOM
    }
}
