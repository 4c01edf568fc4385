/*
 * Camera Module
 *
 * This module defines the CameraConfig struct that describes how the flock
 * is viewed: a fixed-order X -> Y -> Z rotation, a zoom factor, and either an
 * orthographic or a perspective projection onto the viewport.
 * It provides the coordinate transformations from world space to camera
 * space and from camera space to screen space.
 */

use glam::{Mat3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

// Distance from the camera to the world origin in perspective mode
pub const CAMERA_DISTANCE: f32 = 300.0;

// Points at or closer than this depth are behind the camera
pub const NEAR_PLANE: f32 = 0.1;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionKind {
    Orthographic,
    Perspective,
}

// A camera-space point mapped to the screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub position: Vec2,
    pub depth: f32,
    // fov / depth in perspective mode, 1 in orthographic mode
    pub perspective_scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    // Rotation angles in degrees, applied X first, then Y, then Z
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub rotation_z: f32,
    pub zoom: f32,
    pub projection: ProjectionKind,
    pub fov: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            rotation_x: 0.0,
            rotation_y: 0.0,
            rotation_z: 0.0,
            zoom: 1.0,
            projection: ProjectionKind::Orthographic,
            fov: 400.0,
            viewport_width: 1200.0,
            viewport_height: 800.0,
        }
    }
}

impl CameraConfig {
    pub fn with_rotation(self, x: f32, y: f32, z: f32) -> Self {
        Self {
            rotation_x: x,
            rotation_y: y,
            rotation_z: z,
            ..self
        }
    }

    pub fn with_projection(self, projection: ProjectionKind) -> Self {
        Self { projection, ..self }
    }

    // Zoom is kept inside the supported range
    pub fn with_zoom(self, zoom: f32) -> Self {
        Self {
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            ..self
        }
    }

    pub fn with_viewport(self, width: f32, height: f32) -> Self {
        Self {
            viewport_width: width,
            viewport_height: height,
            ..self
        }
    }

    pub fn viewport_center(&self) -> Vec2 {
        Vec2::new(self.viewport_width * 0.5, self.viewport_height * 0.5)
    }

    // World-to-camera rotation; X is applied first
    pub fn rotation_matrix(&self) -> Mat3 {
        Mat3::from_rotation_z(self.rotation_z.to_radians())
            * Mat3::from_rotation_y(self.rotation_y.to_radians())
            * Mat3::from_rotation_x(self.rotation_x.to_radians())
    }

    // Map a camera-space point to the screen; None when behind the camera
    pub fn project(&self, p: Vec3) -> Option<ScreenPoint> {
        let center = self.viewport_center();
        match self.projection {
            ProjectionKind::Perspective => {
                let depth = p.z + CAMERA_DISTANCE;
                if depth <= NEAR_PLANE {
                    return None;
                }
                let scale = self.fov / depth;
                Some(ScreenPoint {
                    position: center + p.truncate() * scale,
                    depth,
                    perspective_scale: scale,
                })
            }
            ProjectionKind::Orthographic => Some(ScreenPoint {
                position: center + p.truncate() * self.zoom,
                depth: p.z,
                perspective_scale: 1.0,
            }),
        }
    }
}
