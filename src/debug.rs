/*
 * Debug Information Module
 *
 * This module defines the DebugInfo struct that contains performance metrics
 * and pipeline state to be displayed in the UI.
 *
 * Includes metrics for:
 * - FPS (frames per second)
 * - Frame time
 * - Number of generated points and projected primitives
 * - The stage the last parameter edit re-ran
 * - The current parameter validation error, if any
 */

use std::time::Duration;

use murmuration::Regenerated;

pub struct DebugInfo {
    pub fps: f32,
    pub frame_time: Duration,
    pub point_count: usize,
    pub primitive_count: usize,
    pub last_regenerated: Option<Regenerated>,
    pub param_error: Option<String>,
}

impl Default for DebugInfo {
    fn default() -> Self {
        Self {
            fps: 0.0,
            frame_time: Duration::ZERO,
            point_count: 0,
            primitive_count: 0,
            last_regenerated: None,
            param_error: None,
        }
    }
}
