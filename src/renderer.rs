/*
 * Renderer Module
 *
 * This module handles the rendering of the projected flock.
 * Each primitive is drawn as a small chevron whose wing spread follows its
 * pose, rotated to its heading and faded by its opacity. Primitives are drawn
 * in the order the projection engine sorted them.
 */

use nannou::prelude::*;

use murmuration::ProjectedPrimitive;

use crate::app::Model;
use crate::ui;

// Wing spread of the chevron for each pose, in units of the bird scale
const POSE_SPREAD: [f32; 4] = [0.2, 0.45, 0.7, 0.95];

// Render the model
pub fn view(app: &App, model: &Model, frame: Frame) {
    // Begin drawing
    let draw = app.draw();

    // Clear the background
    draw.background().color(rgb(0.93, 0.9, 0.84));

    // Get the window rectangle
    let window_rect = app.window_rect();

    for primitive in model.scene.primitives() {
        draw_primitive(&draw, primitive, window_rect);
    }

    // Draw debug info
    if model.show_debug {
        ui::draw_debug_info(&draw, &model.debug_info, window_rect);
    }

    // Finish drawing
    draw.to_frame(app, &frame).unwrap();

    // Draw the egui UI
    model.egui.draw_to_frame(&frame).unwrap();
}

fn draw_primitive(draw: &Draw, primitive: &ProjectedPrimitive, window_rect: Rect) {
    // Screen space has its origin top-left with y pointing down
    let center = pt2(
        window_rect.left() + primitive.screen_x,
        window_rect.top() - primitive.screen_y,
    );
    let size = primitive.scale;
    let spread = POSE_SPREAD[(primitive.pose_index as usize).min(POSE_SPREAD.len() - 1)];

    // Nose, right wingtip, tail notch, left wingtip
    let points = [
        pt2(1.0, 0.0),
        pt2(-0.6, -spread),
        pt2(-0.2, 0.0),
        pt2(-0.6, spread),
    ]
    .map(|p| p * size);

    // Dense regions read darker
    let shade = 0.15 * (1.0 - 0.6 * primitive.local_density);
    draw.polygon()
        .color(rgba(shade, shade, shade, primitive.opacity))
        .points(points.iter().cloned())
        .xy(center)
        .rotate(-primitive.heading);
}
