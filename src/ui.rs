/*
 * UI Module
 *
 * This module contains functions for creating and updating the user interface
 * using nannou_egui. It provides controls for the shape, flock, deformer and
 * camera parameters. Change detection is handled by the FlockParams struct.
 */

use nannou_egui::{egui, Egui};

use murmuration::params::ParamChanges;
use murmuration::{Axis, FillMode, FlockParams, ProjectionKind, ShapeKind};

use crate::debug::DebugInfo;

// Update the UI and report which pipeline stages the edits invalidated
pub fn update_ui(
    egui: &mut Egui,
    params: &mut FlockParams,
    debug_info: &DebugInfo,
    show_debug: &mut bool,
) -> ParamChanges {
    // Take a snapshot of current parameter values for change detection
    params.take_snapshot();
    let mut seed = params.seed;

    let ctx = egui.begin_frame();

    egui::Window::new("Flock Controls")
        .default_pos([10.0, 10.0])
        .show(&ctx, |ui| {
            ui.collapsing("Shape", |ui| {
                let shape = &mut params.flock.shape;
                egui::ComboBox::from_label("Kind")
                    .selected_text(format!("{:?}", shape.kind))
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut shape.kind, ShapeKind::Sphere, "Sphere");
                        ui.selectable_value(&mut shape.kind, ShapeKind::Ellipsoid, "Ellipsoid");
                        ui.selectable_value(&mut shape.kind, ShapeKind::Torus, "Torus");
                        ui.selectable_value(&mut shape.kind, ShapeKind::Swept, "Swept");
                    });
                ui.horizontal(|ui| {
                    ui.radio_value(&mut shape.fill, FillMode::Surface, "Surface");
                    ui.radio_value(&mut shape.fill, FillMode::Volume, "Volume");
                });
                ui.add(
                    egui::Slider::new(&mut shape.count, FlockParams::count_range()).text("Birds"),
                );
                ui.add(egui::DragValue::new(&mut seed).prefix("Seed "));
                ui.add(
                    egui::Slider::new(&mut shape.density_falloff, 0.0..=6.0)
                        .text("Density Falloff"),
                );
                ui.add(
                    egui::Slider::new(&mut shape.density_noise, FlockParams::fraction_range())
                        .text("Density Noise"),
                );
                ui.add(
                    egui::Slider::new(&mut shape.density_noise_freq, FlockParams::frequency_range())
                        .text("Density Noise Freq"),
                );
            });

            ui.collapsing("Sub-flocks", |ui| {
                let flock = &mut params.flock;
                ui.add(
                    egui::Slider::new(&mut flock.sub_flocks, FlockParams::sub_flock_range())
                        .text("Sub-flocks"),
                );
                ui.add(egui::Slider::new(&mut flock.spread, 0.0..=4.0).text("Spread"));
                ui.add(
                    egui::Slider::new(&mut flock.size_variance, FlockParams::fraction_range())
                        .text("Size Variance"),
                );
                ui.add(
                    egui::Slider::new(&mut flock.bridge_fraction, FlockParams::fraction_range())
                        .text("Bridge Fraction"),
                );
            });

            ui.collapsing("Deformers", |ui| {
                let deform = &mut params.deform;
                ui.add(
                    egui::Slider::new(&mut deform.noise.amplitude, FlockParams::amplitude_range())
                        .text("Noise Amplitude"),
                );
                ui.add(
                    egui::Slider::new(&mut deform.noise.frequency, FlockParams::frequency_range())
                        .text("Noise Frequency"),
                );
                ui.add(egui::Slider::new(&mut deform.noise.octaves, 1..=6).text("Octaves"));
                ui.checkbox(&mut deform.smooth.enabled, "Pre-smoothing");

                ui.separator();
                ui.checkbox(&mut deform.twist.enabled, "Twist");
                axis_picker(ui, "Twist Axis", &mut deform.twist.axis);
                ui.add(egui::Slider::new(&mut deform.twist.amount, -2.0..=2.0).text("Turns"));

                ui.checkbox(&mut deform.taper.enabled, "Taper");
                axis_picker(ui, "Taper Axis", &mut deform.taper.axis);
                ui.add(egui::Slider::new(&mut deform.taper.start, 0.0..=2.0).text("Start Scale"));
                ui.add(egui::Slider::new(&mut deform.taper.end, 0.0..=2.0).text("End Scale"));

                ui.checkbox(&mut deform.bend.enabled, "Bend");
                axis_picker(ui, "Bend Axis", &mut deform.bend.axis);
                ui.add(egui::Slider::new(&mut deform.bend.angle, -3.0..=3.0).text("Bend Angle"));

                ui.checkbox(&mut deform.wave.enabled, "Wave");
                axis_picker(ui, "Wave Axis", &mut deform.wave.axis);
                ui.add(
                    egui::Slider::new(&mut deform.wave.amplitude, FlockParams::amplitude_range())
                        .text("Wave Amplitude"),
                );
                ui.add(
                    egui::Slider::new(&mut deform.wave.frequency, FlockParams::frequency_range())
                        .text("Wave Frequency"),
                );
                ui.add(
                    egui::Slider::new(&mut deform.wave.phase, 0.0..=std::f32::consts::TAU)
                        .text("Phase"),
                );
            });

            ui.collapsing("Camera", |ui| {
                let projection = &mut params.projection;
                let camera = &mut projection.camera;
                ui.horizontal(|ui| {
                    let kind = &mut camera.projection;
                    ui.radio_value(kind, ProjectionKind::Orthographic, "Orthographic");
                    ui.radio_value(kind, ProjectionKind::Perspective, "Perspective");
                });
                ui.add(
                    egui::Slider::new(&mut camera.rotation_x, FlockParams::rotation_range())
                        .text("Rotate X"),
                );
                ui.add(
                    egui::Slider::new(&mut camera.rotation_y, FlockParams::rotation_range())
                        .text("Rotate Y"),
                );
                ui.add(
                    egui::Slider::new(&mut camera.rotation_z, FlockParams::rotation_range())
                        .text("Rotate Z"),
                );
                ui.add(egui::Slider::new(&mut camera.zoom, FlockParams::zoom_range()).text("Zoom"));
                ui.add(egui::Slider::new(&mut camera.fov, 100.0..=1200.0).text("FOV"));

                ui.separator();
                ui.add(
                    egui::Slider::new(&mut projection.bird_scale, 1.0..=20.0).text("Bird Scale"),
                );
                ui.checkbox(&mut projection.flow.enabled, "Curl Flow Headings");
                ui.add(
                    egui::Slider::new(&mut projection.heading_jitter, FlockParams::fraction_range())
                        .text("Heading Jitter"),
                );
                ui.checkbox(&mut projection.density_band.enabled, "Dark Bands");
                ui.add(
                    egui::Slider::new(&mut projection.density_band.cell_size, 4.0..=80.0)
                        .text("Band Cell Size"),
                );
            });

            ui.separator();
            ui.checkbox(show_debug, "Show Debug Info");
            if let Some(error) = &debug_info.param_error {
                ui.colored_label(egui::Color32::RED, error);
            }
        });

    // One seed drives the noise field, the sampler and the jitter
    if seed != params.seed {
        *params = std::mem::take(params).with_seed(seed);
    }

    params.detect_changes()
}

fn axis_picker(ui: &mut egui::Ui, label: &str, axis: &mut Axis) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.radio_value(axis, Axis::X, "X");
        ui.radio_value(axis, Axis::Y, "Y");
        ui.radio_value(axis, Axis::Z, "Z");
    });
}

// Draw debug information on the screen
pub fn draw_debug_info(
    draw: &nannou::Draw,
    debug_info: &DebugInfo,
    window_rect: nannou::geom::Rect,
) {
    // Create a background panel in the top-right corner
    let margin = 20.0;
    let line_height = 20.0;
    let panel_width = 220.0;
    let panel_height = line_height * 5.0 + margin;
    let panel_x = window_rect.right() - panel_width / 2.0;
    let panel_y = window_rect.top() - panel_height / 2.0;

    draw.rect()
        .x_y(panel_x, panel_y)
        .w_h(panel_width, panel_height)
        .color(nannou::color::rgba(0.0, 0.0, 0.0, 0.7));

    let text_x = window_rect.right() - panel_width + margin;
    let text_y = window_rect.top() - margin;

    let debug_texts = [
        format!("FPS: {:.1}", debug_info.fps),
        format!("Frame time: {:.2} ms", debug_info.frame_time.as_secs_f64() * 1000.0),
        format!("Points: {}", debug_info.point_count),
        format!("Primitives: {}", debug_info.primitive_count),
        format!("Last rebuild: {:?}", debug_info.last_regenerated),
    ];

    for (i, text) in debug_texts.iter().enumerate() {
        let y = text_y - (i as f32 * line_height);

        // Position the text with a fixed offset from the left edge
        draw.text(text)
            .x_y(text_x + 80.0, y)
            .color(nannou::color::WHITE)
            .font_size(14);
    }
}
