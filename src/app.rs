/*
 * Application Module
 *
 * This module defines the viewer's model and its update step.
 * Every frame the UI may edit the parameters; edits are validated and then
 * handed to the Scene, which re-runs only the stale pipeline stages.
 */

use nannou::prelude::*;
use nannou_egui::Egui;
use tracing::warn;

use murmuration::{FlockParams, Regenerated, Scene};

use crate::debug::DebugInfo;
use crate::renderer;
use crate::ui;

// Main model for the application
pub struct Model {
    pub params: FlockParams,
    pub scene: Scene,
    pub egui: Egui,
    pub debug_info: DebugInfo,
    pub show_debug: bool,
}

// Initialize the model
pub fn model(app: &App) -> Model {
    let window_id = app
        .new_window()
        .title("Murmuration")
        .size(1200, 800)
        .view(renderer::view)
        .raw_event(raw_window_event)
        .build()
        .expect("Failed to create the viewer window");

    let window = app.window(window_id).expect("Viewer window closed during setup");
    let egui = Egui::from_window(&window);

    // Start from the defaults, sized to the window
    let mut params = FlockParams::default();
    let rect = window.rect();
    params.projection.camera = params.projection.camera.with_viewport(rect.w(), rect.h());

    let scene = Scene::new(&params);
    let mut debug_info = DebugInfo::default();
    debug_info.point_count = scene.cloud().len();
    debug_info.primitive_count = scene.primitives().len();

    Model {
        params,
        scene,
        egui,
        debug_info,
        show_debug: false,
    }
}

// Update the model
pub fn update(app: &App, model: &mut Model, update: Update) {
    model.debug_info.fps = app.fps();
    model.debug_info.frame_time = update.since_last;

    // Keep the projection viewport in sync with the window
    let rect = app.window_rect();
    let camera = model.params.projection.camera;
    if camera.viewport_width != rect.w() || camera.viewport_height != rect.h() {
        model.params.projection.camera = camera.with_viewport(rect.w(), rect.h());
    }

    let changes = ui::update_ui(
        &mut model.egui,
        &mut model.params,
        &model.debug_info,
        &mut model.show_debug,
    );
    let unchanged = !changes.any() && camera == model.params.projection.camera;
    if unchanged && model.debug_info.param_error.is_none() {
        return;
    }

    match model.params.validate() {
        Ok(()) => {
            model.debug_info.param_error = None;
            let regenerated = model.scene.update(&model.params);
            if regenerated != Regenerated::Nothing {
                model.debug_info.last_regenerated = Some(regenerated);
                model.debug_info.point_count = model.scene.cloud().len();
                model.debug_info.primitive_count = model.scene.primitives().len();
            }
        }
        Err(err) => {
            let message = err.to_string();
            if model.debug_info.param_error.as_deref() != Some(message.as_str()) {
                warn!(%err, "parameters rejected, keeping the previous scene");
            }
            model.debug_info.param_error = Some(message);
        }
    }
}

// Pass raw window events to egui
pub fn raw_window_event(_app: &App, model: &mut Model, event: &nannou::winit::event::WindowEvent) {
    model.egui.handle_raw_event(event);
}
