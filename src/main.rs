/*
 * Murmuration Viewer
 *
 * A small nannou window that shows the generated flock silhouette.
 * The egui panel edits the generation parameters; after each edit only the
 * pipeline stages invalidated by the change are re-run.
 *
 * Set RUST_LOG=murmuration=debug to see the pipeline's log output.
 */

use tracing_subscriber::EnvFilter;

mod app;
mod debug;
mod renderer;
mod ui;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    nannou::app(app::model).update(app::update).run();
}
