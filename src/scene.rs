/*
 * Scene Module
 *
 * This module runs the full generation pipeline:
 * sample -> compose -> deform -> project.
 *
 * A Scene keeps the intermediate clouds of its last run so that a parameter
 * edit only re-runs the stages it invalidates. Camera moves re-project the
 * cached deformed cloud; deformer edits re-deform the cached raw cloud.
 */

use tracing::debug;

use crate::deform::deform;
use crate::flock::compose;
use crate::noise::NoiseField;
use crate::params::{FlockParams, ParamSnapshot};
use crate::projection::{project, ProjectedPrimitive};
use crate::PointCloud;

// The earliest stage an update had to re-run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regenerated {
    Nothing,
    Projection,
    Deform,
    Geometry,
}

pub struct Scene {
    noise: NoiseField,
    snapshot: ParamSnapshot,
    raw: PointCloud,
    deformed: PointCloud,
    primitives: Vec<ProjectedPrimitive>,
}

impl Scene {
    pub fn new(params: &FlockParams) -> Self {
        let noise = NoiseField::new(params.seed);
        let raw = compose(&params.flock, &noise);
        let deformed = deform(&raw, &params.deform, &noise);
        let primitives = project(&deformed, &params.projection, &noise);

        Self {
            noise,
            snapshot: params.snapshot(),
            raw,
            deformed,
            primitives,
        }
    }

    pub fn update(&mut self, params: &FlockParams) -> Regenerated {
        let changes = params.changes_since(&self.snapshot);
        if !changes.any() {
            return Regenerated::Nothing;
        }

        let regenerated = if changes.geometry {
            // Reseed so the run is reproducible from the params alone
            self.noise.reseed(params.seed);
            self.raw = compose(&params.flock, &self.noise);
            Regenerated::Geometry
        } else if changes.deform {
            Regenerated::Deform
        } else {
            Regenerated::Projection
        };

        if changes.deform {
            self.deformed = deform(&self.raw, &params.deform, &self.noise);
        }
        self.primitives = project(&self.deformed, &params.projection, &self.noise);
        self.snapshot = params.snapshot();

        debug!(
            ?regenerated,
            seed = self.noise.seed(),
            points = self.raw.len(),
            "scene updated"
        );
        regenerated
    }

    // Cloud as composed, before any deformer
    pub fn raw_cloud(&self) -> &PointCloud {
        &self.raw
    }

    pub fn cloud(&self) -> &PointCloud {
        &self.deformed
    }

    pub fn primitives(&self) -> &[ProjectedPrimitive] {
        &self.primitives
    }
}

// One-shot run of the whole pipeline
pub fn generate(params: &FlockParams) -> Vec<ProjectedPrimitive> {
    Scene::new(params).primitives
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> FlockParams {
        let mut params = FlockParams::default().with_seed(5);
        params.flock.shape.count = 400;
        params
    }

    #[test]
    fn unchanged_params_do_nothing() {
        let params = small();
        let mut scene = Scene::new(&params);
        assert_eq!(scene.update(&params), Regenerated::Nothing);
    }

    #[test]
    fn camera_edit_reprojects_only() {
        let mut params = small();
        let mut scene = Scene::new(&params);
        let cloud = scene.cloud().clone();

        params.projection.camera.rotation_y = 40.0;
        assert_eq!(scene.update(&params), Regenerated::Projection);
        assert_eq!(scene.cloud(), &cloud);
        assert_eq!(scene.primitives(), generate(&params).as_slice());
    }

    #[test]
    fn deform_edit_keeps_the_raw_cloud() {
        let mut params = small();
        let mut scene = Scene::new(&params);
        let raw = scene.raw_cloud().clone();

        params.deform.wave.enabled = true;
        assert_eq!(scene.update(&params), Regenerated::Deform);
        assert_eq!(scene.raw_cloud(), &raw);
        assert_eq!(scene.primitives(), generate(&params).as_slice());
    }

    #[test]
    fn seed_edit_regenerates_geometry() {
        let params = small();
        let mut scene = Scene::new(&params);
        let reseeded = params.clone().with_seed(6);

        assert_eq!(scene.update(&reseeded), Regenerated::Geometry);
        assert_eq!(scene.noise.seed(), 6);
        assert_eq!(scene.primitives(), generate(&reseeded).as_slice());
        assert_ne!(scene.primitives(), generate(&params).as_slice());
    }
}
