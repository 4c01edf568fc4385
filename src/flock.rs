/*
 * Flock Composer Module
 *
 * This module assembles a full flock cloud out of one or more sub-flock
 * clusters. Each cluster is an independent Shape Sampler run with its own
 * seed, size and center; consecutive cluster centers are then joined by
 * thin tendrils of bridge points.
 */

use std::f32::consts::TAU;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::noise::NoiseField;
use crate::shape::{orthonormal_frame, sample, ShapeConfig};
use crate::{Point3, PointCloud};

// Seed distance between clusters
pub const CLUSTER_SEED_STRIDE: u64 = 1000;

// Bridge tendril thickness relative to the shape's bounding radius
const BRIDGE_RADIUS_FACTOR: f32 = 0.1;

// Seed stream used for the layout draws, kept apart from cluster seeds
const LAYOUT_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub shape: ShapeConfig,
    pub sub_flocks: u32,
    pub spread: f32,
    pub size_variance: f32,
    pub bridge_fraction: f32,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            shape: ShapeConfig::default(),
            sub_flocks: 1,
            spread: 1.5,
            size_variance: 0.4,
            bridge_fraction: 0.08,
        }
    }
}

impl FlockConfig {
    pub fn with_sub_flocks(self, sub_flocks: u32) -> Self {
        Self { sub_flocks, ..self }
    }

    pub fn with_shape(self, shape: ShapeConfig) -> Self {
        Self { shape, ..self }
    }

    pub fn with_bridge_fraction(self, bridge_fraction: f32) -> Self {
        Self {
            bridge_fraction,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterInfo {
    pub center: Vec3,
    pub count: usize,
    pub scale: f32,
    pub seed: u64,
}

// A composed flock: clusters first, bridge points appended at the end
#[derive(Debug, Clone, PartialEq)]
pub struct FlockLayout {
    pub points: PointCloud,
    pub clusters: Vec<ClusterInfo>,
    pub bridge_count: usize,
}

impl FlockLayout {
    pub fn cluster_points(&self) -> &[Point3] {
        &self.points[..self.points.len() - self.bridge_count]
    }

    pub fn bridge_points(&self) -> &[Point3] {
        &self.points[self.points.len() - self.bridge_count..]
    }
}

pub fn compose(config: &FlockConfig, noise: &NoiseField) -> PointCloud {
    compose_layout(config, noise).points
}

pub fn compose_layout(config: &FlockConfig, noise: &NoiseField) -> FlockLayout {
    let shape = &config.shape;

    // A single flock is just the shape itself
    if config.sub_flocks <= 1 {
        let points = sample(shape, noise);
        return FlockLayout {
            clusters: vec![ClusterInfo {
                center: Vec3::ZERO,
                count: points.len(),
                scale: 1.0,
                seed: shape.seed,
            }],
            points,
            bridge_count: 0,
        };
    }

    let n = config.sub_flocks as usize;
    let max_radius = shape.max_radius();
    let size_var = config.size_variance;
    let mut rng = ChaCha8Rng::seed_from_u64(shape.seed ^ LAYOUT_SEED_SALT);

    let bridge_budget = (shape.count as f32 * config.bridge_fraction).floor() as usize;
    let flock_budget = shape.count.saturating_sub(bridge_budget);

    // Cluster centers inside a cube around the origin
    let half_width = max_radius * config.spread;
    let centers: Vec<Vec3> = (0..n)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(-1.0..=1.0),
            ) * half_width
        })
        .collect();

    // Relative cluster weights, the first cluster dominating
    let weights: Vec<f32> = (0..n)
        .map(|i| {
            if i == 0 {
                1.0
            } else {
                0.3 + (1.0 - size_var) * 0.4 + rng.gen::<f32>() * size_var * 0.3
            }
        })
        .collect();
    let weight_sum: f32 = weights.iter().sum();

    let mut points = Vec::with_capacity(shape.count);
    let mut clusters = Vec::with_capacity(n);

    for (index, (&center, &weight)) in centers.iter().zip(&weights).enumerate() {
        let count = (flock_budget as f32 * weight / weight_sum).round() as usize;
        let scale = 1.0 - size_var * rng.gen::<f32>() * 0.5;
        let seed = shape.seed.wrapping_add(index as u64 * CLUSTER_SEED_STRIDE);

        let cluster_shape = shape.scaled(scale).with_count(count).with_seed(seed);
        let cluster_points = sample(&cluster_shape, noise);

        clusters.push(ClusterInfo {
            center,
            count: cluster_points.len(),
            scale,
            seed,
        });
        points.extend(cluster_points.into_iter().map(|p| p + center));
    }

    let bridges = bridge_points(&centers, bridge_budget, max_radius, &mut rng);
    let bridge_count = bridges.len();
    points.extend(bridges);

    debug!(
        clusters = n,
        flock_budget,
        bridge_count,
        total = points.len(),
        "composed sub-flock layout"
    );

    FlockLayout {
        points,
        clusters,
        bridge_count,
    }
}

// Tendril points along the straight paths joining consecutive centers
fn bridge_points<R: Rng>(
    centers: &[Vec3],
    budget: usize,
    max_radius: f32,
    rng: &mut R,
) -> PointCloud {
    let n = centers.len();
    let mut paths: Vec<(Vec3, Vec3)> = centers.windows(2).map(|w| (w[0], w[1])).collect();
    if n >= 3 {
        paths.push((centers[n - 1], centers[0]));
    }
    if paths.is_empty() || budget == 0 {
        return Vec::new();
    }

    let per_path = budget / paths.len();
    let remainder = budget % paths.len();
    let radius = max_radius * BRIDGE_RADIUS_FACTOR;

    let mut points = Vec::with_capacity(budget);
    for (index, &(start, end)) in paths.iter().enumerate() {
        let (normal, binormal) = orthonormal_frame(end - start);
        let on_path = per_path + usize::from(index < remainder);

        for _ in 0..on_path {
            let t: f32 = rng.gen();
            let angle = rng.gen_range(0.0..TAU);
            let r = radius * rng.gen::<f32>().sqrt();
            let offset = (normal * angle.cos() + binormal * angle.sin()) * r;
            points.push(start.lerp(end, t) + offset);
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeKind;

    fn flock(sub_flocks: u32, count: usize, bridge_fraction: f32) -> FlockConfig {
        FlockConfig::default()
            .with_shape(ShapeConfig::default().with_count(count).with_seed(17))
            .with_sub_flocks(sub_flocks)
            .with_bridge_fraction(bridge_fraction)
    }

    #[test]
    fn single_flock_delegates_to_the_sampler() {
        let noise = NoiseField::new(1);
        let config = flock(1, 400, 0.5);
        assert_eq!(compose(&config, &noise), sample(&config.shape, &noise));
    }

    #[test]
    fn three_clusters_share_the_budget() {
        let noise = NoiseField::new(1);
        let layout = compose_layout(&flock(3, 900, 0.1), &noise);

        assert_eq!(layout.clusters.len(), 3);
        assert_eq!(layout.bridge_count, 90);
        let cluster_sum: usize = layout.clusters.iter().map(|c| c.count).sum();
        assert_eq!(layout.cluster_points().len(), cluster_sum);
        assert!((cluster_sum as i64 - 810).abs() <= 2, "cluster sum {cluster_sum}");
        assert!((layout.points.len() as i64 - 900).abs() <= 2);
    }

    #[test]
    fn clusters_get_distinct_seeds_and_shrink() {
        let noise = NoiseField::new(1);
        let layout = compose_layout(&flock(4, 800, 0.0), &noise);
        let seeds: Vec<u64> = layout.clusters.iter().map(|c| c.seed).collect();
        assert_eq!(seeds, vec![17, 1017, 2017, 3017]);
        for cluster in &layout.clusters {
            assert!(cluster.scale <= 1.0 && cluster.scale >= 0.5);
        }
        assert_eq!(layout.bridge_count, 0);
    }

    #[test]
    fn centers_stay_inside_the_spread_cube() {
        let noise = NoiseField::new(1);
        let config = flock(5, 500, 0.1);
        let half_width = config.shape.max_radius() * config.spread;
        let layout = compose_layout(&config, &noise);
        for cluster in &layout.clusters {
            assert!(cluster.center.abs().max_element() <= half_width + 1e-3);
        }
    }

    #[test]
    fn bridge_points_hug_their_paths() {
        let noise = NoiseField::new(1);
        let config = FlockConfig {
            shape: ShapeConfig::default()
                .with_kind(ShapeKind::Sphere)
                .with_count(600)
                .with_seed(3),
            ..flock(2, 600, 0.2)
        };
        let layout = compose_layout(&config, &noise);
        let (a, b) = (layout.clusters[0].center, layout.clusters[1].center);
        let limit = config.shape.max_radius() * BRIDGE_RADIUS_FACTOR + 1e-2;
        let axis = (b - a).normalize();

        assert_eq!(layout.bridge_points().len(), 120);
        for p in layout.bridge_points() {
            let along = (*p - a).dot(axis);
            let perpendicular = ((*p - a) - axis * along).length();
            assert!(perpendicular <= limit, "offset {perpendicular}");
            assert!(along >= -limit && along <= (b - a).length() + limit);
        }
    }

    // Distance from p to the segment a-b
    fn segment_distance(p: Vec3, a: Vec3, b: Vec3) -> f32 {
        let ab = b - a;
        let t = ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
        (p - a.lerp(b, t)).length()
    }

    #[test]
    fn three_clusters_close_the_bridge_loop() {
        let noise = NoiseField::new(1);
        let config = flock(3, 900, 0.1);
        let layout = compose_layout(&config, &noise);
        let limit = config.shape.max_radius() * BRIDGE_RADIUS_FACTOR + 1e-2;

        let c: Vec<Vec3> = layout.clusters.iter().map(|cluster| cluster.center).collect();
        let segments = [(c[0], c[1]), (c[1], c[2]), (c[2], c[0])];

        // Bridge points are laid out path by path, 30 on each
        let bridges = layout.bridge_points();
        assert_eq!(bridges.len(), 90);
        for (chunk, &(a, b)) in bridges.chunks(30).zip(&segments) {
            for &p in chunk {
                let d = segment_distance(p, a, b);
                assert!(d <= limit, "bridge point {d} away from its path");
            }
        }

        // Every path, the closing one included, gets a share
        let mut nearest = [0usize; 3];
        for &p in bridges {
            let (index, _) = segments
                .iter()
                .map(|&(a, b)| segment_distance(p, a, b))
                .enumerate()
                .fold((0, f32::INFINITY), |best, (i, d)| if d < best.1 { (i, d) } else { best });
            nearest[index] += 1;
        }
        assert!(nearest.iter().all(|&n| n >= 10), "per-path counts {nearest:?}");
    }

    #[test]
    fn composition_is_deterministic() {
        let noise = NoiseField::new(8);
        let config = flock(3, 700, 0.15);
        assert_eq!(compose_layout(&config, &noise), compose_layout(&config, &noise));
    }
}
