//! Target directions for one capture session.
//!
//! Twenty points on a sphere: an equator ring of 8, an upper and a lower ring
//! of 5 at half height, and the two poles. Rings are built around the current
//! world-up direction so they stay parallel to the floor however the phone is held.

use crate::{Target, TargetId};
use glam::Vec3;
use photosphere_config::LayoutConfig;
use std::f32::consts::TAU;

pub const EQUATOR_COUNT: usize = 8;
pub const BAND_COUNT: usize = 5;
pub const POLE_COUNT: usize = 2;
pub const TARGET_COUNT: usize = EQUATOR_COUNT + 2 * BAND_COUNT + POLE_COUNT;

/// Band rings sit at ±radius·BAND_HEIGHT_RATIO along world up.
const BAND_HEIGHT_RATIO: f32 = 0.5;
/// Switch helper axis when the normal is this close to Z.
const HELPER_SWITCH: f32 = 0.9;

/// Orthonormal basis `{u, v}` spanning the plane perpendicular to `normal`.
pub fn ring_basis(normal: Vec3) -> Option<(Vec3, Vec3)> {
    let n = normal.try_normalize()?;
    let helper = if n.z.abs() < HELPER_SWITCH { Vec3::Z } else { Vec3::Y };
    let u = n.cross(helper).try_normalize()?;
    let v = n.cross(u).try_normalize()?;
    Some((u, v))
}

/// `count` evenly spaced points on the circle around `center` perpendicular to `normal`.
///
/// Empty when `normal` is degenerate or `count` is zero.
pub fn generate_ring(normal: Vec3, center: Vec3, radius: f32, count: usize) -> Vec<Vec3> {
    let Some((u, v)) = ring_basis(normal) else {
        return Vec::new();
    };
    (0..count)
        .map(|i| {
            let t = TAU * i as f32 / count as f32;
            center + (u * t.cos() + v * t.sin()) * radius
        })
        .collect()
}

/// Places the fixed 20-point target set on a sphere.
#[derive(Debug, Clone)]
pub struct SphereTargetLayout {
    center: Vec3,
    radius: f32,
}

impl SphereTargetLayout {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            center: config.center,
            radius: config.radius,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Target positions in layout order for the given world-up direction.
    /// A degenerate `world_up` falls back to +Z.
    pub fn positions(&self, world_up: Vec3) -> Vec<Vec3> {
        let up = world_up.try_normalize().unwrap_or(Vec3::Z);
        let r = self.radius;
        let h = r * BAND_HEIGHT_RATIO;
        let mid_radius = (r * r - h * h).sqrt();

        let mut points = Vec::with_capacity(TARGET_COUNT);
        points.extend(generate_ring(up, self.center, r, EQUATOR_COUNT));
        points.extend(generate_ring(up, self.center + up * h, mid_radius, BAND_COUNT));
        points.extend(generate_ring(up, self.center - up * h, mid_radius, BAND_COUNT));
        points.push(self.center + up * r);
        points.push(self.center - up * r);
        points
    }

    /// Fresh, uncaptured targets for a new session.
    pub fn build_session_targets(&self, world_up: Vec3) -> Vec<Target> {
        self.positions(world_up)
            .into_iter()
            .enumerate()
            .map(|(i, position)| Target {
                id: TargetId(i),
                position,
                captured: false,
            })
            .collect()
    }

    /// Ring polylines (equator, upper, lower) for drawing guide circles.
    pub fn ring_outlines(&self, world_up: Vec3) -> [Vec<Vec3>; 3] {
        let p = self.positions(world_up);
        [
            p[..EQUATOR_COUNT].to_vec(),
            p[EQUATOR_COUNT..EQUATOR_COUNT + BAND_COUNT].to_vec(),
            p[EQUATOR_COUNT + BAND_COUNT..EQUATOR_COUNT + 2 * BAND_COUNT].to_vec(),
        ]
    }
}

impl Default for SphereTargetLayout {
    fn default() -> Self {
        Self::new(&LayoutConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_normals() -> Vec<Vec3> {
        let mut normals = vec![
            Vec3::X,
            Vec3::Y,
            Vec3::Z,
            Vec3::NEG_Z,
            Vec3::new(0.0, 0.3, 0.95),
            Vec3::new(0.0, 0.44, 0.9),
            Vec3::new(1.0, 1.0, 1.0),
        ];
        // A coarse sweep over the sphere.
        for i in 0..12 {
            for j in 0..6 {
                let az = TAU * i as f32 / 12.0;
                let el = -1.4 + 2.8 * j as f32 / 5.0;
                normals.push(Vec3::new(el.cos() * az.cos(), el.cos() * az.sin(), el.sin()));
            }
        }
        normals
    }

    #[test]
    fn basis_is_orthonormal_to_normal() {
        for normal in sample_normals() {
            let n = normal.normalize();
            let (u, v) = ring_basis(normal).unwrap();
            assert!(u.dot(n).abs() < 1e-5, "u·n for {normal:?}");
            assert!(v.dot(n).abs() < 1e-5, "v·n for {normal:?}");
            assert!(u.dot(v).abs() < 1e-5, "u·v for {normal:?}");
            assert!((u.length() - 1.0).abs() < 1e-5);
            assert!((v.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn degenerate_normal_has_no_basis() {
        assert!(ring_basis(Vec3::ZERO).is_none());
        assert!(generate_ring(Vec3::ZERO, Vec3::ZERO, 1.0, 8).is_empty());
    }

    #[test]
    fn ring_points_are_evenly_spaced() {
        let center = Vec3::new(0.5, -1.0, 2.0);
        for count in [3, 5, 8, 12] {
            let ring = generate_ring(Vec3::new(0.2, 0.7, 0.1), center, 2.0, count);
            assert_eq!(ring.len(), count);

            let step = TAU / count as f32;
            for i in 0..count {
                let a = ring[i] - center;
                let b = ring[(i + 1) % count] - center;
                assert!((a.length() - 2.0).abs() < 1e-5);
                assert!((a.angle_between(b) - step).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn flat_ring_of_four_is_square_in_xy() {
        let ring = generate_ring(Vec3::Z, Vec3::ZERO, 1.0, 4);
        assert_eq!(ring.len(), 4);
        for (i, p) in ring.iter().enumerate() {
            assert!(p.z.abs() < 1e-6);
            let next = ring[(i + 1) % 4];
            assert!((p.angle_between(next) - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        }
    }

    #[test]
    fn twenty_targets_on_sphere_for_any_up() {
        let config = LayoutConfig {
            radius: 1.5,
            center: Vec3::new(0.1, 0.2, -0.3),
        };
        let layout = SphereTargetLayout::new(&config);
        for up in sample_normals().into_iter().chain([Vec3::ZERO]) {
            let targets = layout.build_session_targets(up);
            assert_eq!(targets.len(), TARGET_COUNT);
            assert_eq!(TARGET_COUNT, 20);
            for (i, t) in targets.iter().enumerate() {
                assert_eq!(t.id, TargetId(i));
                assert!(!t.captured);
                assert!(((t.position - config.center).length() - 1.5).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn poles_follow_world_up() {
        let layout = SphereTargetLayout::default();
        let p = layout.positions(Vec3::Y);
        assert!((p[TARGET_COUNT - 2] - Vec3::Y).length() < 1e-6);
        assert!((p[TARGET_COUNT - 1] + Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn band_rings_sit_at_half_height() {
        let layout = SphereTargetLayout::default();
        let p = layout.positions(Vec3::Z);
        for q in &p[EQUATOR_COUNT..EQUATOR_COUNT + BAND_COUNT] {
            assert!((q.z - 0.5).abs() < 1e-6);
        }
        for q in &p[EQUATOR_COUNT + BAND_COUNT..EQUATOR_COUNT + 2 * BAND_COUNT] {
            assert!((q.z + 0.5).abs() < 1e-6);
        }
    }
}
