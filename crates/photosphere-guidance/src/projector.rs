//! Device, world and screen coordinate transforms for the live preview.

use glam::{Vec2, Vec3};
use photosphere_config::GuidanceConfig;
use photosphere_sensor::types::Attitude;

/// Points closer than this to the image plane (or behind it) are not projected.
pub const NEAR_PLANE: f32 = 0.1;

/// device -> world: `attitude · p`.
pub fn device_to_world(p: Vec3, attitude: &Attitude) -> Vec3 {
    attitude.rotate(p)
}

/// world -> camera: `attitudeᵀ · p`. The camera sits at the origin, only rotated.
pub fn world_to_camera(p: Vec3, attitude: &Attitude) -> Vec3 {
    attitude.unrotate(p)
}

/// Pinhole projection of a camera-space point. The camera looks down its own −Z.
///
/// `None` means the point is behind or too close to the camera this frame.
pub fn project_to_screen(p: Vec3, screen_width: f32, screen_height: f32, focal: f32) -> Option<Vec2> {
    let depth = -p.z;
    if depth <= NEAR_PLANE {
        return None;
    }
    Some(Vec2::new(
        screen_width / 2.0 + (p.x / depth) * focal,
        screen_height / 2.0 - (p.y / depth) * focal,
    ))
}

/// Screen geometry for projecting world points into the live preview.
#[derive(Debug, Clone, Copy)]
pub struct ViewProjector {
    /// Screen width in pixels.
    pub width: f32,
    /// Screen height in pixels.
    pub height: f32,
    /// Focal length in pixels.
    pub focal: f32,
}

impl ViewProjector {
    pub fn new(width: f32, height: f32, focal_scale: f32) -> Self {
        Self {
            width,
            height,
            focal: width * focal_scale,
        }
    }

    pub fn from_config(config: &GuidanceConfig) -> Self {
        Self::new(config.screen_width, config.screen_height, config.focal_scale)
    }

    /// Screen center, where the look direction lands.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Project a world point seen from a camera with the given attitude.
    pub fn project_world(&self, p: Vec3, attitude: &Attitude) -> Option<Vec2> {
        project_to_screen(world_to_camera(p, attitude), self.width, self.height, self.focal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn attitudes() -> Vec<Attitude> {
        vec![
            Attitude::IDENTITY,
            Attitude::from_quat(Quat::from_rotation_x(0.7)),
            Attitude::from_quat(Quat::from_rotation_z(-2.1)),
            Attitude::from_quat(Quat::from_euler(glam::EulerRot::YXZ, 1.2, -0.4, 2.9)),
        ]
    }

    #[test]
    fn world_to_camera_inverts_device_to_world() {
        let points = [
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::NEG_Z,
            Vec3::new(-0.3, 0.0, 5.5),
        ];
        for a in attitudes() {
            for p in points {
                let back = world_to_camera(device_to_world(p, &a), &a);
                assert!((back - p).length() < 1e-5, "{p:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn point_ahead_projects_to_center() {
        let s = project_to_screen(Vec3::new(0.0, 0.0, -2.0), 1080.0, 1920.0, 864.0).unwrap();
        assert!((s.x - 540.0).abs() < 1e-4);
        assert!((s.y - 960.0).abs() < 1e-4);
    }

    #[test]
    fn up_and_right_map_to_screen_axes() {
        let s = project_to_screen(Vec3::new(0.5, 0.5, -1.0), 100.0, 100.0, 100.0).unwrap();
        assert!((s.x - 100.0).abs() < 1e-4);
        // Screen y grows downward.
        assert!(s.y.abs() < 1e-4);
    }

    #[test]
    fn points_behind_or_near_are_not_projected() {
        assert!(project_to_screen(Vec3::new(0.0, 0.0, 1.0), 100.0, 100.0, 80.0).is_none());
        assert!(project_to_screen(Vec3::new(0.0, 0.0, -0.1), 100.0, 100.0, 80.0).is_none());
        assert!(project_to_screen(Vec3::new(0.0, 0.0, -0.11), 100.0, 100.0, 80.0).is_some());
    }

    #[test]
    fn view_projector_follows_attitude() {
        let view = ViewProjector::new(1000.0, 2000.0, 0.8);
        assert!((view.focal - 800.0).abs() < 1e-4);

        // Turn the device to look along +X; a point on +X must land at the center.
        let a = Attitude::from_quat(Quat::from_rotation_arc(Vec3::NEG_Z, Vec3::X));
        let s = view.project_world(Vec3::X * 3.0, &a).unwrap();
        assert!((s - view.center()).length() < 1e-3);
        assert!(view.project_world(Vec3::NEG_X, &a).is_none());
    }
}
