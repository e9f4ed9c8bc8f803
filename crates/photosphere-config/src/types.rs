use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Sensor smoothing.
    pub filter: FilterConfig,
    /// Target sphere placement.
    pub layout: LayoutConfig,
    /// Alignment and screen-space guidance.
    pub guidance: GuidanceConfig,
    /// Simulated camera used when no platform camera is attached.
    pub camera: CameraConfig,
    /// Where photos and the project list live.
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Exponential smoothing factor for the rotation matrix. Higher = more responsive, more jitter.
    pub rotation_alpha: f32,
    /// Smoothing factor for the gravity direction. Kept lower than the rotation
    /// factor because accelerometer readings include hand motion.
    pub gravity_alpha: f32,
    /// Re-orthonormalize the blended rotation so its transpose stays its inverse.
    pub reorthonormalize: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            rotation_alpha: 0.15,
            gravity_alpha: 0.1,
            reorthonormalize: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Sphere radius. Targets sit on this sphere.
    pub radius: f32,
    /// Sphere center in world space (the camera sits at the origin).
    #[serde(with = "vec3_serde")]
    pub center: Vec3,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            center: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Device-local axis the camera looks along.
    #[serde(with = "vec3_serde")]
    pub forward_axis: Vec3,
    /// Minimum highlight (0..1) before a capture is requested.
    /// Highlight starts rising at alignment 0.9 (~25 degrees) and saturates at 1.0.
    pub capture_threshold: f32,
    /// Re-place targets from the current gravity estimate every frame.
    pub track_gravity: bool,
    /// Focal length as a fraction of screen width.
    pub focal_scale: f32,
    /// Screen size in pixels used for the overlay model.
    pub screen_width: f32,
    pub screen_height: f32,
    /// Radius of the hole drawn at each target, in pixels.
    pub hole_radius: f32,
    /// Look marker radius relative to the hole radius.
    pub look_radius_ratio: f32,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            forward_axis: Vec3::NEG_Z,
            capture_threshold: 0.95,
            track_gravity: true,
            focal_scale: 0.8,
            screen_width: 1080.0,
            screen_height: 1920.0,
            hole_radius: 56.0,
            look_radius_ratio: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Simulated exposure + encode time.
    pub latency_ms: u64,
    /// Fail every n-th capture request (0 = never).
    pub fail_every: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            latency_ms: 150,
            fail_every: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory.
    pub data_dir: Option<PathBuf>,
}

// glam implements Serialize only behind a feature; arrays read better in TOML anyway.
mod vec3_serde {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec3, s: S) -> Result<S::Ok, S::Error> {
        [v.x, v.y, v.z].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec3, D::Error> {
        let [x, y, z] = <[f32; 3]>::deserialize(d)?;
        Ok(Vec3::new(x, y, z))
    }
}
