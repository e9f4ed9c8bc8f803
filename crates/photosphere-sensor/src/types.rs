use glam::{Mat3, Quat, Vec3};

/// Raw rotation-vector reading: the vector part of a unit quaternion,
/// optionally with its scalar part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Scalar component. Derived from the vector part when the sensor omits it.
    pub w: Option<f32>,
}

impl RotationSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, w: None }
    }

    pub fn with_scalar(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w: Some(w) }
    }

    /// Rotation vector for a known orientation, as the sensor would report it.
    pub fn from_quat(q: Quat) -> Self {
        Self::with_scalar(q.x, q.y, q.z, q.w)
    }

    /// Unit quaternion described by this sample, or `None` when the sample is degenerate.
    pub fn to_quat(&self) -> Option<Quat> {
        let w = self
            .w
            .unwrap_or_else(|| (1.0 - self.x * self.x - self.y * self.y - self.z * self.z).max(0.0).sqrt());
        let q = Quat::from_xyzw(self.x, self.y, self.z, w);
        let len = q.length();
        if !len.is_finite() || len <= f32::EPSILON {
            return None;
        }
        Some(q / len)
    }
}

/// Raw 3-axis accelerometer reading (m/s^2, gravity included).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerationSample {
    pub acceleration: Vec3,
}

impl AccelerationSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            acceleration: Vec3::new(x, y, z),
        }
    }
}

/// One event from either sensor stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorSample {
    Rotation(RotationSample),
    Acceleration(AccelerationSample),
}

/// Device attitude: rotation taking device-local coordinates to world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude(Mat3);

impl Attitude {
    pub const IDENTITY: Self = Self(Mat3::IDENTITY);

    pub fn from_mat3(m: Mat3) -> Self {
        Self(m)
    }

    /// Build from a row-major 3x3 array, the layout platform sensor APIs report.
    pub fn from_rows(r: [f32; 9]) -> Self {
        Self(Mat3::from_cols_array(&r).transpose())
    }

    pub fn from_quat(q: Quat) -> Self {
        Self(Mat3::from_quat(q))
    }

    /// Row-major elements.
    pub fn rows(&self) -> [f32; 9] {
        self.0.transpose().to_cols_array()
    }

    pub fn matrix(&self) -> Mat3 {
        self.0
    }

    /// device -> world
    pub fn rotate(&self, p: Vec3) -> Vec3 {
        self.0 * p
    }

    /// world -> device
    pub fn unrotate(&self, p: Vec3) -> Vec3 {
        self.0.transpose() * p
    }

    /// Largest deviation of `MᵀM` from the identity.
    pub fn orthonormality_error(&self) -> f32 {
        let d = self.0.transpose() * self.0 - Mat3::IDENTITY;
        d.to_cols_array().iter().fold(0.0_f32, |acc, v| acc.max(v.abs()))
    }
}

impl Default for Attitude {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Filtered sensor state shared with the guidance layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedState {
    /// Smoothed device attitude.
    pub attitude: Attitude,
    /// Smoothed unit gravity direction in the device frame.
    pub gravity: Vec3,
}

impl SmoothedState {
    /// Accelerometer reading of a device lying flat, screen up.
    pub const INITIAL_GRAVITY: Vec3 = Vec3::Z;

    /// Gravity rotated into the world frame.
    pub fn world_up(&self) -> Vec3 {
        self.attitude
            .rotate(self.gravity)
            .try_normalize()
            .unwrap_or(Self::INITIAL_GRAVITY)
    }
}

impl Default for SmoothedState {
    fn default() -> Self {
        Self {
            attitude: Attitude::IDENTITY,
            gravity: Self::INITIAL_GRAVITY,
        }
    }
}
