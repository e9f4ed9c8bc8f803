use crate::types::{AccelerationSample, Attitude, RotationSample, SmoothedState};
use crate::SensorError;
use glam::{Mat3, Vec3};
use photosphere_config::FilterConfig;

/// Acceleration magnitudes below this carry no direction.
const MIN_ACCEL_NORM: f32 = 1e-6;

/// Low-pass orientation filter.
///
/// Blends each instantaneous rotation and gravity reading into the held
/// estimate with a fixed exponential smoothing factor. Rotation-vector samples
/// are already fused by the platform, so only high-frequency jitter needs damping.
pub struct OrientationFilter {
    config: FilterConfig,
    state: SmoothedState,
    stats: FilterStats,
}

/// Sample counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub rotation_samples: u64,
    pub acceleration_samples: u64,
    pub dropped_samples: u64,
}

impl OrientationFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            state: SmoothedState::default(),
            stats: FilterStats::default(),
        }
    }

    /// Current smoothed estimate.
    pub fn state(&self) -> SmoothedState {
        self.state
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    /// Back to identity attitude and the flat-device gravity guess.
    pub fn reset(&mut self) {
        self.state = SmoothedState::default();
        self.stats = FilterStats::default();
        tracing::debug!("Orientation filter reset");
    }

    /// Blend a rotation-vector sample into the attitude estimate.
    pub fn on_rotation_sample(&mut self, sample: &RotationSample) -> Result<Attitude, SensorError> {
        let Some(q) = sample.to_quat() else {
            self.stats.dropped_samples += 1;
            tracing::trace!(?sample, "Dropping degenerate rotation sample");
            return Err(SensorError::DegenerateSample);
        };

        let instantaneous = Attitude::from_quat(q);
        let mut blended = blend_attitude(self.state.attitude, instantaneous, self.config.rotation_alpha);
        if self.config.reorthonormalize {
            blended = orthonormalize(blended).unwrap_or(instantaneous);
        }

        self.state.attitude = blended;
        self.stats.rotation_samples += 1;
        Ok(blended)
    }

    /// Blend an accelerometer sample into the gravity estimate.
    pub fn on_acceleration_sample(
        &mut self,
        sample: &AccelerationSample,
    ) -> Result<Vec3, SensorError> {
        let a = sample.acceleration;
        let len = a.length();
        if !len.is_finite() || len <= MIN_ACCEL_NORM {
            self.stats.dropped_samples += 1;
            tracing::trace!(?a, "Dropping degenerate acceleration sample");
            return Err(SensorError::DegenerateSample);
        }

        let gravity = blend_gravity(self.state.gravity, a / len, self.config.gravity_alpha);
        self.state.gravity = gravity;
        self.stats.acceleration_samples += 1;
        Ok(gravity)
    }
}

/// `old·(1−α) + new·α`, element by element.
pub fn blend_attitude(old: Attitude, new: Attitude, alpha: f32) -> Attitude {
    let a = old.matrix() * (1.0 - alpha);
    let b = new.matrix() * alpha;
    Attitude::from_mat3(a + b)
}

/// Exponential blend of two unit directions, renormalized.
/// Keeps `old` when the blend cancels out.
pub fn blend_gravity(old: Vec3, new: Vec3, alpha: f32) -> Vec3 {
    (old * (1.0 - alpha) + new * alpha)
        .try_normalize()
        .unwrap_or(old)
}

/// Gram-Schmidt on the columns. `None` if the matrix has collapsed.
pub fn orthonormalize(attitude: Attitude) -> Option<Attitude> {
    let m = attitude.matrix();
    let x = m.x_axis.try_normalize()?;
    let y = (m.y_axis - x * x.dot(m.y_axis)).try_normalize()?;
    let z = x.cross(y);
    Some(Attitude::from_mat3(Mat3::from_cols(x, y, z)))
}
