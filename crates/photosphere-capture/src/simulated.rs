//! Stand-ins for the phone hardware: a camera that writes placeholder files,
//! and a scripted hand motion that sweeps through every target.

use crate::{Camera, CameraError};
use glam::{Quat, Vec3};
use photosphere_config::CameraConfig;
use photosphere_guidance::{CaptureAck, CaptureRequest, SphereTargetLayout};
use photosphere_sensor::types::{AccelerationSample, RotationSample, SensorSample};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Standard gravity, for realistic accelerometer magnitudes.
const GRAVITY: f32 = 9.81;

/// Camera that "saves" a placeholder file per request.
///
/// Every `fail_every`-th request fails, to exercise the retry path.
pub struct SimulatedCamera {
    photo_dir: PathBuf,
    latency: Duration,
    fail_every: u32,
    requests: u32,
}

impl SimulatedCamera {
    pub fn new(photo_dir: impl Into<PathBuf>, config: &CameraConfig) -> Result<Self, CameraError> {
        let photo_dir = photo_dir.into();
        std::fs::create_dir_all(&photo_dir)?;
        info!(?photo_dir, latency_ms = config.latency_ms, "Simulated camera initialized");
        Ok(Self {
            photo_dir,
            latency: Duration::from_millis(config.latency_ms),
            fail_every: config.fail_every,
            requests: 0,
        })
    }

    pub fn photo_dir(&self) -> &Path {
        &self.photo_dir
    }
}

impl Camera for SimulatedCamera {
    fn capture(&mut self, request: CaptureRequest, acks: mpsc::UnboundedSender<CaptureAck>) {
        self.requests += 1;
        let fail = self.fail_every > 0 && self.requests % self.fail_every == 0;
        let path = self.photo_dir.join(photo_file_name(&request));
        let latency = self.latency;

        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            let ack = if fail {
                CaptureAck::failed(&request, "simulated exposure failure")
            } else {
                let body = format!(
                    "placeholder target={} direction={:?}\n",
                    request.target, request.direction
                );
                match tokio::fs::write(&path, body).await {
                    Ok(()) => CaptureAck::saved(&request, path),
                    Err(e) => CaptureAck::failed(&request, e.to_string()),
                }
            };
            // The session may be gone already; a dropped receiver is fine.
            let _ = acks.send(ack);
        });
    }
}

/// `IMG_yyyyMMdd_HHmmss_SSS_<target>.jpg`
pub fn photo_file_name(request: &CaptureRequest) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
    format!("IMG_{stamp}_{}.jpg", request.target.0)
}

/// Scripted hand motion: turn smoothly to each target in layout order and hold.
///
/// Each step emits a rotation sample followed by the matching accelerometer
/// reading, so gravity tracking sees a consistent world up.
pub fn sweep_samples(
    layout: &SphereTargetLayout,
    world_up: Vec3,
    forward_axis: Vec3,
    transition_steps: usize,
    dwell_steps: usize,
) -> Vec<SensorSample> {
    let up = world_up.try_normalize().unwrap_or(Vec3::Z);
    let forward = forward_axis.try_normalize().unwrap_or(Vec3::NEG_Z);
    let mut samples = Vec::new();
    let mut current = Quat::IDENTITY;

    let mut push = |q: Quat| {
        samples.push(SensorSample::Rotation(RotationSample::from_quat(q)));
        let g = q.inverse() * up * GRAVITY;
        samples.push(SensorSample::Acceleration(AccelerationSample::new(g.x, g.y, g.z)));
    };

    for target in layout.positions(up) {
        let aim = Quat::from_rotation_arc(forward, target.normalize_or_zero());
        for step in 1..=transition_steps {
            push(current.slerp(aim, step as f32 / transition_steps as f32));
        }
        for _ in 0..dwell_steps {
            push(aim);
        }
        current = aim;
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use photosphere_guidance::session::RequestId;
    use photosphere_guidance::{CaptureOutcome, TargetId};

    fn request(id: usize) -> CaptureRequest {
        CaptureRequest {
            request: RequestId(id as u64),
            target: TargetId(id),
            direction: Vec3::NEG_Z,
        }
    }

    #[tokio::test]
    async fn camera_writes_placeholder() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CameraConfig {
            latency_ms: 1,
            fail_every: 0,
        };
        let mut camera = SimulatedCamera::new(dir.path().join("photos"), &config).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        camera.capture(request(3), tx);
        let ack = rx.recv().await.unwrap();
        assert_eq!(ack.target, TargetId(3));
        match ack.outcome {
            CaptureOutcome::Saved(path) => {
                assert!(path.starts_with(camera.photo_dir()));
                assert!(path.exists());
                let name = path.file_name().unwrap().to_string_lossy().to_string();
                assert!(name.starts_with("IMG_") && name.ends_with("_3.jpg"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn camera_injects_failures() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CameraConfig {
            latency_ms: 0,
            fail_every: 2,
        };
        let mut camera = SimulatedCamera::new(dir.path(), &config).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        camera.capture(request(0), tx.clone());
        assert!(matches!(rx.recv().await.unwrap().outcome, CaptureOutcome::Saved(_)));
        camera.capture(request(1), tx);
        assert!(matches!(rx.recv().await.unwrap().outcome, CaptureOutcome::Failed(_)));
    }

    #[test]
    fn sweep_ends_on_each_target() {
        let layout = SphereTargetLayout::default();
        let up = Vec3::Z;
        let samples = sweep_samples(&layout, up, Vec3::NEG_Z, 4, 3);
        // Two samples (rotation + acceleration) per step, 7 steps per target.
        assert_eq!(samples.len(), 20 * 7 * 2);

        let targets = layout.positions(up);
        for (i, target) in targets.iter().enumerate() {
            let last_rotation = samples[(i + 1) * 14 - 2];
            let SensorSample::Rotation(r) = last_rotation else {
                panic!("expected rotation sample");
            };
            let look = r.to_quat().unwrap() * Vec3::NEG_Z;
            assert!((look - *target).length() < 1e-4);

            let SensorSample::Acceleration(a) = samples[(i + 1) * 14 - 1] else {
                panic!("expected acceleration sample");
            };
            let world_g = r.to_quat().unwrap() * a.acceleration;
            assert!((world_g.normalize() - up).length() < 1e-4);
        }
    }
}
