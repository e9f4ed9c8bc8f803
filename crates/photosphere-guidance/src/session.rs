//! Capture session state machine.
//!
//! Driven once per frame with the latest smoothed sensor state. Each frame the
//! nearest uncaptured target is recomputed from where the phone points, so the
//! visiting order follows the user instead of a precomputed path.

use crate::layout::SphereTargetLayout;
use crate::projector::device_to_world;
use crate::{Target, TargetId};
use glam::Vec3;
use photosphere_config::GuidanceConfig;
use photosphere_sensor::types::SmoothedState;
use std::path::PathBuf;

/// Alignment at which the highlight starts rising (~25 degrees off target).
pub const ALIGNMENT_FLOOR: f32 = 0.9;
/// Alignment span over which the highlight goes from 0 to 1.
pub const ALIGNMENT_SPAN: f32 = 0.1;

/// Identifies one capture request so acknowledgments can be matched to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the phone to line up with the nearest remaining target.
    AwaitingAlignment,
    /// A capture request is outstanding.
    Capturing,
    /// Every target has a photo.
    Complete,
    /// The user left mid-session.
    Abandoned,
}

/// Outgoing request to the camera collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest {
    pub request: RequestId,
    pub target: TargetId,
    /// World direction of the target when the request was issued.
    pub direction: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Saved(PathBuf),
    Failed(String),
}

/// Camera collaborator's answer to a [`CaptureRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureAck {
    pub request: RequestId,
    pub target: TargetId,
    pub outcome: CaptureOutcome,
}

impl CaptureAck {
    pub fn saved(request: &CaptureRequest, path: impl Into<PathBuf>) -> Self {
        Self {
            request: request.request,
            target: request.target,
            outcome: CaptureOutcome::Saved(path.into()),
        }
    }

    pub fn failed(request: &CaptureRequest, reason: impl Into<String>) -> Self {
        Self {
            request: request.request,
            target: request.target,
            outcome: CaptureOutcome::Failed(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TargetCaptured {
        target: TargetId,
        photo: PathBuf,
        remaining: usize,
    },
    CaptureFailed {
        target: TargetId,
        reason: String,
    },
    /// Photos in capture order. Emitted exactly once.
    Completed(Vec<PathBuf>),
}

/// How well the phone lines up with the nearest remaining target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    pub target: TargetId,
    /// Target position in world space.
    pub position: Vec3,
    /// Cosine between the look direction and the target direction, in [-1, 1].
    pub alignment: f32,
    /// 0 outside the ~25 degree cone, 1 when dead on.
    pub highlight: f32,
    /// Close enough to shoot.
    pub within_tolerance: bool,
}

/// Per-frame guidance for the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guidance {
    /// Unit look direction in world space.
    pub look_direction: Vec3,
    /// World up used to place the targets this frame.
    pub world_up: Vec3,
    /// `None` once nothing remains.
    pub nearest: Option<Alignment>,
}

/// Result of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tick {
    /// `None` when the session is over or the look direction is degenerate.
    pub guidance: Option<Guidance>,
    pub request: Option<CaptureRequest>,
}

/// `clamp((alignment − 0.9) / 0.1, 0, 1)`
pub fn highlight(alignment: f32) -> f32 {
    ((alignment - ALIGNMENT_FLOOR) / ALIGNMENT_SPAN).clamp(0.0, 1.0)
}

/// First uncaptured target closest to `point`. Ties keep layout order.
pub fn nearest_uncaptured(targets: &[Target], point: Vec3) -> Option<&Target> {
    let mut best: Option<(&Target, f32)> = None;
    for target in targets.iter().filter(|t| !t.captured) {
        let d = (target.position - point).length();
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((target, d)),
        }
    }
    best.map(|(t, _)| t)
}

pub struct CaptureSession {
    layout: SphereTargetLayout,
    forward_axis: Vec3,
    capture_threshold: f32,
    track_gravity: bool,
    world_up: Vec3,
    targets: Vec<Target>,
    photos: Vec<PathBuf>,
    phase: SessionPhase,
    outstanding: Option<CaptureRequest>,
    next_request: u64,
}

impl CaptureSession {
    /// New session with a fresh target set placed around `world_up`.
    pub fn new(layout: SphereTargetLayout, config: &GuidanceConfig, world_up: Vec3) -> Self {
        let targets = layout.build_session_targets(world_up);
        tracing::info!(
            targets = targets.len(),
            radius = layout.radius(),
            track_gravity = config.track_gravity,
            "Capture session started"
        );
        Self {
            layout,
            forward_axis: config.forward_axis.try_normalize().unwrap_or(Vec3::NEG_Z),
            capture_threshold: config.capture_threshold,
            track_gravity: config.track_gravity,
            world_up: world_up.try_normalize().unwrap_or(Vec3::Z),
            targets,
            photos: Vec::new(),
            phase: SessionPhase::AwaitingAlignment,
            outstanding: None,
            next_request: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn layout(&self) -> &SphereTargetLayout {
        &self.layout
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    pub fn captured_count(&self) -> usize {
        self.targets.iter().filter(|t| t.captured).count()
    }

    pub fn remaining(&self) -> usize {
        self.targets.len() - self.captured_count()
    }

    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    /// Photos saved so far, in capture order.
    pub fn photos(&self) -> &[PathBuf] {
        &self.photos
    }

    pub fn outstanding(&self) -> Option<&CaptureRequest> {
        self.outstanding.as_ref()
    }

    /// Advance one frame.
    pub fn tick(&mut self, state: &SmoothedState) -> Tick {
        if matches!(self.phase, SessionPhase::Complete | SessionPhase::Abandoned) {
            return Tick::default();
        }

        if self.track_gravity {
            self.realign(state.world_up());
        }

        let Some(look) = device_to_world(self.forward_axis, &state.attitude).try_normalize() else {
            tracing::trace!("Degenerate look direction");
            return Tick::default();
        };

        let nearest = self.align(look);
        let mut request = None;
        if let Some(a) = nearest {
            if a.within_tolerance && self.phase == SessionPhase::AwaitingAlignment {
                request = Some(self.issue_request(a));
            }
        }

        Tick {
            guidance: Some(Guidance {
                look_direction: look,
                world_up: self.world_up,
                nearest,
            }),
            request,
        }
    }

    /// Re-place targets around a new world up. Identities and captured flags are kept.
    pub fn realign(&mut self, world_up: Vec3) {
        let Some(up) = world_up.try_normalize() else {
            return;
        };
        self.world_up = up;
        for (target, position) in self.targets.iter_mut().zip(self.layout.positions(up)) {
            target.position = position;
        }
    }

    fn align(&self, look: Vec3) -> Option<Alignment> {
        let look_point = look * self.layout.radius();
        let target = nearest_uncaptured(&self.targets, look_point)?;
        let alignment = target
            .position
            .try_normalize()
            .map(|dir| look.dot(dir).clamp(-1.0, 1.0))
            .unwrap_or(-1.0);
        let highlight = highlight(alignment);
        Some(Alignment {
            target: target.id,
            position: target.position,
            alignment,
            highlight,
            within_tolerance: highlight >= self.capture_threshold,
        })
    }

    fn issue_request(&mut self, aligned: Alignment) -> CaptureRequest {
        let request = CaptureRequest {
            request: RequestId(self.next_request),
            target: aligned.target,
            direction: aligned.position.normalize_or_zero(),
        };
        self.next_request += 1;
        self.outstanding = Some(request);
        self.phase = SessionPhase::Capturing;
        tracing::info!(
            target_id = %aligned.target,
            request = request.request.0,
            alignment = aligned.alignment,
            "Capture requested"
        );
        request
    }

    /// Apply the camera's answer to the outstanding request.
    ///
    /// Acks that do not match the outstanding request, or arrive after the
    /// session ended, are ignored.
    pub fn on_capture_ack(&mut self, ack: CaptureAck) -> Vec<SessionEvent> {
        if matches!(self.phase, SessionPhase::Complete | SessionPhase::Abandoned) {
            tracing::debug!(target_id = %ack.target, phase = ?self.phase, "Ignoring late capture ack");
            return Vec::new();
        }
        let Some(outstanding) = self.outstanding else {
            tracing::warn!(target_id = %ack.target, "Capture ack with no outstanding request");
            return Vec::new();
        };
        if outstanding.request != ack.request || outstanding.target != ack.target {
            tracing::warn!(
                expected = outstanding.request.0,
                got = ack.request.0,
                "Ignoring stale capture ack"
            );
            return Vec::new();
        }

        self.outstanding = None;
        self.phase = SessionPhase::AwaitingAlignment;

        match ack.outcome {
            CaptureOutcome::Saved(photo) => {
                let target = &mut self.targets[ack.target.0];
                if target.captured {
                    return Vec::new();
                }
                target.captured = true;
                self.photos.push(photo.clone());

                let remaining = self.remaining();
                tracing::info!(target_id = %ack.target, remaining, ?photo, "Target captured");

                let mut events = vec![SessionEvent::TargetCaptured {
                    target: ack.target,
                    photo,
                    remaining,
                }];
                if remaining == 0 {
                    self.phase = SessionPhase::Complete;
                    tracing::info!(photos = self.photos.len(), "Capture session complete");
                    events.push(SessionEvent::Completed(self.photos.clone()));
                }
                events
            }
            CaptureOutcome::Failed(reason) => {
                tracing::warn!(target_id = %ack.target, %reason, "Capture failed, target stays pending");
                vec![SessionEvent::CaptureFailed {
                    target: ack.target,
                    reason,
                }]
            }
        }
    }

    /// Leave the session. Any outstanding request is released; later acks are ignored.
    pub fn abandon(&mut self) {
        if matches!(self.phase, SessionPhase::Complete | SessionPhase::Abandoned) {
            return;
        }
        tracing::info!(
            captured = self.captured_count(),
            outstanding = self.outstanding.is_some(),
            "Capture session abandoned"
        );
        self.outstanding = None;
        self.phase = SessionPhase::Abandoned;
    }

    /// Consume the session, returning the photos in capture order.
    pub fn into_photos(self) -> Vec<PathBuf> {
        self.photos
    }
}
