//! Capture guidance: where to point the phone next, and when to shoot.

pub mod layout;
pub mod overlay;
pub mod projector;
pub mod session;

use glam::Vec3;

pub use layout::SphereTargetLayout;
pub use projector::ViewProjector;
pub use session::{CaptureAck, CaptureOutcome, CaptureRequest, CaptureSession, SessionEvent, SessionPhase};

/// Stable index of a target in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub usize);

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One viewing direction to capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub id: TargetId,
    /// World-space point on the target sphere.
    pub position: Vec3,
    /// Set once when a photo for this target is saved. Never cleared.
    pub captured: bool,
}
