//! Screen-space model of the guidance overlay, one frame at a time.

use crate::projector::ViewProjector;
use crate::session::{highlight, CaptureSession, Guidance, SessionPhase};
use crate::TargetId;
use glam::Vec2;
use photosphere_config::GuidanceConfig;
use photosphere_sensor::types::Attitude;

/// Arrow head length in pixels.
const ARROW_HEAD_LENGTH: f32 = 32.0;
/// Arrow head half width in pixels.
const ARROW_HEAD_WIDTH: f32 = 22.0;

/// Pixel sizes of the guidance markers.
#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    pub hole_radius: f32,
    pub look_radius: f32,
}

impl OverlayStyle {
    pub fn from_config(config: &GuidanceConfig) -> Self {
        Self {
            hole_radius: config.hole_radius,
            look_radius: config.hole_radius * config.look_radius_ratio,
        }
    }
}

/// A remaining target as it appears on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetMarker {
    pub id: TargetId,
    pub screen: Vec2,
    pub highlight: f32,
}

/// Line from the look point to the nearest target, with a two-stroke head.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrow {
    pub tail: Vec2,
    pub tip: Vec2,
    pub head_left: Vec2,
    pub head_right: Vec2,
}

impl Arrow {
    /// `None` when the points are too close for a meaningful direction.
    pub fn between(tail: Vec2, tip: Vec2) -> Option<Self> {
        let dir = tip - tail;
        let len = dir.length();
        if len <= 1.0 {
            return None;
        }
        let n = dir / len;
        let base = tip - n * ARROW_HEAD_LENGTH;
        let perp = Vec2::new(-n.y, n.x) * ARROW_HEAD_WIDTH;
        Some(Self {
            tail,
            tip,
            head_left: base + perp,
            head_right: base - perp,
        })
    }
}

/// Everything the preview overlay draws for one frame, in screen pixels.
///
/// Points that fall behind the camera are `None` (rings) or absent (markers).
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame {
    /// Equator, upper and lower ring vertices in layout order.
    pub rings: [Vec<Option<Vec2>>; 3],
    /// Remaining targets that are in front of the camera.
    pub markers: Vec<TargetMarker>,
    pub look: Option<Vec2>,
    pub nearest: Option<Vec2>,
    pub arrow: Option<Arrow>,
    /// Look marker sits fully inside the nearest target's hole.
    pub within_hole: bool,
    /// A capture is in flight; the UI shows "HOLD".
    pub hold: bool,
}

impl OverlayFrame {
    /// Build the overlay for this frame's guidance.
    pub fn build(
        session: &CaptureSession,
        guidance: &Guidance,
        attitude: &Attitude,
        view: &ViewProjector,
        style: &OverlayStyle,
    ) -> Self {
        let project = |p| view.project_world(p, attitude);

        let rings = session
            .layout()
            .ring_outlines(guidance.world_up)
            .map(|ring| ring.into_iter().map(project).collect());

        let markers = session
            .targets()
            .iter()
            .filter(|t| !t.captured)
            .filter_map(|t| {
                let screen = project(t.position)?;
                let alignment = t
                    .position
                    .try_normalize()
                    .map(|d| guidance.look_direction.dot(d).clamp(-1.0, 1.0))
                    .unwrap_or(-1.0);
                Some(TargetMarker {
                    id: t.id,
                    screen,
                    highlight: highlight(alignment),
                })
            })
            .collect();

        let look = project(guidance.look_direction * session.layout().radius());
        let nearest = guidance.nearest.and_then(|a| project(a.position));

        let (arrow, within_hole) = match (look, nearest) {
            (Some(l), Some(n)) => (
                Arrow::between(l, n),
                l.distance(n) <= style.hole_radius - style.look_radius,
            ),
            _ => (None, false),
        };

        Self {
            rings,
            markers,
            look,
            nearest,
            arrow,
            within_hole,
            hold: session.phase() == SessionPhase::Capturing,
        }
    }

    /// Segments to draw for a ring: consecutive visible vertices, closed back to the first.
    pub fn ring_segments(ring: &[Option<Vec2>]) -> Vec<(Vec2, Vec2)> {
        let visible: Vec<Vec2> = ring.iter().flatten().copied().collect();
        let mut segments: Vec<(Vec2, Vec2)> = visible.windows(2).map(|w| (w[0], w[1])).collect();
        if let (Some(&first), Some(&last)) = (visible.first(), visible.last()) {
            if visible.len() > 2 && first != last {
                segments.push((last, first));
            }
        }
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{SphereTargetLayout, TARGET_COUNT};
    use glam::{Quat, Vec3};
    use photosphere_sensor::types::SmoothedState;

    fn setup() -> (CaptureSession, ViewProjector, OverlayStyle) {
        let config = GuidanceConfig {
            track_gravity: false,
            ..GuidanceConfig::default()
        };
        let session = CaptureSession::new(SphereTargetLayout::default(), &config, Vec3::Y);
        (
            session,
            ViewProjector::from_config(&config),
            OverlayStyle::from_config(&config),
        )
    }

    #[test]
    fn aligned_frame_is_inside_hole() {
        let (mut session, view, style) = setup();
        let state = SmoothedState::default();
        let tick = session.tick(&state);
        let frame = OverlayFrame::build(&session, &tick.guidance.unwrap(), &state.attitude, &view, &style);

        let look = frame.look.unwrap();
        assert!((look - view.center()).length() < 1e-3);
        assert!(frame.within_hole);
        // Look point already on the target: no arrow.
        assert!(frame.arrow.is_none());
        assert!(frame.hold);
    }

    #[test]
    fn off_target_frame_points_an_arrow() {
        let (mut session, view, style) = setup();
        let dir = Vec3::new(0.3, 0.0, -1.0).normalize();
        let state = SmoothedState {
            attitude: Attitude::from_quat(Quat::from_rotation_arc(Vec3::NEG_Z, dir)),
            gravity: Vec3::Y,
        };
        let tick = session.tick(&state);
        let guidance = tick.guidance.unwrap();
        let frame = OverlayFrame::build(&session, &guidance, &state.attitude, &view, &style);

        assert!(!frame.within_hole);
        assert!(!frame.hold);
        let arrow = frame.arrow.unwrap();
        assert_eq!(Some(arrow.tip), frame.nearest);
        // Head strokes are symmetric about the shaft.
        let base = (arrow.head_left + arrow.head_right) / 2.0;
        assert!((arrow.tip.distance(base) - ARROW_HEAD_LENGTH).abs() < 1e-3);
        assert!((arrow.head_left.distance(base) - ARROW_HEAD_WIDTH).abs() < 1e-3);
    }

    #[test]
    fn targets_behind_camera_are_not_drawn() {
        let (mut session, view, style) = setup();
        let state = SmoothedState::default();
        let tick = session.tick(&state);
        let frame = OverlayFrame::build(&session, &tick.guidance.unwrap(), &state.attitude, &view, &style);

        assert!(!frame.markers.is_empty());
        assert!(frame.markers.len() < TARGET_COUNT);
        for marker in &frame.markers {
            let p = session.targets()[marker.id.0].position;
            assert!(p.z < -0.1);
        }
        // Equator point straight behind (+Z) has no screen position.
        assert!(frame.rings[0].iter().any(Option::is_none));
    }

    #[test]
    fn ring_segments_close_the_loop() {
        let ring = vec![
            Some(Vec2::new(0.0, 0.0)),
            Some(Vec2::new(1.0, 0.0)),
            None,
            Some(Vec2::new(1.0, 1.0)),
        ];
        let segments = OverlayFrame::ring_segments(&ring);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2], (Vec2::new(1.0, 1.0), Vec2::new(0.0, 0.0)));
    }
}
