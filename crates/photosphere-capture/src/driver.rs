//! Async glue between the sensor client, the capture session and the camera.

use crate::Camera;
use photosphere_guidance::overlay::{OverlayFrame, OverlayStyle};
use photosphere_guidance::session::Guidance;
use photosphere_guidance::{CaptureAck, CaptureSession, SessionEvent, ViewProjector};
use photosphere_sensor::types::SmoothedState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};
use tracing::{debug, info, warn};

/// How a driven session ended. Each variant carries the photos saved so far.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(Vec<PathBuf>),
    Abandoned(Vec<PathBuf>),
    /// The sensor stream ended before every target was captured.
    SensorsLost(Vec<PathBuf>),
}

impl SessionOutcome {
    pub fn photos(&self) -> &[PathBuf] {
        match self {
            Self::Completed(p) | Self::Abandoned(p) | Self::SensorsLost(p) => p,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Progress reported to an optional observer (UI, logging).
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    Frame {
        guidance: Guidance,
        /// Present when the driver was given screen geometry.
        overlay: Option<OverlayFrame>,
    },
    Session(SessionEvent),
}

/// Lets another task end the session early.
#[derive(Clone, Default)]
pub struct AbandonHandle(Arc<Notify>);

impl AbandonHandle {
    pub fn abandon(&self) {
        self.0.notify_one();
    }
}

pub struct SessionDriver<C: Camera> {
    session: CaptureSession,
    camera: C,
    state_rx: watch::Receiver<SmoothedState>,
    observer: Option<mpsc::UnboundedSender<DriverEvent>>,
    overlay: Option<(ViewProjector, OverlayStyle)>,
    abandon: AbandonHandle,
}

impl<C: Camera> SessionDriver<C> {
    pub fn new(session: CaptureSession, camera: C, state_rx: watch::Receiver<SmoothedState>) -> Self {
        Self {
            session,
            camera,
            state_rx,
            observer: None,
            overlay: None,
            abandon: AbandonHandle::default(),
        }
    }

    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<DriverEvent>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Attach an [`OverlayFrame`] to every frame event.
    pub fn with_overlay(mut self, view: ViewProjector, style: OverlayStyle) -> Self {
        self.overlay = Some((view, style));
        self
    }

    pub fn abandon_handle(&self) -> AbandonHandle {
        self.abandon.clone()
    }

    /// Run until the session completes, is abandoned, or the sensors go away.
    ///
    /// One frame is evaluated per published sensor state. Acks are applied
    /// before the next frame. If the sensors end while a capture is in flight,
    /// the driver waits for that ack, or for the camera to drop its sender,
    /// before returning.
    pub async fn run(mut self) -> SessionOutcome {
        let (ack_tx, mut ack_rx) = mpsc::unbounded_channel();
        // Dropped once the sensors end, so a camera that goes away unanswered closes the channel.
        let mut ack_tx = Some(ack_tx);
        let abandon = self.abandon.0.clone();

        let initial = *self.state_rx.borrow_and_update();
        if let Some(tx) = &ack_tx {
            self.frame(&initial, tx);
        }

        loop {
            tokio::select! {
                biased;

                _ = abandon.notified() => {
                    self.session.abandon();
                    return SessionOutcome::Abandoned(self.session.into_photos());
                }
                ack = ack_rx.recv() => {
                    let Some(ack) = ack else {
                        warn!("Camera dropped the in-flight capture without answering");
                        return self.sensors_lost();
                    };
                    debug!(request = ack.request.0, target_id = %ack.target, "Capture ack received");
                    for event in self.session.on_capture_ack(ack) {
                        self.notify(DriverEvent::Session(event));
                    }
                    if self.session.is_complete() {
                        return SessionOutcome::Completed(self.session.into_photos());
                    }
                    if ack_tx.is_none() && self.session.outstanding().is_none() {
                        return self.sensors_lost();
                    }
                }
                changed = self.state_rx.changed(), if ack_tx.is_some() => {
                    if changed.is_err() {
                        if self.session.outstanding().is_none() {
                            return self.sensors_lost();
                        }
                        info!("Sensor stream ended, waiting for the in-flight capture");
                        ack_tx = None;
                        continue;
                    }
                    let state = *self.state_rx.borrow_and_update();
                    if let Some(tx) = &ack_tx {
                        self.frame(&state, tx);
                    }
                }
            }
        }
    }

    fn frame(&mut self, state: &SmoothedState, acks: &mpsc::UnboundedSender<CaptureAck>) {
        let tick = self.session.tick(state);
        if let Some(request) = tick.request {
            self.camera.capture(request, acks.clone());
        }
        if self.observer.is_none() {
            return;
        }
        if let Some(guidance) = tick.guidance {
            let overlay = self.overlay.as_ref().map(|(view, style)| {
                OverlayFrame::build(&self.session, &guidance, &state.attitude, view, style)
            });
            self.notify(DriverEvent::Frame { guidance, overlay });
        }
    }

    fn notify(&mut self, event: DriverEvent) {
        if let Some(observer) = &self.observer {
            if observer.send(event).is_err() {
                self.observer = None;
            }
        }
    }

    fn sensors_lost(self) -> SessionOutcome {
        warn!(
            captured = self.session.captured_count(),
            remaining = self.session.remaining(),
            "Sensor stream ended before the sphere was covered"
        );
        SessionOutcome::SensorsLost(self.session.into_photos())
    }
}
