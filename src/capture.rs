use anyhow::{bail, Context, Result};
use glam::Vec3;
use photosphere_capture::driver::{DriverEvent, SessionDriver, SessionOutcome};
use photosphere_capture::simulated::{sweep_samples, SimulatedCamera};
use photosphere_config::AppConfig;
use photosphere_guidance::overlay::OverlayStyle;
use photosphere_guidance::{CaptureSession, SessionEvent, SphereTargetLayout, ViewProjector};
use photosphere_sensor::protocol::format_sample;
use photosphere_sensor::source::{ReplaySource, ScriptedSource, SensorSource};
use photosphere_sensor::types::SensorSample;
use photosphere_sensor::SensorClient;
use photosphere_store::{Project, ProjectsStore};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const DEFAULT_INTERVAL_MS: u64 = 2;

/// Synthetic sweep starts with the phone flat, screen up.
const SWEEP_WORLD_UP: Vec3 = Vec3::Z;
/// Steps spent turning from one target to the next.
const SWEEP_TRANSITION_STEPS: usize = 12;
/// Steps for the filter to settle on a target before the camera latency counts.
const SWEEP_SETTLE_STEPS: usize = 40;

pub struct CaptureOptions {
    pub replay: Option<PathBuf>,
    pub name: Option<String>,
    pub interval_ms: u64,
}

/// Steps held on each target: settle time plus the camera latency.
fn dwell_steps(latency_ms: u64, interval_ms: u64) -> usize {
    // A step is a rotation sample and an acceleration sample.
    let step_ms = 2 * interval_ms.max(1);
    SWEEP_SETTLE_STEPS + latency_ms.div_ceil(step_ms) as usize
}

fn synthetic_sweep(config: &AppConfig, interval_ms: u64) -> Vec<SensorSample> {
    let layout = SphereTargetLayout::new(&config.layout);
    sweep_samples(
        &layout,
        SWEEP_WORLD_UP,
        config.guidance.forward_axis,
        SWEEP_TRANSITION_STEPS,
        dwell_steps(config.camera.latency_ms, interval_ms),
    )
}

/// Save the synthetic sweep in the replay format.
pub fn write_sweep(config: &AppConfig, output: &Path) -> Result<()> {
    let samples = synthetic_sweep(config, DEFAULT_INTERVAL_MS);
    let mut text = String::from("# synthetic photosphere sweep\n");
    for sample in &samples {
        text.push_str(&format_sample(sample));
        text.push('\n');
    }
    std::fs::write(output, text).with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote {} samples to {}", samples.len(), output.display());
    Ok(())
}

pub async fn run(config: &AppConfig, options: CaptureOptions) -> Result<()> {
    let data_dir = photosphere_config::data_dir(config)?;
    let interval = Duration::from_millis(options.interval_ms.max(1));

    let source: Box<dyn SensorSource> = match &options.replay {
        Some(path) => Box::new(ReplaySource::new(path).with_interval(interval)),
        None => {
            let samples = synthetic_sweep(config, options.interval_ms);
            info!(samples = samples.len(), "Running synthetic sweep");
            Box::new(ScriptedSource::new(samples).with_interval(interval))
        }
    };

    let client = SensorClient::start(source, config.filter.clone())?;
    client.reset();
    let session = CaptureSession::new(
        SphereTargetLayout::new(&config.layout),
        &config.guidance,
        client.state().world_up(),
    );
    let camera = SimulatedCamera::new(data_dir.join("photos"), &config.camera)?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let driver = SessionDriver::new(session, camera, client.subscribe())
        .with_observer(events_tx)
        .with_overlay(
            ViewProjector::from_config(&config.guidance),
            OverlayStyle::from_config(&config.guidance),
        );

    let abandon = driver.abandon_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, abandoning session");
            abandon.abandon();
        }
    });

    let progress = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                DriverEvent::Frame { guidance, overlay } => {
                    if let (Some(nearest), Some(overlay)) = (guidance.nearest, overlay) {
                        debug!(
                            target_id = %nearest.target,
                            highlight = nearest.highlight,
                            visible = overlay.markers.len(),
                            within_hole = overlay.within_hole,
                            hold = overlay.hold,
                            "Frame"
                        );
                    }
                }
                DriverEvent::Session(SessionEvent::TargetCaptured {
                    target, remaining, ..
                }) => println!("Captured {target}, {remaining} to go"),
                DriverEvent::Session(SessionEvent::CaptureFailed { target, reason }) => {
                    println!("Capture of {target} failed ({reason}), hold steady to retry")
                }
                DriverEvent::Session(SessionEvent::Completed(photos)) => {
                    println!("Sphere complete: {} photos", photos.len())
                }
            }
        }
    });

    let outcome = driver.run().await;
    client.stop();
    progress.await?;

    match outcome {
        SessionOutcome::Completed(photos) => {
            let store = ProjectsStore::in_dir(&data_dir);
            let name = match options.name {
                Some(name) => name,
                None => store.next_name()?,
            };
            let id = chrono::Local::now().format("%Y%m%d%H%M%S%3f").to_string();
            let project = Project::new(id, name, photos);
            store.upsert(project.clone())?;
            println!("Saved {} ({}) to {}", project.name, project.id, store.path().display());
            Ok(())
        }
        SessionOutcome::Abandoned(photos) => {
            warn!(photos = photos.len(), "Session abandoned, nothing saved");
            Ok(())
        }
        SessionOutcome::SensorsLost(photos) => {
            bail!(
                "sensor stream ended with {} targets captured; project not saved",
                photos.len()
            )
        }
    }
}
