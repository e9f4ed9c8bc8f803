pub mod filter;
pub mod protocol;
pub mod source;
pub mod types;

use filter::OrientationFilter;
use photosphere_config::FilterConfig;
use source::SensorSource;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use types::{SensorSample, SmoothedState};

/// Capacity of the sample channel between a source and the filter task.
const SAMPLE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum SensorError {
    /// Zero-length or non-finite sample. Dropped; the estimate is unchanged.
    #[error("Degenerate sensor sample")]
    DegenerateSample,
    #[error("Sensor source is already registered")]
    AlreadyRegistered,
}

/// Commands sent to the filter task.
enum SensorCommand {
    Reset,
    Stop,
}

/// Owns the orientation filter and publishes the latest smoothed state.
///
/// Samples from the injected source are serialized onto one task, so the
/// filter is never touched concurrently. Readers get the newest estimate
/// through a `watch` channel.
pub struct SensorClient {
    state_rx: watch::Receiver<SmoothedState>,
    command_tx: mpsc::UnboundedSender<SensorCommand>,
    _task: tokio::task::JoinHandle<()>,
}

impl SensorClient {
    /// Register with `source` and start filtering.
    pub fn start(
        mut source: Box<dyn SensorSource>,
        config: FilterConfig,
    ) -> Result<Self, SensorError> {
        let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        source.register(sample_tx)?;

        let (state_tx, state_rx) = watch::channel(SmoothedState::default());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(filter_loop(
            source,
            OrientationFilter::new(config),
            sample_rx,
            state_tx,
            command_rx,
        ));

        tracing::info!("Sensor client started");
        Ok(Self {
            state_rx,
            command_tx,
            _task: task,
        })
    }

    /// Latest smoothed state (non-blocking).
    pub fn state(&self) -> SmoothedState {
        *self.state_rx.borrow()
    }

    /// Receiver that wakes on every published state.
    pub fn subscribe(&self) -> watch::Receiver<SmoothedState> {
        self.state_rx.clone()
    }

    /// Restore the filter's initial state. Used when a new session starts.
    pub fn reset(&self) {
        let _ = self.command_tx.send(SensorCommand::Reset);
    }

    /// Unregister from the source and stop the filter task.
    pub fn stop(&self) {
        let _ = self.command_tx.send(SensorCommand::Stop);
    }
}

/// Background task: drain samples, run the filter, publish state.
async fn filter_loop(
    mut source: Box<dyn SensorSource>,
    mut filter: OrientationFilter,
    mut sample_rx: mpsc::Receiver<SensorSample>,
    state_tx: watch::Sender<SmoothedState>,
    mut command_rx: mpsc::UnboundedReceiver<SensorCommand>,
) {
    let mut sample_count: u64 = 0;

    loop {
        tokio::select! {
            sample = sample_rx.recv() => {
                let Some(sample) = sample else {
                    tracing::info!(sample_count, "Sensor source exhausted");
                    break;
                };
                let result = match sample {
                    SensorSample::Rotation(r) => filter.on_rotation_sample(&r).map(|_| ()),
                    SensorSample::Acceleration(a) => filter.on_acceleration_sample(&a).map(|_| ()),
                };
                match result {
                    Ok(()) => {
                        let _ = state_tx.send(filter.state());
                    }
                    Err(e) => tracing::trace!(%e, "Sample ignored"),
                }
                sample_count += 1;
                if sample_count % 1000 == 0 {
                    tracing::debug!(sample_count, stats = ?filter.stats(), "Sensor samples processed");
                }
            }
            Some(cmd) = command_rx.recv() => {
                match cmd {
                    SensorCommand::Reset => {
                        filter.reset();
                        let _ = state_tx.send(filter.state());
                    }
                    SensorCommand::Stop => {
                        tracing::info!("Sensor client stopping");
                        break;
                    }
                }
            }
        }
    }

    source.unregister();
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};
    use source::ScriptedSource;
    use types::{AccelerationSample, RotationSample};

    #[tokio::test]
    async fn client_publishes_filtered_state() {
        let q = Quat::from_rotation_y(0.4);
        let mut samples = Vec::new();
        for _ in 0..300 {
            samples.push(SensorSample::Rotation(RotationSample::from_quat(q)));
            samples.push(SensorSample::Acceleration(AccelerationSample::new(0.0, 9.81, 0.0)));
        }

        let client =
            SensorClient::start(Box::new(ScriptedSource::new(samples)), FilterConfig::default())
                .unwrap();
        let mut rx = client.subscribe();

        // The task exits once the script is exhausted, closing the channel.
        while rx.changed().await.is_ok() {}

        let state = *rx.borrow();
        assert!((state.attitude.rotate(Vec3::NEG_Z) - q * Vec3::NEG_Z).length() < 1e-3);
        assert!((state.gravity - Vec3::Y).length() < 1e-3);
    }

    #[tokio::test]
    async fn degenerate_samples_do_not_publish() {
        let samples = vec![SensorSample::Acceleration(AccelerationSample::new(0.0, 0.0, 0.0))];
        let client =
            SensorClient::start(Box::new(ScriptedSource::new(samples)), FilterConfig::default())
                .unwrap();
        let mut rx = client.subscribe();

        // Closed without a single update.
        assert!(rx.changed().await.is_err());
        assert_eq!(*rx.borrow(), SmoothedState::default());
    }

    /// Delivers its samples at once, then keeps the sink open.
    struct HeldSource {
        samples: Vec<SensorSample>,
        sink: Option<mpsc::Sender<SensorSample>>,
    }

    impl SensorSource for HeldSource {
        fn register(&mut self, sink: mpsc::Sender<SensorSample>) -> Result<(), SensorError> {
            for sample in self.samples.drain(..) {
                sink.try_send(sample).unwrap();
            }
            self.sink = Some(sink);
            Ok(())
        }

        fn unregister(&mut self) {
            self.sink = None;
        }
    }

    #[tokio::test]
    async fn reset_publishes_initial_state() {
        let source = HeldSource {
            samples: vec![SensorSample::Rotation(RotationSample::from_quat(Quat::from_rotation_x(1.0)))],
            sink: None,
        };
        let client = SensorClient::start(Box::new(source), FilterConfig::default()).unwrap();
        let mut rx = client.subscribe();

        rx.changed().await.unwrap();
        assert_ne!(*rx.borrow_and_update(), SmoothedState::default());

        client.reset();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SmoothedState::default());
        client.stop();
    }
}
