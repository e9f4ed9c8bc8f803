use crate::protocol::ProtocolParser;
use crate::types::SensorSample;
use crate::SensorError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Something that can deliver rotation and acceleration samples.
///
/// Platform sensor managers, recorded sessions and test scripts all sit behind
/// this trait so the filter never reaches for a global sensor service.
pub trait SensorSource: Send {
    /// Start delivering samples into `sink`. Delivery stops when the source is
    /// exhausted, `unregister` is called, or the sink is closed.
    fn register(&mut self, sink: mpsc::Sender<SensorSample>) -> Result<(), SensorError>;

    /// Stop delivering samples.
    fn unregister(&mut self);
}

/// In-memory list of samples, delivered in order.
pub struct ScriptedSource {
    samples: Vec<SensorSample>,
    interval: Option<Duration>,
    task: Option<JoinHandle<()>>,
}

impl ScriptedSource {
    pub fn new(samples: Vec<SensorSample>) -> Self {
        Self {
            samples,
            interval: None,
            task: None,
        }
    }

    /// Wait `interval` between samples instead of delivering as fast as the sink accepts.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

impl SensorSource for ScriptedSource {
    fn register(&mut self, sink: mpsc::Sender<SensorSample>) -> Result<(), SensorError> {
        if self.task.is_some() {
            return Err(SensorError::AlreadyRegistered);
        }
        let samples = std::mem::take(&mut self.samples);
        let interval = self.interval;
        tracing::debug!(count = samples.len(), "Scripted sensor source registered");

        self.task = Some(tokio::spawn(async move {
            for sample in samples {
                if let Some(interval) = interval {
                    tokio::time::sleep(interval).await;
                }
                if sink.send(sample).await.is_err() {
                    break;
                }
            }
        }));
        Ok(())
    }

    fn unregister(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Recorded session read from a replay file (see [`crate::protocol`]).
pub struct ReplaySource {
    path: PathBuf,
    interval: Option<Duration>,
    task: Option<JoinHandle<()>>,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            interval: None,
            task: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

impl SensorSource for ReplaySource {
    fn register(&mut self, sink: mpsc::Sender<SensorSample>) -> Result<(), SensorError> {
        if self.task.is_some() {
            return Err(SensorError::AlreadyRegistered);
        }
        let path = self.path.clone();
        let interval = self.interval;
        tracing::info!(?path, "Replaying recorded sensor session");

        self.task = Some(tokio::spawn(async move {
            if let Err(e) = replay_loop(&path, interval, sink).await {
                tracing::error!(?e, ?path, "Sensor replay failed");
            }
        }));
        Ok(())
    }

    fn unregister(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn replay_loop(
    path: &Path,
    interval: Option<Duration>,
    sink: mpsc::Sender<SensorSample>,
) -> std::io::Result<()> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut parser = ProtocolParser::new();
    let mut buf = [0u8; 4096];
    let mut delivered: u64 = 0;

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            parser.finish();
        } else {
            parser.push_data(&buf[..n]);
        }

        // Drain all available samples.
        while let Some(result) = parser.next_sample() {
            match result {
                Ok(sample) => {
                    if let Some(interval) = interval {
                        tokio::time::sleep(interval).await;
                    }
                    if sink.send(sample).await.is_err() {
                        return Ok(());
                    }
                    delivered += 1;
                }
                Err(e) => {
                    tracing::warn!(%e, "Skipping malformed replay line");
                }
            }
        }

        if n == 0 {
            tracing::info!(delivered, "Sensor replay finished");
            return Ok(());
        }
    }
}
