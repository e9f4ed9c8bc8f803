use crate::types::{AccelerationSample, RotationSample, SensorSample};
use std::collections::VecDeque;
use thiserror::Error;

/// Line prefix for rotation-vector samples: `rot x y z [w]`.
const ROTATION_TAG: &str = "rot";
/// Line prefix for accelerometer samples: `acc x y z`.
const ACCELERATION_TAG: &str = "acc";
const COMMENT: char = '#';

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Line {line}: unknown sample kind `{kind}`")]
    UnknownKind { line: usize, kind: String },
    #[error("Line {line}: expected at least 3 components, got {got}")]
    MissingComponent { line: usize, got: usize },
    #[error("Line {line}: too many components ({got})")]
    TooManyComponents { line: usize, got: usize },
    #[error("Line {line}: invalid number `{token}`")]
    InvalidNumber { line: usize, token: String },
    #[error("Line {line}: not valid UTF-8")]
    InvalidUtf8 { line: usize },
}

/// Streaming parser for recorded sensor sessions.
///
/// Feed raw bytes via `push_data`, then drain parsed samples via `next_sample`.
/// Samples are newline framed; a trailing line without a newline is held
/// until more data arrives or `finish` is called.
pub struct ProtocolParser {
    buffer: VecDeque<u8>,
    line: usize,
    finished: bool,
}

impl ProtocolParser {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(8192),
            line: 0,
            finished: false,
        }
    }

    /// Append received bytes to the internal buffer.
    pub fn push_data(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Mark end of input so a final unterminated line is parsed too.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Try to extract the next sample from the buffer.
    /// Returns `None` if no complete line is available yet.
    pub fn next_sample(&mut self) -> Option<Result<SensorSample, ProtocolError>> {
        loop {
            let raw = self.take_line()?;
            self.line += 1;

            let Ok(text) = std::str::from_utf8(&raw) else {
                return Some(Err(ProtocolError::InvalidUtf8 { line: self.line }));
            };
            let text = text.split(COMMENT).next().unwrap_or("").trim();
            if text.is_empty() {
                continue;
            }
            return Some(parse_line(text, self.line));
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let buf = self.buffer.make_contiguous();
        match buf.iter().position(|&b| b == b'\n') {
            Some(end) => {
                let line = buf[..end].to_vec();
                self.buffer.drain(..=end);
                Some(line)
            }
            None if self.finished && !buf.is_empty() => {
                let line = buf.to_vec();
                self.buffer.clear();
                Some(line)
            }
            None => None,
        }
    }
}

impl Default for ProtocolParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse every sample in a complete recording. Malformed lines are returned as errors in place.
pub fn parse_all(data: &[u8]) -> Vec<Result<SensorSample, ProtocolError>> {
    let mut parser = ProtocolParser::new();
    parser.push_data(data);
    parser.finish();
    std::iter::from_fn(|| parser.next_sample()).collect()
}

/// Render a sample in replay format.
pub fn format_sample(sample: &SensorSample) -> String {
    match sample {
        SensorSample::Rotation(r) => match r.w {
            Some(w) => format!("{ROTATION_TAG} {} {} {} {}", r.x, r.y, r.z, w),
            None => format!("{ROTATION_TAG} {} {} {}", r.x, r.y, r.z),
        },
        SensorSample::Acceleration(a) => {
            let v = a.acceleration;
            format!("{ACCELERATION_TAG} {} {} {}", v.x, v.y, v.z)
        }
    }
}

fn parse_line(text: &str, line: usize) -> Result<SensorSample, ProtocolError> {
    let mut tokens = text.split_whitespace();
    let kind = tokens.next().unwrap_or_default();

    let values = tokens
        .map(|t| {
            t.parse::<f32>().map_err(|_| ProtocolError::InvalidNumber {
                line,
                token: t.to_string(),
            })
        })
        .collect::<Result<Vec<f32>, _>>()?;

    if values.len() < 3 {
        return Err(ProtocolError::MissingComponent {
            line,
            got: values.len(),
        });
    }

    match kind {
        ROTATION_TAG => match values[..] {
            [x, y, z] => Ok(SensorSample::Rotation(RotationSample::new(x, y, z))),
            [x, y, z, w] => Ok(SensorSample::Rotation(RotationSample::with_scalar(x, y, z, w))),
            _ => Err(ProtocolError::TooManyComponents {
                line,
                got: values.len(),
            }),
        },
        ACCELERATION_TAG => match values[..] {
            [x, y, z] => Ok(SensorSample::Acceleration(AccelerationSample::new(x, y, z))),
            _ => Err(ProtocolError::TooManyComponents {
                line,
                got: values.len(),
            }),
        },
        other => Err(ProtocolError::UnknownKind {
            line,
            kind: other.to_string(),
        }),
    }
}
