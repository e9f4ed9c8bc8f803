//! Boundary to the native panorama stitcher.
//!
//! The stitcher itself lives outside this workspace. It reports a numeric
//! status and its log lines; this module validates input, maps the status,
//! and records the result on the project.

use crate::{Project, ProjectsStore, StoreError};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Fewest photos the stitcher can work with.
pub const MIN_STITCH_IMAGES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StitchStatus {
    Ok,
    NeedMoreImages,
    HomographyFailed,
    CameraParamsFailed,
    Unknown(i32),
}

impl StitchStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::NeedMoreImages,
            2 => Self::HomographyFailed,
            3 => Self::CameraParamsFailed,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::NeedMoreImages => 1,
            Self::HomographyFailed => 2,
            Self::CameraParamsFailed => 3,
            Self::Unknown(code) => code,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NeedMoreImages => "Need more images",
            Self::HomographyFailed => "Homography estimation failed",
            Self::CameraParamsFailed => "Camera parameters adjustment failed",
            Self::Unknown(_) => "Unknown error",
        }
    }
}

impl fmt::Display for StitchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {})", self.message(), self.code())
    }
}

/// Raw answer from the native stitcher.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchReport {
    pub status: StitchStatus,
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StitchOutput {
    pub panorama_path: PathBuf,
    pub logs: Vec<String>,
}

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("Need at least {MIN_STITCH_IMAGES} images to stitch, got {0}")]
    NotEnoughImages(usize),
    #[error("Stitching failed: {status}")]
    Failed { status: StitchStatus, logs: Vec<String> },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StitchError {
    /// Stitcher log lines, when the stitcher ran.
    pub fn logs(&self) -> &[String] {
        match self {
            Self::Failed { logs, .. } => logs,
            _ => &[],
        }
    }
}

pub trait PanoramaStitcher {
    /// Merge `photos` into one panorama written to `output`.
    fn stitch(&mut self, photos: &[PathBuf], output: &Path) -> StitchReport;
}

/// `pano_yyyyMMdd_HHmmss.png`
pub fn panorama_file_name() -> String {
    format!("pano_{}.png", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

/// Validate, run the stitcher, and map a non-OK status to an error.
pub fn stitch_photos(
    stitcher: &mut dyn PanoramaStitcher,
    photos: &[PathBuf],
    output: &Path,
) -> Result<StitchOutput, StitchError> {
    if photos.len() < MIN_STITCH_IMAGES {
        return Err(StitchError::NotEnoughImages(photos.len()));
    }
    info!(photos = photos.len(), ?output, "Stitching panorama");
    let report = stitcher.stitch(photos, output);
    match report.status {
        StitchStatus::Ok => Ok(StitchOutput {
            panorama_path: output.to_path_buf(),
            logs: report.logs,
        }),
        status => {
            warn!(%status, log_lines = report.logs.len(), "Stitching failed");
            Err(StitchError::Failed {
                status,
                logs: report.logs,
            })
        }
    }
}

/// Stitch a stored project's photos into `panorama_dir` and record the result.
pub fn stitch_project(
    store: &ProjectsStore,
    id: &str,
    stitcher: &mut dyn PanoramaStitcher,
    panorama_dir: &Path,
) -> Result<Project, StitchError> {
    let mut project = store.get(id)?;
    std::fs::create_dir_all(panorama_dir).map_err(|source| StoreError::Io {
        path: panorama_dir.to_path_buf(),
        source,
    })?;
    let output = stitch_photos(stitcher, &project.photos, &panorama_dir.join(panorama_file_name()))?;
    project.panorama_path = Some(output.panorama_path);
    store.upsert(project.clone())?;
    Ok(project)
}
