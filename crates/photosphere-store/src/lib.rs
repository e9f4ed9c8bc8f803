//! Project persistence and the panorama stitching boundary.

pub mod project;
pub mod stitch;

pub use project::Project;
pub use stitch::{PanoramaStitcher, StitchError, StitchOutput, StitchReport, StitchStatus};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File name of the project list inside the data directory.
pub const PROJECTS_FILE: &str = "projects.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed project list: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown project: {0}")]
    UnknownProject(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// JSON array of [`Project`] records in a single file.
///
/// Every call reads or rewrites the whole file; the list is small.
#[derive(Debug, Clone)]
pub struct ProjectsStore {
    path: PathBuf,
}

impl ProjectsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/projects.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PROJECTS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All projects. A missing or blank file is an empty list.
    pub fn load(&self) -> Result<Vec<Project>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "No project list yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Replace the stored list.
    pub fn save(&self, projects: &[Project]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(projects)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        debug!(count = projects.len(), path = ?self.path, "Project list saved");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Project, StoreError> {
        self.load()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::UnknownProject(id.to_string()))
    }

    /// Insert `project`, or replace the stored one with the same id in place.
    pub fn upsert(&self, project: Project) -> Result<(), StoreError> {
        let mut projects = self.load()?;
        match projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => *existing = project,
            None => {
                info!(id = %project.id, name = %project.name, photos = project.photos.len(), "Project added");
                projects.push(project);
            }
        }
        self.save(&projects)
    }

    /// Default name for the next project: `Project N`.
    pub fn next_name(&self) -> Result<String, StoreError> {
        Ok(format!("Project {}", self.load()?.len() + 1))
    }
}
