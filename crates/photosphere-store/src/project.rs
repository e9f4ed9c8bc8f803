use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One capture session's worth of photos, plus the stitched result once there is one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Photo paths in capture order.
    #[serde(default)]
    pub photos: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panorama_path: Option<PathBuf>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, photos: Vec<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            photos,
            panorama_path: None,
        }
    }
}
