// Common data models for the submission workflow

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One download handed to the backend job queue.
///
/// Sent once and never retried by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub url: String,
    pub args: String,
    pub path_override: String,
    pub rename_to: String,
    pub playlist: bool,
}

/// Single selectable format as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatDescriptor {
    /// Format code (e.g. "137", "140", "18")
    pub format_id: String,
    /// Format note (e.g. "1080p", "medium")
    pub format_note: String,
    pub fps: f32,
    /// Resolution string (e.g. "1920x1080", "audio only")
    pub resolution: String,
    /// Video codec (avc1, vp9, av01, none)
    pub vcodec: String,
    /// Audio codec (mp4a, opus, none)
    pub acodec: String,
    /// Approximate file size in bytes
    #[serde(rename = "filesize_approx")]
    pub size: f64,
    pub language: String,
}

impl FormatDescriptor {
    /// Carries a video stream
    pub fn has_video(&self) -> bool {
        !self.vcodec.is_empty() && self.vcodec != "none"
    }

    /// Carries an audio stream
    pub fn has_audio(&self) -> bool {
        !self.acodec.is_empty() && self.acodec != "none"
    }

    /// Audio without video
    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }
}

/// Result of a format query for one URL
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatCatalog {
    pub title: String,
    pub thumbnail: String,
    pub url: String,
    /// Combined format the backend considers best
    pub best: FormatDescriptor,
    pub formats: Vec<FormatDescriptor>,
}

/// Where one batch item ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedItem {
    /// Position of the line in the batch
    pub index: usize,
    pub url: String,
}

/// Client-side summary of one submitted batch.
///
/// The backend never sees `batch_id`; it only correlates log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub dispatched: Vec<DispatchedItem>,
    pub skipped: usize,
    pub cancelled: bool,
}

impl BatchReport {
    pub(crate) fn new() -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            dispatched: Vec::new(),
            skipped: 0,
            cancelled: false,
        }
    }
}
