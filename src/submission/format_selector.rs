// Format selection - catalog views and the video/audio/best selection state
//
// The catalog is split the way the format grid shows it:
// - Best: the backend's combined pick
// - Video: every format carrying a video stream
// - Audio: audio-only formats
//
// Selection slots follow these rules:
// - picking best clears video and audio
// - picking video or audio clears best
// - video and audio can be held together (separate streams merged by yt-dlp)

use serde::{Deserialize, Serialize};

use super::models::{FormatCatalog, FormatDescriptor};

/// Which grid a format is shown in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatKind {
    Best,
    Video,
    Audio,
}

/// Format option for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatOption {
    /// Display label (e.g., "137 - 1080p (1920x1080)")
    pub label: String,

    /// Code passed to the argument builder
    pub code: String,

    pub kind: FormatKind,

    /// Estimated file size (e.g., "150 MB")
    pub estimated_size: Option<String>,

    /// Codec info (e.g., "H.264" or "VP9")
    pub codec_info: Option<String>,
}

/// Catalog views used by the selection grid
pub struct FormatSelector;

impl FormatSelector {
    /// Formats carrying a video stream, in backend order
    pub fn video_formats(catalog: &FormatCatalog) -> Vec<&FormatDescriptor> {
        catalog.formats.iter().filter(|f| f.has_video()).collect()
    }

    /// Audio-only formats, in backend order
    pub fn audio_formats(catalog: &FormatCatalog) -> Vec<&FormatDescriptor> {
        catalog.formats.iter().filter(|f| f.is_audio_only()).collect()
    }

    /// Whether the catalog offers anything to pick
    pub fn is_usable(catalog: &FormatCatalog) -> bool {
        !catalog.formats.is_empty() || !catalog.best.format_id.is_empty()
    }

    /// Look a code up in the catalog, best format included
    pub fn find<'a>(catalog: &'a FormatCatalog, code: &str) -> Option<&'a FormatDescriptor> {
        if !catalog.best.format_id.is_empty() && catalog.best.format_id == code {
            return Some(&catalog.best);
        }
        catalog.formats.iter().find(|f| f.format_id == code)
    }

    /// Build the options shown for a catalog: best first, then video, then audio
    pub fn build_options(catalog: &FormatCatalog) -> Vec<FormatOption> {
        let mut options = Vec::new();

        if !catalog.best.format_id.is_empty() {
            options.push(Self::to_option(&catalog.best, FormatKind::Best));
        }
        for f in Self::video_formats(catalog) {
            options.push(Self::to_option(f, FormatKind::Video));
        }
        for f in Self::audio_formats(catalog) {
            options.push(Self::to_option(f, FormatKind::Audio));
        }

        options
    }

    fn to_option(format: &FormatDescriptor, kind: FormatKind) -> FormatOption {
        let detail = match kind {
            FormatKind::Audio if !format.language.is_empty() => {
                format!("{} [{}]", format.acodec, format.language)
            }
            FormatKind::Audio => format.acodec.clone(),
            _ if format.fps > 0.0 => format!("{} @ {}fps", format.resolution, format.fps),
            _ => format.resolution.clone(),
        };

        let label = if format.format_note.is_empty() {
            format!("{} - {}", format.format_id, detail)
        } else {
            format!("{} - {} ({})", format.format_id, format.format_note, detail)
        };

        FormatOption {
            label,
            code: format.format_id.clone(),
            kind,
            estimated_size: Self::format_size(format.size),
            codec_info: Self::get_codec_label(format),
        }
    }

    /// Format file size for display
    fn format_size(bytes: f64) -> Option<String> {
        if bytes <= 0.0 {
            return None;
        }
        let mb = bytes / 1_048_576.0;
        if mb >= 1024.0 {
            Some(format!("{:.1} GB", mb / 1024.0))
        } else {
            Some(format!("{:.0} MB", mb))
        }
    }

    /// Get human-readable codec label
    fn get_codec_label(format: &FormatDescriptor) -> Option<String> {
        let codec = if format.has_video() {
            &format.vcodec
        } else if format.has_audio() {
            &format.acodec
        } else {
            return None;
        };

        let label = if codec.starts_with("avc1") {
            "H.264".to_string()
        } else if codec.starts_with("vp9") || codec.starts_with("vp09") {
            "VP9".to_string()
        } else if codec.starts_with("av01") {
            "AV1".to_string()
        } else if codec.starts_with("mp4a") {
            "AAC".to_string()
        } else {
            codec.split('.').next().unwrap_or(codec).to_string()
        };
        Some(label)
    }
}

/// Chosen format codes for one catalog.
///
/// Empty string means "not picked". Every operation updates all three
/// slots in one step, so callers never see a half-applied pick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSelection {
    best: String,
    video: String,
    audio: String,
}

impl FormatSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_best(&mut self, code: impl Into<String>) {
        *self = Self {
            best: code.into(),
            video: String::new(),
            audio: String::new(),
        };
    }

    pub fn select_video(&mut self, code: impl Into<String>) {
        self.video = code.into();
        self.best.clear();
    }

    pub fn select_audio(&mut self, code: impl Into<String>) {
        self.audio = code.into();
        self.best.clear();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn best(&self) -> &str {
        &self.best
    }

    pub fn video(&self) -> &str {
        &self.video
    }

    pub fn audio(&self) -> &str {
        &self.audio
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty() && self.video.is_empty() && self.audio.is_empty()
    }

    /// Non-empty codes in precedence order: best, video, audio
    pub fn codes(&self) -> Vec<String> {
        [&self.best, &self.video, &self.audio]
            .into_iter()
            .filter(|c| !c.is_empty())
            .cloned()
            .collect()
    }
}
