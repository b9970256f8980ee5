use std::fmt;
use std::path::PathBuf;

use crate::error::{AppError, Result};

/// Quality choices offered in the dropdown. Each maps to a yt-dlp format
/// selector that is passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityPreset {
    #[default]
    Best,
    Uhd4k,
    P1080,
    P720,
    P480,
    P360,
    AudioMp3,
}

impl QualityPreset {
    pub const ALL: [QualityPreset; 7] = [
        Self::Best,
        Self::Uhd4k,
        Self::P1080,
        Self::P720,
        Self::P480,
        Self::P360,
        Self::AudioMp3,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Best => "Best Quality",
            Self::Uhd4k => "4K",
            Self::P1080 => "1080p",
            Self::P720 => "720p",
            Self::P480 => "480p",
            Self::P360 => "360p",
            Self::AudioMp3 => "Audio Only (MP3)",
        }
    }

    pub fn format_selector(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Uhd4k => "bestvideo[height<=2160]+bestaudio/best[height<=2160]",
            Self::P1080 => "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
            Self::P720 => "best[height<=720]",
            Self::P480 => "best[height<=480]",
            Self::P360 => "best[height<=360]",
            Self::AudioMp3 => "bestaudio/best",
        }
    }

    /// Presets whose selector merges separate video and audio streams,
    /// which needs ffmpeg on the machine.
    pub fn needs_merge(self) -> bool {
        matches!(self, Self::Uhd4k | Self::P1080)
    }

    pub fn is_audio_only(self) -> bool {
        matches!(self, Self::AudioMp3)
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything the main window edits or displays.
#[derive(Default)]
pub struct AppState {
    pub url: String,
    pub download_dir: String,
    pub quality: QualityPreset,
    pub is_downloading: bool,
    pub progress: f32,
    pub status: String,
    pub last_error: Option<String>,
    pub output_path: Option<PathBuf>,
    pub ffmpeg_available: bool,
    pub show_history: bool,
}

impl AppState {
    pub fn request(&self) -> DownloadRequest {
        DownloadRequest {
            url: self.url.clone(),
            directory: self.download_dir.clone(),
            quality: self.quality,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub directory: String,
    pub quality: QualityPreset,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, directory: impl Into<String>, quality: QualityPreset) -> Self {
        Self {
            url: url.into(),
            directory: directory.into(),
            quality,
        }
    }

    /// Checks the inputs and makes sure the destination exists, returning the
    /// trimmed request ready for the worker.
    pub fn validate(&self) -> Result<DownloadRequest> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(AppError::EmptyUrl);
        }
        let directory = self.directory.trim();
        if directory.is_empty() {
            return Err(AppError::EmptyDirectory);
        }

        let path = PathBuf::from(directory);
        if !path.is_dir() {
            std::fs::create_dir_all(&path).map_err(|source| AppError::CreateDirectory {
                path: path.clone(),
                source,
            })?;
        }

        Ok(DownloadRequest::new(url, directory, self.quality))
    }
}
