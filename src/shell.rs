use std::path::Path;
use std::process::Command;

use log::info;

use crate::error::{AppError, Result};

pub const FFMPEG_DOWNLOAD_PAGE: &str = "https://ffmpeg.org/download.html";

/// Opens the platform file manager at `folder`.
pub fn open_folder(folder: &Path) -> Result<()> {
    if !folder.is_dir() {
        return Err(AppError::FolderMissing(folder.to_path_buf()));
    }
    info!("Opening folder {}", folder.display());
    launch(folder.as_os_str())
}

/// Hands a web address to the default browser.
pub fn open_url(url: &str) -> Result<()> {
    info!("Opening {}", url);
    launch(url.as_ref())
}

fn launch(target: &std::ffi::OsStr) -> Result<()> {
    opener_command(target)
        .spawn()
        .map(|_| ())
        .map_err(|e| AppError::OpenFailed(format!("{}: {}", target.to_string_lossy(), e)))
}

#[cfg(target_os = "windows")]
fn opener_command(target: &std::ffi::OsStr) -> Command {
    let mut cmd = Command::new("explorer");
    cmd.arg(target);
    cmd
}

#[cfg(target_os = "macos")]
fn opener_command(target: &std::ffi::OsStr) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(target);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn opener_command(target: &std::ffi::OsStr) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(target);
    cmd
}
