//! yt-dlp adapter.
//!
//! The rest of the app only sees the [`Extractor`] trait and the typed
//! [`EngineEvent`] stream; everything yt-dlp specific (arguments, progress
//! lines, error output) stays in this module.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;

use log::{debug, info};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::DownloadRequest;

const PROGRESS_PREFIX: &str = "PROGRESS|";
const FINISHED_PREFIX: &str = "FINISHED|";
const PROGRESS_TEMPLATE: &str =
    "download:PROGRESS|%(progress.status)s|%(progress._percent_str)s|%(progress._speed_str)s|%(progress.filename)s";
const FINAL_PATH_PRINT: &str = "after_move:FINISHED|%(filepath)s";
const STDERR_TAIL_LINES: usize = 20;
const UNKNOWN_TITLE: &str = "Unknown Title";

/// Audio extraction applied after the transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessor {
    pub codec: &'static str,
    pub bitrate_kbps: u32,
}

pub const MP3_192: PostProcessor = PostProcessor {
    codec: "mp3",
    bitrate_kbps: 192,
};

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadConfig {
    pub format: String,
    pub output_template: String,
    pub no_playlist: bool,
    pub post_processor: Option<PostProcessor>,
}

impl DownloadConfig {
    pub fn for_request(request: &DownloadRequest) -> Self {
        let output_template = Path::new(&request.directory)
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .to_string();

        Self {
            format: request.quality.format_selector().to_string(),
            output_template,
            no_playlist: true,
            post_processor: request.quality.is_audio_only().then_some(MP3_192),
        }
    }

    /// Command line for one download, URL last.
    pub fn to_args(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "--newline",
            "--progress",
            "--no-colors",
            "--no-simulate",
            "--encoding",
            "utf-8",
            "--progress-template",
            PROGRESS_TEMPLATE,
            "--print",
            FINAL_PATH_PRINT,
            "-f",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.push(self.format.clone());
        args.push("-o".to_string());
        args.push(self.output_template.clone());

        if self.no_playlist {
            args.push("--no-playlist".to_string());
        }

        if let Some(pp) = &self.post_processor {
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push(pp.codec.to_string());
            args.push("--audio-quality".to_string());
            args.push(format!("{}K", pp.bitrate_kbps));
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

/// What the engine reports while a download runs, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress {
        percent_text: String,
        speed_text: String,
    },
    Finished {
        path: PathBuf,
    },
    Failed {
        message: String,
    },
}

pub trait Extractor: Send + Sync {
    /// Metadata-only lookup; nothing is written to disk.
    fn probe_title(&self, url: &str) -> Result<String>;

    fn download(
        &self,
        url: &str,
        config: &DownloadConfig,
        on_event: &mut dyn FnMut(EngineEvent),
    ) -> Result<()>;
}

pub struct YtDlp {
    program: String,
}

#[derive(Deserialize)]
struct VideoInfo {
    title: Option<String>,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn locate(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|_| AppError::ExtractorMissing {
            program: self.program.clone(),
        })
    }

    fn failure(&self, code: Option<i32>, stderr: &str) -> AppError {
        AppError::ExtractorFailed {
            program: self.program.clone(),
            code,
            stderr: error_summary(stderr),
        }
    }
}

impl Extractor for YtDlp {
    fn probe_title(&self, url: &str) -> Result<String> {
        let bin = self.locate()?;
        let output = Command::new(bin)
            .args([
                "--dump-single-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                "--",
                url,
            ])
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(self.failure(
                output.status.code(),
                &String::from_utf8_lossy(&output.stderr),
            ));
        }

        parse_title(&output.stdout)
    }

    fn download(
        &self,
        url: &str,
        config: &DownloadConfig,
        on_event: &mut dyn FnMut(EngineEvent),
    ) -> Result<()> {
        let bin = self.locate()?;
        let args = config.to_args(url);
        debug!("Command: {} {:?}", bin.display(), args);

        let mut child = Command::new(bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Both pipes feed one channel so events reach the caller on this thread.
        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, false, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, true, tx.clone());
        }
        drop(tx);

        let mut stderr_tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        for (is_stderr, line) in rx {
            debug!("yt-dlp {}: {}", if is_stderr { "stderr" } else { "stdout" }, line);
            if let Some(event) = parse_line(&line) {
                on_event(event);
            }
            if is_stderr {
                if stderr_tail.len() == STDERR_TAIL_LINES {
                    stderr_tail.pop_front();
                }
                stderr_tail.push_back(line);
            }
        }

        let status = child.wait()?;
        info!("yt-dlp exited with {}", status);
        if status.success() {
            Ok(())
        } else {
            let stderr: Vec<String> = stderr_tail.into_iter().collect();
            Err(self.failure(status.code(), &stderr.join("\n")))
        }
    }
}

fn forward_lines<R>(reader: R, is_stderr: bool, tx: Sender<(bool, String)>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || send_lines(reader, is_stderr, &tx));
}

/// Sends each line until EOF. Bytes that are not UTF-8 are replaced so one
/// badly encoded title does not stop the reader and close the pipe.
fn send_lines<R: Read>(reader: R, is_stderr: bool, tx: &Sender<(bool, String)>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string();
                if tx.send((is_stderr, line)).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("yt-dlp output closed: {}", e);
                break;
            }
        }
    }
}

fn parse_title(json: &[u8]) -> Result<String> {
    let info: VideoInfo =
        serde_json::from_slice(json).map_err(|e| AppError::Metadata(e.to_string()))?;
    Ok(info
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string()))
}

/// Turns one line of yt-dlp output into an event, if it carries one.
pub fn parse_line(line: &str) -> Option<EngineEvent> {
    let line = strip_ansi(line);
    let line = line.trim_end();

    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        let mut parts = rest.splitn(4, '|');
        let status = parts.next()?.trim();
        let percent_text = parts.next().unwrap_or("").trim().to_string();
        let speed_text = parts.next().unwrap_or("").trim().to_string();
        let filename = parts.next().unwrap_or("").trim();

        return match status {
            "downloading" => Some(EngineEvent::Progress {
                percent_text,
                speed_text,
            }),
            "finished" if !filename.is_empty() && filename != "NA" => Some(EngineEvent::Finished {
                path: PathBuf::from(filename),
            }),
            _ => None,
        };
    }

    if let Some(path) = line.strip_prefix(FINISHED_PREFIX) {
        let path = path.trim();
        return (!path.is_empty()).then(|| EngineEvent::Finished {
            path: PathBuf::from(path),
        });
    }

    line.starts_with("ERROR:").then(|| EngineEvent::Failed {
        message: line.to_string(),
    })
}

/// Percentage from a string like `" 42.5%"`. Anything unparsable or outside
/// 0..=100 gives `None`.
pub fn parse_percent(text: &str) -> Option<f32> {
    let cleaned = strip_ansi(text);
    let value = cleaned.trim().trim_end_matches('%').trim().parse::<f32>().ok()?;
    (value.is_finite() && (0.0..=100.0).contains(&value)).then_some(value)
}

fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            // CSI sequences end with a letter
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Prefers yt-dlp's own `ERROR:` lines over the rest of stderr.
fn error_summary(stderr: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .filter(|l| l.starts_with("ERROR:"))
        .collect();
    if errors.is_empty() {
        stderr.trim().to_string()
    } else {
        errors.join("\n")
    }
}

/// Whether `program` resolves on PATH.
pub fn tool_available(program: &str) -> bool {
    which::which(program).is_ok()
}
