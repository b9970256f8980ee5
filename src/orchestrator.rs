use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{error, info, warn};

use crate::download::{parse_percent, DownloadConfig, EngineEvent, Extractor};
use crate::error::{AppError, Result};
use crate::history::{HistoryEntry, HistoryStore};
use crate::models::{AppState, DownloadRequest};

pub const STATUS_STARTING: &str = "Starting download...";
pub const STATUS_FETCHING: &str = "Fetching video info...";
pub const STATUS_DONE: &str = "Download completed successfully!";
pub const MERGE_WARNING: &str = "Warning: FFmpeg not installed. Quality may be limited.";

/// Wakes the UI thread after the worker sends something.
pub type Repaint = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Status(String),
    Progress {
        percent: Option<f32>,
        percent_text: String,
        speed_text: String,
    },
    Completed(Option<HistoryEntry>),
    Failed(String),
}

/// How a download attempt ended, handed back to the UI once.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeeded(Option<HistoryEntry>),
    Failed(String),
}

pub struct DownloadTask {
    pub id: u64,
    events: Receiver<WorkerEvent>,
    // Never joined; dropping it detaches the worker.
    _handle: JoinHandle<()>,
}

pub struct Downloader {
    engine: Arc<dyn Extractor>,
    history: Arc<Mutex<HistoryStore>>,
    task: Option<DownloadTask>,
    next_id: u64,
}

impl Downloader {
    pub fn new(engine: Arc<dyn Extractor>, history: Arc<Mutex<HistoryStore>>) -> Self {
        Self {
            engine,
            history,
            task: None,
            next_id: 1,
        }
    }

    pub fn history(&self) -> &Arc<Mutex<HistoryStore>> {
        &self.history
    }

    pub fn is_busy(&self) -> bool {
        self.task.is_some()
    }

    /// Validates the form, disables the download control and hands the work
    /// to a background thread. Only one download runs at a time.
    pub fn start(&mut self, state: &mut AppState, repaint: Repaint) -> Result<u64> {
        if self.task.is_some() {
            return Err(AppError::Busy);
        }
        let request = state.request().validate()?;

        state.is_downloading = true;
        state.progress = 0.0;
        state.last_error = None;
        state.output_path = None;
        state.status = STATUS_STARTING.to_string();

        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        let history = Arc::clone(&self.history);
        let ffmpeg_available = state.ffmpeg_available;

        let spawned = thread::Builder::new()
            .name(format!("download-{id}"))
            .spawn(move || {
                let emit = |event: WorkerEvent| {
                    let _ = tx.send(event);
                    repaint();
                };
                let last = match run_download(
                    engine.as_ref(),
                    &request,
                    ffmpeg_available,
                    &history,
                    &emit,
                ) {
                    Ok(entry) => WorkerEvent::Completed(entry),
                    Err(e) => {
                        error!("Download #{} failed: {}", id, e);
                        WorkerEvent::Failed(e.to_string())
                    }
                };
                emit(last);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                state.is_downloading = false;
                state.status = format!("Error: {}", e);
                return Err(e.into());
            }
        };

        info!("Download #{} started", id);
        self.task = Some(DownloadTask {
            id,
            events: rx,
            _handle: handle,
        });
        Ok(id)
    }

    /// Applies everything the worker sent since the last call. Returns the
    /// outcome once the attempt has ended.
    pub fn poll(&mut self, state: &mut AppState) -> Option<Outcome> {
        let task = self.task.as_ref()?;
        let mut outcome = None;

        loop {
            match task.events.try_recv() {
                Ok(event) => {
                    if let Some(done) = apply_event(state, event) {
                        outcome = Some(done);
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let message = "download worker stopped unexpectedly".to_string();
                    outcome = apply_event(state, WorkerEvent::Failed(message));
                    break;
                }
            }
        }

        if outcome.is_some() {
            if let Some(task) = self.task.take() {
                info!("Download #{} finished", task.id);
            }
        }
        outcome
    }
}

/// Updates the window state for one worker event.
pub fn apply_event(state: &mut AppState, event: WorkerEvent) -> Option<Outcome> {
    match event {
        WorkerEvent::Status(text) => {
            state.status = text;
            None
        }
        WorkerEvent::Progress {
            percent,
            percent_text,
            speed_text,
        } => {
            if let Some(p) = percent {
                state.progress = p;
            }
            state.status = format!("{} complete - {}", percent_text, speed_text);
            None
        }
        WorkerEvent::Completed(entry) => {
            state.is_downloading = false;
            state.status = STATUS_DONE.to_string();
            state.output_path = entry.as_ref().map(|e| PathBuf::from(&e.filename));
            Some(Outcome::Succeeded(entry))
        }
        WorkerEvent::Failed(message) => {
            state.is_downloading = false;
            state.status = format!("Error: {}", message);
            state.last_error = Some(message.clone());
            Some(Outcome::Failed(message))
        }
    }
}

/// The body of the background task: fetch the title, download, record.
pub fn run_download(
    engine: &dyn Extractor,
    request: &DownloadRequest,
    ffmpeg_available: bool,
    history: &Mutex<HistoryStore>,
    emit: &dyn Fn(WorkerEvent),
) -> Result<Option<HistoryEntry>> {
    emit(WorkerEvent::Status(STATUS_FETCHING.to_string()));
    let title = engine.probe_title(&request.url)?;
    info!("Resolved title {:?} for {}", title, request.url);

    let config = DownloadConfig::for_request(request);

    if request.quality.needs_merge() && !ffmpeg_available {
        warn!("{} selected without ffmpeg; continuing anyway", request.quality);
        emit(WorkerEvent::Status(MERGE_WARNING.to_string()));
    }

    let mut final_path: Option<PathBuf> = None;
    engine.download(&request.url, &config, &mut |event| match event {
        EngineEvent::Progress {
            percent_text,
            speed_text,
        } => emit(WorkerEvent::Progress {
            percent: parse_percent(&percent_text),
            percent_text,
            speed_text,
        }),
        EngineEvent::Finished { path } => final_path = Some(path),
        EngineEvent::Failed { message } => warn!("{}", message),
    })?;

    let Some(path) = final_path else {
        warn!("{} finished without reporting a file; not recorded", request.url);
        return Ok(None);
    };

    let size = std::fs::metadata(&path)?.len();
    let entry = HistoryEntry::new(
        &request.url,
        &title,
        &path,
        request.quality.label(),
        size,
    );
    history
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .append(entry.clone());
    info!("Saved {} ({} MB)", path.display(), entry.size_mb);

    Ok(Some(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QualityPreset;
    use std::cell::RefCell;
    use std::fs::File;
    use std::path::Path;
    use std::time::{Duration, Instant};

    struct FakeEngine {
        file: PathBuf,
        size: u64,
        script: Vec<EngineEvent>,
        fail_with: Option<String>,
        panic_on_download: bool,
        delay: Duration,
        configs: Mutex<Vec<DownloadConfig>>,
    }

    impl FakeEngine {
        fn new(file: PathBuf, size: u64) -> Self {
            let script = vec![
                EngineEvent::Progress {
                    percent_text: "50.0%".into(),
                    speed_text: "1.00MiB/s".into(),
                },
                EngineEvent::Finished { path: file.clone() },
            ];
            Self {
                file,
                size,
                script,
                fail_with: None,
                panic_on_download: false,
                delay: Duration::ZERO,
                configs: Mutex::new(Vec::new()),
            }
        }
    }

    impl Extractor for FakeEngine {
        fn probe_title(&self, _url: &str) -> Result<String> {
            Ok("My Video".to_string())
        }

        fn download(
            &self,
            _url: &str,
            config: &DownloadConfig,
            on_event: &mut dyn FnMut(EngineEvent),
        ) -> Result<()> {
            self.configs.lock().unwrap().push(config.clone());
            thread::sleep(self.delay);
            if self.panic_on_download {
                panic!("engine blew up mid-transfer");
            }
            if let Some(stderr) = &self.fail_with {
                return Err(AppError::ExtractorFailed {
                    program: "fake".into(),
                    code: Some(1),
                    stderr: stderr.clone(),
                });
            }
            File::create(&self.file)?.set_len(self.size)?;
            for event in &self.script {
                on_event(event.clone());
            }
            Ok(())
        }
    }

    fn state_for(dir: &Path, quality: QualityPreset) -> AppState {
        AppState {
            url: "https://example.com/video".into(),
            download_dir: dir.to_string_lossy().to_string(),
            quality,
            ffmpeg_available: true,
            ..Default::default()
        }
    }

    fn store(dir: &Path) -> Arc<Mutex<HistoryStore>> {
        Arc::new(Mutex::new(HistoryStore::load(dir.join("history.json"))))
    }

    fn no_repaint() -> Repaint {
        Arc::new(|| {})
    }

    fn wait_for(downloader: &mut Downloader, state: &mut AppState) -> Outcome {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(outcome) = downloader.poll(state) {
                return outcome;
            }
            assert!(Instant::now() < deadline, "download never finished");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn completed_720p_download_is_recorded() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out");
        std::fs::create_dir(&out).unwrap();
        let file = out.join("My Video.mp4");

        let engine = Arc::new(FakeEngine::new(file.clone(), 10_485_760));
        let history = store(tmp.path());
        let mut downloader = Downloader::new(engine.clone(), history.clone());
        let mut state = state_for(&out, QualityPreset::P720);

        downloader.start(&mut state, no_repaint()).unwrap();
        assert!(state.is_downloading);
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.status, STATUS_STARTING);

        let entry = match wait_for(&mut downloader, &mut state) {
            Outcome::Succeeded(Some(entry)) => entry,
            other => panic!("unexpected outcome {other:?}"),
        };
        assert_eq!(entry.size_mb, 10.0);
        assert_eq!(entry.quality, "720p");
        assert_eq!(entry.title, "My Video");
        assert_eq!(PathBuf::from(&entry.filename), file);

        assert!(!state.is_downloading);
        assert!(!downloader.is_busy());
        assert_eq!(state.progress, 50.0);
        assert_eq!(state.status, STATUS_DONE);
        assert_eq!(state.output_path, Some(file));

        let history = history.lock().unwrap();
        assert_eq!(history.list(), &[entry]);
        assert_eq!(
            HistoryStore::load(history.path()).list(),
            history.list()
        );

        let configs = engine.configs.lock().unwrap();
        assert_eq!(configs[0].format, "best[height<=720]");
        assert!(configs[0].no_playlist);
    }

    #[test]
    fn empty_url_never_starts_a_worker() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new(tmp.path().join("x.mp4"), 1));
        let history = store(tmp.path());
        let mut downloader = Downloader::new(engine.clone(), history.clone());
        let mut state = state_for(tmp.path(), QualityPreset::P720);
        state.url = String::new();

        let err = downloader.start(&mut state, no_repaint()).unwrap_err();
        assert!(matches!(err, AppError::EmptyUrl));
        assert!(err.is_validation());
        assert!(!downloader.is_busy());
        assert!(!state.is_downloading);
        assert!(downloader.poll(&mut state).is_none());
        assert!(engine.configs.lock().unwrap().is_empty());
        assert!(history.lock().unwrap().is_empty());
    }

    #[test]
    fn engine_failure_reenables_control_and_records_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut engine = FakeEngine::new(tmp.path().join("x.mp4"), 1);
        engine.fail_with = Some("ERROR: Video unavailable".into());
        let history = store(tmp.path());
        let mut downloader = Downloader::new(Arc::new(engine), history.clone());
        let mut state = state_for(tmp.path(), QualityPreset::Best);

        downloader.start(&mut state, no_repaint()).unwrap();
        assert!(state.is_downloading);

        let outcome = wait_for(&mut downloader, &mut state);
        assert!(matches!(outcome, Outcome::Failed(ref m) if m.contains("Video unavailable")));
        assert!(!state.is_downloading);
        assert!(state.status.starts_with("Error:"));
        assert!(state.last_error.is_some());
        assert!(history.lock().unwrap().is_empty());
    }

    #[test]
    fn worker_panic_is_reported_as_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let mut engine = FakeEngine::new(tmp.path().join("x.mp4"), 1);
        engine.panic_on_download = true;
        let history = store(tmp.path());
        let mut downloader = Downloader::new(Arc::new(engine), history.clone());
        let mut state = state_for(tmp.path(), QualityPreset::Best);

        downloader.start(&mut state, no_repaint()).unwrap();
        assert!(downloader.is_busy());

        let outcome = wait_for(&mut downloader, &mut state);
        assert!(matches!(outcome, Outcome::Failed(ref m) if m.contains("stopped unexpectedly")));
        assert!(!state.is_downloading);
        assert!(!downloader.is_busy());
        assert!(state.last_error.is_some());
        assert!(history.lock().unwrap().is_empty());
    }

    #[test]
    fn second_start_while_running_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let mut engine = FakeEngine::new(tmp.path().join("slow.mp4"), 1024);
        engine.delay = Duration::from_millis(200);
        let history = store(tmp.path());
        let mut downloader = Downloader::new(Arc::new(engine), history.clone());
        let mut state = state_for(tmp.path(), QualityPreset::P480);

        let first = downloader.start(&mut state, no_repaint()).unwrap();
        assert!(matches!(
            downloader.start(&mut state, no_repaint()),
            Err(AppError::Busy)
        ));
        assert!(downloader.is_busy());

        wait_for(&mut downloader, &mut state);
        assert_eq!(history.lock().unwrap().list().len(), 1);

        let second = downloader.start(&mut state, no_repaint()).unwrap();
        assert!(second > first);
        wait_for(&mut downloader, &mut state);
        assert_eq!(history.lock().unwrap().list().len(), 2);
    }

    #[test]
    fn audio_only_download_asks_for_mp3() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = FakeEngine::new(tmp.path().join("song.mp3"), 2048);
        let history = Mutex::new(HistoryStore::load(tmp.path().join("h.json")));
        let request = DownloadRequest::new(
            "https://example.com/video",
            tmp.path().to_string_lossy(),
            QualityPreset::AudioMp3,
        );

        let entry = run_download(&engine, &request, true, &history, &|_| {})
            .unwrap()
            .unwrap();
        assert_eq!(entry.quality, "Audio Only (MP3)");

        let configs = engine.configs.lock().unwrap();
        let pp = configs[0].post_processor.as_ref().unwrap();
        assert_eq!(pp.codec, "mp3");
        assert_eq!(pp.bitrate_kbps, 192);
    }

    #[test]
    fn merge_preset_without_ffmpeg_warns_but_proceeds() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = FakeEngine::new(tmp.path().join("hd.mp4"), 4096);
        let history = Mutex::new(HistoryStore::load(tmp.path().join("h.json")));
        let request = DownloadRequest::new(
            "https://example.com/video",
            tmp.path().to_string_lossy(),
            QualityPreset::P1080,
        );

        let seen = RefCell::new(Vec::new());
        let result = run_download(&engine, &request, false, &history, &|e| {
            seen.borrow_mut().push(e)
        });
        assert!(result.unwrap().is_some());
        assert!(seen
            .borrow()
            .contains(&WorkerEvent::Status(MERGE_WARNING.to_string())));

        let seen = RefCell::new(Vec::new());
        run_download(&engine, &request, true, &history, &|e| seen.borrow_mut().push(e)).unwrap();
        assert!(!seen
            .borrow()
            .contains(&WorkerEvent::Status(MERGE_WARNING.to_string())));
    }

    #[test]
    fn download_without_final_path_records_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut engine = FakeEngine::new(tmp.path().join("x.mp4"), 1);
        engine.script.retain(|e| !matches!(e, EngineEvent::Finished { .. }));
        let history = Mutex::new(HistoryStore::load(tmp.path().join("h.json")));
        let request = DownloadRequest::new(
            "https://example.com/video",
            tmp.path().to_string_lossy(),
            QualityPreset::Best,
        );

        let result = run_download(&engine, &request, true, &history, &|_| {}).unwrap();
        assert!(result.is_none());
        assert!(history.lock().unwrap().is_empty());
    }

    #[test]
    fn unparsable_progress_leaves_bar_alone() {
        let mut state = AppState {
            progress: 42.0,
            ..Default::default()
        };
        let outcome = apply_event(
            &mut state,
            WorkerEvent::Progress {
                percent: parse_percent("N/A"),
                percent_text: "N/A".into(),
                speed_text: "Unknown B/s".into(),
            },
        );
        assert!(outcome.is_none());
        assert_eq!(state.progress, 42.0);
        assert_eq!(state.status, "N/A complete - Unknown B/s");

        apply_event(
            &mut state,
            WorkerEvent::Progress {
                percent: parse_percent("250%"),
                percent_text: "250%".into(),
                speed_text: String::new(),
            },
        );
        assert_eq!(state.progress, 42.0);
    }

    #[test]
    fn later_finished_event_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let converted = tmp.path().join("song.mp3");
        let mut engine = FakeEngine::new(converted.clone(), 512);
        engine.script = vec![
            EngineEvent::Finished {
                path: tmp.path().join("song.webm"),
            },
            EngineEvent::Failed {
                message: "ERROR: harmless".into(),
            },
            EngineEvent::Finished {
                path: converted.clone(),
            },
        ];
        let history = Mutex::new(HistoryStore::load(tmp.path().join("h.json")));
        let request = DownloadRequest::new(
            "https://example.com/video",
            tmp.path().to_string_lossy(),
            QualityPreset::AudioMp3,
        );

        let entry = run_download(&engine, &request, true, &history, &|_| {})
            .unwrap()
            .unwrap();
        assert_eq!(PathBuf::from(entry.filename), converted);
    }
}
