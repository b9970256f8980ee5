use eframe::egui;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::AppConfig;
use crate::download::{tool_available, YtDlp};
use crate::error::AppError;
use crate::history::HistoryStore;
use crate::models::AppState;
use crate::orchestrator::{Downloader, Outcome};
use crate::shell::{self, FFMPEG_DOWNLOAD_PAGE};
use crate::theme::*;
use crate::ui::{self, dialogs, HistoryAction, HistoryView};

const FFMPEG_HELP: &str = "FFmpeg is required for downloading 4K and 1080p videos with separate video/audio tracks.\n\n\
To install FFmpeg:\n\
1. Download from the official website\n\
2. Add it to your system PATH\n\n\
Would you like to open the FFmpeg download page?";

pub struct YtdlApp {
    pub state: AppState,
    downloader: Downloader,
    history_view: HistoryView,
}

impl YtdlApp {
    pub fn new(config: &AppConfig) -> Self {
        let history = HistoryStore::load(&config.history_path);
        let engine = Arc::new(YtDlp::new(config.ytdlp_program.clone()));

        let ffmpeg_available = tool_available(&config.ffmpeg_program);
        if ffmpeg_available {
            info!("{} found", config.ffmpeg_program);
        } else {
            warn!("{} not found on PATH", config.ffmpeg_program);
        }

        let state = AppState {
            download_dir: config.download_dir.to_string_lossy().to_string(),
            ffmpeg_available,
            status: "Ready".to_string(),
            ..Default::default()
        };

        Self {
            state,
            downloader: Downloader::new(engine, Arc::new(Mutex::new(history))),
            history_view: HistoryView::default(),
        }
    }

    pub fn start_download(&mut self, ctx: &egui::Context) {
        let repaint_ctx = ctx.clone();
        let repaint = Arc::new(move || repaint_ctx.request_repaint());

        match self.downloader.start(&mut self.state, repaint) {
            Ok(_) => ctx.request_repaint(),
            // The button is already disabled; a stray Enter press lands here.
            Err(AppError::Busy) => {}
            Err(e) => {
                if !e.is_validation() {
                    error!("Could not start download: {}", e);
                }
                dialogs::show_error(&e.to_string());
            }
        }
    }

    fn process_status_updates(&mut self) {
        match self.downloader.poll(&mut self.state) {
            Some(Outcome::Succeeded(_)) => {
                if dialogs::confirm(
                    "Success",
                    "Video downloaded successfully!\nWould you like to open the download location?",
                ) {
                    self.open_download_folder();
                }
            }
            Some(Outcome::Failed(message)) => {
                dialogs::show_error(&format!("An error occurred:\n{}", message));
            }
            None => {}
        }
    }

    fn open_download_folder(&self) {
        let folder = PathBuf::from(self.state.download_dir.trim());
        if let Err(e) = shell::open_folder(&folder) {
            dialogs::show_error(&e.to_string());
        }
    }

    fn show_history(&mut self) {
        let empty = self
            .downloader
            .history()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty();
        if empty {
            dialogs::show_info("Download History", "No download history available");
        } else {
            self.state.show_history = true;
        }
    }

    fn install_ffmpeg(&self) {
        if dialogs::confirm("FFmpeg Required", FFMPEG_HELP) {
            if let Err(e) = shell::open_url(FFMPEG_DOWNLOAD_PAGE) {
                dialogs::show_error(&e.to_string());
            }
        }
    }

    fn handle_history_action(&mut self, action: HistoryAction) {
        match action {
            HistoryAction::OpenLocation(index) => {
                let folder = self
                    .downloader
                    .history()
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .list()
                    .get(index)
                    .and_then(|entry| entry.containing_folder());

                match folder {
                    Some(folder) if folder.is_dir() => {
                        if let Err(e) = shell::open_folder(&folder) {
                            dialogs::show_error(&e.to_string());
                        }
                    }
                    _ => dialogs::show_error("Directory no longer exists"),
                }
            }
            HistoryAction::Clear => {
                if dialogs::confirm(
                    "Clear History",
                    "Are you sure you want to clear download history?",
                ) {
                    let mut store = self
                        .downloader
                        .history()
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    store.clear();
                    info!("Download history cleared ({})", store.path().display());
                    drop(store);
                    self.history_view.reset();
                    self.state.show_history = false;
                }
            }
        }
    }

    pub fn update_ui(&mut self, ctx: &egui::Context) {
        self.process_status_updates();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("YouTube Video Downloader");
            ui.add_space(16.0);

            let url_response = ui::render_url_input(ui, &mut self.state);
            if url_response.lost_focus()
                && ui.input(|i| i.key_pressed(egui::Key::Enter))
                && !self.downloader.is_busy()
            {
                self.start_download(ctx);
            }
            ui.add_space(10.0);

            ui::render_download_dir_selector(ui, &mut self.state);
            ui.add_space(10.0);

            ui::render_quality_selector(ui, &mut self.state);

            if !self.state.ffmpeg_available && ui::render_ffmpeg_warning(ui) {
                self.install_ffmpeg();
            }
            ui.add_space(16.0);

            ui::render_status(ui, &self.state);
            ui.add_space(16.0);

            self.render_buttons(ui, ctx);
        });

        self.render_history_window(ctx);
    }

    fn render_buttons(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let download = ui.add_enabled(!self.downloader.is_busy(), primary_button("Download"));
            if download.clicked() {
                self.start_download(ctx);
            }

            if ui.add(secondary_button("Open Download Folder")).clicked() {
                self.open_download_folder();
            }

            if ui.add(secondary_button("Download History")).clicked() {
                self.show_history();
            }
        });
    }

    fn render_history_window(&mut self, ctx: &egui::Context) {
        if !self.state.show_history {
            return;
        }

        let mut open = true;
        let mut action = None;
        let history = Arc::clone(self.downloader.history());
        let view = &mut self.history_view;

        egui::Window::new("Download History")
            .open(&mut open)
            .default_size([800.0, 400.0])
            .resizable(true)
            .show(ctx, |ui| {
                let store = history.lock().unwrap_or_else(PoisonError::into_inner);
                action = view.show(ui, store.list());
            });

        self.state.show_history = open;
        if let Some(action) = action {
            self.handle_history_action(action);
        }
    }
}

impl eframe::App for YtdlApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_ui(ctx);
    }
}
