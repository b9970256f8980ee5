use eframe::egui;
use rfd::FileDialog;
use std::path::Path;

use crate::models::{AppState, QualityPreset};
use crate::theme::*;

pub mod dialogs;
pub mod history;

pub use history::{HistoryAction, HistoryView};

pub fn render_url_input(ui: &mut egui::Ui, state: &mut AppState) -> egui::Response {
    ui.label("Enter video URL:");

    egui::Frame::group(ui.style())
        .fill(INPUT_BG)
        .stroke(egui::Stroke::new(1.0, egui::Color32::LIGHT_GRAY))
        .rounding(ROUNDING_FRAME)
        .show(ui, |ui| {
            ui.add_sized(
                [ui.available_width(), 32.0],
                egui::TextEdit::singleline(&mut state.url)
                    .hint_text("https://...")
                    .font(egui::FontId::proportional(15.0)),
            )
        })
        .inner
}

/// Directory field plus Browse button.
pub fn render_download_dir_selector(ui: &mut egui::Ui, state: &mut AppState) {
    ui.label("Save Location:");
    ui.horizontal(|ui| {
        ui.add_sized(
            [ui.available_width() - 100.0, 32.0],
            egui::TextEdit::singleline(&mut state.download_dir)
                .hint_text("Select download directory")
                .margin(egui::vec2(8.0, 8.0)),
        );

        let browse = egui::Button::new(egui::RichText::new("Browse").size(14.0))
            .min_size(egui::vec2(90.0, 32.0))
            .rounding(ROUNDING_FRAME);

        if ui.add(browse).clicked() {
            let start = Path::new(state.download_dir.trim());
            let start = if start.is_dir() {
                start
            } else {
                start.parent().unwrap_or_else(|| Path::new("."))
            };
            if let Some(path) = FileDialog::new().set_directory(start).pick_folder() {
                state.download_dir = path.to_string_lossy().to_string();
            }
        }
    });
}

pub fn render_quality_selector(ui: &mut egui::Ui, state: &mut AppState) {
    ui.label("Video Quality:");
    egui::ComboBox::from_id_source("quality_preset")
        .selected_text(state.quality.label())
        .width(ui.available_width())
        .show_ui(ui, |ui| {
            for preset in QualityPreset::ALL {
                ui.selectable_value(&mut state.quality, preset, preset.label());
            }
        });
}

/// Shown only when ffmpeg is missing. Returns true when "Install FFmpeg" is clicked.
pub fn render_ffmpeg_warning(ui: &mut egui::Ui) -> bool {
    let mut clicked = false;
    ui.horizontal(|ui| {
        ui.label(
            egui::RichText::new("⚠ FFmpeg not detected. 4K/1080p quality may not work correctly.")
                .color(TEXT_WARNING),
        );
        clicked = ui.button("Install FFmpeg").clicked();
    });
    clicked
}

pub fn render_status(ui: &mut egui::Ui, state: &AppState) {
    egui::Frame::group(ui.style())
        .fill(STATUS_BG)
        .rounding(8.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.vertical(|ui| {
                ui.add_space(6.0);

                let progress_bar = egui::ProgressBar::new(state.progress / 100.0)
                    .show_percentage()
                    .animate(state.is_downloading && state.progress <= 0.0);
                ui.add(progress_bar);

                ui.add_space(6.0);
                let color = if state.last_error.is_some() {
                    TEXT_ERROR
                } else if state.output_path.is_some() && !state.is_downloading {
                    TEXT_SUCCESS
                } else {
                    TEXT_STATUS
                };
                ui.label(egui::RichText::new(&state.status).color(color));

                if let Some(path) = &state.output_path {
                    ui.add_space(4.0);
                    ui.label(format!("Saved to: {}", path.display()));
                }

                ui.add_space(6.0);
            });
        });
}
