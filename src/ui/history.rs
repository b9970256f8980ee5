use eframe::egui;

use crate::history::{sorted_indices, HistoryColumn, HistoryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    /// Open the folder holding the entry at this index.
    OpenLocation(usize),
    Clear,
}

/// Table state for the history window. Indices refer to insertion order.
#[derive(Debug, Default)]
pub struct HistoryView {
    pub sort: Option<(HistoryColumn, bool)>,
    pub selected: Option<usize>,
}

impl HistoryView {
    /// First click sorts ascending, the next on the same column flips it.
    pub fn toggle_sort(&mut self, column: HistoryColumn) {
        self.sort = match self.sort {
            Some((current, descending)) if current == column => Some((column, !descending)),
            _ => Some((column, false)),
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn show(&mut self, ui: &mut egui::Ui, entries: &[HistoryEntry]) -> Option<HistoryAction> {
        let mut action = None;
        let mut sort_clicked = None;

        if self.selected.is_some_and(|i| i >= entries.len()) {
            self.selected = None;
        }

        let table_height = (ui.available_height() - 48.0).max(120.0);
        egui::ScrollArea::both()
            .max_height(table_height)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                egui::Grid::new("history_table")
                    .striped(true)
                    .num_columns(HistoryColumn::ALL.len())
                    .spacing([16.0, 6.0])
                    .show(ui, |ui| {
                        for column in HistoryColumn::ALL {
                            let marker = match self.sort {
                                Some((c, true)) if c == column => " ▼",
                                Some((c, false)) if c == column => " ▲",
                                _ => "",
                            };
                            let heading =
                                egui::RichText::new(format!("{}{}", column.heading(), marker))
                                    .strong();
                            if ui.add(egui::Button::new(heading).frame(false)).clicked() {
                                sort_clicked = Some(column);
                            }
                        }
                        ui.end_row();

                        for index in sorted_indices(entries, self.sort) {
                            let entry = &entries[index];
                            let selected = self.selected == Some(index);
                            if ui.selectable_label(selected, &entry.date).clicked() {
                                self.selected = Some(index);
                            }
                            ui.label(&entry.title);
                            ui.label(&entry.quality);
                            ui.label(format!("{:.2}", entry.size_mb));
                            ui.label(&entry.filename);
                            ui.end_row();
                        }
                    });
            });

        if let Some(column) = sort_clicked {
            self.toggle_sort(column);
        }

        ui.separator();
        ui.horizontal(|ui| {
            let open = ui.add_enabled(
                self.selected.is_some(),
                egui::Button::new("Open File Location"),
            );
            if open.clicked() {
                action = self.selected.map(HistoryAction::OpenLocation);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Clear History").clicked() {
                    action = Some(HistoryAction::Clear);
                }
            });
        });

        action
    }
}
