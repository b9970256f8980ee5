use eframe::egui::{self, Color32, RichText, Stroke};

// Buttons
pub const PRIMARY_BUTTON_BG: Color32 = Color32::from_rgb(74, 144, 226);
pub const SECONDARY_BUTTON_BG: Color32 = Color32::from_rgb(225, 225, 228);
pub const BUTTON_MAIN_TEXT: Color32 = Color32::WHITE;
pub const BUTTON_SECONDARY_TEXT: Color32 = Color32::from_rgb(36, 36, 36);

// Text
pub const TEXT_ERROR: Color32 = Color32::from_rgb(200, 30, 30);
pub const TEXT_WARNING: Color32 = Color32::from_rgb(200, 40, 40);
pub const TEXT_SUCCESS: Color32 = Color32::from_rgb(30, 140, 60);
pub const TEXT_STATUS: Color32 = Color32::DARK_GRAY;

// Surfaces
pub const INPUT_BG: Color32 = Color32::from_rgb(250, 250, 250);
pub const STATUS_BG: Color32 = Color32::from_rgb(248, 248, 248);
pub const BORDER_COLOR: Color32 = Color32::from_rgba_premultiplied(60, 60, 67, 15);

// Sizing
pub const ROUNDING_FRAME: f32 = 4.0;
pub const ROUNDING_BUTTON: f32 = 6.0;
pub const MIN_SIZE_BUTTON: egui::Vec2 = egui::Vec2::new(150.0, 40.0);
pub const BUTTON_FONT_SIZE: f32 = 15.0;

pub fn primary_button(text: &str) -> egui::Button<'static> {
    button(text, PRIMARY_BUTTON_BG, BUTTON_MAIN_TEXT)
}

pub fn secondary_button(text: &str) -> egui::Button<'static> {
    button(text, SECONDARY_BUTTON_BG, BUTTON_SECONDARY_TEXT)
}

fn button(text: &str, fill: Color32, text_color: Color32) -> egui::Button<'static> {
    egui::Button::new(
        RichText::new(text)
            .size(BUTTON_FONT_SIZE)
            .color(text_color),
    )
    .min_size(MIN_SIZE_BUTTON)
    .fill(fill)
    .rounding(ROUNDING_BUTTON)
    .stroke(Stroke::new(1.0, BORDER_COLOR))
}
