// src/app/ui/widgets.rs
// Contains drawing functions for reusable UI widgets, such as the log view content area.

use crate::app::LlamaNestApp;
use egui::{Align, Layout, RichText, ScrollArea, TextWrapMode, Ui};

// --- Widget Drawing Functions ---

// Draws the content area for the collapsible log view.
// This function is typically called within a CollapsingHeader.
pub fn draw_log_view_content(app: &mut LlamaNestApp, ui: &mut Ui) {
    ScrollArea::vertical()
        .stick_to_bottom(true)
        .auto_shrink([false, false])
        .max_height(200.0)
        .show(ui, |ui| {
            ui.with_layout(Layout::top_down(Align::LEFT), |ui| {
                ui.add(
                    egui::Label::new(RichText::new(&app.logs_string_cache).monospace())
                        .wrap_mode(TextWrapMode::Extend),
                );
            });
        });
}

/// Red text for a field error, nothing when the field is fine.
pub fn field_error(ui: &mut Ui, error: Option<&String>) {
    if let Some(message) = error {
        ui.colored_label(ui.visuals().error_fg_color, message);
    }
}
