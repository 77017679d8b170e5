// src/app/ui/windows/confirmation_window.rs
// Contains the drawing function for yes/no confirmation windows (delete model, reset models, clear history).

use egui::{Align2, Color32, Context, Layout, RichText, Window};

// --- Window Drawing Function ---

// Draws a modal confirmation dialog.
//
// # Returns
//
// * Some(true) if the user confirmed.
// * Some(false) if the user cancelled (or closed the window).
// * None while the dialog is still waiting.
pub fn draw_confirmation_window(ctx: &Context, title: &str, message: &str, confirm_label: &str) -> Option<bool> {
    let mut result: Option<bool> = None;
    let mut open = true;

    Window::new(title)
        .collapsible(false)
        .resizable(false)
        .open(&mut open)
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label(message);
            ui.add_space(10.0);
            ui.horizontal(|ui| {
                ui.with_layout(Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.add_space(10.0);
                    if ui.button(RichText::new(confirm_label).color(Color32::RED)).clicked() {
                        result = Some(true);
                    }
                    ui.add_space(10.0);
                    if ui.button("Cancel").clicked() {
                        result = Some(false);
                    }
                });
            });
        });

    if !open && result.is_none() {
        result = Some(false);
    }
    result
}
