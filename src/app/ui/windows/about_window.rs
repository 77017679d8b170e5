// src/app/ui/windows/about_window.rs
// Contains the drawing function for the About window.

// --- Necessary imports ---
use crate::app::{config::APP_NAME, utils::version_string, LlamaNestApp};
use egui::{Align2, Context, RichText, Window};
use log::info;

// --- Window Drawing Function ---

// Draws the "About" window. Clicking the version copies it to the clipboard.
pub fn draw_about_window(app: &mut LlamaNestApp, ctx: &Context) {
    let mut about_window_open = app.show_about_window;
    let mut close_button_clicked = false;
    let version = version_string();

    Window::new(format!("About {}", APP_NAME))
        .open(&mut about_window_open)
        .collapsible(false)
        .resizable(false)
        .default_size(egui::vec2(340.0, 260.0))
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(16.0);
                ui.heading(APP_NAME);
                ui.label("Run language models on your own machine.");
                ui.add_space(10.0);

                if ui
                    .link(RichText::new(&version).monospace())
                    .on_hover_text("Copy to clipboard")
                    .clicked()
                {
                    ctx.copy_text(version.clone());
                    info!("Copied '{}' to clipboard.", version);
                }
                ui.add_space(15.0);

                ui.horizontal(|ui| {
                    ui.centered_and_justified(|ui| {
                        ui.label("Source code on");
                        ui.hyperlink_to("GitHub", "https://github.com/unbraind/LlamaNest");
                    });
                });
                ui.horizontal(|ui| {
                    ui.centered_and_justified(|ui| {
                        ui.label("Models from");
                        ui.hyperlink_to("Hugging Face", "https://huggingface.co/models?library=gguf");
                    });
                });

                ui.add_space(20.0);
                if ui.button("Close").clicked() {
                    close_button_clicked = true;
                }
            });
            ui.add_space(10.0);
        });

    // --- Post-Window Logic ---
    if close_button_clicked {
        about_window_open = false;
    }
    app.show_about_window = about_window_open;
}
