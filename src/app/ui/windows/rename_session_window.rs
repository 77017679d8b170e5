// src/app/ui/windows/rename_session_window.rs
// Contains the drawing function for the session rename window.

use egui::{Align2, Button, Context, Key, TextEdit, Window};

// Edits `title` in place. Returns Some(true) on Save, Some(false) on Cancel/close, None while open.
pub fn draw_rename_session_window(ctx: &Context, title: &mut String) -> Option<bool> {
    let mut result = None;
    let mut open = true;

    Window::new("Rename Chat")
        .collapsible(false)
        .resizable(false)
        .open(&mut open)
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            let response = ui.add(TextEdit::singleline(title).hint_text("Chat title"));
            let valid = !title.trim().is_empty();
            if !valid {
                ui.colored_label(ui.visuals().error_fg_color, "Title cannot be empty.");
            }
            let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.add_enabled(valid, Button::new("Save")).clicked() || (valid && submitted) {
                    result = Some(true);
                }
                if ui.button("Cancel").clicked() {
                    result = Some(false);
                }
            });
        });

    if !open && result.is_none() {
        result = Some(false);
    }
    result
}
