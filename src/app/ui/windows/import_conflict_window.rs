// src/app/ui/windows/import_conflict_window.rs
// Contains the drawing function for the "file already exists" prompt of a local model import.

use crate::app::import::{Collision, ImportDecision, PendingImport};
use egui::{Align2, Context, Layout, RichText, Window};

// Asks what to do with a picked file whose name is already taken.
// Closing the window counts as Cancel. Returns None while waiting.
pub fn draw_import_conflict_window(ctx: &Context, pending: &PendingImport) -> Option<ImportDecision> {
    let Collision::Conflict(existing) = &pending.collision else {
        return None;
    };
    let file_name = existing
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| existing.display().to_string());

    let mut decision = None;
    let mut open = true;
    Window::new("File Already Exists")
        .collapsible(false)
        .resizable(false)
        .open(&mut open)
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label(format!(
                "A file named '{}' already exists in your local models. What would you like to do?",
                file_name
            ));
            ui.label(RichText::new(format!("Importing from {}", pending.source.display())).small().weak());
            ui.add_space(10.0);
            ui.with_layout(Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Replace").on_hover_text("Overwrite the existing file").clicked() {
                    decision = Some(ImportDecision::Replace);
                }
                if ui.button("Keep Both").on_hover_text("Save under a new name").clicked() {
                    decision = Some(ImportDecision::KeepBoth);
                }
                if ui.button("Cancel").clicked() {
                    decision = Some(ImportDecision::Cancel);
                }
            });
        });

    if !open && decision.is_none() {
        decision = Some(ImportDecision::Cancel);
    }
    decision
}
