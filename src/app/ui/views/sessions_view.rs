// src/app/ui/views/sessions_view.rs
// Contains the UI drawing function for the chat sessions sidebar.

use crate::app::{state::SessionAction, LlamaNestApp};
use chrono::Utc;
use egui::{Button, RichText, ScrollArea, Ui};

// Draws the sidebar: sessions grouped by date label, newest first.
// Right-click a session to rename or delete it.
pub fn draw_sessions_view(app: &mut LlamaNestApp, ui: &mut Ui) -> Vec<SessionAction> {
    let mut actions = Vec::new();

    ui.horizontal(|ui| {
        ui.heading("Chats");
        if ui.button("+ New").clicked() {
            actions.push(SessionAction::New);
        }
    });
    ui.separator();

    let tz = app.settings.timezone();
    let groups = app.sessions.grouped_sessions(Utc::now(), tz);
    let active = app.sessions.active_session_id();

    ScrollArea::vertical()
        .auto_shrink([false, true])
        .max_height((ui.available_height() - 36.0).max(60.0))
        .show(ui, |ui| {
            if groups.is_empty() {
                ui.label(RichText::new("No chats yet.").weak());
            }
            for group in &groups {
                ui.label(RichText::new(&group.label).small().weak());
                for session in &group.sessions {
                    let selected = active == Some(session.id.as_str());
                    let response = ui.selectable_label(selected, &session.title);
                    if response.clicked() {
                        actions.push(SessionAction::Select(session.id.clone()));
                    }
                    response.context_menu(|ui| {
                        if ui.button("Rename").clicked() {
                            actions.push(SessionAction::StartRename(session.id.clone()));
                            ui.close_menu();
                        }
                        if ui.button("Delete").clicked() {
                            actions.push(SessionAction::Delete(session.id.clone()));
                            ui.close_menu();
                        }
                    });
                }
                ui.add_space(6.0);
            }
        });

    ui.separator();
    let has_sessions = !app.sessions.sessions().is_empty();
    if ui.add_enabled(has_sessions, Button::new("Clear history")).clicked() {
        actions.push(SessionAction::ConfirmClear);
    }

    actions
}
