// src/app/ui/windows/model_settings_window.rs
// Contains the drawing function for the per-model completion settings window.

use crate::app::{
    model::CHAT_TEMPLATES,
    state::PendingModelSettings,
    store::ModelRepository,
    ui::widgets::field_error,
    LlamaNestApp,
};
use egui::{Align2, Button, ComboBox, Context, DragValue, Grid, Slider, TextEdit, Window};
use log::{error, info};

// Draws the settings window of one model. Edits happen on a copy
// (app.pending_model_settings) until Save Changes.
pub fn draw_model_settings_window(app: &mut LlamaNestApp, ctx: &Context) {
    let Some(pending) = app.pending_model_settings.as_mut() else {
        return;
    };
    let model_name = app
        .store
        .get(&pending.model_id)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| pending.model_id.clone());

    let mut open = true;
    let mut reset_clicked = false;
    let mut cancel_clicked = false;
    let mut save_clicked = false;
    let errors = pending.to_settings().validate();

    Window::new(format!("{} Settings", model_name))
        .id(egui::Id::new("model_settings_window"))
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            let settings = &mut pending.settings;
            Grid::new("model_settings_grid")
                .num_columns(2)
                .spacing([30.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Chat template:");
                    ComboBox::from_id_salt("chat_template")
                        .selected_text(&settings.chat_template)
                        .show_ui(ui, |ui| {
                            for template in CHAT_TEMPLATES {
                                ui.selectable_value(&mut settings.chat_template, template.to_string(), template);
                            }
                        });
                    ui.end_row();

                    ui.label("Max tokens:").on_hover_text("-1 generates until the model stops");
                    ui.vertical(|ui| {
                        ui.add(DragValue::new(&mut settings.n_predict).range(-1..=32_768));
                        field_error(ui, errors.get("n_predict"));
                    });
                    ui.end_row();

                    ui.label("Temperature:");
                    ui.add(Slider::new(&mut settings.temperature, 0.0..=2.0));
                    ui.end_row();

                    ui.label("Top K:");
                    ui.vertical(|ui| {
                        ui.add(Slider::new(&mut settings.top_k, 1..=128));
                        field_error(ui, errors.get("top_k"));
                    });
                    ui.end_row();

                    ui.label("Top P:");
                    ui.add(Slider::new(&mut settings.top_p, 0.0..=1.0));
                    ui.end_row();

                    ui.label("Min P:");
                    ui.add(Slider::new(&mut settings.min_p, 0.0..=1.0));
                    ui.end_row();

                    ui.label("Repeat penalty:");
                    ui.add(Slider::new(&mut settings.penalty_repeat, 0.0..=2.0));
                    ui.end_row();

                    ui.label("Stop words:");
                    ui.vertical(|ui| {
                        ui.add(TextEdit::singleline(&mut pending.stop_text).hint_text("comma separated"));
                        field_error(ui, errors.get("stop"));
                    });
                    ui.end_row();
                });
            field_error(ui, errors.get("chat_template"));

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Reset").on_hover_text("Back to this model's defaults").clicked() {
                    reset_clicked = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel_clicked = true;
                }
                if ui.add_enabled(errors.is_empty(), Button::new("Save Changes")).clicked() {
                    save_clicked = true;
                }
            });
        });

    if reset_clicked {
        let model_id = pending.model_id.clone();
        match app.store.get(&model_id) {
            Some(model) => {
                info!("Reset settings form of '{}' to defaults.", model_id);
                app.pending_model_settings = Some(PendingModelSettings::new(
                    &model_id,
                    model.default_completion_settings.clone(),
                ));
            }
            None => {
                error!("Model '{}' disappeared while its settings were open.", model_id);
                app.pending_model_settings = None;
            }
        }
    } else if save_clicked {
        let model_id = pending.model_id.clone();
        let settings = pending.to_settings();
        if app.save_model_settings(&model_id, settings) {
            app.pending_model_settings = None;
        }
    } else if cancel_clicked || !open {
        app.pending_model_settings = None;
    }
}
