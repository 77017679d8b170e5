// src/app/ui/views/models_view.rs
// Contains the UI drawing function for the Models view: filter chips, grouped model list and model cards.

// --- Necessary imports ---
use crate::app::{
    grouping::{compute_display_groups, default_category, ModelFilter, ModelGroup},
    model::{Model, DEFAULT_MODEL_ID},
    state::ModelAction,
    store::{LocalModelStore, ModelRepository},
    utils::{format_model_stats, format_size},
    LlamaNestApp,
};
use egui::{
    Align, Button, CollapsingHeader, Color32, Frame, Key, Layout, ProgressBar, RichText, ScrollArea, TextEdit, Ui,
};

// --- View Drawing Function ---

// Draws the Models view. Nothing is mutated here apart from the text field;
// clicks come back as `ModelAction`s for the app to apply after the frame.
pub fn draw_models_view(app: &mut LlamaNestApp, ui: &mut Ui) -> Vec<ModelAction> {
    let mut actions = Vec::new();

    ui.horizontal(|ui| {
        ui.heading("Models");
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui.button("Reset").on_hover_text("Restore default model settings").clicked() {
                actions.push(ModelAction::ConfirmReset);
            }
            if ui.button("Refresh").on_hover_text("Re-check files on disk").clicked() {
                actions.push(ModelAction::Refresh);
            }
            if ui.button("Import File...").on_hover_text("Or drop a file onto the window").clicked() {
                actions.push(ModelAction::PickFile);
            }
        });
    });

    // Filter chips
    ui.horizontal(|ui| {
        for filter in ModelFilter::all() {
            let selected = app.settings.models_screen.filters.contains(filter);
            if ui.selectable_label(selected, filter.label()).clicked() {
                actions.push(ModelAction::ToggleFilter(filter));
            }
        }
    });

    ui.horizontal(|ui| {
        ui.label("Add from Hugging Face:");
        let response = ui.add(
            TextEdit::singleline(&mut app.hf_model_input)
                .hint_text("author/repo/file.gguf")
                .desired_width(320.0),
        );
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
        if ui.button("Add").clicked() || submitted {
            actions.push(ModelAction::AddHfModel);
        }
    });
    ui.separator();

    let store = &app.store;
    let active_id = store.active_model_id();
    let expanded_groups = &app.settings.models_screen.expanded_groups;
    let groups = compute_display_groups(
        store.models(),
        &app.settings.models_screen.filters,
        active_id,
        DEFAULT_MODEL_ID,
        default_category,
    );

    ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
        if groups.is_empty() {
            ui.label("No models match the active filters.");
            return;
        }
        for group in &groups {
            let title = format!("{} ({})", group.key.display_name(), group.models.len());
            if group.key.is_collapsible() {
                let response = CollapsingHeader::new(title)
                    .id_salt(group.key.storage_key())
                    .open(Some(expanded_groups.is_expanded(&group.key)))
                    .show(ui, |ui| draw_group_cards(ui, group, store, active_id, &mut actions));
                if response.header_response.clicked() {
                    actions.push(ModelAction::ToggleGroup(group.key.clone()));
                }
            } else {
                ui.label(RichText::new(title).strong());
                draw_group_cards(ui, group, store, active_id, &mut actions);
            }
            ui.add_space(6.0);
        }
    });

    actions
}

fn draw_group_cards(
    ui: &mut Ui,
    group: &ModelGroup<'_>,
    store: &LocalModelStore,
    active_id: Option<&str>,
    actions: &mut Vec<ModelAction>,
) {
    for model in &group.models {
        let is_active = active_id == Some(model.id.as_str());
        draw_model_card(ui, model, store, is_active, actions);
    }
}

fn draw_model_card(
    ui: &mut Ui,
    model: &Model,
    store: &LocalModelStore,
    is_active: bool,
    actions: &mut Vec<ModelAction>,
) {
    Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.label(RichText::new(&model.name).strong())
                .on_hover_text(store.model_path(model).display().to_string());
            if model.is_local_file() {
                ui.label(RichText::new("LOCAL").small().weak());
            } else if model.is_hf() {
                ui.label(RichText::new("HF").small().weak());
            }
            if is_active {
                ui.label(RichText::new("Active").color(Color32::from_rgb(80, 180, 80)));
            }
        });
        ui.label(RichText::new(format_model_stats(model.size, model.params)).small().weak());
        if !model.description.is_empty() {
            ui.label(&model.description);
        }

        let downloading = store.is_downloading(&model.id);
        if let Some(progress) = store.download_progress(&model.id) {
            let bar = if model.size > 0 {
                let done = (model.size as f64 * progress as f64) as u64;
                ProgressBar::new(progress).text(format!("{} of {}", format_size(done), format_size(model.size)))
            } else {
                ProgressBar::new(progress).show_percentage()
            };
            ui.add(bar);
        }

        ui.horizontal(|ui| {
            if downloading {
                if ui.button("Cancel").clicked() {
                    actions.push(ModelAction::CancelDownload(model.id.clone()));
                }
            } else if model.is_downloaded {
                if is_active {
                    if ui.button("Unload").clicked() {
                        actions.push(ModelAction::Unload);
                    }
                } else if ui.button("Load").clicked() {
                    actions.push(ModelAction::Load(model.id.clone()));
                }
                if ui.button(RichText::new("Delete").color(Color32::RED)).clicked() {
                    actions.push(ModelAction::ConfirmDelete(model.id.clone()));
                }
            } else {
                let can_download = !model.download_url.is_empty();
                if ui.add_enabled(can_download, Button::new("Download")).clicked() {
                    actions.push(ModelAction::Download(model.id.clone()));
                }
                if model.is_hf() && ui.button("Remove").clicked() {
                    actions.push(ModelAction::RemoveFromList(model.id.clone()));
                }
            }
            if ui.button("Settings").clicked() {
                actions.push(ModelAction::OpenSettings(model.id.clone()));
            }
            if !model.hf_url.is_empty() {
                ui.hyperlink_to("Hub page", &model.hf_url);
            }
        });
    });
}
