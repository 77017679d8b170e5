// src/app/ui/windows/settings_window.rs
// Contains the drawing function for the Settings window: application settings and the model initialisation (inference) settings.

// --- Necessary imports ---
use crate::app::{
    config::{max_threads, CacheType, InferenceSettings, MIN_CONTEXT_SIZE},
    settings_form::{
        cache_type_allowed, effective_batch, effective_ubatch, parse_context_size, set_flash_attn, ContextSizeInput,
    },
    LlamaNestApp,
};
use chrono_tz::Tz;
use egui::{Align2, ComboBox, Context, Grid, SelectableLabel, Slider, TextEdit, Ui, Window};
use log::{error, info};
use std::{str::FromStr, time::Instant};

// --- Window Drawing Function ---

// Draws the "Settings" window and handles its interactions (Save, Cancel, Close).
// Uses app.pending_settings for temporary state management.
pub fn draw_settings_window(app: &mut LlamaNestApp, ctx: &Context) {
    let mut settings_window_open = app.show_settings_window;
    let mut save_and_close_clicked = false;
    let mut cancel_settings_clicked = false;
    let data_dir = app.data_dir().display().to_string();

    Window::new("Settings")
        .open(&mut settings_window_open)
        .resizable(true)
        .default_width(440.0)
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            let Some(pending) = app.pending_settings.as_mut() else {
                error!("Settings window drawn without pending state initialized!");
                ui.colored_label(ui.visuals().error_fg_color, "Internal error: State not initialized.");
                return;
            };

            // A debounced context size lands here once the field has been quiet.
            let now = Instant::now();
            if let Some(n_context) = app.context_input.poll(now) {
                pending.inference.n_context = n_context;
            }

            ui.heading("Application");
            if let Some(path) = &app.config_path {
                ui.label(format!("Config file: {}", path.display()));
            } else {
                ui.label("Config file path not found.");
            }
            ui.separator();

            Grid::new("settings_grid")
                .num_columns(2)
                .spacing([40.0, 4.0])
                .striped(true)
                .show(ui, |ui| {
                    ui.label("Log Level:");
                    ComboBox::from_id_salt("log_level")
                        .selected_text(&pending.log_level)
                        .show_ui(ui, |ui| {
                            for level in ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"] {
                                ui.selectable_value(&mut pending.log_level, level.to_string(), level);
                            }
                        });
                    ui.end_row();

                    ui.label("Timezone (IANA):");
                    ui.add(TextEdit::singleline(&mut pending.tz).hint_text("e.g., Europe/Vienna, UTC"));
                    ui.end_row();

                    ui.label("Data directory:");
                    ui.add(TextEdit::singleline(&mut pending.data_dir))
                        .on_hover_text(format!("Currently in use: {}", data_dir));
                    ui.end_row();
                });

            ui.add_space(8.0);
            ui.heading("Model Initialization");
            draw_inference_settings(ui, &mut pending.inference, &mut app.context_input, now);

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Save & Close").clicked() {
                    if Tz::from_str(&pending.tz).is_err() {
                        error!(
                            "Invalid Timezone format: '{}'. Please use IANA format (e.g., 'Europe/Vienna', 'UTC'). Settings not saved.",
                            pending.tz
                        );
                    } else {
                        save_and_close_clicked = true;
                    }
                }
                if ui.button("Cancel").clicked() {
                    cancel_settings_clicked = true;
                }
            });
            ui.separator();
            ui.label("Note: Log Level, Timezone and Data directory changes take effect after a restart. Model initialization settings apply the next time a model is loaded.");
        });

    if save_and_close_clicked {
        // Save does not wait for the debounce.
        let n_context = parse_context_size(&app.context_input.text).unwrap_or(app.context_input.committed());
        if let Some(mut saved_settings) = app.pending_settings.take() {
            saved_settings.inference.n_context = n_context;
            app.settings = saved_settings;
            app.save_settings();
            info!("Settings updated and saved.");
        } else {
            error!("Save clicked but pending_settings was None!");
        }
        settings_window_open = false;
    } else if cancel_settings_clicked {
        info!("Settings changes cancelled.");
        settings_window_open = false;
    } else if !settings_window_open && app.show_settings_window {
        info!("Settings window closed via 'X'. Changes discarded.");
    }

    app.show_settings_window = settings_window_open;

    if !app.show_settings_window {
        app.pending_settings = None;
        app.context_input.close();
    }
}

fn draw_inference_settings(
    ui: &mut Ui,
    inference: &mut InferenceSettings,
    context_input: &mut ContextSizeInput,
    now: Instant,
) {
    Grid::new("inference_grid")
        .num_columns(2)
        .spacing([40.0, 4.0])
        .striped(true)
        .show(ui, |ui| {
            ui.label("Context size:");
            ui.vertical(|ui| {
                let response = ui.add(TextEdit::singleline(&mut context_input.text).desired_width(100.0));
                if response.changed() {
                    context_input.on_edit(now);
                }
                if response.lost_focus() {
                    context_input.on_blur();
                }
                if context_input.is_invalid() {
                    ui.colored_label(
                        ui.visuals().error_fg_color,
                        format!("Must be a whole number of at least {}.", MIN_CONTEXT_SIZE),
                    );
                }
            });
            ui.end_row();

            ui.label("Batch size:");
            ui.vertical(|ui| {
                ui.add(Slider::new(&mut inference.n_batch, 1..=4096));
                if effective_batch(inference) != inference.n_batch {
                    ui.small(format!("Effective: {} (capped by context size)", effective_batch(inference)));
                }
            });
            ui.end_row();

            ui.label("Physical batch size:");
            ui.vertical(|ui| {
                ui.add(Slider::new(&mut inference.n_ubatch, 1..=4096));
                if effective_ubatch(inference) != inference.n_ubatch {
                    ui.small(format!("Effective: {} (capped by batch and context size)", effective_ubatch(inference)));
                }
            });
            ui.end_row();

            ui.label("CPU threads:");
            ui.add(Slider::new(&mut inference.n_threads, 1..=max_threads()));
            ui.end_row();

            ui.label("Flash attention:");
            let mut flash_attn = inference.flash_attn;
            if ui.checkbox(&mut flash_attn, "").changed() {
                set_flash_attn(inference, flash_attn);
            }
            ui.end_row();

            ui.label("Key cache type:");
            let mut cache_type_k = inference.cache_type_k;
            cache_type_combo(ui, "cache_type_k", inference, &mut cache_type_k);
            inference.cache_type_k = cache_type_k;
            ui.end_row();

            ui.label("Value cache type:");
            let mut cache_type_v = inference.cache_type_v;
            cache_type_combo(ui, "cache_type_v", inference, &mut cache_type_v);
            inference.cache_type_v = cache_type_v;
            ui.end_row();

            ui.label("Metal (GPU):");
            ui.checkbox(&mut inference.use_metal, "");
            ui.end_row();

            ui.label("GPU layers:");
            ui.add_enabled(inference.use_metal, Slider::new(&mut inference.n_gpu_layers, 1..=100));
            ui.end_row();
        });
}

fn cache_type_combo(ui: &mut Ui, id: &str, inference: &InferenceSettings, selected: &mut CacheType) {
    ComboBox::from_id_salt(id)
        .selected_text(selected.label())
        .show_ui(ui, |ui| {
            for cache_type in CacheType::all() {
                let allowed = cache_type_allowed(inference, cache_type);
                let response = ui.add_enabled(
                    allowed,
                    SelectableLabel::new(*selected == cache_type, cache_type.label()),
                );
                if response.clicked() {
                    *selected = cache_type;
                }
                response.on_disabled_hover_text("Requires flash attention");
            }
        });
}
