#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// src/main.rs
// Entry point: loads persistent settings, sets up the logger that mirrors log lines into the UI, and starts the eframe window.

use llamanest::app::{
    config::{AppSettings, APP_NAME, SCRIPT_VERSION},
    state::UpdateMessage,
    LlamaNestApp, StartupError,
};
use chrono::Utc;
use chrono_tz::Tz;
use log::{error, info, LevelFilter};
use std::{str::FromStr, sync::mpsc::channel};

fn load_settings() -> AppSettings {
    match confy::load::<AppSettings>(APP_NAME, None) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Logger is not up yet.
            eprintln!("WARN: Failed to load config file ('{}'), using defaults: {}", APP_NAME, e);
            let default_settings = AppSettings::default();
            if let Err(store_err) = confy::store(APP_NAME, None, &default_settings) {
                eprintln!("ERROR: Failed to store default settings: {}", store_err);
            }
            default_settings
        }
    }
}

// --- Main Function ---
fn main() -> Result<(), eframe::Error> {
    let settings = load_settings();
    let (update_sender, update_receiver) = channel();
    let logger_sender = update_sender.clone();

    let app_log_level = LevelFilter::from_str(&settings.log_level).unwrap_or(LevelFilter::Info);
    let logger_tz = Tz::from_str(&settings.tz).unwrap_or_else(|_| {
        eprintln!("WARN: Invalid TZ '{}' in settings, logger falling back to UTC.", settings.tz);
        Tz::UTC
    });

    // Initialize Logger
    let log_level_to_init = if cfg!(debug_assertions) { LevelFilter::Debug } else { app_log_level };
    env_logger::Builder::new()
        .filter_level(log_level_to_init)
        // Keep dependency chatter out of the UI log.
        .filter_module("wgpu", LevelFilter::Warn)
        .filter_module("naga", LevelFilter::Warn)
        .filter_module("reqwest", LevelFilter::Warn)
        .format(move |buf, record| {
            use std::io::Write;
            let now = Utc::now().with_timezone(&logger_tz);
            let log_msg = format!("[{}] [{}] {}", now.format("%Y-%m-%d %H:%M:%S %Z"), record.level(), record.args());
            // Send INFO and lower logs to the GUI
            if record.level() <= LevelFilter::Info {
                let _ = logger_sender.send(UpdateMessage::Log(log_msg.clone()));
            }
            writeln!(buf, "{}", log_msg)
        })
        .init();

    info!("--- {} v{} Starting ---", APP_NAME, SCRIPT_VERSION);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 700.0])
            .with_min_inner_size([700.0, 450.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(move |cc| -> Result<Box<dyn eframe::App>, StartupError> {
            let app = LlamaNestApp::new(cc, settings, update_sender, update_receiver).map_err(|e| {
                error!("Failed to start {}: {}", APP_NAME, e);
                e
            })?;
            Ok(Box::new(app))
        }),
    )
}
