// src/app/ui/windows/mod.rs
// Declares the modules for individual UI windows (About, Settings, Model Settings, confirmations and prompts).

pub mod about_window;
pub mod confirmation_window;
pub mod import_conflict_window;
pub mod model_settings_window;
pub mod rename_session_window;
pub mod settings_window;
