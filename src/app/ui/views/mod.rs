// src/app/ui/views/mod.rs
// Declares the view modules within the UI.

/// Contains the UI drawing function for the Models view.
pub mod models_view;

/// Contains the UI drawing function for the chat sessions sidebar.
pub mod sessions_view;
