// src/app/state.rs
// Defines state-related enums and structs for LlamaNest: application status, inter-thread messages and the pending dialogs of the models view.

use crate::app::{
    grouping::{GroupKey, ModelFilter},
    import::PendingImport,
    model::CompletionSettings,
};
use std::path::PathBuf;

// --- Application State Enums ---

/// Represents the possible operational statuses of the application.
#[derive(Clone, Debug, PartialEq)]
pub enum AppStatus {
    Idle,
    /// Copying an imported file into the local models directory.
    Importing(String),
    /// The last operation completed successfully.
    Success,
    /// Contains the error_message.
    Error(String),
}

/// Defines messages passed from background tasks (downloads, imports)
/// or the logger to the main UI thread via an MPSC channel.
#[derive(Debug)]
pub enum UpdateMessage {
    /// A log message (typically INFO level or lower) to be displayed in the UI.
    Log(String),
    /// Fraction (0.0 to 1.0) of a model file fetched so far.
    DownloadProgress { model_id: String, fraction: f32 },
    /// A download task ended; `Err` carries the reason.
    DownloadFinished {
        model_id: String,
        result: Result<(), String>,
    },
    /// The copy step of an import ended; `Ok` carries the final path.
    ImportFinished(Result<PathBuf, String>),
}

/// The confirmation dialogs the models view can raise. Only one is open at a time.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelsDialog {
    /// A picked file collides with an existing one; waiting for the user.
    ImportConflict(PendingImport),
    /// Confirm deleting a downloaded model's file.
    DeleteModel(String),
    /// Confirm restoring all model settings to their defaults.
    ResetModels,
}

/// Sidebar actions awaiting confirmation or input.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionDialog {
    Rename { session_id: String, title: String },
    ClearHistory,
}

/// Things the user asked for on the models view. Collected while drawing,
/// applied afterwards.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelAction {
    Download(String),
    CancelDownload(String),
    ConfirmDelete(String),
    Load(String),
    Unload,
    OpenSettings(String),
    RemoveFromList(String),
    ToggleFilter(ModelFilter),
    ToggleGroup(GroupKey),
    PickFile,
    AddHfModel,
    ConfirmReset,
    Refresh,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionAction {
    New,
    Select(String),
    StartRename(String),
    Delete(String),
    ConfirmClear,
}

/// Edit buffer of the model settings window.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingModelSettings {
    pub model_id: String,
    pub settings: CompletionSettings,
    /// Stop words, comma separated.
    pub stop_text: String,
}

impl PendingModelSettings {
    pub fn new(model_id: &str, settings: CompletionSettings) -> Self {
        let stop_text = settings.stop.join(", ");
        Self {
            model_id: model_id.to_string(),
            settings,
            stop_text,
        }
    }

    /// Settings with the stop words parsed back out of the text field.
    pub fn to_settings(&self) -> CompletionSettings {
        CompletionSettings {
            stop: self
                .stop_text
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            ..self.settings.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_words_round_trip_through_text() {
        let settings = CompletionSettings {
            stop: vec!["</s>".to_string(), "<|im_end|>".to_string()],
            ..CompletionSettings::default()
        };
        let mut pending = PendingModelSettings::new("m", settings.clone());
        assert_eq!(pending.stop_text, "</s>, <|im_end|>");
        assert_eq!(pending.to_settings(), settings);

        pending.stop_text = " a ,, b ".to_string();
        assert_eq!(pending.to_settings().stop, vec!["a", "b"]);
    }
}
