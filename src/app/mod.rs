// src/app/mod.rs
// Main application logic for LlamaNest. Defines the App struct, implements the eframe::App trait, and coordinates UI, state, configuration, the model and session stores, downloads and imports.

// Declare sibling modules within the `app` module
pub mod config;
pub mod download;
pub mod error;
pub mod grouping;
pub mod import;
pub mod model;
pub mod sessions;
pub mod settings_form;
pub mod state;
pub mod store;
pub mod ui;
pub mod utils;

use chrono::Utc;
use eframe::{
    egui::{self, CentralPanel, CollapsingHeader, Context, SidePanel, TopBottomPanel, ViewportCommand},
    App, CreationContext,
};
use log::{debug, error, info, warn};
use std::{
    fmt::Display,
    path::{Path, PathBuf},
    sync::{
        mpsc::{Receiver, Sender},
        Arc,
    },
    time::Instant,
};
use tokio::runtime::Runtime;

use self::{
    config::{AppSettings, APP_NAME, SCRIPT_VERSION},
    grouping::{GroupKey, ModelFilter},
    import::{
        apply_decision, perform_copy, prepare_import, register_copied, Collision, FileSystem, ImportAction,
        ImportDecision, ImportResolution, ResolvedImport, StdFileSystem,
    },
    model::CompletionSettings,
    sessions::SessionStore,
    settings_form::ContextSizeInput,
    state::{
        AppStatus, ModelAction, ModelsDialog, PendingModelSettings, SessionAction, SessionDialog, UpdateMessage,
    },
    store::{LocalModelStore, ModelRepository},
    ui::{views, widgets, windows},
};

/// Error type handed back to eframe when the app cannot start.
pub type StartupError = Box<dyn std::error::Error + Send + Sync>;

// --- Main Application Struct ---

/// Holds the state and logic for the LlamaNest application.
pub struct LlamaNestApp {
    // --- UI State ---
    logs: Vec<String>,
    logs_string_cache: String,
    logs_dirty: bool,
    logs_collapsed: bool,
    show_settings_window: bool,
    show_about_window: bool,
    copy_logs_requested: bool,
    hf_model_input: String,
    models_dialog: Option<ModelsDialog>,
    session_dialog: Option<SessionDialog>,

    // --- Application State & Data ---
    status_text: String,
    status: AppStatus,
    store: LocalModelStore,
    sessions: SessionStore,

    // --- Configuration ---
    settings: AppSettings,
    config_path: Option<PathBuf>,

    // --- Temporary State for Windows ---
    pending_settings: Option<AppSettings>,
    context_input: ContextSizeInput,
    pending_model_settings: Option<PendingModelSettings>,

    // --- Communication & Async ---
    task_update_sender: Sender<UpdateMessage>,
    update_receiver: Receiver<UpdateMessage>,
    rt: Arc<Runtime>,
}

// --- Application Implementation ---

impl LlamaNestApp {
    /// Creates a new instance of LlamaNest. `settings` were loaded by `main` before the logger came up.
    pub fn new(
        _cc: &CreationContext<'_>,
        settings: AppSettings,
        task_update_sender: Sender<UpdateMessage>,
        update_receiver: Receiver<UpdateMessage>,
    ) -> Result<Self, StartupError> {
        info!("Running LlamaNestApp::new - v{}", SCRIPT_VERSION);
        let config_path = confy::get_configuration_file_path(APP_NAME, None).ok();
        if let Some(path) = &config_path {
            info!("Using config file: {}", path.display());
        } else {
            warn!("Could not determine config file path.");
        }
        info!("--- Loaded Persistent Settings ---");
        info!("LOG_LEVEL: {}", settings.log_level);
        info!("TZ: {}", settings.tz);
        info!("DATA_DIR: {}", settings.data_dir);
        debug!("Models screen: {:?}", settings.models_screen);
        debug!("Inference: {:?}", settings.inference);
        info!("--------------------------------");

        let data_dir = settings.data_dir();
        let store = LocalModelStore::open(&data_dir)?;
        let sessions = SessionStore::open(&data_dir)?;

        let rt = Arc::new(
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?,
        );

        let context_input = ContextSizeInput::new(settings.inference.n_context);
        Ok(Self {
            logs: Vec::new(),
            logs_string_cache: String::new(),
            logs_dirty: true,
            logs_collapsed: true,
            show_settings_window: false,
            show_about_window: false,
            copy_logs_requested: false,
            hf_model_input: String::new(),
            models_dialog: None,
            session_dialog: None,
            status_text: "Idle".to_string(),
            status: AppStatus::Idle,
            store,
            sessions,
            settings,
            config_path,
            pending_settings: None,
            context_input,
            pending_model_settings: None,
            task_update_sender,
            update_receiver,
            rt,
        })
    }

    /// Rebuilds the cached log string if the logs are marked as dirty.
    fn rebuild_log_cache(&mut self) {
        if self.logs_dirty {
            self.logs_string_cache = self.logs.join("\n");
            self.logs_dirty = false;
        }
    }

    /// Saves the current `self.settings` to the persistent configuration file using confy.
    fn save_settings(&mut self) {
        match confy::store(APP_NAME, None, &self.settings) {
            Ok(_) => info!("Settings saved."),
            Err(e) => error!("Failed to save settings: {}", e),
        }
        debug!("Models screen: {:?}", self.settings.models_screen);
        debug!("Inference: {:?}", self.settings.inference);
    }

    /// Logs an error and shows it in the status line.
    fn report_error(&mut self, context: &str, e: impl Display) {
        error!("{}: {}", context, e);
        self.status_text = format!("{}: {}", context, e);
        self.status = AppStatus::Error(e.to_string());
    }

    fn set_status(&mut self, text: impl Into<String>, status: AppStatus) {
        self.status_text = text.into();
        self.status = status;
    }

    fn is_busy(&self) -> bool {
        matches!(self.status, AppStatus::Importing(_))
            || self.store.models().iter().any(|m| self.store.is_downloading(&m.id))
    }

    // --- Messages from background tasks ---

    fn handle_message(&mut self, msg: UpdateMessage) {
        match msg {
            UpdateMessage::Log(line) => {
                self.logs.push(line);
                self.logs_dirty = true;
            }
            UpdateMessage::DownloadProgress { model_id, fraction } => {
                self.store.set_download_progress(&model_id, fraction);
            }
            UpdateMessage::DownloadFinished { model_id, result } => {
                let succeeded = result.is_ok();
                if let Err(e) = self.store.finish_download(&model_id, succeeded) {
                    self.report_error("Failed to record download", e);
                    return;
                }
                match result {
                    Ok(()) => self.set_status(format!("Downloaded {}.", model_id), AppStatus::Success),
                    Err(e) => self.set_status(format!("Download of {} stopped: {}", model_id, e), AppStatus::Idle),
                }
            }
            UpdateMessage::ImportFinished(result) => match result {
                Ok(path) => match register_copied(&path, &StdFileSystem, &mut self.store) {
                    Ok(model) => self.set_status(format!("Imported {}.", model.name), AppStatus::Success),
                    Err(e) => self.report_error("Failed to register imported model", e),
                },
                Err(e) => self.report_error("Import failed", e),
            },
        }
    }

    // --- Import ---

    /// Opens the native file picker and imports the chosen file.
    fn pick_and_import(&mut self) {
        let picked = rfd::FileDialog::new()
            .set_title("Import model file")
            .add_filter("GGUF model", &["gguf"])
            .add_filter("All files", &["*"])
            .pick_file();
        match picked {
            Some(path) => self.import_file(path),
            None => debug!("No file picked, nothing to import."),
        }
    }

    /// Starts importing `source`. Raises the conflict window when the name is taken.
    fn import_file(&mut self, source: PathBuf) {
        if self.models_dialog.is_some() {
            warn!("Another dialog is open, ignoring import of '{}'.", source.display());
            return;
        }
        let target_dir = self.store.local_models_dir();
        let pending = match prepare_import(&source, &target_dir, &StdFileSystem) {
            Ok(pending) => pending,
            Err(e) => {
                self.report_error("Import failed", e);
                return;
            }
        };
        match &pending.collision {
            Collision::Free(final_path) => {
                let resolved = ResolvedImport {
                    final_path: final_path.clone(),
                    action: ImportAction::Copy,
                };
                self.start_copy(source, resolved);
            }
            Collision::Conflict(path) => {
                info!("'{}' already exists, asking the user.", path.display());
                self.models_dialog = Some(ModelsDialog::ImportConflict(pending.clone()));
            }
        }
    }

    fn resolve_import_conflict(&mut self, decision: ImportDecision) {
        let Some(ModelsDialog::ImportConflict(pending)) = self.models_dialog.take() else {
            return;
        };
        let Collision::Conflict(path) = &pending.collision else {
            return;
        };
        info!("Import of '{}' collided, user chose {:?}.", path.display(), decision);
        match apply_decision(path, decision, |p| StdFileSystem.exists(p)) {
            Ok(ImportResolution::Resolved(resolved)) => self.start_copy(pending.source, resolved),
            Ok(ImportResolution::Cancelled) => {
                info!("Import of '{}' cancelled by user.", pending.source.display());
                self.set_status("Import cancelled.", AppStatus::Idle);
            }
            Err(e) => self.report_error("Import failed", e),
        }
    }

    /// Copies on a blocking worker; the result comes back as `ImportFinished`.
    fn start_copy(&mut self, source: PathBuf, resolved: ResolvedImport) {
        let name = resolved
            .final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.set_status(format!("Importing {}...", name), AppStatus::Importing(name));
        let sender = self.task_update_sender.clone();
        self.rt.spawn_blocking(move || {
            let result = perform_copy(&source, &resolved, &StdFileSystem).map_err(|e| e.to_string());
            let _ = sender.send(UpdateMessage::ImportFinished(result));
        });
    }

    // --- Model actions ---

    fn start_download(&mut self, id: &str) {
        let ticket = match self.store.check_space_and_download(id) {
            Ok(ticket) => ticket,
            Err(e) => {
                self.report_error("Cannot start download", e);
                return;
            }
        };
        info!("Starting download of '{}' from {}", ticket.model_id, ticket.url);
        self.set_status(format!("Downloading {}...", ticket.model_id), AppStatus::Idle);
        let sender = self.task_update_sender.clone();
        self.rt.spawn(async move {
            let result = download::download_model_async(&ticket, sender.clone())
                .await
                .map(|_| ())
                .map_err(|e| e.to_string());
            let _ = sender.send(UpdateMessage::DownloadFinished {
                model_id: ticket.model_id,
                result,
            });
        });
    }

    fn delete_model(&mut self, id: &str) {
        match self.store.delete_model(id) {
            Ok(()) => self.set_status(format!("Deleted {}.", id), AppStatus::Success),
            Err(e) => self.report_error("Failed to delete model", e),
        }
    }

    fn load_model(&mut self, id: Option<&str>) {
        match self.store.set_active_model(id) {
            Ok(()) => match id {
                Some(id) => {
                    info!(
                        "Active model is now '{}' (n_ctx {}, n_gpu_layers {}).",
                        id, self.settings.inference.n_context, self.settings.inference.n_gpu_layers
                    );
                    self.set_status(format!("Loaded {}.", id), AppStatus::Success);
                }
                None => self.set_status("Model unloaded.", AppStatus::Idle),
            },
            Err(e) => self.report_error("Failed to load model", e),
        }
    }

    fn add_hf_model(&mut self) {
        let hf_id = self.hf_model_input.trim().to_string();
        if hf_id.is_empty() {
            return;
        }
        match self.store.add_hf_model(&hf_id, 0) {
            Ok(model) => {
                self.hf_model_input.clear();
                self.set_status(format!("Added {}.", model.id), AppStatus::Success);
            }
            Err(e) => self.report_error("Expected <author>/<repo>/<file>", e),
        }
    }

    fn save_model_settings(&mut self, model_id: &str, settings: CompletionSettings) -> bool {
        let errors = settings.validate();
        if !errors.is_empty() {
            warn!("Not saving settings for '{}': {:?}", model_id, errors);
            return false;
        }
        match self.store.update_completion_settings(model_id, settings) {
            Ok(()) => {
                info!("Saved completion settings for '{}'.", model_id);
                true
            }
            Err(e) => {
                self.report_error("Failed to save model settings", e);
                false
            }
        }
    }

    fn reset_models(&mut self) {
        match self.store.reset_models() {
            Ok(()) => self.set_status("Model settings reset.", AppStatus::Success),
            Err(e) => self.report_error("Failed to reset models", e),
        }
    }

    fn apply_model_action(&mut self, action: ModelAction) {
        debug!("Model action: {:?}", action);
        match action {
            ModelAction::Download(id) => self.start_download(&id),
            ModelAction::CancelDownload(id) => {
                if !self.store.cancel_download(&id) {
                    warn!("'{}' is not downloading.", id);
                }
            }
            ModelAction::ConfirmDelete(id) => self.models_dialog = Some(ModelsDialog::DeleteModel(id)),
            ModelAction::Load(id) => self.load_model(Some(&id)),
            ModelAction::Unload => self.load_model(None),
            ModelAction::OpenSettings(id) => {
                if let Some(model) = self.store.get(&id) {
                    self.pending_model_settings =
                        Some(PendingModelSettings::new(&id, model.completion_settings.clone()));
                }
            }
            ModelAction::RemoveFromList(id) => match self.store.remove_model_from_list(&id) {
                Ok(()) => self.set_status(format!("Removed {}.", id), AppStatus::Idle),
                Err(e) => self.report_error("Failed to remove model", e),
            },
            ModelAction::ToggleFilter(filter) => self.toggle_filter(filter),
            ModelAction::ToggleGroup(key) => self.toggle_group(&key),
            ModelAction::PickFile => self.pick_and_import(),
            ModelAction::AddHfModel => self.add_hf_model(),
            ModelAction::ConfirmReset => self.models_dialog = Some(ModelsDialog::ResetModels),
            ModelAction::Refresh => {
                if let Err(e) = self.store.refresh_download_statuses() {
                    self.report_error("Failed to refresh models", e);
                }
            }
        }
    }

    fn toggle_filter(&mut self, filter: ModelFilter) {
        let active = self.settings.models_screen.filters.toggle(filter);
        debug!("Filter {:?} is now {}.", filter, if active { "on" } else { "off" });
        self.save_settings();
    }

    fn toggle_group(&mut self, key: &GroupKey) {
        if self.settings.models_screen.expanded_groups.toggle(key) {
            self.save_settings();
        }
    }

    // --- Session actions ---

    fn apply_session_action(&mut self, action: SessionAction) {
        debug!("Session action: {:?}", action);
        let result = match action {
            SessionAction::New => self.sessions.create("New Session", Utc::now()).map(|_| ()),
            SessionAction::Select(id) => self.sessions.set_active(Some(&id)),
            SessionAction::StartRename(id) => {
                let title = self
                    .sessions
                    .sessions()
                    .iter()
                    .find(|s| s.id == id)
                    .map(|s| s.title.clone())
                    .unwrap_or_default();
                self.session_dialog = Some(SessionDialog::Rename { session_id: id, title });
                Ok(())
            }
            SessionAction::Delete(id) => self.sessions.delete(&id),
            SessionAction::ConfirmClear => {
                self.session_dialog = Some(SessionDialog::ClearHistory);
                Ok(())
            }
        };
        if let Err(e) = result {
            self.report_error("Session update failed", e);
        }
    }

    // --- Dialogs ---

    fn draw_models_dialog(&mut self, ctx: &Context) {
        match self.models_dialog.clone() {
            Some(ModelsDialog::ImportConflict(pending)) => {
                if let Some(decision) = windows::import_conflict_window::draw_import_conflict_window(ctx, &pending) {
                    self.resolve_import_conflict(decision);
                }
            }
            Some(ModelsDialog::DeleteModel(id)) => {
                let name = self.store.get(&id).map(|m| m.name.clone()).unwrap_or_else(|| id.clone());
                let message = format!("Are you sure you want to permanently delete the model '{}'?", name);
                match windows::confirmation_window::draw_confirmation_window(ctx, "Confirm Deletion", &message, "Delete") {
                    Some(true) => {
                        self.models_dialog = None;
                        self.delete_model(&id);
                    }
                    Some(false) => {
                        info!("Model deletion cancelled by user.");
                        self.models_dialog = None;
                    }
                    None => {}
                }
            }
            Some(ModelsDialog::ResetModels) => {
                let message = "Reset all model settings to their defaults? Downloaded files and local models are kept.";
                match windows::confirmation_window::draw_confirmation_window(ctx, "Reset Models", message, "Reset") {
                    Some(true) => {
                        self.models_dialog = None;
                        self.reset_models();
                    }
                    Some(false) => self.models_dialog = None,
                    None => {}
                }
            }
            None => {}
        }
    }

    fn draw_session_dialog(&mut self, ctx: &Context) {
        match &mut self.session_dialog {
            Some(SessionDialog::Rename { session_id, title }) => {
                match windows::rename_session_window::draw_rename_session_window(ctx, title) {
                    Some(true) => {
                        let session_id = session_id.clone();
                        let title = title.clone();
                        match self.sessions.rename(&session_id, &title) {
                            Ok(()) => self.session_dialog = None,
                            // Keep the window open so the title can be fixed.
                            Err(e) => self.report_error("Rename failed", e),
                        }
                    }
                    Some(false) => self.session_dialog = None,
                    None => {}
                }
            }
            Some(SessionDialog::ClearHistory) => {
                match windows::confirmation_window::draw_confirmation_window(
                    ctx,
                    "Clear Chat History",
                    "Delete all chat sessions? This cannot be undone.",
                    "Clear",
                ) {
                    Some(true) => {
                        self.session_dialog = None;
                        if let Err(e) = self.sessions.clear_all() {
                            self.report_error("Failed to clear sessions", e);
                        }
                    }
                    Some(false) => self.session_dialog = None,
                    None => {}
                }
            }
            None => {}
        }
    }

    fn handle_dropped_files(&mut self, ctx: &Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| i.raw.dropped_files.iter().filter_map(|f| f.path.clone()).collect());
        let mut paths = dropped.into_iter();
        if let Some(first) = paths.next() {
            let skipped = paths.count();
            if skipped > 0 {
                warn!("Dropped {} extra file(s); only one model is imported at a time.", skipped);
            }
            self.import_file(first);
        }
    }

    fn data_dir(&self) -> &Path {
        self.store.models_dir().parent().unwrap_or_else(|| Path::new("."))
    }
}

// --- eframe::App Implementation ---

impl App for LlamaNestApp {
    /// Called once before shutdown.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Shutting down {}.", APP_NAME);
        self.save_settings();
    }

    /// Called on each frame to update the UI and handle events.
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        // --- 1. Process MPSC Messages ---
        let messages: Vec<UpdateMessage> = self.update_receiver.try_iter().collect();
        let mut needs_repaint = !messages.is_empty();
        for msg in messages {
            self.handle_message(msg);
        }

        // --- 2. Files dropped onto the window ---
        self.handle_dropped_files(ctx);

        // --- 3. Rebuild Log Cache ---
        self.rebuild_log_cache();

        // --- 4. Handle Other Actions ---
        if self.copy_logs_requested {
            if !self.logs_string_cache.is_empty() {
                ctx.copy_text(self.logs_string_cache.clone());
                info!("Logs copied to clipboard.");
            } else {
                warn!("Log buffer is empty, nothing to copy.");
            }
            self.copy_logs_requested = false;
            needs_repaint = true;
        }

        // --- 5. Draw Panels ---
        TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Import Model File...").clicked() {
                        ui.close_menu();
                        self.pick_and_import();
                    }
                    if ui.button("Settings").clicked() {
                        self.show_settings_window = true;
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(ViewportCommand::Close);
                    }
                });
                ui.menu_button("Help", |ui| {
                    if ui.button("Copy Logs").clicked() {
                        self.copy_logs_requested = true;
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("About").clicked() {
                        self.show_about_window = true;
                        info!("About button clicked - {} v{}", APP_NAME, SCRIPT_VERSION);
                        ui.close_menu();
                    }
                });
            });
        });

        TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .show_separator_line(true)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let color = match &self.status {
                        AppStatus::Error(_) => ui.visuals().error_fg_color,
                        _ => ui.visuals().text_color(),
                    };
                    ui.colored_label(color, &self.status_text);
                });
                let header_response = CollapsingHeader::new("Logs")
                    .default_open(!self.logs_collapsed)
                    .show(ui, |ui| {
                        widgets::draw_log_view_content(self, ui);
                    });
                if header_response.header_response.clicked() {
                    self.logs_collapsed = header_response.body_returned.is_none();
                }
                header_response
                    .header_response
                    .on_hover_text("Click to expand/collapse logs");
            });

        let session_actions = SidePanel::left("sessions_panel")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| views::sessions_view::draw_sessions_view(self, ui))
            .inner;

        let model_actions = CentralPanel::default()
            .show(ctx, |ui| views::models_view::draw_models_view(self, ui))
            .inner;

        for action in session_actions {
            self.apply_session_action(action);
            needs_repaint = true;
        }
        for action in model_actions {
            self.apply_model_action(action);
            needs_repaint = true;
        }

        // --- 6. Windows ---
        if self.show_settings_window {
            if self.pending_settings.is_none() {
                info!("Settings window opened, cloning current settings to pending state.");
                self.context_input = ContextSizeInput::new(self.settings.inference.n_context);
                self.pending_settings = Some(self.settings.clone());
            }
            windows::settings_window::draw_settings_window(self, ctx);
        }
        if self.show_about_window {
            windows::about_window::draw_about_window(self, ctx);
        }
        if self.pending_model_settings.is_some() {
            windows::model_settings_window::draw_model_settings_window(self, ctx);
        }
        self.draw_models_dialog(ctx);
        self.draw_session_dialog(ctx);

        // --- 7. Final Repaint Request ---
        if self.is_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
        if let Some(remaining) = self.context_input.debouncer().remaining(Instant::now()) {
            ctx.request_repaint_after(remaining);
        }
        if needs_repaint {
            ctx.request_repaint();
        }
    }
}
