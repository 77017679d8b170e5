// src/app/store.rs
// The model repository: catalog state, on-disk model files, download bookkeeping and persistence to models.json.

use crate::app::{
    error::StoreError,
    model::{default_models, CompletionSettings, Model, ModelOrigin},
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

pub const CATALOG_FILE: &str = "models.json";
pub const MODELS_DIR: &str = "models";
pub const LOCAL_MODELS_DIR: &str = "local";
const CATALOG_VERSION: u32 = 1;

/// Everything the views need from a model store.
pub trait ModelRepository {
    fn models(&self) -> &[Model];

    fn get(&self, id: &str) -> Option<&Model> {
        self.models().iter().find(|m| m.id == id)
    }

    fn is_downloading(&self, id: &str) -> bool;
    fn download_progress(&self, id: &str) -> Option<f32>;
    fn active_model_id(&self) -> Option<&str>;
    fn set_active_model(&mut self, id: Option<&str>) -> Result<(), StoreError>;
    fn add_local_model(&mut self, path: &Path) -> Result<Model, StoreError>;
    fn delete_model(&mut self, id: &str) -> Result<(), StoreError>;
    /// Requests cancellation; returns false if nothing was downloading.
    fn cancel_download(&mut self, id: &str) -> bool;
    fn check_space_and_download(&mut self, id: &str) -> Result<DownloadTicket, StoreError>;
    fn remove_model_from_list(&mut self, id: &str) -> Result<(), StoreError>;
    fn update_completion_settings(&mut self, id: &str, settings: CompletionSettings) -> Result<(), StoreError>;
    fn reset_completion_settings(&mut self, id: &str) -> Result<CompletionSettings, StoreError>;
    fn reset_models(&mut self) -> Result<(), StoreError>;
    fn refresh_download_statuses(&mut self) -> Result<(), StoreError>;
}

/// What a download task needs to fetch one model.
#[derive(Debug, Clone)]
pub struct DownloadTicket {
    pub model_id: String,
    pub url: String,
    pub destination: PathBuf,
    pub cancel: Arc<AtomicBool>,
}

#[derive(Debug)]
struct DownloadState {
    progress: f32,
    cancel: Arc<AtomicBool>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
struct CatalogFile {
    version: u32,
    active_model_id: Option<String>,
    models: Vec<Model>,
}

/// Required bytes for a model file plus a 10% margin.
pub fn required_space(size: u64) -> u64 {
    size.saturating_add(size / 10)
}

pub fn ensure_space(size: u64, available: u64) -> Result<(), StoreError> {
    let required = required_space(size);
    if required > available {
        Err(StoreError::InsufficientSpace {
            required,
            available,
        })
    } else {
        Ok(())
    }
}

/// File-backed model store rooted at the data directory.
pub struct LocalModelStore {
    models: Vec<Model>,
    active_model_id: Option<String>,
    downloads: HashMap<String, DownloadState>,
    models_dir: PathBuf,
    catalog_path: PathBuf,
}

impl LocalModelStore {
    /// Loads `models.json`, merges in presets missing from it and syncs with the disk.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let models_dir = data_dir.join(MODELS_DIR);
        fs::create_dir_all(models_dir.join(LOCAL_MODELS_DIR))?;
        let catalog_path = data_dir.join(CATALOG_FILE);

        let catalog = if catalog_path.exists() {
            let text = fs::read_to_string(&catalog_path)?;
            match serde_json::from_str::<CatalogFile>(&text) {
                Ok(catalog) => catalog,
                Err(e) => {
                    warn!(
                        "Catalog '{}' is unreadable ({}), starting from presets.",
                        catalog_path.display(),
                        e
                    );
                    CatalogFile::default()
                }
            }
        } else {
            info!("No catalog at '{}', starting from presets.", catalog_path.display());
            CatalogFile::default()
        };

        let mut models = catalog.models;
        for preset in default_models() {
            if !models.iter().any(|m| m.id == preset.id) {
                debug!("Adding preset '{}' to catalog.", preset.id);
                models.push(preset);
            }
        }

        let mut store = Self {
            models,
            active_model_id: catalog.active_model_id,
            downloads: HashMap::new(),
            models_dir,
            catalog_path,
        };
        store.refresh_download_statuses()?;
        info!("Model store opened with {} models.", store.models.len());
        Ok(store)
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn local_models_dir(&self) -> PathBuf {
        self.models_dir.join(LOCAL_MODELS_DIR)
    }

    /// Where a model's file lives on disk.
    pub fn model_path(&self, model: &Model) -> PathBuf {
        if model.is_local_file() {
            self.local_models_dir().join(&model.filename)
        } else {
            self.models_dir.join(&model.id)
        }
    }

    /// Adds an entry for `<author>/<repo>/<file>` on the Hugging Face hub.
    pub fn add_hf_model(&mut self, hf_id: &str, size: u64) -> Result<Model, StoreError> {
        let parts: Vec<&str> = hf_id.trim().split('/').collect();
        let [author, repo, filename] = parts.as_slice() else {
            return Err(StoreError::InvalidHfId(hf_id.to_string()));
        };
        if author.is_empty() || repo.is_empty() || filename.is_empty() {
            return Err(StoreError::InvalidHfId(hf_id.to_string()));
        }
        let id = format!("{}/{}/{}", author, repo, filename);
        if let Some(existing) = self.get(&id) {
            return Ok(existing.clone());
        }
        let hf_url = format!("https://huggingface.co/{}/{}", author, repo);
        let mut model = Model::local(filename, size);
        model.id = id;
        model.author = author.to_string();
        model.download_url = format!("{}/resolve/main/{}", hf_url, filename);
        model.hf_url = hf_url;
        model.is_local = false;
        model.is_downloaded = false;
        model.progress = 0.0;
        model.origin = ModelOrigin::Hf;
        model.model_type = repo.to_string();
        info!("Added Hugging Face model '{}'.", model.id);
        self.models.push(model.clone());
        self.persist()?;
        Ok(model)
    }

    /// Updates the in-flight progress (0.0 to 1.0) of a download.
    pub fn set_download_progress(&mut self, id: &str, fraction: f32) {
        if let Some(state) = self.downloads.get_mut(id) {
            state.progress = fraction.clamp(0.0, 1.0);
        }
        if let Some(model) = self.models.iter_mut().find(|m| m.id == id) {
            model.progress = fraction.clamp(0.0, 1.0) * 100.0;
        }
    }

    /// Records the end of a download task.
    pub fn finish_download(&mut self, id: &str, succeeded: bool) -> Result<(), StoreError> {
        self.downloads.remove(id);
        let Some(model) = self.models.iter_mut().find(|m| m.id == id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        model.is_downloaded = succeeded;
        model.progress = if succeeded { 100.0 } else { 0.0 };
        self.persist()
    }

    fn model_mut(&mut self, id: &str) -> Result<&mut Model, StoreError> {
        self.models
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn persist(&self) -> Result<(), StoreError> {
        let catalog = CatalogFile {
            version: CATALOG_VERSION,
            active_model_id: self.active_model_id.clone(),
            models: self.models.clone(),
        };
        let text = serde_json::to_string_pretty(&catalog)?;
        let tmp = self.catalog_path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.catalog_path)?;
        debug!("Catalog saved to '{}'.", self.catalog_path.display());
        Ok(())
    }
}

impl ModelRepository for LocalModelStore {
    fn models(&self) -> &[Model] {
        &self.models
    }

    fn is_downloading(&self, id: &str) -> bool {
        self.downloads.contains_key(id)
    }

    fn download_progress(&self, id: &str) -> Option<f32> {
        self.downloads.get(id).map(|d| d.progress)
    }

    fn active_model_id(&self) -> Option<&str> {
        self.active_model_id.as_deref()
    }

    fn set_active_model(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        if let Some(id) = id {
            let model = self.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            if !model.is_downloaded {
                return Err(StoreError::NotFound(format!("{} (not downloaded)", id)));
            }
        }
        self.active_model_id = id.map(str::to_string);
        self.persist()
    }

    fn add_local_model(&mut self, path: &Path) -> Result<Model, StoreError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StoreError::NotFound(path.display().to_string()))?;
        let size = fs::metadata(path)?.len();
        let model = Model::local(&file_name, size);
        match self.models.iter_mut().find(|m| m.id == model.id) {
            // Replaced on disk, so the old entry describes the new file.
            Some(existing) => *existing = model.clone(),
            None => self.models.push(model.clone()),
        }
        info!("Registered local model '{}' ({} bytes).", model.id, size);
        self.persist()?;
        Ok(model)
    }

    fn delete_model(&mut self, id: &str) -> Result<(), StoreError> {
        let model = self.get(id).cloned().ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let path = self.model_path(&model);
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Deleted model file '{}'.", path.display());
        }
        if model.is_local_file() {
            self.models.retain(|m| m.id != id);
        } else {
            let entry = self.model_mut(id)?;
            entry.is_downloaded = false;
            entry.progress = 0.0;
        }
        if self.active_model_id.as_deref() == Some(id) {
            self.active_model_id = None;
        }
        self.persist()
    }

    fn cancel_download(&mut self, id: &str) -> bool {
        match self.downloads.get(id) {
            Some(state) => {
                state.cancel.store(true, Ordering::SeqCst);
                info!("Cancellation requested for download of '{}'.", id);
                true
            }
            None => false,
        }
    }

    fn check_space_and_download(&mut self, id: &str) -> Result<DownloadTicket, StoreError> {
        let model = self.get(id).cloned().ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if model.is_downloaded {
            return Err(StoreError::AlreadyDownloaded(id.to_string()));
        }
        if self.is_downloading(id) {
            return Err(StoreError::AlreadyDownloading(id.to_string()));
        }
        if model.download_url.is_empty() {
            return Err(StoreError::NoDownloadUrl(id.to_string()));
        }
        let destination = self.model_path(&model);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        let available = fs2::available_space(&self.models_dir)?;
        ensure_space(model.size, available)?;

        let cancel = Arc::new(AtomicBool::new(false));
        self.downloads.insert(
            id.to_string(),
            DownloadState {
                progress: 0.0,
                cancel: cancel.clone(),
            },
        );
        Ok(DownloadTicket {
            model_id: model.id,
            url: model.download_url,
            destination,
            cancel,
        })
    }

    fn remove_model_from_list(&mut self, id: &str) -> Result<(), StoreError> {
        let model = self.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !model.is_hf() || model.is_downloaded || self.is_downloading(id) {
            return Err(StoreError::NotRemovable(id.to_string()));
        }
        self.models.retain(|m| m.id != id);
        self.persist()
    }

    fn update_completion_settings(&mut self, id: &str, settings: CompletionSettings) -> Result<(), StoreError> {
        self.model_mut(id)?.completion_settings = settings;
        self.persist()
    }

    fn reset_completion_settings(&mut self, id: &str) -> Result<CompletionSettings, StoreError> {
        let model = self.model_mut(id)?;
        model.completion_settings = model.default_completion_settings.clone();
        let settings = model.completion_settings.clone();
        self.persist()?;
        Ok(settings)
    }

    /// Restores preset metadata and default settings. Files on disk and
    /// local models are left alone.
    fn reset_models(&mut self) -> Result<(), StoreError> {
        let presets = default_models();
        for model in self.models.iter_mut() {
            if model.is_local_file() {
                continue;
            }
            match presets.iter().find(|p| p.id == model.id) {
                Some(preset) => {
                    let is_downloaded = model.is_downloaded;
                    let progress = model.progress;
                    *model = preset.clone();
                    model.is_downloaded = is_downloaded;
                    model.progress = progress;
                }
                None => model.completion_settings = model.default_completion_settings.clone(),
            }
        }
        info!("Model settings reset to defaults.");
        self.persist()
    }

    fn refresh_download_statuses(&mut self) -> Result<(), StoreError> {
        let local_dir = self.local_models_dir();
        let models_dir = self.models_dir.clone();
        let downloads = &self.downloads;
        let mut vanished = Vec::new();
        for model in self.models.iter_mut() {
            if downloads.contains_key(&model.id) {
                continue;
            }
            let path = if model.is_local_file() {
                local_dir.join(&model.filename)
            } else {
                models_dir.join(&model.id)
            };
            let on_disk = path.exists();
            if model.is_local_file() && !on_disk {
                vanished.push(model.id.clone());
            }
            model.is_downloaded = on_disk;
            model.progress = if on_disk { 100.0 } else { 0.0 };
        }
        if !vanished.is_empty() {
            warn!("Local model files missing, dropping entries: {:?}", vanished);
            self.models.retain(|m| !vanished.contains(&m.id));
        }
        if let Some(active) = self.active_model_id.clone() {
            if !self.get(&active).is_some_and(|m| m.is_downloaded) {
                self.active_model_id = None;
            }
        }
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::model::DEFAULT_MODEL_ID;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, LocalModelStore) {
        let dir = TempDir::new().expect("create tempdir");
        let store = LocalModelStore::open(dir.path()).expect("open store");
        (dir, store)
    }

    fn put_file(path: &Path, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn fresh_store_contains_presets_not_downloaded() {
        let (_dir, store) = open_store();
        assert_eq!(store.models().len(), default_models().len());
        assert!(store.models().iter().all(|m| !m.is_downloaded));
        assert!(store.active_model_id().is_none());
    }

    #[test]
    fn catalog_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = LocalModelStore::open(dir.path()).unwrap();
            let preset = store.get(DEFAULT_MODEL_ID).cloned().unwrap();
            put_file(&store.model_path(&preset), b"weights");
            store.refresh_download_statuses().unwrap();
            store.set_active_model(Some(DEFAULT_MODEL_ID)).unwrap();
        }
        let store = LocalModelStore::open(dir.path()).unwrap();
        assert_eq!(store.active_model_id(), Some(DEFAULT_MODEL_ID));
        assert!(store.get(DEFAULT_MODEL_ID).unwrap().is_downloaded);
    }

    #[test]
    fn delete_local_model_drops_entry_and_file() {
        let (_dir, mut store) = open_store();
        let path = store.local_models_dir().join("mine.gguf");
        put_file(&path, b"1234");
        let model = store.add_local_model(&path).unwrap();
        assert_eq!(model.size, 4);
        store.set_active_model(Some("mine.gguf")).unwrap();

        store.delete_model("mine.gguf").unwrap();
        assert!(store.get("mine.gguf").is_none());
        assert!(!path.exists());
        assert!(store.active_model_id().is_none());
    }

    #[test]
    fn delete_preset_keeps_entry() {
        let (_dir, mut store) = open_store();
        let preset = store.get(DEFAULT_MODEL_ID).cloned().unwrap();
        put_file(&store.model_path(&preset), b"x");
        store.refresh_download_statuses().unwrap();

        store.delete_model(DEFAULT_MODEL_ID).unwrap();
        let entry = store.get(DEFAULT_MODEL_ID).unwrap();
        assert!(!entry.is_downloaded);
    }

    #[test]
    fn readding_a_replaced_local_file_updates_in_place() {
        let (_dir, mut store) = open_store();
        let path = store.local_models_dir().join("same.gguf");
        put_file(&path, b"old");
        store.add_local_model(&path).unwrap();
        put_file(&path, b"newer!");
        store.add_local_model(&path).unwrap();
        let matches: Vec<&Model> = store.models().iter().filter(|m| m.id == "same.gguf").collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].size, 6);
    }

    #[test]
    fn download_lifecycle_tracks_progress_and_cancel() {
        let (_dir, mut store) = open_store();
        let id = store.add_hf_model("someone/tiny-GGUF/tiny.gguf", 16).unwrap().id;
        let ticket = store.check_space_and_download(&id).unwrap();
        assert!(ticket.url.ends_with("/resolve/main/tiny.gguf"));
        assert!(ticket.destination.ends_with("someone/tiny-GGUF/tiny.gguf"));
        assert!(store.is_downloading(&id));
        assert!(matches!(
            store.check_space_and_download(&id),
            Err(StoreError::AlreadyDownloading(_))
        ));

        store.set_download_progress(&id, 0.5);
        assert_eq!(store.download_progress(&id), Some(0.5));

        assert!(store.cancel_download(&id));
        assert!(ticket.cancel.load(Ordering::SeqCst));

        store.finish_download(&id, false).unwrap();
        assert!(!store.is_downloading(&id));
        assert!(!store.cancel_download(&id));
        assert!(!store.get(&id).unwrap().is_downloaded);
    }

    #[test]
    fn downloaded_models_cannot_be_fetched_again() {
        let (_dir, mut store) = open_store();
        let path = store.local_models_dir().join("here.gguf");
        put_file(&path, b"h");
        store.add_local_model(&path).unwrap();
        assert!(matches!(
            store.check_space_and_download("here.gguf"),
            Err(StoreError::AlreadyDownloaded(_))
        ));
        assert!(matches!(
            store.check_space_and_download("missing"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn space_check_uses_margin() {
        assert!(ensure_space(1000, 1100).is_ok());
        assert!(matches!(
            ensure_space(1000, 1099),
            Err(StoreError::InsufficientSpace { required: 1100, available: 1099 })
        ));
    }

    #[test]
    fn only_undownloaded_hf_models_are_removable() {
        let (_dir, mut store) = open_store();
        assert!(matches!(
            store.remove_model_from_list(DEFAULT_MODEL_ID),
            Err(StoreError::NotRemovable(_))
        ));
        let model = store.add_hf_model("someone/some-repo/model.gguf", 10).unwrap();
        assert!(model.is_hf());
        store.remove_model_from_list(&model.id).unwrap();
        assert!(store.get(&model.id).is_none());
        assert!(matches!(store.add_hf_model("not-an-id", 0), Err(StoreError::InvalidHfId(_))));
        assert!(matches!(store.add_hf_model("author//file.gguf", 0), Err(StoreError::InvalidHfId(_))));
    }

    #[test]
    fn reset_restores_defaults_but_keeps_local_models() {
        let (_dir, mut store) = open_store();
        let path = store.local_models_dir().join("keep.gguf");
        put_file(&path, b"k");
        store.add_local_model(&path).unwrap();
        let tweaked = CompletionSettings {
            temperature: 1.5,
            ..CompletionSettings::default()
        };
        store.update_completion_settings("keep.gguf", tweaked.clone()).unwrap();
        store.update_completion_settings(DEFAULT_MODEL_ID, tweaked.clone()).unwrap();

        store.reset_models().unwrap();
        assert_eq!(store.get("keep.gguf").unwrap().completion_settings, tweaked);
        let preset = store.get(DEFAULT_MODEL_ID).unwrap();
        assert_eq!(preset.completion_settings, preset.default_completion_settings);
    }

    #[test]
    fn refresh_drops_vanished_local_models() {
        let (_dir, mut store) = open_store();
        let path = store.local_models_dir().join("gone.gguf");
        put_file(&path, b"g");
        store.add_local_model(&path).unwrap();
        fs::remove_file(&path).unwrap();
        store.refresh_download_statuses().unwrap();
        assert!(store.get("gone.gguf").is_none());
    }
}
