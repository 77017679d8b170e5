// src/app/config.rs
// Defines configuration structures, constants and initial setup for LlamaNest settings, including the persisted models-screen state and the inference settings.

use crate::app::grouping::{ExpandedGroups, FilterSet};

use chrono_tz::Tz;
use dotenvy::dotenv;
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, str::FromStr};

// --- Global Configuration Block ---
pub const SCRIPT_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_NUMBER: &str = "1";
pub const APP_NAME: &str = "LlamaNest";
pub const DEFAULT_TZ: &str = "UTC";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DATA_DIR_ENV: &str = "LLAMANEST_DATA_DIR";

/// Smallest context window the inference engine accepts.
pub const MIN_CONTEXT_SIZE: u32 = 200;

// --- Configuration Structs ---

/// Configuration loaded from environment/.env for logger setup and defaults.
#[derive(Clone, Debug)]
pub struct InitialConfig {
    pub log_level: LevelFilter,
    pub tz: Tz,
    pub data_dir: PathBuf,
}

/// KV cache quantisation offered by the inference engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheType {
    F32,
    F16,
    Q8_0,
    Q5_1,
    Q5_0,
    Q4_1,
    Q4_0,
    IQ4_NL,
}

impl CacheType {
    pub fn all() -> [CacheType; 8] {
        [
            Self::F32,
            Self::F16,
            Self::Q8_0,
            Self::Q5_1,
            Self::Q5_0,
            Self::Q4_1,
            Self::Q4_0,
            Self::IQ4_NL,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::F32 => "F32 (full precision)",
            Self::F16 => "F16 (default)",
            Self::Q8_0 => "Q8_0",
            Self::Q5_1 => "Q5_1",
            Self::Q5_0 => "Q5_0",
            Self::Q4_1 => "Q4_1",
            Self::Q4_0 => "Q4_0",
            Self::IQ4_NL => "IQ4_NL",
        }
    }
}

/// Model initialisation settings handed to the inference engine when a model is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub n_context: u32,
    pub n_batch: u32,
    pub n_ubatch: u32,
    pub n_threads: u32,
    pub flash_attn: bool,
    pub cache_type_k: CacheType,
    pub cache_type_v: CacheType,
    pub use_metal: bool,
    pub n_gpu_layers: u32,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        let max_threads = max_threads();
        Self {
            n_context: 1024,
            n_batch: 512,
            n_ubatch: 512,
            n_threads: if max_threads >= 4 { (max_threads * 4 / 5).max(1) } else { max_threads },
            flash_attn: false,
            cache_type_k: CacheType::F16,
            cache_type_v: CacheType::F16,
            use_metal: cfg!(target_os = "macos"),
            n_gpu_layers: 50,
        }
    }
}

/// Number of hardware threads the sliders allow.
pub fn max_threads() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

/// Persisted state of the models screen (filters and collapsed groups).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ModelsScreenState {
    pub filters: FilterSet,
    pub expanded_groups: ExpandedGroups,
}

/// Persistently stored application settings using confy.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppSettings {
    pub log_level: String,
    pub tz: String,
    pub data_dir: String,
    pub models_screen: ModelsScreenState,
    pub inference: InferenceSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        let initial_config = load_initial_config();
        AppSettings {
            log_level: initial_config.log_level.to_string(),
            tz: initial_config.tz.name().to_string(),
            data_dir: initial_config.data_dir.display().to_string(),
            models_screen: ModelsScreenState::default(),
            inference: InferenceSettings::default(),
        }
    }
}

impl AppSettings {
    /// Parses the stored timezone, falling back to UTC.
    pub fn timezone(&self) -> Tz {
        Tz::from_str(&self.tz).unwrap_or_else(|_| {
            warn!("Invalid TZ '{}' in settings, falling back to UTC.", self.tz);
            Tz::UTC
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

// --- Configuration Loading Functions ---

/// Loads the *initial* configuration settings.
/// Priority: Environment Variables > .env file > Hardcoded Defaults.
/// Used for the logger and as defaults before `confy` loads `AppSettings`.
pub fn load_initial_config() -> InitialConfig {
    dotenv().ok();

    let tz_str = env::var("TZ").unwrap_or_else(|_| DEFAULT_TZ.to_string());
    let tz = Tz::from_str(&tz_str).unwrap_or_else(|err| {
        // Logger may not be up yet.
        eprintln!(
            "WARN: Invalid TZ '{}' from env/default. Falling back to UTC. Error: {}",
            tz_str, err
        );
        Tz::UTC
    });

    let log_level_str = env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
    let log_level = LevelFilter::from_str(&log_level_str).unwrap_or_else(|err| {
        eprintln!(
            "WARN: Invalid LOG_LEVEL '{}' from env/default. Falling back to {}. Error: {}",
            log_level_str, DEFAULT_LOG_LEVEL, err
        );
        LevelFilter::Info
    });

    let data_dir = env::var(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_data_dir());

    InitialConfig {
        log_level,
        tz,
        data_dir,
    }
}

/// Places the data directory next to the confy configuration file.
fn default_data_dir() -> PathBuf {
    match confy::get_configuration_file_path(APP_NAME, None) {
        Ok(path) => path
            .parent()
            .map(|p| p.join("data"))
            .unwrap_or_else(|| PathBuf::from("llamanest-data")),
        Err(e) => {
            eprintln!(
                "WARN: Could not determine config directory ({}). Using ./llamanest-data",
                e
            );
            PathBuf::from("llamanest-data")
        }
    }
}
