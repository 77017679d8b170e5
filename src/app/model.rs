// src/app/model.rs
// Model records, their provenance, per-model completion settings and the preset catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Model loaded when the user has not picked one yet.
pub const DEFAULT_MODEL_ID: &str =
    "unsloth/DeepSeek-R1-Distill-Qwen-1.5B-GGUF/DeepSeek-R1-Distill-Qwen-1.5B-Q4_K_M.gguf";

/// Where a model entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelOrigin {
    /// Shipped with the built-in catalog.
    Preset,
    /// Added from the Hugging Face hub.
    Hf,
    /// Imported by the user from a local file.
    Local,
}

/// Chat templates the inference engine knows how to apply.
pub const CHAT_TEMPLATES: [&str; 6] = ["default", "chatml", "deepseek", "llama3", "gemma", "qwen"];

/// Sampling settings applied to completions for a single model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub chat_template: String,
    pub n_predict: i32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub min_p: f32,
    pub penalty_repeat: f32,
    pub stop: Vec<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            chat_template: "default".to_string(),
            n_predict: 500,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            min_p: 0.05,
            penalty_repeat: 1.0,
            stop: vec!["</s>".to_string()],
        }
    }
}

impl CompletionSettings {
    /// Checks every field against its allowed range.
    /// Returns field name -> message for each offending field.
    pub fn validate(&self) -> BTreeMap<&'static str, String> {
        let mut errors = BTreeMap::new();
        if !CHAT_TEMPLATES.contains(&self.chat_template.as_str()) {
            errors.insert("chat_template", format!("Unknown template '{}'", self.chat_template));
        }
        // -1 means "until the model stops".
        if self.n_predict < -1 || self.n_predict == 0 || self.n_predict > 32_768 {
            errors.insert("n_predict", "Must be -1 or between 1 and 32768".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            errors.insert("temperature", "Must be between 0 and 2".to_string());
        }
        if self.top_k == 0 || self.top_k > 128 {
            errors.insert("top_k", "Must be between 1 and 128".to_string());
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            errors.insert("top_p", "Must be between 0 and 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_p) {
            errors.insert("min_p", "Must be between 0 and 1".to_string());
        }
        if !(0.0..=2.0).contains(&self.penalty_repeat) {
            errors.insert("penalty_repeat", "Must be between 0 and 2".to_string());
        }
        if self.stop.iter().any(|s| s.is_empty()) {
            errors.insert("stop", "Stop words cannot be empty".to_string());
        }
        errors
    }
}

/// Metadata describing a downloadable or importable model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub author: String,
    pub name: String,
    /// Category label, shown as the group name in grouped mode.
    #[serde(rename = "type")]
    pub model_type: String,
    #[serde(default)]
    pub description: String,
    pub size: u64,
    pub params: u64,
    pub is_downloaded: bool,
    #[serde(default)]
    pub progress: f32,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub hf_url: String,
    pub filename: String,
    pub is_local: bool,
    pub origin: ModelOrigin,
    #[serde(default)]
    pub completion_settings: CompletionSettings,
    #[serde(default)]
    pub default_completion_settings: CompletionSettings,
}

impl Model {
    /// Builds the record for a file imported from disk.
    pub fn local(file_name: &str, size: u64) -> Self {
        let name = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => file_name.to_string(),
        };
        Self {
            id: file_name.to_string(),
            author: String::new(),
            name,
            model_type: String::new(),
            description: String::new(),
            size,
            params: 0,
            is_downloaded: true,
            progress: 100.0,
            download_url: String::new(),
            hf_url: String::new(),
            filename: file_name.to_string(),
            is_local: true,
            origin: ModelOrigin::Local,
            completion_settings: CompletionSettings::default(),
            default_completion_settings: CompletionSettings::default(),
        }
    }

    pub fn is_hf(&self) -> bool {
        self.origin == ModelOrigin::Hf
    }

    pub fn is_local_file(&self) -> bool {
        self.origin == ModelOrigin::Local || self.is_local
    }
}

#[allow(clippy::too_many_arguments)]
fn preset(
    author: &str,
    repo: &str,
    filename: &str,
    name: &str,
    model_type: &str,
    description: &str,
    size: u64,
    params: u64,
    settings: CompletionSettings,
) -> Model {
    let hf_url = format!("https://huggingface.co/{}/{}", author, repo);
    Model {
        id: format!("{}/{}/{}", author, repo, filename),
        author: author.to_string(),
        name: name.to_string(),
        model_type: model_type.to_string(),
        description: description.to_string(),
        size,
        params,
        is_downloaded: false,
        progress: 0.0,
        download_url: format!("{}/resolve/main/{}", hf_url, filename),
        hf_url,
        filename: filename.to_string(),
        is_local: false,
        origin: ModelOrigin::Preset,
        completion_settings: settings.clone(),
        default_completion_settings: settings,
    }
}

/// Built-in catalog of recommended models.
pub fn default_models() -> Vec<Model> {
    let deepseek = CompletionSettings {
        chat_template: "deepseek".to_string(),
        n_predict: 2048,
        temperature: 0.7,
        penalty_repeat: 1.0,
        stop: vec!["</s>".to_string(), "<|im_end|>".to_string()],
        ..CompletionSettings::default()
    };
    let qwen = CompletionSettings {
        chat_template: "qwen".to_string(),
        n_predict: 1024,
        stop: vec!["<|im_end|>".to_string()],
        ..CompletionSettings::default()
    };
    vec![
        preset(
            "unsloth",
            "DeepSeek-R1-Distill-Qwen-1.5B-GGUF",
            "DeepSeek-R1-Distill-Qwen-1.5B-Q4_K_M.gguf",
            "DeepSeek R1 Deep Thinking (Recommended)",
            "DeepSeek Reasoning Model",
            "Lightweight and efficient, suitable for most devices",
            1_117_320_576,
            1_500_000_000,
            deepseek.clone(),
        ),
        preset(
            "unsloth",
            "DeepSeek-R1-Distill-Qwen-7B-GGUF",
            "DeepSeek-R1-Distill-Qwen-7B-Q4_K_M.gguf",
            "DeepSeek R1 7B",
            "DeepSeek Reasoning Model",
            "Stronger reasoning, needs a device with plenty of memory",
            4_683_073_248,
            7_000_000_000,
            deepseek,
        ),
        preset(
            "Qwen",
            "Qwen2.5-0.5B-Instruct-GGUF",
            "qwen2.5-0.5b-instruct-q2_k.gguf",
            "Qwen2.5 0.5B Instruct",
            "Qwen Chat Model",
            "Tiny and fast, good for quick answers",
            415_180_000,
            500_000_000,
            qwen.clone(),
        ),
        preset(
            "Qwen",
            "Qwen2.5-1.5B-Instruct-GGUF",
            "qwen2.5-1.5b-instruct-q5_k_m.gguf",
            "Qwen2.5 1.5B Instruct",
            "Qwen Chat Model",
            "Balanced quality and speed",
            1_285_494_304,
            1_540_000_000,
            qwen,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique_and_contain_default() {
        let models = default_models();
        let mut ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), models.len());
        assert!(models.iter().any(|m| m.id == DEFAULT_MODEL_ID));
    }

    #[test]
    fn local_model_uses_file_stem_as_name() {
        let model = Model::local("my-model.Q4.gguf", 42);
        assert_eq!(model.name, "my-model.Q4");
        assert_eq!(model.id, "my-model.Q4.gguf");
        assert!(model.is_local_file());
        assert!(model.is_downloaded);

        let bare = Model::local("weights", 1);
        assert_eq!(bare.name, "weights");
    }

    #[test]
    fn default_completion_settings_are_valid() {
        assert!(CompletionSettings::default().validate().is_empty());
        for model in default_models() {
            assert!(model.completion_settings.validate().is_empty(), "{}", model.id);
        }
    }

    #[test]
    fn validate_reports_each_bad_field() {
        let settings = CompletionSettings {
            temperature: 3.5,
            top_k: 0,
            n_predict: 0,
            stop: vec![String::new()],
            ..CompletionSettings::default()
        };
        let errors = settings.validate();
        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            vec!["n_predict", "stop", "temperature", "top_k"]
        );
    }

    #[test]
    fn model_type_serializes_as_type() {
        let json = serde_json::to_value(Model::local("a.gguf", 1)).unwrap();
        assert!(json.get("type").is_some());
        assert_eq!(json["origin"], "Local");
    }
}
