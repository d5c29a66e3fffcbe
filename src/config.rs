//! Pipeline configuration.
//!
//! Loaded from an explicit path, `{data_path}/beatframe.toml`, `BEATFRAME_*`
//! env vars, or defaults, in that order.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::models::{FaceTagPolicy, PromptField, RenderParams, TokenBudget};
use crate::BeatframeError;

/// Config file name inside the data directory.
pub const CONFIG_FILE: &str = "beatframe.toml";

/// External text-generation command. Unset means fill-in always falls back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextGeneratorConfig {
    pub command: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub token_budget_min: usize,
    pub token_budget_max: usize,
    pub fill_in_timeout_secs: u64,
    /// Scenes compiled concurrently.
    pub max_concurrent_scenes: usize,
    pub face_tag_policy: FaceTagPolicy,
    /// `{n}` is replaced by the 1-based subject index.
    pub face_tag_template: String,
    /// Merged with the built-in placeholder list.
    pub forbidden_terms: Vec<String>,
    pub drop_order: Vec<PromptField>,
    pub lookup_cache_capacity: u64,
    pub lookup_cache_ttl_secs: u64,
    pub render: RenderParams,
    pub text_generator: TextGeneratorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            token_budget_min: 30,
            token_budget_max: 180,
            fill_in_timeout_secs: 20,
            max_concurrent_scenes: 4,
            face_tag_policy: FaceTagPolicy::VisibleFaces,
            face_tag_template: "<segment:yolo-face_yolov9c.pt-{n},0.35,0.5>".to_string(),
            forbidden_terms: Vec::new(),
            drop_order: PromptField::default_drop_order(),
            lookup_cache_capacity: 1000,
            lookup_cache_ttl_secs: 600,
            render: RenderParams::default(),
            text_generator: TextGeneratorConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn budget(&self) -> TokenBudget {
        let max = self.token_budget_max.max(1);
        TokenBudget {
            min: self.token_budget_min.min(max),
            max,
        }
    }

    pub fn fill_in_timeout(&self) -> Duration {
        Duration::from_secs(self.fill_in_timeout_secs)
    }

    pub fn concurrency(&self) -> usize {
        self.max_concurrent_scenes.max(1)
    }

    /// Apply `BEATFRAME_*` env overrides for individual knobs.
    pub fn apply_env(mut self) -> Self {
        if let Some(n) = env_number("BEATFRAME_MAX_CONCURRENCY") {
            self.max_concurrent_scenes = n as usize;
        }
        if let Some(n) = env_number("BEATFRAME_FILL_IN_TIMEOUT") {
            self.fill_in_timeout_secs = n;
        }
        if let Some(n) = env_number("BEATFRAME_TOKEN_BUDGET_MAX") {
            self.token_budget_max = n as usize;
        }
        self
    }

    /// Parse a config file. Errors are returned, not swallowed.
    pub fn from_file(path: &Path) -> Result<Self, BeatframeError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BeatframeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            BeatframeError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

fn env_number(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("Ignoring {}={}: not a number", key, raw);
            None
        }
    }
}

/// Load pipeline config with priority:
/// 1. `explicit` path (errors if unreadable)
/// 2. `{data_path}/beatframe.toml` file
/// 3. `BEATFRAME_*` env vars over defaults
pub fn load_pipeline_config(
    data_path: &Path,
    explicit: Option<&Path>,
) -> Result<PipelineConfig, BeatframeError> {
    if let Some(path) = explicit {
        let config = PipelineConfig::from_file(path)?;
        tracing::info!("Loaded pipeline config from {}", path.display());
        return Ok(config);
    }

    let config_path = data_path.join(CONFIG_FILE);
    if config_path.exists() {
        match PipelineConfig::from_file(&config_path) {
            Ok(config) => {
                tracing::info!("Loaded pipeline config from {}", config_path.display());
                return Ok(config);
            }
            Err(e) => {
                tracing::warn!("{}. Using default.", e);
            }
        }
    }

    Ok(PipelineConfig::default().apply_env())
}
