//! Shared initialization for CLI commands.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{load_pipeline_config, PipelineConfig};
use crate::models::StoryBible;
use crate::services::{
    BibleContextLookup, CachedContextLookup, CommandTextGenerator, ContextLookup,
    NoopContextLookup, NoopTextGenerator, Pipeline, TextGenerator,
};
use crate::session::ResultStore;

/// Story bible picked up from the data directory when none is given.
pub const DEFAULT_BIBLE_FILES: &[&str] = &["bible.yaml", "bible.yml", "bible.json"];

/// Application context holding config, collaborators and persistence.
pub struct AppContext {
    pub data_path: PathBuf,
    pub config: Arc<PipelineConfig>,
    pub lookup: Arc<CachedContextLookup>,
    pub generator: Arc<dyn TextGenerator>,
    pub store: ResultStore,
}

impl AppContext {
    /// Initialize application context.
    ///
    /// Data path priority: explicit path > BEATFRAME_DATA_PATH env > ./.beatframe (if exists) > ~/.beatframe
    pub fn new(
        explicit_path: Option<PathBuf>,
        config_path: Option<&Path>,
        bible_path: Option<&Path>,
    ) -> Result<Self> {
        let data_path = explicit_path
            .or_else(|| std::env::var("BEATFRAME_DATA_PATH").ok().map(PathBuf::from))
            .or_else(|| {
                let local_path = Path::new(".beatframe");
                if local_path.exists() && local_path.is_dir() {
                    Some(local_path.to_path_buf())
                } else {
                    None
                }
            })
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".beatframe"))
                    .unwrap_or_else(|| PathBuf::from(".beatframe"))
            });

        tracing::info!("Using data path: {}", data_path.display());

        let config = Arc::new(load_pipeline_config(&data_path, config_path)?);

        // Context lookup
        let bible_path = bible_path.map(Path::to_path_buf).or_else(|| {
            DEFAULT_BIBLE_FILES
                .iter()
                .map(|name| data_path.join(name))
                .find(|p| p.exists())
        });
        let inner: Arc<dyn ContextLookup> = match bible_path {
            Some(path) => {
                let bible: StoryBible = read_document(&path)?;
                tracing::info!(
                    "Story bible loaded: {} characters, {} locations",
                    bible.characters.len(),
                    bible.locations.len()
                );
                Arc::new(BibleContextLookup::new(bible))
            }
            None => {
                tracing::warn!("No story bible; every subject and location uses generic defaults");
                Arc::new(NoopContextLookup)
            }
        };
        let lookup = Arc::new(CachedContextLookup::from_config(inner, &config));

        // Text generator
        let generator: Arc<dyn TextGenerator> =
            match CommandTextGenerator::from_config(&config.text_generator) {
                Some(generator) => {
                    tracing::info!("Fill-in collaborator: {}", generator.name());
                    Arc::new(generator)
                }
                None => {
                    tracing::info!("No text generator configured; fill-in uses defaults");
                    Arc::new(NoopTextGenerator)
                }
            };

        let store = ResultStore::new(&data_path);

        Ok(Self {
            data_path,
            config,
            lookup,
            generator,
            store,
        })
    }

    /// Build a pipeline over this context's collaborators.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.lookup.clone(),
            self.generator.clone(),
            self.config.clone(),
        )
    }
}

/// Read a YAML or JSON document, chosen by file extension.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file '{}'", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON '{}'", path.display()))
    } else {
        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse YAML '{}'", path.display()))
    }
}
