//! Test harness for pipeline runs.
//!
//! Provides an isolated data directory per test plus scripted collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use beatframe::config::PipelineConfig;
use beatframe::models::{
    AppearanceContext, AtmosphereCategory, CharacterProfile, LocationProfile, Setting, StoryBible,
};
use beatframe::services::{
    BibleContextLookup, FillInRequest, NoopTextGenerator, Pipeline, TextGenerator,
};
use beatframe::session::ResultStore;
use beatframe::BeatframeError;

/// Test harness that owns a temporary data directory.
///
/// The directory is cleaned up when the harness is dropped.
pub struct TestHarness {
    pub temp_dir: TempDir,
    pub config: PipelineConfig,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            config: PipelineConfig::default(),
        }
    }

    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    pub fn store(&self) -> ResultStore {
        ResultStore::new(self.temp_path())
    }

    /// Pipeline over the test bible with no fill-in collaborator.
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline_with(Arc::new(NoopTextGenerator))
    }

    /// Pipeline over the test bible with the given fill-in collaborator.
    pub fn pipeline_with(&self, generator: Arc<dyn TextGenerator>) -> Pipeline {
        Pipeline::new(
            Arc::new(BibleContextLookup::new(test_bible())),
            generator,
            Arc::new(self.config.clone()),
        )
    }
}

/// Story bible with two riders, a medic base and a desert road.
pub fn test_bible() -> StoryBible {
    StoryBible {
        story_id: "cat-daniel".to_string(),
        characters: vec![
            CharacterProfile {
                name: "Cat".to_string(),
                aliases: vec!["Catherine".to_string()],
                trigger: Some("ct_rider".to_string()),
                base_description: Some("cropped dark hair, dusty riding leathers".to_string()),
                contexts: vec![AppearanceContext {
                    location: Some("Medical Base".to_string()),
                    clothing: Some("borrowed scrubs over a tank top".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            },
            CharacterProfile {
                name: "Daniel".to_string(),
                trigger: Some("dn_medic".to_string()),
                base_description: Some("lean build, stubble, field medic vest".to_string()),
                ..Default::default()
            },
        ],
        locations: vec![
            LocationProfile {
                name: "Desert Road".to_string(),
                shorthand: Some("desert road".to_string()),
                visual_details: Some("cracked two-lane highway through low dunes".to_string()),
                artifacts: vec!["burnt-out bus".to_string()],
                atmosphere: Some("tense, dusty wind".to_string()),
                atmosphere_category: Some(AtmosphereCategory::Tense),
                setting: Some(Setting::Exterior),
                ..Default::default()
            },
            LocationProfile {
                name: "Medical Base".to_string(),
                shorthand: Some("medical base".to_string()),
                description: Some("converted shipping containers with canvas awnings".to_string()),
                atmosphere: Some("clinical".to_string()),
                setting: Some(Setting::Interior),
                ..Default::default()
            },
        ],
    }
}

/// Generator that always answers with the same text and counts calls.
pub struct ScriptedGenerator {
    reply: String,
    pub calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _request: &FillInRequest) -> Result<String, BeatframeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Generator that never answers in time.
pub struct StalledGenerator;

#[async_trait]
impl TextGenerator for StalledGenerator {
    async fn generate(&self, _request: &FillInRequest) -> Result<String, BeatframeError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(String::new())
    }

    fn name(&self) -> &str {
        "stalled"
    }
}
