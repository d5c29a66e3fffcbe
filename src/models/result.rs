//! Per-beat results and the episode result set handed to persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::cinematography::{CameraAngle, ShotType};
use crate::models::prompt::{CompiledPrompt, FillInStatus};
use crate::models::scene::SceneKey;
use crate::models::time::TimeContext;

/// Rendering parameters for the image-rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub cfg_scale: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            model: "flux1-dev".to_string(),
            width: 1344,
            height: 768,
            steps: 28,
            cfg_scale: 3.5,
        }
    }
}

/// Request for the image-rendering collaborator. Never sent by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub beat_id: String,
    pub prompt: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub cfg_scale: f32,
}

impl RenderRequest {
    pub fn new(prompt: &CompiledPrompt, params: &RenderParams) -> Self {
        Self {
            beat_id: prompt.beat_id().to_string(),
            prompt: prompt.text().to_string(),
            model: params.model.clone(),
            width: params.width,
            height: params.height,
            steps: params.steps,
            cfg_scale: params.cfg_scale,
        }
    }
}

/// Everything produced for one successfully compiled beat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatResult {
    pub beat_id: String,
    pub scene: SceneKey,
    pub order: u32,
    pub shot: ShotType,
    pub angle: CameraAngle,
    pub variety_adjusted: bool,
    pub time: TimeContext,
    pub reason: String,
    pub fill_in: FillInStatus,
    pub prompt: CompiledPrompt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderRequest>,
}

/// A beat that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatFailure {
    pub beat_id: String,
    pub scene_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    pub beats: usize,
    pub compiled: usize,
    pub failed: usize,
    /// Beats not started because the batch was cancelled.
    pub skipped: usize,
    pub variety_adjustments: usize,
    pub fill_ins: usize,
    pub repairs: usize,
    pub warnings: usize,
}

/// Compiled-result set for one episode: the unit handed to persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeResultSet {
    pub session_id: Uuid,
    pub story_id: String,
    pub episode_number: u32,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Keyed by `{scene}/{beat_id}`, e.g. `ep1-s2/b1`.
    pub results: BTreeMap<String, BeatResult>,
    #[serde(default)]
    pub failures: Vec<BeatFailure>,
    #[serde(default)]
    pub cancelled: bool,
    /// Time of day at the end of the episode, for the next episode's start.
    #[serde(default)]
    pub ending_time: Option<crate::models::time::TimeOfDay>,
    pub totals: RunTotals,
}

impl EpisodeResultSet {
    pub fn new(story_id: impl Into<String>, episode_number: u32, title: Option<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            story_id: story_id.into(),
            episode_number,
            title,
            created_at: Utc::now(),
            results: BTreeMap::new(),
            failures: Vec::new(),
            cancelled: false,
            ending_time: None,
            totals: RunTotals::default(),
        }
    }

    /// Map key of a beat: beat ids only need to be unique within a scene.
    pub fn key(scene: SceneKey, beat_id: &str) -> String {
        format!("{}/{}", scene, beat_id)
    }

    /// Add a compiled beat. A second result for the same scene and beat id
    /// is recorded as a failure; the first one is kept.
    pub fn insert(&mut self, result: BeatResult) {
        let key = Self::key(result.scene, &result.beat_id);
        if self.results.contains_key(&key) {
            tracing::warn!(%key, "Duplicate beat result dropped");
            self.record_failure(BeatFailure {
                beat_id: result.beat_id,
                scene_id: result.scene.to_string(),
                message: "duplicate beat_id in scene; first occurrence kept".to_string(),
            });
            return;
        }

        let report = result.prompt.report();
        self.totals.compiled += 1;
        self.totals.repairs += report.repairs();
        self.totals.warnings += report.warnings.len();
        if result.variety_adjusted {
            self.totals.variety_adjustments += 1;
        }
        if result.fill_in.used_collaborator() {
            self.totals.fill_ins += 1;
        }
        self.results.insert(key, result);
    }

    /// Result for one beat of one scene of this episode.
    pub fn get(&self, scene: u32, beat_id: &str) -> Option<&BeatResult> {
        let key = SceneKey {
            episode: self.episode_number,
            scene,
        };
        self.results.get(&Self::key(key, beat_id))
    }

    /// Results matching a scene-qualified key (`ep1-s2/b1`) or a bare beat
    /// id, in scene order.
    pub fn find_all(&self, id: &str) -> Vec<&BeatResult> {
        if let Some(result) = self.results.get(id) {
            return vec![result];
        }
        self.ordered()
            .into_iter()
            .filter(|r| r.beat_id == id)
            .collect()
    }

    /// First match of `find_all`.
    pub fn find(&self, id: &str) -> Option<&BeatResult> {
        self.find_all(id).into_iter().next()
    }

    pub fn record_failure(&mut self, failure: BeatFailure) {
        self.totals.failed += 1;
        self.failures.push(failure);
    }

    /// Results in scene then beat order.
    pub fn ordered(&self) -> Vec<&BeatResult> {
        let mut results: Vec<&BeatResult> = self.results.values().collect();
        results.sort_by_key(|r| (r.scene, r.order));
        results
    }

    /// Render requests for every compiled beat, in scene order.
    pub fn render_requests(&self) -> Vec<&RenderRequest> {
        self.ordered()
            .into_iter()
            .filter_map(|r| r.render.as_ref())
            .collect()
    }
}
