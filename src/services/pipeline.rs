//! Episode orchestration: time resolution, then Phases A through D per beat.
//!
//! Time of day is resolved sequentially across scenes first, since each
//! scene inherits the previous scene's ending time. Scenes then compile
//! concurrently with bounded parallelism; within a scene beats run strictly in
//! order because continuity and variety state flow from beat to beat.

use futures::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Instrument;

use crate::config::PipelineConfig;
use crate::error::BeatframeError;
use crate::models::{
    BeatFailure, BeatResult, EpisodeInput, EpisodeResultSet, RenderRequest, SceneContext,
    SceneInput, TimeContext,
};
use crate::services::continuity::ContinuityState;
use crate::services::fill_in::FillInCoordinator;
use crate::services::generator::TextGenerator;
use crate::services::lookup::ContextLookup;
use crate::services::progress::{noop_progress, CancellationFlag, ProgressReporter};
use crate::services::time_of_day;
use crate::services::validator::PromptValidator;
use crate::services::variety::VarietyState;
use crate::services::vbs_builder::{BeatInput, VbsBuilder};

/// Everything one scene produced.
#[derive(Debug, Default)]
struct SceneOutcome {
    results: Vec<BeatResult>,
    failures: Vec<BeatFailure>,
    skipped: usize,
    /// Position of the scene in the episode.
    position: usize,
    /// False when cancellation stopped the scene before its first beat.
    started: bool,
}

pub struct Pipeline {
    builder: VbsBuilder,
    fill_in: FillInCoordinator,
    validator: PromptValidator,
    config: Arc<PipelineConfig>,
    progress: Arc<dyn ProgressReporter>,
    cancel: CancellationFlag,
    render_requests: bool,
}

impl Pipeline {
    pub fn new(
        lookup: Arc<dyn ContextLookup>,
        generator: Arc<dyn TextGenerator>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            builder: VbsBuilder::new(lookup, config.clone()),
            fill_in: FillInCoordinator::new(generator, config.fill_in_timeout()),
            validator: PromptValidator::from_config(&config),
            config,
            progress: noop_progress(),
            cancel: CancellationFlag::new(),
            render_requests: false,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attach a render request to every compiled beat.
    pub fn with_render_requests(mut self, enabled: bool) -> Self {
        self.render_requests = enabled;
        self
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve each scene's time context in order.
    pub fn resolve_times(episode: &EpisodeInput) -> Vec<TimeContext> {
        let texts: Vec<String> = episode.scenes.iter().map(SceneInput::full_text).collect();
        time_of_day::resolve_sequence(texts.iter().map(String::as_str), episode.starting_time)
    }

    /// Compile every beat of an episode.
    ///
    /// Beat-level problems never abort the run: structural errors are recorded
    /// as failures, everything else degrades to defaults or warnings.
    pub async fn run_episode(&self, episode: &EpisodeInput) -> EpisodeResultSet {
        let mut result_set = EpisodeResultSet::new(
            episode.story_id.clone(),
            episode.episode_number,
            episode.title.clone(),
        );
        let total = episode.total_beats();
        result_set.totals.beats = total;

        let times = Self::resolve_times(episode);
        let scene_times: Vec<_> = times.iter().map(TimeContext::time).collect();

        tracing::info!(
            story_id = %episode.story_id,
            episode = episode.episode_number,
            scenes = episode.scenes.len(),
            beats = total,
            "Compiling episode"
        );

        let done = AtomicUsize::new(0);
        let mut inherited = episode.starting_time;
        let mut jobs = Vec::with_capacity(episode.scenes.len());
        for (position, (scene, time)) in episode.scenes.iter().zip(times).enumerate() {
            let context = scene.context(episode.episode_number, inherited);
            inherited = Some(time.time());
            jobs.push((position, scene, context, time));
        }

        let story_id = episode.story_id.as_str();
        let done_ref = &done;
        let mut outcomes = tokio_stream::iter(jobs)
            .map(|(position, scene, context, time)| {
                let span = tracing::info_span!("scene", scene = %context.key);
                self.run_scene(position, story_id, scene, context, time, done_ref, total)
                    .instrument(span)
            })
            .buffer_unordered(self.config.concurrency());

        let mut last_started = None;
        while let Some(outcome) = outcomes.next().await {
            if outcome.started {
                last_started = last_started.max(Some(outcome.position));
            }
            for result in outcome.results {
                result_set.insert(result);
            }
            for failure in outcome.failures {
                result_set.record_failure(failure);
            }
            result_set.totals.skipped += outcome.skipped;
        }

        // The clock only reaches scenes that actually ran.
        result_set.ending_time = last_started.and_then(|i| scene_times.get(i).copied());
        result_set.cancelled = self.cancel.is_cancelled();
        self.progress.finish().await;
        tracing::info!(
            compiled = result_set.totals.compiled,
            failed = result_set.totals.failed,
            skipped = result_set.totals.skipped,
            cancelled = result_set.cancelled,
            "Episode compiled"
        );
        result_set
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_scene(
        &self,
        position: usize,
        story_id: &str,
        scene: &SceneInput,
        context: SceneContext,
        time: TimeContext,
        done: &AtomicUsize,
        total: usize,
    ) -> SceneOutcome {
        let mut outcome = SceneOutcome {
            position,
            ..Default::default()
        };
        let mut continuity = ContinuityState::new(context.key);
        let mut variety = VarietyState::new();
        let mut seen = HashSet::new();
        let beat_count = scene.beats.len();

        for (index, draft) in scene.beats.iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcome.skipped = beat_count - index;
                tracing::info!(skipped = outcome.skipped, "Cancelled; skipping remaining beats");
                break;
            }

            let beat = match draft.validate(context.key, index, &context.location) {
                Ok(beat) => beat,
                Err(e) => {
                    tracing::warn!("Skipping malformed beat: {}", e);
                    let beat_id = draft
                        .beat_id
                        .clone()
                        .filter(|id| !id.trim().is_empty())
                        .unwrap_or_else(|| format!("#{}", index + 1));
                    outcome.failures.push(BeatFailure {
                        beat_id,
                        scene_id: context.key.to_string(),
                        message: e.to_string(),
                    });
                    self.report(done, total, None).await;
                    continue;
                }
            };

            if !seen.insert(beat.beat_id.clone()) {
                let e = BeatframeError::structural(
                    &beat.beat_id,
                    context.key.to_string(),
                    "duplicate beat_id in scene",
                );
                tracing::warn!("Skipping duplicate beat: {}", e);
                outcome.failures.push(BeatFailure {
                    beat_id: beat.beat_id.clone(),
                    scene_id: context.key.to_string(),
                    message: e.to_string(),
                });
                self.report(done, total, None).await;
                continue;
            }

            let input = BeatInput {
                story_id,
                beat: &beat,
                scene: &context,
                time: &time,
                index,
                total: beat_count,
            };
            let span = tracing::debug_span!("beat", beat_id = %beat.beat_id);
            let (result, next_continuity, next_variety) = async {
                let (mut vbs, continuity, variety) =
                    self.builder.build(input, continuity, variety).await;
                let fill_in = self.fill_in.fill(&mut vbs, &context).await;
                let prompt = self.validator.validate(&mut vbs);
                let render = self
                    .render_requests
                    .then(|| RenderRequest::new(&prompt, &self.config.render));
                let result = BeatResult {
                    beat_id: beat.beat_id.clone(),
                    scene: context.key,
                    order: beat.order,
                    shot: vbs.shot,
                    angle: vbs.angle,
                    variety_adjusted: vbs.variety_adjusted,
                    time: vbs.time.clone(),
                    reason: vbs.reason.clone(),
                    fill_in,
                    prompt,
                    render,
                };
                (result, continuity, variety)
            }
            .instrument(span)
            .await;
            continuity = next_continuity;
            variety = next_variety;

            self.report(done, total, Some(result.beat_id.clone())).await;
            outcome.results.push(result);
        }
        outcome.started = if beat_count == 0 {
            !self.cancel.is_cancelled()
        } else {
            outcome.skipped < beat_count
        };
        outcome
    }

    async fn report(&self, done: &AtomicUsize, total: usize, message: Option<String>) {
        let current = done.fetch_add(1, Ordering::SeqCst) + 1;
        self.progress.report(current, total, message).await;
    }
}
