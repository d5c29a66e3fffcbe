//! Phase A: deterministic enrichment of a beat into a Visual Beat Spec.
//!
//! Reads the beat, scene context, resolved time, and the scene's continuity
//! and variety state; returns the VBS together with the updated states.

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::models::{
    AtmosphereCategory, Beat, CharacterContext, DepthOfField, EnvironmentBlock, FaceTagPolicy,
    HelmetState, LocationContext, PromptConstraints, PromptField, SceneContext, ScreenPosition,
    ShotType, Slot, SubjectBlock, TimeContext, VisualBeatSpec,
};
use crate::services::arc_visual;
use crate::services::continuity::{self, ContinuityState};
use crate::services::lookup::ContextLookup;
use crate::services::time_of_day;
use crate::services::variety::{self, VarietyState};

/// Appearance used when a character lookup misses.
pub const FALLBACK_APPEARANCE: &str = "figure in plain practical clothing";

/// Everything Phase A needs to know about one beat.
#[derive(Debug, Clone, Copy)]
pub struct BeatInput<'a> {
    pub story_id: &'a str,
    pub beat: &'a Beat,
    pub scene: &'a SceneContext,
    pub time: &'a TimeContext,
    /// Position of the beat in its scene.
    pub index: usize,
    pub total: usize,
}

/// Builds Visual Beat Specs.
pub struct VbsBuilder {
    lookup: Arc<dyn ContextLookup>,
    config: Arc<PipelineConfig>,
}

/// Deterministic composition phrase for a subject count.
pub(crate) fn default_composition(subjects: usize, shot: ShotType) -> &'static str {
    match subjects {
        0 if shot <= ShotType::Wide => "sweeping environmental composition",
        0 => "environmental detail composition",
        1 => "single subject on the rule of thirds",
        2 => "two-shot, subjects balanced left and right",
        _ => "layered group composition with foreground and background depth",
    }
}

impl VbsBuilder {
    pub fn new(lookup: Arc<dyn ContextLookup>, config: Arc<PipelineConfig>) -> Self {
        Self { lookup, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the VBS for one beat, threading scene state through.
    pub async fn build(
        &self,
        input: BeatInput<'_>,
        continuity: ContinuityState,
        variety: VarietyState,
    ) -> (VisualBeatSpec, ContinuityState, VarietyState) {
        let BeatInput {
            story_id,
            beat,
            scene,
            time,
            index,
            total,
        } = input;
        let mut notes = Vec::new();
        let continuity = continuity.for_scene(scene.key);

        // Framing: arc recommendation, authored hints, ad-break push-in, then variety.
        let rec = arc_visual::recommend(
            scene.arc_phase,
            beat.visual_significance,
            index,
            total,
            scene.intensity(),
        );
        let mut shot = beat.camera.shot.unwrap_or(rec.shot);
        let angle = beat.camera.angle.unwrap_or(rec.angle);
        let mut reason = rec.reason.clone();
        if beat.camera.shot.is_some() || beat.camera.angle.is_some() {
            reason.push_str("; authored camera hint");
        }
        if scene.ad_break && total > 0 && index + 1 == total {
            shot = shot.tighter();
            reason.push_str("; ad-break push-in");
        }
        let (variety, outcome) = variety::propose(variety, shot, angle);
        notes.extend(outcome.violations.iter().map(|v| v.to_string()));

        // Environment.
        let location = self.lookup_location(story_id, &beat.location).await;
        let environment_fallback = location.is_none();
        if environment_fallback && !beat.location.is_empty() {
            notes.push(format!(
                "WARNING: no location context for '{}'; using generic description",
                beat.location
            ));
        }
        let setting = time
            .setting()
            .or_else(|| beat.tagged_setting())
            .or_else(|| location.as_ref().and_then(|l| l.setting));
        let time = time.with_fallback_setting(setting);

        let mut lighting = vec![rec.lighting_style.to_string()];
        lighting.extend(
            time_of_day::lighting_tokens(time.time(), time.setting())
                .into_iter()
                .map(String::from),
        );

        let category = location
            .as_ref()
            .map(|l| l.atmosphere_category)
            .unwrap_or(AtmosphereCategory::Neutral);
        let mut atmosphere = location
            .as_ref()
            .map(|l| l.atmosphere.clone())
            .unwrap_or_default();
        if let Some(token) = scene.pacing.atmosphere_token() {
            atmosphere.push(token.to_string());
        }

        let mut props: Vec<String> = beat.vehicle.iter().cloned().collect();
        props.extend(beat.props.iter().cloned());

        let environment = EnvironmentBlock {
            location: location
                .as_ref()
                .map(|l| l.shorthand.clone())
                .unwrap_or_else(|| beat.location.to_lowercase()),
            visual: location
                .as_ref()
                .map(|l| l.visual_description.clone())
                .filter(|v| !v.is_empty())
                .unwrap_or_default(),
            anchors: location.map(|l| l.anchors).unwrap_or_default(),
            props,
            lighting,
            atmosphere,
            color_grade: category.color_grade().to_string(),
            setting: time.setting(),
            fallback: environment_fallback,
        };

        // Subjects.
        let needs_fill_in = beat.characters.len() >= 2 || beat.visual_significance.is_high();
        let layout = ScreenPosition::layout(beat.characters.len());
        let mut subjects = Vec::with_capacity(beat.characters.len());
        let mut continuity = continuity;

        for (i, character) in beat.characters.iter().enumerate() {
            let context = self
                .lookup_character(story_id, &character.id, &beat.location)
                .await;
            if context.is_none() {
                notes.push(format!(
                    "WARNING: no character context for '{}'; using generic description",
                    character.id
                ));
            }
            let carried = continuity::resolve(&continuity, &character.id);

            let helmet = character
                .helmet
                .or_else(|| {
                    carried
                        .as_ref()
                        .and_then(|c| c.helmet.as_ref())
                        .map(|h| h.value)
                })
                .or_else(|| context.as_ref().map(|c| c.helmet))
                .unwrap_or(HelmetState::Off);
            let face_visible = helmet.face_visible();

            let action = match (&character.action, carried.as_ref().and_then(|c| c.action.as_ref())) {
                (Some(text), _) => Slot::authored(text.as_str()),
                (None, Some(prev)) => Slot::carried(prev.value.as_str(), prev.source_beat.as_str()),
                (None, None) if needs_fill_in => Slot::pending(""),
                (None, None) => Slot::absent(),
            };
            let expression = match (
                &character.expression,
                carried.as_ref().and_then(|c| c.expression.as_ref()),
            ) {
                (Some(text), _) => Slot::authored(text.as_str()),
                (None, Some(prev)) if face_visible => {
                    Slot::carried(prev.value.as_str(), prev.source_beat.as_str())
                }
                (None, _) if needs_fill_in && face_visible => Slot::pending(""),
                (None, _) => Slot::absent(),
            };

            continuity = continuity::record_beat(
                continuity,
                &beat.beat_id,
                &character.id,
                character.action.as_deref(),
                character.expression.as_deref(),
            );
            if let Some(helmet) = character.helmet {
                continuity = continuity::record_helmet(continuity, &beat.beat_id, &character.id, helmet);
            }

            let fallback = context.is_none();
            let CharacterContext {
                trigger,
                appearance,
                face_tag,
                ..
            } = context.unwrap_or_else(|| CharacterContext {
                name: character.id.clone(),
                trigger: character.id.clone(),
                appearance: FALLBACK_APPEARANCE.to_string(),
                helmet,
                face_tag: None,
            });

            subjects.push(SubjectBlock {
                character_id: character.id.clone(),
                trigger,
                appearance: if appearance.is_empty() {
                    FALLBACK_APPEARANCE.to_string()
                } else {
                    appearance
                },
                action,
                expression,
                position: character.position.unwrap_or(layout[i]),
                face_visible,
                helmet,
                face_tag,
                fallback,
            });
        }
        self.assign_face_tags(&mut subjects);

        // Composition and constraints.
        let default = default_composition(subjects.len(), outcome.final_shot);
        let composition = if needs_fill_in {
            Slot::pending(default)
        } else {
            Slot::deterministic(default)
        };

        let mut required = vec![PromptField::Shot, PromptField::Angle];
        if !subjects.is_empty() {
            required.push(PromptField::Subjects);
        }
        if !environment.location.is_empty() || !environment.visual.is_empty() {
            required.push(PromptField::Location);
        }
        if !environment.props.is_empty() {
            required.push(PromptField::Props);
        }
        let constraints = PromptConstraints {
            budget: self.config.budget(),
            face_tag_policy: self.config.face_tag_policy,
            drop_order: self.config.drop_order.clone(),
            required,
        };

        let vbs = VisualBeatSpec {
            beat_id: beat.beat_id.clone(),
            scene: scene.key,
            shot: outcome.final_shot,
            angle: outcome.final_angle,
            depth_of_field: DepthOfField::for_shot(outcome.final_shot),
            composition,
            subjects,
            environment,
            constraints,
            time,
            reason,
            variety_adjusted: outcome.was_adjusted,
            needs_fill_in,
            narrative: beat.script_text.clone(),
            notes,
        };
        tracing::debug!(
            beat_id = %vbs.beat_id,
            shot = %vbs.shot,
            angle = %vbs.angle,
            fill_in = vbs.needs_fill_in,
            "Built visual beat spec"
        );
        (vbs, continuity, variety)
    }

    /// Number face tags left to right for the subjects the policy covers.
    fn assign_face_tags(&self, subjects: &mut [SubjectBlock]) {
        let mut order: Vec<usize> = (0..subjects.len()).collect();
        order.sort_by_key(|i| subjects[*i].position);
        let mut n = 0;
        for i in order {
            let subject = &mut subjects[i];
            let eligible = match self.config.face_tag_policy {
                FaceTagPolicy::VisibleFaces => subject.face_visible,
                FaceTagPolicy::AllSubjects => true,
                FaceTagPolicy::Disabled => false,
            };
            if !eligible {
                subject.face_tag = None;
                continue;
            }
            n += 1;
            if subject.face_tag.is_none() {
                subject.face_tag = Some(
                    self.config
                        .face_tag_template
                        .replace("{n}", &n.to_string()),
                );
            }
        }
    }

    async fn lookup_character(
        &self,
        story_id: &str,
        name: &str,
        location: &str,
    ) -> Option<CharacterContext> {
        match self.lookup.character(story_id, name, location).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Character lookup failed for '{}': {}", name, e);
                None
            }
        }
    }

    async fn lookup_location(&self, story_id: &str, name: &str) -> Option<LocationContext> {
        if name.trim().is_empty() {
            return None;
        }
        match self.lookup.location(story_id, name).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Location lookup failed for '{}': {}", name, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ArcPhase, BeatCharacter, CameraAngle, CameraHint, LocationContext, NarrativeRole, Pacing,
        SceneKey, Setting, SlotOrigin, TimeOfDay, TimeProvenance, VisualSignificance,
    };
    use crate::services::lookup::NoopContextLookup;
    use crate::BeatframeError;
    use async_trait::async_trait;

    struct FixedLookup;

    #[async_trait]
    impl ContextLookup for FixedLookup {
        async fn character(
            &self,
            _story_id: &str,
            name: &str,
            _location: &str,
        ) -> Result<Option<CharacterContext>, BeatframeError> {
            Ok((name == "Cat").then(|| CharacterContext {
                name: "Cat".into(),
                trigger: "ct_rider".into(),
                appearance: "cropped dark hair, riding leathers".into(),
                helmet: HelmetState::Off,
                face_tag: None,
            }))
        }

        async fn location(
            &self,
            _story_id: &str,
            _name: &str,
        ) -> Result<Option<LocationContext>, BeatframeError> {
            Ok(Some(LocationContext {
                name: "Desert Road".into(),
                shorthand: "desert road".into(),
                visual_description: "cracked two-lane highway through dunes".into(),
                anchors: vec!["burnt-out bus".into()],
                atmosphere: vec!["dusty".into()],
                atmosphere_category: AtmosphereCategory::Tense,
                setting: Some(Setting::Exterior),
            }))
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl ContextLookup for FailingLookup {
        async fn character(
            &self,
            _story_id: &str,
            _name: &str,
            _location: &str,
        ) -> Result<Option<CharacterContext>, BeatframeError> {
            Err(BeatframeError::Lookup("backend down".into()))
        }

        async fn location(
            &self,
            _story_id: &str,
            _name: &str,
        ) -> Result<Option<LocationContext>, BeatframeError> {
            Err(BeatframeError::Lookup("backend down".into()))
        }
    }

    fn scene(phase: ArcPhase, intensity: u8) -> SceneContext {
        SceneContext {
            key: SceneKey {
                episode: 1,
                scene: 1,
            },
            role: NarrativeRole::Escalation,
            intensity,
            pacing: Pacing::Measured,
            arc_phase: phase,
            ad_break: false,
            inherited_time: None,
            header: "EXT. DESERT ROAD - NIGHT".into(),
            location: "Desert Road".into(),
        }
    }

    fn night() -> TimeContext {
        TimeContext::new(
            TimeOfDay::Night,
            Some(Setting::Exterior),
            TimeProvenance::Detected,
            None,
        )
    }

    fn character(id: &str, action: Option<&str>) -> BeatCharacter {
        BeatCharacter {
            id: id.into(),
            action: action.map(String::from),
            expression: None,
            helmet: None,
            position: None,
        }
    }

    fn beat(id: &str, characters: Vec<BeatCharacter>) -> Beat {
        Beat {
            beat_id: id.into(),
            scene: SceneKey {
                episode: 1,
                scene: 1,
            },
            order: 0,
            script_text: "Cat checks the road.".into(),
            characters,
            camera: CameraHint::default(),
            location: "Desert Road".into(),
            location_tags: vec![],
            visual_significance: VisualSignificance::Medium,
            vehicle: None,
            props: vec![],
        }
    }

    fn builder(lookup: Arc<dyn ContextLookup>) -> VbsBuilder {
        VbsBuilder::new(lookup, Arc::new(PipelineConfig::default()))
    }

    fn fresh() -> (ContinuityState, VarietyState) {
        (
            ContinuityState::new(SceneKey {
                episode: 1,
                scene: 1,
            }),
            VarietyState::default(),
        )
    }

    #[tokio::test]
    async fn test_single_character_skips_fill_in() {
        let builder = builder(Arc::new(FixedLookup));
        let (c, v) = fresh();
        let b = beat("b1", vec![character("Cat", Some("standing at terminal"))]);
        let sc = scene(ArcPhase::Dormant, 3);
        let t = night();
        let (vbs, _, _) = builder
            .build(
                BeatInput {
                    story_id: "s",
                    beat: &b,
                    scene: &sc,
                    time: &t,
                    index: 0,
                    total: 3,
                },
                c,
                v,
            )
            .await;

        assert!(!vbs.needs_fill_in);
        assert_eq!(vbs.pending_slots(), 0);
        assert_eq!(vbs.shot, ShotType::ExtremeWide);
        assert_eq!(vbs.depth_of_field, DepthOfField::Deep);
        assert_eq!(vbs.subjects[0].trigger, "ct_rider");
        assert_eq!(vbs.subjects[0].action.origin(), &SlotOrigin::Authored);
        assert_eq!(vbs.environment.color_grade, AtmosphereCategory::Tense.color_grade());
        assert!(vbs.environment.lighting.iter().any(|l| l == "cold moonlight"));
        assert!(vbs.missing_required().is_empty());
    }

    #[tokio::test]
    async fn test_carry_over_between_beats() {
        let builder = builder(Arc::new(FixedLookup));
        let (c, v) = fresh();
        let sc = scene(ArcPhase::Dormant, 3);
        let t = night();
        let b1 = beat("b1", vec![character("Cat", Some("standing at terminal"))]);
        let b2 = beat("b2", vec![character("Cat", None)]);

        let input = |b| BeatInput {
            story_id: "s",
            beat: b,
            scene: &sc,
            time: &t,
            index: 0,
            total: 2,
        };
        let (_, c, v) = builder.build(input(&b1), c, v).await;
        let (vbs, _, _) = builder.build(input(&b2), c, v).await;

        let action = &vbs.subjects[0].action;
        assert_eq!(action.text(), "standing at terminal");
        assert_eq!(
            action.origin(),
            &SlotOrigin::CarriedOver {
                beat_id: "b1".into()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_character_gets_fallback() {
        let builder = builder(Arc::new(FixedLookup));
        let (c, v) = fresh();
        let b = beat("b1", vec![character("Cat", None), character("Stranger", None)]);
        let sc = scene(ArcPhase::Climax, 9);
        let t = night();
        let (vbs, _, _) = builder
            .build(
                BeatInput {
                    story_id: "s",
                    beat: &b,
                    scene: &sc,
                    time: &t,
                    index: 1,
                    total: 3,
                },
                c,
                v,
            )
            .await;

        let stranger = vbs.subjects.iter().find(|s| s.character_id == "Stranger").unwrap();
        assert!(stranger.fallback);
        assert_eq!(stranger.trigger, "Stranger");
        assert_eq!(stranger.appearance, FALLBACK_APPEARANCE);
        assert!(vbs.needs_fill_in);
        assert!(vbs.composition.is_pending());
        assert!(vbs.notes.iter().any(|n| n.contains("Stranger")));
        assert_eq!(vbs.subjects[0].position, ScreenPosition::Left);
        assert_eq!(vbs.subjects[1].position, ScreenPosition::Right);
    }

    #[tokio::test]
    async fn test_lookup_errors_degrade() {
        let builder = builder(Arc::new(FailingLookup));
        let (c, v) = fresh();
        let b = beat("b1", vec![character("Cat", None)]);
        let sc = scene(ArcPhase::Rising, 5);
        let t = night();
        let (vbs, _, _) = builder
            .build(
                BeatInput {
                    story_id: "s",
                    beat: &b,
                    scene: &sc,
                    time: &t,
                    index: 0,
                    total: 1,
                },
                c,
                v,
            )
            .await;
        assert!(vbs.environment.fallback);
        assert_eq!(vbs.environment.location, "desert road");
        assert!(vbs.subjects[0].fallback);
    }

    #[tokio::test]
    async fn test_visor_down_suppresses_face_tag_and_carried_expression() {
        let builder = builder(Arc::new(NoopContextLookup));
        let (c, v) = fresh();
        let sc = scene(ArcPhase::Rising, 5);
        let t = night();
        let mut first = character("Cat", None);
        first.expression = Some("wide-eyed".into());
        let b1 = beat("b1", vec![first]);
        let mut second = character("Cat", None);
        second.helmet = Some(HelmetState::VisorDown);
        let b2 = beat("b2", vec![second]);

        let input = |b| BeatInput {
            story_id: "s",
            beat: b,
            scene: &sc,
            time: &t,
            index: 0,
            total: 2,
        };
        let (first_vbs, c, v) = builder.build(input(&b1), c, v).await;
        let (vbs, _, _) = builder.build(input(&b2), c, v).await;

        assert!(first_vbs.subjects[0].face_tag.is_some());
        assert!(!vbs.subjects[0].face_visible);
        assert!(vbs.subjects[0].face_tag.is_none());
        assert!(vbs.subjects[0].expression.is_empty());
    }

    #[tokio::test]
    async fn test_ad_break_last_beat_tightens() {
        let builder = builder(Arc::new(NoopContextLookup));
        let (c, v) = fresh();
        let mut sc = scene(ArcPhase::Falling, 6);
        sc.ad_break = true;
        let t = night();
        let b = beat("b3", vec![]);
        let (vbs, _, _) = builder
            .build(
                BeatInput {
                    story_id: "s",
                    beat: &b,
                    scene: &sc,
                    time: &t,
                    index: 2,
                    total: 3,
                },
                c,
                v,
            )
            .await;
        assert_eq!(vbs.shot, ShotType::Medium);
        assert!(vbs.reason.contains("ad-break"));
    }

    #[tokio::test]
    async fn test_authored_camera_hint_wins() {
        let builder = builder(Arc::new(NoopContextLookup));
        let (c, v) = fresh();
        let mut b = beat("b1", vec![]);
        b.camera = CameraHint {
            shot: Some(ShotType::CloseUp),
            angle: Some(CameraAngle::HighAngle),
        };
        let sc = scene(ArcPhase::Dormant, 2);
        let t = night();
        let (vbs, _, _) = builder
            .build(
                BeatInput {
                    story_id: "s",
                    beat: &b,
                    scene: &sc,
                    time: &t,
                    index: 0,
                    total: 1,
                },
                c,
                v,
            )
            .await;
        assert_eq!(vbs.shot, ShotType::CloseUp);
        assert_eq!(vbs.angle, CameraAngle::HighAngle);
    }
}
