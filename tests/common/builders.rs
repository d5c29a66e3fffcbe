//! Test data builders for episode documents.
//!
//! Provides fluent API for creating episodes, scenes and beats with sensible defaults.

#![allow(dead_code)]

use beatframe::models::{
    ArcPhase, BeatCharacterDraft, BeatDraft, CameraAngle, CameraHint, EpisodeInput, HelmetState,
    NarrativeRole, Pacing, SceneInput, ShotType, TimeOfDay, VisualSignificance,
};

/// Builder for creating test beats.
pub struct BeatBuilder {
    draft: BeatDraft,
}

impl BeatBuilder {
    /// Create a new beat builder with the given id.
    pub fn new(beat_id: impl Into<String>) -> Self {
        Self {
            draft: BeatDraft {
                beat_id: Some(beat_id.into()),
                ..Default::default()
            },
        }
    }

    /// A beat with no id, which fails structural validation.
    pub fn without_id() -> Self {
        Self {
            draft: BeatDraft::default(),
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.draft.script_text = Some(text.into());
        self
    }

    /// Add a character with no authored action or expression.
    pub fn character(self, id: impl Into<String>) -> Self {
        self.character_with(id, None, None)
    }

    /// Add a character with an authored action and/or expression.
    pub fn character_with(
        mut self,
        id: impl Into<String>,
        action: Option<&str>,
        expression: Option<&str>,
    ) -> Self {
        self.draft.characters.push(BeatCharacterDraft {
            id: Some(id.into()),
            action: action.map(String::from),
            expression: expression.map(String::from),
            ..Default::default()
        });
        self
    }

    /// Set the helmet state of the most recently added character.
    pub fn helmet(mut self, helmet: HelmetState) -> Self {
        if let Some(last) = self.draft.characters.last_mut() {
            last.helmet = Some(helmet);
        }
        self
    }

    pub fn camera(mut self, shot: ShotType, angle: CameraAngle) -> Self {
        self.draft.camera = Some(CameraHint {
            shot: Some(shot),
            angle: Some(angle),
        });
        self
    }

    pub fn significance(mut self, significance: VisualSignificance) -> Self {
        self.draft.visual_significance = significance;
        self
    }

    pub fn vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.draft.vehicle = Some(vehicle.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.draft.location = Some(location.into());
        self
    }

    pub fn build(self) -> BeatDraft {
        self.draft
    }
}

/// Builder for creating test scenes.
pub struct SceneBuilder {
    scene: SceneInput,
}

impl SceneBuilder {
    /// Create a new scene builder with the given number and header.
    pub fn new(number: u32, header: impl Into<String>) -> Self {
        Self {
            scene: SceneInput {
                scene_number: number,
                title: None,
                header: header.into(),
                location: "Desert Road".to_string(),
                narrative_role: NarrativeRole::Development,
                intensity: 5,
                pacing: Pacing::Measured,
                arc_phase: ArcPhase::Rising,
                ad_break: false,
                beats: Vec::new(),
            },
        }
    }

    pub fn phase(mut self, phase: ArcPhase) -> Self {
        self.scene.arc_phase = phase;
        self
    }

    pub fn intensity(mut self, intensity: u8) -> Self {
        self.scene.intensity = intensity;
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.scene.location = location.into();
        self
    }

    pub fn ad_break(mut self) -> Self {
        self.scene.ad_break = true;
        self
    }

    pub fn beat(mut self, beat: BeatBuilder) -> Self {
        self.scene.beats.push(beat.build());
        self
    }

    pub fn build(self) -> SceneInput {
        self.scene
    }
}

/// Builder for creating test episodes.
pub struct EpisodeBuilder {
    episode: EpisodeInput,
}

impl EpisodeBuilder {
    pub fn new(episode_number: u32) -> Self {
        Self {
            episode: EpisodeInput {
                story_id: "cat-daniel".to_string(),
                episode_number,
                title: None,
                starting_time: None,
                scenes: Vec::new(),
            },
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.episode.title = Some(title.into());
        self
    }

    pub fn starting_time(mut self, time: TimeOfDay) -> Self {
        self.episode.starting_time = Some(time);
        self
    }

    pub fn scene(mut self, scene: SceneBuilder) -> Self {
        self.episode.scenes.push(scene.build());
        self
    }

    pub fn build(self) -> EpisodeInput {
        self.episode
    }
}
