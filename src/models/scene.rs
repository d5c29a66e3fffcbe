//! Scene and episode input records.
//!
//! Scenes carry the narrative metadata that drives cinematography: arc phase,
//! target intensity, pacing and role. Scene boundaries reset continuity and
//! variety state, but the time-of-day clock flows across them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::beat::BeatDraft;
use crate::models::time::TimeOfDay;

/// Narrative-position classification driving visual-intensity defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArcPhase {
    #[default]
    Dormant,
    Rising,
    Climax,
    Falling,
    Resolved,
}

impl ArcPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArcPhase::Dormant => "DORMANT",
            ArcPhase::Rising => "RISING",
            ArcPhase::Climax => "CLIMAX",
            ArcPhase::Falling => "FALLING",
            ArcPhase::Resolved => "RESOLVED",
        }
    }
}

impl fmt::Display for ArcPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArcPhase {
    type Err = crate::BeatframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DORMANT" => Ok(ArcPhase::Dormant),
            "RISING" => Ok(ArcPhase::Rising),
            "CLIMAX" => Ok(ArcPhase::Climax),
            "FALLING" => Ok(ArcPhase::Falling),
            "RESOLVED" => Ok(ArcPhase::Resolved),
            other => Err(crate::BeatframeError::Validation(format!(
                "Unknown arc phase '{}'",
                other
            ))),
        }
    }
}

/// Dramatic role of the scene within the episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum NarrativeRole {
    OpeningHook,
    Setup,
    #[default]
    Development,
    Escalation,
    Climax,
    Resolution,
    Cliffhanger,
}

/// Editorial pacing class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    Slow,
    #[default]
    Measured,
    #[serde(alias = "fast")]
    Brisk,
    Frantic,
}

impl Pacing {
    /// Atmosphere token contributed by pacing, if any.
    pub fn atmosphere_token(&self) -> Option<&'static str> {
        match self {
            Pacing::Slow => Some("lingering stillness"),
            Pacing::Measured => None,
            Pacing::Brisk => Some("sense of momentum"),
            Pacing::Frantic => Some("motion blur, kinetic energy"),
        }
    }
}

/// Identifies one scene within one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneKey {
    pub episode: u32,
    pub scene: u32,
}

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep{}-s{}", self.episode, self.scene)
    }
}

/// Per-scene narrative metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneContext {
    pub key: SceneKey,
    pub role: NarrativeRole,
    /// Target intensity 1-10; out-of-range input is clamped.
    pub intensity: u8,
    pub pacing: Pacing,
    pub arc_phase: ArcPhase,
    pub ad_break: bool,
    /// Ending time of the previous scene/episode.
    pub inherited_time: Option<TimeOfDay>,
    pub header: String,
    pub location: String,
}

impl SceneContext {
    pub fn intensity(&self) -> u8 {
        self.intensity.clamp(1, 10)
    }
}

/// Scene as it arrives in an episode document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SceneInput {
    pub scene_number: u32,
    #[serde(default)]
    pub title: Option<String>,
    /// Screenplay slug line, e.g. `EXT. DESERT ROAD - NIGHT`.
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub narrative_role: NarrativeRole,
    #[serde(default = "default_intensity")]
    pub intensity: u8,
    #[serde(default)]
    pub pacing: Pacing,
    #[serde(default)]
    pub arc_phase: ArcPhase,
    #[serde(default)]
    pub ad_break: bool,
    #[serde(default)]
    pub beats: Vec<BeatDraft>,
}

fn default_intensity() -> u8 {
    5
}

impl SceneInput {
    /// Build the scene context; `inherited_time` is the previous scene's ending time.
    pub fn context(&self, episode: u32, inherited_time: Option<TimeOfDay>) -> SceneContext {
        SceneContext {
            key: SceneKey {
                episode,
                scene: self.scene_number,
            },
            role: self.narrative_role,
            intensity: self.intensity,
            pacing: self.pacing,
            arc_phase: self.arc_phase,
            ad_break: self.ad_break,
            inherited_time,
            header: self.header.clone(),
            location: self.location.clone(),
        }
    }

    /// Header plus beat narration, the input to time-of-day resolution.
    ///
    /// Quoted dialogue is left out: a character saying "see you tomorrow"
    /// does not move the scene's clock.
    pub fn full_text(&self) -> String {
        let mut text = self.header.clone();
        for beat in &self.beats {
            if let Some(script) = &beat.script_text {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&strip_dialogue(script));
            }
        }
        text
    }
}

/// Drop double-quoted spans (straight or curly). An unclosed quote runs to
/// the end of its line.
fn strip_dialogue(script: &str) -> String {
    let mut out = String::with_capacity(script.len());
    let mut quoted = false;
    for c in script.chars() {
        match c {
            '"' => quoted = !quoted,
            '\u{201C}' => quoted = true,
            '\u{201D}' => quoted = false,
            '\n' => {
                quoted = false;
                out.push(c);
            }
            _ if !quoted => out.push(c),
            _ => {}
        }
    }
    out
}

/// Episode document: the unit the pipeline runs over.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EpisodeInput {
    #[serde(default)]
    pub story_id: String,
    pub episode_number: u32,
    #[serde(default)]
    pub title: Option<String>,
    /// Ending time of the previous episode, if known.
    #[serde(default)]
    pub starting_time: Option<TimeOfDay>,
    #[serde(default)]
    pub scenes: Vec<SceneInput>,
}

impl EpisodeInput {
    pub fn total_beats(&self) -> usize {
        self.scenes.iter().map(|s| s.beats.len()).sum()
    }
}
