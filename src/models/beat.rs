//! Beats: the smallest narrative unit, one compiled prompt each.
//!
//! Input arrives as a `BeatDraft` where every field is optional; `BeatDraft::validate`
//! turns it into a `Beat` whose required fields are guaranteed present. Beats are
//! never mutated by the pipeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::cinematography::{CameraAngle, HelmetState, ScreenPosition, ShotType};
use crate::models::scene::SceneKey;
use crate::BeatframeError;

/// How visually important a beat is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum VisualSignificance {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl VisualSignificance {
    pub fn is_high(&self) -> bool {
        *self >= VisualSignificance::High
    }
}

/// Optional camera suggestion authored on the beat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CameraHint {
    #[serde(default)]
    pub shot: Option<ShotType>,
    #[serde(default)]
    pub angle: Option<CameraAngle>,
}

/// Character presence as authored in the input document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BeatCharacterDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub helmet: Option<HelmetState>,
    #[serde(default)]
    pub position: Option<ScreenPosition>,
}

/// Beat as it arrives in an episode document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BeatDraft {
    #[serde(default, alias = "beatId")]
    pub beat_id: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub script_text: Option<String>,
    #[serde(default)]
    pub characters: Vec<BeatCharacterDraft>,
    #[serde(default)]
    pub camera: Option<CameraHint>,
    /// Overrides the scene location for this beat.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub location_tags: Vec<String>,
    #[serde(default)]
    pub visual_significance: VisualSignificance,
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub props: Vec<String>,
}

/// A character present in a validated beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatCharacter {
    pub id: String,
    pub action: Option<String>,
    pub expression: Option<String>,
    pub helmet: Option<HelmetState>,
    pub position: Option<ScreenPosition>,
}

/// A validated beat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beat {
    pub beat_id: String,
    pub scene: SceneKey,
    pub order: u32,
    pub script_text: String,
    pub characters: Vec<BeatCharacter>,
    pub camera: CameraHint,
    pub location: String,
    pub location_tags: Vec<String>,
    pub visual_significance: VisualSignificance,
    pub vehicle: Option<String>,
    pub props: Vec<String>,
}

impl Beat {
    /// Whether the beat's location tags mark it as interior/exterior.
    pub fn tagged_setting(&self) -> Option<crate::models::time::Setting> {
        use crate::models::time::Setting;
        self.location_tags
            .iter()
            .find_map(|tag| match tag.trim().to_lowercase().as_str() {
                "interior" | "int" | "indoor" | "indoors" => Some(Setting::Interior),
                "exterior" | "ext" | "outdoor" | "outdoors" => Some(Setting::Exterior),
                _ => None,
            })
    }
}

impl BeatDraft {
    /// Validate into a `Beat`.
    ///
    /// `index` is the beat's position in the scene; it stands in for the beat id
    /// in error reports when the id is missing. `scene_location` is used when the
    /// beat does not override the location.
    pub fn validate(
        &self,
        scene: SceneKey,
        index: usize,
        scene_location: &str,
    ) -> Result<Beat, BeatframeError> {
        let beat_id = self
            .beat_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                BeatframeError::structural(
                    format!("#{}", index + 1),
                    scene.to_string(),
                    "beat has no beat_id",
                )
            })?
            .to_string();

        let mut characters = Vec::with_capacity(self.characters.len());
        for (char_idx, draft) in self.characters.iter().enumerate() {
            let id = draft
                .id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    BeatframeError::structural(
                        beat_id.clone(),
                        scene.to_string(),
                        format!("character #{} has no id", char_idx + 1),
                    )
                })?;
            if characters.iter().any(|c: &BeatCharacter| c.id == id) {
                return Err(BeatframeError::structural(
                    beat_id.clone(),
                    scene.to_string(),
                    format!("character '{}' listed twice", id),
                ));
            }
            characters.push(BeatCharacter {
                id: id.to_string(),
                action: non_empty(draft.action.as_deref()),
                expression: non_empty(draft.expression.as_deref()),
                helmet: draft.helmet,
                position: draft.position,
            });
        }

        let location = non_empty(self.location.as_deref())
            .unwrap_or_else(|| scene_location.trim().to_string());

        Ok(Beat {
            beat_id,
            scene,
            order: self.order.unwrap_or(index as u32),
            script_text: self.script_text.clone().unwrap_or_default(),
            characters,
            camera: self.camera.clone().unwrap_or_default(),
            location,
            location_tags: self.location_tags.clone(),
            visual_significance: self.visual_significance,
            vehicle: non_empty(self.vehicle.as_deref()),
            props: self
                .props
                .iter()
                .filter_map(|p| non_empty(Some(p.as_str())))
                .collect(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
