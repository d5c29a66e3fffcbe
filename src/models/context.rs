//! Character and location context: the story-bible data behind context lookup.
//!
//! Characters carry a renderer trigger token plus location-specific appearance
//! contexts (what they wear at the field hospital differs from what they wear on
//! the road). Locations carry the visual description, persistent anchor objects
//! and an atmosphere category that selects the color grade.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::models::cinematography::HelmetState;
use crate::models::time::Setting;

/// Mood bucket of a location; selects the color grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AtmosphereCategory {
    Tense,
    Melancholic,
    Hopeful,
    Mysterious,
    Hostile,
    Intimate,
    Clinical,
    #[default]
    Neutral,
}

impl AtmosphereCategory {
    /// Fixed atmosphere → color grade mapping.
    pub fn color_grade(&self) -> &'static str {
        match self {
            AtmosphereCategory::Tense => "desaturated teal and orange grade",
            AtmosphereCategory::Melancholic => "muted cool blue grade",
            AtmosphereCategory::Hopeful => "warm golden grade",
            AtmosphereCategory::Mysterious => "deep green and violet grade",
            AtmosphereCategory::Hostile => "high-contrast bleach bypass grade",
            AtmosphereCategory::Intimate => "soft warm amber grade",
            AtmosphereCategory::Clinical => "cold neutral white grade",
            AtmosphereCategory::Neutral => "natural filmic grade",
        }
    }

    /// Best-effort category from free-text atmosphere notes.
    pub fn infer_from_text(text: &str) -> AtmosphereCategory {
        let lower = text.to_lowercase();
        let table: [(&[&str], AtmosphereCategory); 7] = [
            (
                &["hostile", "violent", "danger", "threat", "war"],
                AtmosphereCategory::Hostile,
            ),
            (
                &["tense", "anxious", "urgent", "pressure"],
                AtmosphereCategory::Tense,
            ),
            (
                &["sterile", "clinical", "medical", "antiseptic"],
                AtmosphereCategory::Clinical,
            ),
            (
                &["mysterious", "eerie", "uncanny", "shadow"],
                AtmosphereCategory::Mysterious,
            ),
            (
                &["melancholy", "melancholic", "grief", "lonely", "somber"],
                AtmosphereCategory::Melancholic,
            ),
            (
                &["intimate", "tender", "quiet", "cozy"],
                AtmosphereCategory::Intimate,
            ),
            (
                &["hopeful", "bright", "warm", "safe"],
                AtmosphereCategory::Hopeful,
            ),
        ];
        table
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(_, category)| *category)
            .unwrap_or_default()
    }
}

/// Result of a character lookup, resolved for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterContext {
    pub name: String,
    /// Renderer visual-trigger token (e.g. a LoRA trigger word).
    pub trigger: String,
    /// Appearance text for the current location.
    pub appearance: String,
    pub helmet: HelmetState,
    /// Face-region tag override for this character.
    pub face_tag: Option<String>,
}

/// Result of a location lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationContext {
    pub name: String,
    pub shorthand: String,
    pub visual_description: String,
    /// Persistent anchor objects that should appear in every shot of this place.
    pub anchors: Vec<String>,
    pub atmosphere: Vec<String>,
    pub atmosphere_category: AtmosphereCategory,
    pub setting: Option<Setting>,
}

/// Location-specific appearance of a character.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AppearanceContext {
    /// Location this appearance applies to; `None` applies everywhere.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub physical: Option<String>,
    #[serde(default)]
    pub clothing: Option<String>,
    #[serde(default)]
    pub hair: Option<String>,
    #[serde(default)]
    pub demeanor: Option<String>,
    /// Replaces the composed appearance text entirely.
    #[serde(default)]
    pub prompt_override: Option<String>,
    #[serde(default)]
    pub temporal_context: Option<String>,
}

impl AppearanceContext {
    fn text(&self) -> Option<String> {
        if let Some(over) = self
            .prompt_override
            .as_deref()
            .filter(|o| !o.trim().is_empty())
        {
            return Some(over.trim().to_string());
        }
        let parts: Vec<&str> = [&self.physical, &self.clothing, &self.hair, &self.demeanor]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Character entry in a story bible.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CharacterProfile {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub base_description: Option<String>,
    #[serde(default)]
    pub helmet: HelmetState,
    #[serde(default)]
    pub face_tag: Option<String>,
    #[serde(default)]
    pub contexts: Vec<AppearanceContext>,
}

impl CharacterProfile {
    /// Resolve this character's appearance at `location`.
    ///
    /// Preference: context for this exact location, then a location-agnostic
    /// context, then the base description.
    pub fn resolve(&self, location: &str) -> CharacterContext {
        let location = location.trim().to_lowercase();
        let specific = self.contexts.iter().find(|c| {
            c.location
                .as_deref()
                .is_some_and(|l| l.trim().to_lowercase() == location)
        });
        let general = self.contexts.iter().find(|c| c.location.is_none());

        let appearance = specific
            .and_then(AppearanceContext::text)
            .or_else(|| general.and_then(AppearanceContext::text))
            .or_else(|| {
                self.base_description
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(String::from)
            })
            .unwrap_or_default();

        CharacterContext {
            name: self.name.clone(),
            trigger: self
                .trigger
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| self.name.clone()),
            appearance,
            helmet: self.helmet,
            face_tag: self.face_tag.clone(),
        }
    }
}

/// Location entry in a story bible.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LocationProfile {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub shorthand: Option<String>,
    #[serde(default)]
    pub location_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visual_details: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub atmosphere: Option<String>,
    #[serde(default)]
    pub atmosphere_category: Option<AtmosphereCategory>,
    #[serde(default)]
    pub setting: Option<Setting>,
}

impl LocationProfile {
    pub fn resolve(&self) -> LocationContext {
        let visual_description = self
            .visual_details
            .as_deref()
            .or(self.description.as_deref())
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        let atmosphere: Vec<String> = self
            .atmosphere
            .as_deref()
            .map(|a| {
                a.split([',', ';'])
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let atmosphere_category = self.atmosphere_category.unwrap_or_else(|| {
            self.atmosphere
                .as_deref()
                .map(AtmosphereCategory::infer_from_text)
                .unwrap_or_default()
        });

        LocationContext {
            name: self.name.clone(),
            shorthand: self
                .shorthand
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| self.name.to_lowercase()),
            visual_description,
            anchors: self.artifacts.clone(),
            atmosphere,
            atmosphere_category,
            setting: self.setting,
        }
    }
}

/// A story bible: everything context lookup knows about a story.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StoryBible {
    #[serde(default)]
    pub story_id: String,
    #[serde(default)]
    pub characters: Vec<CharacterProfile>,
    #[serde(default)]
    pub locations: Vec<LocationProfile>,
}
