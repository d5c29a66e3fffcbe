//! Camera and framing vocabulary shared by every pipeline phase.
//!
//! Serialized names match the phrases written into prompt text, so a
//! `ShotType::MediumCloseUp` round-trips as `"medium close-up"` in YAML input
//! and appears verbatim in the compiled prompt.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::BeatframeError;

/// Shot size, ordered from widest to tightest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum ShotType {
    #[serde(rename = "extreme wide shot", alias = "extreme_wide")]
    ExtremeWide,
    #[serde(rename = "wide shot", alias = "wide")]
    Wide,
    #[serde(rename = "full shot", alias = "full")]
    Full,
    #[serde(rename = "medium wide shot", alias = "medium_wide")]
    MediumWide,
    #[serde(rename = "medium shot", alias = "medium")]
    Medium,
    #[serde(rename = "medium close-up", alias = "medium_close_up")]
    MediumCloseUp,
    #[serde(rename = "close-up", alias = "close_up")]
    CloseUp,
    #[serde(rename = "extreme close-up", alias = "extreme_close_up")]
    ExtremeCloseUp,
}

impl ShotType {
    pub const ALL: [ShotType; 8] = [
        ShotType::ExtremeWide,
        ShotType::Wide,
        ShotType::Full,
        ShotType::MediumWide,
        ShotType::Medium,
        ShotType::MediumCloseUp,
        ShotType::CloseUp,
        ShotType::ExtremeCloseUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShotType::ExtremeWide => "extreme wide shot",
            ShotType::Wide => "wide shot",
            ShotType::Full => "full shot",
            ShotType::MediumWide => "medium wide shot",
            ShotType::Medium => "medium shot",
            ShotType::MediumCloseUp => "medium close-up",
            ShotType::CloseUp => "close-up",
            ShotType::ExtremeCloseUp => "extreme close-up",
        }
    }

    /// 0 = widest, 7 = tightest.
    pub fn tightness(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    /// One notch tighter, saturating at extreme close-up.
    pub fn tighter(&self) -> ShotType {
        Self::ALL[(self.tightness() + 1).min(Self::ALL.len() - 1)]
    }

    /// One notch wider, saturating at extreme wide.
    pub fn wider(&self) -> ShotType {
        Self::ALL[self.tightness().saturating_sub(1)]
    }
}

impl fmt::Display for ShotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShotType {
    type Err = BeatframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_vocab(s);
        ShotType::ALL
            .iter()
            .copied()
            .find(|shot| {
                let name = normalize_vocab(shot.as_str());
                name == normalized || name.trim_end_matches(" shot") == normalized
            })
            .ok_or_else(|| BeatframeError::Validation(format!("Unknown shot type '{}'", s)))
    }
}

/// Camera angle relative to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum CameraAngle {
    #[serde(rename = "eye-level", alias = "eye_level")]
    EyeLevel,
    #[serde(rename = "low angle", alias = "low_angle")]
    LowAngle,
    #[serde(rename = "high angle", alias = "high_angle")]
    HighAngle,
    #[serde(rename = "dutch angle", alias = "dutch_angle")]
    DutchAngle,
    #[serde(rename = "over-the-shoulder", alias = "over_the_shoulder")]
    OverTheShoulder,
    #[serde(rename = "bird's-eye view", alias = "birds_eye")]
    BirdsEye,
    #[serde(rename = "worm's-eye view", alias = "worms_eye")]
    WormsEye,
}

impl CameraAngle {
    pub const ALL: [CameraAngle; 7] = [
        CameraAngle::EyeLevel,
        CameraAngle::LowAngle,
        CameraAngle::HighAngle,
        CameraAngle::DutchAngle,
        CameraAngle::OverTheShoulder,
        CameraAngle::BirdsEye,
        CameraAngle::WormsEye,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraAngle::EyeLevel => "eye-level",
            CameraAngle::LowAngle => "low angle",
            CameraAngle::HighAngle => "high angle",
            CameraAngle::DutchAngle => "dutch angle",
            CameraAngle::OverTheShoulder => "over-the-shoulder",
            CameraAngle::BirdsEye => "bird's-eye view",
            CameraAngle::WormsEye => "worm's-eye view",
        }
    }
}

impl fmt::Display for CameraAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraAngle {
    type Err = BeatframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_vocab(s);
        CameraAngle::ALL
            .iter()
            .copied()
            .find(|angle| normalize_vocab(angle.as_str()) == normalized)
            .ok_or_else(|| BeatframeError::Validation(format!("Unknown camera angle '{}'", s)))
    }
}

/// Depth-of-field, derived from shot type by fixed rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthOfField {
    Deep,
    Moderate,
    Shallow,
    VeryShallow,
}

impl DepthOfField {
    pub fn for_shot(shot: ShotType) -> Self {
        match shot {
            ShotType::ExtremeWide | ShotType::Wide => DepthOfField::Deep,
            ShotType::Full | ShotType::MediumWide => DepthOfField::Moderate,
            ShotType::Medium | ShotType::MediumCloseUp => DepthOfField::Shallow,
            ShotType::CloseUp | ShotType::ExtremeCloseUp => DepthOfField::VeryShallow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DepthOfField::Deep => "deep focus",
            DepthOfField::Moderate => "moderate depth of field",
            DepthOfField::Shallow => "shallow depth of field",
            DepthOfField::VeryShallow => "very shallow depth of field, soft bokeh background",
        }
    }
}

impl fmt::Display for DepthOfField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Horizontal screen position; compiled subjects are ordered left to right.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ScreenPosition {
    Left,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    Right,
}

impl ScreenPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenPosition::Left => "left",
            ScreenPosition::CenterLeft => "center-left",
            ScreenPosition::Center => "center",
            ScreenPosition::CenterRight => "center-right",
            ScreenPosition::Right => "right",
        }
    }

    /// Default layout for `count` subjects with no authored positions.
    pub fn layout(count: usize) -> Vec<ScreenPosition> {
        match count {
            0 => vec![],
            1 => vec![ScreenPosition::Center],
            2 => vec![ScreenPosition::Left, ScreenPosition::Right],
            3 => vec![
                ScreenPosition::Left,
                ScreenPosition::Center,
                ScreenPosition::Right,
            ],
            n => {
                let mut positions = vec![
                    ScreenPosition::Left,
                    ScreenPosition::CenterLeft,
                    ScreenPosition::CenterRight,
                    ScreenPosition::Right,
                ];
                positions.resize(n, ScreenPosition::Center);
                positions
            }
        }
    }
}

/// Helmet / visor state of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HelmetState {
    #[default]
    Off,
    VisorUp,
    VisorDown,
}

impl HelmetState {
    /// Whether the character's face can be seen.
    pub fn face_visible(&self) -> bool {
        !matches!(self, HelmetState::VisorDown)
    }

    /// Phrase appended to the subject description, if any.
    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            HelmetState::Off => None,
            HelmetState::VisorUp => Some("helmet on with visor raised"),
            HelmetState::VisorDown => Some("helmet on with visor down, face hidden"),
        }
    }
}

fn normalize_vocab(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shot_order_is_wide_to_tight() {
        assert!(ShotType::ExtremeWide < ShotType::Medium);
        assert!(ShotType::Medium < ShotType::CloseUp);
        assert_eq!(ShotType::Medium.tighter(), ShotType::MediumCloseUp);
        assert_eq!(ShotType::Medium.wider(), ShotType::MediumWide);
        assert_eq!(ShotType::ExtremeCloseUp.tighter(), ShotType::ExtremeCloseUp);
        assert_eq!(ShotType::ExtremeWide.wider(), ShotType::ExtremeWide);
    }

    #[test]
    fn test_shot_from_str_accepts_variants() {
        assert_eq!("medium shot".parse::<ShotType>().unwrap(), ShotType::Medium);
        assert_eq!("medium".parse::<ShotType>().unwrap(), ShotType::Medium);
        assert_eq!(
            "Medium_Close_Up".parse::<ShotType>().unwrap(),
            ShotType::MediumCloseUp
        );
        assert_eq!("close-up".parse::<ShotType>().unwrap(), ShotType::CloseUp);
        assert!("tracking".parse::<ShotType>().is_err());
    }

    #[test]
    fn test_angle_from_str() {
        assert_eq!(
            "eye level".parse::<CameraAngle>().unwrap(),
            CameraAngle::EyeLevel
        );
        assert_eq!(
            "low_angle".parse::<CameraAngle>().unwrap(),
            CameraAngle::LowAngle
        );
    }

    #[test]
    fn test_shot_serde_uses_prompt_phrase() {
        let json = serde_json::to_string(&ShotType::MediumCloseUp).unwrap();
        assert_eq!(json, "\"medium close-up\"");
        let parsed: ShotType = serde_json::from_str("\"medium_close_up\"").unwrap();
        assert_eq!(parsed, ShotType::MediumCloseUp);
    }

    #[test]
    fn test_depth_of_field_rule() {
        assert_eq!(DepthOfField::for_shot(ShotType::Wide), DepthOfField::Deep);
        assert_eq!(
            DepthOfField::for_shot(ShotType::CloseUp),
            DepthOfField::VeryShallow
        );
    }

    #[test]
    fn test_layout_left_to_right() {
        assert_eq!(
            ScreenPosition::layout(2),
            vec![ScreenPosition::Left, ScreenPosition::Right]
        );
        assert_eq!(ScreenPosition::layout(5).len(), 5);
        assert!(ScreenPosition::Left < ScreenPosition::Right);
    }

    #[test]
    fn test_visor_down_hides_face() {
        assert!(!HelmetState::VisorDown.face_visible());
        assert!(HelmetState::VisorUp.face_visible());
        assert!(HelmetState::Off.phrase().is_none());
    }
}
