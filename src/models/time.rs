//! Time-of-day vocabulary and the per-scene resolved time context.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::BeatframeError;

/// Ordered time-of-day vocabulary. `Ord` follows the clock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Dawn,
    Morning,
    Midday,
    Afternoon,
    GoldenHour,
    Dusk,
    EarlyNight,
    Night,
    DeepNight,
}

impl TimeOfDay {
    pub const ORDER: [TimeOfDay; 9] = [
        TimeOfDay::Dawn,
        TimeOfDay::Morning,
        TimeOfDay::Midday,
        TimeOfDay::Afternoon,
        TimeOfDay::GoldenHour,
        TimeOfDay::Dusk,
        TimeOfDay::EarlyNight,
        TimeOfDay::Night,
        TimeOfDay::DeepNight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "dawn",
            TimeOfDay::Morning => "morning",
            TimeOfDay::Midday => "midday",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::GoldenHour => "golden_hour",
            TimeOfDay::Dusk => "dusk",
            TimeOfDay::EarlyNight => "early_night",
            TimeOfDay::Night => "night",
            TimeOfDay::DeepNight => "deep_night",
        }
    }

    /// Next step along the vocabulary. Saturates at `DeepNight`: crossing
    /// midnight needs an explicit jump phrase.
    pub fn advance(&self) -> TimeOfDay {
        let idx = Self::ORDER.iter().position(|t| t == self).unwrap_or(0);
        Self::ORDER[(idx + 1).min(Self::ORDER.len() - 1)]
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = BeatframeError;

    /// Accepts bare tokens (`dusk`) and environment-suffixed tokens
    /// (`night_exterior`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase().replace([' ', '-'], "_");
        let base = lower
            .strip_suffix("_interior")
            .or_else(|| lower.strip_suffix("_exterior"))
            .unwrap_or(&lower);
        TimeOfDay::ORDER
            .iter()
            .copied()
            .find(|t| t.as_str() == base)
            .ok_or_else(|| BeatframeError::Validation(format!("Unknown time of day '{}'", s)))
    }
}

/// Interior or exterior, inferred from scene-header markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    Interior,
    Exterior,
}

impl Setting {
    pub fn as_str(&self) -> &'static str {
        match self {
            Setting::Interior => "interior",
            Setting::Exterior => "exterior",
        }
    }
}

/// Where a scene's time of day came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeProvenance {
    /// Explicit time marker in a scene header.
    Detected,
    /// Inherited from the previous scene (possibly advanced one step).
    Continued,
    /// Explicit jump phrasing ("THREE DAYS LATER").
    Jump,
}

impl TimeProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeProvenance::Detected => "detected",
            TimeProvenance::Continued => "continued",
            TimeProvenance::Jump => "jump",
        }
    }
}

/// Resolved time for one scene. Exactly one per scene, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeContext {
    time: TimeOfDay,
    setting: Option<Setting>,
    provenance: TimeProvenance,
    jump: Option<String>,
}

impl TimeContext {
    pub fn new(
        time: TimeOfDay,
        setting: Option<Setting>,
        provenance: TimeProvenance,
        jump: Option<String>,
    ) -> Self {
        Self {
            time,
            setting,
            provenance,
            jump,
        }
    }

    pub fn time(&self) -> TimeOfDay {
        self.time
    }

    pub fn setting(&self) -> Option<Setting> {
        self.setting
    }

    pub fn provenance(&self) -> TimeProvenance {
        self.provenance
    }

    /// Description of the jump phrase, when provenance is `Jump`.
    pub fn jump(&self) -> Option<&str> {
        self.jump.as_deref()
    }

    /// Token with the environment appended, e.g. `night_exterior`.
    pub fn token(&self) -> String {
        match self.setting {
            Some(setting) => format!("{}_{}", self.time.as_str(), setting.as_str()),
            None => self.time.as_str().to_string(),
        }
    }

    /// Copy with the setting filled in when the header did not state one.
    pub fn with_fallback_setting(&self, setting: Option<Setting>) -> TimeContext {
        TimeContext {
            setting: self.setting.or(setting),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_saturates() {
        assert_eq!(TimeOfDay::Dusk.advance(), TimeOfDay::EarlyNight);
        assert_eq!(TimeOfDay::DeepNight.advance(), TimeOfDay::DeepNight);
    }

    #[test]
    fn test_parse_suffixed_token() {
        assert_eq!(
            "night_exterior".parse::<TimeOfDay>().unwrap(),
            TimeOfDay::Night
        );
        assert_eq!(
            "golden hour".parse::<TimeOfDay>().unwrap(),
            TimeOfDay::GoldenHour
        );
        assert!("teatime".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_token_appends_setting() {
        let ctx = TimeContext::new(
            TimeOfDay::DeepNight,
            Some(Setting::Exterior),
            TimeProvenance::Detected,
            None,
        );
        assert_eq!(ctx.token(), "deep_night_exterior");

        let bare = TimeContext::new(TimeOfDay::Dusk, None, TimeProvenance::Continued, None);
        assert_eq!(bare.token(), "dusk");
        assert_eq!(
            bare.with_fallback_setting(Some(Setting::Interior)).token(),
            "dusk_interior"
        );
    }
}
