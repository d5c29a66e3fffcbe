//! Arc-phase visual mapping: narrative position to framing and lighting style.

use serde::Serialize;

use crate::models::{ArcPhase, CameraAngle, ShotType, VisualSignificance};

/// Framing recommendation for one beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub shot: ShotType,
    pub angle: CameraAngle,
    pub lighting_style: &'static str,
    /// Audit trail only; nothing branches on it.
    pub reason: String,
}

/// Position of a beat in its scene, 0.0 for the first beat and 1.0 for the last.
fn progress(index: usize, total: usize) -> f32 {
    if total <= 1 {
        return 1.0;
    }
    index.min(total - 1) as f32 / (total - 1) as f32
}

/// Recommend framing from arc phase, with intensity and beat position as
/// tie-breakers.
pub fn recommend(
    phase: ArcPhase,
    significance: VisualSignificance,
    index: usize,
    total: usize,
    intensity: u8,
) -> Recommendation {
    let intensity = intensity.clamp(1, 10);
    let progress = progress(index, total);
    let is_last = total > 0 && index + 1 >= total;

    let (shot, angle, lighting_style, mut reason) = match phase {
        ArcPhase::Dormant => {
            let shot = if index == 0 {
                ShotType::ExtremeWide
            } else {
                ShotType::Wide
            };
            (
                shot,
                CameraAngle::EyeLevel,
                "soft naturalistic lighting",
                format!("DORMANT establishes space ({})", shot),
            )
        }
        ArcPhase::Rising => {
            let shot = if progress >= 0.66 {
                ShotType::MediumCloseUp
            } else {
                ShotType::Medium
            };
            let angle = if intensity >= 7 {
                CameraAngle::LowAngle
            } else {
                CameraAngle::EyeLevel
            };
            (
                shot,
                angle,
                "motivated directional lighting",
                format!(
                    "RISING tightens with progress {:.2}, intensity {}",
                    progress, intensity
                ),
            )
        }
        ArcPhase::Climax => {
            let shot = if progress >= 0.66 {
                ShotType::CloseUp
            } else if progress >= 0.33 {
                ShotType::MediumCloseUp
            } else {
                ShotType::Medium
            };
            let angle = if intensity >= 8 {
                CameraAngle::LowAngle
            } else if intensity <= 3 {
                CameraAngle::EyeLevel
            } else {
                CameraAngle::DutchAngle
            };
            (
                shot,
                angle,
                "high-contrast chiaroscuro lighting",
                format!(
                    "CLIMAX pushes in toward the final beat (progress {:.2}, intensity {})",
                    progress, intensity
                ),
            )
        }
        ArcPhase::Falling => {
            let angle = if intensity <= 4 {
                CameraAngle::HighAngle
            } else {
                CameraAngle::EyeLevel
            };
            (
                ShotType::MediumWide,
                angle,
                "subdued low-contrast lighting",
                format!("FALLING pulls back, intensity {}", intensity),
            )
        }
        ArcPhase::Resolved => {
            let shot = if is_last {
                ShotType::ExtremeWide
            } else {
                ShotType::Wide
            };
            (
                shot,
                CameraAngle::EyeLevel,
                "even, gentle lighting",
                format!("RESOLVED settles wide ({})", shot),
            )
        }
    };

    let shot = if significance.is_high() && phase != ArcPhase::Dormant {
        reason.push_str(&format!("; {:?} significance tightens", significance).to_lowercase());
        shot.tighter()
    } else {
        shot
    };

    Recommendation {
        shot,
        angle,
        lighting_style,
        reason,
    }
}
