//! Variety enforcement: keeps consecutive beats from repeating the same framing.
//!
//! A repeated (shot, angle) pair raises a warning; a third identical pair in a
//! row is replaced by a deterministic alternative tied to the shot type.

use serde::Serialize;
use std::collections::VecDeque;

use crate::models::{CameraAngle, ShotType, Violation};

/// Beats compared per proposal, counting the proposal itself.
pub const VARIETY_WINDOW: usize = 3;

/// Consecutive identical pairs (including the proposal) that force an adjustment.
const ADJUST_AT: usize = VARIETY_WINDOW;

/// Ordered history of recent framings for one scene.
///
/// Holds at most `VARIETY_WINDOW - 1` earlier pairs. The window is fixed:
/// a shorter one could never see the run that triggers an adjustment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VarietyState {
    history: VecDeque<(ShotType, CameraAngle)>,
}

impl VarietyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> impl Iterator<Item = &(ShotType, CameraAngle)> {
        self.history.iter()
    }

    pub fn last(&self) -> Option<(ShotType, CameraAngle)> {
        self.history.back().copied()
    }

    fn push(&mut self, pair: (ShotType, CameraAngle)) {
        self.history.push_back(pair);
        while self.history.len() > VARIETY_WINDOW - 1 {
            self.history.pop_front();
        }
    }

    /// Identical pairs immediately preceding a proposal, within the window.
    fn trailing_run(&self, pair: (ShotType, CameraAngle)) -> usize {
        self.history
            .iter()
            .rev()
            .take_while(|p| **p == pair)
            .count()
    }
}

/// Result of a variety check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VarietyOutcome {
    pub final_shot: ShotType,
    pub final_angle: CameraAngle,
    pub was_adjusted: bool,
    pub violations: Vec<Violation>,
}

/// Secondary preference list for replacing a repeated shot.
pub(crate) fn alternatives(shot: ShotType) -> [ShotType; 2] {
    match shot {
        ShotType::ExtremeWide => [ShotType::Wide, ShotType::Full],
        ShotType::Wide => [ShotType::MediumWide, ShotType::ExtremeWide],
        ShotType::Full => [ShotType::Medium, ShotType::Wide],
        ShotType::MediumWide => [ShotType::Medium, ShotType::Wide],
        ShotType::Medium => [ShotType::MediumWide, ShotType::MediumCloseUp],
        ShotType::MediumCloseUp => [ShotType::CloseUp, ShotType::Medium],
        ShotType::CloseUp => [ShotType::MediumCloseUp, ShotType::ExtremeCloseUp],
        ShotType::ExtremeCloseUp => [ShotType::CloseUp, ShotType::MediumCloseUp],
    }
}

/// Check a proposed framing against the scene's recent history.
///
/// Returns the updated state (recording the pair actually chosen) and the outcome.
pub fn propose(
    mut state: VarietyState,
    shot: ShotType,
    angle: CameraAngle,
) -> (VarietyState, VarietyOutcome) {
    let proposed = (shot, angle);
    let run = state.trailing_run(proposed);
    let mut violations = Vec::new();

    let (final_shot, was_adjusted) = if run + 1 >= ADJUST_AT {
        let replacement = alternatives(shot)
            .into_iter()
            .find(|alt| *alt != shot)
            .unwrap_or(shot.wider());
        violations.push(Violation::adjusted(format!(
            "{} / {} would repeat {} times in a row; using {}",
            shot,
            angle,
            run + 1,
            replacement
        )));
        tracing::debug!(from = %shot, to = %replacement, "Variety adjustment");
        (replacement, true)
    } else {
        if run >= 1 {
            violations.push(Violation::warning(format!(
                "{} / {} repeats the previous beat",
                shot, angle
            )));
        }
        (shot, false)
    };

    state.push((final_shot, angle));
    (
        state,
        VarietyOutcome {
            final_shot,
            final_angle: angle,
            was_adjusted,
            violations,
        },
    )
}
