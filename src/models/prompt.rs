//! Compiled prompts and their validation reports.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::vbs::PromptField;

// ============================================================================
// Violations
// ============================================================================

/// Severity of a non-fatal violation.
///
/// Ordered from least to most severe so violations can be sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Recorded, non-blocking.
    Warning,
    /// The pipeline changed its own choice to resolve the violation.
    Adjusted,
}

/// A non-fatal violation raised while building or validating a beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub severity: Severity,
    pub message: String,
}

impl Violation {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn adjusted(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Adjusted,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Adjusted => "ADJUSTED",
        };
        write!(f, "{}: {}", label, self.message)
    }
}

// ============================================================================
// Validation
// ============================================================================

/// The fixed battery of Phase D checks, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    CharacterPresence,
    VehiclePresence,
    ForbiddenTerms,
    FaceTagSpacing,
    TokenBudget,
    VisorConsistency,
}

impl ValidationRule {
    pub const ALL: [ValidationRule; 6] = [
        ValidationRule::CharacterPresence,
        ValidationRule::VehiclePresence,
        ValidationRule::ForbiddenTerms,
        ValidationRule::FaceTagSpacing,
        ValidationRule::TokenBudget,
        ValidationRule::VisorConsistency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationRule::CharacterPresence => "character_presence",
            ValidationRule::VehiclePresence => "vehicle_presence",
            ValidationRule::ForbiddenTerms => "forbidden_terms",
            ValidationRule::FaceTagSpacing => "face_tag_spacing",
            ValidationRule::TokenBudget => "token_budget",
            ValidationRule::VisorConsistency => "visor_consistency",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final status of one rule for one beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Pass,
    /// Failed initially, passed after one repair.
    Repaired,
    /// Recorded, non-blocking.
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: ValidationRule,
    pub status: RuleStatus,
    /// Whether a repair was attempted for this rule.
    pub repair_attempted: bool,
    pub message: Option<String>,
}

/// Per-beat validation report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub outcomes: Vec<RuleOutcome>,
    /// Every non-fatal note for the beat: variety, lookup, fill-in and validation.
    pub warnings: Vec<String>,
    pub token_estimate: usize,
}

impl ValidationReport {
    pub fn add_outcome(&mut self, outcome: RuleOutcome) {
        if outcome.status == RuleStatus::Warning {
            if let Some(message) = &outcome.message {
                self.warnings
                    .push(format!("WARNING: {}: {}", outcome.rule, message));
            }
        }
        self.outcomes.push(outcome);
    }

    pub fn status(&self, rule: ValidationRule) -> Option<RuleStatus> {
        self.outcomes
            .iter()
            .find(|o| o.rule == rule)
            .map(|o| o.status)
    }

    /// Checks that failed and stayed failed after their repair attempt.
    pub fn unrepaired(&self) -> Vec<&RuleOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == RuleStatus::Warning && o.repair_attempted)
            .collect()
    }

    pub fn repairs(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == RuleStatus::Repaired)
            .count()
    }

    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.status != RuleStatus::Warning)
    }
}

// ============================================================================
// Compiled prompt
// ============================================================================

/// Final prompt text for one beat.
///
/// Created by the compiler, replaced only by validation repairs, then frozen
/// inside a `BeatResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPrompt {
    beat_id: String,
    text: String,
    token_estimate: usize,
    dropped: Vec<PromptField>,
    report: ValidationReport,
}

impl CompiledPrompt {
    pub(crate) fn new(
        beat_id: impl Into<String>,
        text: String,
        token_estimate: usize,
        dropped: Vec<PromptField>,
    ) -> Self {
        Self {
            beat_id: beat_id.into(),
            text,
            token_estimate,
            dropped,
            report: ValidationReport {
                token_estimate,
                ..Default::default()
            },
        }
    }

    pub(crate) fn with_report(mut self, mut report: ValidationReport) -> Self {
        report.token_estimate = self.token_estimate;
        self.report = report;
        self
    }

    pub fn beat_id(&self) -> &str {
        &self.beat_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token_estimate(&self) -> usize {
        self.token_estimate
    }

    /// Fields removed to fit the token budget, in the order they were dropped.
    pub fn dropped(&self) -> &[PromptField] {
        &self.dropped
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }
}

/// What happened in the fill-in phase for one beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FillInStatus {
    /// Deterministic defaults were specific enough.
    Skipped,
    /// Every pending slot was filled.
    Filled { slots: usize },
    /// Some slots were filled; the rest kept their defaults.
    Partial { filled: usize, pending: usize },
    /// The collaborator failed; defaults were used.
    Fallback { reason: String },
}

impl FillInStatus {
    pub fn used_collaborator(&self) -> bool {
        matches!(
            self,
            FillInStatus::Filled { .. } | FillInStatus::Partial { .. }
        )
    }
}
