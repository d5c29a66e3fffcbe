//! Phase D: fixed-battery validation with one bounded repair per rule.
//!
//! Every rule is checked against the compiled prompt. A failing rule with a
//! repair gets exactly one attempt: the repair edits the VBS, the prompt is
//! recompiled, and every rule is checked again. Anything still failing is
//! recorded as a warning and never blocks the beat.

use std::collections::HashMap;

use crate::config::PipelineConfig;
use crate::models::{
    CompiledPrompt, HelmetState, PromptField, RuleOutcome, RuleStatus, Slot, SlotOrigin,
    ValidationReport, ValidationRule, VisualBeatSpec,
};
use crate::services::compiler::{self, compile};
use crate::services::vbs_builder::default_composition;
use crate::utils::text::contains_term;

/// Repairs attempted per rule per beat.
pub const MAX_REPAIR_ATTEMPTS_PER_RULE: usize = 1;

/// Placeholder text that must never reach the renderer.
pub const BUILTIN_FORBIDDEN_TERMS: &[&str] = &[
    "TODO",
    "TBD",
    "[placeholder]",
    "lorem ipsum",
    "N/A",
    "undefined",
    "null",
    "<insert",
];

/// Expression words that imply a visible face.
const FACE_WORDS: &[&str] = &[
    "eyes", "smile", "smiling", "frown", "frowning", "grin", "grinning", "tears", "mouth",
    "lips", "brow", "face", "gaze", "stare", "staring", "glare", "glaring", "jaw", "cheek",
    "scowl", "smirk", "wince", "blush",
];

/// A failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub message: String,
    /// Whether the rule has a repair for this failure.
    pub repairable: bool,
}

impl Finding {
    fn repairable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            repairable: true,
        }
    }

    fn warning_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            repairable: false,
        }
    }
}

/// Validates compiled prompts and repairs their VBS.
#[derive(Debug, Clone)]
pub struct PromptValidator {
    forbidden: Vec<String>,
}

impl Default for PromptValidator {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl PromptValidator {
    /// Built-in forbidden terms plus `extra`.
    pub fn new(extra: &[String]) -> Self {
        let mut forbidden: Vec<String> = BUILTIN_FORBIDDEN_TERMS
            .iter()
            .map(|t| t.to_string())
            .collect();
        for term in extra {
            let term = term.trim();
            if !term.is_empty() && !forbidden.iter().any(|f| f.eq_ignore_ascii_case(term)) {
                forbidden.push(term.to_string());
            }
        }
        Self { forbidden }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.forbidden_terms)
    }

    pub fn forbidden_terms(&self) -> &[String] {
        &self.forbidden
    }

    /// Compile the VBS and run the battery, repairing in place.
    pub fn validate(&self, vbs: &mut VisualBeatSpec) -> CompiledPrompt {
        let mut prompt = compile(vbs);
        let mut attempts: HashMap<ValidationRule, usize> = HashMap::new();
        let mut first_failure: HashMap<ValidationRule, String> = HashMap::new();

        loop {
            let mut repaired = false;
            for rule in ValidationRule::ALL {
                let Some(finding) = self.check(rule, vbs, &prompt) else {
                    continue;
                };
                first_failure
                    .entry(rule)
                    .or_insert_with(|| finding.message.clone());
                let count = attempts.get(&rule).copied().unwrap_or(0);
                if finding.repairable && count < MAX_REPAIR_ATTEMPTS_PER_RULE {
                    attempts.insert(rule, count + 1);
                    tracing::debug!(
                        beat_id = %vbs.beat_id,
                        rule = %rule,
                        "Repairing: {}",
                        finding.message
                    );
                    self.repair(rule, vbs);
                    repaired = true;
                }
            }
            if !repaired {
                break;
            }
            prompt = compile(vbs);
        }

        let mut report = ValidationReport {
            warnings: vbs.notes.clone(),
            ..Default::default()
        };
        for rule in ValidationRule::ALL {
            let repair_attempted = attempts.contains_key(&rule);
            let outcome = match self.check(rule, vbs, &prompt) {
                None => match first_failure.get(&rule) {
                    Some(original) => RuleOutcome {
                        rule,
                        status: RuleStatus::Repaired,
                        repair_attempted,
                        message: Some(original.clone()),
                    },
                    None => RuleOutcome {
                        rule,
                        status: RuleStatus::Pass,
                        repair_attempted,
                        message: None,
                    },
                },
                Some(finding) => {
                    tracing::warn!(
                        beat_id = %vbs.beat_id,
                        rule = %rule,
                        "Validation warning: {}",
                        finding.message
                    );
                    RuleOutcome {
                        rule,
                        status: RuleStatus::Warning,
                        repair_attempted,
                        message: Some(finding.message),
                    }
                }
            };
            report.add_outcome(outcome);
        }

        prompt.with_report(report)
    }

    /// Run one rule. `None` means it passed.
    pub fn check(
        &self,
        rule: ValidationRule,
        vbs: &VisualBeatSpec,
        prompt: &CompiledPrompt,
    ) -> Option<Finding> {
        let text = prompt.text();
        match rule {
            ValidationRule::CharacterPresence => {
                let missing: Vec<&str> = vbs
                    .subjects
                    .iter()
                    .filter(|s| s.trigger.trim().is_empty() || !contains_term(text, &s.trigger))
                    .map(|s| s.character_id.as_str())
                    .collect();
                (!missing.is_empty()).then(|| {
                    Finding::repairable(format!(
                        "character trigger missing for {}",
                        missing.join(", ")
                    ))
                })
            }
            ValidationRule::VehiclePresence => {
                let missing: Vec<&str> = vbs
                    .environment
                    .props
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty() && !contains_term(text, p))
                    .collect();
                (!missing.is_empty()).then(|| {
                    Finding::repairable(format!("referenced props missing: {}", missing.join(", ")))
                })
            }
            ValidationRule::ForbiddenTerms => {
                let found: Vec<&str> = self
                    .forbidden
                    .iter()
                    .map(String::as_str)
                    .filter(|term| contains_term(text, term))
                    .collect();
                (!found.is_empty())
                    .then(|| Finding::repairable(format!("forbidden terms: {}", found.join(", "))))
            }
            ValidationRule::FaceTagSpacing => {
                let malformed = vbs
                    .subjects
                    .iter()
                    .filter_map(|s| s.face_tag.as_deref())
                    .any(|tag| tag.trim().chars().any(char::is_whitespace));
                let tags = compiler::face_tags(vbs);
                if malformed {
                    Some(Finding::repairable("face tag contains whitespace"))
                } else if !tags.is_empty() && !text.ends_with(&format!(" {}", tags)) {
                    Some(Finding::warning_only(
                        "face tags are not a single trailing group",
                    ))
                } else {
                    None
                }
            }
            ValidationRule::TokenBudget => {
                let budget = vbs.constraints.budget;
                let estimate = prompt.token_estimate();
                if estimate > budget.max {
                    Some(Finding::repairable(format!(
                        "estimated {} tokens exceeds maximum {}",
                        estimate, budget.max
                    )))
                } else if estimate < budget.min {
                    Some(Finding::warning_only(format!(
                        "estimated {} tokens below minimum {}",
                        estimate, budget.min
                    )))
                } else {
                    None
                }
            }
            ValidationRule::VisorConsistency => {
                let conflicts: Vec<&str> = vbs
                    .subjects
                    .iter()
                    .filter(|s| s.helmet == HelmetState::VisorDown)
                    .filter(|s| {
                        s.face_tag.is_some()
                            || FACE_WORDS
                                .iter()
                                .any(|w| contains_term(s.expression.text(), w))
                    })
                    .map(|s| s.character_id.as_str())
                    .collect();
                (!conflicts.is_empty()).then(|| {
                    Finding::repairable(format!(
                        "facial detail on visor-down subject: {}",
                        conflicts.join(", ")
                    ))
                })
            }
        }
    }

    fn repair(&self, rule: ValidationRule, vbs: &mut VisualBeatSpec) {
        match rule {
            ValidationRule::CharacterPresence => {
                for subject in &mut vbs.subjects {
                    if subject.trigger.trim().is_empty() {
                        subject.trigger = subject.character_id.clone();
                    }
                }
                vbs.constraints.pin(PromptField::Subjects);
            }
            ValidationRule::VehiclePresence => {
                vbs.constraints.pin(PromptField::Props);
            }
            ValidationRule::ForbiddenTerms => self.scrub_forbidden(vbs),
            ValidationRule::FaceTagSpacing => {
                for subject in &mut vbs.subjects {
                    if let Some(tag) = subject.face_tag.as_mut() {
                        tag.retain(|c| !c.is_whitespace());
                    }
                }
            }
            ValidationRule::TokenBudget => {
                // Fill-in text is the only free-form contributor; fall back to defaults.
                let default = default_composition(vbs.subjects.len(), vbs.shot);
                if vbs.composition.origin() == &SlotOrigin::FillIn {
                    vbs.composition.force(default);
                }
                for subject in &mut vbs.subjects {
                    for slot in [&mut subject.action, &mut subject.expression] {
                        if slot.origin() == &SlotOrigin::FillIn {
                            *slot = Slot::absent();
                        }
                    }
                }
            }
            ValidationRule::VisorConsistency => {
                for subject in &mut vbs.subjects {
                    if subject.helmet == HelmetState::VisorDown {
                        subject.expression = Slot::absent();
                        subject.face_tag = None;
                        subject.face_visible = false;
                    }
                }
            }
        }
    }

    fn scrub_forbidden(&self, vbs: &mut VisualBeatSpec) {
        let hit = |text: &str| self.forbidden.iter().any(|t| contains_term(text, t));

        if hit(vbs.composition.text()) {
            vbs.composition
                .force(default_composition(vbs.subjects.len(), vbs.shot));
        }
        for subject in &mut vbs.subjects {
            for slot in [&mut subject.action, &mut subject.expression] {
                if hit(slot.text()) {
                    *slot = Slot::absent();
                }
            }
            if hit(&subject.appearance) {
                subject.appearance = crate::services::vbs_builder::FALLBACK_APPEARANCE.to_string();
            }
        }
        let env = &mut vbs.environment;
        if hit(&env.visual) {
            env.visual.clear();
        }
        env.anchors.retain(|a| !hit(a));
        env.atmosphere.retain(|a| !hit(a));
    }
}
