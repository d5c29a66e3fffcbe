//! Phase B: fill-in coordination with the external text-generation collaborator.
//!
//! Only slots Phase A marked `Pending` are sent and only those are written
//! back. Every failure path (timeout, error, malformed or empty response)
//! keeps Phase A's defaults; fill-in never fails a beat.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{FillInStatus, SceneContext, VisualBeatSpec};
use crate::services::generator::TextGenerator;
use crate::utils::text::normalize_name;
use crate::BeatframeError;

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Open slots for one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectSlots {
    pub character_id: String,
    pub trigger: String,
    pub wants_action: bool,
    pub wants_expression: bool,
    /// Current text, kept when the collaborator has nothing better.
    pub action: String,
    pub expression: String,
}

/// Request sent to the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillInRequest {
    pub beat_id: String,
    pub scene: String,
    pub arc_phase: String,
    pub intensity: u8,
    pub narrative: String,
    pub shot: String,
    pub angle: String,
    pub location: String,
    pub time_of_day: String,
    /// Present when composition is open; holds the default phrase.
    pub composition: Option<String>,
    pub subjects: Vec<SubjectSlots>,
    pub instructions: String,
    /// JSON Schema of the expected response.
    pub response_schema: serde_json::Value,
}

/// Phrases supplied for one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubjectFill {
    pub character_id: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub expression: Option<String>,
}

/// Response expected from the collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FillInResponse {
    /// Composition phrase, plain text without punctuation wrappers.
    #[serde(default)]
    pub composition: Option<String>,
    #[serde(default)]
    pub subjects: Vec<SubjectFill>,
}

impl FillInResponse {
    fn is_empty(&self) -> bool {
        self.composition
            .as_deref()
            .map_or(true, |c| c.trim().is_empty())
            && self.subjects.is_empty()
    }
}

const INSTRUCTIONS: &str = "Fill the open slots with short, concrete visual phrases \
(under 12 words each). Describe only what a camera sees. Answer with one JSON object \
matching response_schema and nothing else.";

impl FillInRequest {
    pub fn from_vbs(vbs: &VisualBeatSpec, scene: &SceneContext) -> Self {
        let schema = schemars::schema_for!(FillInResponse);
        Self {
            beat_id: vbs.beat_id.clone(),
            scene: scene.key.to_string(),
            arc_phase: scene.arc_phase.to_string(),
            intensity: scene.intensity(),
            narrative: vbs.narrative.clone(),
            shot: vbs.shot.to_string(),
            angle: vbs.angle.to_string(),
            location: vbs.environment.location.clone(),
            time_of_day: vbs.time.token(),
            composition: vbs
                .composition
                .is_pending()
                .then(|| vbs.composition.text().to_string()),
            subjects: vbs
                .subjects
                .iter()
                .filter(|s| s.action.is_pending() || s.expression.is_pending())
                .map(|s| SubjectSlots {
                    character_id: s.character_id.clone(),
                    trigger: s.trigger.clone(),
                    wants_action: s.action.is_pending(),
                    wants_expression: s.expression.is_pending(),
                    action: s.action.text().to_string(),
                    expression: s.expression.text().to_string(),
                })
                .collect(),
            instructions: INSTRUCTIONS.to_string(),
            response_schema: serde_json::to_value(schema).unwrap_or_default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn empty_for_tests() -> Self {
        Self {
            beat_id: "test-beat".into(),
            scene: "ep1-s1".into(),
            arc_phase: "RISING".into(),
            intensity: 5,
            narrative: String::new(),
            shot: "medium shot".into(),
            angle: "eye-level".into(),
            location: String::new(),
            time_of_day: "night".into(),
            composition: None,
            subjects: vec![],
            instructions: INSTRUCTIONS.into(),
            response_schema: serde_json::Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// First JSON object in `raw` that reads as a non-empty response.
///
/// Tolerates markdown fences and prose around the object by running a
/// deserializer from every `{`.
pub fn parse_response(raw: &str) -> Result<FillInResponse, BeatframeError> {
    if raw.trim().is_empty() {
        return Err(BeatframeError::FillIn("empty response".to_string()));
    }
    let bytes = raw.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] != b'{' {
            pos += 1;
            continue;
        }
        let mut de =
            serde_json::Deserializer::from_str(&raw[pos..]).into_iter::<FillInResponse>();
        if let Some(Ok(response)) = de.next() {
            if !response.is_empty() {
                return Ok(response);
            }
        }
        pos += 1;
    }
    Err(BeatframeError::FillIn(
        "response contained no usable JSON object".to_string(),
    ))
}

/// Write a response into the VBS's pending slots. Returns how many were filled.
pub fn merge(vbs: &mut VisualBeatSpec, response: &FillInResponse) -> usize {
    let mut filled = 0;
    if let Some(composition) = &response.composition {
        filled += usize::from(vbs.composition.fill(composition));
    }
    for fill in &response.subjects {
        let key = normalize_name(&fill.character_id);
        let Some(subject) = vbs.subjects.iter_mut().find(|s| {
            normalize_name(&s.character_id) == key || normalize_name(&s.trigger) == key
        }) else {
            tracing::debug!("Fill-in named unknown subject '{}'", fill.character_id);
            continue;
        };
        if let Some(action) = &fill.action {
            filled += usize::from(subject.action.fill(action));
        }
        if let Some(expression) = &fill.expression {
            filled += usize::from(subject.expression.fill(expression));
        }
    }
    filled
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

pub struct FillInCoordinator {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl FillInCoordinator {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Run fill-in for one VBS. Pending slots are always closed on return.
    pub async fn fill(&self, vbs: &mut VisualBeatSpec, scene: &SceneContext) -> FillInStatus {
        let pending = vbs.pending_slots();
        if !vbs.needs_fill_in || pending == 0 {
            vbs.settle_pending();
            return FillInStatus::Skipped;
        }

        let request = FillInRequest::from_vbs(vbs, scene);
        let status = match self.call(&request).await {
            Ok(response) => {
                let filled = merge(vbs, &response);
                if filled == 0 {
                    FillInStatus::Fallback {
                        reason: "response filled no pending slots".to_string(),
                    }
                } else if filled < pending {
                    FillInStatus::Partial {
                        filled,
                        pending: pending - filled,
                    }
                } else {
                    FillInStatus::Filled { slots: filled }
                }
            }
            Err(e) => {
                tracing::warn!(beat_id = %vbs.beat_id, "Fill-in fell back to defaults: {}", e);
                FillInStatus::Fallback {
                    reason: e.to_string(),
                }
            }
        };

        if let FillInStatus::Fallback { reason } = &status {
            vbs.notes
                .push(format!("INFO: fill-in used deterministic defaults ({})", reason));
        }
        vbs.settle_pending();
        status
    }

    async fn call(&self, request: &FillInRequest) -> Result<FillInResponse, BeatframeError> {
        let raw = tokio::time::timeout(self.timeout, self.generator.generate(request))
            .await
            .map_err(|_| BeatframeError::FillInTimeout {
                beat_id: request.beat_id.clone(),
                seconds: self.timeout.as_secs(),
            })??;
        parse_response(&raw)
    }
}
