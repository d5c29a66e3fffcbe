//! Visual Beat Spec: the structured intermediate representation between a
//! beat and its prompt text.
//!
//! Phase A builds it with every deterministic field populated, Phase B may
//! refine the slots marked `Pending`, Phase C compiles it, and Phase D may
//! force individual slots back to safe defaults before recompiling.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::cinematography::{
    CameraAngle, DepthOfField, HelmetState, ScreenPosition, ShotType,
};
use crate::models::scene::SceneKey;
use crate::models::time::{Setting, TimeContext};

/// Where a slot's text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotOrigin {
    /// Written on the beat itself.
    Authored,
    /// Carried over from an earlier beat in the same scene.
    CarriedOver { beat_id: String },
    /// Chosen by a fixed rule.
    Deterministic,
    /// Supplied by the text-generation collaborator.
    FillIn,
    /// Open for fill-in; holds the deterministic default until then.
    Pending,
    /// Intentionally empty.
    Absent,
}

/// A fillable text field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    text: String,
    origin: SlotOrigin,
}

impl Slot {
    pub fn authored(text: impl Into<String>) -> Self {
        Self::with_origin(text, SlotOrigin::Authored)
    }

    pub fn carried(text: impl Into<String>, beat_id: impl Into<String>) -> Self {
        Self::with_origin(
            text,
            SlotOrigin::CarriedOver {
                beat_id: beat_id.into(),
            },
        )
    }

    pub fn deterministic(text: impl Into<String>) -> Self {
        Self::with_origin(text, SlotOrigin::Deterministic)
    }

    /// Open slot; `default` (possibly empty) is used if fill-in never answers.
    pub fn pending(default: impl Into<String>) -> Self {
        Self {
            text: default.into().trim().to_string(),
            origin: SlotOrigin::Pending,
        }
    }

    pub fn absent() -> Self {
        Self {
            text: String::new(),
            origin: SlotOrigin::Absent,
        }
    }

    fn with_origin(text: impl Into<String>, origin: SlotOrigin) -> Self {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Self::absent();
        }
        Self { text, origin }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> &SlotOrigin {
        &self.origin
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.origin == SlotOrigin::Pending
    }

    /// Fill a pending slot. Returns false (and leaves the slot alone) when the
    /// slot is not pending or the text is blank.
    pub fn fill(&mut self, text: &str) -> bool {
        let text = text.trim();
        if !self.is_pending() || text.is_empty() {
            return false;
        }
        self.text = text.to_string();
        self.origin = SlotOrigin::FillIn;
        true
    }

    /// Close a pending slot on its deterministic default.
    pub fn settle(&mut self) {
        if self.is_pending() {
            self.origin = if self.text.is_empty() {
                SlotOrigin::Absent
            } else {
                SlotOrigin::Deterministic
            };
        }
    }

    /// Replace with a known-safe value during repair.
    pub fn force(&mut self, text: impl Into<String>) {
        *self = Self::deterministic(text);
    }
}

/// One character in the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectBlock {
    pub character_id: String,
    /// Renderer visual-trigger token.
    pub trigger: String,
    pub appearance: String,
    pub action: Slot,
    pub expression: Slot,
    pub position: ScreenPosition,
    pub face_visible: bool,
    pub helmet: HelmetState,
    pub face_tag: Option<String>,
    /// Lookup missed; appearance is a generic default.
    pub fallback: bool,
}

impl SubjectBlock {
    /// Plain-phrase description written into the prompt.
    pub fn describe(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(5);
        for part in [self.trigger.as_str(), self.appearance.as_str()] {
            if !part.trim().is_empty() {
                parts.push(part.trim());
            }
        }
        if let Some(helmet) = self.helmet.phrase() {
            parts.push(helmet);
        }
        for slot in [&self.action, &self.expression] {
            if !slot.is_empty() {
                parts.push(slot.text());
            }
        }
        parts.join(", ")
    }
}

/// Where the beat happens and how it looks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentBlock {
    /// Location shorthand.
    pub location: String,
    pub visual: String,
    /// Persistent anchor objects.
    pub anchors: Vec<String>,
    /// Vehicle and props referenced by the beat.
    pub props: Vec<String>,
    pub lighting: Vec<String>,
    pub atmosphere: Vec<String>,
    pub color_grade: String,
    pub setting: Option<Setting>,
    /// Lookup missed; visual is a generic default.
    pub fallback: bool,
}

/// Fields of the compiled prompt, in emission order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PromptField {
    Shot,
    DepthOfField,
    Angle,
    Composition,
    Subjects,
    Location,
    Anchors,
    Props,
    Lighting,
    Atmosphere,
    ColorGrade,
    FaceTags,
}

impl PromptField {
    pub const ORDER: [PromptField; 12] = [
        PromptField::Shot,
        PromptField::DepthOfField,
        PromptField::Angle,
        PromptField::Composition,
        PromptField::Subjects,
        PromptField::Location,
        PromptField::Anchors,
        PromptField::Props,
        PromptField::Lighting,
        PromptField::Atmosphere,
        PromptField::ColorGrade,
        PromptField::FaceTags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptField::Shot => "shot",
            PromptField::DepthOfField => "depth_of_field",
            PromptField::Angle => "angle",
            PromptField::Composition => "composition",
            PromptField::Subjects => "subjects",
            PromptField::Location => "location",
            PromptField::Anchors => "anchors",
            PromptField::Props => "props",
            PromptField::Lighting => "lighting",
            PromptField::Atmosphere => "atmosphere",
            PromptField::ColorGrade => "color_grade",
            PromptField::FaceTags => "face_tags",
        }
    }

    /// Default truncation order, least important first.
    pub fn default_drop_order() -> Vec<PromptField> {
        vec![
            PromptField::Atmosphere,
            PromptField::Anchors,
            PromptField::ColorGrade,
            PromptField::Composition,
            PromptField::Lighting,
            PromptField::DepthOfField,
        ]
    }
}

/// Which subjects receive a face-region tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FaceTagPolicy {
    /// Only subjects whose face is visible.
    #[default]
    VisibleFaces,
    AllSubjects,
    Disabled,
}

/// Estimated-token band the compiled prompt must fall within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    pub min: usize,
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConstraints {
    pub budget: TokenBudget,
    pub face_tag_policy: FaceTagPolicy,
    /// Fields eligible for truncation, least important first.
    pub drop_order: Vec<PromptField>,
    /// Fields that must be non-empty and are never dropped.
    pub required: Vec<PromptField>,
}

impl PromptConstraints {
    pub fn is_required(&self, field: PromptField) -> bool {
        self.required.contains(&field)
    }

    /// Drop order with required fields filtered out.
    pub fn droppable(&self) -> impl Iterator<Item = PromptField> + '_ {
        self.drop_order
            .iter()
            .copied()
            .filter(|f| !self.is_required(*f))
    }

    /// Pin a field: make it required and remove it from the drop order.
    pub fn pin(&mut self, field: PromptField) {
        if !self.required.contains(&field) {
            self.required.push(field);
        }
        self.drop_order.retain(|f| *f != field);
    }
}

/// Visual Beat Spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualBeatSpec {
    pub beat_id: String,
    pub scene: SceneKey,
    pub shot: ShotType,
    pub angle: CameraAngle,
    pub depth_of_field: DepthOfField,
    pub composition: Slot,
    /// In beat order; the compiler sorts by screen position.
    pub subjects: Vec<SubjectBlock>,
    pub environment: EnvironmentBlock,
    pub constraints: PromptConstraints,
    pub time: TimeContext,
    /// Why the arc mapper chose the framing.
    pub reason: String,
    pub variety_adjusted: bool,
    /// Phase A judged the defaults insufficiently specific.
    pub needs_fill_in: bool,
    /// Beat script text, context for fill-in.
    pub narrative: String,
    /// Non-fatal notes collected while building (lookup misses, variety warnings).
    pub notes: Vec<String>,
}

impl VisualBeatSpec {
    /// Whether the given field has content to emit.
    pub fn has_content(&self, field: PromptField) -> bool {
        match field {
            PromptField::Shot | PromptField::Angle | PromptField::DepthOfField => true,
            PromptField::Composition => !self.composition.is_empty(),
            PromptField::Subjects => !self.subjects.is_empty(),
            PromptField::Location => {
                !self.environment.visual.is_empty() || !self.environment.location.is_empty()
            }
            PromptField::Anchors => !self.environment.anchors.is_empty(),
            PromptField::Props => !self.environment.props.is_empty(),
            PromptField::Lighting => !self.environment.lighting.is_empty(),
            PromptField::Atmosphere => !self.environment.atmosphere.is_empty(),
            PromptField::ColorGrade => !self.environment.color_grade.is_empty(),
            PromptField::FaceTags => self.subjects.iter().any(|s| {
                s.face_tag.is_some()
                    && (self.constraints.face_tag_policy == FaceTagPolicy::AllSubjects
                        || s.face_visible)
            }),
        }
    }

    /// Required fields that are empty.
    pub fn missing_required(&self) -> Vec<PromptField> {
        self.constraints
            .required
            .iter()
            .copied()
            .filter(|f| !self.has_content(*f))
            .collect()
    }

    /// Every slot still open for fill-in.
    pub fn pending_slots(&self) -> usize {
        let subjects = self
            .subjects
            .iter()
            .flat_map(|s| [&s.action, &s.expression])
            .filter(|slot| slot.is_pending())
            .count();
        subjects + usize::from(self.composition.is_pending())
    }

    /// Close every pending slot on its deterministic default.
    pub fn settle_pending(&mut self) {
        self.composition.settle();
        for subject in &mut self.subjects {
            subject.action.settle();
            subject.expression.settle();
        }
    }
}
