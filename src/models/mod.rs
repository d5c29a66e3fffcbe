pub mod beat;
pub mod cinematography;
pub mod context;
pub mod prompt;
pub mod result;
pub mod scene;
pub mod time;
pub mod vbs;

pub use beat::{Beat, BeatCharacter, BeatCharacterDraft, BeatDraft, CameraHint, VisualSignificance};
pub use cinematography::{CameraAngle, DepthOfField, HelmetState, ScreenPosition, ShotType};
pub use context::{
    AppearanceContext, AtmosphereCategory, CharacterContext, CharacterProfile, LocationContext,
    LocationProfile, StoryBible,
};
pub use prompt::{
    CompiledPrompt, FillInStatus, RuleOutcome, RuleStatus, Severity, ValidationReport,
    ValidationRule, Violation,
};
pub use result::{
    BeatFailure, BeatResult, EpisodeResultSet, RenderParams, RenderRequest, RunTotals,
};
pub use scene::{ArcPhase, EpisodeInput, NarrativeRole, Pacing, SceneContext, SceneInput, SceneKey};
pub use time::{Setting, TimeContext, TimeOfDay, TimeProvenance};
pub use vbs::{
    EnvironmentBlock, FaceTagPolicy, PromptConstraints, PromptField, Slot, SlotOrigin,
    SubjectBlock, TokenBudget, VisualBeatSpec,
};
