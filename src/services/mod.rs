pub mod arc_visual;
pub mod compiler;
pub mod continuity;
pub mod fill_in;
pub mod generator;
pub mod lookup;
pub mod pipeline;
pub mod progress;
pub mod time_of_day;
pub mod validator;
pub mod variety;
pub mod vbs_builder;

pub use arc_visual::Recommendation;
pub use compiler::compile;
pub use continuity::{CarryOver, ContinuityState};
pub use fill_in::{FillInCoordinator, FillInRequest, FillInResponse};
pub use generator::{CommandTextGenerator, NoopTextGenerator, TextGenerator};
pub use lookup::{BibleContextLookup, CachedContextLookup, ContextLookup, NoopContextLookup};
pub use pipeline::Pipeline;
pub use progress::{
    noop_progress, BarProgressReporter, CancellationFlag, NoopProgressReporter, ProgressReporter,
};
pub use validator::PromptValidator;
pub use variety::{VarietyOutcome, VarietyState};
pub use vbs_builder::{BeatInput, VbsBuilder};
