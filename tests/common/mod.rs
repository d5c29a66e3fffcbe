pub mod builders;
pub mod harness;

// Re-export commonly used test utilities
pub use builders::{BeatBuilder, EpisodeBuilder, SceneBuilder};
pub use harness::{test_bible, TestHarness};
