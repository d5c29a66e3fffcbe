//! Continuity tracking: per-character pose/expression carry-over within a scene.
//!
//! State is threaded explicitly: every update takes the state by value and
//! returns the new state. A new scene always starts from `ContinuityState::new`.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{HelmetState, SceneKey};
use crate::utils::text::normalize_name;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A remembered value tagged with the beat that set it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Carried<T> {
    pub value: T,
    pub source_beat: String,
}

/// Last known phrases for one character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CarryOver {
    pub action: Option<Carried<String>>,
    pub expression: Option<Carried<String>>,
    pub helmet: Option<Carried<HelmetState>>,
}

impl CarryOver {
    fn is_empty(&self) -> bool {
        self.action.is_none() && self.expression.is_none() && self.helmet.is_none()
    }
}

/// Continuity state for one scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContinuityState {
    scene: SceneKey,
    characters: HashMap<String, CarryOver>,
}

impl ContinuityState {
    pub fn new(scene: SceneKey) -> Self {
        Self {
            scene,
            characters: HashMap::new(),
        }
    }

    pub fn scene(&self) -> SceneKey {
        self.scene
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// State for `scene`: this state if it already belongs to `scene`, a fresh
    /// one otherwise.
    pub fn for_scene(self, scene: SceneKey) -> Self {
        if self.scene == scene {
            self
        } else {
            tracing::debug!(from = %self.scene, to = %scene, "Scene boundary, continuity cleared");
            Self::new(scene)
        }
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Record the phrases a beat authored for a character.
///
/// `None` (or blank) leaves the previous phrase in place; an explicit phrase
/// replaces it and takes `beat_id` as its source.
pub fn record_beat(
    mut state: ContinuityState,
    beat_id: &str,
    character_id: &str,
    action: Option<&str>,
    expression: Option<&str>,
) -> ContinuityState {
    let entry = state
        .characters
        .entry(normalize_name(character_id))
        .or_default();
    if let Some(action) = action.map(str::trim).filter(|a| !a.is_empty()) {
        entry.action = Some(Carried {
            value: action.to_string(),
            source_beat: beat_id.to_string(),
        });
    }
    if let Some(expression) = expression.map(str::trim).filter(|e| !e.is_empty()) {
        entry.expression = Some(Carried {
            value: expression.to_string(),
            source_beat: beat_id.to_string(),
        });
    }
    state
}

/// Record an explicit helmet state for a character.
pub fn record_helmet(
    mut state: ContinuityState,
    beat_id: &str,
    character_id: &str,
    helmet: HelmetState,
) -> ContinuityState {
    state
        .characters
        .entry(normalize_name(character_id))
        .or_default()
        .helmet = Some(Carried {
        value: helmet,
        source_beat: beat_id.to_string(),
    });
    state
}

/// What a beat that supplies nothing for `character_id` should carry over.
///
/// `None` when no earlier beat in the scene supplied anything.
pub fn resolve(state: &ContinuityState, character_id: &str) -> Option<CarryOver> {
    state
        .characters
        .get(&normalize_name(character_id))
        .filter(|c| !c.is_empty())
        .cloned()
}
