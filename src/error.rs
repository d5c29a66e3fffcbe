use thiserror::Error;

/// Custom error type for Beatframe operations.
#[derive(Debug, Error)]
pub enum BeatframeError {
    /// A beat is missing identifying fields and cannot be compiled.
    ///
    /// Fatal to that single beat only; sibling beats keep processing.
    #[error("Structural error in beat '{beat_id}' (scene {scene_id}): {message}")]
    Structural {
        beat_id: String,
        scene_id: String,
        message: String,
    },

    /// Character or location context backend failed.
    #[error("Context lookup error: {0}")]
    Lookup(String),

    /// External text-generation collaborator failed or returned garbage.
    #[error("Fill-in error: {0}")]
    FillIn(String),

    /// External text-generation collaborator did not answer in time.
    #[error("Fill-in timed out for beat '{beat_id}' after {seconds}s")]
    FillInTimeout { beat_id: String, seconds: u64 },

    /// Input validation failed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(String),

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The batch was cancelled before this beat ran.
    #[error("Cancelled")]
    Cancelled,
}

impl BeatframeError {
    /// Build a structural error for a beat.
    pub fn structural(
        beat_id: impl Into<String>,
        scene_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        BeatframeError::Structural {
            beat_id: beat_id.into(),
            scene_id: scene_id.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for BeatframeError {
    fn from(err: serde_json::Error) -> Self {
        BeatframeError::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml_ng::Error> for BeatframeError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        BeatframeError::Serialization(format!("YAML: {}", err))
    }
}

impl From<toml::de::Error> for BeatframeError {
    fn from(err: toml::de::Error) -> Self {
        BeatframeError::Config(err.to_string())
    }
}

impl From<std::io::Error> for BeatframeError {
    fn from(err: std::io::Error) -> Self {
        BeatframeError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_error_names_beat_and_scene() {
        let err = BeatframeError::structural("#3", "ep1-s2", "missing beat_id");
        insta::assert_snapshot!(
            err.to_string(),
            @"Structural error in beat '#3' (scene ep1-s2): missing beat_id"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = BeatframeError::FillInTimeout {
            beat_id: "s1-b4".into(),
            seconds: 20,
        };
        assert_eq!(err.to_string(), "Fill-in timed out for beat 's1-b4' after 20s");
    }
}
