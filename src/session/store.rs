use std::path::{Path, PathBuf};

use crate::error::BeatframeError;
use crate::models::{EpisodeResultSet, TimeOfDay};
use crate::utils::text::path_key;

/// Persists episode result sets as pretty JSON under the data directory.
///
/// Layout: `{data_path}/sessions/{story}/episode-{n}.json`.
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn new(data_path: &Path) -> Self {
        Self {
            root: data_path.join("sessions"),
        }
    }

    pub fn path_for(&self, story_id: &str, episode: u32) -> PathBuf {
        self.root
            .join(path_key(story_id))
            .join(format!("episode-{}.json", episode))
    }

    /// Write a result set, replacing any earlier run of the same episode.
    pub fn save(&self, results: &EpisodeResultSet) -> Result<PathBuf, BeatframeError> {
        let path = self.path_for(&results.story_id, results.episode_number);
        let json = serde_json::to_string_pretty(results)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BeatframeError::Io(format!("Failed to create session directory: {}", e))
            })?;
        }
        std::fs::write(&path, json)
            .map_err(|e| BeatframeError::Io(format!("Failed to write results: {}", e)))?;

        tracing::info!("Saved results to {}", path.display());
        Ok(path)
    }

    /// Load a stored result set; `None` if the episode was never compiled.
    pub fn load(
        &self,
        story_id: &str,
        episode: u32,
    ) -> Result<Option<EpisodeResultSet>, BeatframeError> {
        let path = self.path_for(story_id, episode);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path)
            .map_err(|e| BeatframeError::Io(format!("Failed to read results: {}", e)))?;
        let results = serde_json::from_str(&json).map_err(|e| {
            BeatframeError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Some(results))
    }

    /// Episode numbers stored for a story, ascending.
    pub fn episodes(&self, story_id: &str) -> Result<Vec<u32>, BeatframeError> {
        let dir = self.root.join(path_key(story_id));
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut episodes: Vec<u32> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()?
                    .strip_prefix("episode-")?
                    .strip_suffix(".json")?
                    .parse()
                    .ok()
            })
            .collect();
        episodes.sort_unstable();
        Ok(episodes)
    }

    /// Ending time of the previous episode's stored run, if any.
    ///
    /// An unreadable file is logged and treated as missing.
    pub fn previous_ending_time(&self, story_id: &str, episode: u32) -> Option<TimeOfDay> {
        let previous = episode.checked_sub(1)?;
        match self.load(story_id, previous) {
            Ok(results) => results.and_then(|r| r.ending_time),
            Err(e) => {
                tracing::warn!("Ignoring stored episode {}: {}", previous, e);
                None
            }
        }
    }
}
