//! Character and location context lookup.
//!
//! Lookup misses are normal: the VBS builder degrades to generic defaults.
//! Only backend failures are errors, and the builder degrades on those too.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::models::{CharacterContext, LocationContext, StoryBible};
use crate::utils::text::normalize_name;
use crate::BeatframeError;

/// Minimum normalized Levenshtein similarity for a fuzzy name match.
pub const FUZZY_THRESHOLD: f64 = 0.8;

/// Source of character and location visual context.
#[async_trait]
pub trait ContextLookup: Send + Sync {
    /// Resolve a character as they appear at `location`.
    async fn character(
        &self,
        story_id: &str,
        name: &str,
        location: &str,
    ) -> Result<Option<CharacterContext>, BeatframeError>;

    async fn location(
        &self,
        story_id: &str,
        name: &str,
    ) -> Result<Option<LocationContext>, BeatframeError>;
}

/// Lookup that never finds anything.
pub struct NoopContextLookup;

#[async_trait]
impl ContextLookup for NoopContextLookup {
    async fn character(
        &self,
        _story_id: &str,
        _name: &str,
        _location: &str,
    ) -> Result<Option<CharacterContext>, BeatframeError> {
        Ok(None)
    }

    async fn location(
        &self,
        _story_id: &str,
        _name: &str,
    ) -> Result<Option<LocationContext>, BeatframeError> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Story bible
// ---------------------------------------------------------------------------

/// In-memory lookup over a story bible.
pub struct BibleContextLookup {
    bible: StoryBible,
}

impl BibleContextLookup {
    pub fn new(bible: StoryBible) -> Self {
        Self { bible }
    }

    fn serves(&self, story_id: &str) -> bool {
        self.bible.story_id.is_empty() || story_id.is_empty() || self.bible.story_id == story_id
    }
}

/// Find the best entry for `query`: exact name/alias, then substring, then fuzzy.
fn best_match<'a, T>(
    items: &'a [T],
    names: impl Fn(&'a T) -> Vec<&'a str>,
    query: &str,
) -> Option<&'a T> {
    use rapidfuzz::distance::levenshtein;

    let query = normalize_name(query);
    if query.is_empty() {
        return None;
    }

    let candidates: Vec<(&T, Vec<String>)> = items
        .iter()
        .map(|item| (item, names(item).into_iter().map(normalize_name).collect()))
        .collect();

    if let Some((item, _)) = candidates
        .iter()
        .find(|(_, names)| names.iter().any(|n| *n == query))
    {
        return Some(*item);
    }

    if query.len() >= 3 {
        if let Some((item, _)) = candidates.iter().find(|(_, names)| {
            names
                .iter()
                .any(|n| n.len() >= 3 && (n.contains(&query) || query.contains(n.as_str())))
        }) {
            return Some(*item);
        }
    }

    candidates
        .iter()
        .filter_map(|(item, names)| {
            names
                .iter()
                .map(|n| levenshtein::normalized_similarity(query.chars(), n.chars()))
                .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
                .filter(|s| *s >= FUZZY_THRESHOLD)
                .map(|s| (*item, s))
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(item, _)| item)
}

#[async_trait]
impl ContextLookup for BibleContextLookup {
    async fn character(
        &self,
        story_id: &str,
        name: &str,
        location: &str,
    ) -> Result<Option<CharacterContext>, BeatframeError> {
        if !self.serves(story_id) {
            return Ok(None);
        }
        Ok(best_match(
            &self.bible.characters,
            |c| {
                std::iter::once(c.name.as_str())
                    .chain(c.aliases.iter().map(String::as_str))
                    .collect()
            },
            name,
        )
        .map(|profile| profile.resolve(location)))
    }

    async fn location(
        &self,
        story_id: &str,
        name: &str,
    ) -> Result<Option<LocationContext>, BeatframeError> {
        if !self.serves(story_id) {
            return Ok(None);
        }
        Ok(best_match(
            &self.bible.locations,
            |l| {
                std::iter::once(l.name.as_str())
                    .chain(l.shorthand.as_deref())
                    .chain(l.aliases.iter().map(String::as_str))
                    .collect()
            },
            name,
        )
        .map(|profile| profile.resolve()))
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Memoizing wrapper around any lookup.
///
/// An explicit object owned by whoever runs the pipeline; `clear()` between
/// runs drops everything. Misses are cached too, errors are not.
pub struct CachedContextLookup {
    inner: Arc<dyn ContextLookup>,
    characters: Cache<String, Option<CharacterContext>>,
    locations: Cache<String, Option<LocationContext>>,
}

impl CachedContextLookup {
    pub fn new(inner: Arc<dyn ContextLookup>, capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            characters: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            locations: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn from_config(inner: Arc<dyn ContextLookup>, config: &PipelineConfig) -> Self {
        Self::new(
            inner,
            config.lookup_cache_capacity,
            Duration::from_secs(config.lookup_cache_ttl_secs),
        )
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.characters.invalidate_all();
        self.locations.invalidate_all();
    }
}

#[async_trait]
impl ContextLookup for CachedContextLookup {
    async fn character(
        &self,
        story_id: &str,
        name: &str,
        location: &str,
    ) -> Result<Option<CharacterContext>, BeatframeError> {
        let key = format!(
            "{}:{}@{}",
            story_id,
            normalize_name(name),
            normalize_name(location)
        );
        if let Some(cached) = self.characters.get(&key).await {
            return Ok(cached);
        }
        let found = self.inner.character(story_id, name, location).await?;
        self.characters.insert(key, found.clone()).await;
        Ok(found)
    }

    async fn location(
        &self,
        story_id: &str,
        name: &str,
    ) -> Result<Option<LocationContext>, BeatframeError> {
        let key = format!("{}:{}", story_id, normalize_name(name));
        if let Some(cached) = self.locations.get(&key).await {
            return Ok(cached);
        }
        let found = self.inner.location(story_id, name).await?;
        self.locations.insert(key, found.clone()).await;
        Ok(found)
    }
}
