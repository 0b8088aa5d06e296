use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::{CatalogError, Episode, Feed, Item, NewFeed, NewItem, NewPodcast, Podcast};

// ============================================================================
// Catalog
// ============================================================================

/// Named feeds and podcasts.
///
/// The two key spaces are independent. Nothing stops a name from being used
/// for both a feed and a podcast; the server resolves such a collision in
/// favour of the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub feeds: BTreeMap<String, Feed>,
    #[serde(default)]
    pub podcasts: BTreeMap<String, Podcast>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Create a feed under `name`. Fails without touching the catalog if the
    /// name is taken.
    pub fn create_feed(&mut self, name: &str, fields: NewFeed) -> Result<&Feed, CatalogError> {
        if self.feeds.contains_key(name) {
            return Err(CatalogError::FeedExists(name.to_string()));
        }
        let feed = Feed::new(fields, Utc::now());
        Ok(self.feeds.entry(name.to_string()).or_insert(feed))
    }

    pub fn feed(&self, name: &str) -> Result<&Feed, CatalogError> {
        self.feeds
            .get(name)
            .ok_or_else(|| CatalogError::FeedNotFound(name.to_string()))
    }

    /// All feeds, ordered by name.
    pub fn feeds(&self) -> impl Iterator<Item = (&str, &Feed)> {
        self.feeds.iter().map(|(name, feed)| (name.as_str(), feed))
    }

    /// Append an entry and bump the feed's `updated` timestamp.
    pub fn add_item(&mut self, feed_name: &str, fields: NewItem) -> Result<&Item, CatalogError> {
        let feed = self
            .feeds
            .get_mut(feed_name)
            .ok_or_else(|| CatalogError::FeedNotFound(feed_name.to_string()))?;

        let now = Utc::now();
        feed.items.push(Item::new(fields, now));
        feed.updated = now;

        // Just pushed, so the vector is non-empty.
        Ok(&feed.items[feed.items.len() - 1])
    }

    /// Remove the entry at `index`, preserving the order of the rest.
    ///
    /// An out-of-range index leaves both the items and `updated` untouched.
    pub fn delete_item(&mut self, feed_name: &str, index: usize) -> Result<Item, CatalogError> {
        let feed = self
            .feeds
            .get_mut(feed_name)
            .ok_or_else(|| CatalogError::FeedNotFound(feed_name.to_string()))?;

        if index >= feed.items.len() {
            return Err(CatalogError::EntryOutOfRange {
                index,
                len: feed.items.len(),
            });
        }

        let removed = feed.items.remove(index);
        feed.updated = Utc::now();
        Ok(removed)
    }

    pub fn delete_feed(&mut self, name: &str) -> Result<Feed, CatalogError> {
        self.feeds
            .remove(name)
            .ok_or_else(|| CatalogError::FeedNotFound(name.to_string()))
    }

    // ========================================================================
    // Podcast Operations
    // ========================================================================

    /// Register a podcast with an already-scanned episode list.
    ///
    /// Scanning happens before this call so a failed scan never leaves a
    /// half-created podcast behind.
    pub fn create_podcast(
        &mut self,
        name: &str,
        fields: NewPodcast,
        episodes: Vec<Episode>,
    ) -> Result<&Podcast, CatalogError> {
        if self.podcasts.contains_key(name) {
            return Err(CatalogError::PodcastExists(name.to_string()));
        }
        let podcast = Podcast::new(fields, episodes, Utc::now());
        Ok(self.podcasts.entry(name.to_string()).or_insert(podcast))
    }

    pub fn podcast(&self, name: &str) -> Result<&Podcast, CatalogError> {
        self.podcasts
            .get(name)
            .ok_or_else(|| CatalogError::PodcastNotFound(name.to_string()))
    }

    /// All podcasts, ordered by name.
    pub fn podcasts(&self) -> impl Iterator<Item = (&str, &Podcast)> {
        self.podcasts
            .iter()
            .map(|(name, podcast)| (name.as_str(), podcast))
    }

    /// Swap in a freshly scanned episode set. Episodes are never merged.
    pub fn replace_episodes(
        &mut self,
        name: &str,
        episodes: Vec<Episode>,
    ) -> Result<&Podcast, CatalogError> {
        let podcast = self
            .podcasts
            .get_mut(name)
            .ok_or_else(|| CatalogError::PodcastNotFound(name.to_string()))?;

        podcast.episodes = episodes;
        podcast.updated = Utc::now();
        Ok(podcast)
    }

    pub fn delete_podcast(&mut self, name: &str) -> Result<Podcast, CatalogError> {
        self.podcasts
            .remove(name)
            .ok_or_else(|| CatalogError::PodcastNotFound(name.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
