use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Catalog errors with user-facing messages.
///
/// All of these are recoverable at the command or request boundary; none
/// leaves the catalog partially modified.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Feed '{0}' does not exist")]
    FeedNotFound(String),

    #[error("Podcast '{0}' does not exist")]
    PodcastNotFound(String),

    #[error("Feed '{0}' already exists")]
    FeedExists(String),

    #[error("Podcast '{0}' already exists")]
    PodcastExists(String),

    /// Positional index outside `[0, len-1]`. Negative indices are not accepted.
    #[error("{}", entry_range_message(*index, *len))]
    EntryOutOfRange { index: usize, len: usize },
}

fn entry_range_message(index: usize, len: usize) -> String {
    if len == 0 {
        format!("Invalid entry index {index}: feed has no entries")
    } else {
        format!(
            "Invalid entry index {index}: valid range is 0-{}",
            len - 1
        )
    }
}

// ============================================================================
// Feeds
// ============================================================================

/// A named collection of syndicated text/link items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub email: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// A single feed entry. Immutable once added; only removed by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub link: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Caller-supplied fields for a new feed.
#[derive(Debug, Clone, Default)]
pub struct NewFeed {
    pub title: String,
    pub description: String,
    pub link: String,
    pub author: String,
    pub email: String,
}

/// Caller-supplied fields for a new feed entry.
///
/// The entry's description mirrors its content, as the command line only
/// accepts a single body.
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub title: String,
    pub content: String,
    pub link: String,
    pub image_url: Option<String>,
}

impl Feed {
    pub fn new(fields: NewFeed, now: DateTime<Utc>) -> Self {
        Self {
            title: fields.title,
            description: fields.description,
            link: fields.link,
            author: fields.author,
            email: fields.email,
            created: now,
            updated: now,
            items: Vec::new(),
        }
    }
}

impl Item {
    pub fn new(fields: NewItem, now: DateTime<Utc>) -> Self {
        Self {
            title: fields.title,
            description: fields.content.clone(),
            content: fields.content,
            link: fields.link,
            created: now,
            updated: now,
            image_url: fields.image_url.filter(|url| !url.is_empty()),
        }
    }
}

// ============================================================================
// Podcasts
// ============================================================================

/// A feed whose episodes are derived from an audio directory.
///
/// `audio_dir` and `base_url` are fixed for the lifetime of the podcast and
/// together define how local files map to public URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Podcast {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default)]
    pub explicit: bool,
    pub base_url: String,
    pub audio_dir: PathBuf,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

fn default_language() -> String {
    "en".to_string()
}

/// Caller-supplied fields for a new podcast.
#[derive(Debug, Clone)]
pub struct NewPodcast {
    pub title: String,
    pub description: String,
    pub link: String,
    pub author: String,
    pub email: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub language: String,
    pub copyright: Option<String>,
    pub explicit: bool,
    pub base_url: String,
    pub audio_dir: PathBuf,
}

impl Default for NewPodcast {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            link: String::new(),
            author: String::new(),
            email: String::new(),
            image_url: None,
            category: None,
            language: default_language(),
            copyright: None,
            explicit: false,
            base_url: String::new(),
            audio_dir: PathBuf::new(),
        }
    }
}

impl Podcast {
    pub fn new(fields: NewPodcast, episodes: Vec<Episode>, now: DateTime<Utc>) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        let language = if fields.language.is_empty() {
            default_language()
        } else {
            fields.language
        };

        Self {
            title: fields.title,
            description: fields.description,
            link: fields.link,
            author: fields.author,
            email: fields.email,
            image_url: non_empty(fields.image_url),
            category: non_empty(fields.category),
            language,
            copyright: non_empty(fields.copyright),
            explicit: fields.explicit,
            base_url: fields.base_url,
            audio_dir: fields.audio_dir,
            created: now,
            updated: now,
            episodes,
        }
    }
}

/// One audio file, derived entirely from a directory scan.
///
/// Episodes are never edited by hand. A rescan replaces the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub audio_url: String,
    pub file_path: PathBuf,
    /// Playback length in whole seconds, when the container reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    pub file_size: u64,
    pub mime_type: String,
    pub published: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
}
