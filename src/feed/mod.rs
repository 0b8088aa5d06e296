//! Episode discovery and RSS output.
//!
//! - [`metadata`] - embedded tag extraction with graceful fallback
//! - [`scanner`] - audio directory walk producing ordered episodes
//! - [`render`] - RSS 2.0 / iTunes XML generation
//!
//! # Example
//!
//! ```ignore
//! use chopchoprss::feed::{render_podcast, scan};
//!
//! let report = scan(Path::new("/srv/show"), "https://pods.example.com/show")?;
//! let xml = render_podcast(&podcast)?;
//! ```

mod metadata;
mod render;
mod scanner;

pub use metadata::{AudioMetadata, MetadataExtractor, SymphoniaExtractor, TagReader};
pub use render::{
    episode_description, render_feed, render_podcast, RenderError, CONTENT_NS,
    IMAGE_ENCLOSURE_TYPE, ITUNES_NS,
};
pub use scanner::{
    mime_type_for, resolve_audio_dir, scan, scan_with, ScanError, ScanReport, SkippedFile,
    SUPPORTED_AUDIO,
};
