//! Embedded audio tag extraction.
//!
//! Tag reading never fails the caller. A file symphonia cannot probe yields
//! [`AudioMetadata::default()`], and every field then falls back to values
//! derived from the filesystem.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::{MetadataOptions, StandardTagKey, Tag, Value};
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

/// Per-field access to tag metadata.
///
/// Every accessor returns `None` when the tag is missing, empty, or (for the
/// numeric fields) zero, so callers match on presence instead of testing
/// for empty strings.
pub trait TagReader {
    fn title(&self) -> Option<&str>;
    fn comment(&self) -> Option<&str>;
    fn album(&self) -> Option<&str>;
    fn track(&self) -> Option<u32>;
    fn disc(&self) -> Option<u32>;
}

/// Reads tag metadata from an open media file.
///
/// Implementations must not fail. An unreadable file gets the empty result.
pub trait MetadataExtractor {
    fn extract(&self, file: File, path: &Path) -> AudioMetadata;
}

/// Tags and stream facts pulled from one audio file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioMetadata {
    pub title: Option<String>,
    pub comment: Option<String>,
    pub album: Option<String>,
    pub track: Option<u32>,
    pub disc: Option<u32>,
    pub duration: Option<Duration>,
}

impl TagReader for AudioMetadata {
    fn title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    fn comment(&self) -> Option<&str> {
        non_blank(self.comment.as_deref())
    }

    fn album(&self) -> Option<&str> {
        non_blank(self.album.as_deref())
    }

    fn track(&self) -> Option<u32> {
        self.track.filter(|n| *n > 0)
    }

    fn disc(&self) -> Option<u32> {
        self.disc.filter(|n| *n > 0)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Symphonia Extractor
// ============================================================================

/// Probes containers with symphonia and reads their standard tags.
///
/// Covers ID3v2 (mp3), iTunes atoms (m4a), Vorbis comments (flac, ogg) and
/// RIFF INFO chunks (wav).
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaExtractor;

impl MetadataExtractor for SymphoniaExtractor {
    fn extract(&self, file: File, path: &Path) -> AudioMetadata {
        let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let mut probed = match symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        ) {
            Ok(probed) => probed,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "No readable tags");
                return AudioMetadata::default();
            }
        };

        // Tags can live ahead of the container (ID3v2 on mp3) or inside it.
        let mut tags: Vec<Tag> = Vec::new();
        if let Some(metadata) = probed.metadata.get() {
            if let Some(revision) = metadata.current() {
                tags.extend(revision.tags().iter().cloned());
            }
        }
        if let Some(revision) = probed.format.metadata().current() {
            tags.extend(revision.tags().iter().cloned());
        }

        let duration = probed.format.default_track().and_then(|track| {
            duration_from_params(track.codec_params.time_base, track.codec_params.n_frames)
        });

        let mut meta = metadata_from_tags(&tags);
        meta.duration = duration;
        meta
    }
}

/// Fold standard tags into [`AudioMetadata`]. The first non-empty value for
/// each key wins.
pub(crate) fn metadata_from_tags(tags: &[Tag]) -> AudioMetadata {
    let mut meta = AudioMetadata::default();

    for tag in tags {
        match tag.std_key {
            Some(StandardTagKey::TrackTitle) => fill_text(&mut meta.title, &tag.value),
            Some(StandardTagKey::Comment | StandardTagKey::Description) => {
                fill_text(&mut meta.comment, &tag.value)
            }
            Some(StandardTagKey::Album) => fill_text(&mut meta.album, &tag.value),
            Some(StandardTagKey::TrackNumber) => fill_number(&mut meta.track, &tag.value),
            Some(StandardTagKey::DiscNumber) => fill_number(&mut meta.disc, &tag.value),
            _ => {}
        }
    }

    meta
}

fn fill_text(slot: &mut Option<String>, value: &Value) {
    if slot.is_some() {
        return;
    }
    if let Value::String(s) = value {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            *slot = Some(trimmed.to_string());
        }
    }
}

fn fill_number(slot: &mut Option<u32>, value: &Value) {
    if slot.is_some() {
        return;
    }
    *slot = match value {
        Value::UnsignedInt(n) => u32::try_from(*n).ok(),
        Value::SignedInt(n) => u32::try_from(*n).ok(),
        Value::String(s) => leading_number(s),
        _ => None,
    };
}

/// Parse strings like "3" or "3/12" into their leading number.
fn leading_number(s: &str) -> Option<u32> {
    s.split('/').next().and_then(|p| p.trim().parse::<u32>().ok())
}

fn duration_from_params(time_base: Option<TimeBase>, n_frames: Option<u64>) -> Option<Duration> {
    let tb = time_base?;
    let frames = n_frames?;

    // Time is { seconds: u64, frac: f64 } in symphonia 0.5.x.
    let t = tb.calc_time(frames);
    Some(Duration::from_secs(t.seconds) + Duration::from_secs_f64(t.frac))
}

// ============================================================================
// Tests
// ============================================================================
