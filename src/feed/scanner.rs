use chrono::{DateTime, Utc};
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use super::metadata::{AudioMetadata, MetadataExtractor, SymphoniaExtractor, TagReader};
use crate::catalog::Episode;
use crate::util::{audio_url, UrlError};

/// Audio extensions accepted by the scanner and the MIME type announced for
/// each in enclosures. Matching is case-insensitive.
pub const SUPPORTED_AUDIO: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("wav", "audio/wav"),
    ("flac", "audio/flac"),
    ("ogg", "audio/ogg"),
];

/// MIME type for a supported audio file, `None` for anything else.
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    SUPPORTED_AUDIO
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Audio directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Audio path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to read audio directory {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] UrlError),
}

/// A file the scan passed over, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a full directory scan.
///
/// `episodes` is sorted oldest first. `skipped` collects per-file failures
/// that did not abort the scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub episodes: Vec<Episode>,
    pub skipped: Vec<SkippedFile>,
}

/// The directory a podcast is stored and scanned under: canonical when it
/// exists, unchanged otherwise so the scan can report it as missing.
pub fn resolve_audio_dir(audio_dir: &Path) -> PathBuf {
    audio_dir
        .canonicalize()
        .unwrap_or_else(|_| audio_dir.to_path_buf())
}

/// Scan `audio_dir` for episodes published under `base_url`.
pub fn scan(audio_dir: &Path, base_url: &str) -> Result<ScanReport, ScanError> {
    scan_with(&SymphoniaExtractor, audio_dir, base_url)
}

/// Scan with a caller-chosen tag extractor.
///
/// Only a missing or unreadable root directory fails the scan. Unreadable
/// files and subdirectories are logged, recorded in
/// [`ScanReport::skipped`], and passed over.
pub fn scan_with(
    extractor: &dyn MetadataExtractor,
    audio_dir: &Path,
    base_url: &str,
) -> Result<ScanReport, ScanError> {
    let root_meta = std::fs::metadata(audio_dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScanError::DirectoryNotFound(audio_dir.to_path_buf()),
        _ => ScanError::Walk {
            path: audio_dir.to_path_buf(),
            source: e,
        },
    })?;
    if !root_meta.is_dir() {
        return Err(ScanError::NotADirectory(audio_dir.to_path_buf()));
    }

    // Fail on a bad base URL before touching any files.
    audio_url(base_url, &[])?;

    let entries = std::fs::read_dir(audio_dir).map_err(|e| ScanError::Walk {
        path: audio_dir.to_path_buf(),
        source: e,
    })?;

    let mut report = ScanReport::default();
    let mut found: Vec<(PathBuf, Episode)> = Vec::new();
    walk_entries(entries, audio_dir, base_url, extractor, &mut found, &mut report.skipped);

    // Oldest first. Ties fall back to the relative path so repeated scans of
    // the same tree agree.
    found.sort_by(|(a_rel, a), (b_rel, b)| {
        a.published.cmp(&b.published).then_with(|| a_rel.cmp(b_rel))
    });
    report.episodes = found.into_iter().map(|(_, episode)| episode).collect();

    tracing::info!(
        dir = %audio_dir.display(),
        episodes = report.episodes.len(),
        skipped = report.skipped.len(),
        "Scanned audio directory"
    );
    Ok(report)
}

fn walk_entries(
    entries: std::fs::ReadDir,
    root: &Path,
    base_url: &str,
    extractor: &dyn MetadataExtractor,
    found: &mut Vec<(PathBuf, Episode)>,
    skipped: &mut Vec<SkippedFile>,
) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %root.display(), error = %e, "Skipping unreadable directory entry");
                skipped.push(SkippedFile {
                    path: root.to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let path = entry.path();

        // file_type() does not follow symlinks, so linked directories are
        // never descended into.
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => match std::fs::read_dir(&path) {
                Ok(children) => walk_entries(children, root, base_url, extractor, found, skipped),
                Err(e) => skip(skipped, &path, e.to_string()),
            },
            Ok(_) => {
                let Some(mime_type) = mime_type_for(&path) else {
                    continue;
                };
                match build_episode(extractor, root, &path, base_url, mime_type) {
                    Ok(built) => found.push(built),
                    Err(reason) => skip(skipped, &path, reason),
                }
            }
            Err(e) => skip(skipped, &path, e.to_string()),
        }
    }
}

fn skip(skipped: &mut Vec<SkippedFile>, path: &Path, reason: String) {
    tracing::warn!(path = %path.display(), reason = %reason, "Skipping audio file");
    skipped.push(SkippedFile {
        path: path.to_path_buf(),
        reason,
    });
}

fn build_episode(
    extractor: &dyn MetadataExtractor,
    root: &Path,
    path: &Path,
    base_url: &str,
    mime_type: &str,
) -> Result<(PathBuf, Episode), String> {
    let file = File::open(path).map_err(|e| format!("cannot open: {e}"))?;
    let stat = file.metadata().map_err(|e| format!("cannot stat: {e}"))?;
    if !stat.is_file() {
        return Err("not a regular file".to_string());
    }
    let modified = stat
        .modified()
        .map_err(|e| format!("no modification time: {e}"))?;

    let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let segments = url_segments(&relative);
    let url = audio_url(base_url, &segments).map_err(|e| e.to_string())?;

    let meta = extractor.extract(file, path);

    let episode = Episode {
        title: episode_title(&meta, path),
        description: episode_description(&meta),
        audio_url: url,
        file_path: path.to_path_buf(),
        duration: meta.duration.map(|d| d.as_secs()),
        file_size: stat.len(),
        mime_type: mime_type.to_string(),
        published: DateTime::<Utc>::from(modified),
        image_url: None,
        season: meta.disc(),
        episode: meta.track(),
    };
    Ok((relative, episode))
}

/// Relative path components as URL path segments, whatever the platform's
/// separator.
fn url_segments(relative: &Path) -> Vec<String> {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn episode_title(meta: &AudioMetadata, path: &Path) -> String {
    match meta.title() {
        Some(title) => title.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

fn episode_description(meta: &AudioMetadata) -> String {
    match (meta.album(), meta.comment()) {
        (Some(album), Some(comment)) => format!("{album} - {comment}"),
        (Some(album), None) => album.to_string(),
        (None, Some(comment)) => comment.to_string(),
        (None, None) => String::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================
