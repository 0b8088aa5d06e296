use std::io::Write;
use std::path::Path;
use thiserror::Error;

use super::store::Catalog;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to access catalog file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed catalog file '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Load the catalog from `path`.
///
/// - Missing file → empty catalog, written out immediately
/// - Empty file → empty catalog
/// - Invalid JSON → `Err(PersistError::Json)`
pub fn load(path: &Path) -> Result<Catalog, PersistError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No catalog file found, creating an empty one");
            let catalog = Catalog::new();
            save(&catalog, path)?;
            return Ok(catalog);
        }
        Err(e) => return Err(PersistError::io(path, e)),
    };

    if content.trim().is_empty() {
        tracing::debug!(path = %path.display(), "Catalog file is empty, starting fresh");
        return Ok(Catalog::new());
    }

    let catalog: Catalog =
        serde_json::from_str(&content).map_err(|e| PersistError::json(path, e))?;
    tracing::debug!(
        path = %path.display(),
        feeds = catalog.feeds.len(),
        podcasts = catalog.podcasts.len(),
        "Loaded catalog"
    );
    Ok(catalog)
}

/// Write the catalog to `path` atomically.
///
/// The JSON goes to a randomized sibling temp file, is synced to disk, then
/// renamed over the destination so readers never observe a partial file.
pub fn save(catalog: &Catalog, path: &Path) -> Result<(), PersistError> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let content = serde_json::to_vec_pretty(catalog).map_err(|e| PersistError::json(path, e))?;

    // Unpredictable temp name, opened with create_new
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| PersistError::io(&temp_path, e))?;

    let written = file
        .write_all(&content)
        .and_then(|()| file.sync_all());
    drop(file);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(PersistError::io(&temp_path, e));
    }

    // On Windows, rename fails if destination exists, so remove it first
    #[cfg(windows)]
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(PersistError::io(path, e));
        }
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(PersistError::io(path, e));
    }

    tracing::debug!(path = %path.display(), "Saved catalog");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
