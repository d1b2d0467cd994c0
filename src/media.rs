use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use url::Url;
use uuid::Uuid;

use crate::config::CatalogPaths;
use crate::error::{CatalogError, Result};
use crate::model::uuid_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
  Thumbnail,
  Video,
}

/// Resolves a manifest path string to a local file. Anything that is not a
/// parseable `file:` URI yields `None`.
pub fn file_path_from_uri(uri: &str) -> Option<PathBuf> {
  let url = Url::parse(uri.trim()).ok()?;
  if url.scheme() != "file" {
    return None;
  }
  url.to_file_path().ok()
}

pub fn file_uri(path: &Path) -> Option<String> {
  Url::from_file_path(path).ok().map(String::from)
}

/// Human readable title from a file path or URI: no extension, `%20` and `_`
/// turned into spaces, trimmed.
pub fn readable_file_name(value: &str) -> Option<String> {
  let path = file_path_from_uri(value).unwrap_or_else(|| PathBuf::from(value));
  let stem = path.file_stem()?.to_string_lossy().to_string();
  let cleaned = stem
    .replace("%20", " ")
    .replace('_', " ")
    .trim()
    .to_string();
  if cleaned.is_empty() {
    None
  } else {
    Some(cleaned)
  }
}

fn remove_best_effort(path: &Path) {
  match fs::remove_file(path) {
    Ok(()) => log::debug!("removed cached file {}", path.display()),
    Err(e) if e.kind() == ErrorKind::NotFound => {}
    Err(e) => log::warn!("could not remove {}: {}", path.display(), e),
  }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
  thumbnails_dir: PathBuf,
  videos_dir: PathBuf,
}

impl MediaStore {
  pub fn new(thumbnails_dir: impl Into<PathBuf>, videos_dir: impl Into<PathBuf>) -> Self {
    MediaStore {
      thumbnails_dir: thumbnails_dir.into(),
      videos_dir: videos_dir.into(),
    }
  }

  pub fn from_paths(paths: &CatalogPaths) -> Self {
    Self::new(&paths.thumbnails_dir, &paths.videos_dir)
  }

  pub fn dir(&self, kind: MediaKind) -> &Path {
    match kind {
      MediaKind::Thumbnail => &self.thumbnails_dir,
      MediaKind::Video => &self.videos_dir,
    }
  }

  /// `<dir>/<ASSET-ID>.<extension>`, or no extension when the source has none.
  pub fn destination(&self, kind: MediaKind, asset_id: Uuid, extension: Option<&str>) -> PathBuf {
    let mut name = uuid_key(asset_id);
    if let Some(ext) = extension.filter(|ext| !ext.is_empty()) {
      name.push('.');
      name.push_str(ext);
    }
    self.dir(kind).join(name)
  }

  /// Recopies `source_uri` into the cache, replacing any cached file of this
  /// kind for the asset. Returns `Ok(None)` when the source is not a usable
  /// file URI.
  pub fn cache_file(&self, kind: MediaKind, asset_id: Uuid, source_uri: &str) -> Result<Option<PathBuf>> {
    let Some(source) = file_path_from_uri(source_uri) else {
      return Ok(None);
    };
    let extension = source.extension().map(|ext| ext.to_string_lossy().to_string());
    let destination = self.destination(kind, asset_id, extension.as_deref());

    if same_file(&source, &destination) {
      return Ok(Some(destination));
    }

    let dir = self.dir(kind);
    fs::create_dir_all(dir).map_err(|e| CatalogError::io(dir, e))?;
    for stale in self.cached_files(kind, asset_id) {
      if !same_file(&source, &stale) {
        remove_best_effort(&stale);
      }
    }
    fs::copy(&source, &destination).map_err(|e| CatalogError::Copy {
      asset_id,
      path: source.clone(),
      source: e,
    })?;
    log::debug!("cached {} -> {}", source.display(), destination.display());
    Ok(Some(destination))
  }

  pub fn write_file(&self, kind: MediaKind, asset_id: Uuid, extension: Option<&str>, bytes: &[u8]) -> Result<PathBuf> {
    let dir = self.dir(kind);
    fs::create_dir_all(dir).map_err(|e| CatalogError::io(dir, e))?;
    let destination = self.destination(kind, asset_id, extension);
    fs::write(&destination, bytes).map_err(|e| CatalogError::io(&destination, e))?;
    Ok(destination)
  }

  /// Cached files for `asset_id` in one directory, whatever their extension.
  pub fn cached_files(&self, kind: MediaKind, asset_id: Uuid) -> Vec<PathBuf> {
    let wanted = uuid_key(asset_id);
    let Ok(entries) = fs::read_dir(self.dir(kind)) else {
      return Vec::new();
    };

    entries
      .filter_map(|entry| entry.ok())
      .map(|entry| entry.path())
      .filter(|path| {
        path
          .file_stem()
          .map(|stem| stem.to_string_lossy().eq_ignore_ascii_case(&wanted))
          .unwrap_or(false)
      })
      .collect()
  }

  pub fn remove_asset_files(&self, asset_id: Uuid) {
    for kind in [MediaKind::Thumbnail, MediaKind::Video] {
      for path in self.cached_files(kind, asset_id) {
        remove_best_effort(&path);
      }
    }
  }
}

fn same_file(a: &Path, b: &Path) -> bool {
  match (a.canonicalize(), b.canonicalize()) {
    (Ok(a), Ok(b)) => a == b,
    _ => false,
  }
}
