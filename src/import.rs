use std::path::PathBuf;

use thiserror::Error;
use url::Url;

pub const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "m4v"];
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "heic"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
  #[error("the dropped item wasn't a valid file URL: {0}")]
  NonFileUrl(String),
  #[error("invalid file format, supported formats: {}", .accepted.join(", "))]
  InvalidExtension { accepted: Vec<String> },
}

/// Checks a dropped or imported item before it reaches the catalog.
pub fn validate_import(uri: &str, allowed_extensions: &[&str]) -> Result<PathBuf, ImportError> {
  let path = Url::parse(uri.trim())
    .ok()
    .filter(|url| url.scheme() == "file")
    .and_then(|url| url.to_file_path().ok())
    .ok_or_else(|| ImportError::NonFileUrl(uri.to_string()))?;

  let extension = path
    .extension()
    .map(|ext| ext.to_string_lossy().to_lowercase())
    .unwrap_or_default();
  if !allowed_extensions
    .iter()
    .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
  {
    return Err(ImportError::InvalidExtension {
      accepted: allowed_extensions.iter().map(|ext| ext.to_string()).collect(),
    });
  }

  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_allowed_extensions_in_any_case() {
    let path = validate_import("file:///Users/me/Movies/Beach.MOV", VIDEO_EXTENSIONS).unwrap();
    assert_eq!(path, PathBuf::from("/Users/me/Movies/Beach.MOV"));
  }

  #[test]
  fn rejects_remote_urls() {
    assert_eq!(
      validate_import("https://example.invalid/clip.mov", VIDEO_EXTENSIONS),
      Err(ImportError::NonFileUrl("https://example.invalid/clip.mov".to_string()))
    );
  }

  #[test]
  fn rejects_other_extensions() {
    let err = validate_import("file:///tmp/notes.txt", VIDEO_EXTENSIONS).unwrap_err();
    assert_eq!(err.to_string(), "invalid file format, supported formats: mov, mp4, m4v");
  }
}
