use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::import::ImportError;
use crate::thumbnail::ThumbnailError;

#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("io error at {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("manifest could not be decoded: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("manifest could not be encoded: {0}")]
  Encode(#[source] serde_json::Error),
  #[error("failed to copy media for asset {asset_id} from {}: {source}", .path.display())]
  Copy {
    asset_id: Uuid,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("no place for a new asset: {0}")]
  InvalidStructure(String),
  #[error(transparent)]
  Thumbnail(#[from] ThumbnailError),
  #[error("manifest has not been loaded")]
  NotLoaded,
  #[error("asset not found: {0}")]
  UnknownAsset(Uuid),
  #[error(transparent)]
  Import(#[from] ImportError),
  #[error("record store error: {0}")]
  RecordStore(String),
}

impl CatalogError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    CatalogError::Io {
      path: path.into(),
      source,
    }
  }
}

impl From<rusqlite::Error> for CatalogError {
  fn from(error: rusqlite::Error) -> Self {
    CatalogError::RecordStore(error.to_string())
  }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn encode_and_decode_failures_read_differently() {
    let json_error = || serde_json::from_str::<u8>("x").unwrap_err();
    assert!(CatalogError::Parse(json_error())
      .to_string()
      .starts_with("manifest could not be decoded"));
    assert!(CatalogError::Encode(json_error())
      .to_string()
      .starts_with("manifest could not be encoded"));
  }
}
