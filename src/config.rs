use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};

pub const AERIALS_ROOT_ENV: &str = "VIDEOPAPER_AERIALS_ROOT";
const AERIALS_RELATIVE: &str = "Library/Application Support/com.apple.wallpaper/aerials";
const MANIFEST_FILE: &str = "entries.json";
const RECORD_STORE_FILE: &str = "videopaper.db";

/// Where `entries.json` lives under the aerials root. Older systems kept it
/// directly in the root; newer ones moved it into `manifest/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestLayout {
  Current,
  Legacy,
}

impl ManifestLayout {
  fn manifest_path(self, root: &Path) -> PathBuf {
    match self {
      ManifestLayout::Current => root.join("manifest").join(MANIFEST_FILE),
      ManifestLayout::Legacy => root.join(MANIFEST_FILE),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPaths {
  pub aerials_root: PathBuf,
  pub layout: ManifestLayout,
  pub manifest_path: PathBuf,
  pub thumbnails_dir: PathBuf,
  pub videos_dir: PathBuf,
  pub record_store_path: PathBuf,
}

impl CatalogPaths {
  pub fn for_root(root: impl Into<PathBuf>, layout: ManifestLayout) -> Self {
    let aerials_root = root.into();
    CatalogPaths {
      manifest_path: layout.manifest_path(&aerials_root),
      thumbnails_dir: aerials_root.join("thumbnails"),
      videos_dir: aerials_root.join("videos"),
      record_store_path: aerials_root.join(RECORD_STORE_FILE),
      layout,
      aerials_root,
    }
  }

  pub fn platform(layout: ManifestLayout) -> Option<Self> {
    platform_aerials_root().map(|root| Self::for_root(root, layout))
  }

  /// Picks the current layout unless only the legacy manifest exists on disk.
  pub fn detect() -> Option<Self> {
    let root = platform_aerials_root()?;
    let current = ManifestLayout::Current.manifest_path(&root);
    let legacy = ManifestLayout::Legacy.manifest_path(&root);
    let layout = if !current.exists() && legacy.exists() {
      log::info!("using legacy manifest location {}", legacy.display());
      ManifestLayout::Legacy
    } else {
      ManifestLayout::Current
    };
    Some(Self::for_root(root, layout))
  }

  pub fn ensure_dirs(&self) -> Result<()> {
    for dir in [&self.thumbnails_dir, &self.videos_dir] {
      fs::create_dir_all(dir).map_err(|e| CatalogError::io(dir, e))?;
    }
    Ok(())
  }
}

fn platform_aerials_root() -> Option<PathBuf> {
  if let Ok(root) = std::env::var(AERIALS_ROOT_ENV) {
    if !root.trim().is_empty() {
      return Some(PathBuf::from(root));
    }
  }

  match dirs::home_dir() {
    Some(home) => Some(home.join(AERIALS_RELATIVE)),
    None => {
      log::warn!("could not resolve the home directory");
      None
    }
  }
}
