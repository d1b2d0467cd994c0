#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Map;
use tempfile::TempDir;
use url::Url;
use uuid::Uuid;
use videopaper_catalog::media::file_uri;
use videopaper_catalog::model::uuid_key;
use videopaper_catalog::{
  AssetRecord, CatalogPaths, CatalogStore, CategoryRecord, ManifestDocument, ManifestLayout,
  ThumbnailError, ThumbnailGenerator,
};

pub fn category(name: &str, subcategories: Option<Vec<CategoryRecord>>) -> CategoryRecord {
  CategoryRecord {
    id: Uuid::new_v4(),
    display_name_key: name.to_string(),
    preview_image_path: String::new(),
    description_key: format!("{name}_DESCRIPTION"),
    preferred_order: 0,
    subcategories,
    representative_asset_id: String::new(),
  }
}

pub fn asset(name: &str, category: &CategoryRecord) -> AssetRecord {
  AssetRecord {
    id: Uuid::new_v4(),
    show_in_top_level: true,
    shot_id: name.to_uppercase(),
    display_name_key: name.to_string(),
    accessibility_label: name.to_string(),
    preview_image_path: String::new(),
    preview_image_900x580: None,
    points_of_interest: BTreeMap::new(),
    include_in_shuffle: true,
    video_path: String::new(),
    subcategory_ids: Vec::new(),
    preferred_order: 0,
    category_ids: vec![uuid_key(category.id)],
  }
}

pub fn document(categories: Vec<CategoryRecord>, assets: Vec<AssetRecord>) -> ManifestDocument {
  ManifestDocument {
    schema_version: 1,
    localization_version: "17.0-1".to_string(),
    initial_entry_count: 4,
    categories,
    assets,
    extra: Map::new(),
  }
}

pub fn write_manifest(paths: &CatalogPaths, document: &ManifestDocument) {
  fs::create_dir_all(paths.manifest_path.parent().unwrap()).unwrap();
  fs::write(&paths.manifest_path, serde_json::to_vec(document).unwrap()).unwrap();
}

pub fn loaded_store(document: &ManifestDocument) -> (TempDir, CatalogStore) {
  let dir = tempfile::tempdir().unwrap();
  let paths = CatalogPaths::for_root(dir.path().join("aerials"), ManifestLayout::Current);
  write_manifest(&paths, document);
  let mut store = CatalogStore::new(paths);
  store.load().unwrap();
  (dir, store)
}

/// Writes a source media file outside the cache and returns its file URI.
pub fn source_file(dir: &Path, name: &str, bytes: &[u8]) -> String {
  let sources = dir.join("sources");
  fs::create_dir_all(&sources).unwrap();
  let path = sources.join(name);
  fs::write(&path, bytes).unwrap();
  file_uri(&path).unwrap()
}

pub fn missing_file(dir: &Path, name: &str) -> String {
  file_uri(&dir.join("sources").join(name)).unwrap()
}

pub fn file_names(dir: &Path) -> Vec<String> {
  let mut names: Vec<String> = match fs::read_dir(dir) {
    Ok(entries) => entries
      .filter_map(|entry| entry.ok())
      .map(|entry| entry.file_name().to_string_lossy().to_string())
      .collect(),
    Err(_) => Vec::new(),
  };
  names.sort();
  names
}

pub struct FakeThumbnailer {
  pub output_dir: PathBuf,
}

impl ThumbnailGenerator for FakeThumbnailer {
  fn generate(&self, video: &Url, _offset: Duration) -> Result<Url, ThumbnailError> {
    let video_path = video
      .to_file_path()
      .map_err(|_| ThumbnailError::NonFileUrl(video.to_string()))?;
    fs::create_dir_all(&self.output_dir).unwrap();
    let output = self.output_dir.join(format!("{}.png", Uuid::new_v4()));
    let frame = fs::read(&video_path).map_err(|e| ThumbnailError::Conversion(e.to_string()))?;
    fs::write(&output, frame).unwrap();
    Ok(Url::from_file_path(output).unwrap())
  }

  fn discard(&self, image: &Url) {
    if let Ok(path) = image.to_file_path() {
      if path.parent() == Some(self.output_dir.as_path()) {
        let _ = fs::remove_file(path);
      }
    }
  }
}

pub struct FailingThumbnailer;

impl ThumbnailGenerator for FailingThumbnailer {
  fn generate(&self, _video: &Url, _offset: Duration) -> Result<Url, ThumbnailError> {
    Err(ThumbnailError::Conversion("no frames".to_string()))
  }
}
