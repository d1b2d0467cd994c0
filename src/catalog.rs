use std::collections::HashSet;
use std::fs;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::config::CatalogPaths;
use crate::error::{CatalogError, Result};
use crate::media::{MediaKind, MediaStore};
use crate::model::{is_custom_category, AssetRecord, CategoryRecord, ManifestDocument};
use crate::projection::{filtered, merge_filtered};

/// Store handle for callers that share the catalog between threads. All
/// mutation goes through the lock.
pub type SharedCatalog = Arc<Mutex<CatalogStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEvent {
  Loaded,
  Saved,
  CategoriesChanged,
  AssetsChanged,
}

pub struct CatalogStore {
  paths: CatalogPaths,
  media: MediaStore,
  document: Option<ManifestDocument>,
  subscribers: Vec<Sender<CatalogEvent>>,
}

impl CatalogStore {
  pub fn new(paths: CatalogPaths) -> Self {
    CatalogStore {
      media: MediaStore::from_paths(&paths),
      paths,
      document: None,
      subscribers: Vec::new(),
    }
  }

  pub fn shared(self) -> SharedCatalog {
    Arc::new(Mutex::new(self))
  }

  pub fn paths(&self) -> &CatalogPaths {
    &self.paths
  }

  pub fn media(&self) -> &MediaStore {
    &self.media
  }

  pub fn is_loaded(&self) -> bool {
    self.document.is_some()
  }

  pub fn subscribe(&mut self) -> Receiver<CatalogEvent> {
    let (tx, rx) = mpsc::channel();
    self.subscribers.push(tx);
    rx
  }

  fn notify(&mut self, event: CatalogEvent) {
    self.subscribers.retain(|tx| tx.send(event).is_ok());
  }

  /// Reads and decodes the manifest. The in-memory document is only replaced
  /// once decoding succeeded.
  pub fn load(&mut self) -> Result<&ManifestDocument> {
    let path = &self.paths.manifest_path;
    let data = fs::read(path).map_err(|e| CatalogError::io(path, e))?;
    let document: ManifestDocument = serde_json::from_slice(&data)?;

    for (asset_id, category_id) in document.dangling_category_refs() {
      log::warn!("asset {asset_id} references unknown category {category_id}");
    }
    log::info!(
      "loaded manifest {} ({} categories, {} assets)",
      path.display(),
      document.categories.len(),
      document.assets.len()
    );

    self.document = Some(document);
    self.notify(CatalogEvent::Loaded);
    self.document()
  }

  pub fn document(&self) -> Result<&ManifestDocument> {
    self.document.as_ref().ok_or(CatalogError::NotLoaded)
  }

  fn document_mut(&mut self) -> Result<&mut ManifestDocument> {
    self.document.as_mut().ok_or(CatalogError::NotLoaded)
  }

  pub fn categories(&self) -> Result<&[CategoryRecord]> {
    Ok(&self.document()?.categories)
  }

  pub fn assets(&self) -> Result<&[AssetRecord]> {
    Ok(&self.document()?.assets)
  }

  pub fn asset(&self, asset_id: Uuid) -> Result<&AssetRecord> {
    self
      .assets()?
      .iter()
      .find(|asset| asset.id == asset_id)
      .ok_or(CatalogError::UnknownAsset(asset_id))
  }

  pub fn filtered_categories(&self) -> Result<Vec<CategoryRecord>> {
    Ok(filtered(self.categories()?, is_custom_category))
  }

  pub fn set_filtered_categories(&mut self, values: Vec<CategoryRecord>) -> Result<()> {
    let document = self.document_mut()?;
    if merge_filtered(&mut document.categories, is_custom_category, values) {
      self.notify(CatalogEvent::CategoriesChanged);
    }
    Ok(())
  }

  fn custom_category_ids(&self) -> Result<HashSet<Uuid>> {
    Ok(
      self
        .categories()?
        .iter()
        .filter(|category| is_custom_category(category))
        .map(|category| category.id)
        .collect(),
    )
  }

  pub fn filtered_assets(&self) -> Result<Vec<AssetRecord>> {
    let custom = self.custom_category_ids()?;
    Ok(filtered(self.assets()?, |asset: &AssetRecord| {
      custom.iter().any(|id| asset.belongs_to(*id))
    }))
  }

  pub fn set_filtered_assets(&mut self, values: Vec<AssetRecord>) -> Result<()> {
    let custom = self.custom_category_ids()?;
    let document = self.document_mut()?;
    let changed = merge_filtered(
      &mut document.assets,
      |asset: &AssetRecord| custom.iter().any(|id| asset.belongs_to(*id)),
      values,
    );
    if changed {
      self.notify(CatalogEvent::AssetsChanged);
    }
    Ok(())
  }

  /// Writes the whole manifest, then refreshes the media cache for every
  /// filtered asset in order. The first failed copy stops the refresh; files
  /// already copied stay in place.
  pub fn save(&mut self) -> Result<()> {
    let document = self.document()?;
    let data = serde_json::to_vec(document).map_err(CatalogError::Encode)?;
    let path = &self.paths.manifest_path;
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
    }
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &data).map_err(|e| CatalogError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| CatalogError::io(path, e))?;

    let assets = self.filtered_assets()?;
    let mut copied = 0;
    for asset in &assets {
      if self
        .media
        .cache_file(MediaKind::Thumbnail, asset.id, &asset.preview_image_path)?
        .is_some()
      {
        copied += 1;
      }
      if self
        .media
        .cache_file(MediaKind::Video, asset.id, &asset.video_path)?
        .is_some()
      {
        copied += 1;
      }
    }

    log::info!(
      "saved manifest {} ({} bytes, {} cached files for {} custom assets)",
      path.display(),
      data.len(),
      copied,
      assets.len()
    );
    self.notify(CatalogEvent::Saved);
    Ok(())
  }
}
