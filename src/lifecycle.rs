use std::collections::BTreeMap;
use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::catalog::CatalogStore;
use crate::error::{CatalogError, Result};
use crate::import::{validate_import, ImportError, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::media::{file_uri, readable_file_name};
use crate::model::{uuid_key, AssetRecord};
use crate::thumbnail::ThumbnailGenerator;

pub const DEFAULT_ASSET_NAME: &str = "Untitled Wallpaper";

/// An asset without a video or without a preview image has never been fully
/// ingested.
pub fn is_draft(asset: &AssetRecord) -> bool {
  asset.video_path.trim().is_empty() || asset.preview_image_path.trim().is_empty()
}

/// Creates, fills and removes custom assets. Every change goes through the
/// catalog's filtered projection.
pub struct AssetLifecycle<'a> {
  store: &'a mut CatalogStore,
  thumbnails: &'a dyn ThumbnailGenerator,
}

impl<'a> AssetLifecycle<'a> {
  pub fn new(store: &'a mut CatalogStore, thumbnails: &'a dyn ThumbnailGenerator) -> Self {
    AssetLifecycle { store, thumbnails }
  }

  pub fn store(&self) -> &CatalogStore {
    &*self.store
  }

  /// Adds an empty asset to the last custom category and its last
  /// subcategory.
  pub fn create_blank_asset(&mut self) -> Result<Uuid> {
    let categories = self.store.filtered_categories()?;
    let category = categories.last().ok_or_else(|| {
      CatalogError::InvalidStructure("there is no custom category".to_string())
    })?;
    let subcategory = category.last_subcategory().ok_or_else(|| {
      CatalogError::InvalidStructure(format!(
        "custom category {} has no subcategory",
        category.display_name_key
      ))
    })?;

    let mut assets = self.store.filtered_assets()?;
    let id = Uuid::new_v4();
    let preferred_order = assets.len() as i64 + 1;
    assets.push(AssetRecord {
      id,
      show_in_top_level: true,
      shot_id: format!("CUSTOM_{}", uuid_key(id)),
      display_name_key: DEFAULT_ASSET_NAME.to_string(),
      accessibility_label: DEFAULT_ASSET_NAME.to_string(),
      preview_image_path: String::new(),
      preview_image_900x580: None,
      points_of_interest: BTreeMap::new(),
      include_in_shuffle: true,
      video_path: String::new(),
      subcategory_ids: vec![uuid_key(subcategory.id)],
      preferred_order,
      category_ids: vec![uuid_key(category.id)],
    });
    self.store.set_filtered_assets(assets)?;

    log::info!("created blank asset {id} in {}", category.display_name_key);
    Ok(id)
  }

  fn update_asset(&mut self, asset_id: Uuid, edit: impl FnOnce(&mut AssetRecord)) -> Result<()> {
    let mut asset = self.store.asset(asset_id)?.clone();
    edit(&mut asset);

    let mut assets = self.store.filtered_assets()?;
    match assets.iter_mut().find(|existing| existing.id == asset_id) {
      Some(existing) => *existing = asset,
      None => assets.push(asset),
    }
    self.store.set_filtered_assets(assets)
  }

  /// Points the asset at a new video, generates its preview from the first
  /// frame and saves the catalog.
  pub fn ingest_media(&mut self, asset_id: Uuid, video_source: &Url) -> Result<()> {
    let video_uri = video_source.to_string();
    let previous_preview = self.store.asset(asset_id)?.preview_image_path.clone();
    self.update_asset(asset_id, |asset| asset.video_path = video_uri.clone())?;

    let preview = self.thumbnails.generate(video_source, Duration::ZERO)?;
    let title = readable_file_name(&video_uri);
    self.update_asset(asset_id, |asset| {
      asset.preview_image_path = preview.to_string();
      if let Some(title) = title {
        if asset.display_name_key == DEFAULT_ASSET_NAME {
          asset.display_name_key = title.clone();
          asset.accessibility_label = title;
        }
      }
    })?;
    if previous_preview != preview.as_str() {
      self.discard_preview(&previous_preview);
    }

    log::info!("ingested {video_uri} into asset {asset_id}");
    self.store.save()
  }

  /// Validates a dropped file before ingesting it.
  pub fn ingest_dropped_file(&mut self, asset_id: Uuid, dropped_uri: &str) -> Result<()> {
    let path = validate_import(dropped_uri, VIDEO_EXTENSIONS)?;
    let video = file_uri(&path)
      .and_then(|uri| Url::parse(&uri).ok())
      .ok_or_else(|| ImportError::NonFileUrl(dropped_uri.to_string()))?;
    self.ingest_media(asset_id, &video)
  }

  /// Replaces the generated preview with a dropped image.
  pub fn ingest_dropped_preview(&mut self, asset_id: Uuid, dropped_uri: &str) -> Result<()> {
    let path = validate_import(dropped_uri, IMAGE_EXTENSIONS)?;
    let preview = file_uri(&path).ok_or_else(|| ImportError::NonFileUrl(dropped_uri.to_string()))?;
    let previous_preview = self.store.asset(asset_id)?.preview_image_path.clone();
    self.update_asset(asset_id, |asset| asset.preview_image_path = preview.clone())?;
    if previous_preview != preview {
      self.discard_preview(&previous_preview);
    }
    self.store.save()
  }

  /// Hands a preview that is no longer referenced back to the generator.
  fn discard_preview(&self, preview_uri: &str) {
    if let Ok(url) = Url::parse(preview_uri) {
      self.thumbnails.discard(&url);
    }
  }

  /// Removes the asset, its cached files and its generated preview, then
  /// saves. Saving recopies the media of every remaining custom asset.
  pub fn delete_asset(&mut self, asset_id: Uuid) -> Result<()> {
    let mut assets = self.store.filtered_assets()?;
    let Some(position) = assets.iter().position(|asset| asset.id == asset_id) else {
      return Err(CatalogError::UnknownAsset(asset_id));
    };
    let removed = assets.remove(position);

    self.store.set_filtered_assets(assets)?;
    self.store.media().remove_asset_files(asset_id);
    self.discard_preview(&removed.preview_image_path);
    log::info!("deleted asset {asset_id}");
    self.store.save()
  }

  /// Deletes the asset when it is still a draft. Returns whether it was
  /// deleted.
  pub fn discard_if_draft(&mut self, asset_id: Uuid) -> Result<bool> {
    if !is_draft(self.store.asset(asset_id)?) {
      return Ok(false);
    }
    self.delete_asset(asset_id)?;
    Ok(true)
  }
}
