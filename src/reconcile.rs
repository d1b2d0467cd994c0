use std::collections::HashSet;
use std::path::Path;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::catalog::CatalogStore;
use crate::error::{CatalogError, Result};
use crate::media::{file_path_from_uri, file_uri, MediaKind, MediaStore};
use crate::model::{is_custom_category, AssetRecord, CategoryRecord};
use crate::record_store::{RecordStore, SecondaryAsset};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
  pub added_categories: usize,
  pub added_assets: usize,
  pub recovered_files: usize,
  pub manifest_saved: bool,
}

fn compute_state_hash(categories: &[CategoryRecord], assets: &[AssetRecord]) -> Result<String> {
  let mut hasher = Sha256::new();
  hasher.update(serde_json::to_vec(categories).map_err(CatalogError::Encode)?);
  hasher.update(b"\n");
  hasher.update(serde_json::to_vec(assets).map_err(CatalogError::Encode)?);
  Ok(format!("{:x}", hasher.finalize()))
}

fn collect_category_ids(categories: &[CategoryRecord], ids: &mut HashSet<Uuid>) {
  for category in categories {
    ids.insert(category.id);
    if let Some(subs) = &category.subcategories {
      collect_category_ids(subs, ids);
    }
  }
}

fn extension_hint(recorded: &str, fallback: &str) -> String {
  let path = file_path_from_uri(recorded).unwrap_or_else(|| Path::new(recorded).to_path_buf());
  path
    .extension()
    .map(|ext| ext.to_string_lossy().to_string())
    .filter(|ext| !ext.is_empty())
    .unwrap_or_else(|| fallback.to_string())
}

fn file_present(recorded: &str) -> bool {
  file_path_from_uri(recorded)
    .map(|path| path.is_file())
    .unwrap_or(false)
}

/// A `file:` path whose file is gone. Other values are never copied, so they
/// are left as recorded.
fn dead_file(recorded: &str) -> bool {
  file_path_from_uri(recorded)
    .map(|path| !path.is_file())
    .unwrap_or(false)
}

/// Rewrites missing cache files from the record's embedded bytes and points
/// the record at them. A missing file without embedded bytes has its path
/// cleared, which leaves the asset a draft. Returns how many files were
/// written.
fn recover_files(media: &MediaStore, asset: &mut SecondaryAsset) -> Result<usize> {
  let mut recovered = 0;

  if !file_present(&asset.preview_image_path) && !asset.thumbnail.is_empty() {
    let extension = extension_hint(&asset.preview_image_path, "png");
    let path = media.write_file(MediaKind::Thumbnail, asset.id, Some(&extension), &asset.thumbnail)?;
    if let Some(uri) = file_uri(&path) {
      asset.preview_image_path = uri;
    }
    recovered += 1;
  } else if dead_file(&asset.preview_image_path) {
    log::warn!(
      "preview {} of asset {} is gone and cannot be rebuilt",
      asset.preview_image_path,
      asset.id
    );
    asset.preview_image_path.clear();
  }

  if !file_present(&asset.video_path) && !asset.video.is_empty() {
    let extension = extension_hint(&asset.video_path, "mov");
    let path = media.write_file(MediaKind::Video, asset.id, Some(&extension), &asset.video)?;
    if let Some(uri) = file_uri(&path) {
      asset.video_path = uri;
    }
    recovered += 1;
  } else if dead_file(&asset.video_path) {
    log::warn!(
      "video {} of asset {} is gone and cannot be rebuilt",
      asset.video_path,
      asset.id
    );
    asset.video_path.clear();
  }

  Ok(recovered)
}

/// Pulls records that only exist in the record store into the manifest's
/// custom subset. Entries that only exist in the manifest are left for the
/// caller to mirror.
pub fn reconcile(store: &mut CatalogStore, records: &mut dyn RecordStore) -> Result<ReconcileReport> {
  let mut report = ReconcileReport::default();
  let before = compute_state_hash(&store.filtered_categories()?, &store.filtered_assets()?)?;

  let mut known_categories = HashSet::new();
  collect_category_ids(store.categories()?, &mut known_categories);
  let mut categories = store.filtered_categories()?;
  for category in records.list_categories()? {
    if known_categories.contains(&category.id) {
      continue;
    }
    let restored = category.to_manifest();
    if !is_custom_category(&restored) {
      log::warn!(
        "record store category {} ({}) is not a custom category, not restoring it",
        restored.id,
        restored.display_name_key
      );
      continue;
    }
    log::info!("restoring category {} from record store", restored.id);
    categories.push(restored);
    report.added_categories += 1;
  }
  if report.added_categories > 0 {
    store.set_filtered_categories(categories)?;
  }

  let known_assets: HashSet<Uuid> = store.assets()?.iter().map(|asset| asset.id).collect();
  let target = store.filtered_categories()?.last().cloned();
  let mut assets = store.filtered_assets()?;
  for mut secondary in records.list_assets()? {
    if known_assets.contains(&secondary.id) {
      continue;
    }

    let recorded_preview = secondary.preview_image_path.clone();
    let recorded_video = secondary.video_path.clone();
    report.recovered_files += recover_files(store.media(), &mut secondary)?;
    if secondary.preview_image_path != recorded_preview || secondary.video_path != recorded_video {
      records.upsert_asset(&secondary)?;
    }

    let mut asset = secondary.to_manifest();
    match &target {
      Some(category) => asset.place_in(category),
      None => log::warn!(
        "no custom category to hold asset {}, keeping its recorded categories",
        asset.id
      ),
    }
    log::info!("restoring asset {} from record store", asset.id);
    assets.push(asset);
    report.added_assets += 1;
  }
  if report.added_assets > 0 {
    store.set_filtered_assets(assets)?;
  }

  let after = compute_state_hash(&store.filtered_categories()?, &store.filtered_assets()?)?;
  if after != before {
    store.save()?;
    report.manifest_saved = true;
  }

  log::info!(
    "reconciled catalog: {} categories, {} assets, {} files recovered, saved: {}",
    report.added_categories,
    report.added_assets,
    report.recovered_files,
    report.manifest_saved
  );
  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::fixtures::{asset, category};

  #[test]
  fn state_hash_tracks_content() {
    let custom = category("Custom", None);
    let clip = asset("clip", &custom);
    let first = compute_state_hash(&[custom.clone()], &[clip.clone()]).unwrap();
    assert_eq!(first, compute_state_hash(&[custom.clone()], &[clip.clone()]).unwrap());

    let mut renamed = clip;
    renamed.display_name_key = "renamed".to_string();
    assert_ne!(first, compute_state_hash(&[custom], &[renamed]).unwrap());
  }

  #[test]
  fn only_missing_file_uris_are_dead() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("clip.mov");
    std::fs::write(&present, b"video").unwrap();

    assert!(!dead_file(&file_uri(&present).unwrap()));
    assert!(dead_file(&file_uri(&dir.path().join("gone.mov")).unwrap()));
    assert!(!dead_file(""));
    assert!(!dead_file("https://example.invalid/clip.mov"));
  }

  #[test]
  fn extension_hint_prefers_recorded_extension() {
    assert_eq!(extension_hint("file:///gone/clip.mp4", "mov"), "mp4");
    assert_eq!(extension_hint("", "mov"), "mov");
  }
}
