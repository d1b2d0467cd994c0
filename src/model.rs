use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::media::file_path_from_uri;

const CUSTOM_MARKER: &str = "custom";

/// Manifest ids are written the way the platform writes them: uppercase,
/// hyphenated.
pub fn uuid_key(id: Uuid) -> String {
  id.as_hyphenated().to_string().to_uppercase()
}

mod upper_uuid {
  use serde::{Deserialize, Deserializer, Serializer};
  use uuid::Uuid;

  pub fn serialize<S: Serializer>(id: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&super::uuid_key(*id))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
    Uuid::deserialize(deserializer)
  }
}

pub trait Identified {
  fn id(&self) -> Uuid;
}

/// Shared shape of a wallpaper asset, whether it comes from the manifest or
/// from the record store. The resolved file accessors are pure functions over
/// the stored path strings.
pub trait WallpaperAsset: Identified {
  fn preview_image_path(&self) -> &str;
  fn video_path(&self) -> &str;

  fn thumbnail_file(&self) -> Option<PathBuf> {
    file_path_from_uri(self.preview_image_path())
  }

  fn video_file(&self) -> Option<PathBuf> {
    file_path_from_uri(self.video_path())
  }

  fn thumbnail_bytes(&self) -> Option<Vec<u8>> {
    self
      .thumbnail_file()
      .and_then(|path| std::fs::read(path).ok())
  }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ManifestDocument {
  #[serde(rename = "version")]
  pub schema_version: i64,
  #[serde(rename = "localizationVersion")]
  pub localization_version: String,
  #[serde(rename = "initialAssetCount")]
  pub initial_entry_count: i64,
  pub categories: Vec<CategoryRecord>,
  pub assets: Vec<AssetRecord>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl ManifestDocument {
  /// Asset category references that point at no category in the document.
  pub fn dangling_category_refs(&self) -> Vec<(Uuid, String)> {
    let known: Vec<String> = self
      .categories
      .iter()
      .map(|category| uuid_key(category.id))
      .collect();

    let mut dangling = Vec::new();
    for asset in &self.assets {
      for category_id in &asset.category_ids {
        if !known.iter().any(|id| id.eq_ignore_ascii_case(category_id)) {
          dangling.push((asset.id, category_id.clone()));
        }
      }
    }
    dangling
  }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CategoryRecord {
  #[serde(with = "upper_uuid")]
  pub id: Uuid,
  #[serde(rename = "localizedNameKey")]
  pub display_name_key: String,
  #[serde(rename = "previewImage")]
  pub preview_image_path: String,
  #[serde(rename = "localizedDescriptionKey")]
  pub description_key: String,
  #[serde(rename = "preferredOrder")]
  pub preferred_order: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subcategories: Option<Vec<CategoryRecord>>,
  #[serde(rename = "representativeAssetID")]
  pub representative_asset_id: String,
}

impl CategoryRecord {
  pub fn last_subcategory(&self) -> Option<&CategoryRecord> {
    self.subcategories.as_ref().and_then(|subs| subs.last())
  }
}

impl Identified for CategoryRecord {
  fn id(&self) -> Uuid {
    self.id
  }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AssetRecord {
  #[serde(with = "upper_uuid")]
  pub id: Uuid,
  #[serde(rename = "showInTopLevel")]
  pub show_in_top_level: bool,
  #[serde(rename = "shotID")]
  pub shot_id: String,
  #[serde(rename = "localizedNameKey")]
  pub display_name_key: String,
  #[serde(rename = "accessibilityLabel")]
  pub accessibility_label: String,
  #[serde(rename = "previewImage")]
  pub preview_image_path: String,
  #[serde(
    rename = "previewImage-900x580",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub preview_image_900x580: Option<String>,
  #[serde(rename = "pointsOfInterest", default)]
  pub points_of_interest: BTreeMap<String, String>,
  #[serde(rename = "includeInShuffle")]
  pub include_in_shuffle: bool,
  #[serde(rename = "url-4K-SDR-240FPS", alias = "videoPath", default)]
  pub video_path: String,
  #[serde(rename = "subcategories", default)]
  pub subcategory_ids: Vec<String>,
  #[serde(rename = "preferredOrder")]
  pub preferred_order: i64,
  #[serde(rename = "categories", default)]
  pub category_ids: Vec<String>,
}

impl AssetRecord {
  pub fn belongs_to(&self, category_id: Uuid) -> bool {
    let wanted = uuid_key(category_id);
    self
      .category_ids
      .iter()
      .any(|id| id.eq_ignore_ascii_case(&wanted))
  }

  /// Replaces category and subcategory membership with a single placement.
  pub fn place_in(&mut self, category: &CategoryRecord) {
    self.category_ids = vec![uuid_key(category.id)];
    self.subcategory_ids = category
      .last_subcategory()
      .map(|sub| vec![uuid_key(sub.id)])
      .unwrap_or_default();
  }
}

impl Identified for AssetRecord {
  fn id(&self) -> Uuid {
    self.id
  }
}

impl WallpaperAsset for AssetRecord {
  fn preview_image_path(&self) -> &str {
    &self.preview_image_path
  }

  fn video_path(&self) -> &str {
    &self.video_path
  }
}

pub fn is_custom_category(category: &CategoryRecord) -> bool {
  category
    .display_name_key
    .to_lowercase()
    .contains(CUSTOM_MARKER)
}


#[cfg(test)]
mod tests {
  use super::fixtures::*;
  use super::*;

  const PLATFORM_MANIFEST: &str = r#"{
    "version": 1,
    "localizationVersion": "17.0-1",
    "initialAssetCount": 1,
    "categories": [{
      "id": "A33A55D9-EDEA-4596-A850-6C10B54FBBB5",
      "localizedNameKey": "AerialCategoryLandscapes",
      "previewImage": "https://example.invalid/landscapes.jpg",
      "localizedDescriptionKey": "AerialCategoryLandscapesDescription",
      "preferredOrder": 0,
      "subcategories": [],
      "representativeAssetID": "B2FC91ED-6891-4DBC-BFE1-DA1B3B1F6D2A"
    }],
    "assets": [{
      "id": "B2FC91ED-6891-4DBC-BFE1-DA1B3B1F6D2A",
      "showInTopLevel": true,
      "shotID": "GMT306_139NC_139J_3066",
      "localizedNameKey": "GMT306_139NC_139J_3066_NAME",
      "accessibilityLabel": "Sea of Stars",
      "previewImage": "https://example.invalid/sea.jpg",
      "previewImage-900x580": "https://example.invalid/sea-900.jpg",
      "pointsOfInterest": {"0": "GMT306_139NC_139J_3066_0"},
      "includeInShuffle": true,
      "url-4K-SDR-240FPS": "https://example.invalid/sea.mov",
      "subcategories": [],
      "preferredOrder": 3,
      "categories": ["A33A55D9-EDEA-4596-A850-6C10B54FBBB5"]
    }]
  }"#;

  #[test]
  fn decodes_platform_keys() {
    let document: ManifestDocument = serde_json::from_str(PLATFORM_MANIFEST).unwrap();
    assert_eq!(document.schema_version, 1);
    assert_eq!(document.initial_entry_count, 1);
    let asset = &document.assets[0];
    assert_eq!(asset.video_path, "https://example.invalid/sea.mov");
    assert_eq!(
      asset.preview_image_900x580.as_deref(),
      Some("https://example.invalid/sea-900.jpg")
    );
    assert!(asset.belongs_to(document.categories[0].id));
    assert!(document.dangling_category_refs().is_empty());
  }

  #[test]
  fn ids_are_written_uppercase() {
    let document: ManifestDocument = serde_json::from_str(PLATFORM_MANIFEST).unwrap();
    let encoded = serde_json::to_string(&document).unwrap();
    assert!(encoded.contains("\"id\":\"B2FC91ED-6891-4DBC-BFE1-DA1B3B1F6D2A\""));
  }

  #[test]
  fn accepts_video_path_alias_and_writes_canonical_key() {
    let json = PLATFORM_MANIFEST.replace("url-4K-SDR-240FPS", "videoPath");
    let document: ManifestDocument = serde_json::from_str(&json).unwrap();
    assert_eq!(document.assets[0].video_path, "https://example.invalid/sea.mov");

    let encoded = serde_json::to_string(&document).unwrap();
    assert!(encoded.contains("\"url-4K-SDR-240FPS\""));
    assert!(!encoded.contains("\"videoPath\""));
  }

  #[test]
  fn unknown_top_level_keys_survive() {
    let json = PLATFORM_MANIFEST.replacen("{", "{\"futureKey\": [1, 2],", 1);
    let document: ManifestDocument = serde_json::from_str(&json).unwrap();
    let again: ManifestDocument =
      serde_json::from_str(&serde_json::to_string(&document).unwrap()).unwrap();
    assert_eq!(again.extra.get("futureKey"), Some(&serde_json::json!([1, 2])));
    assert_eq!(again, document);
  }

  #[test]
  fn custom_marker_is_case_insensitive() {
    assert!(is_custom_category(&category("My Custom Set", None)));
    assert!(is_custom_category(&category("CUSTOMWALLPAPERS", None)));
    assert!(!is_custom_category(&category("Dynamic", None)));
  }

  #[test]
  fn reports_dangling_category_refs() {
    let known = category("Custom", None);
    let mut stray = asset("stray", &known);
    stray.category_ids.push("not-a-category".to_string());
    let document = document(vec![known], vec![stray.clone()]);
    assert_eq!(
      document.dangling_category_refs(),
      vec![(stray.id, "not-a-category".to_string())]
    );
  }

  #[test]
  fn place_in_uses_last_subcategory() {
    let first = category("First", None);
    let last = category("Last", None);
    let parent = category("Custom", Some(vec![first, last.clone()]));
    let mut record = asset("clip", &category("Other", None));
    record.place_in(&parent);
    assert_eq!(record.category_ids, vec![uuid_key(parent.id)]);
    assert_eq!(record.subcategory_ids, vec![uuid_key(last.id)]);
  }
}
