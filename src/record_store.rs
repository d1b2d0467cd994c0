use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::{CatalogError, Result};
use crate::model::{uuid_key, AssetRecord, CategoryRecord, Identified, WallpaperAsset};

const MIGRATION_SQL_0001: &str = include_str!("../migrations/0001_initial.sql");

/// An asset as mirrored in the record store, carrying its own copies of the
/// video and thumbnail bytes so cache files can be rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryAsset {
  pub id: Uuid,
  pub show_in_top_level: bool,
  pub shot_id: String,
  pub display_name_key: String,
  pub accessibility_label: String,
  pub preview_image_path: String,
  pub points_of_interest: BTreeMap<String, String>,
  pub include_in_shuffle: bool,
  pub video_path: String,
  pub subcategory_ids: Vec<String>,
  pub preferred_order: i64,
  pub category_ids: Vec<String>,
  pub video: Vec<u8>,
  pub thumbnail: Vec<u8>,
}

impl SecondaryAsset {
  pub fn from_manifest(asset: &AssetRecord, video: Vec<u8>, thumbnail: Vec<u8>) -> Self {
    SecondaryAsset {
      id: asset.id,
      show_in_top_level: asset.show_in_top_level,
      shot_id: asset.shot_id.clone(),
      display_name_key: asset.display_name_key.clone(),
      accessibility_label: asset.accessibility_label.clone(),
      preview_image_path: asset.preview_image_path.clone(),
      points_of_interest: asset.points_of_interest.clone(),
      include_in_shuffle: asset.include_in_shuffle,
      video_path: asset.video_path.clone(),
      subcategory_ids: asset.subcategory_ids.clone(),
      preferred_order: asset.preferred_order,
      category_ids: asset.category_ids.clone(),
      video,
      thumbnail,
    }
  }

  pub fn to_manifest(&self) -> AssetRecord {
    AssetRecord {
      id: self.id,
      show_in_top_level: self.show_in_top_level,
      shot_id: self.shot_id.clone(),
      display_name_key: self.display_name_key.clone(),
      accessibility_label: self.accessibility_label.clone(),
      preview_image_path: self.preview_image_path.clone(),
      preview_image_900x580: None,
      points_of_interest: self.points_of_interest.clone(),
      include_in_shuffle: self.include_in_shuffle,
      video_path: self.video_path.clone(),
      subcategory_ids: self.subcategory_ids.clone(),
      preferred_order: self.preferred_order,
      category_ids: self.category_ids.clone(),
    }
  }
}

impl Identified for SecondaryAsset {
  fn id(&self) -> Uuid {
    self.id
  }
}

impl WallpaperAsset for SecondaryAsset {
  fn preview_image_path(&self) -> &str {
    &self.preview_image_path
  }

  fn video_path(&self) -> &str {
    &self.video_path
  }

  fn thumbnail_bytes(&self) -> Option<Vec<u8>> {
    self
      .thumbnail_file()
      .and_then(|path| fs::read(path).ok())
      .or_else(|| (!self.thumbnail.is_empty()).then(|| self.thumbnail.clone()))
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryCategory {
  pub id: Uuid,
  pub display_name_key: String,
  pub preview_image_path: String,
  pub description_key: String,
  pub preferred_order: i64,
  pub subcategories: Option<Vec<SecondaryCategory>>,
  pub representative_asset_id: String,
}

impl SecondaryCategory {
  pub fn from_manifest(category: &CategoryRecord) -> Self {
    SecondaryCategory {
      id: category.id,
      display_name_key: category.display_name_key.clone(),
      preview_image_path: category.preview_image_path.clone(),
      description_key: category.description_key.clone(),
      preferred_order: category.preferred_order,
      subcategories: category
        .subcategories
        .as_ref()
        .map(|subs| subs.iter().map(SecondaryCategory::from_manifest).collect()),
      representative_asset_id: category.representative_asset_id.clone(),
    }
  }

  pub fn to_manifest(&self) -> CategoryRecord {
    CategoryRecord {
      id: self.id,
      display_name_key: self.display_name_key.clone(),
      preview_image_path: self.preview_image_path.clone(),
      description_key: self.description_key.clone(),
      preferred_order: self.preferred_order,
      subcategories: self
        .subcategories
        .as_ref()
        .map(|subs| subs.iter().map(SecondaryCategory::to_manifest).collect()),
      representative_asset_id: self.representative_asset_id.clone(),
    }
  }
}

impl Identified for SecondaryCategory {
  fn id(&self) -> Uuid {
    self.id
  }
}

/// Durable mirror of the manifest entries. Deleting a category deletes its
/// subcategories with it.
pub trait RecordStore {
  fn list_assets(&self) -> Result<Vec<SecondaryAsset>>;
  /// Top-level categories with their subcategories nested.
  fn list_categories(&self) -> Result<Vec<SecondaryCategory>>;
  fn upsert_asset(&mut self, asset: &SecondaryAsset) -> Result<()>;
  fn upsert_category(&mut self, category: &SecondaryCategory) -> Result<()>;
  fn delete_asset(&mut self, id: Uuid) -> Result<()>;
  fn delete_category(&mut self, id: Uuid) -> Result<()>;
}

fn now_iso() -> String {
  Utc::now().to_rfc3339()
}

fn parse_id(raw: &str) -> Result<Uuid> {
  Uuid::parse_str(raw).map_err(|e| CatalogError::RecordStore(format!("invalid id '{}': {}", raw, e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
  serde_json::to_string(value).map_err(|e| CatalogError::RecordStore(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
  serde_json::from_str(raw).map_err(|e| CatalogError::RecordStore(e.to_string()))
}

struct CategoryRow {
  id: String,
  parent_id: Option<String>,
  localized_name_key: String,
  preview_image: String,
  localized_description_key: String,
  preferred_order: i64,
  has_subcategories: bool,
  representative_asset_id: String,
}

fn assemble_category(row: &CategoryRow, children: &HashMap<String, Vec<&CategoryRow>>) -> Result<SecondaryCategory> {
  let subcategories = if row.has_subcategories {
    let mut subs = Vec::new();
    for child in children.get(&row.id).map(Vec::as_slice).unwrap_or_default() {
      subs.push(assemble_category(child, children)?);
    }
    Some(subs)
  } else {
    None
  };

  Ok(SecondaryCategory {
    id: parse_id(&row.id)?,
    display_name_key: row.localized_name_key.clone(),
    preview_image_path: row.preview_image.clone(),
    description_key: row.localized_description_key.clone(),
    preferred_order: row.preferred_order,
    subcategories,
    representative_asset_id: row.representative_asset_id.clone(),
  })
}

fn write_category(
  connection: &Connection,
  category: &SecondaryCategory,
  parent_id: Option<&str>,
  position: i64,
) -> Result<()> {
  let id = uuid_key(category.id);
  let now = now_iso();
  connection.execute(
    "INSERT INTO wallpaper_categories (
        id, parent_id, position, localized_name_key, preview_image, localized_description_key,
        preferred_order, has_subcategories, representative_asset_id, created_at, updated_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
      ON CONFLICT(id) DO UPDATE SET
        parent_id = excluded.parent_id,
        position = excluded.position,
        localized_name_key = excluded.localized_name_key,
        preview_image = excluded.preview_image,
        localized_description_key = excluded.localized_description_key,
        preferred_order = excluded.preferred_order,
        has_subcategories = excluded.has_subcategories,
        representative_asset_id = excluded.representative_asset_id,
        updated_at = excluded.updated_at",
    params![
      id,
      parent_id,
      position,
      category.display_name_key,
      category.preview_image_path,
      category.description_key,
      category.preferred_order,
      category.subcategories.is_some(),
      category.representative_asset_id,
      now
    ],
  )?;

  let subcategories = category.subcategories.as_deref().unwrap_or_default();
  let keep: Vec<String> = subcategories.iter().map(|sub| uuid_key(sub.id)).collect();
  let mut statement = connection.prepare("SELECT id FROM wallpaper_categories WHERE parent_id = ?1")?;
  let existing = statement
    .query_map(params![id], |row| row.get::<usize, String>(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  for stale in existing.iter().filter(|child| !keep.contains(child)) {
    connection.execute("DELETE FROM wallpaper_categories WHERE id = ?1", params![stale])?;
  }

  for (index, sub) in subcategories.iter().enumerate() {
    write_category(connection, sub, Some(&id), index as i64)?;
  }

  Ok(())
}

pub struct SqliteRecordStore {
  connection: Connection,
}

impl SqliteRecordStore {
  pub fn open(db_path: &Path) -> Result<Self> {
    if let Some(parent) = db_path.parent() {
      fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
    }
    Self::init(Connection::open(db_path)?)
  }

  pub fn open_in_memory() -> Result<Self> {
    Self::init(Connection::open_in_memory()?)
  }

  fn init(connection: Connection) -> Result<Self> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection.execute_batch(MIGRATION_SQL_0001)?;
    Ok(SqliteRecordStore { connection })
  }

  pub fn count_categories(&self) -> Result<i64> {
    Ok(
      self
        .connection
        .query_row("SELECT COUNT(*) FROM wallpaper_categories", [], |row| row.get(0))?,
    )
  }
}

impl RecordStore for SqliteRecordStore {
  fn list_assets(&self) -> Result<Vec<SecondaryAsset>> {
    let mut statement = self.connection.prepare(
      "SELECT id, show_in_top_level, shot_id, localized_name_key, accessibility_label, preview_image,
              points_of_interest, include_in_shuffle, video_url, subcategories, preferred_order,
              categories, video, thumbnail
       FROM wallpaper_assets
       ORDER BY preferred_order, created_at, id",
    )?;

    let mut rows = statement.query([])?;
    let mut assets = Vec::new();
    while let Some(row) = rows.next()? {
      let id: String = row.get(0)?;
      let points_of_interest: String = row.get(6)?;
      let subcategories: String = row.get(9)?;
      let categories: String = row.get(11)?;
      assets.push(SecondaryAsset {
        id: parse_id(&id)?,
        show_in_top_level: row.get(1)?,
        shot_id: row.get(2)?,
        display_name_key: row.get(3)?,
        accessibility_label: row.get(4)?,
        preview_image_path: row.get(5)?,
        points_of_interest: from_json(&points_of_interest)?,
        include_in_shuffle: row.get(7)?,
        video_path: row.get(8)?,
        subcategory_ids: from_json(&subcategories)?,
        preferred_order: row.get(10)?,
        category_ids: from_json(&categories)?,
        video: row.get(12)?,
        thumbnail: row.get(13)?,
      });
    }

    Ok(assets)
  }

  fn list_categories(&self) -> Result<Vec<SecondaryCategory>> {
    let mut statement = self.connection.prepare(
      "SELECT id, parent_id, localized_name_key, preview_image, localized_description_key,
              preferred_order, has_subcategories, representative_asset_id
       FROM wallpaper_categories
       ORDER BY position, preferred_order, created_at, id",
    )?;

    let rows = statement
      .query_map([], |row| {
        Ok(CategoryRow {
          id: row.get(0)?,
          parent_id: row.get(1)?,
          localized_name_key: row.get(2)?,
          preview_image: row.get(3)?,
          localized_description_key: row.get(4)?,
          preferred_order: row.get(5)?,
          has_subcategories: row.get(6)?,
          representative_asset_id: row.get(7)?,
        })
      })?
      .collect::<rusqlite::Result<Vec<CategoryRow>>>()?;

    let mut children: HashMap<String, Vec<&CategoryRow>> = HashMap::new();
    for row in &rows {
      if let Some(parent) = &row.parent_id {
        children.entry(parent.clone()).or_default().push(row);
      }
    }

    rows
      .iter()
      .filter(|row| row.parent_id.is_none())
      .map(|row| assemble_category(row, &children))
      .collect()
  }

  fn upsert_asset(&mut self, asset: &SecondaryAsset) -> Result<()> {
    let now = now_iso();
    self.connection.execute(
      "INSERT INTO wallpaper_assets (
          id, show_in_top_level, shot_id, localized_name_key, accessibility_label, preview_image,
          points_of_interest, include_in_shuffle, video_url, subcategories, preferred_order,
          categories, video, thumbnail, created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
        ON CONFLICT(id) DO UPDATE SET
          show_in_top_level = excluded.show_in_top_level,
          shot_id = excluded.shot_id,
          localized_name_key = excluded.localized_name_key,
          accessibility_label = excluded.accessibility_label,
          preview_image = excluded.preview_image,
          points_of_interest = excluded.points_of_interest,
          include_in_shuffle = excluded.include_in_shuffle,
          video_url = excluded.video_url,
          subcategories = excluded.subcategories,
          preferred_order = excluded.preferred_order,
          categories = excluded.categories,
          video = excluded.video,
          thumbnail = excluded.thumbnail,
          updated_at = excluded.updated_at",
      params![
        uuid_key(asset.id),
        asset.show_in_top_level,
        asset.shot_id,
        asset.display_name_key,
        asset.accessibility_label,
        asset.preview_image_path,
        to_json(&asset.points_of_interest)?,
        asset.include_in_shuffle,
        asset.video_path,
        to_json(&asset.subcategory_ids)?,
        asset.preferred_order,
        to_json(&asset.category_ids)?,
        asset.video,
        asset.thumbnail,
        now
      ],
    )?;
    Ok(())
  }

  fn upsert_category(&mut self, category: &SecondaryCategory) -> Result<()> {
    let tx = self.connection.transaction()?;
    write_category(&tx, category, None, 0)?;
    tx.commit()?;
    Ok(())
  }

  fn delete_asset(&mut self, id: Uuid) -> Result<()> {
    self
      .connection
      .execute("DELETE FROM wallpaper_assets WHERE id = ?1", params![uuid_key(id)])?;
    Ok(())
  }

  fn delete_category(&mut self, id: Uuid) -> Result<()> {
    self
      .connection
      .execute("DELETE FROM wallpaper_categories WHERE id = ?1", params![uuid_key(id)])?;
    Ok(())
  }
}
