//! Catalog synchronization for custom aerial wallpapers.
//!
//! The platform keeps its wallpapers in one JSON manifest (`entries.json`).
//! [`CatalogStore`] loads and saves that manifest and keeps the cached copies
//! of each custom asset's media in step with it. [`AssetLifecycle`] creates,
//! fills and deletes custom assets, and [`reconcile()`] pulls entries back from
//! a [`RecordStore`] mirror.

pub mod catalog;
pub mod config;
pub mod error;
pub mod import;
pub mod lifecycle;
pub mod media;
pub mod model;
pub mod projection;
pub mod reconcile;
pub mod record_store;
pub mod thumbnail;

pub use catalog::{CatalogEvent, CatalogStore, SharedCatalog};
pub use config::{CatalogPaths, ManifestLayout};
pub use error::{CatalogError, Result};
pub use lifecycle::{is_draft, AssetLifecycle};
pub use model::{is_custom_category, AssetRecord, CategoryRecord, ManifestDocument};
pub use reconcile::{reconcile, ReconcileReport};
pub use record_store::{RecordStore, SecondaryAsset, SecondaryCategory, SqliteRecordStore};
pub use thumbnail::{FfmpegThumbnailer, ThumbnailError, ThumbnailGenerator};
