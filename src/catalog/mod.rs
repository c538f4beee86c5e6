// Catalog access
// The indexer and enrichment pass only talk to storage through `Catalog`.

pub mod record;
pub mod sqlite;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::config::{DistanceExpr, Root};
use crate::error::Result;

pub use record::{FileRecord, FolderRecord, Label, PhotoRecord, PlaceSource, TitleSource};
pub use sqlite::SqliteCatalog;

/// A single column value for partial updates
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    Int(i64),
    Real(f64),
    Null,
}

impl ColumnValue {
    pub fn text(value: impl Into<String>) -> Self {
        ColumnValue::Text(value.into())
    }

    pub fn time(value: DateTime<Utc>) -> Self {
        ColumnValue::Text(record::format_time(value))
    }

    pub fn local_time(value: NaiveDateTime) -> Self {
        ColumnValue::Text(record::format_local_time(value))
    }
}

/// Constraints for a nearest-in-time lookup
#[derive(Debug, Clone)]
pub struct NearestFilter {
    pub taken_at: DateTime<Utc>,
    /// Record to leave out, usually the one being estimated
    pub exclude_id: i64,
    pub require_place: bool,
    pub exclude_estimated: bool,
}

impl NearestFilter {
    /// Anchors only: known place, not itself estimated
    pub fn anchored(taken_at: DateTime<Utc>, exclude_id: i64) -> Self {
        Self {
            taken_at,
            exclude_id,
            require_place: true,
            exclude_estimated: true,
        }
    }
}

pub trait Catalog: Send + Sync {
    /// File row by root and relative path
    fn find_file(&self, root: Root, rel_path: &str) -> Result<Option<FileRecord>>;

    fn files_for_photo(&self, photo_id: i64) -> Result<Vec<FileRecord>>;

    /// Persist a new record; assigns `id` and, if empty, `uid`
    fn create_photo(&self, photo: &mut PhotoRecord) -> Result<i64>;

    fn find_photo(&self, id: i64) -> Result<Option<PhotoRecord>>;

    /// Set individual columns; a missing row is a `WriteConflict`
    fn update_columns(&self, id: i64, fields: &[(&str, ColumnValue)]) -> Result<()>;

    /// Write a record and its file rows in one unit; a new record gets its
    /// `id` and `uid` here and every file row is pointed at it
    fn save_group(&self, photo: &mut PhotoRecord, files: &mut [FileRecord]) -> Result<()>;

    /// Full update of every mutable column
    fn save_photo(&self, photo: &PhotoRecord) -> Result<()> {
        self.update_columns(photo.id, &photo.columns())
    }

    fn find_nearest_in_time(
        &self,
        filter: &NearestFilter,
        distance: DistanceExpr,
    ) -> Result<Option<PhotoRecord>>;

    fn find_stack_candidates(
        &self,
        photo: &PhotoRecord,
        by_meta: bool,
        by_uuid: bool,
    ) -> Result<Vec<PhotoRecord>>;

    /// Ids for an enrichment run, oldest first
    fn photo_ids(&self, stale_only: bool, limit: i64) -> Result<Vec<i64>>;

    /// Record a folder; true if it was not known before
    fn create_folder(&self, root: Root, rel_path: &str, mod_time: i64) -> Result<bool>;

    /// Recompute aggregate counts after files were indexed
    fn update_counts(&self) -> Result<()>;

    /// Distance function preferred by this backend
    fn distance_expr(&self) -> DistanceExpr;

    /// Hand cached memory back after a large run
    fn release_memory(&self) -> Result<()> {
        Ok(())
    }

    /// True if the file is already stored at this modification time
    fn indexed(&self, root: Root, rel_path: &str, mod_time: i64, rescan: bool) -> Result<bool> {
        if rescan {
            return Ok(false);
        }
        Ok(self
            .find_file(root, rel_path)?
            .map(|f| f.mod_time == mod_time)
            .unwrap_or(false))
    }
}
