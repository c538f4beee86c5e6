// SQLite-backed catalog

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use super::{Catalog, ColumnValue, FileRecord, NearestFilter, PhotoRecord};
use crate::config::{DistanceExpr, Root};
use crate::db::{self, schema};
use crate::error::{CatalogError, Result};

/// One connection shared by the walker and every worker
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    distance: DistanceExpr,
}

impl SqliteCatalog {
    pub fn open(path: &Path, distance: DistanceExpr) -> Result<Self> {
        let conn = db::open_db(path)?;
        log::info!("Catalog: opened {}", path.display());
        Ok(Self::from_connection(conn, distance))
    }

    pub fn open_in_memory(distance: DistanceExpr) -> Result<Self> {
        Ok(Self::from_connection(db::open_in_memory()?, distance))
    }

    pub fn from_connection(conn: Connection, distance: DistanceExpr) -> Self {
        Self {
            conn: Mutex::new(conn),
            distance,
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock()?)
    }

    pub fn count_photos(&self) -> Result<i64> {
        schema::count_photos(&*self.conn()?)
    }

    pub fn find_photo_by_uid(&self, uid: &str) -> Result<Option<PhotoRecord>> {
        schema::get_photo_by_uid(&*self.conn()?, uid)
    }

    pub fn find_folder(&self, root: Root, rel_path: &str) -> Result<Option<super::FolderRecord>> {
        schema::get_folder(&*self.conn()?, root.as_str(), rel_path)
    }
}

impl Catalog for SqliteCatalog {
    fn find_file(&self, root: Root, rel_path: &str) -> Result<Option<FileRecord>> {
        schema::get_file_by_path(&*self.conn()?, root.as_str(), rel_path)
    }

    fn files_for_photo(&self, photo_id: i64) -> Result<Vec<FileRecord>> {
        schema::list_files_for_photo(&*self.conn()?, photo_id)
    }

    fn create_photo(&self, photo: &mut PhotoRecord) -> Result<i64> {
        if photo.uid.is_empty() {
            photo.uid = PhotoRecord::new_uid();
        }
        let id = schema::insert_photo(&*self.conn()?, photo)?;
        photo.id = id;
        Ok(id)
    }

    fn find_photo(&self, id: i64) -> Result<Option<PhotoRecord>> {
        schema::get_photo(&*self.conn()?, id)
    }

    fn save_group(&self, photo: &mut PhotoRecord, files: &mut [FileRecord]) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        if photo.has_id() {
            if schema::update_photo_columns(&tx, photo.id, &photo.columns())? == 0 {
                return Err(CatalogError::WriteConflict(format!("photo {} not found", photo.id)));
            }
        } else {
            if photo.uid.is_empty() {
                photo.uid = PhotoRecord::new_uid();
            }
            photo.id = schema::insert_photo(&tx, photo)?;
        }

        for file in files.iter_mut() {
            file.photo_id = photo.id;
            schema::upsert_file(&tx, file)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn update_columns(&self, id: i64, fields: &[(&str, ColumnValue)]) -> Result<()> {
        let changed = schema::update_photo_columns(&*self.conn()?, id, fields)?;
        if changed == 0 && !fields.is_empty() {
            return Err(CatalogError::WriteConflict(format!("photo {} not found", id)));
        }
        Ok(())
    }

    fn find_nearest_in_time(
        &self,
        filter: &NearestFilter,
        distance: DistanceExpr,
    ) -> Result<Option<PhotoRecord>> {
        schema::find_nearest_in_time(&*self.conn()?, filter, distance)
    }

    fn find_stack_candidates(
        &self,
        photo: &PhotoRecord,
        by_meta: bool,
        by_uuid: bool,
    ) -> Result<Vec<PhotoRecord>> {
        schema::find_stack_candidates(&*self.conn()?, photo, by_meta, by_uuid)
    }

    fn photo_ids(&self, stale_only: bool, limit: i64) -> Result<Vec<i64>> {
        schema::list_photo_ids(&*self.conn()?, stale_only, limit)
    }

    fn create_folder(&self, root: Root, rel_path: &str, mod_time: i64) -> Result<bool> {
        schema::insert_folder(&*self.conn()?, root.as_str(), rel_path, mod_time)
    }

    fn update_counts(&self) -> Result<()> {
        let folders = schema::update_folder_counts(&*self.conn()?)?;
        log::debug!("Catalog: recounted {} folders", folders);
        Ok(())
    }

    fn distance_expr(&self) -> DistanceExpr {
        self.distance
    }

    fn release_memory(&self) -> Result<()> {
        self.conn()?.execute_batch("PRAGMA shrink_memory;")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_id_and_uid() {
        let catalog = SqliteCatalog::open_in_memory(DistanceExpr::JulianDay).unwrap();
        let mut photo = PhotoRecord::default();
        let id = catalog.create_photo(&mut photo).unwrap();

        assert_eq!(photo.id, id);
        assert!(!photo.uid.is_empty());
        assert_eq!(catalog.find_photo_by_uid(&photo.uid).unwrap().unwrap().id, id);
    }

    #[test]
    fn test_update_missing_row_is_write_conflict() {
        let catalog = SqliteCatalog::open_in_memory(DistanceExpr::JulianDay).unwrap();
        let err = catalog
            .update_columns(42, &[("title", ColumnValue::text("x"))])
            .unwrap_err();
        assert!(matches!(err, CatalogError::WriteConflict(_)));
    }

    #[test]
    fn test_indexed_respects_mod_time_and_rescan() {
        let catalog = SqliteCatalog::open_in_memory(DistanceExpr::JulianDay).unwrap();
        let mut photo = PhotoRecord::default();
        catalog.save_group(&mut photo, &mut [file_at("a.jpg")]).unwrap();

        assert!(catalog.indexed(Root::Originals, "a.jpg", 50, false).unwrap());
        assert!(!catalog.indexed(Root::Originals, "a.jpg", 51, false).unwrap());
        assert!(!catalog.indexed(Root::Originals, "a.jpg", 50, true).unwrap());
        assert!(!catalog.indexed(Root::Import, "a.jpg", 50, false).unwrap());
    }

    fn file_at(path: &str) -> FileRecord {
        FileRecord {
            id: 0,
            photo_id: 0,
            root: Root::Originals.as_str().to_string(),
            path: path.to_string(),
            size: 1,
            mod_time: 50,
            hash: String::new(),
            checksum: String::new(),
            file_type: "jpeg".to_string(),
            media_kind: "photo".to_string(),
            mime: "image/jpeg".to_string(),
            is_primary: false,
            width: 0,
            height: 0,
            metadata_error: None,
        }
    }

    #[test]
    fn test_save_group_links_files_to_new_record() {
        let catalog = SqliteCatalog::open_in_memory(DistanceExpr::JulianDay).unwrap();
        let mut photo = PhotoRecord::default();
        let mut files = vec![file_at("a.jpg"), file_at("a.xmp")];
        catalog.save_group(&mut photo, &mut files).unwrap();

        assert!(photo.has_id());
        assert!(!photo.uid.is_empty());
        assert_eq!(catalog.files_for_photo(photo.id).unwrap().len(), 2);
    }

    #[test]
    fn test_save_group_rolls_back_on_file_failure() {
        let conn = db::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_b BEFORE INSERT ON files WHEN NEW.path = 'b.jpg'
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();
        let catalog = SqliteCatalog::from_connection(conn, DistanceExpr::JulianDay);

        let mut photo = PhotoRecord::default();
        let mut files = vec![file_at("a.jpg"), file_at("b.jpg")];
        assert!(catalog.save_group(&mut photo, &mut files).is_err());

        assert_eq!(catalog.count_photos().unwrap(), 0);
        assert!(catalog.find_file(Root::Originals, "a.jpg").unwrap().is_none());
    }

    #[test]
    fn test_release_memory() {
        let catalog = SqliteCatalog::open_in_memory(DistanceExpr::DayDiff).unwrap();
        catalog.release_memory().unwrap();
        assert_eq!(catalog.distance_expr(), DistanceExpr::DayDiff);
    }
}
