// Indexing of one asset group
// Builds or refreshes the catalog record from the main file's metadata and
// stores one file row per group member.

use serde::Serialize;

use crate::catalog::{Catalog, FileRecord, PhotoRecord, PlaceSource, TitleSource};
use crate::error::{CatalogError, Result};
use crate::maintain::{labels, location};
use crate::media::{MediaFile, RelatedFiles};

use super::IndexOptions;

/// Unit of work handed to a worker
#[derive(Debug)]
pub struct IndexJob {
    pub file_name: String,
    pub related: RelatedFiles,
    pub opts: IndexOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexAction {
    Added,
    Updated,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexResult {
    pub action: IndexAction,
    pub photo_id: i64,
    pub files: usize,
}

pub fn index_job(job: &IndexJob, catalog: &dyn Catalog) -> Result<IndexResult> {
    log::debug!(
        "Indexer: indexing {} ({} files, rescan {})",
        job.file_name,
        job.related.len(),
        job.opts.rescan
    );
    index_related(&job.related, catalog)
}

pub fn index_related(related: &RelatedFiles, catalog: &dyn Catalog) -> Result<IndexResult> {
    let Some(main) = related.main.as_ref() else {
        return Err(CatalogError::NotFound("asset group has no main file".to_string()));
    };

    let mut photo = match existing_photo(related, catalog)? {
        Some(photo) => photo,
        None => PhotoRecord::default(),
    };
    let is_new = !photo.has_id();

    apply_metadata(&mut photo, main, is_new);

    let metadata_error = main.metadata().error.clone();
    if let Some(err) = &metadata_error {
        log::debug!("Indexer: {} has no usable metadata ({})", main.rel_name(), err);
    }

    let mut files: Vec<FileRecord> = related
        .files
        .iter()
        .map(|file| {
            let primary = related.is_main(file);
            file_record(file, primary, if primary { metadata_error.clone() } else { None })
        })
        .collect();

    catalog.save_group(&mut photo, &mut files)?;

    let action = if is_new {
        log::info!("Indexer: added {} as {}", main.rel_name(), photo.uid);
        IndexAction::Added
    } else {
        log::debug!("Indexer: updated {}", main.rel_name());
        IndexAction::Updated
    };

    Ok(IndexResult {
        action,
        photo_id: photo.id,
        files: related.len(),
    })
}

/// Record already linked to the main file or any companion.
/// The main may be missing from `files` when it was indexed earlier.
fn existing_photo(related: &RelatedFiles, catalog: &dyn Catalog) -> Result<Option<PhotoRecord>> {
    for file in related.main.iter().chain(related.files.iter()) {
        let Some(stored) = catalog.find_file(file.root(), &file.rel_name())? else {
            continue;
        };
        if stored.photo_id <= 0 {
            continue;
        }
        if let Some(photo) = catalog.find_photo(stored.photo_id)? {
            return Ok(Some(photo));
        }
    }
    Ok(None)
}

fn apply_metadata(photo: &mut PhotoRecord, main: &MediaFile, is_new: bool) {
    let meta = main.metadata();

    let (taken_at, src) = main.taken_at();
    if is_new || src.may_replace(photo.taken_src) {
        photo.taken_at = taken_at;
        photo.taken_src = src;
        photo.taken_at_local = match meta.taken_at_local {
            Some(local) if meta.taken_at.is_some() => local,
            _ => taken_at.naive_utc(),
        };
        if meta.taken_at.is_some() {
            photo.time_zone = meta.time_zone.clone();
        }
    }

    if meta.has_position() && photo.place_src != PlaceSource::Manual {
        photo.lat = meta.lat;
        photo.lng = meta.lng;
        photo.altitude = meta.altitude;
        photo.place_src = PlaceSource::Meta;
        location::update_location(photo);
    }

    if !meta.camera_make.is_empty() {
        photo.camera_make = meta.camera_make.clone();
    }
    if !meta.camera_model.is_empty() {
        photo.camera_model = meta.camera_model.clone();
    }
    if !meta.lens_model.is_empty() {
        photo.lens_model = meta.lens_model.clone();
    }
    if meta.iso > 0 {
        photo.iso = meta.iso;
    }
    if meta.f_number > 0.0 {
        photo.f_number = meta.f_number;
    }
    if !meta.exposure.is_empty() {
        photo.exposure = meta.exposure.clone();
    }
    if meta.focal_length > 0 {
        photo.focal_length = meta.focal_length;
    }

    if !meta.title.is_empty() && photo.title_src != TitleSource::Manual {
        photo.title = meta.title.clone();
        photo.title_src = TitleSource::Meta;
    }
    if !meta.description.is_empty() {
        photo.description = meta.description.clone();
    }

    if !meta.keywords.is_empty() {
        let mut keywords = photo.keywords.clone();
        keywords.extend(meta.keywords.iter().cloned());
        photo.keywords = labels::merge_keywords(&keywords, &[]);
    }

    if !meta.document_id.is_empty() {
        photo.document_id = meta.document_id.clone();
    }
    if !meta.original_name.is_empty() {
        photo.original_name = meta.original_name.clone();
    }

    let (width, height) = main.dimensions();
    if width > 0 && height > 0 {
        photo.width = width;
        photo.height = height;
    }

    photo.media_type = main.kind();
    photo.photo_path = main.rel_dir();
    photo.photo_name = main.base_prefix();
    photo.update_date_fields();
}

fn file_record(file: &MediaFile, primary: bool, metadata_error: Option<String>) -> FileRecord {
    let (width, height) = if file.is_media() { file.dimensions() } else { (0, 0) };
    FileRecord {
        id: 0,
        photo_id: 0,
        root: file.root().as_str().to_string(),
        path: file.rel_name(),
        size: file.size() as i64,
        mod_time: file.mod_time(),
        hash: file.hash().to_string(),
        checksum: file.checksum().to_string(),
        file_type: file.file_type().as_str().to_string(),
        media_kind: file.kind().as_str().to_string(),
        mime: file.mime().to_string(),
        is_primary: primary,
        width,
        height,
        metadata_error,
    }
}
