// Media file descriptor
// Wraps one path; expensive facts are computed on first use and cached.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::UNIX_EPOCH;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::kind::{self, FileType, MediaKind};
use super::naming;
use crate::config::{Root, Roots};
use crate::error::{CatalogError, Result};
use crate::hash;
use crate::metadata::{Extractor, MetadataRecord};

/// Where a capture time came from, most trusted first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSource {
    Manual,
    Meta,
    Name,
    Auto,
    Estimate,
}

impl TimeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSource::Manual => "manual",
            TimeSource::Meta => "meta",
            TimeSource::Name => "name",
            TimeSource::Auto => "auto",
            TimeSource::Estimate => "estimate",
        }
    }

    pub fn parse(value: &str) -> TimeSource {
        match value {
            "manual" => TimeSource::Manual,
            "meta" => TimeSource::Meta,
            "name" => TimeSource::Name,
            "estimate" => TimeSource::Estimate,
            _ => TimeSource::Auto,
        }
    }

    /// True if a value from `self` may replace one from `current`
    pub fn may_replace(&self, current: TimeSource) -> bool {
        *self <= current
    }
}

#[derive(Debug)]
pub struct MediaFile {
    path: PathBuf,
    roots: Arc<Roots>,
    size: u64,
    mod_time: i64,
    file_type: FileType,
    root: OnceLock<Root>,
    hash: OnceLock<String>,
    checksum: OnceLock<String>,
    dimensions: OnceLock<(u32, u32)>,
    metadata: OnceLock<MetadataRecord>,
}

impl MediaFile {
    /// Stat and sniff a file; fails if it cannot be read
    pub fn new(path: impl Into<PathBuf>, roots: Arc<Roots>) -> Result<Self> {
        let path = path.into();
        let stat = fs::metadata(&path)
            .map_err(|e| CatalogError::UnreadableFile(format!("{}: {}", path.display(), e)))?;
        if !stat.is_file() {
            return Err(CatalogError::UnreadableFile(format!("{} is not a file", path.display())));
        }

        // Whole seconds so re-index checks are stable across filesystems
        let mod_time = stat
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let file_type = kind::detect_file_type(&path)
            .map_err(|e| CatalogError::UnreadableFile(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            path,
            roots,
            size: stat.len(),
            mod_time,
            file_type,
            root: OnceLock::new(),
            hash: OnceLock::new(),
            checksum: OnceLock::new(),
            dimensions: OnceLock::new(),
            metadata: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Modification time in whole seconds since the epoch
    pub fn mod_time(&self) -> i64 {
        self.mod_time
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn kind(&self) -> MediaKind {
        self.file_type.kind()
    }

    pub fn mime(&self) -> &'static str {
        self.file_type.mime()
    }

    pub fn is_jpeg(&self) -> bool {
        self.file_type == FileType::Jpeg
    }

    pub fn is_media(&self) -> bool {
        self.kind().is_media()
    }

    pub fn roots(&self) -> &Arc<Roots> {
        &self.roots
    }

    /// Root folder this file lives under
    pub fn root(&self) -> Root {
        *self.root.get_or_init(|| self.roots.classify(&self.path))
    }

    /// Path relative to its root
    pub fn rel_name(&self) -> String {
        self.roots.rel_name(&self.path, self.root())
    }

    /// Relative directory of the file within its root
    pub fn rel_dir(&self) -> String {
        let rel = self.rel_name();
        match rel.rfind(crate::constants::PATH_DB_SEPARATOR) {
            Some(i) => rel[..i].to_string(),
            None => String::new(),
        }
    }

    /// Base name without any extension
    pub fn base_prefix(&self) -> String {
        naming::base_prefix(&self.path)
    }

    /// Full BLAKE3 hash; empty if the file could not be read
    pub fn hash(&self) -> &str {
        self.hash.get_or_init(|| match hash::compute_hash(&self.path) {
            Ok(h) => h,
            Err(e) => {
                log::warn!("MediaFile: {}", e);
                String::new()
            }
        })
    }

    /// Fast checksum over head, tail and size
    pub fn checksum(&self) -> &str {
        self.checksum.get_or_init(|| match hash::compute_checksum(&self.path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("MediaFile: {}", e);
                String::new()
            }
        })
    }

    /// Metadata record, extracted once
    pub fn metadata(&self) -> &MetadataRecord {
        self.metadata.get_or_init(|| {
            Extractor::new().extract(&self.path, self.file_type, &self.sidecar_dirs())
        })
    }

    /// Display dimensions (width, height), rotation applied
    pub fn dimensions(&self) -> (u32, u32) {
        *self.dimensions.get_or_init(|| {
            let meta = self.metadata();
            let decoded = if self.kind() == MediaKind::Photo && self.file_type != FileType::Heif {
                decoded_size(&self.path)
                    .map_err(|e| log::debug!("MediaFile: no decoded size for {}: {}", self.path.display(), e))
                    .ok()
            } else {
                None
            };

            match decoded {
                Some((w, h)) if meta.orientation > 4 => (h, w),
                Some(size) => size,
                None => (meta.actual_width(), meta.actual_height()),
            }
        })
    }

    /// Capture time and its source: metadata, then filename, then mtime
    pub fn taken_at(&self) -> (DateTime<Utc>, TimeSource) {
        let meta = self.metadata();
        if let Some(taken) = meta.taken_at {
            return (taken, TimeSource::Meta);
        }

        if let Some(local) = naming::time_from_name(Path::new(&self.rel_name())) {
            return (Utc.from_utc_datetime(&local), TimeSource::Name);
        }

        let modified = Utc.timestamp_opt(self.mod_time, 0).single().unwrap_or_default();
        (modified, TimeSource::Auto)
    }

    /// Sidecar-root mirror and hidden folder for this file's directory
    pub fn sidecar_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(sidecar) = &self.roots.sidecar {
            let rel_dir = self.rel_dir();
            if !rel_dir.is_empty() || self.root() == Root::Originals {
                dirs.push(sidecar.join(rel_dir));
            }
        }
        dirs
    }

    /// Move the file; the root classification is recomputed for the new path
    pub fn rename(&mut self, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        if fs::rename(&self.path, dest).is_err() {
            // Cross-device moves need copy + remove
            fs::copy(&self.path, dest)?;
            fs::remove_file(&self.path)?;
        }

        self.path = dest.to_path_buf();
        self.root = OnceLock::new();
        Ok(())
    }
}

/// Header size with the decoder chosen from content, not the extension
fn decoded_size(path: &Path) -> image::ImageResult<(u32, u32)> {
    image::ImageReader::open(path)?.with_guessed_format()?.into_dimensions()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::testdata::{jpeg_bytes, tiff_block, write_file, ExifFixture};
    use chrono::{Datelike, Timelike};
    use tempfile::TempDir;

    fn roots_for(dir: &Path) -> Arc<Roots> {
        Arc::new(Roots {
            originals: dir.join("originals"),
            import: Some(dir.join("import")),
            sidecar: Some(dir.join("sidecar")),
            examples: None,
        })
    }

    #[test]
    fn test_taken_at_prefers_metadata() {
        let tmp = TempDir::new().unwrap();
        let block = tiff_block(&ExifFixture {
            date_time_original: Some("2010:10:10 10:10:10"),
            ..Default::default()
        });
        let path = write_file(tmp.path(), "originals/20200101_120000.jpg", &jpeg_bytes(Some(&block)));

        let mf = MediaFile::new(&path, roots_for(tmp.path())).unwrap();
        let (taken, src) = mf.taken_at();
        assert_eq!(src, TimeSource::Meta);
        assert_eq!(taken.year(), 2010);
    }

    #[test]
    fn test_taken_at_falls_back_to_name_then_mtime() {
        let tmp = TempDir::new().unwrap();
        let named = write_file(tmp.path(), "originals/20200101_120000.jpg", &jpeg_bytes(None));
        let mf = MediaFile::new(&named, roots_for(tmp.path())).unwrap();
        let (taken, src) = mf.taken_at();
        assert_eq!(src, TimeSource::Name);
        assert_eq!((taken.year(), taken.hour()), (2020, 12));

        let plain = write_file(tmp.path(), "originals/plain.jpg", &jpeg_bytes(None));
        filetime::set_file_mtime(&plain, filetime::FileTime::from_unix_time(1_500_000_000, 0)).unwrap();
        let mf = MediaFile::new(&plain, roots_for(tmp.path())).unwrap();
        let (taken, src) = mf.taken_at();
        assert_eq!(src, TimeSource::Auto);
        assert_eq!(taken.timestamp(), 1_500_000_000);
        assert_eq!(mf.mod_time(), 1_500_000_000);
    }

    #[test]
    fn test_rename_resets_root() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(tmp.path(), "import/a.jpg", &jpeg_bytes(None));

        let mut mf = MediaFile::new(&path, roots_for(tmp.path())).unwrap();
        assert_eq!(mf.root(), Root::Import);
        let hash_before = mf.hash().to_string();

        let dest = tmp.path().join("originals/2020/a.jpg");
        mf.rename(&dest).unwrap();
        assert_eq!(mf.root(), Root::Originals);
        assert_eq!(mf.rel_name(), "2020/a.jpg");
        assert_eq!(mf.hash(), hash_before);
        assert!(dest.exists());
    }

    #[test]
    fn test_dimensions_follow_content_not_extension() {
        let tmp = TempDir::new().unwrap();
        let mut encoded = std::io::Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(40, 30)
            .write_to(&mut encoded, image::ImageFormat::Jpeg)
            .unwrap();
        let bytes = encoded.into_inner();

        let real = write_file(tmp.path(), "originals/real.jpg", &bytes);
        let mislabeled = write_file(tmp.path(), "originals/mislabeled.png", &bytes);

        let mf = MediaFile::new(&real, roots_for(tmp.path())).unwrap();
        assert_eq!(mf.dimensions(), (40, 30));

        let mf = MediaFile::new(&mislabeled, roots_for(tmp.path())).unwrap();
        assert_eq!(mf.file_type(), FileType::Jpeg);
        assert_eq!(mf.dimensions(), (40, 30));
    }

    #[test]
    fn test_time_source_order() {
        assert!(TimeSource::Meta.may_replace(TimeSource::Name));
        assert!(TimeSource::Meta.may_replace(TimeSource::Meta));
        assert!(!TimeSource::Auto.may_replace(TimeSource::Name));
        assert!(!TimeSource::Estimate.may_replace(TimeSource::Auto));
    }
}
