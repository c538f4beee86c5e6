// Metadata extraction module
// Structured container parsers first, brute-force scan when they find
// nothing, then JSON sidecars merged on top.

pub mod container;
pub mod exif_tags;
pub mod fields;
pub mod scan;
pub mod sidecar;
pub mod timezone;

#[cfg(test)]
pub(crate) mod testdata;

use std::path::{Path, PathBuf};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::media::FileType;
use container::{ContainerParser, Probe};
use fields::TagBag;

/// Normalized metadata for one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    // Capture time
    pub taken_at: Option<DateTime<Utc>>,
    pub taken_at_local: Option<NaiveDateTime>,
    pub time_zone: String,

    // Position
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,

    // Camera
    pub camera_make: String,
    pub camera_model: String,
    pub lens_make: String,
    pub lens_model: String,
    pub exposure: String,
    pub f_number: f64,
    pub iso: u32,
    pub focal_length: u32,

    // Image
    pub orientation: u16,
    pub width: u32,
    pub height: u32,

    // Descriptive
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub copyright: String,
    pub artist: String,
    pub document_id: String,
    pub original_name: String,

    /// Every raw tag value by tag name
    pub all: TagBag,

    /// Set when nothing reliable could be extracted
    pub error: Option<String>,
}

impl MetadataRecord {
    pub fn has_time(&self) -> bool {
        self.taken_at.is_some()
    }

    pub fn has_position(&self) -> bool {
        self.lat != 0.0 || self.lng != 0.0
    }

    /// Display width, accounting for rotation
    pub fn actual_width(&self) -> u32 {
        if self.orientation > 4 {
            self.height
        } else {
            self.width
        }
    }

    /// Display height, accounting for rotation
    pub fn actual_height(&self) -> u32 {
        if self.orientation > 4 {
            self.width
        } else {
            self.height
        }
    }

    /// Overlay every field `other` defines
    pub fn merge_from(&mut self, other: &MetadataRecord) {
        if other.taken_at.is_some() {
            self.taken_at = other.taken_at;
            self.taken_at_local = other.taken_at_local;
            self.time_zone = other.time_zone.clone();
        } else if !other.time_zone.is_empty() {
            self.time_zone = other.time_zone.clone();
        }
        if other.has_position() {
            self.lat = other.lat;
            self.lng = other.lng;
        }
        if other.altitude != 0.0 {
            self.altitude = other.altitude;
        }

        merge_string(&mut self.camera_make, &other.camera_make);
        merge_string(&mut self.camera_model, &other.camera_model);
        merge_string(&mut self.lens_make, &other.lens_make);
        merge_string(&mut self.lens_model, &other.lens_model);
        merge_string(&mut self.exposure, &other.exposure);
        merge_string(&mut self.title, &other.title);
        merge_string(&mut self.description, &other.description);
        merge_string(&mut self.copyright, &other.copyright);
        merge_string(&mut self.artist, &other.artist);
        merge_string(&mut self.document_id, &other.document_id);
        merge_string(&mut self.original_name, &other.original_name);

        if other.f_number != 0.0 {
            self.f_number = other.f_number;
        }
        if other.iso != 0 {
            self.iso = other.iso;
        }
        if other.focal_length != 0 {
            self.focal_length = other.focal_length;
        }
        if other.orientation != 0 {
            self.orientation = other.orientation;
        }
        if other.width != 0 && other.height != 0 {
            self.width = other.width;
            self.height = other.height;
        }
        if !other.keywords.is_empty() {
            self.keywords = other.keywords.clone();
        }

        for (k, v) in &other.all {
            self.all.insert(k.clone(), v.clone());
        }
    }

    /// Derive UTC from the GPS time zone when no explicit offset was present
    pub fn resolve_time_zone(&mut self) {
        let Some(local) = self.taken_at_local else {
            return;
        };
        if !self.time_zone.is_empty() || !self.has_position() {
            return;
        }
        let Some(zone) = timezone::zone_name(self.lat, self.lng) else {
            log::debug!("Metadata: no time zone for {}, {}", self.lat, self.lng);
            return;
        };
        if let Some(utc) = timezone::local_to_utc(local, &zone) {
            self.taken_at = Some(utc);
            self.time_zone = zone;
        }
    }
}

fn merge_string(target: &mut String, value: &str) {
    if !value.is_empty() {
        *target = value.to_string();
    }
}

/// Extract metadata using the default parser cascade
pub fn extract(path: &Path, file_type: FileType) -> MetadataRecord {
    Extractor::new().extract(path, file_type, &[])
}

/// Ordered container parsers plus brute-force fallback
pub struct Extractor {
    parsers: Vec<Box<dyn ContainerParser>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            parsers: container::default_parsers(),
        }
    }

    pub fn with_parsers(parsers: Vec<Box<dyn ContainerParser>>) -> Self {
        Self { parsers }
    }

    /// Build the record for a file; never fails, errors land in `record.error`
    ///
    /// `sidecar_dirs` are extra folders searched for a legacy `name.json`.
    pub fn extract(
        &self,
        path: &Path,
        file_type: FileType,
        sidecar_dirs: &[PathBuf],
    ) -> MetadataRecord {
        let mut record = if file_type.exif_supported() {
            match self.embedded_tags(path, file_type) {
                Ok(tags) => fields::record_from_tags(&tags),
                Err(e) => {
                    log::debug!("Metadata: {} ({})", e, path.display());
                    MetadataRecord {
                        error: Some(e.to_string()),
                        ..Default::default()
                    }
                }
            }
        } else {
            MetadataRecord {
                error: Some(format!("no embedded metadata in {} files", file_type.as_str())),
                ..Default::default()
            }
        };

        let media_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for json in sidecar::candidates(path, sidecar_dirs) {
            if !json.is_file() {
                continue;
            }
            match sidecar::read_sidecar(&json, &media_name) {
                Ok(tags) => {
                    let overlay = fields::record_from_tags(&tags);
                    record.merge_from(&overlay);
                    record.error = None;
                }
                Err(e) => log::warn!("Metadata: {}", e),
            }
        }

        record.resolve_time_zone();
        record
    }

    /// Run the structured parsers; scan only when all of them found nothing
    fn embedded_tags(&self, path: &Path, file_type: FileType) -> Result<TagBag> {
        for parser in self.parsers.iter().filter(|p| p.accepts(file_type)) {
            match parser.try_extract(path)? {
                Probe::Found(block) => return exif_tags::decode_block(block),
                Probe::Absent => {
                    log::debug!("Metadata: {} parser found no block in {}", parser.name(), path.display());
                }
            }
        }

        match scan::find_block(path)? {
            Some(block) => exif_tags::decode_block(block),
            None => Err(CatalogError::Metadata("no exif header found".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use tempfile::TempDir;
    use super::testdata::{jpeg_bytes, tiff_block, write_file, ExifFixture};

    struct BrokenParser;

    impl ContainerParser for BrokenParser {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn accepts(&self, _file_type: FileType) -> bool {
            true
        }
        fn try_extract(&self, _path: &Path) -> Result<Probe> {
            Err(CatalogError::Metadata("corrupt container".to_string()))
        }
    }

    #[test]
    fn test_extract_jpeg_with_exif() {
        let tmp = TempDir::new().unwrap();
        let block = tiff_block(&ExifFixture {
            make: Some("Canon"),
            model: Some("EOS R5"),
            orientation: Some(6),
            date_time_original: Some("2021:03:04 05:06:07"),
            pixel_size: Some((4000, 3000)),
            ..Default::default()
        });
        let path = write_file(tmp.path(), "IMG_1.JPG", &jpeg_bytes(Some(&block)));

        let record = extract(&path, FileType::Jpeg);
        assert!(record.error.is_none());
        assert_eq!(record.camera_model, "EOS R5");
        assert_eq!(record.taken_at_local.unwrap().hour(), 5);
        assert_eq!(record.actual_width(), 3000);
        assert_eq!(record.actual_height(), 4000);
    }

    #[test]
    fn test_no_metadata_is_error_marker_not_failure() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(tmp.path(), "plain.jpg", &jpeg_bytes(None));

        let record = extract(&path, FileType::Jpeg);
        assert!(record.error.is_some());
        assert!(record.taken_at.is_none());
        assert_eq!(record.camera_make, "");
    }

    #[test]
    fn test_corrupt_container_skips_scan() {
        let tmp = TempDir::new().unwrap();
        let block = tiff_block(&ExifFixture {
            make: Some("Canon"),
            ..Default::default()
        });
        let path = write_file(tmp.path(), "IMG_2.JPG", &jpeg_bytes(Some(&block)));

        let extractor = Extractor::with_parsers(vec![Box::new(BrokenParser)]);
        let record = extractor.extract(&path, FileType::Jpeg, &[]);
        assert_eq!(record.error.as_deref(), Some("Metadata error: corrupt container"));
        assert_eq!(record.camera_make, "");
    }

    #[test]
    fn test_absent_block_falls_back_to_scan() {
        let tmp = TempDir::new().unwrap();
        let block = tiff_block(&ExifFixture {
            model: Some("X100V"),
            ..Default::default()
        });
        let mut data = b"FUJIFILMCCD-RAW 0201 header".to_vec();
        data.extend_from_slice(b"Exif\0\0");
        data.extend_from_slice(&block);
        let path = write_file(tmp.path(), "DSCF0001.RAF", &data);

        let record = extract(&path, FileType::Raw);
        assert!(record.error.is_none());
        assert_eq!(record.camera_model, "X100V");
    }

    #[test]
    fn test_sidecar_overrides_embedded_fields() {
        let tmp = TempDir::new().unwrap();
        let block = tiff_block(&ExifFixture {
            make: Some("Canon"),
            date_time_original: Some("2021:03:04 05:06:07"),
            ..Default::default()
        });
        let path = write_file(tmp.path(), "IMG_3.JPG", &jpeg_bytes(Some(&block)));
        write_file(
            tmp.path(),
            "IMG_3.JPG.json",
            br#"{"OriginalFileName": "IMG_3.JPG", "Title": "Harbor", "Make": "Nikon"}"#,
        );

        let record = extract(&path, FileType::Jpeg);
        assert_eq!(record.title, "Harbor");
        assert_eq!(record.camera_make, "Nikon");
        assert_eq!(record.taken_at_local.unwrap().hour(), 5);
    }

    #[test]
    fn test_sidecar_clears_error_and_supplies_create_date() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(tmp.path(), "clip.jpg", &jpeg_bytes(None));
        write_file(
            tmp.path(),
            "clip.json",
            br#"{"OriginalFileName": "clip.jpg", "CreateDate": "2015:02:04 10:11:12"}"#,
        );

        let record = extract(&path, FileType::Jpeg);
        assert!(record.error.is_none());
        assert_eq!(record.taken_at_local.unwrap().minute(), 11);
    }

    #[test]
    fn test_legacy_sidecars_in_hidden_folder_and_mirror() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(tmp.path(), "originals/2015/IMG_9.jpg", &jpeg_bytes(None));
        write_file(
            tmp.path(),
            "originals/2015/.mediacat/IMG_9.json",
            br#"{"OriginalFileName": "IMG_9.jpg", "Title": "Pier"}"#,
        );
        let mirror = tmp.path().join("sidecar/2015");
        write_file(
            &mirror,
            "IMG_9.json",
            br#"{"OriginalFileName": "IMG_9.jpg", "Make": "Leica"}"#,
        );

        let record = Extractor::new().extract(&path, FileType::Jpeg, &[mirror.clone()]);
        assert!(record.error.is_none());
        assert_eq!(record.title, "Pier");
        assert_eq!(record.camera_make, "Leica");

        // A legacy sidecar for another file is still rejected
        write_file(
            &mirror,
            "IMG_9.json",
            br#"{"OriginalFileName": "IMG_9.heic", "Make": "Sony"}"#,
        );
        let record = Extractor::new().extract(&path, FileType::Jpeg, &[mirror]);
        assert_eq!(record.camera_make, "");
    }

    #[test]
    fn test_gps_derives_time_zone() {
        let tmp = TempDir::new().unwrap();
        let block = tiff_block(&ExifFixture {
            date_time_original: Some("2020:07:01 12:00:00"),
            gps: Some((52.52, 13.405)),
            ..Default::default()
        });
        let path = write_file(tmp.path(), "berlin.jpg", &jpeg_bytes(Some(&block)));

        let record = extract(&path, FileType::Jpeg);
        assert_eq!(record.time_zone, "Europe/Berlin");
        assert_eq!(record.taken_at_local.unwrap().hour(), 12);
        assert_eq!(record.taken_at.unwrap().hour(), 10);
    }
}
