// Catalog record types

use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::ColumnValue;
use crate::config::Root;
use crate::constants::UNKNOWN_ID;
use crate::media::{MediaKind, TimeSource};

/// Where a record's place came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaceSource {
    #[default]
    Auto,
    Meta,
    Estimate,
    Manual,
}

impl PlaceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceSource::Auto => "auto",
            PlaceSource::Meta => "meta",
            PlaceSource::Estimate => "estimate",
            PlaceSource::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> PlaceSource {
        match value {
            "meta" => PlaceSource::Meta,
            "estimate" => PlaceSource::Estimate,
            "manual" => PlaceSource::Manual,
            _ => PlaceSource::Auto,
        }
    }
}

/// Where a record's title came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TitleSource {
    #[default]
    Auto,
    Meta,
    Manual,
}

impl TitleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleSource::Auto => "auto",
            TitleSource::Meta => "meta",
            TitleSource::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> TitleSource {
        match value {
            "meta" => TitleSource::Meta,
            "manual" => TitleSource::Manual,
            _ => TitleSource::Auto,
        }
    }
}

/// A derived label; lower uncertainty means more confident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub uncertainty: u8,
}

impl Label {
    pub fn new(name: impl Into<String>, uncertainty: u8) -> Self {
        Self {
            name: name.into(),
            uncertainty,
        }
    }
}

/// Photo-level catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Storage key; 0 until persisted
    pub id: i64,
    pub uid: String,
    pub taken_at: DateTime<Utc>,
    pub taken_at_local: NaiveDateTime,
    pub taken_src: TimeSource,
    pub time_zone: String,
    pub photo_path: String,
    pub photo_name: String,
    pub original_name: String,
    pub media_type: MediaKind,
    pub title: String,
    pub title_src: TitleSource,
    pub description: String,
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
    pub cell_id: String,
    pub place_id: String,
    pub country: String,
    pub place_src: PlaceSource,
    pub year: i32,
    pub month: i32,
    pub camera_make: String,
    pub camera_model: String,
    pub lens_model: String,
    pub iso: u32,
    pub f_number: f64,
    pub exposure: String,
    pub focal_length: u32,
    pub width: u32,
    pub height: u32,
    pub keywords: Vec<String>,
    pub labels: Vec<Label>,
    pub quality: i32,
    pub document_id: String,
    pub stack_uid: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub maintained_at: Option<DateTime<Utc>>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl Default for PhotoRecord {
    fn default() -> Self {
        let epoch = DateTime::<Utc>::default();
        Self {
            id: 0,
            uid: String::new(),
            taken_at: epoch,
            taken_at_local: epoch.naive_utc(),
            taken_src: TimeSource::Auto,
            time_zone: String::new(),
            photo_path: String::new(),
            photo_name: String::new(),
            original_name: String::new(),
            media_type: MediaKind::Photo,
            title: String::new(),
            title_src: TitleSource::Auto,
            description: String::new(),
            lat: 0.0,
            lng: 0.0,
            altitude: 0.0,
            cell_id: String::new(),
            place_id: UNKNOWN_ID.to_string(),
            country: UNKNOWN_ID.to_string(),
            place_src: PlaceSource::Auto,
            year: 0,
            month: 0,
            camera_make: String::new(),
            camera_model: String::new(),
            lens_model: String::new(),
            iso: 0,
            f_number: 0.0,
            exposure: String::new(),
            focal_length: 0,
            width: 0,
            height: 0,
            keywords: Vec::new(),
            labels: Vec::new(),
            quality: 0,
            document_id: String::new(),
            stack_uid: String::new(),
            updated_at: None,
            maintained_at: None,
            checked_at: None,
        }
    }
}

impl PhotoRecord {
    pub fn new_uid() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    pub fn has_id(&self) -> bool {
        self.id > 0
    }

    /// GPS exactly (0,0) counts as no position
    pub fn has_lat_lng(&self) -> bool {
        self.lat != 0.0 || self.lng != 0.0
    }

    pub fn has_location(&self) -> bool {
        !self.cell_id.is_empty() && self.cell_id != UNKNOWN_ID
    }

    pub fn has_place(&self) -> bool {
        !self.place_id.is_empty() && self.place_id != UNKNOWN_ID
    }

    pub fn unknown_country(&self) -> bool {
        self.country.is_empty() || self.country == UNKNOWN_ID
    }

    pub fn unknown_location(&self) -> bool {
        !self.has_location()
    }

    pub fn has_explicit_title(&self) -> bool {
        !self.title.is_empty() && self.title_src != TitleSource::Auto
    }

    /// Equal apart from bookkeeping timestamps
    pub fn same_content(&self, other: &PhotoRecord) -> bool {
        let strip = |p: &PhotoRecord| PhotoRecord {
            updated_at: None,
            maintained_at: None,
            checked_at: None,
            ..p.clone()
        };
        strip(self) == strip(other)
    }

    /// Every mutable column with its value, for a full update
    pub fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("taken_at", ColumnValue::time(self.taken_at)),
            ("taken_at_local", ColumnValue::local_time(self.taken_at_local)),
            ("taken_src", ColumnValue::text(self.taken_src.as_str())),
            ("time_zone", ColumnValue::text(&self.time_zone)),
            ("photo_path", ColumnValue::text(&self.photo_path)),
            ("photo_name", ColumnValue::text(&self.photo_name)),
            ("original_name", ColumnValue::text(&self.original_name)),
            ("media_type", ColumnValue::text(self.media_type.as_str())),
            ("title", ColumnValue::text(&self.title)),
            ("title_src", ColumnValue::text(self.title_src.as_str())),
            ("description", ColumnValue::text(&self.description)),
            ("lat", ColumnValue::Real(self.lat)),
            ("lng", ColumnValue::Real(self.lng)),
            ("altitude", ColumnValue::Real(self.altitude)),
            ("cell_id", ColumnValue::text(&self.cell_id)),
            ("place_id", ColumnValue::text(&self.place_id)),
            ("country", ColumnValue::text(&self.country)),
            ("place_src", ColumnValue::text(self.place_src.as_str())),
            ("year", ColumnValue::Int(self.year as i64)),
            ("month", ColumnValue::Int(self.month as i64)),
            ("camera_make", ColumnValue::text(&self.camera_make)),
            ("camera_model", ColumnValue::text(&self.camera_model)),
            ("lens_model", ColumnValue::text(&self.lens_model)),
            ("iso", ColumnValue::Int(self.iso as i64)),
            ("f_number", ColumnValue::Real(self.f_number)),
            ("exposure", ColumnValue::text(&self.exposure)),
            ("focal_length", ColumnValue::Int(self.focal_length as i64)),
            ("width", ColumnValue::Int(self.width as i64)),
            ("height", ColumnValue::Int(self.height as i64)),
            ("keywords", ColumnValue::text(&self.keywords.join(", "))),
            ("labels", ColumnValue::text(&labels_to_json(&self.labels))),
            ("quality", ColumnValue::Int(self.quality as i64)),
            ("document_id", ColumnValue::text(&self.document_id)),
            ("stack_uid", ColumnValue::text(&self.stack_uid)),
            ("updated_at", ColumnValue::time(Utc::now())),
        ]
    }

    /// Year and month from the local capture time
    pub fn update_date_fields(&mut self) {
        if self.taken_src == TimeSource::Auto && self.taken_at.timestamp() == 0 {
            self.year = 0;
            self.month = 0;
            return;
        }
        self.year = self.taken_at_local.year();
        self.month = self.taken_at_local.month() as i32;
    }
}

pub fn labels_to_json(labels: &[Label]) -> String {
    serde_json::to_string(labels).unwrap_or_else(|_| "[]".to_string())
}

pub fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn format_local_time(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

pub fn parse_local_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").ok()
}

/// One indexed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub photo_id: i64,
    pub root: String,
    pub path: String,
    pub size: i64,
    pub mod_time: i64,
    pub hash: String,
    pub checksum: String,
    pub file_type: String,
    pub media_kind: String,
    pub mime: String,
    pub is_primary: bool,
    pub width: u32,
    pub height: u32,
    pub metadata_error: Option<String>,
}

impl FileRecord {
    pub fn root(&self) -> Root {
        match self.root.as_str() {
            crate::constants::ROOT_ORIGINALS => Root::Originals,
            crate::constants::ROOT_IMPORT => Root::Import,
            crate::constants::ROOT_SIDECAR => Root::Sidecar,
            crate::constants::ROOT_EXAMPLES => Root::Examples,
            _ => Root::Unknown,
        }
    }
}

/// A directory seen during indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: i64,
    pub root: String,
    pub path: String,
    pub mod_time: i64,
    pub photo_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_position_is_no_location() {
        let photo = PhotoRecord::default();
        assert!(!photo.has_lat_lng());
        assert!(!photo.has_place());
        assert!(photo.unknown_country());
    }

    #[test]
    fn test_same_content_ignores_bookkeeping() {
        let a = PhotoRecord {
            id: 7,
            title: "Beach".to_string(),
            ..Default::default()
        };
        let mut b = a.clone();
        b.checked_at = Some(Utc::now());
        b.updated_at = Some(Utc::now());
        assert!(a.same_content(&b));

        b.quality = 3;
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_time_text_round_trip_format() {
        let t = parse_time("2020-01-02T03:04:05Z").unwrap();
        assert_eq!(format_time(t), "2020-01-02T03:04:05Z");
        assert!(parse_local_time("2020-01-02T03:04:05").is_some());
    }
}
