// Tag-name priority lists and the mapping from a raw tag bag to a record

use std::collections::BTreeMap;
use std::sync::OnceLock;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;

use super::MetadataRecord;
use crate::constants::{MAX_PLAUSIBLE_YEAR, MIN_PLAUSIBLE_YEAR};

/// Raw tag values keyed by tag name
pub type TagBag = BTreeMap<String, String>;

pub const TAKEN_AT: &[&str] = &[
    "DateTimeOriginal",
    "CreateDate",
    "MediaCreateDate",
    "DateTimeDigitized",
    "DateTime",
];
pub const TIME_OFFSET: &[&str] = &["OffsetTimeOriginal", "OffsetTime", "OffsetTimeDigitized"];
pub const TIME_ZONE: &[&str] = &["TimeZone"];
pub const CAMERA_MAKE: &[&str] = &["CameraMake", "Make"];
pub const CAMERA_MODEL: &[&str] = &["CameraModel", "Model"];
pub const LENS_MAKE: &[&str] = &["LensMake"];
pub const LENS_MODEL: &[&str] = &["Lens", "LensModel"];
pub const WIDTH: &[&str] = &["PixelXDimension", "ImageWidth", "ExifImageWidth", "SourceImageWidth"];
pub const HEIGHT: &[&str] = &[
    "PixelYDimension",
    "ImageHeight",
    "ImageLength",
    "ExifImageHeight",
    "SourceImageHeight",
];
pub const ORIENTATION: &[&str] = &["Orientation"];
pub const EXPOSURE: &[&str] = &["ExposureTime", "ShutterSpeedValue", "ShutterSpeed"];
pub const F_NUMBER: &[&str] = &["FNumber", "Aperture"];
pub const ISO: &[&str] = &["ISO", "PhotographicSensitivity", "ISOSpeedRatings"];
pub const FOCAL_LENGTH: &[&str] = &["FocalLength"];
pub const TITLE: &[&str] = &["Title", "Headline"];
pub const DESCRIPTION: &[&str] = &["Description", "ImageDescription", "Caption-Abstract"];
pub const KEYWORDS: &[&str] = &["Keywords", "Subject"];
pub const COPYRIGHT: &[&str] = &["Rights", "Copyright"];
pub const ARTIST: &[&str] = &["Artist", "Creator"];
pub const LATITUDE: &[&str] = &["GPSLatitude"];
pub const LONGITUDE: &[&str] = &["GPSLongitude"];
pub const ALTITUDE: &[&str] = &["GPSAltitude"];
pub const DOCUMENT_ID: &[&str] = &["DocumentID", "ImageUniqueID"];
pub const ORIGINAL_NAME: &[&str] = &["OriginalFileName", "SourceFile", "FileName"];

static DATETIME: OnceLock<Option<Regex>> = OnceLock::new();
static NUMBER: OnceLock<Option<Regex>> = OnceLock::new();

/// First tag in `names` with a non-empty value
pub fn first<'a>(tags: &'a TagBag, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| tags.get(*name))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

/// First tag in `names` whose value parses
fn first_parsed<T>(tags: &TagBag, names: &[&str], parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    names
        .iter()
        .filter_map(|name| tags.get(*name))
        .find_map(|v| parse(v.trim()))
}

/// Build a record from a tag bag; fields without a matching tag stay at zero
pub fn record_from_tags(tags: &TagBag) -> MetadataRecord {
    let mut record = MetadataRecord::default();

    if let Some((local, offset)) = first_parsed(tags, TAKEN_AT, parse_datetime) {
        let offset = offset.or_else(|| first_parsed(tags, TIME_OFFSET, parse_offset));
        record.set_local_time(local, offset);
    }
    if record.time_zone.is_empty() {
        if let Some(zone) = first(tags, TIME_ZONE) {
            record.time_zone = zone.to_string();
        }
    }

    record.camera_make = first(tags, CAMERA_MAKE).unwrap_or_default().to_string();
    record.camera_model = first(tags, CAMERA_MODEL).unwrap_or_default().to_string();
    record.lens_make = first(tags, LENS_MAKE).unwrap_or_default().to_string();
    record.lens_model = first(tags, LENS_MODEL).unwrap_or_default().to_string();

    record.width = first_parsed(tags, WIDTH, parse_u32).unwrap_or(0);
    record.height = first_parsed(tags, HEIGHT, parse_u32).unwrap_or(0);
    record.orientation = first_parsed(tags, ORIENTATION, parse_u32)
        .filter(|o| (1..=8).contains(o))
        .unwrap_or(0) as u16;

    record.exposure = first(tags, EXPOSURE).unwrap_or_default().to_string();
    record.f_number = first_parsed(tags, F_NUMBER, parse_f64).unwrap_or(0.0);
    record.iso = first_parsed(tags, ISO, parse_u32).unwrap_or(0);
    record.focal_length = first_parsed(tags, FOCAL_LENGTH, parse_f64)
        .map(|f| f.round() as u32)
        .unwrap_or(0);

    record.title = first(tags, TITLE).unwrap_or_default().to_string();
    record.description = first(tags, DESCRIPTION).unwrap_or_default().to_string();
    record.keywords = first(tags, KEYWORDS).map(split_keywords).unwrap_or_default();
    record.copyright = first(tags, COPYRIGHT).unwrap_or_default().to_string();
    record.artist = first(tags, ARTIST).unwrap_or_default().to_string();
    record.document_id = first(tags, DOCUMENT_ID).unwrap_or_default().to_string();
    record.original_name = first(tags, ORIGINAL_NAME)
        .map(|n| n.rsplit(['/', '\\']).next().unwrap_or(n).to_string())
        .unwrap_or_default();

    let lat = first_parsed(tags, LATITUDE, parse_coordinate);
    let lng = first_parsed(tags, LONGITUDE, parse_coordinate);
    if let (Some(mut lat), Some(mut lng)) = (lat, lng) {
        if hemisphere_is(tags, "GPSLatitudeRef", 'S') && lat > 0.0 {
            lat = -lat;
        }
        if hemisphere_is(tags, "GPSLongitudeRef", 'W') && lng > 0.0 {
            lng = -lng;
        }
        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
            record.lat = lat;
            record.lng = lng;
        }
    }
    record.altitude = first_parsed(tags, ALTITUDE, parse_f64).unwrap_or(0.0);

    record.all = tags.clone();
    record
}

fn hemisphere_is(tags: &TagBag, name: &str, hemisphere: char) -> bool {
    tags.get(name)
        .and_then(|v| v.trim().chars().next())
        .map(|c| c.eq_ignore_ascii_case(&hemisphere))
        .unwrap_or(false)
}

fn split_keywords(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Parse "2020:01:01 16:28:23", "2020-01-01T16:28:23.123+01:00" and friends.
/// Returns the wall-clock time and the offset if one was attached.
pub fn parse_datetime(value: &str) -> Option<(NaiveDateTime, Option<FixedOffset>)> {
    let re = DATETIME
        .get_or_init(|| {
            Regex::new(
                r"^(\d{4})[:\-](\d{2})[:\-](\d{2})(?:[ T](\d{2}):(\d{2})(?::(\d{2}))?(?:\.\d+)?)?\s*(Z|[+\-]\d{2}:?\d{2})?",
            )
            .ok()
        })
        .as_ref()?;

    let caps = re.captures(value.trim())?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = num(1)? as i32;
    if !(MIN_PLAUSIBLE_YEAR..=MAX_PLAUSIBLE_YEAR).contains(&year) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?;
    let time = match num(4) {
        Some(h) => NaiveTime::from_hms_opt(h, num(5)?, num(6).unwrap_or(0))?,
        None => NaiveTime::from_hms_opt(12, 0, 0)?,
    };

    let offset = caps.get(7).and_then(|m| parse_offset(m.as_str()));
    Some((NaiveDateTime::new(date, time), offset))
}

/// Parse "Z", "+01:00" or "-0530"
pub fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.chars().next()? {
        '+' => (1, &value[1..]),
        '-' => (-1, &value[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn numbers(value: &str) -> Vec<f64> {
    let Some(re) = NUMBER
        .get_or_init(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").ok())
        .as_ref()
    else {
        return Vec::new();
    };
    re.find_iter(value)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

pub fn parse_f64(value: &str) -> Option<f64> {
    // "1/50" style rationals
    if let Some((num, denom)) = value.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let denom: f64 = denom.trim().parse().ok()?;
        return if denom == 0.0 { None } else { Some(num / denom) };
    }
    numbers(value).first().copied()
}

pub fn parse_u32(value: &str) -> Option<u32> {
    parse_f64(value).filter(|v| *v >= 0.0).map(|v| v.round() as u32)
}

/// Decimal degrees from "52.5", "-13.4" or "52 deg 30' 0.00\" N"
pub fn parse_coordinate(value: &str) -> Option<f64> {
    let parts = numbers(value);
    let magnitude = match parts.as_slice() {
        [] => return None,
        [d] => *d,
        [d, m] => d.abs() + m / 60.0,
        [d, m, s, ..] => d.abs() + m / 60.0 + s / 3600.0,
    };

    let negative = value.trim_start().starts_with('-')
        || value.trim_end().ends_with(['S', 's', 'W', 'w']);
    if negative && magnitude > 0.0 {
        Some(-magnitude.abs())
    } else {
        Some(magnitude)
    }
}

impl MetadataRecord {
    /// Set wall-clock capture time; an offset pins the UTC instant
    pub fn set_local_time(&mut self, local: NaiveDateTime, offset: Option<FixedOffset>) {
        self.taken_at_local = Some(local);
        match offset.and_then(|o| o.from_local_datetime(&local).single()) {
            Some(fixed) => {
                self.taken_at = Some(fixed.with_timezone(&Utc));
                self.time_zone = fixed.offset().to_string();
            }
            None => {
                self.taken_at = Some(Utc.from_utc_datetime(&local));
                self.time_zone.clear();
            }
        }
    }
}
