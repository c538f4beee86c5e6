// Decode a raw EXIF (TIFF) block into a tag bag

use exif::{In, Tag, Value};

use super::fields::TagBag;
use crate::error::{CatalogError, Result};

// Skip maker notes and other large blobs
const MAX_TAG_SIZE: usize = 1024;

/// Decode a TIFF-structured EXIF block
pub fn decode_block(block: Vec<u8>) -> Result<TagBag> {
    let exif = exif::Reader::new()
        .read_raw(block)
        .map_err(|e| CatalogError::Metadata(format!("invalid exif block: {}", e)))?;

    Ok(tags_from_exif(&exif))
}

/// Collect primary-image tags by name; GPS is normalized to signed decimals
pub fn tags_from_exif(exif: &exif::Exif) -> TagBag {
    let mut tags = TagBag::new();

    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY {
            continue;
        }
        let name = field.tag.to_string();
        if let Some(value) = value_to_string(field.tag, &field.value) {
            tags.insert(name, value);
        }
    }

    if let Some((lat, lng)) = gps_lat_lon(exif) {
        tags.insert("GPSLatitude".to_string(), format!("{:.7}", lat));
        tags.insert("GPSLongitude".to_string(), format!("{:.7}", lng));
        tags.remove("GPSLatitudeRef");
        tags.remove("GPSLongitudeRef");
    } else {
        tags.remove("GPSLatitude");
        tags.remove("GPSLongitude");
    }

    if let Some(alt) = gps_altitude(exif) {
        tags.insert("GPSAltitude".to_string(), format!("{:.1}", alt));
    }

    tags
}

fn value_to_string(tag: Tag, value: &Value) -> Option<String> {
    let text = match value {
        Value::Ascii(parts) => parts
            .iter()
            .filter_map(|bytes| std::str::from_utf8(bytes).ok())
            .collect::<Vec<_>>()
            .join(" ")
            .replace('\0', "")
            .trim()
            .to_string(),
        Value::Short(_) | Value::Long(_) | Value::Byte(_) => {
            value.get_uint(0).map(|v| v.to_string()).unwrap_or_default()
        }
        Value::Rational(rats) if tag == Tag::ExposureTime => {
            let r = rats.first().filter(|r| r.denom != 0)?;
            if r.num == 0 {
                return None;
            }
            if r.num >= r.denom {
                format!("{}", r.to_f64())
            } else {
                format!("1/{}", (r.denom as f64 / r.num as f64).round() as u64)
            }
        }
        Value::Rational(rats) => {
            let r = rats.first().filter(|r| r.denom != 0)?;
            format!("{}", r.to_f64())
        }
        Value::SRational(rats) => {
            let r = rats.first().filter(|r| r.denom != 0)?;
            format!("{}", r.to_f64())
        }
        Value::Undefined(bytes, _) => {
            if bytes.len() > MAX_TAG_SIZE {
                return None;
            }
            let s = std::str::from_utf8(bytes).ok()?;
            s.replace('\0', "").trim().to_string()
        }
        _ => value.display_as(tag).to_string(),
    };

    if text.is_empty() || text.len() > MAX_TAG_SIZE {
        None
    } else {
        Some(text)
    }
}

/// GPS position as signed decimal degrees
pub fn gps_lat_lon(exif: &exif::Exif) -> Option<(f64, f64)> {
    let lat_field = exif.get_field(Tag::GPSLatitude, In::PRIMARY)?;
    let lon_field = exif.get_field(Tag::GPSLongitude, In::PRIMARY)?;

    let mut lat = dms_to_decimal(&lat_field.value)?;
    let mut lon = dms_to_decimal(&lon_field.value)?;

    if ref_is(exif, Tag::GPSLatitudeRef, b'S') {
        lat = -lat;
    }
    if ref_is(exif, Tag::GPSLongitudeRef, b'W') {
        lon = -lon;
    }

    Some((lat, lon))
}

fn ref_is(exif: &exif::Exif, tag: Tag, expected: u8) -> bool {
    match exif.get_field(tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Ascii(parts)) => parts
            .first()
            .and_then(|p| p.first())
            .map(|c| c.eq_ignore_ascii_case(&expected))
            .unwrap_or(false),
        _ => false,
    }
}

fn dms_to_decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Rational(rats) if rats.len() >= 3 => {
            if rats.iter().take(3).any(|r| r.denom == 0) {
                return None;
            }
            Some(rats[0].to_f64() + rats[1].to_f64() / 60.0 + rats[2].to_f64() / 3600.0)
        }
        _ => None,
    }
}

fn gps_altitude(exif: &exif::Exif) -> Option<f64> {
    let field = exif.get_field(Tag::GPSAltitude, In::PRIMARY)?;
    let Value::Rational(rats) = &field.value else {
        return None;
    };
    let r = rats.first().filter(|r| r.denom != 0)?;
    let mut alt = r.to_f64();

    let below_sea_level = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        == Some(1);
    if below_sea_level {
        alt = -alt;
    }
    Some(alt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::testdata::{tiff_block, ExifFixture};

    #[test]
    fn test_decode_block_reads_primary_tags() {
        let block = tiff_block(&ExifFixture {
            make: Some("Apple"),
            model: Some("iPhone 12"),
            orientation: Some(6),
            date_time_original: Some("2020:01:01 16:28:23"),
            gps: Some((52.5, 13.25)),
            ..Default::default()
        });

        let tags = decode_block(block).unwrap();
        assert_eq!(tags.get("Make").map(String::as_str), Some("Apple"));
        assert_eq!(tags.get("Model").map(String::as_str), Some("iPhone 12"));
        assert_eq!(tags.get("Orientation").map(String::as_str), Some("6"));
        assert_eq!(
            tags.get("DateTimeOriginal").map(String::as_str),
            Some("2020:01:01 16:28:23")
        );
        assert_eq!(tags.get("GPSLatitude").map(String::as_str), Some("52.5000000"));
        assert_eq!(tags.get("GPSLongitude").map(String::as_str), Some("13.2500000"));
    }

    #[test]
    fn test_garbage_block_is_metadata_error() {
        let err = decode_block(b"not a tiff header".to_vec()).unwrap_err();
        assert!(matches!(err, CatalogError::Metadata(_)));
    }
}
