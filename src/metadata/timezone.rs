// Time zone lookup from GPS coordinates

use std::sync::OnceLock;
use chrono::{DateTime, NaiveDateTime, Utc};
use jiff::civil::DateTime as CivilDateTime;
use tzf_rs::DefaultFinder;

static TZ_FINDER: OnceLock<DefaultFinder> = OnceLock::new();

fn get_finder() -> &'static DefaultFinder {
    TZ_FINDER.get_or_init(DefaultFinder::new)
}

/// IANA zone name for a position; ocean "Etc/GMT+n" zones fall back to a neighbor
pub fn zone_name(lat: f64, lng: f64) -> Option<String> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }

    let finder = get_finder();
    let zone = finder.get_tz_name(lng, lat);
    if !zone.is_empty() && !zone.starts_with("Etc/") {
        return Some(zone.to_string());
    }

    let step = 0.5;
    for (d_lat, d_lng) in [(0.0, step), (0.0, -step), (step, 0.0), (-step, 0.0)] {
        let neighbor = finder.get_tz_name(lng + d_lng, lat + d_lat);
        if !neighbor.is_empty() && !neighbor.starts_with("Etc/") {
            return Some(neighbor.to_string());
        }
    }

    if zone.is_empty() {
        None
    } else {
        Some(zone.to_string())
    }
}

/// Interpret a wall-clock time in the named zone
pub fn local_to_utc(local: NaiveDateTime, zone: &str) -> Option<DateTime<Utc>> {
    let civil: CivilDateTime = local.format("%Y-%m-%dT%H:%M:%S").to_string().parse().ok()?;
    let zoned = civil.in_tz(zone).ok()?;
    DateTime::from_timestamp(zoned.timestamp().as_second(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_zone_for_berlin() {
        assert_eq!(zone_name(52.52, 13.405).as_deref(), Some("Europe/Berlin"));
    }

    #[test]
    fn test_local_to_utc_applies_summer_offset() {
        let local = NaiveDate::from_ymd_opt(2020, 7, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let utc = local_to_utc(local, "Europe/Berlin").unwrap();
        assert_eq!(utc.hour(), 10);
    }

    #[test]
    fn test_out_of_range_position() {
        assert!(zone_name(123.0, 0.0).is_none());
    }
}
