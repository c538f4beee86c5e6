// Cell, place and country from GPS coordinates

use std::sync::OnceLock;

use country_boundaries::{CountryBoundaries, LatLon, BOUNDARIES_ODBL_360X180};

use crate::catalog::PhotoRecord;
use crate::constants::{CELL_PRECISION, PLACE_PRECISION, UNKNOWN_ID};

static BOUNDARIES: OnceLock<Option<CountryBoundaries>> = OnceLock::new();

fn boundaries() -> Option<&'static CountryBoundaries> {
    BOUNDARIES
        .get_or_init(|| match CountryBoundaries::from_reader(BOUNDARIES_ODBL_360X180) {
            Ok(b) => Some(b),
            Err(e) => {
                log::error!("Location: can't load country boundaries: {}", e);
                None
            }
        })
        .as_ref()
}

/// Lowercase ISO country code at a position
pub fn country_at(lat: f64, lng: f64) -> Option<String> {
    let pos = LatLon::new(lat, lng).ok()?;
    let ids = boundaries()?.ids(pos);
    ids.iter()
        .find(|id| id.len() == 2)
        .map(|id| id.to_lowercase())
}

pub fn cell_id(lat: f64, lng: f64) -> String {
    format!("{:.*}:{:.*}", CELL_PRECISION, lat, CELL_PRECISION, lng)
}

pub fn place_id(country: &str, lat: f64, lng: f64) -> String {
    format!("{}:{:.*}:{:.*}", country, PLACE_PRECISION, lat, PLACE_PRECISION, lng)
}

/// Derive cell, place and country; returns false without coordinates
pub fn update_location(photo: &mut PhotoRecord) -> bool {
    if !photo.has_lat_lng() {
        return false;
    }

    let country = country_at(photo.lat, photo.lng).unwrap_or_else(|| {
        log::debug!("Location: no country at {:.4},{:.4}", photo.lat, photo.lng);
        UNKNOWN_ID.to_string()
    });

    photo.cell_id = cell_id(photo.lat, photo.lng);
    photo.place_id = place_id(&country, photo.lat, photo.lng);
    photo.country = country;
    true
}
