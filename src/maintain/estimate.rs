// Place estimation from neighbours in time
// Only records whose place came from metadata or a person act as anchors,
// so estimates never chain off other estimates.

use crate::catalog::{Catalog, NearestFilter, PhotoRecord, PlaceSource};
use crate::config::EstimateSettings;
use crate::error::Result;
use crate::media::naming::is_generated;

use super::country::country_code;

pub struct Estimator<'a> {
    catalog: &'a dyn Catalog,
    settings: &'a EstimateSettings,
}

impl<'a> Estimator<'a> {
    pub fn new(catalog: &'a dyn Catalog, settings: &'a EstimateSettings) -> Self {
        Self { catalog, settings }
    }

    /// Nothing to estimate if the record has coordinates or a trusted place
    fn has_trusted_place(photo: &PhotoRecord) -> bool {
        photo.has_lat_lng()
            || photo.has_location()
            || (photo.has_place()
                && photo.place_src != PlaceSource::Auto
                && photo.place_src != PlaceSource::Estimate)
    }

    fn nearest_anchor(&self, photo: &PhotoRecord) -> Result<Option<PhotoRecord>> {
        let filter = NearestFilter::anchored(photo.taken_at, photo.id);
        self.catalog
            .find_nearest_in_time(&filter, self.catalog.distance_expr())
    }

    /// Copy place and country from the nearest anchor within the place window
    pub fn estimate_place(&self, photo: &mut PhotoRecord) -> Result<bool> {
        if Self::has_trusted_place(photo) {
            return Ok(false);
        }

        let Some(anchor) = self.nearest_anchor(photo)? else {
            log::debug!("Estimate: no place anchor for {} at {}", photo.uid, photo.taken_at);
            return Ok(self.settings.country_fallback && self.estimate_country(photo));
        };

        let hours = (anchor.taken_at - photo.taken_at).num_hours();
        if hours.abs() > self.settings.place_window_hours {
            log::debug!("Estimate: can't estimate place of {}, {} hours time difference", photo.uid, hours);
            return Ok(self.settings.country_fallback && self.estimate_country(photo));
        }

        Ok(copy_place(photo, &anchor))
    }

    /// Coarser variant with a window in days and no country fallback
    pub fn estimate_position(&self, photo: &mut PhotoRecord) -> Result<bool> {
        if Self::has_trusted_place(photo) {
            return Ok(false);
        }

        let Some(anchor) = self.nearest_anchor(photo)? else {
            log::debug!("Estimate: no position anchor for {}", photo.uid);
            return Ok(false);
        };

        let days = (anchor.taken_at - photo.taken_at).num_days();
        if days.abs() > self.settings.position_window_days {
            log::debug!("Estimate: can't estimate position of {}, {} days time difference", photo.uid, days);
            return Ok(false);
        }

        Ok(copy_place(photo, &anchor))
    }

    /// Guess the country from title, name and path
    pub fn estimate_country(&self, photo: &mut PhotoRecord) -> bool {
        if photo.has_lat_lng()
            || photo.has_location()
            || photo.has_place()
            || (!photo.unknown_country()
                && photo.place_src != PlaceSource::Auto
                && photo.place_src != PlaceSource::Estimate)
        {
            return false;
        }

        let code = country_code(&photo.title)
            .or_else(|| {
                if is_generated(&photo.photo_name) {
                    None
                } else {
                    country_code(&photo.photo_name)
                }
            })
            .or_else(|| country_code(&photo.photo_path))
            .or_else(|| {
                if photo.original_name.is_empty() || is_generated(&photo.original_name) {
                    None
                } else {
                    country_code(&photo.original_name)
                }
            });

        match code {
            Some(code) if photo.country != code || photo.place_src != PlaceSource::Estimate => {
                photo.country = code.to_string();
                photo.place_src = PlaceSource::Estimate;
                log::debug!("Estimate: probable country for {} is {}", photo.uid, code);
                true
            }
            _ => false,
        }
    }
}

fn copy_place(photo: &mut PhotoRecord, anchor: &PhotoRecord) -> bool {
    if photo.place_id == anchor.place_id
        && photo.country == anchor.country
        && photo.place_src == PlaceSource::Estimate
    {
        return false;
    }

    photo.place_id = anchor.place_id.clone();
    photo.country = anchor.country.clone();
    photo.place_src = PlaceSource::Estimate;
    log::debug!("Estimate: approximate place of {} is {}", photo.uid, anchor.place_id);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalog;
    use crate::config::DistanceExpr;
    use crate::constants::UNKNOWN_ID;
    use crate::media::TimeSource;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap()
    }

    fn anchor(catalog: &SqliteCatalog, offset: Duration, place: &str, src: PlaceSource) -> PhotoRecord {
        let mut photo = PhotoRecord {
            taken_at: base_time() + offset,
            taken_src: TimeSource::Meta,
            place_id: place.to_string(),
            country: place.split(':').next().unwrap_or(UNKNOWN_ID).to_string(),
            place_src: src,
            ..Default::default()
        };
        catalog.create_photo(&mut photo).unwrap();
        photo
    }

    fn candidate(catalog: &SqliteCatalog) -> PhotoRecord {
        let mut photo = PhotoRecord {
            taken_at: base_time(),
            taken_src: TimeSource::Meta,
            photo_name: "IMG_0001".to_string(),
            ..Default::default()
        };
        catalog.create_photo(&mut photo).unwrap();
        photo
    }

    #[test]
    fn test_place_copied_within_window() {
        let catalog = SqliteCatalog::open_in_memory(DistanceExpr::JulianDay).unwrap();
        anchor(&catalog, Duration::hours(30), "de:52.5:13.4", PlaceSource::Meta);
        let mut photo = candidate(&catalog);

        let settings = EstimateSettings::default();
        let estimator = Estimator::new(&catalog, &settings);
        assert!(estimator.estimate_place(&mut photo).unwrap());
        assert_eq!(photo.place_id, "de:52.5:13.4");
        assert_eq!(photo.country, "de");
        assert_eq!(photo.place_src, PlaceSource::Estimate);

        // Same anchor again changes nothing
        assert!(!estimator.estimate_place(&mut photo).unwrap());
    }

    #[test]
    fn test_place_rejected_outside_window_falls_back_to_country() {
        let catalog = SqliteCatalog::open_in_memory(DistanceExpr::JulianDay).unwrap();
        anchor(&catalog, Duration::hours(-40), "de:52.5:13.4", PlaceSource::Meta);
        let mut photo = candidate(&catalog);
        photo.photo_path = "2021/Trip to Portugal".to_string();

        let settings = EstimateSettings::default();
        let estimator = Estimator::new(&catalog, &settings);
        assert!(estimator.estimate_place(&mut photo).unwrap());
        assert_eq!(photo.place_id, UNKNOWN_ID);
        assert_eq!(photo.country, "pt");
        assert_eq!(photo.place_src, PlaceSource::Estimate);
    }

    #[test]
    fn test_estimated_records_are_not_anchors() {
        let catalog = SqliteCatalog::open_in_memory(DistanceExpr::JulianDay).unwrap();
        anchor(&catalog, Duration::hours(1), "fr:48.9:2.4", PlaceSource::Estimate);
        let mut photo = candidate(&catalog);

        let settings = EstimateSettings::default();
        let estimator = Estimator::new(&catalog, &settings);
        assert!(!estimator.estimate_place(&mut photo).unwrap());
        assert_eq!(photo.place_id, UNKNOWN_ID);
    }

    #[test]
    fn test_zero_gps_is_not_a_location() {
        let catalog = SqliteCatalog::open_in_memory(DistanceExpr::JulianDay).unwrap();
        anchor(&catalog, Duration::hours(2), "it:41.9:12.5", PlaceSource::Meta);
        let mut photo = candidate(&catalog);
        photo.lat = 0.0;
        photo.lng = 0.0;

        let settings = EstimateSettings::default();
        let estimator = Estimator::new(&catalog, &settings);
        assert!(estimator.estimate_place(&mut photo).unwrap());
        assert_eq!(photo.country, "it");
    }

    #[test]
    fn test_position_window_in_days() {
        let catalog = SqliteCatalog::open_in_memory(DistanceExpr::DayDiff).unwrap();
        anchor(&catalog, Duration::days(5), "es:40.4:-3.7", PlaceSource::Manual);
        let settings = EstimateSettings::default();
        let estimator = Estimator::new(&catalog, &settings);

        let mut near = candidate(&catalog);
        assert!(estimator.estimate_position(&mut near).unwrap());
        assert_eq!(near.country, "es");

        let far_settings = EstimateSettings {
            position_window_days: 3,
            ..Default::default()
        };
        let strict = Estimator::new(&catalog, &far_settings);
        let mut other = candidate(&catalog);
        assert!(!strict.estimate_position(&mut other).unwrap());
    }

    #[test]
    fn test_country_skips_generated_names() {
        let catalog = SqliteCatalog::open_in_memory(DistanceExpr::JulianDay).unwrap();
        let settings = EstimateSettings::default();
        let estimator = Estimator::new(&catalog, &settings);

        let mut generated = PhotoRecord {
            photo_name: "IMG_1234".to_string(),
            original_name: "DSC0001.jpg".to_string(),
            ..Default::default()
        };
        assert!(!estimator.estimate_country(&mut generated));

        let mut named = PhotoRecord {
            photo_name: "sunset over malta".to_string(),
            ..Default::default()
        };
        assert!(estimator.estimate_country(&mut named));
        assert_eq!(named.country, "mt");
    }
}
