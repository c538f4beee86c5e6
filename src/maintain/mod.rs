// Enrichment pass
// Re-derives location, labels, title, keywords, quality and stacks for
// stored records. A record that comes out unchanged only gets its
// checked/maintained timestamp touched.

pub mod country;
pub mod estimate;
pub mod labels;
pub mod location;
pub mod quality;
pub mod stack;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::catalog::{Catalog, ColumnValue, Label, PhotoRecord, TitleSource};
use crate::config::EstimateSettings;
use crate::constants::{LABEL_CONFIDENT_UNCERTAINTY, UNKNOWN_ID};
use crate::error::{CatalogError, Result};
use crate::media::TimeSource;

pub use estimate::Estimator;

const UNKNOWN_TITLE: &str = "Unknown";

/// Outcome of `optimize` for one record
#[derive(Debug, Default)]
pub struct OptimizeResult {
    pub updated: bool,
    pub merged: Vec<PhotoRecord>,
}

/// Counts for a pass over many records
#[derive(Debug, Default, Clone, Serialize)]
pub struct EnrichSummary {
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
}

pub struct Enricher {
    catalog: Arc<dyn Catalog>,
    settings: EstimateSettings,
}

impl Enricher {
    pub fn new(catalog: Arc<dyn Catalog>, settings: EstimateSettings) -> Self {
        Self { catalog, settings }
    }

    fn estimator(&self) -> Estimator<'_> {
        Estimator::new(self.catalog.as_ref(), &self.settings)
    }

    /// Light pass: position estimate, labels, dates, title, keywords, quality
    pub fn maintain(&self, photo: &mut PhotoRecord) -> Result<bool> {
        require_identity(photo)?;
        let snapshot = photo.clone();

        if (photo.unknown_country() && photo.place_src == crate::catalog::PlaceSource::Auto)
            || (photo.unknown_location() && photo.place_src == crate::catalog::PlaceSource::Estimate)
        {
            if let Err(e) = self.estimator().estimate_position(photo) {
                log::error!("Maintain: {} (estimate position)", e);
            }
        }

        self.refresh_derived(photo);

        let now = Utc::now();
        photo.maintained_at = Some(now);

        if photo.same_content(&snapshot) {
            self.catalog
                .update_columns(photo.id, &[("maintained_at", ColumnValue::time(now))])?;
            return Ok(false);
        }

        let mut columns = photo.columns();
        columns.push(("maintained_at", ColumnValue::time(now)));
        self.catalog.update_columns(photo.id, &columns)?;
        Ok(true)
    }

    /// Full pass: location, stacking, place estimate, then the derived fields
    pub fn optimize(
        &self,
        photo: &mut PhotoRecord,
        stack_meta: bool,
        stack_uuid: bool,
    ) -> Result<OptimizeResult> {
        require_identity(photo)?;
        let snapshot = photo.clone();

        if photo.has_lat_lng() && !photo.has_location() {
            location::update_location(photo);
        }

        let merged = match stack::stack(self.catalog.as_ref(), photo, stack_meta, stack_uuid) {
            Ok(merged) => merged,
            Err(e) => {
                log::error!("Optimize: {} (stack)", e);
                Vec::new()
            }
        };

        if let Err(e) = self.estimator().estimate_place(photo) {
            log::error!("Optimize: {} (estimate place)", e);
        }

        self.refresh_derived(photo);

        let now = Utc::now();
        photo.checked_at = Some(now);

        if photo.same_content(&snapshot) {
            self.catalog
                .update_columns(photo.id, &[("checked_at", ColumnValue::time(now))])?;
            return Ok(OptimizeResult { updated: false, merged });
        }

        let mut columns = photo.columns();
        columns.push(("checked_at", ColumnValue::time(now)));
        self.catalog.update_columns(photo.id, &columns)?;
        Ok(OptimizeResult { updated: true, merged })
    }

    /// Labels, calendar fields, title, keywords and quality
    fn refresh_derived(&self, photo: &mut PhotoRecord) {
        let labels = labels::classify_labels(photo);
        photo.update_date_fields();
        update_title(photo, &labels);
        photo.keywords = labels::merge_keywords(&photo.keywords, &labels);
        photo.quality = quality::quality_score(photo, &labels).score;
        photo.labels = labels;
    }

    pub fn maintain_all(&self, limit: i64) -> Result<EnrichSummary> {
        let ids = self.catalog.photo_ids(false, limit)?;
        Ok(self.run_over(&ids, |photo| self.maintain(photo)))
    }

    /// Optimize records never checked or changed since their last check
    pub fn optimize_all(&self, limit: i64, stack_meta: bool, stack_uuid: bool) -> Result<EnrichSummary> {
        let ids = self.catalog.photo_ids(true, limit)?;
        Ok(self.run_over(&ids, |photo| {
            self.optimize(photo, stack_meta, stack_uuid).map(|r| r.updated)
        }))
    }

    fn run_over<F>(&self, ids: &[i64], mut pass: F) -> EnrichSummary
    where
        F: FnMut(&mut PhotoRecord) -> Result<bool>,
    {
        let mut summary = EnrichSummary::default();
        for &id in ids {
            let mut photo = match self.catalog.find_photo(id) {
                Ok(Some(p)) => p,
                Ok(None) => {
                    log::warn!("Enrich: photo {} disappeared", id);
                    continue;
                }
                Err(e) => {
                    log::error!("Enrich: {}", e);
                    summary.failed += 1;
                    continue;
                }
            };

            summary.checked += 1;
            match pass(&mut photo) {
                Ok(true) => summary.updated += 1,
                Ok(false) => {}
                Err(e) => {
                    log::error!("Enrich: {} ({})", e, photo.uid);
                    summary.failed += 1;
                }
            }
        }

        log::info!(
            "Enrich: checked {} records, {} updated, {} failed",
            summary.checked,
            summary.updated,
            summary.failed
        );
        summary
    }
}

fn require_identity(photo: &PhotoRecord) -> Result<()> {
    if !photo.has_id() {
        return Err(CatalogError::MissingIdentity("id is empty".to_string()));
    }
    Ok(())
}

/// Title from the best label, the country and the month, unless one was set explicitly
fn update_title(photo: &mut PhotoRecord, labels: &[Label]) {
    if photo.has_explicit_title() {
        return;
    }

    let mut parts: Vec<String> = Vec::new();

    if let Some(label) = labels
        .iter()
        .find(|l| l.uncertainty <= LABEL_CONFIDENT_UNCERTAINTY && is_title_label(&l.name))
    {
        parts.push(capitalize(&label.name));
    }

    if photo.country != UNKNOWN_ID {
        if let Some(name) = country::country_name(&photo.country) {
            parts.push(name.to_string());
        }
    }

    if matches!(photo.taken_src, TimeSource::Manual | TimeSource::Meta | TimeSource::Name) {
        parts.push(photo.taken_at_local.format("%B %Y").to_string());
    }

    photo.title = if parts.is_empty() {
        UNKNOWN_TITLE.to_string()
    } else {
        parts.join(" / ")
    };
    photo.title_src = TitleSource::Auto;
}

fn is_title_label(name: &str) -> bool {
    matches!(name, "panorama" | "video")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PlaceSource, SqliteCatalog};
    use crate::config::DistanceExpr;
    use crate::media::MediaKind;
    use chrono::{Duration, TimeZone};

    fn enricher() -> (Arc<SqliteCatalog>, Enricher) {
        let catalog = Arc::new(SqliteCatalog::open_in_memory(DistanceExpr::JulianDay).unwrap());
        let enricher = Enricher::new(catalog.clone(), EstimateSettings::default());
        (catalog, enricher)
    }

    fn stored(catalog: &SqliteCatalog, photo: PhotoRecord) -> PhotoRecord {
        let mut photo = photo;
        catalog.create_photo(&mut photo).unwrap();
        catalog.find_photo(photo.id).unwrap().unwrap()
    }

    fn sample() -> PhotoRecord {
        let taken_at = Utc.with_ymd_and_hms(2021, 7, 14, 18, 30, 0).unwrap();
        PhotoRecord {
            taken_at,
            taken_at_local: taken_at.naive_utc(),
            taken_src: TimeSource::Meta,
            media_type: MediaKind::Photo,
            lat: 48.8566,
            lng: 2.3522,
            place_src: PlaceSource::Meta,
            camera_make: "FUJIFILM".to_string(),
            camera_model: "X100V".to_string(),
            iso: 400,
            width: 6000,
            height: 4000,
            keywords: vec!["Paris".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_identity_rejected() {
        let (_, enricher) = enricher();
        let mut photo = sample();
        let err = enricher.maintain(&mut photo).unwrap_err();
        assert_eq!(err.to_string(), "photo: can't maintain, id is empty");
        assert!(enricher.optimize(&mut photo, true, true).is_err());
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let (catalog, enricher) = enricher();
        let mut photo = stored(&catalog, sample());

        let first = enricher.optimize(&mut photo, true, true).unwrap();
        assert!(first.updated);
        assert_eq!(photo.country, "fr");
        assert_eq!(photo.title, "France / July 2021");
        assert_eq!(photo.quality, 5);
        assert!(photo.keywords.contains(&"paris".to_string()));

        let after_first = catalog.find_photo(photo.id).unwrap().unwrap();
        let mut reloaded = after_first.clone();
        let second = enricher.optimize(&mut reloaded, true, true).unwrap();
        assert!(!second.updated);

        let after_second = catalog.find_photo(photo.id).unwrap().unwrap();
        assert!(after_first.same_content(&after_second));
        assert!(after_second.checked_at >= after_first.checked_at);
    }

    #[test]
    fn test_maintain_unchanged_only_touches_timestamp() {
        let (catalog, enricher) = enricher();
        let mut photo = stored(&catalog, sample());
        enricher.maintain(&mut photo).unwrap();

        let mut again = catalog.find_photo(photo.id).unwrap().unwrap();
        let before = again.clone();
        assert!(!enricher.maintain(&mut again).unwrap());

        let stored = catalog.find_photo(photo.id).unwrap().unwrap();
        assert!(before.same_content(&stored));
        assert!(stored.maintained_at.is_some());
    }

    #[test]
    fn test_maintain_estimates_position_from_anchor() {
        let (catalog, enricher) = enricher();
        let mut anchor = sample();
        crate::maintain::location::update_location(&mut anchor);
        let anchor = stored(&catalog, anchor);

        let mut photo = stored(
            &catalog,
            PhotoRecord {
                taken_at: anchor.taken_at + Duration::days(2),
                taken_src: TimeSource::Name,
                ..Default::default()
            },
        );

        assert!(enricher.maintain(&mut photo).unwrap());
        assert_eq!(photo.place_id, anchor.place_id);
        assert_eq!(photo.place_src, PlaceSource::Estimate);
    }

    #[test]
    fn test_explicit_title_kept() {
        let (catalog, enricher) = enricher();
        let mut photo = sample();
        photo.title = "Bastille Day".to_string();
        photo.title_src = TitleSource::Meta;
        let mut photo = stored(&catalog, photo);

        enricher.optimize(&mut photo, false, false).unwrap();
        assert_eq!(photo.title, "Bastille Day");
    }

    #[test]
    fn test_optimize_all_skips_checked_records() {
        let (catalog, enricher) = enricher();
        stored(&catalog, sample());
        stored(&catalog, sample());

        let first = enricher.optimize_all(100, true, true).unwrap();
        assert_eq!(first.checked, 2);
        assert_eq!(first.failed, 0);

        let second = enricher.optimize_all(100, true, true).unwrap();
        assert_eq!(second.checked, 0);
    }
}
