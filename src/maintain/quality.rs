// Quality score
// One point per available signal, clamped to 0..=QUALITY_MAX.

use serde::{Deserialize, Serialize};

use crate::catalog::{Label, PhotoRecord};
use crate::constants::{QUALITY_MAX, QUALITY_MIN_MEGAPIXELS};
use crate::media::TimeSource;

use super::labels::is_confident;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityScore {
    pub score: i32,
    pub reasons: Vec<String>,
}

impl QualityScore {
    fn add(&mut self, reason: &str) {
        self.score += 1;
        self.reasons.push(reason.to_string());
    }
}

pub fn quality_score(photo: &PhotoRecord, labels: &[Label]) -> QualityScore {
    let mut result = QualityScore::default();

    let megapixels = photo.width as f64 * photo.height as f64 / 1_000_000.0;
    if megapixels >= QUALITY_MIN_MEGAPIXELS {
        result.add("resolution");
    }

    if matches!(photo.taken_src, TimeSource::Manual | TimeSource::Meta | TimeSource::Name) {
        result.add("capture time");
    }

    if photo.has_place() {
        result.add("place");
    }

    if !photo.camera_model.is_empty() && (photo.iso > 0 || photo.f_number > 0.0 || !photo.exposure.is_empty()) {
        result.add("camera metadata");
    }

    if labels.iter().any(is_confident) {
        result.add("confident label");
    }

    result.score = result.score.clamp(0, QUALITY_MAX);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_scores_zero() {
        let score = quality_score(&PhotoRecord::default(), &[]);
        assert_eq!(score.score, 0);
        assert!(score.reasons.is_empty());
    }

    #[test]
    fn test_all_signals_score_max() {
        let photo = PhotoRecord {
            width: 4000,
            height: 3000,
            taken_src: TimeSource::Meta,
            place_id: "de:52.5:13.4".to_string(),
            camera_model: "X100V".to_string(),
            iso: 200,
            ..Default::default()
        };
        let score = quality_score(&photo, &[Label::new("horizontal", 10)]);
        assert_eq!(score.score, QUALITY_MAX);
        assert_eq!(score.reasons.len(), 5);
    }
}
