// Rule-based labels derived from stored record fields

use chrono::Timelike;

use crate::catalog::{Label, PhotoRecord};
use crate::constants::{LABEL_CONFIDENT_UNCERTAINTY, PANORAMA_ASPECT_RATIO};
use crate::media::{MediaKind, TimeSource};

pub fn classify_labels(photo: &PhotoRecord) -> Vec<Label> {
    let mut labels = Vec::new();

    match photo.media_type {
        MediaKind::Video => labels.push(Label::new("video", 0)),
        MediaKind::Raw => labels.push(Label::new("raw", 0)),
        _ => {}
    }

    if photo.width > 0 && photo.height > 0 {
        let aspect = photo.width as f64 / photo.height as f64;
        if aspect >= PANORAMA_ASPECT_RATIO || aspect <= 1.0 / PANORAMA_ASPECT_RATIO {
            labels.push(Label::new("panorama", 20));
        } else if photo.width > photo.height {
            labels.push(Label::new("horizontal", 10));
        } else if photo.width < photo.height {
            labels.push(Label::new("vertical", 10));
        } else {
            labels.push(Label::new("square", 10));
        }
    }

    // Local hour is only meaningful for trusted capture times
    if matches!(photo.taken_src, TimeSource::Manual | TimeSource::Meta | TimeSource::Name) {
        let hour = photo.taken_at_local.hour();
        if (6..20).contains(&hour) {
            labels.push(Label::new("daytime", 60));
        } else {
            labels.push(Label::new("night", 40));
        }
    }

    if let Some(brand) = camera_brand(&photo.camera_make) {
        labels.push(Label::new(brand, 5));
    }

    labels.sort_by(|a, b| a.uncertainty.cmp(&b.uncertainty).then_with(|| a.name.cmp(&b.name)));
    labels
}

/// First word of the make, e.g. "NIKON CORPORATION" -> "nikon"
fn camera_brand(make: &str) -> Option<String> {
    let word = make.split_whitespace().next()?;
    let brand: String = word
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    if brand.is_empty() {
        None
    } else {
        Some(brand)
    }
}

pub fn is_confident(label: &Label) -> bool {
    label.uncertainty <= LABEL_CONFIDENT_UNCERTAINTY
}

/// Existing keywords plus label names, lowercase, sorted and unique
pub fn merge_keywords(keywords: &[String], labels: &[Label]) -> Vec<String> {
    let mut words: Vec<String> = keywords
        .iter()
        .map(|w| w.trim().to_lowercase())
        .chain(labels.iter().map(|l| l.name.to_lowercase()))
        .filter(|w| !w.is_empty())
        .collect();
    words.sort();
    words.dedup();
    words
}
