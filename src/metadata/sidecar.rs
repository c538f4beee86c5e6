// JSON sidecar files
// A sidecar is a flat object (or a one-element array of objects, as written by
// `exiftool -j`) keyed by tag name, plus the name of the file it describes.

use std::path::{Path, PathBuf};
use serde_json::Value;

use super::fields::{first, TagBag, ORIGINAL_NAME};
use crate::constants::HIDDEN_FOLDER;
use crate::error::{CatalogError, Result};

/// Candidate sidecar paths for a media file, most specific first
///
/// `name.ext.json` next to the file, then the legacy `name.json` next to the
/// file, in the hidden folder and in each extra directory.
pub fn candidates(path: &Path, extra_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut result = Vec::new();

    let (Some(dir), Some(file_name)) = (path.parent(), path.file_name()) else {
        return result;
    };
    let file_name = file_name.to_string_lossy();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    result.push(dir.join(format!("{}.json", file_name)));

    let legacy = format!("{}.json", stem);
    result.push(dir.join(&legacy));
    result.push(dir.join(HIDDEN_FOLDER).join(&legacy));
    for extra in extra_dirs {
        result.push(extra.join(&legacy));
    }

    result.dedup();
    result
}

/// Read a sidecar and check it describes `media_name`
pub fn read_sidecar(json_path: &Path, media_name: &str) -> Result<TagBag> {
    let text = std::fs::read_to_string(json_path)?;
    let value: Value = serde_json::from_str(&text)?;

    let object = match value {
        Value::Object(map) => map,
        Value::Array(mut items) if items.len() == 1 => match items.remove(0) {
            Value::Object(map) => map,
            _ => return Err(invalid(json_path, "expected an object")),
        },
        _ => return Err(invalid(json_path, "expected an object")),
    };

    let mut tags = TagBag::new();
    for (key, value) in object {
        if let Some(text) = scalar_to_string(&value) {
            tags.insert(key, text);
        }
    }

    let recorded = first(&tags, ORIGINAL_NAME)
        .map(|n| n.rsplit(['/', '\\']).next().unwrap_or(n).to_string())
        .ok_or_else(|| invalid(json_path, "missing original file name"))?;

    if !recorded.eq_ignore_ascii_case(media_name) {
        return Err(invalid(
            json_path,
            format!("describes {} instead of {}", recorded, media_name),
        ));
    }

    Ok(tags)
}

fn invalid(path: &Path, detail: impl std::fmt::Display) -> CatalogError {
    CatalogError::Metadata(format!("sidecar {}: {}", path.display(), detail))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Null | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::testdata::write_file;
    use tempfile::TempDir;

    #[test]
    fn test_candidates_order() {
        let extra = PathBuf::from("/sidecar/2020");
        let paths = candidates(Path::new("/o/2020/IMG_1.JPG"), &[extra]);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/o/2020/IMG_1.JPG.json"),
                PathBuf::from("/o/2020/IMG_1.json"),
                PathBuf::from("/o/2020/.mediacat/IMG_1.json"),
                PathBuf::from("/sidecar/2020/IMG_1.json"),
            ]
        );
    }

    #[test]
    fn test_read_sidecar_flattens_values() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(
            tmp.path(),
            "IMG_1.JPG.json",
            br#"[{"SourceFile": "./2020/IMG_1.JPG", "Keywords": ["a", "b"], "ISO": 200, "Nested": {"x": 1}}]"#,
        );

        let tags = read_sidecar(&path, "IMG_1.JPG").unwrap();
        assert_eq!(tags.get("Keywords").map(String::as_str), Some("a, b"));
        assert_eq!(tags.get("ISO").map(String::as_str), Some("200"));
        assert!(!tags.contains_key("Nested"));
    }

    #[test]
    fn test_mismatched_original_name_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(
            tmp.path(),
            "IMG_1.JPG.json",
            br#"{"OriginalFileName": "IMG_2.JPG", "Title": "Wrong"}"#,
        );
        assert!(read_sidecar(&path, "IMG_1.JPG").is_err());
    }

    #[test]
    fn test_missing_original_name_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(tmp.path(), "IMG_1.json", br#"{"Title": "No name"}"#);
        assert!(read_sidecar(&path, "IMG_1.JPG").is_err());
    }
}
