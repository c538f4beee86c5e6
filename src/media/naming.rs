// Filename conventions: group prefixes, sequence suffixes, edited
// siblings and capture times encoded in names.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::constants::{EDITED_MARKER, EDITED_PREFIX, MAX_PLAUSIBLE_YEAR, MIN_PLAUSIBLE_YEAR};

static SEQUENCE_SUFFIX: OnceLock<Option<Regex>> = OnceLock::new();
static NAME_DATETIME: OnceLock<Option<Regex>> = OnceLock::new();
static NAME_DATE: OnceLock<Option<Regex>> = OnceLock::new();
static GENERATED_NAME: OnceLock<Option<Regex>> = OnceLock::new();

fn sequence_suffix() -> Option<&'static Regex> {
    SEQUENCE_SUFFIX
        .get_or_init(|| Regex::new(r"(?i)(\s*\(\d+\)|[\s_-]+copy(\s*\d+)?)$").ok())
        .as_ref()
}

/// Basename up to the first '.', e.g. "IMG_4120.JPG.json" -> "IMG_4120"
pub fn base_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Leading dots belong to the name (".hidden.jpg" -> ".hidden")
    let trimmed = name.trim_start_matches('.');
    let offset = name.len() - trimmed.len();
    match trimmed.find('.') {
        Some(i) if i > 0 => name[..offset + i].to_string(),
        _ => name,
    }
}

/// Remove trailing sequence markers: "IMG_4120 (1)", "IMG_4120 copy 2", "IMG_4120(1)"
pub fn strip_sequence(prefix: &str) -> String {
    let mut result = prefix.to_string();
    if let Some(re) = sequence_suffix() {
        // "IMG_4120 copy (2)" needs two passes
        loop {
            let stripped = re.replace(&result, "").to_string();
            if stripped == result || stripped.is_empty() {
                break;
            }
            result = stripped;
        }
    }
    result
}

/// Group prefix of a file, optionally ignoring sequence suffixes
pub fn group_prefix(path: &Path, strip: bool) -> String {
    let prefix = base_prefix(path);
    if strip {
        strip_sequence(&prefix)
    } else {
        prefix
    }
}

/// Edited sibling name used by phone camera apps: IMG_1234.HEIC -> IMG_E1234.HEIC
pub fn edited_name(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let head = name.get(..EDITED_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(EDITED_PREFIX) {
        return None;
    }

    let rest = &name[EDITED_PREFIX.len()..];
    if rest.is_empty() || rest.starts_with(EDITED_MARKER) || rest.starts_with('e') {
        return None;
    }

    Some(path.with_file_name(format!("{}{}{}", head, EDITED_MARKER, rest)))
}

/// Camera counters, UUIDs and hashes carry no human meaning
pub fn is_generated(name: &str) -> bool {
    let re = GENERATED_NAME.get_or_init(|| {
        Regex::new(
            r"(?ix)^(
                [0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}
                | [0-9a-f]{16,}
                | (img|dsc|dscf|dscn|dji|gopr|gp|pxl|mvimg|vid|mov|mvi|sam|p|_dsc|_mg)[_-]?[0-9][0-9_-]*
                | [0-9_ -]+
            )$",
        )
        .ok()
    });

    let stem = base_prefix(Path::new(name));
    let stem = strip_sequence(&stem);
    if stem.is_empty() {
        return true;
    }
    re.as_ref().map(|re| re.is_match(&stem)).unwrap_or(false)
}

/// Extract a capture time from a filename or path
///
/// Recognizes "20200101_162823", "2020-01-01 16.28.23", "IMG-20200101-WA0001"
/// and folder-style "2020/01/01" paths. Date-only matches are taken at noon.
pub fn time_from_name(path: &Path) -> Option<NaiveDateTime> {
    let text = path.to_string_lossy();

    let datetime = NAME_DATETIME
        .get_or_init(|| {
            Regex::new(
                r"(?:^|[^\d])((?:19|20)\d{2})[-_.:]?(0[1-9]|1[0-2])[-_.:]?(0[1-9]|[12]\d|3[01])[ _T-]?([01]\d|2[0-3])[-_.:]?([0-5]\d)[-_.:]?([0-5]\d)(?:[^\d]|$)",
            )
            .ok()
        })
        .as_ref();

    if let Some(caps) = datetime.and_then(|re| re.captures(&text)) {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let date = NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?;
        if plausible_year(date) {
            return date.and_hms_opt(num(4)?, num(5)?, num(6)?);
        }
    }

    let date_only = NAME_DATE
        .get_or_init(|| {
            Regex::new(
                r"(?:^|[^\d])((?:19|20)\d{2})[-_./]?(0[1-9]|1[0-2])[-_./]?(0[1-9]|[12]\d|3[01])(?:[^\d]|$)",
            )
            .ok()
        })
        .as_ref();

    let caps = date_only.and_then(|re| re.captures(&text))?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let date = NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?;
    if !plausible_year(date) {
        return None;
    }
    date.and_hms_opt(12, 0, 0)
}

fn plausible_year(date: NaiveDate) -> bool {
    use chrono::Datelike;
    (MIN_PLAUSIBLE_YEAR..=MAX_PLAUSIBLE_YEAR).contains(&date.year())
}
