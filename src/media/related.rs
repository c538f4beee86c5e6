// Related-file groups
// Files sharing a name prefix in one directory form a group with a single
// main file (the richest representation) plus companions.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::file::MediaFile;
use super::kind::FileType;
use super::naming;
use crate::constants::HIDDEN_FOLDER;
use crate::error::{CatalogError, Result};

/// One logical asset: the main file plus companions
#[derive(Debug, Clone, Default)]
pub struct RelatedFiles {
    pub files: Vec<Arc<MediaFile>>,
    pub main: Option<Arc<MediaFile>>,
}

impl RelatedFiles {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains_jpeg(&self) -> bool {
        self.files.iter().any(|f| f.is_jpeg())
    }

    pub fn is_main(&self, file: &MediaFile) -> bool {
        self.main.as_ref().map(|m| m.path() == file.path()).unwrap_or(false)
    }
}

/// Priority used for main selection and ordering; lower is richer
pub fn type_rank(file_type: FileType) -> u8 {
    match file_type {
        FileType::Raw => 0,
        FileType::Heif => 1,
        t if t.is_image_other() => 2,
        FileType::Video => 3,
        FileType::Jpeg => 4,
        FileType::Xmp | FileType::Json => 5,
        _ => 6,
    }
}

fn can_be_main(file: &MediaFile) -> bool {
    type_rank(file.file_type()) <= 4
}

/// Resolve the group `file` belongs to
pub fn related_files(file: &Arc<MediaFile>, strip_sequence: bool) -> Result<RelatedFiles> {
    let prefix = naming::group_prefix(file.path(), strip_sequence);
    let dir = file.dir().to_path_buf();

    let mut paths = matching_paths(&dir, &prefix, strip_sequence)?;

    if let Some(edited) = naming::edited_name(file.path()) {
        if edited.is_file() && !paths.contains(&edited) {
            paths.push(edited);
        }
    }

    let mut result = RelatedFiles::default();
    for path in paths {
        match open(file, &path) {
            Some(mf) => result.files.push(mf),
            None => continue,
        }
    }

    result.main = result
        .files
        .iter()
        .filter(|f| can_be_main(f))
        .min_by(|a, b| {
            type_rank(a.file_type())
                .cmp(&type_rank(b.file_type()))
                .then_with(|| a.file_name().len().cmp(&b.file_name().len()))
                .then_with(|| a.path().cmp(b.path()))
        })
        .cloned();

    if !result.contains_jpeg() {
        if let Some(hidden) = hidden_jpeg(file, &naming::base_prefix(file.path())) {
            if let Some(mf) = open(file, &hidden) {
                result.files.push(mf);
            }
        }
    }

    if result.files.is_empty() || result.main.is_none() {
        return Err(CatalogError::Unsupported {
            name: file.file_name(),
            mime: file.mime().to_string(),
        });
    }

    sort_group(&mut result);
    Ok(result)
}

/// Main first, then by type priority and path
fn sort_group(group: &mut RelatedFiles) {
    let main = group.main.clone();
    group.files.sort_by(|a, b| {
        let a_main = main.as_ref().map(|m| m.path() == a.path()).unwrap_or(false);
        let b_main = main.as_ref().map(|m| m.path() == b.path()).unwrap_or(false);
        b_main
            .cmp(&a_main)
            .then_with(|| type_rank(a.file_type()).cmp(&type_rank(b.file_type())))
            .then_with(|| a.path().cmp(b.path()))
    });
}

/// Files in `dir` whose group prefix equals `prefix`
fn matching_paths(dir: &Path, prefix: &str, strip_sequence: bool) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Related: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) || !path.is_file() {
            continue;
        }
        if naming::group_prefix(&path, strip_sequence) == prefix {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Reuse the visited descriptor, build fresh ones for siblings
fn open(visited: &Arc<MediaFile>, path: &Path) -> Option<Arc<MediaFile>> {
    let mf = if path == visited.path() {
        Arc::clone(visited)
    } else {
        match MediaFile::new(path, Arc::clone(visited.roots())) {
            Ok(mf) => Arc::new(mf),
            Err(e) => {
                log::warn!("Related: skipping {}", e);
                return None;
            }
        }
    };

    if mf.is_empty() {
        log::warn!("Related: skipping empty file {}", path.display());
        return None;
    }
    Some(mf)
}

/// Pre-rendered JPEG kept in the hidden folder or the sidecar root
fn hidden_jpeg(file: &MediaFile, prefix: &str) -> Option<PathBuf> {
    let mut dirs = vec![file.dir().join(HIDDEN_FOLDER)];
    dirs.extend(file.sidecar_dirs());

    dirs.iter()
        .flat_map(|dir| {
            ["jpg", "JPG", "jpeg"]
                .iter()
                .map(move |ext| dir.join(format!("{}.{}", prefix, ext)))
        })
        .find(|p| p.is_file())
}
