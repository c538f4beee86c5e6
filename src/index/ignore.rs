// Ignore list
// One glob per line in the root ignore file, matched case-insensitively
// against the path relative to the indexed root. Blank lines and lines
// starting with '#' are skipped.

use std::fs;
use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::constants::IGNORE_FILENAME;
use crate::error::Result;

#[derive(Debug)]
pub struct IgnoreList {
    set: GlobSet,
    patterns: Vec<String>,
}

impl Default for IgnoreList {
    fn default() -> Self {
        Self {
            set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }
}

impl IgnoreList {
    /// Load `<root>/.mcignore`; a missing file means nothing is ignored
    pub fn load(root: &Path) -> Result<Self> {
        let file = root.join(IGNORE_FILENAME);
        if !file.is_file() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&file)?;
        let list = Self::from_patterns(text.lines())?;
        log::debug!("Indexer: {} ignore patterns from {}", list.len(), file.display());
        Ok(list)
    }

    pub fn from_patterns<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut patterns = Vec::new();

        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let pattern = line.trim_end_matches('/');
            builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
            // A bare name also matches at any depth
            if !pattern.contains('/') {
                builder.add(
                    GlobBuilder::new(&format!("**/{}", pattern))
                        .case_insensitive(true)
                        .build()?,
                );
            }
            patterns.push(pattern.to_string());
        }

        Ok(Self {
            set: builder.build()?,
            patterns,
        })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if the root-relative path matches any pattern
    pub fn ignored(&self, rel_path: &str) -> bool {
        !rel_path.is_empty() && self.set.is_match(rel_path)
    }
}

/// Dotfiles and dot-folders, including the hidden catalog folder
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
