// Indexer configuration
// Loaded from a TOML file; every field has a default so partial files work.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{CatalogError, Result};

/// Distance function used to rank catalog records by capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceExpr {
    /// Whole calendar days between the two dates
    DayDiff,
    /// Fractional days between the two instants
    #[default]
    JulianDay,
}

/// Policy knobs for the place/position estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateSettings {
    pub place_window_hours: i64,
    pub position_window_days: i64,
    pub country_fallback: bool,
    pub distance: DistanceExpr,
}

impl Default for EstimateSettings {
    fn default() -> Self {
        Self {
            place_window_hours: DEFAULT_PLACE_WINDOW_HOURS,
            position_window_days: DEFAULT_POSITION_WINDOW_DAYS,
            country_fallback: true,
            distance: DistanceExpr::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub originals_path: PathBuf,
    pub import_path: Option<PathBuf>,
    pub sidecar_path: Option<PathBuf>,
    pub examples_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub workers: usize,
    pub rescan: bool,
    pub stack_sequences: bool,
    pub stack_meta: bool,
    pub stack_uuid: bool,
    pub follow_symlinks: bool,
    pub estimate: EstimateSettings,
}

impl Default for Config {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| (n.get() / 2).max(1))
            .unwrap_or(DEFAULT_INDEX_WORKERS);

        Self {
            originals_path: PathBuf::from(ROOT_ORIGINALS),
            import_path: None,
            sidecar_path: None,
            examples_path: None,
            catalog_path: None,
            workers,
            rescan: false,
            stack_sequences: true,
            stack_meta: true,
            stack_uuid: true,
            follow_symlinks: true,
            estimate: EstimateSettings::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Config rooted at a single originals folder, everything else default
    pub fn for_originals(originals: impl Into<PathBuf>) -> Self {
        Self {
            originals_path: originals.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 || self.workers > MAX_INDEX_WORKERS {
            return Err(CatalogError::Config(format!(
                "workers must be between 1 and {}, got {}",
                MAX_INDEX_WORKERS, self.workers
            )));
        }
        if self.estimate.place_window_hours <= 0 || self.estimate.position_window_days <= 0 {
            return Err(CatalogError::Config("estimate windows must be positive".to_string()));
        }
        Ok(())
    }

    pub fn roots(&self) -> Arc<Roots> {
        Arc::new(Roots {
            originals: self.originals_path.clone(),
            import: self.import_path.clone(),
            sidecar: self.sidecar_path.clone(),
            examples: self.examples_path.clone(),
        })
    }
}

/// Root folder a file lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    Originals,
    Import,
    Sidecar,
    Examples,
    Unknown,
}

impl Root {
    pub fn as_str(&self) -> &'static str {
        match self {
            Root::Originals => ROOT_ORIGINALS,
            Root::Import => ROOT_IMPORT,
            Root::Sidecar => ROOT_SIDECAR,
            Root::Examples => ROOT_EXAMPLES,
            Root::Unknown => ROOT_UNKNOWN,
        }
    }
}

/// The configured root folders, shared by every file descriptor of a run
#[derive(Debug, Clone, Default)]
pub struct Roots {
    pub originals: PathBuf,
    pub import: Option<PathBuf>,
    pub sidecar: Option<PathBuf>,
    pub examples: Option<PathBuf>,
}

impl Roots {
    /// Classify a path by prefix; originals wins over the others
    pub fn classify(&self, path: &Path) -> Root {
        let candidates = [
            (Some(&self.originals), Root::Originals),
            (self.import.as_ref(), Root::Import),
            (self.sidecar.as_ref(), Root::Sidecar),
            (self.examples.as_ref(), Root::Examples),
        ];

        for (dir, root) in candidates {
            if let Some(dir) = dir {
                if !dir.as_os_str().is_empty() && path.starts_with(dir) {
                    return root;
                }
            }
        }

        Root::Unknown
    }

    pub fn path(&self, root: Root) -> Option<&Path> {
        match root {
            Root::Originals => Some(self.originals.as_path()),
            Root::Import => self.import.as_deref(),
            Root::Sidecar => self.sidecar.as_deref(),
            Root::Examples => self.examples.as_deref(),
            Root::Unknown => None,
        }
    }

    /// Path relative to its root, with '/' separators
    pub fn rel_name(&self, path: &Path, root: Root) -> String {
        let rel = match self.path(root) {
            Some(base) => path.strip_prefix(base).unwrap_or(path),
            None => path,
        };
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(&PATH_DB_SEPARATOR.to_string())
    }
}
