// Media Catalog Constants
// Policy values shared by the indexer, extractor and enrichment pass.

// Hashing
pub const HASH_ALGORITHM: &str = "blake3";
pub const HASH_CHUNK_SIZE: usize = 1_048_576; // 1MB
pub const HASH_FAST_SCHEME: &str = "first_last_size_v1";

// Concurrency defaults
pub const DEFAULT_INDEX_WORKERS: usize = 2;
pub const MAX_INDEX_WORKERS: usize = 64;

// Paths
pub const PATH_DB_SEPARATOR: char = '/';
pub const HIDDEN_FOLDER: &str = ".mediacat";
pub const IGNORE_FILENAME: &str = ".mcignore";
pub const DB_FILENAME: &str = "catalog.db";
pub const CONFIG_FILENAME: &str = "mediacat.toml";

// Root names
pub const ROOT_ORIGINALS: &str = "originals";
pub const ROOT_IMPORT: &str = "import";
pub const ROOT_SIDECAR: &str = "sidecar";
pub const ROOT_EXAMPLES: &str = "examples";
pub const ROOT_UNKNOWN: &str = "";

// Content sniffing
pub const SNIFF_LEN: usize = 64;

// Extension fallbacks for formats without a reliable signature
pub const RAW_EXTENSIONS: &[&str] = &[
    "dng", "cr2", "cr3", "crw", "nef", "nrw", "arw", "srf", "sr2", "orf", "rw2", "raf", "pef",
    "srw", "x3f", "3fr", "erf", "kdc", "mrw", "mos", "iiq", "rwl",
];
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "avi", "mkv", "webm", "mts", "m2ts", "ts", "mpg", "mpeg", "3gp", "wmv",
    "flv",
];

// Always sidecars, whatever the content looks like
pub const SIDECAR_EXTENSIONS: &[&str] = &[
    "xmp", "aae", "json", "txt", "yml", "yaml", "md", "xml", "csv", "html",
];

// Pre-rendered thumbnails, never photos
pub const THUMBNAIL_EXTENSIONS: &[&str] = &["thm"];

// Filenames starting with this get an "edited" sibling (IMG_1234 -> IMG_E1234)
pub const EDITED_PREFIX: &str = "IMG_";
pub const EDITED_MARKER: &str = "E";

// Time
pub const MIN_PLAUSIBLE_YEAR: i32 = 1000;
pub const MAX_PLAUSIBLE_YEAR: i32 = 2999;

// Place estimation
pub const UNKNOWN_ID: &str = "zz";
pub const DEFAULT_PLACE_WINDOW_HOURS: i64 = 36;
pub const DEFAULT_POSITION_WINDOW_DAYS: i64 = 7;
pub const CELL_PRECISION: usize = 3;
pub const PLACE_PRECISION: usize = 1;

// Labels
pub const LABEL_CONFIDENT_UNCERTAINTY: u8 = 30;
pub const PANORAMA_ASPECT_RATIO: f64 = 1.9;

// Quality score
pub const QUALITY_MIN_MEGAPIXELS: f64 = 2.0;
pub const QUALITY_MAX: i32 = 5;
