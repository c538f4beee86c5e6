// File identity: type detection, file descriptors and related-file groups

pub mod file;
pub mod kind;
pub mod naming;
pub mod related;

pub use file::{MediaFile, TimeSource};
pub use kind::{classify, detect_file_type, FileType, MediaKind};
pub use related::{related_files, RelatedFiles};
