// Content-based file type detection
// Magic bytes decide the type; extensions only break ties between
// formats that share a container (TIFF vs. TIFF-based RAW).

use std::fs::File;
use std::io::Read;
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::constants::{
    RAW_EXTENSIONS, SIDECAR_EXTENSIONS, SNIFF_LEN, THUMBNAIL_EXTENSIONS, VIDEO_EXTENSIONS,
};
use crate::error::Result;

/// Coarse media class of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Raw,
    Sidecar,
    Other,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Raw => "raw",
            MediaKind::Sidecar => "sidecar",
            MediaKind::Other => "other",
        }
    }

    pub fn parse(value: &str) -> MediaKind {
        match value {
            "photo" => MediaKind::Photo,
            "video" => MediaKind::Video,
            "raw" => MediaKind::Raw,
            "sidecar" => MediaKind::Sidecar,
            _ => MediaKind::Other,
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(self, MediaKind::Photo | MediaKind::Video | MediaKind::Raw)
    }
}

/// Detected file type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Jpeg,
    Png,
    Gif,
    Bitmap,
    Tiff,
    Webp,
    Heif,
    Raw,
    Video,
    Json,
    Xmp,
    Thumbnail,
    Sidecar,
    Other,
}

impl FileType {
    pub fn kind(&self) -> MediaKind {
        match self {
            FileType::Jpeg
            | FileType::Png
            | FileType::Gif
            | FileType::Bitmap
            | FileType::Tiff
            | FileType::Webp
            | FileType::Heif => MediaKind::Photo,
            FileType::Raw => MediaKind::Raw,
            FileType::Video => MediaKind::Video,
            FileType::Json | FileType::Xmp | FileType::Thumbnail | FileType::Sidecar => {
                MediaKind::Sidecar
            }
            FileType::Other => MediaKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Jpeg => "jpg",
            FileType::Png => "png",
            FileType::Gif => "gif",
            FileType::Bitmap => "bmp",
            FileType::Tiff => "tiff",
            FileType::Webp => "webp",
            FileType::Heif => "heif",
            FileType::Raw => "raw",
            FileType::Video => "video",
            FileType::Json => "json",
            FileType::Xmp => "xmp",
            FileType::Thumbnail => "thm",
            FileType::Sidecar => "sidecar",
            FileType::Other => "other",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            FileType::Jpeg => "image/jpeg",
            FileType::Png => "image/png",
            FileType::Gif => "image/gif",
            FileType::Bitmap => "image/bmp",
            FileType::Tiff => "image/tiff",
            FileType::Webp => "image/webp",
            FileType::Heif => "image/heif",
            FileType::Raw => "image/x-raw",
            FileType::Video => "video/*",
            FileType::Json => "application/json",
            FileType::Xmp => "application/rdf+xml",
            FileType::Thumbnail | FileType::Sidecar | FileType::Other => {
                "application/octet-stream"
            }
        }
    }

    /// Image formats other than JPEG and HEIF that can be a group's main file
    pub fn is_image_other(&self) -> bool {
        matches!(
            self,
            FileType::Png | FileType::Gif | FileType::Bitmap | FileType::Tiff | FileType::Webp
        )
    }

    /// Types with an embedded EXIF block worth looking for
    pub fn exif_supported(&self) -> bool {
        matches!(
            self,
            FileType::Jpeg | FileType::Png | FileType::Tiff | FileType::Heif | FileType::Webp | FileType::Raw
        )
    }
}

/// Classify a path into its coarse media kind
pub fn classify(path: &Path) -> Result<MediaKind> {
    Ok(detect_file_type(path)?.kind())
}

/// Detect the file type of a path from its content
pub fn detect_file_type(path: &Path) -> Result<FileType> {
    let ext = lower_extension(path);

    if let Some(file_type) = sidecar_type(&ext) {
        return Ok(file_type);
    }

    let mut header = [0u8; SNIFF_LEN];
    let read = read_header(path, &mut header)?;

    Ok(sniff(&header[..read], &ext))
}

/// Sidecar and thumbnail extensions decide the type regardless of content
fn sidecar_type(ext: &str) -> Option<FileType> {
    if THUMBNAIL_EXTENSIONS.contains(&ext) {
        return Some(FileType::Thumbnail);
    }
    if !SIDECAR_EXTENSIONS.contains(&ext) {
        return None;
    }
    Some(match ext {
        "json" => FileType::Json,
        "xmp" => FileType::Xmp,
        _ => FileType::Sidecar,
    })
}

fn read_header(path: &Path, buf: &mut [u8]) -> Result<usize> {
    let mut file = File::open(path)?;
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// Match magic bytes; `ext` is the lowercase extension
pub fn sniff(header: &[u8], ext: &str) -> FileType {
    let starts = |magic: &[u8]| has_magic(header, 0, magic);
    let at = |offset: usize, magic: &[u8]| has_magic(header, offset, magic);

    if starts(&[0xFF, 0xD8, 0xFF][..]) {
        return FileType::Jpeg;
    }
    if starts(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A][..]) {
        return FileType::Png;
    }
    if starts(&b"GIF87a"[..]) || starts(&b"GIF89a"[..]) {
        return FileType::Gif;
    }
    if starts(&b"RIFF"[..]) && at(8, &b"WEBP"[..]) {
        return FileType::Webp;
    }
    if starts(&b"RIFF"[..]) && at(8, &b"AVI "[..]) {
        return FileType::Video;
    }
    if starts(&b"II*\0"[..]) || starts(&b"MM\0*"[..]) {
        // DNG, CR2, NEF, ARW, PEF and friends are all TIFF containers
        return if RAW_EXTENSIONS.contains(&ext) { FileType::Raw } else { FileType::Tiff };
    }
    if starts(&b"FUJIFILMCCD-RAW"[..]) || starts(&b"IIRO"[..]) || starts(&b"IIRS"[..]) || starts(&b"IIU\0"[..]) {
        return FileType::Raw;
    }
    if at(4, &b"ftyp"[..]) && header.len() >= 12 {
        return match &header[8..12] {
            b"heic" | b"heix" | b"heim" | b"heis" | b"hevc" | b"hevx" | b"mif1" | b"msf1"
            | b"avif" | b"avis" => FileType::Heif,
            b"crx " => FileType::Raw,
            _ => FileType::Video,
        };
    }
    if starts(&[0x1A, 0x45, 0xDF, 0xA3][..])
        || starts(&[0x00, 0x00, 0x01, 0xBA][..])
        || starts(&b"FLV"[..])
        || starts(&[0x30, 0x26, 0xB2, 0x75][..])
    {
        return FileType::Video;
    }
    if at(4, &b"moov"[..]) || at(4, &b"mdat"[..]) || at(4, &b"wide"[..]) {
        return FileType::Video;
    }
    if starts(&b"BM"[..]) && header.len() >= 14 {
        return FileType::Bitmap;
    }

    // No usable signature: trust the extension only for RAW and video families
    if RAW_EXTENSIONS.contains(&ext) {
        FileType::Raw
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        FileType::Video
    } else {
        FileType::Other
    }
}

fn has_magic(header: &[u8], offset: usize, magic: &[u8]) -> bool {
    header.get(offset..offset + magic.len()) == Some(magic)
}

pub fn lower_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}
