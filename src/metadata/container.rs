// Structured container parsers
// Each parser locates the raw EXIF block inside one container format and
// reports whether the container is well-formed but has no block (Absent)
// or is broken (Err).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{CatalogError, Result};
use crate::media::FileType;

/// Outcome of probing a container for an embedded metadata block
#[derive(Debug, PartialEq, Eq)]
pub enum Probe {
    /// TIFF-structured EXIF block
    Found(Vec<u8>),
    /// Container parsed cleanly but carries no metadata block
    Absent,
}

pub trait ContainerParser: Send + Sync {
    fn name(&self) -> &'static str;
    fn accepts(&self, file_type: FileType) -> bool;
    fn try_extract(&self, path: &Path) -> Result<Probe>;
}

/// Parsers in the order they are tried
pub fn default_parsers() -> Vec<Box<dyn ContainerParser>> {
    vec![
        Box::new(JpegParser),
        Box::new(PngParser),
        Box::new(TiffParser),
        Box::new(IsoMediaParser),
    ]
}

/// exif's container reader; NotFound is a clean container without a block
fn read_container(parser: &str, path: &Path) -> Result<Probe> {
    let mut reader = BufReader::new(File::open(path)?);
    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Ok(Probe::Found(exif.buf().to_vec())),
        Err(exif::Error::NotFound(_)) => Ok(Probe::Absent),
        Err(e) => Err(CatalogError::Metadata(format!("{}: {} in {}", parser, e, path.display()))),
    }
}

/// APP1 "Exif" segment
pub struct JpegParser;

impl ContainerParser for JpegParser {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn accepts(&self, file_type: FileType) -> bool {
        file_type == FileType::Jpeg
    }

    fn try_extract(&self, path: &Path) -> Result<Probe> {
        read_container(self.name(), path)
    }
}

/// eXIf chunk
pub struct PngParser;

impl ContainerParser for PngParser {
    fn name(&self) -> &'static str {
        "png"
    }

    fn accepts(&self, file_type: FileType) -> bool {
        file_type == FileType::Png
    }

    fn try_extract(&self, path: &Path) -> Result<Probe> {
        read_container(self.name(), path)
    }
}

/// TIFF and TIFF-based RAW files are themselves the EXIF block
pub struct TiffParser;

impl ContainerParser for TiffParser {
    fn name(&self) -> &'static str {
        "tiff"
    }

    fn accepts(&self, file_type: FileType) -> bool {
        matches!(file_type, FileType::Tiff | FileType::Raw)
    }

    fn try_extract(&self, path: &Path) -> Result<Probe> {
        let mut magic = [0u8; 4];
        let n = File::open(path)?.read(&mut magic)?;
        if n < magic.len() || !(magic == *b"II*\0" || magic == *b"MM\0*") {
            // Not a TIFF container (CR3, RAF, ...)
            return Ok(Probe::Absent);
        }
        read_container(self.name(), path)
    }
}

/// HEIF and WebP
pub struct IsoMediaParser;

impl ContainerParser for IsoMediaParser {
    fn name(&self) -> &'static str {
        "heif"
    }

    fn accepts(&self, file_type: FileType) -> bool {
        matches!(file_type, FileType::Heif | FileType::Webp)
    }

    fn try_extract(&self, path: &Path) -> Result<Probe> {
        read_container(self.name(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::testdata::{jpeg_bytes, png_bytes, tiff_block, write_file, ExifFixture};
    use tempfile::TempDir;

    fn fixture_block() -> Vec<u8> {
        tiff_block(&ExifFixture {
            make: Some("Canon"),
            ..Default::default()
        })
    }

    #[test]
    fn test_jpeg_found_and_absent() {
        let tmp = TempDir::new().unwrap();
        let block = fixture_block();

        let with = write_file(tmp.path(), "with.jpg", &jpeg_bytes(Some(&block)));
        assert_eq!(JpegParser.try_extract(&with).unwrap(), Probe::Found(block));

        let without = write_file(tmp.path(), "without.jpg", &jpeg_bytes(None));
        assert_eq!(JpegParser.try_extract(&without).unwrap(), Probe::Absent);
    }

    #[test]
    fn test_truncated_jpeg_is_an_error_not_absence() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(tmp.path(), "cut.jpg", &[0xFF, 0xD8, 0xFF, 0xE1, 0x10]);
        assert!(JpegParser.try_extract(&path).is_err());
    }

    #[test]
    fn test_png_exif_chunk() {
        let tmp = TempDir::new().unwrap();
        let block = fixture_block();

        let with = write_file(tmp.path(), "with.png", &png_bytes(Some(&block)));
        assert_eq!(PngParser.try_extract(&with).unwrap(), Probe::Found(block));

        let without = write_file(tmp.path(), "without.png", &png_bytes(None));
        assert_eq!(PngParser.try_extract(&without).unwrap(), Probe::Absent);
    }

    #[test]
    fn test_truncated_png_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut bytes = png_bytes(None);
        bytes.truncate(12);
        let path = write_file(tmp.path(), "cut.png", &bytes);
        assert!(PngParser.try_extract(&path).is_err());
    }

    #[test]
    fn test_tiff_is_its_own_block() {
        let tmp = TempDir::new().unwrap();
        let block = fixture_block();
        let path = write_file(tmp.path(), "scan.tif", &block);
        assert_eq!(TiffParser.try_extract(&path).unwrap(), Probe::Found(block));
    }

    #[test]
    fn test_non_tiff_raw_is_absent() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(tmp.path(), "x.raf", b"FUJIFILMCCD-RAW 0201");
        assert_eq!(TiffParser.try_extract(&path).unwrap(), Probe::Absent);
    }
}
