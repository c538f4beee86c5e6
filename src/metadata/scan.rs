// Brute-force search for an EXIF block anywhere in a file

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;

// RAW previews keep their EXIF near the start; no need to read video-sized files whole
const SCAN_LIMIT: u64 = 64 * 1024 * 1024;

const EXIF_MARKER: &[u8] = b"Exif\0\0";

/// Find a TIFF-structured block, preferring one introduced by an "Exif" marker
pub fn find_block(path: &Path) -> Result<Option<Vec<u8>>> {
    let mut data = Vec::new();
    File::open(path)?.take(SCAN_LIMIT).read_to_end(&mut data)?;
    Ok(find_block_in(&data))
}

pub fn find_block_in(data: &[u8]) -> Option<Vec<u8>> {
    let mut from = 0;
    while let Some(pos) = find(&data[from..], EXIF_MARKER) {
        let start = from + pos + EXIF_MARKER.len();
        if is_tiff_header(&data[start..]) {
            return Some(data[start..].to_vec());
        }
        from = start;
    }

    // Bare TIFF header with the first IFD right after it
    [&b"II*\0\x08\0\0\0"[..], &b"MM\0*\0\0\0\x08"[..]]
        .iter()
        .filter_map(|header| find(data, header))
        .min()
        .map(|pos| data[pos..].to_vec())
}

fn is_tiff_header(data: &[u8]) -> bool {
    data.starts_with(b"II*\0") || data.starts_with(b"MM\0*")
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
