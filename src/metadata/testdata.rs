// Test fixtures: minimal TIFF/EXIF blocks wrapped in JPEG and PNG streams

use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct ExifFixture<'a> {
    pub make: Option<&'a str>,
    pub model: Option<&'a str>,
    pub orientation: Option<u16>,
    pub date_time_original: Option<&'a str>,
    pub date_time_digitized: Option<&'a str>,
    pub pixel_size: Option<(u32, u32)>,
    pub gps: Option<(f64, f64)>,
}

struct Entry {
    tag: u16,
    typ: u16,
    count: u32,
    data: Vec<u8>,
}

fn ascii(tag: u16, s: &str) -> Entry {
    let mut data = s.as_bytes().to_vec();
    data.push(0);
    Entry { tag, typ: 2, count: data.len() as u32, data }
}

fn short(tag: u16, v: u16) -> Entry {
    Entry { tag, typ: 3, count: 1, data: v.to_le_bytes().to_vec() }
}

fn long(tag: u16, v: u32) -> Entry {
    Entry { tag, typ: 4, count: 1, data: v.to_le_bytes().to_vec() }
}

fn rationals(tag: u16, values: &[(u32, u32)]) -> Entry {
    let mut data = Vec::new();
    for (num, denom) in values {
        data.extend_from_slice(&num.to_le_bytes());
        data.extend_from_slice(&denom.to_le_bytes());
    }
    Entry { tag, typ: 5, count: values.len() as u32, data }
}

fn dms(value: f64) -> [(u32, u32); 3] {
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = ((value - degrees) * 60.0).trunc();
    let seconds = ((value - degrees) * 60.0 - minutes) * 60.0;
    [
        (degrees as u32, 1),
        (minutes as u32, 1),
        ((seconds * 1000.0).round() as u32, 1000),
    ]
}

fn ifd_size(entries: &[Entry]) -> u32 {
    let data: usize = entries
        .iter()
        .filter(|e| e.data.len() > 4)
        .map(|e| e.data.len() + e.data.len() % 2)
        .sum();
    (2 + entries.len() * 12 + 4 + data) as u32
}

fn write_ifd(out: &mut Vec<u8>, entries: &mut [Entry], start: u32) {
    entries.sort_by_key(|e| e.tag);
    let mut data_offset = start + 2 + entries.len() as u32 * 12 + 4;
    let mut data_area = Vec::new();

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for e in entries.iter() {
        out.extend_from_slice(&e.tag.to_le_bytes());
        out.extend_from_slice(&e.typ.to_le_bytes());
        out.extend_from_slice(&e.count.to_le_bytes());
        if e.data.len() <= 4 {
            let mut inline = e.data.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&data_offset.to_le_bytes());
            data_area.extend_from_slice(&e.data);
            if e.data.len() % 2 == 1 {
                data_area.push(0);
            }
            data_offset += (e.data.len() + e.data.len() % 2) as u32;
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&data_area);
}

/// Little-endian TIFF block with IFD0, Exif and GPS sub-IFDs
pub fn tiff_block(fixture: &ExifFixture) -> Vec<u8> {
    let mut ifd0 = Vec::new();
    if let Some(make) = fixture.make {
        ifd0.push(ascii(0x010F, make));
    }
    if let Some(model) = fixture.model {
        ifd0.push(ascii(0x0110, model));
    }
    if let Some(orientation) = fixture.orientation {
        ifd0.push(short(0x0112, orientation));
    }

    let mut exif_ifd = Vec::new();
    if let Some(dt) = fixture.date_time_original {
        exif_ifd.push(ascii(0x9003, dt));
    }
    if let Some(dt) = fixture.date_time_digitized {
        exif_ifd.push(ascii(0x9004, dt));
    }
    if let Some((w, h)) = fixture.pixel_size {
        exif_ifd.push(long(0xA002, w));
        exif_ifd.push(long(0xA003, h));
    }

    let mut gps_ifd = Vec::new();
    if let Some((lat, lng)) = fixture.gps {
        gps_ifd.push(ascii(0x0001, if lat < 0.0 { "S" } else { "N" }));
        gps_ifd.push(rationals(0x0002, &dms(lat)));
        gps_ifd.push(ascii(0x0003, if lng < 0.0 { "W" } else { "E" }));
        gps_ifd.push(rationals(0x0004, &dms(lng)));
    }

    // Pointers are inline longs, so IFD0's size is known before their values
    let has_exif = !exif_ifd.is_empty();
    let has_gps = !gps_ifd.is_empty();
    if has_exif {
        ifd0.push(long(0x8769, 0));
    }
    if has_gps {
        ifd0.push(long(0x8825, 0));
    }

    let ifd0_start = 8u32;
    let exif_start = ifd0_start + ifd_size(&ifd0);
    let gps_start = exif_start + if has_exif { ifd_size(&exif_ifd) } else { 0 };

    for e in ifd0.iter_mut() {
        if e.tag == 0x8769 {
            e.data = exif_start.to_le_bytes().to_vec();
        } else if e.tag == 0x8825 {
            e.data = gps_start.to_le_bytes().to_vec();
        }
    }

    let mut out = b"II*\0".to_vec();
    out.extend_from_slice(&ifd0_start.to_le_bytes());
    write_ifd(&mut out, &mut ifd0, ifd0_start);
    if has_exif {
        write_ifd(&mut out, &mut exif_ifd, exif_start);
    }
    if has_gps {
        write_ifd(&mut out, &mut gps_ifd, gps_start);
    }
    out
}

/// JPEG stream: SOI, APP1 Exif (if any), a tiny scan and EOI
pub fn jpeg_bytes(tiff: Option<&[u8]>) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    // APP0 JFIF
    out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    out.extend_from_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
    if let Some(tiff) = tiff {
        let len = (2 + 6 + tiff.len()) as u16;
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(tiff);
    }
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x00, 0xFF, 0xD9]);
    out
}

fn png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&[0, 0, 0, 0]);
}

/// PNG stream with an optional eXIf chunk
pub fn png_bytes(tiff: Option<&[u8]>) -> Vec<u8> {
    let mut out = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
    png_chunk(&mut out, b"IHDR", &ihdr);
    if let Some(tiff) = tiff {
        png_chunk(&mut out, b"eXIf", tiff);
    }
    png_chunk(&mut out, b"IEND", &[]);
    out
}

/// Write bytes to `dir/name`, creating parent folders
pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content).unwrap();
    path
}
