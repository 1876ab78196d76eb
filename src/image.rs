// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Image dimension sniffing for PNG and JFIF files.
//!
//! Only the headers are read, enough to size a thumbnail. Anything that does
//! not look exactly like the expected layout is reported as unrecognized.
//!
//! # Example
//!
//! ```
//! use chatbook::image::{sniff, ImageFormat};
//! use std::io::Cursor;
//!
//! let mut png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
//! png.extend_from_slice(&13u32.to_be_bytes());
//! png.extend_from_slice(b"IHDR");
//! png.extend_from_slice(&800u32.to_be_bytes());
//! png.extend_from_slice(&600u32.to_be_bytes());
//! png.extend_from_slice(&[8, 6, 0, 0, 0]);
//!
//! let info = sniff(&mut Cursor::new(png)).unwrap();
//! assert_eq!(info.format, ImageFormat::Png);
//! assert_eq!((info.width, info.height), (800, 600));
//! ```

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Start of image followed by an APP0 marker.
const JFIF_SIGNATURE: [u8; 4] = [0xff, 0xd8, 0xff, 0xe0];

/// Baseline start-of-frame marker.
const SOF0: [u8; 2] = [0xff, 0xc0];

/// A recognized image container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Portable Network Graphics.
    Png,
    /// JPEG with a JFIF header.
    Jpeg,
}

impl ImageFormat {
    /// Short name of the format (`PNG` or `JPG`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPG",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format and pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// The detected format.
    pub format: ImageFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Returns the format and dimensions of the image in `source`.
///
/// PNG is tried first, then JFIF. Returns `None` for anything else,
/// including truncated or malformed headers and I/O failures.
pub fn sniff<R: Read + Seek>(source: &mut R) -> Option<ImageInfo> {
    if let Ok(Some(info)) = sniff_png(source) {
        return Some(info);
    }
    sniff_jpeg(source).ok().flatten()
}

fn sniff_png<R: Read + Seek>(source: &mut R) -> io::Result<Option<ImageInfo>> {
    source.rewind()?;

    if read_array::<8, _>(source)? != PNG_SIGNATURE {
        return Ok(None);
    }

    let length = read_u32(source)?;
    let chunk_type = read_array::<4, _>(source)?;
    if length != 13 || &chunk_type != b"IHDR" {
        return Ok(None);
    }

    let width = read_u32(source)?;
    let height = read_u32(source)?;
    Ok(Some(ImageInfo {
        format: ImageFormat::Png,
        width,
        height,
    }))
}

fn sniff_jpeg<R: Read + Seek>(source: &mut R) -> io::Result<Option<ImageInfo>> {
    source.rewind()?;

    if read_array::<4, _>(source)? != JFIF_SIGNATURE {
        return Ok(None);
    }

    // The APP0 length counts itself and the identifier we read next.
    let app0_length = read_u16(source)?;
    if &read_array::<4, _>(source)? != b"JFIF" || app0_length < 6 {
        return Ok(None);
    }
    source.seek(SeekFrom::Current(i64::from(app0_length) - 6))?;

    loop {
        let marker = read_array::<2, _>(source)?;
        let length = read_u16(source)?;

        if marker == SOF0 {
            let _precision = read_array::<1, _>(source)?;
            let height = read_u16(source)?;
            let width = read_u16(source)?;
            return Ok(Some(ImageInfo {
                format: ImageFormat::Jpeg,
                width: u32::from(width),
                height: u32::from(height),
            }));
        }

        if marker[0] != 0xff || length < 2 {
            return Ok(None);
        }
        source.seek(SeekFrom::Current(i64::from(length) - 2))?;
    }
}

fn read_array<const N: usize, R: Read>(source: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0; N];
    source.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u16<R: Read>(source: &mut R) -> io::Result<u16> {
    read_array(source).map(u16::from_be_bytes)
}

fn read_u32<R: Read>(source: &mut R) -> io::Result<u32> {
    read_array(source).map(u32::from_be_bytes)
}
