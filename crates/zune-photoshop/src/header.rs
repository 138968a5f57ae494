/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The fixed 26 byte file header
use zune_core::bit_depth::BitDepth;
use zune_core::bytestream::ZByteReaderTrait;
use zune_core::log::trace;

use crate::constants::{
    ColorModes, MAX_CHANNELS, PSB_MAX_DIMENSIONS, PSD_IDENTIFIER_BE, PSD_MAX_DIMENSIONS
};
use crate::cursor::PsdReader;
use crate::errors::PSDDecodeErrors;
use crate::options::PSDOptions;

/// Container flavour, decides how wide lengths and offsets are
/// for the rest of the file
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Version {
    /// Version 1, 32 bit lengths
    Psd,
    /// Version 2, large document format with 64 bit lengths
    Psb
}

impl Version {
    pub const fn from_int(int: u16) -> Option<Version> {
        match int {
            1 => Some(Version::Psd),
            2 => Some(Version::Psb),
            _ => None
        }
    }

    pub const fn max_dimensions(self) -> usize {
        match self {
            Version::Psd => PSD_MAX_DIMENSIONS,
            Version::Psb => PSB_MAX_DIMENSIONS
        }
    }

    pub const fn is_large_document(self) -> bool {
        matches!(self, Version::Psb)
    }
}

/// Header fields exactly as stored
#[derive(Debug, Copy, Clone, Default)]
pub struct RawHeader {
    pub signature:     u32,
    pub version:       u16,
    pub channel_count: u16,
    pub height:        u32,
    pub width:         u32,
    pub depth:         u16,
    pub color_mode:    u16
}

/// A validated file header
#[derive(Debug, Copy, Clone)]
pub struct FileHeader {
    pub version:       Version,
    pub channel_count: usize,
    pub width:         usize,
    pub height:        usize,
    /// Bits per channel sample, 1, 8, 16 or 32
    pub depth:         u16,
    pub color_mode:    ColorModes
}

impl FileHeader {
    /// Bytes one row of a single channel occupies
    pub const fn row_bytes(&self, width: usize) -> usize {
        (width * self.depth as usize + 7) / 8
    }

    /// Bytes one sample occupies once unpacked,
    /// bitmap images unpack to a byte per sample
    pub const fn bytes_per_sample(&self) -> usize {
        match self.depth {
            16 => 2,
            32 => 4,
            _ => 1
        }
    }

    pub const fn bit_depth(&self) -> BitDepth {
        match self.depth {
            16 => BitDepth::Sixteen,
            32 => BitDepth::Float32,
            _ => BitDepth::Eight
        }
    }
}

pub fn read_header<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>
) -> Result<RawHeader, PSDDecodeErrors> {
    let signature = reader.read_u32()?;
    let version = reader.read_u16()?;
    // 6 reserved bytes, never validated
    reader.skip(6)?;
    let channel_count = reader.read_u16()?;
    let height = reader.read_u32()?;
    let width = reader.read_u32()?;
    let depth = reader.read_u16()?;
    let color_mode = reader.read_u16()?;

    Ok(RawHeader {
        signature,
        version,
        channel_count,
        height,
        width,
        depth,
        color_mode
    })
}

/// Check header fields in file order, the first bad one is reported
pub fn validate_header(
    raw: &RawHeader, options: &PSDOptions
) -> Result<FileHeader, PSDDecodeErrors> {
    if raw.signature != PSD_IDENTIFIER_BE {
        return Err(PSDDecodeErrors::WrongMagicBytes(raw.signature));
    }

    let version =
        Version::from_int(raw.version).ok_or(PSDDecodeErrors::UnsupportedFileType(raw.version))?;

    if raw.channel_count < 1 || raw.channel_count > MAX_CHANNELS {
        return Err(PSDDecodeErrors::UnsupportedChannelCount(raw.channel_count));
    }

    let height = raw.height as usize;
    let width = raw.width as usize;

    if width == 0 || height == 0 {
        return Err(PSDDecodeErrors::ZeroDimensions);
    }

    let max_height = version.max_dimensions().min(options.get_max_height());
    let max_width = version.max_dimensions().min(options.get_max_width());

    if height > max_height {
        return Err(PSDDecodeErrors::LargeDimensions(max_height, height));
    }
    if width > max_width {
        return Err(PSDDecodeErrors::LargeDimensions(max_width, width));
    }

    if !matches!(raw.depth, 1 | 8 | 16 | 32) {
        return Err(PSDDecodeErrors::UnsupportedBitDepth(raw.depth));
    }

    let color_mode = ColorModes::from_int(raw.color_mode)
        .ok_or(PSDDecodeErrors::UnsupportedColorFormat(None))?;

    if !options.get_raw_data() && !color_mode.is_supported() {
        return Err(PSDDecodeErrors::UnsupportedColorFormat(Some(color_mode)));
    }

    trace!("Version: {:?}", version);
    trace!("Image width: {}", width);
    trace!("Image height: {}", height);
    trace!("Channels: {}", raw.channel_count);
    trace!("Bit depth: {}", raw.depth);
    trace!("Color mode: {:?}", color_mode);

    Ok(FileHeader {
        version,
        channel_count: usize::from(raw.channel_count),
        width,
        height,
        depth: raw.depth,
        color_mode
    })
}
