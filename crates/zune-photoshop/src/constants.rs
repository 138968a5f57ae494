/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![allow(clippy::upper_case_acronyms)]

/// `8BPS`, start of every photoshop document
pub const PSD_IDENTIFIER_BE: u32 = 0x38425053;
/// `8BIM`, image resources, blend modes and additional layer info
pub const BIM_SIGNATURE: [u8; 4] = *b"8BIM";
/// `8B64`, alternative signature for additional layer info in PSB files
pub const B64_SIGNATURE: [u8; 4] = *b"8B64";

/// Maximum width and height of a version 1 (PSD) document
pub const PSD_MAX_DIMENSIONS: usize = 30_000;
/// Maximum width and height of a version 2 (PSB) document
pub const PSB_MAX_DIMENSIONS: usize = 300_000;
/// Maximum channels a document may declare
pub const MAX_CHANNELS: u16 = 56;

/// Exact length of the color mode data of an indexed image.
///
/// 256 entries of red, followed by 256 greens then 256 blues
pub const PALETTE_LENGTH: usize = 768;

/// Size of the fixed thumbnail resource header
pub const THUMBNAIL_HEADER_SIZE: usize = 28;

/// Global layer mask info shorter than this is treated as absent
pub const GLOBAL_MASK_MIN_LENGTH: u64 = 17;

/// Additional layer info keys whose length field is 8 bytes wide in PSB files
pub const PSB_LONG_LENGTH_KEYS: [[u8; 4]; 13] = [
    *b"LMsk", *b"Lr16", *b"Lr32", *b"Layr", *b"Mt16", *b"Mt32", *b"Mtrn", *b"Alph", *b"FMsk",
    *b"lnk2", *b"FEid", *b"FXid", *b"PxSD"
];

/// Global additional info holding the layers of 16 bit documents
pub const KEY_LAYERS_16: [u8; 4] = *b"Lr16";
/// Global additional info holding the layers of 32 bit documents
pub const KEY_LAYERS_32: [u8; 4] = *b"Lr32";
/// Unicode layer name
pub const KEY_UNICODE_NAME: [u8; 4] = *b"luni";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ColorModes {
    Bitmap = 0,
    Grayscale = 1,
    IndexedColor = 2,
    RGB = 3,
    CYMK = 4,
    MultiChannel = 7,
    DuoTone = 8,
    LabColor = 9
}

impl ColorModes {
    pub fn from_int(int: u16) -> Option<ColorModes> {
        use crate::constants::ColorModes::{
            Bitmap, DuoTone, Grayscale, IndexedColor, LabColor, MultiChannel, CYMK, RGB
        };

        match int {
            0 => Some(Bitmap),
            1 => Some(Grayscale),
            2 => Some(IndexedColor),
            3 => Some(RGB),
            4 => Some(CYMK),
            7 => Some(MultiChannel),
            8 => Some(DuoTone),
            9 => Some(LabColor),
            _ => None
        }
    }

    /// Number of color channels a pixel of this mode carries,
    /// not counting alpha.
    ///
    /// Multichannel documents have no fixed count, the header
    /// decides, so `None` is returned.
    pub const fn color_channels(self) -> Option<usize> {
        match self {
            ColorModes::Bitmap
            | ColorModes::Grayscale
            | ColorModes::IndexedColor
            | ColorModes::DuoTone => Some(1),
            ColorModes::RGB | ColorModes::LabColor => Some(3),
            ColorModes::CYMK => Some(4),
            ColorModes::MultiChannel => None
        }
    }

    /// Whether pixels of this mode can be interpreted by the decoder
    ///
    /// Duotone and Lab are recognised but only readable as raw channel data
    pub const fn is_supported(self) -> bool {
        !matches!(self, ColorModes::DuoTone | ColorModes::LabColor)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompressionMethod {
    NoCompression = 0,
    RLE = 1,
    Zip = 2,
    ZipPrediction = 3
}

impl CompressionMethod {
    pub fn from_int(int: u16) -> Option<CompressionMethod> {
        match int {
            0 => Some(Self::NoCompression),
            1 => Some(Self::RLE),
            2 => Some(Self::Zip),
            3 => Some(Self::ZipPrediction),
            _ => None
        }
    }
}

/// Image resource identifiers understood by the decoder
pub mod resource_ids {
    pub const RESOLUTION_INFO: u16 = 1005;
    pub const ALPHA_NAMES: u16 = 1006;
    pub const BACKGROUND_COLOR: u16 = 1010;
    pub const IPTC_NAA: u16 = 1028;
    pub const THUMBNAIL_BGR: u16 = 1033;
    pub const COPYRIGHT_FLAG: u16 = 1034;
    pub const THUMBNAIL: u16 = 1036;
    pub const ICC_PROFILE: u16 = 1039;
    pub const TRANSPARENCY_INDEX: u16 = 1047;
    pub const EXIF_DATA_1: u16 = 1058;
    pub const EXIF_DATA_3: u16 = 1059;
    pub const XMP_METADATA: u16 = 1060;
    pub const PIXEL_ASPECT_RATIO: u16 = 1064;
}
