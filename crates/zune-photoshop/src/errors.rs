/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::string::String;
use core::fmt::{Debug, Display, Formatter};

use zune_core::bytestream::ZByteIoError;

use crate::constants::{ColorModes, PSD_IDENTIFIER_BE};

/// PSDDecodeErrors that can occur during PSD decoding
pub enum PSDDecodeErrors {
    WrongMagicBytes(u32),
    UnsupportedFileType(u16),
    UnsupportedChannelCount(u16),
    UnsupportedBitDepth(u16),
    UnsupportedColorFormat(Option<ColorModes>),
    LargeDimensions(usize, usize),
    ZeroDimensions,
    /// Compression code found in the file and where
    UnknownCompression(u16, &'static str),
    /// A signature was expected, found the second value
    WrongSignature(&'static str, [u8; 4]),
    /// Indexed images need exactly 768 bytes of palette, duotone needs some data
    BadColorModeData(ColorModes, usize),
    /// Lengths of a section do not add up
    InconsistentLength(&'static str),
    /// Horizontal and vertical resolution units differ
    MismatchedResolutionUnits(u16, u16),
    BadThumbnail(&'static str),
    BadTransparencyIndex(i16),
    /// Strict mode only, a metadata block could not be decoded
    BadMetadata(&'static str, String),
    /// The data claims a larger allocation than allowed
    TooLargeAllocation(&'static str, u64, usize),
    InflateError(String),
    SubimageOutOfRange(usize, usize),
    ScanlineOutOfRange(usize, usize),
    /// Buffer given to hold a scanline is too small
    TooSmallOutput(usize, usize),
    Generic(&'static str),
    IoErrors(ZByteIoError),
    BadRLE
}

impl Debug for PSDDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            PSDDecodeErrors::Generic(reason) => {
                writeln!(f, "{reason}")
            }
            PSDDecodeErrors::WrongMagicBytes(bytes) => {
                writeln!(
                    f,
                    "Expected {:?} but found  {:?}, not a PSD image",
                    PSD_IDENTIFIER_BE.to_be_bytes(),
                    bytes.to_be_bytes()
                )
            }
            PSDDecodeErrors::UnsupportedFileType(version) => {
                writeln!(
                    f,
                    "Unsupported file version {version:?}, known versions are 1 and 2",
                )
            }
            PSDDecodeErrors::UnsupportedChannelCount(channels) => {
                writeln!(
                    f,
                    "Unsupported channel count {channels:?}, expected between 1 and 56"
                )
            }
            PSDDecodeErrors::UnsupportedBitDepth(depth) => {
                writeln!(
                    f,
                    "Unsupported bit depth {depth:?}, supported depths are 1, 8, 16 and 32",
                )
            }
            PSDDecodeErrors::UnsupportedColorFormat(color) => {
                if let Some(color) = color {
                    writeln!(f, "Unsupported color format {color:?}")
                } else {
                    writeln!(f, "Unknown color format")
                }
            }
            PSDDecodeErrors::UnknownCompression(method, place) => {
                writeln!(f, "Unknown compression format {method} in {place}")
            }
            PSDDecodeErrors::WrongSignature(place, found) => {
                writeln!(
                    f,
                    "Bad signature in {place}, found {:?}",
                    String::from_utf8_lossy(found)
                )
            }
            PSDDecodeErrors::BadColorModeData(mode, length) => {
                writeln!(f, "Invalid color mode data length {length} for {mode:?}")
            }
            PSDDecodeErrors::InconsistentLength(place) => {
                writeln!(f, "Inconsistent length in {place}")
            }
            PSDDecodeErrors::MismatchedResolutionUnits(h, v) => {
                writeln!(
                    f,
                    "Horizontal resolution unit {h} does not match vertical unit {v}"
                )
            }
            PSDDecodeErrors::BadThumbnail(reason) => {
                writeln!(f, "Bad thumbnail: {reason}")
            }
            PSDDecodeErrors::BadTransparencyIndex(index) => {
                writeln!(f, "Transparency index {index} out of range")
            }
            PSDDecodeErrors::BadMetadata(kind, reason) => {
                writeln!(f, "Could not decode {kind}: {reason}")
            }
            PSDDecodeErrors::TooLargeAllocation(place, requested, limit) => {
                writeln!(
                    f,
                    "{place} requests {requested} bytes, more than the limit of {limit}"
                )
            }
            PSDDecodeErrors::InflateError(reason) => {
                writeln!(f, "Zip decompression failed: {reason}")
            }
            PSDDecodeErrors::SubimageOutOfRange(requested, count) => {
                writeln!(f, "Subimage {requested} out of range, image has {count}")
            }
            PSDDecodeErrors::ScanlineOutOfRange(requested, height) => {
                writeln!(f, "Scanline {requested} out of range, height is {height}")
            }
            PSDDecodeErrors::TooSmallOutput(expected, found) => {
                writeln!(
                    f,
                    "Output buffer too small, expected {expected} but found {found}"
                )
            }
            PSDDecodeErrors::BadRLE => {
                writeln!(f, "Bad RLE")
            }
            PSDDecodeErrors::LargeDimensions(supported, found) => {
                writeln!(
                    f,
                    "Too large dimensions, supported {supported} but found {found}",
                )
            }
            PSDDecodeErrors::ZeroDimensions => {
                writeln!(f, "Zero found where not expected")
            }
            PSDDecodeErrors::IoErrors(e) => {
                writeln!(f, "I/O error :{:?}", e)
            }
        }
    }
}

impl Display for PSDDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PSDDecodeErrors {}

impl From<&'static str> for PSDDecodeErrors {
    fn from(r: &'static str) -> Self {
        Self::Generic(r)
    }
}

impl From<ZByteIoError> for PSDDecodeErrors {
    fn from(r: ZByteIoError) -> Self {
        Self::IoErrors(r)
    }
}
