/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A layered Photoshop decoder
//!
//! Reads version 1 (`.psd`) and version 2 (`.psb`, large document) files.
//!
//! The merged composite is exposed as subimage 0 and every layer as a
//! subimage after it, each with its own dimensions and canvas origin.
//! Scanlines are decoded on request, so opening a file only walks its
//! structure.
//!
//! ## Supported
//! - Bitmap, Grayscale, Indexed, RGB, CMYK and Multichannel documents,
//!   Duotone and Lab when reading raw channel data
//! - 1, 8, 16 and 32 bit channels
//! - Raw, RLE, ZIP and ZIP with prediction compressed channels
//! - Image resources such as resolution, ICC profiles, EXIF, XMP and
//!   the embedded JPEG thumbnail
//!
//! Layers are not flattened or blended, only their pixels are returned.
//!
//! # Example
//! - Reading a psd file
//! ```no_run
//! use zune_photoshop::errors::PSDDecodeErrors;
//! use zune_core::result::DecodingResult;
//! use zune_photoshop::PSDDecoder;
//!
//! fn main()->Result<(),PSDDecodeErrors>{
//!     use zune_core::bytestream::ZCursor;
//!     let mut decoder = PSDDecoder::new(ZCursor::new(&[]));
//!     let px = decoder.decode()?;
//!
//!     match px {
//!         DecodingResult::U8(_) => {}
//!         DecodingResult::U16(_) => {}
//!         DecodingResult::F32(_) => {}
//!         _=>unreachable!()
//!     };
//!     Ok(())
//! }
//! ```
//!
//! # Features
//! - `std`: Read from files and implement `std::error::Error` for errors
//! - `thumbnail`: Decode the embedded JPEG thumbnail with `zune-jpeg`
//! - `metadata`: Parse EXIF resources with `kamadak-exif`
//! - `log`: Forward trace messages to the `log` crate
#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;
pub extern crate zune_core;

pub use decoder::PSDDecoder;
pub use options::PSDOptions;

pub mod channel;
pub mod color_mode;
pub mod compression;
pub mod constants;
pub mod convert;
mod cursor;
pub mod decoder;
pub mod errors;
pub mod header;
pub mod image_data;
pub mod layers;
pub mod options;
pub mod resources;
pub mod spec;
