/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Image resource section
//!
//! The section is a list of `8BIM` tagged blocks. Blocks are first
//! collected by id, then every id we understand is handed to its
//! handler, which seeks back to the payload and parses it.
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use zune_core::bytestream::ZByteReaderTrait;
use zune_core::log::{trace, warn};

use crate::constants::{resource_ids, BIM_SIGNATURE, THUMBNAIL_HEADER_SIZE};
use crate::cursor::PsdReader;
use crate::errors::PSDDecodeErrors;
use crate::options::PSDOptions;

/// A resource block, the payload is left in the stream
#[derive(Debug, Clone)]
pub struct ImageResourceBlock {
    pub id:     u16,
    pub name:   String,
    pub length: u64,
    /// Stream offset of the payload
    pub pos:    u64
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResolutionUnit {
    Inch,
    Centimeter
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ResolutionInfo {
    pub x_resolution: f64,
    pub y_resolution: f64,
    pub unit:         ResolutionUnit
}

/// Decoded embedded thumbnail, always RGB
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub width:  usize,
    pub height: usize,
    pub pixels: Vec<u8>
}

/// Everything the image resource section told us
#[derive(Debug, Clone, Default)]
pub struct ImageResources {
    pub resolution:         Option<ResolutionInfo>,
    pub alpha_names:        Vec<String>,
    /// Background color as stored, red, green, blue and alpha
    pub background_color:   Option<[u8; 4]>,
    pub thumbnail:          Option<Thumbnail>,
    pub icc_profile:        Option<Vec<u8>>,
    pub exif:               Option<Vec<u8>>,
    #[cfg(feature = "metadata")]
    pub exif_fields:        Option<Vec<exif::Field>>,
    pub xmp:                Option<String>,
    pub iptc:               Option<Vec<u8>>,
    pub copyright:          bool,
    pub transparency_index: Option<u16>,
    pub pixel_aspect_ratio: Option<f64>
}

impl ImageResources {
    /// Background the composite was flattened against, in `0.0..=1.0`
    ///
    /// White when the file doesn't carry one
    pub fn background(&self) -> [f64; 4] {
        match self.background_color {
            Some(color) => color.map(|x| f64::from(x) / 255.0),
            None => [1.0; 4]
        }
    }
}

type ResourceHandler<T> =
    fn(&mut PsdReader<T>, &ImageResourceBlock, &mut ImageResources, &PSDOptions)
        -> Result<(), PSDDecodeErrors>;

/// Handlers of resources we understand, walked in order
fn resource_handlers<T: ZByteReaderTrait>() -> [(u16, ResourceHandler<T>); 13] {
    use crate::constants::resource_ids::*;

    [
        (RESOLUTION_INFO, load_resolution_info),
        (ALPHA_NAMES, load_alpha_names),
        (BACKGROUND_COLOR, load_background_color),
        (IPTC_NAA, load_iptc),
        (THUMBNAIL_BGR, load_thumbnail),
        (COPYRIGHT_FLAG, load_copyright),
        (THUMBNAIL, load_thumbnail),
        (ICC_PROFILE, load_icc_profile),
        (TRANSPARENCY_INDEX, load_transparency_index),
        (EXIF_DATA_1, load_exif),
        (EXIF_DATA_3, load_exif),
        (XMP_METADATA, load_xmp),
        (PIXEL_ASPECT_RATIO, load_pixel_aspect_ratio)
    ]
}

pub fn read_image_resources<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, options: &PSDOptions
) -> Result<ImageResources, PSDDecodeErrors> {
    let length = u64::from(reader.read_u32()?);
    let start = reader.position()?;
    let end = start + length;

    trace!("Image resource section length: {}", length);

    let mut blocks = BTreeMap::new();

    while reader.position()? < end {
        let block = read_resource_block(reader)?;

        trace!(
            "Resource {} ({:?}), {} bytes",
            block.id,
            block.name,
            block.length
        );
        blocks.insert(block.id, block);
    }
    if reader.position()? != end {
        return Err(PSDDecodeErrors::InconsistentLength("image resource section"));
    }

    let mut resources = ImageResources::default();

    for (id, handler) in resource_handlers::<T>() {
        if let Some(block) = blocks.get(&id) {
            reader.seek(block.pos)?;
            handler(reader, block, &mut resources, options)?;
        }
    }
    reader.seek(end)?;

    Ok(resources)
}

fn read_resource_block<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>
) -> Result<ImageResourceBlock, PSDDecodeErrors> {
    let signature = reader.read_signature()?;

    if signature != BIM_SIGNATURE {
        return Err(PSDDecodeErrors::WrongSignature("image resource", signature));
    }
    let id = reader.read_u16()?;
    let (name, _) = reader.read_pascal_string(2)?;
    let length = u64::from(reader.read_u32()?);
    let pos = reader.position()?;

    // payloads are padded to even size whatever the length says
    reader.skip(length + (length & 1))?;

    Ok(ImageResourceBlock {
        id,
        name,
        length,
        pos
    })
}

/// Metadata failures only matter in strict mode
fn soft_failure(
    options: &PSDOptions, kind: &'static str, reason: String
) -> Result<(), PSDDecodeErrors> {
    if options.get_strict_mode() {
        return Err(PSDDecodeErrors::BadMetadata(kind, reason));
    }
    warn!("Ignoring {}: {}", kind, reason);
    Ok(())
}

fn read_payload<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, options: &PSDOptions
) -> Result<Vec<u8>, PSDDecodeErrors> {
    let limit = options.get_max_channel_bytes();

    if block.length > limit as u64 {
        return Err(PSDDecodeErrors::TooLargeAllocation(
            "image resource",
            block.length,
            limit
        ));
    }
    reader.read_vec(block.length as usize)
}

/// Blocks with a fixed layout must hold at least `size` bytes
fn check_block_size(
    block: &ImageResourceBlock, size: u64, kind: &'static str
) -> Result<(), PSDDecodeErrors> {
    if block.length < size {
        return Err(PSDDecodeErrors::InconsistentLength(kind));
    }
    Ok(())
}

fn load_resolution_info<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, resources: &mut ImageResources,
    _: &PSDOptions
) -> Result<(), PSDDecodeErrors> {
    check_block_size(block, 16, "resolution info")?;

    // 16.16 fixed point
    let h_res = f64::from(reader.read_u32()?) / 65536.0;
    let h_res_unit = reader.read_u16()?;
    let _width_unit = reader.read_u16()?;
    let v_res = f64::from(reader.read_u32()?) / 65536.0;
    let v_res_unit = reader.read_u16()?;
    let _height_unit = reader.read_u16()?;

    if h_res_unit != v_res_unit {
        return Err(PSDDecodeErrors::MismatchedResolutionUnits(
            h_res_unit, v_res_unit
        ));
    }
    let unit = match h_res_unit {
        2 => ResolutionUnit::Centimeter,
        _ => ResolutionUnit::Inch
    };

    resources.resolution = Some(ResolutionInfo {
        x_resolution: h_res,
        y_resolution: v_res,
        unit
    });
    Ok(())
}

fn load_alpha_names<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, resources: &mut ImageResources,
    _: &PSDOptions
) -> Result<(), PSDDecodeErrors> {
    let mut consumed = 0;

    while (consumed as u64) < block.length {
        let (name, length) = reader.read_pascal_string(1)?;
        consumed += length;
        resources.alpha_names.push(name);
    }
    if consumed as u64 != block.length {
        return Err(PSDDecodeErrors::InconsistentLength("alpha channel names"));
    }
    Ok(())
}

fn load_background_color<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, resources: &mut ImageResources,
    _: &PSDOptions
) -> Result<(), PSDDecodeErrors> {
    check_block_size(block, 6, "background color")?;

    let _color_space = reader.read_i16()?;
    let color = reader.read_u32()?;

    // packed with the low byte first
    resources.background_color = Some(color.to_le_bytes());

    Ok(())
}

fn load_iptc<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, resources: &mut ImageResources,
    options: &PSDOptions
) -> Result<(), PSDDecodeErrors> {
    resources.iptc = Some(read_payload(reader, block, options)?);
    Ok(())
}

fn load_copyright<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, resources: &mut ImageResources,
    _: &PSDOptions
) -> Result<(), PSDDecodeErrors> {
    check_block_size(block, 1, "copyright flag")?;

    resources.copyright = reader.read_u8()? != 0;
    Ok(())
}

fn load_thumbnail<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, resources: &mut ImageResources,
    options: &PSDOptions
) -> Result<(), PSDDecodeErrors> {
    check_block_size(block, THUMBNAIL_HEADER_SIZE as u64, "thumbnail")?;

    let format = reader.read_u32()?;
    let width = reader.read_u32()? as usize;
    let height = reader.read_u32()? as usize;
    let width_bytes = reader.read_u32()? as usize;
    let total_size = reader.read_u32()? as usize;
    let _compressed_size = reader.read_u32()?;
    let bpp = usize::from(reader.read_u16()?);
    let planes = usize::from(reader.read_u16()?);

    let row_bytes = (bpp / 8)
        .checked_mul(width)
        .ok_or(PSDDecodeErrors::BadThumbnail("width overflows"))?;

    if row_bytes.abs_diff(width_bytes) > 1 {
        return Err(PSDDecodeErrors::BadThumbnail("width bytes do not match width"));
    }
    let size = width_bytes
        .checked_mul(height)
        .and_then(|x| x.checked_mul(planes))
        .ok_or(PSDDecodeErrors::BadThumbnail("dimensions overflow"))?;

    if size != total_size {
        return Err(PSDDecodeErrors::BadThumbnail("total size does not match dimensions"));
    }
    if format != 1 {
        return soft_failure(options, "thumbnail", "raw thumbnails are not supported".to_string());
    }
    if !options.get_decode_thumbnail() {
        return Ok(());
    }

    let jpeg_block = ImageResourceBlock {
        length: block.length.saturating_sub(THUMBNAIL_HEADER_SIZE as u64),
        ..block.clone()
    };
    let jpeg = read_payload(reader, &jpeg_block, options)?;

    match decode_jpeg(&jpeg, options) {
        Ok((mut pixels, (jpeg_width, jpeg_height))) => {
            if block.id == resource_ids::THUMBNAIL_BGR {
                for pixel in pixels.chunks_exact_mut(3) {
                    pixel.swap(0, 2);
                }
            }
            resources.thumbnail = Some(Thumbnail {
                width: jpeg_width,
                height: jpeg_height,
                pixels
            });
            Ok(())
        }
        Err(reason) => soft_failure(options, "thumbnail", reason)
    }
}

#[cfg(feature = "thumbnail")]
fn decode_jpeg(data: &[u8], options: &PSDOptions) -> Result<(Vec<u8>, (usize, usize)), String> {
    use alloc::format;

    use zune_core::bytestream::ZCursor;
    use zune_core::colorspace::ColorSpace;
    use zune_jpeg::JpegDecoder;

    let jpeg_options = options
        .get_decoder_options()
        .jpeg_set_out_colorspace(ColorSpace::RGB);

    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), jpeg_options);
    let pixels = decoder.decode().map_err(|e| format!("{e:?}"))?;
    let info = decoder
        .info()
        .ok_or_else(|| "jpeg has no image info".to_string())?;

    Ok((pixels, (info.width as usize, info.height as usize)))
}

#[cfg(not(feature = "thumbnail"))]
fn decode_jpeg(_: &[u8], _: &PSDOptions) -> Result<(Vec<u8>, (usize, usize)), String> {
    Err("thumbnail support is disabled".to_string())
}

fn load_icc_profile<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, resources: &mut ImageResources,
    options: &PSDOptions
) -> Result<(), PSDDecodeErrors> {
    let profile = read_payload(reader, block, options)?;

    match validate_icc(&profile) {
        Ok(()) => {
            resources.icc_profile = Some(profile);
            Ok(())
        }
        Err(reason) => soft_failure(options, "icc profile", reason.to_string())
    }
}

/// Check the fixed ICC header, size and `acsp` signature
fn validate_icc(profile: &[u8]) -> Result<(), &'static str> {
    if profile.len() < 128 {
        return Err("profile shorter than its header");
    }
    let size = u32::from_be_bytes([profile[0], profile[1], profile[2], profile[3]]) as usize;

    if size > profile.len() {
        return Err("profile size larger than the resource");
    }
    if &profile[36..40] != b"acsp" {
        return Err("missing acsp signature");
    }
    Ok(())
}

fn load_transparency_index<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, resources: &mut ImageResources,
    _: &PSDOptions
) -> Result<(), PSDDecodeErrors> {
    check_block_size(block, 2, "transparency index")?;

    let index = reader.read_i16()?;

    if !(0..=767).contains(&index) {
        return Err(PSDDecodeErrors::BadTransparencyIndex(index));
    }
    resources.transparency_index = Some(index as u16);

    Ok(())
}

fn load_exif<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, resources: &mut ImageResources,
    options: &PSDOptions
) -> Result<(), PSDDecodeErrors> {
    let data = read_payload(reader, block, options)?;

    #[cfg(feature = "metadata")]
    {
        use alloc::format;

        match exif::Reader::new().read_raw(data.clone()) {
            Ok(parsed) => {
                resources.exif_fields = Some(parsed.fields().cloned().collect());
            }
            Err(e) => {
                soft_failure(options, "exif", format!("{e:?}"))?;
                return Ok(());
            }
        }
    }
    resources.exif = Some(data);

    Ok(())
}

fn load_xmp<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, resources: &mut ImageResources,
    options: &PSDOptions
) -> Result<(), PSDDecodeErrors> {
    let data = read_payload(reader, block, options)?;

    match String::from_utf8(data) {
        Ok(xmp) => resources.xmp = Some(xmp),
        Err(e) => soft_failure(options, "xmp", e.to_string())?
    }
    Ok(())
}

fn load_pixel_aspect_ratio<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, block: &ImageResourceBlock, resources: &mut ImageResources,
    _: &PSDOptions
) -> Result<(), PSDDecodeErrors> {
    check_block_size(block, 12, "pixel aspect ratio")?;

    let _version = reader.read_u32()?;
    resources.pixel_aspect_ratio = Some(reader.read_f64()?);

    Ok(())
}
