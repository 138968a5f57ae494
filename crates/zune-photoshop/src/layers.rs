/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Layer and mask information section
//!
//! Layers are read in two passes, the first walks every layer record
//! and the second walks the channel payloads that follow all the records.
//! 16 and 32 bit documents keep their layers in a `Lr16`/`Lr32` block
//! of the global additional info, which goes through the same parser.
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use zune_core::bytestream::ZByteReaderTrait;
use zune_core::log::{debug, trace};

use crate::channel::{read_channel_data, ChannelId, ChannelInfo, ChannelRecord};
use crate::constants::{
    B64_SIGNATURE, BIM_SIGNATURE, GLOBAL_MASK_MIN_LENGTH, KEY_LAYERS_16, KEY_LAYERS_32,
    KEY_UNICODE_NAME, PSB_LONG_LENGTH_KEYS
};
use crate::cursor::PsdReader;
use crate::errors::PSDDecodeErrors;
use crate::header::{FileHeader, Version};
use crate::options::PSDOptions;

/// A tagged additional info entry, the payload is left in the stream
#[derive(Debug, Copy, Clone)]
pub struct AdditionalInfo {
    pub key:    [u8; 4],
    pub length: u64,
    pub pos:    u64
}

/// Layer mask bounds and fill
#[derive(Debug, Copy, Clone, Default)]
pub struct MaskData {
    pub top:           i32,
    pub left:          i32,
    pub bottom:        i32,
    pub right:         i32,
    pub default_color: u8,
    pub flags:         u8
}

impl MaskData {
    pub const fn width(&self) -> usize {
        self.right.abs_diff(self.left) as usize
    }

    pub const fn height(&self) -> usize {
        self.bottom.abs_diff(self.top) as usize
    }
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub top:             i32,
    pub left:            i32,
    pub bottom:          i32,
    pub right:           i32,
    pub width:           usize,
    pub height:          usize,
    pub channels:        Vec<ChannelInfo>,
    /// Index into `channels` by channel id
    pub channel_map:     BTreeMap<ChannelId, usize>,
    pub blend_mode:      [u8; 4],
    pub opacity:         u8,
    pub clipping:        u8,
    pub flags:           u8,
    pub mask:            MaskData,
    pub name:            String,
    pub additional_info: Vec<AdditionalInfo>
}

impl Layer {
    pub fn channel(&self, id: ChannelId) -> Option<&ChannelInfo> {
        self.channel_map.get(&id).map(|index| &self.channels[*index])
    }

    pub fn has_transparency(&self) -> bool {
        self.channel_map.contains_key(&ChannelId::Transparency)
    }

    /// Bit 1 of the flags marks hidden layers
    pub const fn is_visible(&self) -> bool {
        self.flags & 0b10 == 0
    }

    /// Blend mode key, e.g `norm` or `mul `
    pub fn blend_mode_key(&self) -> &str {
        core::str::from_utf8(&self.blend_mode).unwrap_or("")
    }
}

/// Global layer mask info, a single overlay mask for the document
#[derive(Debug, Copy, Clone, Default)]
pub struct GlobalMaskInfo {
    pub overlay_color_space: u16,
    pub color_components:    [u16; 4],
    pub opacity:             u16,
    pub kind:                i8
}

/// Result of one pass over a layer list
#[derive(Debug, Clone, Default)]
pub struct LayerInfo {
    pub layers:       Vec<Layer>,
    /// The layer count was negative, the first alpha channel
    /// of the merged image is its transparency
    pub transparency: bool
}

#[derive(Debug, Clone, Default)]
pub struct LayerMaskSection {
    pub layers:          Vec<Layer>,
    pub transparency:    bool,
    pub global_mask:     Option<GlobalMaskInfo>,
    pub additional_info: Vec<AdditionalInfo>
}

pub fn read_layer_mask_section<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, header: &FileHeader, options: &PSDOptions
) -> Result<LayerMaskSection, PSDDecodeErrors> {
    let version = header.version;
    let length = reader.read_length(version)?;
    let start = reader.position()?;
    let end = end_of(start, length, "layer and mask section")?;

    trace!("Layer and mask section length: {}", length);

    let mut section = LayerMaskSection::default();

    if length == 0 {
        return Ok(section);
    }

    let info_length = reader.read_length(version)?;
    let info_start = reader.position()?;
    let info_end = end_of(info_start, info_length, "layer info")?;

    if info_end > end {
        return Err(PSDDecodeErrors::InconsistentLength("layer info"));
    }
    if info_length > 0 {
        let info = read_layer_info(reader, header, options)?;
        section.layers = info.layers;
        section.transparency = info.transparency;
    }
    // pass 2 may leave padding behind
    reader.seek(info_end)?;

    section.global_mask = read_global_mask_info(reader, end)?;

    while end.saturating_sub(reader.position()?) >= 12 {
        let entry = read_additional_info_entry(reader, version)?;
        let next = round_up4(entry.length)
            .and_then(|x| entry.pos.checked_add(x))
            .filter(|x| *x <= end)
            .ok_or(PSDDecodeErrors::InconsistentLength("global additional info"))?;

        if entry.key == KEY_LAYERS_16 || entry.key == KEY_LAYERS_32 {
            debug!(
                "Reading layers from {}",
                core::str::from_utf8(&entry.key).unwrap_or("")
            );
            if entry.length > 0 {
                let info = read_layer_info(reader, header, options)?;
                section.layers.extend(info.layers);
                section.transparency |= info.transparency;
            }
        } else {
            trace!("Skipping global additional info {:?}", entry.key);
        }
        section.additional_info.push(entry);
        reader.seek(next)?;
    }
    reader.seek(end)?;

    debug!("Layers: {}", section.layers.len());

    Ok(section)
}

/// Parse a layer list, count then both passes
///
/// Shared by the layer info slot and the `Lr16`/`Lr32` blocks.
pub fn read_layer_info<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, header: &FileHeader, options: &PSDOptions
) -> Result<LayerInfo, PSDDecodeErrors> {
    let count = reader.read_i16()?;
    let transparency = count < 0;
    let count = count.unsigned_abs();

    trace!("Layer count: {}, transparency: {}", count, transparency);

    let mut records = Vec::with_capacity(usize::from(count));

    for _ in 0..count {
        records.push(read_layer_record(reader, header, options)?);
    }

    let mut layers = Vec::with_capacity(records.len());

    for (mut layer, channels) in records {
        for record in channels {
            let (width, height) = if record.id.is_mask() {
                (layer.mask.width(), layer.mask.height())
            } else {
                (layer.width, layer.height)
            };
            let channel = read_channel_data(reader, &record, width, height, header, options)?;

            layer.channel_map.insert(record.id, layer.channels.len());
            layer.channels.push(channel);
        }
        layers.push(layer);
    }

    Ok(LayerInfo {
        layers,
        transparency
    })
}

fn read_bounds<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, version: Version, options: &PSDOptions
) -> Result<[i32; 4], PSDDecodeErrors> {
    let bounds = [
        reader.read_i32()?,
        reader.read_i32()?,
        reader.read_i32()?,
        reader.read_i32()?
    ];
    let [top, left, bottom, right] = bounds;
    let max_width = version.max_dimensions().min(options.get_max_width());
    let max_height = version.max_dimensions().min(options.get_max_height());
    let width = right.abs_diff(left) as usize;
    let height = bottom.abs_diff(top) as usize;

    if width > max_width {
        return Err(PSDDecodeErrors::LargeDimensions(max_width, width));
    }
    if height > max_height {
        return Err(PSDDecodeErrors::LargeDimensions(max_height, height));
    }
    Ok(bounds)
}

/// First pass over a single layer, everything but the pixels
fn read_layer_record<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, header: &FileHeader, options: &PSDOptions
) -> Result<(Layer, Vec<ChannelRecord>), PSDDecodeErrors> {
    let version = header.version;
    let [top, left, bottom, right] = read_bounds(reader, version, options)?;
    let channel_count = reader.read_u16()?;

    let mut records = Vec::with_capacity(usize::from(channel_count));

    for _ in 0..channel_count {
        let id = reader.read_i16()?;
        let id = ChannelId::from_int(id).ok_or(PSDDecodeErrors::Generic("Unknown layer channel id"))?;
        let data_length = reader.read_length(version)?;

        records.push(ChannelRecord { id, data_length });
    }

    let signature = reader.read_signature()?;

    if signature != BIM_SIGNATURE {
        return Err(PSDDecodeErrors::WrongSignature("layer blend mode", signature));
    }
    let blend_mode = reader.read_signature()?;
    let opacity = reader.read_u8()?;
    let clipping = reader.read_u8()?;
    let flags = reader.read_u8()?;
    // filler
    reader.skip(1)?;

    let extra_length = u64::from(reader.read_u32()?);
    let extra_start = reader.position()?;
    let extra_end = extra_start + extra_length;

    let mask = read_mask_data(reader, version, options)?;

    // blending ranges aren't modelled
    let ranges_length = u64::from(reader.read_u32()?);
    reader.skip(ranges_length)?;

    let (mut name, _) = reader.read_pascal_string(4)?;

    let consumed = reader.position()? - extra_start;
    let mut remaining = extra_length
        .checked_sub(consumed)
        .ok_or(PSDDecodeErrors::InconsistentLength("layer extra data"))?;

    let mut additional_info = Vec::new();

    while remaining > 0 {
        let entry = read_additional_info_entry(reader, version)?;
        let entry_end = end_of(entry.pos, entry.length, "layer additional info")?;
        let entry_size = 8 + length_size(&entry.key, version);

        remaining = entry
            .length
            .checked_add(entry_size)
            .and_then(|x| remaining.checked_sub(x))
            .ok_or(PSDDecodeErrors::InconsistentLength("layer additional info"))?;

        if entry.key == KEY_UNICODE_NAME {
            if let Some(unicode) = read_unicode_name(reader, &entry, options)? {
                name = unicode;
            }
        }
        additional_info.push(entry);
        reader.seek(entry_end)?;
    }
    reader.seek(extra_end)?;

    trace!(
        "Layer {:?}: ({}, {}, {}, {}), {} channels",
        name,
        top,
        left,
        bottom,
        right,
        channel_count
    );

    let layer = Layer {
        top,
        left,
        bottom,
        right,
        width: right.abs_diff(left) as usize,
        height: bottom.abs_diff(top) as usize,
        channels: Vec::with_capacity(records.len()),
        channel_map: BTreeMap::new(),
        blend_mode,
        opacity,
        clipping,
        flags,
        mask,
        name,
        additional_info
    };

    Ok((layer, records))
}

fn read_mask_data<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, version: Version, options: &PSDOptions
) -> Result<MaskData, PSDDecodeErrors> {
    let length = u64::from(reader.read_u32()?);
    let start = reader.position()?;
    let mut mask = MaskData::default();

    if length >= 20 {
        let [top, left, bottom, right] = read_bounds(reader, version, options)?;
        mask = MaskData {
            top,
            left,
            bottom,
            right,
            default_color: reader.read_u8()?,
            flags: reader.read_u8()?
        };
    }
    reader.seek(start + length)?;

    Ok(mask)
}

const fn length_size(key: &[u8; 4], version: Version) -> u64 {
    if version.is_large_document() && is_long_length_key(key) {
        8
    } else {
        4
    }
}

const fn is_long_length_key(key: &[u8; 4]) -> bool {
    let mut i = 0;

    while i < PSB_LONG_LENGTH_KEYS.len() {
        let k = PSB_LONG_LENGTH_KEYS[i];

        if k[0] == key[0] && k[1] == key[1] && k[2] == key[2] && k[3] == key[3] {
            return true;
        }
        i += 1;
    }
    false
}

fn round_up4(length: u64) -> Option<u64> {
    length.checked_add(3).map(|x| x & !3)
}

/// `start + length`, failing on lengths that run off the end of the address space
fn end_of(start: u64, length: u64, section: &'static str) -> Result<u64, PSDDecodeErrors> {
    start
        .checked_add(length)
        .ok_or(PSDDecodeErrors::InconsistentLength(section))
}

/// Read signature, key and length of a tagged entry,
/// the reader is left at the start of its payload
fn read_additional_info_entry<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, version: Version
) -> Result<AdditionalInfo, PSDDecodeErrors> {
    let signature = reader.read_signature()?;

    if signature != BIM_SIGNATURE && signature != B64_SIGNATURE {
        return Err(PSDDecodeErrors::WrongSignature("additional layer info", signature));
    }
    let key = reader.read_signature()?;
    let length = if length_size(&key, version) == 8 {
        reader.read_u64()?
    } else {
        u64::from(reader.read_u32()?)
    };
    let pos = reader.position()?;

    Ok(AdditionalInfo { key, length, pos })
}

/// `luni`, a code unit count followed by UTF-16BE text
fn read_unicode_name<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, entry: &AdditionalInfo, options: &PSDOptions
) -> Result<Option<String>, PSDDecodeErrors> {
    if entry.length < 4 {
        return Ok(None);
    }
    let size = u64::from(reader.read_u32()?) * 2;
    let limit = options.get_max_channel_bytes();

    if 4 + size > entry.length {
        return Err(PSDDecodeErrors::InconsistentLength("unicode layer name"));
    }
    if size > limit as u64 {
        return Err(PSDDecodeErrors::TooLargeAllocation("unicode layer name", size, limit));
    }
    let bytes = reader.read_vec(size as usize)?;
    let text: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|x| u16::from_be_bytes([x[0], x[1]]))
        .collect();

    let mut name = String::from_utf16_lossy(&text);
    // some writers count the terminator
    while name.ends_with('\0') {
        name.pop();
    }
    Ok(Some(name))
}

/// Global layer mask info, absent when too few bytes remain
fn read_global_mask_info<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, section_end: u64
) -> Result<Option<GlobalMaskInfo>, PSDDecodeErrors> {
    let remaining = section_end.saturating_sub(reader.position()?);

    if remaining < GLOBAL_MASK_MIN_LENGTH {
        return Ok(None);
    }
    let length = u64::from(reader.read_u32()?);
    let start = reader.position()?;

    if length == 0 {
        return Ok(None);
    }
    if start + length > section_end {
        return Err(PSDDecodeErrors::InconsistentLength("global layer mask info"));
    }
    let info = GlobalMaskInfo {
        overlay_color_space: reader.read_u16()?,
        color_components:    [
            reader.read_u16()?,
            reader.read_u16()?,
            reader.read_u16()?,
            reader.read_u16()?
        ],
        opacity:             reader.read_u16()?,
        kind:                reader.read_u8()? as i8
    };
    reader.seek(start + length)?;

    Ok(Some(info))
}
