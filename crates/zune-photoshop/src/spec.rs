/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Per subimage layout
//!
//! Subimage 0 is the merged composite, subimages `1..` are the layers
//! in file order. Each gets a spec describing what a scanline of it
//! looks like, and how to assemble one from the stored channels.
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use zune_core::bit_depth::BitDepth;
use zune_core::colorspace::ColorSpace;

use crate::channel::ChannelId;
use crate::constants::ColorModes;
use crate::errors::PSDDecodeErrors;
use crate::header::FileHeader;
use crate::layers::Layer;
use crate::options::PSDOptions;
use crate::resources::ImageResources;

/// How stored channels turn into output channels
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Conversion {
    /// Interleave only
    Passthrough,
    /// Packed bits to RGB
    Bitmap,
    /// Palette lookup to RGB(A)
    Indexed,
    /// CMYK(A) to RGB(A)
    Cmyk
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AlphaPolicy {
    Untouched,
    /// Composite flattened against the background color
    RemoveBackground { unassociate: bool },
    /// Layer alpha turned into premultiplied alpha
    Associate
}

#[derive(Debug, Clone)]
pub struct SubimageSpec {
    pub width:           usize,
    pub height:          usize,
    /// Origin of the subimage on the canvas, layers only
    pub x:               i32,
    pub y:               i32,
    pub nchannels:       usize,
    pub channel_names:   Vec<String>,
    pub alpha_channel:   Option<usize>,
    pub depth:           BitDepth,
    /// Bits a stored sample uses, 1 for packed bitmap rows in raw mode
    pub bits_per_sample: u16,
    pub(crate) sources:  Vec<ChannelId>,
    pub(crate) convert:  Conversion,
    pub(crate) alpha:    AlphaPolicy
}

impl SubimageSpec {
    /// Bytes of one output scanline
    ///
    /// Packed bitmap rows aren't interleaved, each channel's row
    /// follows the previous one.
    pub const fn scanline_bytes(&self) -> usize {
        if self.bits_per_sample == 1 {
            self.nchannels * ((self.width + 7) / 8)
        } else {
            self.width * self.nchannels * (self.bits_per_sample as usize / 8)
        }
    }

    pub fn colorspace(&self) -> ColorSpace {
        let has_alpha = self.alpha_channel.is_some();

        match (self.nchannels, has_alpha) {
            (1, _) => ColorSpace::Luma,
            (2, true) => ColorSpace::LumaA,
            (3, false) => ColorSpace::RGB,
            (4, true) => ColorSpace::RGBA,
            (4, false) => ColorSpace::CMYK,
            _ => ColorSpace::Unknown
        }
    }
}

fn color_names(mode: ColorModes, raw: bool, count: usize) -> Vec<String> {
    let names: &[&str] = match (mode, raw) {
        (ColorModes::RGB, _)
        | (ColorModes::CYMK | ColorModes::IndexedColor | ColorModes::Bitmap, false) => {
            &["R", "G", "B"]
        }
        (ColorModes::CYMK, true) => &["C", "M", "Y", "K"],
        (ColorModes::IndexedColor, true) => &["I"],
        (ColorModes::LabColor, _) => &["L", "a", "b"],
        (ColorModes::Grayscale | ColorModes::DuoTone | ColorModes::Bitmap, _) => &["Y"],
        (ColorModes::MultiChannel, _) => &[]
    };
    if names.is_empty() {
        return (0..count).map(|x| x.to_string()).collect();
    }
    names.iter().map(|x| x.to_string()).collect()
}

/// Color channels stored per pixel, before any conversion
fn stored_color_channels(header: &FileHeader) -> usize {
    header
        .color_mode
        .color_channels()
        .unwrap_or(header.channel_count)
        .min(header.channel_count)
}

fn check_depth(header: &FileHeader, raw: bool) -> Result<(), PSDDecodeErrors> {
    if raw {
        return Ok(());
    }
    let ok = match header.color_mode {
        ColorModes::Bitmap => header.depth == 1,
        ColorModes::IndexedColor => header.depth == 8,
        _ => header.depth != 1
    };
    if !ok {
        return Err(PSDDecodeErrors::UnsupportedBitDepth(header.depth));
    }
    Ok(())
}

/// Shared layout logic, `has_alpha` says whether an alpha source exists
fn layout(
    header: &FileHeader, resources: &ImageResources, options: &PSDOptions, has_alpha: bool,
    alpha_source: ChannelId
) -> (Vec<ChannelId>, Vec<String>, Option<usize>, Conversion) {
    let raw = options.get_raw_data();
    let colors = stored_color_channels(header);
    let mut sources: Vec<ChannelId> = (0..colors).map(|x| ChannelId::Color(x as u16)).collect();

    let (convert, out_colors) = match header.color_mode {
        _ if raw => (Conversion::Passthrough, colors),
        ColorModes::Bitmap => (Conversion::Bitmap, 3),
        ColorModes::IndexedColor => (Conversion::Indexed, 3),
        ColorModes::CYMK => (Conversion::Cmyk, 3),
        _ => (Conversion::Passthrough, colors)
    };
    let mut names = color_names(header.color_mode, raw, out_colors);

    let with_alpha = match convert {
        Conversion::Bitmap => false,
        Conversion::Indexed => has_alpha || resources.transparency_index.is_some(),
        _ => has_alpha
    };
    let mut alpha_channel = None;

    if with_alpha {
        if has_alpha {
            sources.push(alpha_source);
        }
        alpha_channel = Some(names.len());
        names.push("A".to_string());
    }
    (sources, names, alpha_channel, convert)
}

pub fn composite_spec(
    header: &FileHeader, resources: &ImageResources, transparency: bool, options: &PSDOptions
) -> Result<SubimageSpec, PSDDecodeErrors> {
    let raw = options.get_raw_data();
    check_depth(header, raw)?;

    let colors = stored_color_channels(header);

    if let Some(required) = header.color_mode.color_channels() {
        if header.channel_count < required {
            return Err(PSDDecodeErrors::UnsupportedChannelCount(
                header.channel_count as u16
            ));
        }
    }
    // the transparency is the first channel after the colors
    let has_alpha = transparency && header.channel_count > colors;
    let (mut sources, mut names, alpha_channel, convert) = layout(
        header,
        resources,
        options,
        has_alpha,
        ChannelId::Color(colors as u16)
    );

    if raw {
        // every extra channel, named after the alpha channel names resource
        let mut alpha_names = resources.alpha_names.iter();

        for id in sources.len()..header.channel_count {
            sources.push(ChannelId::Color(id as u16));
            let name = alpha_names
                .next()
                .cloned()
                .unwrap_or_else(|| format!("channel{id}"));
            names.push(name);
        }
    }

    let alpha = if has_alpha && !raw {
        AlphaPolicy::RemoveBackground {
            unassociate: options.get_unassociated_alpha()
        }
    } else {
        AlphaPolicy::Untouched
    };

    Ok(build(
        header,
        raw,
        0,
        0,
        header.width,
        header.height,
        sources,
        names,
        alpha_channel,
        convert,
        alpha
    ))
}

pub fn layer_spec(
    header: &FileHeader, resources: &ImageResources, layer: &Layer, options: &PSDOptions
) -> Result<SubimageSpec, PSDDecodeErrors> {
    let raw = options.get_raw_data();
    check_depth(header, raw)?;

    let has_alpha = layer.has_transparency();
    let (sources, names, alpha_channel, convert) =
        layout(header, resources, options, has_alpha, ChannelId::Transparency);

    let alpha = if has_alpha && !raw && !options.get_unassociated_alpha() {
        AlphaPolicy::Associate
    } else {
        AlphaPolicy::Untouched
    };

    Ok(build(
        header,
        raw,
        layer.left,
        layer.top,
        layer.width,
        layer.height,
        sources,
        names,
        alpha_channel,
        convert,
        alpha
    ))
}

#[allow(clippy::too_many_arguments)]
fn build(
    header: &FileHeader, raw: bool, x: i32, y: i32, width: usize, height: usize,
    sources: Vec<ChannelId>, channel_names: Vec<String>, alpha_channel: Option<usize>,
    convert: Conversion, alpha: AlphaPolicy
) -> SubimageSpec {
    let bits_per_sample = if raw && header.depth == 1 {
        1
    } else {
        (header.bytes_per_sample() * 8) as u16
    };

    SubimageSpec {
        width,
        height,
        x,
        y,
        nchannels: channel_names.len(),
        channel_names,
        alpha_channel,
        depth: header.bit_depth(),
        bits_per_sample,
        sources,
        convert,
        alpha
    }
}
