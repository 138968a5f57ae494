/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Photoshop specific decoder options
use zune_core::options::DecoderOptions;

use crate::constants::PSB_MAX_DIMENSIONS;

/// Options that influence how a photoshop document is read
///
/// The generic [`DecoderOptions`] are carried along and handed to
/// the decoders of embedded images (the JPEG thumbnail)
#[derive(Debug, Copy, Clone)]
pub struct PSDOptions {
    pub(crate) decoder_options:    DecoderOptions,
    pub(crate) raw_data:           bool,
    pub(crate) unassociated_alpha: bool,
    pub(crate) strict:             bool,
    pub(crate) decode_thumbnail:   bool,
    pub(crate) max_width:          usize,
    pub(crate) max_height:         usize,
    pub(crate) max_channel_bytes:  usize
}

impl Default for PSDOptions {
    fn default() -> Self {
        PSDOptions {
            decoder_options:    DecoderOptions::default(),
            raw_data:           false,
            unassociated_alpha: false,
            strict:             false,
            decode_thumbnail:   true,
            max_width:          PSB_MAX_DIMENSIONS,
            max_height:         PSB_MAX_DIMENSIONS,
            max_channel_bytes:  1 << 30
        }
    }
}

impl PSDOptions {
    /// Create options with their default values
    pub fn new() -> PSDOptions {
        PSDOptions::default()
    }

    /// Return the channel data without color mode interpretation
    ///
    /// CMYK stays CMYK, indexed images return palette indices and
    /// bitmap images return packed bits. Duotone and Lab documents
    /// can only be read this way.
    pub fn set_raw_data(mut self, yes: bool) -> Self {
        self.raw_data = yes;
        self
    }

    pub const fn get_raw_data(&self) -> bool {
        self.raw_data
    }

    /// Keep alpha unassociated instead of premultiplying color
    pub fn set_unassociated_alpha(mut self, yes: bool) -> Self {
        self.unassociated_alpha = yes;
        self
    }

    pub const fn get_unassociated_alpha(&self) -> bool {
        self.unassociated_alpha
    }

    /// Abort on metadata blocks (ICC, EXIF, XMP, thumbnails) that
    /// fail to decode instead of skipping them
    pub fn set_strict_mode(mut self, yes: bool) -> Self {
        self.strict = yes;
        self
    }

    pub const fn get_strict_mode(&self) -> bool {
        self.strict
    }

    /// Whether the embedded JPEG thumbnail should be decoded
    pub fn set_decode_thumbnail(mut self, yes: bool) -> Self {
        self.decode_thumbnail = yes;
        self
    }

    pub const fn get_decode_thumbnail(&self) -> bool {
        self.decode_thumbnail
    }

    /// Set maximum width for which the decoder should not try
    /// decoding images greater than that width
    ///
    /// Values above the format limit have no effect
    pub fn set_max_width(mut self, width: usize) -> Self {
        self.max_width = width;
        self
    }

    pub const fn get_max_width(&self) -> usize {
        self.max_width
    }

    /// Set maximum height for which the decoder should not try
    /// decoding images greater than that height
    pub fn set_max_height(mut self, height: usize) -> Self {
        self.max_height = height;
        self
    }

    pub const fn get_max_height(&self) -> usize {
        self.max_height
    }

    /// Upper bound of bytes a single channel may claim,
    /// compressed or decompressed
    ///
    /// Lengths in the file are checked against this before
    /// anything is allocated for them.
    pub fn set_max_channel_bytes(mut self, limit: usize) -> Self {
        self.max_channel_bytes = limit;
        self
    }

    pub const fn get_max_channel_bytes(&self) -> usize {
        self.max_channel_bytes
    }

    /// Options handed to decoders of embedded images
    pub fn set_decoder_options(mut self, options: DecoderOptions) -> Self {
        self.decoder_options = options;
        self
    }

    pub const fn get_decoder_options(&self) -> DecoderOptions {
        self.decoder_options
    }
}
