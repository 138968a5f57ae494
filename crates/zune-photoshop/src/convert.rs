/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Scanline assembly, color mode conversion and alpha handling
//!
//! Everything here works on native endian samples of a single scanline.
use alloc::vec::Vec;

use crate::color_mode::ColorModeData;

/// A channel sample as it comes out of the channel engine
pub trait Sample: Copy + Default {
    const BYTES: usize;

    fn from_ne(bytes: &[u8]) -> Self;

    fn write_ne(self, bytes: &mut [u8]);

    /// Value in `0.0..=1.0` for integer samples
    fn to_unit(self) -> f32;

    /// Inverse of [`to_unit`](Sample::to_unit), clamping integers
    fn from_unit(value: f32) -> Self;
}

impl Sample for u8 {
    const BYTES: usize = 1;

    #[inline(always)]
    fn from_ne(bytes: &[u8]) -> Self {
        bytes[0]
    }

    #[inline(always)]
    fn write_ne(self, bytes: &mut [u8]) {
        bytes[0] = self;
    }

    #[inline(always)]
    fn to_unit(self) -> f32 {
        f32::from(self) / 255.0
    }

    #[inline(always)]
    fn from_unit(value: f32) -> Self {
        (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
    }
}

impl Sample for u16 {
    const BYTES: usize = 2;

    #[inline(always)]
    fn from_ne(bytes: &[u8]) -> Self {
        u16::from_ne_bytes([bytes[0], bytes[1]])
    }

    #[inline(always)]
    fn write_ne(self, bytes: &mut [u8]) {
        bytes[..2].copy_from_slice(&self.to_ne_bytes());
    }

    #[inline(always)]
    fn to_unit(self) -> f32 {
        f32::from(self) / 65535.0
    }

    #[inline(always)]
    fn from_unit(value: f32) -> Self {
        (value.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16
    }
}

impl Sample for f32 {
    const BYTES: usize = 4;

    #[inline(always)]
    fn from_ne(bytes: &[u8]) -> Self {
        f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    #[inline(always)]
    fn write_ne(self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_ne_bytes());
    }

    #[inline(always)]
    fn to_unit(self) -> f32 {
        self
    }

    #[inline(always)]
    fn from_unit(value: f32) -> Self {
        value
    }
}

pub fn samples_from_bytes<S: Sample>(bytes: &[u8]) -> Vec<S> {
    bytes.chunks_exact(S::BYTES).map(S::from_ne).collect()
}

pub fn samples_to_bytes<S: Sample>(samples: &[S], bytes: &mut [u8]) {
    for (sample, out) in samples.iter().zip(bytes.chunks_exact_mut(S::BYTES)) {
        sample.write_ne(out);
    }
}

/// Interleave per channel rows into packed pixels
///
/// `rows` holds one row per channel, each `width * bytes_per_sample` long.
pub fn interleave(rows: &[Vec<u8>], bytes_per_sample: usize, out: &mut [u8]) {
    let nchannels = rows.len();

    for (c, row) in rows.iter().enumerate() {
        for (x, sample) in row.chunks_exact(bytes_per_sample).enumerate() {
            let start = (x * nchannels + c) * bytes_per_sample;
            out[start..start + bytes_per_sample].copy_from_slice(sample);
        }
    }
}

/// Convert CMYK(A) pixels to RGB(A)
///
/// Photoshop stores ink inverted (0 is full coverage), so multiplying
/// each component with K gives the color directly. Channels after the
/// fourth are copied through.
pub fn cmyk_to_rgb<S: Sample>(input: &[S], nchannels: usize, out: &mut [S]) {
    let out_channels = nchannels - 1;

    for (src, dst) in input
        .chunks_exact(nchannels)
        .zip(out.chunks_exact_mut(out_channels))
    {
        let k = src[3].to_unit();

        dst[0] = S::from_unit(src[0].to_unit() * k);
        dst[1] = S::from_unit(src[1].to_unit() * k);
        dst[2] = S::from_unit(src[2].to_unit() * k);
        dst[3..].copy_from_slice(&src[4..]);
    }
}

/// Look palette indices up
///
/// `input` has one index channel and optionally an alpha channel.
/// With four output channels the transparent index becomes `(0, 0, 0, 0)`
/// and everything else takes its alpha from the input or is opaque.
pub fn indexed_to_rgb(
    input: &[u8], in_channels: usize, palette: &ColorModeData, transparent_index: Option<u16>,
    out_channels: usize, out: &mut [u8]
) {
    for (src, dst) in input
        .chunks_exact(in_channels)
        .zip(out.chunks_exact_mut(out_channels))
    {
        let index = src[0];

        if out_channels == 4 && transparent_index == Some(u16::from(index)) {
            dst.fill(0);
            continue;
        }
        let color = palette.palette_entry(index).unwrap_or([0; 3]);
        dst[..3].copy_from_slice(&color);

        if out_channels == 4 {
            dst[3] = if in_channels > 1 { src[1] } else { 255 };
        }
    }
}

/// Expand a packed bitmap row to RGB, set bits are black
pub fn bitmap_to_rgb(packed: &[u8], width: usize, out: &mut [u8]) {
    for (x, pixel) in out.chunks_exact_mut(3).take(width).enumerate() {
        let bit = (packed[x / 8] >> (7 - (x % 8))) & 1;
        pixel.fill(if bit == 1 { 0 } else { 255 });
    }
}

/// Undo flattening against `background`
///
/// The composite is stored as `color * alpha + background * (1 - alpha)`,
/// removing the background leaves associated alpha. With `unassociate`
/// the color is then divided by alpha.
pub fn remove_background<S: Sample>(
    data: &mut [S], nchannels: usize, alpha_index: usize, background: [f64; 4],
    unassociate: bool
) {
    for pixel in data.chunks_exact_mut(nchannels) {
        let alpha = pixel[alpha_index].to_unit();

        for (c, sample) in pixel.iter_mut().enumerate() {
            if c == alpha_index {
                continue;
            }
            let bg = background[c.min(3)] as f32;
            let mut value = sample.to_unit() - bg * (1.0 - alpha);

            if unassociate && alpha > 0.0 {
                value /= alpha;
            }
            *sample = S::from_unit(value);
        }
    }
}

/// Multiply color channels with alpha
pub fn associate_alpha<S: Sample>(data: &mut [S], nchannels: usize, alpha_index: usize) {
    for pixel in data.chunks_exact_mut(nchannels) {
        let alpha = pixel[alpha_index].to_unit();

        for (c, sample) in pixel.iter_mut().enumerate() {
            if c != alpha_index {
                *sample = S::from_unit(sample.to_unit() * alpha);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::color_mode::ColorModeData;
    use crate::convert::{
        associate_alpha, bitmap_to_rgb, cmyk_to_rgb, indexed_to_rgb, interleave,
        remove_background
    };

    fn palette() -> ColorModeData {
        // red = index, green = 255 - index, blue = index / 2
        let mut data = Vec::with_capacity(768);
        data.extend((0..=255).map(|x| x as u8));
        data.extend((0..=255).map(|x| 255 - x as u8));
        data.extend((0..=255).map(|x| (x / 2) as u8));
        ColorModeData { data }
    }

    #[test]
    fn interleave_rows() {
        let rows = vec![vec![1, 2], vec![3, 4], vec![5, 6]];
        let mut out = [0; 6];
        interleave(&rows, 1, &mut out);
        assert_eq!(out, [1, 3, 5, 2, 4, 6]);

        let rows = vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]];
        let mut out = [0; 8];
        interleave(&rows, 2, &mut out);
        assert_eq!(out, [1, 2, 5, 6, 3, 4, 7, 8]);
    }

    #[test]
    fn indexed_lookup() {
        let palette = palette();
        let input = [0, 7, 200, 255];
        let mut out = [0; 16];

        indexed_to_rgb(&input, 1, &palette, Some(7), 4, &mut out);

        assert_eq!(out[0..4], [0, 255, 0, 255]);
        assert_eq!(out[4..8], [0, 0, 0, 0]);
        assert_eq!(out[8..12], [200, 55, 100, 255]);
        assert_eq!(out[12..16], [255, 0, 127, 255]);

        // indices over 255 never match
        let mut rgb = [0; 3];
        indexed_to_rgb(&[7], 1, &palette, Some(700), 3, &mut rgb);
        assert_eq!(rgb, [7, 248, 3]);
    }

    #[test]
    fn indexed_with_alpha_channel() {
        let palette = palette();
        let mut out = [0; 8];

        indexed_to_rgb(&[10, 128, 3, 64], 2, &palette, Some(3), 4, &mut out);
        assert_eq!(out, [10, 245, 5, 128, 0, 0, 0, 0]);
    }

    #[test]
    fn cmyk_multiplies_with_k() {
        let input: [u8; 16] = [
            0, 0, 0, 0, //
            0, 0, 0, 255, //
            255, 255, 255, 255, //
            255, 128, 0, 128
        ];
        let mut out = [0_u8; 12];
        cmyk_to_rgb(&input, 4, &mut out);

        assert_eq!(out[0..3], [0, 0, 0]);
        assert_eq!(out[3..6], [0, 0, 0]);
        assert_eq!(out[6..9], [255, 255, 255]);
        assert_eq!(out[9..12], [128, 64, 0]);
    }

    #[test]
    fn cmyk_keeps_alpha() {
        let input: [u16; 5] = [65535, 65535, 0, 65535, 1234];
        let mut out = [0_u16; 4];
        cmyk_to_rgb(&input, 5, &mut out);
        assert_eq!(out, [65535, 65535, 0, 1234]);

        let input: [f32; 4] = [0.5, 1.0, 0.25, 0.5];
        let mut out = [0_f32; 3];
        cmyk_to_rgb(&input, 4, &mut out);
        assert_eq!(out, [0.25, 0.5, 0.125]);
    }

    #[test]
    fn bitmap_bits_msb_first() {
        let mut out = [1; 30];
        bitmap_to_rgb(&[0b1010_0000, 0b0100_0000], 10, &mut out);

        let expected: Vec<u8> = [0, 255, 0, 255, 255, 255, 255, 255, 255, 0]
            .iter()
            .flat_map(|x| [*x; 3])
            .collect();
        assert_eq!(&out[..], &expected[..]);
    }

    #[test]
    fn background_removal() {
        // half transparent red flattened on white
        let mut pixel: [f32; 4] = [1.0, 0.5, 0.5, 0.5];
        remove_background(&mut pixel, 4, 3, [1.0; 4], false);
        assert_eq!(pixel, [0.5, 0.0, 0.0, 0.5]);

        let mut pixel: [f32; 4] = [1.0, 0.5, 0.5, 0.5];
        remove_background(&mut pixel, 4, 3, [1.0; 4], true);
        assert_eq!(pixel, [1.0, 0.0, 0.0, 0.5]);

        // fully transparent pixels keep zero color
        let mut pixel: [u8; 2] = [255, 0];
        remove_background(&mut pixel, 2, 1, [1.0; 4], true);
        assert_eq!(pixel, [0, 0]);
    }

    #[test]
    fn premultiply() {
        let mut data: [u8; 8] = [255, 128, 0, 128, 10, 20, 30, 255];
        associate_alpha(&mut data, 4, 3);
        assert_eq!(data, [128, 64, 0, 128, 10, 20, 30, 255]);

        let mut data: [f32; 2] = [0.5, 0.5];
        associate_alpha(&mut data, 2, 1);
        assert_eq!(data, [0.25, 0.5]);
    }
}
