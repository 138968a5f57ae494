/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

mod common;

use common::*;
use zune_photoshop::zune_core::bytestream::ZCursor;
use zune_photoshop::zune_core::colorspace::ColorSpace;
use zune_photoshop::{PSDDecoder, PSDOptions};

fn cmyk_document() -> Vec<u8> {
    PsdBuilder::new(CMYK, 4, 2, 1, 8)
        .raw_image(&[&[255, 200], &[128, 200], &[0, 200], &[255, 0]])
        .build()
}

#[test]
fn cmyk_converts_to_rgb() {
    let data = cmyk_document();
    let mut decoder = PSDDecoder::new(ZCursor::new(&data));

    assert_eq!(decoder.decode_raw().unwrap(), [255, 128, 0, 0, 0, 0]);

    let spec = decoder.spec().unwrap();
    assert_eq!(spec.channel_names, ["R", "G", "B"]);
    assert_eq!(decoder.colorspace(), Some(ColorSpace::RGB));
}

#[test]
fn cmyk_raw_keeps_inks() {
    let data = cmyk_document();
    let options = PSDOptions::new().set_raw_data(true);
    let mut decoder = PSDDecoder::new_with_options(ZCursor::new(&data), options);

    assert_eq!(
        decoder.decode_raw().unwrap(),
        [255, 128, 0, 255, 200, 200, 200, 0]
    );
    assert_eq!(decoder.spec().unwrap().channel_names, ["C", "M", "Y", "K"]);
    assert_eq!(decoder.colorspace(), Some(ColorSpace::CMYK));
}

fn palette() -> Vec<u8> {
    let mut palette = Vec::with_capacity(768);
    palette.extend(0..=255_u8);
    palette.extend((0..=255_u8).map(|x| 255 - x));
    palette.extend((0..=255_u8).map(|x| x / 2));
    palette
}

#[test]
fn indexed_looks_up_palette() {
    let data = PsdBuilder::new(INDEXED, 1, 3, 1, 8)
        .color_mode_data(palette())
        .raw_image(&[&[0, 5, 10]])
        .build();

    let mut decoder = PSDDecoder::new(ZCursor::new(&data));

    assert_eq!(
        decoder.decode_raw().unwrap(),
        [0, 255, 0, 5, 250, 2, 10, 245, 5]
    );
    assert_eq!(decoder.color_mode_data().unwrap().palette_entry(5), Some([5, 250, 2]));
}

#[test]
fn indexed_transparency_index() {
    let data = PsdBuilder::new(INDEXED, 1, 3, 1, 8)
        .color_mode_data(palette())
        .resource(1047, &5_u16.to_be_bytes())
        .raw_image(&[&[0, 5, 10]])
        .build();

    let mut decoder = PSDDecoder::new(ZCursor::new(&data));
    decoder.decode_headers().unwrap();

    let spec = decoder.spec().unwrap();
    assert_eq!(spec.nchannels, 4);
    assert_eq!(spec.alpha_channel, Some(3));

    assert_eq!(
        decoder.decode_raw().unwrap(),
        [0, 255, 0, 255, 0, 0, 0, 0, 10, 245, 5, 255]
    );
}

#[test]
fn indexed_raw_returns_indices() {
    let data = PsdBuilder::new(INDEXED, 1, 3, 1, 8)
        .color_mode_data(palette())
        .raw_image(&[&[0, 5, 10]])
        .build();

    let options = PSDOptions::new().set_raw_data(true);
    let mut decoder = PSDDecoder::new_with_options(ZCursor::new(&data), options);

    assert_eq!(decoder.decode_raw().unwrap(), [0, 5, 10]);
    assert_eq!(decoder.spec().unwrap().channel_names, ["I"]);
}

#[test]
fn bitmap_set_bits_are_black() {
    let data = PsdBuilder::new(BITMAP, 1, 10, 1, 1)
        .raw_image(&[&[0b1010_0000, 0b0100_0000]])
        .build();

    let mut decoder = PSDDecoder::new(ZCursor::new(&data));
    let pixels = decoder.decode_raw().unwrap();

    assert_eq!(pixels.len(), 30);

    let black = [0, 2, 9];
    for (x, pixel) in pixels.chunks_exact(3).enumerate() {
        let expected = if black.contains(&x) { 0 } else { 255 };
        assert_eq!(pixel, [expected; 3], "pixel {x}");
    }
}

#[test]
fn bitmap_raw_rows_stay_packed() {
    let data = PsdBuilder::new(BITMAP, 1, 10, 2, 1)
        .raw_image(&[&[0b1010_0000, 0b0100_0000, 0xFF, 0xC0]])
        .build();

    let options = PSDOptions::new().set_raw_data(true);
    let mut decoder = PSDDecoder::new_with_options(ZCursor::new(&data), options);
    decoder.decode_headers().unwrap();

    let spec = decoder.spec().unwrap();
    assert_eq!(spec.bits_per_sample, 1);
    assert_eq!(spec.scanline_bytes(), 2);

    assert_eq!(decoder.read_native_scanline(0, 1).unwrap(), [0xFF, 0xC0]);
}

#[test]
fn bitmap_needs_one_bit_depth() {
    let data = PsdBuilder::new(BITMAP, 1, 2, 1, 8)
        .raw_image(&[&[0, 0]])
        .build();

    let mut decoder = PSDDecoder::new(ZCursor::new(&data));
    assert!(decoder.decode_headers().is_err());
}

#[test]
fn raw_composite_exposes_extra_channels() {
    let mut names = Vec::new();
    push_pascal(&mut names, "Spot", 1);

    let data = PsdBuilder::new(RGB, 5, 1, 1, 8)
        .resource(1006, &names)
        .raw_image(&[&[1], &[2], &[3], &[4], &[5]])
        .build();

    // without raw data the extra channels are dropped
    let mut decoder = PSDDecoder::new(ZCursor::new(&data));
    assert_eq!(decoder.decode_raw().unwrap(), [1, 2, 3]);

    let options = PSDOptions::new().set_raw_data(true);
    let mut decoder = PSDDecoder::new_with_options(ZCursor::new(&data), options);

    assert_eq!(decoder.decode_raw().unwrap(), [1, 2, 3, 4, 5]);
    assert_eq!(
        decoder.spec().unwrap().channel_names,
        ["R", "G", "B", "Spot", "channel4"]
    );
    assert_eq!(decoder.resources().unwrap().alpha_names, ["Spot"]);
}

#[test]
fn lab_is_readable_in_raw_mode() {
    let data = PsdBuilder::new(9, 3, 1, 1, 8)
        .raw_image(&[&[100], &[128], &[128]])
        .build();

    let options = PSDOptions::new().set_raw_data(true);
    let mut decoder = PSDDecoder::new_with_options(ZCursor::new(&data), options);

    assert_eq!(decoder.decode_raw().unwrap(), [100, 128, 128]);
    assert_eq!(decoder.spec().unwrap().channel_names, ["L", "a", "b"]);
}

#[test]
fn multichannel_names_by_index() {
    let data = PsdBuilder::new(7, 2, 2, 1, 8)
        .raw_image(&[&[1, 2], &[3, 4]])
        .build();

    let mut decoder = PSDDecoder::new(ZCursor::new(&data));

    assert_eq!(decoder.decode_raw().unwrap(), [1, 3, 2, 4]);
    assert_eq!(decoder.spec().unwrap().channel_names, ["0", "1"]);
}
