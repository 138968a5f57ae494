/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Channel (de)compression routines
//!
//! Photoshop stores every channel with one of four schemes
//!
//! - Raw, big endian samples
//! - Packbits, a byte oriented run length encoding
//! - Zip, a zlib stream holding the whole channel
//! - Zip with prediction, the same but rows are horizontally delta
//!   encoded before compression.
//!
//! Decoded samples are always handed out in native endian.
use alloc::format;
use alloc::vec::Vec;
use core::cmp::Ordering;

use zune_inflate::{DeflateDecoder, DeflateOptions};

use crate::errors::PSDDecodeErrors;

/// Convert big endian samples of `depth` bits to native endian in place
///
/// 1 and 8 bit samples have no byte order and are left untouched
pub fn be_to_native(data: &mut [u8], depth: u16) {
    match depth {
        16 => {
            for sample in data.chunks_exact_mut(2) {
                let value = u16::from_be_bytes([sample[0], sample[1]]);
                sample.copy_from_slice(&value.to_ne_bytes());
            }
        }
        32 => {
            for sample in data.chunks_exact_mut(4) {
                let value = u32::from_be_bytes([sample[0], sample[1], sample[2], sample[3]]);
                sample.copy_from_slice(&value.to_ne_bytes());
            }
        }
        _ => ()
    }
}

/// Expand packbits compressed `src` until `dest` is full
///
/// Loop until you get the number of unpacked bytes you are expecting:
///   - Read the next source byte into n.
///   - If n is between 0 and 127 inclusive, copy the next n+1 bytes literally.
///   - Else if n is between -127 and -1 inclusive, copy the next byte -n+1 times.
///   - Else if n is -128, noop.
///
/// Both budgets are checked before every run, running out of
/// source or a run that would overflow `dest` is an error.
///
/// Returns the number of source bytes consumed.
pub fn decode_packbits(src: &[u8], dest: &mut [u8]) -> Result<usize, PSDDecodeErrors> {
    let mut src_pos = 0;
    let mut dest_pos = 0;

    while dest_pos < dest.len() {
        let header = *src.get(src_pos).ok_or(PSDDecodeErrors::BadRLE)? as i8;
        src_pos += 1;

        match header.cmp(&0) {
            Ordering::Greater | Ordering::Equal => {
                // copy next len+1 bytes literally
                let length = usize::from(header as u8) + 1;

                if src_pos + length > src.len() || dest_pos + length > dest.len() {
                    return Err(PSDDecodeErrors::BadRLE);
                }
                dest[dest_pos..dest_pos + length].copy_from_slice(&src[src_pos..src_pos + length]);

                src_pos += length;
                dest_pos += length;
            }
            Ordering::Less if header == i8::MIN => (),
            Ordering::Less => {
                // Next -len+1 bytes in the dest are replicated from next source byte.
                let length = (1 - i16::from(header)) as usize;
                let value = *src.get(src_pos).ok_or(PSDDecodeErrors::BadRLE)?;
                src_pos += 1;

                if dest_pos + length > dest.len() {
                    return Err(PSDDecodeErrors::BadRLE);
                }
                dest[dest_pos..dest_pos + length].fill(value);
                dest_pos += length;
            }
        }
    }
    Ok(src_pos)
}

/// Compress `data` with packbits
///
/// Repeats of three or more bytes become runs, everything else
/// is emitted as literals of up to 128 bytes.
pub fn encode_packbits(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 128 + 1);
    let mut literal_start = 0;
    let mut pos = 0;

    let flush_literals = |out: &mut Vec<u8>, literals: &[u8]| {
        for chunk in literals.chunks(128) {
            out.push((chunk.len() - 1) as u8);
            out.extend_from_slice(chunk);
        }
    };

    while pos < data.len() {
        let value = data[pos];
        let mut run = 1;

        while pos + run < data.len() && data[pos + run] == value && run < 128 {
            run += 1;
        }

        if run >= 3 {
            flush_literals(&mut out, &data[literal_start..pos]);
            out.push((1 - run as i16) as i8 as u8);
            out.push(value);
            pos += run;
            literal_start = pos;
        } else {
            pos += run;
        }
    }
    flush_literals(&mut out, &data[literal_start..]);

    out
}

/// Inflate a zlib stream that should produce exactly `expected` bytes
///
/// The limit handed to inflate stops a corrupt stream from growing
/// past what the channel can hold.
pub fn inflate(data: &[u8], expected: usize) -> Result<Vec<u8>, PSDDecodeErrors> {
    let options = DeflateOptions::default()
        .set_size_hint(expected)
        .set_limit(expected.saturating_add(1));

    let mut decoder = DeflateDecoder::new_with_options(data, options);

    let output = decoder
        .decode_zlib()
        .map_err(|e| PSDDecodeErrors::InflateError(format!("{e:?}")))?;

    if output.len() != expected {
        return Err(PSDDecodeErrors::InconsistentLength("zip channel data"));
    }
    Ok(output)
}

/// Undo horizontal prediction of a whole channel in place
///
/// `data` holds `height` rows of `width` big endian samples straight
/// out of inflate, on return the samples are native endian.
///
/// For 32 bit floats the bytes of each row are stored planar, all
/// first bytes of every sample, then all second bytes etc. The
/// order of undoing is load bearing,
/// 1. delta decode the row as plain bytes,
/// 2. interleave the byte planes back into samples,
/// 3. convert samples from big endian.
pub fn decode_prediction(
    data: &mut [u8], width: usize, height: usize, depth: u16
) -> Result<(), PSDDecodeErrors> {
    if width == 0 || height == 0 {
        return Ok(());
    }
    match depth {
        8 => {
            for row in data.chunks_exact_mut(width).take(height) {
                for x in 1..row.len() {
                    row[x] = row[x].wrapping_add(row[x - 1]);
                }
            }
        }
        16 => {
            // deltas are sample wise, bring them to native order first
            be_to_native(data, 16);

            for row in data.chunks_exact_mut(width * 2).take(height) {
                let mut previous = 0_u16;

                for sample in row.chunks_exact_mut(2) {
                    let value = u16::from_ne_bytes([sample[0], sample[1]]).wrapping_add(previous);
                    sample.copy_from_slice(&value.to_ne_bytes());
                    previous = value;
                }
            }
        }
        32 => {
            let stride = width * 4;
            let mut planar = alloc::vec![0; stride];

            for row in data.chunks_exact_mut(stride).take(height) {
                for x in 1..row.len() {
                    row[x] = row[x].wrapping_add(row[x - 1]);
                }
                planar.copy_from_slice(row);

                for (x, sample) in row.chunks_exact_mut(4).enumerate() {
                    let value = u32::from_be_bytes([
                        planar[x],
                        planar[width + x],
                        planar[2 * width + x],
                        planar[3 * width + x]
                    ]);
                    sample.copy_from_slice(&value.to_ne_bytes());
                }
            }
        }
        _ => {
            return Err(PSDDecodeErrors::Generic(
                "Zip prediction is only defined for 8, 16 and 32 bit channels"
            ))
        }
    }
    Ok(())
}

/// Horizontally delta encode a channel of native endian samples,
/// the inverse of [`decode_prediction`]
///
/// The result is big endian and, for 32 bit, byte planar per row.
pub fn encode_prediction(
    data: &[u8], width: usize, height: usize, depth: u16
) -> Result<Vec<u8>, PSDDecodeErrors> {
    let mut out = Vec::with_capacity(data.len());

    if width == 0 || height == 0 {
        return Ok(out);
    }
    match depth {
        8 => {
            for row in data.chunks_exact(width).take(height) {
                let mut previous = 0_u8;
                for &value in row {
                    out.push(value.wrapping_sub(previous));
                    previous = value;
                }
            }
        }
        16 => {
            for row in data.chunks_exact(width * 2).take(height) {
                let mut previous = 0_u16;
                for sample in row.chunks_exact(2) {
                    let value = u16::from_ne_bytes([sample[0], sample[1]]);
                    out.extend_from_slice(&value.wrapping_sub(previous).to_be_bytes());
                    previous = value;
                }
            }
        }
        32 => {
            let stride = width * 4;

            for row in data.chunks_exact(stride).take(height) {
                let start = out.len();
                out.resize(start + stride, 0);
                let planar = &mut out[start..];

                for (x, sample) in row.chunks_exact(4).enumerate() {
                    let bytes =
                        u32::from_ne_bytes([sample[0], sample[1], sample[2], sample[3]]).to_be_bytes();

                    for (plane, byte) in bytes.iter().enumerate() {
                        planar[plane * width + x] = *byte;
                    }
                }
                for x in (1..planar.len()).rev() {
                    planar[x] = planar[x].wrapping_sub(planar[x - 1]);
                }
            }
        }
        _ => {
            return Err(PSDDecodeErrors::Generic(
                "Zip prediction is only defined for 8, 16 and 32 bit channels"
            ))
        }
    }
    Ok(out)
}
