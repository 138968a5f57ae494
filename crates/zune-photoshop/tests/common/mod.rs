/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! In memory photoshop documents for the integration tests
#![allow(dead_code)]

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use zune_photoshop::compression::{encode_packbits, encode_prediction};

pub const RGB: u16 = 3;
pub const GRAYSCALE: u16 = 1;
pub const INDEXED: u16 = 2;
pub const BITMAP: u16 = 0;
pub const CMYK: u16 = 4;

pub fn push_length(out: &mut Vec<u8>, value: usize, version: u16) {
    if version == 2 {
        out.extend_from_slice(&(value as u64).to_be_bytes());
    } else {
        out.extend_from_slice(&(value as u32).to_be_bytes());
    }
}

pub fn push_pascal(out: &mut Vec<u8>, name: &str, mod_padding: usize) {
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());

    while (out.len() % mod_padding) != 0 {
        out.push(0);
    }
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Layer channel payload, compression marker followed by the data
pub fn raw_channel(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0, 0];
    out.extend_from_slice(data);
    out
}

pub fn rle_channel(rows: &[&[u8]], version: u16) -> Vec<u8> {
    let mut out = vec![0, 1];
    let packed: Vec<Vec<u8>> = rows.iter().map(|row| encode_packbits(row)).collect();

    for row in &packed {
        if version == 2 {
            out.extend_from_slice(&(row.len() as u32).to_be_bytes());
        } else {
            out.extend_from_slice(&(row.len() as u16).to_be_bytes());
        }
    }
    for row in packed {
        out.extend(row);
    }
    out
}

/// `data` holds big endian samples as they would be stored raw
pub fn zip_channel(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0, 2];
    out.extend(zlib(data));
    out
}

/// `samples` are native endian
pub fn zip_prediction_channel(samples: &[u8], width: usize, height: usize, depth: u16) -> Vec<u8> {
    let mut out = vec![0, 3];
    let encoded = encode_prediction(samples, width, height, depth).unwrap();
    out.extend(zlib(&encoded));
    out
}

pub struct LayerBuilder {
    pub bounds:   [i32; 4],
    pub channels: Vec<(i16, Vec<u8>)>,
    pub name:     String,
    pub extra:    Vec<u8>,
    pub flags:    u8
}

impl LayerBuilder {
    /// A layer at `(left, top)` of `width` x `height`
    pub fn new(name: &str, left: i32, top: i32, width: i32, height: i32) -> LayerBuilder {
        LayerBuilder {
            bounds:   [top, left, top + height, left + width],
            channels: vec![],
            name:     name.to_string(),
            extra:    vec![],
            flags:    0
        }
    }

    pub fn channel(mut self, id: i16, payload: Vec<u8>) -> Self {
        self.channels.push((id, payload));
        self
    }

    pub fn additional_info(mut self, key: &[u8; 4], payload: &[u8]) -> Self {
        self.extra.extend_from_slice(b"8BIM");
        self.extra.extend_from_slice(key);
        self.extra
            .extend_from_slice(&(payload.len() as u32).to_be_bytes());
        self.extra.extend_from_slice(payload);
        self
    }

    fn record(&self, version: u16) -> Vec<u8> {
        let mut out = Vec::new();

        for bound in self.bounds {
            out.extend_from_slice(&bound.to_be_bytes());
        }
        out.extend_from_slice(&(self.channels.len() as u16).to_be_bytes());

        for (id, payload) in &self.channels {
            out.extend_from_slice(&id.to_be_bytes());
            push_length(&mut out, payload.len(), version);
        }
        out.extend_from_slice(b"8BIMnorm");
        out.extend_from_slice(&[255, 0, self.flags, 0]);

        // empty mask data and blending ranges
        let mut extra = vec![0; 8];
        push_pascal(&mut extra, &self.name, 4);
        extra.extend_from_slice(&self.extra);

        out.extend_from_slice(&(extra.len() as u32).to_be_bytes());
        out.extend(extra);
        out
    }
}

/// Layer count, every record then every channel payload
pub fn layer_info(layers: &[LayerBuilder], transparency: bool, version: u16) -> Vec<u8> {
    let count = layers.len() as i16;
    let count = if transparency { -count } else { count };

    let mut out = count.to_be_bytes().to_vec();

    for layer in layers {
        out.extend(layer.record(version));
    }
    for layer in layers {
        for (_, payload) in &layer.channels {
            out.extend_from_slice(payload);
        }
    }
    if out.len() % 2 == 1 {
        out.push(0);
    }
    out
}

/// Body of the layer and mask section
///
/// `info` goes into the layer info slot, `global_info` is appended
/// after an empty global mask info block.
pub fn layer_section(info: &[u8], global_info: &[u8], version: u16) -> Vec<u8> {
    let mut out = Vec::new();
    push_length(&mut out, info.len(), version);
    out.extend_from_slice(info);
    out.extend_from_slice(&0_u32.to_be_bytes());
    out.extend_from_slice(global_info);
    out
}

/// A global additional info entry holding layers, padded to four bytes
pub fn layers_block(key: &[u8; 4], info: &[u8], version: u16) -> Vec<u8> {
    let mut out = b"8BIM".to_vec();
    out.extend_from_slice(key);
    push_length(&mut out, info.len(), version);
    out.extend_from_slice(info);

    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

pub struct PsdBuilder {
    pub version:         u16,
    pub channels:        u16,
    pub width:           u32,
    pub height:          u32,
    pub depth:           u16,
    pub color_mode:      u16,
    pub color_mode_data: Vec<u8>,
    pub resources:       Vec<u8>,
    pub layer_section:   Vec<u8>,
    pub image_data:      Vec<u8>
}

impl PsdBuilder {
    pub fn new(color_mode: u16, channels: u16, width: u32, height: u32, depth: u16) -> PsdBuilder {
        PsdBuilder {
            version: 1,
            channels,
            width,
            height,
            depth,
            color_mode,
            color_mode_data: vec![],
            resources: vec![],
            layer_section: vec![],
            image_data: vec![]
        }
    }

    pub fn large_document(mut self) -> Self {
        self.version = 2;
        self
    }

    pub fn color_mode_data(mut self, data: Vec<u8>) -> Self {
        self.color_mode_data = data;
        self
    }

    pub fn resource(mut self, id: u16, payload: &[u8]) -> Self {
        self.resources.extend_from_slice(b"8BIM");
        self.resources.extend_from_slice(&id.to_be_bytes());
        // empty name
        self.resources.extend_from_slice(&[0, 0]);
        self.resources
            .extend_from_slice(&(payload.len() as u32).to_be_bytes());
        self.resources.extend_from_slice(payload);

        if payload.len() % 2 == 1 {
            self.resources.push(0);
        }
        self
    }

    pub fn layers(mut self, body: Vec<u8>) -> Self {
        self.layer_section = body;
        self
    }

    /// Planar big endian channel data, stored raw
    pub fn raw_image(mut self, planes: &[&[u8]]) -> Self {
        self.image_data = vec![0, 0];

        for plane in planes {
            self.image_data.extend_from_slice(plane);
        }
        self
    }

    /// Rows of every channel, packbits compressed
    pub fn rle_image(mut self, channels: &[Vec<Vec<u8>>]) -> Self {
        self.image_data = vec![0, 1];
        let packed: Vec<Vec<Vec<u8>>> = channels
            .iter()
            .map(|rows| rows.iter().map(|row| encode_packbits(row)).collect())
            .collect();

        for rows in &packed {
            for row in rows {
                if self.version == 2 {
                    self.image_data
                        .extend_from_slice(&(row.len() as u32).to_be_bytes());
                } else {
                    self.image_data
                        .extend_from_slice(&(row.len() as u16).to_be_bytes());
                }
            }
        }
        for rows in packed {
            for row in rows {
                self.image_data.extend(row);
            }
        }
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = b"8BPS".to_vec();
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&[0; 6]);
        out.extend_from_slice(&self.channels.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.depth.to_be_bytes());
        out.extend_from_slice(&self.color_mode.to_be_bytes());

        out.extend_from_slice(&(self.color_mode_data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.color_mode_data);

        out.extend_from_slice(&(self.resources.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.resources);

        push_length(&mut out, self.layer_section.len(), self.version);
        out.extend_from_slice(&self.layer_section);

        out.extend_from_slice(&self.image_data);
        out
    }
}
