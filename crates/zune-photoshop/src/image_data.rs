/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Merged image data, the flattened composite
use alloc::vec::Vec;

use zune_core::bytestream::ZByteReaderTrait;
use zune_core::log::trace;

use crate::channel::{read_rle_lengths, ChannelId, ChannelInfo};
use crate::constants::CompressionMethod;
use crate::cursor::PsdReader;
use crate::errors::PSDDecodeErrors;
use crate::header::FileHeader;

#[derive(Debug, Clone, Default)]
pub struct ImageDataSection {
    /// One channel per header channel, ids `0..channel_count`
    pub channels:     Vec<ChannelInfo>,
    /// The first alpha channel is the composite's transparency
    pub transparency: bool
}

/// Read the merged image data section
///
/// Only raw and RLE are used here, and RLE keeps the row length
/// tables of every channel ahead of all the pixel data.
pub fn read_image_data<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, header: &FileHeader, transparency: bool
) -> Result<ImageDataSection, PSDDecodeErrors> {
    let method = reader.read_u16()?;
    let compression = CompressionMethod::from_int(method)
        .filter(|x| matches!(x, CompressionMethod::NoCompression | CompressionMethod::RLE))
        .ok_or(PSDDecodeErrors::UnknownCompression(method, "merged image data"))?;

    trace!("Image data compression: {:?}", compression);

    let (width, height) = (header.width, header.height);
    let mut channels = Vec::with_capacity(header.channel_count);

    match compression {
        CompressionMethod::RLE => {
            let mut tables = Vec::with_capacity(header.channel_count);

            for _ in 0..header.channel_count {
                tables.push(read_rle_lengths(reader, height, header.version)?);
            }
            let mut position = reader.position()?;

            for (id, row_lengths) in tables.into_iter().enumerate() {
                let channel = ChannelInfo::new_rle(
                    ChannelId::Color(id as u16),
                    width,
                    height,
                    header,
                    position,
                    row_lengths
                );
                position += channel.data_length;
                channels.push(channel);
            }
        }
        _ => {
            let mut position = reader.position()?;

            for id in 0..header.channel_count {
                let channel =
                    ChannelInfo::new_raw(ChannelId::Color(id as u16), width, height, header, position);
                position += channel.data_length;
                channels.push(channel);
            }
        }
    }

    Ok(ImageDataSection {
        channels,
        transparency
    })
}

#[cfg(test)]
mod tests {
    use zune_core::bytestream::ZCursor;

    use crate::channel::ChannelStorage;
    use crate::constants::ColorModes;
    use crate::cursor::PsdReader;
    use crate::errors::PSDDecodeErrors;
    use crate::header::{FileHeader, Version};
    use crate::image_data::read_image_data;

    fn header() -> FileHeader {
        FileHeader {
            version:       Version::Psd,
            channel_count: 2,
            width:         3,
            height:        2,
            depth:         8,
            color_mode:    ColorModes::Grayscale
        }
    }

    #[test]
    fn rle_tables_come_first() {
        let mut data = 1_u16.to_be_bytes().to_vec();
        // channel 0 rows then channel 1 rows
        for length in [2_u16, 4, 2, 2] {
            data.extend_from_slice(&length.to_be_bytes());
        }
        let start = data.len() as u64;

        let mut reader = PsdReader::new(ZCursor::new(&data[..]));
        let section = read_image_data(&mut reader, &header(), false).unwrap();

        assert_eq!(section.channels.len(), 2);
        match &section.channels[1].storage {
            ChannelStorage::Rle { row_offsets, .. } => {
                assert_eq!(row_offsets, &[start + 6, start + 8]);
            }
            _ => panic!("expected rle storage")
        }
    }

    #[test]
    fn raw_channels_are_planar() {
        let data = 0_u16.to_be_bytes();
        let mut reader = PsdReader::new(ZCursor::new(&data[..]));
        let section = read_image_data(&mut reader, &header(), true).unwrap();

        assert!(section.transparency);
        match &section.channels[1].storage {
            ChannelStorage::Raw { row_offsets } => assert_eq!(row_offsets, &[8, 11]),
            _ => panic!("expected raw storage")
        }
    }

    #[test]
    fn zip_is_rejected() {
        for method in [2_u16, 3, 4] {
            let data = method.to_be_bytes();
            let mut reader = PsdReader::new(ZCursor::new(&data[..]));

            assert!(matches!(
                read_image_data(&mut reader, &header(), false),
                Err(PSDDecodeErrors::UnknownCompression(m, _)) if m == method
            ));
        }
    }
}
