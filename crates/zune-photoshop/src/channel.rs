/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Per channel pixel storage and scanline extraction
use alloc::vec::Vec;

use zune_core::bytestream::ZByteReaderTrait;
use zune_core::log::trace;

use crate::compression::{be_to_native, decode_packbits, decode_prediction, inflate};
use crate::constants::CompressionMethod;
use crate::cursor::PsdReader;
use crate::errors::PSDDecodeErrors;
use crate::header::{FileHeader, Version};
use crate::options::PSDOptions;

/// What a channel holds
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ChannelId {
    /// Color channel, index into the color mode's components
    Color(u16),
    /// Transparency mask, `-1` in the file
    Transparency,
    /// User supplied layer mask, `-2` in the file
    LayerMask,
    /// Real user supplied layer mask, `-3` in the file
    UserMask
}

impl ChannelId {
    pub fn from_int(id: i16) -> Option<ChannelId> {
        match id {
            -1 => Some(ChannelId::Transparency),
            -2 => Some(ChannelId::LayerMask),
            -3 => Some(ChannelId::UserMask),
            id if id >= 0 => Some(ChannelId::Color(id as u16)),
            _ => None
        }
    }

    /// Mask channels take their dimensions from the layer mask
    pub const fn is_mask(self) -> bool {
        matches!(self, ChannelId::LayerMask | ChannelId::UserMask)
    }
}

/// Where the pixels of a channel live
#[derive(Debug, Clone)]
pub enum ChannelStorage {
    /// Uncompressed rows, read from the stream on demand
    Raw { row_offsets: Vec<u64> },
    /// Packbits compressed rows, read and expanded on demand
    Rle {
        row_offsets: Vec<u64>,
        row_lengths: Vec<u32>
    },
    /// Zip channels can't be seeked into, so they are inflated whole
    /// when the file is opened. Samples are native endian.
    Materialized(Vec<u8>),
    /// A layer channel without even a compression code, every row reads as zeros
    Empty
}

/// Channel id and length as listed in a layer record
#[derive(Debug, Copy, Clone)]
pub struct ChannelRecord {
    pub id:          ChannelId,
    pub data_length: u64
}

#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub id:          ChannelId,
    pub compression: CompressionMethod,
    pub width:       usize,
    pub height:      usize,
    /// Bytes of one decoded row
    pub row_length:  usize,
    pub data_length: u64,
    /// Stream offset of the pixel payload
    pub data_pos:    u64,
    pub storage:     ChannelStorage
}

impl ChannelInfo {
    /// A raw channel whose rows follow each other from `data_pos`
    pub fn new_raw(
        id: ChannelId, width: usize, height: usize, header: &FileHeader, data_pos: u64
    ) -> ChannelInfo {
        let row_length = header.row_bytes(width);
        let row_offsets = (0..height)
            .map(|y| data_pos + (y * row_length) as u64)
            .collect();

        ChannelInfo {
            id,
            compression: CompressionMethod::NoCompression,
            width,
            height,
            row_length,
            data_length: (row_length * height) as u64,
            data_pos,
            storage: ChannelStorage::Raw { row_offsets }
        }
    }

    /// An RLE channel whose packed rows start at `data_pos`
    /// and follow each other with the given lengths
    pub fn new_rle(
        id: ChannelId, width: usize, height: usize, header: &FileHeader, data_pos: u64,
        row_lengths: Vec<u32>
    ) -> ChannelInfo {
        let mut row_offsets = Vec::with_capacity(row_lengths.len());
        let mut position = data_pos;

        for length in &row_lengths {
            row_offsets.push(position);
            position += u64::from(*length);
        }

        ChannelInfo {
            id,
            compression: CompressionMethod::RLE,
            width,
            height,
            row_length: header.row_bytes(width),
            data_length: position - data_pos,
            data_pos,
            storage: ChannelStorage::Rle {
                row_offsets,
                row_lengths
            }
        }
    }

    /// Extract row `y` into `out` as native endian samples
    ///
    /// `out` must be exactly `row_length` bytes, `scratch` holds
    /// packed bytes of RLE rows between calls.
    pub fn read_row<T: ZByteReaderTrait>(
        &self, reader: &mut PsdReader<T>, y: usize, depth: u16, scratch: &mut Vec<u8>,
        out: &mut [u8]
    ) -> Result<(), PSDDecodeErrors> {
        if y >= self.height {
            return Err(PSDDecodeErrors::ScanlineOutOfRange(y, self.height));
        }
        if out.len() != self.row_length {
            return Err(PSDDecodeErrors::TooSmallOutput(self.row_length, out.len()));
        }
        match &self.storage {
            ChannelStorage::Raw { row_offsets } => {
                let offset = *row_offsets
                    .get(y)
                    .ok_or(PSDDecodeErrors::ScanlineOutOfRange(y, row_offsets.len()))?;
                reader.seek(offset)?;
                reader.read_exact(out)?;
                be_to_native(out, depth);
            }
            ChannelStorage::Rle {
                row_offsets,
                row_lengths
            } => {
                let (offset, length) = row_offsets
                    .get(y)
                    .zip(row_lengths.get(y))
                    .ok_or(PSDDecodeErrors::ScanlineOutOfRange(y, row_offsets.len()))?;

                // packbits never needs this much, even for all literal rows
                if *length as usize > self.row_length * 2 + 128 {
                    return Err(PSDDecodeErrors::BadRLE);
                }
                scratch.resize(*length as usize, 0);
                reader.seek(*offset)?;
                reader.read_exact(scratch)?;

                decode_packbits(scratch, out)?;
                be_to_native(out, depth);
            }
            ChannelStorage::Empty => out.fill(0),
            ChannelStorage::Materialized(data) => {
                let start = y * self.row_length;
                let row = data
                    .get(start..start + self.row_length)
                    .ok_or(PSDDecodeErrors::ScanlineOutOfRange(y, self.height))?;
                out.copy_from_slice(row);
            }
        }
        Ok(())
    }
}

/// Read the payload of one layer channel, the second pass over a layer
///
/// The reader must be at the start of the channel's data, on
/// return it is right after it whatever the compression consumed.
pub fn read_channel_data<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, record: &ChannelRecord, width: usize, height: usize,
    header: &FileHeader, options: &PSDOptions
) -> Result<ChannelInfo, PSDDecodeErrors> {
    let start = reader.position()?;
    let end = start
        .checked_add(record.data_length)
        .ok_or(PSDDecodeErrors::InconsistentLength("layer channel"))?;

    if record.data_length < 2 {
        // nothing but an empty channel fits here
        reader.seek(end)?;

        return Ok(ChannelInfo {
            id: record.id,
            compression: CompressionMethod::NoCompression,
            width,
            height,
            row_length: header.row_bytes(width),
            data_length: record.data_length,
            data_pos: start,
            storage: ChannelStorage::Empty
        });
    }

    let method = reader.read_u16()?;
    let compression = CompressionMethod::from_int(method)
        .ok_or(PSDDecodeErrors::UnknownCompression(method, "layer channel"))?;
    let data_pos = start + 2;
    let payload = record.data_length - 2;
    let row_length = header.row_bytes(width);

    trace!(
        "Channel {:?}: {:?}, {} bytes, {}x{}",
        record.id,
        compression,
        record.data_length,
        width,
        height
    );

    let mut channel = match compression {
        CompressionMethod::NoCompression => {
            if ((row_length * height) as u64) > payload {
                return Err(PSDDecodeErrors::InconsistentLength("raw layer channel"));
            }
            ChannelInfo::new_raw(record.id, width, height, header, data_pos)
        }
        CompressionMethod::RLE => {
            let row_lengths = read_rle_lengths(reader, height, header.version)?;
            let table = reader.position()? - data_pos;

            let channel =
                ChannelInfo::new_rle(record.id, width, height, header, data_pos + table, row_lengths);

            if channel.data_length + table > payload {
                return Err(PSDDecodeErrors::InconsistentLength("rle layer channel"));
            }
            channel
        }
        CompressionMethod::Zip | CompressionMethod::ZipPrediction => {
            let limit = options.get_max_channel_bytes();
            let expected = row_length * height;

            if payload > limit as u64 {
                return Err(PSDDecodeErrors::TooLargeAllocation("zip channel", payload, limit));
            }
            if expected > limit {
                return Err(PSDDecodeErrors::TooLargeAllocation(
                    "inflated channel",
                    expected as u64,
                    limit
                ));
            }
            let compressed = reader.read_vec(payload as usize)?;
            let mut data = inflate(&compressed, expected)?;

            if compression == CompressionMethod::ZipPrediction {
                decode_prediction(&mut data, width, height, header.depth)?;
            } else {
                be_to_native(&mut data, header.depth);
            }

            ChannelInfo {
                id: record.id,
                compression,
                width,
                height,
                row_length,
                data_length: payload,
                data_pos,
                storage: ChannelStorage::Materialized(data)
            }
        }
    };
    channel.data_length = record.data_length;
    channel.data_pos = data_pos;

    reader.seek(end)?;

    Ok(channel)
}

/// Read `rows` RLE row byte counts
pub fn read_rle_lengths<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, rows: usize, version: Version
) -> Result<Vec<u32>, PSDDecodeErrors> {
    let mut lengths = Vec::with_capacity(rows);

    for _ in 0..rows {
        lengths.push(reader.read_rle_length(version)?);
    }
    Ok(lengths)
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use zune_core::bytestream::ZCursor;

    use crate::channel::{read_channel_data, ChannelId, ChannelRecord, ChannelStorage};
    use crate::constants::{ColorModes, CompressionMethod};
    use crate::cursor::PsdReader;
    use crate::errors::PSDDecodeErrors;
    use crate::header::{FileHeader, Version};
    use crate::options::PSDOptions;

    fn header(depth: u16) -> FileHeader {
        FileHeader {
            version: Version::Psd,
            channel_count: 3,
            width: 4,
            height: 2,
            depth,
            color_mode: ColorModes::RGB
        }
    }

    #[test]
    fn channel_ids() {
        assert_eq!(ChannelId::from_int(0), Some(ChannelId::Color(0)));
        assert_eq!(ChannelId::from_int(2), Some(ChannelId::Color(2)));
        assert_eq!(ChannelId::from_int(-1), Some(ChannelId::Transparency));
        assert_eq!(ChannelId::from_int(-2), Some(ChannelId::LayerMask));
        assert_eq!(ChannelId::from_int(-3), Some(ChannelId::UserMask));
        assert_eq!(ChannelId::from_int(-4), None);
        assert!(ChannelId::LayerMask.is_mask());
        assert!(!ChannelId::Transparency.is_mask());
    }

    #[test]
    fn raw_channel_rows() {
        let mut data = vec![0, 0];
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data.push(0xEE);

        let record = ChannelRecord {
            id:          ChannelId::Color(0),
            data_length: 10
        };
        let mut reader = PsdReader::new(ZCursor::new(&data[..]));
        let channel =
            read_channel_data(&mut reader, &record, 4, 2, &header(8), &PSDOptions::default())
                .unwrap();

        assert_eq!(reader.position().unwrap(), 10);
        assert_eq!(channel.compression, CompressionMethod::NoCompression);

        let mut row = [0; 4];
        let mut scratch = Vec::new();
        channel
            .read_row(&mut reader, 1, 8, &mut scratch, &mut row)
            .unwrap();
        assert_eq!(row, [5, 6, 7, 8]);

        assert!(matches!(
            channel.read_row(&mut reader, 2, 8, &mut scratch, &mut row),
            Err(PSDDecodeErrors::ScanlineOutOfRange(2, 2))
        ));
    }

    #[test]
    fn rle_channel_offsets_are_cumulative() {
        // compression, two row lengths then the rows
        let mut data = vec![0, 1, 0, 2, 0, 5];
        data.extend_from_slice(&[(-3_i8) as u8, 9]);
        data.extend_from_slice(&[3, 1, 2, 3, 4]);

        let record = ChannelRecord {
            id:          ChannelId::Color(1),
            data_length: data.len() as u64
        };
        let mut reader = PsdReader::new(ZCursor::new(&data[..]));
        let channel =
            read_channel_data(&mut reader, &record, 4, 2, &header(8), &PSDOptions::default())
                .unwrap();

        match &channel.storage {
            ChannelStorage::Rle {
                row_offsets,
                row_lengths
            } => {
                assert_eq!(row_offsets, &[6, 8]);
                assert_eq!(row_lengths, &[2, 5]);
            }
            _ => panic!("expected rle storage")
        }
        let mut scratch = Vec::new();
        let mut row = [0; 4];

        channel
            .read_row(&mut reader, 1, 8, &mut scratch, &mut row)
            .unwrap();
        assert_eq!(row, [1, 2, 3, 4]);
        channel
            .read_row(&mut reader, 0, 8, &mut scratch, &mut row)
            .unwrap();
        assert_eq!(row, [9; 4]);
    }

    #[test]
    fn unknown_compression_fails() {
        let data = [0, 4, 0, 0];
        let record = ChannelRecord {
            id:          ChannelId::Color(0),
            data_length: 4
        };
        let mut reader = PsdReader::new(ZCursor::new(&data[..]));

        assert!(matches!(
            read_channel_data(&mut reader, &record, 1, 1, &header(8), &PSDOptions::default()),
            Err(PSDDecodeErrors::UnknownCompression(4, _))
        ));
    }

    #[test]
    fn zip_limit_is_checked_before_allocation() {
        let data = [0, 2, 0, 0];
        let record = ChannelRecord {
            id:          ChannelId::Color(0),
            data_length: 1 << 40
        };
        let mut reader = PsdReader::new(ZCursor::new(&data[..]));

        assert!(matches!(
            read_channel_data(&mut reader, &record, 4, 2, &header(8), &PSDOptions::default()),
            Err(PSDDecodeErrors::TooLargeAllocation(..))
        ));
    }

    #[test]
    fn empty_channel_reads_zeros_for_every_row() {
        let data = [7];
        let record = ChannelRecord {
            id:          ChannelId::Transparency,
            data_length: 1
        };
        let mut reader = PsdReader::new(ZCursor::new(&data[..]));
        let channel =
            read_channel_data(&mut reader, &record, 4, 2, &header(8), &PSDOptions::default())
                .unwrap();

        assert!(matches!(channel.storage, ChannelStorage::Empty));
        assert_eq!(channel.height, 2);
        assert_eq!(reader.position().unwrap(), 1);

        let mut scratch = Vec::new();
        let mut row = [0xAA; 4];

        channel
            .read_row(&mut reader, 1, 8, &mut scratch, &mut row)
            .unwrap();
        assert_eq!(row, [0; 4]);
    }

    #[test]
    fn overflowing_channel_length_fails() {
        let data = [0, 0, 1, 2];
        let record = ChannelRecord {
            id:          ChannelId::Color(0),
            data_length: u64::MAX
        };
        let mut reader = PsdReader::new(ZCursor::new(&data[..]));
        reader.skip(1).unwrap();

        assert!(matches!(
            read_channel_data(&mut reader, &record, 1, 1, &header(8), &PSDOptions::default()),
            Err(PSDDecodeErrors::InconsistentLength(_))
        ));
    }
}
