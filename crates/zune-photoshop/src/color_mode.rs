/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec::Vec;

use zune_core::bytestream::ZByteReaderTrait;
use zune_core::log::trace;

use crate::constants::{ColorModes, PALETTE_LENGTH};
use crate::cursor::PsdReader;
use crate::errors::PSDDecodeErrors;
use crate::options::PSDOptions;

/// Color mode data section
///
/// For indexed images this is the palette, stored planar,
/// all reds, then all greens then all blues.
#[derive(Debug, Clone, Default)]
pub struct ColorModeData {
    pub data: Vec<u8>
}

impl ColorModeData {
    /// Palette entry `index` as `[r, g, b]`, only meaningful
    /// for indexed images
    pub fn palette_entry(&self, index: u8) -> Option<[u8; 3]> {
        if self.data.len() != PALETTE_LENGTH {
            return None;
        }
        let index = usize::from(index);

        Some([
            self.data[index],
            self.data[index + 256],
            self.data[index + 512]
        ])
    }
}

pub fn read_color_mode_data<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, color_mode: ColorModes, options: &PSDOptions
) -> Result<ColorModeData, PSDDecodeErrors> {
    let length = reader.read_u32()? as usize;

    trace!("Color mode data length: {}", length);

    match color_mode {
        ColorModes::DuoTone if length == 0 => {
            return Err(PSDDecodeErrors::BadColorModeData(color_mode, length));
        }
        ColorModes::IndexedColor if length != PALETTE_LENGTH => {
            return Err(PSDDecodeErrors::BadColorModeData(color_mode, length));
        }
        _ => ()
    }

    if length > options.get_max_channel_bytes() {
        return Err(PSDDecodeErrors::TooLargeAllocation(
            "color mode data",
            length as u64,
            options.get_max_channel_bytes()
        ));
    }

    // only the palette is used afterwards, duotone specifications
    // are opaque to us
    if color_mode == ColorModes::IndexedColor {
        let data = reader.read_vec(length)?;
        return Ok(ColorModeData { data });
    }
    reader.skip(length as u64)?;

    Ok(ColorModeData::default())
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use zune_core::bytestream::ZCursor;

    use crate::color_mode::read_color_mode_data;
    use crate::constants::ColorModes;
    use crate::cursor::PsdReader;
    use crate::errors::PSDDecodeErrors;
    use crate::options::PSDOptions;

    fn section(length: usize) -> Vec<u8> {
        let mut data = (length as u32).to_be_bytes().to_vec();
        data.extend((0..length).map(|x| x as u8));
        data
    }

    #[test]
    fn palette_is_planar() {
        let data = section(768);
        let mut reader = PsdReader::new(ZCursor::new(&data[..]));
        let palette =
            read_color_mode_data(&mut reader, ColorModes::IndexedColor, &PSDOptions::default())
                .unwrap();

        // planes start at 0, 256 and 512
        assert_eq!(palette.palette_entry(3), Some([3, 3, 3]));
        assert_eq!(palette.palette_entry(255), Some([255, 255, 255]));
    }

    #[test]
    fn palette_length_must_be_exact() {
        for length in [0, 767, 769, 1024] {
            let data = section(length);
            let mut reader = PsdReader::new(ZCursor::new(&data[..]));
            let result =
                read_color_mode_data(&mut reader, ColorModes::IndexedColor, &PSDOptions::default());

            assert!(matches!(
                result,
                Err(PSDDecodeErrors::BadColorModeData(ColorModes::IndexedColor, x)) if x == length
            ));
        }
    }

    #[test]
    fn duotone_needs_data() {
        let data = section(0);
        let mut reader = PsdReader::new(ZCursor::new(&data[..]));
        let options = PSDOptions::default().set_raw_data(true);
        assert!(read_color_mode_data(&mut reader, ColorModes::DuoTone, &options).is_err());

        let data = section(10);
        let mut reader = PsdReader::new(ZCursor::new(&data[..]));
        assert!(read_color_mode_data(&mut reader, ColorModes::DuoTone, &options).is_ok());
        assert_eq!(reader.position().unwrap(), 14);
    }
}
