/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Big endian primitive reads over a seekable stream
//!
//! Every section parser takes a [`PsdReader`] and advances it,
//! the position is never shared implicitly.
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use zune_core::bytestream::{ZByteReaderTrait, ZReader, ZSeekFrom};

use crate::errors::PSDDecodeErrors;
use crate::header::Version;

/// An integer stored big endian in the file
pub trait BigEndian: Sized + Copy {
    const SIZE: usize;

    fn from_be_slice(bytes: &[u8]) -> Self;
}

macro_rules! big_endian {
    ($($int:ty),*) => {
        $(
            impl BigEndian for $int {
                const SIZE: usize = core::mem::size_of::<$int>();

                #[inline(always)]
                fn from_be_slice(bytes: &[u8]) -> Self {
                    let mut space = [0; core::mem::size_of::<$int>()];
                    space.copy_from_slice(&bytes[..Self::SIZE]);
                    <$int>::from_be_bytes(space)
                }
            }
        )*
    };
}

big_endian!(u8, i8, u16, i16, u32, i32, u64, i64);

pub struct PsdReader<T: ZByteReaderTrait> {
    stream: ZReader<T>
}

impl<T: ZByteReaderTrait> PsdReader<T> {
    pub fn new(source: T) -> PsdReader<T> {
        PsdReader {
            stream: ZReader::new(source)
        }
    }

    pub fn position(&mut self) -> Result<u64, PSDDecodeErrors> {
        Ok(self.stream.position()?)
    }

    pub fn seek(&mut self, position: u64) -> Result<(), PSDDecodeErrors> {
        self.stream.seek(ZSeekFrom::Start(position))?;
        Ok(())
    }

    pub fn skip(&mut self, bytes: u64) -> Result<(), PSDDecodeErrors> {
        let bytes = i64::try_from(bytes).map_err(|_| PSDDecodeErrors::Generic("Skip too large"))?;
        self.stream.seek(ZSeekFrom::Current(bytes))?;
        Ok(())
    }

    /// Read `size_of::<S>()` bytes stored big endian and widen them into `D`
    ///
    /// e.g. a 32 bit length read into a `u64` so that PSD and PSB
    /// lengths share a type.
    #[inline]
    pub fn read_be<S: BigEndian, D: From<S>>(&mut self) -> Result<D, PSDDecodeErrors> {
        let mut space = [0_u8; 8];
        self.stream.read_exact_bytes(&mut space[..S::SIZE])?;
        Ok(D::from(S::from_be_slice(&space)))
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, PSDDecodeErrors> {
        Ok(self.stream.read_u8_err()?)
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, PSDDecodeErrors> {
        Ok(self.stream.get_u16_be_err()?)
    }

    #[inline]
    pub fn read_i16(&mut self) -> Result<i16, PSDDecodeErrors> {
        self.read_be::<i16, i16>()
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, PSDDecodeErrors> {
        Ok(self.stream.get_u32_be_err()?)
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32, PSDDecodeErrors> {
        self.read_be::<i32, i32>()
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64, PSDDecodeErrors> {
        Ok(self.stream.get_u64_be_err()?)
    }

    pub fn read_f64(&mut self) -> Result<f64, PSDDecodeErrors> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Read a section or channel length, 4 bytes in PSD and 8 bytes in PSB
    pub fn read_length(&mut self, version: Version) -> Result<u64, PSDDecodeErrors> {
        match version {
            Version::Psd => self.read_be::<u32, u64>(),
            Version::Psb => self.read_u64()
        }
    }

    /// Read the byte count of one RLE compressed row,
    /// 2 bytes in PSD and 4 bytes in PSB
    pub fn read_rle_length(&mut self, version: Version) -> Result<u32, PSDDecodeErrors> {
        match version {
            Version::Psd => self.read_be::<u16, u32>(),
            Version::Psb => self.read_u32()
        }
    }

    pub fn read_signature(&mut self) -> Result<[u8; 4], PSDDecodeErrors> {
        let mut signature = [0; 4];
        self.stream.read_exact_bytes(&mut signature)?;
        Ok(signature)
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), PSDDecodeErrors> {
        Ok(self.stream.read_exact_bytes(buf)?)
    }

    pub fn read_vec(&mut self, length: usize) -> Result<Vec<u8>, PSDDecodeErrors> {
        let mut data = vec![0; length];
        self.stream.read_exact_bytes(&mut data)?;
        Ok(data)
    }

    /// Read a length prefixed string padded so that
    /// the length byte, the string and the padding are a
    /// multiple of `mod_padding`.
    ///
    /// Returns the string and the total number of bytes consumed
    pub fn read_pascal_string(
        &mut self, mod_padding: usize
    ) -> Result<(String, usize), PSDDecodeErrors> {
        let length = usize::from(self.read_u8()?);

        let mut name = vec![0; length];
        self.stream.read_exact_bytes(&mut name)?;

        let padding = pascal_padding(length, mod_padding);
        self.skip(padding as u64)?;

        let name = String::from_utf8_lossy(&name).into_owned();

        Ok((name, 1 + length + padding))
    }
}

/// Padding bytes following a pascal string of `length` bytes
pub fn pascal_padding(length: usize, mod_padding: usize) -> usize {
    if mod_padding <= 1 {
        return 0;
    }
    if length == 0 {
        return mod_padding - 1;
    }
    let used = (1 + length) % mod_padding;

    if used == 0 {
        0
    } else {
        mod_padding - used
    }
}

/// Append `name` as a padded pascal string
///
/// Names longer than 255 bytes are truncated
pub fn write_pascal_string(out: &mut Vec<u8>, name: &[u8], mod_padding: usize) {
    let length = name.len().min(255);

    out.push(length as u8);
    out.extend_from_slice(&name[..length]);
    out.resize(out.len() + pascal_padding(length, mod_padding), 0);
}
