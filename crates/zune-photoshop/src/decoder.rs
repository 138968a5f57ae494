/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The photoshop decoder
//!
//! Opening a file walks every section once, in file order:
//! header, color mode data, image resources, layer and mask
//! information and finally the merged image data. Pixel data is
//! only touched when scanlines are requested, except for zip
//! compressed layer channels which are inflated while opening.
use alloc::vec;
use alloc::vec::Vec;

use zune_core::bit_depth::BitDepth;
use zune_core::bytestream::ZByteReaderTrait;
use zune_core::colorspace::ColorSpace;
use zune_core::log::{debug, trace};
use zune_core::result::DecodingResult;

use crate::channel::{ChannelId, ChannelInfo};
use crate::color_mode::{read_color_mode_data, ColorModeData};
use crate::convert::{
    associate_alpha, bitmap_to_rgb, cmyk_to_rgb, indexed_to_rgb, interleave, remove_background,
    samples_from_bytes, samples_to_bytes, Sample
};
use crate::cursor::PsdReader;
use crate::errors::PSDDecodeErrors;
use crate::header::{read_header, validate_header, FileHeader};
use crate::image_data::{read_image_data, ImageDataSection};
use crate::layers::{read_layer_mask_section, GlobalMaskInfo, Layer, LayerMaskSection};
use crate::options::PSDOptions;
use crate::resources::{read_image_resources, ImageResources, Thumbnail};
use crate::spec::{composite_spec, layer_spec, AlphaPolicy, Conversion, SubimageSpec};

/// Everything read while opening a file
struct Document {
    header:          FileHeader,
    color_mode_data: ColorModeData,
    resources:       ImageResources,
    layer_section:   LayerMaskSection,
    image_data:      ImageDataSection,
    specs:           Vec<SubimageSpec>
}

/// A Photoshop PSD and PSB reader.
///
/// Subimage 0 is the merged composite, the layers follow in file order.
///
/// # Example
/// ```no_run
/// use zune_core::bytestream::ZCursor;
/// use zune_photoshop::PSDDecoder;
///
/// let data = std::fs::read("image.psd").unwrap();
/// let mut decoder = PSDDecoder::new(ZCursor::new(&data));
///
/// decoder.decode_headers().unwrap();
///
/// for subimage in 0..decoder.subimage_count() {
///     decoder.seek_subimage(subimage).unwrap();
///     let pixels = decoder.decode().unwrap();
/// }
/// ```
pub struct PSDDecoder<T>
where
    T: ZByteReaderTrait
{
    reader:   PsdReader<T>,
    options:  PSDOptions,
    document: Option<Document>,
    subimage: usize,
    scratch:  Vec<u8>
}

#[cfg(feature = "std")]
impl PSDDecoder<std::io::BufReader<std::fs::File>> {
    /// Open the file at `path` for decoding
    ///
    /// Headers are decoded before returning
    pub fn open<P: AsRef<std::path::Path>>(
        path: P, options: PSDOptions
    ) -> Result<Self, PSDDecodeErrors> {
        use zune_core::bytestream::ZByteIoError;

        let file = std::fs::File::open(path).map_err(ZByteIoError::from)?;
        let mut decoder = PSDDecoder::new_with_options(std::io::BufReader::new(file), options);
        decoder.decode_headers()?;

        Ok(decoder)
    }
}

impl<T> PSDDecoder<T>
where
    T: ZByteReaderTrait
{
    /// Create a new decoder that reads a photoshop encoded file
    /// from `T` and returns pixels
    ///
    /// # Arguments
    /// - data: Data source, it has to implement the `ZByteReaderTrait`
    pub fn new(data: T) -> PSDDecoder<T> {
        Self::new_with_options(data, PSDOptions::default())
    }

    /// Creates a new decoder with options that influence decoding routines
    ///
    /// # Arguments
    /// - data: Data source
    /// - options: Custom options for the decoder
    pub fn new_with_options(data: T, options: PSDOptions) -> PSDDecoder<T> {
        PSDDecoder {
            reader: PsdReader::new(data),
            options,
            document: None,
            subimage: 0,
            scratch: Vec::new()
        }
    }

    /// Decode headers from the encoded image
    ///
    /// This walks every section of the file, validating lengths and
    /// signatures and records where each channel's pixels live.
    /// Nothing is kept if any step fails.
    pub fn decode_headers(&mut self) -> Result<(), PSDDecodeErrors> {
        if self.document.is_some() {
            return Ok(());
        }
        let options = &self.options;
        let reader = &mut self.reader;

        reader.seek(0)?;

        let raw_header = read_header(reader)?;
        let header = validate_header(&raw_header, options)?;
        let color_mode_data = read_color_mode_data(reader, header.color_mode, options)?;
        let resources = read_image_resources(reader, options)?;
        let layer_section = read_layer_mask_section(reader, &header, options)?;
        let image_data = read_image_data(reader, &header, layer_section.transparency)?;

        let mut specs = Vec::with_capacity(layer_section.layers.len() + 1);
        specs.push(composite_spec(
            &header,
            &resources,
            image_data.transparency,
            options
        )?);

        for layer in &layer_section.layers {
            specs.push(layer_spec(&header, &resources, layer, options)?);
        }

        debug!("Subimages: {}", specs.len());

        self.document = Some(Document {
            header,
            color_mode_data,
            resources,
            layer_section,
            image_data,
            specs
        });
        self.subimage = 0;

        Ok(())
    }

    fn document(&self) -> Result<&Document, PSDDecodeErrors> {
        self.document
            .as_ref()
            .ok_or(PSDDecodeErrors::Generic("Headers not decoded"))
    }

    /// Number of subimages, the composite and every layer
    ///
    /// Zero if headers haven't been decoded
    pub fn subimage_count(&self) -> usize {
        self.document.as_ref().map_or(0, |x| x.specs.len())
    }

    /// Make `index` the current subimage
    pub fn seek_subimage(&mut self, index: usize) -> Result<(), PSDDecodeErrors> {
        self.decode_headers()?;

        let count = self.subimage_count();

        if index >= count {
            return Err(PSDDecodeErrors::SubimageOutOfRange(index, count));
        }
        self.subimage = index;

        Ok(())
    }

    pub const fn current_subimage(&self) -> usize {
        self.subimage
    }

    /// Layout of the current subimage
    pub fn spec(&self) -> Option<&SubimageSpec> {
        self.subimage_spec(self.subimage)
    }

    pub fn subimage_spec(&self, index: usize) -> Option<&SubimageSpec> {
        self.document.as_ref().and_then(|x| x.specs.get(index))
    }

    /// Seek to `subimage` and return its scanline `y`
    pub fn read_native_scanline(
        &mut self, subimage: usize, y: usize
    ) -> Result<Vec<u8>, PSDDecodeErrors> {
        self.seek_subimage(subimage)?;

        let length = self.document()?.specs[subimage].scanline_bytes();
        let mut out = vec![0; length];
        self.read_scanline_into(y, &mut out)?;

        Ok(out)
    }

    /// Read scanline `y` of the current subimage into `out`
    ///
    /// Samples are interleaved and native endian, `out` must hold at least
    /// [`scanline_bytes`](SubimageSpec::scanline_bytes) bytes.
    pub fn read_scanline_into(&mut self, y: usize, out: &mut [u8]) -> Result<(), PSDDecodeErrors> {
        self.decode_headers()?;

        let PSDDecoder {
            reader,
            document,
            subimage,
            scratch,
            ..
        } = self;

        let document = document
            .as_ref()
            .ok_or(PSDDecodeErrors::Generic("Headers not decoded"))?;

        let spec = &document.specs[*subimage];

        if y >= spec.height {
            return Err(PSDDecodeErrors::ScanlineOutOfRange(y, spec.height));
        }
        let length = spec.scanline_bytes();

        if out.len() < length {
            return Err(PSDDecodeErrors::TooSmallOutput(length, out.len()));
        }
        let out = &mut out[..length];

        let channels: Vec<Option<&ChannelInfo>> = if *subimage == 0 {
            spec.sources
                .iter()
                .map(|id| match id {
                    ChannelId::Color(index) => document.image_data.channels.get(usize::from(*index)),
                    _ => None
                })
                .collect()
        } else {
            let layer = &document.layer_section.layers[*subimage - 1];
            spec.sources.iter().map(|id| layer.channel(*id)).collect()
        };

        assemble_scanline(reader, scratch, document, spec, &channels, y, out)
    }

    /// Decode the current subimage returning native endian bytes
    pub fn decode_raw(&mut self) -> Result<Vec<u8>, PSDDecodeErrors> {
        self.decode_headers()?;

        let spec = self.document()?.specs[self.subimage].clone();
        let length = spec.scanline_bytes();

        let mut out = vec![0; length * spec.height];

        if length == 0 {
            return Ok(out);
        }
        for (y, row) in out.chunks_exact_mut(length).enumerate() {
            self.read_scanline_into(y, row)?;
        }
        trace!("Decoded subimage {} ({}x{})", self.subimage, spec.width, spec.height);

        Ok(out)
    }

    /// Decode the current subimage
    ///
    /// 1 and 8 bit images return `U8`, 16 bit images `U16`
    /// and 32 bit images `F32`.
    pub fn decode(&mut self) -> Result<DecodingResult, PSDDecodeErrors> {
        let raw = self.decode_raw()?;

        match self.document()?.specs[self.subimage].bits_per_sample {
            16 => Ok(DecodingResult::U16(samples_from_bytes::<u16>(&raw))),
            32 => Ok(DecodingResult::F32(samples_from_bytes::<f32>(&raw))),
            _ => Ok(DecodingResult::U8(raw))
        }
    }

    /// Get the current subimage's width and height respectively or
    /// None if the headers haven't been decoded
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.spec().map(|x| (x.width, x.height))
    }

    /// Get the bit depth of the current subimage or None
    /// if the headers haven't been decoded
    pub fn bit_depth(&self) -> Option<BitDepth> {
        self.spec().map(|x| x.depth)
    }

    /// Get the colorspace of the current subimage's output
    /// or None if the headers haven't been decoded
    pub fn colorspace(&self) -> Option<ColorSpace> {
        self.spec().map(|x| x.colorspace())
    }

    pub fn header(&self) -> Option<&FileHeader> {
        self.document.as_ref().map(|x| &x.header)
    }

    pub fn layers(&self) -> &[Layer] {
        match &self.document {
            Some(document) => &document.layer_section.layers,
            None => &[]
        }
    }

    pub fn resources(&self) -> Option<&ImageResources> {
        self.document.as_ref().map(|x| &x.resources)
    }

    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        self.resources().and_then(|x| x.thumbnail.as_ref())
    }

    pub fn global_mask_info(&self) -> Option<&GlobalMaskInfo> {
        self.document
            .as_ref()
            .and_then(|x| x.layer_section.global_mask.as_ref())
    }

    /// Whether the merged image carries transparency in its first alpha channel
    pub fn composite_has_transparency(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(|x| x.image_data.transparency)
    }

    /// Palette of indexed images, empty otherwise
    pub fn color_mode_data(&self) -> Option<&ColorModeData> {
        self.document.as_ref().map(|x| &x.color_mode_data)
    }
}

fn assemble_scanline<T: ZByteReaderTrait>(
    reader: &mut PsdReader<T>, scratch: &mut Vec<u8>, document: &Document, spec: &SubimageSpec,
    channels: &[Option<&ChannelInfo>], y: usize, out: &mut [u8]
) -> Result<(), PSDDecodeErrors> {
    let header = &document.header;
    let row_length = header.row_bytes(spec.width);

    let mut rows = Vec::with_capacity(channels.len());

    for channel in channels.iter().copied() {
        let mut row = vec![0; row_length];

        // missing channels read as zeros
        if let Some(channel) = channel {
            channel.read_row(reader, y, header.depth, scratch, &mut row)?;
        }
        rows.push(row);
    }

    if spec.bits_per_sample == 1 {
        for (row, dest) in rows.iter().zip(out.chunks_exact_mut(row_length)) {
            dest.copy_from_slice(row);
        }
        return Ok(());
    }

    match spec.convert {
        Conversion::Bitmap => {
            bitmap_to_rgb(&rows[0], spec.width, out);
            return Ok(());
        }
        Conversion::Indexed => {
            let mut interleaved = vec![0; spec.width * rows.len()];
            interleave(&rows, 1, &mut interleaved);

            indexed_to_rgb(
                &interleaved,
                rows.len(),
                &document.color_mode_data,
                document.resources.transparency_index,
                spec.nchannels,
                out
            );
            if let Some(alpha_index) = spec.alpha_channel {
                apply_alpha::<u8>(out, spec, alpha_index, &document.resources);
            }
            return Ok(());
        }
        _ => ()
    }

    if spec.convert == Conversion::Passthrough && spec.alpha == AlphaPolicy::Untouched {
        interleave(&rows, header.bytes_per_sample(), out);
        return Ok(());
    }

    let mut interleaved = vec![0; row_length * rows.len()];
    interleave(&rows, header.bytes_per_sample(), &mut interleaved);

    match header.bit_depth() {
        BitDepth::Sixteen => convert_samples::<u16>(&interleaved, rows.len(), spec, document, out),
        BitDepth::Float32 => convert_samples::<f32>(&interleaved, rows.len(), spec, document, out),
        _ => convert_samples::<u8>(&interleaved, rows.len(), spec, document, out)
    }
    Ok(())
}

fn convert_samples<S: Sample>(
    interleaved: &[u8], in_channels: usize, spec: &SubimageSpec, document: &Document,
    out: &mut [u8]
) {
    let samples = samples_from_bytes::<S>(interleaved);

    let mut converted = if spec.convert == Conversion::Cmyk {
        let mut converted = vec![S::default(); spec.width * spec.nchannels];
        cmyk_to_rgb(&samples, in_channels, &mut converted);
        converted
    } else {
        samples
    };

    if let Some(alpha_index) = spec.alpha_channel {
        alpha_policy(&mut converted, spec, alpha_index, &document.resources);
    }
    samples_to_bytes(&converted, out);
}

fn apply_alpha<S: Sample>(
    out: &mut [u8], spec: &SubimageSpec, alpha_index: usize, resources: &ImageResources
) {
    if spec.alpha == AlphaPolicy::Untouched {
        return;
    }
    let mut samples = samples_from_bytes::<S>(out);
    alpha_policy(&mut samples, spec, alpha_index, resources);
    samples_to_bytes(&samples, out);
}

fn alpha_policy<S: Sample>(
    samples: &mut [S], spec: &SubimageSpec, alpha_index: usize, resources: &ImageResources
) {
    match spec.alpha {
        AlphaPolicy::Untouched => (),
        AlphaPolicy::RemoveBackground { unassociate } => remove_background(
            samples,
            spec.nchannels,
            alpha_index,
            resources.background(),
            unassociate
        ),
        AlphaPolicy::Associate => associate_alpha(samples, spec.nchannels, alpha_index)
    }
}
