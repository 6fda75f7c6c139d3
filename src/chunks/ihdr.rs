use anyhow::bail;
use nom::{
    combinator::all_consuming,
    number::complete::{be_u32, u8},
    sequence::tuple,
    IResult,
};

use super::{encode_chunk, ParseableChunk};
use crate::utils::div_ceil;

#[derive(Debug, Default)]
pub struct IHDRChunk {
    pub width: u32,
    pub height: u32,
    pub(crate) bit_depth: u8,
    pub(crate) color_type: u8,
    pub(crate) compression_method: u8,
    pub(crate) filter_method: u8,
    pub(crate) interlace_method: u8,
}

impl IHDRChunk {
    /// Checks the header against the supported subset and resolves the
    /// color model. Runs before any pixel data is touched.
    pub(crate) fn validate(&self) -> anyhow::Result<ColorType> {
        if self.bit_depth != 8 {
            bail!("Only 8-bit PNGs are supported");
        }
        if self.interlace_method != 0 {
            bail!("Interlaced PNGs are not supported");
        }
        if self.compression_method != 0 || self.filter_method != 0 {
            bail!("Unsupported PNG compression or filter method");
        }
        match self.color_type {
            2 => Ok(ColorType::Truecolor),
            3 => Ok(ColorType::IndexedColor),
            6 => Ok(ColorType::TruecolorWithAlpha),
            t => bail!("Unsupported color type: {t}"),
        }
    }

    /// Bytes per pixel as seen by the scanline filters, never less than 1.
    pub(crate) fn filter_width(&self, color_type: ColorType) -> u8 {
        let sample_width = u8::max(self.bit_depth / 8, 1);
        color_type.channel_count() * sample_width
    }

    /// Length in bytes of one scanline's pixel data, excluding the
    /// filter-type tag.
    pub(crate) fn scanline_size(&self, color_type: ColorType) -> usize {
        let pixel_bits = color_type.channel_count() as usize * self.bit_depth as usize;
        div_ceil(self.width as usize * pixel_bits, 8)
    }
}

impl<'a> ParseableChunk<'a> for IHDRChunk {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"IHDR";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (rest, fields) =
            all_consuming(tuple((be_u32, be_u32, u8, u8, u8, u8, u8)))(chunk_data)?;
        let (width, height, bit_depth, color_type, compression_method, filter_method, interlace_method) =
            fields;
        Ok((
            rest,
            IHDRChunk {
                width,
                height,
                bit_depth,
                color_type,
                compression_method,
                filter_method,
                interlace_method,
            },
        ))
    }

    fn to_bytes(&self) -> Self::Output {
        let mut data = Vec::with_capacity(13);
        data.extend(self.width.to_be_bytes());
        data.extend(self.height.to_be_bytes());
        data.extend([
            self.bit_depth,
            self.color_type,
            self.compression_method,
            self.filter_method,
            self.interlace_method,
        ]);
        encode_chunk(Self::HEADER, &data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColorType {
    Truecolor = 2,
    IndexedColor = 3,
    TruecolorWithAlpha = 6,
}

impl ColorType {
    pub(crate) fn channel_count(&self) -> u8 {
        match self {
            Self::Truecolor => 3,
            Self::IndexedColor => 1,
            Self::TruecolorWithAlpha => 4,
        }
    }
}
