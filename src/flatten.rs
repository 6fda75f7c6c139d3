use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};
use log::{debug, info};
use nom::{bytes::complete::tag, IResult};

use crate::chunks::{
    self,
    idat::IDATChunk,
    iend::IENDChunk,
    ihdr::{ColorType, IHDRChunk},
    plte::PLTEChunk,
    trns::tRNSChunk,
    Chunk, ParseableChunk, RawChunk,
};
use crate::image_data::{self, Codec, Zlib};
use crate::pixel::{IndexedPixel, Pixel};

const SIGNATURE: &[u8; 8] = b"\x89PNG\x0d\x0a\x1a\x0a";

/// Ancillary chunks copied through to the output; everything else is
/// dropped during re-encoding.
const PASSTHROUGH: [&[u8; 4]; 3] = [b"sRGB", b"gAMA", b"cHRM"];

/// Decodes a PNG, composites every pixel over opaque white, and re-encodes
/// the result as an 8-bit truecolor PNG.
pub fn flatten_to_white(source: &[u8]) -> anyhow::Result<Vec<u8>> {
    flatten_with(source, &Zlib)
}

pub(crate) fn flatten_with(source: &[u8], codec: &dyn Codec) -> anyhow::Result<Vec<u8>> {
    let (rest, _) = parse_signature(source)
        .map_err(|_| anyhow!("input doesn't start with expected signature"))?;
    let mut chunk_iter = chunks::iter_chunks(rest);
    let header = match chunk_iter.next().transpose()? {
        Some(Chunk::IHDR(header)) => header,
        _ => bail!("First chunk is not IHDR"),
    };
    let color_type = header.validate()?;
    info!(
        "flattening {}x{} {:?} image",
        header.width, header.height, color_type
    );

    let mut compressed = Vec::new();
    let mut palette: Option<PLTEChunk> = None;
    let mut transparency: Option<tRNSChunk> = None;
    let mut ancillary: Vec<RawChunk> = Vec::new();
    for chunk in chunk_iter {
        match chunk? {
            Chunk::IDAT(idat) => compressed.extend_from_slice(idat.data),
            Chunk::PLTE(plte) => palette = Some(plte),
            Chunk::tRNS(trns) => transparency = Some(trns),
            Chunk::IEND => break,
            Chunk::Other(raw) => ancillary.push(raw),
            Chunk::IHDR(_) => debug!("ignoring extra IHDR chunk"),
        }
    }
    if compressed.is_empty() {
        bail!("No IDAT chunks found");
    }

    let height = header.height as usize;
    let recon = image_data::decompress_data(
        &compressed,
        height,
        header.scanline_size(color_type),
        header.filter_width(color_type) as usize,
        codec,
    )?;
    let triplets = expand_to_rgb(
        &recon,
        &header,
        color_type,
        palette.as_ref(),
        transparency.as_ref(),
    )?;
    let encoded = image_data::compress_data(&triplets, height, header.width as usize * 3, codec);
    debug!(
        "re-encoded {} pixel bytes into {} compressed bytes",
        triplets.len(),
        encoded.len()
    );

    let out_header = IHDRChunk {
        color_type: ColorType::Truecolor as u8,
        ..header
    };
    let mut output = SIGNATURE.to_vec();
    output.extend(out_header.to_bytes());
    for chunk in &ancillary {
        if PASSTHROUGH.contains(&chunk.chunk_type()) {
            debug!(
                "passing through {} chunk",
                String::from_utf8_lossy(chunk.chunk_type())
            );
            output.extend(chunk.to_bytes());
        }
    }
    output.extend(IDATChunk { data: &encoded }.to_bytes());
    output.extend(IENDChunk.to_bytes());
    Ok(output)
}

fn parse_signature(input: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(SIGNATURE.as_slice())(input)
}

fn expand_to_rgb(
    recon: &[u8],
    header: &IHDRChunk,
    color_type: ColorType,
    palette: Option<&PLTEChunk>,
    transparency: Option<&tRNSChunk>,
) -> anyhow::Result<Vec<u8>> {
    match color_type {
        ColorType::TruecolorWithAlpha => {
            let mut rgb = Vec::with_capacity(recon.len() / 4 * 3);
            for px in recon.chunks_exact(4) {
                rgb.extend(Pixel::new(px[0], px[1], px[2], px[3]).flatten_over_white());
            }
            Ok(rgb)
        }
        // Already opaque; rows pass through untouched.
        ColorType::Truecolor => Ok(recon.to_vec()),
        ColorType::IndexedColor => {
            let palette =
                palette.ok_or_else(|| anyhow!("PLTE chunk missing for indexed-color PNG"))?;
            palette.validate()?;
            let width = header.width as usize;
            let row_size = header.scanline_size(color_type);
            let mut rgb = Vec::with_capacity(width * header.height as usize * 3);
            for y in 0..header.height as usize {
                let row = &recon[y * row_size..(y + 1) * row_size];
                for x in 0..width {
                    let pixel = IndexedPixel(index_at(row, x, header.bit_depth)?)
                        .to_pixel(palette, transparency);
                    rgb.extend(pixel.flatten_over_white());
                }
            }
            Ok(rgb)
        }
    }
}

// Pulls the palette index for pixel x out of a packed row, most significant
// bits first.
fn index_at(row: &[u8], x: usize, bit_depth: u8) -> anyhow::Result<u8> {
    Ok(match bit_depth {
        8 => row[x],
        4 => {
            let byte = row[x / 2];
            if x % 2 == 0 {
                byte >> 4
            } else {
                byte & 0x0f
            }
        }
        2 => (row[x / 4] >> (6 - 2 * (x % 4))) & 0x03,
        1 => (row[x / 8] >> (7 - x % 8)) & 0x01,
        d => bail!("Unsupported bit depth for indexed color: {d}"),
    })
}

/// Reads `input`, flattens it fully in memory, then writes the result to
/// the resolved output path. Nothing is written unless the whole
/// transformation succeeds.
pub fn flatten_file(
    input: &Path,
    output: Option<&Path>,
    in_place: bool,
) -> anyhow::Result<PathBuf> {
    let source = fs::read(input)?;
    let flattened = flatten_to_white(&source)?;
    let out_path = resolve_output_path(input, output, in_place);
    fs::write(&out_path, flattened)?;
    Ok(out_path)
}

/// An explicit output path wins; otherwise `in_place` overwrites the input,
/// and the fallback is the input path with `.flattened.png` appended.
pub fn resolve_output_path(input: &Path, output: Option<&Path>, in_place: bool) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None if in_place => input.to_path_buf(),
        None => {
            let mut with_suffix = input.as_os_str().to_owned();
            with_suffix.push(".flattened.png");
            PathBuf::from(with_suffix)
        }
    }
}
