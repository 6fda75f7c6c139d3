use anyhow::Context;
use miniz_oxide::{deflate::compress_to_vec_zlib, inflate::decompress_to_vec_zlib};

use crate::filters::reconstruct_scanlines;

/// The compression boundary; tests substitute their own implementation.
pub(crate) trait Codec {
    fn decompress(&self, data: &[u8]) -> anyhow::Result<Vec<u8>>;
    fn compress(&self, data: &[u8]) -> Vec<u8>;
}

pub(crate) struct Zlib;

impl Codec for Zlib {
    fn decompress(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        decompress_to_vec_zlib(data).map_err(|e| anyhow::anyhow!("{e}"))
    }

    fn compress(&self, data: &[u8]) -> Vec<u8> {
        compress_to_vec_zlib(data, 9)
    }
}

pub(crate) fn decompress_data(
    compressed: &[u8],
    height: usize,
    row_size: usize,
    filter_width: usize,
    codec: &dyn Codec,
) -> anyhow::Result<Vec<u8>> {
    let raw = codec
        .decompress(compressed)
        .context("Failed to decompress IDAT")?;
    reconstruct_scanlines(&raw, height, row_size, filter_width)
}

/// Serializes pixel rows with filter type 0 on every row and compresses
/// the result at maximum level. No adaptive filter selection.
pub(crate) fn compress_data(
    pixels: &[u8],
    height: usize,
    row_size: usize,
    codec: &dyn Codec,
) -> Vec<u8> {
    let mut serialized = Vec::with_capacity(height * (1 + row_size));
    for y in 0..height {
        serialized.push(0);
        serialized.extend_from_slice(&pixels[y * row_size..(y + 1) * row_size]);
    }
    codec.compress(&serialized)
}
