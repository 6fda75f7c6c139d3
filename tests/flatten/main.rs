use std::fs;
use std::path::PathBuf;

use miniz_oxide::deflate::compress_to_vec_zlib;
use miniz_oxide::inflate::decompress_to_vec_zlib;
use png_flatten::{flatten_file, flatten_to_white};

const SIGNATURE: [u8; 8] = *b"\x89PNG\x0d\x0a\x1a\x0a";

// Input CRCs are zeroed on purpose: the decoder never checks them.
fn chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut bytes = (data.len() as u32).to_be_bytes().to_vec();
    bytes.extend(chunk_type);
    bytes.extend(data);
    bytes.extend([0; 4]);
    bytes
}

fn ihdr(width: u32, height: u32, bit_depth: u8, color_type: u8, interlace: u8) -> Vec<u8> {
    let mut data = width.to_be_bytes().to_vec();
    data.extend(height.to_be_bytes());
    data.extend([bit_depth, color_type, 0, 0, interlace]);
    chunk(b"IHDR", &data)
}

fn idat(scanlines: &[(u8, &[u8])]) -> Vec<u8> {
    let mut raw = Vec::new();
    for (filter_type, line) in scanlines {
        raw.push(*filter_type);
        raw.extend_from_slice(line);
    }
    chunk(b"IDAT", &compress_to_vec_zlib(&raw, 6))
}

fn png(parts: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = SIGNATURE.to_vec();
    for part in parts {
        bytes.extend_from_slice(part);
    }
    bytes.extend(chunk(b"IEND", &[]));
    bytes
}

fn read_chunks(output: &[u8]) -> Vec<([u8; 4], Vec<u8>)> {
    assert_eq!(&output[..8], &SIGNATURE);
    let mut rest = &output[8..];
    let mut chunks = Vec::new();
    while !rest.is_empty() {
        let length = u32::from_be_bytes(rest[..4].try_into().unwrap()) as usize;
        let chunk_type: [u8; 4] = rest[4..8].try_into().unwrap();
        chunks.push((chunk_type, rest[8..8 + length].to_vec()));
        rest = &rest[12 + length..];
        if &chunk_type == b"IEND" {
            break;
        }
    }
    chunks
}

// Decodes the always-filter-zero output back into bare RGB rows.
fn flattened_pixels(output: &[u8]) -> Vec<u8> {
    let chunks = read_chunks(output);
    assert_eq!(&chunks[0].0, b"IHDR");
    let width = u32::from_be_bytes(chunks[0].1[..4].try_into().unwrap()) as usize;
    let compressed: Vec<u8> = chunks
        .iter()
        .filter(|(chunk_type, _)| chunk_type == b"IDAT")
        .flat_map(|(_, data)| data.clone())
        .collect();
    let raw = decompress_to_vec_zlib(&compressed).unwrap();
    let mut pixels = Vec::new();
    for line in raw.chunks(1 + width * 3) {
        assert_eq!(line[0], 0, "output rows must use filter type 0");
        pixels.extend_from_slice(&line[1..]);
    }
    pixels
}

#[test]
fn half_transparent_rgba_composites_to_the_golden_values() {
    let source = png(&[ihdr(1, 1, 8, 6, 0), idat(&[(0, &[200, 100, 50, 128])])]);
    let output = flatten_to_white(&source).unwrap();

    let header = &read_chunks(&output)[0].1;
    assert_eq!(header[..8], [0, 0, 0, 1, 0, 0, 0, 1]);
    assert_eq!(header[8..13], [8, 2, 0, 0, 0]);
    assert_eq!(flattened_pixels(&output), [227, 177, 152]);
}

#[test]
fn opaque_truecolor_pixels_round_trip_byte_identical() {
    let rows: [&[u8]; 2] = [&[1, 2, 3, 4, 5, 6], &[7, 8, 9, 10, 11, 12]];
    let source = png(&[ihdr(2, 2, 8, 2, 0), idat(&[(0, rows[0]), (0, rows[1])])]);
    let output = flatten_to_white(&source).unwrap();
    assert_eq!(
        flattened_pixels(&output),
        [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
    );
}

#[test]
fn all_four_filter_types_reconstruct_before_expansion() {
    // One RGBA pixel per row; each filtered line was derived by hand from
    // the pixels (10,20,30), (11,22,33), (12,24,36), (13,26,39), all opaque.
    let source = png(&[
        ihdr(1, 4, 8, 6, 0),
        idat(&[
            (1, &[10, 20, 30, 255]),
            (2, &[1, 2, 3, 0]),
            (3, &[7, 13, 20, 128]),
            (4, &[1, 2, 3, 0]),
        ]),
    ]);
    let output = flatten_to_white(&source).unwrap();
    assert_eq!(
        flattened_pixels(&output),
        [10, 20, 30, 11, 22, 33, 12, 24, 36, 13, 26, 39]
    );
}

#[test]
fn idat_payloads_are_concatenated_before_decompression() {
    let full = idat(&[(0, &[1, 2, 3])]);
    let payload = &full[8..full.len() - 4];
    let (first, second) = payload.split_at(2);
    let source = png(&[ihdr(1, 1, 8, 2, 0), chunk(b"IDAT", first), chunk(b"IDAT", second)]);
    assert_eq!(flattened_pixels(&flatten_to_white(&source).unwrap()), [1, 2, 3]);
}

#[test]
fn indexed_entries_past_the_transparency_table_stay_opaque() {
    let source = png(&[
        ihdr(2, 1, 8, 3, 0),
        chunk(b"PLTE", &[10, 20, 30, 40, 50, 60]),
        chunk(b"tRNS", &[0]),
        idat(&[(0, &[0, 1])]),
    ]);
    let output = flatten_to_white(&source).unwrap();
    assert_eq!(flattened_pixels(&output), [255, 255, 255, 40, 50, 60]);
}

#[test]
fn indexed_pixels_past_the_palette_become_opaque_black() {
    let source = png(&[
        ihdr(2, 1, 8, 3, 0),
        chunk(b"PLTE", &[10, 20, 30]),
        idat(&[(0, &[5, 0])]),
    ]);
    let output = flatten_to_white(&source).unwrap();
    assert_eq!(flattened_pixels(&output), [0, 0, 0, 10, 20, 30]);
}

#[test]
fn only_whitelisted_ancillary_chunks_survive_in_order() {
    let source = png(&[
        ihdr(1, 1, 8, 2, 0),
        chunk(b"pHYs", &[0; 9]),
        chunk(b"sRGB", &[0]),
        chunk(b"tEXt", b"Comment\0dropped"),
        chunk(b"gAMA", &[0, 1, 134, 160]),
        idat(&[(0, &[9, 9, 9])]),
    ]);
    let output = flatten_to_white(&source).unwrap();
    let types: Vec<[u8; 4]> = read_chunks(&output)
        .iter()
        .map(|(chunk_type, _)| *chunk_type)
        .collect();
    assert_eq!(types, [*b"IHDR", *b"sRGB", *b"gAMA", *b"IDAT", *b"IEND"]);
}

#[test]
fn output_chunks_carry_real_checksums() {
    let source = png(&[ihdr(1, 1, 8, 2, 0), idat(&[(0, &[1, 2, 3])])]);
    let output = flatten_to_white(&source).unwrap();
    // The canonical IEND frame, CRC included.
    assert_eq!(
        output[output.len() - 12..],
        [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xae, 0x42, 0x60, 0x82]
    );
}

#[test]
fn bytes_after_iend_are_ignored() {
    let mut source = png(&[ihdr(1, 1, 8, 2, 0), idat(&[(0, &[1, 2, 3])])]);
    source.extend(b"trailing garbage");
    assert!(flatten_to_white(&source).is_ok());
}

#[test]
fn malformed_and_unsupported_inputs_are_rejected() {
    // Chunk length pointing past the end of the stream.
    let mut truncated = SIGNATURE.to_vec();
    truncated.extend(ihdr(1, 1, 8, 2, 0));
    truncated.extend(9000u32.to_be_bytes());
    truncated.extend(b"IDAT");
    truncated.extend([0; 8]);
    assert!(flatten_to_white(&truncated).is_err());

    let sixteen_bit = png(&[ihdr(1, 1, 16, 2, 0), idat(&[(0, &[0; 6])])]);
    assert!(flatten_to_white(&sixteen_bit).is_err());

    let interlaced = png(&[ihdr(1, 1, 8, 2, 1), idat(&[(0, &[0; 3])])]);
    assert!(flatten_to_white(&interlaced).is_err());

    let greyscale = png(&[ihdr(1, 1, 8, 0, 0), idat(&[(0, &[0])])]);
    assert!(flatten_to_white(&greyscale).is_err());

    let no_idat = png(&[ihdr(1, 1, 8, 2, 0)]);
    assert!(flatten_to_white(&no_idat).is_err());

    let indexed_without_palette = png(&[ihdr(1, 1, 8, 3, 0), idat(&[(0, &[0])])]);
    assert!(flatten_to_white(&indexed_without_palette).is_err());

    let ragged_palette = png(&[
        ihdr(1, 1, 8, 3, 0),
        chunk(b"PLTE", &[10, 20, 30, 40]),
        idat(&[(0, &[0])]),
    ]);
    assert!(flatten_to_white(&ragged_palette).is_err());

    let undersized_idat = png(&[
        ihdr(2, 2, 8, 2, 0),
        chunk(b"IDAT", &compress_to_vec_zlib(&[0, 1, 2, 3], 6)),
    ]);
    assert!(flatten_to_white(&undersized_idat).is_err());
}

fn scratch_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("png-flatten-{test_name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn flatten_file_appends_the_default_suffix() {
    let dir = scratch_dir("suffix");
    let input = dir.join("in.png");
    fs::write(&input, png(&[ihdr(1, 1, 8, 2, 0), idat(&[(0, &[1, 2, 3])])])).unwrap();

    let written = flatten_file(&input, None, false).unwrap();
    assert_eq!(written, dir.join("in.png.flattened.png"));
    assert_eq!(flattened_pixels(&fs::read(&written).unwrap()), [1, 2, 3]);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn flatten_file_in_place_overwrites_the_input() {
    let dir = scratch_dir("in-place");
    let input = dir.join("in.png");
    let source = png(&[ihdr(1, 1, 8, 6, 0), idat(&[(0, &[200, 100, 50, 128])])]);
    fs::write(&input, &source).unwrap();

    let written = flatten_file(&input, None, true).unwrap();
    assert_eq!(written, input);
    let rewritten = fs::read(&input).unwrap();
    assert_ne!(rewritten, source);
    assert_eq!(flattened_pixels(&rewritten), [227, 177, 152]);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn flatten_file_prefers_an_explicit_output_path() {
    let dir = scratch_dir("explicit");
    let input = dir.join("in.png");
    let explicit = dir.join("elsewhere.png");
    fs::write(&input, png(&[ihdr(1, 1, 8, 2, 0), idat(&[(0, &[1, 2, 3])])])).unwrap();

    let written = flatten_file(&input, Some(&explicit), true).unwrap();
    assert_eq!(written, explicit);
    assert!(explicit.is_file());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn errors_leave_no_output_file_behind() {
    let dir = scratch_dir("no-partial-output");
    let input = dir.join("broken.png");
    fs::write(&input, SIGNATURE.to_vec()).unwrap();

    assert!(flatten_file(&input, None, false).is_err());
    assert!(!dir.join("broken.png.flattened.png").exists());
    let _ = fs::remove_dir_all(&dir);
}
