use anyhow::{anyhow, bail};

pub(crate) enum Filter {
    None,
    Sub,
    Up,
    Average,
    Paeth,
}

impl Filter {
    #[allow(unused)]
    pub(crate) fn filter(&self, x: u8, a: u8, b: u8, c: u8) -> u8 {
        match self {
            Filter::None => x,
            Filter::Sub => x.wrapping_sub(a),
            Filter::Up => x.wrapping_sub(b),
            Filter::Average => x.wrapping_sub(average(a, b)),
            Filter::Paeth => x.wrapping_sub(paeth_predictor(a, b, c)),
        }
    }

    pub(crate) fn reconstruct(&self, x: u8, a: u8, b: u8, c: u8) -> u8 {
        match self {
            Filter::None => x,
            Filter::Sub => x.wrapping_add(a),
            Filter::Up => x.wrapping_add(b),
            Filter::Average => x.wrapping_add(average(a, b)),
            Filter::Paeth => x.wrapping_add(paeth_predictor(a, b, c)),
        }
    }
}

impl TryFrom<u8> for Filter {
    type Error = anyhow::Error;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Sub),
            2 => Ok(Self::Up),
            3 => Ok(Self::Average),
            4 => Ok(Self::Paeth),
            i => Err(anyhow!("Unsupported PNG filter type: {i}")),
        }
    }
}

fn average(a: u8, b: u8) -> u8 {
    ((a as u16 + b as u16) / 2) as u8
}

fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Reverses the per-row filtering of a decompressed pixel stream. `raw` is
/// `height` rows of a filter-type tag followed by `row_size` bytes; the
/// result holds the reconstructed rows back to back.
pub(crate) fn reconstruct_scanlines(
    raw: &[u8],
    height: usize,
    row_size: usize,
    filter_width: usize,
) -> anyhow::Result<Vec<u8>> {
    let expected = height * (1 + row_size);
    if raw.len() < expected {
        bail!(
            "Decompressed IDAT size unexpected: got {}, expected {}",
            raw.len(),
            expected
        );
    }
    // Some encoders flush extra bytes after the final row; anything past the
    // expected size is dropped.
    let raw = &raw[..expected];

    let mut recon = vec![0; height * row_size];
    let zero_row = vec![0; row_size];
    for y in 0..height {
        let line_start = y * (1 + row_size);
        let filter = Filter::try_from(raw[line_start])?;
        let filtered = &raw[line_start + 1..line_start + 1 + row_size];

        // Rows before y are final; the predictor only ever reads finished
        // bytes.
        let (done, rest) = recon.split_at_mut(y * row_size);
        let prev_row: &[u8] = if y == 0 {
            &zero_row
        } else {
            &done[(y - 1) * row_size..]
        };
        let current = &mut rest[..row_size];
        for i in 0..row_size {
            let a = if i >= filter_width {
                current[i - filter_width]
            } else {
                0
            };
            let b = prev_row[i];
            let c = if i >= filter_width {
                prev_row[i - filter_width]
            } else {
                0
            };
            current[i] = filter.reconstruct(filtered[i], a, b, c);
        }
    }
    Ok(recon)
}
