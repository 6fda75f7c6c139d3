use anyhow::bail;
use nom::IResult;

use super::{encode_chunk, ParseableChunk};

#[allow(non_camel_case_types)]
#[derive(Debug)]
pub struct PLTEChunk<'a> {
    colors: &'a [u8],
}

impl PLTEChunk<'_> {
    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.colors.len() % 3 != 0 {
            bail!("PLTE chunk length is not a multiple of 3");
        }
        Ok(())
    }

    pub(crate) fn get_color(&self, index: u8) -> Option<(u8, u8, u8)> {
        let start = index as usize * 3;
        let entry = self.colors.get(start..start + 3)?;
        Some((entry[0], entry[1], entry[2]))
    }
}

impl<'a> ParseableChunk<'a> for PLTEChunk<'a> {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"PLTE";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        Ok((&chunk_data[0..0], PLTEChunk { colors: chunk_data }))
    }

    fn to_bytes(&self) -> Self::Output {
        encode_chunk(Self::HEADER, self.colors)
    }
}
