use nom::IResult;

use super::{encode_chunk, ParseableChunk};

#[allow(non_camel_case_types)]
#[derive(Debug)]
pub struct tRNSChunk<'a> {
    inner: &'a [u8],
}

impl tRNSChunk<'_> {
    // Entries past the end of the table are fully opaque.
    pub(crate) fn as_palette(&self, index: u8) -> u8 {
        *self.inner.get(index as usize).unwrap_or(&u8::MAX)
    }
}

impl<'a> ParseableChunk<'a> for tRNSChunk<'a> {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"tRNS";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        Ok((&chunk_data[0..0], tRNSChunk { inner: chunk_data }))
    }

    fn to_bytes(&self) -> Self::Output {
        encode_chunk(Self::HEADER, self.inner)
    }
}
