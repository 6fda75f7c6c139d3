use nom::IResult;

use super::{encode_chunk, ParseableChunk};

#[derive(Debug)]
pub(crate) struct IDATChunk<'a> {
    pub(crate) data: &'a [u8],
}

impl<'a> ParseableChunk<'a> for IDATChunk<'a> {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"IDAT";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&[u8], Self> {
        Ok((&chunk_data[0..0], IDATChunk { data: chunk_data }))
    }

    fn to_bytes(&self) -> Self::Output {
        encode_chunk(Self::HEADER, self.data)
    }
}
