use nom::IResult;

use super::{encode_chunk, ParseableChunk};

pub(crate) struct IENDChunk;

impl<'a> ParseableChunk<'a> for IENDChunk {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"IEND";

    fn from_bytes(chunk_data: &[u8]) -> IResult<&[u8], Self> {
        Ok((chunk_data, Self))
    }

    fn to_bytes(&self) -> Self::Output {
        encode_chunk(Self::HEADER, &[])
    }
}
