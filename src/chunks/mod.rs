use nom::{
    bytes::complete::take,
    combinator::map,
    number::complete::be_u32,
    IResult,
};

pub(crate) mod crc;
pub(crate) mod idat;
pub(crate) mod iend;
pub(crate) mod ihdr;
pub(crate) mod plte;
pub(crate) mod trns;

#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug)]
pub(crate) enum Chunk<'a> {
    IHDR(ihdr::IHDRChunk),
    PLTE(plte::PLTEChunk<'a>),
    tRNS(trns::tRNSChunk<'a>),
    IDAT(idat::IDATChunk<'a>),
    IEND,
    Other(RawChunk<'a>),
}

pub(crate) fn iter_chunks(source: &[u8]) -> ChunkIter {
    ChunkIter {
        source,
        finished: false,
    }
}

pub(crate) struct ChunkIter<'a> {
    source: &'a [u8],
    finished: bool,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = anyhow::Result<Chunk<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        // A clean end of input where the next chunk would begin is the end
        // of iteration; anything shorter than a whole chunk is an error.
        if self.finished || self.source.is_empty() {
            return None;
        }
        match parse_chunk(self.source) {
            Ok((rest, chunk)) => {
                self.source = rest;
                if matches!(chunk, Chunk::IEND) {
                    self.finished = true;
                }
                Some(Ok(chunk))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e.to_owned().into()))
            }
        }
    }
}

fn parse_chunk(input: &[u8]) -> IResult<&[u8], Chunk<'_>> {
    let (rest, (chunk_type, chunk_data)) = chunk_frame(input)?;
    match chunk_type {
        ihdr::IHDRChunk::HEADER => Ok((
            rest,
            Chunk::IHDR(ihdr::IHDRChunk::from_bytes(chunk_data)?.1),
        )),
        plte::PLTEChunk::HEADER => Ok((
            rest,
            Chunk::PLTE(plte::PLTEChunk::from_bytes(chunk_data)?.1),
        )),
        trns::tRNSChunk::HEADER => Ok((
            rest,
            Chunk::tRNS(trns::tRNSChunk::from_bytes(chunk_data)?.1),
        )),
        idat::IDATChunk::HEADER => Ok((
            rest,
            Chunk::IDAT(idat::IDATChunk::from_bytes(chunk_data)?.1),
        )),
        iend::IENDChunk::HEADER => Ok((rest, Chunk::IEND)),
        _ => Ok((
            rest,
            Chunk::Other(RawChunk {
                chunk_type,
                data: chunk_data,
            }),
        )),
    }
}

#[derive(Debug)]
pub(crate) struct RawChunk<'a> {
    chunk_type: &'a [u8; 4],
    data: &'a [u8],
}

impl<'a> RawChunk<'a> {
    pub(crate) fn chunk_type(&self) -> &'a [u8; 4] {
        self.chunk_type
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        encode_chunk(self.chunk_type, self.data)
    }
}

// Reads one chunk frame: length, type, payload, CRC. The CRC trailer is
// consumed but never compared; checksums are only computed on write.
fn chunk_frame<'a, Error: nom::error::ParseError<&'a [u8]>>(
    input: &'a [u8],
) -> IResult<&'a [u8], (&'a [u8; 4], &'a [u8]), Error> {
    let (input, length) = be_u32(input)?;
    let (input, chunk_type) = map(take(4usize), |v: &[u8]| {
        v.try_into().expect("4 bytes should have been taken")
    })(input)?;
    let (input, chunk_data) = take(length)(input)?;
    let (input, _crc) = take(4usize)(input)?;
    Ok((input, (chunk_type, chunk_data)))
}

pub(crate) fn encode_chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut bytes = (data.len() as u32).to_be_bytes().to_vec();
    bytes.extend(chunk_type);
    bytes.extend(data);
    let crc = crc::calculate_crc(bytes[4..].iter().copied()).to_be_bytes();
    bytes.extend(crc);
    bytes
}

pub(crate) trait ParseableChunk<'a>: Sized {
    type Output: AsRef<[u8]>;
    const HEADER: &'static [u8; 4];

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self>;
    fn to_bytes(&self) -> Self::Output;
}
