use super::EncodingError;
use crate::error::Result;
use byteorder::{BigEndian, ByteOrder};
use std::ops::Bound;

// Byte strings are escaped so that every component is prefix-free and
// compares exactly like the raw bytes:
//   0x00 -> 0x00 0xFF, terminated by 0x00 0x00
const ESCAPE: u8 = 0x00;
const ESCAPED_NULL: u8 = 0xFF;
const TERMINATOR: u8 = 0x00;

const TIMESTAMP_LEN: usize = 8;

/// Appends the order-preserving encoding of `bytes` to `buf`.
pub fn encode_bytes_into(buf: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if byte == ESCAPE {
            buf.extend_from_slice(&[ESCAPE, ESCAPED_NULL]);
        } else {
            buf.push(byte);
        }
    }
    buf.extend_from_slice(&[ESCAPE, TERMINATOR]);
}

/// Encode raw bytes with order preservation
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(bytes.len() + 2);
    encode_bytes_into(&mut buf, bytes);
    buf
}

/// Decodes one escaped byte string from the front of `input`, returning it
/// along with the remaining input.
pub fn take_bytes(input: &[u8]) -> Result<(Vec<u8>, &[u8])> {
    let mut result = Vec::new();
    let mut i = 0;

    while i < input.len() {
        if input[i] != ESCAPE {
            result.push(input[i]);
            i += 1;
            continue;
        }
        match input.get(i + 1) {
            Some(&ESCAPED_NULL) => {
                result.push(0x00);
                i += 2;
            }
            Some(&TERMINATOR) => return Ok((result, &input[i + 2..])),
            Some(_) => {
                return Err(
                    EncodingError::InvalidFormat("invalid null byte escape".to_string()).into(),
                );
            }
            None => return Err(EncodingError::TruncatedData.into()),
        }
    }

    Err(EncodingError::TruncatedData.into())
}

/// Timestamps are stored inverted so that newer versions sort first.
pub fn encode_timestamp_into(buf: &mut Vec<u8>, timestamp: u64) {
    let mut raw = [0u8; TIMESTAMP_LEN];
    BigEndian::write_u64(&mut raw, u64::MAX - timestamp);
    buf.extend_from_slice(&raw);
}

pub fn take_timestamp(input: &[u8]) -> Result<(u64, &[u8])> {
    if input.len() < TIMESTAMP_LEN {
        return Err(EncodingError::TruncatedData.into());
    }
    let inverted = BigEndian::read_u64(&input[..TIMESTAMP_LEN]);
    Ok((u64::MAX - inverted, &input[TIMESTAMP_LEN..]))
}

/// Returns the exclusive upper bound of all keys starting with `prefix`.
pub fn prefix_end(prefix: &[u8]) -> Bound<Vec<u8>> {
    match prefix.iter().rposition(|b| *b != 0xff) {
        Some(i) => Bound::Excluded(
            prefix[..i]
                .iter()
                .chain(std::iter::once(&(prefix[i] + 1)))
                .copied()
                .collect::<Vec<u8>>(),
        ),
        None => Bound::Unbounded,
    }
}

/// Coordinates of a single cell version, as stored in a region's map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellKey {
    pub row: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub timestamp: u64,
}

impl CellKey {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Self::column_prefix(&self.row, &self.family, &self.qualifier);
        encode_timestamp_into(&mut buf, self.timestamp);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (row, rest) = take_bytes(bytes)?;
        let (family, rest) = take_bytes(rest)?;
        let (qualifier, rest) = take_bytes(rest)?;
        let (timestamp, rest) = take_timestamp(rest)?;
        if !rest.is_empty() {
            return Err(EncodingError::InvalidFormat(format!(
                "{} trailing bytes after cell key",
                rest.len()
            ))
            .into());
        }
        Ok(Self {
            row,
            family,
            qualifier,
            timestamp,
        })
    }

    /// Prefix shared by every cell of `row`.
    pub fn row_prefix(row: &[u8]) -> Vec<u8> {
        encode_bytes(row)
    }

    /// Prefix shared by every cell of `family` within `row`.
    pub fn family_prefix(row: &[u8], family: &[u8]) -> Vec<u8> {
        let mut buf = encode_bytes(row);
        encode_bytes_into(&mut buf, family);
        buf
    }

    /// Prefix shared by every version of one column.
    pub fn column_prefix(row: &[u8], family: &[u8], qualifier: &[u8]) -> Vec<u8> {
        let mut buf = Self::family_prefix(row, family);
        encode_bytes_into(&mut buf, qualifier);
        buf
    }
}
