//! # Batch Codec
//!
//! Packed sub-operation lists consumed by `multiSend(bytes)`.
//!
//! ```text
//! {operation: 1}{to: 20}{value: 32}{data length: 32}{data: length} ...
//! ```
//!
//! No padding between records. Decoding is lazy so the executor fails at the
//! first bad record without looking further.

use crate::domain::entities::{ExecutionMode, SubOperation};
use crate::domain::value_objects::{u256_to_word, Address, Bytes, U256};
use crate::errors::{ValidationError, WalletError};

const HEADER_LEN: usize = 1 + 20 + 32 + 32;

/// Packs `items` back to back.
#[must_use]
pub fn encode_batch(items: &[SubOperation]) -> Bytes {
    let capacity = items.iter().map(|item| HEADER_LEN + item.data.len()).sum();
    let mut out = Vec::with_capacity(capacity);
    for item in items {
        out.push(item.operation.as_u8());
        out.extend_from_slice(item.destination.as_bytes());
        out.extend_from_slice(&u256_to_word(item.value));
        out.extend_from_slice(&u256_to_word(U256::from(item.data.len())));
        out.extend_from_slice(item.data.as_slice());
    }
    Bytes::from_vec(out)
}

/// Iterator over the records of a packed batch.
#[derive(Debug, Clone)]
pub struct BatchReader<'a> {
    data: &'a [u8],
    cursor: usize,
    failed: bool,
}

impl<'a> BatchReader<'a> {
    /// Reader positioned at the first record.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: 0,
            failed: false,
        }
    }

    fn read_record(&mut self) -> Result<SubOperation, WalletError> {
        let rest = &self.data[self.cursor..];
        if rest.len() < HEADER_LEN {
            return Err(ValidationError::MalformedBatch("truncated record header").into());
        }

        let operation = ExecutionMode::try_from(rest[0])?;
        let destination = Address::from_slice(&rest[1..21])
            .ok_or(ValidationError::MalformedBatch("bad destination"))?;
        let value = U256::from_big_endian(&rest[21..53]);
        let length = U256::from_big_endian(&rest[53..85]);

        let available = rest.len() - HEADER_LEN;
        if length > U256::from(available) {
            return Err(ValidationError::MalformedBatch("data length exceeds batch").into());
        }
        let length = length.as_usize();
        let data = Bytes::from_slice(&rest[HEADER_LEN..HEADER_LEN + length]);

        self.cursor += HEADER_LEN + length;
        Ok(SubOperation {
            operation,
            destination,
            value,
            data,
        })
    }
}

impl Iterator for BatchReader<'_> {
    type Item = Result<SubOperation, WalletError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.data.len() {
            return None;
        }
        let record = self.read_record();
        self.failed = record.is_err();
        Some(record)
    }
}

/// Decodes a whole batch eagerly.
///
/// # Errors
/// The first malformed record.
pub fn decode_batch(data: &[u8]) -> Result<Vec<SubOperation>, WalletError> {
    BatchReader::new(data).collect()
}
