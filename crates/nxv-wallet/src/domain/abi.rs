//! # ABI Codec
//!
//! The subset of the Solidity contract ABI the wallet speaks: 4-byte
//! selectors, 32-byte static words, and dynamic `bytes` / `address[]` values
//! addressed by head offsets.

use crate::domain::services::keccak256;
use crate::domain::value_objects::{u256_to_word, Address, Bytes, Hash, U256};
use crate::errors::ValidationError;
use std::collections::HashMap;
use std::fmt;

/// Size of one ABI word.
pub const WORD: usize = 32;

/// First four bytes of `keccak256(signature)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    /// First four bytes of `input`, zero-padded when it is shorter.
    #[must_use]
    pub fn leading(input: &[u8]) -> Self {
        let mut sel = [0u8; 4];
        let n = input.len().min(4);
        sel[..n].copy_from_slice(&input[..n]);
        Self(sel)
    }

    /// Returns the selector as a right-padded ABI word (the shape of `bytes4` return values).
    #[must_use]
    pub fn to_word(self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[..4].copy_from_slice(&self.0);
        word
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Computes the selector of a canonical function signature.
#[must_use]
pub fn selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.0[..4]);
    Selector(out)
}

/// A set of functions a contract dispatches on.
pub trait AbiFunction: Copy + PartialEq + Send + Sync + Sized + 'static {
    /// Every function of the contract.
    const ALL: &'static [Self];

    /// Canonical signature, e.g. `"getOwners()"`.
    fn signature(self) -> &'static str;

    /// Selectors of `ALL`, hashed once per process (`selector_table!`).
    fn selectors() -> &'static SelectorTable<Self>;

    /// Selector of this function.
    fn selector(self) -> Selector {
        Self::selectors()
            .selector_of(self)
            .unwrap_or_else(|| selector(self.signature()))
    }

    /// Finds the function whose selector matches.
    fn from_selector(sel: Selector) -> Option<Self> {
        Self::selectors().get(sel)
    }

    /// Encodes a call to this function.
    fn encode(self, tokens: &[Token]) -> Bytes {
        encode_call(self.selector(), tokens)
    }
}

/// Selector lookup for one [`AbiFunction`] set.
#[derive(Debug)]
pub struct SelectorTable<F> {
    by_function: Vec<(F, Selector)>,
    by_selector: HashMap<Selector, F>,
}

impl<F: AbiFunction> SelectorTable<F> {
    /// Hashes every signature in `F::ALL`.
    #[must_use]
    pub fn build() -> Self {
        let by_function: Vec<_> = F::ALL.iter().map(|f| (*f, selector(f.signature()))).collect();
        let by_selector = by_function.iter().map(|(f, sel)| (*sel, *f)).collect();
        Self {
            by_function,
            by_selector,
        }
    }

    /// Function with this selector.
    #[must_use]
    pub fn get(&self, sel: Selector) -> Option<F> {
        self.by_selector.get(&sel).copied()
    }

    /// Selector of `function`, if it is listed in `F::ALL`.
    #[must_use]
    pub fn selector_of(&self, function: F) -> Option<Selector> {
        self.by_function
            .iter()
            .find(|(f, _)| *f == function)
            .map(|(_, sel)| *sel)
    }

    /// Number of distinct selectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_selector.len()
    }

    /// True for an empty function set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_selector.is_empty()
    }
}

/// Body of [`AbiFunction::selectors`]: a `OnceLock` holding the table of `$function`.
macro_rules! selector_table {
    ($function:ty) => {{
        static TABLE: ::std::sync::OnceLock<$crate::domain::abi::SelectorTable<$function>> =
            ::std::sync::OnceLock::new();
        TABLE.get_or_init($crate::domain::abi::SelectorTable::build)
    }};
}
pub(crate) use selector_table;

/// One ABI value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `address`
    Address(Address),
    /// `uint256` (also used for `uint8`)
    Uint(U256),
    /// `bool`
    Bool(bool),
    /// `bytes32`
    FixedBytes(Hash),
    /// `bytes`
    Bytes(Vec<u8>),
    /// `address[]`
    AddressArray(Vec<Address>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bytes(_) | Self::AddressArray(_))
    }

    fn head_word(&self) -> [u8; 32] {
        match self {
            Self::Address(address) => address.to_word(),
            Self::Uint(value) => u256_to_word(*value),
            Self::Bool(flag) => u256_to_word(U256::from(u8::from(*flag))),
            Self::FixedBytes(hash) => hash.0,
            Self::Bytes(_) | Self::AddressArray(_) => [0u8; 32],
        }
    }

    fn tail(&self) -> Vec<u8> {
        match self {
            Self::Bytes(data) => {
                let mut out = u256_to_word(U256::from(data.len())).to_vec();
                out.extend_from_slice(data);
                out.resize(WORD + padded_len(data.len()), 0);
                out
            }
            Self::AddressArray(items) => {
                let mut out = u256_to_word(U256::from(items.len())).to_vec();
                for item in items {
                    out.extend_from_slice(&item.to_word());
                }
                out
            }
            _ => Vec::new(),
        }
    }
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

/// ABI-encodes a tuple of tokens (no selector).
#[must_use]
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&u256_to_word(U256::from(head_len + tail.len())));
            tail.extend_from_slice(&token.tail());
        } else {
            head.extend_from_slice(&token.head_word());
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Selector followed by the encoded arguments.
#[must_use]
pub fn encode_call(sel: Selector, tokens: &[Token]) -> Bytes {
    let mut out = sel.0.to_vec();
    out.extend_from_slice(&encode(tokens));
    Bytes(out)
}

/// Splits calldata into selector and argument bytes.
///
/// # Errors
/// `MalformedCalldata` when fewer than four bytes are present.
pub fn split_selector(input: &[u8]) -> Result<(Selector, &[u8]), ValidationError> {
    if input.len() < 4 {
        return Err(ValidationError::MalformedCalldata("missing selector"));
    }
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&input[..4]);
    Ok((Selector(sel), &input[4..]))
}

// =============================================================================
// DECODER
// =============================================================================

/// Sequential reader over ABI-encoded arguments.
#[derive(Debug)]
pub struct AbiDecoder<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> AbiDecoder<'a> {
    /// Starts reading at the first head word of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    fn word_at(&self, offset: usize) -> Result<[u8; 32], ValidationError> {
        let end = offset
            .checked_add(WORD)
            .ok_or(ValidationError::MalformedCalldata("offset overflow"))?;
        let slice = self
            .data
            .get(offset..end)
            .ok_or(ValidationError::MalformedCalldata("word out of bounds"))?;
        let mut word = [0u8; 32];
        word.copy_from_slice(slice);
        Ok(word)
    }

    fn usize_at(&self, offset: usize) -> Result<usize, ValidationError> {
        let value = U256::from_big_endian(&self.word_at(offset)?);
        if value > U256::from(self.data.len()) {
            return Err(ValidationError::MalformedCalldata("length exceeds calldata"));
        }
        Ok(value.as_usize())
    }

    /// Next raw head word.
    ///
    /// # Errors
    /// `MalformedCalldata` when the data ends early.
    pub fn word(&mut self) -> Result<[u8; 32], ValidationError> {
        let word = self.word_at(self.cursor)?;
        self.cursor += WORD;
        Ok(word)
    }

    /// Next `address`; dirty upper bytes are rejected.
    ///
    /// # Errors
    /// `MalformedCalldata` on truncation or dirty padding.
    pub fn address(&mut self) -> Result<Address, ValidationError> {
        Address::from_word(&self.word()?).ok_or(ValidationError::MalformedCalldata("dirty address"))
    }

    /// Next `uint256`.
    ///
    /// # Errors
    /// `MalformedCalldata` on truncation.
    pub fn uint(&mut self) -> Result<U256, ValidationError> {
        Ok(U256::from_big_endian(&self.word()?))
    }

    /// Next `uint8`.
    ///
    /// # Errors
    /// `MalformedCalldata` on truncation or a value above 255.
    pub fn uint8(&mut self) -> Result<u8, ValidationError> {
        let value = self.uint()?;
        if value > U256::from(u8::MAX) {
            return Err(ValidationError::MalformedCalldata("uint8 out of range"));
        }
        Ok(value.byte(0))
    }

    /// Next `bool`.
    ///
    /// # Errors
    /// `MalformedCalldata` on truncation or a value other than 0/1.
    pub fn bool(&mut self) -> Result<bool, ValidationError> {
        match self.uint8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ValidationError::MalformedCalldata("bool out of range")),
        }
    }

    /// Next `bytes32`.
    ///
    /// # Errors
    /// `MalformedCalldata` on truncation.
    pub fn fixed_bytes(&mut self) -> Result<Hash, ValidationError> {
        Ok(Hash(self.word()?))
    }

    /// Next dynamic `bytes`, following its head offset.
    ///
    /// # Errors
    /// `MalformedCalldata` if the offset or length points outside the data.
    pub fn bytes(&mut self) -> Result<Vec<u8>, ValidationError> {
        let offset = self.usize_at(self.cursor)?;
        self.cursor += WORD;
        let len = self.usize_at(offset)?;
        let start = offset + WORD;
        self.data
            .get(start..start + len)
            .map(<[u8]>::to_vec)
            .ok_or(ValidationError::MalformedCalldata("bytes out of bounds"))
    }

    /// Next dynamic `address[]`.
    ///
    /// # Errors
    /// `MalformedCalldata` if the array is truncated or an element is dirty.
    pub fn address_array(&mut self) -> Result<Vec<Address>, ValidationError> {
        let offset = self.usize_at(self.cursor)?;
        self.cursor += WORD;
        let len = self.usize_at(offset)?;
        (0..len)
            .map(|i| {
                Address::from_word(&self.word_at(offset + WORD * (i + 1))?)
                    .ok_or(ValidationError::MalformedCalldata("dirty address"))
            })
            .collect()
    }
}
