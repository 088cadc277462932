//! Minimal Solidity ABI support for the contract's fixed call surface.
//!
//! Only the types the contract exposes are handled: `address`, `uint256`,
//! `bool`, and the dynamic `(bytes32,uint256)[]` return of
//! `getUserTransactions`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

pub const WORD_LEN: usize = 32;

pub type Word = [u8; WORD_LEN];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("'{0}' is not a valid EVM address")]
    InvalidAddress(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("return data truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unexpected return value: {0}")]
    UnexpectedValue(String),
}

/// 20-byte EVM account identifier.
///
/// Parsing is case-insensitive and the canonical rendering is lowercase, so
/// two addresses compare equal regardless of checksum casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn parse(raw: &str) -> Result<Self, AbiError> {
        let trimmed = raw.trim();
        let invalid = || AbiError::InvalidAddress(trimmed.to_string());
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(invalid)?;
        if hex.len() != 40 {
            return Err(invalid());
        }
        let bytes = decode_hex(hex).map_err(|_| invalid())?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Left-padded ABI encoding.
    pub fn to_word(&self) -> Word {
        let mut word = [0u8; WORD_LEN];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_hex_prefixed(&self.0))
    }
}

impl FromStr for Address {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// First four bytes of the Keccak-256 hash of a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

pub fn uint_word(value: u128) -> Word {
    let mut word = [0u8; WORD_LEN];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Value of a word if it fits in `u128`.
pub fn word_to_u128(word: &Word) -> Option<u128> {
    if word[..16].iter().any(|b| *b != 0) {
        return None;
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Some(u128::from_be_bytes(low))
}

pub fn encode_call(selector: [u8; 4], args: &[Word]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD_LEN);
    data.extend_from_slice(&selector);
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

fn word_at(data: &[u8], index: usize) -> Result<Word, AbiError> {
    let start = index.saturating_mul(WORD_LEN);
    let end = start.saturating_add(WORD_LEN);
    if data.len() < end {
        return Err(AbiError::Truncated {
            expected: end,
            actual: data.len(),
        });
    }
    let mut word = [0u8; WORD_LEN];
    word.copy_from_slice(&data[start..end]);
    Ok(word)
}

pub fn decode_bool(data: &[u8]) -> Result<bool, AbiError> {
    let word = word_at(data, 0)?;
    match word_to_u128(&word) {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => Err(AbiError::UnexpectedValue(format!(
            "{} is not a bool",
            encode_hex_prefixed(&word)
        ))),
    }
}

pub fn decode_address(data: &[u8]) -> Result<Address, AbiError> {
    let word = word_at(data, 0)?;
    if word[..12].iter().any(|b| *b != 0) {
        return Err(AbiError::UnexpectedValue(format!(
            "{} is not an address",
            encode_hex_prefixed(&word)
        )));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&word[12..]);
    Ok(Address(out))
}

pub fn decode_uint(data: &[u8]) -> Result<Word, AbiError> {
    word_at(data, 0)
}

/// Decode a single dynamic array of static tuples, `N` words per element,
/// such as a `(bytes32,uint256)[]` return value.
pub fn decode_tuple_array<const N: usize>(data: &[u8]) -> Result<Vec<[Word; N]>, AbiError> {
    let offset = word_to_u128(&word_at(data, 0)?)
        .and_then(|v| usize::try_from(v).ok())
        .filter(|v| v % WORD_LEN == 0)
        .ok_or_else(|| AbiError::UnexpectedValue("array offset out of range".to_string()))?;
    let head = offset / WORD_LEN;
    let len = word_to_u128(&word_at(data, head)?)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| AbiError::UnexpectedValue("array length out of range".to_string()))?;
    // Reject lengths the payload cannot back before allocating.
    let needed = len
        .checked_mul(N)
        .and_then(|v| v.checked_add(head + 1))
        .and_then(|v| v.checked_mul(WORD_LEN))
        .ok_or_else(|| AbiError::UnexpectedValue("array length out of range".to_string()))?;
    if data.len() < needed {
        return Err(AbiError::Truncated {
            expected: needed,
            actual: data.len(),
        });
    }
    if data.len() > needed {
        return Err(AbiError::UnexpectedValue(format!(
            "{} trailing bytes after {len} array element(s) of {N} word(s)",
            data.len() - needed
        )));
    }

    (0..len)
        .map(|i| {
            let base = head + 1 + i * N;
            let mut element = [[0u8; WORD_LEN]; N];
            for (j, slot) in element.iter_mut().enumerate() {
                *slot = word_at(data, base + j)?;
            }
            Ok(element)
        })
        .collect()
}

pub fn encode_tuple_array<const N: usize>(elements: &[[Word; N]]) -> Vec<u8> {
    let mut data = Vec::with_capacity((elements.len() * N + 2) * WORD_LEN);
    data.extend_from_slice(&uint_word(WORD_LEN as u128));
    data.extend_from_slice(&uint_word(elements.len() as u128));
    for element in elements {
        for word in element {
            data.extend_from_slice(word);
        }
    }
    data
}

pub fn decode_hex_prefixed(value: &str) -> Result<Vec<u8>, AbiError> {
    let trimmed = value.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| AbiError::InvalidHex("hex string must be 0x-prefixed".to_string()))?;
    decode_hex(hex)
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, AbiError> {
    if !hex.len().is_multiple_of(2) {
        return Err(AbiError::InvalidHex(
            "hex string must have an even number of characters".to_string(),
        ));
    }
    let mut out = Vec::with_capacity(hex.len() / 2);
    for pair in hex.as_bytes().chunks_exact(2) {
        let hi = decode_hex_nibble(pair[0])
            .ok_or_else(|| AbiError::InvalidHex("invalid hex character".to_string()))?;
        let lo = decode_hex_nibble(pair[1])
            .ok_or_else(|| AbiError::InvalidHex("invalid hex character".to_string()))?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

fn decode_hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

pub fn encode_hex_prefixed(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}
