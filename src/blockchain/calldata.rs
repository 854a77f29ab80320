use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;

use crate::blockchain::address::normalize_address;
use crate::error::DecodeError;

/// Calldata length of a transfer routed through a forwarding contract
pub const FORWARDED_CALLDATA_LEN: usize = 12;
/// Calldata length of a direct token transfer
pub const DIRECT_CALLDATA_LEN: usize = 10;

/// A calldata list recognized as one of the two known transfer layouts.
///
/// Address words are normalized at decode time. Numeric words stay raw until
/// the shape has passed its watch-list checks, so malformed numbers in calls
/// nobody watches never surface as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CalldataShape<'a> {
    /// 12 words: forwarding contract at 1, token at 6, recipient at 7,
    /// value at 8, auxiliary payload at 10, nonce at 11
    Forwarded {
        recipient: String,
        token: String,
        forwarding_contract: String,
        nonce: &'a str,
        value: &'a str,
        auxiliary: &'a str,
    },
    /// 10 words: token at 1, recipient at 6, value at 7, nonce at 9
    Direct {
        recipient: String,
        token: String,
        nonce: &'a str,
        value: &'a str,
    },
}

/// Transfer fields extracted from a matched calldata shape
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTransfer {
    pub recipient: String,
    pub token: String,
    pub nonce: u64,
    pub value: BigDecimal,
    pub auxiliary: Option<String>,
}

impl<'a> CalldataShape<'a> {
    /// Classify calldata purely by its length. Unknown lengths are not a match.
    pub fn decode(calldata: &'a [String]) -> Option<Self> {
        match calldata.len() {
            FORWARDED_CALLDATA_LEN => Some(CalldataShape::Forwarded {
                recipient: normalize_address(&calldata[7]),
                token: normalize_address(&calldata[6]),
                forwarding_contract: normalize_address(&calldata[1]),
                nonce: &calldata[11],
                value: &calldata[8],
                auxiliary: &calldata[10],
            }),
            DIRECT_CALLDATA_LEN => Some(CalldataShape::Direct {
                recipient: normalize_address(&calldata[6]),
                token: normalize_address(&calldata[1]),
                nonce: &calldata[9],
                value: &calldata[7],
            }),
            _ => None,
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            CalldataShape::Forwarded { recipient, .. } | CalldataShape::Direct { recipient, .. } => recipient,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            CalldataShape::Forwarded { token, .. } | CalldataShape::Direct { token, .. } => token,
        }
    }

    /// Only the forwarded layout names an intermediate contract
    pub fn forwarding_contract(&self) -> Option<&str> {
        match self {
            CalldataShape::Forwarded { forwarding_contract, .. } => Some(forwarding_contract),
            CalldataShape::Direct { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CalldataShape::Forwarded { .. } => "forwarded",
            CalldataShape::Direct { .. } => "direct",
        }
    }

    /// Parse the numeric words into a typed transfer
    pub fn into_transfer(self) -> Result<DecodedTransfer, DecodeError> {
        match self {
            CalldataShape::Forwarded {
                recipient,
                token,
                nonce,
                value,
                auxiliary,
                ..
            } => Ok(DecodedTransfer {
                recipient,
                token,
                nonce: parse_u64("nonce", nonce)?,
                value: parse_decimal("value", value)?,
                auxiliary: Some(auxiliary.to_string()),
            }),
            CalldataShape::Direct {
                recipient,
                token,
                nonce,
                value,
            } => Ok(DecodedTransfer {
                recipient,
                token,
                nonce: parse_u64("nonce", nonce)?,
                value: parse_decimal("value", value)?,
                auxiliary: None,
            }),
        }
    }
}

/// Parse a felt written either as `0x` hex or as a decimal string
pub fn parse_felt(field: &'static str, raw: &str) -> Result<BigUint, DecodeError> {
    let trimmed = raw.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16),
        None => BigUint::parse_bytes(trimmed.as_bytes(), 10),
    };
    parsed.ok_or_else(|| DecodeError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

pub fn parse_decimal(field: &'static str, raw: &str) -> Result<BigDecimal, DecodeError> {
    let value = parse_felt(field, raw)?;
    Ok(BigDecimal::new(BigInt::from(value), 0))
}

pub fn parse_u64(field: &'static str, raw: &str) -> Result<u64, DecodeError> {
    parse_felt(field, raw)?.to_u64().ok_or_else(|| DecodeError::Overflow {
        field,
        value: raw.to_string(),
    })
}
