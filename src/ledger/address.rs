use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

const ADDRESS_HEX_LEN: usize = 40;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid address {input:?}, expected 0x followed by 40 hex digits")]
pub struct AddressParseError {
    pub input: String,
}

/// A 20 byte account address. Stored lowercased so that checksummed and plain spellings of the
/// same account compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn zero() -> Self {
        Address(ZERO_ADDRESS.to_string())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == ZERO_ADDRESS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address left-padded to a 32 byte ABI word, without `0x` prefix.
    pub fn to_abi_word(&self) -> String {
        format!("{:0>64}", &self.0[2..])
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AddressParseError {
            input: s.to_string(),
        };

        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(err)?;

        if digits.len() != ADDRESS_HEX_LEN || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }

        Ok(Address(format!("0x{}", digits.to_ascii_lowercase())))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
