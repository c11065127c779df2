use std::{fmt, iter::Sum, ops::Add, str::FromStr};

use num_bigint::{BigUint, ParseBigIntError};
use num_traits::{CheckedSub, Zero};
use serde::Serialize;

/// An exact amount of the token, counted in base units. Total supply does not fit in a u64, and
/// we never want float rounding anywhere near it, so this wraps an arbitrary precision integer.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct TokenAmount(pub BigUint);

impl TokenAmount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// None when `rhs` is larger than `self`.
    pub fn checked_sub(&self, rhs: &TokenAmount) -> Option<TokenAmount> {
        self.0.checked_sub(&rhs.0).map(TokenAmount)
    }

    /// Parses a `0x` prefixed hex number, as found in a `uint256` return value.
    pub fn from_hex_str(s: &str) -> Option<Self> {
        let digits = s.strip_prefix("0x")?;
        if digits.is_empty() {
            return None;
        }
        BigUint::parse_bytes(digits.as_bytes(), 16).map(TokenAmount)
    }

    /// Renders the amount in display units, where one display unit is `10^decimals` base units.
    /// The conversion is exact, trailing zeros of the fraction are dropped.
    pub fn to_display(&self, decimals: u32) -> DisplayAmount {
        let divisor = BigUint::from(10u32).pow(decimals);
        let whole = &self.0 / &divisor;
        let fraction = &self.0 % &divisor;

        if fraction.is_zero() {
            return DisplayAmount(whole.to_string());
        }

        let fraction_str = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
        let fraction_str = fraction_str.trim_end_matches('0');

        DisplayAmount(format!("{whole}.{fraction_str}"))
    }
}

impl Add<TokenAmount> for TokenAmount {
    type Output = Self;

    fn add(self, TokenAmount(rhs): Self) -> Self::Output {
        let TokenAmount(lhs) = self;
        TokenAmount(lhs + rhs)
    }
}

impl<'a> Add<&'a TokenAmount> for TokenAmount {
    type Output = Self;

    fn add(self, TokenAmount(rhs): &'a TokenAmount) -> Self::Output {
        let TokenAmount(lhs) = self;
        TokenAmount(lhs + rhs)
    }
}

impl Sum for TokenAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(TokenAmount::zero(), |sum, amount| sum + amount)
    }
}

impl<'a> Sum<&'a TokenAmount> for TokenAmount {
    fn sum<I: Iterator<Item = &'a TokenAmount>>(iter: I) -> Self {
        iter.fold(TokenAmount::zero(), |sum, amount| sum + amount)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TokenAmount> for String {
    fn from(TokenAmount(amount): TokenAmount) -> Self {
        amount.to_string()
    }
}

impl FromStr for TokenAmount {
    type Err = ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<BigUint>().map(TokenAmount)
    }
}

impl From<u64> for TokenAmount {
    fn from(amount: u64) -> Self {
        TokenAmount(BigUint::from(amount))
    }
}

impl From<u128> for TokenAmount {
    fn from(amount: u128) -> Self {
        TokenAmount(BigUint::from(amount))
    }
}

/// A token amount rendered in display units, e.g. `"1.5"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayAmount(String);

impl DisplayAmount {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DisplayAmount {
    fn default() -> Self {
        DisplayAmount("0".to_string())
    }
}

impl fmt::Display for DisplayAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DisplayAmount> for String {
    fn from(DisplayAmount(amount): DisplayAmount) -> Self {
        amount
    }
}
