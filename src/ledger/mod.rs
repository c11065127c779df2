//! Read-only access to the token contract through an execution node.

mod address;
mod node;

pub use address::Address;
pub use address::AddressParseError;
pub use address::ZERO_ADDRESS;

pub use node::TokenContractNode;

use std::fmt;

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use crate::units::TokenAmount;

pub const TOKEN_CONTRACT_ADDRESS: &str = "0x0Ae055097C6d159879521C384F1D2123D1f195e6";

/// Identifies which contract read failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    TotalSupply,
    BalanceOf(Address),
}

impl fmt::Display for LedgerCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerCall::TotalSupply => write!(f, "totalSupply()"),
            LedgerCall::BalanceOf(address) => write!(f, "balanceOf({address})"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerQueryFailure {
    /// Connection failures, timeouts and non-2xx responses.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("node returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
#[error("ledger query {call} failed, {failure}")]
pub struct LedgerQueryError {
    pub call: LedgerCall,
    #[source]
    pub failure: LedgerQueryFailure,
}

impl LedgerQueryError {
    pub fn new(call: LedgerCall, failure: impl Into<LedgerQueryFailure>) -> Self {
        Self {
            call,
            failure: failure.into(),
        }
    }
}

#[automock]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn total_supply(&self) -> Result<TokenAmount, LedgerQueryError>;
    async fn balance_of(&self, address: &Address) -> Result<TokenAmount, LedgerQueryError>;
}
