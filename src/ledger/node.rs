use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};

use super::{Address, LedgerCall, LedgerClient, LedgerQueryError, LedgerQueryFailure};
use crate::units::TokenAmount;

// First four bytes of the keccak hash of the function signature.
const TOTAL_SUPPLY_SELECTOR: &str = "0x18160ddd";
const BALANCE_OF_SELECTOR: &str = "0x70a08231";

// A uint256 return value, hex encoded.
const UINT256_HEX_LEN: usize = 64;

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcMessage {
    Error { error: RpcError },
    Result { result: Value },
}

fn decode_uint256(result: Value) -> Result<TokenAmount, LedgerQueryFailure> {
    let hex = result.as_str().ok_or_else(|| {
        LedgerQueryFailure::Malformed(format!("expected hex string, got {result}"))
    })?;

    // An empty 0x means there is no contract at the address we called.
    match hex.strip_prefix("0x") {
        Some(digits) if digits.len() == UINT256_HEX_LEN => TokenAmount::from_hex_str(hex)
            .ok_or_else(|| LedgerQueryFailure::Malformed(format!("invalid uint256 {hex}"))),
        _ => Err(LedgerQueryFailure::Malformed(format!(
            "expected 32 byte uint256 word, got {hex:?}"
        ))),
    }
}

/// Calls the token contract with `eth_call` over JSON-RPC.
pub struct TokenContractNode {
    client: reqwest::Client,
    contract: Address,
    next_id: AtomicU64,
    rpc_url: String,
}

impl TokenContractNode {
    pub fn new(rpc_url: &str, contract: Address, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            contract,
            next_id: AtomicU64::new(1),
            rpc_url: rpc_url.to_string(),
        })
    }

    async fn call_uint256(&self, data: String) -> Result<TokenAmount, LedgerQueryFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [{ "to": self.contract, "data": data }, "latest"]
        });

        trace!(id, %data, "sending eth_call");

        let text = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let message = serde_json::from_str::<RpcMessage>(&text).map_err(|err| {
            LedgerQueryFailure::Malformed(format!("response is not JSON-RPC, {err}"))
        })?;

        match message {
            RpcMessage::Result { result } => decode_uint256(result),
            RpcMessage::Error { error } => Err(LedgerQueryFailure::Rpc {
                code: error.code,
                message: error.message,
            }),
        }
    }
}

#[async_trait]
impl LedgerClient for TokenContractNode {
    async fn total_supply(&self) -> Result<TokenAmount, LedgerQueryError> {
        let total_supply = self
            .call_uint256(TOTAL_SUPPLY_SELECTOR.to_string())
            .await
            .map_err(|failure| LedgerQueryError::new(LedgerCall::TotalSupply, failure))?;

        debug!(%total_supply, "fetched total supply");

        Ok(total_supply)
    }

    async fn balance_of(&self, address: &Address) -> Result<TokenAmount, LedgerQueryError> {
        let data = format!("{BALANCE_OF_SELECTOR}{}", address.to_abi_word());
        let balance = self
            .call_uint256(data)
            .await
            .map_err(|failure| {
                LedgerQueryError::new(LedgerCall::BalanceOf(address.clone()), failure)
            })?;

        debug!(%address, %balance, "fetched balance");

        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;
    use crate::ledger::TOKEN_CONTRACT_ADDRESS;

    const ONE_THOUSAND_TOKENS: &str =
        "0x00000000000000000000000000000000000000000000003635c9adc5dea00000";

    fn node_for(server: &mockito::ServerGuard) -> TokenContractNode {
        TokenContractNode::new(
            &server.url(),
            TOKEN_CONTRACT_ADDRESS.parse().unwrap(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn decode_uint256_test() {
        assert_eq!(
            decode_uint256(json!(ONE_THOUSAND_TOKENS)).unwrap(),
            "1000000000000000000000".parse::<TokenAmount>().unwrap()
        );
    }

    #[test]
    fn decode_empty_result_test() {
        let failure = decode_uint256(json!("0x")).unwrap_err();
        assert!(matches!(failure, LedgerQueryFailure::Malformed(_)));
    }

    #[test]
    fn decode_non_string_result_test() {
        let failure = decode_uint256(json!(null)).unwrap_err();
        assert!(matches!(failure, LedgerQueryFailure::Malformed(_)));
    }

    #[tokio::test]
    async fn total_supply_test() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("\"eth_call\"".to_string()),
                Matcher::Regex("0x18160ddd".to_string()),
                Matcher::Regex("0x0ae055097c6d159879521c384f1d2123d1f195e6".to_string()),
            ]))
            .with_status(200)
            .with_body(
                json!({ "jsonrpc": "2.0", "id": 1, "result": ONE_THOUSAND_TOKENS }).to_string(),
            )
            .create_async()
            .await;

        let node = node_for(&server);
        let total_supply = node.total_supply().await.unwrap();

        assert_eq!(total_supply, "1000000000000000000000".parse::<TokenAmount>().unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn balance_of_encodes_address_test() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::Regex(
                "0x70a082310000000000000000000000009bc4a93883c522d3c79c81c2999aab52e2268d03"
                    .to_string(),
            ))
            .with_status(200)
            .with_body(
                json!({ "jsonrpc": "2.0", "id": 1, "result": ONE_THOUSAND_TOKENS }).to_string(),
            )
            .create_async()
            .await;

        let node = node_for(&server);
        let address = "0x9BC4a93883C522D3C79c81c2999Aab52E2268d03"
            .parse::<Address>()
            .unwrap();
        let balance = node.balance_of(&address).await.unwrap();

        assert_eq!(balance, "1000000000000000000000".parse::<TokenAmount>().unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rpc_error_test() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": { "code": -32000, "message": "header not found" }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let node = node_for(&server);
        let error = node.total_supply().await.unwrap_err();

        assert_eq!(error.call, LedgerCall::TotalSupply);
        assert!(matches!(
            error.failure,
            LedgerQueryFailure::Rpc { code: -32000, .. }
        ));
    }

    #[tokio::test]
    async fn http_error_status_test() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(502)
            .create_async()
            .await;

        let node = node_for(&server);
        let address = Address::zero();
        let error = node.balance_of(&address).await.unwrap_err();

        assert_eq!(error.call, LedgerCall::BalanceOf(Address::zero()));
        assert!(matches!(error.failure, LedgerQueryFailure::Transport(_)));
    }

    #[tokio::test]
    async fn non_json_rpc_body_test() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body("<html>rate limited</html>")
            .create_async()
            .await;

        let node = node_for(&server);
        let error = node.total_supply().await.unwrap_err();

        assert_eq!(error.call, LedgerCall::TotalSupply);
        assert!(matches!(error.failure, LedgerQueryFailure::Malformed(_)));
    }

    #[tokio::test]
    async fn missing_contract_test() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": "0x" }).to_string())
            .create_async()
            .await;

        let node = node_for(&server);
        let error = node.total_supply().await.unwrap_err();

        assert!(matches!(error.failure, LedgerQueryFailure::Malformed(_)));
    }
}
