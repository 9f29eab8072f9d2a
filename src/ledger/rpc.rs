//! Ethereum JSON-RPC transport over HTTP.
//!
//! Signing is delegated to the node or wallet behind the endpoint
//! (`eth_sendTransaction`), the same way an injected browser wallet signs.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::traits::*;

/// EIP-1193 "user rejected request".
const USER_REJECTED: i64 = 4001;

/// Error code geth uses for reverted calls.
const EXECUTION_REVERTED: i64 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
}

/// Transport speaking JSON-RPC to one HTTP endpoint.
#[derive(Debug)]
pub struct JsonRpcTransport {
    url: String,
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcTransport {
    pub fn new(url: impl Into<String>) -> LedgerResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    async fn request(&self, method: &str, params: Value) -> LedgerResult<Value> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        tracing::trace!(method, "json-rpc request");
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{} failed: {}", method, e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LedgerError::Transport(format!(
                "{} failed: HTTP {} - {}",
                method, status, text
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Decode(format!("{} response: {}", method, e)))?;

        if let Some(err) = parsed.error {
            return Err(classify_rpc_error(err.code, err.message));
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }

    async fn request_string(&self, method: &str, params: Value) -> LedgerResult<String> {
        match self.request(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(LedgerError::Decode(format!(
                "{}: expected string result, got {}",
                method, other
            ))),
        }
    }
}

#[async_trait]
impl LedgerTransport for JsonRpcTransport {
    async fn chain_id(&self) -> LedgerResult<ChainId> {
        let raw = self.request_string("eth_chainId", json!([])).await?;
        Ok(ChainId(parse_quantity_u64(&raw)?))
    }

    async fn accounts(&self) -> LedgerResult<Vec<Address>> {
        let value = self.request("eth_accounts", json!([])).await?;
        let raw: Vec<String> = serde_json::from_value(value)
            .map_err(|e| LedgerError::Decode(format!("eth_accounts: {}", e)))?;
        raw.iter().map(|s| s.parse()).collect()
    }

    async fn balance(&self, address: &Address) -> LedgerResult<u128> {
        let raw = self
            .request_string("eth_getBalance", json!([address.to_string(), "latest"]))
            .await?;
        parse_quantity_u128(&raw)
    }

    async fn call(&self, to: &Address, data: &[u8]) -> LedgerResult<Vec<u8>> {
        let raw = self
            .request_string(
                "eth_call",
                json!([{ "to": to.to_string(), "data": encode_data(data) }, "latest"]),
            )
            .await?;
        decode_data(&raw)
    }

    async fn send_transaction(
        &self,
        from: &Address,
        to: &Address,
        data: &[u8],
    ) -> LedgerResult<TxHash> {
        let raw = self
            .request_string(
                "eth_sendTransaction",
                json!([{
                    "from": from.to_string(),
                    "to": to.to_string(),
                    "data": encode_data(data),
                }]),
            )
            .await?;
        raw.parse()
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> LedgerResult<Option<Receipt>> {
        let value = self
            .request("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        parse_receipt(value)
    }
}

/// Wallet provider backed by a JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct HttpWalletProvider {
    url: String,
    account: Option<Address>,
}

impl HttpWalletProvider {
    pub fn new(url: impl Into<String>, account: Option<Address>) -> Self {
        Self {
            url: url.into(),
            account,
        }
    }
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn connect(&self) -> LedgerResult<Arc<dyn LedgerTransport>> {
        let transport = JsonRpcTransport::new(self.url.clone())?;
        Ok(Arc::new(transport))
    }

    fn preferred_account(&self) -> Option<Address> {
        self.account
    }
}

fn classify_rpc_error(code: i64, message: String) -> LedgerError {
    if code == USER_REJECTED {
        return LedgerError::SignatureDeclined;
    }
    if code == EXECUTION_REVERTED || message.contains("revert") {
        let reason = message
            .split_once("reverted:")
            .map(|(_, reason)| reason.trim().to_string())
            .unwrap_or(message);
        return LedgerError::Reverted(reason);
    }
    LedgerError::Rpc { code, message }
}

fn parse_quantity_u128(raw: &str) -> LedgerResult<u128> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::Decode(format!("quantity without 0x prefix: {}", raw)))?;
    if digits.is_empty() {
        return Err(LedgerError::Decode("empty quantity".to_string()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::Decode(format!("invalid quantity {}: {}", raw, e)))
}

fn parse_quantity_u64(raw: &str) -> LedgerResult<u64> {
    let value = parse_quantity_u128(raw)?;
    u64::try_from(value).map_err(|_| LedgerError::Decode(format!("quantity too large: {}", raw)))
}

fn encode_data(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

fn decode_data(raw: &str) -> LedgerResult<Vec<u8>> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|e| LedgerError::Decode(format!("invalid return data: {}", e)))
}

fn parse_receipt(value: Value) -> LedgerResult<Option<Receipt>> {
    if value.is_null() {
        return Ok(None);
    }
    let raw: RpcReceipt = serde_json::from_value(value)
        .map_err(|e| LedgerError::Decode(format!("receipt: {}", e)))?;

    // Some nodes return a receipt for pending transactions without a block.
    let Some(block) = raw.block_number else {
        return Ok(None);
    };

    Ok(Some(Receipt {
        hash: raw.transaction_hash.parse()?,
        block_number: parse_quantity_u64(&block)?,
        success: match raw.status.as_deref() {
            Some(status) => parse_quantity_u64(status)? == 1,
            None => true,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity_u64("0x4").unwrap(), 4);
        assert_eq!(parse_quantity_u64("0x0").unwrap(), 0);
        assert_eq!(
            parse_quantity_u128("0xde0b6b3a7640000").unwrap(),
            1_000_000_000_000_000_000
        );
        assert!(parse_quantity_u64("4").is_err());
        assert!(parse_quantity_u64("0x").is_err());
        assert!(parse_quantity_u64("0x10000000000000000").is_err());
    }

    #[test]
    fn test_classify_user_rejection() {
        let err = classify_rpc_error(4001, "User denied transaction signature".into());
        assert_eq!(err, LedgerError::SignatureDeclined);
    }

    #[test]
    fn test_classify_revert_reason() {
        let err = classify_rpc_error(3, "execution reverted: DEADLINE_EXCEEDED".into());
        assert_eq!(err, LedgerError::Reverted("DEADLINE_EXCEEDED".into()));

        let err = classify_rpc_error(-32000, "transaction would revert".into());
        assert_eq!(err, LedgerError::Reverted("transaction would revert".into()));
    }

    #[test]
    fn test_classify_other_rpc_error() {
        let err = classify_rpc_error(-32601, "method not found".into());
        assert!(matches!(err, LedgerError::Rpc { code: -32601, .. }));
    }

    #[test]
    fn test_data_hex_round_trip() {
        assert_eq!(encode_data(&[0x01, 0xab]), "0x01ab");
        assert_eq!(decode_data("0x01ab").unwrap(), vec![0x01, 0xab]);
        assert_eq!(decode_data("0x").unwrap(), Vec::<u8>::new());
        assert!(decode_data("0xzz").is_err());
    }

    #[test]
    fn test_parse_receipt_pending_and_mined() {
        assert_eq!(parse_receipt(Value::Null).unwrap(), None);

        let hash = format!("0x{}", "11".repeat(32));
        let pending = json!({ "transactionHash": hash, "blockNumber": null });
        assert_eq!(parse_receipt(pending).unwrap(), None);

        let mined = json!({ "transactionHash": hash, "blockNumber": "0x10", "status": "0x1" });
        let receipt = parse_receipt(mined).unwrap().unwrap();
        assert_eq!(receipt.block_number, 16);
        assert!(receipt.success);

        let reverted = json!({ "transactionHash": hash, "blockNumber": "0x10", "status": "0x0" });
        assert!(!parse_receipt(reverted).unwrap().unwrap().success);
    }

    #[test]
    fn test_request_serialization() {
        let req = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "eth_chainId",
            params: json!([]),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({ "jsonrpc": "2.0", "id": 7, "method": "eth_chainId", "params": [] })
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let transport = JsonRpcTransport::new("http://127.0.0.1:9").unwrap();
        let err = transport.chain_id().await.unwrap_err();
        assert!(matches!(err, LedgerError::Transport(_)));
    }
}
