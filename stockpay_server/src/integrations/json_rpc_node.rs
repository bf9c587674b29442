//! A [`PaymentNode`] backed by a Bitcoin-Core-style wallet (Dash Core, Bitcoin Core, ...) over JSON-RPC 1.0.
//!
//! Only three wallet calls are used: `getnewaddress`, `getreceivedbyaddress` and `sendtoaddress`.
use std::{str::FromStr, sync::Arc, time::Duration};

use log::*;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spg_common::CoinAmount;
use stockpay_engine::traits::{PaymentNode, PaymentNodeError};

use crate::config::NodeConfig;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Clone)]
pub struct JsonRpcNode {
    config: NodeConfig,
    client: Arc<Client>,
}

impl std::fmt::Debug for JsonRpcNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JsonRpcNode({})", self.config.url)
    }
}

impl JsonRpcNode {
    pub fn new(config: NodeConfig, timeout: Duration) -> Result<Self, PaymentNodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentNodeError::Transport(format!("Could not build the HTTP client. {e}")))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, PaymentNodeError> {
        let body = RpcRequest { jsonrpc: "1.0", id: "stockpay", method, params };
        trace!("🪙️ RPC call: {method}");
        let mut req = self.client.post(self.config.url.as_str()).json(&body);
        if !self.config.user.is_empty() {
            req = req.basic_auth(&self.config.user, Some(self.config.password.reveal()));
        }
        let response = req.send().await.map_err(|e| PaymentNodeError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| PaymentNodeError::Transport(e.to_string()))?;
        decode_response(status.as_u16(), &text)
    }
}

/// Bitcoin-Core reports RPC failures with a 500 status *and* an `error` member, so the body is inspected before the
/// status.
fn decode_response(status: u16, text: &str) -> Result<Value, PaymentNodeError> {
    let success = (200..300).contains(&status);
    match serde_json::from_str::<RpcResponse>(text) {
        Ok(RpcResponse { error: Some(e), .. }) => Err(PaymentNodeError::Rpc { code: e.code, message: e.message }),
        Ok(RpcResponse { result, .. }) if success => Ok(result),
        Err(e) if success => Err(PaymentNodeError::InvalidResponse(e.to_string())),
        _ => Err(PaymentNodeError::Transport(format!("The node responded with status {status}. {}", text.trim()))),
    }
}

/// Parses an amount as the node writes it: a JSON number of coins, e.g. `0.58333334` or `1e-08`.
fn parse_amount(value: &Value) -> Result<CoinAmount, PaymentNodeError> {
    let repr = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => return Err(PaymentNodeError::InvalidResponse(format!("Expected an amount, got {other}"))),
    };
    let coins = Decimal::from_str(&repr)
        .or_else(|_| Decimal::from_scientific(&repr))
        .map_err(|e| PaymentNodeError::InvalidResponse(format!("{repr} is not an amount. {e}")))?;
    CoinAmount::try_from(coins).map_err(|e| PaymentNodeError::InvalidResponse(e.to_string()))
}

fn expect_string(value: Value, what: &str) -> Result<String, PaymentNodeError> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        other => Err(PaymentNodeError::InvalidResponse(format!("Expected {what}, got {other}"))),
    }
}

impl PaymentNode for JsonRpcNode {
    async fn new_deposit_address(&self) -> Result<String, PaymentNodeError> {
        let result = self.call("getnewaddress", Value::Array(vec![])).await?;
        let address = expect_string(result, "an address")?;
        debug!("🪙️ New deposit address: {address}");
        Ok(address)
    }

    async fn received_at_address(
        &self,
        address: &str,
        min_confirmations: u32,
    ) -> Result<CoinAmount, PaymentNodeError> {
        let result = self.call("getreceivedbyaddress", serde_json::json!([address, min_confirmations])).await?;
        parse_amount(&result)
    }

    async fn send_to(&self, address: &str, amount: CoinAmount) -> Result<String, PaymentNodeError> {
        // Sent as a string so the amount never passes through a float
        let result = self.call("sendtoaddress", serde_json::json!([address, amount.to_string()])).await?;
        let txid = expect_string(result, "a transaction id")?;
        info!("🪙️ Sent {amount} to {address}. Tx: {txid}");
        Ok(txid)
    }
}
