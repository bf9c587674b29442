use std::{str::FromStr, sync::Arc, time::Duration};

use log::*;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use stockpay_engine::traits::{PriceOracle, PriceOracleError};

/// Fetches USD rates from a CoinGecko-compatible `simple/price` endpoint.
#[derive(Clone)]
pub struct CoinGeckoOracle {
    base_url: String,
    client: Arc<Client>,
}

impl std::fmt::Debug for CoinGeckoOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CoinGeckoOracle({})", self.base_url)
    }
}

impl CoinGeckoOracle {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PriceOracleError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceOracleError::Unreachable(format!("Could not build the HTTP client. {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { base_url, client: Arc::new(client) })
    }
}

impl PriceOracle for CoinGeckoOracle {
    async fn current_rate(&self, asset: &str) -> Result<Decimal, PriceOracleError> {
        let url = format!("{}/simple/price", self.base_url);
        trace!("💱️ Fetching {asset} rate from {url}");
        let response = self
            .client
            .get(url)
            .query(&[("ids", asset), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(|e| PriceOracleError::Unreachable(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(PriceOracleError::Unreachable(format!("The oracle responded with status {status}")));
        }
        let body = response.json::<Value>().await.map_err(|e| PriceOracleError::InvalidRate(e.to_string()))?;
        let rate = usd_rate_from(&body, asset)?;
        debug!("💱️ 1 {asset} = {rate} USD");
        Ok(rate)
    }
}

/// Extracts `body[asset]["usd"]`. The rate must be strictly positive.
fn usd_rate_from(body: &Value, asset: &str) -> Result<Decimal, PriceOracleError> {
    let value = body
        .get(asset)
        .and_then(|prices| prices.get("usd"))
        .ok_or_else(|| PriceOracleError::UnknownAsset(asset.to_string()))?;
    let repr = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => return Err(PriceOracleError::InvalidRate(other.to_string())),
    };
    let rate = Decimal::from_str(&repr)
        .or_else(|_| Decimal::from_scientific(&repr))
        .map_err(|e| PriceOracleError::InvalidRate(format!("{repr}. {e}")))?;
    if rate <= Decimal::ZERO {
        return Err(PriceOracleError::InvalidRate(repr));
    }
    Ok(rate)
}

#[cfg(test)]
mod test {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn rates() {
        assert_eq!(usd_rate_from(&json!({"dash": {"usd": 30.12}}), "dash").unwrap(), dec!(30.12));
        assert_eq!(usd_rate_from(&json!({"dash": {"usd": "28"}}), "dash").unwrap(), dec!(28));
        assert!(matches!(usd_rate_from(&json!({}), "dash"), Err(PriceOracleError::UnknownAsset(_))));
        assert!(matches!(usd_rate_from(&json!({"dash": {"eur": 1}}), "dash"), Err(PriceOracleError::UnknownAsset(_))));
        assert!(matches!(usd_rate_from(&json!({"dash": {"usd": 0}}), "dash"), Err(PriceOracleError::InvalidRate(_))));
        assert!(matches!(usd_rate_from(&json!({"dash": {"usd": null}}), "dash"), Err(PriceOracleError::InvalidRate(_))));
    }

    #[test]
    fn rates_keep_every_digit() {
        let body: Value = serde_json::from_str(r#"{"dash": {"usd": 27.123456789012345678}}"#).unwrap();
        assert_eq!(usd_rate_from(&body, "dash").unwrap(), dec!(27.123456789012345678));
    }
}
