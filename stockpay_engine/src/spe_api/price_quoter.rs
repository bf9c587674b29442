use std::{fmt::Debug, sync::Arc};

use log::*;
use rust_decimal::Decimal;
use spg_common::CoinAmount;

use crate::{
    catalog::Catalog,
    db_types::Sku,
    spe_api::{errors::QuoteError, order_objects::Quote},
    traits::PriceOracle,
};

/// Converts fixed USD catalog prices into coin amounts at the current oracle rate.
///
/// There is no caching: every quote asks the oracle afresh.
pub struct PriceQuoter<P> {
    oracle: P,
    catalog: Arc<Catalog>,
}

impl<P> Debug for PriceQuoter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PriceQuoter({})", self.catalog.asset)
    }
}

impl<P: Clone> Clone for PriceQuoter<P> {
    fn clone(&self) -> Self {
        Self { oracle: self.oracle.clone(), catalog: Arc::clone(&self.catalog) }
    }
}

impl<P> PriceQuoter<P> {
    pub fn new(oracle: P, catalog: Arc<Catalog>) -> Self {
        Self { oracle, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn oracle(&self) -> &P {
        &self.oracle
    }
}

impl<P> PriceQuoter<P>
where P: PriceOracle
{
    /// Quotes a canonical SKU (see [`Catalog::resolve_sku`]).
    ///
    /// Unknown products fail before the oracle is consulted. An unreachable oracle, or a rate that is not strictly
    /// positive, yields [`QuoteError::QuoteUnavailable`].
    pub async fn quote(&self, sku: &Sku) -> Result<Quote, QuoteError> {
        let usd_price = self.catalog.price_for(sku)?;
        let rate = self.oracle.current_rate(&self.catalog.asset).await.map_err(|e| {
            warn!("💱️ Could not fetch the {} rate. {e}", self.catalog.asset);
            QuoteError::from(e)
        })?;
        if rate <= Decimal::ZERO {
            warn!("💱️ The oracle returned a non-positive rate for {}: {rate}", self.catalog.asset);
            return Err(QuoteError::QuoteUnavailable(format!("invalid rate {rate}")));
        }
        let coins = usd_price
            .checked_div(rate)
            .ok_or_else(|| QuoteError::QuoteUnavailable(format!("${usd_price} / {rate} is out of range")))?;
        let crypto_amount =
            CoinAmount::from_decimal_round_up(coins).map_err(|e| QuoteError::QuoteUnavailable(e.to_string()))?;
        debug!("💱️ Quoted {sku} at ${usd_price} / {rate} = {crypto_amount}");
        Ok(Quote { sku: sku.clone(), usd_price, rate, crypto_amount })
    }
}
