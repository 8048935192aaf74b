//! External collaborators consumed by the risk core.
//!
//! Price sourcing is not part of this crate: the engine only sees a
//! [`PriceOracle`] handle. [`SimplePriceOracle`] is an in-memory feed for
//! simulations and tests, published to from outside the engine.

use crate::fixed_point::Exp;
use crate::types::{AccountId, MarketId};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// USD-normalized price of one unit of a market's underlying, scaled by 1e18.
/// A zero price means "unavailable".
pub trait PriceOracle: fmt::Debug + Send + Sync {
    fn underlying_price(&self, market: MarketId) -> Exp;
}

/// Balance lookup for the governance token that drives collateral boost.
pub trait GovernanceToken: fmt::Debug + Send + Sync {
    fn balance_of(&self, account: AccountId) -> u128;
}

#[derive(Debug, Default)]
pub struct SimplePriceOracle {
    prices: RwLock<HashMap<MarketId, Exp>>,
}

impl SimplePriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, market: MarketId, price: Exp) {
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        prices.insert(market, price);
    }

    /// Publish a price given as a human decimal. Negative values clear the price.
    pub fn set_price_decimal(&self, market: MarketId, price: Decimal) {
        self.set_price(market, Exp::from_decimal(price).unwrap_or_default());
    }

    pub fn clear_price(&self, market: MarketId) {
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        prices.remove(&market);
    }
}

impl PriceOracle for SimplePriceOracle {
    fn underlying_price(&self, market: MarketId) -> Exp {
        let prices = self.prices.read().unwrap_or_else(|e| e.into_inner());
        prices.get(&market).copied().unwrap_or_default()
    }
}

/// Fixed governance balances, e.g. from a snapshot.
#[derive(Debug, Default)]
pub struct GovernanceBalances {
    balances: RwLock<HashMap<AccountId, u128>>,
}

impl GovernanceBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, account: AccountId, amount: u128) {
        let mut balances = self.balances.write().unwrap_or_else(|e| e.into_inner());
        balances.insert(account, amount);
    }
}

impl GovernanceToken for GovernanceBalances {
    fn balance_of(&self, account: AccountId) -> u128 {
        let balances = self.balances.read().unwrap_or_else(|e| e.into_inner());
        balances.get(&account).copied().unwrap_or(0)
    }
}
