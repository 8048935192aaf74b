//! Account liquidity ("health") evaluation.
//!
//! Sums risk-weighted collateral and borrow value over every market an account
//! has entered. Two collateral weightings run side by side: the collateral
//! factor gates new borrows and redeems, the liquidation factor decides whether
//! the account can be liquidated. Because the liquidation factor is never below
//! the collateral factor, an account is always blocked from borrowing before
//! it becomes liquidatable.
//!
//! Evaluation is a pure query over whatever balances are stored at call time.
//! Entry points that act on the result accrue interest first.

use crate::error::{LendingError, LendingResult};
use crate::fixed_point::Exp;
use crate::market::MarketRegistry;
use crate::oracle::{GovernanceToken, PriceOracle};
use crate::types::{AccountId, MarketId};
use serde::{Deserialize, Serialize};

/// What a market's token accounting reports for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountSnapshot {
    pub token_balance: u128,
    pub borrow_balance: u128,
    pub exchange_rate: Exp,
}

pub trait AccountSnapshotProvider {
    fn account_snapshot(&self, market: MarketId, account: AccountId) -> LendingResult<AccountSnapshot>;
}

/// An action to price in before it happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hypothetical {
    pub market: MarketId,
    pub redeem_tokens: u128,
    pub borrow_amount: u128,
}

impl Hypothetical {
    pub fn redeem(market: MarketId, redeem_tokens: u128) -> Self {
        Self { market, redeem_tokens, borrow_amount: 0 }
    }

    pub fn borrow(market: MarketId, borrow_amount: u128) -> Self {
        Self { market, redeem_tokens: 0, borrow_amount }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountLiquidity {
    /// Excess collateral value over borrows, zero when in shortfall.
    pub liquidity: u128,
    /// Borrow value beyond collateral-factor weighted collateral.
    pub shortfall_collateral: u128,
    /// Borrow value beyond liquidation-factor weighted collateral.
    pub shortfall_liquidation: u128,
    /// Liquidation threshold over borrow value. Zero for hypothetical queries
    /// and for accounts with nothing borrowed.
    pub health_factor: Exp,
    pub collateral_value: u128,
    pub liquidation_threshold: u128,
    pub borrow_value: u128,
}

impl AccountLiquidity {
    pub fn has_shortfall(&self) -> bool {
        self.shortfall_collateral > 0
    }

    pub fn is_liquidatable(&self) -> bool {
        self.shortfall_liquidation > 0
    }

    /// Fails with the shortfall if borrowing power is exceeded.
    pub fn require_no_shortfall(&self) -> LendingResult<()> {
        if self.has_shortfall() {
            return Err(LendingError::InsufficientLiquidity {
                shortfall: self.shortfall_collateral,
            });
        }
        Ok(())
    }
}

// running sums for one evaluation
#[derive(Default)]
struct Sums {
    collateral: u128,
    liquidation_threshold: u128,
    borrow: u128,
    borrow_for_liquidation: u128,
}

/// Everything the evaluation reads, borrowed for the duration of one query.
pub struct LiquidityContext<'a> {
    pub registry: &'a MarketRegistry,
    pub oracle: &'a dyn PriceOracle,
    pub snapshots: &'a dyn AccountSnapshotProvider,
    pub governance: Option<&'a dyn GovernanceToken>,
}

impl<'a> LiquidityContext<'a> {
    /// Collateral factor increase for `account`. Exactly zero when no governance
    /// token is configured.
    pub fn boost(&self, account: AccountId) -> LendingResult<Exp> {
        match self.governance {
            Some(token) => self.registry.risk().boost.boost_for(token.balance_of(account)),
            None => Ok(Exp::zero()),
        }
    }

    pub fn evaluate<I>(
        &self,
        account: AccountId,
        entered: I,
        hypothetical: Option<Hypothetical>,
    ) -> LendingResult<AccountLiquidity>
    where
        I: IntoIterator<Item = MarketId>,
    {
        let boost = self.boost(account)?;
        let mut sums = Sums::default();

        for market_id in entered {
            let market = self.registry.market(market_id)?;
            let snapshot = self.snapshots.account_snapshot(market_id, account)?;

            // capped at the liquidation factor on purpose: the liquidation threshold
            // must never fall below the collateral value
            let collateral_factor = market
                .collateral_factor
                .add(boost)?
                .min(market.liquidation_factor);

            let price = self.oracle.underlying_price(market_id);
            if price.is_zero() {
                return Err(LendingError::OraclePriceUnavailable(market_id));
            }

            let value_per_token = price.mul(snapshot.exchange_rate)?;
            let collateral_per_token = value_per_token.mul(collateral_factor)?;
            let liquidation_per_token = value_per_token.mul(market.liquidation_factor)?;

            sums.collateral =
                collateral_per_token.mul_scalar_truncate_add(snapshot.token_balance, sums.collateral)?;
            sums.liquidation_threshold = liquidation_per_token
                .mul_scalar_truncate_add(snapshot.token_balance, sums.liquidation_threshold)?;
            sums.borrow = price.mul_scalar_truncate_add(snapshot.borrow_balance, sums.borrow)?;
            sums.borrow_for_liquidation =
                price.mul_scalar_truncate_add(snapshot.borrow_balance, sums.borrow_for_liquidation)?;

            if let Some(h) = hypothetical.filter(|h| h.market == market_id) {
                // redeeming collateral and borrowing both land on the borrow side
                sums.borrow = collateral_per_token.mul_scalar_truncate_add(h.redeem_tokens, sums.borrow)?;
                sums.borrow_for_liquidation = liquidation_per_token
                    .mul_scalar_truncate_add(h.redeem_tokens, sums.borrow_for_liquidation)?;
                sums.borrow = price.mul_scalar_truncate_add(h.borrow_amount, sums.borrow)?;
            }
        }

        let mut result = AccountLiquidity {
            collateral_value: sums.collateral,
            liquidation_threshold: sums.liquidation_threshold,
            borrow_value: sums.borrow,
            ..AccountLiquidity::default()
        };

        if sums.collateral > sums.borrow {
            result.liquidity = sums.collateral - sums.borrow;
        } else {
            result.shortfall_collateral = sums.borrow - sums.collateral;
            result.shortfall_liquidation = sums
                .borrow_for_liquidation
                .saturating_sub(sums.liquidation_threshold);
        }

        if hypothetical.is_none() && sums.borrow != 0 {
            result.health_factor = Exp::from_ratio(sums.liquidation_threshold, sums.borrow)?;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoostParams, RiskParams};
    use crate::oracle::{GovernanceBalances, SimplePriceOracle};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    const UNIT: u128 = 1_000_000_000_000_000_000;
    const X: MarketId = MarketId(1);
    const Y: MarketId = MarketId(2);
    const ALICE: AccountId = AccountId(1);

    fn exp(d: rust_decimal::Decimal) -> Exp {
        Exp::from_decimal(d).unwrap()
    }

    #[derive(Default)]
    struct Book(HashMap<(MarketId, AccountId), AccountSnapshot>);

    impl Book {
        fn set(&mut self, market: MarketId, tokens: u128, borrow: u128) {
            self.0.insert(
                (market, ALICE),
                AccountSnapshot {
                    token_balance: tokens,
                    borrow_balance: borrow,
                    exchange_rate: Exp::one(),
                },
            );
        }
    }

    impl AccountSnapshotProvider for Book {
        fn account_snapshot(&self, market: MarketId, account: AccountId) -> LendingResult<AccountSnapshot> {
            Ok(self.0.get(&(market, account)).copied().unwrap_or_default())
        }
    }

    struct Fixture {
        registry: MarketRegistry,
        oracle: SimplePriceOracle,
        book: Book,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = MarketRegistry::new(RiskParams::default()).unwrap();
            registry.list_market(X, exp(dec!(0.75)), exp(dec!(0.8))).unwrap();
            registry.list_market(Y, exp(dec!(0.5)), exp(dec!(0.6))).unwrap();
            let oracle = SimplePriceOracle::new();
            oracle.set_price_decimal(X, dec!(1));
            oracle.set_price_decimal(Y, dec!(1));
            let mut book = Book::default();
            book.set(X, 100 * UNIT, 0);
            book.set(Y, 0, 50 * UNIT);
            Self { registry, oracle, book }
        }

        fn ctx(&self) -> LiquidityContext<'_> {
            LiquidityContext {
                registry: &self.registry,
                oracle: &self.oracle,
                snapshots: &self.book,
                governance: None,
            }
        }
    }

    #[test]
    fn collateral_only_liquidity() {
        let f = Fixture::new();
        let result = f.ctx().evaluate(ALICE, [X], None).unwrap();
        assert_eq!(result.liquidity, 75 * UNIT);
        assert_eq!(result.shortfall_collateral, 0);
        assert_eq!(result.health_factor, Exp::zero());
    }

    #[test]
    fn borrow_reduces_liquidity() {
        let f = Fixture::new();
        let result = f.ctx().evaluate(ALICE, [X, Y], None).unwrap();
        assert_eq!(result.liquidity, 25 * UNIT);
        // 80 / 50
        assert_eq!(result.health_factor, exp(dec!(1.6)));
    }

    #[test]
    fn price_drop_creates_both_shortfalls() {
        let f = Fixture::new();
        f.oracle.set_price_decimal(X, dec!(0.5));
        let result = f.ctx().evaluate(ALICE, [X, Y], None).unwrap();

        assert_eq!(result.liquidity, 0);
        assert_eq!(result.shortfall_collateral, 12_500_000_000_000_000_000);
        assert_eq!(result.liquidation_threshold, 40 * UNIT);
        assert_eq!(result.shortfall_liquidation, 10 * UNIT);
        assert!(result.is_liquidatable());
        assert_eq!(result.health_factor, exp(dec!(0.8)));
    }

    #[test]
    fn shortfall_without_liquidation_shortfall() {
        let f = Fixture::new();
        // collateral 48.75, borrow 50, threshold 52
        f.oracle.set_price_decimal(X, dec!(0.65));
        let result = f.ctx().evaluate(ALICE, [X, Y], None).unwrap();
        assert!(result.has_shortfall());
        assert!(!result.is_liquidatable());
        assert!(result.require_no_shortfall().is_err());
    }

    #[test]
    fn hypothetical_borrow() {
        let f = Fixture::new();
        let ok = f.ctx().evaluate(ALICE, [X, Y], Some(Hypothetical::borrow(Y, 25 * UNIT))).unwrap();
        assert_eq!(ok.liquidity, 0);
        assert_eq!(ok.shortfall_collateral, 0);
        assert_eq!(ok.health_factor, Exp::zero());

        let over = f.ctx().evaluate(ALICE, [X, Y], Some(Hypothetical::borrow(Y, 30 * UNIT))).unwrap();
        assert_eq!(over.shortfall_collateral, 5 * UNIT);
        assert_eq!(over.require_no_shortfall(), Err(LendingError::InsufficientLiquidity {
            shortfall: 5 * UNIT,
        }));
    }

    #[test]
    fn hypothetical_redeem() {
        let f = Fixture::new();
        // redeeming 40 tokens removes 30 of borrowing power, leaving 75 - 50 - 30 = -5
        let result = f.ctx().evaluate(ALICE, [X, Y], Some(Hypothetical::redeem(X, 40 * UNIT))).unwrap();
        assert_eq!(result.shortfall_collateral, 5 * UNIT);
        // 50 + 32 - 80
        assert_eq!(result.shortfall_liquidation, 2 * UNIT);
    }

    #[test]
    fn hypothetical_on_unentered_market_is_ignored() {
        let f = Fixture::new();
        let result = f.ctx().evaluate(ALICE, [X], Some(Hypothetical::borrow(Y, 1_000 * UNIT))).unwrap();
        assert_eq!(result.liquidity, 75 * UNIT);
    }

    #[test]
    fn missing_price_fails() {
        let f = Fixture::new();
        f.oracle.clear_price(Y);
        let err = f.ctx().evaluate(ALICE, [X, Y], None).unwrap_err();
        assert_eq!(err, LendingError::OraclePriceUnavailable(Y));
    }

    #[test]
    fn unlisted_market_fails() {
        let f = Fixture::new();
        let err = f.ctx().evaluate(ALICE, [MarketId(99)], None).unwrap_err();
        assert_eq!(err, LendingError::MarketNotListed(MarketId(99)));
    }

    #[test]
    fn boost_raises_collateral_factor() {
        let mut f = Fixture::new();
        f.registry.set_boost_params(BoostParams {
            boost_increase: exp(dec!(0.01)),
            required_token_amount: 1_000,
            max_boost: exp(dec!(0.03)),
        });
        let gov = GovernanceBalances::new();
        gov.set_balance(ALICE, 2_500);

        let ctx = LiquidityContext { governance: Some(&gov), ..f.ctx() };
        assert_eq!(ctx.boost(ALICE).unwrap(), exp(dec!(0.02)));
        let result = ctx.evaluate(ALICE, [X], None).unwrap();
        assert_eq!(result.liquidity, 77 * UNIT);

        // without a governance token the boost is exactly zero
        assert_eq!(f.ctx().boost(ALICE).unwrap(), Exp::zero());
    }

    #[test]
    fn boost_capped_at_liquidation_factor() {
        let mut f = Fixture::new();
        f.registry.set_boost_params(BoostParams {
            boost_increase: exp(dec!(0.5)),
            required_token_amount: 1,
            max_boost: exp(dec!(0.5)),
        });
        let gov = GovernanceBalances::new();
        gov.set_balance(ALICE, 10);
        let ctx = LiquidityContext { governance: Some(&gov), ..f.ctx() };

        let result = ctx.evaluate(ALICE, [X], None).unwrap();
        assert_eq!(result.collateral_value, 80 * UNIT);
        assert!(result.liquidation_threshold >= result.collateral_value);
    }
}
