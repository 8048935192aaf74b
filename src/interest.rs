//! Per-market interest accrual.
//!
//! Each market carries a [`MarketAccrualState`] that is either fresh (its
//! checkpoint equals the current block) or stale. [`MarketAccrualState::accrue`]
//! moves it to fresh by applying simple interest over the elapsed blocks to
//! total borrows, reserves and the borrow index in one step.
//!
//! Borrow balances are stored as [`BorrowSnapshot`]s: principal plus the index
//! at the time of the last principal change. The current balance is the
//! principal scaled by how far the index has moved since.

use crate::error::{LendingError, LendingResult};
use crate::fixed_point::{checked_add, checked_sub, to_u128, Exp};
use crate::types::BlockNumber;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 1.0: a reserve factor above this would send more than all interest to reserves.
pub const MAX_RESERVE_FACTOR_MANTISSA: u128 = 1_000_000_000_000_000_000;

/// Roughly 12s blocks.
pub const DEFAULT_BLOCKS_PER_YEAR: u128 = 2_628_000;

/// Per-block borrow rate for a market, a pure function of its balances.
pub trait InterestRateModel: fmt::Debug + Send + Sync {
    fn borrow_rate(&self, cash: u128, borrows: u128, reserves: u128) -> LendingResult<Exp>;

    fn supply_rate(
        &self,
        cash: u128,
        borrows: u128,
        reserves: u128,
        reserve_factor: Exp,
    ) -> LendingResult<Exp> {
        let one_minus_reserve_factor = Exp::one().sub(reserve_factor)?;
        let borrow_rate = self.borrow_rate(cash, borrows, reserves)?;
        let rate_to_pool = borrow_rate.mul(one_minus_reserve_factor)?;
        Ok(utilization_rate(cash, borrows, reserves)?.mul(rate_to_pool)?)
    }
}

/// `borrows / (cash + borrows - reserves)`, zero when nothing is borrowed.
pub fn utilization_rate(cash: u128, borrows: u128, reserves: u128) -> LendingResult<Exp> {
    if borrows == 0 {
        return Ok(Exp::zero());
    }
    let total = checked_sub(checked_add(cash, borrows)?, reserves)?;
    Ok(Exp::from_ratio(borrows, total)?)
}

/// Constant rate regardless of utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRateModel {
    pub rate_per_block: Exp,
}

impl FixedRateModel {
    pub fn new(rate_per_block: Exp) -> Self {
        Self { rate_per_block }
    }
}

impl InterestRateModel for FixedRateModel {
    fn borrow_rate(&self, _cash: u128, _borrows: u128, _reserves: u128) -> LendingResult<Exp> {
        Ok(self.rate_per_block)
    }
}

/// Linear up to the kink, then a steeper slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpRateModel {
    pub base_rate_per_block: Exp,
    pub multiplier_per_block: Exp,
    pub jump_multiplier_per_block: Exp,
    pub kink: Exp,
}

impl JumpRateModel {
    pub fn from_yearly(
        base_rate_per_year: Exp,
        multiplier_per_year: Exp,
        jump_multiplier_per_year: Exp,
        kink: Exp,
        blocks_per_year: u128,
    ) -> LendingResult<Self> {
        Ok(Self {
            base_rate_per_block: base_rate_per_year.div_scalar(blocks_per_year)?,
            multiplier_per_block: multiplier_per_year.div_scalar(blocks_per_year)?,
            jump_multiplier_per_block: jump_multiplier_per_year.div_scalar(blocks_per_year)?,
            kink,
        })
    }
}

impl InterestRateModel for JumpRateModel {
    fn borrow_rate(&self, cash: u128, borrows: u128, reserves: u128) -> LendingResult<Exp> {
        let util = utilization_rate(cash, borrows, reserves)?;
        if util <= self.kink {
            return Ok(util.mul(self.multiplier_per_block)?.add(self.base_rate_per_block)?);
        }
        let normal_rate = self.kink.mul(self.multiplier_per_block)?.add(self.base_rate_per_block)?;
        let excess_util = util.sub(self.kink)?;
        Ok(excess_util.mul(self.jump_multiplier_per_block)?.add(normal_rate)?)
    }
}

/// Result of one accrual step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualOutcome {
    pub blocks_elapsed: u64,
    pub borrow_rate: Exp,
    pub interest_accumulated: u128,
    pub borrow_index: Exp,
    pub total_borrows: u128,
    pub total_reserves: u128,
}

/// Balances and index of one market as of its last checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketAccrualState {
    pub cash: u128,
    pub total_borrows: u128,
    pub total_reserves: u128,
    pub borrow_index: Exp,
    pub accrual_block: BlockNumber,
}

impl MarketAccrualState {
    pub fn new(accrual_block: BlockNumber) -> Self {
        Self {
            cash: 0,
            total_borrows: 0,
            total_reserves: 0,
            borrow_index: Exp::one(),
            accrual_block,
        }
    }

    pub fn is_fresh(&self, current: BlockNumber) -> bool {
        self.accrual_block == current
    }

    /// Bring the market up to `current`. A fresh market is left untouched.
    /// Either every field and the checkpoint move together or nothing does.
    pub fn accrue(
        &mut self,
        current: BlockNumber,
        model: &dyn InterestRateModel,
        reserve_factor: Exp,
        max_borrow_rate: Exp,
    ) -> LendingResult<AccrualOutcome> {
        let blocks_elapsed = current.since(self.accrual_block).ok_or(
            LendingError::BlockBehindCheckpoint {
                current,
                checkpoint: self.accrual_block,
            },
        )?;
        if blocks_elapsed == 0 {
            return Ok(AccrualOutcome {
                blocks_elapsed: 0,
                borrow_rate: Exp::zero(),
                interest_accumulated: 0,
                borrow_index: self.borrow_index,
                total_borrows: self.total_borrows,
                total_reserves: self.total_reserves,
            });
        }

        let borrow_rate = model.borrow_rate(self.cash, self.total_borrows, self.total_reserves)?;
        if borrow_rate > max_borrow_rate {
            return Err(LendingError::BorrowRateTooHigh {
                rate: borrow_rate,
                max: max_borrow_rate,
            });
        }

        let simple_interest_factor = borrow_rate.mul_scalar(u128::from(blocks_elapsed))?;
        let interest_accumulated = simple_interest_factor.mul_scalar_truncate(self.total_borrows)?;
        let total_borrows = checked_add(self.total_borrows, interest_accumulated)?;
        let total_reserves =
            reserve_factor.mul_scalar_truncate_add(interest_accumulated, self.total_reserves)?;
        let index_growth = simple_interest_factor.mul(self.borrow_index)?;
        let borrow_index = self.borrow_index.add(index_growth)?;

        *self = MarketAccrualState {
            cash: self.cash,
            total_borrows,
            total_reserves,
            borrow_index,
            accrual_block: current,
        };

        tracing::debug!(
            blocks_elapsed,
            interest_accumulated,
            %borrow_index,
            "accrued interest"
        );

        Ok(AccrualOutcome {
            blocks_elapsed,
            borrow_rate,
            interest_accumulated,
            borrow_index,
            total_borrows,
            total_reserves,
        })
    }

    /// `(cash + borrows - reserves) / total_supply`, or `initial_rate` before
    /// any tokens exist.
    pub fn exchange_rate(&self, total_supply: u128, initial_rate: Exp) -> LendingResult<Exp> {
        if total_supply == 0 {
            return Ok(initial_rate);
        }
        let underlying = checked_sub(checked_add(self.cash, self.total_borrows)?, self.total_reserves)?;
        Ok(Exp::from_ratio(underlying, total_supply)?)
    }
}

/// Borrow principal and the index it was last written at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BorrowSnapshot {
    pub principal: u128,
    pub interest_index: Exp,
}

impl BorrowSnapshot {
    pub fn new(principal: u128, interest_index: Exp) -> Self {
        Self { principal, interest_index }
    }

    /// `principal * current_index / interest_index`
    pub fn balance(&self, current_index: Exp) -> LendingResult<u128> {
        if self.principal == 0 {
            return Ok(0);
        }
        if self.interest_index.is_zero() {
            return Err(LendingError::DivisionByZero);
        }
        let scaled = U256::from(self.principal)
            .checked_mul(current_index.mantissa())
            .ok_or(LendingError::ArithmeticOverflow)?;
        Ok(to_u128(scaled / self.interest_index.mantissa())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn exp(d: rust_decimal::Decimal) -> Exp {
        Exp::from_decimal(d).unwrap()
    }

    fn max_rate() -> Exp {
        exp(dec!(0.1))
    }

    fn market_with_borrows() -> MarketAccrualState {
        let mut state = MarketAccrualState::new(BlockNumber(100));
        state.cash = 1_000_000;
        state.total_borrows = 1_000_000;
        state
    }

    #[test]
    fn zero_elapsed_is_noop() {
        let mut state = market_with_borrows();
        let before = state.clone();
        let model = FixedRateModel::new(exp(dec!(0.01)));

        let outcome = state.accrue(BlockNumber(100), &model, exp(dec!(0.1)), max_rate()).unwrap();

        assert_eq!(outcome.blocks_elapsed, 0);
        assert_eq!(state, before);
    }

    #[test]
    fn simple_interest_over_blocks() {
        let mut state = market_with_borrows();
        let model = FixedRateModel::new(exp(dec!(0.001)));

        let outcome = state.accrue(BlockNumber(110), &model, exp(dec!(0.2)), max_rate()).unwrap();

        // factor = 0.001 * 10 = 0.01, interest = 10_000
        assert_eq!(outcome.interest_accumulated, 10_000);
        assert_eq!(state.total_borrows, 1_010_000);
        assert_eq!(state.total_reserves, 2_000);
        assert_eq!(state.borrow_index, exp(dec!(1.01)));
        assert_eq!(state.accrual_block, BlockNumber(110));
        assert_eq!(state.cash, 1_000_000);
    }

    #[test]
    fn accrue_twice_same_block_idempotent() {
        let model = FixedRateModel::new(exp(dec!(0.0003)));
        let mut once = market_with_borrows();
        once.accrue(BlockNumber(150), &model, exp(dec!(0.1)), max_rate()).unwrap();

        let mut twice = market_with_borrows();
        twice.accrue(BlockNumber(150), &model, exp(dec!(0.1)), max_rate()).unwrap();
        twice.accrue(BlockNumber(150), &model, exp(dec!(0.1)), max_rate()).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn backwards_block_rejected() {
        let mut state = market_with_borrows();
        let before = state.clone();
        let model = FixedRateModel::new(exp(dec!(0.001)));
        let err = state.accrue(BlockNumber(99), &model, Exp::zero(), max_rate()).unwrap_err();
        assert!(matches!(err, LendingError::BlockBehindCheckpoint { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn excessive_rate_rejected_without_mutation() {
        let mut state = market_with_borrows();
        let before = state.clone();
        let model = FixedRateModel::new(exp(dec!(0.5)));
        let err = state.accrue(BlockNumber(101), &model, Exp::zero(), max_rate()).unwrap_err();
        assert!(matches!(err, LendingError::BorrowRateTooHigh { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn exchange_rate_initial_and_computed() {
        let mut state = MarketAccrualState::new(BlockNumber(0));
        let initial = exp(dec!(0.02));
        assert_eq!(state.exchange_rate(0, initial).unwrap(), initial);

        state.cash = 500;
        state.total_borrows = 600;
        state.total_reserves = 100;
        // (500 + 600 - 100) / 2000 = 0.5
        assert_eq!(state.exchange_rate(2000, initial).unwrap(), exp(dec!(0.5)));
    }

    #[test]
    fn exchange_rate_reserves_exceeding_underlying() {
        let mut state = MarketAccrualState::new(BlockNumber(0));
        state.total_reserves = 10;
        assert_eq!(
            state.exchange_rate(1, Exp::one()).unwrap_err(),
            LendingError::ArithmeticUnderflow
        );
    }

    #[test]
    fn snapshot_balance_tracks_index() {
        let snap = BorrowSnapshot::new(1_000, exp(dec!(1.0)));
        assert_eq!(snap.balance(exp(dec!(1.05))).unwrap(), 1_050);
        assert_eq!(BorrowSnapshot::default().balance(exp(dec!(2))).unwrap(), 0);

        let later = BorrowSnapshot::new(1_000, exp(dec!(1.1)));
        assert_eq!(later.balance(exp(dec!(1.21))).unwrap(), 1_100);
    }

    #[test]
    fn utilization() {
        assert_eq!(utilization_rate(100, 0, 0).unwrap(), Exp::zero());
        assert_eq!(utilization_rate(50, 50, 0).unwrap(), exp(dec!(0.5)));
        assert_eq!(utilization_rate(60, 50, 10).unwrap(), exp(dec!(0.5)));
    }

    #[test]
    fn jump_rate_kink() {
        let model = JumpRateModel {
            base_rate_per_block: exp(dec!(0.01)),
            multiplier_per_block: exp(dec!(0.1)),
            jump_multiplier_per_block: exp(dec!(1)),
            kink: exp(dec!(0.8)),
        };
        // util 0.5: 0.5 * 0.1 + 0.01
        assert_eq!(model.borrow_rate(50, 50, 0).unwrap(), exp(dec!(0.06)));
        // util 0.9: 0.8 * 0.1 + 0.01 + 0.1 * 1
        assert_eq!(model.borrow_rate(10, 90, 0).unwrap(), exp(dec!(0.19)));
    }

    #[test]
    fn jump_rate_from_yearly() {
        let model = JumpRateModel::from_yearly(
            exp(dec!(0.02)),
            exp(dec!(0.2)),
            exp(dec!(2)),
            exp(dec!(0.8)),
            DEFAULT_BLOCKS_PER_YEAR,
        )
        .unwrap();
        assert!(model.base_rate_per_block > Exp::zero());
        assert!(model.jump_multiplier_per_block > model.multiplier_per_block);
    }

    #[test]
    fn supply_rate_scales_by_utilization() {
        let model = FixedRateModel::new(exp(dec!(0.1)));
        // util 0.5, reserve factor 0.2: 0.5 * 0.1 * 0.8
        let rate = model.supply_rate(50, 50, 0, exp(dec!(0.2))).unwrap();
        assert_eq!(rate, exp(dec!(0.04)));
    }
}
