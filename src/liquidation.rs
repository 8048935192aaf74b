//! Liquidation value conversion.
//!
//! A liquidator repays part of a borrow and receives collateral tokens worth
//! the repaid value times the liquidation incentive. The collateral token's
//! value is its underlying price times the market exchange rate; that product
//! is kept at 36 decimals so no precision is dropped before the final division.
//!
//! Part of every seizure is kept by the protocol and added to reserves.

use crate::error::{LendingError, LendingResult};
use crate::fixed_point::{exp_scale, mul_div_ceil, to_u128, Double, Exp};
use crate::oracle::PriceOracle;
use crate::types::MarketId;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Inputs to a seize computation, resolved from the oracle and the collateral market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeizePricing {
    pub price_borrowed: Exp,
    pub price_collateral: Exp,
    pub exchange_rate: Exp,
    pub liquidation_incentive: Exp,
}

impl SeizePricing {
    /// Look up both prices. Zero from the oracle means no liquidation.
    pub fn resolve(
        oracle: &dyn PriceOracle,
        borrowed: MarketId,
        collateral: MarketId,
        exchange_rate: Exp,
        liquidation_incentive: Exp,
    ) -> LendingResult<Self> {
        let price_borrowed = oracle.underlying_price(borrowed);
        if price_borrowed.is_zero() {
            return Err(LendingError::OraclePriceUnavailable(borrowed));
        }
        let price_collateral = oracle.underlying_price(collateral);
        if price_collateral.is_zero() {
            return Err(LendingError::OraclePriceUnavailable(collateral));
        }
        Ok(Self {
            price_borrowed,
            price_collateral,
            exchange_rate,
            liquidation_incentive,
        })
    }

    fn value_per_collateral_token(&self) -> LendingResult<Double> {
        Ok(Double::product(self.price_collateral, self.exchange_rate)?)
    }

    /// Collateral tokens owed for repaying `repay_amount` of the borrowed asset.
    pub fn seize_tokens(&self, repay_amount: u128) -> LendingResult<u128> {
        let amount_after_incentive = self.liquidation_incentive.mul_scalar_truncate(repay_amount)?;
        let value_after_incentive = self.price_borrowed.mul_scalar_truncate(amount_after_incentive)?;
        let per_token = self.value_per_collateral_token()?;
        if per_token.is_zero() {
            return Err(LendingError::DivisionByZero);
        }
        Ok(per_token.div_into_scalar(value_after_incentive)?)
    }

    /// Smallest repay amount that yields `seize_tokens`. Inverse of
    /// [`SeizePricing::seize_tokens`]; each truncating step is undone rounding up.
    ///
    /// Recovers the original repay amount within one unit only while one
    /// collateral token is worth no more than one unit of the borrowed asset
    /// (`price_collateral * exchange_rate <= price_borrowed`). Past that, a
    /// single seized token spans several repay units and the truncation in
    /// `seize_tokens` cannot be undone exactly.
    pub fn repay_for_seize_tokens(&self, seize_tokens: u128) -> LendingResult<u128> {
        let per_token = self.value_per_collateral_token()?;
        let double = Double::one().mantissa();
        let value = mul_div_ceil(U256::from(seize_tokens), per_token.mantissa(), double)?;
        let amount = mul_div_ceil(value, exp_scale(), self.price_borrowed.mantissa())?;
        let repay = mul_div_ceil(amount, exp_scale(), self.liquidation_incentive.mantissa())?;
        Ok(to_u128(repay)?)
    }
}

/// Max repay in one liquidation: `truncate(close_factor * borrow_balance)`.
pub fn max_repay(close_factor: Exp, borrow_balance: u128) -> LendingResult<u128> {
    Ok(close_factor.mul_scalar_truncate(borrow_balance)?)
}

/// How a seizure is divided between the liquidator and the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeizeSplit {
    pub seize_tokens: u128,
    pub liquidator_tokens: u128,
    pub protocol_tokens: u128,
    /// Underlying value of `protocol_tokens`, credited to reserves.
    pub protocol_amount: u128,
}

impl SeizeSplit {
    pub fn compute(seize_tokens: u128, protocol_share: Exp, exchange_rate: Exp) -> LendingResult<Self> {
        let protocol_tokens = protocol_share.mul_scalar_truncate(seize_tokens)?;
        let liquidator_tokens = seize_tokens
            .checked_sub(protocol_tokens)
            .ok_or(LendingError::ArithmeticUnderflow)?;
        let protocol_amount = exchange_rate.mul_scalar_truncate(protocol_tokens)?;
        Ok(Self {
            seize_tokens,
            liquidator_tokens,
            protocol_tokens,
            protocol_amount,
        })
    }
}
