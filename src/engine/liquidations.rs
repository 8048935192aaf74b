//! Liquidation detection and execution.

use super::core::Engine;
use super::results::{LiquidationResult, RepayAmount};
use crate::error::{LendingError, LendingResult};
use crate::events::{EventPayload, LiquidateBorrowEvent};
use crate::fixed_point::checked_add;
use crate::liquidation::{max_repay, SeizePricing, SeizeSplit};
use crate::types::{AccountId, GlobalAction, MarketId};

impl Engine {
    /// The borrower must be under water at the liquidation factor and the
    /// repay must stay within the close factor of the current borrow.
    pub fn liquidate_allowed(
        &self,
        borrower: AccountId,
        borrowed_market: MarketId,
        collateral_market: MarketId,
        repay_amount: u128,
    ) -> LendingResult<()> {
        self.registry.market(borrowed_market)?;
        self.registry.market(collateral_market)?;

        let liquidity = self.evaluate_liquidity(borrower, None)?;
        if !liquidity.is_liquidatable() {
            return Err(LendingError::InsufficientShortfallForLiquidation(borrower));
        }

        let borrow_balance = self.ledger(borrowed_market)?.borrow_balance_stored(borrower)?;
        let max = max_repay(self.registry.risk().close_factor, borrow_balance)?;
        if repay_amount > max {
            return Err(LendingError::RepayExceedsCloseFactorLimit {
                requested: repay_amount,
                max,
            });
        }
        Ok(())
    }

    pub fn seize_allowed(&self, collateral_market: MarketId, borrowed_market: MarketId) -> LendingResult<()> {
        self.registry.check_global(GlobalAction::Seize)?;
        self.registry.market(collateral_market)?;
        self.registry.market(borrowed_market)?;
        Ok(())
    }

    /// Repay part of `borrower`'s debt in `borrowed_market` and take collateral
    /// tokens from `collateral_market` at the liquidation incentive.
    pub fn liquidate_borrow(
        &mut self,
        liquidator: AccountId,
        borrower: AccountId,
        borrowed_market: MarketId,
        repay_amount: u128,
        collateral_market: MarketId,
    ) -> LendingResult<LiquidationResult> {
        self.transact(|engine| {
            engine.accrue_market(borrowed_market)?;
            if collateral_market != borrowed_market {
                engine.accrue_market(collateral_market)?;
            }

            if liquidator == borrower {
                return Err(LendingError::LiquidatorIsBorrower);
            }
            if repay_amount == 0 {
                return Err(LendingError::ZeroAmount);
            }
            engine.liquidate_allowed(borrower, borrowed_market, collateral_market, repay_amount)?;

            let repay = engine.repay_fresh(liquidator, borrower, borrowed_market, RepayAmount::Exact(repay_amount))?;

            let exchange_rate = engine.exchange_rate_stored(collateral_market)?;
            let pricing = SeizePricing::resolve(
                engine.oracle.as_ref(),
                borrowed_market,
                collateral_market,
                exchange_rate,
                engine.registry.risk().liquidation_incentive,
            )?;
            let seize_tokens = pricing.seize_tokens(repay.repaid)?;

            let available = engine.ledger(collateral_market)?.token_balance(borrower);
            if seize_tokens > available {
                return Err(LendingError::InsufficientBalance {
                    requested: seize_tokens,
                    available,
                });
            }

            let split = engine.seize(liquidator, borrower, collateral_market, borrowed_market, seize_tokens)?;

            tracing::debug!(
                %liquidator,
                %borrower,
                %borrowed_market,
                %collateral_market,
                repaid = repay.repaid,
                seize_tokens,
                "liquidated borrow"
            );
            engine.emit_event(EventPayload::LiquidateBorrow(LiquidateBorrowEvent {
                liquidator,
                borrower,
                borrowed_market,
                collateral_market,
                repay_amount: repay.repaid,
                seize_tokens,
                protocol_tokens: split.protocol_tokens,
            }));

            Ok(LiquidationResult {
                borrower,
                liquidator,
                borrowed_market,
                collateral_market,
                repaid: repay.repaid,
                seize_tokens,
                liquidator_tokens: split.liquidator_tokens,
                protocol_tokens: split.protocol_tokens,
                protocol_amount: split.protocol_amount,
            })
        })
    }

    // move collateral tokens to the liquidator, burning the protocol's cut into reserves
    fn seize(
        &mut self,
        liquidator: AccountId,
        borrower: AccountId,
        collateral_market: MarketId,
        borrowed_market: MarketId,
        seize_tokens: u128,
    ) -> LendingResult<SeizeSplit> {
        self.seize_allowed(collateral_market, borrowed_market)?;

        let exchange_rate = self.exchange_rate_stored(collateral_market)?;
        let split = SeizeSplit::compute(seize_tokens, self.config.protocol_seize_share, exchange_rate)?;

        let ledger = self.ledger_mut(collateral_market)?;
        ledger.debit(borrower, seize_tokens)?;
        ledger.credit(liquidator, split.liquidator_tokens)?;
        ledger.total_supply = ledger
            .total_supply
            .checked_sub(split.protocol_tokens)
            .ok_or(LendingError::ArithmeticUnderflow)?;
        ledger.accrual.total_reserves = checked_add(ledger.accrual.total_reserves, split.protocol_amount)?;

        Ok(split)
    }
}
