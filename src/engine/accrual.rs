//! Interest accrual entry points and the "current" queries that accrue first.

use super::core::Engine;
use crate::error::LendingResult;
use crate::events::{EventPayload, InterestAccruedEvent};
use crate::fixed_point::Exp;
use crate::interest::AccrualOutcome;
use crate::types::{AccountId, MarketId};

impl Engine {
    /// Bring one market's borrows, reserves and index up to the current block.
    pub fn accrue_interest(&mut self, market_id: MarketId) -> LendingResult<AccrualOutcome> {
        self.transact(|engine| engine.accrue_market(market_id))
    }

    pub(super) fn accrue_market(&mut self, market_id: MarketId) -> LendingResult<AccrualOutcome> {
        let current = self.current_block;
        let max_rate = self.config.max_borrow_rate_per_block;
        let ledger = self.ledger_mut(market_id)?;
        let cash_prior = ledger.accrual.cash;
        let outcome = ledger.accrue(current, max_rate)?;

        if outcome.blocks_elapsed > 0 {
            self.emit_event(EventPayload::InterestAccrued(InterestAccruedEvent {
                market_id,
                cash_prior,
                interest_accumulated: outcome.interest_accumulated,
                borrow_index: outcome.borrow_index,
                total_borrows: outcome.total_borrows,
            }));
        }
        Ok(outcome)
    }

    pub fn borrow_balance_current(&mut self, account: AccountId, market_id: MarketId) -> LendingResult<u128> {
        self.transact(|engine| {
            engine.accrue_market(market_id)?;
            engine.ledger(market_id)?.borrow_balance_stored(account)
        })
    }

    pub fn exchange_rate_current(&mut self, market_id: MarketId) -> LendingResult<Exp> {
        self.transact(|engine| {
            engine.accrue_market(market_id)?;
            engine.exchange_rate_stored(market_id)
        })
    }

    /// Underlying value of an account's market tokens, at a fresh exchange rate.
    pub fn balance_of_underlying(&mut self, account: AccountId, market_id: MarketId) -> LendingResult<u128> {
        self.transact(|engine| {
            engine.accrue_market(market_id)?;
            let rate = engine.exchange_rate_stored(market_id)?;
            let tokens = engine.ledger(market_id)?.token_balance(account);
            Ok(rate.mul_scalar_truncate(tokens)?)
        })
    }
}
