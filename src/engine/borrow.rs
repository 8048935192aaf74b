//! Borrow side: borrowing, repaying and the guards in front of them.

use super::core::Engine;
use super::results::{BorrowResult, RepayAmount, RepayResult};
use crate::error::{LendingError, LendingResult};
use crate::events::{BorrowEvent, EventPayload, RepayBorrowEvent};
use crate::fixed_point::checked_add;
use crate::liquidity::Hypothetical;
use crate::types::{AccountId, MarketAction, MarketId};

impl Engine {
    // 8.9: guards

    /// Checks a borrow and enters the market for `account` if it is not a
    /// member yet. The entry persists only if the borrow check passes.
    pub fn borrow_allowed(&mut self, account: AccountId, market_id: MarketId, amount: u128) -> LendingResult<()> {
        self.transact(|engine| engine.check_borrow(account, market_id, amount))
    }

    pub(super) fn check_borrow(&mut self, account: AccountId, market_id: MarketId, amount: u128) -> LendingResult<()> {
        let market = self.registry.check_action(market_id, MarketAction::Borrow)?;
        let borrow_cap = market.borrow_cap;

        if !self.memberships.contains(account, market_id) {
            tracing::debug!(%account, %market_id, "entering market on first borrow");
            self.enter_market(account, market_id)?;
        }

        if self.oracle.underlying_price(market_id).is_zero() {
            return Err(LendingError::OraclePriceUnavailable(market_id));
        }

        if let Some(cap) = borrow_cap {
            let next_total = checked_add(self.ledger(market_id)?.accrual.total_borrows, amount)?;
            if next_total > cap {
                return Err(LendingError::BorrowCapReached { market: market_id, cap });
            }
        }

        self.evaluate_liquidity(account, Some(Hypothetical::borrow(market_id, amount)))?
            .require_no_shortfall()
    }

    pub fn repay_allowed(&self, market_id: MarketId) -> LendingResult<()> {
        self.registry.market(market_id)?;
        Ok(())
    }

    // 8.10: actions

    pub fn borrow(&mut self, account: AccountId, market_id: MarketId, amount: u128) -> LendingResult<BorrowResult> {
        self.transact(|engine| {
            engine.accrue_market(market_id)?;
            if amount == 0 {
                return Err(LendingError::ZeroAmount);
            }
            engine.check_borrow(account, market_id, amount)?;

            let ledger = engine.ledger_mut(market_id)?;
            if amount > ledger.accrual.cash {
                return Err(LendingError::InsufficientCash {
                    market: market_id,
                    requested: amount,
                    available: ledger.accrual.cash,
                });
            }
            let account_borrows = checked_add(ledger.borrow_balance_stored(account)?, amount)?;
            let total_borrows = checked_add(ledger.accrual.total_borrows, amount)?;
            ledger.set_borrow(account, account_borrows);
            ledger.accrual.total_borrows = total_borrows;
            ledger.accrual.cash -= amount;

            tracing::debug!(%account, %market_id, amount, account_borrows, "borrow");
            engine.emit_event(EventPayload::Borrow(BorrowEvent {
                market_id,
                account_id: account,
                amount,
                account_borrows,
                total_borrows,
            }));
            Ok(BorrowResult {
                amount,
                account_borrows,
                total_borrows,
            })
        })
    }

    pub fn repay_borrow(&mut self, account: AccountId, market_id: MarketId, amount: RepayAmount) -> LendingResult<RepayResult> {
        self.repay_borrow_behalf(account, account, market_id, amount)
    }

    /// `payer` covers `borrower`'s debt.
    pub fn repay_borrow_behalf(
        &mut self,
        payer: AccountId,
        borrower: AccountId,
        market_id: MarketId,
        amount: RepayAmount,
    ) -> LendingResult<RepayResult> {
        self.transact(|engine| {
            engine.accrue_market(market_id)?;
            engine.repay_fresh(payer, borrower, market_id, amount)
        })
    }

    /// Repay against an already accrued market.
    pub(super) fn repay_fresh(
        &mut self,
        payer: AccountId,
        borrower: AccountId,
        market_id: MarketId,
        amount: RepayAmount,
    ) -> LendingResult<RepayResult> {
        self.repay_allowed(market_id)?;

        let ledger = self.ledger_mut(market_id)?;
        let balance = ledger.borrow_balance_stored(borrower)?;
        let repaid = match amount {
            RepayAmount::Max => balance,
            RepayAmount::Exact(value) => value,
        };
        if repaid == 0 {
            return Err(LendingError::ZeroAmount);
        }
        let account_borrows = balance
            .checked_sub(repaid)
            .ok_or(LendingError::ArithmeticUnderflow)?;
        // each account's balance rounds on its own, the total may trail by dust
        let total_borrows = ledger.accrual.total_borrows.saturating_sub(repaid);

        ledger.accrual.cash = checked_add(ledger.accrual.cash, repaid)?;
        ledger.accrual.total_borrows = total_borrows;
        ledger.set_borrow(borrower, account_borrows);

        tracing::debug!(%payer, %borrower, %market_id, repaid, account_borrows, "repay");
        self.emit_event(EventPayload::RepayBorrow(RepayBorrowEvent {
            market_id,
            payer,
            borrower,
            amount: repaid,
            account_borrows,
            total_borrows,
        }));
        Ok(RepayResult {
            repaid,
            account_borrows,
            total_borrows,
        })
    }
}
