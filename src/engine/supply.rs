//! Supply side: minting, redeeming, token transfers and market membership.

use super::core::Engine;
use super::results::{RedeemResult, SupplyResult};
use crate::error::{LendingError, LendingResult};
use crate::events::{EventPayload, MembershipEvent, MintEvent, RedeemEvent, TransferEvent};
use crate::fixed_point::checked_add;
use crate::liquidity::Hypothetical;
use crate::types::{AccountId, GlobalAction, MarketAction, MarketId};

// which side of a redeem the caller fixed
#[derive(Debug, Clone, Copy)]
enum RedeemInput {
    Tokens(u128),
    Underlying(u128),
}

impl Engine {
    // 8.6: guards

    pub fn supply_allowed(&self, market_id: MarketId) -> LendingResult<()> {
        self.registry.check_action(market_id, MarketAction::Supply)?;
        Ok(())
    }

    /// Redeeming from a market the account never entered cannot hurt its
    /// liquidity, so only listing is checked then.
    pub fn redeem_allowed(&self, account: AccountId, market_id: MarketId, redeem_tokens: u128) -> LendingResult<()> {
        self.registry.market(market_id)?;
        if !self.memberships.contains(account, market_id) {
            return Ok(());
        }
        self.evaluate_liquidity(account, Some(Hypothetical::redeem(market_id, redeem_tokens)))?
            .require_no_shortfall()
    }

    pub fn transfer_allowed(&self, src: AccountId, market_id: MarketId, tokens: u128) -> LendingResult<()> {
        self.registry.check_global(GlobalAction::Transfer)?;
        self.redeem_allowed(src, market_id, tokens)
    }

    // 8.7: actions

    /// Deposit `amount` of underlying and mint market tokens at the fresh exchange rate.
    pub fn supply(&mut self, account: AccountId, market_id: MarketId, amount: u128) -> LendingResult<SupplyResult> {
        self.transact(|engine| {
            engine.accrue_market(market_id)?;
            engine.supply_allowed(market_id)?;
            if amount == 0 {
                return Err(LendingError::ZeroAmount);
            }

            let exchange_rate = engine.exchange_rate_stored(market_id)?;
            let minted_tokens = exchange_rate.div_into_scalar(amount)?;
            // a deposit worth less than one token would be donated to the pool
            if minted_tokens == 0 {
                return Err(LendingError::ZeroAmount);
            }

            let ledger = engine.ledger_mut(market_id)?;
            ledger.accrual.cash = checked_add(ledger.accrual.cash, amount)?;
            ledger.mint(account, minted_tokens)?;

            tracing::debug!(%account, %market_id, amount, minted_tokens, "supply");
            engine.emit_event(EventPayload::Mint(MintEvent {
                market_id,
                account_id: account,
                amount,
                tokens: minted_tokens,
            }));
            Ok(SupplyResult {
                amount,
                minted_tokens,
                exchange_rate,
            })
        })
    }

    /// Burn `tokens` market tokens for underlying.
    pub fn redeem(&mut self, account: AccountId, market_id: MarketId, tokens: u128) -> LendingResult<RedeemResult> {
        self.transact(|engine| engine.redeem_fresh(account, market_id, RedeemInput::Tokens(tokens)))
    }

    /// Burn however many tokens `amount` of underlying is worth.
    pub fn redeem_underlying(
        &mut self,
        account: AccountId,
        market_id: MarketId,
        amount: u128,
    ) -> LendingResult<RedeemResult> {
        self.transact(|engine| engine.redeem_fresh(account, market_id, RedeemInput::Underlying(amount)))
    }

    fn redeem_fresh(&mut self, account: AccountId, market_id: MarketId, input: RedeemInput) -> LendingResult<RedeemResult> {
        self.accrue_market(market_id)?;
        let exchange_rate = self.exchange_rate_stored(market_id)?;
        let (redeemed_tokens, amount) = match input {
            RedeemInput::Tokens(tokens) => (tokens, exchange_rate.mul_scalar_truncate(tokens)?),
            // burn rounds up so the pool never pays out more than the tokens are worth
            RedeemInput::Underlying(amount) => (exchange_rate.div_into_scalar_ceil(amount)?, amount),
        };
        if redeemed_tokens == 0 {
            return Err(LendingError::ZeroAmount);
        }
        let available = self.ledger(market_id)?.token_balance(account);
        if redeemed_tokens > available {
            return Err(LendingError::InsufficientBalance {
                requested: redeemed_tokens,
                available,
            });
        }

        self.redeem_allowed(account, market_id, redeemed_tokens)?;

        let ledger = self.ledger_mut(market_id)?;
        if amount > ledger.accrual.cash {
            return Err(LendingError::InsufficientCash {
                market: market_id,
                requested: amount,
                available: ledger.accrual.cash,
            });
        }
        ledger.burn(account, redeemed_tokens)?;
        ledger.accrual.cash -= amount;

        tracing::debug!(%account, %market_id, amount, redeemed_tokens, "redeem");
        self.emit_event(EventPayload::Redeem(RedeemEvent {
            market_id,
            account_id: account,
            amount,
            tokens: redeemed_tokens,
        }));
        Ok(RedeemResult {
            amount,
            redeemed_tokens,
            exchange_rate,
        })
    }

    /// Move market tokens between accounts. Subject to the same liquidity
    /// check as redeeming them.
    pub fn transfer_tokens(
        &mut self,
        src: AccountId,
        dst: AccountId,
        market_id: MarketId,
        tokens: u128,
    ) -> LendingResult<()> {
        self.transact(|engine| {
            if src == dst {
                return Err(LendingError::SelfTransfer);
            }
            if tokens == 0 {
                return Err(LendingError::ZeroAmount);
            }
            engine.transfer_allowed(src, market_id, tokens)?;

            let ledger = engine.ledger_mut(market_id)?;
            ledger.debit(src, tokens)?;
            ledger.credit(dst, tokens)?;

            engine.emit_event(EventPayload::Transfer(TransferEvent {
                market_id,
                from: src,
                to: dst,
                tokens,
            }));
            Ok(())
        })
    }

    // 8.8: membership

    /// Count these markets toward the account's liquidity. Returns the
    /// markets that were newly entered.
    pub fn enter_markets(&mut self, account: AccountId, markets: &[MarketId]) -> LendingResult<Vec<MarketId>> {
        self.transact(|engine| {
            let mut entered = Vec::new();
            for &market_id in markets {
                if engine.enter_market(account, market_id)? {
                    entered.push(market_id);
                }
            }
            Ok(entered)
        })
    }

    pub(super) fn enter_market(&mut self, account: AccountId, market_id: MarketId) -> LendingResult<bool> {
        self.registry.market(market_id)?;
        if !self.enter_membership(account, market_id) {
            return Ok(false);
        }
        self.emit_event(EventPayload::MarketEntered(MembershipEvent {
            market_id,
            account_id: account,
        }));
        Ok(true)
    }

    /// Stop counting a market. The account must hold no tokens and owe
    /// nothing there. Returns false if it was not a member.
    pub fn exit_market(&mut self, account: AccountId, market_id: MarketId) -> LendingResult<bool> {
        self.transact(|engine| {
            if !engine.memberships.contains(account, market_id) {
                return Ok(false);
            }
            let ledger = engine.ledger(market_id)?;
            if ledger.borrow_balance_stored(account)? != 0 {
                return Err(LendingError::NonzeroBorrowBalance { account, market: market_id });
            }
            let tokens = ledger.token_balance(account);
            if tokens != 0 {
                return Err(LendingError::NonzeroCollateralBalance { account, market: market_id });
            }
            engine.redeem_allowed(account, market_id, tokens)?;

            engine.exit_membership(account, market_id);
            engine.emit_event(EventPayload::MarketExited(MembershipEvent {
                market_id,
                account_id: account,
            }));
            Ok(true)
        })
    }
}
