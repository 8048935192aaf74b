// 7.0: token accounting for one market. balances are in market tokens, borrows
// are stored as snapshots against the market's borrow index. cash, borrows and
// reserves live in the accrual state so one accrual moves them together.

use crate::error::{LendingError, LendingResult};
use crate::fixed_point::{checked_add, checked_sub, Exp};
use crate::interest::{AccrualOutcome, BorrowSnapshot, InterestRateModel, MarketAccrualState};
use crate::liquidity::AccountSnapshot;
use crate::types::{AccountId, BlockNumber, MarketId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MarketLedger {
    pub id: MarketId,
    pub accrual: MarketAccrualState,
    pub reserve_factor: Exp,
    pub rate_model: Arc<dyn InterestRateModel>,
    pub total_supply: u128,
    balances: HashMap<AccountId, u128>,
    borrows: HashMap<AccountId, BorrowSnapshot>,
    journal: Option<Journal>,
}

// prior value of one account entry, replayed in reverse on rollback
#[derive(Debug, Clone)]
enum Undo {
    Balance(AccountId, Option<u128>),
    Borrow(AccountId, Option<BorrowSnapshot>),
}

// market-wide scalars as they were when the journal opened
#[derive(Debug, Clone)]
struct Journal {
    accrual: MarketAccrualState,
    reserve_factor: Exp,
    rate_model: Arc<dyn InterestRateModel>,
    total_supply: u128,
    undo: Vec<Undo>,
}

impl MarketLedger {
    pub fn new(id: MarketId, block: BlockNumber, rate_model: Arc<dyn InterestRateModel>) -> Self {
        Self {
            id,
            accrual: MarketAccrualState::new(block),
            reserve_factor: Exp::zero(),
            rate_model,
            total_supply: 0,
            balances: HashMap::new(),
            borrows: HashMap::new(),
            journal: None,
        }
    }

    // 7.2: undo journal. rollback cost scales with the writes made, not the number of holders.

    /// Start recording. Returns false if a journal is already open.
    pub fn begin_journal(&mut self) -> bool {
        if self.journal.is_some() {
            return false;
        }
        self.journal = Some(Journal {
            accrual: self.accrual.clone(),
            reserve_factor: self.reserve_factor,
            rate_model: Arc::clone(&self.rate_model),
            total_supply: self.total_supply,
            undo: Vec::new(),
        });
        true
    }

    pub fn commit_journal(&mut self) {
        self.journal = None;
    }

    /// Put back everything written since `begin_journal`.
    pub fn rollback_journal(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        for undo in journal.undo.into_iter().rev() {
            match undo {
                Undo::Balance(account, Some(balance)) => {
                    self.balances.insert(account, balance);
                }
                Undo::Balance(account, None) => {
                    self.balances.remove(&account);
                }
                Undo::Borrow(account, Some(snapshot)) => {
                    self.borrows.insert(account, snapshot);
                }
                Undo::Borrow(account, None) => {
                    self.borrows.remove(&account);
                }
            }
        }
        self.accrual = journal.accrual;
        self.reserve_factor = journal.reserve_factor;
        self.rate_model = journal.rate_model;
        self.total_supply = journal.total_supply;
    }

    fn record_balance(&mut self, account: AccountId) {
        if let Some(journal) = self.journal.as_mut() {
            journal.undo.push(Undo::Balance(account, self.balances.get(&account).copied()));
        }
    }

    fn record_borrow(&mut self, account: AccountId) {
        if let Some(journal) = self.journal.as_mut() {
            journal.undo.push(Undo::Borrow(account, self.borrows.get(&account).copied()));
        }
    }

    pub fn accrue(&mut self, current: BlockNumber, max_borrow_rate: Exp) -> LendingResult<AccrualOutcome> {
        let model = Arc::clone(&self.rate_model);
        self.accrual
            .accrue(current, model.as_ref(), self.reserve_factor, max_borrow_rate)
    }

    pub fn token_balance(&self, account: AccountId) -> u128 {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    pub fn borrow_snapshot(&self, account: AccountId) -> Option<BorrowSnapshot> {
        self.borrows.get(&account).copied()
    }

    /// Borrow balance at the last accrual checkpoint.
    pub fn borrow_balance_stored(&self, account: AccountId) -> LendingResult<u128> {
        match self.borrows.get(&account) {
            Some(snapshot) => snapshot.balance(self.accrual.borrow_index),
            None => Ok(0),
        }
    }

    pub fn exchange_rate_stored(&self, initial_rate: Exp) -> LendingResult<Exp> {
        self.accrual.exchange_rate(self.total_supply, initial_rate)
    }

    pub fn account_snapshot(&self, account: AccountId, initial_rate: Exp) -> LendingResult<AccountSnapshot> {
        Ok(AccountSnapshot {
            token_balance: self.token_balance(account),
            borrow_balance: self.borrow_balance_stored(account)?,
            exchange_rate: self.exchange_rate_stored(initial_rate)?,
        })
    }

    // 7.1: token movements

    pub fn mint(&mut self, account: AccountId, tokens: u128) -> LendingResult<()> {
        self.total_supply = checked_add(self.total_supply, tokens)?;
        self.credit(account, tokens)
    }

    pub fn burn(&mut self, account: AccountId, tokens: u128) -> LendingResult<()> {
        self.debit(account, tokens)?;
        self.total_supply = checked_sub(self.total_supply, tokens)?;
        Ok(())
    }

    pub fn credit(&mut self, account: AccountId, tokens: u128) -> LendingResult<()> {
        self.record_balance(account);
        let balance = self.balances.entry(account).or_insert(0);
        *balance = checked_add(*balance, tokens)?;
        Ok(())
    }

    pub fn debit(&mut self, account: AccountId, tokens: u128) -> LendingResult<()> {
        let available = self.token_balance(account);
        if tokens > available {
            return Err(LendingError::InsufficientBalance {
                requested: tokens,
                available,
            });
        }
        let remaining = available - tokens;
        self.record_balance(account);
        if remaining == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, remaining);
        }
        Ok(())
    }

    /// Rewrite an account's borrow at the current index. Zero clears it.
    pub fn set_borrow(&mut self, account: AccountId, principal: u128) {
        self.record_borrow(account);
        if principal == 0 {
            self.borrows.remove(&account);
        } else {
            self.borrows
                .insert(account, BorrowSnapshot::new(principal, self.accrual.borrow_index));
        }
    }

    pub fn holders(&self) -> usize {
        self.balances.len()
    }

    pub fn borrowers(&self) -> usize {
        self.borrows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interest::FixedRateModel;
    use rust_decimal_macros::dec;

    fn ledger() -> MarketLedger {
        let model = FixedRateModel::new(Exp::from_decimal(dec!(0.01)).unwrap());
        MarketLedger::new(MarketId(1), BlockNumber(0), Arc::new(model))
    }

    #[test]
    fn mint_and_burn_track_supply() {
        let mut l = ledger();
        l.mint(AccountId(1), 100).unwrap();
        l.mint(AccountId(2), 50).unwrap();
        assert_eq!(l.total_supply, 150);

        l.burn(AccountId(1), 100).unwrap();
        assert_eq!(l.token_balance(AccountId(1)), 0);
        assert_eq!(l.holders(), 1);
        assert_eq!(l.total_supply, 50);
    }

    #[test]
    fn debit_beyond_balance_fails() {
        let mut l = ledger();
        l.credit(AccountId(1), 10).unwrap();
        let err = l.debit(AccountId(1), 11).unwrap_err();
        assert_eq!(err, LendingError::InsufficientBalance { requested: 11, available: 10 });
        assert_eq!(l.token_balance(AccountId(1)), 10);
    }

    #[test]
    fn borrow_balance_follows_index() {
        let mut l = ledger();
        l.accrual.cash = 1_000;
        l.accrual.total_borrows = 100;
        l.set_borrow(AccountId(1), 100);

        // 10 blocks at 1% per block
        l.accrue(BlockNumber(10), Exp::one()).unwrap();
        assert_eq!(l.accrual.borrow_index, Exp::from_decimal(dec!(1.1)).unwrap());
        assert_eq!(l.borrow_balance_stored(AccountId(1)).unwrap(), 110);
        assert_eq!(l.accrual.total_borrows, 110);

        l.set_borrow(AccountId(1), 0);
        assert!(l.borrow_snapshot(AccountId(1)).is_none());
        assert_eq!(l.borrowers(), 0);
    }

    #[test]
    fn rollback_replays_writes_in_reverse() {
        let mut l = ledger();
        l.mint(AccountId(1), 100).unwrap();
        l.set_borrow(AccountId(2), 40);
        l.accrual.cash = 60;

        assert!(l.begin_journal());
        assert!(!l.begin_journal());
        l.mint(AccountId(1), 5).unwrap();
        l.mint(AccountId(3), 7).unwrap();
        l.burn(AccountId(1), 105).unwrap();
        l.set_borrow(AccountId(2), 0);
        l.set_borrow(AccountId(4), 9);
        l.accrual.cash = 0;
        l.reserve_factor = Exp::one();
        l.rollback_journal();

        assert_eq!(l.token_balance(AccountId(1)), 100);
        assert_eq!(l.token_balance(AccountId(3)), 0);
        assert_eq!(l.holders(), 1);
        assert_eq!(l.total_supply, 100);
        assert_eq!(l.borrow_balance_stored(AccountId(2)).unwrap(), 40);
        assert!(l.borrow_snapshot(AccountId(4)).is_none());
        assert_eq!(l.accrual.cash, 60);
        assert_eq!(l.reserve_factor, Exp::zero());
    }

    #[test]
    fn commit_keeps_writes() {
        let mut l = ledger();
        l.begin_journal();
        l.mint(AccountId(1), 10).unwrap();
        l.commit_journal();
        l.rollback_journal();
        assert_eq!(l.token_balance(AccountId(1)), 10);
        assert_eq!(l.total_supply, 10);
    }

    #[test]
    fn exchange_rate_starts_at_initial() {
        let mut l = ledger();
        let initial = Exp::from_decimal(dec!(0.02)).unwrap();
        assert_eq!(l.exchange_rate_stored(initial).unwrap(), initial);

        l.accrual.cash = 100;
        l.mint(AccountId(1), 5_000).unwrap();
        assert_eq!(l.exchange_rate_stored(initial).unwrap(), initial);
    }
}
