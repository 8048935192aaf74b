// 8.0 engine/core.rs: main engine. holds the registry, every market ledger,
// account memberships and the event log. every mutating entry point runs
// inside `transact`, which holds the reentrancy guard and journals what the
// operation touches so a failure part way can be undone.

use super::config::EngineConfig;
use super::guard::ReentrancyGuard;
use super::results::MarketSnapshot;
use crate::error::{LendingError, LendingResult};
use crate::events::{Event, EventId, EventPayload};
use crate::fixed_point::Exp;
use crate::ledger::MarketLedger;
use crate::liquidity::{
    AccountLiquidity, AccountSnapshot, AccountSnapshotProvider, Hypothetical, LiquidityContext,
};
use crate::market::{MarketParams, MarketRegistry};
use crate::membership::{MarketSet, Memberships};
use crate::oracle::{GovernanceToken, PriceOracle};
use crate::types::{AccountId, BlockNumber, MarketId};
use std::collections::HashMap;
use std::sync::Arc;

/** 8.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) registry: MarketRegistry,
    pub(super) ledgers: HashMap<MarketId, MarketLedger>,
    pub(super) memberships: Memberships,
    pub(super) oracle: Arc<dyn PriceOracle>,
    pub(super) governance: Option<Arc<dyn GovernanceToken>>,
    pub(super) events: Vec<Event>,
    pub(super) pending_events: Vec<EventPayload>,
    pub(super) next_event_id: u64,
    pub(super) current_block: BlockNumber,
    pub(super) guard: ReentrancyGuard,
    checkpoint: Option<Checkpoint>,
}

// what the running operation touched. ledgers hold their own undo journals;
// the registry is per-market params only, so it is copied whole.
#[derive(Debug)]
struct Checkpoint {
    registry: MarketRegistry,
    ledgers: Vec<MarketId>,
    memberships: HashMap<AccountId, Option<MarketSet>>,
}

impl Engine {
    pub fn new(config: EngineConfig, oracle: Arc<dyn PriceOracle>) -> LendingResult<Self> {
        config.validate()?;
        let registry = MarketRegistry::new(config.risk.clone())?;
        Ok(Self {
            config,
            registry,
            ledgers: HashMap::new(),
            memberships: Memberships::new(),
            oracle,
            governance: None,
            events: Vec::new(),
            pending_events: Vec::new(),
            next_event_id: 1,
            current_block: BlockNumber::default(),
            guard: ReentrancyGuard::new(),
            checkpoint: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_block(&mut self, block: BlockNumber) {
        self.current_block = block;
    }

    pub fn block(&self) -> BlockNumber {
        self.current_block
    }

    pub fn advance_blocks(&mut self, blocks: u64) {
        self.current_block = self.current_block.advance(blocks);
    }

    // 8.2: lookups

    pub fn registry(&self) -> &MarketRegistry {
        &self.registry
    }

    pub fn market(&self, market_id: MarketId) -> LendingResult<&MarketParams> {
        self.registry.market(market_id)
    }

    pub fn ledger(&self, market_id: MarketId) -> LendingResult<&MarketLedger> {
        self.ledgers
            .get(&market_id)
            .ok_or(LendingError::MarketNotListed(market_id))
    }

    /// Inside `transact` the first mutable borrow of a ledger opens its journal.
    pub(super) fn ledger_mut(&mut self, market_id: MarketId) -> LendingResult<&mut MarketLedger> {
        let ledger = self
            .ledgers
            .get_mut(&market_id)
            .ok_or(LendingError::MarketNotListed(market_id))?;
        if let Some(checkpoint) = self.checkpoint.as_mut() {
            if ledger.begin_journal() {
                checkpoint.ledgers.push(market_id);
            }
        }
        Ok(ledger)
    }

    pub(super) fn enter_membership(&mut self, account: AccountId, market_id: MarketId) -> bool {
        self.record_membership(account);
        self.memberships.enter(account, market_id)
    }

    pub(super) fn exit_membership(&mut self, account: AccountId, market_id: MarketId) -> bool {
        self.record_membership(account);
        self.memberships.exit(account, market_id)
    }

    fn record_membership(&mut self, account: AccountId) {
        if let Some(checkpoint) = self.checkpoint.as_mut() {
            let memberships = &self.memberships;
            checkpoint
                .memberships
                .entry(account)
                .or_insert_with(|| memberships.markets_of(account).cloned());
        }
    }

    pub fn assets_in(&self, account: AccountId) -> Vec<MarketId> {
        self.memberships.assets_in(account)
    }

    pub fn check_membership(&self, account: AccountId, market_id: MarketId) -> bool {
        self.memberships.contains(account, market_id)
    }

    /// Market token balance.
    pub fn balance_of(&self, account: AccountId, market_id: MarketId) -> LendingResult<u128> {
        Ok(self.ledger(market_id)?.token_balance(account))
    }

    pub fn borrow_balance_stored(&self, account: AccountId, market_id: MarketId) -> LendingResult<u128> {
        self.ledger(market_id)?.borrow_balance_stored(account)
    }

    pub fn exchange_rate_stored(&self, market_id: MarketId) -> LendingResult<Exp> {
        self.ledger(market_id)?
            .exchange_rate_stored(self.config.initial_exchange_rate)
    }

    pub fn market_snapshot(&self, market_id: MarketId) -> LendingResult<MarketSnapshot> {
        let ledger = self.ledger(market_id)?;
        let state = &ledger.accrual;
        let model = ledger.rate_model.as_ref();
        Ok(MarketSnapshot {
            market_id,
            cash: state.cash,
            total_borrows: state.total_borrows,
            total_reserves: state.total_reserves,
            total_supply: ledger.total_supply,
            borrow_index: state.borrow_index,
            exchange_rate: ledger.exchange_rate_stored(self.config.initial_exchange_rate)?,
            accrual_block: state.accrual_block,
            borrow_rate: model.borrow_rate(state.cash, state.total_borrows, state.total_reserves)?,
            supply_rate: model.supply_rate(
                state.cash,
                state.total_borrows,
                state.total_reserves,
                ledger.reserve_factor,
            )?,
            reserve_factor: ledger.reserve_factor,
        })
    }

    // 8.3: liquidity queries. read stored balances; callers accrue first when it matters.

    pub(super) fn liquidity_context(&self) -> LiquidityContext<'_> {
        LiquidityContext {
            registry: &self.registry,
            oracle: self.oracle.as_ref(),
            snapshots: self,
            governance: self.governance.as_deref(),
        }
    }

    pub(super) fn evaluate_liquidity(
        &self,
        account: AccountId,
        hypothetical: Option<Hypothetical>,
    ) -> LendingResult<AccountLiquidity> {
        let entered = self
            .memberships
            .markets_of(account)
            .into_iter()
            .flat_map(MarketSet::iter);
        self.liquidity_context().evaluate(account, entered, hypothetical)
    }

    pub fn account_liquidity(&self, account: AccountId) -> LendingResult<AccountLiquidity> {
        self.evaluate_liquidity(account, None)
    }

    pub fn hypothetical_account_liquidity(
        &self,
        account: AccountId,
        hypothetical: Hypothetical,
    ) -> LendingResult<AccountLiquidity> {
        self.evaluate_liquidity(account, Some(hypothetical))
    }

    // 8.4: events

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        self.pending_events.push(payload);
    }

    fn commit_events(&mut self) {
        for payload in std::mem::take(&mut self.pending_events) {
            let event = Event::new(EventId(self.next_event_id), self.current_block, payload);
            self.next_event_id += 1;
            self.events.push(event);
        }

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }

    // 8.5: atomic execution

    /// Run `op` with the guard held. On error every registry, ledger and
    /// membership change `op` made is reverted and its events are dropped.
    pub(crate) fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> LendingResult<T>,
    ) -> LendingResult<T> {
        let _lock = self.guard.enter()?;
        self.checkpoint = Some(Checkpoint {
            registry: self.registry.clone(),
            ledgers: Vec::new(),
            memberships: HashMap::new(),
        });

        let result = op(self);
        let Some(checkpoint) = self.checkpoint.take() else {
            return result;
        };
        match result {
            Ok(value) => {
                for market_id in &checkpoint.ledgers {
                    if let Some(ledger) = self.ledgers.get_mut(market_id) {
                        ledger.commit_journal();
                    }
                }
                self.commit_events();
                Ok(value)
            }
            Err(err) => {
                self.rollback(checkpoint);
                tracing::warn!(error = %err, block = %self.current_block, "operation rolled back");
                Err(err)
            }
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        for market_id in &checkpoint.ledgers {
            if let Some(ledger) = self.ledgers.get_mut(market_id) {
                ledger.rollback_journal();
            }
        }
        self.registry = checkpoint.registry;
        // drop ledgers for markets listed by the failed operation
        let registry = &self.registry;
        self.ledgers.retain(|market_id, _| registry.market(*market_id).is_ok());
        for (account, set) in checkpoint.memberships {
            self.memberships.restore(account, set);
        }
        self.pending_events.clear();
    }
}

impl AccountSnapshotProvider for Engine {
    fn account_snapshot(&self, market: MarketId, account: AccountId) -> LendingResult<AccountSnapshot> {
        self.ledger(market)?
            .account_snapshot(account, self.config.initial_exchange_rate)
    }
}
