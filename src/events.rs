// 11.0: every committed state change produces an event. used for audit trails,
// state reconstruction and notifying external systems. events from a failed
// operation are discarded together with its state changes.

use crate::fixed_point::Exp;
use crate::types::{AccountId, BlockNumber, MarketId, PausedAction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub block: BlockNumber,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, block: BlockNumber, payload: EventPayload) -> Self {
        Self { id, block, payload }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Market lifecycle
    MarketListed(MarketListedEvent),
    InterestAccrued(InterestAccruedEvent),

    // Account actions
    Mint(MintEvent),
    Redeem(RedeemEvent),
    Borrow(BorrowEvent),
    RepayBorrow(RepayBorrowEvent),
    Transfer(TransferEvent),
    MarketEntered(MembershipEvent),
    MarketExited(MembershipEvent),

    // Risk events
    LiquidateBorrow(LiquidateBorrowEvent),

    // Reserves
    ReservesAdded(ReservesEvent),
    ReservesReduced(ReservesEvent),

    // Admin
    ParameterUpdated(ParameterUpdatedEvent),
    BorrowCapUpdated(BorrowCapUpdatedEvent),
    PauseToggled(PauseToggledEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketListedEvent {
    pub market_id: MarketId,
    pub collateral_factor: Exp,
    pub liquidation_factor: Exp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestAccruedEvent {
    pub market_id: MarketId,
    pub cash_prior: u128,
    pub interest_accumulated: u128,
    pub borrow_index: Exp,
    pub total_borrows: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintEvent {
    pub market_id: MarketId,
    pub account_id: AccountId,
    pub amount: u128,
    pub tokens: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemEvent {
    pub market_id: MarketId,
    pub account_id: AccountId,
    pub amount: u128,
    pub tokens: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowEvent {
    pub market_id: MarketId,
    pub account_id: AccountId,
    pub amount: u128,
    pub account_borrows: u128,
    pub total_borrows: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepayBorrowEvent {
    pub market_id: MarketId,
    pub payer: AccountId,
    pub borrower: AccountId,
    pub amount: u128,
    pub account_borrows: u128,
    pub total_borrows: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub market_id: MarketId,
    pub from: AccountId,
    pub to: AccountId,
    pub tokens: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEvent {
    pub market_id: MarketId,
    pub account_id: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidateBorrowEvent {
    pub liquidator: AccountId,
    pub borrower: AccountId,
    pub borrowed_market: MarketId,
    pub collateral_market: MarketId,
    pub repay_amount: u128,
    pub seize_tokens: u128,
    pub protocol_tokens: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservesEvent {
    pub market_id: MarketId,
    pub amount: u128,
    pub total_reserves: u128,
}

/// Which risk parameter an admin call moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parameter {
    CollateralFactor,
    LiquidationFactor,
    CloseFactor,
    LiquidationIncentive,
    BoostIncrease,
    MaxBoost,
    ReserveFactor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterUpdatedEvent {
    /// None for global parameters.
    pub market_id: Option<MarketId>,
    pub parameter: Parameter,
    pub old_value: Exp,
    pub new_value: Exp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowCapUpdatedEvent {
    pub market_id: MarketId,
    pub cap: Option<u128>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseToggledEvent {
    pub action: PausedAction,
    pub paused: bool,
}
