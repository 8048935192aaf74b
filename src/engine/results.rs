// 8.0.2: result types for engine operations.

use crate::fixed_point::Exp;
use crate::types::{AccountId, BlockNumber, MarketId};
use serde::{Deserialize, Serialize};

/// How much of a borrow to repay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepayAmount {
    Exact(u128),
    /// The whole outstanding balance, after accrual.
    Max,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyResult {
    pub amount: u128,
    pub minted_tokens: u128,
    pub exchange_rate: Exp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemResult {
    pub amount: u128,
    pub redeemed_tokens: u128,
    pub exchange_rate: Exp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowResult {
    pub amount: u128,
    pub account_borrows: u128,
    pub total_borrows: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepayResult {
    pub repaid: u128,
    pub account_borrows: u128,
    pub total_borrows: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationResult {
    pub borrower: AccountId,
    pub liquidator: AccountId,
    pub borrowed_market: MarketId,
    pub collateral_market: MarketId,
    pub repaid: u128,
    pub seize_tokens: u128,
    pub liquidator_tokens: u128,
    pub protocol_tokens: u128,
    pub protocol_amount: u128,
}

/// Point-in-time view of one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub market_id: MarketId,
    pub cash: u128,
    pub total_borrows: u128,
    pub total_reserves: u128,
    pub total_supply: u128,
    pub borrow_index: Exp,
    pub exchange_rate: Exp,
    pub accrual_block: BlockNumber,
    pub borrow_rate: Exp,
    pub supply_rate: Exp,
    pub reserve_factor: Exp,
}
