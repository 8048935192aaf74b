// 8.0: core lending engine. coordinates supply, borrow, repay, liquidation,
// interest accrual and admin changes across every listed market.
// deterministic, single-threaded per instance, with no external I/O.

mod accrual;
mod admin;
mod borrow;
mod config;
mod core;
mod guard;
mod liquidations;
mod results;
mod supply;

pub use config::EngineConfig;
pub use core::Engine;
pub use guard::{GuardLock, ReentrancyGuard};
pub use results::{
    BorrowResult, LiquidationResult, MarketSnapshot, RedeemResult, RepayAmount, RepayResult,
    SupplyResult,
};
