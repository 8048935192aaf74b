// lending-core: risk and accounting core of a pooled, over-collateralized
// money market. suppliers mint market tokens, borrowers draw against entered
// collateral, and under-water accounts are liquidated at an incentive.
// all computation is deterministic fixed-point with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketId, AccountId, BlockNumber, action tags
//   2.x  fixed_point.rs: Exp (1e18) and Double (1e36) checked decimals
//   3.x  config.rs: risk params, factor bounds, boost, env presets
//   4.x  market.rs: market registry, pause switches, admin setters
//   5.x  interest.rs: rate models, accrual, borrow snapshots
//   6.x  membership.rs: per-account entered-market sets
//   7.x  ledger.rs: per-market token and borrow accounting
//   8.x  engine/: atomic actions, guards, admin, queries
//   9.x  liquidity.rs: account liquidity and health factor
//   10.x liquidation.rs: seize math, close factor, protocol share
//   11.x events.rs: state transition events for audit
//   12.x oracle.rs: price oracle and governance token interfaces
//   13.x error.rs: error taxonomy

// accounting core
pub mod engine;
pub mod events;
pub mod fixed_point;
pub mod interest;
pub mod ledger;
pub mod liquidation;
pub mod liquidity;
pub mod market;
pub mod membership;
pub mod types;

// configuration and integration seams
pub mod config;
pub mod error;
pub mod oracle;

// re exports for convenience
pub use config::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use fixed_point::*;
pub use interest::*;
pub use ledger::*;
pub use liquidation::*;
pub use liquidity::*;
pub use market::*;
pub use membership::*;
pub use oracle::*;
pub use types::*;
