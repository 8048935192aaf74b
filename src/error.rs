//! Error taxonomy for every risk and accounting operation.
//!
//! All operations return `Result<_, LendingError>`; nothing is reported through
//! status codes. Any error aborts the enclosing operation and the engine rolls
//! back every mutation it made.

use crate::fixed_point::{Exp, MathError};
use crate::types::{AccountId, BlockNumber, MarketId, PausedAction};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LendingError {
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("arithmetic underflow")]
    ArithmeticUnderflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("{0} is not listed")]
    MarketNotListed(MarketId),

    #[error("{0} is already listed")]
    MarketAlreadyListed(MarketId),

    #[error("oracle price unavailable for {0}")]
    OraclePriceUnavailable(MarketId),

    #[error("{parameter} out of bounds: {value}")]
    ParameterOutOfBounds { parameter: &'static str, value: Exp },

    #[error("action paused: {0}")]
    ActionPaused(PausedAction),

    #[error("insufficient liquidity: shortfall {shortfall}")]
    InsufficientLiquidity { shortfall: u128 },

    #[error("{0} has no liquidation shortfall")]
    InsufficientShortfallForLiquidation(AccountId),

    #[error("repay {requested} exceeds close factor limit {max}")]
    RepayExceedsCloseFactorLimit { requested: u128, max: u128 },

    #[error("re-entered a guarded operation")]
    ReentrantCall,

    #[error("borrow cap {cap} reached for {market}")]
    BorrowCapReached { market: MarketId, cap: u128 },

    #[error("insufficient cash in {market}: requested {requested}, available {available}")]
    InsufficientCash { market: MarketId, requested: u128, available: u128 },

    #[error("insufficient token balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    #[error("{account} still owes in {market}")]
    NonzeroBorrowBalance { account: AccountId, market: MarketId },

    #[error("{account} still holds collateral in {market}")]
    NonzeroCollateralBalance { account: AccountId, market: MarketId },

    #[error("insufficient reserves in {market}: requested {requested}, available {available}")]
    InsufficientReserves { market: MarketId, requested: u128, available: u128 },

    #[error("cannot transfer to self")]
    SelfTransfer,

    #[error("liquidator cannot be the borrower")]
    LiquidatorIsBorrower,

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("borrow rate {rate} above maximum {max}")]
    BorrowRateTooHigh { rate: Exp, max: Exp },

    #[error("block {current} is behind accrual checkpoint {checkpoint}")]
    BlockBehindCheckpoint { current: BlockNumber, checkpoint: BlockNumber },
}

impl From<MathError> for LendingError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::Overflow => LendingError::ArithmeticOverflow,
            MathError::Underflow => LendingError::ArithmeticUnderflow,
            MathError::DivisionByZero => LendingError::DivisionByZero,
        }
    }
}

impl LendingError {
    /// Arithmetic failures mean an invariant broke, never a recoverable condition.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            LendingError::ArithmeticOverflow
                | LendingError::ArithmeticUnderflow
                | LendingError::DivisionByZero
        )
    }

    /// Safe to retry unchanged once outside state moves (e.g. a price is published).
    pub fn is_transient(&self) -> bool {
        matches!(self, LendingError::OraclePriceUnavailable(_))
    }
}

pub type LendingResult<T> = Result<T, LendingError>;
