// 1.0: all the primitives live here. ids, block numbers, action tags.
// each id is a newtype so the compiler catches account/market mixups.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A market is identified by the asset it lends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketId(pub u32);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "market#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

// 1.1: the accrual time unit. interest is quoted per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BlockNumber(pub u64);

impl BlockNumber {
    pub fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Blocks elapsed since `earlier`. None if `earlier` is in the future.
    pub fn since(&self, earlier: BlockNumber) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }

    pub fn advance(&self, blocks: u64) -> Self {
        Self(self.0.saturating_add(blocks))
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// 1.2: per-market actions that can be paused by the admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketAction {
    Supply,
    Borrow,
}

// 1.3: protocol-wide actions with their own pause switch, not tied to a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlobalAction {
    Transfer,
    Seize,
}

/// Actions that can be blocked by a pause flag, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PausedAction {
    Market(MarketId, MarketAction),
    Global(GlobalAction),
}

impl fmt::Display for PausedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PausedAction::Market(id, action) => write!(f, "{:?} on {}", action, id),
            PausedAction::Global(action) => write!(f, "{:?}", action),
        }
    }
}
