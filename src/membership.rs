// 6.0: which markets count toward an account's liquidity.
// stored as an index map plus a dense backing vec so insert, remove and
// contains are all O(1). removal swaps the last entry into the hole, so the
// backing order is not stable and is never handed out as meaningful.

use crate::types::{AccountId, MarketId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSet {
    positions: HashMap<MarketId, usize>,
    members: Vec<MarketId>,
}

impl MarketSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if already present.
    pub fn insert(&mut self, market: MarketId) -> bool {
        if self.positions.contains_key(&market) {
            return false;
        }
        self.positions.insert(market, self.members.len());
        self.members.push(market);
        true
    }

    /// Returns false if absent.
    pub fn remove(&mut self, market: MarketId) -> bool {
        let Some(index) = self.positions.remove(&market) else {
            return false;
        };
        self.members.swap_remove(index);
        if let Some(moved) = self.members.get(index) {
            self.positions.insert(*moved, index);
        }
        true
    }

    pub fn contains(&self, market: MarketId) -> bool {
        self.positions.contains_key(&market)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Every member exactly once, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = MarketId> + '_ {
        self.members.iter().copied()
    }

    /// Members in ascending id order, for callers that need a stable view.
    pub fn sorted(&self) -> Vec<MarketId> {
        let mut out = self.members.clone();
        out.sort_unstable();
        out
    }
}

/// Market sets for every account that ever entered one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Memberships {
    accounts: HashMap<AccountId, MarketSet>,
}

impl Memberships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, account: AccountId, market: MarketId) -> bool {
        self.accounts.entry(account).or_default().insert(market)
    }

    pub fn exit(&mut self, account: AccountId, market: MarketId) -> bool {
        let Some(set) = self.accounts.get_mut(&account) else {
            return false;
        };
        let removed = set.remove(market);
        if set.is_empty() {
            self.accounts.remove(&account);
        }
        removed
    }

    pub fn contains(&self, account: AccountId, market: MarketId) -> bool {
        self.accounts
            .get(&account)
            .map_or(false, |set| set.contains(market))
    }

    pub fn assets_in(&self, account: AccountId) -> Vec<MarketId> {
        self.accounts
            .get(&account)
            .map(|set| set.sorted())
            .unwrap_or_default()
    }

    pub fn markets_of(&self, account: AccountId) -> Option<&MarketSet> {
        self.accounts.get(&account)
    }

    /// Put back an account's whole set, including its backing order.
    pub fn restore(&mut self, account: AccountId, set: Option<MarketSet>) {
        match set {
            Some(set) => {
                self.accounts.insert(account, set);
            }
            None => {
                self.accounts.remove(&account);
            }
        }
    }
}
