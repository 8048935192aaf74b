//! Market registry: per-asset risk parameters and global switches.
//!
//! A market is listed once and never removed. After listing only its factors,
//! cap and pause flags move, and only through the admin setters here, each of
//! which re-checks the factor bounds from [`crate::config`].

use crate::config::{
    validate_close_factor, validate_factors, validate_liquidation_incentive, BoostParams,
    RiskParams,
};
use crate::error::{LendingError, LendingResult};
use crate::fixed_point::Exp;
use crate::oracle::PriceOracle;
use crate::types::{GlobalAction, MarketAction, MarketId, PausedAction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Risk parameters of one listed market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketParams {
    pub id: MarketId,
    pub is_listed: bool,
    /// Fraction of supplied value usable as borrowing power.
    pub collateral_factor: Exp,
    /// Fraction of supplied value at which the account becomes liquidatable.
    pub liquidation_factor: Exp,
    pub supply_paused: bool,
    pub borrow_paused: bool,
    /// None means unbounded.
    pub borrow_cap: Option<u128>,
}

impl MarketParams {
    fn listed(id: MarketId, collateral_factor: Exp, liquidation_factor: Exp) -> Self {
        Self {
            id,
            is_listed: true,
            collateral_factor,
            liquidation_factor,
            supply_paused: false,
            borrow_paused: false,
            borrow_cap: None,
        }
    }

    pub fn is_paused(&self, action: MarketAction) -> bool {
        match action {
            MarketAction::Supply => self.supply_paused,
            MarketAction::Borrow => self.borrow_paused,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalPauses {
    pub transfer_paused: bool,
    pub seize_paused: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRegistry {
    markets: BTreeMap<MarketId, MarketParams>,
    risk: RiskParams,
    pauses: GlobalPauses,
}

impl MarketRegistry {
    pub fn new(risk: RiskParams) -> LendingResult<Self> {
        risk.validate()?;
        Ok(Self {
            markets: BTreeMap::new(),
            risk,
            pauses: GlobalPauses::default(),
        })
    }

    pub fn list_market(
        &mut self,
        id: MarketId,
        collateral_factor: Exp,
        liquidation_factor: Exp,
    ) -> LendingResult<&MarketParams> {
        if self.markets.contains_key(&id) {
            return Err(LendingError::MarketAlreadyListed(id));
        }
        validate_factors(collateral_factor, liquidation_factor)?;
        let market = self
            .markets
            .entry(id)
            .or_insert_with(|| MarketParams::listed(id, collateral_factor, liquidation_factor));
        Ok(market)
    }

    pub fn market(&self, id: MarketId) -> LendingResult<&MarketParams> {
        self.markets
            .get(&id)
            .filter(|m| m.is_listed)
            .ok_or(LendingError::MarketNotListed(id))
    }

    fn market_mut(&mut self, id: MarketId) -> LendingResult<&mut MarketParams> {
        self.markets
            .get_mut(&id)
            .filter(|m| m.is_listed)
            .ok_or(LendingError::MarketNotListed(id))
    }

    pub fn is_listed(&self, id: MarketId) -> bool {
        self.market(id).is_ok()
    }

    pub fn markets(&self) -> impl Iterator<Item = &MarketParams> {
        self.markets.values()
    }

    pub fn risk(&self) -> &RiskParams {
        &self.risk
    }

    pub fn pauses(&self) -> &GlobalPauses {
        &self.pauses
    }

    /// Listed and not paused for `action`.
    pub fn check_action(&self, id: MarketId, action: MarketAction) -> LendingResult<&MarketParams> {
        let market = self.market(id)?;
        if market.is_paused(action) {
            return Err(LendingError::ActionPaused(PausedAction::Market(id, action)));
        }
        Ok(market)
    }

    pub fn check_global(&self, action: GlobalAction) -> LendingResult<()> {
        if self.is_global_paused(action) {
            return Err(LendingError::ActionPaused(PausedAction::Global(action)));
        }
        Ok(())
    }

    pub fn is_global_paused(&self, action: GlobalAction) -> bool {
        match action {
            GlobalAction::Transfer => self.pauses.transfer_paused,
            GlobalAction::Seize => self.pauses.seize_paused,
        }
    }

    /// Returns the previous factor. An unpriced market cannot be risk-weighted,
    /// so the oracle must have a price for it.
    pub fn set_collateral_factor(
        &mut self,
        id: MarketId,
        value: Exp,
        oracle: &dyn PriceOracle,
    ) -> LendingResult<Exp> {
        let liquidation_factor = self.market(id)?.liquidation_factor;
        validate_factors(value, liquidation_factor)?;
        if oracle.underlying_price(id).is_zero() {
            return Err(LendingError::OraclePriceUnavailable(id));
        }
        let market = self.market_mut(id)?;
        Ok(std::mem::replace(&mut market.collateral_factor, value))
    }

    pub fn set_liquidation_factor(&mut self, id: MarketId, value: Exp) -> LendingResult<Exp> {
        let collateral_factor = self.market(id)?.collateral_factor;
        validate_factors(collateral_factor, value)?;
        let market = self.market_mut(id)?;
        Ok(std::mem::replace(&mut market.liquidation_factor, value))
    }

    pub fn set_borrow_cap(&mut self, id: MarketId, cap: Option<u128>) -> LendingResult<()> {
        self.market_mut(id)?.borrow_cap = cap;
        Ok(())
    }

    pub fn set_paused(&mut self, id: MarketId, action: MarketAction, paused: bool) -> LendingResult<()> {
        let market = self.market_mut(id)?;
        match action {
            MarketAction::Supply => market.supply_paused = paused,
            MarketAction::Borrow => market.borrow_paused = paused,
        }
        Ok(())
    }

    pub fn set_global_paused(&mut self, action: GlobalAction, paused: bool) {
        match action {
            GlobalAction::Transfer => self.pauses.transfer_paused = paused,
            GlobalAction::Seize => self.pauses.seize_paused = paused,
        }
    }

    pub fn set_close_factor(&mut self, value: Exp) -> LendingResult<Exp> {
        validate_close_factor(value)?;
        Ok(std::mem::replace(&mut self.risk.close_factor, value))
    }

    pub fn set_liquidation_incentive(&mut self, value: Exp) -> LendingResult<Exp> {
        validate_liquidation_incentive(value)?;
        Ok(std::mem::replace(&mut self.risk.liquidation_incentive, value))
    }

    pub fn set_boost_params(&mut self, boost: BoostParams) {
        self.risk.boost = boost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::SimplePriceOracle;
    use rust_decimal_macros::dec;

    fn exp(d: rust_decimal::Decimal) -> Exp {
        Exp::from_decimal(d).unwrap()
    }

    fn registry() -> MarketRegistry {
        MarketRegistry::new(RiskParams::default()).unwrap()
    }

    #[test]
    fn list_market_defaults() {
        let mut reg = registry();
        let market = reg.list_market(MarketId(1), exp(dec!(0.75)), exp(dec!(0.8))).unwrap();
        assert!(market.is_listed);
        assert!(!market.supply_paused);
        assert!(!market.borrow_paused);
        assert_eq!(market.borrow_cap, None);
        assert!(reg.is_listed(MarketId(1)));
        assert!(!reg.is_listed(MarketId(2)));
    }

    #[test]
    fn list_twice_fails() {
        let mut reg = registry();
        reg.list_market(MarketId(1), exp(dec!(0.5)), exp(dec!(0.6))).unwrap();
        let err = reg.list_market(MarketId(1), exp(dec!(0.5)), exp(dec!(0.6))).unwrap_err();
        assert_eq!(err, LendingError::MarketAlreadyListed(MarketId(1)));
    }

    #[test]
    fn list_rejects_out_of_bounds() {
        let mut reg = registry();
        let err = reg.list_market(MarketId(1), exp(dec!(0.95)), exp(dec!(0.95))).unwrap_err();
        assert!(matches!(err, LendingError::ParameterOutOfBounds { .. }));
        assert!(reg.list_market(MarketId(1), exp(dec!(0.7)), exp(dec!(0.6))).is_err());
        assert!(!reg.is_listed(MarketId(1)));
    }

    #[test]
    fn collateral_factor_needs_price() {
        let mut reg = registry();
        let oracle = SimplePriceOracle::new();
        reg.list_market(MarketId(1), exp(dec!(0.5)), exp(dec!(0.8))).unwrap();

        let err = reg.set_collateral_factor(MarketId(1), exp(dec!(0.6)), &oracle).unwrap_err();
        assert_eq!(err, LendingError::OraclePriceUnavailable(MarketId(1)));

        oracle.set_price_decimal(MarketId(1), dec!(2));
        let old = reg.set_collateral_factor(MarketId(1), exp(dec!(0.6)), &oracle).unwrap();
        assert_eq!(old, exp(dec!(0.5)));
        assert_eq!(reg.market(MarketId(1)).unwrap().collateral_factor, exp(dec!(0.6)));
    }

    #[test]
    fn collateral_factor_cannot_pass_liquidation_factor() {
        let mut reg = registry();
        let oracle = SimplePriceOracle::new();
        oracle.set_price_decimal(MarketId(1), dec!(1));
        reg.list_market(MarketId(1), exp(dec!(0.5)), exp(dec!(0.6))).unwrap();
        assert!(reg.set_collateral_factor(MarketId(1), exp(dec!(0.65)), &oracle).is_err());
        assert!(reg.set_liquidation_factor(MarketId(1), exp(dec!(0.45))).is_err());
        assert!(reg.set_liquidation_factor(MarketId(1), exp(dec!(0.9))).is_ok());
    }

    #[test]
    fn unlisted_market_setters_fail() {
        let mut reg = registry();
        assert_eq!(
            reg.set_liquidation_factor(MarketId(5), exp(dec!(0.5))),
            Err(LendingError::MarketNotListed(MarketId(5)))
        );
        assert!(reg.set_paused(MarketId(5), MarketAction::Borrow, true).is_err());
    }

    #[test]
    fn pause_flags() {
        let mut reg = registry();
        reg.list_market(MarketId(1), exp(dec!(0.5)), exp(dec!(0.6))).unwrap();
        reg.set_paused(MarketId(1), MarketAction::Borrow, true).unwrap();

        assert!(reg.check_action(MarketId(1), MarketAction::Supply).is_ok());
        assert_eq!(
            reg.check_action(MarketId(1), MarketAction::Borrow).unwrap_err(),
            LendingError::ActionPaused(PausedAction::Market(MarketId(1), MarketAction::Borrow))
        );

        reg.set_global_paused(GlobalAction::Seize, true);
        assert!(reg.check_global(GlobalAction::Seize).is_err());
        assert!(reg.check_global(GlobalAction::Transfer).is_ok());
    }

    #[test]
    fn global_parameter_setters() {
        let mut reg = registry();
        assert!(reg.set_close_factor(exp(dec!(0.95))).is_err());
        assert_eq!(reg.set_close_factor(exp(dec!(0.4))).unwrap(), exp(dec!(0.5)));
        assert!(reg.set_liquidation_incentive(exp(dec!(0.9))).is_err());
        reg.set_liquidation_incentive(exp(dec!(1.1))).unwrap();
        assert_eq!(reg.risk().liquidation_incentive, exp(dec!(1.1)));
    }
}
