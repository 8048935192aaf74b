//! Admin surface: listing, risk parameters, pause switches, reserves and the
//! external collaborators (oracle, governance token).
//!
//! Authorization is the embedder's concern; these calls assume the caller is
//! the admin.

use super::core::Engine;
use crate::config::BoostParams;
use crate::error::{LendingError, LendingResult};
use crate::events::{
    BorrowCapUpdatedEvent, EventPayload, MarketListedEvent, Parameter, ParameterUpdatedEvent,
    PauseToggledEvent, ReservesEvent,
};
use crate::fixed_point::{checked_add, checked_sub, Exp};
use crate::interest::{InterestRateModel, MAX_RESERVE_FACTOR_MANTISSA};
use crate::ledger::MarketLedger;
use crate::oracle::{GovernanceToken, PriceOracle};
use crate::types::{GlobalAction, MarketAction, MarketId, PausedAction};
use std::sync::Arc;

impl Engine {
    pub fn list_market(
        &mut self,
        market_id: MarketId,
        collateral_factor: Exp,
        liquidation_factor: Exp,
        rate_model: Arc<dyn InterestRateModel>,
    ) -> LendingResult<()> {
        self.transact(|engine| {
            engine
                .registry
                .list_market(market_id, collateral_factor, liquidation_factor)?;
            let ledger = MarketLedger::new(market_id, engine.current_block, rate_model);
            engine.ledgers.insert(market_id, ledger);

            tracing::debug!(%market_id, %collateral_factor, %liquidation_factor, "listed market");
            engine.emit_event(EventPayload::MarketListed(MarketListedEvent {
                market_id,
                collateral_factor,
                liquidation_factor,
            }));
            Ok(())
        })
    }

    // 8.11: risk parameters

    pub fn set_collateral_factor(&mut self, market_id: MarketId, value: Exp) -> LendingResult<Exp> {
        self.transact(|engine| {
            let old = engine
                .registry
                .set_collateral_factor(market_id, value, engine.oracle.as_ref())?;
            engine.emit_parameter(Some(market_id), Parameter::CollateralFactor, old, value);
            Ok(old)
        })
    }

    pub fn set_liquidation_factor(&mut self, market_id: MarketId, value: Exp) -> LendingResult<Exp> {
        self.transact(|engine| {
            let old = engine.registry.set_liquidation_factor(market_id, value)?;
            engine.emit_parameter(Some(market_id), Parameter::LiquidationFactor, old, value);
            Ok(old)
        })
    }

    pub fn set_close_factor(&mut self, value: Exp) -> LendingResult<Exp> {
        self.transact(|engine| {
            let old = engine.registry.set_close_factor(value)?;
            engine.emit_parameter(None, Parameter::CloseFactor, old, value);
            Ok(old)
        })
    }

    pub fn set_liquidation_incentive(&mut self, value: Exp) -> LendingResult<Exp> {
        self.transact(|engine| {
            let old = engine.registry.set_liquidation_incentive(value)?;
            engine.emit_parameter(None, Parameter::LiquidationIncentive, old, value);
            Ok(old)
        })
    }

    pub fn set_boost_params(&mut self, boost: BoostParams) -> LendingResult<()> {
        self.transact(|engine| {
            let old = engine.registry.risk().boost.clone();
            engine.registry.set_boost_params(boost.clone());
            engine.emit_parameter(None, Parameter::BoostIncrease, old.boost_increase, boost.boost_increase);
            engine.emit_parameter(None, Parameter::MaxBoost, old.max_boost, boost.max_boost);
            Ok(())
        })
    }

    pub fn set_borrow_cap(&mut self, market_id: MarketId, cap: Option<u128>) -> LendingResult<()> {
        self.transact(|engine| {
            engine.registry.set_borrow_cap(market_id, cap)?;
            engine.emit_event(EventPayload::BorrowCapUpdated(BorrowCapUpdatedEvent { market_id, cap }));
            Ok(())
        })
    }

    /// Accrues at the old factor before switching.
    pub fn set_reserve_factor(&mut self, market_id: MarketId, value: Exp) -> LendingResult<Exp> {
        self.transact(|engine| {
            engine.accrue_market(market_id)?;
            if value > Exp::from_mantissa(MAX_RESERVE_FACTOR_MANTISSA) {
                return Err(LendingError::ParameterOutOfBounds {
                    parameter: "reserve_factor",
                    value,
                });
            }
            let ledger = engine.ledger_mut(market_id)?;
            let old = std::mem::replace(&mut ledger.reserve_factor, value);
            engine.emit_parameter(Some(market_id), Parameter::ReserveFactor, old, value);
            Ok(old)
        })
    }

    /// Accrues under the old model before switching.
    pub fn set_interest_rate_model(
        &mut self,
        market_id: MarketId,
        rate_model: Arc<dyn InterestRateModel>,
    ) -> LendingResult<()> {
        self.transact(|engine| {
            engine.accrue_market(market_id)?;
            engine.ledger_mut(market_id)?.rate_model = rate_model;
            tracing::debug!(%market_id, "interest rate model replaced");
            Ok(())
        })
    }

    // 8.12: pause switches

    pub fn set_paused(&mut self, market_id: MarketId, action: MarketAction, paused: bool) -> LendingResult<()> {
        self.transact(|engine| {
            engine.registry.set_paused(market_id, action, paused)?;
            engine.emit_event(EventPayload::PauseToggled(PauseToggledEvent {
                action: PausedAction::Market(market_id, action),
                paused,
            }));
            Ok(())
        })
    }

    pub fn set_global_paused(&mut self, action: GlobalAction, paused: bool) -> LendingResult<()> {
        self.transact(|engine| {
            engine.registry.set_global_paused(action, paused);
            engine.emit_event(EventPayload::PauseToggled(PauseToggledEvent {
                action: PausedAction::Global(action),
                paused,
            }));
            Ok(())
        })
    }

    // 8.13: collaborators

    pub fn set_price_oracle(&mut self, oracle: Arc<dyn PriceOracle>) -> LendingResult<()> {
        let _lock = self.guard.enter()?;
        self.oracle = oracle;
        Ok(())
    }

    /// None disables boosting entirely.
    pub fn set_governance_token(&mut self, token: Option<Arc<dyn GovernanceToken>>) -> LendingResult<()> {
        let _lock = self.guard.enter()?;
        self.governance = token;
        Ok(())
    }

    // 8.14: reserves

    pub fn add_reserves(&mut self, market_id: MarketId, amount: u128) -> LendingResult<u128> {
        self.transact(|engine| {
            engine.accrue_market(market_id)?;
            let ledger = engine.ledger_mut(market_id)?;
            ledger.accrual.cash = checked_add(ledger.accrual.cash, amount)?;
            ledger.accrual.total_reserves = checked_add(ledger.accrual.total_reserves, amount)?;
            let total_reserves = ledger.accrual.total_reserves;
            engine.emit_event(EventPayload::ReservesAdded(ReservesEvent {
                market_id,
                amount,
                total_reserves,
            }));
            Ok(total_reserves)
        })
    }

    /// Withdraw reserves to the admin. Bounded by both reserves and cash.
    pub fn reduce_reserves(&mut self, market_id: MarketId, amount: u128) -> LendingResult<u128> {
        self.transact(|engine| {
            engine.accrue_market(market_id)?;
            let ledger = engine.ledger_mut(market_id)?;
            if amount > ledger.accrual.cash {
                return Err(LendingError::InsufficientCash {
                    market: market_id,
                    requested: amount,
                    available: ledger.accrual.cash,
                });
            }
            if amount > ledger.accrual.total_reserves {
                return Err(LendingError::InsufficientReserves {
                    market: market_id,
                    requested: amount,
                    available: ledger.accrual.total_reserves,
                });
            }
            ledger.accrual.cash = checked_sub(ledger.accrual.cash, amount)?;
            ledger.accrual.total_reserves = checked_sub(ledger.accrual.total_reserves, amount)?;
            let total_reserves = ledger.accrual.total_reserves;
            engine.emit_event(EventPayload::ReservesReduced(ReservesEvent {
                market_id,
                amount,
                total_reserves,
            }));
            Ok(total_reserves)
        })
    }

    fn emit_parameter(&mut self, market_id: Option<MarketId>, parameter: Parameter, old_value: Exp, new_value: Exp) {
        tracing::debug!(?market_id, ?parameter, %old_value, %new_value, "parameter updated");
        self.emit_event(EventPayload::ParameterUpdated(ParameterUpdatedEvent {
            market_id,
            parameter,
            old_value,
            new_value,
        }));
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{Engine, EngineConfig};
    use crate::error::LendingError;
    use crate::fixed_point::Exp;
    use crate::interest::FixedRateModel;
    use crate::oracle::SimplePriceOracle;
    use crate::types::{MarketAction, MarketId};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const M: MarketId = MarketId(1);

    fn exp(d: rust_decimal::Decimal) -> Exp {
        Exp::from_decimal(d).unwrap()
    }

    fn setup() -> (Engine, Arc<SimplePriceOracle>) {
        let oracle = Arc::new(SimplePriceOracle::new());
        let mut engine = Engine::new(EngineConfig::default(), oracle.clone()).unwrap();
        engine
            .list_market(M, exp(dec!(0.5)), exp(dec!(0.6)), Arc::new(FixedRateModel::new(Exp::zero())))
            .unwrap();
        (engine, oracle)
    }

    #[test]
    fn relisting_fails_and_leaves_no_event() {
        let (mut engine, _) = setup();
        let events = engine.events().len();
        let err = engine
            .list_market(M, Exp::zero(), Exp::zero(), Arc::new(FixedRateModel::new(Exp::zero())))
            .unwrap_err();
        assert_eq!(err, LendingError::MarketAlreadyListed(M));
        assert_eq!(engine.events().len(), events);
    }

    #[test]
    fn collateral_factor_needs_price() {
        let (mut engine, oracle) = setup();
        assert_eq!(
            engine.set_collateral_factor(M, exp(dec!(0.55))).unwrap_err(),
            LendingError::OraclePriceUnavailable(M)
        );
        oracle.set_price_decimal(M, dec!(1));
        assert_eq!(engine.set_collateral_factor(M, exp(dec!(0.55))).unwrap(), exp(dec!(0.5)));
        assert_eq!(engine.market(M).unwrap().collateral_factor, exp(dec!(0.55)));
    }

    #[test]
    fn liquidation_factor_cannot_drop_below_collateral_factor() {
        let (mut engine, _) = setup();
        assert!(matches!(
            engine.set_liquidation_factor(M, exp(dec!(0.4))),
            Err(LendingError::ParameterOutOfBounds { parameter: "liquidation_factor", .. })
        ));
        assert_eq!(engine.market(M).unwrap().liquidation_factor, exp(dec!(0.6)));
    }

    #[test]
    fn reserve_factor_bound() {
        let (mut engine, _) = setup();
        assert!(engine.set_reserve_factor(M, exp(dec!(1.01))).is_err());
        assert_eq!(engine.set_reserve_factor(M, exp(dec!(0.1))).unwrap(), Exp::zero());
        assert_eq!(engine.market_snapshot(M).unwrap().reserve_factor, exp(dec!(0.1)));
    }

    #[test]
    fn reserves_round_trip() {
        let (mut engine, _) = setup();
        assert_eq!(engine.add_reserves(M, 1_000).unwrap(), 1_000);
        assert_eq!(engine.reduce_reserves(M, 400).unwrap(), 600);
        assert!(matches!(
            engine.reduce_reserves(M, 601),
            Err(LendingError::InsufficientReserves { requested: 601, available: 600, .. })
        ));
        let snapshot = engine.market_snapshot(M).unwrap();
        assert_eq!(snapshot.cash, 600);
        assert_eq!(snapshot.total_reserves, 600);
    }

    #[test]
    fn pause_flags() {
        let (mut engine, _) = setup();
        engine.set_paused(M, MarketAction::Borrow, true).unwrap();
        assert!(engine.market(M).unwrap().borrow_paused);
        assert!(engine.set_paused(MarketId(7), MarketAction::Supply, true).is_err());
    }
}
