//! Property-based tests for the core math.
//!
//! These tests verify invariants hold under random inputs.

use lending_core::*;
use proptest::prelude::*;
use std::sync::Arc;

const UNIT: u128 = 1_000_000_000_000_000_000;

// Strategies for generating test data
fn rate_strategy() -> impl Strategy<Value = Exp> {
    (0u128..=5_000_000_000_000u128).prop_map(Exp::from_mantissa) // up to 0.0005% per block
}

fn balance_strategy() -> impl Strategy<Value = u128> {
    0u128..1_000_000_000 * UNIT
}

fn factor_pair_strategy() -> impl Strategy<Value = (Exp, Exp)> {
    let max = MAX_FACTOR_MANTISSA;
    (0u128..=max, 0u128..=max).prop_map(move |(cf, extra)| {
        let lf = cf.saturating_add(extra).min(max);
        (Exp::from_mantissa(cf), Exp::from_mantissa(lf))
    })
}

fn accrual_state(cash: u128, borrows: u128) -> MarketAccrualState {
    let mut state = MarketAccrualState::new(BlockNumber(0));
    state.cash = cash;
    state.total_borrows = borrows;
    state
}

proptest! {
    /// Accruing twice in the same block is the same as accruing once
    #[test]
    fn accrual_is_idempotent(
        rate in rate_strategy(),
        cash in balance_strategy(),
        borrows in balance_strategy(),
        blocks in 0u64..1_000_000,
        reserve_bps in 0u128..=10_000,
    ) {
        let model = FixedRateModel::new(rate);
        let reserve_factor = Exp::from_ratio(reserve_bps, 10_000).unwrap();
        let max = Exp::from_mantissa(5_000_000_000_000);
        let mut state = accrual_state(cash, borrows);
        let now = BlockNumber(blocks);

        state.accrue(now, &model, reserve_factor, max).unwrap();
        let once = state.clone();

        let outcome = state.accrue(now, &model, reserve_factor, max).unwrap();
        prop_assert_eq!(outcome.blocks_elapsed, 0);
        prop_assert_eq!(outcome.interest_accumulated, 0);
        prop_assert_eq!(state, once);
    }

    /// Borrow index never decreases
    #[test]
    fn borrow_index_is_monotone(
        rate in rate_strategy(),
        borrows in balance_strategy(),
        steps in proptest::collection::vec(0u64..50_000, 1..20),
    ) {
        let model = FixedRateModel::new(rate);
        let max = Exp::from_mantissa(5_000_000_000_000);
        let mut state = accrual_state(UNIT, borrows);
        let mut block = BlockNumber(0);
        let mut last_index = state.borrow_index;
        let mut last_borrows = state.total_borrows;

        for step in steps {
            block = block.advance(step);
            state.accrue(block, &model, Exp::zero(), max).unwrap();
            prop_assert!(state.borrow_index >= last_index);
            prop_assert!(state.total_borrows >= last_borrows);
            last_index = state.borrow_index;
            last_borrows = state.total_borrows;
        }
    }

    /// Suppliers never lose value to accrual
    #[test]
    fn exchange_rate_never_falls_on_accrual(
        rate in rate_strategy(),
        cash in 1u128..1_000_000 * UNIT,
        borrows in balance_strategy(),
        blocks in 1u64..1_000_000,
        reserve_bps in 0u128..=10_000,
    ) {
        let mut ledger = MarketLedger::new(MarketId(1), BlockNumber(0), Arc::new(FixedRateModel::new(rate)));
        ledger.reserve_factor = Exp::from_ratio(reserve_bps, 10_000).unwrap();
        ledger.accrual.cash = cash;
        ledger.accrual.total_borrows = borrows;
        ledger.mint(AccountId(1), cash / 3 + 1).unwrap();

        let initial = Exp::from_mantissa(20_000_000_000_000_000);
        let before = ledger.exchange_rate_stored(initial).unwrap();
        ledger.accrue(BlockNumber(blocks), Exp::from_mantissa(5_000_000_000_000)).unwrap();
        let after = ledger.exchange_rate_stored(initial).unwrap();
        prop_assert!(after >= before, "rate fell from {} to {}", before, after);
    }

    /// liquidationThreshold >= collateralValue whenever lf >= cf, boost included
    #[test]
    fn threshold_dominates_collateral(
        (cf, lf) in factor_pair_strategy(),
        price_m in 1u128..1_000_000 * UNIT,
        supply in 1u128..1_000_000_000 * UNIT,
        gov_balance in 0u128..10_000,
        boost_m in 0u128..200_000_000_000_000_000,
    ) {
        let oracle = Arc::new(SimplePriceOracle::new());
        oracle.set_price(MarketId(1), Exp::from_mantissa(price_m));
        let mut engine = Engine::new(EngineConfig::default(), oracle).unwrap();
        engine.list_market(MarketId(1), cf, lf, Arc::new(FixedRateModel::new(Exp::zero()))).unwrap();

        let governance = Arc::new(GovernanceBalances::new());
        governance.set_balance(AccountId(1), gov_balance);
        let token: Arc<dyn GovernanceToken> = governance;
        engine.set_governance_token(Some(token)).unwrap();
        engine.set_boost_params(BoostParams {
            boost_increase: Exp::from_mantissa(boost_m),
            required_token_amount: 100,
            max_boost: Exp::from_mantissa(boost_m * 10),
        }).unwrap();

        engine.supply(AccountId(1), MarketId(1), supply).unwrap();
        engine.enter_markets(AccountId(1), &[MarketId(1)]).unwrap();

        let liq = engine.account_liquidity(AccountId(1)).unwrap();
        prop_assert!(liq.liquidation_threshold >= liq.collateral_value);
        prop_assert_eq!(liq.shortfall_collateral, 0);
    }

    /// Solving seize for the repay amount recovers it within one unit, as long
    /// as one collateral token is worth less than one borrowed unit
    #[test]
    fn seize_inverse_recovers_repay(
        pb_m in UNIT..1_000 * UNIT,
        pc_m in 10_000_000_000_000_000u128..990_000_000_000_000_000,
        er_m in 20_000_000_000_000_000u128..=UNIT,
        incentive_m in UNIT..=1_500_000_000_000_000_000,
        repay in 1u128..1_000_000 * UNIT,
    ) {
        let pricing = SeizePricing {
            price_borrowed: Exp::from_mantissa(pb_m),
            price_collateral: Exp::from_mantissa(pc_m),
            exchange_rate: Exp::from_mantissa(er_m),
            liquidation_incentive: Exp::from_mantissa(incentive_m),
        };
        let seized = pricing.seize_tokens(repay).unwrap();
        let back = pricing.repay_for_seize_tokens(seized).unwrap();
        prop_assert!(back.abs_diff(repay) <= 1, "repay {} came back as {}", repay, back);
    }

    /// Protocol and liquidator shares always add up to the seizure
    #[test]
    fn seize_split_conserves_tokens(
        seize in 0u128..1_000_000_000 * UNIT,
        share_m in 0u128..=UNIT,
        er_m in 1u128..=UNIT,
    ) {
        let split = SeizeSplit::compute(seize, Exp::from_mantissa(share_m), Exp::from_mantissa(er_m)).unwrap();
        prop_assert_eq!(split.liquidator_tokens + split.protocol_tokens, seize);
        prop_assert!(split.protocol_tokens <= seize);
    }

    /// Basic fixed-point laws
    #[test]
    fn fixed_point_laws(
        a_m in 0u128..u64::MAX as u128 * UNIT,
        b_m in 0u128..u64::MAX as u128 * UNIT,
        n in 0u128..1_000_000_000_000,
    ) {
        let a = Exp::from_mantissa(a_m);
        let b = Exp::from_mantissa(b_m);

        prop_assert_eq!(a.mul(Exp::one()).unwrap(), a);
        prop_assert_eq!(a.add(b).unwrap().sub(b).unwrap(), a);
        prop_assert_eq!(Exp::from_integer(n).unwrap().truncate().unwrap(), n);
        prop_assert_eq!(Exp::from_ratio(n, 1).unwrap(), Exp::from_integer(n).unwrap());

        // the 36-decimal product is exact; truncating it matches single precision
        prop_assert_eq!(Double::product(a, b).unwrap().to_exp(), a.mul(b).unwrap());
    }

    /// Converting tokens to underlying and back never creates tokens
    #[test]
    fn token_conversion_rounds_down(
        rate_m in 1u128..=100 * UNIT,
        tokens in 0u128..1_000_000_000 * UNIT,
    ) {
        let rate = Exp::from_mantissa(rate_m);
        let underlying = rate.mul_scalar_truncate(tokens).unwrap();
        let back = rate.div_into_scalar(underlying).unwrap();
        prop_assert!(back <= tokens);
    }
}
