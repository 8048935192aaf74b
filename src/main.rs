//! Money Market Core Simulation.
//!
//! Walks the engine through the full lending lifecycle: supplying, borrowing
//! against collateral, interest accrual, a price shock and the liquidation
//! that follows, plus governance-token boost.

use lending_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

const UNIT: u128 = 1_000_000_000_000_000_000;

const USDC: MarketId = MarketId(1);
const ETH: MarketId = MarketId(2);

fn main() -> Result<(), LendingError> {
    tracing_subscriber::fmt().with_target(false).init();

    println!("Money Market Core Engine Simulation");
    println!("Pooled Markets, Cross Collateral, Full Lifecycle\n");

    scenario_1_supply_and_borrow()?;
    scenario_2_interest_accrual()?;
    scenario_3_price_shock_and_liquidation()?;
    scenario_4_governance_boost()?;
    scenario_5_rejected_actions()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn exp(value: Decimal) -> Result<Exp, LendingError> {
    Ok(Exp::from_decimal(value)?)
}

fn units(amount: u128) -> String {
    let whole = amount / UNIT;
    let frac = (amount % UNIT) / (UNIT / 10_000);
    format!("{}.{:04}", whole, frac)
}

fn jump_rate_model() -> Result<Arc<dyn InterestRateModel>, LendingError> {
    let model = JumpRateModel::from_yearly(
        exp(dec!(0.02))?,
        exp(dec!(0.20))?,
        exp(dec!(1.00))?,
        exp(dec!(0.80))?,
        DEFAULT_BLOCKS_PER_YEAR,
    )?;
    Ok(Arc::new(model))
}

/// Two markets, an LP on each side and one borrower.
fn setup(config: EngineConfig) -> Result<(Engine, Arc<SimplePriceOracle>), LendingError> {
    let oracle = Arc::new(SimplePriceOracle::new());
    oracle.set_price_decimal(USDC, dec!(1));
    oracle.set_price_decimal(ETH, dec!(2000));

    let mut engine = Engine::new(config, oracle.clone())?;
    engine.list_market(USDC, exp(dec!(0.80))?, exp(dec!(0.85))?, jump_rate_model()?)?;
    engine.list_market(ETH, exp(dec!(0.75))?, exp(dec!(0.80))?, jump_rate_model()?)?;
    engine.set_reserve_factor(USDC, exp(dec!(0.10))?)?;
    Ok((engine, oracle))
}

fn print_liquidity(engine: &Engine, label: &str, account: AccountId) -> Result<(), LendingError> {
    let liq = engine.account_liquidity(account)?;
    println!(
        "  {}: collateral ${}, threshold ${}, borrows ${}, liquidity ${}, shortfall ${}, health {}",
        label,
        units(liq.collateral_value),
        units(liq.liquidation_threshold),
        units(liq.borrow_value),
        units(liq.liquidity),
        units(liq.shortfall_collateral),
        liq.health_factor,
    );
    Ok(())
}

fn scenario_1_supply_and_borrow() -> Result<(), LendingError> {
    println!("Scenario 1: Supply and Borrow\n");

    let (mut engine, _oracle) = setup(EngineConfig::default())?;
    let lp = AccountId(1);
    let alice = AccountId(2);

    let supplied = engine.supply(lp, USDC, 1_000_000 * UNIT)?;
    println!("  LP supplies 1,000,000 USDC, minted {} cUSDC", units(supplied.minted_tokens));

    let supplied = engine.supply(alice, ETH, 10 * UNIT)?;
    println!("  Alice supplies 10 ETH, minted {} cETH", units(supplied.minted_tokens));
    engine.enter_markets(alice, &[ETH])?;
    print_liquidity(&engine, "Alice", alice)?;

    let borrowed = engine.borrow(alice, USDC, 10_000 * UNIT)?;
    println!("  Alice borrows 10,000 USDC, owes {}", units(borrowed.account_borrows));
    println!("  Alice is now in markets {:?}", engine.assets_in(alice));
    print_liquidity(&engine, "Alice", alice)?;

    let snapshot = engine.market_snapshot(USDC)?;
    println!(
        "  USDC market: cash {}, borrows {}, borrow rate/block {}, supply rate/block {}\n",
        units(snapshot.cash),
        units(snapshot.total_borrows),
        snapshot.borrow_rate,
        snapshot.supply_rate
    );
    Ok(())
}

fn scenario_2_interest_accrual() -> Result<(), LendingError> {
    println!("Scenario 2: Interest Accrual Over One Year\n");

    let (mut engine, _oracle) = setup(EngineConfig::default())?;
    let lp = AccountId(1);
    let alice = AccountId(2);

    engine.supply(lp, USDC, 100_000 * UNIT)?;
    engine.supply(alice, ETH, 100 * UNIT)?;
    engine.enter_markets(alice, &[ETH])?;
    engine.borrow(alice, USDC, 70_000 * UNIT)?;

    let rate_before = engine.exchange_rate_stored(USDC)?;
    for month in 1..=12u64 {
        engine.advance_blocks(DEFAULT_BLOCKS_PER_YEAR as u64 / 12);
        let outcome = engine.accrue_interest(USDC)?;
        if month % 3 == 0 {
            println!(
                "  Month {:2}: index {}, total borrows {}, reserves {}",
                month,
                outcome.borrow_index,
                units(outcome.total_borrows),
                units(outcome.total_reserves)
            );
        }
    }

    let owed = engine.borrow_balance_current(alice, USDC)?;
    let lp_value = engine.balance_of_underlying(lp, USDC)?;
    println!("  Alice owes {} USDC", units(owed));
    println!("  LP position worth {} USDC", units(lp_value));
    println!(
        "  cUSDC exchange rate {} -> {}\n",
        rate_before,
        engine.exchange_rate_current(USDC)?
    );

    let repaid = engine.repay_borrow(alice, USDC, RepayAmount::Max)?;
    println!("  Alice repays {} USDC in full, remaining {}\n", units(repaid.repaid), units(repaid.account_borrows));
    Ok(())
}

fn scenario_3_price_shock_and_liquidation() -> Result<(), LendingError> {
    println!("Scenario 3: Price Shock and Liquidation\n");

    let (mut engine, oracle) = setup(EngineConfig::default())?;
    let lp = AccountId(1);
    let alice = AccountId(2);
    let liquidator = AccountId(3);

    engine.supply(lp, USDC, 1_000_000 * UNIT)?;
    engine.supply(alice, ETH, 10 * UNIT)?;
    engine.enter_markets(alice, &[ETH])?;
    engine.borrow(alice, USDC, 14_000 * UNIT)?;
    print_liquidity(&engine, "Alice at $2000", alice)?;

    oracle.set_price_decimal(ETH, dec!(1700));
    println!("  ETH drops to $1700");
    print_liquidity(&engine, "Alice at $1700", alice)?;

    let debt = engine.borrow_balance_stored(alice, USDC)?;
    let max = max_repay(engine.registry().risk().close_factor, debt)?;
    println!("  Close factor allows repaying up to {} USDC", units(max));

    match engine.liquidate_borrow(liquidator, alice, USDC, max + 1, ETH) {
        Err(e) => println!("  Repaying one unit more is rejected: {}", e),
        Ok(_) => println!("  Unexpected: over-limit liquidation accepted"),
    }

    let result = engine.liquidate_borrow(liquidator, alice, USDC, max, ETH)?;
    println!(
        "  Liquidator repays {} USDC, seizes {} cETH ({} to liquidator, {} to reserves)",
        units(result.repaid),
        units(result.seize_tokens),
        units(result.liquidator_tokens),
        units(result.protocol_tokens)
    );
    print_liquidity(&engine, "Alice after", alice)?;
    println!("  ETH reserves now {}\n", units(engine.market_snapshot(ETH)?.total_reserves));
    Ok(())
}

fn scenario_4_governance_boost() -> Result<(), LendingError> {
    println!("Scenario 4: Governance Token Boost\n");

    let (mut engine, _oracle) = setup(EngineConfig::default())?;
    let alice = AccountId(2);
    engine.supply(alice, ETH, 10 * UNIT)?;
    engine.enter_markets(alice, &[ETH])?;
    print_liquidity(&engine, "No token configured", alice)?;

    let governance = Arc::new(GovernanceBalances::new());
    governance.set_balance(alice, 2_500 * UNIT);
    let token: Arc<dyn GovernanceToken> = governance;
    engine.set_governance_token(Some(token))?;
    engine.set_boost_params(BoostParams {
        boost_increase: exp(dec!(0.01))?,
        required_token_amount: 1_000 * UNIT,
        max_boost: exp(dec!(0.03))?,
    })?;
    print_liquidity(&engine, "Holding 2,500 GOV (+2%)", alice)?;
    println!();
    Ok(())
}

fn scenario_5_rejected_actions() -> Result<(), LendingError> {
    println!("Scenario 5: Rejected Actions Roll Back\n");

    let (mut engine, _oracle) = setup(EngineConfig::for_environment(Environment::Mainnet))?;
    let alice = AccountId(2);

    match engine.list_market(MarketId(3), exp(dec!(0.95))?, exp(dec!(0.95))?, jump_rate_model()?) {
        Err(e) => println!("  Listing with collateral factor 0.95: {}", e),
        Ok(()) => println!("  Unexpected: listing accepted"),
    }

    engine.supply(alice, ETH, UNIT)?;
    let events_before = engine.events().len();
    match engine.borrow(alice, USDC, UNIT) {
        Err(e) => println!("  Borrowing with no entered collateral: {}", e),
        Ok(_) => println!("  Unexpected: borrow accepted"),
    }
    println!(
        "  Events before {}, after {}, Alice in markets {:?}",
        events_before,
        engine.events().len(),
        engine.assets_in(alice)
    );

    engine.set_paused(ETH, MarketAction::Supply, true)?;
    match engine.supply(alice, ETH, UNIT) {
        Err(e) => println!("  Supplying while paused: {}", e),
        Ok(_) => println!("  Unexpected: supply accepted"),
    }
    Ok(())
}
