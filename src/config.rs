// 3.0 config.rs: protocol-wide risk settings in one place. close factor, incentive, boost.
// 3.1 bounds for every admin-settable factor live here so the registry and the
// config validator agree on them.

use serde::{Deserialize, Serialize};

use crate::error::{LendingError, LendingResult};
use crate::fixed_point::Exp;

/// 0.9: ceiling for both collateral and liquidation factors.
pub const MAX_FACTOR_MANTISSA: u128 = 900_000_000_000_000_000;

/// 0.05
pub const MIN_CLOSE_FACTOR_MANTISSA: u128 = 50_000_000_000_000_000;

/// 0.9
pub const MAX_CLOSE_FACTOR_MANTISSA: u128 = 900_000_000_000_000_000;

/// 1.0, a liquidator never receives less than they repaid.
pub const MIN_LIQUIDATION_INCENTIVE_MANTISSA: u128 = 1_000_000_000_000_000_000;

/// Collateral factor boost granted for holding the governance token.
///
/// `boost = min(max_boost, boost_increase * floor(balance / required_token_amount))`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostParams {
    pub boost_increase: Exp,
    pub required_token_amount: u128,
    pub max_boost: Exp,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            boost_increase: Exp::zero(),
            required_token_amount: 0,
            max_boost: Exp::zero(),
        }
    }
}

impl BoostParams {
    /// Boost for a governance balance. Zero when no step size is configured.
    pub fn boost_for(&self, governance_balance: u128) -> LendingResult<Exp> {
        if self.required_token_amount == 0 {
            return Ok(Exp::zero());
        }
        let steps = governance_balance / self.required_token_amount;
        let boost = self.boost_increase.mul_scalar(steps)?;
        Ok(boost.min(self.max_boost))
    }
}

/// Global risk parameters. one instance per engine, passed around by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Max fraction of a borrow repayable in one liquidation.
    pub close_factor: Exp,
    /// Multiplier on repaid value that determines seized collateral value.
    pub liquidation_incentive: Exp,
    pub boost: BoostParams,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            close_factor: Exp::from_mantissa(500_000_000_000_000_000), // 50%
            liquidation_incentive: Exp::from_mantissa(1_080_000_000_000_000_000), // 8% bonus
            boost: BoostParams::default(),
        }
    }
}

impl RiskParams {
    // tighter closes and a smaller bonus
    pub fn conservative() -> Self {
        Self {
            close_factor: Exp::from_mantissa(250_000_000_000_000_000),
            liquidation_incentive: Exp::from_mantissa(1_050_000_000_000_000_000),
            boost: BoostParams::default(),
        }
    }

    pub fn with_boost(mut self, boost: BoostParams) -> Self {
        self.boost = boost;
        self
    }

    pub fn validate(&self) -> LendingResult<()> {
        validate_close_factor(self.close_factor)?;
        validate_liquidation_incentive(self.liquidation_incentive)?;
        Ok(())
    }
}

pub fn validate_close_factor(value: Exp) -> LendingResult<()> {
    let min = Exp::from_mantissa(MIN_CLOSE_FACTOR_MANTISSA);
    let max = Exp::from_mantissa(MAX_CLOSE_FACTOR_MANTISSA);
    if value < min || value > max {
        return Err(LendingError::ParameterOutOfBounds { parameter: "close_factor", value });
    }
    Ok(())
}

pub fn validate_liquidation_incentive(value: Exp) -> LendingResult<()> {
    if value < Exp::from_mantissa(MIN_LIQUIDATION_INCENTIVE_MANTISSA) {
        return Err(LendingError::ParameterOutOfBounds {
            parameter: "liquidation_incentive",
            value,
        });
    }
    Ok(())
}

/// `0 <= collateral_factor <= liquidation_factor <= 0.9`
pub fn validate_factors(collateral_factor: Exp, liquidation_factor: Exp) -> LendingResult<()> {
    let max = Exp::from_mantissa(MAX_FACTOR_MANTISSA);
    if collateral_factor > max {
        return Err(LendingError::ParameterOutOfBounds {
            parameter: "collateral_factor",
            value: collateral_factor,
        });
    }
    if liquidation_factor < collateral_factor || liquidation_factor > max {
        return Err(LendingError::ParameterOutOfBounds {
            parameter: "liquidation_factor",
            value: liquidation_factor,
        });
    }
    Ok(())
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn risk_params(&self) -> RiskParams {
        match self {
            Environment::Development | Environment::Testnet => RiskParams::default(),
            Environment::Mainnet => RiskParams::conservative(),
        }
    }
}
