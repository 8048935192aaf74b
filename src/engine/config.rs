//! Engine configuration options.

use crate::config::{Environment, RiskParams};
use crate::error::{LendingError, LendingResult};
use crate::fixed_point::Exp;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Underlying per market token before the first mint.
    pub initial_exchange_rate: Exp,
    /// Fraction of every seizure kept by the protocol.
    pub protocol_seize_share: Exp,
    /// Accrual refuses to run above this per-block borrow rate.
    pub max_borrow_rate_per_block: Exp,
    /// Close factor, liquidation incentive and boost the registry starts with.
    pub risk: RiskParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            initial_exchange_rate: Exp::from_mantissa(20_000_000_000_000_000), // 0.02
            protocol_seize_share: Exp::from_mantissa(28_000_000_000_000_000),  // 2.8%
            max_borrow_rate_per_block: Exp::from_mantissa(5_000_000_000_000), // 0.0005%
            risk: RiskParams::default(),
        }
    }
}

impl EngineConfig {
    pub fn for_environment(env: Environment) -> Self {
        Self {
            risk: env.risk_params(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> LendingResult<()> {
        self.risk.validate()?;
        if self.initial_exchange_rate.is_zero() {
            return Err(LendingError::ParameterOutOfBounds {
                parameter: "initial_exchange_rate",
                value: self.initial_exchange_rate,
            });
        }
        if self.protocol_seize_share > Exp::one() {
            return Err(LendingError::ParameterOutOfBounds {
                parameter: "protocol_seize_share",
                value: self.protocol_seize_share,
            });
        }
        Ok(())
    }
}
