// 2.0: scaled-integer decimals. Exp carries 18 implied decimals, Double carries 36.
// mantissas are U256 so intermediate products never need floating point.
// every operation is checked: overflow, underflow and division by zero surface as MathError.
// the two scales are distinct types; mixing them needs an explicit rescale.

use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 1e18, the scale of an [`Exp`] mantissa.
pub const EXP_SCALE: u128 = 1_000_000_000_000_000_000;

/// 0.5e18, used when rounding half-up is requested explicitly.
pub const HALF_EXP_SCALE: u128 = EXP_SCALE / 2;

pub fn exp_scale() -> U256 {
    U256::from(EXP_SCALE)
}

/// 1e36, the scale of a [`Double`] mantissa.
pub fn double_scale() -> U256 {
    U256::from(EXP_SCALE) * U256::from(EXP_SCALE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,
}

// 2.1: raw checked helpers. everything below funnels through these.

fn add_u256(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

fn sub_u256(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}

fn mul_u256(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

fn div_u256(a: U256, b: U256) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    Ok(a / b)
}

/// Narrow a U256 into a token amount.
pub fn to_u128(value: U256) -> Result<u128, MathError> {
    if value > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(value.low_u128())
}

pub fn checked_add(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}

/// `ceil(a * b / denominator)`
pub fn mul_div_ceil(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = mul_u256(a, b)?;
    let quotient = product / denominator;
    if (product % denominator).is_zero() {
        Ok(quotient)
    } else {
        add_u256(quotient, U256::one())
    }
}

/// 2.2: single precision decimal. `mantissa / 1e18`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Exp {
    mantissa: U256,
}

impl Exp {
    pub fn zero() -> Self {
        Self { mantissa: U256::zero() }
    }

    pub fn one() -> Self {
        Self { mantissa: exp_scale() }
    }

    pub fn from_mantissa(mantissa: u128) -> Self {
        Self { mantissa: U256::from(mantissa) }
    }

    pub fn from_raw(mantissa: U256) -> Self {
        Self { mantissa }
    }

    pub fn mantissa(&self) -> U256 {
        self.mantissa
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// `n` as a whole number, e.g. 3 -> 3.0
    pub fn from_integer(n: u128) -> Result<Self, MathError> {
        Ok(Self { mantissa: mul_u256(U256::from(n), exp_scale())? })
    }

    /// `numerator / denominator` at 18 decimals, truncated.
    pub fn from_ratio(numerator: u128, denominator: u128) -> Result<Self, MathError> {
        let scaled = mul_u256(U256::from(numerator), exp_scale())?;
        Ok(Self { mantissa: div_u256(scaled, U256::from(denominator))? })
    }

    /// Convert a human decimal. Digits past the 18th are truncated; negatives are rejected.
    pub fn from_decimal(value: Decimal) -> Result<Self, MathError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MathError::Underflow);
        }
        let digits = U256::from(value.mantissa().unsigned_abs());
        let scale = value.scale() as usize;
        let mantissa = if scale <= 18 {
            mul_u256(digits, U256::exp10(18 - scale))?
        } else {
            digits / U256::exp10(scale - 18)
        };
        Ok(Self { mantissa })
    }

    /// Lossless when the mantissa fits in 96 bits, None otherwise.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let m = to_u128(self.mantissa).ok()?;
        let m = i128::try_from(m).ok()?;
        Decimal::try_from_i128_with_scale(m, 18).ok().map(|d| d.normalize())
    }

    pub fn add(&self, other: Exp) -> Result<Exp, MathError> {
        Ok(Exp { mantissa: add_u256(self.mantissa, other.mantissa)? })
    }

    pub fn sub(&self, other: Exp) -> Result<Exp, MathError> {
        Ok(Exp { mantissa: sub_u256(self.mantissa, other.mantissa)? })
    }

    /// `a * b / 1e18`, truncated toward zero.
    pub fn mul(&self, other: Exp) -> Result<Exp, MathError> {
        let product = mul_u256(self.mantissa, other.mantissa)?;
        Ok(Exp { mantissa: product / exp_scale() })
    }

    pub fn mul_scalar(&self, n: u128) -> Result<Exp, MathError> {
        Ok(Exp { mantissa: mul_u256(self.mantissa, U256::from(n))? })
    }

    /// `a * 1e18 / b`, truncated toward zero.
    pub fn div(&self, other: Exp) -> Result<Exp, MathError> {
        let scaled = mul_u256(self.mantissa, exp_scale())?;
        Ok(Exp { mantissa: div_u256(scaled, other.mantissa)? })
    }

    pub fn div_scalar(&self, n: u128) -> Result<Exp, MathError> {
        Ok(Exp { mantissa: div_u256(self.mantissa, U256::from(n))? })
    }

    /// Integer part, rounding toward zero.
    pub fn truncate(&self) -> Result<u128, MathError> {
        to_u128(self.mantissa / exp_scale())
    }

    /// `n / self`, truncated. turns an underlying amount into tokens at this rate.
    pub fn div_into_scalar(&self, n: u128) -> Result<u128, MathError> {
        let scaled = mul_u256(U256::from(n), exp_scale())?;
        to_u128(div_u256(scaled, self.mantissa)?)
    }

    /// `n / self`, rounded up. for amounts the protocol takes back, never short.
    pub fn div_into_scalar_ceil(&self, n: u128) -> Result<u128, MathError> {
        to_u128(mul_div_ceil(U256::from(n), exp_scale(), self.mantissa)?)
    }

    /// `truncate(self * n)`. the workhorse for turning rates into token amounts.
    pub fn mul_scalar_truncate(&self, n: u128) -> Result<u128, MathError> {
        self.mul_scalar(n)?.truncate()
    }

    /// `truncate(self * n) + addend`
    pub fn mul_scalar_truncate_add(&self, n: u128, addend: u128) -> Result<u128, MathError> {
        checked_add(self.mul_scalar_truncate(n)?, addend)
    }

    /// Rescale to 36 decimals. exact.
    pub fn to_double(&self) -> Result<Double, MathError> {
        Ok(Double { mantissa: mul_u256(self.mantissa, exp_scale())? })
    }

    pub fn min(self, other: Exp) -> Exp {
        std::cmp::min(self, other)
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(d) => write!(f, "{}", d),
            None => write!(f, "{}e-18", self.mantissa),
        }
    }
}

/// 2.3: double precision decimal. `mantissa / 1e36`. used where products of two
/// Exp values must be kept whole before a final division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Double {
    mantissa: U256,
}

impl Double {
    pub fn zero() -> Self {
        Self { mantissa: U256::zero() }
    }

    pub fn one() -> Self {
        Self { mantissa: double_scale() }
    }

    pub fn from_raw(mantissa: U256) -> Self {
        Self { mantissa }
    }

    pub fn mantissa(&self) -> U256 {
        self.mantissa
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// The exact product of two Exp values. 1e18 * 1e18 lands on the 1e36 scale
    /// with no truncation.
    pub fn product(a: Exp, b: Exp) -> Result<Double, MathError> {
        Ok(Double { mantissa: mul_u256(a.mantissa, b.mantissa)? })
    }

    pub fn add(&self, other: Double) -> Result<Double, MathError> {
        Ok(Double { mantissa: add_u256(self.mantissa, other.mantissa)? })
    }

    pub fn sub(&self, other: Double) -> Result<Double, MathError> {
        Ok(Double { mantissa: sub_u256(self.mantissa, other.mantissa)? })
    }

    pub fn mul(&self, other: Double) -> Result<Double, MathError> {
        let product = mul_u256(self.mantissa, other.mantissa)?;
        Ok(Double { mantissa: product / double_scale() })
    }

    pub fn div(&self, other: Double) -> Result<Double, MathError> {
        let scaled = mul_u256(self.mantissa, double_scale())?;
        Ok(Double { mantissa: div_u256(scaled, other.mantissa)? })
    }

    pub fn mul_scalar(&self, n: u128) -> Result<Double, MathError> {
        Ok(Double { mantissa: mul_u256(self.mantissa, U256::from(n))? })
    }

    pub fn truncate(&self) -> Result<u128, MathError> {
        to_u128(self.mantissa / double_scale())
    }

    /// Rescale to 18 decimals, truncating the low digits.
    pub fn to_exp(&self) -> Exp {
        Exp { mantissa: self.mantissa / exp_scale() }
    }

    /// `n / self`, truncated. n is a plain integer.
    pub fn div_into_scalar(&self, n: u128) -> Result<u128, MathError> {
        let scaled = mul_u256(U256::from(n), double_scale())?;
        to_u128(div_u256(scaled, self.mantissa)?)
    }
}

impl fmt::Display for Double {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_exp())
    }
}

/// `a / b` at 36 decimals.
pub fn fraction(a: u128, b: u128) -> Result<Double, MathError> {
    let scaled = mul_u256(U256::from(a), double_scale())?;
    Ok(Double { mantissa: div_u256(scaled, U256::from(b))? })
}
