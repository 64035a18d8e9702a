// Path: crates/types/src/estimate.rs
//! Pre-flight cost estimates for on-chain claim batches.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Where the gas unit figure of an estimate came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GasSource {
    /// A dry run of the first claim, scaled by item count.
    Simulated {
        /// Gas of one simulated claim.
        per_claim: u64,
    },
    /// The flat per-claim constant, used when simulation failed.
    Fallback {
        /// The configured per-claim constant.
        per_claim: u64,
        /// Why simulation could not be used.
        reason: String,
    },
}

/// Estimated cost of submitting a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Network gas price in wei.
    pub gas_price: u128,
    /// Estimated gas units for the whole batch.
    pub gas_units: u64,
    /// `gas_price * gas_units` in wei.
    pub estimated_cost: U256,
    /// Origin of `gas_units`.
    pub gas_source: GasSource,
}

impl CostEstimate {
    /// Builds an estimate; the cost is an exact integer product.
    pub fn new(gas_price: u128, gas_units: u64, gas_source: GasSource) -> Self {
        let estimated_cost = U256::from(gas_price) * U256::from(gas_units);
        Self {
            gas_price,
            gas_units,
            estimated_cost,
            gas_source,
        }
    }

    /// True when the estimate is the flat fallback rather than a simulation.
    pub fn is_approximate(&self) -> bool {
        matches!(self.gas_source, GasSource::Fallback { .. })
    }
}

/// Result of an estimate request under selection tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstimateOutcome {
    /// The estimate belongs to the current selection.
    Current(CostEstimate),
    /// The selection changed while this estimate was in flight; discard it.
    Superseded,
}

/// Formats a smallest-unit amount with `decimals` fractional digits.
///
/// The output is exact: trailing zeros are trimmed but no significant digit
/// is dropped, so a non-zero amount never renders as `0`. Decimals beyond
/// what a `U256` can scale (more than 77) fall back to the raw amount.
pub fn format_units(amount: U256, decimals: u8) -> String {
    match alloy_primitives::utils::format_units(amount, decimals) {
        Ok(formatted) if formatted.contains('.') => formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        Ok(formatted) => formatted,
        Err(_) => amount.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_price_times_units() {
        let e = CostEstimate::new(
            2_000_000_000,
            300_000,
            GasSource::Simulated { per_claim: 150_000 },
        );
        assert_eq!(e.estimated_cost, U256::from(600_000_000_000_000u64));
        assert!(!e.is_approximate());
    }

    #[test]
    fn tiny_costs_are_not_rounded_to_zero() {
        assert_eq!(format_units(U256::from(1u64), 18), "0.000000000000000001");
        assert_eq!(
            format_units(U256::from(1_500_000_000_000_000_000u64), 18),
            "1.5"
        );
        assert_eq!(format_units(U256::ZERO, 18), "0");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
        assert_eq!(format_units(U256::from(100u64), 0), "100");
        assert_eq!(format_units(U256::from(2_000_000u64), 6), "2");
    }
}
