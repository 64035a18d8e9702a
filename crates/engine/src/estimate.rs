// Path: crates/engine/src/estimate.rs
//! Batch cost estimation and selection-scoped estimate tracking.

use claimkit_api::{CampaignSource, ClaimCall};
use claimkit_telemetry::claim_metrics;
use claimkit_types::config::GasConfig;
use claimkit_types::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Estimates the cost of an on-chain batch.
///
/// Only the first item is simulated; its gas is scaled by the item count.
/// When the simulation fails the flat per-claim constant is used instead and
/// the estimate is flagged as a fallback carrying the simulation error.
#[derive(Debug, Clone)]
pub struct GasEstimator {
    fallback_gas_per_claim: u64,
}

impl GasEstimator {
    pub fn new(config: &GasConfig) -> Self {
        Self {
            fallback_gas_per_claim: config.fallback_gas_per_claim,
        }
    }

    /// Estimates `items` against `source` as seen from `user`.
    ///
    /// Fails only when the gas price cannot be read; that is a network error
    /// and blocks submission.
    pub async fn estimate(
        &self,
        source: &dyn CampaignSource,
        user: Address,
        items: &[ClaimableReward],
    ) -> Result<CostEstimate, ClaimError> {
        let Some(first) = items.first() else {
            return Err(ClaimError::InvalidBatch("cannot estimate an empty batch".into()));
        };
        let count = items.len() as u64;

        let gas_price = source.gas_price().await.map_err(|e| match e {
            ClaimError::NetworkError(_) => e,
            other => ClaimError::NetworkError(other.to_string()),
        })?;

        let simulated = match ClaimCall::for_reward(first) {
            Ok(call) => source.estimate_claim_gas(user, &call).await,
            Err(e) => Err(e),
        };
        let gas_source = match simulated {
            Ok(per_claim) => {
                claim_metrics().inc_estimates("simulated");
                GasSource::Simulated { per_claim }
            }
            Err(e) => {
                tracing::warn!(
                    target: "estimate",
                    error = %e,
                    fallback = self.fallback_gas_per_claim,
                    "gas simulation failed; using flat per-claim estimate"
                );
                claim_metrics().inc_estimates("fallback");
                GasSource::Fallback {
                    per_claim: self.fallback_gas_per_claim,
                    reason: e.to_string(),
                }
            }
        };
        let per_claim = match &gas_source {
            GasSource::Simulated { per_claim } | GasSource::Fallback { per_claim, .. } => {
                *per_claim
            }
        };
        let estimate = CostEstimate::new(gas_price, per_claim.saturating_mul(count), gas_source);
        tracing::debug!(
            target: "estimate",
            items = count,
            gas_units = estimate.gas_units,
            cost_wei = %estimate.estimated_cost,
            approximate = estimate.is_approximate(),
            "batch cost estimated"
        );
        Ok(estimate)
    }
}

/// A token for one estimate request, bound to the selection generation that
/// was current when the request began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateTicket {
    generation: u64,
}

/// Discards estimates whose selection changed while they were in flight.
///
/// Every selection change (and every new request) bumps the generation; an
/// estimate is only published when its ticket still matches.
#[derive(Debug, Default)]
pub struct EstimateTracker {
    generation: AtomicU64,
    current: Mutex<Option<(u64, CostEstimate)>>,
}

impl EstimateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request for the selection as it is now.
    pub fn begin(&self) -> EstimateTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        EstimateTicket { generation }
    }

    /// Records that the selection changed; in-flight estimates become stale.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Publishes `estimate` if `ticket` is still current.
    pub fn publish(&self, ticket: EstimateTicket, estimate: CostEstimate) -> EstimateOutcome {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) != ticket.generation {
            tracing::debug!(target: "estimate", generation = ticket.generation, "discarding superseded estimate");
            return EstimateOutcome::Superseded;
        }
        *current = Some((ticket.generation, estimate.clone()));
        EstimateOutcome::Current(estimate)
    }

    /// The published estimate for the current selection, if any.
    pub fn latest(&self) -> Option<CostEstimate> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.load(Ordering::SeqCst);
        current
            .as_ref()
            .filter(|(g, _)| *g == generation)
            .map(|(_, e)| e.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimkit_test_utils::fixtures::{self, NOW};
    use claimkit_test_utils::mocks::MockDistributor;

    fn distributor() -> MockDistributor {
        let d = MockDistributor::new(fixtures::CHAIN_ID);
        d.add_campaign(7, fixtures::campaign(7, NOW + 3600));
        d.add_campaign(8, fixtures::campaign(8, NOW + 3600));
        d
    }

    #[tokio::test]
    async fn scales_first_item_simulation_by_count() {
        let d = distributor();
        let items = vec![
            fixtures::on_chain_reward(7, 100),
            fixtures::on_chain_reward(8, 50),
        ];
        let estimate = GasEstimator::new(&GasConfig::default())
            .estimate(&d, fixtures::user(), &items)
            .await
            .expect("estimate");
        assert_eq!(estimate.gas_source, GasSource::Simulated { per_claim: 80_000 });
        assert_eq!(estimate.gas_units, 160_000);
        assert_eq!(
            estimate.estimated_cost,
            U256::from(1_000_000_000u64) * U256::from(160_000u64)
        );
        assert_eq!(d.estimate_calls(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_flat_constant_and_flags_it() {
        let d = distributor();
        d.set_per_claim_gas(None);
        let items = vec![
            fixtures::on_chain_reward(7, 100),
            fixtures::on_chain_reward(8, 50),
        ];
        let estimate = GasEstimator::new(&GasConfig::default())
            .estimate(&d, fixtures::user(), &items)
            .await
            .expect("fallback still estimates");
        assert!(estimate.is_approximate());
        assert_eq!(estimate.gas_units, 300_000);
        match estimate.gas_source {
            GasSource::Fallback { reason, .. } => assert!(reason.contains("Invalid proof")),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[tokio::test]
    async fn gas_price_failure_blocks_estimation() {
        let d = distributor();
        d.set_gas_price(None);
        let err = GasEstimator::new(&GasConfig::default())
            .estimate(&d, fixtures::user(), &[fixtures::on_chain_reward(7, 100)])
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::NetworkError(_)));
    }

    #[test]
    fn tracker_discards_superseded_estimates() {
        let tracker = EstimateTracker::new();
        let stale = tracker.begin();
        let fresh = tracker.begin();
        let estimate = CostEstimate::new(1, 1, GasSource::Simulated { per_claim: 1 });

        assert_eq!(
            tracker.publish(stale, estimate.clone()),
            EstimateOutcome::Superseded
        );
        assert_eq!(
            tracker.publish(fresh, estimate.clone()),
            EstimateOutcome::Current(estimate.clone())
        );
        assert_eq!(tracker.latest(), Some(estimate));
        tracker.invalidate();
        assert_eq!(tracker.latest(), None);
    }
}
