// Path: crates/ledger/src/client.rs
//! `LedgerSource` over the ledger REST API.

use crate::wire::{error_reason, snippet, ClaimableResponse};
use async_trait::async_trait;
use claimkit_api::{LedgerListing, LedgerSource};
use claimkit_types::config::LedgerConfig;
use claimkit_types::prelude::*;
use reqwest::{
    header::{HeaderValue, RETRY_AFTER},
    Client, StatusCode, Url,
};
use tokio::time::{sleep, Duration};

/// Upper bound on a single backoff delay, including `Retry-After`.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// A bearer-authenticated client for the rewards ledger.
///
/// Reads are retried on transport errors, 429 and 5xx with exponential
/// backoff (honouring `Retry-After`). Claims are sent exactly once: a lost
/// response is reported as a network error and left to reconciliation.
#[derive(Clone, Debug)]
pub struct HttpLedgerClient {
    base: Url,
    client: Client,
    max_retries: usize,
    base_backoff_ms: u64,
}

impl HttpLedgerClient {
    pub fn new(config: &LedgerConfig) -> Result<Self, ClaimError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClaimError::NetworkError(format!("http client: {e}")))?;
        let base = Url::parse(config.base_url.trim())
            .map_err(|e| ClaimError::Decode(format!("ledger base_url {:?}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(ClaimError::Decode(format!(
                "ledger base_url {:?} cannot carry a path",
                config.base_url
            )));
        }
        Ok(Self {
            base,
            client,
            max_retries: config.max_retries,
            base_backoff_ms: config.base_backoff_ms,
        })
    }

    /// `base` extended by `segments`, each percent-encoded as one path
    /// segment. Ids are opaque: `/`, `?` and `#` stay inside their segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClaimError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClaimError::Decode(format!("ledger base_url {} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn retry_delay(&self, attempt: usize, retry_after: Option<&HeaderValue>) -> Duration {
        if let Some(secs) = retry_after
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            return Duration::from_secs(secs).min(MAX_BACKOFF);
        }
        let shift = u32::try_from(attempt).unwrap_or(u32::MAX).min(16);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(1u64 << shift)).min(MAX_BACKOFF)
    }

    /// GET with the read retry policy; returns the final status and body.
    async fn get_with_retry(&self, url: &Url, token: &str) -> Result<(StatusCode, Vec<u8>), ClaimError> {
        let mut attempt = 0;
        loop {
            let resp = self.client.get(url.clone()).bearer_auth(token).send().await;
            let resp = match resp {
                Ok(r) => r,
                Err(e) => {
                    if attempt < self.max_retries {
                        tracing::debug!(target: "ledger", attempt, error = %e, "ledger send error; retrying");
                        sleep(self.retry_delay(attempt, None)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(ClaimError::NetworkError(format!(
                        "ledger unreachable after {attempt} retries: {e}"
                    )));
                }
            };

            let status = resp.status();
            let retry_after = resp.headers().get(RETRY_AFTER).cloned();
            let body = resp
                .bytes()
                .await
                .map_err(|e| ClaimError::NetworkError(format!("ledger body: {e}")))?
                .to_vec();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt < self.max_retries {
                    let delay = self.retry_delay(attempt, retry_after.as_ref());
                    tracing::debug!(
                        target: "ledger",
                        status = status.as_u16(),
                        ?delay,
                        body = %snippet(&body),
                        "ledger busy; backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Err(ClaimError::NetworkError(format!(
                    "ledger HTTP {} after {} retries: {}",
                    status.as_u16(),
                    self.max_retries,
                    snippet(&body)
                )));
            }
            return Ok((status, body));
        }
    }
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

#[async_trait]
impl LedgerSource for HttpLedgerClient {
    async fn fetch_claimable(
        &self,
        session: &ClaimSession,
        user: Address,
    ) -> Result<LedgerListing, ClaimError> {
        let token = session.require_bearer()?;
        let url = self.endpoint(&["rewards", "claimable", &user.to_string()])?;
        let (status, body) = self.get_with_retry(&url, token).await?;

        if is_auth_failure(status) {
            return Err(ClaimError::LedgerAuthExpired);
        }
        if !status.is_success() {
            return Err(ClaimError::NetworkError(format!(
                "ledger HTTP {}: {}",
                status.as_u16(),
                error_reason(&body)
            )));
        }

        let parsed: ClaimableResponse = serde_json::from_slice(&body)
            .map_err(|e| ClaimError::Decode(format!("claimable listing: {e}")))?;
        let rewards = parsed
            .database
            .into_iter()
            .map(|r| r.into_reward())
            .collect::<Result<Vec<_>, _>>()?;
        let entitlements = parsed
            .blockchain
            .into_iter()
            .map(|e| e.into_entitlement())
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            target: "ledger",
            %user,
            rewards = rewards.len(),
            entitlements = entitlements.len(),
            "fetched claimable listing"
        );
        Ok(LedgerListing {
            rewards,
            entitlements,
        })
    }

    async fn claim(&self, session: &ClaimSession, reward_id: &str) -> Result<(), ClaimError> {
        let token = session.require_bearer()?;
        let url = self.endpoint(&["rewards", "claim", reward_id])?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ClaimError::NetworkError(format!("claim {reward_id}: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        if is_auth_failure(status) {
            return Err(ClaimError::LedgerAuthExpired);
        }
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            return Err(ClaimError::LedgerClaimRejected {
                reward_id: reward_id.to_string(),
                reason: error_reason(&body),
            });
        }
        // 429 and 5xx: the backend may or may not have committed.
        Err(ClaimError::NetworkError(format!(
            "claim {reward_id}: HTTP {}: {}",
            status.as_u16(),
            snippet(&body)
        )))
    }
}
