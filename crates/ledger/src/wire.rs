// Path: crates/ledger/src/wire.rs
//! JSON shapes of the ledger REST API.

use claimkit_types::prelude::*;
use serde::Deserialize;

/// An unsigned integer the backend sends either as a JSON number or as a
/// decimal (or `0x`-prefixed) string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireUint {
    Number(u64),
    Text(String),
}

impl WireUint {
    pub fn to_u256(&self) -> Result<U256, ClaimError> {
        match self {
            Self::Number(n) => Ok(U256::from(*n)),
            Self::Text(s) => s
                .trim()
                .parse::<U256>()
                .map_err(|e| ClaimError::Decode(format!("invalid integer {s:?}: {e}"))),
        }
    }
}

/// Body of `GET /rewards/claimable/:address`.
#[derive(Debug, Deserialize)]
pub struct ClaimableResponse {
    #[serde(default)]
    pub blockchain: Vec<WireEntitlement>,
    #[serde(default)]
    pub database: Vec<WireLedgerReward>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEntitlement {
    pub chain_id: u64,
    pub campaign_id: WireUint,
    pub quest_id: String,
    pub amount: WireUint,
    #[serde(default)]
    pub proof: Option<Vec<B256>>,
}

impl WireEntitlement {
    pub fn into_entitlement(self) -> Result<Entitlement, ClaimError> {
        let amount = self.amount.to_u256()?;
        Ok(Entitlement {
            chain_id: self.chain_id,
            campaign_id: self.campaign_id.to_u256()?,
            quest_id: self.quest_id,
            amount,
            proof: self.proof.map(|siblings| ClaimProof {
                leaf_amount: amount,
                siblings,
            }),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLedgerReward {
    pub id: String,
    pub amount: WireUint,
    #[serde(default)]
    pub quest_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    #[serde(default)]
    pub status: Option<String>,
}

impl WireLedgerReward {
    pub fn into_reward(self) -> Result<ClaimableReward, ClaimError> {
        let state = match self.status.as_deref() {
            Some("claimed") => RewardState::Claimed,
            _ => RewardState::Unclaimed,
        };
        Ok(ClaimableReward {
            amount: self.amount.to_u256()?,
            deadline: self.expires_at,
            state,
            path: ClaimPath::Ledger(LedgerTerms {
                reward_id: self.id,
                quest_id: self.quest_id,
                title: self.title,
            }),
        })
    }
}

/// Error body of a failed request; either field may carry the reason.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The backend's reason for a failed request, falling back to a snippet of
/// the raw body.
pub fn error_reason(body: &[u8]) -> String {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    parsed
        .error
        .or(parsed.message)
        .unwrap_or_else(|| snippet(body))
}

/// A short single-line rendering of a response body for logs and errors.
pub fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    let cut: String = text.chars().take(160).collect();
    cut.replace(['\n', '\r', '\t'], " ")
}
