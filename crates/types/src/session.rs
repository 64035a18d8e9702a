// Path: crates/types/src/session.rs
//! The explicit wallet/auth context threaded through every engine call.

use crate::error::ClaimError;
use alloy_primitives::Address;
use std::fmt;

/// Who is claiming, and how they authenticate against the ledger.
///
/// Passed into adapters and the router per call instead of living in a
/// process-wide singleton, so the engine can be driven without a live wallet.
#[derive(Clone, Default)]
pub struct ClaimSession {
    account: Option<Address>,
    bearer_token: Option<String>,
}

impl ClaimSession {
    /// A session with a connected account and optional ledger token.
    pub fn new(account: Address, bearer_token: Option<String>) -> Self {
        Self {
            account: Some(account),
            bearer_token,
        }
    }

    /// A session with no wallet connected.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// The connected account, if any.
    pub fn account(&self) -> Option<Address> {
        self.account
    }

    /// The connected account or `WalletNotConnected`.
    pub fn require_account(&self) -> Result<Address, ClaimError> {
        self.account.ok_or(ClaimError::WalletNotConnected)
    }

    /// The ledger bearer token or `LedgerAuthExpired`.
    pub fn require_bearer(&self) -> Result<&str, ClaimError> {
        self.bearer_token
            .as_deref()
            .ok_or(ClaimError::LedgerAuthExpired)
    }
}

impl fmt::Debug for ClaimSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimSession")
            .field("account", &self.account)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
