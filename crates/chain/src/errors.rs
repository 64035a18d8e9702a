// Path: crates/chain/src/errors.rs
//! Normalization of provider and contract failures into [`ClaimError`].

use alloy::contract::Error as ContractError;
use alloy::sol_types::{decode_revert_reason, Panic, Revert, SolError};
use alloy::transports::TransportError;
use claimkit_types::error::ClaimError;

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// Human-readable reason for raw revert data.
///
/// Standard `Error(string)` and `Panic(uint256)` payloads are decoded;
/// anything else (custom errors) is rendered as hex so it is never dropped.
pub fn revert_reason(data: &[u8]) -> String {
    if data.is_empty() {
        return "execution reverted".to_string();
    }
    if let Ok(revert) = Revert::abi_decode(data) {
        return revert.reason().to_string();
    }
    if let Ok(panic) = Panic::abi_decode(data) {
        return panic.to_string();
    }
    decode_revert_reason(data)
        .unwrap_or_else(|| format!("execution reverted: 0x{}", hex::encode(data)))
}

/// Classifies a JSON-RPC error response.
pub fn classify_rpc_error(code: i64, message: &str, revert: Option<&[u8]>) -> ClaimError {
    if code == USER_REJECTED_CODE {
        return ClaimError::UserRejectedTransaction;
    }
    if let Some(data) = revert {
        return ClaimError::SimulationFailed(revert_reason(data));
    }
    let lower = message.to_ascii_lowercase();
    if lower.contains("user rejected") || lower.contains("user denied") {
        return ClaimError::UserRejectedTransaction;
    }
    if lower.contains("revert") {
        return ClaimError::SimulationFailed(message.to_string());
    }
    ClaimError::NetworkError(format!("rpc error {code}: {message}"))
}

/// Normalizes a transport-level failure.
pub fn from_transport(err: &TransportError) -> ClaimError {
    match err.as_error_resp() {
        Some(payload) => {
            let revert = payload.as_revert_data();
            classify_rpc_error(payload.code, &payload.message, revert.as_ref().map(|b| b.as_ref()))
        }
        None => ClaimError::NetworkError(err.to_string()),
    }
}

/// Normalizes a contract-binding failure for a distributor on `chain_id`.
pub fn from_contract(chain_id: u64, err: ContractError) -> ClaimError {
    match err {
        ContractError::TransportError(e) => from_transport(&e),
        // `eth_call` returned `0x`: nothing is deployed at the address.
        ContractError::ZeroData(..) => ClaimError::ContractNotDeployed(chain_id),
        other => match other.as_revert_data() {
            Some(data) => ClaimError::SimulationFailed(revert_reason(&data)),
            None => ClaimError::Decode(other.to_string()),
        },
    }
}

/// Revert reason recovered from a replayed call, if the replay reverted.
pub fn replay_revert_reason(err: &TransportError) -> Option<String> {
    let payload = err.as_error_resp()?;
    match payload.as_revert_data() {
        Some(data) => Some(revert_reason(&data)),
        None => Some(payload.message.to_string()),
    }
}
