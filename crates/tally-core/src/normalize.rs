//! Normalization helpers shared by every ledger transform.

use crate::engine::types::{PayType, PaymentId};
use crate::types::RewardType;

/// Number of hex characters in a short (8-byte) payment id.
const SHORT_PAYMENT_ID_HEX_LEN: usize = 16;

/// Lowercase a hex payment id and collapse it to the short form when every
/// character past the sixteenth is `0`.
#[must_use]
pub fn normalize_payment_id(hex: &str) -> String {
    let lower = hex.to_ascii_lowercase();
    if lower.len() <= SHORT_PAYMENT_ID_HEX_LEN {
        return lower;
    }
    match lower.get(SHORT_PAYMENT_ID_HEX_LEN..) {
        Some(tail) if tail.bytes().all(|b| b == b'0') => {
            lower[..SHORT_PAYMENT_ID_HEX_LEN].to_string()
        }
        _ => lower,
    }
}

#[must_use]
pub fn payment_id_hex(payment_id: &PaymentId) -> String {
    normalize_payment_id(&payment_id.to_hex())
}

/// Blocks mined on top of `block_height`. Never negative: a height of 0
/// marks an unconfirmed entry, and a height above the wallet's tip (reorg)
/// also yields 0.
#[must_use]
pub fn confirmations(wallet_height: u64, block_height: u64) -> u64 {
    if block_height == 0 {
        return 0;
    }
    wallet_height.saturating_sub(block_height)
}

#[must_use]
pub fn reward_type(pay_type: PayType) -> RewardType {
    match pay_type {
        PayType::ServiceNode => RewardType::ServiceNode,
        PayType::Miner => RewardType::Miner,
        _ => RewardType::Unspecified,
    }
}

#[must_use]
pub fn is_stake(pay_type: PayType) -> bool {
    pay_type == PayType::Stake
}
