//! Shared test helpers for `tally-core` unit tests.
//!
//! Builders for raw ledger entries with sane defaults, so tests across
//! modules construct dummy engine data the same way.

use std::collections::BTreeSet;

use crate::engine::types::{
    ConfirmedTransferDetails, Destination, PayType, PaymentDetails, PaymentId, PoolPaymentDetails,
    PublicKey, SubaddressIndex, TransferState, TxHash, UnconfirmedTransferDetails,
};

// ==============================================================================
// Identifier Helpers
// ==============================================================================

/// Create a deterministic `TxHash` from a single distinguishing byte.
pub fn hash_from_byte(b: u8) -> TxHash {
    let mut bytes = [0u8; 32];
    bytes[0] = b;
    TxHash(bytes)
}

/// A payment id that only uses its first byte, i.e. a short id.
pub fn short_payment_id(b: u8) -> PaymentId {
    let mut bytes = [0u8; 32];
    bytes[0] = b;
    PaymentId(bytes)
}

// ==============================================================================
// Ledger Entry Builders
// ==============================================================================

pub fn payment(tx_hash: TxHash, amount: u64, block_height: u64) -> PaymentDetails {
    PaymentDetails {
        tx_hash,
        amount,
        subaddr_index: SubaddressIndex::default(),
        block_height,
        timestamp: 1_700_000_000,
        unlock_time: 0,
        pay_type: PayType::In,
    }
}

pub fn pool_payment(payment: PaymentDetails) -> PoolPaymentDetails {
    PoolPaymentDetails {
        payment,
        double_spend_seen: false,
    }
}

/// A destination whose keys are derived from `key_byte`, with a pre-rendered
/// address so snapshot-style renderers can return it directly.
pub fn destination(amount: u64, key_byte: u8) -> Destination {
    let mut spend = [0u8; 32];
    spend[0] = key_byte;
    let mut view = [0u8; 32];
    view[31] = key_byte;
    Destination {
        amount,
        spend_public_key: PublicKey(spend),
        view_public_key: PublicKey(view),
        is_subaddress: false,
        is_integrated: false,
        original: Some(format!("T{key_byte:02x}addr")),
    }
}

pub fn confirmed_transfer(
    amount_in: u64,
    amount_out: u64,
    change: Option<u64>,
    block_height: u64,
) -> ConfirmedTransferDetails {
    ConfirmedTransferDetails {
        amount_in,
        amount_out,
        change,
        block_height,
        timestamp: 1_700_000_100,
        subaddr_account: 0,
        subaddr_indices: BTreeSet::from([0]),
        pay_type: PayType::Out,
        payment_id: PaymentId::default(),
        dests: Vec::new(),
    }
}

pub fn unconfirmed_transfer(
    amount_in: u64,
    amount_out: u64,
    change: Option<u64>,
) -> UnconfirmedTransferDetails {
    UnconfirmedTransferDetails {
        amount_in,
        amount_out,
        change,
        timestamp: 1_700_000_200,
        subaddr_account: 0,
        subaddr_indices: BTreeSet::from([0]),
        pay_type: PayType::Out,
        payment_id: PaymentId::default(),
        state: TransferState::Pending,
    }
}
