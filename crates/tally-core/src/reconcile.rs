//! Ledger reconciliation: pulls the engine's four ledgers and folds them into
//! one ordered list of [`TransactionRecord`]s.
//!
//! Order is the concatenation incoming-confirmed, outgoing-confirmed,
//! outgoing-unconfirmed, incoming-pool, each in the order the engine
//! reported. No cross-category sort is applied.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::engine::types::{
    ConfirmedTransferDetails, Destination, IncomingLedger, OutgoingLedger, PaymentDetails,
    PaymentId, PendingLedger, PoolLedger, PoolPaymentDetails, SubaddressIndex, TransferState,
    TxHash, UnconfirmedTransferDetails,
};
use crate::engine::{NetworkType, WalletEngine};
use crate::error::CoreError;
use crate::history::HistoryConfig;
use crate::normalize::{confirmations, is_stake, payment_id_hex, reward_type};
use crate::types::{Direction, RewardType, TransactionRecord, Transfer};

// ==============================================================================
// Fetched State
// ==============================================================================

/// Everything one refresh reads from the engine.
#[derive(Debug, Clone)]
pub struct Ledgers {
    pub wallet_height: u64,
    pub network: NetworkType,
    pub incoming: IncomingLedger,
    pub outgoing: OutgoingLedger,
    pub pending: PendingLedger,
    pub pool: PoolLedger,
}

/// Labels and rendered addresses resolved ahead of the transform, so the
/// per-entry builders stay synchronous.
#[derive(Debug, Default, Clone)]
pub struct Lookups {
    labels: HashMap<SubaddressIndex, String>,
    addresses: HashMap<(Destination, PaymentId), String>,
}

impl Lookups {
    pub fn with_label(mut self, index: SubaddressIndex, label: impl Into<String>) -> Self {
        self.labels.insert(index, label.into());
        self
    }

    pub fn with_address(
        mut self,
        destination: Destination,
        payment_id: PaymentId,
        address: impl Into<String>,
    ) -> Self {
        self.addresses
            .insert((destination, payment_id), address.into());
        self
    }

    fn label(&self, index: SubaddressIndex) -> String {
        self.labels.get(&index).cloned().unwrap_or_default()
    }

    fn address(&self, destination: &Destination, payment_id: &PaymentId) -> String {
        // Keys are cloned for the lookup because the map is keyed by owned pairs.
        self.addresses
            .get(&(destination.clone(), *payment_id))
            .cloned()
            .unwrap_or_default()
    }
}

pub async fn fetch_ledgers(
    engine: &dyn WalletEngine,
    config: &HistoryConfig,
) -> Result<Ledgers, CoreError> {
    let (wallet_height, network, incoming, outgoing, pending, pool) = futures::try_join!(
        engine.blockchain_height(),
        engine.network_type(),
        engine.incoming_payments(config.min_height, config.max_height),
        engine.outgoing_transfers(config.min_height, config.max_height),
        engine.unconfirmed_outgoing_transfers(),
        engine.pool_payments(),
    )?;

    debug!(
        wallet_height,
        %network,
        incoming = incoming.len(),
        outgoing = outgoing.len(),
        pending = pending.len(),
        pool = pool.len(),
        "fetched wallet ledgers"
    );

    Ok(Ledgers {
        wallet_height,
        network,
        incoming,
        outgoing,
        pending,
        pool,
    })
}

/// Resolve every distinct label and destination address the ledgers need,
/// using the engine's batch lookups.
pub async fn resolve_lookups(
    engine: &dyn WalletEngine,
    ledgers: &Ledgers,
) -> Result<Lookups, CoreError> {
    let mut seen_labels = HashSet::new();
    let mut label_keys = Vec::new();
    let mut want_label = |index: SubaddressIndex| {
        if seen_labels.insert(index) {
            label_keys.push(index);
        }
    };

    for (_, pd) in &ledgers.incoming {
        want_label(pd.subaddr_index);
    }
    for (_, pd) in &ledgers.pool {
        want_label(pd.payment.subaddr_index);
    }
    for (_, td) in &ledgers.outgoing {
        if let Some(index) = single_index(td.subaddr_account, &td.subaddr_indices) {
            want_label(index);
        }
    }
    for (_, td) in &ledgers.pending {
        if let Some(index) = single_index(td.subaddr_account, &td.subaddr_indices) {
            want_label(index);
        }
    }

    let mut seen_addresses = HashSet::new();
    let mut address_keys = Vec::new();
    for (_, td) in &ledgers.outgoing {
        for dest in &td.dests {
            let key = (dest.clone(), td.payment_id);
            if seen_addresses.insert(key.clone()) {
                address_keys.push(key);
            }
        }
    }

    let labels = engine.subaddress_labels(&label_keys).await?;
    let addresses = engine
        .destination_addresses(&address_keys, ledgers.network)
        .await?;

    if labels.len() != label_keys.len() || addresses.len() != address_keys.len() {
        return Err(CoreError::InvalidData(format!(
            "engine returned {} labels for {} indices and {} addresses for {} destinations",
            labels.len(),
            label_keys.len(),
            addresses.len(),
            address_keys.len()
        )));
    }

    Ok(Lookups {
        labels: label_keys.into_iter().zip(labels).collect(),
        addresses: address_keys.into_iter().zip(addresses).collect(),
    })
}

fn single_index(account: u32, indices: &BTreeSet<u32>) -> Option<SubaddressIndex> {
    match (indices.len(), indices.first()) {
        (1, Some(minor)) => Some(SubaddressIndex::new(account, *minor)),
        _ => None,
    }
}

// ==============================================================================
// Amount Accounting
// ==============================================================================

/// Net amount and fee of an outgoing transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutgoingAmounts {
    pub amount: u64,
    pub fee: u64,
}

/// `fee = amount_in - amount_out`, `amount = amount_in - change - fee`.
///
/// Unknown change counts as zero, which can overstate the net amount.
/// Inconsistent inputs saturate at zero and are logged.
#[must_use]
pub fn outgoing_amounts(
    hash: &TxHash,
    amount_in: u64,
    amount_out: u64,
    change: Option<u64>,
) -> OutgoingAmounts {
    let change = change.unwrap_or(0);
    let fee = amount_in.checked_sub(amount_out).unwrap_or_else(|| {
        warn!(%hash, amount_in, amount_out, "amount_out exceeds amount_in; fee clamped to 0");
        0
    });
    let amount = amount_in
        .checked_sub(change)
        .and_then(|rest| rest.checked_sub(fee))
        .unwrap_or_else(|| {
            warn!(%hash, amount_in, change, fee, "change and fee exceed amount_in; amount clamped to 0");
            0
        });
    OutgoingAmounts { amount, fee }
}

// ==============================================================================
// Per-Category Transforms
// ==============================================================================

pub fn incoming_record(
    payment_id: &PaymentId,
    pd: &PaymentDetails,
    wallet_height: u64,
    lookups: &Lookups,
) -> TransactionRecord {
    TransactionRecord {
        hash: pd.tx_hash.to_hex(),
        payment_id: payment_id_hex(payment_id),
        direction: Direction::Incoming,
        amount: pd.amount,
        fee: 0,
        block_height: pd.block_height,
        confirmations: confirmations(wallet_height, pd.block_height),
        timestamp: pd.timestamp,
        unlock_time: pd.unlock_time,
        subaddress_account: pd.subaddr_index.major,
        subaddress_indices: BTreeSet::from([pd.subaddr_index.minor]),
        label: lookups.label(pd.subaddr_index),
        reward_type: reward_type(pd.pay_type),
        is_stake: is_stake(pd.pay_type),
        pending: false,
        failed: false,
        transfers: Vec::new(),
    }
}

pub fn outgoing_record(
    hash: &TxHash,
    td: &ConfirmedTransferDetails,
    wallet_height: u64,
    lookups: &Lookups,
) -> TransactionRecord {
    let OutgoingAmounts { amount, fee } =
        outgoing_amounts(hash, td.amount_in, td.amount_out, td.change);

    // A single transaction may pay several destinations.
    let transfers = td
        .dests
        .iter()
        .map(|dest| Transfer {
            amount: dest.amount,
            address: lookups.address(dest, &td.payment_id),
        })
        .collect();

    TransactionRecord {
        hash: hash.to_hex(),
        payment_id: payment_id_hex(&td.payment_id),
        direction: Direction::Outgoing,
        amount,
        fee,
        block_height: td.block_height,
        confirmations: confirmations(wallet_height, td.block_height),
        timestamp: td.timestamp,
        unlock_time: 0,
        subaddress_account: td.subaddr_account,
        subaddress_indices: td.subaddr_indices.clone(),
        label: single_index(td.subaddr_account, &td.subaddr_indices)
            .map(|index| lookups.label(index))
            .unwrap_or_default(),
        reward_type: RewardType::Unspecified,
        is_stake: is_stake(td.pay_type),
        pending: false,
        failed: false,
        transfers,
    }
}

pub fn pending_record(
    hash: &TxHash,
    td: &UnconfirmedTransferDetails,
    lookups: &Lookups,
) -> TransactionRecord {
    let OutgoingAmounts { amount, fee } =
        outgoing_amounts(hash, td.amount_in, td.amount_out, td.change);

    TransactionRecord {
        hash: hash.to_hex(),
        payment_id: payment_id_hex(&td.payment_id),
        direction: Direction::Outgoing,
        amount,
        fee,
        block_height: 0,
        confirmations: 0,
        timestamp: td.timestamp,
        unlock_time: 0,
        subaddress_account: td.subaddr_account,
        subaddress_indices: td.subaddr_indices.clone(),
        label: single_index(td.subaddr_account, &td.subaddr_indices)
            .map(|index| lookups.label(index))
            .unwrap_or_default(),
        reward_type: RewardType::Unspecified,
        is_stake: is_stake(td.pay_type),
        pending: true,
        failed: td.state == TransferState::Failed,
        transfers: Vec::new(),
    }
}

pub fn pool_record(
    payment_id: &PaymentId,
    ppd: &PoolPaymentDetails,
    lookups: &Lookups,
) -> TransactionRecord {
    let pd = &ppd.payment;
    if ppd.double_spend_seen {
        warn!(hash = %pd.tx_hash, "pool payment has a double spend attempt");
    }
    info!(hash = %pd.tx_hash, amount = pd.amount, "unconfirmed payment found");

    TransactionRecord {
        pending: true,
        confirmations: 0,
        ..incoming_record(payment_id, pd, 0, lookups)
    }
}

/// Build the unified history in category order.
pub fn build_records(ledgers: &Ledgers, lookups: &Lookups) -> Vec<TransactionRecord> {
    let total =
        ledgers.incoming.len() + ledgers.outgoing.len() + ledgers.pending.len() + ledgers.pool.len();
    let mut records = Vec::with_capacity(total);

    records.extend(
        ledgers
            .incoming
            .iter()
            .map(|(pid, pd)| incoming_record(pid, pd, ledgers.wallet_height, lookups)),
    );
    records.extend(
        ledgers
            .outgoing
            .iter()
            .map(|(hash, td)| outgoing_record(hash, td, ledgers.wallet_height, lookups)),
    );
    records.extend(
        ledgers
            .pending
            .iter()
            .map(|(hash, td)| pending_record(hash, td, lookups)),
    );
    records.extend(
        ledgers
            .pool
            .iter()
            .map(|(pid, ppd)| pool_record(pid, ppd, lookups)),
    );

    records
}

/// Fetch, resolve, and transform in one pass.
pub async fn reconcile(
    engine: &dyn WalletEngine,
    config: &HistoryConfig,
) -> Result<(Ledgers, Vec<TransactionRecord>), CoreError> {
    let ledgers = fetch_ledgers(engine, config).await?;
    let lookups = resolve_lookups(engine, &ledgers).await?;
    let records = build_records(&ledgers, &lookups);
    Ok((ledgers, records))
}
