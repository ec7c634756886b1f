//! File-backed wallet engine.
//!
//! A [`WalletSnapshot`] is a JSON export of everything a refresh reads from
//! the engine: height, network, the four ledgers, and subaddress labels.
//! [`SnapshotEngine`] serves it as a read-only [`WalletEngine`], which is
//! handy for offline inspection of an exported wallet.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

use super::types::{
    Destination, IncomingLedger, OutgoingLedger, PaymentId, PendingLedger, PoolLedger,
    SubaddressIndex,
};
use super::{in_height_window, NetworkType, WalletEngine};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEntry {
    pub index: SubaddressIndex,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub height: u64,
    pub network: NetworkType,
    #[serde(default)]
    pub incoming: IncomingLedger,
    #[serde(default)]
    pub outgoing: OutgoingLedger,
    #[serde(default)]
    pub unconfirmed_outgoing: PendingLedger,
    #[serde(default)]
    pub pool: PoolLedger,
    #[serde(default)]
    pub labels: Vec<LabelEntry>,
}

pub struct SnapshotEngine {
    snapshot: WalletSnapshot,
    labels: HashMap<SubaddressIndex, String>,
}

impl SnapshotEngine {
    pub fn new(snapshot: WalletSnapshot) -> Self {
        let mut labels = HashMap::with_capacity(snapshot.labels.len());
        for entry in &snapshot.labels {
            if labels
                .insert(entry.index, entry.label.clone())
                .is_some()
            {
                tracing::warn!(
                    account = entry.index.major,
                    index = entry.index.minor,
                    "duplicate snapshot label overwrites previous value"
                );
            }
        }
        Self { snapshot, labels }
    }

    pub fn from_json(content: &str) -> Result<Self, CoreError> {
        let snapshot: WalletSnapshot =
            serde_json::from_str(content).map_err(|e| CoreError::SnapshotParse(e.to_string()))?;
        Ok(Self::new(snapshot))
    }

    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let engine = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            height = engine.snapshot.height,
            network = %engine.snapshot.network,
            "loaded wallet snapshot"
        );
        Ok(engine)
    }

}

#[async_trait]
impl WalletEngine for SnapshotEngine {
    async fn blockchain_height(&self) -> Result<u64, CoreError> {
        Ok(self.snapshot.height)
    }

    async fn network_type(&self) -> Result<NetworkType, CoreError> {
        Ok(self.snapshot.network)
    }

    async fn incoming_payments(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<IncomingLedger, CoreError> {
        Ok(self
            .snapshot
            .incoming
            .iter()
            .filter(|(_, pd)| in_height_window(pd.block_height, min_height, max_height))
            .cloned()
            .collect())
    }

    async fn outgoing_transfers(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<OutgoingLedger, CoreError> {
        Ok(self
            .snapshot
            .outgoing
            .iter()
            .filter(|(_, td)| in_height_window(td.block_height, min_height, max_height))
            .cloned()
            .collect())
    }

    async fn unconfirmed_outgoing_transfers(&self) -> Result<PendingLedger, CoreError> {
        Ok(self.snapshot.unconfirmed_outgoing.clone())
    }

    async fn pool_payments(&self) -> Result<PoolLedger, CoreError> {
        Ok(self.snapshot.pool.clone())
    }

    async fn subaddress_label(&self, index: SubaddressIndex) -> Result<String, CoreError> {
        Ok(self.labels.get(&index).cloned().unwrap_or_default())
    }

    /// Snapshots cannot encode keys into addresses. Destinations that lack
    /// the address the sender originally entered render as an empty string.
    async fn destination_address(
        &self,
        destination: &Destination,
        _network: NetworkType,
        _payment_id: &PaymentId,
    ) -> Result<String, CoreError> {
        match &destination.original {
            Some(address) => Ok(address.clone()),
            None => {
                tracing::warn!(
                    spend_public_key = %destination.spend_public_key,
                    amount = destination.amount,
                    "snapshot destination has no original address; leaving it blank"
                );
                Ok(String::new())
            }
        }
    }
}
