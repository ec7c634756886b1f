//! Wallet engine abstraction layer.
//!
//! Defines the [`WalletEngine`] trait, the read-only view of the wallet that
//! history refreshes pull from, and provides a JSON-RPC implementation
//! ([`HttpEngineClient`]), a file-backed snapshot ([`SnapshotEngine`]), and a
//! test mock (`mock::MockEngine`).

mod http_adapter;
#[cfg(test)]
pub mod mock;
pub mod snapshot;
pub mod types;

pub use http_adapter::HttpEngineClient;
pub use snapshot::{SnapshotEngine, WalletSnapshot};
pub use types::NetworkType;

use async_trait::async_trait;

use crate::error::CoreError;
use types::{
    Destination, IncomingLedger, OutgoingLedger, PaymentId, PendingLedger, PoolLedger,
    SubaddressIndex,
};

/// The wallet engine calls a history refresh depends on.
///
/// The engine owns the ledgers; implementations hand out ordered copies and
/// are expected to handle transport, authentication, and decoding internally.
#[async_trait]
pub trait WalletEngine: Send + Sync {
    /// Current blockchain height as seen by the wallet.
    async fn blockchain_height(&self) -> Result<u64, CoreError>;

    async fn network_type(&self) -> Result<NetworkType, CoreError>;

    /// Confirmed incoming payments with `min_height < block_height <= max_height`.
    async fn incoming_payments(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<IncomingLedger, CoreError>;

    /// Confirmed outgoing transfers with `min_height < block_height <= max_height`.
    async fn outgoing_transfers(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<OutgoingLedger, CoreError>;

    async fn unconfirmed_outgoing_transfers(&self) -> Result<PendingLedger, CoreError>;

    async fn pool_payments(&self) -> Result<PoolLedger, CoreError>;

    /// Human label of a subaddress; empty when none was set.
    async fn subaddress_label(&self, index: SubaddressIndex) -> Result<String, CoreError>;

    /// Resolve many labels. Implementations may batch these lookups.
    async fn subaddress_labels(
        &self,
        indices: &[SubaddressIndex],
    ) -> Result<Vec<String>, CoreError> {
        let mut labels = Vec::with_capacity(indices.len());
        for index in indices {
            labels.push(self.subaddress_label(*index).await?);
        }
        Ok(labels)
    }

    /// Render a destination as an address string for the given network,
    /// folding in `payment_id` for integrated destinations.
    async fn destination_address(
        &self,
        destination: &Destination,
        network: NetworkType,
        payment_id: &PaymentId,
    ) -> Result<String, CoreError>;

    /// Render many destinations. Implementations may batch these calls.
    async fn destination_addresses(
        &self,
        requests: &[(Destination, PaymentId)],
        network: NetworkType,
    ) -> Result<Vec<String>, CoreError> {
        let mut addresses = Vec::with_capacity(requests.len());
        for (destination, payment_id) in requests {
            addresses.push(
                self.destination_address(destination, network, payment_id)
                    .await?,
            );
        }
        Ok(addresses)
    }
}

/// Height filter shared by the in-process engines: `min < height <= max`.
pub(crate) fn in_height_window(height: u64, min_height: u64, max_height: u64) -> bool {
    min_height < height && height <= max_height
}
