use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{CoreError, EngineError};

use super::types::{
    ConfirmedTransferDetails, Destination, IncomingLedger, OutgoingLedger, PaymentDetails,
    PaymentId, PendingLedger, PoolLedger, PoolPaymentDetails, SubaddressIndex, TxHash,
    UnconfirmedTransferDetails,
};
use super::{in_height_window, NetworkType, WalletEngine};

/// A mock wallet engine for testing. Serves canned ledgers populated via the
/// builder pattern; ledgers can be swapped and failures injected after
/// construction to exercise refresh behavior.
pub struct MockEngine {
    state: Mutex<MockState>,
    fail: AtomicBool,
    ledger_fetches: AtomicUsize,
}

#[derive(Clone)]
struct MockState {
    height: u64,
    network: NetworkType,
    incoming: IncomingLedger,
    outgoing: OutgoingLedger,
    pending: PendingLedger,
    pool: PoolLedger,
    labels: HashMap<SubaddressIndex, String>,
}

impl MockEngine {
    pub fn builder() -> MockEngineBuilder {
        MockEngineBuilder {
            state: MockState {
                height: 1000,
                network: NetworkType::Testnet,
                incoming: Vec::new(),
                outgoing: Vec::new(),
                pending: Vec::new(),
                pool: Vec::new(),
                labels: HashMap::new(),
            },
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_height(&self, height: u64) {
        self.lock().height = height;
    }

    pub fn push_pool(&self, payment_id: PaymentId, payment: PaymentDetails) {
        self.lock().pool.push((
            payment_id,
            PoolPaymentDetails {
                payment,
                double_spend_seen: false,
            },
        ));
    }

    /// Number of times the confirmed incoming ledger was requested.
    pub fn ledger_fetches(&self) -> usize {
        self.ledger_fetches.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock poisoned")
    }

    fn check(&self) -> Result<(), CoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("mock engine set to fail".into()).into());
        }
        Ok(())
    }
}

pub struct MockEngineBuilder {
    state: MockState,
}

impl MockEngineBuilder {
    pub fn with_height(mut self, height: u64) -> Self {
        self.state.height = height;
        self
    }

    pub fn with_network(mut self, network: NetworkType) -> Self {
        self.state.network = network;
        self
    }

    pub fn with_incoming(mut self, payment_id: PaymentId, payment: PaymentDetails) -> Self {
        self.state.incoming.push((payment_id, payment));
        self
    }

    pub fn with_outgoing(mut self, hash: TxHash, transfer: ConfirmedTransferDetails) -> Self {
        self.state.outgoing.push((hash, transfer));
        self
    }

    pub fn with_pending(mut self, hash: TxHash, transfer: UnconfirmedTransferDetails) -> Self {
        self.state.pending.push((hash, transfer));
        self
    }

    pub fn with_pool(mut self, payment_id: PaymentId, payment: PoolPaymentDetails) -> Self {
        self.state.pool.push((payment_id, payment));
        self
    }

    pub fn with_label(mut self, index: SubaddressIndex, label: &str) -> Self {
        self.state.labels.insert(index, label.to_string());
        self
    }

    pub fn build(self) -> MockEngine {
        MockEngine {
            state: Mutex::new(self.state),
            fail: AtomicBool::new(false),
            ledger_fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WalletEngine for MockEngine {
    async fn blockchain_height(&self) -> Result<u64, CoreError> {
        self.check()?;
        Ok(self.lock().height)
    }

    async fn network_type(&self) -> Result<NetworkType, CoreError> {
        self.check()?;
        Ok(self.lock().network)
    }

    async fn incoming_payments(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<IncomingLedger, CoreError> {
        self.check()?;
        self.ledger_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .lock()
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
        self.check()?;
        Ok(self
            .lock()
            .outgoing
            .iter()
            .filter(|(_, td)| in_height_window(td.block_height, min_height, max_height))
            .cloned()
            .collect())
    }

    async fn unconfirmed_outgoing_transfers(&self) -> Result<PendingLedger, CoreError> {
        self.check()?;
        Ok(self.lock().pending.clone())
    }

    async fn pool_payments(&self) -> Result<PoolLedger, CoreError> {
        self.check()?;
        Ok(self.lock().pool.clone())
    }

    async fn subaddress_label(&self, index: SubaddressIndex) -> Result<String, CoreError> {
        self.check()?;
        Ok(self.lock().labels.get(&index).cloned().unwrap_or_default())
    }

    async fn destination_address(
        &self,
        destination: &Destination,
        network: NetworkType,
        payment_id: &PaymentId,
    ) -> Result<String, CoreError> {
        self.check()?;
        Ok(match &destination.original {
            Some(original) => original.clone(),
            None => format!(
                "{network}:{}:{}",
                destination.spend_public_key, payment_id
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[tokio::test]
    async fn height_window_filters_confirmed_ledgers() {
        let engine = MockEngine::builder()
            .with_incoming(PaymentId::default(), payment(hash_from_byte(1), 1, 10))
            .with_incoming(PaymentId::default(), payment(hash_from_byte(2), 1, 20))
            .with_outgoing(hash_from_byte(3), confirmed_transfer(2, 1, None, 30))
            .build();

        let incoming = engine.incoming_payments(10, 20).await.unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].1.tx_hash, hash_from_byte(2));

        let outgoing = engine.outgoing_transfers(0, u64::MAX).await.unwrap();
        assert_eq!(outgoing.len(), 1);
    }

    #[tokio::test]
    async fn failing_engine_reports_unavailable() {
        let engine = MockEngine::builder().build();
        engine.set_failing(true);
        let err = engine.blockchain_height().await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Engine(EngineError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn rendered_addresses_carry_the_network() {
        let engine = MockEngine::builder()
            .with_network(NetworkType::Mainnet)
            .build();
        let network = engine.network_type().await.unwrap();
        assert_eq!(network, NetworkType::Mainnet);

        let mut dest = destination(9, 1);
        dest.original = None;
        let address = engine
            .destination_address(&dest, network, &PaymentId::default())
            .await
            .unwrap();
        assert!(address.starts_with("mainnet:"));
    }

    #[tokio::test]
    async fn default_batch_label_lookup_preserves_order() {
        let engine = MockEngine::builder()
            .with_label(SubaddressIndex::new(0, 1), "one")
            .with_label(SubaddressIndex::new(0, 2), "two")
            .build();
        let labels = engine
            .subaddress_labels(&[
                SubaddressIndex::new(0, 2),
                SubaddressIndex::new(0, 9),
                SubaddressIndex::new(0, 1),
            ])
            .await
            .unwrap();
        assert_eq!(labels, vec!["two".to_string(), String::new(), "one".to_string()]);
    }
}
