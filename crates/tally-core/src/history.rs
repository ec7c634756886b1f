//! The transaction history cache.
//!
//! [`TransactionHistory`] owns the unified record collection and answers
//! queries against it. A refresh rebuilds the whole collection from the
//! wallet engine and swaps it in; nothing is updated in place.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::engine::WalletEngine;
use crate::error::CoreError;
use crate::reconcile::reconcile;
use crate::types::{RefreshStats, TransactionRecord};

// ==============================================================================
// Configuration
// ==============================================================================

/// Height window forwarded to the engine's confirmed-ledger queries.
/// Entries are included when `min_height < block_height <= max_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub min_height: u64,
    pub max_height: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            min_height: 0,
            max_height: u64::MAX,
        }
    }
}

// ==============================================================================
// History
// ==============================================================================

#[derive(Default)]
struct HistoryState {
    records: Vec<TransactionRecord>,
    last_refresh: Option<RefreshStats>,
}

/// Unified, queryable view over the wallet engine's four ledgers.
///
/// Shared across callers via `Arc<TransactionHistory>`. Queries take the read
/// side of a `tokio::sync::RwLock`; [`refresh`](Self::refresh) holds the write
/// side for the whole fetch-and-rebuild, so readers never see a partially
/// rebuilt collection. Returned records are owned copies and stay valid
/// across later refreshes.
pub struct TransactionHistory {
    engine: Arc<dyn WalletEngine>,
    config: HistoryConfig,
    state: RwLock<HistoryState>,
}

impl TransactionHistory {
    /// Create an empty history. Nothing is fetched until the first refresh.
    pub fn new(engine: Arc<dyn WalletEngine>) -> Self {
        Self::with_config(engine, HistoryConfig::default())
    }

    pub fn with_config(engine: Arc<dyn WalletEngine>, config: HistoryConfig) -> Self {
        Self {
            engine,
            config,
            state: RwLock::new(HistoryState::default()),
        }
    }

    /// Rebuild the collection from the engine.
    ///
    /// On failure the rebuild is abandoned and the previous collection is
    /// kept as-is.
    pub async fn refresh(&self) -> Result<RefreshStats, CoreError> {
        let mut state = self.state.write().await;
        let started = Instant::now();

        let (ledgers, records) = match reconcile(self.engine.as_ref(), &self.config).await {
            Ok(rebuilt) => rebuilt,
            Err(err) => {
                warn!(
                    error = %err,
                    retained = state.records.len(),
                    "history refresh failed; keeping previous collection"
                );
                return Err(err);
            }
        };

        let stats = RefreshStats {
            wallet_height: ledgers.wallet_height,
            incoming: ledgers.incoming.len(),
            outgoing: ledgers.outgoing.len(),
            pending_outgoing: ledgers.pending.len(),
            pool: ledgers.pool.len(),
            duration_ms: duration_ms(started.elapsed()),
            completed_at: unix_now(),
        };

        state.records = records;
        state.last_refresh = Some(stats);

        info!(
            wallet_height = stats.wallet_height,
            incoming = stats.incoming,
            outgoing = stats.outgoing,
            pending_outgoing = stats.pending_outgoing,
            pool = stats.pool,
            duration_ms = stats.duration_ms,
            "history refreshed"
        );

        Ok(stats)
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Record at position `index`, or `None` when out of range (including
    /// negative indices).
    pub async fn by_index(&self, index: i64) -> Option<TransactionRecord> {
        let index = usize::try_from(index).ok()?;
        self.state.read().await.records.get(index).cloned()
    }

    /// First record, in collection order, whose hash equals `hash`.
    pub async fn by_hash(&self, hash: &str) -> Option<TransactionRecord> {
        self.state
            .read()
            .await
            .records
            .iter()
            .find(|record| record.hash == hash)
            .cloned()
    }

    /// A copy of the whole collection.
    pub async fn all(&self) -> Vec<TransactionRecord> {
        self.state.read().await.records.clone()
    }

    /// Statistics of the last successful refresh.
    pub async fn last_refresh(&self) -> Option<RefreshStats> {
        self.state.read().await.last_refresh
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
