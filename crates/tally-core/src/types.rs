//! Domain types for Tally's unified transaction history.
//!
//! Contains the normalized [`TransactionRecord`] built from the engine's four
//! ledgers, its classification enums, and [`RefreshStats`] describing the
//! last rebuild.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ==============================================================================
// Classification
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incoming => write!(f, "in"),
            Self::Outgoing => write!(f, "out"),
        }
    }
}

/// Why funds were received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    #[default]
    Unspecified,
    Miner,
    ServiceNode,
}

// ==============================================================================
// Transaction Record
// ==============================================================================

/// One amount sent to one destination of an outgoing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub amount: u64,
    pub address: String,
}

/// A normalized history entry. Built once per refresh and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    pub payment_id: String,
    pub direction: Direction,
    /// Net amount moved, in atomic units. Excludes fee and change on
    /// outgoing records.
    pub amount: u64,
    pub fee: u64,
    /// Zero for unconfirmed entries.
    pub block_height: u64,
    pub confirmations: u64,
    pub timestamp: u64,
    pub unlock_time: u64,
    pub subaddress_account: u32,
    pub subaddress_indices: BTreeSet<u32>,
    pub label: String,
    pub reward_type: RewardType,
    pub is_stake: bool,
    pub pending: bool,
    pub failed: bool,
    pub transfers: Vec<Transfer>,
}

// ==============================================================================
// Refresh Statistics
// ==============================================================================

/// Summary of a completed refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshStats {
    pub wallet_height: u64,
    pub incoming: usize,
    pub outgoing: usize,
    pub pending_outgoing: usize,
    pub pool: usize,
    pub duration_ms: u64,
    /// Unix timestamp (seconds) at which the refresh finished.
    pub completed_at: u64,
}

impl RefreshStats {
    pub fn total(&self) -> usize {
        self.incoming + self.outgoing + self.pending_outgoing + self.pool
    }
}
