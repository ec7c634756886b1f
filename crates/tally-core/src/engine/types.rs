//! Raw ledger types as reported by the wallet engine.
//!
//! These mirror the engine's own bookkeeping (payment details, confirmed and
//! unconfirmed transfer details, pool payments) before any normalization.
//! 32-byte identifiers travel as lowercase hex strings on the wire.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ==============================================================================
// 32-byte Identifiers
// ==============================================================================

macro_rules! hex32_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(s, &mut bytes)?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex32_newtype!(
    /// A transaction hash.
    TxHash
);
hex32_newtype!(
    /// A full-width payment id. Short (8-byte) ids occupy the leading bytes
    /// with the remainder zeroed.
    PaymentId
);
hex32_newtype!(
    /// A public key half of a destination address.
    PublicKey
);

// ==============================================================================
// Enumerations
// ==============================================================================

/// Why an output was created, as classified by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayType {
    #[default]
    Unspecified,
    In,
    Out,
    Stake,
    Miner,
    ServiceNode,
    Governance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    Mainnet,
    Testnet,
    Devnet,
    Fakechain,
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::Devnet => write!(f, "devnet"),
            Self::Fakechain => write!(f, "fakechain"),
        }
    }
}

/// Lifecycle state of an outgoing transfer that has not been mined yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    #[default]
    Pending,
    PendingNotInPool,
    Failed,
}

/// Subaddress coordinates: `major` is the account, `minor` the index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SubaddressIndex {
    pub major: u32,
    pub minor: u32,
}

impl SubaddressIndex {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

// ==============================================================================
// Change Sentinel
// ==============================================================================

/// The engine reports an unknown change amount as `u64::MAX`.
pub const UNKNOWN_CHANGE: u64 = u64::MAX;

mod change_sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::UNKNOWN_CHANGE;

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.unwrap_or(UNKNOWN_CHANGE))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        let raw = u64::deserialize(deserializer)?;
        Ok((raw != UNKNOWN_CHANGE).then_some(raw))
    }
}

// ==============================================================================
// Ledger Entries
// ==============================================================================

/// One destination of an outgoing transfer.
///
/// `original` carries the address string as the sender entered it, when the
/// engine kept it; renderers prefer it over re-encoding the keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub amount: u64,
    pub spend_public_key: PublicKey,
    pub view_public_key: PublicKey,
    #[serde(default)]
    pub is_subaddress: bool,
    #[serde(default)]
    pub is_integrated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

/// A received output. Used for both confirmed and pool ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub tx_hash: TxHash,
    pub amount: u64,
    pub subaddr_index: SubaddressIndex,
    /// Zero when the payment has not been mined.
    #[serde(default)]
    pub block_height: u64,
    pub timestamp: u64,
    #[serde(default)]
    pub unlock_time: u64,
    #[serde(default)]
    pub pay_type: PayType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPaymentDetails {
    #[serde(flatten)]
    pub payment: PaymentDetails,
    #[serde(default)]
    pub double_spend_seen: bool,
}

/// A mined outgoing transfer. `amount_in` and `amount_out` are gross totals
/// of spent inputs and created outputs, so `amount_in - amount_out` is the fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedTransferDetails {
    pub amount_in: u64,
    pub amount_out: u64,
    #[serde(with = "change_sentinel")]
    pub change: Option<u64>,
    pub block_height: u64,
    pub timestamp: u64,
    pub subaddr_account: u32,
    pub subaddr_indices: BTreeSet<u32>,
    #[serde(default)]
    pub pay_type: PayType,
    #[serde(default)]
    pub payment_id: PaymentId,
    #[serde(default)]
    pub dests: Vec<Destination>,
}

/// An outgoing transfer that is still pending (or has failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnconfirmedTransferDetails {
    pub amount_in: u64,
    pub amount_out: u64,
    #[serde(with = "change_sentinel")]
    pub change: Option<u64>,
    pub timestamp: u64,
    pub subaddr_account: u32,
    pub subaddr_indices: BTreeSet<u32>,
    #[serde(default)]
    pub pay_type: PayType,
    #[serde(default)]
    pub payment_id: PaymentId,
    #[serde(default)]
    pub state: TransferState,
}

/// Confirmed incoming payments, keyed by payment id.
pub type IncomingLedger = Vec<(PaymentId, PaymentDetails)>;
/// Confirmed outgoing transfers, keyed by transaction hash.
pub type OutgoingLedger = Vec<(TxHash, ConfirmedTransferDetails)>;
/// Unconfirmed outgoing transfers, keyed by transaction hash.
pub type PendingLedger = Vec<(TxHash, UnconfirmedTransferDetails)>;
/// Pool payments, keyed by payment id.
pub type PoolLedger = Vec<(PaymentId, PoolPaymentDetails)>;
