pub mod engine;
pub mod error;
pub mod history;
pub mod normalize;
pub mod reconcile;
pub mod types;

#[cfg(test)]
pub(crate) mod test_util;

pub use error::{CoreError, EngineError};
pub use history::{HistoryConfig, TransactionHistory};
pub use types::{Direction, RefreshStats, RewardType, TransactionRecord, Transfer};
