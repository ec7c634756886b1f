//! JSON-RPC client for wallet engines.
//!
//! Implements [`WalletEngine`](super::WalletEngine) over JSON-RPC 2.0 using
//! `reqwest`, with optional request rate limiting, single and batched calls,
//! basic or cookie-file auth, and an LRU cache of rendered addresses.

mod client;
mod connection;
mod protocol;

pub use client::HttpEngineClient;
