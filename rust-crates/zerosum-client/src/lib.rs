//! Client-side synchronization layer for ZeroSum games.
//!
//! The contracts own every rule of the game. This crate reads their state into typed
//! snapshots, submits transactions on behalf of a wallet, keeps a game view fresh by
//! polling, and derives the wallet-relative flags a front end needs.

pub mod abi;
pub mod bet_cache;
pub mod chain;
pub mod config;
pub mod countdown;
pub mod evm;
pub mod poller;
pub mod projector;
pub mod reader;
pub mod route;
pub mod types;
pub mod writer;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use alloy::primitives::{
    Address,
    B256,
    U256,
};
