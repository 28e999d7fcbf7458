//! Galileo Runner library surface.
//!
//! Sequential per-wallet task pipeline for the 0G-Galileo testnet: an
//! OAuth-gated faucet claim, faucet-contract mints, router swaps and a
//! proof-of-activity transaction, each driven through retry-wrapped workflow
//! steps. Accounts are processed strictly one at a time; the only durable
//! state is the spare-credential pool file rewritten on rotation.

pub mod accounts;
pub mod captcha;
pub mod error;
pub mod executor;
pub mod faucet;
pub mod oauth;
pub mod pipeline;
pub mod proxy;
pub mod retry;
pub mod swap;
pub mod utils;

pub mod config {
    pub mod chain;
}
