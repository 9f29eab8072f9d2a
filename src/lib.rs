//! daoctl - client for an NFT-gated governance DAO.
//!
//! Reads proposals from a governance contract, and lets members who hold
//! a membership token create proposals, vote on them and execute them.
//!
//! Layers, bottom up:
//! - `ledger`: wallet provider, JSON-RPC transport, network check
//! - `contracts`: ABI encoding and typed contract handles
//! - `governance`: proposal lifecycle, repository and workflow
//! - `session`: cached state handed to presentation

pub mod contracts;
pub mod error;
pub mod governance;
pub mod ledger;
pub mod notify;
pub mod session;
