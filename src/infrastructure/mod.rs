//! Adapters behind the domain ports.

pub mod in_memory;
pub mod ledger;
pub mod rpc;
pub mod signer;
