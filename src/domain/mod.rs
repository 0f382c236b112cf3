//! Domain types and the ports the workflow talks through.
//!
//! Nothing in here performs IO; the ledger and the signing capability are
//! reached only through the traits in [`ports`].

pub mod currency;
pub mod ports;
pub mod request;
pub mod result;
pub mod transaction;
