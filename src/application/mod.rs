//! Application layer containing the workflow orchestration.
//!
//! [`engine::IssuanceEngine`] sequences the steps in [`steps`] against one
//! exclusively owned ledger session per run and aggregates their outcomes
//! into a single report.

pub mod engine;
pub mod steps;
