//! Outbound bridges to the chain ledger
//!
//! Read-only: the gateway describes the ledger interface and health-checks the
//! RPC endpoint. It never submits transactions.

pub mod ledger;

pub use ledger::{function_selector, LedgerCall, LedgerCallInfo, LedgerClient, LEDGER_CALLS};
