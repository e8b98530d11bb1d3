//! # Storage contracts for the presale ledger engine.
//!
//! This module defines the interface that database backends must expose in order to host the
//! ledger engine.
//!
//! * [`LedgerDatabase`] is the write-side contract: recording purchase intents, advancing payment
//!   lifecycles, and executing the exactly-once credit transaction.
//! * [`AccountManagement`] is the read-side contract: accounts, payment/commission/contribution
//!   history, global sale metrics and derived referral counts.
//!
//! Backends are expected to serialize the credit transaction (uniqueness constraints on
//! `order_id`/`tx_hash` plus a single atomic transaction around the credit steps); the engine
//! contains no other synchronization.
mod account_management;
mod data_objects;
mod ledger_database;

pub use account_management::{AccountApiError, AccountManagement};
pub use data_objects::{CreditOutcome, CreditResult, DeferralReason, RejectionReason, SignalDisposition};
pub use ledger_database::{LedgerDatabase, LedgerEngineError};
