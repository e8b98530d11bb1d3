//! # Presale ledger engine public API
//!
//! The `ple_api` module exposes the programmatic API of the engine. The pattern for every API is
//! the same: an instance is created by supplying a database backend that implements the traits the
//! API needs.
//!
//! * [`credit_flow_api`] is the reconciliation entry point: every intake adapter (webhook handler,
//!   status poller, tx-hash submission) normalizes its payload into a
//!   [`PaymentSignal`](crate::signal_types::PaymentSignal) and hands it to the shared
//!   [`CreditFlowApi`](credit_flow_api::CreditFlowApi) — there is exactly one implementation of
//!   "credit the user and their referral chain".
//! * [`accounts_api`] provides read access to accounts, histories, sale metrics and the live
//!   yield preview.
//!
//! ```rust,ignore
//! use presale_ledger_engine::{ConfirmationGate, CreditFlowApi, GatePolicy, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/plg_store.db", 5).await?;
//! let gate = ConfirmationGate::new(GatePolicy::from_env());
//! let api = CreditFlowApi::new(db, gate, producers);
//! let disposition = api.process_signal(signal).await?;
//! ```

pub mod accounts_api;
pub mod credit_flow_api;
