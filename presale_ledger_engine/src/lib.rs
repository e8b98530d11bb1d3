//! Presale Ledger Engine
//!
//! The reconciliation core of the presale liquidity-pool product: given an external payment event
//! — a webhook delivery, a polled provider status, or a submitted on-chain transaction hash — it
//! decides whether the event represents a new, valid, sufficiently-confirmed payment, and if so
//! atomically credits the buyer's token balance, updates the global sale metrics and cascades
//! referral commissions up to three levels. Exactly once per payment, even under
//! concurrent/duplicate delivery.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend; you
//!    should never need to touch it directly. The data types it persists live in [`db_types`] and
//!    are public.
//! 2. The engine public API ([`mod@ple_api`]): [`CreditFlowApi`] for the reconciliation flow and
//!    [`AccountApi`] for queries. Backends implement the traits in [`mod@traits`] to host these
//!    APIs.
//! 3. Policy and calculation modules: the [`confirmation`] gate, the [`commissions`] planner, the
//!    [`yield_accrual`] calculator and the canonical [`rates`] tables.
//!
//! The engine also emits notification events (payment verified, balance added, commission earned)
//! through the hook system in [`mod@events`]; delivery of those notifications to users is an
//! external concern.
pub mod commissions;
pub mod confirmation;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod rates;
pub mod signal_types;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;
pub mod yield_accrual;

mod ple_api;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use confirmation::{ConfirmationGate, GateDecision, GatePolicy};
pub use ple_api::{accounts_api::AccountApi, credit_flow_api::CreditFlowApi};
pub use traits::{
    AccountManagement,
    CreditOutcome,
    CreditResult,
    LedgerDatabase,
    LedgerEngineError,
    SignalDisposition,
};
