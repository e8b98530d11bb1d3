use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{CommissionRecord, OrderId, PaymentRecord};
use plg_common::{MicroToken, MicroUsdt};

//--------------------------------------    CreditResult      --------------------------------------------------------
/// The outcome of a successful ledger credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditResult {
    pub order_id: OrderId,
    pub user_id: String,
    pub tokens_credited: MicroToken,
    pub value: MicroUsdt,
    /// The payer's token balance after the credit.
    pub new_balance: MicroToken,
    /// Commissions paid out to the referral chain, in level order.
    pub commissions: Vec<CommissionRecord>,
}

/// Result of [`LedgerDatabase::credit_payment`](crate::traits::LedgerDatabase::credit_payment).
#[derive(Debug, Clone)]
pub enum CreditOutcome {
    /// The ledger was mutated by this call.
    Credited(CreditResult),
    /// The record was already in a credited terminal state; nothing was mutated.
    AlreadyCredited(PaymentRecord),
}

//--------------------------------------   RejectionReason    --------------------------------------------------------
/// Terminal validation failures. None of these are expected to succeed on retry without operator
/// intervention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The paid currency is not an accepted stablecoin variant for the network.
    InvalidCurrency { network: String, pay_currency: String },
    /// The paid amount fell outside the accepted variance around the expected amount.
    AmountMismatch { expected: MicroUsdt, paid: MicroUsdt },
    /// The chain receipt reports a reverted transaction. Never retried.
    TransactionReverted { tx_hash: String },
    /// No Transfer event of the accepted token paid the configured receiving address.
    NoMatchingTransfer { tx_hash: String },
}

impl Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::InvalidCurrency { network, pay_currency } => {
                write!(f, "'{pay_currency}' is not an accepted currency on {network}")
            },
            RejectionReason::AmountMismatch { expected, paid } => {
                write!(f, "paid amount {paid} is outside tolerance of expected {expected}")
            },
            RejectionReason::TransactionReverted { tx_hash } => write!(f, "transaction {tx_hash} reverted on-chain"),
            RejectionReason::NoMatchingTransfer { tx_hash } => {
                write!(f, "transaction {tx_hash} contains no transfer to the receiving address")
            },
        }
    }
}

//--------------------------------------    DeferralReason    --------------------------------------------------------
/// Retryable, non-error outcomes. The caller's own retry mechanism (webhook redelivery, poller) is
/// expected to re-invoke later; the engine never schedules retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeferralReason {
    /// The transaction is mined but not yet deep enough in the chain.
    InsufficientConfirmations { have: u64, need: u64 },
    /// The provider has not reported a final status yet.
    AwaitingProviderFinality,
}

impl Display for DeferralReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeferralReason::InsufficientConfirmations { have, need } => {
                write!(f, "{have} of {need} required confirmations")
            },
            DeferralReason::AwaitingProviderFinality => write!(f, "provider status is not final yet"),
        }
    }
}

//--------------------------------------  SignalDisposition   --------------------------------------------------------
/// What processing a [`PaymentSignal`](crate::signal_types::PaymentSignal) did to the ledger.
#[derive(Debug, Clone)]
pub enum SignalDisposition {
    /// The signal was final and valid; the ledger was credited exactly once.
    Credited(CreditResult),
    /// The payment had already been credited by an earlier delivery; no-op.
    AlreadyCredited(PaymentRecord),
    /// A non-terminal lifecycle progression was recorded (e.g. waiting → confirming).
    StatusAdvanced(PaymentRecord),
    /// The record was already terminal and the signal changed nothing.
    Unchanged(PaymentRecord),
    /// The signal failed validation; the record was moved to a terminal no-credit state.
    Rejected { record: PaymentRecord, reason: RejectionReason },
    /// The signal is not final yet; nothing was mutated and the caller should ask again later.
    Deferred { order_id: OrderId, reason: DeferralReason },
}
