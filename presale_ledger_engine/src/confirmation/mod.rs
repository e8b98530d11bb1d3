//! Payment finality policy.
//!
//! The [`ConfirmationGate`] classifies an incoming [`PaymentSignal`] against the current
//! [`PaymentRecord`] and policy, and decides what — if anything — the credit engine should do.
//! The gate itself is pure: it reads, it never writes.
mod policy;

use log::{debug, warn};
use plg_common::MicroUsdt;

use crate::{
    db_types::{PaymentRecord, PaymentStatus},
    helpers::{raw_units_to_micro_usdt, scan_transfer_to},
    signal_types::{ChainProof, PaymentSignal},
    traits::{DeferralReason, RejectionReason},
};
pub use policy::{AcceptedCurrency, GatePolicy};

/// What the gate decided about a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// All checks passed; credit the ledger. `paid` is the validated paid amount.
    Proceed { paid: MicroUsdt },
    /// The record is already terminal; repeat signals are no-ops.
    AlreadyFinal,
    /// Record a non-terminal lifecycle progression.
    Advance(PaymentStatus),
    /// Move the record to a terminal no-credit state reported by the provider.
    Annul(PaymentStatus),
    /// The signal failed validation; terminal rejection.
    Reject(RejectionReason),
    /// Not final yet; ask again later. Nothing may be mutated.
    Defer(DeferralReason),
}

#[derive(Debug, Clone, Default)]
pub struct ConfirmationGate {
    policy: GatePolicy,
}

impl ConfirmationGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Classifies `signal` against `record`.
    ///
    /// Terminal records short-circuit before any validation: once `Confirmed`/`Finished`/`Failed`/
    /// `Expired`/`Cancelled`, no signal changes anything. On-chain evidence, when present, takes
    /// precedence over the provider-reported status.
    pub fn evaluate(&self, record: &PaymentRecord, signal: &PaymentSignal) -> GateDecision {
        if record.status.is_terminal() {
            debug!("🚦️ Payment {} is already {}; signal is a no-op", record.order_id, record.status);
            return GateDecision::AlreadyFinal;
        }

        // The currency check only guards the crediting paths. Progressions and provider-side
        // failures pass through regardless of what currency string they carry.
        let currency = self.policy.currency_for(signal.network, &signal.pay_currency);

        if let Some(proof) = &signal.chain_proof {
            return match currency {
                Some(c) => self.evaluate_chain_proof(record, proof, c.decimals),
                None => GateDecision::Reject(RejectionReason::InvalidCurrency {
                    network: signal.network.to_string(),
                    pay_currency: signal.pay_currency.clone(),
                }),
            };
        }

        if let Some(status) = signal.status.as_annulment_status() {
            return GateDecision::Annul(status);
        }

        if signal.status.is_credit_eligible() {
            if currency.is_none() {
                return GateDecision::Reject(RejectionReason::InvalidCurrency {
                    network: signal.network.to_string(),
                    pay_currency: signal.pay_currency.clone(),
                });
            }
            if !self.policy.allow_partially_paid && signal.status == crate::signal_types::SignalStatus::PartiallyPaid {
                return GateDecision::Reject(RejectionReason::AmountMismatch {
                    expected: record.value_usdt,
                    paid: signal.claimed_amount,
                });
            }
            return self.check_amount(record, signal.claimed_amount);
        }

        match signal.status.as_progress_status() {
            Some(next) if record.status.can_transition_to(next) => GateDecision::Advance(next),
            _ => GateDecision::Defer(DeferralReason::AwaitingProviderFinality),
        }
    }

    /// The on-chain path: receipt success, confirmation depth, then the transfer-target scan. The
    /// paid amount comes from the qualifying Transfer events, not from the signal.
    fn evaluate_chain_proof(&self, record: &PaymentRecord, proof: &ChainProof, decimals: u8) -> GateDecision {
        if !proof.receipt.success {
            return GateDecision::Reject(RejectionReason::TransactionReverted {
                tx_hash: proof.receipt.tx_hash.clone(),
            });
        }

        let depth = proof.confirmation_depth();
        if depth < self.policy.required_confirmations {
            return GateDecision::Defer(DeferralReason::InsufficientConfirmations {
                have: depth,
                need: self.policy.required_confirmations,
            });
        }

        let contract = match self.policy.contract_for(record.network) {
            Some(c) => c,
            None => {
                warn!("🚦️ No token contract configured for {}; cannot verify {}", record.network, record.order_id);
                return GateDecision::Reject(RejectionReason::NoMatchingTransfer {
                    tx_hash: proof.receipt.tx_hash.clone(),
                });
            },
        };
        let Some(raw) = scan_transfer_to(&proof.receipt, contract, &self.policy.receiving_address) else {
            return GateDecision::Reject(RejectionReason::NoMatchingTransfer {
                tx_hash: proof.receipt.tx_hash.clone(),
            });
        };
        let paid = raw_units_to_micro_usdt(raw, decimals);
        self.check_amount(record, paid)
    }

    fn check_amount(&self, record: &PaymentRecord, paid: MicroUsdt) -> GateDecision {
        if within_variance(record.value_usdt, paid, self.policy.variance_bps) {
            GateDecision::Proceed { paid }
        } else {
            GateDecision::Reject(RejectionReason::AmountMismatch { expected: record.value_usdt, paid })
        }
    }
}

/// Variance check in integer arithmetic: `|paid - expected| * 10_000 <= expected * variance_bps`.
/// The boundary is inclusive, so a payment at exactly the tolerance passes.
pub fn within_variance(expected: MicroUsdt, paid: MicroUsdt, variance_bps: u32) -> bool {
    if expected.value() <= 0 {
        return paid.value() >= 0;
    }
    let delta = (paid.value() as i128 - expected.value() as i128).abs();
    delta * 10_000 <= expected.value() as i128 * variance_bps as i128
}
