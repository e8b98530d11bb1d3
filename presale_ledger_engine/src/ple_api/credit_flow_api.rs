use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    confirmation::{ConfirmationGate, GateDecision},
    db_types::{NewPaymentRecord, PaymentRecord, PaymentStatus},
    events::{
        BalanceAddedEvent,
        CommissionEarnedEvent,
        EventProducers,
        NotificationDeduper,
        NotificationKind,
        PaymentVerifiedEvent,
    },
    helpers::normalize_tx_hash,
    signal_types::PaymentSignal,
    traits::{CreditOutcome, CreditResult, LedgerDatabase, LedgerEngineError, SignalDisposition},
};
use plg_common::MicroUsdt;

/// `CreditFlowApi` is the primary API for payment reconciliation: it turns normalized
/// [`PaymentSignal`]s into exactly-once ledger credits, lifecycle progressions or rejections, and
/// pushes the resulting notification events to the external sink.
pub struct CreditFlowApi<B> {
    db: B,
    gate: ConfirmationGate,
    producers: EventProducers,
    deduper: NotificationDeduper,
}

impl<B> Debug for CreditFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CreditFlowApi")
    }
}

impl<B> CreditFlowApi<B> {
    pub fn new(db: B, gate: ConfirmationGate, producers: EventProducers) -> Self {
        Self { db, gate, producers, deduper: NotificationDeduper::default() }
    }

    /// Replaces the default notification deduper, e.g. to shorten the window in tests.
    pub fn with_deduper(mut self, deduper: NotificationDeduper) -> Self {
        self.deduper = deduper;
        self
    }
}

impl<B> CreditFlowApi<B>
where B: LedgerDatabase
{
    /// Records a brand-new purchase intent. Idempotent: re-submitting an existing order returns
    /// the stored record with `false` in the second slot.
    pub async fn process_purchase_intent(
        &self,
        intent: NewPaymentRecord,
    ) -> Result<(PaymentRecord, bool), LedgerEngineError> {
        let order_id = intent.order_id.clone();
        let result = self.db.insert_payment(intent).await?;
        debug!("🔄️📦️ Purchase intent {order_id} {}", if result.1 { "recorded" } else { "already exists" });
        Ok(result)
    }

    /// Processes one external payment signal — a webhook delivery, a poll result, or a submitted
    /// transaction hash. Safe to call any number of times with duplicates of the same event: at
    /// most one delivery credits the ledger.
    pub async fn process_signal(&self, signal: PaymentSignal) -> Result<SignalDisposition, LedgerEngineError> {
        let record = self.locate_record(&signal).await?;
        let decision = self.gate.evaluate(&record, &signal);
        trace!("🔄️💰️ Signal for {}: {decision:?}", record.order_id);
        match decision {
            GateDecision::AlreadyFinal => {
                if record.status.is_credited() {
                    Ok(SignalDisposition::AlreadyCredited(record))
                } else {
                    Ok(SignalDisposition::Unchanged(record))
                }
            },
            GateDecision::Advance(status) => {
                let record = self.db.advance_payment_status(&record.order_id, status).await?;
                debug!("🔄️💰️ Payment {} advanced to {status}", record.order_id);
                Ok(SignalDisposition::StatusAdvanced(record))
            },
            GateDecision::Annul(status) => {
                let record = self.db.annul_payment(&record.order_id, status).await?;
                Ok(SignalDisposition::StatusAdvanced(record))
            },
            GateDecision::Defer(reason) => {
                debug!("🔄️💰️ Payment {} deferred: {reason}", record.order_id);
                Ok(SignalDisposition::Deferred { order_id: record.order_id, reason })
            },
            GateDecision::Reject(reason) => {
                warn!("🔄️💰️ Payment {} rejected: {reason}", record.order_id);
                let record = self.db.annul_payment(&record.order_id, PaymentStatus::Failed).await?;
                Ok(SignalDisposition::Rejected { record, reason })
            },
            GateDecision::Proceed { paid } => self.settle(record, paid, &signal).await,
        }
    }

    /// Finds the payment a signal refers to: by order id first, then by transaction hash, so a
    /// tx-hash submission can reconcile against an order created through another intake path.
    async fn locate_record(&self, signal: &PaymentSignal) -> Result<PaymentRecord, LedgerEngineError> {
        if let Some(record) = self.db.fetch_payment_by_order_id(&signal.order_id).await? {
            return Ok(record);
        }
        if let Some(hash) = signal.tx_hash.as_deref().and_then(normalize_tx_hash) {
            if let Some(record) = self.db.fetch_payment_by_tx_hash(&hash).await? {
                return Ok(record);
            }
        }
        Err(LedgerEngineError::PaymentNotFound(signal.order_id.clone()))
    }

    /// Runs the exactly-once credit for a signal that passed every gate check.
    async fn settle(
        &self,
        record: PaymentRecord,
        paid: MicroUsdt,
        signal: &PaymentSignal,
    ) -> Result<SignalDisposition, LedgerEngineError> {
        debug!("🔄️✅️ Payment {} validated with paid amount {paid}; crediting", record.order_id);
        let mut record = record;
        if record.tx_hash.is_none() {
            if let Some(hash) = signal.tx_hash.as_deref() {
                match normalize_tx_hash(hash) {
                    Some(normalized) => {
                        // A hash already owned by a different order means the same chain
                        // transaction arrived through two intake paths; it must not pay twice.
                        if let Some(other) = self.db.fetch_payment_by_tx_hash(&normalized).await? {
                            if other.order_id != record.order_id {
                                return Err(LedgerEngineError::TxHashAlreadyExists(normalized));
                            }
                        } else {
                            record = self.db.attach_tx_hash(&record.order_id, &normalized).await?;
                        }
                    },
                    None => warn!("🔄️✅️ Signal for {} carries a malformed tx hash: {hash}", record.order_id),
                }
            }
        }
        match self.db.credit_payment(&record.order_id).await? {
            CreditOutcome::AlreadyCredited(existing) => Ok(SignalDisposition::AlreadyCredited(existing)),
            CreditOutcome::Credited(result) => {
                self.emit_credit_events(&result).await;
                Ok(SignalDisposition::Credited(result))
            },
        }
    }

    /// Pushes the notification events for a fresh credit through the dedup window.
    async fn emit_credit_events(&self, result: &CreditResult) {
        let now = Utc::now();
        let order_meta = result.order_id.as_str();

        if self.deduper.should_send(NotificationKind::PaymentVerified, &result.user_id, order_meta, now) {
            let event = PaymentVerifiedEvent {
                order_id: result.order_id.clone(),
                user_id: result.user_id.clone(),
                value: result.value,
                tokens: result.tokens_credited,
            };
            for emitter in &self.producers.payment_verified_producer {
                emitter.publish_event(event.clone()).await;
            }
            self.deduper.mark_sent(NotificationKind::PaymentVerified, &result.user_id, order_meta, now);
        }

        if self.deduper.should_send(NotificationKind::BalanceAdded, &result.user_id, order_meta, now) {
            let event = BalanceAddedEvent {
                user_id: result.user_id.clone(),
                order_id: result.order_id.clone(),
                tokens: result.tokens_credited,
                new_balance: result.new_balance,
            };
            for emitter in &self.producers.balance_added_producer {
                emitter.publish_event(event.clone()).await;
            }
            self.deduper.mark_sent(NotificationKind::BalanceAdded, &result.user_id, order_meta, now);
        }

        for commission in &result.commissions {
            let meta = format!("{order_meta}:{}", commission.level);
            if !self.deduper.should_send(NotificationKind::CommissionEarned, &commission.beneficiary_id, &meta, now)
            {
                continue;
            }
            let event = CommissionEarnedEvent {
                beneficiary_id: commission.beneficiary_id.clone(),
                source_user_id: commission.source_user_id.clone(),
                order_id: result.order_id.clone(),
                level: commission.level,
                amount: commission.amount,
            };
            for emitter in &self.producers.commission_earned_producer {
                emitter.publish_event(event.clone()).await;
            }
            self.deduper.mark_sent(NotificationKind::CommissionEarned, &commission.beneficiary_id, &meta, now);
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
