//! Normalized external payment events.
//!
//! Intake adapters (webhook handler, status poller, tx-hash submission endpoint) decode their
//! transport payloads into these types at the boundary. Nothing loosely-typed crosses into the
//! engine: provider status strings become [`SignalStatus`], RPC receipts become [`ChainReceipt`].

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{ChainNetwork, ConversionError, OrderId, PaymentStatus};
use plg_common::{numeric, MicroUsdt, USDT_CURRENCY_CODE_LOWER};

//--------------------------------------    SignalStatus      --------------------------------------------------------
/// Status carried by an external payment signal, after normalizing the provider's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStatus {
    Waiting,
    Confirming,
    Confirmed,
    Finished,
    PartiallyPaid,
    Failed,
    Refunded,
    Expired,
}

impl Display for SignalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalStatus::Waiting => "waiting",
            SignalStatus::Confirming => "confirming",
            SignalStatus::Confirmed => "confirmed",
            SignalStatus::Finished => "finished",
            SignalStatus::PartiallyPaid => "partially_paid",
            SignalStatus::Failed => "failed",
            SignalStatus::Refunded => "refunded",
            SignalStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SignalStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "waiting" => Ok(Self::Waiting),
            // "sending" is the provider moving funds onwards; for intake purposes it is still
            // confirming.
            "confirming" | "sending" => Ok(Self::Confirming),
            "confirmed" => Ok(Self::Confirmed),
            "finished" => Ok(Self::Finished),
            "partially_paid" => Ok(Self::PartiallyPaid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "expired" => Ok(Self::Expired),
            other => Err(ConversionError(other.to_string())),
        }
    }
}

impl SignalStatus {
    /// The record status a non-final provider progression maps onto.
    pub fn as_progress_status(&self) -> Option<PaymentStatus> {
        match self {
            SignalStatus::Waiting => Some(PaymentStatus::Waiting),
            SignalStatus::Confirming => Some(PaymentStatus::Confirming),
            _ => None,
        }
    }

    /// The terminal no-credit status a failure signal maps onto.
    pub fn as_annulment_status(&self) -> Option<PaymentStatus> {
        match self {
            SignalStatus::Failed | SignalStatus::Refunded => Some(PaymentStatus::Failed),
            SignalStatus::Expired => Some(PaymentStatus::Expired),
            _ => None,
        }
    }

    pub fn is_credit_eligible(&self) -> bool {
        matches!(self, SignalStatus::Confirmed | SignalStatus::Finished | SignalStatus::PartiallyPaid)
    }
}

//--------------------------------------    ChainReceipt      --------------------------------------------------------
/// One log entry from a transaction receipt, as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLog {
    /// The emitting contract address.
    pub address: String,
    pub topics: Vec<String>,
    /// ABI-encoded, hex data words.
    pub data: String,
}

/// A decoded transaction receipt from the blockchain RPC collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReceipt {
    pub tx_hash: String,
    /// Execution status: `true` for success, `false` for a reverted transaction.
    pub success: bool,
    /// The block the transaction was mined in.
    pub block_number: u64,
    pub logs: Vec<ReceiptLog>,
}

/// On-chain evidence accompanying a tx-hash submission or poller signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainProof {
    pub receipt: ChainReceipt,
    /// The chain head at the time the receipt was fetched, for the confirmation-depth check.
    pub current_block: u64,
}

impl ChainProof {
    /// Number of blocks mined after the transaction's block.
    pub fn confirmation_depth(&self) -> u64 {
        self.current_block.saturating_sub(self.receipt.block_number)
    }
}

//--------------------------------------    PaymentSignal     --------------------------------------------------------
/// A normalized external payment event: one webhook delivery, one poll result, or one submitted
/// transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSignal {
    pub order_id: OrderId,
    pub external_payment_id: Option<String>,
    pub tx_hash: Option<String>,
    pub network: ChainNetwork,
    pub pay_currency: String,
    /// The amount the signal claims was paid. For on-chain signals this is advisory only; the
    /// authoritative amount is read from the receipt's Transfer events.
    pub claimed_amount: MicroUsdt,
    pub status: SignalStatus,
    pub chain_proof: Option<ChainProof>,
}

impl PaymentSignal {
    pub fn new(order_id: OrderId, network: ChainNetwork, pay_currency: impl Into<String>, status: SignalStatus) -> Self {
        Self {
            order_id,
            external_payment_id: None,
            tx_hash: None,
            network,
            pay_currency: pay_currency.into(),
            claimed_amount: MicroUsdt::from(0),
            status,
            chain_proof: None,
        }
    }

    pub fn with_claimed_amount(mut self, amount: MicroUsdt) -> Self {
        self.claimed_amount = amount;
        self
    }

    pub fn with_external_payment_id(mut self, id: impl Into<String>) -> Self {
        self.external_payment_id = Some(id.into());
        self
    }

    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }

    pub fn with_chain_proof(mut self, proof: ChainProof) -> Self {
        self.chain_proof = Some(proof);
        self
    }

    /// Decodes a payment-provider callback/poll payload into a signal.
    ///
    /// This is the adapter-boundary normalization: everything numeric goes through the defensive
    /// parser, the status string through [`SignalStatus`], and unknown networks fall back to
    /// Ethereum rather than failing a payload that is otherwise well-formed. Only a missing order
    /// id or an unrecognizable status is fatal.
    pub fn from_provider_payload(payload: &Value) -> Result<Self, ConversionError> {
        let order_id = payload
            .get("order_id")
            .and_then(Value::as_str)
            .ok_or_else(|| ConversionError("provider payload has no order_id".to_string()))?;
        let status: SignalStatus = payload
            .get("payment_status")
            .and_then(Value::as_str)
            .ok_or_else(|| ConversionError("provider payload has no payment_status".to_string()))?
            .parse()?;
        let network = payload
            .get("network")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(ChainNetwork::Ethereum);
        let pay_currency =
            payload.get("pay_currency").and_then(Value::as_str).unwrap_or(USDT_CURRENCY_CODE_LOWER).to_string();
        let paid = payload.get("actually_paid").map(|v| numeric::parse_json_amount(v, 0.0)).unwrap_or(0.0);

        let mut signal = PaymentSignal::new(OrderId::from(order_id), network, pay_currency, status)
            .with_claimed_amount(MicroUsdt::from_decimal(paid));
        if let Some(payment_id) = payload.get("payment_id") {
            // The provider sends numeric ids on some events and strings on others.
            signal.external_payment_id = Some(match payment_id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        }
        if let Some(hash) = payload.get("payin_hash").and_then(Value::as_str) {
            signal.tx_hash = Some(hash.to_string());
        }
        Ok(signal)
    }
}
