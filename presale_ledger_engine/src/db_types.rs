use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use plg_common::{MicroToken, MicroUsdt};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------
/// The merchant-generated, globally unique identifier of a purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    PaymentStatus     --------------------------------------------------------
/// Lifecycle state of a [`PaymentRecord`].
///
/// `Created → Waiting → Confirming → Confirmed/Finished` is the credit path;
/// `Failed`, `Expired` and `Cancelled` are the no-credit terminals. Terminal states are sticky:
/// once reached, no further transition is permitted and repeated signals are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// The purchase intent has been recorded; no provider or chain signal has arrived yet.
    Created,
    /// The provider is waiting for funds to arrive.
    Waiting,
    /// Funds were seen but are not yet final (provider-side, or below the confirmation depth).
    Confirming,
    /// The payment is final and the ledger has been credited.
    Confirmed,
    /// Provider-reported fully-settled state; credit-equivalent to `Confirmed`.
    Finished,
    /// The payment failed validation or was reported failed/reverted. Terminal, no credit.
    Failed,
    /// The payment window lapsed without a final signal. Terminal, no credit.
    Expired,
    /// The payment was cancelled upstream. Terminal, no credit.
    Cancelled,
}

impl PaymentStatus {
    /// Terminal states permit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Finished | Self::Failed | Self::Expired | Self::Cancelled)
    }

    /// True for terminal states that carry a ledger credit.
    pub fn is_credited(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Finished)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        if self.is_terminal() || *self == next {
            return false;
        }
        match (self, next) {
            (Created, Waiting) => true,
            (Created | Waiting, Confirming) => true,
            (Created | Waiting | Confirming, Confirmed | Finished) => true,
            (Created | Waiting | Confirming, Failed | Expired | Cancelled) => true,
            _ => false,
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Created => "Created",
            PaymentStatus::Waiting => "Waiting",
            PaymentStatus::Confirming => "Confirming",
            PaymentStatus::Confirmed => "Confirmed",
            PaymentStatus::Finished => "Finished",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Expired => "Expired",
            PaymentStatus::Cancelled => "Cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "Waiting" => Ok(Self::Waiting),
            "Confirming" => Ok(Self::Confirming),
            "Confirmed" => Ok(Self::Confirmed),
            "Finished" => Ok(Self::Finished),
            "Failed" => Ok(Self::Failed),
            "Expired" => Ok(Self::Expired),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Created");
            PaymentStatus::Created
        })
    }
}

//--------------------------------------    ChainNetwork      --------------------------------------------------------
/// Networks on which stablecoin payments are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum ChainNetwork {
    Ethereum,
    Bsc,
    Polygon,
}

impl Display for ChainNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainNetwork::Ethereum => write!(f, "Ethereum"),
            ChainNetwork::Bsc => write!(f, "Bsc"),
            ChainNetwork::Polygon => write!(f, "Polygon"),
        }
    }
}

impl FromStr for ChainNetwork {
    type Err = ConversionError;

    /// Accepts the aliases the provider and clients use for each network.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ethereum" | "eth" | "erc20" | "mainnet" => Ok(Self::Ethereum),
            "bsc" | "bnb" | "bep20" | "binance" => Ok(Self::Bsc),
            "polygon" | "matic" | "pos" => Ok(Self::Polygon),
            other => Err(ConversionError(format!("Unknown network: {other}"))),
        }
    }
}

//--------------------------------------    PaymentRecord     --------------------------------------------------------
/// The durable audit/lifecycle record of one purchase attempt. Append-only: rows are created at
/// intent time and mutated only by the confirmation gate and the credit engine, never deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub user_id: String,
    pub external_payment_id: Option<String>,
    pub tx_hash: Option<String>,
    pub network: ChainNetwork,
    pub pay_currency: String,
    /// The fiat-equivalent amount the buyer committed to pay.
    pub value_usdt: MicroUsdt,
    /// The token amount purchased at `unit_price`. This, not any signal field, is what gets
    /// credited.
    pub token_amount: MicroToken,
    /// Price per whole token, in microUSDT.
    pub unit_price: MicroUsdt,
    pub sale_phase: i64,
    pub status: PaymentStatus,
    /// Raw provider payload captured at intake, for audit.
    pub raw_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

//--------------------------------------   NewPaymentRecord   --------------------------------------------------------
/// A purchase intent as submitted by an intake adapter.
#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub order_id: OrderId,
    pub user_id: String,
    pub network: ChainNetwork,
    pub pay_currency: String,
    pub value_usdt: MicroUsdt,
    pub token_amount: MicroToken,
    pub unit_price: MicroUsdt,
    pub sale_phase: i64,
    pub external_payment_id: Option<String>,
    pub raw_payload: Option<String>,
}

impl NewPaymentRecord {
    pub fn new(order_id: OrderId, user_id: String, value_usdt: MicroUsdt, unit_price: MicroUsdt) -> Self {
        let token_amount = tokens_for_value(value_usdt, unit_price);
        Self {
            order_id,
            user_id,
            network: ChainNetwork::Ethereum,
            pay_currency: plg_common::USDT_CURRENCY_CODE.to_string(),
            value_usdt,
            token_amount,
            unit_price,
            sale_phase: 1,
            external_payment_id: None,
            raw_payload: None,
        }
    }

    pub fn on_network(mut self, network: ChainNetwork) -> Self {
        self.network = network;
        self
    }

    pub fn in_phase(mut self, phase: i64) -> Self {
        self.sale_phase = phase;
        self
    }

    pub fn with_external_payment_id(mut self, id: String) -> Self {
        self.external_payment_id = Some(id);
        self
    }

    pub fn with_raw_payload(mut self, payload: String) -> Self {
        self.raw_payload = Some(payload);
        self
    }
}

/// Token amount purchasable for `value` at `unit_price` microUSDT per token, rounded down.
pub fn tokens_for_value(value: MicroUsdt, unit_price: MicroUsdt) -> MicroToken {
    if unit_price.value() <= 0 {
        return MicroToken::from(0);
    }
    let micro = value.value() as i128 * plg_common::MICRO_PER_UNIT as i128 / unit_price.value() as i128;
    MicroToken::from(micro as i64)
}

//--------------------------------------    LedgerAccount     --------------------------------------------------------
/// A user's on-platform balance record. Credits are monotonic; nothing in this engine ever
/// decreases a balance.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub user_id: String,
    /// Weak reference to the referring user; the parent may be missing or deleted.
    pub referred_by: Option<String>,
    pub token_balance: MicroToken,
    /// Subset of the balance bought directly. This is the accrual basis for yield.
    pub tokens_purchased: MicroToken,
    pub contributed_value: MicroUsdt,
    /// Subset of the balance earned through referral commissions.
    pub commission_balance: MicroToken,
    /// Accrual rate in micro-tokens per minute. Additive across purchases.
    pub yield_rate_per_minute: MicroToken,
    pub accumulated_yield: MicroToken,
    pub last_yield_update: DateTime<Utc>,
    pub is_active_contributor: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   CommissionRecord   --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CommissionStatus {
    Available,
    Withdrawn,
}

impl Display for CommissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommissionStatus::Available => write!(f, "Available"),
            CommissionStatus::Withdrawn => write!(f, "Withdrawn"),
        }
    }
}

/// One referral payout. Created exactly once per (payment, level) pair; the schema enforces the
/// pairing with a unique constraint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CommissionRecord {
    pub id: i64,
    pub payment_id: i64,
    pub beneficiary_id: String,
    pub source_user_id: String,
    pub level: i64,
    pub amount: MicroToken,
    pub rate_bps: i64,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
}

//-------------------------------------- ContributionRecord   --------------------------------------------------------
/// Immutable audit row written for every successful credit.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub id: i64,
    pub payment_id: i64,
    pub user_id: String,
    pub token_amount: MicroToken,
    pub value_usdt: MicroUsdt,
    pub sale_phase: i64,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    GlobalMetrics     --------------------------------------------------------
/// Aggregate sale counters. A singleton row, mutated only by server-side additive updates.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub id: i64,
    pub total_tokens_sold: MicroToken,
    pub total_value_contributed: MicroUsdt,
    pub updated_at: DateTime<Utc>,
}

/// Per-phase counters and the phase's allocation cap. Caps are enforced at intake time; this
/// engine only updates the sold counters.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PhaseMetrics {
    pub phase: i64,
    pub tokens_sold: MicroToken,
    pub allocation_cap: MicroToken,
    pub unit_price: MicroUsdt,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn terminal_states_are_sticky() {
        use PaymentStatus::*;
        for terminal in [Confirmed, Finished, Failed, Expired, Cancelled] {
            for next in [Created, Waiting, Confirming, Confirmed, Finished, Failed, Expired, Cancelled] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next} must be forbidden");
            }
        }
    }

    #[test]
    fn credit_path_transitions() {
        use PaymentStatus::*;
        assert!(Created.can_transition_to(Waiting));
        assert!(Waiting.can_transition_to(Confirming));
        assert!(Confirming.can_transition_to(Confirmed));
        assert!(Waiting.can_transition_to(Failed));
        assert!(!Waiting.can_transition_to(Waiting));
        assert!(!Confirming.can_transition_to(Waiting));
    }

    #[test]
    fn status_round_trips_through_strings() {
        use PaymentStatus::*;
        for status in [Created, Waiting, Confirming, Confirmed, Finished, Failed, Expired, Cancelled] {
            assert_eq!(status.to_string().parse::<PaymentStatus>().unwrap(), status);
        }
        assert_eq!(PaymentStatus::from("garbage".to_string()), Created);
    }

    #[test]
    fn network_aliases_normalize() {
        assert_eq!(" ERC20 ".parse::<ChainNetwork>().unwrap(), ChainNetwork::Ethereum);
        assert_eq!("bep20".parse::<ChainNetwork>().unwrap(), ChainNetwork::Bsc);
        assert_eq!("MATIC".parse::<ChainNetwork>().unwrap(), ChainNetwork::Polygon);
        assert!("solana".parse::<ChainNetwork>().is_err());
    }

    #[test]
    fn token_amounts_derive_from_price() {
        // 20 USDT at 0.30 USDT/token buys 66.666666 tokens (rounded down).
        let tokens = tokens_for_value(MicroUsdt::from_usdt(20), MicroUsdt::from(300_000));
        assert_eq!(tokens, MicroToken::from(66_666_666));
        assert_eq!(tokens_for_value(MicroUsdt::from_usdt(20), MicroUsdt::from(0)), MicroToken::from(0));
    }
}
