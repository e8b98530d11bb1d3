use serde::{Deserialize, Serialize};

use crate::db_types::OrderId;
use plg_common::{MicroToken, MicroUsdt};

/// The notification categories the engine emits. The string forms are the dedup-cache keys and
/// what the external sink receives as the event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    PaymentVerified,
    BalanceAdded,
    CommissionEarned,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PaymentVerified => "payment-verified",
            NotificationKind::BalanceAdded => "balance-added",
            NotificationKind::CommissionEarned => "commission-earned",
        }
    }
}

/// A payment passed all finality checks and was credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerifiedEvent {
    pub order_id: OrderId,
    pub user_id: String,
    pub value: MicroUsdt,
    pub tokens: MicroToken,
}

/// A user's spendable balance grew.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAddedEvent {
    pub user_id: String,
    pub order_id: OrderId,
    pub tokens: MicroToken,
    pub new_balance: MicroToken,
}

/// An ancestor in the referral chain earned a commission from a downstream purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionEarnedEvent {
    pub beneficiary_id: String,
    pub source_user_id: String,
    pub order_id: OrderId,
    pub level: i64,
    pub amount: MicroToken,
}
