//! Provider-path reconciliation: exactly-once crediting, referral cascades, lifecycle
//! progressions and rejection handling.

use plg_common::{MicroToken, MicroUsdt};
use presale_ledger_engine::{
    db_types::{NewPaymentRecord, OrderId, PaymentStatus},
    events::EventProducers,
    signal_types::{PaymentSignal, SignalStatus},
    AccountManagement,
    CreditFlowApi,
    LedgerDatabase,
    LedgerEngineError,
    SignalDisposition,
    SqliteDatabase,
};

mod support;

const PRICE_30_CENTS: i64 = 300_000;

fn api(db: SqliteDatabase) -> CreditFlowApi<SqliteDatabase> {
    CreditFlowApi::new(db, support::test_gate(), EventProducers::default())
}

fn intent(order: &str, user: &str, usdt: i64) -> NewPaymentRecord {
    NewPaymentRecord::new(
        OrderId::from(order),
        user.to_string(),
        MicroUsdt::from_usdt(usdt),
        MicroUsdt::from(PRICE_30_CENTS),
    )
}

fn finished_signal(order: &str, paid_usdt: i64) -> PaymentSignal {
    PaymentSignal::new(
        OrderId::from(order),
        presale_ledger_engine::db_types::ChainNetwork::Ethereum,
        "usdt",
        SignalStatus::Finished,
    )
    .with_claimed_amount(MicroUsdt::from_usdt(paid_usdt))
}

#[tokio::test]
async fn end_to_end_purchase_without_referrer() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api = api(db.clone());

    let (record, created) = api.process_purchase_intent(intent("order-1", "u-1", 20)).await.unwrap();
    assert!(created);
    assert_eq!(record.status, PaymentStatus::Created);
    assert_eq!(record.token_amount, MicroToken::from(66_666_666));

    let disposition = api.process_signal(finished_signal("order-1", 20)).await.unwrap();
    let result = match disposition {
        SignalDisposition::Credited(result) => result,
        other => panic!("expected a credit, got {other:?}"),
    };
    assert_eq!(result.tokens_credited, MicroToken::from(66_666_666));
    assert_eq!(result.new_balance, MicroToken::from(66_666_666));
    assert!(result.commissions.is_empty());

    let account = db.fetch_account("u-1").await.unwrap().unwrap();
    assert_eq!(account.token_balance, MicroToken::from(66_666_666));
    assert_eq!(account.tokens_purchased, MicroToken::from(66_666_666));
    assert_eq!(account.contributed_value, MicroUsdt::from_usdt(20));
    assert_eq!(account.commission_balance, MicroToken::from(0));
    // 66.666666 tokens at 5 bps/hour accrue 555 micro-tokens per minute.
    assert_eq!(account.yield_rate_per_minute, MicroToken::from(555));
    assert!(account.is_active_contributor);

    let metrics = db.fetch_global_metrics().await.unwrap();
    assert_eq!(metrics.total_tokens_sold, MicroToken::from(66_666_666));
    assert_eq!(metrics.total_value_contributed, MicroUsdt::from_usdt(20));
    let phase = db.fetch_phase_metrics(1).await.unwrap().unwrap();
    assert_eq!(phase.tokens_sold, MicroToken::from(66_666_666));

    let record = db.fetch_payment_by_order_id(&OrderId::from("order-1")).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Confirmed);
    assert!(record.confirmed_at.is_some());

    let contributions = db.fetch_contributions_for_account("u-1").await.unwrap();
    assert_eq!(contributions.len(), 1);
    assert_eq!(contributions[0].token_amount, MicroToken::from(66_666_666));
}

#[tokio::test]
async fn duplicate_delivery_credits_exactly_once() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api = api(db.clone());
    api.process_purchase_intent(intent("order-1", "u-1", 20)).await.unwrap();

    let first = api.process_signal(finished_signal("order-1", 20)).await.unwrap();
    assert!(matches!(first, SignalDisposition::Credited(_)));
    let second = api.process_signal(finished_signal("order-1", 20)).await.unwrap();
    assert!(matches!(second, SignalDisposition::AlreadyCredited(_)));

    let account = db.fetch_account("u-1").await.unwrap().unwrap();
    assert_eq!(account.token_balance, MicroToken::from(66_666_666));
    let metrics = db.fetch_global_metrics().await.unwrap();
    assert_eq!(metrics.total_tokens_sold, MicroToken::from(66_666_666));
    assert_eq!(db.fetch_contributions_for_account("u-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_duplicate_delivery_credits_exactly_once() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api_a = api(db.clone());
    let api_b = api(db.clone());
    api_a.process_purchase_intent(intent("order-1", "u-1", 20)).await.unwrap();

    let (a, b) = tokio::join!(
        api_a.process_signal(finished_signal("order-1", 20)),
        api_b.process_signal(finished_signal("order-1", 20)),
    );
    let credits = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|d| matches!(d, SignalDisposition::Credited(_)))
        .count();
    assert_eq!(credits, 1, "exactly one of the two deliveries must credit");

    let account = db.fetch_account("u-1").await.unwrap().unwrap();
    assert_eq!(account.token_balance, MicroToken::from(66_666_666));
}

#[tokio::test]
async fn referral_chain_pays_one_level_when_only_one_exists() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u", None).await.unwrap();
    db.fetch_or_create_account("v", Some("u")).await.unwrap();
    let api = api(db.clone());

    // 30 USDT at 0.30 is a 100-token purchase.
    api.process_purchase_intent(intent("order-v", "v", 30)).await.unwrap();
    let disposition = api.process_signal(finished_signal("order-v", 30)).await.unwrap();
    let result = match disposition {
        SignalDisposition::Credited(result) => result,
        other => panic!("expected a credit, got {other:?}"),
    };
    assert_eq!(result.tokens_credited, MicroToken::from_tokens(100));
    assert_eq!(result.commissions.len(), 1);
    assert_eq!(result.commissions[0].level, 1);
    assert_eq!(result.commissions[0].beneficiary_id, "u");
    assert_eq!(result.commissions[0].amount, MicroToken::from_tokens(5));

    let v = db.fetch_account("v").await.unwrap().unwrap();
    assert_eq!(v.token_balance, MicroToken::from_tokens(100));
    assert_eq!(v.commission_balance, MicroToken::from(0));

    let u = db.fetch_account("u").await.unwrap().unwrap();
    assert_eq!(u.token_balance, MicroToken::from_tokens(5));
    assert_eq!(u.commission_balance, MicroToken::from_tokens(5));
    assert_eq!(u.tokens_purchased, MicroToken::from(0));
    // Commissions compound into the yield rate: 5 tokens at 5 bps/hour is 41 micro-tokens/min.
    assert_eq!(u.yield_rate_per_minute, MicroToken::from(41));

    let commissions = db.fetch_commissions_for_account("u").await.unwrap();
    assert_eq!(commissions.len(), 1);
    assert_eq!(db.referral_counts("u").await.unwrap(), [1, 0, 0]);
}

#[tokio::test]
async fn cascade_stops_at_three_levels() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("e", None).await.unwrap();
    db.fetch_or_create_account("d", Some("e")).await.unwrap();
    db.fetch_or_create_account("c", Some("d")).await.unwrap();
    db.fetch_or_create_account("b", Some("c")).await.unwrap();
    db.fetch_or_create_account("a", Some("b")).await.unwrap();
    let api = api(db.clone());

    api.process_purchase_intent(intent("order-a", "a", 30)).await.unwrap();
    let disposition = api.process_signal(finished_signal("order-a", 30)).await.unwrap();
    let result = match disposition {
        SignalDisposition::Credited(result) => result,
        other => panic!("expected a credit, got {other:?}"),
    };
    let beneficiaries: Vec<_> = result.commissions.iter().map(|c| c.beneficiary_id.as_str()).collect();
    assert_eq!(beneficiaries, vec!["b", "c", "d"]);
    assert_eq!(result.commissions[0].amount, MicroToken::from_tokens(5));
    assert_eq!(result.commissions[1].amount, MicroToken::from_tokens(2));
    assert_eq!(result.commissions[2].amount, MicroToken::from_tokens(1));

    // The level-4 ancestor is untouched.
    let e = db.fetch_account("e").await.unwrap().unwrap();
    assert_eq!(e.token_balance, MicroToken::from(0));
    assert_eq!(db.referral_counts("e").await.unwrap(), [1, 1, 1]);
}

#[tokio::test]
async fn referral_cycle_terminates() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("b", None).await.unwrap();
    db.fetch_or_create_account("a", Some("b")).await.unwrap();
    // Corrupt the graph into a cycle a → b → a. Impossible through the API, but the cascade must
    // still halt.
    sqlx::query("UPDATE ledger_accounts SET referred_by = 'a' WHERE user_id = 'b'")
        .execute(db.pool())
        .await
        .unwrap();

    let api = api(db.clone());
    api.process_purchase_intent(intent("order-a", "a", 30)).await.unwrap();
    let disposition = api.process_signal(finished_signal("order-a", 30)).await.unwrap();
    let result = match disposition {
        SignalDisposition::Credited(result) => result,
        other => panic!("expected a credit, got {other:?}"),
    };
    // The walk visits b, then sees a again and stops.
    assert_eq!(result.commissions.len(), 1);
    assert_eq!(result.commissions[0].beneficiary_id, "b");
}

#[tokio::test]
async fn failed_credit_leaves_no_partial_state() {
    let db = support::new_test_db().await;
    let api = api(db.clone());
    // The intent references a user with no ledger account; the credit must abort whole.
    api.process_purchase_intent(intent("order-ghost", "ghost", 20)).await.unwrap();

    let err = api.process_signal(finished_signal("order-ghost", 20)).await.unwrap_err();
    assert!(matches!(err, LedgerEngineError::AccountNotFound(ref user) if user == "ghost"));

    // Nothing was credited and the record is still retryable.
    let record = db.fetch_payment_by_order_id(&OrderId::from("order-ghost")).await.unwrap().unwrap();
    assert!(!record.status.is_terminal());
    let metrics = db.fetch_global_metrics().await.unwrap();
    assert_eq!(metrics.total_tokens_sold, MicroToken::from(0));
    assert!(db.fetch_contributions_for_account("ghost").await.unwrap().is_empty());

    // Once the account exists, the very same signal settles.
    db.fetch_or_create_account("ghost", None).await.unwrap();
    let disposition = api.process_signal(finished_signal("order-ghost", 20)).await.unwrap();
    assert!(matches!(disposition, SignalDisposition::Credited(_)));
}

#[tokio::test]
async fn amount_mismatch_rejects_and_sticks() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api = api(db.clone());
    api.process_purchase_intent(intent("order-1", "u-1", 100)).await.unwrap();

    // 94.9 paid against 100 expected is outside the 5% tolerance.
    let disposition = api
        .process_signal(finished_signal("order-1", 0).with_claimed_amount(MicroUsdt::from(94_900_000)))
        .await
        .unwrap();
    let record = match disposition {
        SignalDisposition::Rejected { record, .. } => record,
        other => panic!("expected a rejection, got {other:?}"),
    };
    assert_eq!(record.status, PaymentStatus::Failed);

    // Terminal states are sticky: a later, correct-looking signal is a no-op.
    let disposition = api.process_signal(finished_signal("order-1", 100)).await.unwrap();
    assert!(matches!(disposition, SignalDisposition::Unchanged(_)));
    let account = db.fetch_account("u-1").await.unwrap().unwrap();
    assert_eq!(account.token_balance, MicroToken::from(0));
}

#[tokio::test]
async fn boundary_variance_is_accepted() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api = api(db.clone());
    api.process_purchase_intent(intent("order-1", "u-1", 100)).await.unwrap();

    // Exactly 5% under the expected amount still settles.
    let disposition = api.process_signal(finished_signal("order-1", 95)).await.unwrap();
    assert!(matches!(disposition, SignalDisposition::Credited(_)));
}

#[tokio::test]
async fn provider_progressions_advance_the_lifecycle() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api = api(db.clone());
    api.process_purchase_intent(intent("order-1", "u-1", 20)).await.unwrap();

    let waiting = PaymentSignal::new(
        OrderId::from("order-1"),
        presale_ledger_engine::db_types::ChainNetwork::Ethereum,
        "usdt",
        SignalStatus::Waiting,
    );
    let disposition = api.process_signal(waiting.clone()).await.unwrap();
    let record = match disposition {
        SignalDisposition::StatusAdvanced(record) => record,
        other => panic!("expected an advance, got {other:?}"),
    };
    assert_eq!(record.status, PaymentStatus::Waiting);

    // A repeat of the same provider status has nothing to advance; it defers.
    let disposition = api.process_signal(waiting).await.unwrap();
    assert!(matches!(disposition, SignalDisposition::Deferred { .. }));

    let expired = PaymentSignal::new(
        OrderId::from("order-1"),
        presale_ledger_engine::db_types::ChainNetwork::Ethereum,
        "usdt",
        SignalStatus::Expired,
    );
    let disposition = api.process_signal(expired).await.unwrap();
    let record = match disposition {
        SignalDisposition::StatusAdvanced(record) => record,
        other => panic!("expected an annulment, got {other:?}"),
    };
    assert_eq!(record.status, PaymentStatus::Expired);
}

#[tokio::test]
async fn purchase_intents_are_idempotent() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api = api(db.clone());

    let (first, created) = api.process_purchase_intent(intent("order-1", "u-1", 20)).await.unwrap();
    assert!(created);
    let (second, created) = api.process_purchase_intent(intent("order-1", "u-1", 20)).await.unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);

    let unknown = api.process_signal(finished_signal("order-unknown", 20)).await;
    assert!(matches!(unknown, Err(LedgerEngineError::PaymentNotFound(_))));
}
