//! On-chain verification path: confirmation depth, receipt scanning, and cross-path transaction
//! dedup.

use plg_common::{MicroToken, MicroUsdt};
use presale_ledger_engine::{
    db_types::{ChainNetwork, NewPaymentRecord, OrderId, PaymentStatus},
    events::EventProducers,
    helpers::TRANSFER_EVENT_TOPIC,
    signal_types::{ChainProof, ChainReceipt, PaymentSignal, ReceiptLog, SignalStatus},
    AccountManagement,
    CreditFlowApi,
    LedgerDatabase,
    LedgerEngineError,
    SignalDisposition,
    SqliteDatabase,
};

mod support;

const TX_HASH: &str = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

fn api(db: SqliteDatabase) -> CreditFlowApi<SqliteDatabase> {
    CreditFlowApi::new(db, support::test_gate(), EventProducers::default())
}

fn intent(order: &str, user: &str, usdt: i64) -> NewPaymentRecord {
    NewPaymentRecord::new(
        OrderId::from(order),
        user.to_string(),
        MicroUsdt::from_usdt(usdt),
        MicroUsdt::from(300_000),
    )
}

fn transfer_receipt(to: &str, raw_value: u128, success: bool) -> ChainReceipt {
    let log = ReceiptLog {
        address: support::USDT_ETH.to_string(),
        topics: vec![
            format!("0x{TRANSFER_EVENT_TOPIC}"),
            format!("0x{:0>64}", "aa".repeat(20)),
            format!("0x{:0>64}", to.trim_start_matches("0x")),
        ],
        data: format!("0x{raw_value:064x}"),
    };
    ChainReceipt { tx_hash: TX_HASH.to_string(), success, block_number: 1_000, logs: vec![log] }
}

fn onchain_signal(order: &str, receipt: ChainReceipt, depth: u64) -> PaymentSignal {
    let current_block = receipt.block_number + depth;
    PaymentSignal::new(OrderId::from(order), ChainNetwork::Ethereum, "usdt", SignalStatus::Confirmed)
        .with_tx_hash(TX_HASH)
        .with_chain_proof(ChainProof { receipt, current_block })
}

#[tokio::test]
async fn shallow_transactions_defer_until_the_depth_threshold() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api = api(db.clone());
    api.process_purchase_intent(intent("order-1", "u-1", 20)).await.unwrap();

    // Two confirmations: not final, nothing mutated, ask again later.
    let receipt = transfer_receipt(support::RECEIVER, 20_000_000, true);
    let disposition = api.process_signal(onchain_signal("order-1", receipt, 2)).await.unwrap();
    assert!(matches!(disposition, SignalDisposition::Deferred { .. }));
    let record = db.fetch_payment_by_order_id(&OrderId::from("order-1")).await.unwrap().unwrap();
    assert!(record.tx_hash.is_none());
    assert_eq!(db.fetch_account("u-1").await.unwrap().unwrap().token_balance, MicroToken::from(0));

    // Three confirmations: the same evidence now settles, and the paid amount comes from the
    // Transfer event.
    let receipt = transfer_receipt(support::RECEIVER, 20_000_000, true);
    let disposition = api.process_signal(onchain_signal("order-1", receipt, 3)).await.unwrap();
    let result = match disposition {
        SignalDisposition::Credited(result) => result,
        other => panic!("expected a credit, got {other:?}"),
    };
    assert_eq!(result.tokens_credited, MicroToken::from(66_666_666));

    let record = db.fetch_payment_by_order_id(&OrderId::from("order-1")).await.unwrap().unwrap();
    assert_eq!(record.tx_hash.as_deref(), Some(TX_HASH));
    assert_eq!(record.status, PaymentStatus::Confirmed);
}

#[tokio::test]
async fn reverted_transactions_are_terminal() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api = api(db.clone());
    api.process_purchase_intent(intent("order-1", "u-1", 20)).await.unwrap();

    let receipt = transfer_receipt(support::RECEIVER, 20_000_000, false);
    let disposition = api.process_signal(onchain_signal("order-1", receipt, 10)).await.unwrap();
    let record = match disposition {
        SignalDisposition::Rejected { record, .. } => record,
        other => panic!("expected a rejection, got {other:?}"),
    };
    assert_eq!(record.status, PaymentStatus::Failed);

    // A deeper re-check of the same reverted transaction changes nothing.
    let receipt = transfer_receipt(support::RECEIVER, 20_000_000, false);
    let disposition = api.process_signal(onchain_signal("order-1", receipt, 50)).await.unwrap();
    assert!(matches!(disposition, SignalDisposition::Unchanged(_)));
}

#[tokio::test]
async fn transfers_to_the_wrong_address_do_not_pay() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api = api(db.clone());
    api.process_purchase_intent(intent("order-1", "u-1", 20)).await.unwrap();

    let elsewhere = "0x9999999999999999999999999999999999999999";
    let receipt = transfer_receipt(elsewhere, 20_000_000, true);
    let disposition = api.process_signal(onchain_signal("order-1", receipt, 5)).await.unwrap();
    assert!(matches!(disposition, SignalDisposition::Rejected { .. }));
    assert_eq!(db.fetch_account("u-1").await.unwrap().unwrap().token_balance, MicroToken::from(0));
}

#[tokio::test]
async fn the_same_transaction_cannot_pay_two_orders() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api = api(db.clone());
    api.process_purchase_intent(intent("order-1", "u-1", 20)).await.unwrap();
    api.process_purchase_intent(intent("order-2", "u-1", 20)).await.unwrap();

    let receipt = transfer_receipt(support::RECEIVER, 20_000_000, true);
    let disposition = api.process_signal(onchain_signal("order-1", receipt, 5)).await.unwrap();
    assert!(matches!(disposition, SignalDisposition::Credited(_)));

    // The second order arrives carrying the already-spent hash, through a different intake path.
    let receipt = transfer_receipt(support::RECEIVER, 20_000_000, true);
    let err = api.process_signal(onchain_signal("order-2", receipt, 5)).await.unwrap_err();
    assert!(matches!(err, LedgerEngineError::TxHashAlreadyExists(_)));

    let record = db.fetch_payment_by_order_id(&OrderId::from("order-2")).await.unwrap().unwrap();
    assert!(!record.status.is_credited());
    let account = db.fetch_account("u-1").await.unwrap().unwrap();
    assert_eq!(account.token_balance, MicroToken::from(66_666_666));
}

#[tokio::test]
async fn a_signal_without_an_order_resolves_through_the_tx_hash() {
    let db = support::new_test_db().await;
    db.fetch_or_create_account("u-1", None).await.unwrap();
    let api = api(db.clone());
    api.process_purchase_intent(intent("order-1", "u-1", 20)).await.unwrap();

    // Credit through the on-chain path so the hash is linked.
    let receipt = transfer_receipt(support::RECEIVER, 20_000_000, true);
    api.process_signal(onchain_signal("order-1", receipt, 5)).await.unwrap();

    // A later poller signal references an order id the store has never seen, but carries the
    // known hash: it must find the credited record instead of crediting anew.
    let receipt = transfer_receipt(support::RECEIVER, 20_000_000, true);
    let disposition = api.process_signal(onchain_signal("order-unknown", receipt, 8)).await.unwrap();
    assert!(matches!(disposition, SignalDisposition::AlreadyCredited(_)));
    let account = db.fetch_account("u-1").await.unwrap().unwrap();
    assert_eq!(account.token_balance, MicroToken::from(66_666_666));
}
