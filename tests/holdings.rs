//! Holdings aggregation integration tests: apply_buy, apply_sell, weighted average.

use inventory_ledger::error::LedgerError;
use inventory_ledger::ledger::holdings::{apply_buy, apply_sell};
use inventory_ledger::persistence::{LedgerStore, LedgerTx, MemoryStore};
use inventory_ledger::types::user::NewUser;
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn fresh_store() -> (MemoryStore, Uuid) {
    let store = MemoryStore::new();
    let user = store
        .create_user(NewUser {
            username: "holder".into(),
            password_hash: String::new(),
            starting_cash: dec!(0),
        })
        .await
        .unwrap();
    (store, user.id)
}

#[tokio::test]
async fn apply_buy_new_holding() {
    let (store, user_id) = fresh_store().await;
    let mut tx = store.begin(user_id).await.unwrap();

    apply_buy(&mut tx, "WIDGET", "Acme", 10, dec!(12.5)).await.unwrap();
    tx.commit().await.unwrap();

    let holdings = store.holdings(user_id).await.unwrap();
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].user_id, user_id);
    assert_eq!(holdings[0].symbol, "widget");
    assert_eq!(holdings[0].display_name, "Acme");
    assert_eq!(holdings[0].shares, 10);
    assert_eq!(holdings[0].average_price, dec!(12.5));
}

#[tokio::test]
async fn apply_buy_reweights_average() {
    let (store, user_id) = fresh_store().await;
    let mut tx = store.begin(user_id).await.unwrap();

    apply_buy(&mut tx, "widget", "Acme", 10, dec!(10)).await.unwrap();
    let merged = apply_buy(&mut tx, "widget", "Other Co", 5, dec!(16)).await.unwrap();

    assert_eq!(merged.shares, 15);
    assert_eq!(merged.average_price, dec!(12));
    assert_eq!(merged.display_name, "Acme");
}

#[tokio::test]
async fn apply_buy_is_case_insensitive() {
    let (store, user_id) = fresh_store().await;
    let mut tx = store.begin(user_id).await.unwrap();

    apply_buy(&mut tx, "ABC", "Acme", 1, dec!(1)).await.unwrap();
    apply_buy(&mut tx, "abc", "Acme", 1, dec!(3)).await.unwrap();
    tx.commit().await.unwrap();

    let holdings = store.holdings(user_id).await.unwrap();
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].shares, 2);
    assert_eq!(holdings[0].average_price, dec!(2));
}

#[tokio::test]
async fn apply_sell_partial_keeps_average() {
    let (store, user_id) = fresh_store().await;
    let mut tx = store.begin(user_id).await.unwrap();

    apply_buy(&mut tx, "widget", "Acme", 10, dec!(7.25)).await.unwrap();
    let fill = apply_sell(&mut tx, "Widget", 4).await.unwrap();

    assert_eq!(fill.price, dec!(7.25));
    let remaining = fill.remaining.unwrap();
    assert_eq!(remaining.shares, 6);
    assert_eq!(remaining.average_price, dec!(7.25));
}

#[tokio::test]
async fn apply_sell_everything_removes_holding() {
    let (store, user_id) = fresh_store().await;
    let mut tx = store.begin(user_id).await.unwrap();

    apply_buy(&mut tx, "widget", "Acme", 10, dec!(3)).await.unwrap();
    let fill = apply_sell(&mut tx, "widget", 10).await.unwrap();
    assert!(fill.remaining.is_none());
    tx.commit().await.unwrap();

    assert!(store.holdings(user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn apply_sell_rejects_missing_and_oversized() {
    let (store, user_id) = fresh_store().await;
    let mut tx = store.begin(user_id).await.unwrap();

    assert_eq!(
        apply_sell(&mut tx, "ghost", 1).await.unwrap_err(),
        LedgerError::NoSuchHolding {
            symbol: "ghost".into()
        }
    );

    apply_buy(&mut tx, "widget", "Acme", 3, dec!(1)).await.unwrap();
    assert_eq!(
        apply_sell(&mut tx, "widget", 4).await.unwrap_err(),
        LedgerError::InsufficientShares {
            symbol: "widget".into(),
            requested: 4,
            held: 3
        }
    );
    assert_eq!(tx.holding("widget").await.unwrap().unwrap().shares, 3);
}

#[tokio::test]
async fn apply_buy_rejects_bad_arguments() {
    let (store, user_id) = fresh_store().await;
    let mut tx = store.begin(user_id).await.unwrap();

    for result in [
        apply_buy(&mut tx, "widget", "Acme", 0, dec!(1)).await,
        apply_buy(&mut tx, "widget", "Acme", 1, dec!(0)).await,
        apply_buy(&mut tx, "widget", "", 1, dec!(1)).await,
        apply_buy(&mut tx, " ", "Acme", 1, dec!(1)).await,
    ] {
        assert!(matches!(result, Err(LedgerError::InvalidArgument(_))));
    }
    assert!(matches!(
        apply_sell(&mut tx, "widget", 0).await,
        Err(LedgerError::InvalidArgument(_))
    ));
}
