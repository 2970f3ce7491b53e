mod common;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use multifire::{bson::doc, memory::MAX_TRANSACTION_ATTEMPTS, prelude::*};

use common::setup;

#[tokio::test]
async fn batch_returns_ids_in_input_order() {
    let (_, firebase) = setup(&["p1"]).await;
    firebase
        .set_data("users", "u3", &doc! { "name": "Cid" }, SetOptions::default(), Some("p1"))
        .await
        .unwrap();

    let ids = firebase
        .execute_batch(
            vec![
                BatchOperation::set("users", "u1", doc! { "name": "Ann" }).with_timestamp(),
                BatchOperation::set("users", "u3", doc! { "age": 40 }).merge(),
                BatchOperation::update("users", "u3", doc! { "age": 41 }),
                BatchOperation::delete("users", "u2"),
            ],
            Some("p1"),
        )
        .await
        .unwrap();

    assert_eq!(ids, vec!["u1", "u3", "u3", "u2"]);

    let u1 = firebase.get_data("users", "u1", Some("p1")).await.unwrap();
    assert!(u1.get(TIMESTAMP_FIELD).is_some());

    let u3 = firebase.get_data("users", "u3", Some("p1")).await.unwrap();
    assert_eq!(u3.into_data().unwrap(), doc! { "name": "Cid", "age": 41 });
}

#[tokio::test]
async fn batch_with_an_invalid_path_writes_nothing() {
    let (_, firebase) = setup(&["p1"]).await;

    let result = firebase
        .execute_batch(
            vec![
                BatchOperation::set("users", "u1", doc! { "name": "Ann" }),
                BatchOperation::set("users", "", doc! { "name": "Nobody" }),
            ],
            Some("p1"),
        )
        .await;

    assert!(matches!(result, Err(FirebaseError::InvalidArgument(_))));
    assert!(!firebase.is_exist("users", "u1", Some("p1")).await.unwrap());
}

#[tokio::test]
async fn batch_rejected_by_permissions_writes_nothing() {
    let (backend, firebase) = setup(&["p1"]).await;
    backend.firestore_of("p1").await.unwrap().deny_collection("audit").await;

    let result = firebase
        .execute_batch(
            vec![
                BatchOperation::set("users", "u1", doc! { "name": "Ann" }),
                BatchOperation::set("audit", "a1", doc! { "by": "u1" }),
            ],
            Some("p1"),
        )
        .await;

    assert!(matches!(result, Err(FirebaseError::PermissionDenied(_))));
    assert!(!firebase.is_exist("users", "u1", Some("p1")).await.unwrap());
}

#[tokio::test]
async fn batch_timestamp_collision_is_rejected() {
    let (_, firebase) = setup(&["p1"]).await;

    let result = firebase
        .execute_batch(
            vec![
                BatchOperation::set("users", "u1", doc! { "name": "Ann" }),
                BatchOperation::update("users", "u1", doc! { "updatedAt": 1 }).with_timestamp(),
            ],
            Some("p1"),
        )
        .await;

    assert_eq!(result, Err(FirebaseError::ReservedField(TIMESTAMP_FIELD.into())));
    assert!(!firebase.is_exist("users", "u1", Some("p1")).await.unwrap());
}

#[tokio::test]
async fn transaction_reads_then_writes() {
    let (_, firebase) = setup(&["p1"]).await;
    firebase
        .set_data("accounts", "a", &doc! { "balance": 100 }, SetOptions::default(), Some("p1"))
        .await
        .unwrap();
    firebase
        .set_data("accounts", "b", &doc! { "balance": 0 }, SetOptions::default(), Some("p1"))
        .await
        .unwrap();

    let moved = firebase
        .execute_transaction(Some("p1"), |tx, _| async move {
            let a = tx.get("accounts", "a").await?;
            let b = tx.get("accounts", "b").await?;
            let balance_a = a.get("balance").and_then(|v| v.as_i32()).unwrap_or_default();
            let balance_b = b.get("balance").and_then(|v| v.as_i32()).unwrap_or_default();

            let debit = doc! { "balance": balance_a - 30 };
            tx.update("accounts", "a", &debit, UpdateOptions::default()).await?;
            tx.set("accounts", "b", &doc! { "balance": balance_b + 30 }, SetOptions::merge())
                .await?;

            Ok(30)
        })
        .await
        .unwrap();

    assert_eq!(moved, 30);
    let a = firebase.get_data("accounts", "a", Some("p1")).await.unwrap();
    let b = firebase.get_data("accounts", "b", Some("p1")).await.unwrap();
    assert_eq!(a.get("balance").and_then(|v| v.as_i32()), Some(70));
    assert_eq!(b.get("balance").and_then(|v| v.as_i32()), Some(30));
}

#[tokio::test]
async fn transaction_retries_under_contention() {
    let (_, firebase) = setup(&["p1"]).await;
    firebase
        .set_data("counters", "c", &doc! { "n": 0 }, SetOptions::default(), Some("p1"))
        .await
        .unwrap();

    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();

    let value = firebase
        .execute_transaction(Some("p1"), move |tx, firebase| {
            let attempt = seen.fetch_add(1, Ordering::SeqCst) + 1;

            async move {
                let current = tx.get("counters", "c").await?;
                let n = current.get("n").and_then(|v| v.as_i32()).unwrap_or_default();

                if attempt == 1 {
                    // a concurrent writer bumps the counter after our read
                    let bumped = doc! { "n": n + 10 };
                    firebase
                        .set_data("counters", "c", &bumped, SetOptions::default(), Some("p1"))
                        .await?;
                }

                tx.set("counters", "c", &doc! { "n": n + 1 }, SetOptions::default())
                    .await?;
                Ok(n + 1)
            }
        })
        .await
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(value, 11);

    let stored = firebase.get_data("counters", "c", Some("p1")).await.unwrap();
    assert_eq!(stored.get("n").and_then(|v| v.as_i32()), Some(11));
}

#[tokio::test]
async fn transaction_aborts_after_exhausting_attempts() {
    let (_, firebase) = setup(&["p1"]).await;
    firebase
        .set_data("counters", "c", &doc! { "n": 0 }, SetOptions::default(), Some("p1"))
        .await
        .unwrap();

    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();

    let result = firebase
        .execute_transaction(Some("p1"), move |tx, firebase| {
            seen.fetch_add(1, Ordering::SeqCst);

            async move {
                tx.get("counters", "c").await?;
                let touched = doc! { "touched": true };
                firebase
                    .update_data("counters", "c", &touched, UpdateOptions::default(), Some("p1"))
                    .await?;
                tx.update("counters", "c", &doc! { "n": 1 }, UpdateOptions::default())
                    .await?;
                Ok(())
            }
        })
        .await;

    assert!(matches!(result, Err(FirebaseError::Aborted(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), MAX_TRANSACTION_ATTEMPTS);

    let stored = firebase.get_data("counters", "c", Some("p1")).await.unwrap();
    assert_eq!(stored.get("n").and_then(|v| v.as_i32()), Some(0));
}

#[tokio::test]
async fn callback_errors_are_not_retried() {
    let (_, firebase) = setup(&["p1"]).await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();

    let result: FirebaseResult<()> = firebase
        .execute_transaction(Some("p1"), move |tx, _| {
            seen.fetch_add(1, Ordering::SeqCst);

            async move {
                tx.set("users", "u1", &doc! { "name": "Ann" }, SetOptions::default())
                    .await?;
                Err(FirebaseError::InvalidArgument("insufficient funds".into()))
            }
        })
        .await;

    assert_eq!(result, Err(FirebaseError::InvalidArgument("insufficient funds".into())));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(!firebase.is_exist("users", "u1", Some("p1")).await.unwrap());
}

#[tokio::test]
async fn reads_after_writes_are_rejected() {
    let (_, firebase) = setup(&["p1"]).await;

    let result: FirebaseResult<()> = firebase
        .execute_transaction(Some("p1"), |tx, _| async move {
            tx.delete("users", "u1").await?;
            tx.get("users", "u1").await?;
            Ok(())
        })
        .await;

    assert!(matches!(result, Err(FirebaseError::InvalidArgument(_))));
}

#[tokio::test]
async fn transactions_need_the_network() {
    let (backend, firebase) = setup(&["p1"]).await;
    backend.firestore_of("p1").await.unwrap().disable_network();

    let result: FirebaseResult<()> = firebase
        .execute_transaction(Some("p1"), |_, _| async move { Ok(()) })
        .await;

    assert!(matches!(result, Err(FirebaseError::Unavailable(_))));
}
