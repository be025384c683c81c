//! End-to-end service tests for the hold lifecycle, including the
//! concurrency properties the design guarantees.

use std::sync::Arc;

use chrono::Duration;
use domain::{InventoryItem, ReservationStatus, Sku};
use futures_util::future::join_all;
use service::{CheckoutService, HoldRequest, ReservationService, ServiceError};
use store::{InMemoryStore, InventoryStore, ReservationStore};

async fn store_with_stock(total: u32) -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .insert_item(InventoryItem::new("SKU-001", "Widget", total, None).unwrap())
        .await
        .unwrap();
    store
}

fn request(key: &str, quantity: u32) -> HoldRequest {
    HoldRequest {
        sku: "SKU-001".to_string(),
        user_id: "user-1".to_string(),
        quantity,
        idempotency_key: key.to_string(),
    }
}

async fn available(store: &InMemoryStore) -> u32 {
    store
        .find_item(&Sku::new("SKU-001"))
        .await
        .unwrap()
        .unwrap()
        .available_quantity
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_reserves_never_oversell() {
    let store = store_with_stock(5).await;
    let service = Arc::new(ReservationService::new(store.clone()));

    let attempts: Vec<_> = (0..20)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.reserve(request(&format!("key-{i}"), 1)).await })
        })
        .collect();

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(ServiceError::OutOfStock { .. })))
        .count();

    assert_eq!(succeeded, 5);
    assert_eq!(rejected, 15);
    assert_eq!(available(&store).await, 0);
    assert_eq!(store.reservation_count().await, 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_retries_with_one_key_debit_once() {
    let store = store_with_stock(5).await;
    let service = Arc::new(ReservationService::new(store.clone()));

    let attempts: Vec<_> = (0..10)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.reserve(request("one-key", 2)).await })
        })
        .collect();

    let holds: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let first_id = holds[0].reservation_id;
    assert!(holds.iter().all(|h| h.reservation_id == first_id));

    assert_eq!(available(&store).await, 3);
    assert_eq!(store.reservation_count().await, 1);
}

#[tokio::test]
async fn held_stock_blocks_later_holds_until_released() {
    // Stock 5: a hold of 3 leaves 2, so a second hold of 3 must fail
    // without touching stock.
    let store = store_with_stock(5).await;
    let reservations = ReservationService::new(store.clone());
    let checkout = CheckoutService::new(store.clone());

    let first = reservations.reserve(request("key-1", 3)).await.unwrap();
    assert_eq!(available(&store).await, 2);

    let err = reservations.reserve(request("key-2", 3)).await.unwrap_err();
    assert!(matches!(err, ServiceError::OutOfStock { .. }));
    assert_eq!(available(&store).await, 2);

    // Confirming consumes the stock permanently: no change to available.
    let confirmed = checkout.confirm(&first.reservation_id).await.unwrap();
    assert_eq!(confirmed.status, ReservationStatus::Confirmed);
    assert_eq!(available(&store).await, 2);
}

#[tokio::test]
async fn reserve_then_cancel_is_a_round_trip() {
    let store = store_with_stock(5).await;
    let reservations = ReservationService::new(store.clone());
    let checkout = CheckoutService::new(store.clone());

    let hold = reservations.reserve(request("key-1", 3)).await.unwrap();
    assert_eq!(available(&store).await, 2);

    let cancelled = checkout.cancel(&hold.reservation_id).await.unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(available(&store).await, 5);
}

#[tokio::test]
async fn lapsed_hold_fails_gone_and_releases_stock() {
    let store = store_with_stock(5).await;
    let reservations = ReservationService::with_ttl(store.clone(), Duration::milliseconds(20));
    let checkout = CheckoutService::new(store.clone());

    let hold = reservations.reserve(request("key-1", 3)).await.unwrap();
    assert_eq!(available(&store).await, 2);

    tokio::time::sleep(std::time::Duration::from_millis(40)).await;

    let err = checkout.confirm(&hold.reservation_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Expired(_)));

    assert_eq!(available(&store).await, 5);
    let settled = store
        .find_reservation(&hold.reservation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status, ReservationStatus::Expired);
}

#[tokio::test(flavor = "multi_thread")]
async fn active_hold_quantities_never_exceed_initial_stock() {
    // Mixed workload: reserves, cancels, and confirms interleaved. At the
    // end, holds still debiting stock (Reserved or Confirmed) must fit in
    // the initial stock.
    let store = store_with_stock(8).await;
    let reservations = Arc::new(ReservationService::new(store.clone()));
    let checkout = Arc::new(CheckoutService::new(store.clone()));

    let tasks: Vec<_> = (0..24)
        .map(|i| {
            let reservations = Arc::clone(&reservations);
            let checkout = Arc::clone(&checkout);
            tokio::spawn(async move {
                let hold = match reservations.reserve(request(&format!("key-{i}"), 2)).await {
                    Ok(hold) => hold,
                    Err(_) => return,
                };
                match i % 3 {
                    0 => {
                        let _ = checkout.cancel(&hold.reservation_id).await;
                    }
                    1 => {
                        let _ = checkout.confirm(&hold.reservation_id).await;
                    }
                    _ => {} // left Reserved
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let mut held = 0u32;
    for i in 0..24 {
        if let Some(r) = store
            .find_by_idempotency_key(&format!("key-{i}"))
            .await
            .unwrap()
            && matches!(
                r.status,
                ReservationStatus::Reserved | ReservationStatus::Confirmed
            )
        {
            held += r.quantity;
        }
    }

    assert!(held <= 8, "held {held} units out of 8 in stock");
    assert_eq!(available(&store).await, 8 - held);
}
