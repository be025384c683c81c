use chrono::Duration;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{InventoryItem, Reservation, ReservationStatus, Sku};
use store::{InMemoryStore, InventoryStore, Store};

fn make_hold(key: &str) -> Reservation {
    Reservation::new_hold(
        Sku::new("SKU-001"),
        "user-1",
        1,
        key,
        Duration::minutes(5),
    )
}

fn bench_debit_commit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("store/debit_commit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryStore::new();
                store
                    .insert_item(InventoryItem::new("SKU-001", "Widget", 100, None).unwrap())
                    .await
                    .unwrap();

                let mut tx = store.begin().await.unwrap();
                tx.try_debit(&Sku::new("SKU-001"), 1).await.unwrap();
                tx.commit().await.unwrap();
            });
        });
    });
}

fn bench_reserve_transaction(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("store/reserve_transaction", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryStore::new();
                store
                    .insert_item(InventoryItem::new("SKU-001", "Widget", 100, None).unwrap())
                    .await
                    .unwrap();

                let mut tx = store.begin().await.unwrap();
                tx.try_debit(&Sku::new("SKU-001"), 1).await.unwrap();
                tx.insert_reservation(make_hold("key-1")).await.unwrap();
                tx.commit().await.unwrap();
            });
        });
    });
}

fn bench_transition(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();

    let id = rt.block_on(async {
        store
            .insert_item(InventoryItem::new("SKU-001", "Widget", 100, None).unwrap())
            .await
            .unwrap();
        let mut tx = store.begin().await.unwrap();
        let created = tx.insert_reservation(make_hold("key-1")).await.unwrap();
        tx.commit().await.unwrap();
        created.reservation_id
    });

    c.bench_function("store/transition_cas", |b| {
        b.iter(|| {
            rt.block_on(async {
                // Rolled back so every iteration sees the hold in Reserved.
                let mut tx = store.begin().await.unwrap();
                let settled = tx
                    .transition(&id, ReservationStatus::Reserved, ReservationStatus::Expired)
                    .await
                    .unwrap();
                assert!(settled.is_some());
                tx.rollback().await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_debit_commit,
    bench_reserve_transaction,
    bench_transition
);
criterion_main!(benches);
