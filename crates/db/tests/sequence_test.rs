//! Sequence allocator integration tests.
//!
//! Concurrent callers on one (business, key, period) must receive a gapless
//! run of distinct numbers.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]

mod common;

use futures::future::join_all;
use sea_orm::TransactionTrait;

use receipta_core::sequence::SequenceKey;
use receipta_db::SequenceRepository;

use common::{connect, seed_business};

const CONCURRENT_CALLERS: usize = 25;

#[tokio::test]
async fn test_concurrent_allocation_is_gapless() {
    let Some(db) = connect().await else { return };
    let business = seed_business(&db, "#112233", false).await;
    let repo = SequenceRepository::new(db);

    let calls = (0..CONCURRENT_CALLERS).map(|_| repo.next(business.id, SequenceKey::Invoice, 2026));
    let results = join_all(calls).await;

    let mut numbers: Vec<i32> = results
        .into_iter()
        .map(|r| r.expect("allocation should succeed"))
        .collect();
    numbers.sort_unstable();

    let expected: Vec<i32> = (1..=CONCURRENT_CALLERS as i32).collect();
    assert_eq!(numbers, expected);
    assert_eq!(
        repo.current(business.id, SequenceKey::Invoice, 2026)
            .await
            .expect("current"),
        Some(CONCURRENT_CALLERS as i32)
    );
}

#[tokio::test]
async fn test_counters_are_independent() {
    let Some(db) = connect().await else { return };
    let business = seed_business(&db, "#112233", false).await;
    let other = seed_business(&db, "#112233", false).await;
    let repo = SequenceRepository::new(db);

    assert_eq!(repo.next(business.id, SequenceKey::Invoice, 2026).await.ok(), Some(1));
    assert_eq!(repo.next(business.id, SequenceKey::Invoice, 2026).await.ok(), Some(2));
    assert_eq!(repo.next(business.id, SequenceKey::Receipt, 2026).await.ok(), Some(1));
    assert_eq!(repo.next(business.id, SequenceKey::Invoice, 2027).await.ok(), Some(1));
    assert_eq!(repo.next(other.id, SequenceKey::Invoice, 2026).await.ok(), Some(1));
    assert_eq!(
        repo.current(business.id, SequenceKey::Receipt, 2025)
            .await
            .expect("current"),
        None
    );
}

#[tokio::test]
async fn test_rollback_returns_the_number() {
    let Some(db) = connect().await else { return };
    let business = seed_business(&db, "#112233", false).await;
    let repo = SequenceRepository::new(db.clone());

    assert_eq!(repo.next(business.id, SequenceKey::Invoice, 2026).await.ok(), Some(1));

    let txn = db.begin().await.expect("begin");
    let drawn = SequenceRepository::next_in(&txn, business.id, SequenceKey::Invoice, 2026)
        .await
        .expect("draw inside transaction");
    assert_eq!(drawn, 2);
    txn.rollback().await.expect("rollback");

    assert_eq!(repo.next(business.id, SequenceKey::Invoice, 2026).await.ok(), Some(2));
}
