//! Notification center properties: the unread invariant under arbitrary
//! mutation sequences, dedup behavior for point vs digest keys, and the
//! 50-entry cap.

#![allow(clippy::unwrap_used, clippy::panic)] // Test code can unwrap and panic

use chrono::{TimeZone, Utc};
use invoicing_core::invoice::{InvoiceId, UserId};
use invoicing_core::notification::{
    Notification, NotificationKey, NotificationKind, OwnerScope, unread_count,
};
use invoicing_engine::NotificationCenter;
use invoicing_engine::mocks::MemoryNotificationStore;
use proptest::prelude::*;

fn center(max: usize) -> NotificationCenter<MemoryNotificationStore> {
    NotificationCenter::new(UserId::new("user-1"), MemoryNotificationStore::new(), max)
}

fn point_at(millis: i64) -> Notification {
    let at = Utc.timestamp_millis_opt(millis).single().unwrap();
    Notification::new(
        NotificationKind::EmailSendFailed,
        NotificationKey::point(NotificationKind::EmailSendFailed, InvoiceId::new(), at),
        at,
    )
}

#[tokio::test]
async fn point_events_always_insert() {
    let center = center(50);
    // Three rapid failures, distinct timestamps: three notifications.
    // Point-event keys embed the timestamp, so they never collapse.
    for millis in [1_000, 1_001, 1_002] {
        assert!(center.record(point_at(millis)).await.unwrap().is_some());
    }
    assert_eq!(center.notifications().await.len(), 3);
}

#[tokio::test]
async fn digest_keys_collapse_but_count_changes_do_not() {
    let center = center(50);
    let date = Utc
        .with_ymd_and_hms(2025, 3, 14, 9, 0, 0)
        .single()
        .unwrap();

    let key_of = |count: usize| {
        NotificationKey::digest(
            NotificationKind::OverdueInvoices,
            date.date_naive(),
            count,
            OwnerScope::Own,
        )
    };
    let digest = |count: usize| {
        Notification::new(NotificationKind::OverdueInvoices, key_of(count), date)
    };

    assert!(center.record(digest(3)).await.unwrap().is_some());
    assert!(center.record(digest(3)).await.unwrap().is_none(), "same outcome collapses");
    assert!(center.record(digest(4)).await.unwrap().is_some(), "changed count inserts");
    assert_eq!(center.notifications().await.len(), 2);
}

#[derive(Debug, Clone)]
enum Op {
    Insert(i64),
    MarkRead(usize),
    MarkAllRead,
    Delete(usize),
    ClearAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0i64..10_000).prop_map(Op::Insert),
        2 => (0usize..60).prop_map(Op::MarkRead),
        1 => Just(Op::MarkAllRead),
        2 => (0usize..60).prop_map(Op::Delete),
        1 => Just(Op::ClearAll),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After any sequence of insert/mark-read/delete operations the
    /// reported unread count equals a fresh count over the list.
    #[test]
    fn unread_count_always_matches_the_list(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async move {
            let center = center(50);
            let mut next_millis = 0i64;

            for op in ops {
                match op {
                    Op::Insert(offset) => {
                        // Distinct timestamps keep point keys unique
                        next_millis += 1 + offset;
                        let _ = center.record(point_at(next_millis)).await.unwrap();
                    },
                    Op::MarkRead(index) => {
                        let list = center.notifications().await;
                        if let Some(n) = list.get(index % list.len().max(1)) {
                            center.mark_read(n.id).await.unwrap();
                        }
                    },
                    Op::MarkAllRead => center.mark_all_read().await.unwrap(),
                    Op::Delete(index) => {
                        let list = center.notifications().await;
                        if let Some(n) = list.get(index % list.len().max(1)) {
                            center.delete(n.id).await.unwrap();
                        }
                    },
                    Op::ClearAll => center.clear_all().await.unwrap(),
                }

                let list = center.notifications().await;
                let reported = center.unread_count().await;
                prop_assert_eq!(reported, unread_count(&list));
                prop_assert_eq!(reported, list.iter().filter(|n| !n.read).count());
                prop_assert!(list.len() <= 50);
            }
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn cap_drops_the_oldest_entries() {
    let center = center(50);
    for millis in 0..60 {
        center.record(point_at(millis)).await.unwrap();
    }

    let list = center.notifications().await;
    assert_eq!(list.len(), 50);
    // Newest first; the first ten inserts fell off
    assert_eq!(list[0].timestamp.timestamp_millis(), 59);
    assert_eq!(list[49].timestamp.timestamp_millis(), 10);
}

#[tokio::test]
async fn clear_all_tombstones_every_key() {
    let center = center(50);
    let a = point_at(1);
    let b = point_at(2);
    center.record(a.clone()).await.unwrap();
    center.record(b.clone()).await.unwrap();

    center.clear_all().await.unwrap();
    assert!(center.notifications().await.is_empty());

    // Neither key may regenerate
    assert!(center.record(a).await.unwrap().is_none());
    assert!(center.record(b).await.unwrap().is_none());
}
