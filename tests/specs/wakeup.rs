//! Release notifications wake blocked callers; silence means timeout

use crate::prelude::*;
use lk_adapters::{FakeStore, StoreOp};
use lk_engine::{LockError, SubscriberState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn unlock_on_one_coordinator_wakes_waiter_on_another() {
    let store = FakeStore::new();
    let a = coordinator(&store, config()).await;
    let b = coordinator(&store, config()).await;

    a.lock("user-1", "a").await.unwrap();

    let began = Instant::now();
    let waiter = Arc::clone(&b);
    let blocked = tokio::spawn(async move {
        waiter.lock("user-1", "b").await?;
        Ok::<_, LockError>(began.elapsed())
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(b.waiting_keys(), vec!["lock:user-1"]);
    a.unlock("user-1", "a").await.unwrap();

    let elapsed = blocked.await.unwrap().unwrap();
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_millis(550), "woke after {elapsed:?}");
    assert_eq!(store.value("lock:user-1").as_deref(), Some("b"));
    assert_no_waiters(&b);
}

#[tokio::test(start_paused = true)]
async fn expiring_holder_without_unlock_times_out_waiter() {
    let store = FakeStore::new();
    let a = coordinator(&store, config()).await;
    let b = coordinator(&store, config().with_wait_timeout(Duration::from_secs(3))).await;

    a.lock_with_expiry("user-2", "a", Duration::from_secs(1))
        .await
        .unwrap();

    let began = Instant::now();
    let err = b
        .lock_with_expiry("user-2", "b", Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, LockError::Timeout(_)), "got {err:?}");
    assert!(began.elapsed() >= Duration::from_secs(3));
    assert!(began.elapsed() < Duration::from_millis(3100));
    assert_no_waiters(&b);
}

#[tokio::test(start_paused = true)]
async fn one_release_wakes_a_waiter_on_every_coordinator() {
    let store = FakeStore::new();
    let holder = coordinator(&store, config()).await;
    let nodes = cluster(&store, 3, config()).await;

    holder.lock("hot", "holder").await.unwrap();

    let mut blocked = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        let node = Arc::clone(node);
        blocked.push(tokio::spawn(async move {
            node.lock("hot", &format!("node-{i}")).await
        }));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    holder.unlock("hot", "holder").await.unwrap();

    // One wins the write; the rest were woken and lost the race
    let mut won = 0;
    let mut contended = 0;
    for handle in blocked {
        match handle.await.unwrap() {
            Ok(()) => won += 1,
            Err(LockError::Contended { .. }) => contended += 1,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(contended, 2);
    for node in &nodes {
        assert_no_waiters(node);
    }
}

#[tokio::test(start_paused = true)]
async fn dropped_subscription_falls_back_to_timeout() {
    let store = FakeStore::new();
    let a = coordinator(&store, config()).await;
    let b = coordinator(&store, config().with_wait_timeout(Duration::from_secs(1))).await;

    store.disconnect_subscribers();
    tokio::task::yield_now().await;

    a.lock("user-3", "a").await.unwrap();
    let waiter = Arc::clone(&b);
    let blocked = tokio::spawn(async move { waiter.lock("user-3", "b").await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    a.unlock("user-3", "a").await.unwrap();

    let err = blocked.await.unwrap().unwrap_err();
    assert!(matches!(err, LockError::Timeout(_)), "got {err:?}");
    assert!(matches!(b.subscriber_state(), SubscriberState::Failed(_)));
    assert!(matches!(
        b.close().await,
        Err(LockError::SubscribeFailure(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn refused_subscription_still_acquires_free_locks() {
    let store = FakeStore::new();
    store.fail(StoreOp::Subscribe);
    let b = coordinator(&store, config()).await;

    assert!(matches!(b.subscriber_state(), SubscriberState::Failed(_)));
    b.lock("user-4", "b").await.unwrap();
    b.unlock("user-4", "b").await.unwrap();
}
