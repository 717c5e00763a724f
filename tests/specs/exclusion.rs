//! At most one holder per key, and nothing left behind afterwards

use crate::prelude::*;
use lk_adapters::FakeStore;
use lk_core::{SequentialTokenGen, TokenGen};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct CriticalSection {
    inside: AtomicU64,
    entered: AtomicU64,
    overlaps: AtomicU64,
}

impl CriticalSection {
    async fn visit(&self, dwell: Duration) {
        if self.inside.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.entered.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(dwell).await;
        self.inside.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn run_cycles(
    nodes: &[Coordinator],
    tasks_per_node: usize,
    rounds: usize,
    section: Arc<CriticalSection>,
) {
    let tokens = SequentialTokenGen::new("owner");
    let mut handles = Vec::new();
    for node in nodes {
        for _ in 0..tasks_per_node {
            let node = Arc::clone(node);
            let tokens = tokens.clone();
            let section = Arc::clone(&section);
            handles.push(tokio::spawn(async move {
                for _ in 0..rounds {
                    let token = tokens.next();
                    node.lock("shared", &token).await.unwrap();
                    section.visit(Duration::from_millis(10)).await;
                    node.unlock("shared", &token).await.unwrap();
                }
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn one_holder_at_a_time_across_coordinators() {
    let store = FakeStore::new();
    let nodes = cluster(&store, 3, config().with_retry(100)).await;
    let section = Arc::new(CriticalSection::default());

    run_cycles(&nodes, 4, 5, Arc::clone(&section)).await;

    assert_eq!(section.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(section.entered.load(Ordering::SeqCst), 3 * 4 * 5);
    let locked: u64 = nodes.iter().map(|n| n.metrics().locked).sum();
    let unlocked: u64 = nodes.iter().map(|n| n.metrics().unlocked).sum();
    assert_eq!(locked, 60);
    assert_eq!(unlocked, 60);
}

#[tokio::test(start_paused = true)]
async fn concurrent_cycles_leave_no_waiters() {
    let store = FakeStore::new();
    let nodes = cluster(&store, 2, config().with_retry(100)).await;

    run_cycles(&nodes, 10, 3, Arc::new(CriticalSection::default())).await;

    for node in &nodes {
        assert_no_waiters(node);
    }
    assert_eq!(store.value("lock:shared"), None);
}

#[tokio::test]
async fn distinct_keys_do_not_block_each_other() {
    let store = FakeStore::new();
    let nodes = cluster(&store, 2, config()).await;

    nodes[0].lock("alpha", "a").await.unwrap();
    nodes[1].lock("beta", "b").await.unwrap();

    assert_eq!(store.value("lock:alpha").as_deref(), Some("a"));
    assert_eq!(store.value("lock:beta").as_deref(), Some("b"));
    for node in &nodes {
        assert_eq!(node.metrics().waiters_created, 0);
    }
}
