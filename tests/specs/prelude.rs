//! Shared helpers for coordinator specs

use lk_adapters::FakeStore;
use lk_core::CoordinatorConfig;
use lk_engine::LockCoordinator;
use std::sync::Arc;
use std::time::Duration;

pub const CHANNEL: &str = "rel:";

pub type Coordinator = Arc<LockCoordinator<FakeStore>>;

pub fn config() -> CoordinatorConfig {
    CoordinatorConfig::new("lock:", CHANNEL).with_wait_timeout(Duration::from_secs(2))
}

/// Start a coordinator on a clone of `store`
pub async fn coordinator(store: &FakeStore, config: CoordinatorConfig) -> Coordinator {
    Arc::new(
        LockCoordinator::start(store.clone(), config)
            .await
            .expect("coordinator should start"),
    )
}

/// Start `n` coordinators sharing one store
pub async fn cluster(store: &FakeStore, n: usize, config: CoordinatorConfig) -> Vec<Coordinator> {
    let mut nodes = Vec::with_capacity(n);
    for _ in 0..n {
        nodes.push(coordinator(store, config.clone()).await);
    }
    nodes
}

/// Assert a coordinator has no registry entries and balanced waiter counts
pub fn assert_no_waiters(coord: &Coordinator) {
    assert!(
        coord.waiting_keys().is_empty(),
        "leaked waiter entries: {:?}",
        coord.waiting_keys()
    );
    let snap = coord.metrics();
    assert_eq!(
        snap.waiters_created, snap.waiters_destroyed,
        "unbalanced waiter metrics: {snap}"
    );
}
