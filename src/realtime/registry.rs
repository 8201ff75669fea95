use dashmap::{DashMap, Entry};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::{
    error::AppResult,
    models::comments::ResourceKey,
    realtime::thread::{ThreadController, ThreadSettings},
    repositories::CommentStore,
    telemetry::BusinessEvent,
};

pub type Threads = Arc<DashMap<ResourceKey, Arc<ThreadController>>>;

pub fn new_threads() -> Threads {
    Arc::new(DashMap::new())
}

/// Returns the live thread for a resource, loading its approved snapshot on
/// first use.
pub async fn get_or_load_thread(
    threads: &Threads,
    store: &Arc<dyn CommentStore>,
    settings: ThreadSettings,
    resource: &ResourceKey,
) -> AppResult<Arc<ThreadController>> {
    if let Some(thread) = threads.get(resource) {
        return Ok(thread.clone());
    }

    let snapshot = store.list_comments(resource, false).await?;
    tracing::debug!(%resource, approved = snapshot.len(), "Loaded comment snapshot");
    let thread = Arc::new(ThreadController::new(
        resource.clone(),
        snapshot,
        store.clone(),
        settings,
    ));

    // Another request may have loaded the same resource meanwhile.
    match threads.entry(resource.clone()) {
        Entry::Occupied(entry) => Ok(entry.get().clone()),
        Entry::Vacant(entry) => {
            entry.insert(thread.clone());
            Ok(thread)
        }
    }
}

/// Schedules a delayed reconcile on the resource's thread if one is live.
pub fn notify_changed(threads: &Threads, resource: &ResourceKey) -> bool {
    match threads.get(resource) {
        Some(thread) => {
            thread.schedule_reconcile();
            true
        }
        None => false,
    }
}

/// Refreshes every live thread from the store. Failures leave the thread on
/// its last known set.
pub async fn refresh_all(threads: &Threads) -> usize {
    let live: Vec<Arc<ThreadController>> =
        threads.iter().map(|entry| entry.value().clone()).collect();
    let mut refreshed = 0;
    for thread in live {
        match thread.reconcile().await {
            Ok(_) => refreshed += 1,
            Err(error) => {
                tracing::error!(
                    "Failed to refresh comment snapshot for {}: {}",
                    thread.resource(),
                    error
                );
            }
        }
    }
    refreshed
}

/// Tears down threads nobody has touched for `max_idle`.
pub fn evict_idle(threads: &Threads, max_idle: Duration) -> Vec<ResourceKey> {
    let idle: Vec<ResourceKey> = threads
        .iter()
        .filter(|entry| entry.value().idle_for() >= max_idle)
        .map(|entry| entry.key().clone())
        .collect();

    for resource in &idle {
        if let Some((_, thread)) = threads.remove(resource) {
            thread.shutdown();
            BusinessEvent::ThreadEvicted {
                resource: resource.to_string(),
            }
            .log();
        }
    }
    idle
}

pub fn spawn_maintenance(
    threads: Threads,
    refresh_interval: Duration,
    max_idle: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut refresh_tick = tokio::time::interval(refresh_interval);
        let mut cleanup_tick = tokio::time::interval(max_idle);

        loop {
            tokio::select! {
                _ = refresh_tick.tick() => {
                    let refreshed = refresh_all(&threads).await;
                    if refreshed > 0 {
                        tracing::debug!("Refreshed {} comment threads", refreshed);
                    }
                }
                _ = cleanup_tick.tick() => {
                    let evicted = evict_idle(&threads, max_idle);
                    if !evicted.is_empty() {
                        tracing::info!("Evicted {} idle comment threads", evicted.len());
                    }
                }
            }
        }
    })
}
