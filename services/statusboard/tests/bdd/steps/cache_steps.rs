//! BDD step definitions for the status cache feature

use std::sync::Arc;
use std::time::Duration;

use cucumber::{given, then, when};

use statusboard::cache::{FileSlotStore, StatusCache};
use statusboard::monitor::{MonitorRecord, MonitorStatus};

use crate::world::StatusBoardWorld;

pub fn sample_monitors(count: u64) -> Vec<MonitorRecord> {
    (1..=count)
        .map(|id| MonitorRecord {
            id,
            display_name: format!("service-{}", id),
            url: format!("https://service-{}.example", id),
            status: MonitorStatus::Up,
            kind: "HTTP".to_string(),
            poll_interval_seconds: 300,
            current_state_duration_seconds: 60,
            created_at: "2024-01-01".to_string(),
        })
        .collect()
}

fn open_cache(world: &mut StatusBoardWorld, ttl: Duration) -> Arc<StatusCache> {
    let dir = world.cache_path();
    Arc::new(StatusCache::new(
        Arc::new(FileSlotStore::new(dir)),
        world.clock(),
        ttl,
    ))
}

fn cache(world: &StatusBoardWorld) -> &StatusCache {
    world.cache.as_ref().expect("no cache in world")
}

#[given(expr = "a status cache with a {int} minute freshness window")]
fn status_cache(world: &mut StatusBoardWorld, minutes: u64) {
    let cache = open_cache(world, Duration::from_secs(minutes * 60));
    world.cache = Some(cache);
}

#[when(expr = "a snapshot of {int} monitors is stored")]
async fn snapshot_stored(world: &mut StatusBoardWorld, count: u64) {
    assert!(cache(world).set(sample_monitors(count)).await);
}

#[when(expr = "{int} seconds pass")]
fn seconds_pass(world: &mut StatusBoardWorld, seconds: u64) {
    world.clock().advance_ms(seconds * 1000);
}

#[when("the cache is reopened")]
fn cache_reopened(world: &mut StatusBoardWorld) {
    let cache = open_cache(world, statusboard::cache::DEFAULT_CACHE_DURATION);
    world.cache = Some(cache);
}

#[when("expired entries are cleared")]
async fn expired_cleared(world: &mut StatusBoardWorld) {
    assert!(cache(world).clear_expired().await);
}

#[then(expr = "the cache returns {int} monitors")]
async fn cache_returns(world: &mut StatusBoardWorld, count: usize) {
    let entry = cache(world).get().await.expect("expected a cache hit");
    assert_eq!(entry.payload.len(), count);
}

#[then("the cache returns nothing")]
async fn cache_returns_nothing(world: &mut StatusBoardWorld) {
    assert!(cache(world).get().await.is_none());
}

#[then(expr = "the raw cache returns {int} monitors")]
async fn raw_cache_returns(world: &mut StatusBoardWorld, count: usize) {
    let entry = cache(world)
        .get_raw()
        .await
        .expect("expected a stored entry");
    assert_eq!(entry.payload.len(), count);
}

#[then("the raw cache returns nothing")]
async fn raw_cache_returns_nothing(world: &mut StatusBoardWorld) {
    assert!(cache(world).get_raw().await.is_none());
}
