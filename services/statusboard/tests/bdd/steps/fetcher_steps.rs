//! BDD step definitions for the status fetcher feature

use std::sync::Arc;

use cucumber::{given, then, when};

use statusboard::cache::{FileSlotStore, StatusCache, DEFAULT_CACHE_DURATION};
use statusboard::config::UpstreamConfig;
use statusboard::fetcher::{StatusFetcher, StatusSource};
use statusboard::throttle::{RequestThrottle, ThrottleLimits};

use crate::world::{Canned, StatusBoardWorld};

/// Uptime API body listing the given monitors
pub fn monitors_body(monitors: &[(u64, String)]) -> String {
    let data: Vec<serde_json::Value> = monitors
        .iter()
        .map(|(id, status)| {
            serde_json::json!({
                "id": id,
                "friendlyName": format!("service-{}", id),
                "url": format!("https://service-{}.example", id),
                "status": status,
                "type": "HTTP",
                "interval": 300,
                "currentStateDuration": 120,
                "createDateTime": "2024-01-01T00:00:00Z",
            })
        })
        .collect();
    serde_json::json!({ "data": data }).to_string()
}

pub fn split_ids(ids: &str) -> Vec<String> {
    ids.split(',')
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

pub fn parse_source(source: &str) -> StatusSource {
    serde_json::from_value(serde_json::Value::String(source.to_string()))
        .unwrap_or_else(|_| panic!("unknown status source '{}'", source))
}

async fn fetch(world: &mut StatusBoardWorld, ids: &str, api_key: &str) {
    let fetcher = world.fetcher.as_ref().expect("no fetcher in world");
    let status = fetcher.fetch_system_status(&split_ids(ids), api_key).await;
    world.fetch_result = Some(status);
}

#[given(expr = "the uptime API reports monitor {int} as {word}")]
fn api_reports_monitor(world: &mut StatusBoardWorld, id: u64, status: String) {
    world.upstream_monitors.push((id, status));
    let body = monitors_body(&world.upstream_monitors);
    world.http().set_monitors(Canned::Respond(200, body));
}

#[given(expr = "the uptime API answers with status {int}")]
fn api_answers_with_status(world: &mut StatusBoardWorld, status: u16) {
    world
        .http()
        .set_monitors(Canned::Respond(status, "Too Many Requests".to_string()));
}

#[given("a status fetcher")]
fn status_fetcher(world: &mut StatusBoardWorld) {
    let clock = world.clock();
    let dir = world.cache_path();
    let cache = Arc::new(StatusCache::new(
        Arc::new(FileSlotStore::new(dir)),
        clock.clone(),
        DEFAULT_CACHE_DURATION,
    ));
    let throttle = Arc::new(RequestThrottle::new(ThrottleLimits::default(), clock));
    world.fetcher = Some(StatusFetcher::new(
        &UpstreamConfig::default(),
        world.http(),
        Arc::clone(&cache),
        throttle,
    ));
    world.cache = Some(cache);
}

#[when("the uptime API starts failing")]
fn api_starts_failing(world: &mut StatusBoardWorld) {
    world
        .http()
        .set_monitors(Canned::Fail("connection reset".to_string()));
}

#[when(expr = "monitors {string} are fetched")]
async fn monitors_fetched(world: &mut StatusBoardWorld, ids: String) {
    fetch(world, &ids, "ur-secret").await;
}

#[when(expr = "monitors {string} are fetched without an API key")]
async fn monitors_fetched_without_key(world: &mut StatusBoardWorld, ids: String) {
    fetch(world, &ids, "").await;
}

#[when("the cache slot is emptied")]
async fn cache_slot_emptied(world: &mut StatusBoardWorld) {
    let cache = world.cache.as_ref().expect("no cache in world");
    assert!(cache.set(Vec::new()).await);
}

#[then(expr = "the status comes from {word}")]
fn status_comes_from(world: &mut StatusBoardWorld, source: String) {
    let status = world.fetch_result.as_ref().expect("nothing fetched");
    assert_eq!(status.source, parse_source(&source));
}

#[then(expr = "the status lists monitors {string}")]
fn status_lists_monitors(world: &mut StatusBoardWorld, ids: String) {
    let status = world.fetch_result.as_ref().expect("nothing fetched");
    let listed: Vec<String> = status.monitors.iter().map(|m| m.id.to_string()).collect();
    assert_eq!(listed, split_ids(&ids));
}

#[then("the status lists no monitors")]
fn status_lists_no_monitors(world: &mut StatusBoardWorld) {
    let status = world.fetch_result.as_ref().expect("nothing fetched");
    assert!(status.monitors.is_empty());
}

#[then(expr = "the uptime API was called {int} times")]
fn api_called(world: &mut StatusBoardWorld, times: usize) {
    assert_eq!(world.http().monitor_calls(), times);
}
