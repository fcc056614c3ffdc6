//! BDD step definitions for the status board lifecycle feature

use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use statusboard::StatusBoardBuilder;

use crate::steps::fetcher_steps::split_ids;
use crate::steps::refresh_steps::{board_builder, board_config};
use crate::world::StatusBoardWorld;

fn write_targets_file(world: &mut StatusBoardWorld, contents: &str) {
    let path = world.cache_path().join("targets.json");
    std::fs::write(&path, contents).expect("failed to write targets file");
    world.targets_file = Some(path);
}

fn targets_json(accounts: &str, monitors: &str) -> String {
    serde_json::json!({
        "mid": split_ids(accounts),
        "monitorsid": split_ids(monitors),
        "readonlyuptimerobotapikey": "ur-file-secret",
    })
    .to_string()
}

// --- Given steps ---

#[given("a pre-cancelled cancellation token")]
fn pre_cancelled_token(world: &mut StatusBoardWorld) {
    let token = CancellationToken::new();
    token.cancel();
    world.cancel = Some(token);
}

#[given(expr = "a targets file listing accounts {string} and monitors {string}")]
fn targets_file_listing(world: &mut StatusBoardWorld, accounts: String, monitors: String) {
    let contents = targets_json(&accounts, &monitors);
    write_targets_file(world, &contents);
}

#[given(expr = "a targets file containing {string}")]
fn targets_file_containing(world: &mut StatusBoardWorld, contents: String) {
    write_targets_file(world, &contents);
}

// --- When steps ---

#[when(expr = "the targets file is replaced with one listing accounts {string} and monitors {string}")]
fn targets_file_replaced(world: &mut StatusBoardWorld, accounts: String, monitors: String) {
    let contents = targets_json(&accounts, &monitors);
    write_targets_file(world, &contents);
}

#[when("the status board is built and started")]
async fn built_and_started(world: &mut StatusBoardWorld) {
    match board_builder(world).build() {
        Ok(board) => {
            world.build_succeeded = Some(true);
            world.start_succeeded = Some(board.start().await.is_ok());
        }
        Err(_) => {
            world.build_succeeded = Some(false);
            world.start_succeeded = Some(false);
        }
    }
}

#[when("the status board is built with a real HTTP client")]
fn built_with_real_client(world: &mut StatusBoardWorld) {
    let config = board_config(world);
    world.build_succeeded = Some(StatusBoardBuilder::new(config).build().is_ok());
}

// --- Then steps ---

#[then("the build succeeds")]
fn build_succeeds(world: &mut StatusBoardWorld) {
    assert_eq!(
        world.build_succeeded,
        Some(true),
        "Expected build to succeed"
    );
}

#[then("the lifecycle completes successfully")]
fn lifecycle_completes(world: &mut StatusBoardWorld) {
    assert_eq!(
        world.build_succeeded,
        Some(true),
        "Expected build to succeed"
    );
    assert_eq!(
        world.start_succeeded,
        Some(true),
        "Expected start to succeed"
    );
}
