//! Scenario harness
//!
//! Drives a full voting round-trip against a real SQLite store and
//! checks every intermediate counter, plus an admin-gate open/close
//! cycle. Useful as a smoke test of the wired-together system outside
//! the unit suites.

use anyhow::{ensure, Result};
use clap::Parser;
use quorum_core::core_forum::ForumService;
use quorum_core::core_store::model::{Profile, UserId};
use quorum_core::core_store::traits::DataStore;
use quorum_core::{
    AdminGate, AdminSessionState, ChangeFeed, SessionStore, SqliteStore, VoteDirection,
    VoteReconciler, VoteTarget,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "test-harness")]
#[command(about = "Quorum end-to-end scenario runner", long_about = None)]
struct Args {
    /// Keep data in this directory instead of a temp dir
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (_keep_alive, data_dir) = match args.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            (None, dir)
        }
        None => {
            let tmp = tempfile::TempDir::new()?;
            let path = tmp.path().to_path_buf();
            (Some(tmp), path)
        }
    };

    let store = Arc::new(SqliteStore::open(data_dir.join("harness.db"))?);
    let session = Arc::new(SessionStore::new());
    let changes = Arc::new(ChangeFeed::default());

    println!("== vote round-trip scenario ==");
    vote_round_trip(&store, &session, &changes).await?;

    println!("== admin gate scenario ==");
    admin_gate_cycle(&data_dir)?;

    println!("all scenarios passed");
    Ok(())
}

/// Question starts at score 10 with no vote. Up -> 11, down -> 9,
/// down again -> 10. The full cycle must land back at the baseline.
async fn vote_round_trip(
    store: &Arc<SqliteStore>,
    session: &Arc<SessionStore>,
    changes: &Arc<ChangeFeed>,
) -> Result<()> {
    let author = Profile::new(UserId::generate(), "harness-author".to_string());
    store.insert_profile(&author).await?;
    let voter = Profile::new(UserId::generate(), "harness-voter".to_string());
    store.insert_profile(&voter).await?;

    session.sign_in(author.identity());
    let forum = ForumService::new(store.clone(), session.clone(), changes.clone());
    let question = forum
        .ask_question("Does the harness work?", "We are about to find out.", vec![])
        .await?;

    let target = VoteTarget::Question(question.id.clone());
    store.set_vote_count(&target, 10).await?;

    session.sign_in(voter.identity());
    let reconciler = VoteReconciler::new(store.clone(), session.clone(), changes.clone());

    let up = reconciler
        .apply_vote(&target, VoteDirection::Up, 10)
        .await?;
    ensure!(up.vote_count == 11, "up-vote should land at 11, got {}", up.vote_count);
    ensure!(up.vote == Some(VoteDirection::Up), "vote state should be up");
    println!("  up    -> {}", up.vote_count);

    let down = reconciler
        .apply_vote(&target, VoteDirection::Down, up.vote_count)
        .await?;
    ensure!(down.vote_count == 9, "flip should land at 9, got {}", down.vote_count);
    ensure!(down.vote == Some(VoteDirection::Down), "vote state should be down");
    println!("  down  -> {}", down.vote_count);

    let removed = reconciler
        .apply_vote(&target, VoteDirection::Down, down.vote_count)
        .await?;
    ensure!(
        removed.vote_count == 10,
        "removal should restore 10, got {}",
        removed.vote_count
    );
    ensure!(removed.vote.is_none(), "vote state should be cleared");
    println!("  down  -> {} (vote removed)", removed.vote_count);

    let stored = store
        .fetch_question(&question.id)
        .await?
        .expect("question still present");
    ensure!(stored.vote_count == 10, "stored counter should match");

    Ok(())
}

/// Grant with the right and wrong credentials, then log out
fn admin_gate_cycle(data_dir: &std::path::Path) -> Result<()> {
    let gate = AdminGate::new(
        "admin".to_string(),
        "admin123".to_string(),
        Duration::from_secs(24 * 60 * 60),
        data_dir,
    );

    ensure!(gate.check() == AdminSessionState::Absent, "gate should start closed");

    ensure!(
        gate.grant("admin", "wrong-password").is_err(),
        "wrong password must be denied"
    );
    ensure!(
        gate.check() == AdminSessionState::Absent,
        "denied grant must not open the gate"
    );

    gate.grant("admin", "admin123")?;
    ensure!(gate.check() == AdminSessionState::Valid, "gate should be open");
    println!("  granted and valid");

    gate.logout();
    ensure!(gate.check() == AdminSessionState::Absent, "logout should close the gate");
    println!("  logged out");

    Ok(())
}
