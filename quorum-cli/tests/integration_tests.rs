//! Integration tests for the Quorum core
//!
//! These tests verify end-to-end workflows with multiple actors including:
//! - Asking, answering and accepting
//! - Vote toggling and score reconciliation across users
//! - Listing with per-user vote annotation
//! - The admin dashboard gate and moderation actions

use anyhow::Result;
use quorum_core::core_admin::AdminService;
use quorum_core::core_forum::ForumService;
use quorum_core::core_query::{ListingQuery, ListingService};
use quorum_core::core_store::model::{Profile, Question, Role, UserId};
use quorum_core::core_store::traits::DataStore;
use quorum_core::{
    AdminGate, ChangeFeed, SessionStore, SortKey, SqliteStore, VoteDirection, VoteReconciler,
    VoteTarget,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Test actor representing a user driving the core through its own session
struct TestActor {
    profile: Profile,
    session: Arc<SessionStore>,
    forum: ForumService<SqliteStore>,
    listing: ListingService<SqliteStore>,
    reconciler: VoteReconciler<SqliteStore>,
}

impl TestActor {
    async fn new(world: &TestWorld, name: &str) -> Result<Self> {
        let profile = Profile::new(UserId::generate(), name.to_string());
        world.store.insert_profile(&profile).await?;

        let session = Arc::new(SessionStore::new());
        session.sign_in(profile.identity());

        Ok(TestActor {
            profile,
            forum: ForumService::new(
                world.store.clone(),
                session.clone(),
                world.changes.clone(),
            ),
            listing: ListingService::new(world.store.clone(), session.clone()),
            reconciler: VoteReconciler::new(
                world.store.clone(),
                session.clone(),
                world.changes.clone(),
            ),
            session,
        })
    }
}

/// Shared store and wiring for a test
struct TestWorld {
    store: Arc<SqliteStore>,
    changes: Arc<ChangeFeed>,
    data_dir: TempDir,
}

impl TestWorld {
    fn new() -> Result<Self> {
        let data_dir = TempDir::new()?;
        let store = Arc::new(SqliteStore::open(data_dir.path().join("test.db"))?);
        Ok(TestWorld {
            store,
            changes: Arc::new(ChangeFeed::default()),
            data_dir,
        })
    }

    fn admin_gate(&self) -> Arc<AdminGate> {
        Arc::new(AdminGate::new(
            "admin".to_string(),
            "admin123".to_string(),
            Duration::from_secs(24 * 60 * 60),
            self.data_dir.path(),
        ))
    }
}

#[tokio::test]
async fn two_actors_vote_independently() -> Result<()> {
    let world = TestWorld::new()?;
    let author = TestActor::new(&world, "author").await?;
    let alice = TestActor::new(&world, "alice").await?;
    let bob = TestActor::new(&world, "bob").await?;

    let question = author
        .forum
        .ask_question("Shared question", "body", vec![])
        .await?;
    let target = VoteTarget::Question(question.id.clone());

    // Alice votes up, Bob votes down; each reads the current count first
    let after_alice = alice.reconciler.apply_vote(&target, VoteDirection::Up, 0).await?;
    assert_eq!(after_alice.vote_count, 1);

    let after_bob = bob
        .reconciler
        .apply_vote(&target, VoteDirection::Down, after_alice.vote_count)
        .await?;
    assert_eq!(after_bob.vote_count, 0);

    // Each actor sees their own annotation, not the other's
    let alice_view = alice.listing.questions(&ListingQuery::default()).await?;
    assert_eq!(alice_view.items[0].user_vote, Some(VoteDirection::Up));

    let bob_view = bob.listing.questions(&ListingQuery::default()).await?;
    assert_eq!(bob_view.items[0].user_vote, Some(VoteDirection::Down));

    // A guest sees no annotation at all
    let guest_session = Arc::new(SessionStore::new());
    let guest_listing = ListingService::new(world.store.clone(), guest_session);
    let guest_view = guest_listing.questions(&ListingQuery::default()).await?;
    assert!(guest_view.items[0].user_vote.is_none());

    Ok(())
}

#[tokio::test]
async fn answer_accept_and_ordering_flow() -> Result<()> {
    let world = TestWorld::new()?;
    let author = TestActor::new(&world, "asker").await?;
    let helper = TestActor::new(&world, "helper").await?;
    let other = TestActor::new(&world, "other").await?;

    let question = author
        .forum
        .ask_question("Need help", "please", vec!["help".to_string()])
        .await?;

    let weak = helper.forum.post_answer(&question.id, "weak answer").await?;
    let strong = other.forum.post_answer(&question.id, "strong answer").await?;

    // The author up-votes the strong answer
    author
        .reconciler
        .apply_vote(&VoteTarget::Answer(strong.id.clone()), VoteDirection::Up, 0)
        .await?;

    // ...and accepts the weak one; accepted sorts above higher-voted
    assert!(author.forum.accept_answer(&weak.id).await?);

    let rows = author.listing.answers(&question.id).await?;
    assert_eq!(rows[0].answer.id, weak.id);
    assert!(rows[0].answer.is_accepted);
    assert_eq!(rows[1].answer.id, strong.id);
    assert_eq!(rows[1].answer.vote_count, 1);

    // The author's own vote annotation came through on the answer row
    assert_eq!(rows[1].user_vote, Some(VoteDirection::Up));

    let question_fresh = world.store.fetch_question(&question.id).await?.unwrap();
    assert_eq!(question_fresh.answer_count, 2);

    Ok(())
}

#[tokio::test]
async fn vote_toggle_parity_on_sqlite() -> Result<()> {
    let world = TestWorld::new()?;
    let author = TestActor::new(&world, "author").await?;
    let voter = TestActor::new(&world, "voter").await?;

    let question = author.forum.ask_question("t", "b", vec![]).await?;
    let target = VoteTarget::Question(question.id.clone());

    // Three identical clicks: voted, unvoted, voted again
    let mut count = 0;
    for expected in [1, 0, 1] {
        let outcome = voter
            .reconciler
            .apply_vote(&target, VoteDirection::Up, count)
            .await?;
        assert_eq!(outcome.vote_count, expected);
        count = outcome.vote_count;
    }

    let stored = world.store.fetch_question(&question.id).await?.unwrap();
    assert_eq!(stored.vote_count, 1);
    assert!(world
        .store
        .find_vote(&target, &voter.profile.user_id)
        .await?
        .is_some());

    Ok(())
}

#[tokio::test]
async fn listing_filters_and_sorts() -> Result<()> {
    let world = TestWorld::new()?;
    let author = TestActor::new(&world, "author").await?;
    let voter = TestActor::new(&world, "voter").await?;

    let plain = author.forum.ask_question("plain", "b", vec![]).await?;
    let popular = author.forum.ask_question("popular", "b", vec![]).await?;
    let answered = author
        .forum
        .ask_question("answered", "b", vec![])
        .await?;
    voter.forum.post_answer(&answered.id, "done").await?;
    voter
        .reconciler
        .apply_vote(&VoteTarget::Question(popular.id.clone()), VoteDirection::Up, 0)
        .await?;

    let unanswered = author
        .listing
        .questions(&ListingQuery::new(SortKey::Unanswered))
        .await?;
    assert_eq!(unanswered.total, 2);
    assert!(unanswered
        .items
        .iter()
        .all(|r| r.question.id != answered.id));

    let most_voted = author
        .listing
        .questions(&ListingQuery::new(SortKey::MostVoted))
        .await?;
    assert_eq!(most_voted.items[0].question.id, popular.id);

    let searched = author
        .listing
        .questions(&ListingQuery::default().search("plain"))
        .await?;
    assert_eq!(searched.total, 1);
    assert_eq!(searched.items[0].question.id, plain.id);

    Ok(())
}

#[tokio::test]
async fn admin_gate_and_moderation_flow() -> Result<()> {
    let world = TestWorld::new()?;
    let gate = world.admin_gate();
    let admin = AdminService::new(world.store.clone(), gate.clone(), world.changes.clone());

    let troll = TestActor::new(&world, "troll").await?;
    let question = troll.forum.ask_question("spam", "spam", vec![]).await?;

    // Closed gate: everything refused
    assert!(admin.dashboard_stats().await.is_err());

    // Wrong credentials leave it closed
    assert!(gate.grant("admin", "nope").is_err());
    assert!(admin.list_users().await.is_err());

    // Open it and moderate
    gate.grant("admin", "admin123").unwrap();
    let stats = admin.dashboard_stats().await?;
    assert_eq!(stats.total_users, 1);
    assert_eq!(stats.total_questions, 1);

    admin.ban_user(&troll.profile.user_id).await?;
    admin.delete_question(&question.id).await?;
    assert!(world.store.fetch_question(&question.id).await?.is_none());

    // The banned actor can no longer post (their session still carries
    // the stale role until refreshed - re-sign-in picks up the ban)
    let fresh = world
        .store
        .fetch_profile(&troll.profile.user_id)
        .await?
        .unwrap();
    assert_eq!(fresh.role, Role::Banned);
    troll.session.sign_in(fresh.identity());
    assert!(troll
        .forum
        .ask_question("more spam", "spam", vec![])
        .await
        .is_err());

    Ok(())
}

#[tokio::test]
async fn questions_survive_process_restart() -> Result<()> {
    let data_dir = TempDir::new()?;
    let db_path = data_dir.path().join("persist.db");

    let question_id = {
        let store = Arc::new(SqliteStore::open(&db_path)?);
        let author = Profile::new(UserId::generate(), "author".to_string());
        store.insert_profile(&author).await?;
        let question = Question::new(
            "durable?".to_string(),
            "body".to_string(),
            vec![],
            author.user_id.clone(),
        );
        store.insert_question(&question).await?;
        store
            .set_vote_count(&VoteTarget::Question(question.id.clone()), 5)
            .await?;
        question.id
    };

    // Reopen: data and counter survive
    let store = Arc::new(SqliteStore::open(&db_path)?);
    let question = store.fetch_question(&question_id).await?.unwrap();
    assert_eq!(question.vote_count, 5);

    Ok(())
}
