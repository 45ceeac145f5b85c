/*
    tests.rs - Store conformance tests

    The same scenarios run against both DataStore implementations; any
    behavioral difference between memory and sqlite is a bug in one of
    them.
*/

use super::memory::MemoryStore;
use super::model::{Answer, Profile, Question, Role, UserId, Vote, VoteDirection, VoteTarget};
use super::sqlite::SqliteStore;
use super::traits::{DataStore, QuestionQuery, SortKey};

fn stores() -> Vec<Box<dyn DataStore>> {
    vec![
        Box::new(MemoryStore::new()),
        Box::new(SqliteStore::memory().unwrap()),
    ]
}

async fn seed_question(store: &dyn DataStore) -> Question {
    let author = Profile::new(UserId::generate(), format!("author-{}", uuid::Uuid::new_v4()));
    store.insert_profile(&author).await.unwrap();
    let question = Question::new(
        "How does pagination work?".to_string(),
        "Asking for a friend.".to_string(),
        vec!["paging".to_string()],
        author.user_id.clone(),
    );
    store.insert_question(&question).await.unwrap();
    question
}

#[tokio::test]
async fn test_vote_lifecycle_matches_across_stores() {
    for store in stores() {
        let store = store.as_ref();
        let question = seed_question(store).await;
        let voter = UserId::generate();
        let target = VoteTarget::Question(question.id.clone());

        assert!(store.find_vote(&target, &voter).await.unwrap().is_none());

        store
            .create_vote(&Vote::new(target.clone(), voter.clone(), VoteDirection::Up))
            .await
            .unwrap();
        let vote = store.find_vote(&target, &voter).await.unwrap().unwrap();
        assert_eq!(vote.direction, VoteDirection::Up);

        store
            .update_vote(&target, &voter, VoteDirection::Down)
            .await
            .unwrap();
        let vote = store.find_vote(&target, &voter).await.unwrap().unwrap();
        assert_eq!(vote.direction, VoteDirection::Down);

        store.delete_vote(&target, &voter).await.unwrap();
        assert!(store.find_vote(&target, &voter).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_unanswered_filter_matches_across_stores() {
    for store in stores() {
        let store = store.as_ref();
        let answered = seed_question(store).await;
        let unanswered = seed_question(store).await;
        store
            .insert_answer(&Answer::new(
                answered.id.clone(),
                UserId::generate(),
                "an answer".to_string(),
            ))
            .await
            .unwrap();

        let page = store
            .query_questions(&QuestionQuery {
                search: None,
                sort: SortKey::Unanswered,
                offset: 0,
                limit: 10,
            })
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, unanswered.id);
        assert!(page.items.iter().all(|q| q.answer_count == 0));
    }
}

#[tokio::test]
async fn test_most_voted_sort_matches_across_stores() {
    for store in stores() {
        let store = store.as_ref();
        let low = seed_question(store).await;
        let high = seed_question(store).await;
        store
            .set_vote_count(&VoteTarget::Question(high.id.clone()), 12)
            .await
            .unwrap();
        store
            .set_vote_count(&VoteTarget::Question(low.id.clone()), 2)
            .await
            .unwrap();

        let page = store
            .query_questions(&QuestionQuery {
                search: None,
                sort: SortKey::MostVoted,
                offset: 0,
                limit: 10,
            })
            .await
            .unwrap();

        assert_eq!(page.items[0].id, high.id);
        assert_eq!(page.items[1].id, low.id);
    }
}

#[tokio::test]
async fn test_role_change_persists_across_stores() {
    for store in stores() {
        let store = store.as_ref();
        let profile = Profile::new(UserId::generate(), format!("u-{}", uuid::Uuid::new_v4()));
        store.insert_profile(&profile).await.unwrap();

        store
            .set_role(&profile.user_id, Role::Banned)
            .await
            .unwrap();
        let fetched = store.fetch_profile(&profile.user_id).await.unwrap().unwrap();
        assert_eq!(fetched.role, Role::Banned);

        store.set_role(&profile.user_id, Role::Admin).await.unwrap();
        let fetched = store.fetch_profile(&profile.user_id).await.unwrap().unwrap();
        assert_eq!(fetched.role, Role::Admin);
    }
}

#[tokio::test]
async fn test_find_votes_for_user_matches_across_stores() {
    for store in stores() {
        let store = store.as_ref();
        let q1 = seed_question(store).await;
        let q2 = seed_question(store).await;
        let q3 = seed_question(store).await;
        let voter = UserId::generate();

        store
            .create_vote(&Vote::new(
                VoteTarget::Question(q1.id.clone()),
                voter.clone(),
                VoteDirection::Up,
            ))
            .await
            .unwrap();
        store
            .create_vote(&Vote::new(
                VoteTarget::Question(q3.id.clone()),
                voter.clone(),
                VoteDirection::Down,
            ))
            .await
            .unwrap();

        let targets = vec![
            VoteTarget::Question(q1.id.clone()),
            VoteTarget::Question(q2.id.clone()),
            VoteTarget::Question(q3.id.clone()),
        ];
        let votes = store.find_votes_for_user(&voter, &targets).await.unwrap();
        assert_eq!(votes.len(), 2);
        assert!(votes
            .iter()
            .any(|v| v.target == targets[0] && v.direction == VoteDirection::Up));
        assert!(votes
            .iter()
            .any(|v| v.target == targets[2] && v.direction == VoteDirection::Down));
    }
}
