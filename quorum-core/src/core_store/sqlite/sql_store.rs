//! SQL-based DataStore implementation
//!
//! Backed by rusqlite behind an r2d2 pool. Each trait call is a single
//! statement or a single transaction; no transaction ever spans two
//! trait calls, so the vote-mutation/counter-write pair keeps its
//! documented inconsistency window.

use super::super::errors::{StoreError, StoreResult};
use super::super::model::{
    Announcement, AnnouncementId, Answer, AnswerId, Badge, BadgeAward, BadgeId, BadgeTier,
    Notification, NotificationId, Profile, Question, QuestionId, QuestionPatch, Role, Timestamp,
    UserId, Vote, VoteDirection, VoteTarget,
};
use super::super::traits::{DataStore, QuestionPage, QuestionQuery, SortKey};
use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use std::path::Path;

/// SQL-based store for the whole platform
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Create a store over an existing connection pool, running migrations
    pub fn new(pool: Pool<SqliteConnectionManager>) -> StoreResult<Self> {
        super::migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open (or create) a database file at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::new(manager)?;
        Self::new(pool)
    }

    /// In-memory database (for testing); single connection so every
    /// statement sees the same database
    pub fn memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        Self::new(pool)
    }

    fn conn(&self) -> StoreResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn row_to_profile(row: &Row<'_>) -> rusqlite::Result<Profile> {
    let role_str: String = row.get(3)?;
    Ok(Profile {
        user_id: UserId::new(row.get(0)?),
        username: row.get(1)?,
        avatar_url: row.get(2)?,
        role: Role::parse(&role_str).unwrap_or(Role::User),
        reputation: row.get::<_, i64>(4)?.max(0) as u64,
        created_at: Timestamp::from_millis(row.get::<_, i64>(5)?.max(0) as u64),
        updated_at: Timestamp::from_millis(row.get::<_, i64>(6)?.max(0) as u64),
    })
}

fn row_to_question(row: &Row<'_>) -> rusqlite::Result<Question> {
    let tags_json: String = row.get(3)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    Ok(Question {
        id: QuestionId::new(row.get(0)?),
        title: row.get(1)?,
        body: row.get(2)?,
        tags,
        author_id: UserId::new(row.get(4)?),
        vote_count: row.get(5)?,
        answer_count: row.get::<_, i64>(6)?.max(0) as u32,
        view_count: row.get::<_, i64>(7)?.max(0) as u64,
        created_at: Timestamp::from_millis(row.get::<_, i64>(8)?.max(0) as u64),
        updated_at: Timestamp::from_millis(row.get::<_, i64>(9)?.max(0) as u64),
    })
}

const QUESTION_COLUMNS: &str =
    "id, title, body, tags, author_id, vote_count, answer_count, view_count, created_at, updated_at";

fn row_to_answer(row: &Row<'_>) -> rusqlite::Result<Answer> {
    Ok(Answer {
        id: AnswerId::new(row.get(0)?),
        question_id: QuestionId::new(row.get(1)?),
        author_id: UserId::new(row.get(2)?),
        body: row.get(3)?,
        vote_count: row.get(4)?,
        is_accepted: row.get::<_, i64>(5)? != 0,
        created_at: Timestamp::from_millis(row.get::<_, i64>(6)?.max(0) as u64),
    })
}

const ANSWER_COLUMNS: &str =
    "id, question_id, author_id, body, vote_count, is_accepted, created_at";

fn row_to_vote(target: VoteTarget, row: &Row<'_>) -> rusqlite::Result<Vote> {
    let direction_str: String = row.get(0)?;
    Ok(Vote {
        target,
        user_id: UserId::new(row.get(1)?),
        direction: VoteDirection::parse(&direction_str).unwrap_or(VoteDirection::Up),
        created_at: Timestamp::from_millis(row.get::<_, i64>(2)?.max(0) as u64),
    })
}

#[async_trait]
impl DataStore for SqliteStore {
    // --- Profiles ---

    async fn insert_profile(&self, profile: &Profile) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO profiles (user_id, username, avatar_url, role, reputation, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                profile.user_id.as_str(),
                &profile.username,
                &profile.avatar_url,
                profile.role.as_str(),
                profile.reputation as i64,
                profile.created_at.as_millis() as i64,
                profile.updated_at.as_millis() as i64,
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StoreError::Conflict(format!("username taken: {}", profile.username))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<Profile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT user_id, username, avatar_url, role, reputation, created_at, updated_at
                 FROM profiles WHERE user_id = ?",
                params![user_id.as_str()],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    async fn fetch_profile_by_username(&self, username: &str) -> StoreResult<Option<Profile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT user_id, username, avatar_url, role, reputation, created_at, updated_at
                 FROM profiles WHERE username = ?",
                params![username],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    async fn list_profiles(&self, limit: usize) -> StoreResult<Vec<Profile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, username, avatar_url, role, reputation, created_at, updated_at
             FROM profiles ORDER BY created_at DESC LIMIT ?",
        )?;
        let profiles = stmt
            .query_map(params![limit as i64], row_to_profile)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    async fn top_profiles(&self, limit: usize) -> StoreResult<Vec<Profile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, username, avatar_url, role, reputation, created_at, updated_at
             FROM profiles ORDER BY reputation DESC LIMIT ?",
        )?;
        let profiles = stmt
            .query_map(params![limit as i64], row_to_profile)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    async fn set_role(&self, user_id: &UserId, role: Role) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE profiles SET role = ?, updated_at = ? WHERE user_id = ?",
            params![
                role.as_str(),
                Timestamp::now().as_millis() as i64,
                user_id.as_str()
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("profile {}", user_id)));
        }
        Ok(())
    }

    async fn count_profiles(&self) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // --- Questions ---

    async fn insert_question(&self, question: &Question) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO questions ({QUESTION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                question.id.as_str(),
                &question.title,
                &question.body,
                serde_json::to_string(&question.tags)?,
                question.author_id.as_str(),
                question.vote_count,
                question.answer_count as i64,
                question.view_count as i64,
                question.created_at.as_millis() as i64,
                question.updated_at.as_millis() as i64,
            ],
        )?;
        Ok(())
    }

    async fn fetch_question(&self, id: &QuestionId) -> StoreResult<Option<Question>> {
        let conn = self.conn()?;
        let question = conn
            .query_row(
                &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?"),
                params![id.as_str()],
                row_to_question,
            )
            .optional()?;
        Ok(question)
    }

    async fn update_question(&self, id: &QuestionId, patch: &QuestionPatch) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE questions SET title = ?, body = ?, tags = ?, updated_at = ? WHERE id = ?",
            params![
                &patch.title,
                &patch.body,
                serde_json::to_string(&patch.tags)?,
                Timestamp::now().as_millis() as i64,
                id.as_str(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("question {}", id)));
        }
        Ok(())
    }

    async fn delete_question(&self, id: &QuestionId) -> StoreResult<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM votes WHERE target_kind = 'answer'
             AND target_id IN (SELECT id FROM answers WHERE question_id = ?)",
            params![id.as_str()],
        )?;
        tx.execute(
            "DELETE FROM votes WHERE target_kind = 'question' AND target_id = ?",
            params![id.as_str()],
        )?;
        tx.execute(
            "DELETE FROM answers WHERE question_id = ?",
            params![id.as_str()],
        )?;
        let affected = tx.execute("DELETE FROM questions WHERE id = ?", params![id.as_str()])?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("question {}", id)));
        }

        tx.commit()?;
        Ok(())
    }

    async fn bump_view_count(&self, id: &QuestionId) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE questions SET view_count = view_count + 1 WHERE id = ?",
            params![id.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("question {}", id)));
        }
        Ok(())
    }

    async fn count_questions(&self) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn count_questions_since(&self, since: Timestamp) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM questions WHERE created_at >= ?",
            params![since.as_millis() as i64],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    async fn query_questions(&self, query: &QuestionQuery) -> StoreResult<QuestionPage> {
        let conn = self.conn()?;

        let mut where_clauses: Vec<&str> = Vec::new();
        if query.search.is_some() {
            where_clauses.push("(title LIKE ?1 OR body LIKE ?1 OR tags LIKE ?1)");
        }
        if query.sort == SortKey::Unanswered {
            where_clauses.push("answer_count = 0");
        }
        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let order_sql = match query.sort {
            SortKey::Newest | SortKey::Unanswered => "ORDER BY created_at DESC",
            SortKey::MostVoted => "ORDER BY vote_count DESC",
        };

        let pattern = query.search.as_ref().map(|s| format!("%{}%", s));

        let total: i64 = if let Some(pattern) = &pattern {
            conn.query_row(
                &format!("SELECT COUNT(*) FROM questions {where_sql}"),
                params![pattern],
                |row| row.get(0),
            )?
        } else {
            conn.query_row(
                &format!("SELECT COUNT(*) FROM questions {where_sql}"),
                [],
                |row| row.get(0),
            )?
        };

        let items = if let Some(pattern) = &pattern {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUESTION_COLUMNS} FROM questions {where_sql} {order_sql} LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(
                    params![pattern, query.limit as i64, query.offset as i64],
                    row_to_question,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUESTION_COLUMNS} FROM questions {where_sql} {order_sql} LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt
                .query_map(
                    params![query.limit as i64, query.offset as i64],
                    row_to_question,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        Ok(QuestionPage {
            items,
            total: total as u64,
        })
    }

    async fn questions_by_author(&self, author: &UserId) -> StoreResult<Vec<Question>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE author_id = ? ORDER BY created_at DESC"
        ))?;
        let questions = stmt
            .query_map(params![author.as_str()], row_to_question)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(questions)
    }

    async fn recent_questions(&self, limit: usize) -> StoreResult<Vec<Question>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions ORDER BY created_at DESC LIMIT ?"
        ))?;
        let questions = stmt
            .query_map(params![limit as i64], row_to_question)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(questions)
    }

    // --- Answers ---

    async fn insert_answer(&self, answer: &Answer) -> StoreResult<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        let affected = tx.execute(
            "UPDATE questions SET answer_count = answer_count + 1 WHERE id = ?",
            params![answer.question_id.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!(
                "question {}",
                answer.question_id
            )));
        }

        tx.execute(
            &format!("INSERT INTO answers ({ANSWER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"),
            params![
                answer.id.as_str(),
                answer.question_id.as_str(),
                answer.author_id.as_str(),
                &answer.body,
                answer.vote_count,
                answer.is_accepted as i64,
                answer.created_at.as_millis() as i64,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    async fn fetch_answer(&self, id: &AnswerId) -> StoreResult<Option<Answer>> {
        let conn = self.conn()?;
        let answer = conn
            .query_row(
                &format!("SELECT {ANSWER_COLUMNS} FROM answers WHERE id = ?"),
                params![id.as_str()],
                row_to_answer,
            )
            .optional()?;
        Ok(answer)
    }

    async fn answers_for_question(&self, question_id: &QuestionId) -> StoreResult<Vec<Answer>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE question_id = ?
             ORDER BY is_accepted DESC, vote_count DESC"
        ))?;
        let answers = stmt
            .query_map(params![question_id.as_str()], row_to_answer)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(answers)
    }

    async fn delete_answer(&self, id: &AnswerId) -> StoreResult<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        let question_id: Option<String> = tx
            .query_row(
                "SELECT question_id FROM answers WHERE id = ?",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let question_id =
            question_id.ok_or_else(|| StoreError::NotFound(format!("answer {}", id)))?;

        tx.execute(
            "DELETE FROM votes WHERE target_kind = 'answer' AND target_id = ?",
            params![id.as_str()],
        )?;
        tx.execute("DELETE FROM answers WHERE id = ?", params![id.as_str()])?;
        tx.execute(
            "UPDATE questions SET answer_count = MAX(answer_count - 1, 0) WHERE id = ?",
            params![question_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    async fn set_accepted(&self, id: &AnswerId, accepted: bool) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE answers SET is_accepted = ? WHERE id = ?",
            params![accepted as i64, id.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("answer {}", id)));
        }
        Ok(())
    }

    async fn clear_accepted(&self, question_id: &QuestionId) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE answers SET is_accepted = 0 WHERE question_id = ?",
            params![question_id.as_str()],
        )?;
        Ok(())
    }

    async fn count_answers(&self) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM answers", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn answers_by_author(&self, author: &UserId) -> StoreResult<Vec<Answer>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE author_id = ? ORDER BY created_at DESC"
        ))?;
        let answers = stmt
            .query_map(params![author.as_str()], row_to_answer)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(answers)
    }

    async fn recent_answers(&self, limit: usize) -> StoreResult<Vec<Answer>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers ORDER BY created_at DESC LIMIT ?"
        ))?;
        let answers = stmt
            .query_map(params![limit as i64], row_to_answer)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(answers)
    }

    // --- Votes ---

    async fn find_vote(&self, target: &VoteTarget, user_id: &UserId) -> StoreResult<Option<Vote>> {
        let conn = self.conn()?;
        let vote = conn
            .query_row(
                "SELECT direction, user_id, created_at FROM votes
                 WHERE target_kind = ? AND target_id = ? AND user_id = ?",
                params![target.kind(), target.id_str(), user_id.as_str()],
                |row| row_to_vote(target.clone(), row),
            )
            .optional()?;
        Ok(vote)
    }

    async fn find_votes_for_user(
        &self,
        user_id: &UserId,
        targets: &[VoteTarget],
    ) -> StoreResult<Vec<Vote>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT direction, user_id, created_at FROM votes
             WHERE target_kind = ? AND target_id = ? AND user_id = ?",
        )?;

        let mut votes = Vec::new();
        for target in targets {
            let vote = stmt
                .query_row(
                    params![target.kind(), target.id_str(), user_id.as_str()],
                    |row| row_to_vote(target.clone(), row),
                )
                .optional()?;
            if let Some(vote) = vote {
                votes.push(vote);
            }
        }
        Ok(votes)
    }

    async fn create_vote(&self, vote: &Vote) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO votes (target_kind, target_id, user_id, direction, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                vote.target.kind(),
                vote.target.id_str(),
                vote.user_id.as_str(),
                vote.direction.as_str(),
                vote.created_at.as_millis() as i64,
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StoreError::Conflict(format!(
                    "vote already exists for {} by {}",
                    vote.target, vote.user_id
                ))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn update_vote(
        &self,
        target: &VoteTarget,
        user_id: &UserId,
        direction: VoteDirection,
    ) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE votes SET direction = ?
             WHERE target_kind = ? AND target_id = ? AND user_id = ?",
            params![
                direction.as_str(),
                target.kind(),
                target.id_str(),
                user_id.as_str()
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!(
                "vote on {} by {}",
                target, user_id
            )));
        }
        Ok(())
    }

    async fn delete_vote(&self, target: &VoteTarget, user_id: &UserId) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "DELETE FROM votes WHERE target_kind = ? AND target_id = ? AND user_id = ?",
            params![target.kind(), target.id_str(), user_id.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!(
                "vote on {} by {}",
                target, user_id
            )));
        }
        Ok(())
    }

    async fn set_vote_count(&self, target: &VoteTarget, value: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        let (sql, label) = match target {
            VoteTarget::Question(_) => ("UPDATE questions SET vote_count = ? WHERE id = ?", "question"),
            VoteTarget::Answer(_) => ("UPDATE answers SET vote_count = ? WHERE id = ?", "answer"),
        };
        let affected = conn.execute(sql, params![value, target.id_str()])?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!(
                "{} {}",
                label,
                target.id_str()
            )));
        }
        Ok(())
    }

    // --- Badges ---

    async fn insert_badge(&self, badge: &Badge) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO badges (id, name, description, icon, tier) VALUES (?, ?, ?, ?, ?)",
            params![
                badge.id.as_str(),
                &badge.name,
                &badge.description,
                &badge.icon,
                badge.tier.as_str(),
            ],
        )?;
        Ok(())
    }

    async fn list_badges(&self) -> StoreResult<Vec<Badge>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, description, icon, tier FROM badges ORDER BY name")?;
        let badges = stmt
            .query_map([], |row| {
                let tier_str: String = row.get(4)?;
                Ok(Badge {
                    id: BadgeId::new(row.get(0)?),
                    name: row.get(1)?,
                    description: row.get(2)?,
                    icon: row.get(3)?,
                    tier: BadgeTier::parse(&tier_str).unwrap_or(BadgeTier::Bronze),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(badges)
    }

    async fn award_badge(&self, award: &BadgeAward) -> StoreResult<()> {
        let conn = self.conn()?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM badges WHERE id = ?",
                params![award.badge_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!("badge {}", award.badge_id)));
        }

        conn.execute(
            "INSERT INTO user_badges (user_id, badge_id, awarded_at) VALUES (?, ?, ?)",
            params![
                award.user_id.as_str(),
                award.badge_id.as_str(),
                award.awarded_at.as_millis() as i64,
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StoreError::Conflict(format!(
                    "badge {} already awarded to {}",
                    award.badge_id, award.user_id
                ))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn badges_for_user(&self, user_id: &UserId) -> StoreResult<Vec<(BadgeAward, Badge)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT ub.user_id, ub.badge_id, ub.awarded_at, b.id, b.name, b.description, b.icon, b.tier
             FROM user_badges ub JOIN badges b ON ub.badge_id = b.id
             WHERE ub.user_id = ? ORDER BY ub.awarded_at",
        )?;
        let rows = stmt
            .query_map(params![user_id.as_str()], |row| {
                let tier_str: String = row.get(7)?;
                Ok((
                    BadgeAward {
                        user_id: UserId::new(row.get(0)?),
                        badge_id: BadgeId::new(row.get(1)?),
                        awarded_at: Timestamp::from_millis(row.get::<_, i64>(2)?.max(0) as u64),
                    },
                    Badge {
                        id: BadgeId::new(row.get(3)?),
                        name: row.get(4)?,
                        description: row.get(5)?,
                        icon: row.get(6)?,
                        tier: BadgeTier::parse(&tier_str).unwrap_or(BadgeTier::Bronze),
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // --- Announcements ---

    async fn insert_announcement(&self, announcement: &Announcement) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO announcements (id, title, body, is_active, author_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                announcement.id.as_str(),
                &announcement.title,
                &announcement.body,
                announcement.is_active as i64,
                announcement.author_id.as_str(),
                announcement.created_at.as_millis() as i64,
            ],
        )?;
        Ok(())
    }

    async fn list_announcements(&self, active_only: bool) -> StoreResult<Vec<Announcement>> {
        let conn = self.conn()?;
        let where_sql = if active_only { "WHERE is_active = 1" } else { "" };
        let mut stmt = conn.prepare(&format!(
            "SELECT id, title, body, is_active, author_id, created_at
             FROM announcements {where_sql} ORDER BY created_at DESC"
        ))?;
        let announcements = stmt
            .query_map([], |row| {
                Ok(Announcement {
                    id: AnnouncementId::new(row.get(0)?),
                    title: row.get(1)?,
                    body: row.get(2)?,
                    is_active: row.get::<_, i64>(3)? != 0,
                    author_id: UserId::new(row.get(4)?),
                    created_at: Timestamp::from_millis(row.get::<_, i64>(5)?.max(0) as u64),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(announcements)
    }

    async fn set_announcement_active(
        &self,
        id: &AnnouncementId,
        active: bool,
    ) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE announcements SET is_active = ? WHERE id = ?",
            params![active as i64, id.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("announcement {}", id)));
        }
        Ok(())
    }

    async fn delete_announcement(&self, id: &AnnouncementId) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "DELETE FROM announcements WHERE id = ?",
            params![id.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("announcement {}", id)));
        }
        Ok(())
    }

    // --- Notifications ---

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO notifications (id, user_id, title, body, is_read, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                notification.id.as_str(),
                notification.user_id.as_str(),
                &notification.title,
                &notification.body,
                notification.is_read as i64,
                notification.created_at.as_millis() as i64,
            ],
        )?;
        Ok(())
    }

    async fn notifications_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> StoreResult<Vec<Notification>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, body, is_read, created_at FROM notifications
             WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        )?;
        let notifications = stmt
            .query_map(params![user_id.as_str(), limit as i64], |row| {
                Ok(Notification {
                    id: NotificationId::new(row.get(0)?),
                    user_id: UserId::new(row.get(1)?),
                    title: row.get(2)?,
                    body: row.get(3)?,
                    is_read: row.get::<_, i64>(4)? != 0,
                    created_at: Timestamp::from_millis(row.get::<_, i64>(5)?.max(0) as u64),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    async fn mark_notification_read(&self, id: &NotificationId) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?",
            params![id.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("notification {}", id)));
        }
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: &UserId) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0",
            params![user_id.as_str()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_profile_round_trip() {
        let store = SqliteStore::memory().unwrap();
        let profile = Profile::new(UserId::generate(), "alice".to_string());
        store.insert_profile(&profile).await.unwrap();

        let fetched = store.fetch_profile(&profile.user_id).await.unwrap().unwrap();
        assert_eq!(fetched, profile);

        let by_name = store
            .fetch_profile_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.user_id, profile.user_id);
    }

    #[tokio::test]
    async fn test_question_tags_survive_round_trip() {
        let store = SqliteStore::memory().unwrap();
        let question = Question::new(
            "title".to_string(),
            "body".to_string(),
            vec!["rust".to_string(), "sql".to_string()],
            UserId::generate(),
        );
        store.insert_question(&question).await.unwrap();

        let fetched = store.fetch_question(&question.id).await.unwrap().unwrap();
        assert_eq!(fetched.tags, vec!["rust", "sql"]);
    }

    #[tokio::test]
    async fn test_duplicate_vote_is_conflict() {
        let store = SqliteStore::memory().unwrap();
        let question = Question::new("t".to_string(), "b".to_string(), vec![], UserId::generate());
        store.insert_question(&question).await.unwrap();

        let vote = Vote::new(
            VoteTarget::Question(question.id.clone()),
            UserId::generate(),
            VoteDirection::Up,
        );
        store.create_vote(&vote).await.unwrap();
        assert!(matches!(
            store.create_vote(&vote).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_set_vote_count_routes_by_target() {
        let store = SqliteStore::memory().unwrap();
        let question = Question::new("t".to_string(), "b".to_string(), vec![], UserId::generate());
        store.insert_question(&question).await.unwrap();
        let answer = Answer::new(question.id.clone(), UserId::generate(), "a".to_string());
        store.insert_answer(&answer).await.unwrap();

        store
            .set_vote_count(&VoteTarget::Question(question.id.clone()), 7)
            .await
            .unwrap();
        store
            .set_vote_count(&VoteTarget::Answer(answer.id.clone()), -3)
            .await
            .unwrap();

        assert_eq!(
            store
                .fetch_question(&question.id)
                .await
                .unwrap()
                .unwrap()
                .vote_count,
            7
        );
        assert_eq!(
            store
                .fetch_answer(&answer.id)
                .await
                .unwrap()
                .unwrap()
                .vote_count,
            -3
        );
    }

    #[tokio::test]
    async fn test_query_questions_search_and_paging() {
        let store = SqliteStore::memory().unwrap();
        let author = UserId::generate();
        for i in 0..5 {
            let question = Question::new(
                format!("rust question {}", i),
                "body".to_string(),
                vec!["rust".to_string()],
                author.clone(),
            );
            store.insert_question(&question).await.unwrap();
        }
        let other = Question::new(
            "cooking tips".to_string(),
            "food".to_string(),
            vec!["cooking".to_string()],
            author.clone(),
        );
        store.insert_question(&other).await.unwrap();

        let page = store
            .query_questions(&QuestionQuery {
                search: Some("rust".to_string()),
                sort: SortKey::Newest,
                offset: 0,
                limit: 3,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 3);

        let page = store
            .query_questions(&QuestionQuery {
                search: Some("rust".to_string()),
                sort: SortKey::Newest,
                offset: 3,
                limit: 3,
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn test_answers_ordered_accepted_then_votes() {
        let store = SqliteStore::memory().unwrap();
        let question = Question::new("t".to_string(), "b".to_string(), vec![], UserId::generate());
        store.insert_question(&question).await.unwrap();

        let mut low = Answer::new(question.id.clone(), UserId::generate(), "low".to_string());
        low.vote_count = 1;
        let mut high = Answer::new(question.id.clone(), UserId::generate(), "high".to_string());
        high.vote_count = 9;
        let mut accepted = Answer::new(question.id.clone(), UserId::generate(), "acc".to_string());
        accepted.is_accepted = true;

        store.insert_answer(&low).await.unwrap();
        store.insert_answer(&high).await.unwrap();
        store.insert_answer(&accepted).await.unwrap();

        let answers = store.answers_for_question(&question.id).await.unwrap();
        assert_eq!(answers[0].id, accepted.id);
        assert_eq!(answers[1].id, high.id);
        assert_eq!(answers[2].id, low.id);
    }
}
