//! Database migrations for the Q&A store
//!
//! Versioned migrations for the platform schema. Each migration is
//! applied atomically and tracked in the schema_version table.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
    pub down_sql: Option<&'static str>,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial Q&A platform schema",
        up_sql: r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );

            -- User profiles
            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                avatar_url TEXT,
                role TEXT NOT NULL CHECK(role IN ('guest', 'user', 'admin', 'banned')),
                reputation INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_profiles_reputation ON profiles(reputation DESC);
            CREATE INDEX IF NOT EXISTS idx_profiles_created ON profiles(created_at DESC);

            -- Questions, with denormalized counters
            CREATE TABLE IF NOT EXISTS questions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                tags TEXT NOT NULL,                     -- JSON array of strings
                author_id TEXT NOT NULL,
                vote_count INTEGER NOT NULL DEFAULT 0,
                answer_count INTEGER NOT NULL DEFAULT 0,
                view_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_questions_created ON questions(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_questions_votes ON questions(vote_count DESC);
            CREATE INDEX IF NOT EXISTS idx_questions_author ON questions(author_id);
            CREATE INDEX IF NOT EXISTS idx_questions_unanswered
                ON questions(created_at DESC)
                WHERE answer_count = 0;

            -- Answers
            CREATE TABLE IF NOT EXISTS answers (
                id TEXT PRIMARY KEY,
                question_id TEXT NOT NULL,
                author_id TEXT NOT NULL,
                body TEXT NOT NULL,
                vote_count INTEGER NOT NULL DEFAULT 0,
                is_accepted INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_answers_question ON answers(question_id);
            CREATE INDEX IF NOT EXISTS idx_answers_author ON answers(author_id);

            -- Votes: one row per (target, user)
            CREATE TABLE IF NOT EXISTS votes (
                target_kind TEXT NOT NULL CHECK(target_kind IN ('question', 'answer')),
                target_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                direction TEXT NOT NULL CHECK(direction IN ('up', 'down')),
                created_at INTEGER NOT NULL,
                PRIMARY KEY (target_kind, target_id, user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_votes_user ON votes(user_id);

            -- Badge catalog
            CREATE TABLE IF NOT EXISTS badges (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                icon TEXT NOT NULL,
                tier TEXT NOT NULL CHECK(tier IN ('bronze', 'silver', 'gold'))
            );

            -- Badge awards
            CREATE TABLE IF NOT EXISTS user_badges (
                user_id TEXT NOT NULL,
                badge_id TEXT NOT NULL,
                awarded_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, badge_id),
                FOREIGN KEY (badge_id) REFERENCES badges(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_user_badges_user ON user_badges(user_id);

            -- Announcements
            CREATE TABLE IF NOT EXISTS announcements (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                author_id TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_announcements_active
                ON announcements(created_at DESC)
                WHERE is_active = 1;

            -- Notifications
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, created_at DESC);
        "#,
        down_sql: Some(
            r#"
            DROP INDEX IF EXISTS idx_notifications_user;
            DROP TABLE IF EXISTS notifications;

            DROP INDEX IF EXISTS idx_announcements_active;
            DROP TABLE IF EXISTS announcements;

            DROP INDEX IF EXISTS idx_user_badges_user;
            DROP TABLE IF EXISTS user_badges;
            DROP TABLE IF EXISTS badges;

            DROP INDEX IF EXISTS idx_votes_user;
            DROP TABLE IF EXISTS votes;

            DROP INDEX IF EXISTS idx_answers_author;
            DROP INDEX IF EXISTS idx_answers_question;
            DROP TABLE IF EXISTS answers;

            DROP INDEX IF EXISTS idx_questions_unanswered;
            DROP INDEX IF EXISTS idx_questions_author;
            DROP INDEX IF EXISTS idx_questions_votes;
            DROP INDEX IF EXISTS idx_questions_created;
            DROP TABLE IF EXISTS questions;

            DROP INDEX IF EXISTS idx_profiles_created;
            DROP INDEX IF EXISTS idx_profiles_reputation;
            DROP TABLE IF EXISTS profiles;

            DROP TABLE IF EXISTS schema_version;
        "#,
        ),
    }]
}

/// Get current schema version from the database
fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> Result<i32, rusqlite::Error> {
    let conn = pool.get().map_err(|e| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to get connection: {}", e),
        )))
    })?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Result<i32, _> = conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> Result<(), rusqlite::Error> {
    let current_version = get_current_version(pool)?;
    let migrations = get_migrations();

    let pending: Vec<_> = migrations
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending.is_empty() {
        return Ok(());
    }

    let conn = pool.get().map_err(|e| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to get connection: {}", e),
        )))
    })?;

    for migration in pending {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as i64;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, now],
        )?;

        tx.commit()?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}
