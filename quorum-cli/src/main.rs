use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use quorum_core::config::Config;
use quorum_core::core_admin::AdminService;
use quorum_core::core_forum::ForumService;
use quorum_core::core_notify::NotificationFeed;
use quorum_core::core_query::{ListingLimits, ListingQuery, ListingService};
use quorum_core::core_store::model::{
    AnnouncementId, AnswerId, Profile, QuestionId, Role, UserId,
};
use quorum_core::core_store::traits::DataStore;
use quorum_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use quorum_core::{
    AdminGate, ChangeFeed, SessionStore, SortKey, SqliteStore, VoteDirection, VoteReconciler,
    VoteTarget,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "quorum")]
#[command(author, version, about = "Q&A community platform", long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Data directory (database and admin session flag)
    #[arg(long, default_value = "~/.quorum")]
    data_dir: String,

    /// Act as this user (most write commands need one)
    #[arg(short, long)]
    user: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize the data directory and seed the badge catalog
    Init,
    /// Create a new account
    Signup {
        username: String,
    },
    /// Post a question
    Ask {
        title: String,
        body: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Answer a question
    Answer {
        question_id: String,
        body: String,
    },
    /// Toggle acceptance of an answer (question author only)
    Accept {
        answer_id: String,
    },
    /// Vote on a question or answer (click-to-toggle)
    Vote {
        /// "question" or "answer"
        kind: String,
        id: String,
        /// "up" or "down"
        direction: String,
    },
    /// List questions
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 0)]
        page_size: u32,
        #[arg(long)]
        search: Option<String>,
        /// newest, unanswered or most-voted
        #[arg(long, default_value = "newest")]
        sort: String,
    },
    /// Show a question with its answers
    Show {
        question_id: String,
    },
    /// Show a user's profile, stats and badges
    Profile {
        username: String,
    },
    /// Top users by reputation
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Active announcements
    Announcements,
    /// Your notifications
    Notifications {
        #[arg(long)]
        mark_all_read: bool,
    },
    /// Open the admin dashboard session
    AdminLogin {
        username: String,
        password: String,
    },
    /// Close the admin dashboard session
    AdminLogout,
    /// Admin dashboard operations (require an open admin session)
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Dashboard totals
    Stats,
    /// Recently registered users
    Users,
    /// Recent questions
    Questions,
    /// Recent answers
    Answers,
    /// Ban a user
    Ban { username: String },
    /// Lift a ban
    Unban { username: String },
    /// Grant the admin role
    Promote { username: String },
    /// Delete a question with everything attached
    DeleteQuestion { id: String },
    /// Delete an answer
    DeleteAnswer { id: String },
    /// Post an announcement
    Announce { title: String, body: String },
    /// All announcements, active or not
    Announcements,
    /// Hide an announcement
    HideAnnouncement { id: String },
    /// Re-show a hidden announcement
    ShowAnnouncement { id: String },
    /// Delete an announcement
    DeleteAnnouncement { id: String },
}

/// Everything a command needs, wired once
struct App {
    store: Arc<SqliteStore>,
    session: Arc<SessionStore>,
    gate: Arc<AdminGate>,
    changes: Arc<ChangeFeed>,
    config: Config,
}

impl App {
    fn open(data_dir: &str) -> Result<Self> {
        let data_dir = PathBuf::from(shellexpand::tilde(data_dir).into_owned());
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;

        let mut config = Config::from_env().context("loading configuration")?;
        config.store.data_dir = data_dir.clone();

        let store = Arc::new(
            SqliteStore::open(data_dir.join("quorum.db")).context("opening database")?,
        );
        let gate = Arc::new(AdminGate::new(
            config.admin.username.clone(),
            config.admin.password.clone(),
            config.admin.session_ttl,
            &data_dir,
        ));

        Ok(App {
            store,
            session: Arc::new(SessionStore::new()),
            gate,
            changes: Arc::new(ChangeFeed::default()),
            config,
        })
    }

    /// Resolve `--user` into the session, if given
    async fn sign_in(&self, username: Option<&str>) -> Result<()> {
        if let Some(username) = username {
            let profile = self
                .store
                .fetch_profile_by_username(username)
                .await?
                .ok_or_else(|| anyhow!("no such user: {}", username))?;
            self.session.sign_in(profile.identity());
        }
        Ok(())
    }

    fn forum(&self) -> ForumService<SqliteStore> {
        ForumService::new(self.store.clone(), self.session.clone(), self.changes.clone())
    }

    fn listing(&self) -> ListingService<SqliteStore> {
        ListingService::with_limits(
            self.store.clone(),
            self.session.clone(),
            ListingLimits {
                default_page_size: self.config.listing.default_page_size,
                max_page_size: self.config.listing.max_page_size,
            },
        )
    }

    fn reconciler(&self) -> VoteReconciler<SqliteStore> {
        VoteReconciler::new(self.store.clone(), self.session.clone(), self.changes.clone())
    }

    fn admin(&self) -> AdminService<SqliteStore> {
        AdminService::new(self.store.clone(), self.gate.clone(), self.changes.clone())
    }

    fn notifications(&self) -> NotificationFeed<SqliteStore> {
        NotificationFeed::new(self.store.clone(), self.session.clone(), self.changes.clone())
    }

    async fn resolve_user(&self, username: &str) -> Result<Profile> {
        self.store
            .fetch_profile_by_username(username)
            .await?
            .ok_or_else(|| anyhow!("no such user: {}", username))
    }
}

fn parse_direction(s: &str) -> Result<VoteDirection> {
    VoteDirection::parse(s).ok_or_else(|| anyhow!("direction must be 'up' or 'down'"))
}

fn parse_target(kind: &str, id: &str) -> Result<VoteTarget> {
    match kind {
        "question" => Ok(VoteTarget::Question(QuestionId::new(id.to_string()))),
        "answer" => Ok(VoteTarget::Answer(AnswerId::new(id.to_string()))),
        other => Err(anyhow!("unknown vote target kind: {}", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = LogLevel::from_str(&args.log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'warn'", args.log_level);
        LogLevel::Warn
    });
    init_logging_with_config(LogConfig::new(log_level).json_format(args.json_logs))?;

    quorum_core::metrics::init_metrics();

    let app = App::open(&args.data_dir)?;
    app.sign_in(args.user.as_deref()).await?;

    run(&app, args.command).await
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Init => {
            if app.store.list_badges().await?.is_empty() {
                for badge in quorum_core::core_store::model::Badge::starter_catalog() {
                    app.store.insert_badge(&badge).await?;
                }
                info!("seeded badge catalog");
            }
            println!(
                "Initialized data directory {}",
                app.config.store.data_dir.display()
            );
        }

        Command::Signup { username } => {
            let profile = Profile::new(UserId::generate(), username.clone());
            app.store.insert_profile(&profile).await?;
            println!("Created account '{}' ({})", username, profile.user_id);
        }

        Command::Ask { title, body, tags } => {
            let tags: Vec<String> = tags
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            let question = app.forum().ask_question(&title, &body, tags).await?;
            println!("Posted question {}", question.id);
        }

        Command::Answer { question_id, body } => {
            let answer = app
                .forum()
                .post_answer(&QuestionId::new(question_id), &body)
                .await?;
            println!("Posted answer {}", answer.id);
        }

        Command::Accept { answer_id } => {
            let accepted = app
                .forum()
                .accept_answer(&AnswerId::new(answer_id))
                .await?;
            println!(
                "Answer is now {}",
                if accepted { "accepted" } else { "unaccepted" }
            );
        }

        Command::Vote {
            kind,
            id,
            direction,
        } => {
            let target = parse_target(&kind, &id)?;
            let direction = parse_direction(&direction)?;

            let prior_count = match &target {
                VoteTarget::Question(qid) => app
                    .store
                    .fetch_question(qid)
                    .await?
                    .ok_or_else(|| anyhow!("no such question: {}", qid))?
                    .vote_count,
                VoteTarget::Answer(aid) => app
                    .store
                    .fetch_answer(aid)
                    .await?
                    .ok_or_else(|| anyhow!("no such answer: {}", aid))?
                    .vote_count,
            };

            let outcome = app
                .reconciler()
                .apply_vote(&target, direction, prior_count)
                .await?;
            match outcome.vote {
                Some(direction) => println!(
                    "Voted {} - score is now {}",
                    direction, outcome.vote_count
                ),
                None => println!("Vote removed - score is now {}", outcome.vote_count),
            }
        }

        Command::List {
            page,
            page_size,
            search,
            sort,
        } => {
            let sort = SortKey::parse(&sort)
                .ok_or_else(|| anyhow!("sort must be newest, unanswered or most-voted"))?;
            let mut query = ListingQuery::new(sort).page(page).page_size(page_size);
            query.search = search;

            let listing = app.listing().questions(&query).await?;
            println!(
                "{} questions (page {}/{})",
                listing.total,
                listing.page,
                listing.total_pages()
            );
            for row in &listing.items {
                let author = row
                    .author
                    .as_ref()
                    .map(|a| a.username.as_str())
                    .unwrap_or("<deleted>");
                let vote = match row.user_vote {
                    Some(VoteDirection::Up) => " [your vote: up]",
                    Some(VoteDirection::Down) => " [your vote: down]",
                    None => "",
                };
                println!(
                    "  {:>4}  {} - {} by {} ({} answers, {} views){}",
                    row.question.vote_count,
                    row.question.id,
                    row.question.title,
                    author,
                    row.question.answer_count,
                    row.question.view_count,
                    vote
                );
            }
        }

        Command::Show { question_id } => {
            let question_id = QuestionId::new(question_id);
            let question = app.forum().question_detail(&question_id).await?;
            println!("{} ({})", question.title, question.id);
            if !question.tags.is_empty() {
                println!("tags: {}", question.tags.join(", "));
            }
            println!(
                "score {} | {} views | {} answers",
                question.vote_count, question.view_count, question.answer_count
            );
            println!("\n{}\n", question.body);

            for row in app.listing().answers(&question_id).await? {
                let author = row
                    .author
                    .as_ref()
                    .map(|a| a.username.as_str())
                    .unwrap_or("<deleted>");
                let marker = if row.answer.is_accepted { " [accepted]" } else { "" };
                println!(
                    "--- {} by {} (score {}){}",
                    row.answer.id, author, row.answer.vote_count, marker
                );
                println!("{}", row.answer.body);
            }
        }

        Command::Profile { username } => {
            let profile = app.resolve_user(&username).await?;
            println!(
                "{} | role {} | reputation {}",
                profile.username, profile.role, profile.reputation
            );

            let questions = app.store.questions_by_author(&profile.user_id).await?;
            let answers = app.store.answers_by_author(&profile.user_id).await?;
            println!("{} questions, {} answers", questions.len(), answers.len());

            let badges = app.store.badges_for_user(&profile.user_id).await?;
            if !badges.is_empty() {
                println!("badges:");
                for (_, badge) in badges {
                    println!("  {} {} ({}) - {}", badge.icon, badge.name, badge.tier, badge.description);
                }
            }
        }

        Command::Leaderboard { limit } => {
            for (rank, profile) in app.store.top_profiles(limit).await?.iter().enumerate() {
                println!(
                    "{:>3}. {} ({} rep)",
                    rank + 1,
                    profile.username,
                    profile.reputation
                );
            }
        }

        Command::Announcements => {
            for announcement in app.store.list_announcements(true).await? {
                println!("* {}\n  {}", announcement.title, announcement.body);
            }
        }

        Command::Notifications { mark_all_read } => {
            let feed = app.notifications();
            let unread = feed.unread_count().await?;
            println!("{} unread", unread);
            for notification in feed.list().await? {
                let marker = if notification.is_read { " " } else { "*" };
                println!("{} {} - {}", marker, notification.title, notification.body);
            }
            if mark_all_read {
                feed.mark_all_read().await?;
                println!("All marked read");
            }
        }

        Command::AdminLogin { username, password } => {
            app.gate.grant(&username, &password)?;
            println!("Admin session opened (valid for 24h)");
        }

        Command::AdminLogout => {
            app.gate.logout();
            println!("Admin session closed");
        }

        Command::Admin(admin_command) => run_admin(app, admin_command).await?,
    }

    Ok(())
}

async fn run_admin(app: &App, command: AdminCommand) -> Result<()> {
    let admin = app.admin();

    match command {
        AdminCommand::Stats => {
            let stats = admin.dashboard_stats().await?;
            println!("users:           {}", stats.total_users);
            println!("questions:       {}", stats.total_questions);
            println!("answers:         {}", stats.total_answers);
            println!("questions today: {}", stats.today_questions);
        }

        AdminCommand::Users => {
            for profile in admin.list_users().await? {
                println!(
                    "{} | {} | {} rep | {}",
                    profile.username, profile.role, profile.reputation, profile.user_id
                );
            }
        }

        AdminCommand::Questions => {
            for question in admin.list_questions().await? {
                println!("{} | {}", question.id, question.title);
            }
        }

        AdminCommand::Answers => {
            for answer in admin.list_answers().await? {
                println!("{} | on {} | score {}", answer.id, answer.question_id, answer.vote_count);
            }
        }

        AdminCommand::Ban { username } => {
            let profile = app.resolve_user(&username).await?;
            admin.ban_user(&profile.user_id).await?;
            println!("Banned {}", username);
        }

        AdminCommand::Unban { username } => {
            let profile = app.resolve_user(&username).await?;
            admin.unban_user(&profile.user_id).await?;
            println!("Unbanned {}", username);
        }

        AdminCommand::Promote { username } => {
            let profile = app.resolve_user(&username).await?;
            admin.promote_admin(&profile.user_id).await?;
            println!("{} is now an admin", username);
        }

        AdminCommand::DeleteQuestion { id } => {
            admin.delete_question(&QuestionId::new(id)).await?;
            println!("Question deleted");
        }

        AdminCommand::DeleteAnswer { id } => {
            admin.delete_answer(&AnswerId::new(id)).await?;
            println!("Answer deleted");
        }

        AdminCommand::Announce { title, body } => {
            // The dashboard session is not an identity; attribute the
            // announcement to the first admin account, if any
            let author = app
                .store
                .list_profiles(50)
                .await?
                .into_iter()
                .find(|p| p.role == Role::Admin)
                .map(|p| p.user_id)
                .unwrap_or_else(|| UserId::new("admin".to_string()));

            let announcement = admin.post_announcement(&author, &title, &body).await?;
            println!("Posted announcement {}", announcement.id);
        }

        AdminCommand::Announcements => {
            for announcement in admin.list_announcements().await? {
                let state = if announcement.is_active { "active" } else { "hidden" };
                println!("{} [{}] {}", announcement.id, state, announcement.title);
            }
        }

        AdminCommand::HideAnnouncement { id } => {
            admin
                .set_announcement_active(&AnnouncementId::new(id), false)
                .await?;
            println!("Announcement hidden");
        }

        AdminCommand::ShowAnnouncement { id } => {
            admin
                .set_announcement_active(&AnnouncementId::new(id), true)
                .await?;
            println!("Announcement shown");
        }

        AdminCommand::DeleteAnnouncement { id } => {
            admin.delete_announcement(&AnnouncementId::new(id)).await?;
            println!("Announcement deleted");
        }
    }

    Ok(())
}
