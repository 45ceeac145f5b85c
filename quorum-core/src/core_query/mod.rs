/*
    core_query - Listing and query layer

    Read-only composition of filter, search, sort and pagination into a
    single store request, with each row annotated for presentation:
    author summary and, when someone is signed in, their own vote on the
    row. Guests simply get rows without vote annotation - never an
    error.
*/

use crate::core_auth::SessionStore;
use crate::core_store::errors::StoreResult;
use crate::core_store::model::{Answer, Question, QuestionId, UserId, VoteDirection, VoteTarget};
use crate::core_store::traits::{DataStore, QuestionQuery, SortKey};
use std::collections::HashMap;
use std::sync::Arc;

/// Page-size bounds applied to every listing request
#[derive(Debug, Clone, Copy)]
pub struct ListingLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for ListingLimits {
    fn default() -> Self {
        ListingLimits {
            default_page_size: 10,
            max_page_size: 50,
        }
    }
}

/// A listing request as the UI expresses it: 1-based page + page size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub sort: SortKey,
}

impl ListingQuery {
    pub fn new(sort: SortKey) -> Self {
        ListingQuery {
            page: 1,
            page_size: 0, // 0 means "use the configured default"
            search: None,
            sort,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }
}

impl Default for ListingQuery {
    fn default() -> Self {
        ListingQuery::new(SortKey::Newest)
    }
}

/// Author fields shown next to a row; absent when the profile is gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorSummary {
    pub username: String,
    pub avatar_url: Option<String>,
    pub reputation: u64,
}

/// One question row, annotated for display
#[derive(Debug, Clone)]
pub struct QuestionRow {
    pub question: Question,
    pub author: Option<AuthorSummary>,
    /// The signed-in user's vote on this question; None for guests or
    /// when they have not voted
    pub user_vote: Option<VoteDirection>,
}

/// One answer row, annotated the same way
#[derive(Debug, Clone)]
pub struct AnswerRow {
    pub answer: Answer,
    pub author: Option<AuthorSummary>,
    pub user_vote: Option<VoteDirection>,
}

/// A page of annotated question rows
#[derive(Debug, Clone)]
pub struct QuestionListing {
    pub items: Vec<QuestionRow>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl QuestionListing {
    pub fn total_pages(&self) -> u32 {
        if self.total == 0 {
            1
        } else {
            ((self.total + self.page_size as u64 - 1) / self.page_size as u64) as u32
        }
    }
}

/// Read-only listing service over the data store
pub struct ListingService<S: DataStore> {
    store: Arc<S>,
    session: Arc<SessionStore>,
    limits: ListingLimits,
}

impl<S: DataStore> ListingService<S> {
    pub fn new(store: Arc<S>, session: Arc<SessionStore>) -> Self {
        Self::with_limits(store, session, ListingLimits::default())
    }

    pub fn with_limits(store: Arc<S>, session: Arc<SessionStore>, limits: ListingLimits) -> Self {
        ListingService {
            store,
            session,
            limits,
        }
    }

    /// Query one page of questions, annotated with authors and (for a
    /// signed-in user) their own votes
    pub async fn questions(&self, query: &ListingQuery) -> StoreResult<QuestionListing> {
        let page = query.page.max(1);
        let page_size = match query.page_size {
            0 => self.limits.default_page_size,
            n => n.min(self.limits.max_page_size),
        };

        let search = query
            .search
            .as_ref()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let page_result = self
            .store
            .query_questions(&QuestionQuery {
                search,
                sort: query.sort,
                offset: ((page - 1) * page_size) as usize,
                limit: page_size as usize,
            })
            .await?;

        let targets: Vec<VoteTarget> = page_result
            .items
            .iter()
            .map(|q| VoteTarget::Question(q.id.clone()))
            .collect();
        let votes = self.user_votes(&targets).await?;

        let mut items = Vec::with_capacity(page_result.items.len());
        for question in page_result.items {
            let author = self.author_summary(&question.author_id).await?;
            let user_vote = votes
                .get(&VoteTarget::Question(question.id.clone()))
                .copied();
            items.push(QuestionRow {
                question,
                author,
                user_vote,
            });
        }

        Ok(QuestionListing {
            items,
            total: page_result.total,
            page,
            page_size,
        })
    }

    /// Answers for a question, accepted first then by votes, annotated
    pub async fn answers(&self, question_id: &QuestionId) -> StoreResult<Vec<AnswerRow>> {
        let answers = self.store.answers_for_question(question_id).await?;

        let targets: Vec<VoteTarget> = answers
            .iter()
            .map(|a| VoteTarget::Answer(a.id.clone()))
            .collect();
        let votes = self.user_votes(&targets).await?;

        let mut rows = Vec::with_capacity(answers.len());
        for answer in answers {
            let author = self.author_summary(&answer.author_id).await?;
            let user_vote = votes.get(&VoteTarget::Answer(answer.id.clone())).copied();
            rows.push(AnswerRow {
                answer,
                author,
                user_vote,
            });
        }
        Ok(rows)
    }

    async fn user_votes(
        &self,
        targets: &[VoteTarget],
    ) -> StoreResult<HashMap<VoteTarget, VoteDirection>> {
        let identity = match self.session.current() {
            Some(identity) => identity,
            None => return Ok(HashMap::new()),
        };
        if targets.is_empty() {
            return Ok(HashMap::new());
        }

        let votes = self
            .store
            .find_votes_for_user(&identity.user_id, targets)
            .await?;
        Ok(votes
            .into_iter()
            .map(|v| (v.target, v.direction))
            .collect())
    }

    async fn author_summary(&self, author_id: &UserId) -> StoreResult<Option<AuthorSummary>> {
        Ok(self
            .store
            .fetch_profile(author_id)
            .await?
            .map(|p| AuthorSummary {
                username: p.username,
                avatar_url: p.avatar_url,
                reputation: p.reputation,
            }))
    }
}
