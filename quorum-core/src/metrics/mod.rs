//! Metrics collection for observability

use metrics::describe_counter;

/// Initialize metrics with descriptions
pub fn init_metrics() {
    // Vote metrics
    describe_counter!("quorum.votes.created", "Votes created (first click)");
    describe_counter!("quorum.votes.flipped", "Votes flipped to the opposite direction");
    describe_counter!("quorum.votes.removed", "Votes removed (toggle off)");

    // Content metrics
    describe_counter!("quorum.questions.asked", "Questions posted");
    describe_counter!("quorum.answers.posted", "Answers posted");

    // Moderation metrics
    describe_counter!("quorum.admin.actions", "Admin dashboard mutations");
}
