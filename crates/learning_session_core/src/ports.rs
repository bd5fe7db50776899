//! crates/learning_session_core/src/ports.rs
//!
//! Defines the service contracts (traits) the session core depends on.
//! These traits form the boundary of the hexagonal architecture: the backend
//! collaborators, the revision store and the journey page store all live
//! behind them.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    AnswerVerdict, ComparisonResult, LessonContent, LessonRequest, QuestionKind, QuizPayload,
    RevisionEntry,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (network, database, disk).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Collaborator rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("The request timed out")]
    TimedOut,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The message the collaborator itself supplied, if any.
    pub fn collaborator_message(&self) -> Option<&str> {
        match self {
            PortError::Rejected { message, .. } if !message.trim().is_empty() => {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Request Types
//=========================================================================================

/// The payload of a check-answer call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCheckRequest {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question_index: usize,
    pub answer: String,
    pub correct_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    pub explanation: String,
}

//=========================================================================================
// Collaborator Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ContentGenerationService: Send + Sync {
    /// Generates a lesson from a topic and/or an attached PDF.
    async fn generate_content(&self, request: &LessonRequest) -> PortResult<LessonContent>;
}

#[async_trait]
pub trait SummaryComparisonService: Send + Sync {
    /// Grades a learner summary against the lesson, in light of earlier feedback.
    async fn compare_summary(
        &self,
        original_content: &str,
        user_summary: &str,
        previous_feedback: Option<&ComparisonResult>,
    ) -> PortResult<ComparisonResult>;
}

#[async_trait]
pub trait QuizGenerationService: Send + Sync {
    /// Authors a quiz for the lesson body. The shape is checked by the caller.
    async fn generate_quiz(&self, content: &str) -> PortResult<QuizPayload>;
}

#[async_trait]
pub trait AnswerCheckService: Send + Sync {
    async fn check_answer(&self, request: &AnswerCheckRequest) -> PortResult<AnswerVerdict>;
}

//=========================================================================================
// Storage Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait RevisionStore: Send + Sync {
    async fn append_revision(&self, entry: &RevisionEntry) -> PortResult<()>;

    /// Entries for a learner in the order they were recorded.
    async fn list_revisions(&self, learner_id: Uuid) -> PortResult<Vec<RevisionEntry>>;

    async fn get_revision(&self, learner_id: Uuid, id: Uuid) -> PortResult<RevisionEntry>;

    async fn delete_revision(&self, learner_id: Uuid, id: Uuid) -> PortResult<()>;

    /// Removes every entry for a learner and returns how many were removed.
    async fn clear_revisions(&self, learner_id: Uuid) -> PortResult<u64>;
}

#[async_trait]
pub trait JourneyGenerationService: Send + Sync {
    /// Writes lesson text for a topic. Wanted pictures are marked with
    /// `[image_descriptor_start]search terms[image_descriptor_end]` blocks.
    async fn generate_journey_text(&self, topic: &str) -> PortResult<String>;
}

#[async_trait]
pub trait ImageSearchService: Send + Sync {
    /// The URL of the best image for a search phrase, if any was found.
    async fn find_image(&self, descriptor: &str) -> PortResult<Option<String>>;
}

#[async_trait]
pub trait JourneyPageStore: Send + Sync {
    async fn save_page(&self, filename: &str, html: &str) -> PortResult<()>;

    async fn load_page(&self, filename: &str) -> PortResult<String>;
}
