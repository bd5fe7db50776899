//! crates/learning_session_core/src/error.rs
//!
//! Errors raised by the session state machines. Collaborator failures are not
//! reported here: they are stored in the session itself. These variants are
//! rejections that leave the session untouched.

use crate::domain::AnswerKey;
use crate::ports::PortError;
use std::fmt;
use uuid::Uuid;

/// The operation kinds that may each have at most one call in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Submit,
    Compare,
    Quiz,
    AnswerCheck(AnswerKey),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Submit => write!(f, "lesson request"),
            Operation::Compare => write!(f, "summary comparison"),
            Operation::Quiz => write!(f, "quiz generation"),
            Operation::AnswerCheck(key) => write!(f, "answer check for {}", key),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("A {0} is already in progress")]
    Busy(Operation),
    #[error("The {0} was interrupted")]
    Interrupted(Operation),
    #[error("No lesson is loaded")]
    NotLoaded,
    #[error("The summary is empty")]
    BlankSummary,
    #[error("The lesson has no text to build a quiz from")]
    EmptyLesson,
    #[error("No quiz is ready")]
    QuizNotReady,
    #[error("Question {index} is out of range ({total} questions)")]
    QuestionOutOfRange { index: usize, total: usize },
    #[error("The answer is empty")]
    BlankAnswer,
    #[error("Question {0} has already been answered")]
    AlreadyAnswered(AnswerKey),
    #[error("{0}")]
    InvalidUpload(String),
    #[error("Revision {0} not found")]
    RevisionNotFound(Uuid),
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised by the learning journey generator.
#[derive(Debug, thiserror::Error)]
pub enum JourneyError {
    #[error("Please enter a topic")]
    BlankTopic,
    #[error("Learning journey generation is not configured")]
    Disabled,
    #[error(transparent)]
    Port(#[from] PortError),
}
