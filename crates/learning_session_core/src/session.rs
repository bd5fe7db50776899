//! crates/learning_session_core/src/session.rs
//!
//! The state machine for one learning session: lesson submission, the
//! summary-comparison loop and the quiz loop.
//!
//! The session lives behind a mutex that is never held across a collaborator
//! call. Each operation marks itself in flight, releases the lock and hands
//! the collaborator call to a spawned task. That task re-locks and applies
//! the result only if the session has not been superseded in the meantime,
//! so the in-flight marker is cleared even when the caller stops waiting.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domain::{
    AnswerKey, AnswerRecord, ComparisonState, LearningSession, LessonRequest, Notification,
    QuestionKind, QuestionRef, QuizState, QuizStatus, SessionStatus,
};
use crate::error::{Operation, SessionError, SessionResult};
use crate::ports::{
    AnswerCheckRequest, AnswerCheckService, ContentGenerationService, PortError,
    QuizGenerationService, SummaryComparisonService,
};

pub const MISSING_INPUT_MESSAGE: &str = "Please enter a topic or upload a PDF.";
pub const CONTENT_FAILED_MESSAGE: &str = "An error occurred while fetching the content.";
pub const COMPARE_FAILED_MESSAGE: &str = "Failed to compare summaries. Please try again.";
pub const QUIZ_FAILED_MESSAGE: &str = "Failed to generate quiz. Please try again.";
pub const QUIZ_FORMAT_MESSAGE: &str = "Quiz data is not in the correct format.";
pub const ANSWER_FAILED_MESSAGE: &str = "Failed to check answer. Please try again.";

/// The four backend collaborators a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub content: Arc<dyn ContentGenerationService>,
    pub comparison: Arc<dyn SummaryComparisonService>,
    pub quiz: Arc<dyn QuizGenerationService>,
    pub answers: Arc<dyn AnswerCheckService>,
}

impl Collaborators {
    /// Uses one backend for all four operations.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ContentGenerationService
            + SummaryComparisonService
            + QuizGenerationService
            + AnswerCheckService
            + 'static,
    {
        Self {
            content: backend.clone(),
            comparison: backend.clone(),
            quiz: backend.clone(),
            answers: backend,
        }
    }
}

fn user_message(error: &PortError, fallback: &str) -> String {
    error
        .collaborator_message()
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// Runs a collaborator call and its write-back on its own task, then waits
/// for it. Dropping the caller's future does not cancel the task.
async fn run_detached<F>(operation: Operation, work: F) -> SessionResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(work).await.map_err(|e| {
        error!("The {} task stopped before finishing: {:?}", operation, e);
        SessionError::Interrupted(operation)
    })
}

pub struct SessionController {
    collaborators: Collaborators,
    state: Arc<Mutex<LearningSession>>,
}

impl SessionController {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            state: Arc::new(Mutex::new(LearningSession::default())),
        }
    }

    /// A copy of the current session.
    pub async fn snapshot(&self) -> LearningSession {
        self.state.lock().await.clone()
    }

    /// Replaces the active session with a saved one. Calls that were started
    /// before the restore will not write their results.
    pub async fn restore(&self, saved: LearningSession) {
        let mut session = self.state.lock().await;
        let epoch = session.epoch + 1;
        *session = saved.settled();
        session.epoch = epoch;
        info!("Session restored (epoch {}).", epoch);
    }

    //=====================================================================================
    // Lesson Submission
    //=====================================================================================

    /// Submits a topic and/or PDF and waits for the lesson.
    ///
    /// Missing input or a collaborator failure leaves the session `errored`
    /// rather than returning an error.
    pub async fn submit(&self, request: LessonRequest) -> SessionResult<()> {
        let epoch = {
            let mut session = self.state.lock().await;
            if session.status == SessionStatus::Loading {
                return Err(SessionError::Busy(Operation::Submit));
            }

            session.epoch += 1;
            session.content = None;
            session.error = None;
            session.comparison = ComparisonState::default();
            session.quiz = QuizState::default();
            session.topic = request.topic.clone();
            session.pdf_name = request.pdf.as_ref().map(|p| p.file_name().to_string());
            session.learning_preference = request.learning_preference;

            if request.is_empty() {
                warn!("Submit rejected: neither a topic nor a PDF was supplied.");
                session.status = SessionStatus::Errored;
                session.error = Some(MISSING_INPUT_MESSAGE.to_string());
                return Ok(());
            }

            session.status = SessionStatus::Loading;
            session.epoch
        };

        info!(
            "Requesting lesson (topic: '{}', pdf: {}, preference: {}).",
            request.topic,
            request.pdf.is_some(),
            request.learning_preference.as_str()
        );
        let content = self.collaborators.content.clone();
        let state = self.state.clone();
        run_detached(Operation::Submit, async move {
            let result = content.generate_content(&request).await;

            let mut session = state.lock().await;
            if session.epoch != epoch {
                info!("Discarding lesson for superseded epoch {}.", epoch);
                return;
            }
            match result {
                Ok(content) => {
                    info!("Lesson loaded with {} subtopics.", content.subtopics.len());
                    session.status = SessionStatus::Loaded;
                    session.content = Some(content);
                }
                Err(e) => {
                    warn!("Lesson request failed: {}", e);
                    session.status = SessionStatus::Errored;
                    session.error = Some(user_message(&e, CONTENT_FAILED_MESSAGE));
                }
            }
        })
        .await
    }

    //=====================================================================================
    // Summary Comparison
    //=====================================================================================

    pub async fn set_user_summary(&self, text: impl Into<String>) -> SessionResult<()> {
        let mut session = self.state.lock().await;
        if session.content.is_none() {
            return Err(SessionError::NotLoaded);
        }
        session.comparison.user_summary = text.into();
        Ok(())
    }

    /// Grades the current summary, carrying the previous result forward.
    pub async fn compare_summary(&self) -> SessionResult<()> {
        let (epoch, body, summary, previous) = {
            let mut session = self.state.lock().await;
            let body = match &session.content {
                Some(content) => content.body.clone(),
                None => return Err(SessionError::NotLoaded),
            };
            if session.comparison.user_summary.trim().is_empty() {
                return Err(SessionError::BlankSummary);
            }
            if session.comparison.comparing {
                return Err(SessionError::Busy(Operation::Compare));
            }
            session.comparison.comparing = true;
            session.comparison.error = None;
            (
                session.epoch,
                body,
                session.comparison.user_summary.clone(),
                session.comparison.previous_feedback.clone(),
            )
        };

        let comparison = self.collaborators.comparison.clone();
        let state = self.state.clone();
        run_detached(Operation::Compare, async move {
            let result = comparison
                .compare_summary(&body, &summary, previous.as_ref())
                .await;

            let mut session = state.lock().await;
            if session.epoch != epoch {
                return;
            }
            session.comparison.comparing = false;
            match result {
                Ok(result) => {
                    info!(
                        "Summary compared: {} correct, {} missing.",
                        result.correct_points.len(),
                        result.missing_points.len()
                    );
                    session.comparison.previous_feedback = Some(result.clone());
                    session.comparison.result = Some(result);
                }
                Err(e) => {
                    warn!("Summary comparison failed: {}", e);
                    session.comparison.error = Some(COMPARE_FAILED_MESSAGE.to_string());
                }
            }
        })
        .await
    }

    //=====================================================================================
    // Quiz Loop
    //=====================================================================================

    /// Generates a fresh quiz, discarding any previous attempt.
    pub async fn generate_quiz(&self) -> SessionResult<()> {
        let (epoch, attempt, body) = {
            let mut session = self.state.lock().await;
            let body = match &session.content {
                Some(content) if !content.body.trim().is_empty() => content.body.clone(),
                Some(_) => return Err(SessionError::EmptyLesson),
                None => return Err(SessionError::NotLoaded),
            };
            if session.quiz.status == QuizStatus::Loading {
                return Err(SessionError::Busy(Operation::Quiz));
            }
            let attempt = session.quiz.attempt + 1;
            session.quiz = QuizState {
                status: QuizStatus::Loading,
                attempt,
                ..QuizState::default()
            };
            (session.epoch, attempt, body)
        };

        let quiz = self.collaborators.quiz.clone();
        let state = self.state.clone();
        run_detached(Operation::Quiz, async move {
            let result = quiz.generate_quiz(&body).await;

            let mut session = state.lock().await;
            if session.epoch != epoch || session.quiz.attempt != attempt {
                return;
            }
            match result {
                Ok(payload) => match payload.into_quiz() {
                    Some(data) => {
                        info!("Quiz ready with {} questions.", data.total_questions());
                        session.quiz.status = QuizStatus::Ready;
                        session.quiz.data = Some(data);
                        session.quiz.active_question_index = 0;
                        session.quiz.answers.clear();
                    }
                    None => {
                        warn!("Quiz response was missing a question list.");
                        session.quiz.status = QuizStatus::Errored;
                        session.quiz.error = Some(QUIZ_FORMAT_MESSAGE.to_string());
                    }
                },
                Err(e) => {
                    warn!("Quiz generation failed: {}", e);
                    session.quiz.status = QuizStatus::Errored;
                    session.quiz.error = Some(user_message(&e, QUIZ_FAILED_MESSAGE));
                }
            }
        })
        .await
    }

    /// Moves to another question. Never calls a collaborator.
    pub async fn navigate(&self, index: usize) -> SessionResult<()> {
        let mut session = self.state.lock().await;
        if session.quiz.status != QuizStatus::Ready {
            return Err(SessionError::QuizNotReady);
        }
        let total = session.quiz.total_questions();
        if index >= total {
            return Err(SessionError::QuestionOutOfRange { index, total });
        }
        session.quiz.active_question_index = index;
        Ok(())
    }

    /// Grades an answer. The first recorded answer for a question is final.
    pub async fn answer_question(
        &self,
        kind: QuestionKind,
        index: usize,
        answer: impl Into<String>,
    ) -> SessionResult<()> {
        let answer = answer.into();
        let key = AnswerKey::new(kind, index);

        let (epoch, attempt, request) = {
            let mut session = self.state.lock().await;
            let quiz = &session.quiz;
            let data = match (&quiz.status, &quiz.data) {
                (QuizStatus::Ready, Some(data)) => data,
                _ => return Err(SessionError::QuizNotReady),
            };
            let question = data
                .question(key)
                .ok_or(SessionError::QuestionOutOfRange {
                    index,
                    total: data.total_questions(),
                })?;
            if quiz.answers.contains_key(&key) {
                return Err(SessionError::AlreadyAnswered(key));
            }
            if quiz.checking.contains(&key) {
                return Err(SessionError::Busy(Operation::AnswerCheck(key)));
            }
            if answer.trim().is_empty() {
                return Err(SessionError::BlankAnswer);
            }

            let request = match question {
                QuestionRef::MultipleChoice(_, q) => AnswerCheckRequest {
                    kind,
                    question_index: index,
                    answer: answer.clone(),
                    correct_answer: q.correct_answer.clone(),
                    keywords: None,
                    explanation: q.explanation.clone(),
                },
                QuestionRef::ShortAnswer(_, q) => AnswerCheckRequest {
                    kind,
                    question_index: index,
                    answer: answer.clone(),
                    correct_answer: q.correct_answer.clone(),
                    keywords: Some(q.keywords.clone()),
                    explanation: q.explanation.clone(),
                },
            };
            let attempt = quiz.attempt;
            session.quiz.checking.insert(key);
            (session.epoch, attempt, request)
        };

        let answers = self.collaborators.answers.clone();
        let state = self.state.clone();
        run_detached(Operation::AnswerCheck(key), async move {
            let result = answers.check_answer(&request).await;

            let mut session = state.lock().await;
            if session.epoch != epoch || session.quiz.attempt != attempt {
                return;
            }
            session.quiz.checking.remove(&key);
            match result {
                Ok(verdict) => {
                    info!("Answer for {} checked (correct: {}).", key, verdict.is_correct);
                    session.quiz.notification = Some(Notification {
                        key,
                        is_correct: Some(verdict.is_correct),
                        message: verdict.feedback.clone(),
                    });
                    session.quiz.answers.insert(
                        key,
                        AnswerRecord {
                            answer,
                            is_correct: verdict.is_correct,
                            feedback: verdict.feedback,
                        },
                    );
                }
                Err(e) => {
                    warn!("Answer check for {} failed: {}", key, e);
                    session.quiz.notification = Some(Notification {
                        key,
                        is_correct: None,
                        message: user_message(&e, ANSWER_FAILED_MESSAGE),
                    });
                }
            }
        })
        .await
    }

    pub async fn dismiss_notification(&self) {
        self.state.lock().await.quiz.notification = None;
    }
}
