//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API server.
//!
//! Responses are display-ready views: lesson bodies arrive already split into
//! paragraphs and images, and the quiz view exposes the active question without
//! its answer until the learner has answered it.

use chrono::{DateTime, Utc};
use learning_session_core::domain::{
    AnswerKey, AnswerRecord, ComparisonResult, LearningPreference, LearningSession, Mastery,
    Notification, QuestionKind, QuestionRef, QuizProgress, QuizState, RevisionEntry, Screen,
    Video,
};
use learning_session_core::lesson::{self, LessonTab, LessonUnit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Payloads Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Asks for a lesson on a topic.
#[derive(Deserialize, Debug, ToSchema)]
pub struct SubmitRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    #[schema(value_type = String, example = "reading")]
    pub learning_preference: LearningPreference,
}

/// Replaces the learner's summary draft.
#[derive(Deserialize, Debug, ToSchema)]
pub struct SummaryRequest {
    pub text: String,
}

/// Moves the quiz to another question.
#[derive(Deserialize, Debug, ToSchema)]
pub struct NavigateRequest {
    pub index: usize,
}

/// Submits an answer to one question.
#[derive(Deserialize, Debug, ToSchema)]
pub struct AnswerRequest {
    #[schema(value_type = String, example = "multiple_choice")]
    pub kind: QuestionKind,
    pub index: usize,
    pub answer: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ScreenRequest {
    #[schema(value_type = String, example = "dashboard")]
    pub screen: Screen,
}

/// Saves the current session. The lesson title is used when no name is given.
#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct SaveRevisionRequest {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct JourneyRequest {
    #[serde(default)]
    pub topic: String,
}

//=========================================================================================
// Payloads Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct VideoView {
    pub title: String,
    pub url: String,
    pub embed_url: String,
    pub duration: String,
    pub view_count: u64,
    pub description: String,
    pub thumbnail_url: Option<String>,
}

impl From<&Video> for VideoView {
    fn from(video: &Video) -> Self {
        Self {
            title: video.title.clone(),
            url: video.url.clone(),
            embed_url: lesson::embed_url(&video.url),
            duration: video.duration.clone(),
            view_count: video.view_count,
            description: video.description.clone(),
            thumbnail_url: video.thumbnail_url.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct LessonView {
    pub title: String,
    pub subtopics: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub units: Vec<LessonUnit>,
    #[schema(value_type = Vec<Object>)]
    pub tabs: Vec<LessonTab>,
    /// Only offered to learners who prefer video.
    pub featured_video: Option<VideoView>,
    pub videos: Vec<VideoView>,
    pub audio_path: Option<String>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct ComparisonView {
    pub user_summary: String,
    pub comparing: bool,
    #[schema(value_type = Object)]
    pub result: Option<ComparisonResult>,
    #[schema(value_type = Object)]
    pub previous_feedback: Option<ComparisonResult>,
    #[schema(value_type = String)]
    pub mastery: Option<Mastery>,
    pub error: Option<String>,
}

/// A question as the learner sees it.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct QuestionView {
    #[schema(value_type = String, example = "multiple_choice_0")]
    pub key: AnswerKey,
    pub position: usize,
    pub question: String,
    /// Empty for short-answer questions.
    pub options: Vec<String>,
    #[schema(value_type = Object)]
    pub answer: Option<AnswerRecord>,
    /// Only revealed once the question has been answered.
    pub explanation: Option<String>,
    pub checking: bool,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct QuizView {
    #[schema(value_type = String)]
    pub status: learning_session_core::domain::QuizStatus,
    pub active_question_index: usize,
    pub total_questions: usize,
    /// A ready quiz with no questions in it.
    pub no_questions: bool,
    pub active_question: Option<QuestionView>,
    #[schema(value_type = Object)]
    pub answers: BTreeMap<AnswerKey, AnswerRecord>,
    #[schema(value_type = Object)]
    pub progress: QuizProgress,
    #[schema(value_type = Object)]
    pub notification: Option<Notification>,
    pub error: Option<String>,
}

impl QuizView {
    fn from_state(quiz: &QuizState) -> Self {
        let active_question = quiz.active_question().map(|question| {
            let key = question.key();
            let answer = quiz.answers.get(&key).cloned();
            let (text, options, explanation) = match question {
                QuestionRef::MultipleChoice(_, q) => {
                    (q.question.clone(), q.options.clone(), q.explanation.clone())
                }
                QuestionRef::ShortAnswer(_, q) => {
                    (q.question.clone(), Vec::new(), q.explanation.clone())
                }
            };
            QuestionView {
                key,
                position: quiz.active_question_index,
                question: text,
                options,
                explanation: answer.as_ref().map(|_| explanation),
                answer,
                checking: quiz.checking.contains(&key),
            }
        });
        Self {
            status: quiz.status,
            active_question_index: quiz.active_question_index,
            total_questions: quiz.total_questions(),
            no_questions: quiz.has_no_questions(),
            active_question,
            answers: quiz.answers.clone(),
            progress: quiz.progress(),
            notification: quiz.notification.clone(),
            error: quiz.error.clone(),
        }
    }
}

/// Everything the client needs to draw the current screen.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct SessionView {
    #[schema(value_type = String, example = "session")]
    pub screen: Screen,
    #[schema(value_type = String, example = "loaded")]
    pub status: learning_session_core::domain::SessionStatus,
    #[schema(value_type = String, example = "reading")]
    pub learning_preference: LearningPreference,
    pub topic: String,
    pub pdf_name: Option<String>,
    pub error: Option<String>,
    pub lesson: Option<LessonView>,
    pub comparison: ComparisonView,
    pub quiz: QuizView,
}

impl SessionView {
    pub fn new(session: &LearningSession, screen: Screen) -> Self {
        let lesson = session.content.as_ref().map(|content| {
            let videos: Vec<VideoView> = content.videos.iter().map(VideoView::from).collect();
            LessonView {
                title: session.title().unwrap_or_default(),
                subtopics: content.subtopics.clone(),
                units: lesson::lesson_units(&content.body, &content.images),
                tabs: lesson::available_tabs(session.learning_preference, content),
                featured_video: match session.learning_preference {
                    LearningPreference::Video => {
                        lesson::featured_video(&content.videos).map(VideoView::from)
                    }
                    LearningPreference::Reading => None,
                },
                videos,
                audio_path: content.audio_path.clone(),
            }
        });
        let comparison = &session.comparison;
        Self {
            screen,
            status: session.status,
            learning_preference: session.learning_preference,
            topic: session.topic.clone(),
            pdf_name: session.pdf_name.clone(),
            error: session.error.clone(),
            lesson,
            comparison: ComparisonView {
                user_summary: comparison.user_summary.clone(),
                comparing: comparison.comparing,
                mastery: comparison.result.as_ref().and_then(ComparisonResult::mastery),
                result: comparison.result.clone(),
                previous_feedback: comparison.previous_feedback.clone(),
                error: comparison.error.clone(),
            },
            quiz: QuizView::from_state(&session.quiz),
        }
    }
}

/// One row of the revision list.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct RevisionSummary {
    pub id: Uuid,
    pub display_name: String,
    pub date_recorded: DateTime<Utc>,
}

impl From<&RevisionEntry> for RevisionSummary {
    fn from(entry: &RevisionEntry) -> Self {
        Self {
            id: entry.id,
            display_name: entry.display_name.clone(),
            date_recorded: entry.date_recorded,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ClearedResponse {
    pub removed: u64,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct JourneyResponse {
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use learning_session_core::domain::{
        LessonContent, MultipleChoiceQuestion, QuizData, QuizStatus, SessionStatus,
    };

    fn loaded_session() -> LearningSession {
        let mut session = LearningSession {
            status: SessionStatus::Loaded,
            topic: "Plants".into(),
            content: Some(LessonContent {
                body: "Leaves are **green**.\n\nhttps://img.example/leaf.png".into(),
                images: vec!["https://img.example/leaf.png".into()],
                ..Default::default()
            }),
            ..Default::default()
        };
        session.quiz.status = QuizStatus::Ready;
        session.quiz.data = Some(QuizData {
            multiple_choice: vec![MultipleChoiceQuestion {
                question: "Colour?".into(),
                options: vec!["Green".into(), "Blue".into()],
                correct_answer: "Green".into(),
                explanation: "Chlorophyll".into(),
            }],
            short_answer: vec![],
        });
        session
    }

    #[test]
    fn lesson_body_is_split_into_units() {
        let view = SessionView::new(&loaded_session(), Screen::Session);
        let lesson = view.lesson.unwrap();
        assert_eq!(lesson.title, "Plants");
        assert_eq!(lesson.units.len(), 2);
        assert!(matches!(lesson.units[1], LessonUnit::Image { .. }));
    }

    #[test]
    fn explanations_stay_hidden_until_answered() {
        let mut session = loaded_session();
        let unanswered = SessionView::new(&session, Screen::Session);
        let question = unanswered.quiz.active_question.unwrap();
        assert_eq!(question.key.to_string(), "multiple_choice_0");
        assert!(question.explanation.is_none());

        session.quiz.answers.insert(
            question.key,
            AnswerRecord {
                answer: "Green".into(),
                is_correct: true,
                feedback: "Yes".into(),
            },
        );
        let answered = SessionView::new(&session, Screen::Session);
        let question = answered.quiz.active_question.unwrap();
        assert_eq!(question.explanation.as_deref(), Some("Chlorophyll"));
        assert_eq!(answered.quiz.progress.correct, 1);
    }

    #[test]
    fn the_featured_video_follows_the_learning_preference() {
        let mut session = loaded_session();
        if let Some(content) = session.content.as_mut() {
            content.videos = vec![
                Video {
                    url: "https://www.youtube.com/watch?v=a".into(),
                    title: "Short".into(),
                    duration: "1:00".into(),
                    view_count: 10,
                    description: String::new(),
                    thumbnail_url: None,
                },
                Video {
                    url: "https://www.youtube.com/watch?v=b".into(),
                    title: "Popular".into(),
                    duration: "9:00".into(),
                    view_count: 900,
                    description: String::new(),
                    thumbnail_url: None,
                },
            ];
        }

        let reading = SessionView::new(&session, Screen::Session).lesson.unwrap();
        assert!(reading.featured_video.is_none());
        assert_eq!(reading.videos.len(), 2);

        session.learning_preference = LearningPreference::Video;
        let video = SessionView::new(&session, Screen::Session).lesson.unwrap();
        let featured = video.featured_video.unwrap();
        assert_eq!(featured.title, "Popular");
        assert_eq!(featured.embed_url, "https://www.youtube.com/embed/b");
    }
}
