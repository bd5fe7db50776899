//! crates/learning_session_core/src/domain.rs
//!
//! Defines the pure, core data structures for a learning session.
//! These structs know nothing about HTTP or SQL; they are serializable so a
//! whole session can be snapshotted into the revision history.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Session Input
//=========================================================================================

/// How the learner prefers to consume the lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningPreference {
    #[default]
    Reading,
    Video,
}

impl LearningPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningPreference::Reading => "reading",
            LearningPreference::Video => "video",
        }
    }
}

/// A PDF selected for upload. Construction validates that the file is a PDF.
#[derive(Clone)]
pub struct PdfUpload {
    file_name: String,
    bytes: Bytes,
}

impl PdfUpload {
    /// Accepts a file when either its content type or its extension says PDF.
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<&str>,
        bytes: impl Into<Bytes>,
    ) -> Result<Self, crate::error::SessionError> {
        let file_name = file_name.into();
        let type_is_pdf = content_type
            .map(|ct| ct.trim().eq_ignore_ascii_case("application/pdf"))
            .unwrap_or(false);
        let name_is_pdf = file_name.to_ascii_lowercase().ends_with(".pdf");
        if !type_is_pdf && !name_is_pdf {
            return Err(crate::error::SessionError::InvalidUpload(
                "Please upload a PDF file.".to_string(),
            ));
        }
        Ok(Self {
            file_name,
            bytes: bytes.into(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

impl fmt::Debug for PdfUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Everything a single submit sends to the content-generation collaborator.
#[derive(Debug, Clone, Default)]
pub struct LessonRequest {
    pub topic: String,
    pub pdf: Option<PdfUpload>,
    pub learning_preference: LearningPreference,
}

impl LessonRequest {
    pub fn topic(topic: impl Into<String>, learning_preference: LearningPreference) -> Self {
        Self {
            topic: topic.into(),
            pdf: None,
            learning_preference,
        }
    }

    /// A request is empty when it has neither a topic nor an attached PDF.
    pub fn is_empty(&self) -> bool {
        self.topic.trim().is_empty() && self.pdf.is_none()
    }
}

//=========================================================================================
// Lesson Content
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub url: String,
    pub title: String,
    pub duration: String,
    pub view_count: u64,
    pub description: String,
    pub thumbnail_url: Option<String>,
}

/// The lesson returned by the content-generation collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LessonContent {
    pub main_topic: Option<String>,
    /// Newline-delimited paragraphs with image sentinel lines and `**bold**` markers.
    pub body: String,
    pub subtopics: Vec<String>,
    pub images: Vec<String>,
    pub videos: Vec<Video>,
    pub audio_path: Option<String>,
}

//=========================================================================================
// Session
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// The full state of one learning session, including its comparison and quiz sub-state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LearningSession {
    pub status: SessionStatus,
    pub learning_preference: LearningPreference,
    pub topic: String,
    pub pdf_name: Option<String>,
    pub content: Option<LessonContent>,
    pub error: Option<String>,
    pub comparison: ComparisonState,
    pub quiz: QuizState,
    /// Bumped by every submit and restore; results from older epochs are dropped.
    #[serde(default)]
    pub epoch: u64,
}

impl LearningSession {
    /// The heading shown above a loaded lesson.
    pub fn title(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        let base = content
            .main_topic
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(self.topic.as_str())
            .trim()
            .to_string();
        Some(match &self.pdf_name {
            Some(name) if base.is_empty() => name.clone(),
            Some(name) => format!("{} (from {})", base, name),
            None => base,
        })
    }

    pub fn body(&self) -> Option<&str> {
        self.content.as_ref().map(|c| c.body.as_str())
    }

    /// Returns a copy with every in-flight marker cleared, suitable for saving.
    pub fn settled(&self) -> Self {
        let mut copy = self.clone();
        if copy.status == SessionStatus::Loading {
            copy.status = SessionStatus::Idle;
        }
        copy.comparison.comparing = false;
        if copy.quiz.status == QuizStatus::Loading {
            copy.quiz = QuizState::default();
        }
        copy.quiz.checking.clear();
        copy.quiz.notification = None;
        copy
    }
}

//=========================================================================================
// Summary Comparison
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub correct_points: Vec<String>,
    pub missing_points: Vec<String>,
}

/// Congratulation levels the grading collaborator signals through its wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mastery {
    Mastered,
    Complete,
}

impl ComparisonResult {
    pub fn mastery(&self) -> Option<Mastery> {
        if self.correct_points.len() != 2 {
            return None;
        }
        let first = self.correct_points[0].as_str();
        if first.starts_with("Excellent work!") {
            Some(Mastery::Mastered)
        } else if first.starts_with("Excellent understanding!") {
            Some(Mastery::Complete)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComparisonState {
    pub user_summary: String,
    pub result: Option<ComparisonResult>,
    pub previous_feedback: Option<ComparisonResult>,
    pub comparing: bool,
    pub error: Option<String>,
}

//=========================================================================================
// Quiz
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortAnswerQuestion {
    pub question: String,
    pub correct_answer: String,
    pub keywords: Vec<String>,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuizData {
    pub multiple_choice: Vec<MultipleChoiceQuestion>,
    pub short_answer: Vec<ShortAnswerQuestion>,
}

/// A quiz as returned by the collaborator, before its shape has been checked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuizPayload {
    pub multiple_choice: Option<Vec<MultipleChoiceQuestion>>,
    pub short_answer: Option<Vec<ShortAnswerQuestion>>,
}

impl QuizPayload {
    /// Both lists must be present, even when empty.
    pub fn into_quiz(self) -> Option<QuizData> {
        Some(QuizData {
            multiple_choice: self.multiple_choice?,
            short_answer: self.short_answer?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    ShortAnswer,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::ShortAnswer => "short_answer",
        }
    }
}

/// Identifies one question by kind and position within that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnswerKey {
    pub kind: QuestionKind,
    pub index: usize,
}

impl AnswerKey {
    pub fn new(kind: QuestionKind, index: usize) -> Self {
        Self { kind, index }
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.as_str(), self.index)
    }
}

impl std::str::FromStr for AnswerKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, index) = s
            .rsplit_once('_')
            .ok_or_else(|| format!("invalid answer key '{}'", s))?;
        let kind = match kind {
            "multiple_choice" => QuestionKind::MultipleChoice,
            "short_answer" => QuestionKind::ShortAnswer,
            _ => return Err(format!("invalid question kind in '{}'", s)),
        };
        let index = index
            .parse::<usize>()
            .map_err(|_| format!("invalid question index in '{}'", s))?;
        Ok(Self { kind, index })
    }
}

// Answer maps serialize with `multiple_choice_0` style keys.
impl Serialize for AnswerKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AnswerKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A borrowed view of the question at a flat quiz position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuestionRef<'a> {
    MultipleChoice(usize, &'a MultipleChoiceQuestion),
    ShortAnswer(usize, &'a ShortAnswerQuestion),
}

impl QuestionRef<'_> {
    pub fn key(&self) -> AnswerKey {
        match self {
            QuestionRef::MultipleChoice(i, _) => AnswerKey::new(QuestionKind::MultipleChoice, *i),
            QuestionRef::ShortAnswer(i, _) => AnswerKey::new(QuestionKind::ShortAnswer, *i),
        }
    }
}

impl QuizData {
    pub fn total_questions(&self) -> usize {
        self.multiple_choice.len() + self.short_answer.len()
    }

    /// Addresses the multiple-choice list followed by the short-answer list.
    pub fn question_at(&self, flat_index: usize) -> Option<QuestionRef<'_>> {
        let mc = self.multiple_choice.len();
        if flat_index < mc {
            return Some(QuestionRef::MultipleChoice(
                flat_index,
                &self.multiple_choice[flat_index],
            ));
        }
        self.short_answer
            .get(flat_index - mc)
            .map(|q| QuestionRef::ShortAnswer(flat_index - mc, q))
    }

    pub fn question(&self, key: AnswerKey) -> Option<QuestionRef<'_>> {
        match key.kind {
            QuestionKind::MultipleChoice => self
                .multiple_choice
                .get(key.index)
                .map(|q| QuestionRef::MultipleChoice(key.index, q)),
            QuestionKind::ShortAnswer => self
                .short_answer
                .get(key.index)
                .map(|q| QuestionRef::ShortAnswer(key.index, q)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub answer: String,
    pub is_correct: bool,
    pub feedback: String,
}

/// The collaborator's verdict on a submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerVerdict {
    pub is_correct: bool,
    pub feedback: String,
}

/// Transient, dismissible feedback raised by an answer check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub key: AnswerKey,
    pub is_correct: Option<bool>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    #[default]
    NotGenerated,
    Loading,
    Ready,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuizProgress {
    pub answered: usize,
    pub correct: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuizState {
    pub status: QuizStatus,
    pub data: Option<QuizData>,
    pub active_question_index: usize,
    pub answers: BTreeMap<AnswerKey, AnswerRecord>,
    pub error: Option<String>,
    pub checking: BTreeSet<AnswerKey>,
    pub notification: Option<Notification>,
    /// Bumped on every generation so late answer checks for a discarded quiz are dropped.
    #[serde(default)]
    pub attempt: u64,
}

impl QuizState {
    pub fn total_questions(&self) -> usize {
        self.data.as_ref().map_or(0, QuizData::total_questions)
    }

    /// The "no questions generated" condition: a ready quiz with nothing in it.
    pub fn has_no_questions(&self) -> bool {
        self.status == QuizStatus::Ready && self.total_questions() == 0
    }

    pub fn active_question(&self) -> Option<QuestionRef<'_>> {
        self.data.as_ref()?.question_at(self.active_question_index)
    }

    pub fn progress(&self) -> QuizProgress {
        QuizProgress {
            answered: self.answers.len(),
            correct: self.answers.values().filter(|a| a.is_correct).count(),
            total: self.total_questions(),
        }
    }
}

//=========================================================================================
// Revision History
//=========================================================================================

/// A saved snapshot of a past session that the learner can re-enter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionEntry {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub display_name: String,
    pub date_recorded: DateTime<Utc>,
    pub saved_chat_state: LearningSession,
}

/// The screen a learner currently has open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Dashboard,
    Session,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mc(q: &str) -> MultipleChoiceQuestion {
        MultipleChoiceQuestion {
            question: q.to_string(),
            options: vec!["A".into(), "B".into()],
            correct_answer: "A".into(),
            explanation: "because".into(),
        }
    }

    fn sa(q: &str) -> ShortAnswerQuestion {
        ShortAnswerQuestion {
            question: q.to_string(),
            correct_answer: "chlorophyll".into(),
            keywords: vec!["chlorophyll".into()],
            explanation: "pigment".into(),
        }
    }

    #[test]
    fn question_at_walks_multiple_choice_then_short_answer() {
        let quiz = QuizData {
            multiple_choice: vec![mc("m0"), mc("m1")],
            short_answer: vec![sa("s0")],
        };
        assert_eq!(quiz.total_questions(), 3);
        assert_eq!(
            quiz.question_at(1).map(|q| q.key()),
            Some(AnswerKey::new(QuestionKind::MultipleChoice, 1))
        );
        assert_eq!(
            quiz.question_at(2).map(|q| q.key()),
            Some(AnswerKey::new(QuestionKind::ShortAnswer, 0))
        );
        assert!(quiz.question_at(3).is_none());
    }

    #[test]
    fn answer_keys_serialize_as_flat_strings() {
        let mut state = QuizState::default();
        state.answers.insert(
            AnswerKey::new(QuestionKind::MultipleChoice, 0),
            AnswerRecord {
                answer: "B".into(),
                is_correct: false,
                feedback: "nope".into(),
            },
        );
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["answers"]["multiple_choice_0"]["answer"], "B");

        let back: QuizState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn payload_missing_a_list_is_rejected() {
        let payload = QuizPayload {
            multiple_choice: Some(vec![mc("m0")]),
            short_answer: None,
        };
        assert!(payload.into_quiz().is_none());

        let empty = QuizPayload {
            multiple_choice: Some(vec![]),
            short_answer: Some(vec![]),
        };
        assert_eq!(empty.into_quiz().map(|q| q.total_questions()), Some(0));
    }

    #[test]
    fn mastery_is_read_from_the_first_of_two_points() {
        let mastered = ComparisonResult {
            correct_points: vec!["Excellent work! All covered.".into(), "x".into()],
            missing_points: vec![],
        };
        assert_eq!(mastered.mastery(), Some(Mastery::Mastered));

        let complete = ComparisonResult {
            correct_points: vec!["Excellent understanding! Nice.".into(), "x".into()],
            missing_points: vec![],
        };
        assert_eq!(complete.mastery(), Some(Mastery::Complete));

        let three = ComparisonResult {
            correct_points: vec!["Excellent work!".into(), "a".into(), "b".into()],
            missing_points: vec![],
        };
        assert_eq!(three.mastery(), None);
    }

    #[test]
    fn pdf_upload_requires_pdf_type_or_extension() {
        assert!(PdfUpload::new("notes.PDF", None, vec![1u8]).is_ok());
        assert!(PdfUpload::new("scan", Some("application/pdf"), vec![1u8]).is_ok());
        assert!(PdfUpload::new("notes.txt", Some("text/plain"), vec![1u8]).is_err());
    }

    #[test]
    fn title_combines_topic_and_pdf_name() {
        let session = LearningSession {
            topic: "Photosynthesis".into(),
            pdf_name: Some("bio.pdf".into()),
            content: Some(LessonContent::default()),
            ..Default::default()
        };
        assert_eq!(session.title().as_deref(), Some("Photosynthesis (from bio.pdf)"));
    }

    #[test]
    fn settled_clears_in_flight_markers() {
        let mut session = LearningSession {
            status: SessionStatus::Loaded,
            content: Some(LessonContent::default()),
            ..Default::default()
        };
        session.comparison.comparing = true;
        session.quiz.status = QuizStatus::Loading;
        session.quiz.attempt = 2;

        let settled = session.settled();
        assert!(!settled.comparison.comparing);
        assert_eq!(settled.quiz.status, QuizStatus::NotGenerated);
        assert_eq!(settled.status, SessionStatus::Loaded);
    }
}
