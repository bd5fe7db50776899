//! services/api/src/adapters/backend.rs
//!
//! This module contains the adapter for the teaching backend. It implements the
//! four collaborator ports from the core crate over HTTP with `reqwest`.
//!
//! Non-success responses carry `{ "error": "..." }`; that message is kept in
//! `PortError::Rejected` so the session can show it to the learner.

use std::time::Duration;

use async_trait::async_trait;
use learning_session_core::domain::{
    AnswerVerdict, ComparisonResult, LessonContent, LessonRequest, MultipleChoiceQuestion,
    QuizPayload, ShortAnswerQuestion, Video,
};
use learning_session_core::ports::{
    AnswerCheckRequest, AnswerCheckService, ContentGenerationService, PortError, PortResult,
    QuizGenerationService, SummaryComparisonService,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements every collaborator port against one backend.
#[derive(Clone)]
pub struct HttpBackendAdapter {
    client: Client,
    base_url: String,
}

impl HttpBackendAdapter {
    /// Creates a new `HttpBackendAdapter`. Requests never time out unless a timeout is given.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request and decodes a successful JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> PortResult<T> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_default();
            warn!("Backend responded with {}: {}", status, message);
            return Err(PortError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                PortError::TimedOut
            } else {
                PortError::Malformed(e.to_string())
            }
        })
    }
}

fn transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::TimedOut
    } else {
        PortError::Unexpected(e.to_string())
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Serialize)]
struct TeachBody<'a> {
    topic: &'a str,
    learning_preference: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoRecord {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    view_count: u64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnail_url: Option<String>,
}
impl VideoRecord {
    fn to_domain(self) -> Video {
        Video {
            url: self.url,
            title: self.title,
            duration: self.duration,
            view_count: self.view_count,
            description: self.description,
            thumbnail_url: self.thumbnail_url.filter(|u| !u.trim().is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct TeachResponse {
    content: String,
    #[serde(default)]
    subtopics: Vec<String>,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    videos: Option<Vec<VideoRecord>>,
    #[serde(default)]
    audio_path: Option<String>,
    #[serde(default)]
    main_topic: Option<String>,
}
impl TeachResponse {
    fn to_domain(self) -> LessonContent {
        LessonContent {
            main_topic: self.main_topic,
            body: self.content,
            subtopics: self.subtopics,
            images: self.images,
            videos: self
                .videos
                .unwrap_or_default()
                .into_iter()
                .map(VideoRecord::to_domain)
                .collect(),
            audio_path: self.audio_path.filter(|p| !p.trim().is_empty()),
        }
    }
}

#[derive(Serialize)]
struct CompareBody<'a> {
    original_content: &'a str,
    user_summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_feedback: Option<&'a ComparisonResult>,
}

#[derive(Deserialize)]
struct CompareResponse {
    #[serde(default)]
    correct_points: Vec<String>,
    #[serde(default)]
    missing_points: Vec<String>,
}

#[derive(Serialize)]
struct QuizBody<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct MultipleChoiceRecord {
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    correct_answer: String,
    #[serde(default)]
    explanation: String,
}

#[derive(Deserialize)]
struct ShortAnswerRecord {
    question: String,
    #[serde(alias = "correctAnswer")]
    correct_answer: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    explanation: String,
}

#[derive(Deserialize, Default)]
struct QuizRecord {
    multiple_choice: Option<Vec<MultipleChoiceRecord>>,
    short_answer: Option<Vec<ShortAnswerRecord>>,
}

#[derive(Deserialize)]
struct QuizResponse {
    quiz: Option<QuizRecord>,
}
impl QuizResponse {
    /// A missing list stays `None`; the session decides whether the shape is acceptable.
    fn to_domain(self) -> QuizPayload {
        let quiz = self.quiz.unwrap_or_default();
        QuizPayload {
            multiple_choice: quiz.multiple_choice.map(|list| {
                list.into_iter()
                    .map(|q| MultipleChoiceQuestion {
                        question: q.question,
                        options: q.options,
                        correct_answer: q.correct_answer,
                        explanation: q.explanation,
                    })
                    .collect()
            }),
            short_answer: quiz.short_answer.map(|list| {
                list.into_iter()
                    .map(|q| ShortAnswerQuestion {
                        question: q.question,
                        correct_answer: q.correct_answer,
                        keywords: q.keywords,
                        explanation: q.explanation,
                    })
                    .collect()
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerdictResponse {
    is_correct: bool,
    #[serde(default)]
    feedback: String,
}

//=========================================================================================
// Collaborator Trait Implementations
//=========================================================================================

#[async_trait]
impl ContentGenerationService for HttpBackendAdapter {
    /// Sends JSON for a topic-only request and multipart when a PDF is attached.
    async fn generate_content(&self, request: &LessonRequest) -> PortResult<LessonContent> {
        let builder = self.client.post(self.url("/api/teach"));
        let builder = match &request.pdf {
            Some(pdf) => {
                let part = Part::bytes(pdf.bytes().to_vec())
                    .file_name(pdf.file_name().to_string())
                    .mime_str("application/pdf")
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
                let form = Form::new()
                    .text("topic", request.topic.clone())
                    .text(
                        "learning_preference",
                        request.learning_preference.as_str().to_string(),
                    )
                    .part("pdf", part);
                builder.multipart(form)
            }
            None => builder.json(&TeachBody {
                topic: &request.topic,
                learning_preference: request.learning_preference.as_str(),
            }),
        };
        debug!("Requesting lesson for '{}'.", request.topic);
        let response: TeachResponse = self.send(builder).await?;
        Ok(response.to_domain())
    }
}

#[async_trait]
impl SummaryComparisonService for HttpBackendAdapter {
    async fn compare_summary(
        &self,
        original_content: &str,
        user_summary: &str,
        previous_feedback: Option<&ComparisonResult>,
    ) -> PortResult<ComparisonResult> {
        let builder = self.client.post(self.url("/api/compare")).json(&CompareBody {
            original_content,
            user_summary,
            previous_feedback,
        });
        let response: CompareResponse = self.send(builder).await?;
        Ok(ComparisonResult {
            correct_points: response.correct_points,
            missing_points: response.missing_points,
        })
    }
}

#[async_trait]
impl QuizGenerationService for HttpBackendAdapter {
    async fn generate_quiz(&self, content: &str) -> PortResult<QuizPayload> {
        let builder = self
            .client
            .post(self.url("/api/generate-quiz"))
            .json(&QuizBody { content });
        let response: QuizResponse = self.send(builder).await?;
        Ok(response.to_domain())
    }
}

#[async_trait]
impl AnswerCheckService for HttpBackendAdapter {
    async fn check_answer(&self, request: &AnswerCheckRequest) -> PortResult<AnswerVerdict> {
        let builder = self.client.post(self.url("/api/check-answer")).json(request);
        let response: VerdictResponse = self.send(builder).await?;
        Ok(AnswerVerdict {
            is_correct: response.is_correct,
            feedback: response.feedback,
        })
    }
}
