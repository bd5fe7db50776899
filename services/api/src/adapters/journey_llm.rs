//! services/api/src/adapters/journey_llm.rs
//!
//! This module contains the adapter for the journey-writing LLM.
//! It implements the `JourneyGenerationService` port from the core crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use learning_session_core::ports::{JourneyGenerationService, PortError, PortResult};

const SYSTEM_PROMPT: &str = "You are an expert teacher and visual storyteller. \
Explain the topic you are given in a lively, analogy-driven way with depth. \
Open with a hook-analogy, build the core concepts step by step, explore deeper insights \
and common pitfalls, and conclude with a crisp recap and two or three reflective questions. \
Separate paragraphs with a blank line and mark key terms with **double asterisks**. \
Where a picture would materially help, you may add a block of the form \
[image_descriptor_start]search terms for the image[image_descriptor_end].";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `JourneyGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiJourneyAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiJourneyAdapter {
    /// Creates a new `OpenAiJourneyAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `JourneyGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl JourneyGenerationService for OpenAiJourneyAdapter {
    async fn generate_journey_text(&self, topic: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!("TOPIC: {}", topic))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                PortError::Malformed("Journey LLM response contained no text content.".to_string())
            })
    }
}
