//! services/api/src/adapters/tutor_llm.rs
//!
//! This module contains the adapter for the tutoring LLM.
//! It implements the `CompletionService` port from the `core` crate using
//! OpenAI chat completions in streaming mode.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use quiz_review_core::ports::{CompletionService, CompletionStream, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiTutorAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiTutorAdapter {
    /// Creates a new `OpenAiTutorAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for OpenAiTutorAdapter {
    /// Opens a streaming chat completion for the flattened prompt and yields
    /// each text delta in delivery order.
    async fn stream_completion(&self, prompt: &str) -> PortResult<CompletionStream> {
        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .stream(true)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error, which respects the orphan rule.
        let mut upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let stream = async_stream::stream! {
            while let Some(next) = upstream.next().await {
                match next {
                    Ok(response) => {
                        for choice in response.choices {
                            if let Some(content) = choice.delta.content {
                                if !content.is_empty() {
                                    yield Ok(content);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(PortError::Unexpected(e.to_string()));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
