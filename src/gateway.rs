//! # Summarization gateway
//!
//! Client for the external text-generation service.
//!
//! Builds a single prompt from the blended mission context, the previous
//! question, and the current question, and sends it as a chat completion to
//! an OpenAI-compatible API. This is the one external dependency boundary in
//! the core: every failure of the collaborator — timeout, transport error,
//! missing content in the payload — is absorbed here and converted into a
//! user-facing warning string instead of propagating as an error. Requests
//! are bounded by a configurable timeout and are never retried.

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
    },
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::BoxError;
use crate::config::AstroConfig;

/// Returned when the model replied without usable content.
pub const MALFORMED_RESPONSE: &str = "⚠️ Model response missing or malformed.";

/// Prefix attached to absorbed gateway failures.
pub const ERROR_PREFIX: &str = "⚠️ Error: ";

/// Summarization client over an OpenAI-compatible chat completion API.
pub struct SummaryGateway {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u16,
    timeout: Duration,
}

impl SummaryGateway {
    /// Create a gateway from the service configuration.
    pub fn new(config: &AstroConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.clone())
            .with_api_base(config.api_base.clone());
        debug!("Gateway client created for {}", config.api_base);

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            max_tokens: config.context_max_tokens,
            timeout: Duration::from_secs(config.gateway_timeout_secs),
        }
    }

    /// Build the summarization prompt.
    ///
    /// Fixed framing plus the blended context, the previous question, and the
    /// current question, in that order.
    pub fn build_prompt(context: &str, previous_question: &str, question: &str) -> String {
        format!(
            "You are a helpful assistant for the Indian Space Science Data Centre (ISSDC).\n\
             Answer the user's question based only on the mission-related context below.\n\
             Avoid unnecessary repetition and be concise.\n\
             \n\
             ### Context:\n\
             {context}\n\
             \n\
             ### Previous Question:\n\
             {previous_question}\n\
             \n\
             ### Current Question:\n\
             {question}\n\
             \n\
             ### Answer:"
        )
    }

    /// Summarize `context` with respect to `question`.
    ///
    /// Never fails: a transport error, a timeout, or an unusable payload all
    /// come back as a warning-prefixed string that the caller delivers as a
    /// normal answer.
    pub async fn summarize(
        &self,
        context: &str,
        previous_question: &str,
        question: &str,
    ) -> String {
        match self.request(context, previous_question, question).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Summarization failed: {e}");
                format!("{ERROR_PREFIX}{e}")
            }
        }
    }

    async fn request(
        &self,
        context: &str,
        previous_question: &str,
        question: &str,
    ) -> Result<String, BoxError> {
        let prompt = Self::build_prompt(context, previous_question, question);

        let message = ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(prompt),
            name: None,
        });

        let request = CreateChatCompletionRequestArgs::default()
            .max_tokens(self.max_tokens)
            .model(self.model.clone())
            .messages(vec![message])
            .build()?;

        debug!("Sending summarization request: {:?}", request);

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                format!(
                    "summarization request timed out after {}s",
                    self.timeout.as_secs()
                )
            })??;

        let mut response_string = String::new();
        response.choices.iter().for_each(|chat_choice| {
            if let Some(ref message_text) = chat_choice.message.content {
                response_string.push_str(message_text);
            }
        });

        if response_string.is_empty() {
            return Ok(MALFORMED_RESPONSE.to_string());
        }

        Ok(response_string)
    }
}
