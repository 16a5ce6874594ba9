use std::sync::Arc;

use async_trait::async_trait;

use super::{DraftError, Drafter};
use crate::llm::{CompletionRequest, LlmClient};
use crate::storage::Category;

const SYSTEM_PROMPT: &str = "You are an expert support agent.";

/// Drafts replies through an LLM.
pub struct LlmDrafter {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl LlmDrafter {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tokens: 1024,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_prompt(subject: &str, body: &str, category: Category) -> String {
        format!(
            "A customer has written to support.\n\n\
             Category: {category}\n\
             Subject: {subject}\n\
             Message:\n{body}\n\n\
             Write a concise, friendly reply that addresses the customer's issue. \
             Do not invent account details or promise actions you cannot verify. \
             Reply with the message text only."
        )
    }
}

#[async_trait]
impl Drafter for LlmDrafter {
    fn name(&self) -> &str {
        "llm"
    }

    async fn draft(
        &self,
        subject: &str,
        body: &str,
        category: Category,
    ) -> Result<String, DraftError> {
        let request = CompletionRequest::new(Self::build_prompt(subject, body, category))
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.max_tokens);

        let response = self.client.complete(request).await?;
        let text = response.text.trim();
        if text.is_empty() {
            return Err(DraftError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
