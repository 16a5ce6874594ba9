use std::sync::Arc;

use async_trait::async_trait;

use super::{BackendInfo, Classifier, ClassifierError};
use crate::llm::{CompletionRequest, LlmClient};
use crate::storage::Category;

/// Zero-shot classification through an LLM.
pub struct LlmClassifier {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl LlmClassifier {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tokens: 1024,
        }
    }

    /// Reasoning models count hidden tokens against this budget too, so keep
    /// it well above the length of a label.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_prompt(subject: &str, body: &str) -> String {
        let labels = Category::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Subject: {}\nBody: {}\nYou are an expert support agent categorizing issues. \
             Please classify this customer support message as one of: {}. \
             Only choose one label from this list.",
            subject, body, labels
        )
    }

    /// The label that appears first in the reply as a whole word.
    fn parse_label(reply: &str) -> Option<Category> {
        reply
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .find_map(|word| word.parse::<Category>().ok())
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            backend: format!("llm:{}", self.client.provider()),
            model: self.client.model().to_string(),
            device: "remote".to_string(),
        }
    }

    async fn classify(&self, subject: &str, body: &str) -> Result<Category, ClassifierError> {
        let request = CompletionRequest::new(Self::build_prompt(subject, body))
            .with_max_tokens(self.max_tokens);
        let response = self.client.complete(request).await?;

        Self::parse_label(&response.text)
            .ok_or_else(|| ClassifierError::UnrecognizedLabel(response.text.trim().to_string()))
    }
}
