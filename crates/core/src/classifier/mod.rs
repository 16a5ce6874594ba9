//! Ticket classification.
//!
//! A [`Classifier`] backend may fail; [`ClassifierService`] wraps the active
//! backend and always produces a [`Category`], falling back to
//! [`Category::Other`].

mod keyword;
mod llm;
mod service;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::{ClassifierBackend, ClassifierConfig};
use crate::llm::{create_llm_client, LlmError};
use crate::storage::Category;

pub use keyword::KeywordClassifier;
pub use llm::LlmClassifier;
pub use service::ClassifierService;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Unrecognized label in model output: {0}")]
    UnrecognizedLabel(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Identity of the active backend, reported on spans and health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendInfo {
    pub backend: String,
    pub model: String,
    pub device: String,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    fn info(&self) -> BackendInfo;

    /// Load whatever the backend needs before the first request.
    async fn warm_up(&self) -> Result<(), ClassifierError> {
        Ok(())
    }

    async fn classify(&self, subject: &str, body: &str) -> Result<Category, ClassifierError>;
}

/// Build the configured backend wrapped in a [`ClassifierService`].
pub fn create_classifier(config: &ClassifierConfig) -> Result<ClassifierService, ClassifierError> {
    let backend: Arc<dyn Classifier> = match config.backend {
        ClassifierBackend::Keyword => Arc::new(KeywordClassifier::new()),
        ClassifierBackend::Llm => {
            let llm_config = config.llm.as_ref().ok_or_else(|| {
                ClassifierError::Unavailable("classifier.llm section is missing".to_string())
            })?;
            let client = create_llm_client(llm_config)?;
            Arc::new(LlmClassifier::new(client).with_max_tokens(llm_config.max_tokens))
        }
    };

    Ok(ClassifierService::new(backend, config.timeout()))
}
