//! Response drafting.
//!
//! Unlike classification, a drafting failure is surfaced to the caller: it
//! decides the terminal status of the stored response.

mod fallback;
mod llm;
mod service;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{DrafterConfig, DrafterMode};
use crate::llm::{create_llm_client, LlmError};
use crate::storage::Category;

pub use fallback::FallbackDrafter;
pub use llm::LlmDrafter;
pub use service::DraftingService;

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("Unable to parse response from model")]
    EmptyResponse,

    #[error("Drafter unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Drafter: Send + Sync {
    /// Short identifier used as a metric label.
    fn name(&self) -> &str;

    async fn draft(&self, subject: &str, body: &str, category: Category)
        -> Result<String, DraftError>;
}

/// Build the configured drafter wrapped in a [`DraftingService`].
pub fn create_drafter(config: &DrafterConfig) -> Result<DraftingService, DraftError> {
    let drafter: Arc<dyn Drafter> = match config.mode {
        DrafterMode::Fallback => Arc::new(FallbackDrafter::new()),
        DrafterMode::Llm => {
            let llm_config = config.llm.as_ref().ok_or_else(|| {
                DraftError::Unavailable("drafter.llm section is missing".to_string())
            })?;
            let client = create_llm_client(llm_config)?;
            Arc::new(LlmDrafter::new(client).with_max_tokens(llm_config.max_tokens))
        }
    };

    Ok(DraftingService::new(drafter))
}
