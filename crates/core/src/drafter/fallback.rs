use async_trait::async_trait;

use super::{DraftError, Drafter};
use crate::storage::Category;

/// Deterministic drafter that never leaves the process.
#[derive(Debug, Default, Clone)]
pub struct FallbackDrafter;

impl FallbackDrafter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Drafter for FallbackDrafter {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn draft(
        &self,
        subject: &str,
        _body: &str,
        category: Category,
    ) -> Result<String, DraftError> {
        Ok(format!(
            "[FALLBACK RESPONSE] Category={}. Thank you for your message about '{}'.",
            category, subject
        ))
    }
}
