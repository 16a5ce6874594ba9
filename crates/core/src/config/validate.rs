use super::{
    types::{ClassifierBackend, Config, DrafterMode, LlmConfig, LlmProvider},
    ConfigError,
};

/// Validate configuration
///
/// Rejects a zero port, a zero-capacity event queue, and LLM-backed
/// capabilities without a usable `llm` section.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.events.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "events.queue_capacity must be at least 1".to_string(),
        ));
    }

    if config.classifier.backend == ClassifierBackend::Llm {
        validate_llm("classifier", config.classifier.llm.as_ref())?;
    }

    if config.drafter.mode == DrafterMode::Llm {
        validate_llm("drafter", config.drafter.llm.as_ref())?;
    }

    Ok(())
}

fn validate_llm(section: &str, llm: Option<&LlmConfig>) -> Result<(), ConfigError> {
    let llm = llm.ok_or_else(|| {
        ConfigError::ValidationError(format!("{section}.llm is required for the llm backend"))
    })?;

    if llm.model.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{section}.llm.model cannot be empty"
        )));
    }

    if llm.provider == LlmProvider::OpenAi && llm.api_key.as_deref().unwrap_or("").is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{section}.llm.api_key is required for the openai provider"
        )));
    }

    Ok(())
}
