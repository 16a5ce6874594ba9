use std::sync::Arc;

use helpdesk_core::{Config, SanitizedConfig, SessionFactory, TicketWorkflow};

/// Shared application state
pub struct AppState {
    config: Config,
    workflow: TicketWorkflow,
    sessions: Arc<dyn SessionFactory>,
}

impl AppState {
    pub fn new(config: Config, workflow: TicketWorkflow, sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            config,
            workflow,
            sessions,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn workflow(&self) -> &TicketWorkflow {
        &self.workflow
    }

    /// Factory for read-side sessions used by the query endpoints.
    pub fn sessions(&self) -> &dyn SessionFactory {
        self.sessions.as_ref()
    }

    /// Shared secret for the inbound webhook, if one is configured.
    pub fn inbound_secret(&self) -> Option<&str> {
        self.config
            .inbound
            .shared_secret
            .as_deref()
            .filter(|s| !s.is_empty())
    }
}
