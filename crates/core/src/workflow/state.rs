use std::fmt;

use serde::Serialize;

use crate::metrics::WORKFLOW_TRANSITIONS;

/// States of one ticket run through the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Created,
    Classifying,
    Classified,
    Drafting,
    Completed,
    Failed,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Created => "created",
            WorkflowState::Classifying => "classifying",
            WorkflowState::Classified => "classified",
            WorkflowState::Drafting => "drafting",
            WorkflowState::Completed => "completed",
            WorkflowState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Completed | WorkflowState::Failed)
    }

    /// Whether `next` may follow `self`.
    ///
    /// A manual re-draft starts a fresh run from `Classified`, so terminal
    /// states have no successors here.
    pub fn can_transition_to(&self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        matches!(
            (self, next),
            (Created, Classifying)
                | (Classifying, Classified)
                | (Classified, Drafting)
                | (Drafting, Completed)
                | (Drafting, Failed)
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count and log a state change.
pub(crate) fn record_transition(ticket_id: i64, from: WorkflowState, to: WorkflowState) {
    debug_assert!(from.can_transition_to(to), "illegal transition {} -> {}", from, to);

    WORKFLOW_TRANSITIONS
        .with_label_values(&[from.as_str(), to.as_str()])
        .inc();
    tracing::info!(
        ticket_id,
        event_type = "state_changed",
        from = from.as_str(),
        to = to.as_str(),
        "Ticket {} moved from {} to {}",
        ticket_id,
        from,
        to
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use WorkflowState::*;
        let path = [Created, Classifying, Classified, Drafting, Completed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(Drafting.can_transition_to(Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        use WorkflowState::*;
        assert!(!Created.can_transition_to(Drafting));
        assert!(!Classified.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Drafting));
        assert!(!Failed.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_states() {
        assert!(WorkflowState::Completed.is_terminal());
        assert!(WorkflowState::Failed.is_terminal());
        assert!(!WorkflowState::Drafting.is_terminal());
    }
}
