//! Lifecycle events for schema bootstrapping
//!
//! Every event is logged through `tracing` and kept in an in-memory history so
//! callers can inspect the path a run took.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// All lifecycle events a bootstrap run can emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BootstrapEvent {
    /// Bootstrap process started
    BootstrapStarted { database: String, mode: String },

    /// The run moved into a new lifecycle phase
    PhaseEntered { phase: String },

    /// Schema text was executed and committed
    SchemaApplied {
        strategy: String,
        bytes: usize,
        statements: usize,
    },

    /// Bootstrap completed successfully
    BootstrapCompleted {
        database: String,
        duration_ms: u64,
        tables: Vec<String>,
    },

    /// Bootstrap failed
    BootstrapFailed {
        database: String,
        error: String,
        phase: String,
    },
}

impl BootstrapEvent {
    /// Get the event type name for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::BootstrapStarted { .. } => "SCHEMA_BOOTSTRAP_STARTED",
            Self::PhaseEntered { .. } => "SCHEMA_BOOTSTRAP_PHASE",
            Self::SchemaApplied { .. } => "SCHEMA_BOOTSTRAP_APPLIED",
            Self::BootstrapCompleted { .. } => "SCHEMA_BOOTSTRAP_COMPLETED",
            Self::BootstrapFailed { .. } => "SCHEMA_BOOTSTRAP_FAILED",
        }
    }

    /// Convert event to a human-readable message.
    pub fn message(&self) -> String {
        match self {
            Self::BootstrapStarted { database, mode } => {
                format!("Bootstrap of {} started ({} mode)", database, mode)
            }
            Self::PhaseEntered { phase } => format!("Entered phase {}", phase),
            Self::SchemaApplied {
                strategy,
                bytes,
                statements,
            } => {
                format!(
                    "Schema applied with {} strategy ({} bytes, {} statements)",
                    strategy, bytes, statements
                )
            }
            Self::BootstrapCompleted {
                database,
                duration_ms,
                tables,
            } => {
                format!(
                    "Bootstrap of {} completed in {}ms ({} tables verified)",
                    database,
                    duration_ms,
                    tables.len()
                )
            }
            Self::BootstrapFailed {
                database,
                error,
                phase,
            } => {
                format!("Bootstrap of {} failed during {}: {}", database, phase, error)
            }
        }
    }

    fn is_failure(&self) -> bool {
        matches!(self, Self::BootstrapFailed { .. })
    }
}

/// Records lifecycle events for one component.
#[derive(Debug, Clone)]
pub struct EventLog {
    component: String,
    history: Vec<BootstrapEvent>,
}

impl EventLog {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            history: Vec::new(),
        }
    }

    /// Log an event and append it to the history.
    pub fn send(&mut self, event: BootstrapEvent) {
        let event_type = event.event_type();
        let message = event.message();

        if event.is_failure() {
            error!(component = %self.component, event = %event_type, "{}", message);
        } else {
            info!(component = %self.component, event = %event_type, "{}", message);
        }

        self.history.push(event);
    }

    /// Events in the order they were sent.
    pub fn events(&self) -> &[BootstrapEvent] {
        &self.history
    }

    /// Phases entered so far, in order.
    pub fn phases(&self) -> Vec<&str> {
        self.history
            .iter()
            .filter_map(|event| match event {
                BootstrapEvent::PhaseEntered { phase } => Some(phase.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Serialize the history as JSON lines.
    pub fn to_json_lines(&self) -> String {
        self.history
            .iter()
            .filter_map(|event| serde_json::to_string(event).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
