//! Logging sink injected into the change detector and the coordinator
//!
//! The sink has a single formatted-write capability. Severity is carried by
//! the message text only: failure messages start with `error:`.

use std::fmt;

/// Formatted-message sink
pub trait Logger: Send + Sync {
    /// Write one formatted message
    fn log(&self, message: fmt::Arguments<'_>);
}

/// [`Logger`] that forwards every message to `tracing`
///
/// Messages starting with `error:` are emitted at WARN, everything else at
/// INFO. The `component` field identifies the writer.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: String,
}

impl TracingLogger {
    /// Create a logger tagging its events with `component`
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// The component name attached to every event
    pub fn component(&self) -> &str {
        &self.component
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("ddns-sync")
    }
}

impl Logger for TracingLogger {
    fn log(&self, message: fmt::Arguments<'_>) {
        let message = message.to_string();
        if message.starts_with("error:") {
            tracing::warn!(component = %self.component, "{}", message);
        } else {
            tracing::info!(component = %self.component, "{}", message);
        }
    }
}
