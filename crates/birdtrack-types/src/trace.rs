//! Execution traces captured for sampled storage operations.
//!
//! A trace is an ordered list of `(elapsed, description)` events reported by
//! the store for one statement. Traces are diagnostic only: nothing else in
//! the system reads them back.

use core::fmt::Write as _;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One step reported by the store while executing a traced statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Microseconds since the coordinator started the request, if reported.
    pub source_elapsed_micros: Option<i32>,
    /// Human-readable activity description.
    pub description: String,
}

impl TraceEvent {
    /// Create a trace event.
    pub fn new(source_elapsed_micros: Option<i32>, description: impl Into<String>) -> Self {
        Self {
            source_elapsed_micros,
            description: description.into(),
        }
    }
}

/// The execution trace of a single statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTrace {
    /// Short label of the traced operation (e.g. `insert`, `select_latest`).
    pub operation: String,
    /// Store-side tracing session, when the store exposes one.
    pub session_id: Option<Uuid>,
    /// Ordered trace events. Empty for an opaque trace.
    pub events: Vec<TraceEvent>,
}

impl QueryTrace {
    /// A trace with structured events.
    pub fn new(operation: impl Into<String>, session_id: Option<Uuid>, events: Vec<TraceEvent>) -> Self {
        Self {
            operation: operation.into(),
            session_id,
            events,
        }
    }

    /// A trace the store only exposes as a session handle.
    pub fn opaque(operation: impl Into<String>, session_id: Uuid) -> Self {
        Self::new(operation, Some(session_id), Vec::new())
    }

    /// Whether the trace carries no structured events.
    pub fn is_opaque(&self) -> bool {
        self.events.is_empty()
    }

    /// Render the trace as the text block written to trace logs.
    ///
    /// One `elapsed - description` line per event, followed by a blank
    /// separator. Opaque traces render their session handle instead.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.is_opaque() {
            let session = self
                .session_id
                .map_or_else(|| String::from("unknown"), |id| id.to_string());
            let _ = writeln!(out, "{} - trace session {session}", self.operation);
        }
        for event in &self.events {
            match event.source_elapsed_micros {
                Some(elapsed) => {
                    let _ = writeln!(out, "{elapsed} - {}", event.description);
                }
                None => {
                    let _ = writeln!(out, "- - {}", event.description);
                }
            }
        }
        out.push_str("\n\n");
        out
    }
}

/// Destination for sampled execution traces.
///
/// Storage operations accept an optional sink. When one is supplied the
/// statement is executed with tracing enabled and its trace is appended.
pub trait TraceSink {
    /// Append one trace.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the trace cannot be recorded.
    fn append(&mut self, trace: &QueryTrace) -> std::io::Result<()>;
}

impl TraceSink for Vec<QueryTrace> {
    fn append(&mut self, trace: &QueryTrace) -> std::io::Result<()> {
        self.push(trace.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_lists_events_then_separator() {
        let trace = QueryTrace::new(
            "insert",
            None,
            vec![
                TraceEvent::new(Some(12), "Parsing INSERT"),
                TraceEvent::new(None, "Request complete"),
            ],
        );
        assert_eq!(
            trace.render(),
            "12 - Parsing INSERT\n- - Request complete\n\n\n"
        );
    }

    #[test]
    fn opaque_trace_renders_session() {
        let session = Uuid::nil();
        let trace = QueryTrace::opaque("select_latest", session);
        assert!(trace.is_opaque());
        assert_eq!(
            trace.render(),
            format!("select_latest - trace session {session}\n\n\n")
        );
    }

    #[test]
    fn vec_sink_collects() {
        let mut sink: Vec<QueryTrace> = Vec::new();
        let trace = QueryTrace::new("insert", None, vec![TraceEvent::new(Some(1), "x")]);
        assert!(TraceSink::append(&mut sink, &trace).is_ok());
        assert_eq!(sink, vec![trace]);
    }
}
