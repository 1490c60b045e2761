//! NMDC-aware telemetry.
//!
//! Provides structured tracing spans carrying NMDC-specific context, so
//! logs from handler dispatch, the directory actor, and the broadcast
//! engine can be correlated per connection and per message kind.
//!
//! - `ConnTraceContext`: per-connection attributes (connection id, peer
//!   address, nick, message kind).
//! - `MessageTimer`: RAII guard recording per-message-kind handler latency.

#![allow(dead_code)]

use std::time::Instant;
use tracing::{Level, Span, span};

/// NMDC-specific trace context for structured logging.
#[derive(Debug, Clone, Default)]
pub struct ConnTraceContext {
    /// The message kind being processed (e.g. "MyINFO", "Search").
    pub kind: Option<String>,
    /// Connection id, stable for the lifetime of the TCP connection.
    pub conn_id: Option<u64>,
    /// Peer socket address.
    pub peer_addr: Option<String>,
    /// Nick, once known (post-`$ValidateNick`).
    pub nick: Option<String>,
    /// Whether this peer arrived through the TLS-terminating proxy.
    pub is_tls: bool,
}

impl ConnTraceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_conn_id(mut self, conn_id: u64) -> Self {
        self.conn_id = Some(conn_id);
        self
    }

    pub fn with_peer_addr(mut self, addr: impl Into<String>) -> Self {
        self.peer_addr = Some(addr.into());
        self
    }

    pub fn with_nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = Some(nick.into());
        self
    }

    pub fn with_tls(mut self, is_tls: bool) -> Self {
        self.is_tls = is_tls;
        self
    }

    /// Create a tracing span from this context, with all set attributes
    /// as structured fields.
    pub fn into_span(self) -> Span {
        let kind = self.kind.as_deref().unwrap_or("unknown");

        span!(
            Level::INFO,
            "nmdc.message",
            kind = kind,
            conn_id = self.conn_id,
            peer_addr = self.peer_addr.as_deref(),
            nick = self.nick.as_deref(),
            is_tls = self.is_tls,
        )
    }
}

/// Guard for timing handler execution and recording metrics on drop.
pub struct MessageTimer {
    kind: String,
    start: Instant,
}

impl MessageTimer {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer and record an error instead of a latency sample.
    pub fn record_error(self, error_code: &str) {
        crate::metrics::record_command_error(&self.kind, error_code);
    }
}

impl Drop for MessageTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(&self.kind, duration);
    }
}

/// Convenience wrapper combining `ConnTraceContext` creation with span
/// creation for the common case of dispatching a single parsed message.
pub fn create_message_span(kind: &str, conn_id: u64, nick: Option<&str>) -> Span {
    let mut ctx = ConnTraceContext::new().with_kind(kind).with_conn_id(conn_id);
    if let Some(nick) = nick {
        ctx = ctx.with_nick(nick);
    }
    ctx.into_span()
}

/// Create a span for a single broadcast fan-out, recording the recipient
/// count as a metric as a side effect.
pub fn create_broadcast_span(kind: &str, recipients: usize) -> Span {
    crate::metrics::record_fanout(recipients);

    span!(
        Level::DEBUG,
        "nmdc.broadcast",
        kind = kind,
        recipients = recipients,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_context_builder_sets_fields() {
        let ctx = ConnTraceContext::new()
            .with_kind("MyINFO")
            .with_conn_id(42)
            .with_peer_addr("127.0.0.1:1234")
            .with_nick("alice")
            .with_tls(true);

        assert_eq!(ctx.kind.as_deref(), Some("MyINFO"));
        assert_eq!(ctx.conn_id, Some(42));
        assert_eq!(ctx.peer_addr.as_deref(), Some("127.0.0.1:1234"));
        assert_eq!(ctx.nick.as_deref(), Some("alice"));
        assert!(ctx.is_tls);
    }

    #[test]
    fn message_timer_measures_elapsed() {
        let timer = MessageTimer::new("Chat");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_secs() >= 0.005);
    }
}
