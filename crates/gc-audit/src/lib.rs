//! # gc-audit
//!
//! The audit port for the GoConnect control plane.
//!
//! Every mutating operation in the other `gc-*` crates emits an
//! [`AuditEvent`] through an [`AuditSink`] rather than writing directly to
//! a log or a database. This crate defines the event shape and two
//! reference sinks; the actual security-audit backend (a write-only event
//! store) is out of scope here and is expected to implement [`AuditSink`].
//!
//! ## Example
//!
//! ```rust
//! use gc_audit::{AuditAction, AuditEvent, AuditSink, TracingAuditSink};
//!
//! let sink = TracingAuditSink::new();
//!
//! let event = AuditEvent::builder(AuditAction::NetworkJoin)
//!     .actor("user:11111111-1111-1111-1111-111111111111")
//!     .object("network:22222222-2222-2222-2222-222222222222")
//!     .detail("allowed_ip", "10.1.0.2/32")
//!     .build()
//!     .expect("actor and object set");
//!
//! sink.emit(&event);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod logger;

pub use error::{AuditError, Result};
pub use events::{AuditAction, AuditEvent, AuditEventBuilder, Severity};
pub use logger::{AuditSink, BoxedAuditSink, NoopAuditSink, TracingAuditSink};
