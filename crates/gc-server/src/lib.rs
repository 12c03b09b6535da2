//! Composition root for the GoConnect control plane: wires every domain
//! crate's service behind the narrow ports it expects, and runs the
//! WebSocket gateway, WireGuard reconciler, and offline-sweep background
//! tasks (`SPEC_FULL.md` §2.3).
//!
//! Exposed as a library, not just a binary, so integration tests under
//! `tests/` can build an [`AppState`] against in-memory repositories and a
//! fake WireGuard interface and drive it end to end, the way the teacher's
//! `claw-gateway/tests/dispatch_test.rs` exercises its gateway against
//! fakes.

pub mod adapters;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ids;
pub mod reconcile;
pub mod state;

pub use error::{Result, ServerError};
pub use state::AppState;
