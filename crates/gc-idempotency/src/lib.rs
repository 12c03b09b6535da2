//! # gc-idempotency
//!
//! Replay-safe mutation guards for the GoConnect control plane.
//!
//! Every state-mutating service call accepts a client-supplied
//! `Idempotency-Key`. This crate provides [`InMemoryIdempotencyStore`], a
//! reserve-then-complete guard: a caller reserves the key with a
//! fingerprint of the request before doing any work, then records the
//! response once the work finishes. Replays with the same key and
//! fingerprint get the stored response back verbatim; replays with the
//! same key and a *different* fingerprint fail with
//! [`IdempotencyError::Conflict`].
//!
//! ## Example
//!
//! ```rust
//! use gc_idempotency::{Fingerprint, InMemoryIdempotencyStore, Outcome};
//!
//! let store = InMemoryIdempotencyStore::new();
//! let fingerprint = Fingerprint::of(&("create-network", "ops", "10.0.0.0/24"));
//!
//! match store.begin("client-key-1", fingerprint).unwrap() {
//!     Outcome::Fresh => {
//!         // perform the mutation, then:
//!         store.complete("client-key-1", fingerprint, &"network-id-123");
//!     }
//!     Outcome::Replayed(prior) => {
//!         // return `prior` unchanged
//!         let _ = prior;
//!     }
//!     Outcome::InFlight => {
//!         // another caller is already performing this exact request
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod store;

pub use error::{IdempotencyError, Result};
pub use store::{Fingerprint, InMemoryIdempotencyStore, Outcome};
