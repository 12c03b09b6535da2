//! # gc-tenancy
//!
//! The Tenant Service (`spec.md` §4.2): tenants as the top-level
//! isolation boundary, role-based membership (owner > admin > moderator >
//! member), invites, bans, and pinned announcements.
//!
//! ```rust
//! use gc_tenancy::{AccessType, InMemoryTenantRepository, TenantService, UserId, Visibility};
//!
//! let service = TenantService::new(InMemoryTenantRepository::new());
//! let owner = UserId::new();
//! let tenant = service
//!     .create_tenant("acme", Visibility::Public, AccessType::Open, None, 0, owner)
//!     .expect("creates");
//!
//! let member = UserId::new();
//! let outcome = service.join_tenant(tenant.id, member, None).expect("joins");
//! assert!(outcome.created);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod password;
mod repository;
mod service;
mod types;

pub use error::{Error, Result};
pub use repository::{InMemoryTenantRepository, TenantRepository};
pub use service::{JoinOutcome, TenantService};
pub use types::{
    AccessType, Announcement, Cursor, Invite, Role, Tenant, TenantId, TenantMembership, TenantPatch, UserId,
    Visibility,
};
