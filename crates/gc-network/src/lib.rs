//! # gc-network
//!
//! The Network Service (`spec.md` §4.3) and IPAM (`spec.md` §4.6): network
//! CRUD with CIDR overlap guardrails and tenant isolation, plus per-network
//! overlay-IP allocation.
//!
//! ```rust
//! use gc_network::{CreateNetworkRequest, InMemoryNetworkRepository, JoinPolicy, NetworkService, TenantId, UserId, Visibility};
//!
//! let service = NetworkService::new(InMemoryNetworkRepository::new());
//! let tenant = TenantId::from_uuid(uuid::Uuid::new_v4());
//! let user = UserId::from_uuid(uuid::Uuid::new_v4());
//! let req = CreateNetworkRequest {
//!     name: "prod".into(),
//!     cidr: "10.1.0.0/24".into(),
//!     visibility: Visibility::Private,
//!     join_policy: JoinPolicy::Open,
//!     dns: None,
//!     mtu: None,
//!     split_tunnel: false,
//! };
//! let network = service.create_network(&req, user, tenant, "create-1").expect("creates");
//! assert_eq!(network.name, "prod");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ipam;
pub mod repository;
pub mod service;
pub mod types;

pub use error::{Error, Result};
pub use ipam::Ipam;
pub use repository::{InMemoryNetworkRepository, NetworkRepository};
pub use service::NetworkService;
pub use types::{
    CreateNetworkRequest, Lease, ListView, Network, NetworkId, NetworkPatch, TenantId, UserId, Visibility, JoinPolicy,
};
