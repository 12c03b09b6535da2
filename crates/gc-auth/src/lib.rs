//! # gc-auth
//!
//! Identity and token service for the GoConnect control plane
//! (`spec.md` §4.1): password + OIDC login, rotated access/refresh JWTs
//! with a revocation blacklist, TOTP second factor with recovery codes,
//! and the OAuth2 device-code flow for headless clients.
//!
//! ```rust
//! use gc_auth::{AuthService, InMemoryUserRepository, JwtConfig, JwtManager, TenantId};
//! use uuid::Uuid;
//!
//! let service = AuthService::new(
//!     InMemoryUserRepository::new(),
//!     JwtManager::new(JwtConfig::new(b"a-test-secret-that-is-long-enough".to_vec())),
//! );
//!
//! let tenant_id = TenantId::from_uuid(Uuid::new_v4());
//! let bundle = service
//!     .register("user@example.com", "correct horse battery staple", None, tenant_id)
//!     .expect("registers");
//! let claims = service.validate_token(&bundle.access_token).expect("valid token");
//! assert_eq!(claims.sub, bundle.user_id);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod blacklist;
pub mod device_flow;
pub mod error;
pub mod jwt;
pub mod oidc;
pub mod password;
pub mod recovery;
pub mod repository;
pub mod service;
pub mod totp;
pub mod types;

pub use blacklist::{BlacklistEntry, InMemoryBlacklist, TokenBlacklist};
pub use device_flow::{DeviceFlowStore, Initiated as DeviceFlowInitiated, PollOutcome as DeviceFlowPoll};
pub use error::{Error, Result};
pub use jwt::{JwtConfig, JwtManager};
pub use oidc::{ConfiguredOidcProvider, DisabledOidcProvider, OidcConfig, OidcIdentity, OidcProvider};
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::AuthService;
pub use types::{AuthBundle, AuthProvider, Claims, TenantId, TokenType, User, UserId};
