//! # gc-chat
//!
//! The Chat Service (`spec.md` §4.9): scoped messages (`host` tenant-wide
//! chat, or `network:<id>`), threaded replies, edit history, soft/hard
//! deletion, and moderator redaction.
//!
//! ```rust
//! use gc_chat::{ChatService, InMemoryChatRepository, Role, Scope, TenantId, UserId};
//! use gc_chat::ports::{NoopChatNotifier, RoleLookup};
//!
//! struct AlwaysMember;
//! impl RoleLookup for AlwaysMember {
//!     fn role_of(&self, _tenant_id: TenantId, _user_id: UserId) -> Option<Role> {
//!         Some(Role::Member)
//!     }
//! }
//!
//! let service = ChatService::new(InMemoryChatRepository::new(), AlwaysMember, NoopChatNotifier);
//! let tenant_id = TenantId::from_uuid(uuid::Uuid::new_v4());
//! let user_id = UserId::from_uuid(uuid::Uuid::new_v4());
//! let message = service.send_message(Scope::Host, tenant_id, user_id, "hello", None).unwrap();
//! assert_eq!(message.body, "hello");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ports;
pub mod repository;
pub mod service;
pub mod types;

pub use error::{Error, Result};
pub use ports::{AllMembersRoleLookup, ChatNotifier, NoopChatNotifier, RoleLookup};
pub use repository::{ChatRepository, InMemoryChatRepository};
pub use service::ChatService;
pub use types::{ChatMessage, Cursor, EditRecord, ListFilter, MessageId, NetworkId, Role, Scope, TenantId, UserId};
