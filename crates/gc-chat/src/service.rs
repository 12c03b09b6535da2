//! The Chat Service (`spec.md` §4.9): scoped messages, edit history, and
//! redaction over `host` (tenant-wide) and `network:<id>` scopes.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::ports::{ChatNotifier, RoleLookup};
use crate::repository::ChatRepository;
use crate::types::{ChatMessage, Cursor, EditRecord, ListFilter, MessageId, Role, Scope, TenantId, UserId, MAX_BODY_BYTES};

/// The Chat Service, generic over its storage backend and the
/// collaborator ports it drives.
pub struct ChatService<R: ChatRepository, L: RoleLookup, N: ChatNotifier> {
    repo: R,
    roles: L,
    notifier: N,
}

impl<R, L, N> ChatService<R, L, N>
where
    R: ChatRepository,
    L: RoleLookup,
    N: ChatNotifier,
{
    /// Build a service over a repository and its collaborator ports.
    pub fn new(repo: R, roles: L, notifier: N) -> Self {
        Self { repo, roles, notifier }
    }

    fn require_role(&self, tenant_id: TenantId, user_id: UserId, min: Role) -> Result<Role> {
        match self.roles.role_of(tenant_id, user_id) {
            Some(role) if role != Role::Banned && role >= min => Ok(role),
            _ => Err(Error::Forbidden),
        }
    }

    fn validate_body(body: &str) -> Result<()> {
        if body.is_empty() {
            return Err(Error::InvalidRequest { reason: "body must not be empty".into() });
        }
        if body.len() > MAX_BODY_BYTES {
            return Err(Error::InvalidRequest { reason: format!("body exceeds {MAX_BODY_BYTES} bytes") });
        }
        Ok(())
    }

    /// **SendMessage(scope, tenant, user, body, parent?)** (`spec.md`
    /// §4.9). Any non-banned tenant member may post.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an empty or oversized body,
    /// and [`Error::Forbidden`] if the caller is not an active tenant
    /// member.
    pub fn send_message(
        &self,
        scope: Scope,
        tenant_id: TenantId,
        user_id: UserId,
        body: &str,
        parent_id: Option<MessageId>,
    ) -> Result<ChatMessage> {
        Self::validate_body(body)?;
        self.require_role(tenant_id, user_id, Role::Member)?;

        let message = ChatMessage {
            id: MessageId::new(),
            scope,
            tenant_id,
            user_id,
            body: body.to_string(),
            parent_id,
            redacted: false,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.repo.put_message(message.clone());
        self.notifier.message_changed(&message);
        Ok(message)
    }

    /// **GetMessage(id)** (`spec.md` §4.9). Returns a message regardless
    /// of caller role as long as it is not soft-deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the message does not exist or is
    /// soft-deleted.
    pub fn get_message(&self, id: MessageId) -> Result<ChatMessage> {
        self.repo.get_message(id).filter(ChatMessage::is_visible).ok_or(Error::NotFound)
    }

    /// **EditMessage(id, actor, new_body)** (`spec.md` §4.9). The author
    /// may edit their own non-deleted message; moderator+ may edit any.
    /// Appends the prior body to the edit history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the message is missing or deleted,
    /// [`Error::Forbidden`] if `actor` is neither the author nor
    /// moderator+, and [`Error::InvalidRequest`] for an invalid body.
    pub fn edit_message(&self, id: MessageId, actor: UserId, new_body: &str) -> Result<ChatMessage> {
        Self::validate_body(new_body)?;
        let mut message = self.repo.get_message(id).filter(ChatMessage::is_visible).ok_or(Error::NotFound)?;

        let is_author = message.user_id == actor;
        if !is_author {
            self.require_role(message.tenant_id, actor, Role::Moderator)?;
        } else if self.roles.role_of(message.tenant_id, actor) == Some(Role::Banned) {
            return Err(Error::Forbidden);
        }

        self.repo.put_edit_record(EditRecord {
            message_id: id,
            prev_body: message.body.clone(),
            edited_at: Utc::now(),
        });
        message.body = new_body.to_string();
        message.updated_at = Some(Utc::now());
        self.repo.put_message(message.clone());
        self.notifier.message_changed(&message);
        Ok(message)
    }

    /// **DeleteMessage(id, actor, hard)** (`spec.md` §4.9). The author may
    /// soft- or hard-delete their own message; moderator+ may delete any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the message is missing or already
    /// deleted, and [`Error::Forbidden`] if `actor` is neither the author
    /// nor moderator+.
    pub fn delete_message(&self, id: MessageId, actor: UserId, hard: bool) -> Result<()> {
        let mut message = self.repo.get_message(id).filter(ChatMessage::is_visible).ok_or(Error::NotFound)?;

        let is_author = message.user_id == actor;
        if !is_author {
            self.require_role(message.tenant_id, actor, Role::Moderator)?;
        } else if self.roles.role_of(message.tenant_id, actor) == Some(Role::Banned) {
            return Err(Error::Forbidden);
        }

        if hard {
            self.repo.hard_delete(id);
        } else {
            message.deleted_at = Some(Utc::now());
            self.repo.put_message(message.clone());
        }
        self.notifier.message_changed(&message);
        Ok(())
    }

    /// **RedactMessage(id, actor)** (`spec.md` §4.9). Requires
    /// moderator+; replaces the body with `"[REDACTED]"` and sets
    /// `redacted = true`. The original body is not recoverable from the
    /// row (edit history preserves only authored history, per spec).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the message is missing or deleted,
    /// and [`Error::Forbidden`] if `actor` lacks moderator+.
    pub fn redact_message(&self, id: MessageId, actor: UserId) -> Result<ChatMessage> {
        let mut message = self.repo.get_message(id).filter(ChatMessage::is_visible).ok_or(Error::NotFound)?;
        self.require_role(message.tenant_id, actor, Role::Moderator)?;

        message.body = "[REDACTED]".to_string();
        message.redacted = true;
        message.updated_at = Some(Utc::now());
        self.repo.put_message(message.clone());
        self.notifier.message_changed(&message);
        Ok(message)
    }

    /// **ListMessages(filter, cursor)** (`spec.md` §4.9). Requires the
    /// caller to be an active (non-banned) tenant member; returns only
    /// non-deleted messages, oldest-first, paginated by an opaque cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if the caller is not an active tenant
    /// member, and [`Error::InvalidRequest`] if `cursor` does not decode.
    pub fn list_messages(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        filter: ListFilter,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<(Vec<ChatMessage>, Option<String>)> {
        self.require_role(tenant_id, actor, Role::Member)?;
        let after = cursor.map(Cursor::decode).transpose()?;

        let mut messages: Vec<ChatMessage> = self
            .repo
            .list_by_scope(tenant_id, filter.scope)
            .into_iter()
            .filter(ChatMessage::is_visible)
            .filter(|m| filter.parent_id.is_none_or(|p| m.parent_id == Some(p)))
            .collect();

        if let Some(c) = &after {
            messages.retain(|m| (m.created_at, m.id.as_uuid()) > (c.last_created_at, c.last_id.as_uuid()));
        }

        let has_more = messages.len() > limit;
        messages.truncate(limit);
        let next_cursor = if has_more {
            messages.last().map(|m| Cursor { last_created_at: m.created_at, last_id: m.id }.encode())
        } else {
            None
        };
        Ok((messages, next_cursor))
    }

    /// **GetEditHistory(id, actor)** (`spec.md` §4.9). Any active tenant
    /// member may view a message's edit history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the message is missing or deleted,
    /// and [`Error::Forbidden`] if the caller is not an active tenant
    /// member.
    pub fn get_edit_history(&self, id: MessageId, actor: UserId) -> Result<Vec<EditRecord>> {
        let message = self.repo.get_message(id).filter(ChatMessage::is_visible).ok_or(Error::NotFound)?;
        self.require_role(message.tenant_id, actor, Role::Member)?;
        Ok(self.repo.list_edit_history(id))
    }
}
