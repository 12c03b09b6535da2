//! Chat message persistence port.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{ChatMessage, EditRecord, MessageId, Scope, TenantId};

/// Capability set a concrete store must provide for
/// [`crate::service::ChatService`]. An in-memory implementation
/// ([`InMemoryChatRepository`]) satisfies the same contract as a
/// persistent one (`spec.md` §9, "Polymorphism").
pub trait ChatRepository: Send + Sync {
    /// Insert a new message.
    fn put_message(&self, message: ChatMessage);
    /// Fetch a message by id regardless of soft-delete state.
    fn get_message(&self, id: MessageId) -> Option<ChatMessage>;
    /// Permanently remove a message row (hard delete).
    fn hard_delete(&self, id: MessageId);
    /// Every message in a tenant/scope, newest-last, including
    /// soft-deleted rows (the service filters visibility).
    fn list_by_scope(&self, tenant_id: TenantId, scope: Scope) -> Vec<ChatMessage>;
    /// Append an edit-history record.
    fn put_edit_record(&self, record: EditRecord);
    /// All edit-history records for a message, oldest-first.
    fn list_edit_history(&self, message_id: MessageId) -> Vec<EditRecord>;
}

#[derive(Default)]
struct Store {
    messages: HashMap<MessageId, ChatMessage>,
    history: HashMap<MessageId, Vec<EditRecord>>,
}

/// In-memory [`ChatRepository`], backing property tests and local
/// development.
#[derive(Default)]
pub struct InMemoryChatRepository {
    store: RwLock<Store>,
}

impl InMemoryChatRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatRepository for InMemoryChatRepository {
    fn put_message(&self, message: ChatMessage) {
        self.store.write().messages.insert(message.id, message);
    }

    fn get_message(&self, id: MessageId) -> Option<ChatMessage> {
        self.store.read().messages.get(&id).cloned()
    }

    fn hard_delete(&self, id: MessageId) {
        let mut store = self.store.write();
        store.messages.remove(&id);
        store.history.remove(&id);
    }

    fn list_by_scope(&self, tenant_id: TenantId, scope: Scope) -> Vec<ChatMessage> {
        let mut messages: Vec<ChatMessage> = self
            .store
            .read()
            .messages
            .values()
            .filter(|m| m.tenant_id == tenant_id && m.scope == scope)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.as_uuid().cmp(&b.id.as_uuid())));
        messages
    }

    fn put_edit_record(&self, record: EditRecord) {
        self.store.write().history.entry(record.message_id).or_default().push(record);
    }

    fn list_edit_history(&self, message_id: MessageId) -> Vec<EditRecord> {
        self.store.read().history.get(&message_id).cloned().unwrap_or_default()
    }
}
