//! User persistence port.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::types::{User, UserId};

/// Capability set a concrete store must provide for [`crate::service::AuthService`].
///
/// An in-memory implementation ([`InMemoryUserRepository`]) satisfies the
/// same contract as a relational one, so the service can be property-tested
/// without a database (`spec.md` §9, "Polymorphism").
pub trait UserRepository: Send + Sync {
    /// Insert a brand-new user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmailAlreadyExists`] if the email is already taken.
    fn create(&self, user: User) -> Result<User>;

    /// Fetch by primary key.
    fn get(&self, id: UserId) -> Option<User>;

    /// Fetch by the unique, case-insensitive login email.
    fn get_by_email(&self, email: &str) -> Option<User>;

    /// Fetch by `(auth_provider, external_id)`, for OIDC linking.
    fn get_by_external_id(&self, external_id: &str) -> Option<User>;

    /// Persist a full replacement of a previously created user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `user.id` is unknown.
    fn update(&self, user: User) -> Result<User>;
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// In-memory [`UserRepository`], backing property tests and local
/// development.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for InMemoryUserRepository {
    fn create(&self, user: User) -> Result<User> {
        let mut users = self.users.write();
        let email = normalize_email(&user.email);
        if users.values().any(|u| normalize_email(&u.email) == email) {
            return Err(Error::EmailAlreadyExists);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    fn get(&self, id: UserId) -> Option<User> {
        self.users.read().get(&id).cloned()
    }

    fn get_by_email(&self, email: &str) -> Option<User> {
        let email = normalize_email(email);
        self.users.read().values().find(|u| normalize_email(&u.email) == email).cloned()
    }

    fn get_by_external_id(&self, external_id: &str) -> Option<User> {
        self.users.read().values().find(|u| u.external_id.as_deref() == Some(external_id)).cloned()
    }

    fn update(&self, user: User) -> Result<User> {
        let mut users = self.users.write();
        if !users.contains_key(&user.id) {
            return Err(Error::NotFound);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthProvider, TenantId};
    use chrono::Utc;
    use uuid::Uuid;

    fn new_user(email: &str) -> User {
        User {
            id: UserId::new(),
            email: email.to_string(),
            password_hash: Some("hash".into()),
            tenant_id: TenantId::from_uuid(Uuid::new_v4()),
            is_admin: false,
            is_moderator: false,
            suspended: false,
            suspended_at: None,
            suspended_reason: None,
            two_factor_enabled: false,
            two_factor_secret: None,
            recovery_codes: Vec::new(),
            auth_provider: AuthProvider::Password,
            external_id: None,
            locale: None,
            last_seen: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_email_rejected_case_insensitively() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("user@example.com")).unwrap();
        let err = repo.create(new_user("USER@example.com")).unwrap_err();
        assert!(matches!(err, Error::EmailAlreadyExists));
    }

    #[test]
    fn get_by_email_is_case_insensitive() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create(new_user("User@Example.com")).unwrap();
        assert_eq!(repo.get_by_email("user@example.com").unwrap().id, user.id);
    }

    #[test]
    fn update_requires_existing_user() {
        let repo = InMemoryUserRepository::new();
        let err = repo.update(new_user("ghost@example.com")).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }
}
