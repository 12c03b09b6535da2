//! The identity and token service: the single entry point other crates
//! and `gc-server` call into for everything in `spec.md` §4.1.

use std::sync::Arc;

use chrono::Utc;

use crate::blacklist::{InMemoryBlacklist, TokenBlacklist};
use crate::device_flow::{DeviceFlowStore, Initiated, PollOutcome};
use crate::error::{Error, Result};
use crate::jwt::JwtManager;
use crate::oidc::{DisabledOidcProvider, OidcProvider};
use crate::password;
use crate::recovery;
use crate::repository::UserRepository;
use crate::totp;
use crate::types::{AuthBundle, AuthProvider, Claims, TenantId, TokenType, User, UserId};

/// Wires the identity service's collaborators.
///
/// Every collaborator defaults to a working no-op: no blacklist configured
/// degrades validation gracefully; no OIDC provider configured rejects
/// OIDC calls with [`Error::OidcDisabled`] rather than panicking
/// (`spec.md` §9, "Polymorphism").
pub struct AuthService<R: UserRepository> {
    repo: R,
    jwt: JwtManager,
    blacklist: Arc<dyn TokenBlacklist>,
    oidc: Arc<dyn OidcProvider>,
    device_flows: DeviceFlowStore,
}

impl<R: UserRepository> AuthService<R> {
    /// Build a service with explicit collaborators.
    #[must_use]
    pub fn new(repo: R, jwt: JwtManager) -> Self {
        Self {
            repo,
            jwt,
            blacklist: Arc::new(InMemoryBlacklist::new()),
            oidc: Arc::new(DisabledOidcProvider),
            device_flows: DeviceFlowStore::new(),
        }
    }

    /// Swap in a custom token blacklist.
    #[must_use]
    pub fn with_blacklist(mut self, blacklist: Arc<dyn TokenBlacklist>) -> Self {
        self.blacklist = blacklist;
        self
    }

    /// Swap in a configured OIDC provider.
    #[must_use]
    pub fn with_oidc(mut self, oidc: Arc<dyn OidcProvider>) -> Self {
        self.oidc = oidc;
        self
    }

    fn issue_bundle(&self, user: &User) -> Result<AuthBundle> {
        let access = self.jwt.mint_access(user)?;
        let refresh = self.jwt.mint_refresh(user)?;
        Ok(AuthBundle {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: access.expires_in,
            user_id: user.id,
        })
    }

    /// Register a new password-auth account.
    ///
    /// # Errors
    ///
    /// [`Error::WeakPassword`] if under the length floor;
    /// [`Error::EmailAlreadyExists`] if the email is taken.
    pub fn register(&self, email: &str, password: &str, locale: Option<String>, tenant_id: TenantId) -> Result<AuthBundle> {
        password::check_strength(password)?;
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: email.to_string(),
            password_hash: Some(password::hash(password)?),
            tenant_id,
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
            locale,
            last_seen: now,
            created_at: now,
        };
        let user = self.repo.create(user)?;
        self.issue_bundle(&user)
    }

    /// Authenticate with email/password (+ optional TOTP code).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCredentials`] for unknown email, wrong password, or
    /// a bad TOTP code (indistinguishable by design);
    /// [`Error::Forbidden`] if suspended;
    /// [`Error::TwoFactorRequired`] if 2FA is enabled and no code was given.
    pub fn login(&self, email: &str, password: &str, totp_code: Option<&str>) -> Result<AuthBundle> {
        let mut user = self.repo.get_by_email(email).ok_or(Error::InvalidCredentials)?;
        let hash = user.password_hash.as_deref().ok_or(Error::InvalidCredentials)?;
        if !crate::password::verify(password, hash) {
            return Err(Error::InvalidCredentials);
        }
        if user.suspended {
            return Err(Error::Forbidden);
        }
        if user.two_factor_enabled {
            let secret = user.two_factor_secret.as_deref().ok_or(Error::InvalidCredentials)?;
            match totp_code {
                None => return Err(Error::TwoFactorRequired),
                Some(code) => {
                    if !totp::verify(secret, code, now_unix())? {
                        return Err(Error::InvalidCredentials);
                    }
                }
            }
        }
        user.last_seen = Utc::now();
        let user = self.repo.update(user)?;
        self.issue_bundle(&user)
    }

    /// Mint a fresh access/refresh pair from a valid refresh token, and
    /// best-effort blacklist the refresh token's own JTI so it cannot be
    /// replayed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidToken`] if the token is malformed, blacklisted, or
    /// not a refresh token; [`Error::Forbidden`] if the user is suspended;
    /// [`Error::NotFound`] if the subject no longer exists.
    pub fn refresh(&self, refresh_token: &str) -> Result<AuthBundle> {
        let claims = self.jwt.decode(refresh_token, TokenType::Refresh)?;
        if self.blacklist.is_revoked(claims.jti) {
            return Err(Error::InvalidToken { reason: "token has been revoked".into() });
        }
        let user = self.repo.get(claims.sub).ok_or(Error::NotFound)?;
        if user.suspended {
            return Err(Error::Forbidden);
        }
        let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        self.blacklist.revoke(claims.jti, "refresh_rotation", expires_at);
        self.issue_bundle(&user)
    }

    /// Revoke both tokens of a session. Best-effort: a missing/degraded
    /// blacklist makes this a no-op rather than a failure (`spec.md` §7).
    pub fn logout(&self, access_token: &str, refresh_token: &str) {
        for (token, token_type) in [(access_token, TokenType::Access), (refresh_token, TokenType::Refresh)] {
            if let Ok(claims) = self.jwt.decode(token, token_type) {
                let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
                self.blacklist.revoke(claims.jti, "logout", expires_at);
            }
        }
    }

    /// Validate an access token end to end: signature, type, expiry,
    /// blacklist, and current suspension state.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidToken`] for any structural failure or blacklisting;
    /// [`Error::Forbidden`] if the subject is now suspended;
    /// [`Error::NotFound`] if the subject no longer exists.
    pub fn validate_token(&self, access_token: &str) -> Result<Claims> {
        let claims = self.jwt.decode(access_token, TokenType::Access)?;
        if self.blacklist.is_revoked(claims.jti) {
            return Err(Error::InvalidToken { reason: "token has been revoked".into() });
        }
        let user = self.repo.get(claims.sub).ok_or(Error::NotFound)?;
        if user.suspended {
            return Err(Error::Forbidden);
        }
        Ok(claims)
    }

    /// Start 2FA enrollment: generate a fresh secret. The secret is not
    /// persisted as active until [`Self::enable_2fa`] verifies a code
    /// against it.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the user does not exist.
    pub fn generate_2fa_secret(&self, user_id: UserId) -> Result<String> {
        self.repo.get(user_id).ok_or(Error::NotFound)?;
        Ok(totp::generate_secret())
    }

    /// Confirm enrollment: the user must present a valid code for `secret`
    /// before it is activated.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCredentials`] if the code does not verify.
    pub fn enable_2fa(&self, user_id: UserId, secret: &str, code: &str) -> Result<()> {
        let mut user = self.repo.get(user_id).ok_or(Error::NotFound)?;
        if !totp::verify(secret, code, now_unix())? {
            return Err(Error::InvalidCredentials);
        }
        user.two_factor_enabled = true;
        user.two_factor_secret = Some(secret.to_string());
        self.repo.update(user)?;
        Ok(())
    }

    /// Disable 2FA; requires a currently valid code.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCredentials`] if 2FA is not enabled or the code is
    /// wrong.
    pub fn disable_2fa(&self, user_id: UserId, code: &str) -> Result<()> {
        let mut user = self.repo.get(user_id).ok_or(Error::NotFound)?;
        let secret = user.two_factor_secret.clone().ok_or(Error::InvalidCredentials)?;
        if !totp::verify(&secret, code, now_unix())? {
            return Err(Error::InvalidCredentials);
        }
        user.two_factor_enabled = false;
        user.two_factor_secret = None;
        user.recovery_codes.clear();
        self.repo.update(user)?;
        Ok(())
    }

    /// Generate a fresh batch of recovery codes, replacing any unused
    /// ones. Requires a currently valid TOTP code.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCredentials`] if 2FA is not enabled or the code is
    /// wrong.
    pub fn generate_recovery_codes(&self, user_id: UserId, code: &str) -> Result<Vec<String>> {
        let mut user = self.repo.get(user_id).ok_or(Error::NotFound)?;
        let secret = user.two_factor_secret.clone().ok_or(Error::InvalidCredentials)?;
        if !totp::verify(&secret, code, now_unix())? {
            return Err(Error::InvalidCredentials);
        }
        let plaintext = recovery::generate_codes();
        let hashed = plaintext.iter().map(|c| recovery::hash(c)).collect::<Result<Vec<_>>>()?;
        user.recovery_codes = hashed;
        self.repo.update(user)?;
        Ok(plaintext)
    }

    /// Log in with a password plus a one-time recovery code instead of a
    /// TOTP code. The code is removed atomically on success.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCredentials`] for any failure in the chain —
    /// unknown email, wrong password, or an unrecognized/reused code.
    pub fn use_recovery_code(&self, email: &str, password: &str, code: &str) -> Result<AuthBundle> {
        let mut user = self.repo.get_by_email(email).ok_or(Error::InvalidCredentials)?;
        let hash = user.password_hash.as_deref().ok_or(Error::InvalidCredentials)?;
        if !crate::password::verify(password, hash) {
            return Err(Error::InvalidCredentials);
        }
        if user.suspended {
            return Err(Error::Forbidden);
        }
        let index = recovery::find_match(code, &user.recovery_codes).ok_or(Error::InvalidCredentials)?;
        user.recovery_codes.remove(index);
        user.last_seen = Utc::now();
        let user = self.repo.update(user)?;
        self.issue_bundle(&user)
    }

    /// Build the provider's authorization URL.
    ///
    /// # Errors
    ///
    /// [`Error::OidcDisabled`] if no provider is configured.
    pub fn oidc_login_url(&self, state: &str) -> Result<String> {
        self.oidc.login_url(state)
    }

    /// Exchange an authorization code and log in or register the
    /// resulting identity. If a password-auth user already exists with the
    /// same email and no linked provider, the provider is adopted onto
    /// that account rather than creating a duplicate.
    ///
    /// # Errors
    ///
    /// [`Error::OidcDisabled`] / [`Error::OidcExchangeFailed`] from the
    /// provider; [`Error::Forbidden`] if the resolved account is suspended.
    pub fn oidc_exchange_and_login(&self, code: &str, tenant_id: TenantId) -> Result<AuthBundle> {
        let identity = self.oidc.exchange_code(code)?;
        self.login_or_register_oidc(&identity.email, &identity.external_id, tenant_id)
    }

    /// Resolve an already-verified OIDC identity to a user, linking or
    /// creating as needed.
    ///
    /// # Errors
    ///
    /// [`Error::Forbidden`] if the resolved account is suspended.
    pub fn login_or_register_oidc(&self, email: &str, external_id: &str, tenant_id: TenantId) -> Result<AuthBundle> {
        if let Some(user) = self.repo.get_by_external_id(external_id) {
            if user.suspended {
                return Err(Error::Forbidden);
            }
            let mut user = user;
            user.last_seen = Utc::now();
            let user = self.repo.update(user)?;
            return self.issue_bundle(&user);
        }

        if let Some(mut user) = self.repo.get_by_email(email) {
            if user.auth_provider == AuthProvider::Password && user.external_id.is_none() {
                user.auth_provider = AuthProvider::Oidc;
                user.external_id = Some(external_id.to_string());
                user.last_seen = Utc::now();
                let user = self.repo.update(user)?;
                if user.suspended {
                    return Err(Error::Forbidden);
                }
                return self.issue_bundle(&user);
            }
            if user.suspended {
                return Err(Error::Forbidden);
            }
            return self.issue_bundle(&user);
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: email.to_string(),
            password_hash: None,
            tenant_id,
            is_admin: false,
            is_moderator: false,
            suspended: false,
            suspended_at: None,
            suspended_reason: None,
            two_factor_enabled: false,
            two_factor_secret: None,
            recovery_codes: Vec::new(),
            auth_provider: AuthProvider::Oidc,
            external_id: Some(external_id.to_string()),
            locale: None,
            last_seen: now,
            created_at: now,
        };
        let user = self.repo.create(user)?;
        self.issue_bundle(&user)
    }

    /// Start a device-code flow for `client_id`.
    #[must_use]
    pub fn initiate_device_flow(&self, client_id: &str) -> Initiated {
        self.device_flows.initiate(client_id)
    }

    /// Approve a pending flow identified by its short `user_code`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the code is unknown or expired.
    pub fn approve_device_flow(&self, user_code: &str, user_id: UserId) -> Result<()> {
        if self.device_flows.approve(user_code, user_id) {
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }

    /// Poll a device-code flow for completion.
    ///
    /// # Errors
    ///
    /// [`Error::AuthorizationPending`] if not yet approved;
    /// [`Error::ExpiredToken`] if the code is unknown/expired/consumed.
    pub fn poll_device_token(&self, device_code: &str) -> Result<AuthBundle> {
        match self.device_flows.poll(device_code) {
            PollOutcome::Pending => Err(Error::AuthorizationPending),
            PollOutcome::Expired => Err(Error::ExpiredToken),
            PollOutcome::Approved { user_id } => {
                let user = self.repo.get(user_id).ok_or(Error::NotFound)?;
                self.issue_bundle(&user)
            }
        }
    }

    /// Direct access to the backing repository, for server-layer reads
    /// (e.g. admin user listing) that don't warrant a dedicated method
    /// here.
    pub const fn repository(&self) -> &R {
        &self.repo
    }
}

fn now_unix() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryUserRepository;
    use uuid::Uuid;

    fn service() -> AuthService<InMemoryUserRepository> {
        AuthService::new(
            InMemoryUserRepository::new(),
            JwtManager::new(crate::jwt::JwtConfig::new(b"a-test-secret-that-is-long-enough".to_vec())),
        )
    }

    fn tenant() -> TenantId {
        TenantId::from_uuid(Uuid::new_v4())
    }

    #[test]
    fn register_then_login_round_trips() {
        let svc = service();
        let tenant_id = tenant();
        svc.register("user@example.com", "correct horse battery", None, tenant_id).unwrap();
        let bundle = svc.login("user@example.com", "correct horse battery", None).unwrap();
        let claims = svc.validate_token(&bundle.access_token).unwrap();
        assert_eq!(claims.sub, bundle.user_id);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let svc = service();
        let tenant_id = tenant();
        svc.register("dup@example.com", "correct horse battery", None, tenant_id).unwrap();
        let err = svc.register("dup@example.com", "another password", None, tenant_id).unwrap_err();
        assert!(matches!(err, Error::EmailAlreadyExists));
    }

    #[test]
    fn weak_password_rejected_on_register() {
        let svc = service();
        let err = svc.register("weak@example.com", "short", None, tenant()).unwrap_err();
        assert!(matches!(err, Error::WeakPassword));
    }

    #[test]
    fn unknown_email_and_wrong_password_are_indistinguishable() {
        let svc = service();
        let tenant_id = tenant();
        svc.register("known@example.com", "correct horse battery", None, tenant_id).unwrap();
        let a = svc.login("unknown@example.com", "whatever", None).unwrap_err();
        let b = svc.login("known@example.com", "wrong password", None).unwrap_err();
        assert!(matches!(a, Error::InvalidCredentials));
        assert!(matches!(b, Error::InvalidCredentials));
    }

    #[test]
    fn two_factor_required_then_satisfied() {
        let svc = service();
        let tenant_id = tenant();
        let bundle = svc.register("2fa@example.com", "correct horse battery", None, tenant_id).unwrap();
        let secret = svc.generate_2fa_secret(bundle.user_id).unwrap();
        let code = crate::totp::current_code(&secret, now_unix()).unwrap();
        svc.enable_2fa(bundle.user_id, &secret, &code).unwrap();

        let err = svc.login("2fa@example.com", "correct horse battery", None).unwrap_err();
        assert!(matches!(err, Error::TwoFactorRequired));

        let code = crate::totp::current_code(&secret, now_unix()).unwrap();
        svc.login("2fa@example.com", "correct horse battery", Some(&code)).unwrap();
    }

    #[test]
    fn recovery_code_is_single_use() {
        let svc = service();
        let tenant_id = tenant();
        let bundle = svc.register("rec@example.com", "correct horse battery", None, tenant_id).unwrap();
        let secret = svc.generate_2fa_secret(bundle.user_id).unwrap();
        let code = crate::totp::current_code(&secret, now_unix()).unwrap();
        svc.enable_2fa(bundle.user_id, &secret, &code).unwrap();

        let totp_code = crate::totp::current_code(&secret, now_unix()).unwrap();
        let codes = svc.generate_recovery_codes(bundle.user_id, &totp_code).unwrap();
        let first = &codes[0];

        svc.use_recovery_code("rec@example.com", "correct horse battery", first).unwrap();
        let err = svc.use_recovery_code("rec@example.com", "correct horse battery", first).unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
    }

    #[test]
    fn suspended_user_cannot_login() {
        let svc = service();
        let tenant_id = tenant();
        let bundle = svc.register("susp@example.com", "correct horse battery", None, tenant_id).unwrap();
        let mut user = svc.repo.get(bundle.user_id).unwrap();
        user.suspended = true;
        svc.repo.update(user).unwrap();
        let err = svc.login("susp@example.com", "correct horse battery", None).unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[test]
    fn refresh_rotates_and_revokes_old_token() {
        let svc = service();
        let bundle = svc.register("refresh@example.com", "correct horse battery", None, tenant()).unwrap();
        let refreshed = svc.refresh(&bundle.refresh_token).unwrap();
        assert_ne!(bundle.refresh_token, refreshed.refresh_token);
        // Old refresh token is now blacklisted.
        assert!(svc.refresh(&bundle.refresh_token).is_err());
    }

    #[test]
    fn logout_blacklists_access_token() {
        let svc = service();
        let bundle = svc.register("logout@example.com", "correct horse battery", None, tenant()).unwrap();
        svc.logout(&bundle.access_token, &bundle.refresh_token);
        assert!(svc.validate_token(&bundle.access_token).is_err());
    }

    #[test]
    fn device_flow_end_to_end() {
        let svc = service();
        let bundle = svc.register("device@example.com", "correct horse battery", None, tenant()).unwrap();

        let initiated = svc.initiate_device_flow("cli");
        assert!(matches!(svc.poll_device_token(&initiated.device_code), Err(Error::AuthorizationPending)));

        svc.approve_device_flow(&initiated.user_code, bundle.user_id).unwrap();
        let polled = svc.poll_device_token(&initiated.device_code).unwrap();
        assert_eq!(polled.user_id, bundle.user_id);

        assert!(matches!(svc.poll_device_token(&initiated.device_code), Err(Error::ExpiredToken)));
    }

    #[test]
    fn oidc_links_existing_password_account_by_email() {
        let svc = service();
        let tenant_id = tenant();
        let bundle = svc.register("linked@example.com", "correct horse battery", None, tenant_id).unwrap();
        let oidc_bundle = svc.login_or_register_oidc("linked@example.com", "sub-123", tenant_id).unwrap();
        assert_eq!(oidc_bundle.user_id, bundle.user_id);
        let user = svc.repo.get(bundle.user_id).unwrap();
        assert_eq!(user.auth_provider, AuthProvider::Oidc);
        assert_eq!(user.external_id.as_deref(), Some("sub-123"));
    }

    #[test]
    fn oidc_creates_new_user_when_no_match() {
        let svc = service();
        let bundle = svc.login_or_register_oidc("fresh@example.com", "sub-999", tenant()).unwrap();
        let user = svc.repo.get(bundle.user_id).unwrap();
        assert_eq!(user.auth_provider, AuthProvider::Oidc);
    }
}
