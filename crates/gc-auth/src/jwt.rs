//! JWT issuance and validation for access/refresh tokens.
//!
//! Tokens are signed with a single process-wide HMAC secret (`spec.md`
//! §9, "Global mutable state"). Access and refresh tokens share the same
//! claim shape but differ in the `type` claim and TTL, so one can never be
//! replayed as the other ([`JwtManager::validate`] checks the expected type
//! explicitly).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Claims, TenantId, TokenType, User};

/// Issuer claim stamped on every token this service mints.
pub const ISSUER: &str = "goconnect";

/// Default access token lifetime.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::minutes(15);
/// Default refresh token lifetime.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::days(7);

/// Development-only HMAC secret. A production deployment MUST override
/// this via [`JwtConfig::new`]; `gc-server` refuses to start with it
/// outside a development profile.
pub const INSECURE_DEV_SECRET: &str = "goconnect-development-secret-do-not-use-in-production";

/// Signing configuration for [`JwtManager`].
#[derive(Clone)]
pub struct JwtConfig {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtConfig {
    /// Build a configuration from a raw HMAC secret.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        }
    }

    /// Override the access token TTL.
    #[must_use]
    pub const fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Override the refresh token TTL.
    #[must_use]
    pub const fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Whether this configuration is the built-in development fallback.
    #[must_use]
    pub fn is_insecure_default(&self) -> bool {
        self.secret == INSECURE_DEV_SECRET.as_bytes()
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl Default for JwtConfig {
    /// The development fallback secret. `gc-server` must override this in
    /// production (`spec.md` §4.1).
    fn default() -> Self {
        Self::new(INSECURE_DEV_SECRET)
    }
}

/// A freshly minted token plus the JTI it carries, so the caller can
/// blacklist it later without re-decoding.
pub struct Minted {
    /// The encoded JWT.
    pub token: String,
    /// The unique JTI embedded in the token.
    pub jti: Uuid,
    /// Seconds until expiry, for [`crate::types::AuthBundle::expires_in`].
    pub expires_in: i64,
}

/// Issues and validates access/refresh token pairs.
#[derive(Debug)]
pub struct JwtManager {
    config: JwtConfig,
}

impl JwtManager {
    /// Build a manager from signing configuration.
    #[must_use]
    pub const fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    fn mint(&self, user: &User, token_type: TokenType, ttl: Duration) -> Result<Minted> {
        let now = Utc::now();
        let jti = Uuid::new_v4();
        let claims = Claims {
            sub: user.id,
            iss: ISSUER.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti,
            token_type,
            tenant_id: user.tenant_id,
            email: user.email.clone(),
            is_admin: user.is_admin,
            is_moderator: user.is_moderator,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.config.encoding_key())
            .map_err(|e| Error::Internal { reason: format!("jwt encode: {e}") })?;
        Ok(Minted { token, jti, expires_in: ttl.num_seconds() })
    }

    /// Issue a short-lived access token for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if signing fails.
    pub fn mint_access(&self, user: &User) -> Result<Minted> {
        self.mint(user, TokenType::Access, self.config.access_ttl)
    }

    /// Issue a long-lived refresh token for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if signing fails.
    pub fn mint_refresh(&self, user: &User) -> Result<Minted> {
        self.mint(user, TokenType::Refresh, self.config.refresh_ttl)
    }

    /// Decode and validate `token`, requiring its `type` claim to equal
    /// `expected_type`.
    ///
    /// Checks signature, algorithm, issuer, expiry, and token type. Does
    /// **not** check suspension or the blacklist; those require a
    /// repository/blacklist lookup and are layered on by
    /// [`crate::service::AuthService::validate_token`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] for any structural or type mismatch.
    pub fn decode(&self, token: &str, expected_type: TokenType) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        let data = decode::<Claims>(token, &self.config.decoding_key(), &validation)
            .map_err(|e| Error::InvalidToken { reason: e.to_string() })?;

        if data.claims.token_type != expected_type {
            return Err(Error::InvalidToken { reason: "unexpected token type".into() });
        }
        Ok(data.claims)
    }

    /// The configured access token TTL.
    #[must_use]
    pub const fn access_ttl(&self) -> Duration {
        self.config.access_ttl
    }

    /// Whether this manager is signing with the insecure development
    /// default secret.
    #[must_use]
    pub fn is_insecure_default(&self) -> bool {
        self.config.is_insecure_default()
    }
}

/// Extract the bearer token from an `Authorization` header value.
///
/// # Errors
///
/// Returns [`Error::Unauthorized`] if the header is empty or not of the
/// form `Bearer <token>`.
pub fn extract_bearer(header: &str) -> Result<&str> {
    let header = header.trim();
    if header.is_empty() {
        return Err(Error::Unauthorized);
    }
    header.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty()).ok_or(Error::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuthProvider;

    fn test_user() -> User {
        User {
            id: crate::types::UserId::new(),
            email: "user@example.com".into(),
            password_hash: None,
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

    fn manager() -> JwtManager {
        JwtManager::new(JwtConfig::new(b"a-test-secret-that-is-long-enough".to_vec()))
    }

    #[test]
    fn access_token_round_trips() {
        let user = test_user();
        let mgr = manager();
        let minted = mgr.mint_access(&user).unwrap();
        let claims = mgr.decode(&minted.token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.jti, minted.jti);
    }

    #[test]
    fn refresh_cannot_be_used_as_access() {
        let user = test_user();
        let mgr = manager();
        let minted = mgr.mint_refresh(&user).unwrap();
        let err = mgr.decode(&minted.token, TokenType::Access).unwrap_err();
        assert!(matches!(err, Error::InvalidToken { .. }));
    }

    #[test]
    fn wrong_signer_is_rejected() {
        let user = test_user();
        let a = manager();
        let b = JwtManager::new(JwtConfig::new(b"a-different-secret-entirely!!".to_vec()));
        let minted = a.mint_access(&user).unwrap();
        assert!(b.decode(&minted.token, TokenType::Access).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let user = test_user();
        let mgr = JwtManager::new(
            JwtConfig::new(b"a-test-secret-that-is-long-enough".to_vec())
                .with_access_ttl(Duration::seconds(-1)),
        );
        let minted = mgr.mint_access(&user).unwrap();
        assert!(mgr.decode(&minted.token, TokenType::Access).is_err());
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(extract_bearer("").is_err());
        assert!(extract_bearer("Basic abc").is_err());
    }
}
