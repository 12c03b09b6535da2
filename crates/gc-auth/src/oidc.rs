//! OIDC login: a thin port over an external identity provider.
//!
//! The provider client is process-wide and optional (`spec.md` §9,
//! "Global mutable state"; §6, "OIDC port"). Absence of any of issuer,
//! client id/secret, or redirect URL disables OIDC entirely — callers get
//! [`crate::error::Error::OidcDisabled`] rather than a panic.

use crate::error::{Error, Result};

/// Static configuration for an OIDC provider, sourced from the
/// environment at process startup.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Provider issuer URL.
    pub issuer_url: String,
    /// Registered client id.
    pub client_id: String,
    /// Registered client secret.
    pub client_secret: String,
    /// Redirect URL registered with the provider.
    pub redirect_url: String,
}

impl OidcConfig {
    /// Build a config from the four required environment-sourced values,
    /// or `None` if any is missing — matching the spec's "absence disables
    /// OIDC entirely" contract.
    #[must_use]
    pub fn from_parts(
        issuer_url: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
        redirect_url: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            issuer_url: issuer_url?,
            client_id: client_id?,
            client_secret: client_secret?,
            redirect_url: redirect_url?,
        })
    }
}

/// Identity claimed by the provider after a successful code exchange.
#[derive(Debug, Clone)]
pub struct OidcIdentity {
    /// Email claim.
    pub email: String,
    /// Subject claim: the provider-scoped external id.
    pub external_id: String,
}

/// The OIDC port. `gc-server` wires a real provider client against this
/// trait; tests and deployments without OIDC configured use
/// [`DisabledOidcProvider`].
pub trait OidcProvider: Send + Sync {
    /// Build the authorization URL the client should redirect to, binding
    /// `state` for CSRF protection.
    fn login_url(&self, state: &str) -> Result<String>;

    /// Exchange an authorization `code` for an identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OidcExchangeFailed`] if the provider rejects the
    /// code or the response cannot be parsed.
    fn exchange_code(&self, code: &str) -> Result<OidcIdentity>;
}

/// The default provider for deployments without OIDC configured. Every
/// method fails with [`Error::OidcDisabled`] so callers never need to
/// null-check whether OIDC is wired (`spec.md` §9, "Polymorphism").
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOidcProvider;

impl OidcProvider for DisabledOidcProvider {
    fn login_url(&self, _state: &str) -> Result<String> {
        Err(Error::OidcDisabled)
    }

    fn exchange_code(&self, _code: &str) -> Result<OidcIdentity> {
        Err(Error::OidcDisabled)
    }
}

/// An OIDC provider driven by a pre-validated config, delegating the
/// actual HTTP authorization-code exchange to a caller-supplied closure.
///
/// The control plane treats the provider as a black-box port (`spec.md`
/// §6); the wire protocol of any specific issuer (Google, Okta, ...) is
/// out of scope here and belongs in `gc-server`'s wiring.
pub struct ConfiguredOidcProvider<F> {
    config: OidcConfig,
    exchange: F,
}

impl<F> ConfiguredOidcProvider<F>
where
    F: Fn(&OidcConfig, &str) -> Result<OidcIdentity> + Send + Sync,
{
    /// Wrap a config and an exchange callback into a provider.
    pub const fn new(config: OidcConfig, exchange: F) -> Self {
        Self { config, exchange }
    }
}

impl<F> OidcProvider for ConfiguredOidcProvider<F>
where
    F: Fn(&OidcConfig, &str) -> Result<OidcIdentity> + Send + Sync,
{
    fn login_url(&self, state: &str) -> Result<String> {
        Ok(format!(
            "{}/authorize?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email&state={}",
            self.config.issuer_url, self.config.client_id, self.config.redirect_url, state
        ))
    }

    fn exchange_code(&self, code: &str) -> Result<OidcIdentity> {
        (self.exchange)(&self.config, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_provider_rejects_everything() {
        let provider = DisabledOidcProvider;
        assert!(matches!(provider.login_url("state"), Err(Error::OidcDisabled)));
        assert!(matches!(provider.exchange_code("code"), Err(Error::OidcDisabled)));
    }

    #[test]
    fn missing_any_part_disables_oidc() {
        assert!(OidcConfig::from_parts(Some("https://idp".into()), None, Some("secret".into()), Some("https://cb".into())).is_none());
    }

    #[test]
    fn configured_provider_builds_login_url() {
        let config = OidcConfig {
            issuer_url: "https://idp.example.com".into(),
            client_id: "abc".into(),
            client_secret: "shh".into(),
            redirect_url: "https://app.example.com/callback".into(),
        };
        let provider = ConfiguredOidcProvider::new(config, |_cfg, _code| {
            Ok(OidcIdentity { email: "user@example.com".into(), external_id: "sub-1".into() })
        });
        let url = provider.login_url("xyz").unwrap();
        assert!(url.starts_with("https://idp.example.com/authorize"));
        assert!(url.contains("state=xyz"));

        let identity = provider.exchange_code("auth-code").unwrap();
        assert_eq!(identity.email, "user@example.com");
    }
}
