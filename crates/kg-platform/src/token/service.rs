//! Token Service
//!
//! Grant dispatch, refresh rotation and revocation. Every grant funnels
//! through `TokenIssuer::issue`, which validates the request shape,
//! authenticates the principal for that grant, and persists exactly one
//! new token document.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tracing::info;

use super::entity::{GrantType, Principal, Token, UserType};
use super::repository::{TokenQuery, TokenRepository};
use crate::audit::{LoginRecord, LoginRecordRepository};
use crate::micro::MicroRepository;
use crate::namespace::NamespaceRepository;
use crate::provider::{LdapConfig, LdapConfigRepository};
use crate::shared::api_common::ResourceSet;
use crate::shared::checks;
use crate::shared::error::{PlatformError, Result};

/// TTL policy for issued tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Access token expiration in seconds
    pub access_token_expiry_secs: i64,

    /// Refresh window in seconds, measured from issuance
    pub refresh_token_expiry_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_expiry_secs: 3600,        // 1 hour (PT1H)
            refresh_token_expiry_secs: 86400 * 30, // 30 days (P30D)
        }
    }
}

impl TokenConfig {
    fn access_ttl(&self) -> Option<Duration> {
        Some(Duration::seconds(self.access_token_expiry_secs))
    }

    fn refresh_ttl(&self) -> Option<Duration> {
        Some(Duration::seconds(self.refresh_token_expiry_secs))
    }
}

/// The account a credential-backed grant resolved to.
#[derive(Debug, Clone)]
pub struct AccountIdentity {
    pub user_id: String,
    pub account: String,
    pub user_type: UserType,
}

/// Credential verification seam for the password and ldap grants.
///
/// Deployments that keep accounts elsewhere wire an implementation in;
/// without one those grants answer that they are not enabled.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify_password(
        &self,
        domain: &str,
        username: &str,
        password: &str,
    ) -> Result<AccountIdentity>;

    async fn verify_ldap(
        &self,
        config: &LdapConfig,
        username: &str,
        password: &str,
    ) -> Result<AccountIdentity>;
}

/// Parameters of a token exchange, already parsed off the wire.
#[derive(Debug, Default, Clone)]
pub struct IssueTokenRequest {
    pub grant_type: GrantType,
    pub domain: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub namespace_id: Option<String>,
    pub scope: Option<String>,
    pub description: Option<String>,
    /// Requested access TTL in seconds for personal access tokens;
    /// unset means the token never expires
    pub expires_in: Option<i64>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

pub struct TokenIssuer {
    tokens: Arc<TokenRepository>,
    micros: Arc<MicroRepository>,
    namespaces: Arc<NamespaceRepository>,
    ldap_configs: Arc<LdapConfigRepository>,
    records: Arc<LoginRecordRepository>,
    authenticator: Option<Arc<dyn Authenticator>>,
    config: TokenConfig,
}

impl TokenIssuer {
    pub fn new(
        tokens: Arc<TokenRepository>,
        micros: Arc<MicroRepository>,
        namespaces: Arc<NamespaceRepository>,
        ldap_configs: Arc<LdapConfigRepository>,
        records: Arc<LoginRecordRepository>,
        config: TokenConfig,
    ) -> Self {
        Self {
            tokens,
            micros,
            namespaces,
            ldap_configs,
            records,
            authenticator: None,
            config,
        }
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Exchange a grant for a token. `bearer` is the caller's own
    /// validated token, required by the grants that derive from an
    /// existing session.
    pub async fn issue(&self, req: IssueTokenRequest, bearer: Option<&Token>) -> Result<Token> {
        match req.grant_type {
            GrantType::Password => self.issue_password(req).await,
            GrantType::Ldap => self.issue_ldap(req).await,
            GrantType::ClientCredentials => self.issue_client_credentials(req).await,
            GrantType::RefreshToken => {
                let refresh = require_param(req.refresh_token.as_deref(), "refresh_token")?;
                self.refresh(refresh).await
            }
            GrantType::AccessToken => self.issue_personal(req, bearer).await,
            GrantType::UpgradeScope => self.issue_upgraded(req, bearer).await,
            GrantType::AuthorizationCode | GrantType::Implicit | GrantType::Wechat => {
                Err(PlatformError::validation(format!(
                    "grant type {} is not supported by this endpoint",
                    req.grant_type
                )))
            }
            GrantType::Unknown => Err(PlatformError::validation(
                "unknown grant type is never issuable",
            )),
        }
    }

    async fn issue_password(&self, req: IssueTokenRequest) -> Result<Token> {
        let authenticator = self.authenticator.as_ref().ok_or_else(|| {
            PlatformError::validation("grant type password is not enabled")
        })?;
        let domain = require_param(req.domain.as_deref(), "domain")?;
        let username = require_param(req.username.as_deref(), "username")?;
        let password = require_param(req.password.as_deref(), "password")?;

        let identity = authenticator.verify_password(domain, username, password).await?;
        self.mint_for_account(domain, identity, GrantType::Password, &req).await
    }

    async fn issue_ldap(&self, req: IssueTokenRequest) -> Result<Token> {
        let domain = require_param(req.domain.as_deref(), "domain")?;
        let username = require_param(req.username.as_deref(), "username")?;
        let password = require_param(req.password.as_deref(), "password")?;

        let config = self
            .ldap_configs
            .find_by_domain(domain)
            .await?
            .filter(|c| c.enabled)
            .ok_or_else(|| {
                PlatformError::validation(format!("ldap is not enabled for domain {domain}"))
            })?;
        let authenticator = self.authenticator.as_ref().ok_or_else(|| {
            PlatformError::validation("grant type ldap is not enabled")
        })?;

        let identity = authenticator.verify_ldap(&config, username, password).await?;
        self.mint_for_account(domain, identity, GrantType::Ldap, &req).await
    }

    async fn mint_for_account(
        &self,
        domain: &str,
        identity: AccountIdentity,
        grant_type: GrantType,
        req: &IssueTokenRequest,
    ) -> Result<Token> {
        let mut token = Token::new(
            domain,
            identity.account,
            identity.user_type,
            Principal::User(identity.user_id),
            grant_type,
        )
        .with_access_ttl(self.config.access_ttl())
        .with_refresh_ttl(self.config.refresh_ttl());
        if let Some(client_id) = &req.client_id {
            token = token.with_client_id(client_id);
        }
        if let Some(scope) = &req.scope {
            token = token.with_scope(scope);
        }

        self.persist_issued(token, req).await
    }

    async fn issue_client_credentials(&self, req: IssueTokenRequest) -> Result<Token> {
        let client_id = require_param(req.client_id.as_deref(), "client_id")?;
        let client_secret = require_param(req.client_secret.as_deref(), "client_secret")?;

        let micro = self
            .micros
            .find_by_client_id(client_id)
            .await?
            .ok_or_else(|| PlatformError::unauthorized("invalid client credentials"))?;
        if !micro.verify_secret(client_secret) {
            return Err(PlatformError::unauthorized("invalid client credentials"));
        }

        // Service tokens live until the credential is rotated or the
        // service is removed; they carry no expiry and no refresh pair.
        let token = Token::new(
            micro.domain.clone(),
            micro.name.clone(),
            UserType::Service,
            Principal::Service(micro.id.clone()),
            GrantType::ClientCredentials,
        )
        .with_client_id(client_id)
        .without_refresh();

        self.persist_issued(token, &req).await
    }

    async fn issue_personal(
        &self,
        req: IssueTokenRequest,
        bearer: Option<&Token>,
    ) -> Result<Token> {
        let bearer = require_bearer(bearer)?;
        let description = require_param(req.description.as_deref(), "description")?;
        let principal = bearer
            .principal()
            .ok_or_else(|| PlatformError::internal("token has no principal"))?;

        let access_ttl = match req.expires_in {
            Some(secs) if secs <= 0 => {
                return Err(PlatformError::validation("expires_in must be positive"));
            }
            Some(secs) => Some(Duration::seconds(secs)),
            None => None,
        };

        let mut token = Token::new(
            bearer.domain.clone(),
            bearer.account.clone(),
            bearer.user_type,
            principal,
            GrantType::AccessToken,
        )
        .with_description(description)
        .with_access_ttl(access_ttl)
        .without_refresh();
        token.namespace_id = bearer.namespace_id.clone();
        if let Some(scope) = &req.scope {
            token = token.with_scope(scope);
        }

        self.persist_issued(token, &req).await
    }

    async fn issue_upgraded(
        &self,
        req: IssueTokenRequest,
        bearer: Option<&Token>,
    ) -> Result<Token> {
        let bearer = require_bearer(bearer)?;
        let namespace_id = require_param(req.namespace_id.as_deref(), "namespace_id")?;

        // The namespace must exist inside the caller's own domain; a
        // token can never be upgraded across tenants.
        self.namespaces
            .find_in_domain(&bearer.domain, namespace_id)
            .await?
            .ok_or_else(|| PlatformError::not_found("namespace", namespace_id))?;

        let principal = bearer
            .principal()
            .ok_or_else(|| PlatformError::internal("token has no principal"))?;
        let mut token = Token::new(
            bearer.domain.clone(),
            bearer.account.clone(),
            bearer.user_type,
            principal,
            GrantType::UpgradeScope,
        )
        .with_start_grant_type(bearer.start_grant_type)
        .with_namespace(namespace_id)
        .with_access_ttl(self.config.access_ttl())
        .with_refresh_ttl(self.config.refresh_ttl());
        token.client_id = bearer.client_id.clone();
        if let Some(scope) = &req.scope {
            token = token.with_scope(scope);
        }

        self.persist_issued(token, &req).await
    }

    /// Rotate a refresh token into its successor pair.
    ///
    /// The claim is a single atomic store operation; under concurrent
    /// attempts exactly one caller gets the old document back and every
    /// other caller fails with not-found. The old pair is dead before
    /// the successor exists, so both pairs are never valid at once.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        let claimed = self
            .tokens
            .claim_by_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| {
                PlatformError::not_found("refresh token", "already rotated or unknown")
            })?;

        if claimed.is_block {
            return Err(PlatformError::unauthorized("token is blocked"));
        }
        if claimed.check_refresh_expired() {
            return Err(PlatformError::unauthorized("refresh token expired"));
        }

        let successor = claimed
            .successor()
            .ok_or_else(|| PlatformError::internal("token has no principal"))?
            .with_access_ttl(self.config.access_ttl())
            .with_refresh_ttl(self.config.refresh_ttl());
        successor.validate()?;
        self.tokens.insert(&successor).await?;

        info!(
            domain = %successor.domain,
            account = %successor.account,
            start_grant_type = %successor.start_grant_type,
            "token refreshed"
        );
        Ok(successor)
    }

    /// Look up and check an access token. Stateless with respect to the
    /// store: nothing is written, the same token yields the same answer
    /// on every call until an explicit block or delete.
    pub async fn validate(&self, access_token: &str) -> Result<Token> {
        let token = self
            .tokens
            .find_by_access_token(access_token)
            .await?
            .ok_or_else(|| PlatformError::unauthorized("token not found"))?;

        if token.is_block {
            return Err(PlatformError::unauthorized("token is blocked"));
        }
        if token.check_access_expired() {
            return Err(PlatformError::unauthorized("token expired"));
        }
        Ok(token)
    }

    /// Delete a token. Callers may always revoke their own; everything
    /// else requires a domain administrator in the same domain.
    pub async fn revoke(&self, access_token: &str, bearer: &Token) -> Result<()> {
        let token = self
            .tokens
            .find_by_access_token(access_token)
            .await?
            .ok_or_else(|| PlatformError::not_found("token", access_token))?;

        if token.access_token != bearer.access_token {
            checks::require_domain_admin(bearer)?;
            checks::require_domain_access(bearer, &token.domain)?;
        }

        if !self.tokens.delete_by_access_token(access_token).await? {
            return Err(PlatformError::not_found("token", access_token));
        }
        self.records.mark_logout(access_token).await?;

        info!(domain = %token.domain, account = %token.account, "token revoked");
        Ok(())
    }

    /// Administrative block. The token stays in the store and fails
    /// every later check; there is no unblock.
    pub async fn block(&self, access_token: &str, reason: &str, bearer: &Token) -> Result<()> {
        checks::require_domain_admin(bearer)?;
        let token = self
            .tokens
            .find_by_access_token(access_token)
            .await?
            .ok_or_else(|| PlatformError::not_found("token", access_token))?;
        checks::require_domain_access(bearer, &token.domain)?;

        if !self.tokens.block(access_token, reason).await? {
            return Err(PlatformError::not_found("token", access_token));
        }

        info!(domain = %token.domain, account = %token.account, reason, "token blocked");
        Ok(())
    }

    /// Administrative listing, always domain-scoped, newest first.
    pub async fn search(&self, query: TokenQuery) -> Result<ResourceSet<Token>> {
        query.page.validate()?;
        let total = self.tokens.count(&query).await?;
        let mut items = self.tokens.search(&query).await?;
        for token in &mut items {
            token.desensitize();
        }
        let mut set = ResourceSet::new(query.page).with_total(total);
        set.items = items;
        Ok(set)
    }

    async fn persist_issued(&self, token: Token, req: &IssueTokenRequest) -> Result<Token> {
        token.validate()?;
        self.tokens.insert(&token).await?;

        let mut record = LoginRecord::new(&token);
        record.login_ip = req.client_ip.clone();
        record.user_agent = req.user_agent.clone();
        self.records.insert(&record).await?;

        info!(
            domain = %token.domain,
            account = %token.account,
            grant_type = %token.grant_type,
            "token issued"
        );
        Ok(token)
    }
}

fn require_param<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(PlatformError::validation(format!("{name} is required"))),
    }
}

fn require_bearer<'a>(bearer: Option<&'a Token>) -> Result<&'a Token> {
    bearer.ok_or_else(|| {
        PlatformError::unauthorized("this grant requires an authenticated caller")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_param() {
        assert_eq!(require_param(Some("x"), "domain").unwrap(), "x");
        assert!(require_param(Some(""), "domain").is_err());
        assert!(require_param(None, "domain").is_err());
    }

    #[test]
    fn test_default_config_windows_ordered() {
        let config = TokenConfig::default();
        assert!(config.access_token_expiry_secs <= config.refresh_token_expiry_secs);
    }

    // Grant dispatch and rotation paths require a MongoDB connection.
    // These would typically be integration tests.
}
