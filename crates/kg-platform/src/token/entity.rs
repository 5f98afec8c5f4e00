//! Token Entity
//!
//! The access token issued by every grant exchange, its classification
//! enums, and its lifecycle transitions (expiry checks, blocking,
//! desensitization, refresh succession). Tokens are opaque random strings
//! validated against the store, keyed by the access token itself.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::error::{PlatformError, Result};

/// How a token was obtained.
///
/// The set is closed and versioned with the protocol; parsing any other
/// string is a validation error, never a silent fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    Implicit,
    Password,
    ClientCredentials,
    RefreshToken,
    /// Personal access token minted from an existing session
    AccessToken,
    Ldap,
    /// Re-scope an existing token to a namespace
    UpgradeScope,
    Wechat,
    #[default]
    Unknown,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::Implicit => "implicit",
            GrantType::Password => "password",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
            GrantType::AccessToken => "access_token",
            GrantType::Ldap => "ldap",
            GrantType::UpgradeScope => "upgrade_scope",
            GrantType::Wechat => "wechat",
            GrantType::Unknown => "unknown",
        }
    }

    /// Membership test against a set of grant types.
    pub fn is(&self, set: &[GrantType]) -> bool {
        set.contains(self)
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GrantType {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "authorization_code" => Ok(GrantType::AuthorizationCode),
            "implicit" => Ok(GrantType::Implicit),
            "password" => Ok(GrantType::Password),
            "client_credentials" => Ok(GrantType::ClientCredentials),
            "refresh_token" => Ok(GrantType::RefreshToken),
            "access_token" => Ok(GrantType::AccessToken),
            "ldap" => Ok(GrantType::Ldap),
            "upgrade_scope" => Ok(GrantType::UpgradeScope),
            "wechat" => Ok(GrantType::Wechat),
            "unknown" => Ok(GrantType::Unknown),
            other => Err(PlatformError::validation(format!(
                "unknown grant type: {other}"
            ))),
        }
    }
}

/// Token presentation scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    #[default]
    Bearer,
    Mac,
    Jwt,
}

/// Classification of the principal a token acts as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Plain human account
    #[default]
    Sub,
    /// Domain owner account
    Primary,
    /// Machine account for a registered micro-service
    Service,
    /// Cross-domain administrator
    Supper,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Sub => "sub",
            UserType::Primary => "primary",
            UserType::Service => "service",
            UserType::Supper => "supper",
        }
    }

    pub fn is(&self, set: &[UserType]) -> bool {
        set.contains(self)
    }

    /// Accounts allowed to manage domain-level security settings.
    pub fn is_domain_admin(&self) -> bool {
        self.is(&[UserType::Supper, UserType::Primary])
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserType {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sub" => Ok(UserType::Sub),
            "primary" => Ok(UserType::Primary),
            "service" => Ok(UserType::Service),
            "supper" => Ok(UserType::Supper),
            other => Err(PlatformError::validation(format!(
                "unknown user type: {other}"
            ))),
        }
    }
}

/// The one entity a token is issued to.
///
/// Construction through this enum is what keeps the
/// exactly-one-principal rule from ever being violated by new tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    User(String),
    Application(String),
    Service(String),
}

/// An issued token pair and everything needed to validate it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// The access token string is the primary key
    #[serde(rename = "_id")]
    pub access_token: String,

    /// Present while the token is refreshable; unique across tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    /// Unset means the access token never expires
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub access_expired_at: Option<DateTime<Utc>>,

    /// Unset means the token is not refreshable
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub refresh_expired_at: Option<DateTime<Utc>>,

    /// Tenant isolation boundary; immutable for the token's lifetime
    pub domain: String,

    /// Sub-tenant scope, set by the upgrade_scope grant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    pub user_type: UserType,

    /// Display account of the principal
    pub account: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Grant of the first token in this refresh chain
    pub start_grant_type: GrantType,

    /// Grant that produced this token
    pub grant_type: GrantType,

    #[serde(rename = "type")]
    pub token_type: TokenType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Free-text purpose, used by personal access tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub is_block: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub block_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Mint a token for a principal. Expiries default to unset; callers
    /// apply TTL policy through the builder methods.
    pub fn new(
        domain: impl Into<String>,
        account: impl Into<String>,
        user_type: UserType,
        principal: Principal,
        grant_type: GrantType,
    ) -> Self {
        let (user_id, application_id, service_id) = match principal {
            Principal::User(id) => (Some(id), None, None),
            Principal::Application(id) => (None, Some(id), None),
            Principal::Service(id) => (None, None, Some(id)),
        };

        Self {
            access_token: generate_opaque_token(),
            refresh_token: Some(generate_opaque_token()),
            created_at: Utc::now(),
            access_expired_at: None,
            refresh_expired_at: None,
            domain: domain.into(),
            namespace_id: None,
            user_id,
            application_id,
            service_id,
            user_type,
            account: account.into(),
            client_id: None,
            start_grant_type: grant_type,
            grant_type,
            token_type: TokenType::Bearer,
            scope: None,
            description: None,
            is_block: false,
            block_reason: None,
            block_at: None,
        }
    }

    pub fn with_access_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.access_expired_at = ttl.map(|d| self.created_at + d);
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.refresh_expired_at = ttl.map(|d| self.created_at + d);
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_namespace(mut self, namespace_id: impl Into<String>) -> Self {
        self.namespace_id = Some(namespace_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_start_grant_type(mut self, start: GrantType) -> Self {
        self.start_grant_type = start;
        self
    }

    /// Drop the refresh pair entirely. Personal access tokens and
    /// service tokens are revoked, never refreshed.
    pub fn without_refresh(mut self) -> Self {
        self.refresh_token = None;
        self.refresh_expired_at = None;
        self
    }

    /// Structural invariants for tokens that did not come through `new`
    /// (deserialized or hand-assembled).
    pub fn validate(&self) -> Result<()> {
        let principals = [&self.user_id, &self.application_id, &self.service_id]
            .iter()
            .filter(|p| p.is_some())
            .count();
        if principals != 1 {
            return Err(PlatformError::validation(
                "token must carry exactly one of user_id, application_id, service_id",
            ));
        }

        if self.access_token.is_empty() {
            return Err(PlatformError::validation("access_token is required"));
        }
        if self.domain.is_empty() {
            return Err(PlatformError::validation("domain is required"));
        }
        if let Some(refresh) = &self.refresh_token {
            if refresh == &self.access_token {
                return Err(PlatformError::validation(
                    "refresh_token must differ from access_token",
                ));
            }
        }
        if let (Some(access), Some(refresh)) = (self.access_expired_at, self.refresh_expired_at) {
            if access > refresh {
                return Err(PlatformError::validation(
                    "access_expired_at must not exceed refresh_expired_at",
                ));
            }
        }
        Ok(())
    }

    /// True iff the access window is set and already past. An unset expiry
    /// never expires; long-lived service tokens rely on this.
    pub fn check_access_expired(&self) -> bool {
        match self.access_expired_at {
            Some(expired_at) => expired_at < Utc::now(),
            None => false,
        }
    }

    /// True iff the token can no longer be refreshed. There is no
    /// never-expires exemption here: a token without a refresh window is
    /// not refreshable at all.
    pub fn check_refresh_expired(&self) -> bool {
        match self.refresh_expired_at {
            Some(expired_at) => expired_at < Utc::now(),
            None => true,
        }
    }

    /// Guard used by application-scoped cascades.
    pub fn check_application(&self, application_id: &str) -> Result<()> {
        if self.application_id.as_deref() != Some(application_id) {
            return Err(PlatformError::permission_denied(format!(
                "token does not belong to application {application_id}"
            )));
        }
        Ok(())
    }

    /// Administrative block. Wins over every other validity input.
    pub fn block(&mut self, reason: impl Into<String>) {
        self.is_block = true;
        self.block_reason = Some(reason.into());
        self.block_at = Some(Utc::now());
    }

    /// Strip material a display context must not see. In-memory only,
    /// never written back.
    pub fn desensitize(&mut self) {
        self.refresh_token = None;
    }

    pub fn is_valid(&self) -> bool {
        !self.is_block && !self.check_access_expired()
    }

    pub fn principal(&self) -> Option<Principal> {
        if let Some(id) = &self.user_id {
            Some(Principal::User(id.clone()))
        } else if let Some(id) = &self.application_id {
            Some(Principal::Application(id.clone()))
        } else {
            self.service_id.clone().map(Principal::Service)
        }
    }

    /// Mint the next pair in a refresh chain. Tenant scope, principal and
    /// the original grant survive; this token's own grant is
    /// `refresh_token` and the pair is brand new.
    pub fn successor(&self) -> Option<Token> {
        let principal = self.principal()?;
        let mut next = Token::new(
            self.domain.clone(),
            self.account.clone(),
            self.user_type,
            principal,
            GrantType::RefreshToken,
        )
        .with_start_grant_type(self.start_grant_type);
        next.namespace_id = self.namespace_id.clone();
        next.client_id = self.client_id.clone();
        next.scope = self.scope.clone();
        next.token_type = self.token_type;
        next.description = self.description.clone();
        Some(next)
    }
}

/// 32 random bytes as URL-safe base64; the opaque wire form of both
/// access and refresh tokens.
pub(crate) fn generate_opaque_token() -> String {
    use base64::Engine;
    use rand::Rng;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_token() -> Token {
        Token::new(
            "acme",
            "alice",
            UserType::Sub,
            Principal::User("u1".to_string()),
            GrantType::Password,
        )
    }

    #[test]
    fn test_grant_type_parse_round_trip() {
        for name in [
            "authorization_code",
            "implicit",
            "password",
            "client_credentials",
            "refresh_token",
            "access_token",
            "ldap",
            "upgrade_scope",
            "wechat",
            "unknown",
        ] {
            let parsed: GrantType = name.parse().unwrap();
            assert_eq!(parsed.as_str(), name);
        }
    }

    #[test]
    fn test_grant_type_parse_rejects_unlisted() {
        assert!("saml".parse::<GrantType>().is_err());
        assert!("".parse::<GrantType>().is_err());
        assert!("PASSWORD".parse::<GrantType>().is_err());
    }

    #[test]
    fn test_grant_type_membership() {
        let gt = GrantType::Ldap;
        assert!(gt.is(&[GrantType::Password, GrantType::Ldap]));
        assert!(!gt.is(&[GrantType::Password, GrantType::Wechat]));
        assert!(!gt.is(&[]));
    }

    #[test]
    fn test_user_type_domain_admin() {
        assert!(UserType::Supper.is_domain_admin());
        assert!(UserType::Primary.is_domain_admin());
        assert!(!UserType::Sub.is_domain_admin());
        assert!(!UserType::Service.is_domain_admin());
    }

    #[test]
    fn test_new_token_has_distinct_pair() {
        let token = user_token();
        assert!(!token.access_token.is_empty());
        let refresh = token.refresh_token.as_ref().unwrap();
        assert_ne!(refresh, &token.access_token);
        assert!(token.validate().is_ok());
    }

    #[test]
    fn test_exactly_one_principal_enforced() {
        let mut token = user_token();
        token.application_id = Some("app1".to_string());
        assert!(token.validate().is_err());

        token.user_id = None;
        token.application_id = None;
        assert!(token.validate().is_err());
    }

    #[test]
    fn test_expiry_ordering_enforced() {
        let token = user_token()
            .with_access_ttl(Some(Duration::hours(2)))
            .with_refresh_ttl(Some(Duration::hours(1)));
        assert!(token.validate().is_err());

        let token = user_token()
            .with_access_ttl(Some(Duration::hours(1)))
            .with_refresh_ttl(Some(Duration::hours(2)));
        assert!(token.validate().is_ok());
    }

    #[test]
    fn test_access_expiry_scenario() {
        let mut token = user_token();
        token.access_expired_at = Some(Utc::now() - Duration::seconds(1));
        assert!(token.check_access_expired());

        token.access_expired_at = Some(Utc::now() + Duration::hours(1));
        assert!(!token.check_access_expired());
    }

    #[test]
    fn test_unset_access_expiry_never_expires() {
        let token = user_token().with_access_ttl(None);
        assert_eq!(token.access_expired_at, None);
        assert!(!token.check_access_expired());
        assert!(token.is_valid());
    }

    #[test]
    fn test_unset_refresh_expiry_is_not_refreshable() {
        let token = user_token().with_refresh_ttl(None);
        assert!(token.check_refresh_expired());

        let token = user_token().with_refresh_ttl(Some(Duration::hours(1)));
        assert!(!token.check_refresh_expired());

        let mut token = user_token();
        token.refresh_expired_at = Some(Utc::now() - Duration::seconds(1));
        assert!(token.check_refresh_expired());
    }

    #[test]
    fn test_without_refresh_strips_pair() {
        let token = user_token()
            .with_refresh_ttl(Some(Duration::hours(1)))
            .without_refresh();
        assert!(token.refresh_token.is_none());
        assert!(token.refresh_expired_at.is_none());
        assert!(token.check_refresh_expired());
        assert!(token.validate().is_ok());
    }

    #[test]
    fn test_block_dominates_validity() {
        let mut token = user_token().with_access_ttl(Some(Duration::hours(1)));
        assert!(token.is_valid());

        token.block("credential leak");
        assert!(!token.is_valid());
        assert!(token.is_block);
        assert_eq!(token.block_reason.as_deref(), Some("credential leak"));
        assert!(token.block_at.is_some());

        // Even a never-expiring token is invalid once blocked.
        let mut forever = user_token().with_access_ttl(None);
        forever.block("abuse");
        assert!(!forever.is_valid());
    }

    #[test]
    fn test_desensitize_clears_refresh_token() {
        let mut token = user_token();
        assert!(token.refresh_token.is_some());
        token.desensitize();
        assert!(token.refresh_token.is_none());
        // The access token itself still identifies the record.
        assert!(!token.access_token.is_empty());
    }

    #[test]
    fn test_check_application_mismatch() {
        let token = Token::new(
            "acme",
            "svc-bot",
            UserType::Sub,
            Principal::Application("app1".to_string()),
            GrantType::ClientCredentials,
        );
        assert!(token.check_application("app1").is_ok());
        assert!(token.check_application("app2").is_err());

        let user = user_token();
        assert!(user.check_application("app1").is_err());
    }

    #[test]
    fn test_successor_preserves_chain() {
        let first = user_token()
            .with_namespace("ns1")
            .with_client_id("cli1")
            .with_scope("ops:read")
            .with_access_ttl(Some(Duration::hours(1)))
            .with_refresh_ttl(Some(Duration::hours(24)));

        let next = first.successor().unwrap();
        assert_eq!(next.domain, first.domain);
        assert_eq!(next.account, first.account);
        assert_eq!(next.user_id, first.user_id);
        assert_eq!(next.namespace_id, first.namespace_id);
        assert_eq!(next.client_id, first.client_id);
        assert_eq!(next.scope, first.scope);
        assert_eq!(next.start_grant_type, GrantType::Password);
        assert_eq!(next.grant_type, GrantType::RefreshToken);
        assert_ne!(next.access_token, first.access_token);
        assert_ne!(next.refresh_token, first.refresh_token);
        assert!(next.validate().is_ok());
    }

    #[test]
    fn test_opaque_tokens_unique() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(generate_opaque_token()));
        }
    }
}
