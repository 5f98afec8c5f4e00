//! Authorization Checks
//!
//! Common gates applied to the caller's token before administrative
//! operations run.

use crate::shared::error::{PlatformError, Result};
use crate::token::entity::{Token, UserType};

/// Require a domain administrator: the domain's primary account or a
/// cross-domain supper account.
pub fn require_domain_admin(token: &Token) -> Result<()> {
    if token.user_type.is_domain_admin() {
        Ok(())
    } else {
        Err(PlatformError::permission_denied(
            "domain administrator access required",
        ))
    }
}

/// Require access to a specific domain. Supper accounts reach every
/// domain; everyone else stays inside their own.
pub fn require_domain_access(token: &Token, domain: &str) -> Result<()> {
    if token.user_type == UserType::Supper || token.domain == domain {
        Ok(())
    } else {
        Err(PlatformError::permission_denied(format!(
            "no access to domain {domain}"
        )))
    }
}

/// The domain an administrative query runs against. Supper accounts may
/// name any domain; everyone else is pinned to their own regardless of
/// what the request asks for.
pub fn resolve_query_domain(token: &Token, requested: Option<&str>) -> Result<String> {
    match requested {
        None => Ok(token.domain.clone()),
        Some(domain) => {
            require_domain_access(token, domain)?;
            Ok(domain.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::entity::{GrantType, Principal};

    fn token_of(user_type: UserType, domain: &str) -> Token {
        Token::new(
            domain,
            "tester",
            user_type,
            Principal::User("u1".to_string()),
            GrantType::Password,
        )
    }

    #[test]
    fn test_require_domain_admin() {
        assert!(require_domain_admin(&token_of(UserType::Primary, "acme")).is_ok());
        assert!(require_domain_admin(&token_of(UserType::Supper, "acme")).is_ok());
        assert!(require_domain_admin(&token_of(UserType::Sub, "acme")).is_err());
        assert!(require_domain_admin(&token_of(UserType::Service, "acme")).is_err());
    }

    #[test]
    fn test_require_domain_access() {
        let sub = token_of(UserType::Sub, "acme");
        assert!(require_domain_access(&sub, "acme").is_ok());
        assert!(require_domain_access(&sub, "other").is_err());

        let supper = token_of(UserType::Supper, "acme");
        assert!(require_domain_access(&supper, "other").is_ok());
    }

    #[test]
    fn test_resolve_query_domain() {
        let primary = token_of(UserType::Primary, "acme");
        assert_eq!(resolve_query_domain(&primary, None).unwrap(), "acme");
        assert_eq!(resolve_query_domain(&primary, Some("acme")).unwrap(), "acme");
        assert!(resolve_query_domain(&primary, Some("other")).is_err());

        let supper = token_of(UserType::Supper, "hq");
        assert_eq!(resolve_query_domain(&supper, Some("other")).unwrap(), "other");
        assert_eq!(resolve_query_domain(&supper, None).unwrap(), "hq");
    }
}
