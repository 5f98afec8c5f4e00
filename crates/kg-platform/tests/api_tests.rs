//! Platform API Integration Tests
//!
//! Tests for token lifecycle, tenant scoping, pagination, and error
//! handling through the crate's public API.

use std::collections::HashSet;

use kg_platform::{GrantType, PageRequest, Principal, Token, TsidGenerator, UserType};

fn user_token(domain: &str, user_type: UserType) -> Token {
    Token::new(
        domain,
        "alice",
        user_type,
        Principal::User("u1".to_string()),
        GrantType::Password,
    )
}

// Token lifecycle tests
mod token_tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_issued_token_is_valid() {
        let token = user_token("acme", UserType::Sub)
            .with_access_ttl(Some(Duration::hours(1)))
            .with_refresh_ttl(Some(Duration::days(30)));
        assert!(token.validate().is_ok());
        assert!(token.is_valid());
        assert!(!token.check_access_expired());
        assert!(!token.check_refresh_expired());
    }

    #[test]
    fn test_refresh_chain_preserves_origin() {
        let first = user_token("acme", UserType::Sub)
            .with_namespace("ns1")
            .with_scope("ops:read");

        let second = first.successor().unwrap();
        let third = second.successor().unwrap();

        // The original grant survives any number of rotations.
        assert_eq!(second.start_grant_type, GrantType::Password);
        assert_eq!(third.start_grant_type, GrantType::Password);
        assert_eq!(third.grant_type, GrantType::RefreshToken);

        // Tenant scope and principal are pinned across the chain.
        assert_eq!(third.domain, "acme");
        assert_eq!(third.namespace_id.as_deref(), Some("ns1"));
        assert_eq!(third.user_id, first.user_id);

        // Each hop gets a brand new pair.
        let pairs: HashSet<&str> = [
            first.access_token.as_str(),
            second.access_token.as_str(),
            third.access_token.as_str(),
        ]
        .into_iter()
        .collect();
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_block_wins_over_open_ended_expiry() {
        let mut token = user_token("acme", UserType::Sub).with_access_ttl(None);
        assert!(token.is_valid());

        token.block("shared on a paste site");
        assert!(!token.is_valid());
        assert!(token.block_at.is_some());
    }

    #[test]
    fn test_personal_token_never_refreshable() {
        let token = user_token("acme", UserType::Sub)
            .with_description("ci pipeline")
            .without_refresh();
        assert!(token.refresh_token.is_none());
        assert!(token.check_refresh_expired());
        assert!(token.validate().is_ok());
    }

    #[test]
    fn test_desensitized_listing_keeps_identity() {
        let mut token = user_token("acme", UserType::Sub);
        let id = token.access_token.clone();
        token.desensitize();
        assert!(token.refresh_token.is_none());
        assert_eq!(token.access_token, id);
    }
}

// Tenant scoping tests
mod scope_tests {
    use super::*;
    use kg_platform::shared::checks;

    #[test]
    fn test_supper_crosses_domains() {
        let supper = user_token("hq", UserType::Supper);
        assert!(checks::require_domain_access(&supper, "acme").is_ok());
        assert_eq!(
            checks::resolve_query_domain(&supper, Some("acme")).unwrap(),
            "acme"
        );
    }

    #[test]
    fn test_primary_pinned_to_own_domain() {
        let primary = user_token("acme", UserType::Primary);
        assert!(checks::require_domain_admin(&primary).is_ok());
        assert!(checks::require_domain_access(&primary, "other").is_err());
        assert!(checks::resolve_query_domain(&primary, Some("other")).is_err());
        assert_eq!(checks::resolve_query_domain(&primary, None).unwrap(), "acme");
    }

    #[test]
    fn test_sub_account_cannot_administer() {
        let sub = user_token("acme", UserType::Sub);
        assert!(checks::require_domain_admin(&sub).is_err());

        let service = user_token("acme", UserType::Service);
        assert!(checks::require_domain_admin(&service).is_err());
    }
}

// Pagination tests
mod pagination_tests {
    use super::*;

    #[test]
    fn test_skip_counts_full_pages_before_window() {
        let page = PageRequest::new(4, 25);
        page.validate().unwrap();
        assert_eq!(page.skip(), 75);
        assert_eq!(page.limit(), 25);
    }

    #[test]
    fn test_first_page_skips_nothing() {
        let page = PageRequest::new(1, 50);
        page.validate().unwrap();
        assert_eq!(page.skip(), 0);
    }

    #[test]
    fn test_invalid_windows_rejected_before_computation() {
        assert!(PageRequest::new(0, 20).validate().is_err());
        assert!(PageRequest::new(1, 0).validate().is_err());
    }
}

// TSID generation tests
mod tsid_tests {
    use super::*;

    #[test]
    fn test_tsid_format() {
        let id = TsidGenerator::generate();
        assert_eq!(id.len(), 13);
        assert!(id.chars().all(|c| {
            matches!(c, '0'..='9' | 'A'..='H' | 'J'..='K' | 'M'..='N' | 'P'..='T' | 'V'..='Z')
        }));
    }

    #[test]
    fn test_tsid_uniqueness() {
        let ids: HashSet<String> = (0..1000).map(|_| TsidGenerator::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_tsid_sortability() {
        let id1 = TsidGenerator::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = TsidGenerator::generate();
        assert!(id2 > id1, "id2 ({}) should be greater than id1 ({})", id2, id1);
    }
}

// Grant type registry tests
mod grant_type_tests {
    use super::*;

    #[test]
    fn test_closed_set_parses() {
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
            assert!(name.parse::<GrantType>().is_ok(), "{name} should parse");
        }
    }

    #[test]
    fn test_unlisted_grants_rejected() {
        assert!("device_code".parse::<GrantType>().is_err());
        assert!("Password".parse::<GrantType>().is_err());
        assert!("".parse::<GrantType>().is_err());
    }

    #[test]
    fn test_membership() {
        let credential_grants = [GrantType::Password, GrantType::Ldap];
        assert!(GrantType::Password.is(&credential_grants));
        assert!(!GrantType::ClientCredentials.is(&credential_grants));
    }
}

// Error handling tests
mod error_tests {
    use kg_platform::PlatformError;

    #[test]
    fn test_not_found_error() {
        let err = PlatformError::not_found("Domain", "acme");
        let msg = err.to_string();
        assert!(msg.contains("Domain"));
        assert!(msg.contains("acme"));
    }

    #[test]
    fn test_validation_error_surfaced_verbatim() {
        let err = PlatformError::validation("page_number must be >= 1");
        assert!(err.to_string().contains("page_number must be >= 1"));
    }

    #[test]
    fn test_permission_denied_error() {
        let err = PlatformError::permission_denied("domain administrator access required");
        assert!(err.to_string().contains("domain administrator"));
    }

    #[test]
    fn test_error_variants() {
        let errors = vec![
            PlatformError::conflict("domain acme already exists"),
            PlatformError::unauthorized("token expired"),
            PlatformError::internal("store offline"),
        ];
        for err in errors {
            let _ = err.to_string();
        }
    }
}
