//! Keygate Server
//!
//! Production server for the token and tenant administration APIs:
//! - Token issuance: POST /oauth/token (all supported grants)
//! - Admin APIs: tokens, domains, namespaces, micros, ldap, login-records
//! - Health probes under /health
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KG_API_PORT` | `8080` | HTTP API port |
//! | `KG_MONGO_URL` | `mongodb://localhost:27017` | MongoDB connection URL |
//! | `KG_MONGO_DB` | `keygate` | MongoDB database name |
//! | `KG_ACCESS_TOKEN_TTL_SECS` | `3600` | Access token lifetime |
//! | `KG_REFRESH_TOKEN_TTL_SECS` | `2592000` | Refresh window (30 days) |
//! | `KG_REGISTRY_URL` | - | Endpoint registry URL (unset: skip registration) |
//! | `KG_PUBLIC_BASE_URL` | `http://localhost:<port>` | Base URL advertised on registration |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use kg_platform::audit::{LoginRecordState, login_record_router};
use kg_platform::domain::{DomainState, domain_router};
use kg_platform::micro::{
    HttpEndpointRegistry, MicroState, RegistryConfig, ServiceRegistration, micro_router,
};
use kg_platform::namespace::{NamespaceState, namespace_router};
use kg_platform::provider::{LdapConfigState, ldap_config_router};
use kg_platform::shared::health_api::{HealthState, health_router};
use kg_platform::shared::indexes::initialize_indexes;
use kg_platform::shared::middleware::{AppState, AuthLayer};
use kg_platform::token::{TokenState, oauth_token_router, token_admin_router};
use kg_platform::{
    DomainRepository, EndpointRegistry, LdapConfigRepository, LoginRecordRepository,
    MicroRepository, NamespaceRepository, TokenConfig, TokenIssuer, TokenRepository,
};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<()> {
    kg_common::logging::init_logging("kg-server");

    info!("Starting Keygate Server");

    // Configuration from environment
    let api_port: u16 = env_or_parse("KG_API_PORT", 8080);
    let mongo_url = env_or("KG_MONGO_URL", "mongodb://localhost:27017");
    let mongo_db = env_or("KG_MONGO_DB", "keygate");

    // Connect to MongoDB
    info!("Connecting to MongoDB: {}/{}", mongo_url, mongo_db);
    let mongo_client = mongodb::Client::with_uri_str(&mongo_url).await?;
    let db = mongo_client.database(&mongo_db);

    initialize_indexes(&db).await?;

    // Initialize repositories
    let token_repo = Arc::new(TokenRepository::new(&db));
    let domain_repo = Arc::new(DomainRepository::new(&db));
    let namespace_repo = Arc::new(NamespaceRepository::new(&db));
    let micro_repo = Arc::new(MicroRepository::new(&db));
    let ldap_repo = Arc::new(LdapConfigRepository::new(&db));
    let record_repo = Arc::new(LoginRecordRepository::new(&db));
    info!("Repositories initialized");

    // Token issuance service
    let token_config = TokenConfig {
        access_token_expiry_secs: env_or_parse("KG_ACCESS_TOKEN_TTL_SECS", 3600),
        refresh_token_expiry_secs: env_or_parse("KG_REFRESH_TOKEN_TTL_SECS", 86400 * 30),
    };
    let issuer = Arc::new(TokenIssuer::new(
        token_repo.clone(),
        micro_repo.clone(),
        namespace_repo.clone(),
        ldap_repo.clone(),
        record_repo.clone(),
        token_config,
    ));

    let app_state = AppState {
        token_service: issuer.clone(),
    };

    // Build API states
    let token_state = TokenState {
        issuer: issuer.clone(),
    };
    let domain_state = DomainState { domain_repo };
    let namespace_state = NamespaceState { namespace_repo };
    let micro_state = MicroState {
        micro_repo,
        token_repo,
    };
    let ldap_state = LdapConfigState { ldap_repo };
    let record_state = LoginRecordState { record_repo };

    // Build API router using OpenApiRouter for auto-collected OpenAPI paths
    let (router, mut openapi) = OpenApiRouter::new()
        .nest("/oauth/token", oauth_token_router(token_state.clone()))
        .nest("/api/admin/tokens", token_admin_router(token_state))
        .nest("/api/admin/domains", domain_router(domain_state))
        .nest("/api/admin/namespaces", namespace_router(namespace_state))
        .nest("/api/admin/micros", micro_router(micro_state))
        .nest("/api/admin/ldap", ldap_config_router(ldap_state))
        .nest("/api/admin/login-records", login_record_router(record_state))
        .split_for_parts();

    openapi.info.title = "Keygate API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description =
        Some("Token issuance and multi-tenant administration".to_string());

    let health_state = HealthState::new(db.clone(), env!("CARGO_PKG_VERSION"));

    let app = Router::new()
        .merge(router)
        .nest("/health", health_router(health_state.clone()))
        // OpenAPI / Swagger UI with auto-collected paths
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", openapi))
        // Auth middleware
        .layer(AuthLayer::new(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    register_endpoints(api_port);

    // Start API server
    let api_addr = format!("0.0.0.0:{}", api_port);
    let listener = TcpListener::bind(&api_addr).await?;
    info!("API server listening on http://{}", api_addr);

    health_state.set_ready();
    info!("Keygate Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Keygate Server shutdown complete");
    Ok(())
}

/// Announce this instance to the endpoint registry when one is
/// configured. Registration failure is never fatal: the server stays up
/// and the warning is the only trace.
fn register_endpoints(api_port: u16) {
    let Ok(registry_url) = std::env::var("KG_REGISTRY_URL") else {
        return;
    };

    let default_base = format!("http://localhost:{}", api_port);
    let base_url = env_or("KG_PUBLIC_BASE_URL", &default_base);
    let config = RegistryConfig {
        registry_url,
        ..RegistryConfig::default()
    };
    let registration = ServiceRegistration {
        name: "keygate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        base_url,
        endpoints: vec![
            "/oauth/token".to_string(),
            "/api/admin/tokens".to_string(),
            "/api/admin/domains".to_string(),
            "/api/admin/namespaces".to_string(),
            "/api/admin/micros".to_string(),
            "/api/admin/ldap".to_string(),
            "/api/admin/login-records".to_string(),
        ],
    };

    match HttpEndpointRegistry::new(config) {
        Ok(registry) => {
            tokio::spawn(async move {
                match registry.register(&registration).await {
                    Ok(()) => info!("Registered with endpoint registry"),
                    Err(e) => tracing::warn!("Endpoint registration failed: {}", e),
                }
            });
        }
        Err(e) => tracing::warn!("Endpoint registry client unavailable: {}", e),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
