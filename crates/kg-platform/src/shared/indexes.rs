//! MongoDB Index Initialization
//!
//! Creates indexes for all collections on application startup. The
//! unique constraints here back the invariants the repositories rely
//! on: one refresh token per pair, one domain per name, one credential
//! per client id.

use mongodb::{Database, IndexModel, bson::doc, options::IndexOptions};
use tracing::info;

/// Initialize all MongoDB indexes
pub async fn initialize_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    info!("Initializing MongoDB indexes...");

    create_token_indexes(db).await?;
    create_domain_indexes(db).await?;
    create_namespace_indexes(db).await?;
    create_micro_indexes(db).await?;
    create_ldap_config_indexes(db).await?;
    create_login_record_indexes(db).await?;

    info!("MongoDB indexes initialized successfully");
    Ok(())
}

async fn create_token_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let tokens = db.collection::<mongodb::bson::Document>("tokens");

    // Refresh lookup and rotation claim (unique, sparse: revoked-only
    // tokens carry no refresh pair)
    tokens
        .create_index(
            IndexModel::builder()
                .keys(doc! { "refreshToken": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .background(true)
                        .build(),
                )
                .build(),
        )
        .await?;

    // Domain-scoped listing, newest first
    tokens
        .create_index(
            IndexModel::builder()
                .keys(doc! { "domain": 1, "createdAt": -1 })
                .options(IndexOptions::builder().background(true).build())
                .build(),
        )
        .await?;

    // Account filtering within a domain
    tokens
        .create_index(
            IndexModel::builder()
                .keys(doc! { "domain": 1, "account": 1 })
                .options(IndexOptions::builder().background(true).build())
                .build(),
        )
        .await?;

    // Application and service teardown cascades
    tokens
        .create_index(
            IndexModel::builder()
                .keys(doc! { "applicationId": 1 })
                .options(IndexOptions::builder().sparse(true).background(true).build())
                .build(),
        )
        .await?;
    tokens
        .create_index(
            IndexModel::builder()
                .keys(doc! { "serviceId": 1 })
                .options(IndexOptions::builder().sparse(true).background(true).build())
                .build(),
        )
        .await?;

    info!("Created indexes on tokens");
    Ok(())
}

async fn create_domain_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let domains = db.collection::<mongodb::bson::Document>("domains");

    // Name lookup (unique)
    domains
        .create_index(
            IndexModel::builder()
                .keys(doc! { "name": 1 })
                .options(IndexOptions::builder().unique(true).background(true).build())
                .build(),
        )
        .await?;

    info!("Created indexes on domains");
    Ok(())
}

async fn create_namespace_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let namespaces = db.collection::<mongodb::bson::Document>("namespaces");

    // Name lookup within a domain (unique)
    namespaces
        .create_index(
            IndexModel::builder()
                .keys(doc! { "domain": 1, "name": 1 })
                .options(IndexOptions::builder().unique(true).background(true).build())
                .build(),
        )
        .await?;

    info!("Created indexes on namespaces");
    Ok(())
}

async fn create_micro_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let micros = db.collection::<mongodb::bson::Document>("micros");

    // Credential lookup (unique)
    micros
        .create_index(
            IndexModel::builder()
                .keys(doc! { "clientId": 1 })
                .options(IndexOptions::builder().unique(true).background(true).build())
                .build(),
        )
        .await?;

    // Name lookup within a domain (unique)
    micros
        .create_index(
            IndexModel::builder()
                .keys(doc! { "domain": 1, "name": 1 })
                .options(IndexOptions::builder().unique(true).background(true).build())
                .build(),
        )
        .await?;

    info!("Created indexes on micros");
    Ok(())
}

async fn create_ldap_config_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let configs = db.collection::<mongodb::bson::Document>("ldap_configs");

    // One config per domain
    configs
        .create_index(
            IndexModel::builder()
                .keys(doc! { "domain": 1 })
                .options(IndexOptions::builder().unique(true).background(true).build())
                .build(),
        )
        .await?;

    info!("Created indexes on ldap_configs");
    Ok(())
}

async fn create_login_record_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let records = db.collection::<mongodb::bson::Document>("login_records");

    // Domain-scoped listing, newest first
    records
        .create_index(
            IndexModel::builder()
                .keys(doc! { "domain": 1, "loginAt": -1 })
                .options(IndexOptions::builder().background(true).build())
                .build(),
        )
        .await?;

    // Account history
    records
        .create_index(
            IndexModel::builder()
                .keys(doc! { "domain": 1, "account": 1 })
                .options(IndexOptions::builder().background(true).build())
                .build(),
        )
        .await?;

    // Logout stamping by token
    records
        .create_index(
            IndexModel::builder()
                .keys(doc! { "accessToken": 1 })
                .options(IndexOptions::builder().background(true).build())
                .build(),
        )
        .await?;

    info!("Created indexes on login_records");
    Ok(())
}
