pub mod repository_error;
pub mod party_repo;
pub mod quotation_repo;
pub mod catalog_repo;

use crate::config::mongo_conf::MongoConfig;
use mongodb::{options::{ClientOptions, Credential, ResolverConfig}, Client, Database};
use tracing::info;

/// Opens the shared MongoDB handle. Called once at startup; every repository
/// clones collections out of the returned `Database`.
pub async fn connect(config: &MongoConfig) -> Result<Database, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse_with_resolver_config(&config.uri, ResolverConfig::cloudflare()).await?;
    client_options.app_name = Some("QuotationBackend".to_string());
    client_options.max_pool_size = Some(config.pool_size);
    client_options.connect_timeout = Some(std::time::Duration::from_secs(config.connection_timeout_secs));
    client_options.server_selection_timeout = Some(std::time::Duration::from_secs(config.server_selection_timeout_secs));

    // Set credentials if username and password are provided
    if let (Some(ref username), Some(ref password)) = (&config.username, &config.password) {
        client_options.credential = Some(Credential::builder()
            .username(username.clone())
            .password(password.clone())
            .build());
    }

    let client = Client::with_options(client_options)?;
    info!(database = %config.database, "MongoDB client created");
    Ok(client.database(&config.database))
}
