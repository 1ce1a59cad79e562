use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// MongoDB configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// MongoDB connection URI
    pub uri: String,
    /// Database name
    pub database: String,
    /// Username for authentication (optional)
    pub username: Option<String>,
    /// Password for authentication (optional)
    pub password: Option<String>,
    /// Collection name for parties (optional)
    pub party_collection: Option<String>,
    /// Collection name for quotations (optional)
    pub quotation_collection: Option<String>,
    /// Connection pool size
    pub pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,
    /// Server selection timeout in seconds; bounds every round trip when the server is unreachable
    pub server_selection_timeout_secs: u64,
}

fn parse_or_default<T: std::str::FromStr>(var: &str, default: &str) -> Result<T, ConfigError> {
    env::var(var)
        .unwrap_or_else(|_| {
            warn!("{} not set, using default: {}", var, default);
            default.to_string()
        })
        .parse::<T>()
        .map_err(|_| {
            error!("Invalid {} value", var);
            ConfigError::InvalidValue(format!("Invalid {} value", var))
        })
}

impl MongoConfig {
    /// Load MongoDB configuration from environment variables
    ///
    /// Expected environment variables:
    /// - MONGO_URI: MongoDB connection URI (required)
    /// - MONGO_DATABASE: Database name (required)
    /// - MONGO_USERNAME / MONGO_PASSWORD: credentials (optional)
    /// - MONGO_PARTY_COLLECTION: Collection name for parties (optional, defaults to "parties")
    /// - MONGO_QUOTATION_COLLECTION: Collection name for quotations (optional, defaults to "quotations")
    /// - MONGO_POOL_SIZE: Connection pool size (defaults to 10)
    /// - MONGO_CONNECTION_TIMEOUT: Connection timeout in seconds (defaults to 5)
    /// - MONGO_SERVER_SELECTION_TIMEOUT: Server selection timeout in seconds (defaults to 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading MongoDB configuration from environment variables");

        let uri = env::var("MONGO_URI")
            .map_err(|_| {
                error!("MONGO_URI environment variable not found");
                ConfigError::EnvVarNotFound("MONGO_URI".to_string())
            })?;
        debug!("MongoDB URI loaded");

        let database = env::var("MONGO_DATABASE")
            .map_err(|_| {
                error!("MONGO_DATABASE environment variable not found");
                ConfigError::EnvVarNotFound("MONGO_DATABASE".to_string())
            })?;
        debug!("MongoDB database: {}", database);

        let username = env::var("MONGO_USERNAME").ok();
        if let Some(ref user) = username {
            debug!("MongoDB username: {}", user);
        } else {
            debug!("No MongoDB username specified");
        }

        let password = env::var("MONGO_PASSWORD").ok();
        if password.is_some() {
            debug!("MongoDB password provided");
        } else {
            debug!("No MongoDB password specified");
        }

        let party_collection = env::var("MONGO_PARTY_COLLECTION").ok();
        let quotation_collection = env::var("MONGO_QUOTATION_COLLECTION").ok();
        debug!(?party_collection, ?quotation_collection, "MongoDB collections");

        let pool_size = parse_or_default::<u32>("MONGO_POOL_SIZE", "10")?;
        debug!("MongoDB pool size: {}", pool_size);

        let connection_timeout_secs = parse_or_default::<u64>("MONGO_CONNECTION_TIMEOUT", "5")?;
        debug!("MongoDB connection timeout: {} seconds", connection_timeout_secs);

        let server_selection_timeout_secs = parse_or_default::<u64>("MONGO_SERVER_SELECTION_TIMEOUT", "10")?;
        debug!("MongoDB server selection timeout: {} seconds", server_selection_timeout_secs);

        let config = MongoConfig {
            uri,
            database,
            username,
            password,
            party_collection,
            quotation_collection,
            pool_size,
            connection_timeout_secs,
            server_selection_timeout_secs,
        };

        config.validate()?;
        info!("MongoDB configuration loaded successfully");
        Ok(config)
    }

    /// Create MongoConfig for testing
    pub fn from_test_env() -> Self {
        MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "test_db".to_string(),
            username: None,
            password: None,
            party_collection: Some("test_parties".to_string()),
            quotation_collection: Some("test_quotations".to_string()),
            pool_size: 2,
            connection_timeout_secs: 2,
            server_selection_timeout_secs: 2,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        info!("Validating MongoDB configuration");

        if self.uri.is_empty() {
            error!("MongoDB URI is empty");
            return Err(ConfigError::ValidationError("MongoDB URI cannot be empty".to_string()));
        }

        if self.database.is_empty() {
            error!("MongoDB database is empty");
            return Err(ConfigError::ValidationError("MongoDB database cannot be empty".to_string()));
        }

        if self.pool_size == 0 {
            error!("MongoDB pool size is 0");
            return Err(ConfigError::ValidationError("MongoDB pool size must be greater than 0".to_string()));
        }

        if self.connection_timeout_secs == 0 || self.server_selection_timeout_secs == 0 {
            error!("MongoDB timeout is 0");
            return Err(ConfigError::ValidationError("MongoDB timeouts must be greater than 0".to_string()));
        }

        if let Some(ref user) = self.username {
            if user.is_empty() {
                error!("MongoDB username is empty");
                return Err(ConfigError::ValidationError("MongoDB username cannot be empty if set".to_string()));
            }
        }
        if let Some(ref pass) = self.password {
            if pass.is_empty() {
                error!("MongoDB password is empty");
                return Err(ConfigError::ValidationError("MongoDB password cannot be empty if set".to_string()));
            }
        }
        info!("MongoDB configuration validation successful");
        Ok(())
    }

    pub fn party_collection_name(&self) -> &str {
        self.party_collection.as_deref().unwrap_or("parties")
    }

    pub fn quotation_collection_name(&self) -> &str {
        self.quotation_collection.as_deref().unwrap_or("quotations")
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "quotations".to_string(),
            username: None,
            password: None,
            party_collection: Some("parties".to_string()),
            quotation_collection: Some("quotations".to_string()),
            pool_size: 10,
            connection_timeout_secs: 5,
            server_selection_timeout_secs: 10,
        }
    }
}
