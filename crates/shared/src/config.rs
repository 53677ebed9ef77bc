//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger behaviour knobs.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Demo data used by the seeder.
    #[serde(default)]
    pub seed: SeedConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Lifetime of the VIEW/SIGN links minted when an invoice is sent.
    #[serde(default = "default_public_token_ttl_days")]
    pub public_token_ttl_days: i64,
    /// Random bytes per bearer token (32..=64).
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
}

fn default_public_token_ttl_days() -> i64 {
    30
}

fn default_token_bytes() -> usize {
    48
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            public_token_ttl_days: default_public_token_ttl_days(),
            token_bytes: default_token_bytes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "receipta=info,sea_orm=warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

/// Seeder configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// Display name of the demo business.
    #[serde(default = "default_seed_business_name")]
    pub business_name: String,
    /// Short code printed in document numbers.
    #[serde(default = "default_seed_business_code")]
    pub business_code: String,
    /// Default brand colour.
    #[serde(default = "default_seed_brand_color")]
    pub brand_color: String,
    /// Name of the demo client.
    #[serde(default = "default_seed_client_name")]
    pub client_name: String,
}

fn default_seed_business_name() -> String {
    "Receipta Demo Business".to_string()
}

fn default_seed_business_code() -> String {
    "RCP".to_string()
}

fn default_seed_brand_color() -> String {
    "#0F766E".to_string()
}

fn default_seed_client_name() -> String {
    "Demo Client".to_string()
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            business_name: default_seed_business_name(),
            business_code: default_seed_business_code(),
            brand_color: default_seed_brand_color(),
            client_name: default_seed_client_name(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Environment variables use the `RECEIPTA` prefix with `__` between
    /// sections, e.g. `RECEIPTA__DATABASE__URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("RECEIPTA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("RECEIPTA__DATABASE__URL", Some("postgres://localhost/receipta_test")),
                ("RECEIPTA__LEDGER__PUBLIC_TOKEN_TTL_DAYS", Some("7")),
                ("RECEIPTA__SEED__BUSINESS_CODE", Some("ACME")),
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(config.database.url, "postgres://localhost/receipta_test");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.ledger.public_token_ttl_days, 7);
                assert_eq!(config.ledger.token_bytes, 48);
                assert_eq!(config.seed.business_code, "ACME");
                assert_eq!(config.seed.brand_color, "#0F766E");
                assert!(!config.logging.json);
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars_unset(["RECEIPTA__DATABASE__URL"], || {
            assert!(AppConfig::load().is_err());
        });
    }

    #[test]
    fn test_ledger_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.public_token_ttl_days, 30);
        assert_eq!(ledger.token_bytes, 48);
    }
}
