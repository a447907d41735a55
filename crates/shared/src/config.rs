//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger consistency settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
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
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger consistency settings.
///
/// Amount thresholds are given as decimal strings, e.g. `"0.01"`.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Maximum allowed difference between a sub-ledger and its GL account.
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: Decimal,
    /// Whether a post pushes the GL balance into bound sub-ledgers.
    #[serde(default)]
    pub auto_sync_enabled: bool,
    /// Deepest level the hierarchy validator accepts.
    #[serde(default = "default_max_hierarchy_depth")]
    pub max_hierarchy_depth: u32,
    /// Drift at or above this amount is reported as high severity.
    #[serde(default = "default_drift_high_threshold")]
    pub drift_high_threshold: Decimal,
    /// Drift at or above this amount is reported as critical.
    #[serde(default = "default_drift_critical_threshold")]
    pub drift_critical_threshold: Decimal,
}

fn default_balance_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_max_hierarchy_depth() -> u32 {
    5
}

fn default_drift_high_threshold() -> Decimal {
    Decimal::new(100_000, 0)
}

fn default_drift_critical_threshold() -> Decimal {
    Decimal::new(1_000_000, 0)
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: default_balance_tolerance(),
            auto_sync_enabled: false,
            max_hierarchy_depth: default_max_hierarchy_depth(),
            drift_high_threshold: default_drift_high_threshold(),
            drift_critical_threshold: default_drift_critical_threshold(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `LEDGERKEEP__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("LEDGERKEEP").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
