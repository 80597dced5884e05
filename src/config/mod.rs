use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::Period;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// Initial dashboard state
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default = "default_period")]
    pub default_period: Period,

    /// Pin "now" for window computation; today when unset.
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
}

/// Where records come from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Directory of CSV fixtures; the bundled sample data when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_synth_seed")]
    pub synth_seed: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_period() -> Period {
    Period::OneYear
}
fn default_synth_seed() -> u64 {
    20_240_101
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_period: default_period(),
            reference_date: None,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: None,
            synth_seed: default_synth_seed(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        Self::from_config(cfg)
    }

    /// Deserialize a built config; any bad key fails the whole load.
    pub fn from_config(cfg: config::Config) -> Result<Self> {
        cfg.try_deserialize().context("Invalid configuration")
    }
}
