use anyhow::Result;
use chrono::Weekday;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::inventory::StockThresholds;
use crate::workflow::WorkflowRules;

/// Main configuration structure for da-desk
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DaDeskConfig {
    /// Delivery workflow timings and validation
    pub workflow: WorkflowConfig,
    /// Weekly performance, strike and inventory rules
    pub performance: PerformanceConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Hours from out-for-delivery to delivered that still earn the SLA bonus
    pub sla_window_hours: u32,
    /// Exact OTP length accepted at step 5
    pub otp_length: usize,
    /// How long the bonus banner stays up
    pub bonus_banner_seconds: u64,
    /// Delay before the panel closes itself after delivery
    pub auto_close_seconds: u64,
    /// Naira paid per delivery inside the SLA window
    pub sla_bonus_naira: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PerformanceConfig {
    /// Weekly delivery rate (percent) that unlocks the weekly bonus
    pub weekly_rate_threshold_percent: f64,
    pub weekly_bonus_naira: u32,
    /// Strike count at which an agent is blacklisted
    pub max_strikes: u32,
    pub low_stock_threshold: u32,
    pub watch_stock_threshold: u32,
    /// Weekly stock photo deadline
    pub photo_audit_weekday: Weekday,
    pub photo_audit_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for DaDeskConfig {
    fn default() -> Self {
        Self {
            workflow: WorkflowConfig {
                sla_window_hours: 10,
                otp_length: 4,
                bonus_banner_seconds: 6,
                auto_close_seconds: 2,
                sla_bonus_naira: 200,
            },
            performance: PerformanceConfig {
                weekly_rate_threshold_percent: 80.0,
                weekly_bonus_naira: 300,
                max_strikes: 3,
                low_stock_threshold: 5,
                watch_stock_threshold: 10,
                photo_audit_weekday: Weekday::Fri,
                photo_audit_hour: 13,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
            },
        }
    }
}

impl From<&WorkflowConfig> for WorkflowRules {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            sla_window: chrono::Duration::hours(config.sla_window_hours as i64),
            otp_length: config.otp_length,
            bonus_banner: std::time::Duration::from_secs(config.bonus_banner_seconds),
            auto_close: std::time::Duration::from_secs(config.auto_close_seconds),
            sla_bonus_naira: config.sla_bonus_naira,
        }
    }
}

impl DaDeskConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (da-desk.toml, .da-desk-rc)
    /// 3. Environment variables (DA_DESK__WORKFLOW__OTP_LENGTH=6)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&DaDeskConfig::default())?);

        let toml_path = dir.join("da-desk.toml");
        if toml_path.exists() {
            builder = builder.add_source(File::from(toml_path));
        }

        let rc_path = dir.join(".da-desk-rc");
        if rc_path.exists() {
            builder = builder.add_source(File::from(rc_path).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("DA_DESK")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: DaDeskConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workflow.otp_length == 0 {
            anyhow::bail!("workflow.otp_length must be at least 1");
        }
        if self.workflow.sla_window_hours == 0 {
            anyhow::bail!("workflow.sla_window_hours must be at least 1");
        }
        if self.performance.low_stock_threshold > self.performance.watch_stock_threshold {
            anyhow::bail!("performance.low_stock_threshold cannot exceed watch_stock_threshold");
        }
        if self.performance.photo_audit_hour > 23 {
            anyhow::bail!("performance.photo_audit_hour must be 0-23");
        }
        Ok(())
    }

    pub fn workflow_rules(&self) -> WorkflowRules {
        WorkflowRules::from(&self.workflow)
    }

    pub fn stock_thresholds(&self) -> StockThresholds {
        StockThresholds {
            low: self.performance.low_stock_threshold,
            watch: self.performance.watch_stock_threshold,
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<DaDeskConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = DaDeskConfig::load_env_file();
        DaDeskConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static DaDeskConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
