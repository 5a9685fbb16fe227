//! # Commerce Configuration
//!
//! Store identity and tunable business parameters.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MERCATO_STORE_NAME="Mercato Centro"                                │
//! │     MERCATO_INVOICE_TAX_BPS=1300                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/mercato/commerce.toml (Linux)                            │
//! │     ~/Library/Application Support/com.mercato.commerce/... (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     13% invoice tax, 100-point redemption floor                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # commerce.toml
//! [store]
//! name = "Mercato"
//! contact_email = "hola@mercato.example"
//! contact_phone = "+52 55 0000 0000"
//! address = "Av. Central 123, CDMX"
//! bank_instructions = "CLABE 012345678901234567, ref. order number"
//!
//! [tax]
//! invoice_tax_bps = 1300  # 13%
//!
//! [loyalty]
//! min_redeem_points = 100
//! point_value_cents = 1
//! coupon_validity_days = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use mercato_core::{
    TaxRate, DEFAULT_INVOICE_TAX_BPS, DEFAULT_MIN_REDEEM_POINTS, DEFAULT_POINT_VALUE_CENTS,
    DEFAULT_REDEMPTION_VALIDITY_DAYS,
};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Store Configuration
// =============================================================================

/// Identity of the store, printed on invoices and payment instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store display name.
    #[serde(default = "default_store_name")]
    pub name: String,

    /// Support address shown on documents.
    #[serde(default)]
    pub contact_email: Option<String>,

    /// Support phone shown on documents.
    #[serde(default)]
    pub contact_phone: Option<String>,

    /// Physical address shown on invoices.
    #[serde(default)]
    pub address: Option<String>,

    /// Free text presented to customers paying by bank transfer.
    #[serde(default)]
    pub bank_instructions: Option<String>,
}

fn default_store_name() -> String {
    "Mercato".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            name: default_store_name(),
            contact_email: None,
            contact_phone: None,
            address: None,
            bank_instructions: None,
        }
    }
}

// =============================================================================
// Tax Configuration
// =============================================================================

/// Tax applied to invoices.
///
/// Catalog prices are tax inclusive, so orders themselves never add tax.
/// Invoices break the tax out on top of the discounted base for fiscal
/// reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxConfig {
    /// Invoice tax rate in basis points (1300 = 13%).
    #[serde(default = "default_invoice_tax_bps")]
    pub invoice_tax_bps: u32,
}

fn default_invoice_tax_bps() -> u32 {
    DEFAULT_INVOICE_TAX_BPS
}

impl Default for TaxConfig {
    fn default() -> Self {
        TaxConfig {
            invoice_tax_bps: default_invoice_tax_bps(),
        }
    }
}

// =============================================================================
// Loyalty Configuration
// =============================================================================

/// Loyalty program parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyConfig {
    /// Smallest redemption a customer may request, in points.
    #[serde(default = "default_min_redeem_points")]
    pub min_redeem_points: i64,

    /// Cash value of one point, in cents.
    #[serde(default = "default_point_value_cents")]
    pub point_value_cents: i64,

    /// How long a redemption coupon stays valid, in days.
    #[serde(default = "default_coupon_validity_days")]
    pub coupon_validity_days: i64,
}

fn default_min_redeem_points() -> i64 {
    DEFAULT_MIN_REDEEM_POINTS
}

fn default_point_value_cents() -> i64 {
    DEFAULT_POINT_VALUE_CENTS
}

fn default_coupon_validity_days() -> i64 {
    DEFAULT_REDEMPTION_VALIDITY_DAYS
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        LoyaltyConfig {
            min_redeem_points: default_min_redeem_points(),
            point_value_cents: default_point_value_cents(),
            coupon_validity_days: default_coupon_validity_days(),
        }
    }
}

// =============================================================================
// Main Commerce Configuration
// =============================================================================

/// Complete engine configuration.
///
/// ## Example Config File
/// ```toml
/// [store]
/// name = "Mercato"
/// bank_instructions = "CLABE 012345678901234567"
///
/// [tax]
/// invoice_tax_bps = 1300
///
/// [loyalty]
/// min_redeem_points = 100
/// point_value_cents = 1
/// coupon_validity_days = 30
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommerceConfig {
    /// Store identity.
    #[serde(default)]
    pub store: StoreConfig,

    /// Tax settings.
    #[serde(default)]
    pub tax: TaxConfig,

    /// Loyalty program settings.
    #[serde(default)]
    pub loyalty: LoyaltyConfig,
}

impl CommerceConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (commerce.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading commerce config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load commerce config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .map_err(|e| EngineError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Commerce config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.store.name.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "store.name must not be empty".into(),
            ));
        }

        if self.tax.invoice_tax_bps > 10_000 {
            return Err(EngineError::InvalidConfig(format!(
                "tax.invoice_tax_bps must be at most 10000 (100%), got {}",
                self.tax.invoice_tax_bps
            )));
        }

        if self.loyalty.min_redeem_points <= 0 {
            return Err(EngineError::InvalidConfig(
                "loyalty.min_redeem_points must be positive".into(),
            ));
        }

        if self.loyalty.point_value_cents <= 0 {
            return Err(EngineError::InvalidConfig(
                "loyalty.point_value_cents must be positive".into(),
            ));
        }

        if self.loyalty.coupon_validity_days <= 0 {
            return Err(EngineError::InvalidConfig(
                "loyalty.coupon_validity_days must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("MERCATO_STORE_NAME") {
            debug!(store_name = %name, "Overriding store name from environment");
            self.store.name = name;
        }

        if let Ok(instructions) = std::env::var("MERCATO_BANK_INSTRUCTIONS") {
            self.store.bank_instructions = Some(instructions);
        }

        if let Ok(bps) = std::env::var("MERCATO_INVOICE_TAX_BPS") {
            if let Ok(v) = bps.parse::<u32>() {
                debug!(invoice_tax_bps = v, "Overriding invoice tax from environment");
                self.tax.invoice_tax_bps = v;
            } else {
                warn!(value = %bps, "Ignoring unparsable MERCATO_INVOICE_TAX_BPS");
            }
        }

        if let Ok(points) = std::env::var("MERCATO_MIN_REDEEM_POINTS") {
            if let Ok(v) = points.parse::<i64>() {
                self.loyalty.min_redeem_points = v;
            }
        }

        if let Ok(cents) = std::env::var("MERCATO_POINT_VALUE_CENTS") {
            if let Ok(v) = cents.parse::<i64>() {
                self.loyalty.point_value_cents = v;
            }
        }

        if let Ok(days) = std::env::var("MERCATO_COUPON_VALIDITY_DAYS") {
            if let Ok(v) = days.parse::<i64>() {
                self.loyalty.coupon_validity_days = v;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "mercato", "commerce").map(|dirs| {
            let config_dir = dirs.config_dir();
            config_dir.join("commerce.toml")
        })
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The invoice tax rate as a typed rate.
    pub fn invoice_tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax.invoice_tax_bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CommerceConfig::default();
        assert_eq!(config.store.name, "Mercato");
        assert_eq!(config.tax.invoice_tax_bps, 1300);
        assert_eq!(config.loyalty.min_redeem_points, 100);
        assert_eq!(config.loyalty.point_value_cents, 1);
        assert_eq!(config.loyalty.coupon_validity_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = CommerceConfig::default();

        config.tax.invoice_tax_bps = 10_001;
        assert!(config.validate().is_err());
        config.tax.invoice_tax_bps = 10_000;
        assert!(config.validate().is_ok());

        config.loyalty.min_redeem_points = 0;
        assert!(config.validate().is_err());
        config.loyalty.min_redeem_points = 1;

        config.loyalty.point_value_cents = -1;
        assert!(config.validate().is_err());
        config.loyalty.point_value_cents = 1;

        config.store.name = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: CommerceConfig = toml::from_str(
            r#"
            [store]
            name = "Mercato Centro"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.name, "Mercato Centro");
        assert_eq!(config.tax.invoice_tax_bps, 1300);
        assert_eq!(config.loyalty.min_redeem_points, 100);
    }

    #[test]
    fn test_toml_serialization() {
        let config = CommerceConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[tax]"));
        assert!(toml_str.contains("[loyalty]"));
    }

    #[test]
    fn test_invoice_tax_rate_accessor() {
        let config = CommerceConfig::default();
        assert_eq!(config.invoice_tax_rate().bps(), 1300);
    }
}
