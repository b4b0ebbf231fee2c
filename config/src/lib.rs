//! Configuration for Daily Check-In.
//!
//! `~/.dailycheckin/config.toml` is optional and every field in it is
//! optional. [`CheckinConfig`] is the file as written; [`Settings`] is the
//! validated, defaulted view the rest of the application uses.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use checkin_chain::rpc::DEFAULT_RPC_URL;
use checkin_chain::{BadgeSettings, Commitment};
use checkin_types::{Address, FeeSchedule, Lamports};
use serde::Deserialize;
use thiserror::Error;

/// Fee recipient used when the config names none.
pub const DEFAULT_TREASURY: &str = "9ny4NhFAkJWEwU1VSggsz1fbiwEn3o7GEXZ8NvdcDQhh";
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

const APP_DIR: &str = ".dailycheckin";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CheckinConfig {
    pub fees: Option<FeesConfig>,
    pub treasury: Option<TreasuryConfig>,
    pub badge: Option<BadgeConfig>,
    pub ledger: Option<LedgerConfig>,
    pub storage: Option<StorageConfig>,
    pub signer: Option<SignerConfig>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FeesConfig {
    pub min_lamports: Option<u64>,
    pub max_lamports: Option<u64>,
    /// Check the payer balance before building a transaction.
    pub check_balance: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TreasuryConfig {
    pub address: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct BadgeConfig {
    pub symbol: Option<String>,
    pub metadata_base_uri: Option<String>,
    pub image_uri: Option<String>,
    pub external_url: Option<String>,
    pub royalty_basis_points: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: Option<String>,
    pub commitment: Option<Commitment>,
    pub confirm_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SignerConfig {
    pub keypair_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    pub rpc_url: String,
    pub commitment: Commitment,
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub fees: FeeSchedule,
    pub check_balance: bool,
    pub treasury: Address,
    pub badge: BadgeSettings,
    pub ledger: LedgerSettings,
    pub data_dir: PathBuf,
    pub keypair_path: PathBuf,
}

/// Replace `${VAR}` with the variable's value; unset variables become empty.
/// An unclosed `${` is kept verbatim.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Expand `${VAR}` and a leading `~/`.
fn expand_path(value: &str) -> PathBuf {
    let expanded = expand_env_vars(value);
    if let Some(rest) = expanded.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(expanded)
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn default_keypair_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("solana")
        .join("id.json")
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR).join("config.toml"))
}

fn invalid(field: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

impl CheckinConfig {
    /// Load the config file, or `None` when there is none.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {}: {source}", path.display());
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        toml::from_str(&content).map_err(|source| {
            tracing::warn!("Failed to parse config at {}: {source}", path.display());
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Apply defaults and validate.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let fees_cfg = self.fees.clone().unwrap_or_default();
        let fees = FeeSchedule::new(
            fees_cfg
                .min_lamports
                .map_or(FeeSchedule::DEFAULT_MIN, Lamports::new),
            fees_cfg
                .max_lamports
                .map_or(FeeSchedule::DEFAULT_MAX, Lamports::new),
        )
        .map_err(|e| invalid("fees", e))?;

        let treasury_text = self
            .treasury
            .as_ref()
            .and_then(|t| t.address.as_deref())
            .map_or_else(|| DEFAULT_TREASURY.to_string(), expand_env_vars);
        let treasury: Address = treasury_text
            .parse()
            .map_err(|e| invalid("treasury.address", e))?;

        let badge_cfg = self.badge.clone().unwrap_or_default();
        let defaults = BadgeSettings::default();
        let badge = BadgeSettings {
            symbol: badge_cfg.symbol.unwrap_or(defaults.symbol),
            metadata_base_uri: badge_cfg
                .metadata_base_uri
                .map_or(defaults.metadata_base_uri, |u| expand_env_vars(&u)),
            image_uri: badge_cfg.image_uri.unwrap_or(defaults.image_uri),
            external_url: badge_cfg.external_url.unwrap_or(defaults.external_url),
            royalty_basis_points: badge_cfg
                .royalty_basis_points
                .unwrap_or(defaults.royalty_basis_points),
        };
        if badge.royalty_basis_points > 10_000 {
            return Err(invalid(
                "badge.royalty_basis_points",
                format!("{} exceeds 10000", badge.royalty_basis_points),
            ));
        }
        if badge.symbol.is_empty() {
            return Err(invalid("badge.symbol", "must not be empty"));
        }

        let ledger_cfg = self.ledger.clone().unwrap_or_default();
        let timeout_secs = ledger_cfg
            .confirm_timeout_secs
            .unwrap_or(DEFAULT_CONFIRM_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(invalid("ledger.confirm_timeout_secs", "must be positive"));
        }
        let ledger = LedgerSettings {
            rpc_url: ledger_cfg
                .rpc_url
                .map_or_else(|| DEFAULT_RPC_URL.to_string(), |u| expand_env_vars(&u)),
            commitment: ledger_cfg.commitment.unwrap_or_default(),
            confirm_timeout: Duration::from_secs(timeout_secs),
            poll_interval: Duration::from_millis(
                ledger_cfg
                    .poll_interval_ms
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
                    .max(1),
            ),
        };

        let data_dir = self
            .storage
            .as_ref()
            .and_then(|s| s.data_dir.as_deref())
            .map_or_else(|| app_dir().join("data"), expand_path);

        let keypair_path = self
            .signer
            .as_ref()
            .and_then(|s| s.keypair_path.as_deref())
            .map_or_else(default_keypair_path, expand_path);

        Ok(Settings {
            fees,
            check_balance: fees_cfg.check_balance.unwrap_or(true),
            treasury,
            badge,
            ledger,
            data_dir,
            keypair_path,
        })
    }
}
