//! Configuration from environment variables.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `NXV_CHAIN_ID` | `HostConfig::chain_id` | 1 |
//! | `NXV_MAX_CALL_DEPTH` | `HostConfig::max_call_depth` | 128 (at most [`MAX_CALL_DEPTH`]) |
//! | `NXV_REPLAY_POLICY` | `WalletConfig::replay_policy` | `revert` |
//! | `NXV_MAX_VALIDATION_DEPTH` | `WalletConfig::max_validation_depth` | 64 |
//! | `NXV_ENABLE_TRACING` | `ServiceConfig::enable_tracing` | true |
//!
//! Unparsable or out-of-range values are logged and the default is kept.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::warn;

/// What happens to the nonce when an authorized call fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplayPolicy {
    /// Abort the whole operation with `call-failed`; the nonce stays unused.
    #[default]
    RevertAll,
    /// Keep the nonce consumed and emit `ExecutionFailure`.
    ConsumeNonce,
}

impl FromStr for ReplayPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "revert" | "revert_all" => Ok(Self::RevertAll),
            "consume" | "consume_nonce" => Ok(Self::ConsumeNonce),
            _ => Err(ConfigError::InvalidValue {
                key: "NXV_REPLAY_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

/// Deepest frame nesting any host will run.
///
/// Frames recurse on the native stack; much deeper limits overflow a 2 MiB
/// thread before `CallDepthExceeded` can be raised.
pub const MAX_CALL_DEPTH: u16 = 256;

/// Default frame nesting limit.
pub const DEFAULT_CALL_DEPTH: u16 = 128;

/// Execution host parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Chain id mixed into every domain separator.
    pub chain_id: u64,
    /// Maximum nesting of call frames, clamped to [`MAX_CALL_DEPTH`].
    pub max_call_depth: u16,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            max_call_depth: DEFAULT_CALL_DEPTH,
        }
    }
}

/// Wallet contract parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Nonce handling when the authorized call fails.
    pub replay_policy: ReplayPolicy,
    /// Deepest frame at which a contract signer is still consulted.
    pub max_validation_depth: u16,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            replay_policy: ReplayPolicy::RevertAll,
            max_validation_depth: 64,
        }
    }
}

/// Service configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Host parameters.
    pub host: HostConfig,
    /// Wallet parameters.
    pub wallet: WalletConfig,
    /// Emit per-operation tracing spans and events.
    pub enable_tracing: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            wallet: WalletConfig::default(),
            enable_tracing: true,
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by `NXV_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: HostConfig {
                chain_id: read(&lookup, "NXV_CHAIN_ID", parse_number, defaults.host.chain_id),
                max_call_depth: read(
                    &lookup,
                    "NXV_MAX_CALL_DEPTH",
                    parse_call_depth,
                    defaults.host.max_call_depth,
                ),
            },
            wallet: WalletConfig {
                replay_policy: read(
                    &lookup,
                    "NXV_REPLAY_POLICY",
                    |_, raw| raw.parse(),
                    defaults.wallet.replay_policy,
                ),
                max_validation_depth: read(
                    &lookup,
                    "NXV_MAX_VALIDATION_DEPTH",
                    parse_number,
                    defaults.wallet.max_validation_depth,
                ),
            },
            enable_tracing: read(&lookup, "NXV_ENABLE_TRACING", parse_flag, defaults.enable_tracing),
        }
    }
}

fn read<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    parse: impl Fn(&'static str, &str) -> Result<T, ConfigError>,
    default: T,
) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match parse(key, raw.trim()) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "ignoring configuration override");
            default
        }
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_call_depth(key: &'static str, raw: &str) -> Result<u16, ConfigError> {
    let depth: u16 = parse_number(key, raw)?;
    if depth > MAX_CALL_DEPTH {
        return Err(ConfigError::OutOfRange {
            key,
            value: raw.to_string(),
            max: u64::from(MAX_CALL_DEPTH),
        });
    }
    Ok(depth)
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}
