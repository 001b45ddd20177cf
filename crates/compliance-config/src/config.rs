// compliance-config/src/config.rs
// ============================================================================
// Module: Engine Configuration
// Description: Configuration loading and validation for the compliance
// engine's ambient runtime settings.
// Purpose: Provide strict, fail-closed config parsing with sane defaults.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is loaded from an optional TOML file. When no file is
//! found at the resolved path, [`EngineConfig::load`] returns
//! [`EngineConfig::default`] rather than failing, since every setting here
//! has a safe default; an explicitly-named path that does not exist, or a
//! file that fails to parse or validate, is always an error.

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "compliance-engine.toml";
/// Environment variable used to override the config path.
const CONFIG_ENV_VAR: &str = "COMPLIANCE_ENGINE_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

/// Default package cache "fresh" TTL in seconds, per spec.md §6.5.
const DEFAULT_FRESH_SECS: u64 = 3000;
/// Default package cache "stale" TTL in seconds, per spec.md §6.5.
const DEFAULT_STALE_SECS: u64 = 12_600;
/// Default `UID_MIN` fallback used by `AuditdRulesCheck` when
/// `/etc/login.defs` is absent or has no `UID_MIN` line.
const DEFAULT_UID_MIN_FALLBACK: u32 = 1000;

/// Engine-wide runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Package cache freshness TTLs (spec.md §6.5).
    #[serde(default)]
    pub package_cache: PackageCacheConfig,
    /// Fallback `UID_MIN` for `AuditdRulesCheck` when `/etc/login.defs`
    /// cannot be read or has no `UID_MIN` line.
    #[serde(default = "default_uid_min_fallback")]
    pub uid_min_fallback: u32,
    /// Whether remediation verbs are permitted to run at all. When `false`,
    /// a deployment runs the engine strictly as an auditor; the CLI shell
    /// is responsible for enforcing this gate before dispatching a
    /// remediate action.
    #[serde(default = "default_remediation_enabled")]
    pub remediation_enabled: bool,
    /// Tracing setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            package_cache: PackageCacheConfig::default(),
            uid_min_fallback: default_uid_min_fallback(),
            remediation_enabled: default_remediation_enabled(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: `path`, then the `COMPLIANCE_ENGINE_CONFIG`
    /// environment variable, then `compliance-engine.toml` in the current
    /// directory. If the resolved path was not explicitly requested (by
    /// `path` or the environment variable) and does not exist, the default
    /// configuration is returned instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicitly-requested path is
    /// missing, the file exceeds the size limit, it is not valid UTF-8 or
    /// TOML, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path);
        if !resolved.exists() {
            if explicit {
                return Err(ConfigError::Io(format!("config file not found: {}", resolved.display())));
            }
            return Ok(Self::default());
        }

        let metadata = fs::metadata(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }

        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        let content = std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.package_cache.validate()?;
        if self.uid_min_fallback == 0 {
            return Err(ConfigError::Invalid("uid_min_fallback must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Package cache freshness TTLs, per spec.md §6.5: a cache younger than
/// `fresh_secs` is served as-is, one younger than `stale_secs` is served
/// but a rebuild is attempted, and one older than `stale_secs` is always
/// rebuilt.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageCacheConfig {
    /// Age in seconds below which the cache is considered fresh.
    #[serde(default = "default_fresh_secs")]
    pub fresh_secs: u64,
    /// Age in seconds below which the cache is considered stale-but-usable.
    #[serde(default = "default_stale_secs")]
    pub stale_secs: u64,
}

impl Default for PackageCacheConfig {
    fn default() -> Self {
        Self { fresh_secs: default_fresh_secs(), stale_secs: default_stale_secs() }
    }
}

impl PackageCacheConfig {
    /// Validates that the TTL tiers are non-zero and strictly ordered.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.fresh_secs == 0 {
            return Err(ConfigError::Invalid("package_cache.fresh_secs must be greater than zero".to_string()));
        }
        if self.stale_secs <= self.fresh_secs {
            return Err(ConfigError::Invalid("package_cache.stale_secs must be greater than fresh_secs".to_string()));
        }
        Ok(())
    }
}

/// Tracing setup consulted by the `assessor` CLI before constructing its
/// `tracing_subscriber` layer.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level emitted by the default subscriber.
    #[serde(default)]
    pub level: LogLevel,
}

/// Tracing verbosity level, mirroring spec.md §7's level vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Per-step evidence: every builtin call logs its bound arguments and
    /// verdict.
    Trace,
    /// Per-step evidence, quieter than `Trace`.
    Debug,
    /// Phase transitions: resource read, compile, evaluate, format.
    #[default]
    Info,
    /// Recoverable anomalies that do not abort evaluation.
    Warn,
    /// System-call failures.
    Error,
}

impl LogLevel {
    /// Returns the `tracing::Level`-compatible lowercase name, for building
    /// an `EnvFilter` directive in the CLI shell.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Resolves the config path from an explicit argument, the environment, or
/// the default filename, reporting whether the path was explicitly
/// requested (in which case a missing file is an error rather than a cue
/// to fall back to defaults).
fn resolve_path(path: Option<&Path>) -> (PathBuf, bool) {
    if let Some(path) = path {
        return (path.to_path_buf(), true);
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        return (PathBuf::from(env_path), true);
    }
    (PathBuf::from(DEFAULT_CONFIG_NAME), false)
}

/// Default value for [`PackageCacheConfig::fresh_secs`].
const fn default_fresh_secs() -> u64 {
    DEFAULT_FRESH_SECS
}

/// Default value for [`PackageCacheConfig::stale_secs`].
const fn default_stale_secs() -> u64 {
    DEFAULT_STALE_SECS
}

/// Default value for [`EngineConfig::uid_min_fallback`].
const fn default_uid_min_fallback() -> u32 {
    DEFAULT_UID_MIN_FALLBACK
}

/// Default value for [`EngineConfig::remediation_enabled`].
const fn default_remediation_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;
    use super::PackageCacheConfig;
    use std::io::Write;

    #[test]
    fn defaults_match_spec_ttls() {
        let config = EngineConfig::default();
        assert_eq!(config.package_cache.fresh_secs, 3000);
        assert_eq!(config.package_cache.stale_secs, 12_600);
        assert_eq!(config.uid_min_fallback, 1000);
        assert!(config.remediation_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("does-not-exist.toml");
        let err = EngineConfig::load(Some(&missing)).expect_err("explicit path must exist");
        assert!(matches!(err, super::ConfigError::Io(_)));
    }

    #[test]
    fn loads_and_overrides_from_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("compliance-engine.toml");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(
            file,
            "uid_min_fallback = 500\nremediation_enabled = false\n\n[package_cache]\nfresh_secs = 60\nstale_secs = 120\n\n[logging]\nlevel = \"debug\""
        )
        .expect("write");
        drop(file);

        let config = EngineConfig::load(Some(&path)).expect("loads");
        assert_eq!(config.uid_min_fallback, 500);
        assert!(!config.remediation_enabled);
        assert_eq!(config.package_cache.fresh_secs, 60);
        assert_eq!(config.package_cache.stale_secs, 120);
        assert_eq!(config.logging.level, super::LogLevel::Debug);
    }

    #[test]
    fn rejects_unknown_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("compliance-engine.toml");
        std::fs::write(&path, "bogus_field = true\n").expect("write");
        let err = EngineConfig::load(Some(&path)).expect_err("unknown key must fail");
        assert!(matches!(err, super::ConfigError::Parse(_)));
    }

    #[test]
    fn package_cache_validate_rejects_zero_fresh_secs() {
        let cache = PackageCacheConfig { fresh_secs: 0, stale_secs: 100 };
        assert!(cache.validate().is_err());
    }

    #[test]
    fn package_cache_validate_rejects_stale_not_greater_than_fresh() {
        let cache = PackageCacheConfig { fresh_secs: 100, stale_secs: 100 };
        assert!(cache.validate().is_err());
    }

    #[test]
    fn oversized_config_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("compliance-engine.toml");
        let oversized = "# ".to_string() + &"x".repeat(70 * 1024);
        std::fs::write(&path, oversized).expect("write");
        let err = EngineConfig::load(Some(&path)).expect_err("oversized file must fail");
        assert!(matches!(err, super::ConfigError::Invalid(_)));
    }
}
