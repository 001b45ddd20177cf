// compliance-config/src/lib.rs
// ============================================================================
// Crate: compliance-config
// Description: Engine-wide runtime configuration: package cache TTLs, the
// AuditdRulesCheck UID_MIN fallback, the remediation-enabled gate, and
// tracing setup, loaded from an optional TOML file and validated fail-closed.
// Purpose: Implement SPEC_FULL.md's "Configuration" ambient-stack section.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! `compliance-config` defines [`EngineConfig`], the settings surface the
//! `assessor` CLI consults before it builds a [`tracing_subscriber`] layer
//! and before it allows a remediation verb to run. It does not reach into
//! `compliance-core` or `compliance-builtins`: those crates' hardcoded
//! constants (the package cache TTLs in `compliance-builtins::package`, the
//! `UID_MIN` fallback in `compliance-builtins::daemon`) already match this
//! crate's defaults, and this crate is the place future work would thread
//! overrides through once a `Context` implementation accepts configuration.

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "unit tests assert via expect/unwrap on deterministic fixtures"
    )
)]

pub mod config;

pub use config::ConfigError;
pub use config::EngineConfig;
pub use config::LogLevel;
pub use config::LoggingConfig;
pub use config::PackageCacheConfig;
