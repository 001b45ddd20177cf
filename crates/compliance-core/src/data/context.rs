// compliance-core/src/data/context.rs
// ============================================================================
// Module: Evaluation Context
// Description: The evaluator's environment seam: command runner, file
// reader, tempdir maker, clock, and special-path remapping.
// Purpose: Let builtins touch the live system through one trait object so
// tests can substitute canned responses without a privileged sandbox.
// Dependencies: std::{process, fs, time}, tracing, tempfile
// ============================================================================

//! ## Overview
//! `Context` is read-only during one evaluation pass: it describes the
//! system under test, it does not accumulate state. [`SystemContext`] is the
//! production implementation; the test-only `MockContext` in
//! `crate::testing` (behind the `testing` feature) serves canned command
//! output and file contents keyed by prefix, matching Design Note "Command
//! runner as a seam."

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::time::SystemTime;

use tracing::debug;

// ============================================================================
// SECTION: Context Trait
// ============================================================================

/// A logical, well-known filesystem path a `Context` can remap for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialPath {
    /// `/etc/ssh/sshd_config`.
    SshdConfig,
    /// `/etc/shadow`.
    Shadow,
    /// `/etc/login.defs`.
    LoginDefs,
    /// `/etc/audit/rules.d`.
    AuditRulesDir,
    /// `/etc/shells`.
    Shells,
    /// `/etc/sudoers`.
    Sudoers,
    /// The package inventory cache file.
    PackageCache,
}

/// The evaluator's environment: process execution, file reads, the clock,
/// and a tempdir factory.
///
/// # Invariants
/// - Implementations must not mutate shared state between calls within one
///   evaluation pass; any caching belongs to the caller, not the `Context`.
pub trait Context {
    /// Runs `command` through a shell and returns its captured stdout.
    ///
    /// # Errors
    ///
    /// Returns an error message (not a typed error — builtins fold the text
    /// directly into `Status::Error`) when the process cannot be spawned or
    /// exits non-zero.
    fn execute(&self, command: &str) -> Result<String, String>;

    /// Reads the full contents of `path` as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error message when the path cannot be read or decoded.
    fn get_file_contents(&self, path: &Path) -> Result<String, String>;

    /// Creates a fresh, empty temporary directory and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an error message when the directory cannot be created.
    fn make_tempdir(&self) -> Result<PathBuf, String>;

    /// Returns the current time.
    fn now(&self) -> SystemTime;

    /// Resolves a logical, well-known path to its real filesystem location.
    fn get_special_file_path(&self, logical: SpecialPath) -> PathBuf;

    /// Returns the package cache's `(fresh_secs, stale_secs)` TTL tiers (spec.md §6.5).
    ///
    /// Defaults to the spec's own constants; [`SystemContext`] overrides this
    /// with whatever `compliance-config::EngineConfig` resolved.
    fn package_cache_ttls(&self) -> (u64, u64) {
        (3000, 12_600)
    }

    /// Returns the `UID_MIN` fallback `AuditdRulesCheck` uses when
    /// `/etc/login.defs` is absent or has no `UID_MIN` line.
    fn uid_min_fallback(&self) -> u32 {
        1000
    }
}

// ============================================================================
// SECTION: System Context
// ============================================================================

/// The production `Context`, backed by real processes, files, and the clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemContext {
    /// Package cache `(fresh_secs, stale_secs)` TTL tiers.
    package_cache_ttls: (u64, u64),
    /// `UID_MIN` fallback for `AuditdRulesCheck`.
    uid_min_fallback: u32,
}

impl Default for SystemContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemContext {
    /// Creates a new production context using the spec's default TTLs and `UID_MIN` fallback.
    #[must_use]
    pub const fn new() -> Self {
        Self { package_cache_ttls: (3000, 12_600), uid_min_fallback: 1000 }
    }

    /// Creates a production context carrying configured TTLs and `UID_MIN` fallback,
    /// as resolved by `compliance-config::EngineConfig`.
    #[must_use]
    pub const fn with_config(fresh_secs: u64, stale_secs: u64, uid_min_fallback: u32) -> Self {
        Self { package_cache_ttls: (fresh_secs, stale_secs), uid_min_fallback }
    }
}

impl fmt::Display for SystemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SystemContext")
    }
}

impl Context for SystemContext {
    fn execute(&self, command: &str) -> Result<String, String> {
        debug!(command, "executing command");
        let output = Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|err| format!("failed to spawn '{command}': {err}"))?;
        if !output.status.success() {
            return Err(format!(
                "command '{command}' exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        String::from_utf8(output.stdout).map_err(|err| format!("command '{command}' produced non-UTF-8 output: {err}"))
    }

    fn get_file_contents(&self, path: &Path) -> Result<String, String> {
        debug!(path = %path.display(), "reading file");
        std::fs::read_to_string(path).map_err(|err| format!("failed to read {}: {err}", path.display()))
    }

    fn make_tempdir(&self) -> Result<PathBuf, String> {
        tempfile::tempdir()
            .map(tempfile::TempDir::into_path)
            .map_err(|err| format!("failed to create tempdir: {err}"))
    }

    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn get_special_file_path(&self, logical: SpecialPath) -> PathBuf {
        match logical {
            SpecialPath::SshdConfig => PathBuf::from("/etc/ssh/sshd_config"),
            SpecialPath::Shadow => PathBuf::from("/etc/shadow"),
            SpecialPath::LoginDefs => PathBuf::from("/etc/login.defs"),
            SpecialPath::AuditRulesDir => PathBuf::from("/etc/audit/rules.d"),
            SpecialPath::Shells => PathBuf::from("/etc/shells"),
            SpecialPath::Sudoers => PathBuf::from("/etc/sudoers"),
            SpecialPath::PackageCache => PathBuf::from("/var/lib/GuestConfig/ComplianceEnginePackageCache"),
        }
    }

    fn package_cache_ttls(&self) -> (u64, u64) {
        self.package_cache_ttls
    }

    fn uid_min_fallback(&self) -> u32 {
        self.uid_min_fallback
    }
}
