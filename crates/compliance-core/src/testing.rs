// compliance-core/src/testing.rs
// ============================================================================
// Module: Mock Context
// Description: A canned-response Context for builtin tests.
// Purpose: Let compliance-builtins exercise system-specific procedures
// without a privileged sandbox, per Design Note "Command runner as a seam."
// Dependencies: std::{collections, path, time}
// ============================================================================

//! ## Overview
//! `MockContext` serves command output and file contents from maps keyed by
//! exact command / path, falling back to a longest-matching prefix so a test
//! can stub `"rpm -qa"` once and match any invocation with trailing flags.
//! Gated behind the `testing` feature so it never ships in a production
//! binary but remains importable from `compliance-builtins`'s dev-dependency
//! on `compliance-core` with `features = ["testing"]`.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::data::context::Context;
use crate::data::context::SpecialPath;

// ============================================================================
// SECTION: Mock Context
// ============================================================================

/// A `Context` that serves canned responses instead of touching the live system.
#[derive(Debug, Clone, Default)]
pub struct MockContext {
    /// Commands (or command prefixes) mapped to canned stdout.
    commands: BTreeMap<String, Result<String, String>>,
    /// Paths mapped to canned file contents.
    files: BTreeMap<PathBuf, Result<String, String>>,
    /// Special-path remappings, overriding `SystemContext`'s real defaults.
    special_paths: BTreeMap<&'static str, PathBuf>,
    /// The clock value `now()` returns.
    clock: Option<SystemTime>,
    /// The directory `make_tempdir()` returns.
    tempdir: Option<PathBuf>,
}

impl MockContext {
    /// Creates an empty mock context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stubs a command (matched by exact string, then longest prefix) to succeed with `stdout`.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.commands.insert(command.into(), Ok(stdout.into()));
        self
    }

    /// Stubs a command to fail with `message`.
    #[must_use]
    pub fn with_failing_command(mut self, command: impl Into<String>, message: impl Into<String>) -> Self {
        self.commands.insert(command.into(), Err(message.into()));
        self
    }

    /// Stubs a file path to read back as `contents`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), Ok(contents.into()));
        self
    }

    /// Stubs a file path to fail to read with `message`.
    #[must_use]
    pub fn with_missing_file(mut self, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        self.files.insert(path.into(), Err(message.into()));
        self
    }

    /// Remaps a logical special path to `path` for this test.
    #[must_use]
    pub fn with_special_path(mut self, logical: SpecialPath, path: impl Into<PathBuf>) -> Self {
        self.special_paths.insert(special_path_key(logical), path.into());
        self
    }

    /// Fixes the clock `now()` returns.
    #[must_use]
    pub fn with_clock(mut self, at: SystemTime) -> Self {
        self.clock = Some(at);
        self
    }

    /// Fixes the directory `make_tempdir()` returns.
    #[must_use]
    pub fn with_tempdir(mut self, path: impl Into<PathBuf>) -> Self {
        self.tempdir = Some(path.into());
        self
    }
}

/// Maps a `SpecialPath` to a stable string key for the remapping table.
const fn special_path_key(logical: SpecialPath) -> &'static str {
    match logical {
        SpecialPath::SshdConfig => "sshd_config",
        SpecialPath::Shadow => "shadow",
        SpecialPath::LoginDefs => "login_defs",
        SpecialPath::AuditRulesDir => "audit_rules_dir",
        SpecialPath::Shells => "shells",
        SpecialPath::Sudoers => "sudoers",
        SpecialPath::PackageCache => "package_cache",
    }
}

impl Context for MockContext {
    fn execute(&self, command: &str) -> Result<String, String> {
        if let Some(result) = self.commands.get(command) {
            return result.clone();
        }
        self.commands
            .iter()
            .filter(|(prefix, _)| command.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| Err(format!("no stubbed response for command '{command}'")))
    }

    fn get_file_contents(&self, path: &Path) -> Result<String, String> {
        self.files
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(format!("no stubbed contents for path '{}'", path.display())))
    }

    fn make_tempdir(&self) -> Result<PathBuf, String> {
        self.tempdir.clone().ok_or_else(|| "no stubbed tempdir".to_string())
    }

    fn now(&self) -> SystemTime {
        self.clock.unwrap_or(SystemTime::UNIX_EPOCH)
    }

    fn get_special_file_path(&self, logical: SpecialPath) -> PathBuf {
        self.special_paths
            .get(special_path_key(logical))
            .cloned()
            .unwrap_or_else(|| SystemContextDefaults::path_for(logical))
    }
}

/// Falls back to `SystemContext`'s real paths for any special path a test left unstubbed.
struct SystemContextDefaults;

impl SystemContextDefaults {
    fn path_for(logical: SpecialPath) -> PathBuf {
        crate::data::context::SystemContext::new().get_special_file_path(logical)
    }
}

#[cfg(test)]
mod tests {
    use super::MockContext;
    use crate::data::context::Context;

    #[test]
    fn exact_command_match_wins_over_prefix() {
        let ctx = MockContext::new()
            .with_command("rpm -qa", "generic\n")
            .with_command("rpm -qa --qf='%{NAME} %{EVR}\n'", "bash 5.1-6\n");
        assert_eq!(ctx.execute("rpm -qa --qf='%{NAME} %{EVR}\n'").expect("stubbed"), "bash 5.1-6\n");
    }

    #[test]
    fn unstubbed_command_fails() {
        let ctx = MockContext::new();
        assert!(ctx.execute("echo hi").is_err());
    }
}
