// compliance-builtins/src/package.rs
// ============================================================================
// Family: Package
// Description: PackageInstalled, backed by a TTL'd on-disk inventory cache.
// Purpose: Implement spec.md §4.4.4 / §6.5.
// Dependencies: crate::rpm_version, compliance_core::{BoundArgs, Context,
// IndicatorsTree, SpecialPath}
// ============================================================================

use std::collections::BTreeMap;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use compliance_core::BoundArgs;
use compliance_core::Context;
use compliance_core::ErrorKind;
use compliance_core::IndicatorsTree;
use compliance_core::ParamField;
use compliance_core::ParamType;
use compliance_core::SpecialPath;
use compliance_core::Status;
use compliance_logic::EngineResult;

use crate::rpm_version::compare_evr;

const PACKAGE_MANAGERS: &[&str] = &["dpkg", "rpm", "rpm-ndb"];

/// `PackageInstalled` schema.
pub const PACKAGE_INSTALLED_SCHEMA: &[ParamField] = &[
    ParamField { name: "packageName", ty: ParamType::String, required: true },
    ParamField { name: "minPackageVersion", ty: ParamType::Optional(&ParamType::String), required: false },
    ParamField { name: "packageManager", ty: ParamType::Optional(&ParamType::Enumeration(PACKAGE_MANAGERS)), required: false },
    ParamField { name: "test_cachePath", ty: ParamType::Optional(&ParamType::String), required: false },
];

/// A parsed package cache: the manager it was built from, its epoch, and `name -> version`.
struct Cache {
    manager: String,
    epoch: u64,
    packages: BTreeMap<String, String>,
}

/// Parses the `# PackageCache <mgr>@<epoch>` header plus `<name> <version>` body lines.
fn parse_cache(text: &str) -> Option<Cache> {
    let mut lines = text.lines();
    let header = lines.next()?;
    let rest = header.strip_prefix("# PackageCache ")?;
    let (manager, epoch) = rest.split_once('@')?;
    let epoch: u64 = epoch.trim().parse().ok()?;
    let mut packages = BTreeMap::new();
    for line in lines {
        if let Some((name, version)) = line.split_once(' ') {
            packages.insert(name.to_string(), version.trim().to_string());
        }
    }
    Some(Cache { manager: manager.to_string(), epoch, packages })
}

/// Renders a cache back to its on-disk text form.
fn render_cache(cache: &Cache) -> String {
    let mut text = format!("# PackageCache {}@{}\n", cache.manager, cache.epoch);
    for (name, version) in &cache.packages {
        text.push_str(&format!("{name} {version}\n"));
    }
    text
}

/// Detects the live package manager by probing `dpkg -l dpkg`, then `rpm -qa rpm`,
/// then `rpm -qa rpm-ndb` (SLES 15's ndb-backed rpm), in that order.
fn detect_manager(context: &dyn Context) -> Option<&'static str> {
    if context.execute("dpkg -l dpkg").is_ok() {
        return Some("dpkg");
    }
    if context.execute("rpm -qa rpm").is_ok() {
        return Some("rpm");
    }
    if context.execute("rpm -qa rpm-ndb").is_ok() {
        return Some("rpm-ndb");
    }
    None
}

/// Lists installed packages via the given manager.
fn list_packages(context: &dyn Context, manager: &str) -> Result<BTreeMap<String, String>, String> {
    match manager {
        "dpkg" => {
            let output = context.execute("dpkg -l")?;
            let mut packages = BTreeMap::new();
            for line in output.lines() {
                let mut fields = line.split_whitespace();
                let Some(status) = fields.next() else { continue };
                if status != "ii" {
                    continue;
                }
                let Some(name) = fields.next() else { continue };
                let Some(version) = fields.next() else { continue };
                let base_name = name.split(':').next().unwrap_or(name);
                packages.insert(base_name.to_string(), version.to_string());
            }
            Ok(packages)
        }
        _ => {
            let output = context.execute("rpm -qa --qf='%{NAME} %{EVR}\n'")?;
            let mut packages = BTreeMap::new();
            for line in output.lines() {
                if let Some((name, version)) = line.split_once(' ') {
                    packages.insert(name.to_string(), version.trim().to_string());
                }
            }
            Ok(packages)
        }
    }
}

/// Resolves the cache file path: the test override if present, else the special path.
fn cache_path(args: &BoundArgs, context: &dyn Context) -> Result<String, compliance_logic::EngineError> {
    if let Some(path) = args.string_opt("test_cachePath")? {
        return Ok(path.to_string());
    }
    Ok(context.get_special_file_path(SpecialPath::PackageCache).display().to_string())
}

/// Writes `cache` to `path` via `mkstemp`-then-`rename`, matching spec.md §6.5.
fn write_cache(context: &dyn Context, path: &str, cache: &Cache) -> Result<(), String> {
    let text = render_cache(cache);
    let escaped_path = path.replace('\'', "'\\''");
    let escaped_text = text.replace('\'', "'\\''");
    context.execute(&format!("printf '%s' '{escaped_text}' > '{escaped_path}.tmp' && mv '{escaped_path}.tmp' '{escaped_path}'"))?;
    Ok(())
}

/// Rebuilds the cache from the live system, auto-detecting (or using the requested) manager.
fn rebuild(context: &dyn Context, requested: Option<&str>) -> Result<Cache, String> {
    let manager = match requested {
        Some(manager) => manager,
        None => detect_manager(context).ok_or("no supported package manager detected")?,
    };
    let packages = list_packages(context, manager)?;
    let epoch = context.now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    Ok(Cache { manager: manager.to_string(), epoch, packages })
}

/// `PackageInstalled` audit entry point.
pub fn package_installed_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let package_name = args.string("packageName")?;
    let min_version = args.string_opt("minPackageVersion")?;
    let requested_manager = args.enumeration("packageManager").ok();
    let path = cache_path(args, context)?;

    let existing = context.get_file_contents(std::path::Path::new(&path)).ok().and_then(|text| parse_cache(&text));
    let now_secs = context.now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    let (fresh_secs, stale_secs) = context.package_cache_ttls();

    let cache = match existing {
        Some(cache) if now_secs.saturating_sub(cache.epoch) < fresh_secs => cache,
        Some(cache) if now_secs.saturating_sub(cache.epoch) < stale_secs => {
            let _ = rebuild(context, requested_manager.or(Some(cache.manager.as_str()))).and_then(|fresh| {
                write_cache(context, &path, &fresh)?;
                Ok(())
            });
            cache
        }
        _ => match rebuild(context, requested_manager) {
            Ok(fresh) => {
                if write_cache(context, &path, &fresh).is_err() {
                    return Ok(indicators.error(ErrorKind::System, format!("failed to persist package cache at '{path}'")));
                }
                fresh
            }
            Err(err) => return Ok(indicators.error(ErrorKind::System, format!("failed to rebuild package cache: {err}"))),
        },
    };

    let Some(installed) = cache.packages.get(package_name) else {
        return Ok(indicators.non_compliant(format!("package '{package_name}' is not installed")));
    };

    if let Some(min_version) = min_version {
        if compare_evr(installed, min_version) == std::cmp::Ordering::Less {
            return Ok(indicators.non_compliant(format!(
                "package '{package_name}' is installed at '{installed}', expected at least '{min_version}'"
            )));
        }
    }
    Ok(indicators.compliant(format!("package '{package_name}' is installed at '{installed}'")))
}

#[cfg(test)]
mod tests {
    use super::package_installed_audit;
    use super::PACKAGE_INSTALLED_SCHEMA;
    use compliance_core::IndicatorsTree;
    use compliance_core::Status;
    use compliance_core::bind;
    use compliance_core::testing::MockContext;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use std::time::UNIX_EPOCH;

    fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn fresh_cache_satisfies_minimum_version_without_invoking_the_manager() {
        let now = UNIX_EPOCH + Duration::from_secs(2_000_000);
        let cache_contents = format!("# PackageCache dpkg@{}\nbash 5.1-6\n", now.duration_since(UNIX_EPOCH).unwrap().as_secs() - 1);
        let raw = args(&[("packageName", "bash"), ("minPackageVersion", "5.0"), ("test_cachePath", "/tmp/cache")]);
        let bound = bind(PACKAGE_INSTALLED_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_file("/tmp/cache", cache_contents).with_clock(now);
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("PackageInstalled");
        let status = package_installed_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::Compliant);
    }

    #[test]
    fn missing_package_is_non_compliant() {
        let now = UNIX_EPOCH + Duration::from_secs(2_000_000);
        let cache_contents = format!("# PackageCache dpkg@{}\n", now.duration_since(UNIX_EPOCH).unwrap().as_secs() - 1);
        let raw = args(&[("packageName", "nginx"), ("test_cachePath", "/tmp/cache")]);
        let bound = bind(PACKAGE_INSTALLED_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_file("/tmp/cache", cache_contents).with_clock(now);
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("PackageInstalled");
        let status = package_installed_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
    }
}
