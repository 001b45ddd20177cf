// compliance-builtins/src/rpm_version.rs
// ============================================================================
// Module: RPM EVR Version Comparator
// Description: epoch:version-release comparison per RPM's rpmvercmp rules.
// Purpose: Implement spec.md §4.4.4's version-comparison requirement.
// Dependencies: std::cmp::Ordering
// ============================================================================

use std::cmp::Ordering;

/// One parsed `epoch:version-release` triple.
struct Evr<'a> {
    epoch: &'a str,
    version: &'a str,
    release: &'a str,
}

/// Splits `text` into `(epoch, version, release)`, defaulting a missing epoch to `"0"`.
fn parse_evr(text: &str) -> Evr<'_> {
    let (epoch, rest) = text.split_once(':').unwrap_or(("0", text));
    let (version, release) = rest.rsplit_once('-').unwrap_or((rest, ""));
    Evr { epoch, version, release }
}

/// Splits a version segment into alternating digit-run / non-digit-run tokens.
fn tokenize(segment: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let bytes = segment.as_bytes();
    while start < bytes.len() {
        let is_digit = bytes[start].is_ascii_digit();
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() == is_digit {
            end += 1;
        }
        tokens.push(&segment[start..end]);
        start = end;
    }
    tokens
}

/// Compares two version/release segments using rpmvercmp's digit-beats-alpha rule.
fn compare_segment(a: &str, b: &str) -> Ordering {
    let (ta, tb) = (tokenize(a), tokenize(b));
    let len = ta.len().max(tb.len());
    for index in 0..len {
        let (pa, pb) = (ta.get(index).copied().unwrap_or(""), tb.get(index).copied().unwrap_or(""));
        let a_digit = pa.as_bytes().first().is_some_and(u8::is_ascii_digit);
        let b_digit = pb.as_bytes().first().is_some_and(u8::is_ascii_digit);
        match (a_digit, b_digit, pa.is_empty(), pb.is_empty()) {
            (_, _, true, true) => continue,
            (_, _, true, false) => return if b_digit { Ordering::Less } else { Ordering::Greater },
            (_, _, false, true) => return if a_digit { Ordering::Greater } else { Ordering::Less },
            (true, false, ..) => return Ordering::Greater,
            (false, true, ..) => return Ordering::Less,
            (true, true, ..) => {
                let na = pa.trim_start_matches('0');
                let nb = pb.trim_start_matches('0');
                match na.len().cmp(&nb.len()).then_with(|| na.cmp(nb)) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            (false, false, ..) => match pa.cmp(pb) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
    Ordering::Equal
}

/// Compares two `epoch:version-release` strings per RPM's EVR ordering.
///
/// `cmp(a, b) == cmp(b, a).reverse()` and `cmp(a, a) == Ordering::Equal` for all inputs.
#[must_use]
pub fn compare_evr(a: &str, b: &str) -> Ordering {
    let (ea, eb) = (parse_evr(a), parse_evr(b));
    compare_segment(ea.epoch, eb.epoch)
        .then_with(|| compare_segment(ea.version, eb.version))
        .then_with(|| compare_segment(ea.release, eb.release))
}

#[cfg(test)]
mod tests {
    use super::compare_evr;
    use proptest::prelude::*;
    use std::cmp::Ordering;

    #[test]
    fn equal_versions_compare_equal() {
        assert_eq!(compare_evr("5.1-6", "5.1-6"), Ordering::Equal);
    }

    #[test]
    fn numeric_segments_compare_numerically_not_lexically() {
        assert_eq!(compare_evr("1.9-1", "1.10-1"), Ordering::Less);
    }

    #[test]
    fn missing_epoch_defaults_to_zero() {
        assert_eq!(compare_evr("0:1.0-1", "1.0-1"), Ordering::Equal);
    }

    #[test]
    fn digit_run_beats_alpha_run() {
        assert_eq!(compare_evr("1.0a-1", "1.0-1"), Ordering::Less);
    }

    /// Generates plausible `epoch:version-release` strings: a small epoch, a
    /// dotted run of numeric/alpha segments, and a numeric release.
    fn evr_strategy() -> impl Strategy<Value = String> {
        let segment = prop::collection::vec(prop_oneof![1u32..1000u32, 0..50u32].prop_map(|n| n.to_string()), 1..4)
            .prop_map(|parts| parts.join("."));
        (0u32..3, segment, 1u32..100u32)
            .prop_map(|(epoch, version, release)| format!("{epoch}:{version}-{release}"))
    }

    proptest! {
        #[test]
        fn antisymmetric_for_arbitrary_evr_strings(a in evr_strategy(), b in evr_strategy()) {
            prop_assert_eq!(compare_evr(&a, &b), compare_evr(&b, &a).reverse());
        }

        #[test]
        fn reflexive_for_arbitrary_evr_strings(a in evr_strategy()) {
            prop_assert_eq!(compare_evr(&a, &a), Ordering::Equal);
        }
    }
}
