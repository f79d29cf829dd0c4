//! Semantic version parsing, ordering and update classification
//!
//! Registry and tag versions are not always strict semver: Terraform constraints like
//! `~> 5.0` reduce to two segments and some repositories tag four. [`ParsedVersion`]
//! keeps every numeric segment so the number of declared segments is not lost, while
//! prerelease and build metadata are validated with the `semver` crate.

use std::cmp::Ordering;
use std::fmt;

use semver::{BuildMetadata, Prerelease};

use crate::version::types::{UpdatePolicy, UpdateType};

/// A version with an arbitrary number of numeric segments
#[derive(Debug, Clone)]
pub struct ParsedVersion {
    segments: Vec<u64>,
    pre: Prerelease,
    build: BuildMetadata,
}

impl ParsedVersion {
    /// Numeric segments as declared (`5.0` has two)
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// `(major, minor, patch)` when at least three segments were declared
    pub fn core(&self) -> Option<(u64, u64, u64)> {
        match self.segments.as_slice() {
            [major, minor, patch, ..] => Some((*major, *minor, *patch)),
            _ => None,
        }
    }

    fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }
}

impl Ord for ParsedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            match self.segment(i).cmp(&other.segment(i)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        // Empty prerelease sorts above any prerelease
        self.pre.cmp(&other.pre)
    }
}

impl PartialOrd for ParsedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ParsedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParsedVersion {}

impl fmt::Display for ParsedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.segments.len().max(3);
        let core: Vec<String> = (0..len).map(|i| self.segment(i).to_string()).collect();
        write!(f, "{}", core.join("."))?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

/// Parse a version string.
///
/// Accepts an optional leading `v`, one or more numeric segments, an optional
/// `-prerelease` and an optional `+build`.
///
/// Examples:
/// - "5" -> segments [5]
/// - "v1.2.3" -> segments [1, 2, 3]
/// - "1.0.0-beta.1" -> segments [1, 0, 0], prerelease "beta.1"
pub fn parse_version(version: &str) -> Option<ParsedVersion> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);

    let (rest, build) = match version.split_once('+') {
        Some((_, "")) => return None,
        Some((rest, build)) => (rest, BuildMetadata::new(build).ok()?),
        None => (version, BuildMetadata::EMPTY),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((_, "")) => return None,
        Some((core, pre)) => (core, Prerelease::new(pre).ok()?),
        None => (rest, Prerelease::EMPTY),
    };

    let segments = core
        .split('.')
        .map(|s| {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            s.parse::<u64>().ok()
        })
        .collect::<Option<Vec<_>>>()?;

    Some(ParsedVersion {
        segments,
        pre,
        build,
    })
}

/// Ordered, filtered versions for one dependency's upstream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateVersionSet {
    versions: Vec<ParsedVersion>,
}

impl CandidateVersionSet {
    /// Parse raw version strings, dropping unparseable entries and, when
    /// `skip_prerelease` is set, prereleases. The result is sorted ascending.
    pub fn from_raw<I, S>(raw: I, skip_prerelease: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut versions: Vec<ParsedVersion> = raw
            .into_iter()
            .filter_map(|v| parse_version(v.as_ref()))
            .filter(|v| !(skip_prerelease && v.is_prerelease()))
            .collect();
        versions.sort();
        Self { versions }
    }

    /// Highest version by semantic-version precedence
    pub fn latest(&self) -> Option<&ParsedVersion> {
        self.versions.last()
    }

    pub fn versions(&self) -> &[ParsedVersion] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Reduce a Terraform version constraint to the version it names.
///
/// Supports: "~> 5.0", ">= 5.0.0", "= 5.0.0", "5.0.0"
pub fn extract_version_from_constraint(constraint: &str) -> String {
    let constraint = constraint.trim();
    let stripped = ["~>", ">=", "<=", "=", ">", "<"]
        .iter()
        .find_map(|op| constraint.strip_prefix(op))
        .unwrap_or(constraint);
    stripped.trim().to_string()
}

/// Classify an update by the first differing major/minor/patch component.
///
/// Versions with fewer than three segments, or where latest is not larger in the
/// first differing component, are `Unknown`.
pub fn detect_update_type(current: &ParsedVersion, latest: &ParsedVersion) -> UpdateType {
    let (Some((cur_major, cur_minor, cur_patch)), Some((lat_major, lat_minor, lat_patch))) =
        (current.core(), latest.core())
    else {
        return UpdateType::Unknown;
    };

    if lat_major > cur_major {
        UpdateType::Major
    } else if lat_major == cur_major && lat_minor > cur_minor {
        UpdateType::Minor
    } else if lat_major == cur_major && lat_minor == cur_minor && lat_patch > cur_patch {
        UpdateType::Patch
    } else {
        UpdateType::Unknown
    }
}

/// Decide whether `latest` counts as an update for `current` under `policy`.
///
/// Independent of [`detect_update_type`]: a short version can be outdated
/// while its update type stays `Unknown`.
pub fn is_update_allowed(
    current: &ParsedVersion,
    latest: &ParsedVersion,
    policy: &UpdatePolicy,
) -> bool {
    if current >= latest {
        return false;
    }

    let (Some((cur_major, cur_minor, _)), Some((lat_major, lat_minor, _))) =
        (current.core(), latest.core())
    else {
        return true;
    };

    if policy.patch_only {
        return cur_major == lat_major && cur_minor == lat_minor;
    }

    if policy.minor_only {
        return cur_major == lat_major;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(s: &str) -> ParsedVersion {
        parse_version(s).unwrap()
    }

    #[rstest]
    #[case("1.2.3", vec![1, 2, 3], false)]
    #[case("v1.2.3", vec![1, 2, 3], false)]
    #[case("5.0", vec![5, 0], false)]
    #[case("5", vec![5], false)]
    #[case("1.2.3.4", vec![1, 2, 3, 4], false)]
    #[case("1.0.0-beta.1", vec![1, 0, 0], true)]
    #[case("1.0.0+build.5", vec![1, 0, 0], false)]
    fn parse_version_accepts(
        #[case] input: &str,
        #[case] segments: Vec<u64>,
        #[case] prerelease: bool,
    ) {
        let parsed = v(input);
        assert_eq!(parsed.segments(), segments.as_slice());
        assert_eq!(parsed.is_prerelease(), prerelease);
    }

    #[rstest]
    #[case("")]
    #[case("latest")]
    #[case("main")]
    #[case("1..2")]
    #[case("1.x.0")]
    #[case("1.0.0-")]
    fn parse_version_rejects(#[case] input: &str) {
        assert!(parse_version(input).is_none());
    }

    #[rstest]
    #[case("5.0", "5.0.0")]
    #[case("v1.2.3", "1.2.3")]
    #[case("1.0.0-rc.1", "1.0.0-rc.1")]
    #[case("1.2.3.4", "1.2.3.4")]
    fn display_pads_to_three_segments(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(v(input).to_string(), expected);
    }

    #[test]
    fn ordering_follows_semver_precedence() {
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.9.0") < v("1.10.0"));
        assert!(v("1.0.0-rc.1") < v("1.0.0"));
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
        assert_eq!(v("5.0"), v("5.0.0"));
        assert_eq!(v("1.0.0+a"), v("1.0.0+b"));
        assert!(v("1.2.3") < v("1.2.3.1"));
    }

    #[test]
    fn candidate_set_sorts_and_filters() {
        let set = CandidateVersionSet::from_raw(
            ["2.0.0", "not-a-version", "1.5.0", "2.1.0-beta", "1.0.0"],
            false,
        );
        let rendered: Vec<String> = set.versions().iter().map(|v| v.to_string()).collect();
        assert_eq!(rendered, vec!["1.0.0", "1.5.0", "2.0.0", "2.1.0-beta"]);
        assert_eq!(set.latest().unwrap().to_string(), "2.1.0-beta");
    }

    #[test]
    fn candidate_set_skips_prerelease_when_requested() {
        let set = CandidateVersionSet::from_raw(["2.0.0", "2.1.0-beta", "1.0.0"], true);
        assert_eq!(set.len(), 2);
        assert_eq!(set.latest().unwrap().to_string(), "2.0.0");
    }

    #[test]
    fn candidate_set_is_empty_when_nothing_parses() {
        let set = CandidateVersionSet::from_raw(["latest", "main"], false);
        assert!(set.is_empty());
        assert!(set.latest().is_none());
    }

    #[rstest]
    #[case("~> 5.0", "5.0")]
    #[case(">= 5.0.0", "5.0.0")]
    #[case("<= 4.2.0", "4.2.0")]
    #[case("= 5.0.0", "5.0.0")]
    #[case("> 1.0", "1.0")]
    #[case("< 2.0", "2.0")]
    #[case("5.0.0", "5.0.0")]
    #[case("  ~>3.1  ", "3.1")]
    #[case("", "")]
    fn extract_version_from_constraint_strips_operator(
        #[case] constraint: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(extract_version_from_constraint(constraint), expected);
    }

    #[rstest]
    #[case("4.0.0", "5.0.0", UpdateType::Major)]
    #[case("5.0.0", "5.1.0", UpdateType::Minor)]
    #[case("5.1.0", "5.1.1", UpdateType::Patch)]
    #[case("5.0.0", "5.0.0", UpdateType::Unknown)]
    #[case("5.0.0", "4.0.0", UpdateType::Unknown)]
    #[case("1.9.9", "2.0.0", UpdateType::Major)]
    #[case("5.0", "6.0.0", UpdateType::Unknown)]
    #[case("5.0.0", "6", UpdateType::Unknown)]
    #[case("1.2.3.4", "1.2.4.0", UpdateType::Patch)]
    #[case("1.2.3.4", "1.2.3.9", UpdateType::Unknown)]
    fn detect_update_type_compares_first_three_segments(
        #[case] current: &str,
        #[case] latest: &str,
        #[case] expected: UpdateType,
    ) {
        assert_eq!(detect_update_type(&v(current), &v(latest)), expected);
    }

    fn policy(patch_only: bool, minor_only: bool) -> UpdatePolicy {
        UpdatePolicy {
            patch_only,
            minor_only,
            ..UpdatePolicy::default()
        }
    }

    #[rstest]
    #[case("5.0.0", "5.1.0", policy(true, false), false)]
    #[case("5.0.0", "5.0.1", policy(true, false), true)]
    #[case("5.0.0", "5.1.0", policy(false, true), true)]
    #[case("5.0.0", "5.0.1", policy(false, true), true)]
    #[case("5.0.0", "6.0.0", policy(false, true), false)]
    #[case("5.0.0", "6.0.0", policy(false, false), true)]
    #[case("5.0.0", "5.0.0", policy(false, false), false)]
    #[case("5.1.0", "5.0.0", policy(false, false), false)]
    #[case("5.0", "6.0.0", policy(true, false), true)]
    fn is_update_allowed_applies_policy(
        #[case] current: &str,
        #[case] latest: &str,
        #[case] policy: UpdatePolicy,
        #[case] expected: bool,
    ) {
        assert_eq!(is_update_allowed(&v(current), &v(latest), &policy), expected);
    }
}
