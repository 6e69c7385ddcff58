//! NuGet version ordering and selection.
//!
//! NuGet versions are SemVer 2.0 with an optional fourth numeric "revision"
//! component (e.g., `1.2.3.4`). Precedence compares the numeric parts first,
//! then applies SemVer prerelease rules.

use msdo_core::VersionSpecifier;
use std::cmp::Ordering;

/// A parsed NuGet version.
///
/// Equality follows precedence, so `1.2` equals `1.2.0.0`.
#[derive(Debug, Clone)]
pub struct NuGetVersion {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    pre: semver::Prerelease,
    original: String,
}

impl NuGetVersion {
    /// Parse a version string. Returns `None` for non-NuGet versions.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let without_build = s.split_once('+').map_or(s, |(v, _)| v);
        let (release, pre) = match without_build.split_once('-') {
            Some((release, pre)) => (release, semver::Prerelease::new(pre).ok()?),
            None => (without_build, semver::Prerelease::EMPTY),
        };

        let parts = release
            .split('.')
            .map(|p| p.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        if parts.is_empty() || parts.len() > 4 {
            return None;
        }
        let part = |i: usize| parts.get(i).copied().unwrap_or(0);

        Some(Self {
            major: part(0),
            minor: part(1),
            patch: part(2),
            revision: part(3),
            pre,
            original: s.to_string(),
        })
    }

    /// Whether this is a prerelease version.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// The version as it appeared in the registry.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl PartialEq for NuGetVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NuGetVersion {}

impl Ord for NuGetVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.revision)
            .cmp(&(other.major, other.minor, other.patch, other.revision))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for NuGetVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pick the version from a registry listing that satisfies `spec`.
///
/// Exact specifiers match case-insensitively and return the listing's
/// spelling. Quantifiers return the highest version, skipping prereleases
/// unless the specifier allows them. Unparseable listing entries are ignored
/// for quantifiers.
#[must_use]
pub fn select_version<'a>(versions: &'a [String], spec: &VersionSpecifier) -> Option<&'a str> {
    if let Some(exact) = spec.exact() {
        return versions
            .iter()
            .find(|v| v.eq_ignore_ascii_case(exact))
            .map(String::as_str);
    }

    let allow_prerelease = spec.allows_prerelease();
    versions
        .iter()
        .filter_map(|v| NuGetVersion::parse(v).map(|parsed| (v, parsed)))
        .filter(|(_, parsed)| allow_prerelease || !parsed.is_prerelease())
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(v, _)| v.as_str())
}
