//! Requested CLI version.

use std::fmt;

/// A requested CLI version: an exact version or a "latest" quantifier.
///
/// Quantifiers are matched case-insensitively. Any other string is an exact
/// version and is used verbatim when naming package directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpecifier {
    /// Newest stable version in the registry.
    Latest,
    /// Newest version in the registry, prereleases included.
    LatestPrerelease,
    /// A specific version string.
    Exact(String),
}

impl VersionSpecifier {
    /// Parse a user-supplied version string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "latest" => Self::Latest,
            "latest-prerelease" | "latestprerelease" => Self::LatestPrerelease,
            _ => Self::Exact(s.to_string()),
        }
    }

    /// Whether this specifier requires resolution against the registry.
    #[must_use]
    pub fn is_quantifier(&self) -> bool {
        matches!(self, Self::Latest | Self::LatestPrerelease)
    }

    /// Whether prerelease versions may satisfy this specifier.
    #[must_use]
    pub fn allows_prerelease(&self) -> bool {
        matches!(self, Self::LatestPrerelease)
    }

    /// The exact version, if this is not a quantifier.
    #[must_use]
    pub fn exact(&self) -> Option<&str> {
        match self {
            Self::Exact(v) => Some(v),
            Self::Latest | Self::LatestPrerelease => None,
        }
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::LatestPrerelease => write!(f, "latest-prerelease"),
            Self::Exact(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for VersionSpecifier {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
