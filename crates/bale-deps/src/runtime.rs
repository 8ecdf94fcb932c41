use std::fmt;

use crate::error::DependencyError;

/// Node.js versions provisioned per runtime identifier.
pub const NODE_VERSIONS: &[(&str, &str)] = &[
    ("nodejs4.3", "4.3.2"),
    ("nodejs6.10", "6.10.3"),
    ("nodejs8.10", "8.10.0"),
    ("nodejs18.x", "18.20.4"),
    ("nodejs20.x", "20.18.0"),
];

/// A parsed runtime identifier such as `python3.12` or `nodejs20.x`.
///
/// # Examples
///
/// ```
/// use bale_deps::Runtime;
///
/// let rt = Runtime::parse("python3.12").unwrap();
/// assert_eq!(rt.interpreter(), Some("python3.12".to_owned()));
///
/// let rt = Runtime::parse("nodejs6.10").unwrap();
/// assert_eq!(rt.node_version(), Some("6.10.3"));
///
/// assert!(Runtime::parse("java8").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runtime {
    Python { version: String },
    Node { version: String },
}

impl Runtime {
    pub fn parse(identifier: &str) -> Result<Self, DependencyError> {
        let unsupported = || DependencyError::UnsupportedRuntime(identifier.to_owned());

        if let Some(version) = identifier.strip_prefix("python") {
            let mut parts = version.split('.');
            let valid = parts
                .next()
                .is_some_and(|major| !major.is_empty() && major.bytes().all(|b| b.is_ascii_digit()))
                && parts.all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
            if !valid {
                return Err(unsupported());
            }
            return Ok(Self::Python {
                version: version.to_owned(),
            });
        }

        if let Some(version) = identifier.strip_prefix("nodejs") {
            if !NODE_VERSIONS.iter().any(|(id, _)| *id == identifier) {
                return Err(unsupported());
            }
            return Ok(Self::Node {
                version: version.to_owned(),
            });
        }

        Err(unsupported())
    }

    /// The identifier this runtime was parsed from.
    pub fn identifier(&self) -> String {
        match self {
            Self::Python { version } => format!("python{version}"),
            Self::Node { version } => format!("nodejs{version}"),
        }
    }

    /// Interpreter executable used to create virtual environments.
    pub fn interpreter(&self) -> Option<String> {
        match self {
            Self::Python { .. } => Some(self.identifier()),
            Self::Node { .. } => None,
        }
    }

    /// Exact Node.js version pinned for this runtime.
    pub fn node_version(&self) -> Option<&'static str> {
        let Self::Node { .. } = self else {
            return None;
        };
        let identifier = self.identifier();
        NODE_VERSIONS
            .iter()
            .find(|(id, _)| *id == identifier)
            .map(|(_, v)| *v)
    }

    /// Wheel python tags installable on this runtime, most specific first.
    ///
    /// `python3.12` accepts `cp312`, `py312` and `py3`.
    pub fn python_tags(&self) -> Vec<String> {
        let Self::Python { version } = self else {
            return Vec::new();
        };
        let compact: String = version.chars().filter(|c| *c != '.').collect();
        let major = version.split('.').next().unwrap_or_default();
        let mut tags = vec![format!("cp{compact}"), format!("py{compact}")];
        if major != compact {
            tags.push(format!("py{major}"));
        }
        tags
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}
