// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{
    cmp::Ordering,
    collections::BTreeSet,
    fmt::{Display, Formatter},
};

/// Whether a string is a well-formed version number.
///
/// A version number is one or more dot separated components where every
/// component is a non-empty run of ASCII digits. e.g. `10`, `8.1`, `10.0.18362.0`.
pub fn is_valid_version_number(s: &str) -> bool {
    !s.is_empty()
        && s.split('.')
            .all(|c| !c.is_empty() && c.bytes().all(|b| b.is_ascii_digit()))
}

/// Compare two version numbers component-wise by numeric value.
///
/// `10.0.9.0` sorts before `10.0.10.0`. When one version is a prefix of the
/// other, the longer version is greater. Components are compared without
/// integer conversion so arbitrarily long components don't overflow.
pub fn compare_version_numbers(a: &str, b: &str) -> Ordering {
    let mut a_components = a.split('.');
    let mut b_components = b.split('.');

    loop {
        match (a_components.next(), b_components.next()) {
            (Some(x), Some(y)) => match compare_component(x, y) {
                Ordering::Equal => {}
                res => return res,
            },
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

fn compare_component(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');

    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Represents an SDK version string.
///
/// Any string can be stored. Use [Self::is_valid()] to check whether it is a
/// well-formed version number.
///
/// Ordering is by numeric component comparison. Versions that compare
/// numerically equal but are spelled differently (`10.0` vs `10.00`) fall back
/// to string ordering so ordering stays consistent with equality.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SdkVersion {
    value: String,
}

impl Display for SdkVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}

impl AsRef<str> for SdkVersion {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl From<String> for SdkVersion {
    fn from(value: String) -> Self {
        Self { value }
    }
}

impl From<&str> for SdkVersion {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<&String> for SdkVersion {
    fn from(s: &String) -> Self {
        Self::from(s.to_string())
    }
}

impl PartialOrd for SdkVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SdkVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_version_numbers(&self.value, &other.value)
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl SdkVersion {
    /// Whether this is a well-formed version number.
    pub fn is_valid(&self) -> bool {
        is_valid_version_number(&self.value)
    }
}

/// A filter over version strings.
///
/// Either accepts every version or only versions in an explicit set. An empty
/// set is normalized to accept everything.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct VersionPredicate {
    versions: Option<BTreeSet<String>>,
}

impl Display for VersionPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.versions {
            None => f.write_str("any"),
            Some(versions) => f.write_str(
                &versions
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for VersionPredicate {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let versions = iter.into_iter().map(Into::into).collect::<BTreeSet<_>>();

        if versions.is_empty() {
            Self::any()
        } else {
            Self {
                versions: Some(versions),
            }
        }
    }
}

impl VersionPredicate {
    /// A predicate accepting every version.
    pub fn any() -> Self {
        Self { versions: None }
    }

    /// A predicate accepting only the given version.
    pub fn exact(version: impl Into<String>) -> Self {
        std::iter::once(version.into()).collect()
    }

    /// Whether every version is accepted.
    pub fn is_any(&self) -> bool {
        self.versions.is_none()
    }

    /// Whether exactly one version is accepted.
    pub fn is_exact(&self) -> bool {
        matches!(&self.versions, Some(versions) if versions.len() == 1)
    }

    /// The explicit set of accepted versions, if constrained.
    pub fn versions(&self) -> Option<&BTreeSet<String>> {
        self.versions.as_ref()
    }

    /// Whether a version string passes this filter.
    pub fn accepts(&self, version: &str) -> bool {
        match &self.versions {
            None => true,
            Some(versions) => versions.contains(version),
        }
    }
}
