// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Locate Windows SDK installations and resolve paths within them.
//!
//! # Important Concepts
//!
//! A *search root* is a `Program Files` style directory. Windows SDKs install
//! themselves under a `Windows Kits` directory inside it, e.g.
//! `C:\Program Files (x86)\Windows Kits`.
//!
//! A *release root* is an OS release directory under `Windows Kits`, e.g.
//! `C:\Program Files (x86)\Windows Kits\10`. Several SDK versions can be
//! installed side by side within a single release root.
//!
//! # SDK Kinds
//!
//! We model the kinds of installations we know about via the [SdkKind] enum:
//!
//! * *Windows Kits*: the native Windows SDK. Validated by the presence of
//!   `Include/<version>/um/Windows.h`.
//! * *Windows UAP*: the Universal Application Platform layer. Validated by
//!   `Platforms/UAP/<version>/Platform.xml`.
//! * *Windows App Certification Kit*: an unversioned tool package validated by
//!   `App Certification Kit/appcert.exe`.
//!
//! # Path Identifiers
//!
//! A located SDK is represented by a type implementing [SdkReference]. Rather
//! than hardcoding filesystem layouts, consumers ask a reference to resolve a
//! symbolic *path identifier* such as `include.um` or `exe.x64.signtool`.
//! Unknown identifiers resolve to [None].
//!
//! # Searching
//!
//! [locate_windows_kits()], [locate_windows_uap()] and [locate_app_cert_kit()]
//! search a single root. [SearchRoots] tries multiple roots in order and
//! [SdkEnvironment] layers environment parameter overrides and caching on top.

pub mod cli;
mod environment;
mod fs;
mod platform;
mod reference;
mod search;
#[cfg(test)]
mod testutil;
mod version;

use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    str::FromStr,
};

pub use crate::{
    environment::{
        EnvironmentParameters, SdkDescription, SdkEnvironment, WINDOWS_KITS_INSTALL_LOCATION_PREFIX,
        WINDOWS_UAP_INSTALL_LOCATION_PREFIX,
    },
    fs::{is_absolute_install_path, FileSystem, LocalFileSystem},
    platform::{ApiContract, ApplicationPlatform},
    reference::*,
    search::{
        find_version_directories, locate_app_cert_kit, locate_windows_kits, locate_windows_uap,
        SearchRoots, PROGRAM_FILES, PROGRAM_FILES_X86, WINDOWS_KITS_DIRECTORY_NAME,
    },
    version::{compare_version_numbers, is_valid_version_number, SdkVersion, VersionPredicate},
};

/// Error type for this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] xml::reader::Error),

    /// No installation was found in any override or search root.
    #[error("{} SDK not found{}", .kind, not_found_versions(.kind, .versions))]
    SdkNotFound {
        kind: SdkKind,
        versions: VersionPredicate,
    },

    /// A parameterized path identifier could not be parsed.
    #[error("invalid {0} SDK path identifier: {1}")]
    MalformedIdentifier(SdkKind, String),

    #[error("path {identifier} not found in {kind} SDK")]
    PathNotFound { kind: SdkKind, identifier: String },

    #[error("SDK install location is not absolute: {}", .0.display())]
    PathNotAbsolute(PathBuf),

    #[error("invalid Platform.xml: {0}")]
    InvalidPlatformXml(String),

    #[error("version mismatch in Platform.xml; expected {expected} but found {actual}")]
    PlatformVersionMismatch { expected: String, actual: String },

    #[error("unknown SDK kind: {0}")]
    UnknownSdkKind(String),

    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error("expected a {expected} SDK but got {actual}")]
    WrongSdkKind { expected: SdkKind, actual: SdkKind },
}

fn not_found_versions(kind: &SdkKind, versions: &VersionPredicate) -> String {
    if kind.is_versioned() {
        format!(" for versions: {}", versions)
    } else {
        String::new()
    }
}

/// A kind of Windows SDK installation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SdkKind {
    WindowsKits,
    WindowsUap,
    WindowsAppCertKit,
}

impl Display for SdkKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::WindowsKits => "Windows Kits",
            Self::WindowsUap => "Windows UAP",
            Self::WindowsAppCertKit => "Windows App Certification Kit",
        })
    }
}

impl FromStr for SdkKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windowskits" | "kits" => Ok(Self::WindowsKits),
            "windowsuap" | "uap" => Ok(Self::WindowsUap),
            "windowsappcertkit" | "appcertkit" => Ok(Self::WindowsAppCertKit),
            _ => Err(Error::UnknownSdkKind(s.to_string())),
        }
    }
}

impl SdkKind {
    /// Whether installations of this kind have a version.
    pub fn is_versioned(&self) -> bool {
        !matches!(self, Self::WindowsAppCertKit)
    }

    /// The SDK name consumers refer to this kind by.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WindowsKits => "WindowsKits",
            Self::WindowsUap => "WindowsUap",
            Self::WindowsAppCertKit => "WindowsAppCertKit",
        }
    }
}

/// Defines common behavior for types representing a located Windows SDK.
pub trait SdkReference {
    /// The kind of SDK this is.
    fn kind(&self) -> SdkKind;

    /// Absolute path to the installation root.
    fn base_directory(&self) -> &Path;

    /// The version of this installation, if the SDK kind is versioned.
    fn version(&self) -> Option<&SdkVersion>;

    /// Resolve a path identifier to a filesystem path.
    ///
    /// Identifiers are matched case-insensitively. Returns `Ok(None)` if the
    /// identifier isn't known to this SDK. Errors only for malformed
    /// parameterized identifiers.
    ///
    /// The returned path is not validated to exist.
    fn path(&self, identifier: &str) -> Result<Option<PathBuf>, Error>;

    /// Resolve a property identifier to its value.
    fn property(&self, identifier: &str) -> Option<String>;

    /// Resolve a path identifier, treating an unknown identifier as an error.
    fn require_path(&self, identifier: &str) -> Result<PathBuf, Error> {
        self.path(identifier)?.ok_or_else(|| Error::PathNotFound {
            kind: self.kind(),
            identifier: identifier.to_string(),
        })
    }
}
