// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Located SDK references and their path identifier tables.

use {
    crate::{is_absolute_install_path, Error, SdkKind, SdkReference, SdkVersion},
    std::{
        fmt::{Display, Formatter},
        hash::{Hash, Hasher},
        path::{Path, PathBuf},
    },
};

/// Path identifier for the installation root of any SDK kind.
pub const PATH_HOME: &str = "home";

/// Property identifier for the version of a versioned SDK.
pub const PROPERTY_VERSION: &str = "version";

/// Prefix of the parameterized UAP identifier locating an API contract `.winmd`.
pub const API_CONTRACT_PREFIX: &str = "apicontract.";

/// File name of the Appx launcher shipped with the App Certification Kit.
pub const APPX_LAUNCHER_EXE: &str = "microsoft.windows.softwarelogo.appxlauncher.exe";

/// Obtain the UAP path identifier of an API contract `.winmd` file.
///
/// The identifier resolves to
/// `References/<SDK version>/<name>/<version>/<name>.winmd` under the
/// release root, e.g.
/// `References/10.0.18362.0/Windows.Foundation.FoundationContract/3.0.0.0/Windows.Foundation.FoundationContract.winmd`.
pub fn api_contract_identifier(name: &str, version: &str) -> String {
    format!("{}{}/{}", API_CONTRACT_PREFIX, name, version)
}

/// A component of a path template.
#[derive(Clone, Copy, Debug)]
enum Segment {
    Literal(&'static str),
    Version,
}

use Segment::{Literal as L, Version as V};

type PathTable = &'static [(&'static str, &'static [Segment])];

static WINDOWS_KITS_PATHS: PathTable = &[
    (PATH_HOME, &[]),
    ("bin.x86", &[L("bin"), V, L("x86")]),
    ("bin.x64", &[L("bin"), V, L("x64")]),
    ("bin.arm", &[L("bin"), V, L("arm")]),
    ("bin.arm64", &[L("bin"), V, L("arm64")]),
    ("include.ucrt", &[L("Include"), V, L("ucrt")]),
    ("include.um", &[L("Include"), V, L("um")]),
    ("include.shared", &[L("Include"), V, L("shared")]),
    ("include.winrt", &[L("Include"), V, L("winrt")]),
    ("include.cppwinrt", &[L("Include"), V, L("cppwinrt")]),
    ("lib.x86.ucrt", &[L("Lib"), V, L("ucrt"), L("x86")]),
    ("lib.x86.um", &[L("Lib"), V, L("um"), L("x86")]),
    ("lib.x64.ucrt", &[L("Lib"), V, L("ucrt"), L("x64")]),
    ("lib.x64.um", &[L("Lib"), V, L("um"), L("x64")]),
    ("lib.arm.ucrt", &[L("Lib"), V, L("ucrt"), L("arm")]),
    ("lib.arm.um", &[L("Lib"), V, L("um"), L("arm")]),
    ("lib.arm64.ucrt", &[L("Lib"), V, L("ucrt"), L("arm64")]),
    ("lib.arm64.um", &[L("Lib"), V, L("um"), L("arm64")]),
    ("exe.x86.makeappx", &[L("bin"), V, L("x86"), L("makeappx.exe")]),
    ("exe.x64.makeappx", &[L("bin"), V, L("x64"), L("makeappx.exe")]),
    ("exe.x86.signtool", &[L("bin"), V, L("x86"), L("signtool.exe")]),
    ("exe.x64.signtool", &[L("bin"), V, L("x64"), L("signtool.exe")]),
    ("exe.arm.signtool", &[L("bin"), V, L("arm"), L("signtool.exe")]),
    ("exe.arm64.signtool", &[L("bin"), V, L("arm64"), L("signtool.exe")]),
    ("exe.x86.rc", &[L("bin"), V, L("x86"), L("rc.exe")]),
    ("exe.x64.rc", &[L("bin"), V, L("x64"), L("rc.exe")]),
    ("exe.arm64.rc", &[L("bin"), V, L("arm64"), L("rc.exe")]),
    ("exe.x86.fxc", &[L("bin"), V, L("x86"), L("fxc.exe")]),
    ("exe.x64.fxc", &[L("bin"), V, L("x64"), L("fxc.exe")]),
    ("exe.arm64.fxc", &[L("bin"), V, L("arm64"), L("fxc.exe")]),
    (
        "exe.appxlauncher",
        &[L("App Certification Kit"), L(APPX_LAUNCHER_EXE)],
    ),
];

static WINDOWS_UAP_PATHS: PathTable = &[
    (PATH_HOME, &[]),
    (
        "xml.platform",
        &[L("Platforms"), L("UAP"), V, L("Platform.xml")],
    ),
    (
        "xml.previousplatforms",
        &[L("Platforms"), L("UAP"), V, L("PreviousPlatforms.xml")],
    ),
    (
        "xml.features",
        &[L("Platforms"), L("UAP"), V, L("Features.xml")],
    ),
    ("exe.x86.makeappx", &[L("bin"), V, L("x86"), L("makeappx.exe")]),
    ("exe.x64.makeappx", &[L("bin"), V, L("x64"), L("makeappx.exe")]),
];

static APP_CERT_KIT_PATHS: PathTable = &[
    (PATH_HOME, &[]),
    ("exe.appxlauncher", &[L(APPX_LAUNCHER_EXE)]),
    ("exe.makeappx", &[L("makeappx.exe")]),
    ("exe.signtool", &[L("signtool.exe")]),
];

/// Resolve an identifier against a table.
///
/// `identifier` must already be lowercase.
fn resolve_table(
    table: PathTable,
    identifier: &str,
    base_directory: &Path,
    version: Option<&SdkVersion>,
) -> Option<PathBuf> {
    let (_, segments) = table.iter().find(|(key, _)| *key == identifier)?;

    let mut path = base_directory.to_path_buf();

    for segment in segments.iter() {
        match segment {
            Segment::Literal(s) => path.push(s),
            Segment::Version => {
                if let Some(version) = version {
                    path.push(version.as_ref());
                }
            }
        }
    }

    Some(path)
}

fn require_absolute(path: PathBuf) -> Result<PathBuf, Error> {
    if is_absolute_install_path(&path) {
        Ok(path)
    } else {
        Err(Error::PathNotAbsolute(path))
    }
}

/// A located Windows Kits installation.
///
/// The base directory is the release root, e.g. `C:\Program Files (x86)\Windows Kits\10`.
///
/// Equivalence is defined by the version only.
#[derive(Clone, Debug)]
pub struct WindowsKitsSdk {
    base_directory: PathBuf,
    version: SdkVersion,
}

impl WindowsKitsSdk {
    /// Construct an instance from a release root and SDK version.
    ///
    /// Errors with [Error::PathNotAbsolute] if the base directory isn't absolute.
    pub fn new(
        base_directory: impl Into<PathBuf>,
        version: impl Into<SdkVersion>,
    ) -> Result<Self, Error> {
        Ok(Self {
            base_directory: require_absolute(base_directory.into())?,
            version: version.into(),
        })
    }

    pub(crate) fn from_parts(base_directory: PathBuf, version: SdkVersion) -> Self {
        Self {
            base_directory,
            version,
        }
    }
}

impl PartialEq for WindowsKitsSdk {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for WindowsKitsSdk {}

impl Hash for WindowsKitsSdk {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.version.hash(state);
    }
}

impl SdkReference for WindowsKitsSdk {
    fn kind(&self) -> SdkKind {
        SdkKind::WindowsKits
    }

    fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn version(&self) -> Option<&SdkVersion> {
        Some(&self.version)
    }

    fn path(&self, identifier: &str) -> Result<Option<PathBuf>, Error> {
        Ok(resolve_table(
            WINDOWS_KITS_PATHS,
            &identifier.to_ascii_lowercase(),
            &self.base_directory,
            Some(&self.version),
        ))
    }

    fn property(&self, identifier: &str) -> Option<String> {
        if identifier.eq_ignore_ascii_case(PROPERTY_VERSION) {
            Some(self.version.to_string())
        } else {
            None
        }
    }
}

/// A located Windows Universal Application Platform installation.
///
/// Shares its base directory with [WindowsKitsSdk]: the release root. The
/// version is the UAP platform version.
///
/// Equivalence is defined by the version only.
#[derive(Clone, Debug)]
pub struct WindowsUapSdk {
    base_directory: PathBuf,
    version: SdkVersion,
}

impl WindowsUapSdk {
    /// Construct an instance from a release root and platform version.
    ///
    /// Errors with [Error::PathNotAbsolute] if the base directory isn't absolute.
    pub fn new(
        base_directory: impl Into<PathBuf>,
        version: impl Into<SdkVersion>,
    ) -> Result<Self, Error> {
        Ok(Self {
            base_directory: require_absolute(base_directory.into())?,
            version: version.into(),
        })
    }

    pub(crate) fn from_parts(base_directory: PathBuf, version: SdkVersion) -> Self {
        Self {
            base_directory,
            version,
        }
    }

    /// The UAP platform version.
    pub fn sdk_version(&self) -> &SdkVersion {
        &self.version
    }

    /// Path to the `Platform.xml` descriptor of this platform version.
    pub fn platform_xml_path(&self) -> PathBuf {
        self.base_directory
            .join("Platforms")
            .join("UAP")
            .join(self.version.as_ref())
            .join("Platform.xml")
    }

    fn api_contract_path(&self, identifier: &str) -> Result<PathBuf, Error> {
        let malformed = || Error::MalformedIdentifier(SdkKind::WindowsUap, identifier.to_string());

        let (head, contract_version) = identifier.rsplit_once('/').ok_or_else(malformed)?;
        // The prefix is ASCII so its length is the same regardless of case.
        let contract = head.get(API_CONTRACT_PREFIX.len()..).ok_or_else(malformed)?;

        if contract.is_empty() || contract_version.is_empty() {
            return Err(malformed());
        }

        Ok(self
            .base_directory
            .join("References")
            .join(self.version.as_ref())
            .join(contract)
            .join(contract_version)
            .join(format!("{}.winmd", contract)))
    }
}

impl PartialEq for WindowsUapSdk {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for WindowsUapSdk {}

impl Hash for WindowsUapSdk {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.version.hash(state);
    }
}

impl SdkReference for WindowsUapSdk {
    fn kind(&self) -> SdkKind {
        SdkKind::WindowsUap
    }

    fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn version(&self) -> Option<&SdkVersion> {
        Some(&self.version)
    }

    fn path(&self, identifier: &str) -> Result<Option<PathBuf>, Error> {
        let lower = identifier.to_ascii_lowercase();

        if let Some(path) = resolve_table(
            WINDOWS_UAP_PATHS,
            &lower,
            &self.base_directory,
            Some(&self.version),
        ) {
            Ok(Some(path))
        } else if lower.starts_with(API_CONTRACT_PREFIX) {
            // Contract names are case sensitive so parse the original string.
            Ok(Some(self.api_contract_path(identifier)?))
        } else {
            Ok(None)
        }
    }

    fn property(&self, identifier: &str) -> Option<String> {
        if identifier.eq_ignore_ascii_case(PROPERTY_VERSION) {
            Some(self.version.to_string())
        } else {
            None
        }
    }
}

/// A located Windows App Certification Kit.
///
/// The base directory is the `App Certification Kit` directory itself. The
/// kit is unversioned and has no properties.
///
/// All instances are equivalent to each other.
#[derive(Clone, Debug)]
pub struct AppCertKitSdk {
    base_directory: PathBuf,
}

impl AppCertKitSdk {
    /// Construct an instance from the `App Certification Kit` directory.
    ///
    /// Errors with [Error::PathNotAbsolute] if the directory isn't absolute.
    pub fn new(base_directory: impl Into<PathBuf>) -> Result<Self, Error> {
        Ok(Self {
            base_directory: require_absolute(base_directory.into())?,
        })
    }

    pub(crate) fn from_parts(base_directory: PathBuf) -> Self {
        Self { base_directory }
    }
}

impl PartialEq for AppCertKitSdk {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for AppCertKitSdk {}

impl Hash for AppCertKitSdk {
    fn hash<H: Hasher>(&self, _: &mut H) {}
}

impl SdkReference for AppCertKitSdk {
    fn kind(&self) -> SdkKind {
        SdkKind::WindowsAppCertKit
    }

    fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn version(&self) -> Option<&SdkVersion> {
        None
    }

    fn path(&self, identifier: &str) -> Result<Option<PathBuf>, Error> {
        Ok(resolve_table(
            APP_CERT_KIT_PATHS,
            &identifier.to_ascii_lowercase(),
            &self.base_directory,
            None,
        ))
    }

    fn property(&self, _: &str) -> Option<String> {
        None
    }
}

/// Any located SDK.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Sdk {
    WindowsKits(WindowsKitsSdk),
    WindowsUap(WindowsUapSdk),
    AppCertKit(AppCertKitSdk),
}

impl From<WindowsKitsSdk> for Sdk {
    fn from(v: WindowsKitsSdk) -> Self {
        Self::WindowsKits(v)
    }
}

impl From<WindowsUapSdk> for Sdk {
    fn from(v: WindowsUapSdk) -> Self {
        Self::WindowsUap(v)
    }
}

impl From<AppCertKitSdk> for Sdk {
    fn from(v: AppCertKitSdk) -> Self {
        Self::AppCertKit(v)
    }
}

impl Display for Sdk {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(version) = self.version() {
            f.write_fmt(format_args!(
                "{} {} at {}",
                self.kind(),
                version,
                self.base_directory().display()
            ))
        } else {
            f.write_fmt(format_args!(
                "{} at {}",
                self.kind(),
                self.base_directory().display()
            ))
        }
    }
}

impl Sdk {
    fn as_reference(&self) -> &dyn SdkReference {
        match self {
            Self::WindowsKits(sdk) => sdk,
            Self::WindowsUap(sdk) => sdk,
            Self::AppCertKit(sdk) => sdk,
        }
    }

    /// Obtain the UAP SDK, erroring if this is another kind.
    pub fn as_windows_uap(&self) -> Result<&WindowsUapSdk, Error> {
        match self {
            Self::WindowsUap(sdk) => Ok(sdk),
            _ => Err(Error::WrongSdkKind {
                expected: SdkKind::WindowsUap,
                actual: self.kind(),
            }),
        }
    }
}

impl SdkReference for Sdk {
    fn kind(&self) -> SdkKind {
        self.as_reference().kind()
    }

    fn base_directory(&self) -> &Path {
        self.as_reference().base_directory()
    }

    fn version(&self) -> Option<&SdkVersion> {
        self.as_reference().version()
    }

    fn path(&self, identifier: &str) -> Result<Option<PathBuf>, Error> {
        self.as_reference().path(identifier)
    }

    fn property(&self, identifier: &str) -> Option<String> {
        self.as_reference().property(identifier)
    }
}
