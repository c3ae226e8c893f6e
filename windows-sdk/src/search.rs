// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use {
    crate::{
        is_absolute_install_path, AppCertKitSdk, FileSystem, SdkKind, SdkVersion,
        VersionPredicate, WindowsKitsSdk, WindowsUapSdk,
    },
    log::{debug, trace},
    std::path::{Path, PathBuf},
};

/// Default path of the 64-bit `Program Files` directory.
pub const PROGRAM_FILES: &str = "c:/Program Files";

/// Default path of the 32-bit `Program Files (x86)` directory.
pub const PROGRAM_FILES_X86: &str = "c:/Program Files (x86)";

/// Name of the directory under a search root holding release roots.
pub const WINDOWS_KITS_DIRECTORY_NAME: &str = "Windows Kits";

/// Find subdirectories of a directory that are named after a version number.
///
/// Returned versions are sorted newest first. Entries that aren't directories
/// or whose names aren't valid version numbers are ignored.
///
/// A directory that can't be listed yields an empty result.
pub fn find_version_directories(fs: &impl FileSystem, dir: &Path) -> Vec<SdkVersion> {
    let entries = match fs.list_directory(dir) {
        Ok(v) => v,
        Err(e) => {
            trace!("unable to list {}: {}", dir.display(), e);
            return vec![];
        }
    };

    let mut res = entries
        .into_iter()
        .filter_map(|(name, is_dir)| {
            let version = SdkVersion::from(name);

            if is_dir && version.is_valid() {
                Some(version)
            } else {
                None
            }
        })
        .collect::<Vec<_>>();

    res.sort_by(|a, b| b.cmp(a));

    res
}

/// Whether a path is a regular file, treating errors as absence.
pub(crate) fn probe_regular_file(fs: &impl FileSystem, path: &Path) -> bool {
    match fs.is_regular_file(path) {
        Ok(v) => v,
        Err(e) => {
            trace!("unable to probe {}: {}", path.display(), e);
            false
        }
    }
}

fn join_all(base: &Path, segments: &[&str]) -> PathBuf {
    segments.iter().fold(base.to_path_buf(), |p, s| p.join(s))
}

/// Describes where a kind of SDK lives within a release root.
struct KitLayout {
    kind: SdkKind,
    /// Directory holding SDK version directories, relative to the release root.
    ///
    /// [None] for unversioned kits.
    versions_directory: Option<&'static [&'static str]>,
    /// File validating an install, relative to the version directory or the
    /// release root if unversioned.
    marker: &'static [&'static str],
}

const WINDOWS_KITS_LAYOUT: KitLayout = KitLayout {
    kind: SdkKind::WindowsKits,
    versions_directory: Some(&["Include"]),
    marker: &["um", "Windows.h"],
};

const WINDOWS_UAP_LAYOUT: KitLayout = KitLayout {
    kind: SdkKind::WindowsUap,
    versions_directory: Some(&["Platforms", "UAP"]),
    marker: &["Platform.xml"],
};

pub(crate) const APP_CERT_KIT_MARKER: &[&str] = &["App Certification Kit", "appcert.exe"];

const APP_CERT_KIT_LAYOUT: KitLayout = KitLayout {
    kind: SdkKind::WindowsAppCertKit,
    versions_directory: None,
    marker: APP_CERT_KIT_MARKER,
};

struct KitMatch {
    release_root: PathBuf,
    version: Option<SdkVersion>,
    marker: PathBuf,
}

/// Search a root for the newest install of a kit.
///
/// Release roots are tried newest first regardless of `versions`. Within a
/// release root, accepted versions are tried newest first and the first one
/// with a marker file wins.
fn search_kit(
    fs: &impl FileSystem,
    search_root: &Path,
    layout: &KitLayout,
    versions: &VersionPredicate,
) -> Option<KitMatch> {
    if !is_absolute_install_path(search_root) {
        debug!(
            "ignoring relative search root {} for {}",
            search_root.display(),
            layout.kind
        );
        return None;
    }

    let kits_dir = search_root.join(WINDOWS_KITS_DIRECTORY_NAME);
    debug!("searching {} for {}", kits_dir.display(), layout.kind);

    for release in find_version_directories(fs, &kits_dir) {
        let release_root = kits_dir.join(release.as_ref());

        let Some(versions_directory) = layout.versions_directory else {
            let marker = join_all(&release_root, layout.marker);

            if probe_regular_file(fs, &marker) {
                debug!("found {} at {}", layout.kind, marker.display());
                return Some(KitMatch {
                    release_root,
                    version: None,
                    marker,
                });
            }

            continue;
        };

        let versions_dir = join_all(&release_root, versions_directory);

        for version in find_version_directories(fs, &versions_dir) {
            if !versions.accepts(version.as_ref()) {
                debug!(
                    "{} {} discarded because it is not one of: {}",
                    layout.kind, version, versions
                );
                continue;
            }

            let marker = join_all(&versions_dir.join(version.as_ref()), layout.marker);

            if probe_regular_file(fs, &marker) {
                debug!("found {} {} at {}", layout.kind, version, marker.display());
                return Some(KitMatch {
                    release_root,
                    version: Some(version),
                    marker,
                });
            }

            debug!(
                "{} {} discarded because {} is missing",
                layout.kind,
                version,
                marker.display()
            );
        }
    }

    None
}

/// Locate a Windows Kits installation under a search root.
///
/// `search_root` is a `Program Files` style directory. The returned SDK has
/// the release root as its base directory and the `Include` version that
/// contains `um/Windows.h` as its version.
pub fn locate_windows_kits(
    fs: &impl FileSystem,
    search_root: &Path,
    versions: &VersionPredicate,
) -> Option<WindowsKitsSdk> {
    let m = search_kit(fs, search_root, &WINDOWS_KITS_LAYOUT, versions)?;

    Some(WindowsKitsSdk::from_parts(m.release_root, m.version?))
}

/// Locate a Windows UAP installation under a search root.
///
/// The returned SDK has the release root as its base directory and the
/// `Platforms/UAP` version that contains a `Platform.xml` as its version.
pub fn locate_windows_uap(
    fs: &impl FileSystem,
    search_root: &Path,
    versions: &VersionPredicate,
) -> Option<WindowsUapSdk> {
    let m = search_kit(fs, search_root, &WINDOWS_UAP_LAYOUT, versions)?;

    Some(WindowsUapSdk::from_parts(m.release_root, m.version?))
}

/// Locate the App Certification Kit under a search root.
///
/// The returned SDK has the directory containing `appcert.exe` as its base
/// directory.
pub fn locate_app_cert_kit(fs: &impl FileSystem, search_root: &Path) -> Option<AppCertKitSdk> {
    let m = search_kit(
        fs,
        search_root,
        &APP_CERT_KIT_LAYOUT,
        &VersionPredicate::any(),
    )?;

    Some(AppCertKitSdk::from_parts(m.marker.parent()?.to_path_buf()))
}

/// An ordered list of search roots.
///
/// Searches try each root in order and the first hit wins. The default roots
/// are [PROGRAM_FILES] followed by [PROGRAM_FILES_X86].
///
/// An attempt is made to only register a given root once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchRoots {
    roots: Vec<PathBuf>,
}

impl Default for SearchRoots {
    fn default() -> Self {
        Self::empty().root(PROGRAM_FILES).root(PROGRAM_FILES_X86)
    }
}

impl SearchRoots {
    /// Obtain an instance without any roots.
    pub fn empty() -> Self {
        Self { roots: vec![] }
    }

    /// Obtain the `Program Files` roots of the current machine.
    ///
    /// The `ProgramW6432` (or `ProgramFiles`) and `ProgramFiles(x86)`
    /// environment variables are honored. The default paths are used for
    /// variables that aren't defined.
    pub fn from_env() -> Self {
        let program_files = std::env::var_os("ProgramW6432")
            .or_else(|| std::env::var_os("ProgramFiles"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(PROGRAM_FILES));
        let program_files_x86 = std::env::var_os("ProgramFiles(x86)")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(PROGRAM_FILES_X86));

        Self::empty().root(program_files).root(program_files_x86)
    }

    /// Append a root to search.
    pub fn root(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        if !self.roots.contains(&path) {
            self.roots.push(path);
        }

        self
    }

    /// The registered roots, in search order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Find the first root holding an accepted Windows Kits installation.
    pub fn search_windows_kits(
        &self,
        fs: &impl FileSystem,
        versions: &VersionPredicate,
    ) -> Option<WindowsKitsSdk> {
        self.roots
            .iter()
            .find_map(|root| locate_windows_kits(fs, root, versions))
    }

    /// Find the first root holding an accepted Windows UAP installation.
    pub fn search_windows_uap(
        &self,
        fs: &impl FileSystem,
        versions: &VersionPredicate,
    ) -> Option<WindowsUapSdk> {
        self.roots
            .iter()
            .find_map(|root| locate_windows_uap(fs, root, versions))
    }

    /// Find the first root holding the App Certification Kit.
    pub fn search_app_cert_kit(&self, fs: &impl FileSystem) -> Option<AppCertKitSdk> {
        self.roots
            .iter()
            .find_map(|root| locate_app_cert_kit(fs, root))
    }
}
