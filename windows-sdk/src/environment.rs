// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment parameter overrides and cached SDK resolution.

use {
    crate::{
        is_absolute_install_path,
        search::{probe_regular_file, APP_CERT_KIT_MARKER},
        AppCertKitSdk, Error, FileSystem, LocalFileSystem, Sdk, SdkKind, SdkReference,
        SearchRoots, VersionPredicate, WindowsKitsSdk, WindowsUapSdk,
    },
    log::{debug, info, warn},
    once_cell::sync::OnceCell,
    std::{
        collections::{BTreeMap, HashMap},
        fmt::{Display, Formatter},
        path::{Path, PathBuf},
        sync::{Arc, Mutex, PoisonError},
    },
};

/// Parameter key prefix of Windows Kits install location overrides.
///
/// The remainder of the key is the SDK version. The value is the release root.
pub const WINDOWS_KITS_INSTALL_LOCATION_PREFIX: &str = "sdk.windowskits.install.location.";

/// Parameter key prefix of Windows UAP install location overrides.
///
/// The remainder of the key is the platform version. The value is the release root.
pub const WINDOWS_UAP_INSTALL_LOCATION_PREFIX: &str = "sdk.uap.install.location.";

/// User supplied key-value parameters of a build environment.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EnvironmentParameters {
    values: BTreeMap<String, String>,
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentParameters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvironmentParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `key=value` assignment.
    pub fn parse_assignment(s: &str) -> Result<(String, String), Error> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(Error::BadParameter(format!(
                "expected key=value; got {}",
                s
            ))),
        }
    }

    /// Set a parameter, returning self.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a parameter, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parameters whose key starts with `prefix`, as `(key suffix, value)` in key order.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.iter()
            .filter_map(move |(k, v)| k.strip_prefix(prefix).map(|suffix| (suffix, v)))
    }
}

/// A request for an SDK of a kind satisfying a version constraint.
///
/// This is the key resolved SDKs are cached under.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum SdkDescription {
    WindowsKits(VersionPredicate),
    WindowsUap(VersionPredicate),
    AppCertKit,
}

impl Display for SdkDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AppCertKit => f.write_fmt(format_args!("{}", self.kind())),
            Self::WindowsKits(versions) | Self::WindowsUap(versions) => {
                f.write_fmt(format_args!("{} (versions: {})", self.kind(), versions))
            }
        }
    }
}

impl SdkDescription {
    /// Describe an SDK of the given kind. The constraint is ignored for unversioned kinds.
    pub fn for_kind(kind: SdkKind, versions: VersionPredicate) -> Self {
        match kind {
            SdkKind::WindowsKits => Self::WindowsKits(versions),
            SdkKind::WindowsUap => Self::WindowsUap(versions),
            SdkKind::WindowsAppCertKit => Self::AppCertKit,
        }
    }

    pub fn kind(&self) -> SdkKind {
        match self {
            Self::WindowsKits(_) => SdkKind::WindowsKits,
            Self::WindowsUap(_) => SdkKind::WindowsUap,
            Self::AppCertKit => SdkKind::WindowsAppCertKit,
        }
    }

    /// The version constraint. Unversioned kinds accept any version.
    pub fn versions(&self) -> VersionPredicate {
        match self {
            Self::WindowsKits(versions) | Self::WindowsUap(versions) => versions.clone(),
            Self::AppCertKit => VersionPredicate::any(),
        }
    }

    /// Whether this may resolve to different versions depending on what is installed.
    pub fn is_indeterminate(&self) -> bool {
        match self {
            Self::WindowsKits(versions) | Self::WindowsUap(versions) => !versions.is_exact(),
            Self::AppCertKit => false,
        }
    }

    /// Obtain a description only accepting the version of a resolved SDK.
    ///
    /// Returns a copy of self if the SDK is of another kind or unversioned.
    pub fn pin(&self, sdk: &Sdk) -> Self {
        match (self, sdk.version()) {
            (Self::WindowsKits(_), Some(version)) if sdk.kind() == SdkKind::WindowsKits => {
                Self::WindowsKits(VersionPredicate::exact(version.to_string()))
            }
            (Self::WindowsUap(_), Some(version)) if sdk.kind() == SdkKind::WindowsUap => {
                Self::WindowsUap(VersionPredicate::exact(version.to_string()))
            }
            _ => self.clone(),
        }
    }
}

type Cache = Mutex<HashMap<SdkDescription, Arc<OnceCell<Sdk>>>>;

/// Resolves SDK descriptions against parameter overrides and search roots.
///
/// Successful resolutions are cached for the lifetime of the instance. At
/// most one search runs at a time for a given description; concurrent
/// requests for it wait on the in-flight search. Failures aren't cached.
pub struct SdkEnvironment<F: FileSystem = LocalFileSystem> {
    fs: F,
    parameters: EnvironmentParameters,
    roots: SearchRoots,
    cache: Cache,
}

impl SdkEnvironment<LocalFileSystem> {
    /// Construct an instance searching the local machine's `Program Files` directories.
    pub fn new(parameters: EnvironmentParameters) -> Self {
        Self::with_file_system(LocalFileSystem, parameters)
    }
}

impl<F: FileSystem> SdkEnvironment<F> {
    /// Construct an instance probing a custom [FileSystem].
    pub fn with_file_system(fs: F, parameters: EnvironmentParameters) -> Self {
        Self {
            fs,
            parameters,
            roots: SearchRoots::from_env(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the search roots.
    pub fn search_roots(mut self, roots: SearchRoots) -> Self {
        self.roots = roots;
        self
    }

    pub fn file_system(&self) -> &F {
        &self.fs
    }

    pub fn parameters(&self) -> &EnvironmentParameters {
        &self.parameters
    }

    pub fn roots(&self) -> &SearchRoots {
        &self.roots
    }

    fn cell(&self, description: &SdkDescription) -> Arc<OnceCell<Sdk>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(description.clone())
            .or_default()
            .clone()
    }

    /// Resolve a description to an SDK, consulting the cache first.
    ///
    /// Resolving an indeterminate description also records the result under
    /// its pinned description, so a later request for exactly that version
    /// is served without searching.
    pub fn resolve(&self, description: &SdkDescription) -> Result<Sdk, Error> {
        let sdk = self
            .cell(description)
            .get_or_try_init(|| self.discover(description))?
            .clone();

        if description.is_indeterminate() {
            let pinned = description.pin(&sdk);

            if &pinned != description {
                // Ignore failures; the pinned entry is already populated.
                let _ = self.cell(&pinned).set(sdk.clone());
            }
        }

        Ok(sdk)
    }

    /// Resolve a description without consulting or populating the cache.
    ///
    /// Parameter overrides are preferred over searching the roots.
    pub fn discover(&self, description: &SdkDescription) -> Result<Sdk, Error> {
        let res = match description {
            SdkDescription::WindowsKits(versions) => self
                .windows_kits_override(versions)
                .or_else(|| self.roots.search_windows_kits(&self.fs, versions))
                .map(Sdk::from),
            SdkDescription::WindowsUap(versions) => self
                .windows_uap_override(versions)
                .or_else(|| self.roots.search_windows_uap(&self.fs, versions))
                .map(Sdk::from),
            SdkDescription::AppCertKit => self
                .app_cert_kit_override()
                .or_else(|| self.roots.search_app_cert_kit(&self.fs))
                .map(Sdk::from),
        };

        match res {
            Some(sdk) => {
                info!("resolved {}", sdk);
                Ok(sdk)
            }
            None => {
                let err = Error::SdkNotFound {
                    kind: description.kind(),
                    versions: description.versions(),
                };
                warn!("{}", err);
                Err(err)
            }
        }
    }

    /// Resolve the `.winmd` paths of the API contracts of a UAP SDK.
    pub fn api_contract_winmd_paths(
        &self,
        versions: &VersionPredicate,
    ) -> Result<Vec<PathBuf>, Error> {
        self.resolve(&SdkDescription::WindowsUap(versions.clone()))?
            .as_windows_uap()?
            .api_contract_winmd_paths(&self.fs)
    }

    /// Overrides of a prefix accepted by a constraint, as `(version, install dir)`.
    fn versioned_overrides<'a>(
        &'a self,
        prefix: &'a str,
        versions: &'a VersionPredicate,
    ) -> impl Iterator<Item = (&'a str, &'a Path)> + 'a {
        self.parameters
            .with_prefix(prefix)
            .filter_map(move |(version, location)| {
                let path = Path::new(location);

                if version.is_empty() {
                    warn!("ignoring {} override without a version", prefix);
                    None
                } else if !versions.accepts(version) {
                    debug!(
                        "ignoring {}{} override because it is not one of: {}",
                        prefix, version, versions
                    );
                    None
                } else if !is_absolute_install_path(path) {
                    warn!(
                        "ignoring {}{} override because {} is not absolute",
                        prefix, version, location
                    );
                    None
                } else {
                    Some((version, path))
                }
            })
    }

    fn windows_kits_override(&self, versions: &VersionPredicate) -> Option<WindowsKitsSdk> {
        let (version, path) = self
            .versioned_overrides(WINDOWS_KITS_INSTALL_LOCATION_PREFIX, versions)
            .next()?;

        WindowsKitsSdk::new(path, version).ok()
    }

    fn windows_uap_override(&self, versions: &VersionPredicate) -> Option<WindowsUapSdk> {
        let (version, path) = self
            .versioned_overrides(WINDOWS_UAP_INSTALL_LOCATION_PREFIX, versions)
            .next()?;

        WindowsUapSdk::new(path, version).ok()
    }

    fn app_cert_kit_override(&self) -> Option<AppCertKitSdk> {
        let any = VersionPredicate::any();

        for (version, path) in
            self.versioned_overrides(WINDOWS_KITS_INSTALL_LOCATION_PREFIX, &any)
        {
            let exe = APP_CERT_KIT_MARKER
                .iter()
                .fold(path.to_path_buf(), |p, s| p.join(s));

            if probe_regular_file(&self.fs, &exe) {
                if let Some(dir) = exe.parent() {
                    return AppCertKitSdk::new(dir).ok();
                }
            }

            warn!(
                "ignoring {}{} override for {} because {} is missing",
                WINDOWS_KITS_INSTALL_LOCATION_PREFIX,
                version,
                SdkKind::WindowsAppCertKit,
                exe.display()
            );
        }

        None
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{
            testutil::{
                install_app_cert_kit, install_uap, install_windows_kits, CountingFileSystem,
            },
            SdkVersion,
        },
    };

    fn environment(
        root: &Path,
        parameters: EnvironmentParameters,
    ) -> SdkEnvironment<CountingFileSystem> {
        SdkEnvironment::with_file_system(CountingFileSystem::default(), parameters)
            .search_roots(SearchRoots::empty().root(root))
    }

    #[test]
    fn parameters() -> Result<(), Error> {
        assert_eq!(
            EnvironmentParameters::parse_assignment("a.b=c=d")?,
            ("a.b".to_string(), "c=d".to_string())
        );
        assert_eq!(
            EnvironmentParameters::parse_assignment("a=")?,
            ("a".to_string(), "".to_string())
        );
        assert!(matches!(
            EnvironmentParameters::parse_assignment("a"),
            Err(Error::BadParameter(_))
        ));
        assert!(matches!(
            EnvironmentParameters::parse_assignment("=a"),
            Err(Error::BadParameter(_))
        ));

        let params = EnvironmentParameters::new()
            .set("sdk.uap.install.location.2", "/b")
            .set("sdk.uap.install.location.1", "/a")
            .set("other", "/c");
        assert_eq!(params.get("other"), Some("/c"));
        assert_eq!(
            params
                .with_prefix(WINDOWS_UAP_INSTALL_LOCATION_PREFIX)
                .collect::<Vec<_>>(),
            vec![("1", "/a"), ("2", "/b")]
        );

        Ok(())
    }

    #[test]
    fn uap_override_skips_search() -> Result<(), Error> {
        let temp_dir = tempfile::tempdir()?;
        let custom = temp_dir.path().join("Custom").join("Uap");
        install_uap(temp_dir.path(), "10", "10.0.18362.0")?;

        let env = environment(
            temp_dir.path(),
            EnvironmentParameters::new().set(
                format!("{}10.0.18362.0", WINDOWS_UAP_INSTALL_LOCATION_PREFIX),
                custom.to_string_lossy(),
            ),
        );

        let sdk = env.resolve(&SdkDescription::WindowsUap(VersionPredicate::exact(
            "10.0.18362.0",
        )))?;
        assert_eq!(sdk.kind(), SdkKind::WindowsUap);
        assert_eq!(sdk.base_directory(), custom);
        assert_eq!(sdk.version(), Some(&SdkVersion::from("10.0.18362.0")));
        assert_eq!(env.file_system().operations(), 0);

        // A constraint rejecting the override version falls back to searching.
        let sdk = env.resolve(&SdkDescription::WindowsUap(VersionPredicate::exact(
            "10.0.17763.0",
        )));
        assert!(matches!(sdk, Err(Error::SdkNotFound { .. })));
        assert!(env.file_system().operations() > 0);

        Ok(())
    }

    #[test]
    fn drive_path_override() -> Result<(), Error> {
        let temp_dir = tempfile::tempdir()?;
        install_uap(temp_dir.path(), "10", "10.0.18362.0")?;

        let env = environment(
            temp_dir.path(),
            EnvironmentParameters::new()
                .set("sdk.uap.install.location.10.0.18362.0", r"C:\Custom\Uap"),
        );

        let sdk = env.resolve(&SdkDescription::WindowsUap(VersionPredicate::exact(
            "10.0.18362.0",
        )))?;
        assert_eq!(sdk.base_directory(), Path::new(r"C:\Custom\Uap"));
        assert_eq!(sdk.version(), Some(&SdkVersion::from("10.0.18362.0")));
        assert_eq!(env.file_system().operations(), 0);

        Ok(())
    }

    #[test]
    fn windows_kits_override() -> Result<(), Error> {
        let temp_dir = tempfile::tempdir()?;
        let custom = temp_dir.path().join("Kits");

        let env = environment(
            temp_dir.path(),
            EnvironmentParameters::new()
                .set(
                    format!("{}10.0.17763.0", WINDOWS_KITS_INSTALL_LOCATION_PREFIX),
                    "relative/path",
                )
                .set(
                    format!("{}10.0.18362.0", WINDOWS_KITS_INSTALL_LOCATION_PREFIX),
                    custom.to_string_lossy(),
                ),
        );

        let sdk = env.resolve(&SdkDescription::WindowsKits(VersionPredicate::any()))?;
        assert_eq!(sdk.base_directory(), custom);
        assert_eq!(sdk.version(), Some(&SdkVersion::from("10.0.18362.0")));
        assert_eq!(env.file_system().operations(), 0);

        Ok(())
    }

    #[test]
    fn search_fallback_and_not_found() -> Result<(), Error> {
        let temp_dir = tempfile::tempdir()?;
        install_windows_kits(temp_dir.path(), "10", "10.0.18362.0")?;

        let env = environment(temp_dir.path(), EnvironmentParameters::new());

        let sdk = env.resolve(&SdkDescription::WindowsKits(VersionPredicate::any()))?;
        assert_eq!(sdk.version(), Some(&SdkVersion::from("10.0.18362.0")));

        match env.resolve(&SdkDescription::WindowsUap(VersionPredicate::any())) {
            Err(err @ Error::SdkNotFound { .. }) => {
                assert_eq!(
                    err.to_string(),
                    "Windows UAP SDK not found for versions: any"
                );
            }
            res => panic!("unexpected result: {:?}", res),
        }

        match env.resolve(&SdkDescription::AppCertKit) {
            Err(err @ Error::SdkNotFound {
                kind: SdkKind::WindowsAppCertKit,
                ..
            }) => {
                assert_eq!(
                    err.to_string(),
                    "Windows App Certification Kit SDK not found"
                );
            }
            res => panic!("unexpected result: {:?}", res),
        }

        Ok(())
    }

    #[test]
    fn cache_reuse() -> Result<(), Error> {
        let temp_dir = tempfile::tempdir()?;
        install_uap(temp_dir.path(), "10", "10.0.18362.0")?;

        let env = environment(temp_dir.path(), EnvironmentParameters::new());
        let description = SdkDescription::WindowsUap(VersionPredicate::any());

        let first = env.resolve(&description)?;
        let operations = env.file_system().operations();
        assert!(operations > 0);

        let second = env.resolve(&description)?;
        assert_eq!(first, second);
        assert_eq!(env.file_system().operations(), operations);

        // The pinned description was seeded by the indeterminate resolution.
        let pinned = description.pin(&first);
        assert_eq!(
            pinned,
            SdkDescription::WindowsUap(VersionPredicate::exact("10.0.18362.0"))
        );
        assert_eq!(env.resolve(&pinned)?, first);
        assert_eq!(env.file_system().operations(), operations);

        Ok(())
    }

    #[test]
    fn failures_not_cached() -> Result<(), Error> {
        let temp_dir = tempfile::tempdir()?;
        let env = environment(temp_dir.path(), EnvironmentParameters::new());
        let description = SdkDescription::WindowsKits(VersionPredicate::any());

        assert!(env.resolve(&description).is_err());

        install_windows_kits(temp_dir.path(), "10", "10.0.18362.0")?;
        let sdk = env.resolve(&description)?;
        assert_eq!(sdk.version(), Some(&SdkVersion::from("10.0.18362.0")));

        Ok(())
    }

    #[test]
    fn concurrent_resolution_searches_once() -> Result<(), Error> {
        let temp_dir = tempfile::tempdir()?;
        install_windows_kits(temp_dir.path(), "10", "10.0.17763.0")?;
        install_windows_kits(temp_dir.path(), "10", "10.0.18362.0")?;
        let description = SdkDescription::WindowsKits(VersionPredicate::any());

        let reference = environment(temp_dir.path(), EnvironmentParameters::new());
        reference.discover(&description)?;
        let single_search = reference.file_system().operations();

        let env = environment(temp_dir.path(), EnvironmentParameters::new());

        let results = std::thread::scope(|s| {
            let handles = (0..8)
                .map(|_| s.spawn(|| env.resolve(&description)))
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|h| h.join().expect("thread should not panic"))
                .collect::<Vec<_>>()
        });

        for res in results {
            assert_eq!(res?.version(), Some(&SdkVersion::from("10.0.18362.0")));
        }
        assert_eq!(env.file_system().operations(), single_search);

        Ok(())
    }

    #[test]
    fn pinning() -> Result<(), Error> {
        let kits = Sdk::from(WindowsKitsSdk::new(
            std::env::temp_dir(),
            "10.0.18362.0",
        )?);
        let uap = Sdk::from(WindowsUapSdk::new(std::env::temp_dir(), "10.0.17763.0")?);

        let any_kits = SdkDescription::WindowsKits(VersionPredicate::any());
        assert!(any_kits.is_indeterminate());

        let pinned = any_kits.pin(&kits);
        assert!(!pinned.is_indeterminate());
        assert_eq!(
            pinned,
            SdkDescription::WindowsKits(VersionPredicate::exact("10.0.18362.0"))
        );

        // Mismatched kinds leave the description alone.
        assert_eq!(any_kits.pin(&uap), any_kits);
        assert_eq!(SdkDescription::AppCertKit.pin(&kits), SdkDescription::AppCertKit);
        assert!(!SdkDescription::AppCertKit.is_indeterminate());

        assert_eq!(
            SdkDescription::for_kind(SdkKind::WindowsAppCertKit, VersionPredicate::exact("1")),
            SdkDescription::AppCertKit
        );
        assert_eq!(any_kits.to_string(), "Windows Kits (versions: any)");

        Ok(())
    }

    #[test]
    fn app_cert_kit_override() -> Result<(), Error> {
        let temp_dir = tempfile::tempdir()?;
        let search_root = temp_dir.path().join("Program Files");
        let custom_root = temp_dir.path().join("Custom");
        let empty_release = temp_dir.path().join("Empty");
        install_app_cert_kit(&search_root, "10")?;
        let custom_kit = install_app_cert_kit(&custom_root, "10")?;
        let custom_release = custom_kit
            .parent()
            .expect("kit directory should have a parent")
            .to_path_buf();

        // An override without the kit is skipped in favor of the next one.
        let env = environment(
            &search_root,
            EnvironmentParameters::new()
                .set(
                    format!("{}1", WINDOWS_KITS_INSTALL_LOCATION_PREFIX),
                    empty_release.to_string_lossy(),
                )
                .set(
                    format!("{}2", WINDOWS_KITS_INSTALL_LOCATION_PREFIX),
                    custom_release.to_string_lossy(),
                ),
        );
        let sdk = env.resolve(&SdkDescription::AppCertKit)?;
        assert_eq!(sdk.base_directory(), custom_kit);
        assert_eq!(sdk.version(), None);

        // Without a qualifying override, the search roots are used.
        let env = environment(
            &search_root,
            EnvironmentParameters::new().set(
                format!("{}1", WINDOWS_KITS_INSTALL_LOCATION_PREFIX),
                empty_release.to_string_lossy(),
            ),
        );
        let sdk = env.resolve(&SdkDescription::AppCertKit)?;
        assert!(sdk.base_directory().starts_with(&search_root));

        Ok(())
    }

    #[test]
    fn api_contracts() -> Result<(), Error> {
        let temp_dir = tempfile::tempdir()?;
        let base = install_uap(temp_dir.path(), "10", "10.0.18362.0")?;
        install_windows_kits(temp_dir.path(), "10", "10.0.18362.0")?;

        let env = environment(temp_dir.path(), EnvironmentParameters::new());
        let paths = env.api_contract_winmd_paths(&VersionPredicate::any())?;
        assert_eq!(
            paths,
            vec![base
                .join("References")
                .join("10.0.18362.0")
                .join("Windows.Foundation.FoundationContract")
                .join("3.0.0.0")
                .join("Windows.Foundation.FoundationContract.winmd")]
        );

        Ok(())
    }
}
