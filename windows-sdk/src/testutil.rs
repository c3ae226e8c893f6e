// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Helpers for laying out fake SDK installs in tests.

use {
    crate::{FileSystem, LocalFileSystem, WINDOWS_KITS_DIRECTORY_NAME},
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
        sync::atomic::{AtomicUsize, Ordering},
    },
};

fn touch(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, data)
}

pub fn release_root(search_root: &Path, release: &str) -> PathBuf {
    search_root.join(WINDOWS_KITS_DIRECTORY_NAME).join(release)
}

/// Install a Windows Kits SDK version under a search root.
pub fn install_windows_kits(
    search_root: &Path,
    release: &str,
    version: &str,
) -> std::io::Result<PathBuf> {
    let root = release_root(search_root, release);
    touch(
        &root.join("Include").join(version).join("um").join("Windows.h"),
        b"",
    )?;

    Ok(root)
}

pub fn platform_xml(version: &str, contracts: &[(&str, &str)]) -> String {
    let mut s = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <ApplicationPlatform name=\"UAP\" friendlyName=\"Windows 10\" version=\"{}\">\n\
         \x20 <MinimumVisualStudioVersion version=\"15.0.25909.02\" />\n\
         \x20 <ContainedApiContracts>\n",
        version
    );

    for (name, version) in contracts {
        s.push_str(&format!(
            "    <ApiContract name=\"{}\" version=\"{}\" />\n",
            name, version
        ));
    }

    s.push_str("  </ContainedApiContracts>\n</ApplicationPlatform>\n");

    s
}

/// Install a Windows UAP SDK version with a `Platform.xml` declaring a contract.
pub fn install_uap(search_root: &Path, release: &str, version: &str) -> std::io::Result<PathBuf> {
    install_uap_with_platform(
        search_root,
        release,
        version,
        &platform_xml(
            version,
            &[("Windows.Foundation.FoundationContract", "3.0.0.0")],
        ),
    )
}

pub fn install_uap_with_platform(
    search_root: &Path,
    release: &str,
    version: &str,
    platform_xml: &str,
) -> std::io::Result<PathBuf> {
    let root = release_root(search_root, release);
    touch(
        &root
            .join("Platforms")
            .join("UAP")
            .join(version)
            .join("Platform.xml"),
        platform_xml.as_bytes(),
    )?;

    Ok(root)
}

/// Install the App Certification Kit, returning the directory holding `appcert.exe`.
pub fn install_app_cert_kit(search_root: &Path, release: &str) -> std::io::Result<PathBuf> {
    let dir = release_root(search_root, release).join("App Certification Kit");
    touch(&dir.join("appcert.exe"), b"")?;

    Ok(dir)
}

/// A [LocalFileSystem] counting the operations performed against it.
#[derive(Debug, Default)]
pub struct CountingFileSystem {
    listings: AtomicUsize,
    probes: AtomicUsize,
    reads: AtomicUsize,
}

impl CountingFileSystem {
    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn operations(&self) -> usize {
        self.listings() + self.probes() + self.reads()
    }
}

impl FileSystem for CountingFileSystem {
    fn list_directory(&self, path: &Path) -> std::io::Result<BTreeMap<String, bool>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        LocalFileSystem.list_directory(path)
    }

    fn is_regular_file(&self, path: &Path) -> std::io::Result<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        LocalFileSystem.is_regular_file(path)
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        LocalFileSystem.read(path)
    }
}
