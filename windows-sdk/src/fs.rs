// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Filesystem probing.

use std::{collections::BTreeMap, path::Path};

/// Whether a path is absolute either on this host or as a Windows drive path.
///
/// Drive paths such as `C:\Program Files` or `c:/Program Files` are treated as
/// absolute on every host.
pub fn is_absolute_install_path(path: &Path) -> bool {
    path.is_absolute()
        || matches!(
            path.to_string_lossy().as_bytes(),
            [drive, b':', b'\\' | b'/', ..] if drive.is_ascii_alphabetic()
        )
}

/// The filesystem operations SDK discovery needs.
///
/// All operations are fallible. Discovery treats an error the same as the
/// probed entity not being present.
pub trait FileSystem: Send + Sync {
    /// List the immediate children of a directory, mapping each name to
    /// whether it is a directory.
    fn list_directory(&self, path: &Path) -> std::io::Result<BTreeMap<String, bool>>;

    /// Whether a path exists and is a regular file.
    fn is_regular_file(&self, path: &Path) -> std::io::Result<bool>;

    /// Read the full content of a file.
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// [FileSystem] backed by the local filesystem.
///
/// Symlinks are followed.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn list_directory(&self, path: &Path) -> std::io::Result<BTreeMap<String, bool>> {
        let mut res = BTreeMap::new();

        for entry in std::fs::read_dir(path)? {
            let entry = entry?;

            // Dangling symlinks and the like are simply not directories.
            let is_dir = std::fs::metadata(entry.path())
                .map(|m| m.is_dir())
                .unwrap_or(false);

            res.insert(entry.file_name().to_string_lossy().to_string(), is_dir);
        }

        Ok(res)
    }

    fn is_regular_file(&self, path: &Path) -> std::io::Result<bool> {
        Ok(std::fs::metadata(path)?.is_file())
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}
