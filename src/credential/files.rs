//! File access for generated key material.

use std::io;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

/// File operations needed to read back and erase key files.
///
/// Abstracted so tests can count removals without touching the disk.
pub trait KeyFileSystem: Send + Sync {
    /// Reads a key file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the file cannot be read.
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String>;

    /// Removes a key file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, including [`io::ErrorKind::NotFound`]
    /// when the file was never written.
    fn remove_file(&self, path: &Utf8Path) -> io::Result<()>;
}

/// Key file access on the host file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostKeyFiles;

impl HostKeyFiles {
    fn open_parent(path: &Utf8Path) -> io::Result<(Dir, &str)> {
        let parent = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("key path {path} is missing a file name"),
            )
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
        Ok((dir, file_name))
    }
}

impl KeyFileSystem for HostKeyFiles {
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String> {
        let (dir, file_name) = Self::open_parent(path)?;
        dir.read_to_string(file_name)
    }

    fn remove_file(&self, path: &Utf8Path) -> io::Result<()> {
        let (dir, file_name) = Self::open_parent(path)?;
        dir.remove_file(file_name)
    }
}
