//! Directory aliases
//!
//! Example content is linked into development installs rather than copied, so
//! the plugin always sees the current checkout of the snippet repository. POSIX
//! hosts get a symbolic link; Windows hosts get a directory junction, which
//! unlike a symbolic link does not need elevated privileges.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

use crate::{Error, Result};

/// Kind of filesystem alias a linker creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Symlink,
    Junction,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKind::Symlink => f.write_str("symlink"),
            LinkKind::Junction => f.write_str("junction"),
        }
    }
}

/// Creates an entry at one path that resolves to the contents of another
pub trait PathLinker {
    /// Alias kind this linker produces
    fn kind(&self) -> LinkKind;

    /// Platform-specific creation; `target` is absolute, `link` does not exist
    /// and its parent does
    fn create(&self, target: &Utf8Path, link: &Utf8Path) -> Result<()>;

    /// Remove an alias this linker created, leaving its target alone
    fn unlink(&self, link: &Utf8Path) -> Result<()>;

    /// Create `link` resolving to `target`.
    ///
    /// Fails if anything (even a dangling link) already exists at `link`.
    fn link(&self, target: &Utf8Path, link: &Utf8Path) -> Result<()> {
        if link.symlink_metadata().is_ok() {
            return Err(Error::link(
                format!("Cannot create {} at {}: path already exists", self.kind(), link),
                "Remove the existing entry first if it should be replaced",
            ));
        }

        if let Some(parent) = link.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Aliases must not depend on the directory they are created from
        let target = Utf8PathBuf::try_from(std::path::absolute(target)?).map_err(|e| {
            Error::link(
                format!("Path is not valid UTF-8: {:?}", e.as_path()),
                "Ensure all file paths contain only valid UTF-8 characters",
            )
        })?;

        tracing::info!(kind = %self.kind(), target = %target, link = %link, "Creating directory alias");
        self.create(&target, link)
    }
}

/// Symbolic links, for POSIX hosts
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SymlinkLinker;

#[cfg(unix)]
impl PathLinker for SymlinkLinker {
    fn kind(&self) -> LinkKind {
        LinkKind::Symlink
    }

    fn create(&self, target: &Utf8Path, link: &Utf8Path) -> Result<()> {
        std::os::unix::fs::symlink(target, link)?;
        Ok(())
    }

    fn unlink(&self, link: &Utf8Path) -> Result<()> {
        std::fs::remove_file(link)?;
        Ok(())
    }
}

/// Directory junctions, created with `mklink /J`
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct JunctionLinker;

#[cfg(windows)]
impl PathLinker for JunctionLinker {
    fn kind(&self) -> LinkKind {
        LinkKind::Junction
    }

    fn create(&self, target: &Utf8Path, link: &Utf8Path) -> Result<()> {
        let target = target.as_str().replace('/', "\\");
        let link = link.as_str().replace('/', "\\");

        let output = std::process::Command::new("cmd")
            .arg("/C")
            .arg("mklink")
            .arg("/J")
            .arg(&link)
            .arg(&target)
            .output()?;

        if !output.status.success() {
            return Err(Error::link(
                format!(
                    "mklink /J failed for {}: {}",
                    link,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                "Check that the target directory exists and is on a local NTFS volume",
            ));
        }

        Ok(())
    }

    fn unlink(&self, link: &Utf8Path) -> Result<()> {
        // Junctions are directories; removing one does not touch its target
        std::fs::remove_dir(link)?;
        Ok(())
    }
}

/// Linker for the platform this process runs on
#[cfg(unix)]
pub fn host_linker() -> Box<dyn PathLinker> {
    Box::new(SymlinkLinker)
}

/// Linker for the platform this process runs on
#[cfg(windows)]
pub fn host_linker() -> Box<dyn PathLinker> {
    Box::new(JunctionLinker)
}
