//! Garbage-collector root registration.
//!
//! The store's garbage collector is external; the engine's only duty
//! is to keep every published generation reachable by registering its
//! link under a roots directory, and to drop roots for deleted
//! generations. The global default profile is rooted through its
//! parent directory and is never registered here.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GcRootError {
  #[error("failed to create gc roots directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to register gc root {path}: {source}")]
  Register {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove gc root {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Registry of indirect garbage-collector roots.
#[derive(Debug, Clone)]
pub struct GcRoots {
  dir: PathBuf,
}

impl GcRoots {
  pub fn new(state_dir: &Path) -> Self {
    GcRoots {
      dir: state_dir.join("gcroots"),
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn root_path(&self, link: &Path) -> PathBuf {
    // Links from different profiles can share a basename; disambiguate
    // with a hash of the full path.
    let mut hasher = Sha256::new();
    hasher.update(link.as_os_str().as_encoded_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let name = link.file_name().and_then(|n| n.to_str()).unwrap_or("link");
    self.dir.join(format!("{}-{}", &digest[..8], name))
  }

  /// Register `link` (a generation link) as a root.
  pub fn register(&self, link: &Path) -> Result<PathBuf, GcRootError> {
    fs::create_dir_all(&self.dir).map_err(|source| GcRootError::CreateDir {
      path: self.dir.clone(),
      source,
    })?;

    let root = self.root_path(link);
    match fs::remove_file(&root) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(source) => {
        return Err(GcRootError::Remove {
          path: root.clone(),
          source,
        });
      }
    }
    symlink(link, &root).map_err(|source| GcRootError::Register {
      path: root.clone(),
      source,
    })?;
    debug!(root = %root.display(), link = %link.display(), "registered gc root");
    Ok(root)
  }

  /// Drop the root for `link`; absent roots are fine.
  pub fn unregister(&self, link: &Path) -> Result<(), GcRootError> {
    let root = self.root_path(link);
    match fs::remove_file(&root) {
      Ok(()) => {
        debug!(root = %root.display(), "removed gc root");
        Ok(())
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(source) => Err(GcRootError::Remove { path: root, source }),
    }
  }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::windows::fs::symlink_file(target, link)
}
