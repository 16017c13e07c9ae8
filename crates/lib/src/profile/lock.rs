//! File-based profile locking for mutual exclusion.
//!
//! At most one mutator runs per profile; the lock is held across the
//! whole invocation (administrative actions plus the transaction/build
//! step) and released on every exit path when the guard drops.
//! Acquisition blocks without a timeout. Read-only queries never take
//! the lock.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Profile;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub command: String,
  pub profile: PathBuf,
}

#[derive(Debug, Error)]
pub enum LockError {
  #[error("failed to create profile directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to open lock file {path}: {source}")]
  OpenFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// Exclusive, profile-scoped lock. Released on drop.
pub struct ProfileLock {
  _file: File,
  lock_path: PathBuf,
}

impl ProfileLock {
  /// Acquire the lock for `profile`, blocking until it is free.
  pub fn acquire(profile: &Profile, command: &str) -> Result<Self, LockError> {
    let dir = profile.directory();
    if !dir.exists() {
      std::fs::create_dir_all(dir).map_err(LockError::CreateDir)?;
    }

    let lock_path = profile.lock_path();
    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(|source| LockError::OpenFile {
        path: lock_path.clone(),
        source,
      })?;

    lock_exclusive(&file).map_err(LockError::LockFailed)?;
    Self::write_metadata(&file, command, profile)?;

    Ok(ProfileLock { _file: file, lock_path })
  }

  fn write_metadata(file: &File, command: &str, profile: &Profile) -> Result<(), LockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      command: command.to_string(),
      profile: profile.path().to_path_buf(),
    };

    file.set_len(0).map_err(LockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata)
      .map_err(|e| LockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(LockError::WriteMetadata)?;

    Ok(())
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  /// Reads the lock metadata back from the held file handle.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Read, Seek, SeekFrom};

    let mut file = &self._file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }
}

/// Run `body` while holding the profile lock.
pub fn with_lock<T>(profile: &Profile, command: &str, body: impl FnOnce() -> T) -> Result<T, LockError> {
  let _lock = ProfileLock::acquire(profile, command)?;
  Ok(body())
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::LockExclusive).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> io::Result<()> {
  Ok(())
}
