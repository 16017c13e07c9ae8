//! Profiles and generation links.
//!
//! # On-disk layout
//!
//! ```text
//! {dir}/{base}                     # pointer: symlink to the current generation link
//! {dir}/{base}-3-1724000000-link   # generation link: symlink to a store target
//! {dir}/{base}.lock                # profile lock file
//! ```
//!
//! Generation link names encode the profile basename, the generation
//! number and the creation timestamp. Generation 0 is implicit: it is
//! the empty baseline and never has a link.

mod generations;
mod lock;

use std::path::{Path, PathBuf};

pub use generations::{Generation, GenerationError, GenerationStore, SelectMode};
pub use lock::{LockError, LockMetadata, ProfileLock, with_lock};

/// A user-visible profile: a mutable pointer into an immutable,
/// numbered sequence of generations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
  path: PathBuf,
  base: String,
}

impl Profile {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let base = path
      .file_name()
      .and_then(|n| n.to_str())
      .unwrap_or("profile")
      .to_string();
    Profile { path, base }
  }

  /// The pointer path.
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Directory holding the pointer and all generation links.
  pub fn directory(&self) -> &Path {
    self.path.parent().unwrap_or(Path::new("."))
  }

  pub fn base_name(&self) -> &str {
    &self.base
  }

  /// Whether the pointer exists (without following it).
  pub fn exists(&self) -> bool {
    self.path.symlink_metadata().is_ok()
  }

  pub fn lock_path(&self) -> PathBuf {
    self.directory().join(format!("{}.lock", self.base))
  }

  pub(crate) fn generation_link_name(&self, number: u64, timestamp: u64) -> String {
    format!("{}-{}-{}-link", self.base, number, timestamp)
  }

  /// Parse `(number, timestamp)` out of a generation link name
  /// belonging to this profile.
  pub(crate) fn parse_link_name(&self, file_name: &str) -> Option<(u64, u64)> {
    let rest = file_name.strip_prefix(self.base.as_str())?.strip_prefix('-')?;
    let middle = rest.strip_suffix("-link")?;
    let (number, timestamp) = middle.split_once('-')?;
    Some((number.parse().ok()?, timestamp.parse().ok()?))
  }
}
