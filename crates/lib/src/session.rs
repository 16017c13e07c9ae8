//! Per-invocation engine context.
//!
//! Every engine operation that reaches the build service or the
//! package index receives an explicit [`Session`] instead of ambient
//! global state. A session is created once per invocation and dropped
//! at its end.

use std::path::{Path, PathBuf};

use crate::build::{BuildService, LocalBuildService};
use crate::gc::GcRoots;
use crate::index::{JsonIndex, Package, PackageIndex};
use crate::profile::Profile;

pub struct Session {
  pub build: Box<dyn BuildService>,
  pub index: Box<dyn PackageIndex>,
  pub gc_roots: GcRoots,
  /// The global default profile; it is rooted through its parent
  /// directory rather than through the gc-roots registry.
  pub default_profile: PathBuf,
  /// Source-level transformation applied to every resolved package.
  pub transform: Box<dyn Fn(Package) -> Package>,
}

impl Session {
  pub fn new(
    build: Box<dyn BuildService>,
    index: Box<dyn PackageIndex>,
    state_dir: &Path,
    default_profile: PathBuf,
  ) -> Self {
    Session {
      build,
      index,
      gc_roots: GcRoots::new(state_dir),
      default_profile,
      transform: Box::new(|p| p),
    }
  }

  /// Session backed by the local build service and a file-based index.
  pub fn local(state_dir: &Path, index: JsonIndex) -> Self {
    let default_profile = state_dir.join("profiles").join("default");
    Session::new(
      Box::new(LocalBuildService::new(state_dir.join("store"))),
      Box::new(index),
      state_dir,
      default_profile,
    )
  }

  pub fn is_default_profile(&self, profile: &Profile) -> bool {
    profile.path() == self.default_profile
  }
}
