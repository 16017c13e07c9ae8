//! Profile builder: turn a manifest into a published generation.
//!
//! The flow is: submit the manifest to the build service, short-circuit
//! when the planned output already is the current target (idempotence)
//! or when dry-running, realize the build, allocate the next generation
//! number and publish it atomically, register a gc root, and emit
//! post-build diagnostics. A build failure propagates unchanged and no
//! partial generation is ever published.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::build::{BuildError, BuildOptions};
use crate::gc::GcRootError;
use crate::manifest::Manifest;
use crate::profile::{Generation, GenerationError, GenerationStore};
use crate::search_path::environment_hints;
use crate::session::Session;

/// Free-space level below which a warning is emitted.
const LOW_SPACE_BYTES: u64 = 5 * 1024 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum BuilderError {
  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Generation(#[from] GenerationError),

  #[error(transparent)]
  GcRoot(#[from] GcRootError),
}

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
  /// Report without mutating the filesystem.
  pub dry_run: bool,
  /// Bootstrap mode: run the build with an empty hook set.
  pub bootstrap: bool,
  pub hooks: Vec<String>,
  pub locales: bool,
}

#[derive(Debug)]
pub enum BuildOutcome {
  /// The manifest already matches the current generation.
  NothingToDo,
  /// Dry run: this is what would have been built.
  DryRun { target: PathBuf },
  /// A new generation was published.
  Published {
    generation: Generation,
    hints: Vec<String>,
  },
}

/// Build `manifest` and publish it as the profile's next generation if
/// and only if it differs from the current one.
pub fn build_and_publish(
  session: &Session,
  store: &GenerationStore,
  manifest: &Manifest,
  options: &PublishOptions,
) -> Result<BuildOutcome, BuilderError> {
  let build_options = BuildOptions {
    hooks: if options.bootstrap { Vec::new() } else { options.hooks.clone() },
    locales: options.locales,
  };
  let derivation = session.build.submit(manifest, &build_options)?;
  let planned = session.build.plan(&derivation);

  if store.current_target()?.as_deref() == Some(planned.as_path()) {
    info!(profile = %store.profile().path().display(), "nothing to be done");
    return Ok(BuildOutcome::NothingToDo);
  }

  if options.dry_run {
    info!(target = %planned.display(), "dry run; not publishing");
    return Ok(BuildOutcome::DryRun { target: planned });
  }

  let target = session.build.realize(&derivation)?;
  let number = store.next_number()?;
  let generation = store.publish(number, &target)?;

  if session.is_default_profile(store.profile()) {
    debug!("default profile is rooted through its parent directory");
  } else {
    session.gc_roots.register(&generation.link)?;
  }

  let hints = environment_hints(manifest, store.profile().path());
  check_disk_space(store.profile().directory());

  Ok(BuildOutcome::Published { generation, hints })
}

fn check_disk_space(dir: &Path) {
  if let Some(available) = free_space(dir)
    && available < LOW_SPACE_BYTES
  {
    warn!(
      available,
      path = %dir.display(),
      "low disk space on the profile's file system"
    );
  }
}

#[cfg(unix)]
fn free_space(dir: &Path) -> Option<u64> {
  let stat = rustix::fs::statvfs(dir).ok()?;
  Some(stat.f_bavail * stat.f_frsize)
}

#[cfg(not(unix))]
fn free_space(_dir: &Path) -> Option<u64> {
  None
}
