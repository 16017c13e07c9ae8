//! Build service boundary.
//!
//! The content-addressed build engine is an external collaborator. The
//! engine submits a manifest and realizes the resulting derivation into
//! a store directory; a build failure is fatal to the invocation and
//! never results in a published generation.
//!
//! [`LocalBuildService`] is the built-in backend: it hashes the
//! manifest into a store directory name, writes `manifest.json` plus a
//! completion marker into a staging directory, and renames the staged
//! directory into place. A target is therefore always complete before
//! anything can point at it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::manifest::{MANIFEST_FILENAME, Manifest, ManifestError};

/// Marker file proving a store target was fully built.
pub const BUILD_COMPLETE_MARKER: &str = ".complete";

/// Truncated hash length used in store directory names.
const STORE_HASH_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("build failure: {0}")]
  Failure(String),

  #[error("failed to write build output {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to hash manifest: {0}")]
  Hash(#[source] serde_json::Error),

  #[error(transparent)]
  Manifest(#[from] ManifestError),
}

/// Post-processing hooks and locale handling for one build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildOptions {
  /// Hook names to run after the profile is assembled; empty in
  /// bootstrap mode.
  pub hooks: Vec<String>,
  /// Whether to generate locale data.
  pub locales: bool,
}

/// A submitted, not-yet-realized build.
#[derive(Debug, Clone)]
pub struct Derivation {
  pub hash: String,
  manifest: Manifest,
  options: BuildOptions,
}

impl Derivation {
  pub fn manifest(&self) -> &Manifest {
    &self.manifest
  }

  pub fn options(&self) -> &BuildOptions {
    &self.options
  }
}

/// Boundary to the external build engine.
pub trait BuildService {
  /// Submit a manifest for building.
  fn submit(&self, manifest: &Manifest, options: &BuildOptions) -> Result<Derivation, BuildError>;

  /// The store path `derivation` will realize to, without building.
  fn plan(&self, derivation: &Derivation) -> PathBuf;

  /// Realize the derivation into the store.
  fn realize(&self, derivation: &Derivation) -> Result<PathBuf, BuildError>;
}

/// Build backend that assembles profile directories in a local store.
#[derive(Debug, Clone)]
pub struct LocalBuildService {
  store_dir: PathBuf,
}

impl LocalBuildService {
  pub fn new(store_dir: impl Into<PathBuf>) -> Self {
    LocalBuildService {
      store_dir: store_dir.into(),
    }
  }

  pub fn store_dir(&self) -> &Path {
    &self.store_dir
  }

  fn output_path(&self, hash: &str) -> PathBuf {
    self.store_dir.join(format!("{hash}-profile"))
  }
}

impl BuildService for LocalBuildService {
  fn submit(&self, manifest: &Manifest, options: &BuildOptions) -> Result<Derivation, BuildError> {
    #[derive(Serialize)]
    struct Input<'a> {
      manifest: &'a Manifest,
      options: &'a BuildOptions,
    }

    let serialized = serde_json::to_string(&Input { manifest, options }).map_err(BuildError::Hash)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    let full = format!("{:x}", hasher.finalize());

    Ok(Derivation {
      hash: full[..STORE_HASH_LEN].to_string(),
      manifest: manifest.clone(),
      options: options.clone(),
    })
  }

  fn plan(&self, derivation: &Derivation) -> PathBuf {
    self.output_path(&derivation.hash)
  }

  fn realize(&self, derivation: &Derivation) -> Result<PathBuf, BuildError> {
    let out = self.output_path(&derivation.hash);
    if out.join(BUILD_COMPLETE_MARKER).exists() {
      return Ok(out);
    }

    let staging = self.store_dir.join(format!(".{}-build", derivation.hash));
    let write_err = |path: &Path, source: io::Error| BuildError::Write {
      path: path.to_path_buf(),
      source,
    };

    match fs::remove_dir_all(&staging) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(source) => return Err(write_err(&staging, source)),
    }
    fs::create_dir_all(&staging).map_err(|e| write_err(&staging, e))?;

    derivation.manifest.save(&staging.join(MANIFEST_FILENAME))?;
    let marker = staging.join(BUILD_COMPLETE_MARKER);
    fs::write(&marker, b"").map_err(|e| write_err(&marker, e))?;

    match fs::rename(&staging, &out) {
      Ok(()) => Ok(out),
      // Lost a race against another realization of the same hash.
      Err(_) if out.join(BUILD_COMPLETE_MARKER).exists() => {
        let _ = fs::remove_dir_all(&staging);
        Ok(out)
      }
      Err(source) => Err(write_err(&out, source)),
    }
  }
}
