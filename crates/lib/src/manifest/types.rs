//! Manifest entry and manifest types.
//!
//! A manifest is the ordered list of items making up one profile
//! generation. Entries are immutable values: a "changed" entry is a new
//! value, never an in-place mutation. Two entries never share the same
//! `(name, output)` pair in a valid manifest.
//!
//! # Persistence
//!
//! Manifests are serialized as JSON inside the built generation
//! directory (`manifest.json`), with a schema version checked on load.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current manifest schema version.
pub const MANIFEST_VERSION: u32 = 1;

/// File name of the manifest inside a built generation directory.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// An opaque, content-addressed reference to a built store item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorePath(pub PathBuf);

impl StorePath {
  pub fn as_path(&self) -> &Path {
    &self.0
  }
}

impl fmt::Display for StorePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.display())
  }
}

impl From<PathBuf> for StorePath {
  fn from(path: PathBuf) -> Self {
    StorePath(path)
  }
}

/// One installed item in a profile manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
  pub name: String,
  pub version: String,
  pub output: String,
  /// Content-addressed store item this entry resolves to.
  pub item: StorePath,
  /// Free-form properties (search paths, provenance, ...).
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub properties: BTreeMap<String, serde_json::Value>,
}

impl ManifestEntry {
  /// Uniqueness key for matching purposes.
  pub fn key(&self) -> (&str, &str) {
    (&self.name, &self.output)
  }

  pub fn same_key(&self, other: &ManifestEntry) -> bool {
    self.key() == other.key()
  }

  /// Pattern matching exactly this entry (name, version and output).
  pub fn exact_pattern(&self) -> ManifestPattern {
    ManifestPattern {
      name: self.name.clone(),
      version: Some(self.version.clone()),
      output: Some(self.output.clone()),
    }
  }
}

impl fmt::Display for ManifestEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}:{}", self.name, self.version, self.output)
  }
}

/// Selects manifest entries by name, with optional version and output.
///
/// An absent `version` or `output` matches any value. Patterns are used
/// both for removal selection and for upgrade targeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPattern {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<String>,
}

impl ManifestPattern {
  /// Pattern matching every version and output of `name`.
  pub fn name(name: impl Into<String>) -> Self {
    ManifestPattern {
      name: name.into(),
      version: None,
      output: None,
    }
  }

  /// Parse a `name[@version][:output]` package spec.
  pub fn parse(spec: &str) -> Result<Self, ManifestError> {
    let (rest, output) = match spec.rsplit_once(':') {
      Some((rest, output)) if !output.is_empty() => (rest, Some(output.to_string())),
      Some(_) => return Err(ManifestError::InvalidSpec(spec.to_string())),
      None => (spec, None),
    };
    let (name, version) = match rest.split_once('@') {
      Some((name, version)) if !version.is_empty() => (name, Some(version.to_string())),
      Some(_) => return Err(ManifestError::InvalidSpec(spec.to_string())),
      None => (rest, None),
    };
    if name.is_empty() {
      return Err(ManifestError::InvalidSpec(spec.to_string()));
    }
    Ok(ManifestPattern {
      name: name.to_string(),
      version,
      output,
    })
  }

  pub fn matches(&self, entry: &ManifestEntry) -> bool {
    self.name == entry.name
      && self.version.as_deref().is_none_or(|v| v == entry.version)
      && self.output.as_deref().is_none_or(|o| o == entry.output)
  }
}

/// An ordered collection of manifest entries.
///
/// Order is installation order; listings show the most recent entry
/// last. Updated entries move to the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
  pub version: u32,
  pub entries: Vec<ManifestEntry>,
}

impl Default for Manifest {
  fn default() -> Self {
    Manifest {
      version: MANIFEST_VERSION,
      entries: Vec::new(),
    }
  }
}

impl Manifest {
  pub fn new() -> Self {
    Manifest::default()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Look up an entry by its uniqueness key.
  pub fn find(&self, name: &str, output: &str) -> Option<&ManifestEntry> {
    self.entries.iter().find(|e| e.key() == (name, output))
  }

  /// All entries matching `pattern`.
  pub fn matching(&self, pattern: &ManifestPattern) -> Vec<&ManifestEntry> {
    self.entries.iter().filter(|e| pattern.matches(e)).collect()
  }

  /// Checks the no-duplicate-key invariant.
  pub fn check(&self) -> Result<(), ManifestError> {
    let mut seen = std::collections::HashSet::new();
    for entry in &self.entries {
      if !seen.insert(entry.key()) {
        return Err(ManifestError::Duplicate {
          name: entry.name.clone(),
          output: entry.output.clone(),
        });
      }
    }
    Ok(())
  }

  /// Load a manifest from `path`.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let manifest: Manifest = serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    if manifest.version != MANIFEST_VERSION {
      return Err(ManifestError::UnsupportedVersion(manifest.version));
    }
    manifest.check()?;
    Ok(manifest)
  }

  /// Save the manifest to `path`.
  ///
  /// Uses atomic write (write to temp, then rename) to prevent corruption.
  pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
    let content = serde_json::to_string_pretty(self).map_err(ManifestError::Serialize)?;
    let temp_path = path.with_extension("json.tmp");
    let write_err = |source: io::Error| ManifestError::Write {
      path: path.to_path_buf(),
      source,
    };
    fs::write(&temp_path, &content).map_err(write_err)?;
    fs::rename(&temp_path, path).map_err(write_err)?;
    Ok(())
  }
}

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse manifest {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to write manifest {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported manifest version {0}")]
  UnsupportedVersion(u32),

  #[error("invalid package spec '{0}'")]
  InvalidSpec(String),

  #[error("manifest contains duplicate entry for {name}:{output}")]
  Duplicate { name: String, output: String },
}
