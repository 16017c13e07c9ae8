//! Package index boundary.
//!
//! The package database is an external collaborator; the engine only
//! needs name-based lookup and supersession redirects, expressed by
//! [`PackageIndex`]. [`JsonIndex`] is the file-backed implementation
//! used by the CLI and by tests.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::{ManifestEntry, StorePath};
use crate::version;

/// Current index schema version.
pub const INDEX_VERSION: u32 = 1;

/// An available package as the index describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
  pub name: String,
  pub version: String,
  #[serde(default = "default_outputs")]
  pub outputs: Vec<String>,
  /// Lowered store item per output, when known without a build.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub items: BTreeMap<String, PathBuf>,
  /// Name of the package superseding this one, if any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub superseded_by: Option<String>,
  /// Properties propagated into manifest entries (search paths, ...).
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub properties: BTreeMap<String, serde_json::Value>,
}

fn default_outputs() -> Vec<String> {
  vec!["out".to_string()]
}

impl Package {
  pub fn is_installable(&self) -> bool {
    !self.outputs.is_empty()
  }

  pub fn default_output(&self) -> &str {
    self.outputs.first().map(String::as_str).unwrap_or("out")
  }

  pub fn has_output(&self, output: &str) -> bool {
    self.outputs.iter().any(|o| o == output)
  }

  /// Fully lowered entry for `output`, or `None` when lowering would
  /// require a real build.
  pub fn lower(&self, output: &str) -> Option<ManifestEntry> {
    let item = self.items.get(output)?;
    Some(self.entry_with_item(output, StorePath(item.clone())))
  }

  /// Entry for `output`. When the lowered item is not known without a
  /// build, the item is a derivation placeholder that the build service
  /// resolves at realization time.
  pub fn entry_for(&self, output: &str) -> ManifestEntry {
    self.lower(output).unwrap_or_else(|| {
      let placeholder = PathBuf::from(format!("@derive/{}-{}/{}", self.name, self.version, output));
      self.entry_with_item(output, StorePath(placeholder))
    })
  }

  fn entry_with_item(&self, output: &str, item: StorePath) -> ManifestEntry {
    ManifestEntry {
      name: self.name.clone(),
      version: self.version.clone(),
      output: output.to_string(),
      item,
      properties: self.properties.clone(),
    }
  }
}

/// Lookup interface onto the external package database.
pub trait PackageIndex {
  /// Best-ranked available package named `name`, optionally pinned to
  /// an exact version. Tie-breaking is the index's concern and must be
  /// deterministic.
  fn lookup_best(&self, name: &str, version: Option<&str>) -> Option<Package>;

  /// Single-step supersession redirect for `package`.
  fn superseded_by(&self, package: &Package) -> Option<Package>;
}

#[derive(Debug, Error)]
pub enum IndexError {
  #[error("failed to read package index {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse package index {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("unsupported package index version {0}")]
  UnsupportedVersion(u32),
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
  version: u32,
  packages: Vec<Package>,
}

/// File-backed package index.
#[derive(Debug, Default, Clone)]
pub struct JsonIndex {
  packages: Vec<Package>,
}

impl JsonIndex {
  pub fn new(packages: Vec<Package>) -> Self {
    JsonIndex { packages }
  }

  /// Load the index from a JSON file; a missing file is an empty index.
  pub fn load(path: &Path) -> Result<Self, IndexError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(JsonIndex::default()),
      Err(source) => {
        return Err(IndexError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };
    let file: IndexFile = serde_json::from_str(&content).map_err(|source| IndexError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    if file.version != INDEX_VERSION {
      return Err(IndexError::UnsupportedVersion(file.version));
    }
    Ok(JsonIndex {
      packages: file.packages,
    })
  }

  pub fn is_empty(&self) -> bool {
    self.packages.is_empty()
  }
}

impl PackageIndex for JsonIndex {
  fn lookup_best(&self, name: &str, version: Option<&str>) -> Option<Package> {
    self
      .packages
      .iter()
      .filter(|p| p.name == name)
      .filter(|p| version.is_none_or(|v| v == p.version))
      .max_by(|a, b| version::compare(&a.version, &b.version))
      .cloned()
  }

  fn superseded_by(&self, package: &Package) -> Option<Package> {
    let replacement = package.superseded_by.as_deref()?;
    self.lookup_best(replacement, None)
  }
}
