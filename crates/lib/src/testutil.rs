//! Shared helpers for unit tests.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::index::Package;
use crate::manifest::{Manifest, ManifestEntry, StorePath};

/// Entry with a deterministic fake store item.
pub fn entry(name: &str, version: &str, output: &str) -> ManifestEntry {
  ManifestEntry {
    name: name.to_string(),
    version: version.to_string(),
    output: output.to_string(),
    item: StorePath(PathBuf::from(format!("/stratum/store/{name}-{version}-{output}"))),
    properties: BTreeMap::new(),
  }
}

/// Manifest from a list of `(name, version, output)` triples.
pub fn manifest(entries: &[(&str, &str, &str)]) -> Manifest {
  Manifest {
    entries: entries.iter().map(|(n, v, o)| entry(n, v, o)).collect(),
    ..Manifest::default()
  }
}

/// Package whose lowered item matches what [`entry`] produces.
pub fn package(name: &str, version: &str) -> Package {
  let mut items = BTreeMap::new();
  items.insert(
    "out".to_string(),
    PathBuf::from(format!("/stratum/store/{name}-{version}-out")),
  );
  Package {
    name: name.to_string(),
    version: version.to_string(),
    outputs: vec!["out".to_string()],
    items,
    superseded_by: None,
    properties: BTreeMap::new(),
  }
}
