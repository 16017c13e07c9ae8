//! Search-path declarations and environment hints.
//!
//! Entries can declare search paths in their properties under the
//! `"search-paths"` key. After a new generation is published, the
//! hints tell the user which environment variables to set so the
//! profile's contents are found.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::manifest::{Manifest, ManifestEntry};

/// Property key holding an entry's search-path declarations.
pub const SEARCH_PATHS_PROPERTY: &str = "search-paths";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchPathKind {
  /// The declared files are directories added to the variable.
  #[default]
  Directory,
  /// The declared files are regular files named by the variable.
  File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPath {
  pub variable: String,
  /// Paths relative to the profile root.
  pub files: Vec<String>,
  #[serde(default = "default_separator")]
  pub separator: String,
  #[serde(default)]
  pub kind: SearchPathKind,
}

fn default_separator() -> String {
  ":".to_string()
}

#[derive(Debug, Error)]
pub enum SearchPathError {
  #[error("unsupported search path declaration in entry '{name}': {source}")]
  Malformed {
    name: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Search paths declared by one entry; empty when none are declared.
/// An unknown kind or a malformed declaration is an error, not a
/// silent fallback.
pub fn entry_search_paths(entry: &ManifestEntry) -> Result<Vec<SearchPath>, SearchPathError> {
  match entry.properties.get(SEARCH_PATHS_PROPERTY) {
    Some(value) => serde_json::from_value(value.clone()).map_err(|source| SearchPathError::Malformed {
      name: entry.name.clone(),
      source,
    }),
    None => Ok(Vec::new()),
  }
}

/// Environment-variable usage hints for a manifest, against the
/// profile at `profile_path`.
///
/// Only declarations whose files actually exist under the profile are
/// mentioned. Declarations for the same variable are merged. Hints are
/// advisory, so an entry with a malformed declaration is skipped with
/// a warning rather than failing the caller.
pub fn environment_hints(manifest: &Manifest, profile_path: &Path) -> Vec<String> {
  let mut merged: BTreeMap<String, (SearchPath, Vec<String>)> = BTreeMap::new();

  for entry in &manifest.entries {
    let declarations = match entry_search_paths(entry) {
      Ok(declarations) => declarations,
      Err(error) => {
        warn!(package = %entry.name, %error, "skipping malformed search path declaration");
        continue;
      }
    };
    for declaration in declarations {
      let (_, paths) = merged
        .entry(declaration.variable.clone())
        .or_insert_with(|| (declaration.clone(), Vec::new()));
      for file in &declaration.files {
        if !profile_path.join(file).exists() {
          continue;
        }
        let full = profile_path.join(file).display().to_string();
        if !paths.contains(&full) {
          paths.push(full);
        }
      }
    }
  }

  merged
    .into_values()
    .filter(|(_, paths)| !paths.is_empty())
    .map(|(declaration, paths)| {
      format!(
        "export {}=\"{}\"",
        declaration.variable,
        paths.join(&declaration.separator)
      )
    })
    .collect()
}
