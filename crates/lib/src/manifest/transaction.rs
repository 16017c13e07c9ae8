//! Manifest transactions: composable diffs over a manifest.
//!
//! A transaction is pure data: entries to install plus removal
//! patterns. Applying it never mutates its input; the new manifest is
//! the only result. Removals run first; installed entries then replace
//! any surviving entry with the same `(name, output)` key, moving the
//! replaced entry to the most-recent position.

use super::types::{Manifest, ManifestEntry, ManifestPattern};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ManifestTransaction {
  pub install: Vec<ManifestEntry>,
  pub remove: Vec<ManifestPattern>,
}

impl ManifestTransaction {
  pub fn is_empty(&self) -> bool {
    self.install.is_empty() && self.remove.is_empty()
  }

  /// Queue `entry` for installation, replacing any queued entry with
  /// the same key.
  pub fn add_install(&mut self, entry: ManifestEntry) {
    self.install.retain(|e| !e.same_key(&entry));
    self.install.push(entry);
  }

  /// Queue a removal pattern.
  pub fn add_removal(&mut self, pattern: ManifestPattern) {
    if !self.remove.contains(&pattern) {
      self.remove.push(pattern);
    }
  }

  /// Union with another transaction; `other`'s installs win on key
  /// conflicts.
  pub fn merge(&mut self, other: ManifestTransaction) {
    for pattern in other.remove {
      self.add_removal(pattern);
    }
    for entry in other.install {
      self.add_install(entry);
    }
  }

  /// Whether `entry` is the target of a pending removal pattern.
  pub fn removes(&self, entry: &ManifestEntry) -> bool {
    self.remove.iter().any(|p| p.matches(entry))
  }

  /// Transaction that reinstalls `manifest` as-is.
  pub fn reinstall(manifest: &Manifest) -> Self {
    ManifestTransaction {
      install: manifest.entries.clone(),
      remove: Vec::new(),
    }
  }

  /// Fold the transaction onto `manifest`, producing a new manifest.
  ///
  /// Entries matching a removal pattern are dropped, unless an
  /// installed entry shares their key, in which case they are replaced.
  /// Installed entries are appended in install order.
  pub fn apply(&self, manifest: &Manifest) -> Manifest {
    let mut entries: Vec<ManifestEntry> = manifest
      .entries
      .iter()
      .filter(|e| !self.removes(e) && !self.install.iter().any(|i| i.same_key(e)))
      .cloned()
      .collect();
    entries.extend(self.install.iter().cloned());
    Manifest {
      entries,
      ..Manifest::default()
    }
  }
}
