//! Upgrade resolution for installed manifest entries.
//!
//! For each entry selected for upgrade, the resolver looks up the best
//! available package, follows supersession redirects, and compares
//! versions to decide whether to emit a transaction delta. Lookup
//! failures are recovered locally as warnings; the transaction proceeds
//! without that entry.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::{info, warn};

use crate::index::{Package, PackageIndex};
use crate::manifest::{ManifestEntry, ManifestTransaction};
use crate::version;

/// Source-level transformation applied to every resolved candidate.
pub type Transform<'a> = &'a dyn Fn(Package) -> Package;

/// Decide how to upgrade `entry`, returning a transaction delta.
///
/// An empty delta means "leave the entry as is". An entry already
/// targeted by a removal pattern in `pending` is skipped entirely:
/// explicit removal wins over upgrade.
pub fn resolve_upgrade(
  entry: &ManifestEntry,
  index: &dyn PackageIndex,
  transform: Transform<'_>,
  pending: &ManifestTransaction,
) -> ManifestTransaction {
  let mut delta = ManifestTransaction::default();

  if pending.removes(entry) {
    return delta;
  }

  let Some(candidate) = index.lookup_best(&entry.name, None) else {
    warn!(package = %entry.name, "package no longer exists; keeping the installed entry");
    return delta;
  };
  let candidate = transform(candidate);

  // Supersession takes priority over version comparison.
  if let Some(replacement) = follow_supersessions(&candidate, index) {
    info!(
      package = %entry.name,
      replacement = %replacement.name,
      "package is superseded; redirecting"
    );
    delta.add_removal(entry.exact_pattern());
    delta.add_install(replacement.entry_for(&entry.output));
    return delta;
  }

  match version::compare(&candidate.version, &entry.version) {
    Ordering::Greater => delta.add_install(candidate.entry_for(&entry.output)),
    Ordering::Less => {}
    Ordering::Equal => {
      // Equal versions can still differ once lowered (transformations,
      // grafts). Lowering that would itself trigger a build counts as
      // a difference.
      match candidate.lower(&entry.output) {
        Some(lowered) if lowered.item == entry.item => {}
        _ => delta.add_install(candidate.entry_for(&entry.output)),
      }
    }
  }

  delta
}

/// Follow supersession redirects to a fixed point, guarding against
/// cycles in the index.
fn follow_supersessions(package: &Package, index: &dyn PackageIndex) -> Option<Package> {
  let mut seen: HashSet<String> = HashSet::from([package.name.clone()]);
  let mut current = index.superseded_by(package)?;
  while seen.insert(current.name.clone()) {
    match index.superseded_by(&current) {
      Some(next) => current = next,
      None => return Some(current),
    }
  }
  warn!(package = %package.name, "supersession cycle detected; stopping at {}", current.name);
  Some(current)
}
