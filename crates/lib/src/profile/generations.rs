//! The generation store: numbered, immutable snapshots behind one
//! mutable pointer.
//!
//! The pointer resolves to exactly one existing generation's target,
//! or is absent at the empty baseline (generation 0). Repointing is a
//! single `rename` of a fully constructed symlink, so readers observe
//! either the old or the new generation, never a half-written pointer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::manifest::{MANIFEST_FILENAME, Manifest, ManifestError};
use crate::pattern::GenerationPattern;

use super::Profile;

#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("profile '{0}' does not exist")]
  ProfileNotFound(PathBuf),

  #[error("generation {number} of profile '{profile}' does not exist")]
  GenerationNotFound { profile: PathBuf, number: u64 },

  #[error("profile '{0}' is already at the empty baseline; nothing to roll back to")]
  NothingBefore(PathBuf),

  #[error("no generation matches the requested pattern")]
  NoMatchingGeneration,

  #[error("failed to read profile pointer {path}: {source}")]
  ReadPointer {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read profile directory {path}: {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create generation link {path}: {source}")]
  CreateLink {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to repoint profile {path}: {source}")]
  SwitchPointer {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to delete generation link {path}: {source}")]
  Delete {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Manifest(#[from] ManifestError),
}

/// One immutable, numbered snapshot of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
  pub number: u64,
  /// The generation link on disk.
  pub link: PathBuf,
  /// Content-addressed target the link points at.
  pub target: PathBuf,
  /// Creation time (Unix seconds), as encoded in the link name.
  pub timestamp: u64,
}

/// How an age pattern selects generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
  /// Generations created within the duration (listing).
  Listing,
  /// Generations older than the duration (deletion).
  Deletion,
}

/// Filesystem-level view of one profile's generation sequence.
#[derive(Debug, Clone)]
pub struct GenerationStore {
  profile: Profile,
}

impl GenerationStore {
  pub fn new(profile: Profile) -> Self {
    GenerationStore { profile }
  }

  pub fn profile(&self) -> &Profile {
    &self.profile
  }

  /// Errors out unless the profile pointer exists.
  ///
  /// Existence is race-prone, so this is checked right before use and
  /// never cached.
  pub fn require_exists(&self) -> Result<(), GenerationError> {
    if self.profile.exists() {
      Ok(())
    } else {
      Err(GenerationError::ProfileNotFound(self.profile.path().to_path_buf()))
    }
  }

  /// Number of the current generation; 0 when the profile is absent or
  /// empty.
  pub fn current_number(&self) -> Result<u64, GenerationError> {
    match fs::read_link(self.profile.path()) {
      Ok(toward) => {
        let name = toward.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        match self.profile.parse_link_name(name) {
          Some((number, _)) => Ok(number),
          None => {
            warn!(pointer = name, "profile pointer does not name a generation link");
            Ok(0)
          }
        }
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
      Err(source) => Err(GenerationError::ReadPointer {
        path: self.profile.path().to_path_buf(),
        source,
      }),
    }
  }

  /// The number the next generation will get.
  ///
  /// Always `current + 1`, even when a higher-numbered link survived a
  /// previous roll-back; that stale future link is overwritten on
  /// publication (last writer wins).
  pub fn next_number(&self) -> Result<u64, GenerationError> {
    Ok(self.current_number()? + 1)
  }

  /// All existing generation links, sorted by number.
  pub fn list(&self) -> Result<Vec<Generation>, GenerationError> {
    let dir = self.profile.directory();
    let entries = match fs::read_dir(dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(source) => {
        return Err(GenerationError::ReadDir {
          path: dir.to_path_buf(),
          source,
        });
      }
    };

    let mut generations = Vec::new();
    for entry in entries.flatten() {
      let file_name = entry.file_name();
      let Some(name) = file_name.to_str() else { continue };
      let Some((number, timestamp)) = self.profile.parse_link_name(name) else {
        continue;
      };
      let link = dir.join(name);
      let Ok(target) = fs::read_link(&link) else { continue };
      generations.push(Generation {
        number,
        link,
        target,
        timestamp,
      });
    }
    generations.sort_by_key(|g| g.number);
    Ok(generations)
  }

  pub fn generation(&self, number: u64) -> Result<Option<Generation>, GenerationError> {
    Ok(self.list()?.into_iter().find(|g| g.number == number))
  }

  /// The current generation, or `None` at the empty baseline.
  pub fn current(&self) -> Result<Option<Generation>, GenerationError> {
    match self.current_number()? {
      0 => Ok(None),
      number => self.generation(number),
    }
  }

  /// Store target of the current generation.
  pub fn current_target(&self) -> Result<Option<PathBuf>, GenerationError> {
    Ok(self.current()?.map(|g| g.target))
  }

  /// Manifest of the current generation; empty at the baseline.
  pub fn current_manifest(&self) -> Result<Manifest, GenerationError> {
    match self.current_target()? {
      Some(target) => Ok(Manifest::load(&target.join(MANIFEST_FILENAME))?),
      None => Ok(Manifest::new()),
    }
  }

  /// Manifest recorded in an arbitrary generation.
  pub fn manifest_of(&self, generation: &Generation) -> Result<Manifest, GenerationError> {
    Ok(Manifest::load(&generation.target.join(MANIFEST_FILENAME))?)
  }

  /// Create the link for generation `number` pointing at `target`,
  /// then atomically repoint the profile.
  pub fn publish(&self, number: u64, target: &Path) -> Result<Generation, GenerationError> {
    let dir = self.profile.directory();
    fs::create_dir_all(dir).map_err(|source| GenerationError::CreateLink {
      path: dir.to_path_buf(),
      source,
    })?;

    // A stale link with this number can survive a roll-back; it loses
    // to the new allocation.
    for stale in self.list()?.into_iter().filter(|g| g.number == number) {
      debug!(number, link = %stale.link.display(), "overwriting stale generation link");
      fs::remove_file(&stale.link).map_err(|source| GenerationError::Delete {
        path: stale.link.clone(),
        source,
      })?;
    }

    let timestamp = now_unix();
    let link_name = self.profile.generation_link_name(number, timestamp);
    let link = dir.join(&link_name);
    symlink(target, &link).map_err(|source| GenerationError::CreateLink {
      path: link.clone(),
      source,
    })?;

    self.switch_pointer(&link_name)?;
    info!(profile = %self.profile.path().display(), number, "published generation");

    Ok(Generation {
      number,
      link,
      target: target.to_path_buf(),
      timestamp,
    })
  }

  /// Repoint the profile to an existing generation. Generation 0 is
  /// the empty baseline, which always exists; switching to it removes
  /// the pointer and yields `None`.
  pub fn switch_to(&self, number: u64) -> Result<Option<Generation>, GenerationError> {
    if number == 0 {
      self.clear_pointer()?;
      info!(profile = %self.profile.path().display(), "switched to the empty baseline");
      return Ok(None);
    }
    let Some(generation) = self.generation(number)? else {
      return Err(GenerationError::GenerationNotFound {
        profile: self.profile.path().to_path_buf(),
        number,
      });
    };
    let link_name = self.profile.generation_link_name(number, generation.timestamp);
    self.switch_pointer(&link_name)?;
    info!(profile = %self.profile.path().display(), number, "switched generation");
    Ok(Some(generation))
  }

  /// Switch to `current - 1`; fails only at the baseline, which has
  /// nothing before it.
  pub fn roll_back(&self) -> Result<Option<Generation>, GenerationError> {
    let current = self.current_number()?;
    let Some(previous) = current.checked_sub(1) else {
      return Err(GenerationError::NothingBefore(self.profile.path().to_path_buf()));
    };
    self.switch_to(previous)
  }

  /// Resolve `pattern` against the existing generation numbers, oldest
  /// first. Generation 0 (the baseline) always exists.
  pub fn select(&self, pattern: &GenerationPattern, mode: SelectMode) -> Result<Vec<u64>, GenerationError> {
    let generations = self.list()?;
    let mut existing: Vec<u64> = std::iter::once(0).chain(generations.iter().map(|g| g.number)).collect();
    existing.sort_unstable();
    existing.dedup();

    let matched: Vec<u64> = match pattern {
      GenerationPattern::Single(n) => existing.iter().copied().filter(|x| x == n).collect(),
      GenerationPattern::Set(set) => existing.iter().copied().filter(|x| set.contains(x)).collect(),
      GenerationPattern::Range(start, end) => existing
        .iter()
        .copied()
        .filter(|x| (*start..=*end).contains(x))
        .collect(),
      GenerationPattern::Relative(offset) => {
        // Clamped to the nearest existing generation at or below the
        // requested point.
        let wanted = self.current_number()?.saturating_sub(*offset);
        existing.iter().copied().filter(|x| *x <= wanted).max().into_iter().collect()
      }
      GenerationPattern::Age(duration) => {
        let cutoff = now_unix().saturating_sub(duration.as_secs());
        generations
          .iter()
          .filter(|g| match mode {
            SelectMode::Deletion => g.timestamp < cutoff,
            SelectMode::Listing => g.timestamp >= cutoff,
          })
          .map(|g| g.number)
          .collect()
      }
    };

    if matched.is_empty() {
      Err(GenerationError::NoMatchingGeneration)
    } else {
      Ok(matched)
    }
  }

  /// Delete the listed generations' links.
  ///
  /// The current generation is skipped with a warning; generation 0 is
  /// skipped unconditionally. Returns the deleted generations.
  pub fn delete(&self, numbers: &[u64]) -> Result<Vec<Generation>, GenerationError> {
    let current = self.current_number()?;
    let mut deleted = Vec::new();
    for &number in numbers {
      if number == 0 {
        continue;
      }
      if number == current {
        warn!(number, "not deleting the current generation");
        continue;
      }
      if let Some(generation) = self.generation(number)? {
        fs::remove_file(&generation.link).map_err(|source| GenerationError::Delete {
          path: generation.link.clone(),
          source,
        })?;
        debug!(number, "deleted generation");
        deleted.push(generation);
      }
    }
    Ok(deleted)
  }

  /// Build the new pointer fully, then switch in a single rename.
  fn switch_pointer(&self, link_name: &str) -> Result<(), GenerationError> {
    let dir = self.profile.directory();
    let staged = dir.join(format!(".{}.switch", self.profile.base_name()));
    let err = |source: io::Error| GenerationError::SwitchPointer {
      path: self.profile.path().to_path_buf(),
      source,
    };

    match fs::remove_file(&staged) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(source) => return Err(err(source)),
    }
    symlink(Path::new(link_name), &staged).map_err(err)?;
    fs::rename(&staged, self.profile.path()).map_err(err)
  }

  /// Remove the pointer; an absent pointer reads as generation 0.
  fn clear_pointer(&self) -> Result<(), GenerationError> {
    match fs::remove_file(self.profile.path()) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(source) => Err(GenerationError::SwitchPointer {
        path: self.profile.path().to_path_buf(),
        source,
      }),
    }
  }
}

fn now_unix() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or(Duration::ZERO)
    .as_secs()
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::manifest;
  use tempfile::TempDir;

  fn temp_store() -> (TempDir, GenerationStore) {
    let temp = TempDir::new().unwrap();
    let profile = Profile::new(temp.path().join("profiles").join("default"));
    (temp, GenerationStore::new(profile))
  }

  /// Create a fake store target holding `manifest.json`.
  fn make_target(temp: &TempDir, name: &str) -> PathBuf {
    let target = temp.path().join("store").join(name);
    fs::create_dir_all(&target).unwrap();
    manifest(&[(name, "1.0", "out")]).save(&target.join(MANIFEST_FILENAME)).unwrap();
    target
  }

  #[test]
  fn absent_profile_is_generation_zero() {
    let (_temp, store) = temp_store();
    assert_eq!(store.current_number().unwrap(), 0);
    assert_eq!(store.next_number().unwrap(), 1);
    assert!(store.current().unwrap().is_none());
    assert!(store.current_manifest().unwrap().is_empty());
  }

  #[test]
  fn publish_creates_link_and_repoints() {
    let (temp, store) = temp_store();
    let target = make_target(&temp, "one");

    let generation = store.publish(1, &target).unwrap();
    assert_eq!(generation.number, 1);
    assert_eq!(store.current_number().unwrap(), 1);
    assert_eq!(store.current_target().unwrap(), Some(target));
    assert!(store.profile().exists());
  }

  #[test]
  fn pointer_resolves_through_link_to_manifest() {
    let (temp, store) = temp_store();
    let target = make_target(&temp, "one");
    store.publish(1, &target).unwrap();

    let manifest = store.current_manifest().unwrap();
    assert_eq!(manifest.entries[0].name, "one");
  }

  #[test]
  fn next_number_ignores_stale_future_links() {
    let (temp, store) = temp_store();
    store.publish(1, &make_target(&temp, "one")).unwrap();
    store.publish(2, &make_target(&temp, "two")).unwrap();
    store.switch_to(1).unwrap();

    // Generation 2's link still exists, but allocation follows the
    // current pointer.
    assert_eq!(store.current_number().unwrap(), 1);
    assert_eq!(store.next_number().unwrap(), 2);
  }

  #[test]
  fn publish_overwrites_stale_future_link() {
    let (temp, store) = temp_store();
    store.publish(1, &make_target(&temp, "one")).unwrap();
    let stale = store.publish(2, &make_target(&temp, "two")).unwrap();
    store.switch_to(1).unwrap();

    let fresh_target = make_target(&temp, "three");
    let generation = store.publish(2, &fresh_target).unwrap();

    assert_eq!(generation.number, 2);
    assert_eq!(store.current_target().unwrap(), Some(fresh_target));
    assert!(!stale.link.exists() || fs::read_link(&stale.link).unwrap() != stale.target);
    // Exactly one generation 2 link remains.
    assert_eq!(store.list().unwrap().iter().filter(|g| g.number == 2).count(), 1);
  }

  #[test]
  fn switch_to_missing_generation_fails() {
    let (temp, store) = temp_store();
    store.publish(1, &make_target(&temp, "one")).unwrap();
    assert!(matches!(
      store.switch_to(9),
      Err(GenerationError::GenerationNotFound { number: 9, .. })
    ));
    assert_eq!(store.current_number().unwrap(), 1);
  }

  #[test]
  fn roll_back_moves_to_previous() {
    let (temp, store) = temp_store();
    store.publish(1, &make_target(&temp, "one")).unwrap();
    store.publish(2, &make_target(&temp, "two")).unwrap();

    let generation = store.roll_back().unwrap().expect("generation 1 still exists");
    assert_eq!(generation.number, 1);
    assert_eq!(store.current_number().unwrap(), 1);
  }

  #[test]
  fn roll_back_from_first_generation_reaches_baseline() {
    let (temp, store) = temp_store();
    store.publish(1, &make_target(&temp, "one")).unwrap();

    assert!(store.roll_back().unwrap().is_none());
    assert_eq!(store.current_number().unwrap(), 0);
    assert!(!store.profile().exists());
    assert!(store.current_manifest().unwrap().is_empty());
    // Generation 1's link survives and can be switched back to.
    assert_eq!(store.switch_to(1).unwrap().unwrap().number, 1);
  }

  #[test]
  fn switch_to_baseline_removes_the_pointer() {
    let (temp, store) = temp_store();
    store.publish(1, &make_target(&temp, "one")).unwrap();
    store.publish(2, &make_target(&temp, "two")).unwrap();

    assert!(store.switch_to(0).unwrap().is_none());
    assert_eq!(store.current_number().unwrap(), 0);
    assert!(store.current().unwrap().is_none());
  }

  #[test]
  fn roll_back_at_baseline_fails_and_leaves_pointer() {
    let (_temp, store) = temp_store();
    assert!(matches!(store.roll_back(), Err(GenerationError::NothingBefore(_))));
    assert_eq!(store.current_number().unwrap(), 0);
  }

  #[test]
  fn delete_protects_current_and_baseline() {
    let (temp, store) = temp_store();
    for n in 1..=6 {
      store.publish(n, &make_target(&temp, &format!("g{n}"))).unwrap();
    }
    store.switch_to(3).unwrap();

    let selected = store
      .select(&GenerationPattern::Range(0, 5), SelectMode::Deletion)
      .unwrap();
    assert_eq!(selected, vec![0, 1, 2, 3, 4, 5]);

    let deleted: Vec<u64> = store.delete(&selected).unwrap().iter().map(|g| g.number).collect();
    assert_eq!(deleted, vec![1, 2, 4, 5]);

    let remaining: Vec<u64> = store.list().unwrap().iter().map(|g| g.number).collect();
    assert_eq!(remaining, vec![3, 6]);
    assert_eq!(store.current_number().unwrap(), 3);
  }

  #[test]
  fn delete_explicit_zero_is_a_no_op() {
    let (temp, store) = temp_store();
    store.publish(1, &make_target(&temp, "one")).unwrap();
    let deleted = store.delete(&[0]).unwrap();
    assert!(deleted.is_empty());
  }

  #[test]
  fn select_single_and_set() {
    let (temp, store) = temp_store();
    for n in 1..=3 {
      store.publish(n, &make_target(&temp, &format!("g{n}"))).unwrap();
    }

    assert_eq!(
      store.select(&GenerationPattern::Single(2), SelectMode::Listing).unwrap(),
      vec![2]
    );
    assert_eq!(
      store
        .select(&GenerationPattern::Set(vec![1, 3, 9]), SelectMode::Listing)
        .unwrap(),
      vec![1, 3]
    );
  }

  #[test]
  fn select_no_match_is_an_error() {
    let (temp, store) = temp_store();
    store.publish(1, &make_target(&temp, "one")).unwrap();
    assert!(matches!(
      store.select(&GenerationPattern::Single(7), SelectMode::Listing),
      Err(GenerationError::NoMatchingGeneration)
    ));
  }

  #[test]
  fn select_relative_clamps_to_existing() {
    let (temp, store) = temp_store();
    for n in 1..=4 {
      store.publish(n, &make_target(&temp, &format!("g{n}"))).unwrap();
    }
    store.delete(&[2]).unwrap();

    assert_eq!(
      store.select(&GenerationPattern::Relative(2), SelectMode::Listing).unwrap(),
      vec![1]
    );
    // Offsets past the oldest generation clamp to the baseline.
    assert_eq!(
      store.select(&GenerationPattern::Relative(10), SelectMode::Listing).unwrap(),
      vec![0]
    );
  }

  #[test]
  fn select_by_age() {
    let (temp, store) = temp_store();
    store.publish(1, &make_target(&temp, "one")).unwrap();

    // Fresh generations are within any duration, so deletion selects
    // nothing and listing selects them.
    assert!(matches!(
      store.select(&GenerationPattern::Age(Duration::from_secs(3600)), SelectMode::Deletion),
      Err(GenerationError::NoMatchingGeneration)
    ));
    assert_eq!(
      store
        .select(&GenerationPattern::Age(Duration::from_secs(3600)), SelectMode::Listing)
        .unwrap(),
      vec![1]
    );
  }

  #[test]
  fn require_exists_reports_missing_profile() {
    let (_temp, store) = temp_store();
    assert!(matches!(
      store.require_exists(),
      Err(GenerationError::ProfileNotFound(_))
    ));
  }
}
