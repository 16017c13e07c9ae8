//! Profile operations: the lock-to-publish pipeline behind every
//! mutating command.
//!
//! One invocation acquires the profile lock, runs its administrative
//! actions (roll-back, switch, delete), folds the package actions into
//! a single manifest transaction, checks the result for collisions and
//! hands it to the builder. Read-only queries live here too and never
//! take the lock.

use std::collections::BTreeMap;
use std::path::PathBuf;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::builder::{BuildOutcome, BuilderError, PublishOptions, build_and_publish};
use crate::manifest::{Manifest, ManifestEntry, ManifestError, ManifestPattern, ManifestTransaction};
use crate::pattern::GenerationPattern;
use crate::profile::{Generation, GenerationError, GenerationStore, LockError, Profile, ProfileLock, SelectMode};
use crate::session::Session;

#[derive(Debug, Error)]
pub enum OpsError {
  #[error("package '{0}' not found in the index")]
  PackageNotFound(String),

  #[error("package '{spec}' is not installed in profile '{profile}'")]
  PackageNotInstalled { spec: String, profile: PathBuf },

  #[error("package '{0}' cannot be installed (no such output)")]
  NotInstallable(String),

  #[error("conflicting versions of '{name}' in the resulting profile: {versions:?}")]
  Collision { name: String, versions: Vec<String> },

  #[error(transparent)]
  Generation(#[from] GenerationError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Builder(#[from] BuilderError),
}

/// One requested change to a profile.
#[derive(Debug)]
pub enum Action {
  /// Install a `name[@version][:output]` spec.
  Install(String),
  /// Remove entries matching a `name[@version][:output]` spec.
  Remove(String),
  /// Upgrade entries whose name matches the regex; `None` upgrades
  /// everything.
  Upgrade(Option<Regex>),
  /// Exclude matching entries from this invocation's upgrades.
  DoNotUpgrade(Regex),
  /// Make the profile contain exactly the entries of this manifest
  /// file.
  FromManifestFile(PathBuf),
  RollBack,
  SwitchGeneration(u64),
  /// Delete the matching generations; `None` deletes everything but
  /// the current one.
  DeleteGenerations(Option<GenerationPattern>),
}

#[derive(Debug, Clone)]
pub struct Options {
  pub dry_run: bool,
  /// Tolerate several versions of the same package in one profile.
  pub allow_collisions: bool,
  pub bootstrap: bool,
  pub hooks: Vec<String>,
  pub locales: bool,
  /// Invocation description recorded in the lock metadata.
  pub command: String,
}

impl Default for Options {
  fn default() -> Self {
    Options {
      dry_run: false,
      allow_collisions: false,
      bootstrap: false,
      hooks: Vec::new(),
      locales: false,
      command: "stratum".to_string(),
    }
  }
}

#[derive(Debug, Default)]
pub struct ProcessOutcome {
  /// Number of the generation made current by a roll-back or switch;
  /// 0 is the empty baseline.
  pub switched_to: Option<u64>,
  /// Generations removed by a delete action.
  pub deleted: Vec<Generation>,
  /// Result of the transaction build, if one ran.
  pub build: Option<BuildOutcome>,
}

/// Run `actions` against `profile` under its lock.
///
/// Administrative actions run first, in the order given; package
/// actions are folded into one transaction and built as a single new
/// generation. A failure anywhere leaves the profile pointing at the
/// generation it pointed at before.
pub fn process(
  session: &Session,
  profile: &Profile,
  actions: &[Action],
  options: &Options,
) -> Result<ProcessOutcome, OpsError> {
  let store = GenerationStore::new(profile.clone());
  let _lock = ProfileLock::acquire(profile, &options.command)?;
  let mut outcome = ProcessOutcome::default();

  for action in actions {
    match action {
      Action::RollBack => outcome.switched_to = Some(store.roll_back()?.map_or(0, |g| g.number)),
      Action::SwitchGeneration(number) => {
        outcome.switched_to = Some(store.switch_to(*number)?.map_or(0, |g| g.number));
      }
      Action::DeleteGenerations(pattern) => {
        outcome.deleted.extend(delete_generations(session, &store, pattern.as_ref())?);
      }
      _ => {}
    }
  }

  let current = store.current_manifest()?;
  let (transaction, from_file) = assemble_transaction(session, profile, &current, actions)?;
  if transaction.is_empty() && !from_file {
    debug!("no package actions; skipping the build");
    return Ok(outcome);
  }

  let next = transaction.apply(&current);
  next.check()?;
  check_collisions(&next, options.allow_collisions)?;

  outcome.build = Some(build_and_publish(
    session,
    &store,
    &next,
    &PublishOptions {
      dry_run: options.dry_run,
      bootstrap: options.bootstrap,
      hooks: options.hooks.clone(),
      locales: options.locales,
    },
  )?);
  Ok(outcome)
}

fn delete_generations(
  session: &Session,
  store: &GenerationStore,
  pattern: Option<&GenerationPattern>,
) -> Result<Vec<Generation>, OpsError> {
  store.require_exists()?;
  let selected = match pattern {
    Some(pattern) => store.select(pattern, SelectMode::Deletion)?,
    None => {
      let current = store.current_number()?;
      store.list()?.iter().map(|g| g.number).filter(|n| *n != current).collect()
    }
  };
  let deleted = store.delete(&selected)?;
  for generation in &deleted {
    if let Err(e) = session.gc_roots.unregister(&generation.link) {
      warn!(link = %generation.link.display(), error = %e, "failed to drop gc root");
    }
  }
  Ok(deleted)
}

/// Fold the package actions into one transaction: manifest file first,
/// then removals, then upgrades, then installs.
fn assemble_transaction(
  session: &Session,
  profile: &Profile,
  current: &Manifest,
  actions: &[Action],
) -> Result<(ManifestTransaction, bool), OpsError> {
  let mut transaction = ManifestTransaction::default();
  let mut from_file = false;

  for action in actions {
    if let Action::FromManifestFile(path) = action {
      let wanted = Manifest::load(path)?;
      for entry in &current.entries {
        transaction.add_removal(entry.exact_pattern());
      }
      for entry in wanted.entries {
        transaction.add_install(entry);
      }
      from_file = true;
    }
  }

  for action in actions {
    if let Action::Remove(spec) = action {
      let pattern = ManifestPattern::parse(spec)?;
      if current.matching(&pattern).is_empty() {
        return Err(OpsError::PackageNotInstalled {
          spec: spec.clone(),
          profile: profile.path().to_path_buf(),
        });
      }
      transaction.add_removal(pattern);
    }
  }

  let upgrades: Vec<Option<&Regex>> = actions
    .iter()
    .filter_map(|a| match a {
      Action::Upgrade(selector) => Some(selector.as_ref()),
      _ => None,
    })
    .collect();
  let exclusions: Vec<&Regex> = actions
    .iter()
    .filter_map(|a| match a {
      Action::DoNotUpgrade(selector) => Some(selector),
      _ => None,
    })
    .collect();
  if !upgrades.is_empty() {
    for entry in &current.entries {
      let selected = upgrades.iter().any(|s| s.is_none_or(|r| r.is_match(&entry.name)));
      let excluded = exclusions.iter().any(|r| r.is_match(&entry.name));
      if selected && !excluded {
        let delta = crate::upgrade::resolve_upgrade(entry, session.index.as_ref(), &*session.transform, &transaction);
        transaction.merge(delta);
      }
    }
  }

  for action in actions {
    if let Action::Install(spec) = action {
      let pattern = ManifestPattern::parse(spec)?;
      let package = session
        .index
        .lookup_best(&pattern.name, pattern.version.as_deref())
        .ok_or_else(|| OpsError::PackageNotFound(spec.clone()))?;
      let package = (session.transform)(package);
      if !package.is_installable() {
        return Err(OpsError::NotInstallable(spec.clone()));
      }
      let output = match &pattern.output {
        Some(output) if !package.has_output(output) => return Err(OpsError::NotInstallable(spec.clone())),
        Some(output) => output.as_str(),
        None => package.default_output(),
      };
      transaction.add_install(package.entry_for(output));
    }
  }

  Ok((transaction, from_file))
}

fn check_collisions(manifest: &Manifest, allow: bool) -> Result<(), OpsError> {
  let mut by_name: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
  for entry in &manifest.entries {
    by_name.entry(&entry.name).or_default().push(&entry.version);
  }
  for (name, mut versions) in by_name {
    versions.sort_unstable();
    versions.dedup();
    if versions.len() > 1 {
      if allow {
        warn!(package = name, ?versions, "profile holds several versions");
      } else {
        return Err(OpsError::Collision {
          name: name.to_string(),
          versions: versions.into_iter().map(String::from).collect(),
        });
      }
    }
  }
  Ok(())
}

/// One generation as shown by the listing queries.
#[derive(Debug)]
pub struct GenerationInfo {
  pub generation: Generation,
  pub current: bool,
  pub entries: Vec<ManifestEntry>,
}

/// Generations of `profile`, optionally filtered by a pattern. Never
/// takes the lock.
pub fn list_generations(
  profile: &Profile,
  pattern: Option<&GenerationPattern>,
) -> Result<Vec<GenerationInfo>, OpsError> {
  let store = GenerationStore::new(profile.clone());
  store.require_exists()?;
  let current = store.current_number()?;

  let selected = match pattern {
    Some(pattern) => Some(store.select(pattern, SelectMode::Listing)?),
    None => None,
  };

  let mut infos = Vec::new();
  for generation in store.list()? {
    if selected.as_ref().is_some_and(|numbers| !numbers.contains(&generation.number)) {
      continue;
    }
    let entries = store.manifest_of(&generation)?.entries;
    infos.push(GenerationInfo {
      current: generation.number == current,
      generation,
      entries,
    });
  }
  Ok(infos)
}

/// Entries installed in the current generation of `profile`. Never
/// takes the lock.
pub fn list_installed(profile: &Profile) -> Result<Vec<ManifestEntry>, OpsError> {
  let store = GenerationStore::new(profile.clone());
  Ok(store.current_manifest()?.entries)
}
