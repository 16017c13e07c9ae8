use std::path::Path;

use anyhow::{Result, bail};
use stratum_lib::ops::{self, Action};
use stratum_lib::profile::Profile;
use stratum_lib::session::Session;
use tracing::debug;

use super::{BuildFlags, report};

pub fn cmd_install(
  session: &Session,
  profile: &Profile,
  specs: &[String],
  manifest: Option<&Path>,
  flags: &BuildFlags,
) -> Result<()> {
  if specs.is_empty() && manifest.is_none() {
    bail!("nothing to install; give package specs or --manifest");
  }

  let mut actions = Vec::new();
  if let Some(path) = manifest {
    debug!(manifest = %path.display(), "installing from manifest file");
    actions.push(Action::FromManifestFile(path.to_path_buf()));
  }
  actions.extend(specs.iter().map(|spec| Action::Install(spec.clone())));

  let outcome = ops::process(session, profile, &actions, &flags.to_options())?;
  report(&outcome);
  Ok(())
}
