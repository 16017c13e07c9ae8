use anyhow::Result;
use stratum_lib::ops::{self, Action};
use stratum_lib::profile::Profile;
use stratum_lib::session::Session;

use super::{BuildFlags, report};

pub fn cmd_remove(session: &Session, profile: &Profile, specs: &[String], flags: &BuildFlags) -> Result<()> {
  let actions: Vec<Action> = specs.iter().map(|spec| Action::Remove(spec.clone())).collect();
  let outcome = ops::process(session, profile, &actions, &flags.to_options())?;
  report(&outcome);
  Ok(())
}
