use anyhow::{Context, Result};
use regex::Regex;
use stratum_lib::ops::{self, Action};
use stratum_lib::profile::Profile;
use stratum_lib::session::Session;

use super::{BuildFlags, report};

pub fn cmd_upgrade(
  session: &Session,
  profile: &Profile,
  patterns: &[String],
  do_not_upgrade: &[String],
  flags: &BuildFlags,
) -> Result<()> {
  let mut actions = Vec::new();
  if patterns.is_empty() {
    actions.push(Action::Upgrade(None));
  } else {
    for pattern in patterns {
      let regex = Regex::new(pattern).with_context(|| format!("invalid upgrade pattern '{pattern}'"))?;
      actions.push(Action::Upgrade(Some(regex)));
    }
  }
  for pattern in do_not_upgrade {
    let regex = Regex::new(pattern).with_context(|| format!("invalid exclusion pattern '{pattern}'"))?;
    actions.push(Action::DoNotUpgrade(regex));
  }

  let outcome = ops::process(session, profile, &actions, &flags.to_options())?;
  report(&outcome);
  Ok(())
}
