use anyhow::Result;
use stratum_lib::ops;
use stratum_lib::profile::Profile;

use crate::output::{OutputFormat, print_info, print_json};

pub fn cmd_list(profile: &Profile, output: OutputFormat) -> Result<()> {
  let entries = ops::list_installed(profile)?;

  if output.is_json() {
    print_json(&entries)?;
  } else if entries.is_empty() {
    print_info("no packages installed");
  } else {
    for entry in &entries {
      println!("{}\t{}\t{}\t{}", entry.name, entry.version, entry.output, entry.item);
    }
  }

  Ok(())
}
