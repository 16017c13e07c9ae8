mod generations;
mod install;
mod list;
mod remove;
mod upgrade;

pub use generations::{GenerationsCommand, cmd_generations};
pub use install::cmd_install;
pub use list::cmd_list;
pub use remove::cmd_remove;
pub use upgrade::cmd_upgrade;

use clap::Args;
use stratum_lib::builder::BuildOutcome;
use stratum_lib::ops::{Options, ProcessOutcome};

use crate::output::{print_info, print_success};

/// Flags shared by every command that can publish a generation.
#[derive(Args, Debug, Clone)]
pub struct BuildFlags {
  /// Report what would be done without changing anything
  #[arg(short = 'n', long)]
  pub dry_run: bool,

  /// Tolerate several versions of the same package in one profile
  #[arg(long)]
  pub allow_collisions: bool,

  /// Build with an empty hook set
  #[arg(long)]
  pub bootstrap: bool,

  /// Post-build hook to run (repeatable)
  #[arg(long = "hook", value_name = "NAME")]
  pub hooks: Vec<String>,

  /// Generate locale data for the profile
  #[arg(long)]
  pub locales: bool,
}

impl BuildFlags {
  pub fn to_options(&self) -> Options {
    Options {
      dry_run: self.dry_run,
      allow_collisions: self.allow_collisions,
      bootstrap: self.bootstrap,
      hooks: self.hooks.clone(),
      locales: self.locales,
      command: command_line(),
    }
  }
}

/// The invocation as recorded in the profile lock metadata.
pub fn command_line() -> String {
  std::env::args().collect::<Vec<_>>().join(" ")
}

/// Print the outcome of a mutating invocation.
pub fn report(outcome: &ProcessOutcome) {
  if let Some(number) = outcome.switched_to {
    if number == 0 {
      print_success("switched to generation 0 (the empty baseline)");
    } else {
      print_success(&format!("switched to generation {number}"));
    }
  }
  if !outcome.deleted.is_empty() {
    let numbers: Vec<String> = outcome.deleted.iter().map(|g| g.number.to_string()).collect();
    print_success(&format!("deleted generation(s) {}", numbers.join(", ")));
  }
  match &outcome.build {
    Some(BuildOutcome::NothingToDo) => print_info("nothing to be done"),
    Some(BuildOutcome::DryRun { target }) => print_info(&format!("would build {}", target.display())),
    Some(BuildOutcome::Published { generation, hints }) => {
      print_success(&format!("generation {} is now current", generation.number));
      if !hints.is_empty() {
        print_info("consider setting these environment variables:");
        for hint in hints {
          println!("  {hint}");
        }
      }
    }
    None => {}
  }
}
