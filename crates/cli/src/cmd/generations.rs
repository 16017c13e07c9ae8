use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;
use stratum_lib::ops::{self, Action, Options};
use stratum_lib::pattern::GenerationPattern;
use stratum_lib::profile::Profile;
use stratum_lib::session::Session;

use crate::output::{OutputFormat, format_timestamp, print_info, print_json, print_warning};
use crate::prompts::confirm;

use super::{command_line, report};

#[derive(Subcommand, Debug)]
pub enum GenerationsCommand {
  /// List generations, optionally matching a pattern
  List {
    /// Generation pattern (N, N,M, A..B, -k, or an age such as 10d)
    pattern: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Make an existing generation current
  Switch {
    /// Generation number to switch to
    number: u64,
  },

  /// Switch back to the previous generation
  Rollback,

  /// Delete generations matching a pattern (all but the current one
  /// when omitted)
  Delete {
    /// Generation pattern (N, N,M, A..B, -k, or an age such as 2m)
    pattern: Option<String>,

    /// Skip the confirmation prompt
    #[arg(long)]
    force: bool,
  },
}

pub fn cmd_generations(session: &Session, profile: &Profile, command: GenerationsCommand) -> Result<()> {
  match command {
    GenerationsCommand::List { pattern, output } => cmd_list(profile, pattern.as_deref(), output),
    GenerationsCommand::Switch { number } => run(session, profile, vec![Action::SwitchGeneration(number)]),
    GenerationsCommand::Rollback => run(session, profile, vec![Action::RollBack]),
    GenerationsCommand::Delete { pattern, force } => cmd_delete(session, profile, pattern.as_deref(), force),
  }
}

fn run(session: &Session, profile: &Profile, actions: Vec<Action>) -> Result<()> {
  let options = Options {
    command: command_line(),
    ..Options::default()
  };
  let outcome = ops::process(session, profile, &actions, &options)?;
  report(&outcome);
  Ok(())
}

fn parse_pattern(pattern: &str) -> Result<GenerationPattern> {
  pattern
    .parse()
    .with_context(|| format!("invalid generation pattern '{pattern}'"))
}

fn cmd_list(profile: &Profile, pattern: Option<&str>, output: OutputFormat) -> Result<()> {
  let pattern = pattern.map(parse_pattern).transpose()?;
  let infos = ops::list_generations(profile, pattern.as_ref())?;

  if output.is_json() {
    #[derive(Serialize)]
    struct Item<'a> {
      number: u64,
      timestamp: u64,
      current: bool,
      target: String,
      entries: &'a [stratum_lib::manifest::ManifestEntry],
    }

    let items: Vec<Item> = infos
      .iter()
      .map(|info| Item {
        number: info.generation.number,
        timestamp: info.generation.timestamp,
        current: info.current,
        target: info.generation.target.display().to_string(),
        entries: &info.entries,
      })
      .collect();
    print_json(&items)?;
  } else if infos.is_empty() {
    print_info("no generations");
  } else {
    for info in &infos {
      let marker = if info.current { " (current)" } else { "" };
      println!(
        "Generation {}{}\t{}",
        info.generation.number,
        marker,
        format_timestamp(info.generation.timestamp)
      );
      for entry in &info.entries {
        println!("  {}\t{}\t{}", entry.name, entry.version, entry.output);
      }
    }
  }

  Ok(())
}

fn cmd_delete(session: &Session, profile: &Profile, pattern: Option<&str>, force: bool) -> Result<()> {
  let pattern = pattern.map(parse_pattern).transpose()?;

  let what = match &pattern {
    Some(_) => "matching generations".to_string(),
    None => "all generations but the current one".to_string(),
  };
  if !confirm(&format!("Delete {what}?"), force)? {
    print_warning("cancelled; nothing deleted");
    return Ok(());
  }

  run(session, profile, vec![Action::DeleteGenerations(pattern)])
}
