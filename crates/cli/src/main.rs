use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stratum_lib::index::JsonIndex;
use stratum_lib::profile::Profile;
use stratum_lib::session::Session;
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;
mod paths;
mod prompts;

use cmd::BuildFlags;
use output::{OutputFormat, print_error, print_warning};

/// stratum - transactional package profiles
#[derive(Parser)]
#[command(name = "stratum")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Profile to operate on (defaults to the default profile)
  #[arg(short, long, global = true)]
  profile: Option<PathBuf>,

  /// State directory (defaults to $STRATUM_HOME)
  #[arg(long, global = true)]
  home: Option<PathBuf>,

  /// Package index file (defaults to index.json in the state directory)
  #[arg(long, global = true)]
  index: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Install packages into the profile
  Install {
    /// Package specs (name[@version][:output])
    specs: Vec<String>,

    /// Make the profile contain exactly the entries of this manifest file
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    #[command(flatten)]
    build: BuildFlags,
  },

  /// Remove packages from the profile
  Remove {
    /// Package specs (name[@version][:output])
    #[arg(required = true)]
    specs: Vec<String>,

    #[command(flatten)]
    build: BuildFlags,
  },

  /// Upgrade installed packages
  Upgrade {
    /// Regexes selecting packages to upgrade (all when omitted)
    patterns: Vec<String>,

    /// Regexes excluding packages from the upgrade
    #[arg(long, value_name = "REGEX")]
    do_not_upgrade: Vec<String>,

    #[command(flatten)]
    build: BuildFlags,
  },

  /// List the packages installed in the profile
  List {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Inspect and manage profile generations
  Generations {
    #[command(subcommand)]
    command: cmd::GenerationsCommand,
  },
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  if let Err(e) = run(cli) {
    print_error(&format!("{e:#}"));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  let home = paths::state_dir(cli.home)?;
  let index_path = cli.index.unwrap_or_else(|| home.join("index.json"));
  if !index_path.exists() {
    print_warning(&format!(
      "package index {} does not exist; using an empty index",
      index_path.display()
    ));
  }
  let index = JsonIndex::load(&index_path).with_context(|| format!("loading index {}", index_path.display()))?;

  let session = Session::local(&home, index);
  let profile = match cli.profile {
    Some(path) => Profile::new(path),
    None => Profile::new(session.default_profile.clone()),
  };

  match cli.command {
    Commands::Install { specs, manifest, build } => {
      cmd::cmd_install(&session, &profile, &specs, manifest.as_deref(), &build)
    }
    Commands::Remove { specs, build } => cmd::cmd_remove(&session, &profile, &specs, &build),
    Commands::Upgrade {
      patterns,
      do_not_upgrade,
      build,
    } => cmd::cmd_upgrade(&session, &profile, &patterns, &do_not_upgrade, &build),
    Commands::List { output } => cmd::cmd_list(&profile, output),
    Commands::Generations { command } => cmd::cmd_generations(&session, &profile, command),
  }
}
