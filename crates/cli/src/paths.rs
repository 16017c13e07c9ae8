//! State directory resolution.
//!
//! Precedence: the `--home` flag, then `$STRATUM_HOME`, then
//! `$XDG_STATE_HOME/stratum`, then `~/.local/state/stratum`.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn state_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
  if let Some(dir) = flag {
    return Ok(dir);
  }
  if let Some(dir) = env_dir("STRATUM_HOME") {
    return Ok(dir);
  }
  if let Some(dir) = env_dir("XDG_STATE_HOME") {
    return Ok(dir.join("stratum"));
  }
  let home = env_dir("HOME").context("cannot determine the home directory; set STRATUM_HOME")?;
  Ok(home.join(".local").join("state").join("stratum"))
}

fn env_dir(name: &str) -> Option<PathBuf> {
  match env::var(name) {
    Ok(value) if !value.is_empty() => Some(PathBuf::from(value)),
    _ => None,
  }
}
