use std::io::{self, IsTerminal, Write};

use anyhow::{Result, bail};

/// Ask for a yes/no confirmation on the terminal. `force` skips the
/// prompt; a non-interactive session without `force` is an error
/// rather than a silent yes.
pub fn confirm(message: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }
  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("refusing to prompt in a non-interactive session; pass --force to proceed");
  }

  write!(io::stderr(), "{message} [y/N] ")?;
  io::stderr().flush()?;

  let mut answer = String::new();
  io::stdin().read_line(&mut answer)?;
  Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
