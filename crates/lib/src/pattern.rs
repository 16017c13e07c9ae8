//! Generation selection patterns.
//!
//! A pattern selects generations by number, set, inclusive range,
//! relative offset from the current generation, or age:
//!
//! | form        | meaning                          |
//! |-------------|----------------------------------|
//! | `3`         | exactly generation 3             |
//! | `2,5,7`     | that set of generations          |
//! | `2..5`      | inclusive range                  |
//! | `-2`        | two generations before current   |
//! | `10d`, `2m` | by age (seconds, hours, days, weeks, months) |
//!
//! Malformed patterns are an error, never a silent fallback.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
  #[error("unsupported generation pattern syntax: '{0}'")]
  UnsupportedSyntax(String),

  #[error("invalid generation range '{0}': start exceeds end")]
  InvalidRange(String),

  #[error("unsupported duration unit in '{0}' (expected s, h, d, w or m)")]
  UnsupportedDurationUnit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationPattern {
  /// Exactly this generation number.
  Single(u64),
  /// A set of generation numbers.
  Set(Vec<u64>),
  /// Inclusive numeric range.
  Range(u64, u64),
  /// `current - offset`.
  Relative(u64),
  /// Generations selected by age relative to now.
  Age(Duration),
}

impl FromStr for GenerationPattern {
  type Err = PatternError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.is_empty() {
      return Err(PatternError::UnsupportedSyntax(s.to_string()));
    }
    if let Some((start, end)) = s.split_once("..") {
      let start = parse_number(start, s)?;
      let end = parse_number(end, s)?;
      if start > end {
        return Err(PatternError::InvalidRange(s.to_string()));
      }
      return Ok(GenerationPattern::Range(start, end));
    }
    if let Some(offset) = s.strip_prefix('-') {
      return Ok(GenerationPattern::Relative(parse_number(offset, s)?));
    }
    if s.contains(',') {
      let numbers = s
        .split(',')
        .map(|piece| parse_number(piece, s))
        .collect::<Result<Vec<u64>, PatternError>>()?;
      return Ok(GenerationPattern::Set(numbers));
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
      return Ok(GenerationPattern::Single(parse_number(s, s)?));
    }
    parse_duration(s).map(GenerationPattern::Age)
  }
}

fn parse_number(piece: &str, whole: &str) -> Result<u64, PatternError> {
  piece
    .trim()
    .parse::<u64>()
    .map_err(|_| PatternError::UnsupportedSyntax(whole.to_string()))
}

/// Parse a duration such as `30s`, `12h`, `10d`, `2w` or `2m` (months).
pub fn parse_duration(s: &str) -> Result<Duration, PatternError> {
  if s.is_empty() || !s.is_ascii() {
    return Err(PatternError::UnsupportedSyntax(s.to_string()));
  }
  let (amount, unit) = s.split_at(s.len() - 1);
  let amount: u64 = amount
    .parse()
    .map_err(|_| PatternError::UnsupportedSyntax(s.to_string()))?;
  let seconds = match unit {
    "s" => amount,
    "h" => amount * HOUR,
    "d" => amount * DAY,
    "w" => amount * WEEK,
    "m" => amount * MONTH,
    _ => return Err(PatternError::UnsupportedDurationUnit(s.to_string())),
  };
  Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(s: &str) -> Result<GenerationPattern, PatternError> {
    s.parse()
  }

  #[test]
  fn single_number() {
    assert_eq!(parse("3"), Ok(GenerationPattern::Single(3)));
    assert_eq!(parse("0"), Ok(GenerationPattern::Single(0)));
  }

  #[test]
  fn comma_separated_set() {
    assert_eq!(parse("1,4,6"), Ok(GenerationPattern::Set(vec![1, 4, 6])));
  }

  #[test]
  fn inclusive_range() {
    assert_eq!(parse("2..5"), Ok(GenerationPattern::Range(2, 5)));
    assert_eq!(parse("0..5"), Ok(GenerationPattern::Range(0, 5)));
  }

  #[test]
  fn range_start_must_not_exceed_end() {
    assert_eq!(parse("5..2"), Err(PatternError::InvalidRange("5..2".to_string())));
  }

  #[test]
  fn relative_offset() {
    assert_eq!(parse("-2"), Ok(GenerationPattern::Relative(2)));
  }

  #[test]
  fn durations() {
    assert_eq!(parse("30s"), Ok(GenerationPattern::Age(Duration::from_secs(30))));
    assert_eq!(parse("12h"), Ok(GenerationPattern::Age(Duration::from_secs(12 * HOUR))));
    assert_eq!(parse("10d"), Ok(GenerationPattern::Age(Duration::from_secs(10 * DAY))));
    assert_eq!(parse("2w"), Ok(GenerationPattern::Age(Duration::from_secs(2 * WEEK))));
    // 'm' means months here, not minutes
    assert_eq!(parse("2m"), Ok(GenerationPattern::Age(Duration::from_secs(2 * MONTH))));
  }

  #[test]
  fn malformed_patterns_are_errors() {
    assert!(matches!(parse(""), Err(PatternError::UnsupportedSyntax(_))));
    assert!(matches!(parse("abc"), Err(PatternError::UnsupportedSyntax(_))));
    assert!(matches!(parse("1.."), Err(PatternError::UnsupportedSyntax(_))));
    assert!(matches!(parse("..4"), Err(PatternError::UnsupportedSyntax(_))));
    assert!(matches!(parse("1,,2"), Err(PatternError::UnsupportedSyntax(_))));
    assert!(matches!(parse("2x"), Err(PatternError::UnsupportedDurationUnit(_))));
    assert!(matches!(parse("-"), Err(PatternError::UnsupportedSyntax(_))));
  }

  #[test]
  fn empty_duration_is_an_error() {
    assert!(matches!(parse_duration(""), Err(PatternError::UnsupportedSyntax(_))));
  }
}
