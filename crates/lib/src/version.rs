//! Multi-component version ordering.
//!
//! Versions are free-form strings; comparison is numeric-aware rather
//! than lexicographic: `"1.10"` sorts after `"1.9"`. Alphabetic chunks
//! sort before numeric ones, so `"1.0rc1"` sorts before `"1.0.1"`, and
//! a trailing alphabetic chunk marks a pre-release (`"1.0rc1" < "1.0"`).

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
  Num(&'a str),
  Alpha(&'a str),
}

fn chunks(version: &str) -> Vec<Chunk<'_>> {
  let mut out = Vec::new();
  let bytes = version.as_bytes();
  let mut i = 0;
  while i < bytes.len() {
    let start = i;
    if bytes[i].is_ascii_digit() {
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      out.push(Chunk::Num(&version[start..i]));
    } else if bytes[i].is_ascii_alphabetic() {
      while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
      }
      out.push(Chunk::Alpha(&version[start..i]));
    } else {
      // separator ('.', '-', '_', '+', ...)
      i += 1;
    }
  }
  out
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
  let a = a.trim_start_matches('0');
  let b = b.trim_start_matches('0');
  a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_chunks(a: &Chunk<'_>, b: &Chunk<'_>) -> Ordering {
  match (a, b) {
    (Chunk::Num(a), Chunk::Num(b)) => compare_numeric(a, b),
    (Chunk::Alpha(a), Chunk::Alpha(b)) => a.cmp(b),
    (Chunk::Num(_), Chunk::Alpha(_)) => Ordering::Greater,
    (Chunk::Alpha(_), Chunk::Num(_)) => Ordering::Less,
  }
}

/// Compare two version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
  let av = chunks(a);
  let bv = chunks(b);
  let mut i = 0;
  loop {
    match (av.get(i), bv.get(i)) {
      (None, None) => return Ordering::Equal,
      // "1.0" vs "1.0rc1": the pre-release suffix is older
      (None, Some(Chunk::Alpha(_))) => return Ordering::Greater,
      (Some(Chunk::Alpha(_)), None) => return Ordering::Less,
      // "1.0" vs "1.0.1": the extra numeric component is newer
      (None, Some(Chunk::Num(_))) => return Ordering::Less,
      (Some(Chunk::Num(_)), None) => return Ordering::Greater,
      (Some(x), Some(y)) => match compare_chunks(x, y) {
        Ordering::Equal => {}
        ord => return ord,
      },
    }
    i += 1;
  }
}

/// `true` when `candidate` is strictly newer than `installed`.
pub fn newer(candidate: &str, installed: &str) -> bool {
  compare(candidate, installed) == Ordering::Greater
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assert_newer(a: &str, b: &str) {
    assert_eq!(compare(a, b), Ordering::Greater, "{a} should be newer than {b}");
    assert_eq!(compare(b, a), Ordering::Less, "{b} should be older than {a}");
  }

  #[test]
  fn numeric_components_compare_numerically() {
    assert_newer("1.10", "1.9");
    assert_newer("1.2", "1.0");
    assert_newer("2.0", "1.99");
    assert_newer("1.0", "0.9");
  }

  #[test]
  fn equal_versions() {
    assert_eq!(compare("1.0", "1.0"), Ordering::Equal);
    assert_eq!(compare("1.0", "1-0"), Ordering::Equal);
    assert_eq!(compare("1.00", "1.0"), Ordering::Equal);
  }

  #[test]
  fn longer_numeric_tail_is_newer() {
    assert_newer("1.0.1", "1.0");
    assert_newer("0.1", "0");
  }

  #[test]
  fn alphabetic_suffix_is_a_pre_release() {
    assert_newer("1.0", "1.0rc1");
    assert_newer("1.0", "1.0-beta");
    assert_newer("1.0rc2", "1.0rc1");
    assert_newer("1.0rc1", "1.0pre1");
  }

  #[test]
  fn numbers_sort_after_letters() {
    assert_newer("1.0.1", "1.0rc1");
  }

  #[test]
  fn newer_helper() {
    assert!(newer("1.2", "1.0"));
    assert!(!newer("1.0", "1.0"));
    assert!(!newer("0.9", "1.0"));
  }
}
