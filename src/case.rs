//! Field-name case conversion between declared names and wire keys.
//!
//! Only the forward direction is computed. Decoding inverts it by converting
//! each declared name and looking the result up, so the mapping is exact for
//! the declared vocabulary even when the transform itself is lossy.
use std::fmt;
use std::str::FromStr;

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCase {
    #[default]
    AsDeclared,
    SnakeCase,
    CamelCase,
    PascalCase,
    KebabCase,
}

impl FieldCase {
    /// Declared name → wire key.
    pub fn apply(self, declared: &str) -> String {
        if self == FieldCase::AsDeclared {
            return declared.to_string();
        }
        let words = split_words(declared);
        match self {
            FieldCase::AsDeclared => declared.to_string(),
            FieldCase::SnakeCase => join_lower(&words, "_"),
            FieldCase::KebabCase => join_lower(&words, "-"),
            FieldCase::PascalCase => words.iter().map(|w| capitalize(w)).collect(),
            FieldCase::CamelCase => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
                .collect(),
        }
    }

    /// Wire keys for `declared`, in order. Fails when two declared names
    /// convert to the same key.
    pub fn wire_keys<'a>(self, declared: impl IntoIterator<Item = &'a str>) -> Result<Vec<String>, Collision> {
        let mut seen: IndexMap<String, &str> = IndexMap::new();
        for name in declared {
            match seen.entry(self.apply(name)) {
                Entry::Occupied(taken) => {
                    return Err(Collision {
                        first: taken.get().to_string(),
                        second: name.to_string(),
                        key: taken.key().clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(name);
                }
            }
        }
        Ok(seen.into_keys().collect())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldCase::AsDeclared => "as_declared",
            FieldCase::SnakeCase => "snake_case",
            FieldCase::CamelCase => "camel_case",
            FieldCase::PascalCase => "pascal_case",
            FieldCase::KebabCase => "kebab_case",
        }
    }
}

/// Two declared names that share one wire key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub first: String,
    pub second: String,
    pub key: String,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` and `{}` both map to key `{}`", self.first, self.second, self.key)
    }
}

impl fmt::Display for FieldCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "as_declared" => Ok(FieldCase::AsDeclared),
            "snake_case" => Ok(FieldCase::SnakeCase),
            "camel_case" => Ok(FieldCase::CamelCase),
            "pascal_case" => Ok(FieldCase::PascalCase),
            "kebab_case" => Ok(FieldCase::KebabCase),
            other => Err(format!(
                "unknown case `{other}` (expected as_declared, snake_case, camel_case, pascal_case or kebab_case)"
            )),
        }
    }
}

// ------------------------------- Helpers --------------------------------- //

/// Splits on `_`, `-`, spaces and case boundaries; an acronym run stays one
/// word (`HTTPServer` → `HTTP`, `Server`), digits stick to the preceding word.
fn split_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut cur = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | ' ') {
            if !cur.is_empty() { words.push(std::mem::take(&mut cur)); }
            continue;
        }
        if c.is_uppercase() && !cur.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut cur));
            }
        }
        cur.push(c);
    }
    if !cur.is_empty() { words.push(cur); }
    words
}

fn join_lower(words: &[String], sep: &str) -> String {
    words.iter().map(|w| w.to_lowercase()).collect::<Vec<_>>().join(sep)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
