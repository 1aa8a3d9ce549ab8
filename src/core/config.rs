use std::collections::HashMap;

use tracing::warn;

/// Prefix shared by every action input, e.g. `INPUT_CHECK_LINKS`.
pub const INPUT_PREFIX: &str = "INPUT_";

/// A read-only snapshot of the process environment.
///
/// Taken once at start-up and passed explicitly to everything that needs a
/// setting, so nothing re-reads the live environment halfway through a run.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Captures the current process environment.
    pub fn from_process() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Builds a snapshot from explicit key/value pairs. Later pairs override
    /// earlier ones with the same key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns a copy of the snapshot with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Returns the value only when it is set to something non-empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }
}

/// The outcome of looking up a list of candidate names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The first candidate holding a non-empty value.
    Value(&'a str),
    /// At least one candidate is set, but all of them are empty.
    Empty,
    /// None of the candidates is set.
    Unset,
}

/// Typed lookup of `INPUT_*` settings with alias support.
///
/// Every getter takes an ordered list of candidate names; the first one with a
/// non-empty value wins. This lets renamed inputs keep their legacy spelling,
/// e.g. `&["CHECK_LINKS", "CHECK_HTML"]`.
pub struct ConfigResolver<'a> {
    env: &'a EnvSnapshot,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(env: &'a EnvSnapshot) -> Self {
        Self { env }
    }

    /// Returns the first non-empty value among the candidate names.
    pub fn resolve(&self, names: &[&str]) -> Option<&'a str> {
        match self.lookup(names) {
            Lookup::Value(value) => Some(value),
            Lookup::Empty | Lookup::Unset => None,
        }
    }

    /// Like `resolve`, but distinguishes "set to empty" from "not set at all".
    pub fn lookup(&self, names: &[&str]) -> Lookup<'a> {
        let mut seen_empty = false;
        for name in names {
            match self.env.get(&format!("{INPUT_PREFIX}{name}")) {
                Some("") => seen_empty = true,
                Some(value) => return Lookup::Value(value),
                None => {}
            }
        }
        if seen_empty {
            Lookup::Empty
        } else {
            Lookup::Unset
        }
    }

    /// Resolves a boolean flag.
    ///
    /// Case-insensitive: values starting with `t` or `y`, or exactly `1`, are
    /// true; values starting with `f` or `n`, or exactly `0`, are false.
    /// Anything else, including an unset name, yields `fallback`.
    pub fn get_bool(&self, names: &[&str], fallback: bool) -> bool {
        let Some(value) = self.resolve(names) else {
            return fallback;
        };
        let lowered = value.to_ascii_lowercase();
        if lowered == "1" || lowered.starts_with('t') || lowered.starts_with('y') {
            true
        } else if lowered == "0" || lowered.starts_with('f') || lowered.starts_with('n') {
            false
        } else {
            fallback
        }
    }

    /// Resolves an integer. A value without leading digits parses to 0
    /// instead of falling back.
    pub fn get_int(&self, names: &[&str], fallback: i64) -> i64 {
        match self.resolve(names) {
            Some(value) => parse_int_prefix(value),
            None => fallback,
        }
    }

    /// Resolves a string. A name set to the empty string yields `""`.
    pub fn get_str(&self, names: &[&str], fallback: &str) -> String {
        match self.lookup(names) {
            Lookup::Value(value) => value.to_string(),
            Lookup::Empty => String::new(),
            Lookup::Unset => fallback.to_string(),
        }
    }

    /// Resolves a comma- or newline-separated list.
    ///
    /// An unset name yields `fallback`, while a name set to `""` yields an
    /// empty list.
    pub fn get_list(&self, names: &[&str], fallback: &[&str]) -> Vec<String> {
        match self.lookup(names) {
            Lookup::Value(value) => split_list(value),
            Lookup::Empty => Vec::new(),
            Lookup::Unset => fallback.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Resolves a list of integers using the same permissive parse as `get_int`.
    pub fn get_int_list(&self, names: &[&str], fallback: &[i64]) -> Vec<i64> {
        match self.lookup(names) {
            Lookup::Value(value) => split_list(value)
                .iter()
                .map(|token| parse_int_prefix(token))
                .collect(),
            Lookup::Empty => Vec::new(),
            Lookup::Unset => fallback.to_vec(),
        }
    }

    /// Resolves a JSON document. Unset, empty or unparsable values yield `None`.
    pub fn get_json(&self, names: &[&str]) -> Option<serde_json::Value> {
        let value = self.resolve(names)?;
        match serde_json::from_str(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Ignoring {}: not valid JSON ({e})", names.join("/"));
                None
            }
        }
    }
}

/// Splits on commas and newlines, dropping trailing empty tokens.
pub fn split_list(value: &str) -> Vec<String> {
    let mut tokens: Vec<String> = value.split([',', '\n']).map(str::to_string).collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    tokens
}

/// Parses leading digits (after optional whitespace and sign); returns 0 when
/// there are none. Underscores between digits are accepted.
pub fn parse_int_prefix(value: &str) -> i64 {
    let trimmed = value.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut result: i64 = 0;
    let mut last_was_digit = false;
    for c in rest.chars() {
        match c {
            '0'..='9' => {
                let digit = i64::from(c as u8 - b'0');
                result = result.saturating_mul(10).saturating_add(digit);
                last_was_digit = true;
            }
            '_' if last_was_digit => last_was_digit = false,
            _ => break,
        }
    }

    if negative { -result } else { result }
}
