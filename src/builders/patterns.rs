use regex::{NoExpand, Regex};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

use crate::core::config::ConfigResolver;
use crate::core::error::ConfigError;

/// A matcher used to decide whether a URL or file path is ignored or swapped.
///
/// Inputs written as `/.../` become a `Regex` that matches anywhere in the
/// candidate. Everything else is a `Literal` that must equal the candidate.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

/// The `PatternMatcher` trait lets the options treat single patterns and
/// pattern lists uniformly when checking a URL or a file name.
pub trait PatternMatcher {
    /// Returns `true` if `candidate` is matched.
    fn matches(&self, candidate: &str) -> bool;
}

impl Pattern {
    /// Compiles `source` as a regular expression.
    pub fn regex(source: &str) -> Result<Self, ConfigError> {
        compile(source).map(Pattern::Regex)
    }

    /// Turns a raw input token into a pattern. Tokens wrapped in `/` are
    /// compiled as a regex from their interior; the rest stay literal.
    pub fn classify(token: &str) -> Result<Self, ConfigError> {
        if token.len() >= 2 && token.starts_with('/') && token.ends_with('/') {
            Self::regex(&token[1..token.len() - 1])
        } else {
            Ok(Pattern::Literal(token.to_string()))
        }
    }

    /// The pattern text without `/` delimiters.
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Literal(text) => text,
            Pattern::Regex(re) => re.as_str(),
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Pattern::Regex(_))
    }
}

impl PatternMatcher for Pattern {
    fn matches(&self, candidate: &str) -> bool {
        match self {
            Pattern::Literal(text) => text == candidate,
            Pattern::Regex(re) => re.is_match(candidate),
        }
    }
}

impl PatternMatcher for [Pattern] {
    fn matches(&self, candidate: &str) -> bool {
        self.iter().any(|p| p.matches(candidate))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.is_regex() == other.is_regex() && self.as_str() == other.as_str()
    }
}

/// Regexes render as `/source/`, literals as themselves. This is the form the
/// checker's command line expects.
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(text) => write!(f, "{text}"),
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A URL rewrite: every match of `pattern` is replaced by `replacement`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRule {
    pub pattern: Pattern,
    pub replacement: String,
}

/// Ordered swap rules keyed by pattern text. Inserting a rule whose pattern
/// text already exists replaces the earlier rule in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwapMap {
    rules: Vec<SwapRule>,
}

impl SwapMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern: Pattern, replacement: String) {
        let rule = SwapRule {
            pattern,
            replacement,
        };
        match self
            .rules
            .iter_mut()
            .find(|r| r.pattern.as_str() == rule.pattern.as_str())
        {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn get(&self, pattern_text: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.pattern.as_str() == pattern_text)
            .map(|r| r.replacement.as_str())
    }

    pub fn rules(&self) -> &[SwapRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies every rule to `url`, in insertion order.
    pub fn apply(&self, url: &str) -> String {
        self.rules
            .iter()
            .fold(url.to_string(), |acc, rule| match &rule.pattern {
                Pattern::Regex(re) => re
                    .replace_all(&acc, NoExpand(&rule.replacement))
                    .into_owned(),
                Pattern::Literal(text) => acc.replace(text.as_str(), &rule.replacement),
            })
    }
}

impl Serialize for SwapMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for rule in &self.rules {
            map.serialize_entry(&rule.pattern, &rule.replacement)?;
        }
        map.end()
    }
}

/// Builds patterns and swap maps from resolved `INPUT_*` lists.
pub struct PatternParser<'a> {
    resolver: &'a ConfigResolver<'a>,
}

impl<'a> PatternParser<'a> {
    pub fn new(resolver: &'a ConfigResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Resolves a list setting into patterns.
    ///
    /// With `force_regex` every token is compiled as a regex, delimiters or
    /// not. Otherwise each token goes through `Pattern::classify`.
    pub fn get_pattern_list(
        &self,
        names: &[&str],
        force_regex: bool,
    ) -> Result<Vec<Pattern>, ConfigError> {
        self.resolver
            .get_list(names, &[])
            .iter()
            .map(|token| {
                if force_regex {
                    Pattern::regex(token)
                } else {
                    Pattern::classify(token)
                }
            })
            .collect()
    }

    /// Adds the `pattern:replacement` entries of a list setting to `seed`.
    ///
    /// Entries split at the first `:` not preceded by a backslash; `\:` in
    /// either half becomes a literal colon. An entry without a separator,
    /// blank ones included, is a `MalformedSwapEntry`.
    pub fn parse_swap_map(&self, names: &[&str], seed: SwapMap) -> Result<SwapMap, ConfigError> {
        let mut output = seed;
        for entry in self.resolver.get_list(names, &[]) {
            let (pattern, replacement) = split_swap_entry(&entry)?;
            output.insert(Pattern::regex(&pattern)?, replacement);
        }
        Ok(output)
    }
}

/// Splits one swap entry into its unescaped, trimmed pattern and replacement.
pub fn split_swap_entry(entry: &str) -> Result<(String, String), ConfigError> {
    let separator = entry
        .char_indices()
        .find(|&(i, c)| c == ':' && !entry[..i].ends_with('\\'))
        .map(|(i, _)| i)
        .ok_or_else(|| ConfigError::MalformedSwapEntry {
            entry: entry.to_string(),
        })?;

    let unescape = |part: &str| part.replace("\\:", ":").trim().to_string();
    Ok((
        unescape(&entry[..separator]),
        unescape(&entry[separator + 1..]),
    ))
}

fn compile(source: &str) -> Result<Regex, ConfigError> {
    Regex::new(source).map_err(|source_err| ConfigError::InvalidPattern {
        pattern: source.to_string(),
        source: source_err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EnvSnapshot;

    fn env(pairs: &[(&str, &str)]) -> EnvSnapshot {
        EnvSnapshot::from_pairs(pairs.iter().map(|(k, v)| (*k, *v)))
    }

    #[test]
    fn test_classify_regex_matches_substring() {
        let pattern = Pattern::classify("/abc/").unwrap();
        assert!(pattern.is_regex());
        assert!(pattern.matches("xabcy"));
    }

    #[test]
    fn test_classify_literal_matches_whole_string() {
        let pattern = Pattern::classify("abc").unwrap();
        assert_eq!(pattern, Pattern::Literal("abc".to_string()));
        assert!(pattern.matches("abc"));
        assert!(!pattern.matches("abcy"));
    }

    #[test]
    fn test_classify_single_slash_is_literal() {
        assert!(!Pattern::classify("/").unwrap().is_regex());
    }

    #[test]
    fn test_invalid_regex_is_config_error() {
        let err = Pattern::classify("/(unclosed/").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_display_round_trips_delimiters() {
        assert_eq!(Pattern::classify("/a.c/").unwrap().to_string(), "/a.c/");
        assert_eq!(Pattern::classify("plain").unwrap().to_string(), "plain");
        let json = serde_json::to_string(&Pattern::regex("x+").unwrap()).unwrap();
        assert_eq!(json, "\"/x+/\"");
    }

    #[test]
    fn test_get_pattern_list_mixed_and_forced() {
        let snapshot = env(&[("INPUT_MIX", "/abc/,plain"), ("INPUT_RE", "abc\n123")]);
        let resolver = ConfigResolver::new(&snapshot);
        let parser = PatternParser::new(&resolver);

        let mixed = parser.get_pattern_list(&["MIX"], false).unwrap();
        assert_eq!(
            mixed,
            vec![
                Pattern::regex("abc").unwrap(),
                Pattern::Literal("plain".to_string())
            ]
        );

        let forced = parser.get_pattern_list(&["RE"], true).unwrap();
        assert!(forced.iter().all(Pattern::is_regex));
        assert_eq!(forced.len(), 2);
    }

    #[test]
    fn test_parse_swap_map_newlines_and_commas() {
        for value in ["foo:bar\nbaz:qux", "foo:bar,baz:qux"] {
            let snapshot = env(&[("INPUT_SWAP_URLS", value)]);
            let resolver = ConfigResolver::new(&snapshot);
            let map = PatternParser::new(&resolver)
                .parse_swap_map(&["SWAP_URLS"], SwapMap::new())
                .unwrap();
            assert_eq!(map.len(), 2);
            assert_eq!(map.get("foo"), Some("bar"));
            assert_eq!(map.get("baz"), Some("qux"));
        }
    }

    #[test]
    fn test_parse_swap_map_escaped_colons() {
        let snapshot = env(&[("INPUT_SWAP_URLS", r"colon\:bar:escape\:qux")]);
        let resolver = ConfigResolver::new(&snapshot);
        let map = PatternParser::new(&resolver)
            .parse_swap_map(&["SWAP_URLS"], SwapMap::new())
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.rules()[0].pattern.as_str(), "colon:bar");
        assert_eq!(map.rules()[0].replacement, "escape:qux");
    }

    #[test]
    fn test_parse_swap_map_trims_and_last_entry_wins() {
        let snapshot = env(&[("INPUT_URL_SWAP", " ^/old : /new \n^/old:/newer")]);
        let resolver = ConfigResolver::new(&snapshot);
        let mut seed = SwapMap::new();
        seed.insert(Pattern::regex("^/seed").unwrap(), String::new());
        let map = PatternParser::new(&resolver)
            .parse_swap_map(&["SWAP_URLS", "URL_SWAP"], seed)
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.rules()[0].pattern.as_str(), "^/seed");
        assert_eq!(map.get("^/old"), Some("/newer"));
    }

    #[test]
    fn test_parse_swap_map_rejects_entry_without_separator() {
        let snapshot = env(&[("INPUT_SWAP_URLS", r"no\:separator")]);
        let resolver = ConfigResolver::new(&snapshot);
        let err = PatternParser::new(&resolver)
            .parse_swap_map(&["SWAP_URLS"], SwapMap::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedSwapEntry { .. }));
    }

    #[test]
    fn test_parse_swap_map_rejects_blank_entry() {
        for value in ["a:b\n\nc:d", "a:b,  ,c:d"] {
            let snapshot = env(&[("INPUT_SWAP_URLS", value)]);
            let resolver = ConfigResolver::new(&snapshot);
            let err = PatternParser::new(&resolver)
                .parse_swap_map(&["SWAP_URLS"], SwapMap::new())
                .unwrap_err();
            assert!(matches!(err, ConfigError::MalformedSwapEntry { .. }));
        }
    }

    #[test]
    fn test_parse_swap_map_ignores_trailing_separator() {
        let snapshot = env(&[("INPUT_SWAP_URLS", "a:b,\n")]);
        let resolver = ConfigResolver::new(&snapshot);
        let map = PatternParser::new(&resolver)
            .parse_swap_map(&["SWAP_URLS"], SwapMap::new())
            .unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_swap_map_apply() {
        let mut map = SwapMap::new();
        map.insert(Pattern::regex("^https://example.com").unwrap(), String::new());
        map.insert(Pattern::regex("http://localhost:4000").unwrap(), "$1".to_string());
        assert_eq!(map.apply("https://example.com/docs/"), "/docs/");
        assert_eq!(map.apply("http://localhost:4000/a"), "$1/a");
    }

    #[test]
    fn test_pattern_slice_matches_any() {
        let patterns = vec![
            Pattern::Literal("exact".to_string()),
            Pattern::regex("^https://skip").unwrap(),
        ];
        assert!(patterns.as_slice().matches("exact"));
        assert!(patterns.as_slice().matches("https://skip.me"));
        assert!(!patterns.as_slice().matches("other"));
    }
}
