use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::builders::patterns::{Pattern, PatternMatcher, PatternParser, SwapMap};
use crate::builders::validator::{OptionsValidator, StandardValidator};
use crate::core::changes::{ChangeDetector, GitContext, to_ignore_patterns};
use crate::core::config::{ConfigResolver, EnvSnapshot};
use crate::core::error::ConfigError;

pub const DEFAULT_DIRECTORY: &str = ".";
pub const DEFAULT_ASSUME_EXTENSION: &str = ".html";
pub const DEFAULT_DIRECTORY_INDEX_FILE: &str = "index.html";
pub const DEFAULT_EXTENSIONS: &[&str] = &[".html"];
pub const DEFAULT_MAX_CONCURRENCY: i64 = 50;
pub const DEFAULT_CONNECT_TIMEOUT: i64 = 30;
pub const DEFAULT_TIMEOUT: i64 = 120;
pub const COOKIE_FILE: &str = ".cookies";

/// A check the external proofer can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Check {
    Favicon,
    Links,
    Images,
    Scripts,
    OpenGraph,
}

impl Check {
    /// Each check with its toggle names (newest first) and default.
    pub const TOGGLES: [(Check, &'static [&'static str], bool); 5] = [
        (Check::Favicon, &["CHECK_FAVICON"], false),
        (Check::Links, &["CHECK_LINKS", "CHECK_HTML"], true),
        (Check::Images, &["CHECK_IMAGES", "CHECK_IMG_HTTP"], true),
        (Check::Scripts, &["CHECK_SCRIPTS"], true),
        (Check::OpenGraph, &["CHECK_OPENGRAPH"], false),
    ];
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Check::Favicon => "Favicon",
            Check::Links => "Links",
            Check::Images => "Images",
            Check::Scripts => "Scripts",
            Check::OpenGraph => "OpenGraph",
        };
        write!(f, "{name}")
    }
}

/// Request concurrency for external links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hydra {
    /// `MAX_CONCURRENCY`, default 50.
    pub max_concurrency: i64,
}

/// HTTP transport settings for external links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Typhoeus {
    /// `CONNECT_TIMEOUT` in seconds, default 30.
    pub connecttimeout: i64,
    /// `FOLLOWLOCATION`, default true.
    pub followlocation: bool,
    /// `SSL_VERIFYPEER`, default false.
    pub ssl_verifypeer: bool,
    /// `SSL_VERIFYHOST`, default 0.
    pub ssl_verifyhost: i64,
    /// `TIMEOUT` in seconds, default 120.
    pub timeout: i64,
    pub cookiefile: String,
    pub cookiejar: String,
}

/// The fully resolved settings handed to the proofer.
///
/// Built once by `OptionsBuilder`; nothing in here reads the environment
/// again. Field docs list the input keys in priority order and the default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Options {
    /// `DIRECTORY`, default `.`. Passed as the checker's argument, not as an option.
    #[serde(skip)]
    pub directory: String,
    /// `ALLOW_HASH_HREF`, default true.
    pub allow_hash_href: bool,
    /// `ALLOW_MISSING_HREF`, default false.
    pub allow_missing_href: bool,
    /// `ASSUME_EXTENSION`, default `.html`.
    pub assume_extension: String,
    /// One entry per enabled check toggle.
    pub checks: Vec<Check>,
    /// `CHECK_EXTERNAL_HASH`, default true.
    pub check_external_hash: bool,
    /// `CHECK_INTERNAL_HASH`, default true.
    pub check_internal_hash: bool,
    /// `CHECK_SRI`, default false.
    pub check_sri: bool,
    /// `DIRECTORY_INDEX_FILE`, default `index.html`.
    pub directory_index_file: String,
    /// `DISABLE_EXTERNAL`, default false.
    pub disable_external: bool,
    /// `ENFORCE_HTTPS`, default true.
    pub enforce_https: bool,
    /// `EXTENSIONS`, default `[".html"]`.
    pub extensions: Vec<String>,
    /// `IGNORE_EMPTY_ALT` / `EMPTY_ALT_IGNORE`, default true.
    pub ignore_empty_alt: bool,
    /// `IGNORE_FILES`, literal or `/regex/` entries.
    pub ignore_files: Vec<Pattern>,
    /// `IGNORE_EMPTY_MAILTO`, default false.
    pub ignore_empty_mailto: bool,
    /// `IGNORE_MISSING_ALT` / `MISSING_ALT_IGNORE`, default false.
    pub ignore_missing_alt: bool,
    /// `IGNORE_STATUS_CODES`.
    pub ignore_status_codes: Vec<i64>,
    /// `URL_IGNORE_RE` (all regex), then `IGNORE_URLS` / `URL_IGNORE`
    /// (literal or `/regex/`), then new files when `IGNORE_NEW_FILES` is set.
    pub ignore_urls: Vec<Pattern>,
    /// `HOST` + `BASE_PATH` rewrites, then `SWAP_URLS` / `URL_SWAP` entries.
    pub swap_urls: SwapMap,
    pub hydra: Hydra,
    pub typhoeus: Typhoeus,
    /// `CACHE`, a JSON object passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<serde_json::Value>,
}

impl Options {
    pub fn is_url_ignored(&self, url: &str) -> bool {
        self.ignore_urls.as_slice().matches(url)
    }

    pub fn is_file_ignored(&self, path: &str) -> bool {
        self.ignore_files.as_slice().matches(path)
    }

    /// Rewrites `url` with the configured swap rules.
    pub fn swap_url(&self, url: &str) -> String {
        self.swap_urls.apply(url)
    }
}

/// Composes every setting into an `Options` value.
pub struct OptionsBuilder<'a> {
    env: &'a EnvSnapshot,
    detector: &'a ChangeDetector,
}

impl<'a> OptionsBuilder<'a> {
    pub fn new(env: &'a EnvSnapshot, detector: &'a ChangeDetector) -> Self {
        Self { env, detector }
    }

    /// Resolves and validates the options. An empty check list is an error.
    pub fn build(&self) -> Result<Options, ConfigError> {
        let options = self.resolve()?;
        StandardValidator::new().validate(&options)?;
        Ok(options)
    }

    /// Resolves the options without validating them.
    pub fn resolve(&self) -> Result<Options, ConfigError> {
        let config = ConfigResolver::new(self.env);
        let parser = PatternParser::new(&config);

        Ok(Options {
            directory: config.get_str(&["DIRECTORY"], DEFAULT_DIRECTORY),
            allow_hash_href: config.get_bool(&["ALLOW_HASH_HREF"], true),
            allow_missing_href: config.get_bool(&["ALLOW_MISSING_HREF"], false),
            assume_extension: config.get_str(&["ASSUME_EXTENSION"], DEFAULT_ASSUME_EXTENSION),
            checks: self.checks(&config),
            check_external_hash: config.get_bool(&["CHECK_EXTERNAL_HASH"], true),
            check_internal_hash: config.get_bool(&["CHECK_INTERNAL_HASH"], true),
            check_sri: config.get_bool(&["CHECK_SRI"], false),
            directory_index_file: config
                .get_str(&["DIRECTORY_INDEX_FILE"], DEFAULT_DIRECTORY_INDEX_FILE),
            disable_external: config.get_bool(&["DISABLE_EXTERNAL"], false),
            enforce_https: config.get_bool(&["ENFORCE_HTTPS"], true),
            extensions: config.get_list(&["EXTENSIONS"], DEFAULT_EXTENSIONS),
            ignore_empty_alt: config.get_bool(&["IGNORE_EMPTY_ALT", "EMPTY_ALT_IGNORE"], true),
            ignore_files: parser.get_pattern_list(&["IGNORE_FILES"], false)?,
            ignore_empty_mailto: config.get_bool(&["IGNORE_EMPTY_MAILTO"], false),
            ignore_missing_alt: config
                .get_bool(&["IGNORE_MISSING_ALT", "MISSING_ALT_IGNORE"], false),
            ignore_status_codes: config.get_int_list(&["IGNORE_STATUS_CODES"], &[]),
            ignore_urls: self.ignore_urls(&config, &parser)?,
            swap_urls: parser.parse_swap_map(&["SWAP_URLS", "URL_SWAP"], default_swap(&config)?)?,
            hydra: Hydra {
                max_concurrency: config.get_int(&["MAX_CONCURRENCY"], DEFAULT_MAX_CONCURRENCY),
            },
            typhoeus: Typhoeus {
                connecttimeout: config.get_int(&["CONNECT_TIMEOUT"], DEFAULT_CONNECT_TIMEOUT),
                followlocation: config.get_bool(&["FOLLOWLOCATION"], true),
                ssl_verifypeer: config.get_bool(&["SSL_VERIFYPEER"], false),
                ssl_verifyhost: config.get_int(&["SSL_VERIFYHOST"], 0),
                timeout: config.get_int(&["TIMEOUT"], DEFAULT_TIMEOUT),
                cookiefile: COOKIE_FILE.to_string(),
                cookiejar: COOKIE_FILE.to_string(),
            },
            cache: config.get_json(&["CACHE"]),
        })
    }

    fn checks(&self, config: &ConfigResolver<'_>) -> Vec<Check> {
        Check::TOGGLES
            .iter()
            .filter(|(_, names, fallback)| config.get_bool(names, *fallback))
            .map(|(check, _, _)| *check)
            .collect()
    }

    fn ignore_urls(
        &self,
        config: &ConfigResolver<'_>,
        parser: &PatternParser<'_>,
    ) -> Result<Vec<Pattern>, ConfigError> {
        let mut patterns = parser.get_pattern_list(&["URL_IGNORE_RE"], true)?;
        patterns.extend(parser.get_pattern_list(&["IGNORE_URLS", "URL_IGNORE"], false)?);

        if config.get_bool(&["IGNORE_NEW_FILES"], false) {
            let context = GitContext::from_env(self.env);
            let new_files = self.detector.detect(&context);
            info!("Ignoring links to {} new file(s)", new_files.len());
            patterns.extend(to_ignore_patterns(&new_files));
        }
        Ok(patterns)
    }
}

/// Rewrites that strip `HOST` + `BASE_PATH` so published URLs resolve
/// against the local build. Empty unless both are set.
fn default_swap(config: &ConfigResolver<'_>) -> Result<SwapMap, ConfigError> {
    let host = config.get_str(&["HOST"], "");
    let base_path = config.get_str(&["BASE_PATH"], "");
    let mut output = SwapMap::new();
    if !host.is_empty() && !base_path.is_empty() {
        output.insert(Pattern::regex(&format!("^.*{host}{base_path}"))?, String::new());
        output.insert(Pattern::regex(&format!("^{base_path}"))?, String::new());
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::GitError;
    use crate::core::git::{ChangeSet, CompareApi, GitClient};

    struct StaticGit(Option<ChangeSet>);

    impl GitClient for StaticGit {
        fn added_files_since(&self, _base: &str) -> Result<ChangeSet, GitError> {
            self.0
                .clone()
                .ok_or_else(|| GitError::MissingContext("no diff".to_string()))
        }

        fn merge_base(&self, _branch: &str) -> Result<String, GitError> {
            Ok("base".to_string())
        }
    }

    struct NoCompare;

    impl CompareApi for NoCompare {
        fn added_files(&self, _: &str, _: &str, _: &str, _: &str) -> Result<ChangeSet, GitError> {
            Err(GitError::MissingContext("offline".to_string()))
        }
    }

    fn detector(new_files: Option<&[&str]>) -> ChangeDetector {
        let files = new_files.map(|f| f.iter().map(|s| s.to_string()).collect());
        ChangeDetector::new(Box::new(StaticGit(files)), Box::new(NoCompare))
    }

    fn env(pairs: &[(&str, &str)]) -> EnvSnapshot {
        EnvSnapshot::from_pairs(pairs.iter().map(|(k, v)| (*k, *v)))
    }

    #[test]
    fn test_defaults() {
        let snapshot = env(&[]);
        let detector = detector(None);
        let options = OptionsBuilder::new(&snapshot, &detector).build().unwrap();

        assert_eq!(options.directory, ".");
        assert!(options.allow_hash_href);
        assert!(!options.allow_missing_href);
        assert_eq!(options.assume_extension, ".html");
        assert_eq!(options.checks, vec![Check::Links, Check::Images, Check::Scripts]);
        assert!(options.ignore_empty_alt);
        assert_eq!(options.extensions, vec![".html"]);
        assert!(options.ignore_urls.is_empty());
        assert!(options.swap_urls.is_empty());
        assert_eq!(options.hydra.max_concurrency, 50);
        assert_eq!(options.typhoeus.connecttimeout, 30);
        assert_eq!(options.typhoeus.timeout, 120);
        assert_eq!(options.typhoeus.ssl_verifyhost, 0);
        assert!(options.typhoeus.followlocation);
        assert!(!options.typhoeus.ssl_verifypeer);
        assert!(options.cache.is_none());
    }

    #[test]
    fn test_legacy_aliases() {
        let snapshot = env(&[
            ("INPUT_CHECK_HTML", "false"),
            ("INPUT_CHECK_FAVICON", "yes"),
            ("INPUT_EMPTY_ALT_IGNORE", "false"),
            ("INPUT_MISSING_ALT_IGNORE", "true"),
        ]);
        let detector = detector(None);
        let options = OptionsBuilder::new(&snapshot, &detector).build().unwrap();
        assert_eq!(options.checks, vec![Check::Favicon, Check::Images, Check::Scripts]);
        assert!(!options.ignore_empty_alt);
        assert!(options.ignore_missing_alt);
    }

    #[test]
    fn test_no_checks_selected_is_error() {
        let snapshot = env(&[
            ("INPUT_CHECK_LINKS", "false"),
            ("INPUT_CHECK_IMAGES", "false"),
            ("INPUT_CHECK_SCRIPTS", "false"),
        ]);
        let detector = detector(None);
        let builder = OptionsBuilder::new(&snapshot, &detector);
        assert!(matches!(builder.build(), Err(ConfigError::NoChecksSelected)));
        assert!(builder.resolve().unwrap().checks.is_empty());
    }

    #[test]
    fn test_ignore_urls_order() {
        let snapshot = env(&[
            ("INPUT_URL_IGNORE_RE", "skip"),
            ("INPUT_URL_IGNORE", "/ignore-this/,https://exact.example/"),
            ("INPUT_IGNORE_NEW_FILES", "true"),
        ]);
        let detector = detector(Some(&["blog/new-post.md"]));
        let options = OptionsBuilder::new(&snapshot, &detector).build().unwrap();

        let rendered: Vec<String> = options.ignore_urls.iter().map(|p| p.to_string()).collect();
        assert_eq!(rendered.len(), 4);
        assert_eq!(rendered[0], "/skip/");
        assert_eq!(rendered[1], "/ignore-this/");
        assert_eq!(rendered[2], "https://exact.example/");
        assert!(options.is_url_ignored("https://site.example/blog/new-post/index.html"));
        assert!(options.is_url_ignored("https://exact.example/"));
        assert!(!options.is_url_ignored("https://exact.example/other"));
    }

    #[test]
    fn test_new_files_ignored_only_when_enabled() {
        let snapshot = env(&[]);
        let detector = detector(Some(&["new-page.html"]));
        let options = OptionsBuilder::new(&snapshot, &detector).build().unwrap();
        assert!(!options.is_url_ignored("/new-page.html"));
    }

    #[test]
    fn test_failed_diff_still_builds_options() {
        let snapshot = env(&[("INPUT_IGNORE_NEW_FILES", "true")]);
        let detector = detector(None);
        let options = OptionsBuilder::new(&snapshot, &detector).build().unwrap();
        assert!(options.ignore_urls.is_empty());
    }

    #[test]
    fn test_default_swap_from_host_and_base_path() {
        let snapshot = env(&[
            ("INPUT_HOST", "example.com"),
            ("INPUT_BASE_PATH", "/blog"),
            ("INPUT_SWAP_URLS", r"http\://localhost\:4000:https\://example.com"),
        ]);
        let detector = detector(None);
        let options = OptionsBuilder::new(&snapshot, &detector).build().unwrap();

        let keys: Vec<&str> = options
            .swap_urls
            .rules()
            .iter()
            .map(|r| r.pattern.as_str())
            .collect();
        assert_eq!(keys, vec!["^.*example.com/blog", "^/blog", "http://localhost:4000"]);
        assert_eq!(options.swap_url("https://example.com/blog/post/"), "/post/");
        assert_eq!(options.swap_url("/blog/post/"), "/post/");
    }

    #[test]
    fn test_malformed_swap_entry_is_error() {
        let snapshot = env(&[("INPUT_URL_SWAP", "missing-separator")]);
        let detector = detector(None);
        let result = OptionsBuilder::new(&snapshot, &detector).build();
        assert!(matches!(result, Err(ConfigError::MalformedSwapEntry { .. })));
    }

    #[test]
    fn test_lists_and_cache() {
        let snapshot = env(&[
            ("INPUT_IGNORE_FILES", "404.html,/drafts/"),
            ("INPUT_IGNORE_STATUS_CODES", "429,999"),
            ("INPUT_EXTENSIONS", ""),
            ("INPUT_CACHE", r#"{"timeframe": {"external": "30d"}}"#),
        ]);
        let detector = detector(None);
        let options = OptionsBuilder::new(&snapshot, &detector).build().unwrap();
        assert!(options.is_file_ignored("404.html"));
        assert!(options.is_file_ignored("site/drafts/wip.html"));
        assert!(!options.is_file_ignored("site/404.html"));
        assert_eq!(options.ignore_status_codes, vec![429, 999]);
        assert!(options.extensions.is_empty());
        assert_eq!(options.cache.as_ref().unwrap()["timeframe"]["external"], "30d");
    }

    #[test]
    fn test_serializes_for_checker() {
        let snapshot = env(&[("INPUT_URL_IGNORE", "/^mailto/")]);
        let detector = detector(None);
        let options = OptionsBuilder::new(&snapshot, &detector).build().unwrap();
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["checks"], serde_json::json!(["Links", "Images", "Scripts"]));
        assert_eq!(json["ignore_urls"], serde_json::json!(["/^mailto/"]));
        assert_eq!(json["typhoeus"]["cookiefile"], ".cookies");
        assert!(json.get("directory").is_none());
        assert!(json.get("cache").is_none());
    }
}
