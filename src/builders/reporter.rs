use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::builders::options::Options;

/// Where the proofer keeps its cache unless `CACHE` says otherwise.
pub const DEFAULT_STORAGE_DIR: &str = "tmp/.htmlproofer";
pub const DEFAULT_CACHE_FILE: &str = "cache.json";

/// How many cached URLs are listed per section.
const LISTED_URLS: usize = 20;

/// Counts for one section (`external` or `internal`) of the cache file.
#[derive(Debug, PartialEq)]
pub struct CacheSection {
    pub name: String,
    pub total: usize,
    /// Entries whose metadata recorded a failed lookup; these get rechecked.
    pub failures: usize,
    pub urls: Vec<String>,
}

pub trait RunReporter {
    /// Prints the resolved options before the proofer starts.
    fn report_options(&self, directory: &Path, options: &Options) -> Result<()>;

    /// Prints a summary of the proofer's cache after it finishes.
    fn report_cache(&self, cache_options: Option<&Value>) -> Result<()>;
}

/// A concrete implementation of `RunReporter` that prints to standard output.
///
/// The options dump is wrapped in a `<details>` block so it folds away in the
/// CI log and in job summaries.
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn format_options(&self, directory: &Path, options: &Options) -> Result<String> {
        let json = serde_json::to_string_pretty(options).context("Failed to serialize options")?;
        let shown = std::path::absolute(directory).unwrap_or_else(|_| directory.to_path_buf());
        Ok(format!(
            "<details><summary>HTMLProofer Options</summary>\n\
             Running in directory: {}\n\n\
             ```json\n{json}\n```\n\
             </details>\n",
            shown.display()
        ))
    }

    pub fn format_cache_summary(&self, sections: &[CacheSection]) -> String {
        let mut out = String::new();
        for section in sections {
            out.push_str(&format!(
                "{} cached: {} (failures rechecked: {})\n",
                section.name, section.total, section.failures
            ));
            for url in section.urls.iter().take(LISTED_URLS) {
                out.push_str(&format!("  - {url}\n"));
            }
            if section.total > LISTED_URLS {
                out.push_str(&format!("  ... and {} more\n", section.total - LISTED_URLS));
            }
        }
        out
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReporter for ConsoleReporter {
    fn report_options(&self, directory: &Path, options: &Options) -> Result<()> {
        println!("{}", self.format_options(directory, options)?);
        Ok(())
    }

    fn report_cache(&self, cache_options: Option<&Value>) -> Result<()> {
        let path = cache_path(cache_options);
        if !path.exists() {
            println!("Expected cache.json at {} but none was found", path.display());
            return Ok(());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let data: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        print!("{}", self.format_cache_summary(&summarize_cache(&data)));
        Ok(())
    }
}

/// Resolves `<storage_dir>/<cache_file>` from the `CACHE` options.
pub fn cache_path(cache_options: Option<&Value>) -> PathBuf {
    let setting = |key: &str| {
        cache_options
            .and_then(|c| c.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    let storage_dir = setting("storage_dir").unwrap_or(DEFAULT_STORAGE_DIR);
    let cache_file = setting("cache_file").unwrap_or(DEFAULT_CACHE_FILE);
    Path::new(storage_dir).join(cache_file)
}

/// Summarizes the `external` and `internal` sections of a cache document.
pub fn summarize_cache(data: &Value) -> Vec<CacheSection> {
    ["external", "internal"]
        .into_iter()
        .map(|name| {
            let items = data.get(name).and_then(Value::as_object);
            let (total, failures, urls) = match items {
                Some(items) => {
                    let failures = items
                        .values()
                        .filter(|entry| {
                            entry
                                .get("metadata")
                                .and_then(Value::as_array)
                                .is_some_and(|meta| {
                                    meta.iter().any(|m| m.get("found") == Some(&Value::Bool(false)))
                                })
                        })
                        .count();
                    (items.len(), failures, items.keys().cloned().collect())
                }
                None => (0, 0, Vec::new()),
            };
            CacheSection {
                name: name.to_string(),
                total,
                failures,
                urls,
            }
        })
        .collect()
}
