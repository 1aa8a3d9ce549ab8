use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::builders::options::Options;
use crate::builders::patterns::Pattern;

/// Result of handing the options to a link checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Failed(String),
}

/// The external HTML checker that consumes the resolved options.
pub trait LinkChecker {
    fn check(&self, directory: &Path, options: &Options) -> Result<CheckOutcome>;
}

/// Runs the `htmlproofer` executable with the options as command-line flags.
pub struct HtmlProoferCli {
    program: String,
}

impl HtmlProoferCli {
    pub fn new() -> Self {
        Self {
            program: "htmlproofer".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Translates `options` into `htmlproofer` arguments, directory last.
    pub fn arguments(&self, directory: &Path, options: &Options) -> Result<Vec<String>> {
        let mut args = Vec::new();
        let mut flag = |name: &str, value: String| args.push(format!("--{name}={value}"));

        let checks: Vec<String> = options.checks.iter().map(|c| c.to_string()).collect();
        flag("checks", checks.join(","));
        flag("allow-hash-href", options.allow_hash_href.to_string());
        flag("allow-missing-href", options.allow_missing_href.to_string());
        flag("assume-extension", options.assume_extension.clone());
        flag("check-external-hash", options.check_external_hash.to_string());
        flag("check-internal-hash", options.check_internal_hash.to_string());
        flag("check-sri", options.check_sri.to_string());
        flag("directory-index-file", options.directory_index_file.clone());
        flag("disable-external", options.disable_external.to_string());
        flag("enforce-https", options.enforce_https.to_string());
        flag("ignore-empty-alt", options.ignore_empty_alt.to_string());
        flag("ignore-empty-mailto", options.ignore_empty_mailto.to_string());
        flag("ignore-missing-alt", options.ignore_missing_alt.to_string());

        if !options.extensions.is_empty() {
            flag("extensions", options.extensions.join(","));
        }
        if !options.ignore_files.is_empty() {
            flag("ignore-files", join_patterns("ignore-files", &options.ignore_files));
        }
        if !options.ignore_urls.is_empty() {
            flag("ignore-urls", join_patterns("ignore-urls", &options.ignore_urls));
        }
        if !options.ignore_status_codes.is_empty() {
            let codes: Vec<String> = options
                .ignore_status_codes
                .iter()
                .map(i64::to_string)
                .collect();
            flag("ignore-status-codes", codes.join(","));
        }
        if !options.swap_urls.is_empty() {
            let swaps: Vec<String> = options
                .swap_urls
                .rules()
                .iter()
                .map(|rule| {
                    format!(
                        "{}:{}",
                        rule.pattern.as_str().replace(':', "\\:"),
                        rule.replacement.replace(':', "\\:")
                    )
                })
                .collect();
            warn_on_commas("swap-urls", &swaps);
            flag("swap-urls", swaps.join(","));
        }

        flag(
            "hydra",
            serde_json::to_string(&options.hydra).context("Failed to serialize hydra options")?,
        );
        flag(
            "typhoeus",
            serde_json::to_string(&options.typhoeus)
                .context("Failed to serialize typhoeus options")?,
        );
        if let Some(cache) = &options.cache {
            flag(
                "cache",
                serde_json::to_string(cache).context("Failed to serialize cache options")?,
            );
        }

        args.push(directory.display().to_string());
        Ok(args)
    }
}

impl Default for HtmlProoferCli {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkChecker for HtmlProoferCli {
    fn check(&self, directory: &Path, options: &Options) -> Result<CheckOutcome> {
        let args = self.arguments(directory, options)?;
        info!("Running {} on {}", self.program, directory.display());
        debug!("{} {}", self.program, args.join(" "));

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .with_context(|| format!("Failed to run {}", self.program))?;

        if status.success() {
            Ok(CheckOutcome::Passed)
        } else {
            Ok(CheckOutcome::Failed(format!(
                "{} exited with {status}",
                self.program
            )))
        }
    }
}

fn join_patterns(name: &str, patterns: &[Pattern]) -> String {
    let entries: Vec<String> = patterns.iter().map(Pattern::to_string).collect();
    warn_on_commas(name, &entries);
    entries.join(",")
}

/// `htmlproofer` splits list flags on every comma.
fn warn_on_commas(name: &str, entries: &[String]) {
    for entry in entries.iter().filter(|e| e.contains(',')) {
        warn!("--{name} entry {entry} contains a comma and will be split by htmlproofer");
    }
}
