use std::collections::HashSet;

use crate::builders::options::Options;
use crate::builders::patterns::Pattern;
use crate::core::error::ConfigError;

/// The `OptionsValidator` trait defines the checks run on resolved options
/// before they are handed to the proofer.
pub trait OptionsValidator {
    /// Fails on settings that make the run meaningless.
    ///
    /// # Errors
    /// `ConfigError::NoChecksSelected` when every check toggle is off.
    fn validate(&self, options: &Options) -> Result<(), ConfigError>;

    /// Lists settings that are valid but probably a mistake.
    ///
    /// # Returns
    /// A `Vec<String>` where each string describes one issue.
    fn lint(&self, options: &Options) -> Vec<String>;
}

/// The `StandardValidator` is the validator used by every run.
pub struct StandardValidator;

impl StandardValidator {
    pub fn new() -> Self {
        Self
    }

    /// Flags ignore patterns that would ignore every URL, and duplicates.
    fn check_ignore_patterns(&self, label: &str, patterns: &[Pattern]) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for pattern in patterns {
            let text = pattern.to_string();
            if !seen.insert(text.clone()) {
                warnings.push(format!("Duplicate {label} pattern {text}"));
            }
            if let Pattern::Regex(re) = pattern
                && matches!(re.as_str(), "" | ".*" | "^" | ".")
            {
                warnings.push(format!("{label} pattern {text} matches everything"));
            }
            if let Pattern::Literal(literal) = pattern
                && literal.trim().is_empty()
            {
                warnings.push(format!("Empty {label} entry will match nothing"));
            }
        }
        warnings
    }
}

impl Default for StandardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionsValidator for StandardValidator {
    fn validate(&self, options: &Options) -> Result<(), ConfigError> {
        if options.checks.is_empty() {
            return Err(ConfigError::NoChecksSelected);
        }
        Ok(())
    }

    fn lint(&self, options: &Options) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.check_ignore_patterns("IGNORE_URLS", &options.ignore_urls));
        issues.extend(self.check_ignore_patterns("IGNORE_FILES", &options.ignore_files));

        if options.extensions.is_empty() {
            issues.push("EXTENSIONS is empty, no files will be checked".to_string());
        }
        if options.hydra.max_concurrency <= 0 {
            issues.push(format!(
                "MAX_CONCURRENCY is {}, expected a positive number",
                options.hydra.max_concurrency
            ));
        }
        if options.typhoeus.timeout < 0 || options.typhoeus.connecttimeout < 0 {
            issues.push("Negative TIMEOUT or CONNECT_TIMEOUT".to_string());
        }
        for code in &options.ignore_status_codes {
            if !(100..=599).contains(code) {
                issues.push(format!("IGNORE_STATUS_CODES entry {code} is not an HTTP status"));
            }
        }

        issues
    }
}
