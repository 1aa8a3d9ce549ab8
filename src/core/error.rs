use thiserror::Error;

/// Errors raised while turning `INPUT_*` settings into `Options`.
///
/// Every variant is an authoring mistake in the CI configuration, so these
/// always abort the run before the checker is invoked.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A swap entry without an unescaped `:` separating pattern and replacement.
    #[error("Malformed swap entry '{entry}': expected 'pattern:replacement'")]
    MalformedSwapEntry { entry: String },

    /// A pattern that the regex engine refused to compile.
    #[error("Invalid regular expression '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Every check toggle resolved to false.
    #[error("No checks run")]
    NoChecksSelected,
}

/// Errors raised while discovering newly added files.
///
/// None of these are fatal: the change detector logs them and falls back to
/// an empty change set.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("missing CI context: {0}")]
    MissingContext(String),

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Libgit2(#[from] git2::Error),

    #[error("unreadable event payload: {0}")]
    EventPayload(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
