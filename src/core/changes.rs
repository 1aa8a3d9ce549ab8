use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::builders::patterns::Pattern;
use crate::core::config::EnvSnapshot;
use crate::core::error::GitError;
pub use crate::core::git::ChangeSet;
use crate::core::git::{CompareApi, GitClient};

/// Branch used for the merge-base fallback when `BASE_BRANCH` is not set.
pub const DEFAULT_BASE_BRANCH: &str = "origin/main";

/// `before` SHA GitHub reports for a push that created the branch.
const NULL_SHA: &str = "0000000000000000000000000000000000000000";

/// The kind of CI event that triggered the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PullRequest,
    Push,
    None,
}

impl EventKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "pull_request" | "pull_request_target" => EventKind::PullRequest,
            "push" => EventKind::Push,
            _ => EventKind::None,
        }
    }
}

/// Everything the change strategies know about the CI run.
///
/// All fields are optional. A missing field only makes the strategy that
/// needs it inapplicable.
#[derive(Debug, Clone, PartialEq)]
pub struct GitContext {
    pub event: EventKind,
    pub event_path: Option<PathBuf>,
    pub before_sha: Option<String>,
    pub base_ref: Option<String>,
    pub head_ref: Option<String>,
    pub repository: Option<String>,
    pub token: Option<String>,
    pub base_branch: String,
}

impl Default for GitContext {
    fn default() -> Self {
        Self {
            event: EventKind::None,
            event_path: None,
            before_sha: None,
            base_ref: None,
            head_ref: None,
            repository: None,
            token: None,
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
        }
    }
}

impl GitContext {
    /// Reads the GitHub Actions variables from an environment snapshot.
    pub fn from_env(env: &EnvSnapshot) -> Self {
        let owned = |key: &str| env.non_empty(key).map(str::to_string);
        Self {
            event: env
                .non_empty("GITHUB_EVENT_NAME")
                .map_or(EventKind::None, EventKind::parse),
            event_path: env.non_empty("GITHUB_EVENT_PATH").map(PathBuf::from),
            before_sha: owned("GITHUB_EVENT_BEFORE"),
            base_ref: owned("GITHUB_BASE_REF"),
            head_ref: owned("GITHUB_HEAD_REF"),
            repository: owned("GITHUB_REPOSITORY"),
            token: owned("GITHUB_TOKEN").or_else(|| owned("GH_TOKEN")),
            base_branch: owned("BASE_BRANCH").unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string()),
        }
    }
}

/// What a single strategy decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    /// The strategy does not apply to this context; try the next one.
    Inapplicable,
    /// The strategy applied. Its result is final, even when empty.
    Resolved(ChangeSet),
}

/// The ways of finding new files, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStrategy {
    /// Ask the hosting platform to compare the pull request's base and head.
    PullRequest,
    /// Diff the working tree against the commit before the push.
    Push,
    /// Diff the working tree against the merge-base with the base branch.
    MergeBase,
}

impl ChangeStrategy {
    pub const ORDER: [ChangeStrategy; 3] = [
        ChangeStrategy::PullRequest,
        ChangeStrategy::Push,
        ChangeStrategy::MergeBase,
    ];

    pub fn attempt(
        self,
        context: &GitContext,
        git: &dyn GitClient,
        compare: &dyn CompareApi,
    ) -> StrategyOutcome {
        match self {
            ChangeStrategy::PullRequest => pull_request_strategy(context, compare),
            ChangeStrategy::Push => push_strategy(context, git),
            ChangeStrategy::MergeBase => merge_base_strategy(context, git),
        }
    }
}

fn pull_request_strategy(context: &GitContext, compare: &dyn CompareApi) -> StrategyOutcome {
    if context.event != EventKind::PullRequest {
        return StrategyOutcome::Inapplicable;
    }

    let (base, head) = match pull_request_refs(context) {
        Ok(refs) => refs,
        Err(e) => {
            warn!("{e}; falling back to local git history");
            return StrategyOutcome::Inapplicable;
        }
    };
    let (Some(repository), Some(token)) = (&context.repository, &context.token) else {
        warn!(
            "{}; falling back to local git history",
            GitError::MissingContext("pull request needs a repository and a token".to_string())
        );
        return StrategyOutcome::Inapplicable;
    };

    info!("Comparing {base}...{head} in {repository}");
    match compare.added_files(repository, &base, &head, token) {
        Ok(files) => StrategyOutcome::Resolved(files),
        Err(e) => {
            warn!("Failed to query changed files. {e}");
            StrategyOutcome::Resolved(ChangeSet::new())
        }
    }
}

/// Base and head refs from the context, completed from the event payload
/// when the ref variables are absent.
fn pull_request_refs(context: &GitContext) -> Result<(String, String), GitError> {
    if let (Some(base), Some(head)) = (&context.base_ref, &context.head_ref) {
        return Ok((base.clone(), head.clone()));
    }

    let path = context.event_path.as_deref().ok_or_else(|| {
        GitError::MissingContext("pull request needs base and head refs".to_string())
    })?;
    let (payload_base, payload_head) = read_event_shas(path)?;

    let base = context.base_ref.clone().or(payload_base);
    let head = context.head_ref.clone().or(payload_head);
    match (base, head) {
        (Some(base), Some(head)) => Ok((base, head)),
        _ => Err(GitError::MissingContext(
            "pull request needs base and head refs".to_string(),
        )),
    }
}

/// Reads `pull_request.base.sha` and `pull_request.head.sha` from an event payload.
pub fn read_event_shas(path: &Path) -> Result<(Option<String>, Option<String>), GitError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| GitError::EventPayload(format!("{}: {e}", path.display())))?;
    let event: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| GitError::EventPayload(format!("{}: {e}", path.display())))?;

    let sha = |pointer: &str| {
        event
            .pointer(pointer)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Ok((sha("/pull_request/base/sha"), sha("/pull_request/head/sha")))
}

fn push_strategy(context: &GitContext, git: &dyn GitClient) -> StrategyOutcome {
    if context.event != EventKind::Push {
        return StrategyOutcome::Inapplicable;
    }
    let Some(before) = context.before_sha.as_deref().filter(|sha| *sha != NULL_SHA) else {
        return StrategyOutcome::Inapplicable;
    };

    StrategyOutcome::Resolved(diff_or_empty(git, before))
}

fn merge_base_strategy(context: &GitContext, git: &dyn GitClient) -> StrategyOutcome {
    match git.merge_base(&context.base_branch) {
        Ok(base) => StrategyOutcome::Resolved(diff_or_empty(git, &base)),
        Err(e) => {
            warn!(
                "Failed to determine base SHA from {}. {e}",
                context.base_branch
            );
            StrategyOutcome::Resolved(ChangeSet::new())
        }
    }
}

fn diff_or_empty(git: &dyn GitClient, base: &str) -> ChangeSet {
    match git.added_files_since(base) {
        Ok(files) => files,
        Err(e) => {
            warn!("Failed to get diff of new files. {e}");
            ChangeSet::new()
        }
    }
}

/// Finds the files added in the current change.
///
/// Strategies run in `ChangeStrategy::ORDER`; the first applicable one decides
/// the result. Failures never propagate: they are logged and yield an empty
/// change set.
pub struct ChangeDetector {
    git: Box<dyn GitClient>,
    compare: Box<dyn CompareApi>,
}

impl ChangeDetector {
    pub fn new(git: Box<dyn GitClient>, compare: Box<dyn CompareApi>) -> Self {
        Self { git, compare }
    }

    pub fn detect(&self, context: &GitContext) -> ChangeSet {
        info!("Getting new files...");
        for strategy in ChangeStrategy::ORDER {
            if let StrategyOutcome::Resolved(files) =
                strategy.attempt(context, self.git.as_ref(), self.compare.as_ref())
            {
                debug!("{strategy:?} strategy found {} new file(s)", files.len());
                for file in &files {
                    debug!("  {file}");
                }
                return files;
            }
        }
        ChangeSet::new()
    }
}

/// Builds case-insensitive URL patterns for newly added files.
///
/// `docs/about.md` yields a pattern matching `.../about.md`, `.../about.html`,
/// `.../about.htm` and `.../about/index.html`.
pub fn to_ignore_patterns(changes: &[String]) -> Vec<Pattern> {
    changes
        .iter()
        .filter_map(|file| {
            let path = Path::new(file);
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stem = match path.extension() {
                Some(_) => path.file_stem(),
                None => path.file_name(),
            }
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

            // The flag lives in the source so it survives rendering as `/.../`.
            let source = format!(
                r"(?i).*{}(/index)?\.({}|html?)$",
                regex::escape(&stem),
                regex::escape(&extension)
            );
            match Pattern::regex(&source) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Skipping ignore pattern for {file}: {e}");
                    None
                }
            }
        })
        .collect()
}
