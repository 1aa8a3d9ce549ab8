use git2::{Delta, DiffFindOptions, DiffOptions, Repository};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

use crate::core::error::GitError;

/// Relative paths of files added or renamed since a base revision, in the
/// order git reports them.
pub type ChangeSet = Vec<String>;

/// Trait defining the local Git operations needed to find new files.
/// This abstraction allows the change detector to be tested without a repository.
pub trait GitClient {
    /// Lists files added or renamed between `base` and the working tree.
    fn added_files_since(&self, base: &str) -> Result<ChangeSet, GitError>;

    /// Returns the merge-base commit of `branch` and `HEAD`.
    fn merge_base(&self, branch: &str) -> Result<String, GitError>;
}

/// Concrete implementation of GitClient using the git2 crate.
pub struct Git2Client {
    repo: Repository,
}

impl Git2Client {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let repo = Repository::discover(path)?;
        Ok(Self { repo })
    }
}

impl GitClient for Git2Client {
    fn added_files_since(&self, base: &str) -> Result<ChangeSet, GitError> {
        let base_tree = self.repo.revparse_single(base)?.peel_to_tree()?;
        let mut options = DiffOptions::new();

        // Same comparison as `git diff <base>`: base tree against index + workdir.
        let mut diff = self
            .repo
            .diff_tree_to_workdir_with_index(Some(&base_tree), Some(&mut options))?;

        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let files = diff
            .deltas()
            .filter(|delta| matches!(delta.status(), Delta::Added | Delta::Renamed))
            .filter_map(|delta| delta.new_file().path())
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        Ok(files)
    }

    fn merge_base(&self, branch: &str) -> Result<String, GitError> {
        let branch_commit = self.repo.revparse_single(branch)?.peel_to_commit()?;
        let head_commit = self.repo.head()?.peel_to_commit()?;
        let base = self.repo.merge_base(branch_commit.id(), head_commit.id())?;
        Ok(base.to_string())
    }
}

/// Stand-in used when the working directory is not inside a repository.
/// Every operation fails with the reason the repository could not be opened.
pub struct NoRepository {
    reason: String,
}

impl NoRepository {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl GitClient for NoRepository {
    fn added_files_since(&self, _base: &str) -> Result<ChangeSet, GitError> {
        Err(GitError::MissingContext(self.reason.clone()))
    }

    fn merge_base(&self, _branch: &str) -> Result<String, GitError> {
        Err(GitError::MissingContext(self.reason.clone()))
    }
}

/// Trait for the hosting platform's "compare two refs" query.
pub trait CompareApi {
    /// Lists files added or renamed in `repository` between `base` and `head`.
    fn added_files(
        &self,
        repository: &str,
        base: &str,
        head: &str,
        token: &str,
    ) -> Result<ChangeSet, GitError>;
}

/// Queries the GitHub compare endpoint through the `gh` command-line client.
pub struct GhCompareApi {
    program: String,
}

impl GhCompareApi {
    pub fn new() -> Self {
        Self {
            program: "gh".to_string(),
        }
    }

    /// Uses a different executable in place of `gh`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GhCompareApi {
    fn default() -> Self {
        Self::new()
    }
}

impl CompareApi for GhCompareApi {
    fn added_files(
        &self,
        repository: &str,
        base: &str,
        head: &str,
        token: &str,
    ) -> Result<ChangeSet, GitError> {
        let endpoint = format!("repos/{repository}/compare/{base}...{head}");
        let command = format!("{} api {endpoint}", self.program);

        let output = Command::new(&self.program)
            .args(["api", "-H", "Accept: application/vnd.github+json", &endpoint])
            .env("GH_TOKEN", token)
            .output()
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_compare_response(&String::from_utf8_lossy(&output.stdout))
    }
}

#[derive(Debug, Deserialize)]
struct CompareResponse {
    #[serde(default)]
    files: Vec<CompareFile>,
}

#[derive(Debug, Deserialize)]
struct CompareFile {
    filename: String,
    status: String,
}

/// Extracts the added and renamed filenames from a compare API response body.
pub fn parse_compare_response(body: &str) -> Result<ChangeSet, GitError> {
    let response: CompareResponse = serde_json::from_str(body)?;
    Ok(response
        .files
        .into_iter()
        .filter(|f| f.status == "added" || f.status == "renamed")
        .map(|f| f.filename)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compare_response_filters_status() {
        let body = r#"{
            "status": "ahead",
            "files": [
                {"filename": "docs/new.html", "status": "added"},
                {"filename": "docs/old.html", "status": "modified"},
                {"filename": "docs/moved.md", "status": "renamed"},
                {"filename": "docs/gone.html", "status": "removed"}
            ]
        }"#;
        let files = parse_compare_response(body).unwrap();
        assert_eq!(files, vec!["docs/new.html", "docs/moved.md"]);
    }

    #[test]
    fn test_parse_compare_response_without_files() {
        assert!(parse_compare_response(r#"{"status": "identical"}"#)
            .unwrap()
            .is_empty());
        assert!(matches!(
            parse_compare_response("not json"),
            Err(GitError::Json(_))
        ));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let api = GhCompareApi::with_program("definitely-not-a-real-gh-binary");
        let err = api
            .added_files("owner/repo", "main", "feature", "token")
            .unwrap_err();
        assert!(matches!(err, GitError::Spawn { .. }));
    }
}
