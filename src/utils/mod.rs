use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

use crate::builders::options::OptionsBuilder;
use crate::builders::reporter::{ConsoleReporter, RunReporter};
use crate::builders::validator::{OptionsValidator, StandardValidator};
use crate::core::changes::{ChangeDetector, GitContext, to_ignore_patterns};
use crate::core::config::EnvSnapshot;
use crate::core::git::{GhCompareApi, Git2Client, GitClient, NoRepository};
use crate::core::proofer::{CheckOutcome, HtmlProoferCli, LinkChecker};

/// Resolves the options, prints them, and runs `htmlproofer` on the site.
pub fn run(env: &EnvSnapshot) -> Result<()> {
    let detector = change_detector();
    let outcome = run_with(env, &detector, &HtmlProoferCli::new(), &ConsoleReporter::new())?;
    match outcome {
        CheckOutcome::Passed => Ok(()),
        CheckOutcome::Failed(reason) => anyhow::bail!("HTML checks failed: {reason}"),
    }
}

/// The run flow with every collaborator injected.
///
/// Configuration errors (including an empty check list) are returned before
/// the checker is invoked. A failed check is an `Ok(CheckOutcome::Failed)`.
pub fn run_with(
    env: &EnvSnapshot,
    detector: &ChangeDetector,
    checker: &dyn LinkChecker,
    reporter: &dyn RunReporter,
) -> Result<CheckOutcome> {
    let options = OptionsBuilder::new(env, detector)
        .resolve()
        .context("Invalid action configuration")?;
    let directory = Path::new(&options.directory);
    reporter.report_options(directory, &options)?;

    let validator = StandardValidator::new();
    for issue in validator.lint(&options) {
        warn!("{issue}");
    }
    validator.validate(&options)?;

    let outcome = checker.check(directory, &options)?;
    if options.cache.is_some() {
        reporter.report_cache(options.cache.as_ref())?;
    }
    Ok(outcome)
}

/// Prints the resolved options without running any checks.
pub fn print_options(env: &EnvSnapshot) -> Result<()> {
    let detector = change_detector();
    let options = OptionsBuilder::new(env, &detector)
        .resolve()
        .context("Invalid action configuration")?;
    ConsoleReporter::new().report_options(Path::new(&options.directory), &options)
}

/// Prints the newly added files and the ignore pattern derived from each.
pub fn print_new_files(env: &EnvSnapshot) -> Result<()> {
    let context = GitContext::from_env(env);
    let files = change_detector().detect(&context);
    if files.is_empty() {
        println!("No new files found.");
        return Ok(());
    }

    for file in &files {
        println!("📄 {file}");
        for pattern in to_ignore_patterns(std::slice::from_ref(file)) {
            println!("  └─ {pattern}");
        }
    }
    Ok(())
}

// Helper function to create a ChangeDetector for the current checkout
fn change_detector() -> ChangeDetector {
    let git: Box<dyn GitClient> = match Git2Client::new(".") {
        Ok(client) => Box::new(client),
        Err(e) => Box::new(NoRepository::new(format!("not a git repository: {e}"))),
    };
    ChangeDetector::new(git, Box::new(GhCompareApi::new()))
}
