/// The Big IDEA:
/// A docs site checked by HTML-Proofer on every pull request keeps failing
/// for the same boring reason: a new page links to another new page, and the
/// link points at the published URL, which does not exist until the change
/// is merged. This tool resolves the proofer's settings from the `INPUT_*`
/// variables a CI step provides and, when asked, ignores links to the pages
/// that the current change adds.
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use htmlproofer_action::core::config::EnvSnapshot;
use htmlproofer_action::utils;

#[derive(Parser)]
#[command(name = "htmlproofer-action")]
#[command(about = "Run HTML-Proofer with settings taken from CI inputs")]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Site directory, overriding INPUT_DIRECTORY
    #[arg(short, long, global = true)]
    directory: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the options and run htmlproofer (default)
    Run,
    /// Print the resolved options without checking anything
    Options,
    /// List files added in this change and their ignore patterns
    NewFiles,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut env = EnvSnapshot::from_process();
    if let Some(directory) = cli.directory {
        env = env.with("INPUT_DIRECTORY", directory);
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => utils::run(&env),
        Commands::Options => utils::print_options(&env),
        Commands::NewFiles => utils::print_new_files(&env),
    }
}
