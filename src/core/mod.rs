// This file is the module declaration file for the `core` module.
// In Rust, a `mod.rs` file within a directory (e.g., `src/core/`)
// serves two main purposes:
//
// 1. It declares the submodules contained within that directory.
// 2. It exposes these submodules to the parent module (`src/` in this case),
//    making them accessible to the entire crate.

// `changes` module:
// Finds the files added in the current change. It holds the `GitContext`
// read from the CI environment, the ordered pull-request / push / merge-base
// strategies, and the conversion of new file paths into ignore patterns.
pub mod changes;

// `config` module:
// This module is responsible for reading the action's `INPUT_*` settings.
// It defines the `EnvSnapshot` taken once at start-up and the
// `ConfigResolver` that performs typed, alias-aware lookups on it.
pub mod config;

// `error` module:
// Typed errors for configuration mistakes (fatal) and git failures (logged
// and degraded to an empty change set).
pub mod error;

// `git` module:
// The `GitClient` and `CompareApi` traits and their libgit2 / `gh`
// implementations.
pub mod git;

// `proofer` module:
// The `LinkChecker` trait and the `htmlproofer` command-line collaborator
// that receives the resolved options.
pub mod proofer;
