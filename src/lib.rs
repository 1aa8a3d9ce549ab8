//! Resolves the settings of an HTML-Proofer CI step from `INPUT_*`
//! environment variables and, on request, ignores links to pages added in
//! the current change.

pub mod builders;
pub mod core;
pub mod utils;
