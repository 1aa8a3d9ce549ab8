// This file is the module declaration file for the `builders` module.
// It declares and makes public all the sub-modules within the `src/builders`
// directory. These modules turn resolved settings into the `Options` value.

// The `pub mod options;` declaration exposes the `options` module.
//
// `options` module:
// Defines the `Options` record handed to the proofer, its defaults, and the
// `OptionsBuilder` that composes settings, patterns and new-file ignores.
pub mod options;

// The `pub mod patterns;` declaration exposes the `patterns` module.
//
// `patterns` module:
// This is a fundamental module that defines the `Pattern` type (literal or
// regex), the `PatternMatcher` trait, swap rules, and the `PatternParser`
// that reads pattern lists and `pattern:replacement` maps.
pub mod patterns;

// The `pub mod reporter;` declaration exposes the `reporter` module.
//
// `reporter` module:
// Prints the resolved options before a run and the cache summary after it.
pub mod reporter;

// The `pub mod validator;` declaration exposes the `validator` module.
//
// `validator` module:
// Rejects options that would check nothing and lists suspicious settings.
pub mod validator;
