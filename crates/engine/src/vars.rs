// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `${name}` interpolation for stage command templates

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex pattern for ${variable_name}
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("constant regex pattern is valid")
});

/// Wrap a value in single quotes for bash, escaping embedded single quotes
/// with the `'\''` idiom.
pub fn quote_for_shell(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Substitute `${name}` placeholders with single-quoted values.
///
/// Unknown names are left as-is so bash can expand them from the
/// environment (e.g. `${MP_PREPROCESSOR_URL}`).
pub fn interpolate_shell(template: &str, vars: &HashMap<&str, String>) -> String {
    VAR_PATTERN
        .replace_all(template, |caps: &regex::Captures| match vars.get(&caps[1]) {
            Some(value) => quote_for_shell(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
