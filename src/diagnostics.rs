//! Missing-dependency diagnostics
//!
//! Two independent signatures are recognised in raw build output:
//!
//! - the canonical compiler message `fatal error: X: No such file or directory`
//! - `#include <X>` lines, but only shortly after a line that mentions an error
//!   (compilers echo the offending include there). This is a weaker signal and
//!   is ignored everywhere else so that ordinary source listings stay quiet.
//!
//! The result is the de-duplicated union of both.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// How many lines after an error line an `#include <...>` still counts
const INCLUDE_CONTEXT_LINES: usize = 3;

static FATAL_MISSING_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"fatal error: (.+?): No such file or directory").expect("valid regex")
});

static INCLUDE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\s*include\s*<([^>\s]+)>").expect("valid regex"));

static ERROR_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\berror\b").expect("valid regex"));

/// Extract unresolved symbols (header or file names) from build output
pub fn extract(output: &str) -> BTreeSet<String> {
    let mut symbols: BTreeSet<String> = FATAL_MISSING_FILE
        .captures_iter(output)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let mut lines_since_error: Option<usize> = None;
    for line in output.lines() {
        if ERROR_MARKER.is_match(line) {
            lines_since_error = Some(0);
        } else if let Some(n) = lines_since_error.as_mut() {
            *n += 1;
        }

        let in_error_context = matches!(lines_since_error, Some(n) if n <= INCLUDE_CONTEXT_LINES);
        if !in_error_context {
            continue;
        }
        for caps in INCLUDE_LINE.captures_iter(line) {
            if let Some(m) = caps.get(1) {
                symbols.insert(m.as_str().to_string());
            }
        }
    }

    symbols
}

/// True when the output carries at least one missing-dependency signature
pub fn has_missing_dependency(output: &str) -> bool {
    !extract(output).is_empty()
}
