//! Shell-style wildcard matching of capability nodes.
//!
//! Patterns use glob syntax applied to the whole node string:
//!
//! - `*` matches any run of characters, including `.` and the empty run
//! - `?` matches exactly one character
//! - `[...]` matches one character from a class; `[!...]` negates it
//!
//! Matching is case-sensitive. A pattern without metacharacters is compared
//! by plain string equality. A malformed pattern matches nothing.
//!
//! A run of `*` is the same as a single `*`: `chat.**` matches `chat.send`,
//! and `**` never takes on a recursive path meaning.

use std::borrow::Cow;

use glob::{MatchOptions, Pattern};

use warden_contracts::error::{WardenError, WardenResult};

/// Dots are ordinary characters in a node, so no separator or leading-dot
/// rules apply.
const NODE_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Return true if `node` matches `pattern`.
pub fn matches(pattern: &str, node: &str) -> bool {
    if !is_wildcard(pattern) {
        return pattern == node;
    }
    match Pattern::new(&collapse_stars(pattern)) {
        Ok(compiled) => compiled.matches_with(node, NODE_MATCH),
        Err(_) => false,
    }
}

/// Return true if `pattern` contains any glob metacharacter.
pub fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Check that `pattern` is well-formed.
///
/// Returns `WardenError::InvalidPattern` describing the syntax problem.
pub fn validate(pattern: &str) -> WardenResult<()> {
    if !is_wildcard(pattern) {
        return Ok(());
    }
    Pattern::new(&collapse_stars(pattern))
        .map(|_| ())
        .map_err(|e| WardenError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.msg.to_string(),
        })
}

/// Replace every run of consecutive `*` with one `*`.
fn collapse_stars(pattern: &str) -> Cow<'_, str> {
    if !pattern.contains("**") {
        return Cow::Borrowed(pattern);
    }
    let mut out = String::with_capacity(pattern.len());
    let mut previous_star = false;
    for c in pattern.chars() {
        if c == '*' && previous_star {
            continue;
        }
        previous_star = c == '*';
        out.push(c);
    }
    Cow::Owned(out)
}
