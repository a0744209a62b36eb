//! TICKscript interval rewriting
//!
//! Batch tasks poll on `.every(<duration>)`. Rewriting every such directive to
//! `.every(1s)` makes a loaded batch task fire immediately, which is what
//! callers polling [`crate::KapacitorClient::status`] want.

use lazy_static::lazy_static;
use regex::Regex;

/// The directive every `.every(...)` is rewritten to.
pub const NORMALIZED_EVERY: &str = ".every(1s)";

lazy_static! {
    static ref EVERY_DIRECTIVE: Regex = Regex::new(r"\.every\(\d+[smhdw]\)").unwrap();
}

/// Replace every `.every(<n><unit>)` directive in `script` with `.every(1s)`.
///
/// The match is lexical. Text outside the directives, including other property
/// calls such as `.period(5m)` and quoted query blocks, is left untouched.
pub fn normalize_intervals(script: &str) -> String {
    EVERY_DIRECTIVE
        .replace_all(script, NORMALIZED_EVERY)
        .into_owned()
}
