// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! Precompiled allow-list of regexes, used for `zapscript.allow_execute`,
//! `service.allow_run` and `launchers.allow_file`.
//!
//! Invalid patterns are logged and dropped rather than rejecting the whole
//! config: a typo in one allow-list entry should not stop the service
//! from starting.

use regex::Regex;

#[derive(Debug, Clone, Default)]
pub struct RegexList {
    compiled: Vec<Regex>,
}

impl RegexList {
    pub fn compile(patterns: &[String]) -> Self {
        let compiled = patterns
            .iter()
            .filter_map(|p| {
                // "*" is a common shorthand for "match anything" in these
                // allow-lists, but it is not a valid standalone regex (a
                // repetition operator with nothing to repeat) — special-case
                // it to the equivalent regex rather than let it fall through
                // to the invalid-pattern branch below.
                let pattern = if p == "*" { "^.*$" } else { p.as_str() };
                match Regex::new(pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        tracing::warn!(pattern = %p, error = %e, "skipping invalid allow-list pattern");
                        None
                    }
                }
            })
            .collect();
        Self { compiled }
    }

    /// An empty allow-list denies everything, matching the spec's
    /// "empty allow-list = deny" rule.
    pub fn is_allowed(&self, candidate: &str) -> bool {
        !self.compiled.is_empty() && self.compiled.iter().any(|re| re.is_match(candidate))
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}
