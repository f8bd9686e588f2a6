// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! A [`Mapping`] translates a token field into a ZapScript override.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingType {
    Uid,
    Text,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Partial,
    Regex,
}

/// A single rule in the layered mapping table: database-sourced mappings
/// are user-editable, config-sourced ones come from TOML, platform mappings
/// are hard-coded hooks (see [`crate::platform::Platform::lookup_mapping`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub mapping_type: MappingType,
    #[serde(rename = "match")]
    pub match_type: MatchType,
    pub pattern: String,
    pub override_text: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Mapping {
    pub fn new(
        mapping_type: MappingType,
        match_type: MatchType,
        pattern: impl Into<String>,
        override_text: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            mapping_type,
            match_type,
            pattern: pattern.into(),
            override_text: override_text.into(),
            enabled: true,
        }
    }
}

/// Parses a TOML `mappings.entry.token_key` into a [`MappingType`]. Mirrors
/// the original `token_key` convention: `"data"` -> data, `"value"` -> text,
/// anything else (including empty) -> uid.
pub fn mapping_type_from_token_key(token_key: &str) -> MappingType {
    match token_key {
        "data" => MappingType::Data,
        "value" => MappingType::Text,
        _ => MappingType::Uid,
    }
}

/// Parses a TOML `mappings.entry.match_pattern` into a (match type, bare
/// pattern) pair: `/regex/` is a regex, a pattern containing `*` is treated
/// as partial (with the asterisks stripped), anything else is exact.
pub fn match_type_from_pattern(pattern: &str) -> (MatchType, String) {
    if pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        (
            MatchType::Regex,
            pattern[1..pattern.len() - 1].to_string(),
        )
    } else if pattern.contains('*') {
        (MatchType::Partial, pattern.replace('*', ""))
    } else {
        (MatchType::Exact, pattern.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_key_maps_to_type() {
        assert_eq!(mapping_type_from_token_key("data"), MappingType::Data);
        assert_eq!(mapping_type_from_token_key("value"), MappingType::Text);
        assert_eq!(mapping_type_from_token_key(""), MappingType::Uid);
        assert_eq!(mapping_type_from_token_key("uid"), MappingType::Uid);
    }

    use yare::parameterized;

    #[parameterized(
        regex = { "/^04.*$/", MatchType::Regex, "^04.*$" },
        partial = { "04*", MatchType::Partial, "04" },
        exact = { "04a1b2", MatchType::Exact, "04a1b2" },
        bare_slashes_too_short_for_regex = { "/", MatchType::Exact, "/" },
    )]
    fn pattern_parses_to_match_type_and_bare_pattern(input: &str, expected_type: MatchType, expected_pattern: &str) {
        let (m, p) = match_type_from_pattern(input);
        assert_eq!(m, expected_type);
        assert_eq!(p, expected_pattern);
    }
}
