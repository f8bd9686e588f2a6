// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The mapping resolver: turns a scanned [`Token`] into a ZapScript to run,
//! consulting three layers in order and stopping at the first match —
//! user-editable database mappings, then config-file mappings, then
//! whatever the platform hard-codes.

use zt_config::Instance;
use zt_core::{
    mapping_type_from_token_key, match_type_from_pattern, normalize_uid, MappingType, MatchType,
    Platform, Token,
};

use crate::store::MappingStore;

/// Resolves `token` to an override ZapScript string, or `None` if nothing
/// in any layer matches (the caller falls back to launching the token's
/// own text as ZapScript).
pub fn resolve(
    token: &Token,
    db: &dyn MappingStore,
    cfg: &Instance,
    platform: &dyn Platform,
) -> Option<String> {
    for mapping in db.list() {
        if !mapping.enabled {
            continue;
        }
        if field_matches(token, mapping.mapping_type, mapping.match_type, &mapping.pattern) {
            return Some(mapping.override_text);
        }
    }

    for entry in cfg.mapping_entries() {
        let mapping_type = mapping_type_from_token_key(&entry.token_key);
        let (match_type, pattern) = match_type_from_pattern(&entry.match_pattern);
        if field_matches(token, mapping_type, match_type, &pattern) {
            return Some(entry.zapscript);
        }
    }

    let (override_text, matched) = platform.lookup_mapping(cfg, token);
    matched.then_some(override_text)
}

fn token_field(token: &Token, mapping_type: MappingType) -> String {
    match mapping_type {
        MappingType::Uid => normalize_uid(&token.uid),
        MappingType::Text => token.text.clone(),
        MappingType::Data => token.data.clone(),
    }
}

/// Only the token's own field is normalized for UID mappings — the stored
/// pattern is compared as written, matching the reference implementation's
/// `NormalizeUid(t.UID) == m.Pattern` (patterns are expected pre-normalized
/// by whoever created the mapping).
fn field_matches(token: &Token, mapping_type: MappingType, match_type: MatchType, pattern: &str) -> bool {
    let field = token_field(token, mapping_type);

    match match_type {
        MatchType::Exact => field == pattern,
        MatchType::Partial => !pattern.is_empty() && field.contains(pattern),
        MatchType::Regex => match regex::Regex::new(pattern) {
            Ok(re) => re.is_match(&field),
            Err(e) => {
                tracing::warn!(pattern, error = %e, "invalid mapping regex, skipping");
                false
            }
        },
    }
}
