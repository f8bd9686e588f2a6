// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The [`Token`] type: the atomic unit flowing through the dispatch pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single scan event, or its cached representation in shared state.
///
/// `scan_time` of the Unix epoch (the [`Default`] value) means "no token" —
/// mirrors the zero-value `time.Time` check used upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub data: String,
    #[serde(rename = "type", default)]
    pub token_type: String,
    #[serde(default = "default_scan_time")]
    pub scan_time: DateTime<Utc>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_scan_time() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_default()
}

impl Default for Token {
    fn default() -> Self {
        Self {
            uid: String::new(),
            text: String::new(),
            data: String::new(),
            token_type: String::new(),
            scan_time: default_scan_time(),
            remote: false,
            error: None,
        }
    }
}

impl Token {
    pub fn now(uid: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            text: text.into(),
            scan_time: Utc::now(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scan_time == default_scan_time()
    }

    /// Dedup/equality semantics from the spec: `UID == UID ∧ Text == Text`.
    /// Deliberately ignores `data`, `token_type`, `scan_time`, `remote` and
    /// `error` — two scans of the same physical token a second apart are
    /// still "the same token" for pipeline purposes.
    pub fn scan_eq(&self, other: &Token) -> bool {
        self.uid == other.uid && self.text == other.text
    }
}

/// Compares two optional scans (`None` represents "token removed") using
/// [`Token::scan_eq`].
pub fn scans_equal(a: Option<&Token>, b: Option<&Token>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.scan_eq(b),
        _ => false,
    }
}

/// Normalizes a UID for comparison: lowercases it and strips `:` and
/// whitespace. Idempotent: `normalize_uid(normalize_uid(s)) == normalize_uid(s)`.
pub fn normalize_uid(uid: &str) -> String {
    uid.chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// NFC-normalizes token text the way the API layer does for remote-originated
/// scans, so `"café"` in NFD and NFC form resolve identically.
pub fn nfc_normalize(text: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    text.nfc().collect()
}
