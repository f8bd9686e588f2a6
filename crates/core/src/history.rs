// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! A single past launch attempt, as surfaced by the `tokens.history` API
//! method. Kept separate from [`crate::Token`] since a history entry is a
//! record of what happened, not a live scan in flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::token::Token;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub token_type: String,
    pub uid: String,
    pub text: String,
    pub data: String,
    pub success: bool,
}

impl HistoryEntry {
    pub fn new(token: &Token, success: bool) -> Self {
        Self {
            time: token.scan_time,
            token_type: token.token_type.clone(),
            uid: token.uid.clone(),
            text: token.text.clone(),
            data: token.data.clone(),
            success,
        }
    }
}
