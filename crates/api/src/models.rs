// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! Wire types for the JSON-RPC 2.0 transport and the method table's
//! request/response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use zt_core::{HistoryEntry, Mapping, MappingType, MatchType, Token};

use crate::error::RpcError;

pub const METHOD_LAUNCH: &str = "launch"; // deprecated alias for `run`
pub const METHOD_RUN: &str = "run";
pub const METHOD_STOP: &str = "stop";
pub const METHOD_TOKENS: &str = "tokens";
pub const METHOD_HISTORY: &str = "tokens.history";
pub const METHOD_MEDIA: &str = "media";
pub const METHOD_MEDIA_INDEX: &str = "media.index";
pub const METHOD_MEDIA_SEARCH: &str = "media.search";
pub const METHOD_SETTINGS: &str = "settings";
pub const METHOD_SETTINGS_UPDATE: &str = "settings.update";
pub const METHOD_SYSTEMS: &str = "systems";
pub const METHOD_MAPPINGS: &str = "mappings";
pub const METHOD_MAPPINGS_NEW: &str = "mappings.new";
pub const METHOD_MAPPINGS_DELETE: &str = "mappings.delete";
pub const METHOD_MAPPINGS_UPDATE: &str = "mappings.update";
pub const METHOD_MAPPINGS_RELOAD: &str = "mappings.reload";
pub const METHOD_READERS_WRITE: &str = "readers.write";
pub const METHOD_VERSION: &str = "version";
pub const METHOD_CLIENTS: &str = "clients";

/// A JSON-RPC request frame, also reused (with `id` absent) to carry a
/// server-originated notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestObject {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Absent on a frame that is only a response to a prior
    /// server-originated request.
    #[serde(default)]
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseObject {
    pub jsonrpc: String,
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl ResponseObject {
    pub fn success(id: Uuid, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Uuid, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunParams {
    #[serde(rename = "type")]
    pub token_type: Option<String>,
    #[serde(rename = "uid")]
    pub uid: Option<String>,
    pub text: Option<String>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsParams {
    pub run_zap_script: Option<bool>,
    pub debug_logging: Option<bool>,
    pub audio_scan_feedback: Option<bool>,
    pub readers_auto_detect: Option<bool>,
    pub readers_scan_mode: Option<String>,
    pub readers_scan_exit_delay: Option<f32>,
    pub readers_scan_ignore_system: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub run_zap_script: bool,
    pub debug_logging: bool,
    pub audio_scan_feedback: bool,
    pub readers_auto_detect: bool,
    pub readers_scan_mode: String,
    pub readers_scan_exit_delay: f32,
    #[serde(rename = "readersScanIgnoreSystems")]
    pub readers_scan_ignore_system: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    #[serde(rename = "type")]
    pub token_type: String,
    pub uid: String,
    pub text: String,
    pub data: String,
    pub scan_time: DateTime<Utc>,
}

impl From<&Token> for TokenResponse {
    fn from(t: &Token) -> Self {
        Self {
            token_type: t.token_type.clone(),
            uid: t.uid.clone(),
            text: t.text.clone(),
            data: t.data.clone(),
            scan_time: t.scan_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokensResponse {
    pub active: Vec<TokenResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<TokenResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponseEntry {
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub token_type: String,
    pub uid: String,
    pub text: String,
    pub data: String,
    pub success: bool,
}

impl From<&HistoryEntry> for HistoryResponseEntry {
    fn from(e: &HistoryEntry) -> Self {
        Self {
            time: e.time,
            token_type: e.token_type.clone(),
            uid: e.uid.clone(),
            text: e.text.clone(),
            data: e.data.clone(),
            success: e.success,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub entries: Vec<HistoryResponseEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct System {
    pub id: String,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemsResponse {
    pub systems: Vec<System>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexResponse {
    pub exists: bool,
    pub indexing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<i32>,
}

impl Default for IndexResponse {
    fn default() -> Self {
        Self {
            exists: false,
            indexing: false,
            total_steps: None,
            current_step: None,
            current_step_display: None,
            total_files: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayingResponse {
    pub system_id: String,
    pub system_name: String,
    pub media_path: String,
    pub media_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaResponse {
    pub database: IndexResponse,
    pub active: Vec<PlayingResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResultMedia {
    pub system: System,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub results: Vec<SearchResultMedia>,
    pub total: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub platform: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingResponse {
    pub id: String,
    pub label: String,
    pub enabled: bool,
    #[serde(rename = "type")]
    pub mapping_type: String,
    #[serde(rename = "match")]
    pub match_type: String,
    pub pattern: String,
    pub r#override: String,
}

impl From<&Mapping> for MappingResponse {
    fn from(m: &Mapping) -> Self {
        Self {
            id: m.id.map(|i| i.to_string()).unwrap_or_default(),
            label: String::new(),
            enabled: m.enabled,
            mapping_type: match m.mapping_type {
                MappingType::Uid => "uid",
                MappingType::Text => "text",
                MappingType::Data => "data",
            }
            .to_string(),
            match_type: match m.match_type {
                MatchType::Exact => "exact",
                MatchType::Partial => "partial",
                MatchType::Regex => "regex",
            }
            .to_string(),
            pattern: m.pattern.clone(),
            r#override: m.override_text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AllMappingsResponse {
    pub mappings: Vec<MappingResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingParams {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub mapping_type: String,
    #[serde(rename = "match")]
    pub match_type: String,
    pub pattern: String,
    pub r#override: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingIdParams {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReaderWriteParams {
    pub text: String,
    #[serde(default)]
    pub reader: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientResponse {
    pub id: Uuid,
    pub address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientsResponse {
    pub clients: Vec<ClientResponse>,
}
