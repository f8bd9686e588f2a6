// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The JSON-RPC method table: one async function per method name, each
//! taking a [`RequestEnv`] and returning the raw `result` value or an
//! [`RpcError`] for the caller to wrap into a response frame.

use std::collections::HashSet;

use chrono::Utc;
use serde_json::Value;
use zt_core::{nfc_normalize, Mapping, MappingType, MatchType, Token};

use crate::env::RequestEnv;
use crate::error::RpcError;
use crate::models::{
    self, AllMappingsResponse, ClientResponse, ClientsResponse, HistoryResponse,
    HistoryResponseEntry, IndexResponse, MappingIdParams, MappingParams, MappingResponse,
    MediaResponse, PlayingResponse, ReaderWriteParams, RunParams, SearchResultMedia, SearchResults,
    SettingsResponse, System, SystemsResponse, TokenResponse, TokensResponse, UpdateSettingsParams,
    VersionResponse,
};

/// Dispatches a method name to its handler. Unknown methods are the only
/// case the callers (both transports) need to turn into a distinct error
/// themselves, since only they know whether that should close a connection.
pub async fn dispatch(method: &str, env: &RequestEnv) -> Result<Value, RpcError> {
    match method {
        models::METHOD_RUN | models::METHOD_LAUNCH => handle_run(env).await,
        models::METHOD_STOP => handle_stop(env).await,
        models::METHOD_TOKENS => handle_tokens(env).await,
        models::METHOD_HISTORY => handle_history(env).await,
        models::METHOD_MEDIA => handle_media(env).await,
        models::METHOD_MEDIA_INDEX => handle_media_index(env).await,
        models::METHOD_MEDIA_SEARCH => handle_media_search(env).await,
        models::METHOD_SETTINGS => handle_settings(env).await,
        models::METHOD_SETTINGS_UPDATE => handle_settings_update(env).await,
        models::METHOD_SYSTEMS => handle_systems(env).await,
        models::METHOD_MAPPINGS => handle_mappings(env).await,
        models::METHOD_MAPPINGS_NEW => handle_mappings_new(env).await,
        models::METHOD_MAPPINGS_UPDATE => handle_mappings_update(env).await,
        models::METHOD_MAPPINGS_DELETE => handle_mappings_delete(env).await,
        models::METHOD_MAPPINGS_RELOAD => handle_mappings_reload(env).await,
        models::METHOD_READERS_WRITE => handle_readers_write(env).await,
        models::METHOD_VERSION => handle_version(env).await,
        models::METHOD_CLIENTS => handle_clients(env).await,
        other => Err(RpcError::method_not_found(other)),
    }
}

fn require_local(env: &RequestEnv) -> Result<(), RpcError> {
    if env.is_local {
        Ok(())
    } else {
        Err(RpcError::forbidden("this method is restricted to local clients"))
    }
}

fn parse_mapping_type(s: &str) -> Result<MappingType, RpcError> {
    match s {
        "uid" => Ok(MappingType::Uid),
        "text" => Ok(MappingType::Text),
        "data" => Ok(MappingType::Data),
        other => Err(RpcError::invalid_params(format!("unknown mapping type: {other}"))),
    }
}

fn parse_match_type(s: &str) -> Result<MatchType, RpcError> {
    match s {
        "exact" => Ok(MatchType::Exact),
        "partial" => Ok(MatchType::Partial),
        "regex" => Ok(MatchType::Regex),
        other => Err(RpcError::invalid_params(format!("unknown match type: {other}"))),
    }
}

fn params_or_missing(env: &RequestEnv) -> Result<&Value, RpcError> {
    env.params.as_ref().ok_or_else(|| RpcError::invalid_params("missing params"))
}

/// Accepts either a bare string (raw ZapScript text) or a [`RunParams`]
/// object, as the wire format allows for `run`/`launch`.
pub async fn handle_run(env: &RequestEnv) -> Result<Value, RpcError> {
    let raw = params_or_missing(env)?;

    let (uid, text, data, token_type) = if let Some(s) = raw.as_str() {
        (String::new(), s.to_string(), String::new(), String::new())
    } else {
        let params: RunParams =
            serde_json::from_value(raw.clone()).map_err(|e| RpcError::invalid_params(e.to_string()))?;
        (
            params.uid.unwrap_or_default(),
            params.text.unwrap_or_default(),
            params.data.unwrap_or_default().to_lowercase().replace(' ', ""),
            params.token_type.unwrap_or_default(),
        )
    };

    if !data.is_empty() {
        hex::decode(&data).map_err(|e| RpcError::invalid_params(format!("data is not valid hex: {e}")))?;
    }

    if !env.config.is_run_allowed(&text) {
        return Err(RpcError::forbidden("text is not permitted by readersScan.allowRun"));
    }

    let token = Token {
        uid,
        text: nfc_normalize(&text),
        data,
        token_type,
        scan_time: Utc::now(),
        remote: true,
        error: None,
    };

    env.state.set_active_card(Some(token.clone()));
    env.token_queue
        .send(token)
        .await
        .map_err(|_| RpcError::internal("launch queue is closed"))?;

    Ok(Value::Null)
}

pub async fn handle_stop(env: &RequestEnv) -> Result<Value, RpcError> {
    env.platform.kill_launcher().await.map_err(RpcError::internal)?;
    Ok(Value::Null)
}

pub async fn handle_tokens(env: &RequestEnv) -> Result<Value, RpcError> {
    let active = env.state.active_card();
    let active = match &active {
        Some(t) if !t.is_empty() => vec![TokenResponse::from(t)],
        _ => Vec::new(),
    };
    let last = env
        .state
        .last_scanned()
        .as_ref()
        .filter(|t| !t.is_empty())
        .map(TokenResponse::from);

    serde_json::to_value(TokensResponse { active, last }).map_err(RpcError::internal)
}

pub async fn handle_history(env: &RequestEnv) -> Result<Value, RpcError> {
    let entries = env.state.history().iter().map(HistoryResponseEntry::from).collect();
    serde_json::to_value(HistoryResponse { entries }).map_err(RpcError::internal)
}

/// Media indexing and search are out of scope for this core; `media`
/// reports only what the platform can say about what is playing right now.
pub async fn handle_media(env: &RequestEnv) -> Result<Value, RpcError> {
    let system_id = env.platform.active_system();
    let active = if system_id.is_empty() {
        Vec::new()
    } else {
        vec![PlayingResponse {
            system_id: system_id.clone(),
            system_name: system_id,
            media_path: env.platform.active_game_path(),
            media_name: env.platform.active_game_name(),
        }]
    };

    serde_json::to_value(MediaResponse {
        database: IndexResponse::default(),
        active,
    })
    .map_err(RpcError::internal)
}

/// No media index is built by this core; report "nothing indexed, nothing
/// in progress" rather than pretending to run a scan.
pub async fn handle_media_index(_env: &RequestEnv) -> Result<Value, RpcError> {
    serde_json::to_value(IndexResponse::default()).map_err(RpcError::internal)
}

/// Without a media index there is nothing to search; always reports zero
/// results instead of failing the call.
pub async fn handle_media_search(_env: &RequestEnv) -> Result<Value, RpcError> {
    serde_json::to_value(SearchResults {
        results: Vec::<SearchResultMedia>::new(),
        total: 0,
    })
    .map_err(RpcError::internal)
}

pub async fn handle_settings(env: &RequestEnv) -> Result<Value, RpcError> {
    let resp = SettingsResponse {
        run_zap_script: env.state.can_run_zap_script(),
        debug_logging: env.config.debug_logging(),
        audio_scan_feedback: env.config.audio_feedback(),
        readers_auto_detect: env.config.auto_detect(),
        readers_scan_mode: if env.config.hold_mode_enabled() {
            "hold".to_string()
        } else {
            "tap".to_string()
        },
        readers_scan_exit_delay: env.config.exit_delay_secs(),
        readers_scan_ignore_system: env.config.ignore_system(),
    };
    serde_json::to_value(resp).map_err(RpcError::internal)
}

pub async fn handle_settings_update(env: &RequestEnv) -> Result<Value, RpcError> {
    require_local(env)?;
    let raw = params_or_missing(env)?;
    let params: UpdateSettingsParams =
        serde_json::from_value(raw.clone()).map_err(|e| RpcError::invalid_params(e.to_string()))?;

    if let Some(run) = params.run_zap_script {
        env.state.set_run_zap_script(run);
    }

    let mode = match params.readers_scan_mode.as_deref() {
        None => None,
        Some("tap") => Some("tap".to_string()),
        Some("hold") => Some("hold".to_string()),
        Some(other) => return Err(RpcError::invalid_params(format!("unknown scan mode: {other}"))),
    };

    env.config
        .update(|v| {
            if let Some(debug) = params.debug_logging {
                v.debug_logging = debug;
            }
            if let Some(audio) = params.audio_scan_feedback {
                v.audio.scan_feedback = audio;
            }
            if let Some(auto) = params.readers_auto_detect {
                v.readers.auto_detect = auto;
            }
            if let Some(mode) = &mode {
                v.readers.scan.mode = mode.clone();
            }
            if let Some(delay) = params.readers_scan_exit_delay {
                v.readers.scan.exit_delay = delay;
            }
            if let Some(ignore) = &params.readers_scan_ignore_system {
                v.readers.scan.ignore_system = ignore.clone();
            }
        })
        .map_err(RpcError::internal)?;

    Ok(Value::Null)
}

/// Grounded on `platform.launchers`, deduplicated by system id — this core
/// does not carry a games/systems catalog, so names double as ids.
pub async fn handle_systems(env: &RequestEnv) -> Result<Value, RpcError> {
    let mut seen = HashSet::new();
    let mut systems = Vec::new();
    for launcher in env.platform.launchers(&env.config) {
        if seen.insert(launcher.system_id.clone()) {
            systems.push(System {
                id: launcher.system_id.clone(),
                name: launcher.system_id,
                category: String::new(),
            });
        }
    }
    serde_json::to_value(SystemsResponse { systems }).map_err(RpcError::internal)
}

pub async fn handle_mappings(env: &RequestEnv) -> Result<Value, RpcError> {
    let mappings = env.mapping_db.list().iter().map(MappingResponse::from).collect();
    serde_json::to_value(AllMappingsResponse { mappings }).map_err(RpcError::internal)
}

pub async fn handle_mappings_new(env: &RequestEnv) -> Result<Value, RpcError> {
    require_local(env)?;
    let raw = params_or_missing(env)?;
    let params: MappingParams =
        serde_json::from_value(raw.clone()).map_err(|e| RpcError::invalid_params(e.to_string()))?;

    let mut mapping = Mapping::new(
        parse_mapping_type(&params.mapping_type)?,
        parse_match_type(&params.match_type)?,
        params.pattern,
        params.r#override,
    );
    mapping.enabled = params.enabled;

    let added = env.mapping_db.add(mapping).map_err(RpcError::internal)?;
    serde_json::to_value(MappingResponse::from(&added)).map_err(RpcError::internal)
}

pub async fn handle_mappings_update(env: &RequestEnv) -> Result<Value, RpcError> {
    require_local(env)?;
    let raw = params_or_missing(env)?;
    let params: MappingParams =
        serde_json::from_value(raw.clone()).map_err(|e| RpcError::invalid_params(e.to_string()))?;
    let Some(id) = params.id else {
        return Err(RpcError::invalid_params("missing id"));
    };

    let mapping = Mapping {
        id: Some(id),
        mapping_type: parse_mapping_type(&params.mapping_type)?,
        match_type: parse_match_type(&params.match_type)?,
        pattern: params.pattern,
        override_text: params.r#override,
        enabled: params.enabled,
    };
    env.mapping_db.update(mapping).map_err(RpcError::internal)?;
    Ok(Value::Null)
}

pub async fn handle_mappings_delete(env: &RequestEnv) -> Result<Value, RpcError> {
    require_local(env)?;
    let raw = params_or_missing(env)?;
    let params: MappingIdParams =
        serde_json::from_value(raw.clone()).map_err(|e| RpcError::invalid_params(e.to_string()))?;
    env.mapping_db.remove(params.id).map_err(RpcError::internal)?;
    Ok(Value::Null)
}

/// Re-reads both the database-backed mappings and the config file, so a
/// change made directly on disk by something other than this API takes
/// effect without a restart.
pub async fn handle_mappings_reload(env: &RequestEnv) -> Result<Value, RpcError> {
    require_local(env)?;
    env.mapping_db.reload().map_err(RpcError::internal)?;
    env.config.reload().map_err(RpcError::internal)?;
    Ok(Value::Null)
}

pub async fn handle_readers_write(env: &RequestEnv) -> Result<Value, RpcError> {
    require_local(env)?;
    let raw = params_or_missing(env)?;
    let params: ReaderWriteParams =
        serde_json::from_value(raw.clone()).map_err(|e| RpcError::invalid_params(e.to_string()))?;

    let reader = match &params.reader {
        Some(conn) => env.state.get_reader(conn),
        None => env.state.readers().into_iter().map(|(_, r)| r).next(),
    };
    let Some(reader) = reader else {
        return Err(RpcError::unsupported("no writable reader is connected"));
    };

    reader.write(&params.text).await.map_err(RpcError::internal)?;
    env.state.set_wrote_token(Some(Token::now(String::new(), params.text)));
    Ok(Value::Null)
}

pub async fn handle_version(env: &RequestEnv) -> Result<Value, RpcError> {
    let resp = VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        platform: env.platform.id().to_string(),
    };
    serde_json::to_value(resp).map_err(RpcError::internal)
}

pub async fn handle_clients(env: &RequestEnv) -> Result<Value, RpcError> {
    let clients = env
        .clients
        .snapshot()
        .into_iter()
        .map(|(id, address)| ClientResponse { id, address })
        .collect();
    serde_json::to_value(ClientsResponse { clients }).map_err(RpcError::internal)
}
