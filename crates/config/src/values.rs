// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! TOML schema for the on-disk configuration file.
//!
//! This mirrors the shape of the file an administrator edits by hand; it is
//! intentionally flat and `Default`-friendly so a missing table just falls
//! back to its zero value.

use serde::{Deserialize, Serialize};

/// Current schema version. A config file with a different `config_schema`
/// is rejected at load time rather than silently reinterpreted.
pub const SCHEMA_VERSION: i64 = 1;

pub const SCAN_MODE_TAP: &str = "tap";
pub const SCAN_MODE_HOLD: &str = "hold";

pub const DEFAULT_API_PORT: u16 = 7497;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Values {
    #[serde(default = "default_schema")]
    pub config_schema: i64,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub audio: Audio,
    #[serde(default)]
    pub readers: Readers,
    #[serde(default)]
    pub systems: Systems,
    #[serde(default)]
    pub launchers: Launchers,
    #[serde(default)]
    pub zapscript: ZapScript,
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub mappings: Mappings,
}

fn default_schema() -> i64 {
    SCHEMA_VERSION
}

impl Default for Values {
    fn default() -> Self {
        Self {
            config_schema: SCHEMA_VERSION,
            debug_logging: false,
            audio: Audio::default(),
            readers: Readers::default(),
            systems: Systems::default(),
            launchers: Launchers::default(),
            zapscript: ZapScript::default(),
            service: Service::default(),
            mappings: Mappings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audio {
    #[serde(default = "default_true")]
    pub scan_feedback: bool,
}

impl Default for Audio {
    fn default() -> Self {
        Self {
            scan_feedback: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Readers {
    #[serde(default = "default_true")]
    pub auto_detect: bool,
    #[serde(default)]
    pub scan: ReadersScan,
    #[serde(default)]
    pub connect: Vec<ReadersConnect>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadersScan {
    #[serde(default = "default_scan_mode")]
    pub mode: String,
    #[serde(default)]
    pub exit_delay: f32,
    #[serde(default)]
    pub ignore_system: Vec<String>,
}

impl Default for ReadersScan {
    fn default() -> Self {
        Self {
            mode: SCAN_MODE_TAP.to_string(),
            exit_delay: 0.0,
            ignore_system: Vec::new(),
        }
    }
}

fn default_scan_mode() -> String {
    SCAN_MODE_TAP.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadersConnect {
    pub driver: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Systems {
    #[serde(default)]
    pub default: Vec<SystemsDefault>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemsDefault {
    pub system: String,
    #[serde(default)]
    pub launcher: String,
    #[serde(default)]
    pub before_exit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Launchers {
    #[serde(default)]
    pub index_root: Vec<String>,
    #[serde(default)]
    pub allow_file: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ZapScript {
    #[serde(default)]
    pub allow_execute: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub allow_run: Vec<String>,
}

impl Default for Service {
    fn default() -> Self {
        Self {
            api_port: DEFAULT_API_PORT,
            device_id: String::new(),
            allow_run: Vec::new(),
        }
    }
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Mappings {
    #[serde(default)]
    pub entry: Vec<MappingsEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingsEntry {
    #[serde(default)]
    pub token_key: String,
    pub match_pattern: String,
    pub zapscript: String,
}
