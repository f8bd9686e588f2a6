// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("toml encode error: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("unsupported config schema version {found}, expected {expected}")]
    SchemaMismatch { found: i64, expected: i64 },
}
