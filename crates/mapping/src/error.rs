// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("mapping {0} not found")]
    NotFound(i64),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
