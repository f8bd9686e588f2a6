// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! JSON-RPC error codes. Negative codes below `-32000` are the reserved
//! JSON-RPC 2.0 range; `-32000` and below that are unused by the spec are
//! this server's own, documented here rather than left to collide.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const FORBIDDEN: i64 = -32001;
pub const UNSUPPORTED: i64 = -32002;
pub const INTERNAL_ERROR: i64 = -32000;

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("unknown method: {method}"))
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, detail.into())
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(FORBIDDEN, detail.into())
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::new(UNSUPPORTED, detail.into())
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::new(INTERNAL_ERROR, detail.to_string())
    }
}
