// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! ID generation helpers shared across the core.

/// Generates request/response identifiers for the JSON-RPC transport.
pub trait IdGen: Send + Sync {
    fn next(&self) -> uuid::Uuid;
}

/// UUID v4 generator used in production.
#[derive(Clone, Copy, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> uuid::Uuid {
        uuid::Uuid::new_v4()
    }
}
