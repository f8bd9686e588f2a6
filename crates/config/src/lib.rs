// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zt-config: on-disk TOML configuration for the dispatch core.
//!
//! This crate owns the schema and the reloadable [`Instance`] wrapper. It
//! deliberately does not cover migrating a legacy INI config or the
//! interactive config UI; those live in the outer application.

mod error;
mod instance;
mod regex_list;
mod values;

pub use error::ConfigError;
pub use instance::{Instance, APP_ENV, CFG_ENV, CFG_FILE};
pub use regex_list::RegexList;
pub use values::{
    Audio, Launchers, Mappings, MappingsEntry, Readers, ReadersConnect, ReadersScan, Service,
    Systems, SystemsDefault, Values, ZapScript, DEFAULT_API_PORT, SCAN_MODE_HOLD, SCAN_MODE_TAP,
    SCHEMA_VERSION,
};
