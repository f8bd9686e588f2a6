// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zt-core: the domain types and capability traits shared by every other
//! crate in the workspace — tokens, mappings, and the `Reader`/`Platform`
//! seams the dispatch pipeline is built against.

mod history;
mod id;
mod mapping;
mod platform;
mod reader;
mod token;

pub use history::HistoryEntry;
pub use id::{IdGen, UuidIdGen};
pub use mapping::{
    mapping_type_from_token_key, match_type_from_pattern, Mapping, MappingType, MatchType,
};
pub use platform::{
    CmdEnv, LauncherInfo, Notification, NotifySender, Platform, PlatformError,
};
pub use reader::{Reader, ReaderError, Scan};
pub use token::{normalize_uid, nfc_normalize, scans_equal, Token};
