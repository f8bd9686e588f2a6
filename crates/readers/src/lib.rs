// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zt-readers: reader driver implementations and the reader manager tick
//! loop that keeps the connected-reader set in sync with configuration.

mod file;
mod manager;
mod pcsc;
mod serial;

pub use file::FileReader;
pub use manager::{close_all, run, tick};
pub use pcsc::PcscReader;
pub use serial::SerialReader;
