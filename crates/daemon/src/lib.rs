// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zt-daemon: the composition root that wires [`zt_state`], [`zt_readers`],
//! [`zt_dispatch`], and [`zt_api`] together behind a concrete [`Platform`](zt_core::Platform).

mod platform;

pub use platform::HeadlessPlatform;
