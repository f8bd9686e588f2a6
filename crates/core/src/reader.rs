// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The [`Reader`] capability: an open handle to a physical or virtual token
//! source, keyed by a `driver:path` connection string.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::token::Token;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("reader not connected")]
    NotConnected,
    #[error("unsupported connection string: {0}")]
    UnsupportedConnString(String),
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// One entry read off a reader's scan channel.
///
/// `token: None, error: None` signals "token removed". A populated `error`
/// never reaches the mapping resolver — it is handled upstream in the
/// dispatch pipeline (fail sound, then dropped).
#[derive(Debug, Clone)]
pub struct Scan {
    pub token: Option<Token>,
    pub error: Option<String>,
}

impl Scan {
    pub fn inserted(token: Token) -> Self {
        Self {
            token: Some(token),
            error: None,
        }
    }

    pub fn removed() -> Self {
        Self {
            token: None,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            token: None,
            error: Some(message.into()),
        }
    }
}

/// Capability implemented by every concrete reader driver (NFC/RFID PCSC
/// readers, serial-attached readers, the file-based virtual reader, ...).
///
/// Methods take `&self` rather than `&mut self`: implementors hold whatever
/// interior mutability they need (a `Mutex` around a device handle, an
/// `AtomicBool` for `connected`), since reader handles are shared behind an
/// `Arc` once registered in shared state.
#[async_trait]
pub trait Reader: Send + Sync {
    /// Driver tags this implementation answers to, e.g. `["pn532", "acr122u"]`.
    fn ids(&self) -> Vec<&'static str>;

    /// Open a connection and start forwarding scans onto `out`. Returns once
    /// the reader is open (or fails); streaming happens on a spawned task.
    async fn open(&self, conn_str: &str, out: mpsc::Sender<Scan>) -> Result<(), ReaderError>;

    async fn close(&self) -> Result<(), ReaderError>;

    /// Attempt auto-detection, skipping any connection string already open.
    /// Returns `None` when nothing new is found.
    fn detect(&self, already_open: &[String]) -> Option<String>;

    fn connected(&self) -> bool;

    /// Write `text` to the token currently on the reader, if supported.
    async fn write(&self, text: &str) -> Result<(), ReaderError>;
}
