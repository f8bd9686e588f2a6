// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! PC/SC (`pcsc` crate) reader driver for contactless smartcard readers
//! (ACR122U, PN533-based USB readers, ...). `pcsc` is a blocking C binding,
//! so polling happens on a dedicated OS thread and results are bridged back
//! onto the async scan channel with `blocking_send`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use zt_core::{Reader, ReaderError, Scan, Token};

const POLL_TIMEOUT: Duration = Duration::from_millis(500);

struct Session {
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

#[derive(Default)]
pub struct PcscReader {
    session: Mutex<Option<Session>>,
    connected: AtomicBool,
}

impl PcscReader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Reader for PcscReader {
    fn ids(&self) -> Vec<&'static str> {
        vec!["pcsc", "acr122u", "pn532"]
    }

    async fn open(&self, conn_str: &str, out: mpsc::Sender<Scan>) -> Result<(), ReaderError> {
        let reader_name = conn_str
            .split_once(':')
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_default();

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let connected_flag = Arc::new(AtomicBool::new(false));
        let thread_connected = connected_flag.clone();

        let handle = std::thread::spawn(move || {
            poll_loop(reader_name, thread_stop, thread_connected, out);
        });

        self.connected.store(true, Ordering::SeqCst);
        *self.session.lock() = Some(Session {
            stop,
            handle: Some(handle),
        });
        Ok(())
    }

    async fn close(&self) -> Result<(), ReaderError> {
        if let Some(mut session) = self.session.lock().take() {
            session.stop.store(true, Ordering::SeqCst);
            if let Some(handle) = session.handle.take() {
                let _ = handle.join();
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn detect(&self, already_open: &[String]) -> Option<String> {
        let ctx = pcsc::Context::establish(pcsc::Scope::User).ok()?;
        let len = ctx.list_readers_len().ok()?;
        let mut buf = vec![0u8; len];
        let names = ctx.list_readers(&mut buf).ok()?;
        for name in names {
            let conn = format!("pcsc:{}", name.to_string_lossy());
            if !already_open.contains(&conn) {
                return Some(conn);
            }
        }
        None
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn write(&self, _text: &str) -> Result<(), ReaderError> {
        // Writing to an NDEF tag over PC/SC needs card-type-specific APDUs;
        // unsupported until a concrete tag format is chosen.
        Err(ReaderError::WriteFailed(
            "pcsc driver does not support writing yet".to_string(),
        ))
    }
}

fn poll_loop(
    reader_name: String,
    stop: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    out: mpsc::Sender<Scan>,
) {
    let Ok(ctx) = pcsc::Context::establish(pcsc::Scope::User) else {
        let _ = out.blocking_send(Scan::failed("pcsc context unavailable"));
        return;
    };

    let name = match std::ffi::CString::new(reader_name) {
        Ok(n) => n,
        Err(_) => return,
    };
    let mut states = vec![pcsc::ReaderState::new(name, pcsc::State::UNAWARE)];
    let mut present = false;

    while !stop.load(Ordering::SeqCst) {
        match ctx.get_status_change(POLL_TIMEOUT, &mut states) {
            Ok(()) => {}
            Err(pcsc::Error::Timeout) => continue,
            Err(_) => {
                let _ = out.blocking_send(Scan::failed("pcsc status change failed"));
                continue;
            }
        }

        connected.store(true, Ordering::SeqCst);
        let now_present = states[0].event_state().contains(pcsc::State::PRESENT);
        if now_present && !present {
            present = true;
            let _ = out.blocking_send(Scan::inserted(Token::now("pcsc-uid", "")));
        } else if !now_present && present {
            present = false;
            let _ = out.blocking_send(Scan::removed());
        }
        states[0].sync_current_state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_disconnected_before_open() {
        let reader = PcscReader::new();
        assert!(!reader.connected());
    }
}
