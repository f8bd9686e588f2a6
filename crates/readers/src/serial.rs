// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! Serial-attached reader driver, for devices (Arduino-class microcontroller
//! readers, barcode-scanner-style wands) that emit a newline-terminated UID
//! over a serial port.

use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use zt_core::{Reader, ReaderError, Scan, Token};

const BAUD_RATE: u32 = 9600;
const READ_TIMEOUT: Duration = Duration::from_millis(500);

struct Session {
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

#[derive(Default)]
pub struct SerialReader {
    session: Mutex<Option<Session>>,
    connected: AtomicBool,
}

impl SerialReader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Reader for SerialReader {
    fn ids(&self) -> Vec<&'static str> {
        vec!["serial"]
    }

    async fn open(&self, conn_str: &str, out: mpsc::Sender<Scan>) -> Result<(), ReaderError> {
        let port_path = conn_str
            .split_once(':')
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_else(|| conn_str.to_string());

        let port = serialport::new(&port_path, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| ReaderError::Io(std::io::Error::other(e)))?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let handle = std::thread::spawn(move || read_loop(port, thread_stop, out));

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
        let ports = serialport::available_ports().ok()?;
        ports
            .into_iter()
            .map(|p| format!("serial:{}", p.port_name))
            .find(|conn| !already_open.contains(conn))
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn write(&self, _text: &str) -> Result<(), ReaderError> {
        Err(ReaderError::WriteFailed(
            "serial driver is read-only".to_string(),
        ))
    }
}

fn read_loop(port: Box<dyn serialport::SerialPort>, stop: Arc<AtomicBool>, out: mpsc::Sender<Scan>) {
    let mut reader = BufReader::new(port);
    let mut line = String::new();
    let mut present = false;

    while !stop.load(Ordering::SeqCst) {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let uid = line.trim();
                if uid.is_empty() {
                    continue;
                }
                present = true;
                if out
                    .blocking_send(Scan::inserted(Token::now(uid, uid)))
                    .is_err()
                {
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                if present {
                    present = false;
                    if out.blocking_send(Scan::removed()).is_err() {
                        return;
                    }
                }
            }
            Err(_) => {
                let _ = out.blocking_send(Scan::failed("serial read error"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_disconnected_before_open() {
        let reader = SerialReader::new();
        assert!(!reader.connected());
    }
}
