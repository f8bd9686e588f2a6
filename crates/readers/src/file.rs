// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The `file` reader: a virtual reader that treats a plain text file as its
//! token surface. Writing a UID to the file simulates a tap; truncating it
//! simulates removal. Used for development and headless testing where no
//! physical reader hardware is attached.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use zt_core::{Reader, ReaderError, Scan, Token};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

struct Watched {
    path: PathBuf,
    stop: Arc<AtomicBool>,
}

#[derive(Default)]
pub struct FileReader {
    watched: Mutex<Option<Watched>>,
    connected: AtomicBool,
}

impl FileReader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Reader for FileReader {
    fn ids(&self) -> Vec<&'static str> {
        vec!["file"]
    }

    async fn open(&self, conn_str: &str, out: mpsc::Sender<Scan>) -> Result<(), ReaderError> {
        let path = conn_str
            .strip_prefix("file:")
            .unwrap_or(conn_str)
            .to_string();
        let path = PathBuf::from(path);

        let stop = Arc::new(AtomicBool::new(false));
        *self.watched.lock() = Some(Watched {
            path: path.clone(),
            stop: stop.clone(),
        });
        self.connected.store(true, Ordering::SeqCst);

        tokio::spawn(watch_loop(path, stop, out));
        Ok(())
    }

    async fn close(&self) -> Result<(), ReaderError> {
        if let Some(watched) = self.watched.lock().take() {
            watched.stop.store(true, Ordering::SeqCst);
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn detect(&self, _already_open: &[String]) -> Option<String> {
        None
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn write(&self, text: &str) -> Result<(), ReaderError> {
        let Some(watched) = self.watched.lock().as_ref().map(|w| w.path.clone()) else {
            return Err(ReaderError::NotConnected);
        };
        tokio::fs::write(&watched, text)
            .await
            .map_err(ReaderError::Io)
    }
}

async fn watch_loop(path: PathBuf, stop: Arc<AtomicBool>, out: mpsc::Sender<Scan>) {
    let mut last_contents: Option<String> = None;

    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }

        let contents = tokio::fs::read_to_string(&path).await.ok();
        let trimmed = contents.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (trimmed, last_contents.as_deref()) {
            (Some(uid), Some(prev)) if uid == prev => {}
            (Some(uid), _) => {
                last_contents = Some(uid.to_string());
                if out
                    .send(Scan::inserted(Token::now(uid, uid)))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            (None, Some(_)) => {
                last_contents = None;
                if out.send(Scan::removed()).await.is_err() {
                    return;
                }
            }
            (None, None) => {}
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
