//! Keyboard-wedge scanner input.
//!
//! Handheld barcode readers type the decoded code followed by Enter, so a
//! "frame" here is whatever line has arrived on stdin since the last poll.

use std::io::{self, BufRead};
use std::sync::{Arc, Mutex, PoisonError};

use rollcall_core::{CameraError, CaptureDevice, FrameStream};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
use tracing::debug;

type Lines = Arc<Mutex<UnboundedReceiver<String>>>;

/// Reads lines from stdin on a background thread. The thread is started on
/// first open and its queue is handed to every stream opened afterwards,
/// so a reset never loses a line already typed.
#[derive(Default)]
pub struct LineScanner {
    lines: Option<Lines>,
}

impl LineScanner {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn_reader() -> Result<UnboundedReceiver<String>, CameraError> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("stdin-scanner".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                debug!("Scanner input closed");
            })
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;
        Ok(rx)
    }
}

impl CaptureDevice for LineScanner {
    fn open(&mut self) -> Result<Box<dyn FrameStream>, CameraError> {
        let lines = match &self.lines {
            Some(lines) => Arc::clone(lines),
            None => {
                let lines = Arc::new(Mutex::new(Self::spawn_reader()?));
                self.lines = Some(Arc::clone(&lines));
                lines
            }
        };
        Ok(Box::new(LineStream { lines }))
    }
}

struct LineStream {
    lines: Lines,
}

impl FrameStream for LineStream {
    fn next_token(&mut self) -> Result<Option<String>, CameraError> {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        match lines.try_recv() {
            Ok(line) => Ok(Some(line)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(CameraError::Disconnected("scanner input closed".to_string()))
            }
        }
    }
}
