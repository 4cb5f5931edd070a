//! Check-in scan session.
//!
//! A session moves through `Idle -> Scanning -> Resolved | Cancelled`.
//! The camera loop calls `poll_frame` once per frame; manual entry calls
//! `submit_manual`. Whichever resolves to a member first wins, after which
//! the session ignores input until `reset`.
//!
//! The capture stream is owned by the session and dropped on every exit
//! path (match, cancel, device error, session drop), which releases the
//! camera.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::attendance::AttendanceRecorder;
use crate::checkin::{CheckIn, UnrecognizedToken};
use crate::matcher::match_token;
use crate::models::User;

/// Polling interval between frames, roughly one display refresh.
const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;

/// How long an "unregistered member" notice holds the loop before it resumes.
const DEFAULT_NOTICE_DELAY_MS: u64 = 2000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera permission denied - use manual entry or allow camera access and retry")]
    PermissionDenied,

    #[error("No camera available: {0}")]
    Unavailable(String),

    #[error("Camera stream ended: {0}")]
    Disconnected(String),
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("Scan cancelled")]
    Cancelled,
}

/// An open capture stream. Dropping it must release the device.
pub trait FrameStream: Send {
    /// Grab and decode one frame. `Ok(None)` when no code is visible.
    fn next_token(&mut self) -> Result<Option<String>, CameraError>;
}

/// A camera (or anything that yields decoded codes) that can be opened.
pub trait CaptureDevice: Send {
    fn open(&mut self) -> Result<Box<dyn FrameStream>, CameraError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    Resolved(User),
    Cancelled,
}

/// What one call into the session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStep {
    /// No code in this frame; poll again next frame.
    Continue,
    /// An unrecognized-token notice is showing; the loop is on hold.
    Paused,
    Matched(User),
    Unrecognized(UnrecognizedToken),
    /// Input arrived after the session already resolved.
    Ignored,
    /// The session isn't scanning.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTiming {
    pub frame_interval: Duration,
    pub notice_delay: Duration,
}

impl Default for ScanTiming {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            notice_delay: Duration::from_millis(DEFAULT_NOTICE_DELAY_MS),
        }
    }
}

pub struct ScanSession<D> {
    device: D,
    stream: Option<Box<dyn FrameStream>>,
    state: ScanState,
    notice: Option<UnrecognizedToken>,
    camera_error: Option<CameraError>,
    timing: ScanTiming,
}

impl<D: CaptureDevice> ScanSession<D> {
    pub fn new(device: D) -> Self {
        Self::with_timing(device, ScanTiming::default())
    }

    pub fn with_timing(device: D, timing: ScanTiming) -> Self {
        Self {
            device,
            stream: None,
            state: ScanState::Idle,
            notice: None,
            camera_error: None,
            timing,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn notice(&self) -> Option<&UnrecognizedToken> {
        self.notice.as_ref()
    }

    /// Persistent camera problem, if any. Manual entry still works.
    pub fn camera_error(&self) -> Option<&CameraError> {
        self.camera_error.as_ref()
    }

    pub fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the camera and start scanning. Does nothing while already
    /// scanning or once resolved; a resolved session needs `reset`.
    pub fn start(&mut self) -> Result<(), CameraError> {
        match self.state {
            ScanState::Scanning => return Ok(()),
            ScanState::Resolved(_) => {
                debug!("Scan already resolved, waiting for reset");
                return Ok(());
            }
            ScanState::Idle | ScanState::Cancelled => {}
        }

        match self.device.open() {
            Ok(stream) => {
                self.stream = Some(stream);
                self.camera_error = None;
                self.notice = None;
                self.state = ScanState::Scanning;
                info!("Scanning started");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Camera unavailable, manual entry only");
                self.camera_error = Some(e.clone());
                self.state = ScanState::Idle;
                Err(e)
            }
        }
    }

    /// One iteration of the camera loop.
    pub fn poll_frame(&mut self, roster: &[User]) -> ScanStep {
        if self.state != ScanState::Scanning {
            return ScanStep::Stopped;
        }
        if self.notice.is_some() {
            return ScanStep::Paused;
        }
        let Some(stream) = self.stream.as_mut() else {
            return ScanStep::Stopped;
        };

        match stream.next_token() {
            Ok(Some(token)) if !token.trim().is_empty() => self.resolve(&token, roster),
            Ok(_) => ScanStep::Continue,
            Err(e) => {
                warn!(error = %e, "Capture failed");
                self.release();
                self.camera_error = Some(e);
                self.state = ScanState::Idle;
                ScanStep::Stopped
            }
        }
    }

    /// Typed entry. Works with or without a camera, until the session resolves.
    pub fn submit_manual(&mut self, token: &str, roster: &[User]) -> ScanStep {
        match self.state {
            ScanState::Resolved(_) => ScanStep::Ignored,
            ScanState::Cancelled => ScanStep::Stopped,
            ScanState::Idle | ScanState::Scanning => self.resolve(token, roster),
        }
    }

    fn resolve(&mut self, token: &str, roster: &[User]) -> ScanStep {
        match match_token(token, roster) {
            Some(user) => {
                self.release();
                self.notice = None;
                self.state = ScanState::Resolved(user.clone());
                info!(serial = user.serial, "Scan resolved");
                ScanStep::Matched(user.clone())
            }
            None => {
                let notice = UnrecognizedToken {
                    token: token.trim().to_string(),
                };
                info!(token = %notice.token, "Unregistered token");
                self.notice = Some(notice.clone());
                ScanStep::Unrecognized(notice)
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Leave the scan view.
    pub fn cancel(&mut self) {
        self.release();
        self.notice = None;
        self.state = ScanState::Cancelled;
        debug!("Scan cancelled");
    }

    /// Clear the previous result and scan again.
    pub fn reset(&mut self) -> Result<(), CameraError> {
        self.release();
        self.notice = None;
        self.state = ScanState::Idle;
        self.start()
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            debug!("Capture stream released");
        }
    }

    /// Drive the camera loop until a member is matched, then record today's
    /// visit. Unrecognized codes hold the loop for the notice delay.
    pub async fn run(
        &mut self,
        roster: &[User],
        recorder: &AttendanceRecorder,
    ) -> Result<CheckIn, ScanError> {
        self.run_with_notice(roster, recorder, |_| {}).await
    }

    /// `run`, calling `on_notice` each time an unrecognized code is shown.
    pub async fn run_with_notice<F>(
        &mut self,
        roster: &[User],
        recorder: &AttendanceRecorder,
        mut on_notice: F,
    ) -> Result<CheckIn, ScanError>
    where
        F: FnMut(&UnrecognizedToken) + Send,
    {
        if self.state != ScanState::Scanning {
            self.start()?;
        }

        loop {
            match self.poll_frame(roster) {
                ScanStep::Continue => tokio::time::sleep(self.timing.frame_interval).await,
                ScanStep::Paused => {
                    tokio::time::sleep(self.timing.notice_delay).await;
                    self.dismiss_notice();
                }
                ScanStep::Unrecognized(notice) => on_notice(&notice),
                ScanStep::Matched(user) => {
                    let outcome = recorder.record_visit_today(&user.identifier);
                    return Ok(CheckIn { user, outcome });
                }
                ScanStep::Ignored | ScanStep::Stopped => {
                    return Err(match self.camera_error.clone() {
                        Some(e) => ScanError::Camera(e),
                        None => ScanError::Cancelled,
                    });
                }
            }
        }
    }
}
