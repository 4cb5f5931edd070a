//! Matching and attendance in one step.

use thiserror::Error;
use tracing::info;

use crate::attendance::{AttendanceRecorder, VisitOutcome};
use crate::matcher::match_token;
use crate::models::User;

/// No roster entry matches the token. Shown to the operator as a transient
/// "unregistered member" notice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unregistered member: nothing on the roster matches '{token}'")]
pub struct UnrecognizedToken {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIn {
    pub user: User,
    pub outcome: VisitOutcome,
}

/// Resolve `token` against the roster and record today's visit.
pub fn check_in(
    token: &str,
    roster: &[User],
    recorder: &AttendanceRecorder,
) -> Result<CheckIn, UnrecognizedToken> {
    let user = match_token(token, roster).ok_or_else(|| UnrecognizedToken {
        token: token.trim().to_string(),
    })?;

    let outcome = recorder.record_visit_today(&user.identifier);
    info!(serial = user.serial, ?outcome, "Check-in");
    Ok(CheckIn {
        user: user.clone(),
        outcome,
    })
}
