//! ONTAP job abstraction
//!
//! Every asynchronous mutation on the array answers 202 with a job envelope;
//! the job uuid is the only handle the broker hands back to the platform.
//! Polling reads the job fresh each time; no job state is held between
//! calls.

use crate::error::{Error, Result};
use crate::ontap::types::AcceptEnvelope;

/// Three-state lifecycle of an ONTAP job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    /// Map the array's textual job state.
    ///
    /// Total over the three documented states; anything else fails closed as
    /// a contract violation instead of being coerced to a default.
    pub fn from_backend(state: &str) -> Result<Self> {
        match state {
            "running" => Ok(JobState::Running),
            "success" => Ok(JobState::Succeeded),
            "failure" => Ok(JobState::Failed),
            other => Err(Error::UnknownJobState(other.to_string())),
        }
    }

    /// True once the job can no longer change state
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// Extract the job uuid from a 202 accept envelope.
///
/// A body that does not carry `{job:{uuid}}` means the array answered outside
/// its documented contract, not that the request was invalid.
pub fn job_from_accept(body: &[u8], context: &'static str) -> Result<String> {
    serde_json::from_slice::<AcceptEnvelope>(body)
        .map(|envelope| envelope.job.uuid)
        .map_err(|_| Error::UnexpectedResponse {
            context,
            body: String::from_utf8_lossy(body).into_owned(),
        })
}
