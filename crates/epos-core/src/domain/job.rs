//! Client-side record of a print job.
//!
//! The job's real buffer lives on the printer: every staging call transmits
//! its primitive immediately and the device keeps it pending until a commit
//! (`sendData`) feeds and cuts.  [`PrintJob`] is the bridge's *ledger* of what
//! it has successfully staged since the last commit, so it can log what a
//! disconnect abandons and refuse staging while a commit is in flight.
//!
//! # Lifecycle
//!
//! ```text
//! (none) ── first successful stage ──► open ── commit issued ──► terminated
//!                                       ▲                           │
//!                                       └──── commit failed ────────┤
//!                                                                   │
//!                        (none) ◄──── commit succeeded / disconnect ┘
//! ```
//!
//! There is no explicit "begin job" call: a job begins implicitly with the
//! first staging call after connecting and ends at the first successful commit.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::format::{ImageStyle, TextStyle};

/// Identifier of one print job (one commit cycle).
pub type JobId = Uuid;

/// Returned when staging into a job whose commit has already been issued.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("print job {0} has been terminated; commit or disconnect before staging again")]
pub struct JobTerminated(pub JobId);

/// One primitive transmitted into the device's pending-job buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StagedOp {
    Text {
        lines: Vec<String>,
        style: TextStyle,
    },
    /// Images are recorded by summary; the data URL itself is not retained.
    Image {
        media_type: Option<String>,
        encoded_len: usize,
        style: ImageStyle,
    },
}

impl StagedOp {
    /// Builds the ledger entry for an image staging call.
    pub fn image(data_url: &str, style: ImageStyle) -> Self {
        StagedOp::Image {
            media_type: data_url_media_type(data_url).map(str::to_string),
            encoded_len: data_url.len(),
            style,
        }
    }
}

/// Extracts the media type from a `data:<type>;base64,<payload>` URL.
///
/// Returns `None` when the string is not a data URL.  The bridge never
/// rejects an image on this basis; the URL is passed through uninterpreted.
pub fn data_url_media_type(data_url: &str) -> Option<&str> {
    let rest = data_url.strip_prefix("data:")?;
    let header = rest.split(',').next()?;
    let media_type = header.split(';').next()?;
    (!media_type.is_empty()).then_some(media_type)
}

/// The ordered set of operations staged since the last commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    id: JobId,
    ops: Vec<StagedOp>,
    terminated: bool,
}

impl PrintJob {
    /// Opens a new, empty job.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            ops: Vec::new(),
            terminated: false,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn ops(&self) -> &[StagedOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Checks that the job still accepts staging calls.
    ///
    /// # Errors
    ///
    /// Returns [`JobTerminated`] once a commit has been issued.
    pub fn ensure_open(&self) -> Result<(), JobTerminated> {
        if self.terminated {
            Err(JobTerminated(self.id))
        } else {
            Ok(())
        }
    }

    /// Records a successfully staged primitive.
    ///
    /// # Errors
    ///
    /// Returns [`JobTerminated`] once a commit has been issued.
    pub fn record(&mut self, op: StagedOp) -> Result<(), JobTerminated> {
        self.ensure_open()?;
        self.ops.push(op);
        Ok(())
    }

    /// Marks the job as terminated: a commit is on its way to the device.
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    /// Re-opens the job after a failed commit.
    ///
    /// The staged content is still buffered on the device, so a later commit
    /// attempt may finish it.
    pub fn reopen(&mut self) {
        self.terminated = false;
    }
}

impl Default for PrintJob {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &str) -> StagedOp {
        StagedOp::Text {
            lines: vec![line.to_string()],
            style: TextStyle::default(),
        }
    }

    #[test]
    fn test_new_job_is_open_and_empty() {
        let job = PrintJob::new();
        assert!(job.is_empty());
        assert!(!job.is_terminated());
        assert!(job.ensure_open().is_ok());
    }

    #[test]
    fn test_record_appends_in_order() {
        // Arrange
        let mut job = PrintJob::new();

        // Act
        job.record(text("first")).unwrap();
        job.record(text("second")).unwrap();

        // Assert
        assert_eq!(job.ops(), &[text("first"), text("second")]);
    }

    #[test]
    fn test_record_is_refused_once_terminated() {
        let mut job = PrintJob::new();
        job.terminate();
        assert_eq!(job.record(text("late")), Err(JobTerminated(job.id())));
        assert!(job.is_empty());
    }

    #[test]
    fn test_reopen_keeps_staged_ops() {
        let mut job = PrintJob::new();
        job.record(text("kept")).unwrap();
        job.terminate();

        job.reopen();

        assert!(job.ensure_open().is_ok());
        assert_eq!(job.ops().len(), 1);
    }

    #[test]
    fn test_data_url_media_type_extracts_type() {
        assert_eq!(data_url_media_type("data:image/png;base64,iVBORw0K"), Some("image/png"));
        assert_eq!(data_url_media_type("data:image/jpeg;base64,/9j/"), Some("image/jpeg"));
        assert_eq!(data_url_media_type("not a data url"), None);
        assert_eq!(data_url_media_type("data:;base64,AAAA"), None);
    }

    #[test]
    fn test_image_op_records_summary_only() {
        let op = StagedOp::image("data:image/png;base64,AAAA", ImageStyle::default());
        assert_eq!(
            op,
            StagedOp::Image {
                media_type: Some("image/png".to_string()),
                encoded_len: 26,
                style: ImageStyle::default(),
            }
        );
    }
}
