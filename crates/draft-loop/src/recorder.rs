//! Persisting approved sessions as plain-text records.
//!
//! Record layout (UTF-8):
//!
//! ```text
//! Topic: <topic>
//!
//! Draft:
//! <draft>
//!
//! Feedback: <feedback or "No feedback provided">
//! ```
//!
//! Files are named `final_draft_<YYYYMMDD_HHMMSS>.txt`. The timestamp only
//! has second resolution, so a record that would collide with an existing
//! file gets a numeric suffix (`final_draft_<ts>_1.txt`, ...) instead of
//! overwriting it.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use crate::errors::DraftLoopError;
use crate::session::Session;

pub const NO_FEEDBACK: &str = "No feedback provided";
const NO_DRAFT: &str = "No draft";
const RECORD_PREFIX: &str = "final_draft_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Suffixes tried before giving up on a free file name.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Durable sink for approved sessions.
///
/// Callers only invoke this once the reviewer approved; implementations do
/// not re-check.
pub trait SessionRecorder: Send + Sync {
    /// Persist the session, returning where it was written.
    fn record(&self, session: &Session) -> Result<PathBuf, DraftLoopError>;
}

/// Render the three labelled sections in their fixed order.
pub fn render_record(session: &Session) -> String {
    let draft = session
        .draft
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| NO_DRAFT.to_string());
    let feedback = session.feedback.as_deref().unwrap_or(NO_FEEDBACK);

    format!(
        "Topic: {}\n\nDraft:\n{draft}\n\nFeedback: {feedback}\n",
        session.topic()
    )
}

/// File name for a record taken at `at`; `attempt > 0` adds a collision suffix.
pub fn record_file_name(at: NaiveDateTime, attempt: u32) -> String {
    let stamp = at.format(TIMESTAMP_FORMAT);
    if attempt == 0 {
        format!("{RECORD_PREFIX}{stamp}.txt")
    } else {
        format!("{RECORD_PREFIX}{stamp}_{attempt}.txt")
    }
}

/// Writes records as text files into a directory.
pub struct FileRecorder {
    dir: PathBuf,
}

impl FileRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the record using `at` as its timestamp.
    pub fn record_at(&self, session: &Session, at: NaiveDateTime) -> Result<PathBuf, DraftLoopError> {
        let contents = render_record(session);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(record_file_name(at, attempt));
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(path = %path.display(), "record name taken, trying next suffix");
                    continue;
                }
                Err(e) => return Err(DraftLoopError::persistence(path, e)),
            };

            let bytes = contents.as_bytes();
            commit(&path, move || {
                file.write_all(bytes)?;
                file.sync_all()
            })?;

            let path = path.canonicalize().unwrap_or(path);
            info!(path = %path.display(), bytes = contents.len(), "Wrote final draft");
            return Ok(path);
        }

        Err(DraftLoopError::persistence(
            self.dir.join(record_file_name(at, 0)),
            io::Error::new(
                ErrorKind::AlreadyExists,
                format!("no free record name after {MAX_NAME_ATTEMPTS} attempts"),
            ),
        ))
    }
}

/// Run `write` against the freshly created `path`; on failure the partial
/// file is removed so it cannot be mistaken for a saved record.
///
/// `write` owns the file handle, so it is closed before the removal.
fn commit(path: &Path, write: impl FnOnce() -> io::Result<()>) -> Result<(), DraftLoopError> {
    write().map_err(|e| {
        if let Err(remove) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %remove, "failed to remove partial record");
        }
        DraftLoopError::persistence(path, e)
    })
}

impl SessionRecorder for FileRecorder {
    fn record(&self, session: &Session) -> Result<PathBuf, DraftLoopError> {
        self.record_at(session, Local::now().naive_local())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::session::Draft;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(12, 5, 7)
            .unwrap()
    }

    fn approved(topic: &str, draft: Draft) -> Session {
        let mut session = Session::new(topic);
        session.replace_draft(draft);
        session.satisfied = Some(true);
        session
    }

    #[test]
    fn file_name_pattern() {
        assert_eq!(record_file_name(noon(), 0), "final_draft_20240309_120507.txt");
        assert_eq!(record_file_name(noon(), 2), "final_draft_20240309_120507_2.txt");
    }

    #[test]
    fn render_without_feedback() {
        let session = approved("Testing", Draft::generated("Body text."));
        assert_eq!(
            render_record(&session),
            "Topic: Testing\n\nDraft:\nBody text.\n\nFeedback: No feedback provided\n"
        );
    }

    #[test]
    fn render_keeps_feedback_and_refined_header() {
        let mut session = approved("Testing", Draft::refined("Body."));
        session.feedback = Some("tighten intro".into());
        let text = render_record(&session);
        assert!(text.contains("Draft:\nRefined Draft:\nBody.\n"));
        assert!(text.ends_with("Feedback: tighten intro\n"));
    }

    #[test]
    fn whitespace_feedback_written_verbatim() {
        let mut session = approved("Testing", Draft::generated("Body."));
        session.feedback = Some("   ".into());
        assert!(render_record(&session).ends_with("Feedback:    \n"));
    }

    #[test]
    fn writes_record_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = FileRecorder::new(dir.path());
        let session = approved("Testing", Draft::generated("Body."));

        let path = recorder.record_at(&session, noon()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "final_draft_20240309_120507.txt"
        );
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_record(&session));
    }

    #[test]
    fn same_second_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = FileRecorder::new(dir.path());

        let first = recorder
            .record_at(&approved("One", Draft::generated("a")), noon())
            .unwrap();
        let second = recorder
            .record_at(&approved("Two", Draft::generated("b")), noon())
            .unwrap();

        assert_ne!(first, second);
        assert!(second.ends_with("final_draft_20240309_120507_1.txt"));
        assert!(std::fs::read_to_string(&first).unwrap().starts_with("Topic: One"));
        assert!(std::fs::read_to_string(&second).unwrap().starts_with("Topic: Two"));
    }

    #[test]
    fn failed_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(record_file_name(noon(), 0));
        std::fs::write(&path, "Topic: half").unwrap();

        let err = commit(&path, || Err(io::Error::other("no space left on device"))).unwrap_err();

        assert!(matches!(err, DraftLoopError::Persistence { .. }));
        assert!(err.to_string().contains("no space left on device"));
        assert!(!path.exists());

        // The name is free again for the next save in the same second.
        let recorder = FileRecorder::new(dir.path());
        let saved = recorder
            .record_at(&approved("Testing", Draft::generated("a")), noon())
            .unwrap();
        assert!(saved.ends_with("final_draft_20240309_120507.txt"));
    }

    #[test]
    fn successful_write_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kept.txt");
        std::fs::write(&path, "body").unwrap();
        commit(&path, || Ok(())).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_directory_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = FileRecorder::new(dir.path().join("does/not/exist"));
        let err = recorder
            .record_at(&approved("Testing", Draft::generated("a")), noon())
            .unwrap_err();
        assert!(matches!(err, DraftLoopError::Persistence { .. }));
        assert!(!err.ends_run());
    }
}
