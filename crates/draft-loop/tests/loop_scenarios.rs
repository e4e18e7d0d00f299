//! End-to-end runs of the drafting loop with scripted collaborators.
//!
//! No network and no terminal: the text generator, the reviewer and the
//! recorder are all in-process fakes, so every test is deterministic.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use draft_loop::errors::{DraftLoopError, GenerationError};
use draft_loop::recorder::NO_FEEDBACK;
use draft_loop::state_machine::LoopState;
use draft_loop::{
    ConsoleHuman, FeedbackPrompt, FileRecorder, LoopController, LoopEvent, LoopObserver,
    NullObserver, RecordOutcome, ReviewPrompt, Session, SessionRecorder, TextGenerator,
    TimeoutGenerator,
};

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Replays completions in order and remembers every prompt it saw.
struct ScriptedWriter {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedWriter {
    fn new(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedWriter {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Request("script exhausted".into())))
    }
}

/// Scripted reviewer: one queue of review answers, one of feedback lines.
#[derive(Default)]
struct ScriptedReviewer {
    answers: Mutex<VecDeque<io::Result<String>>>,
    feedback: Mutex<VecDeque<io::Result<String>>>,
    shown: Mutex<Vec<String>>,
    feedback_asks: Mutex<u32>,
}

impl ScriptedReviewer {
    fn new(answers: &[&str], feedback: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.iter().map(|a| Ok(a.to_string())).collect()),
            feedback: Mutex::new(feedback.iter().map(|f| Ok(f.to_string())).collect()),
            ..Default::default()
        })
    }

    fn feedback_asks(&self) -> u32 {
        *self.feedback_asks.lock().unwrap()
    }

    fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "input closed")
}

#[async_trait]
impl ReviewPrompt for ScriptedReviewer {
    async fn ask_satisfied(&self, draft: &str) -> io::Result<String> {
        self.shown.lock().unwrap().push(draft.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(closed()))
    }
}

#[async_trait]
impl FeedbackPrompt for ScriptedReviewer {
    async fn ask_feedback(&self) -> io::Result<String> {
        *self.feedback_asks.lock().unwrap() += 1;
        self.feedback
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(closed()))
    }
}

/// Keeps every session it is asked to record.
#[derive(Default)]
struct MemoryRecorder {
    records: Mutex<Vec<Session>>,
}

impl MemoryRecorder {
    fn records(&self) -> Vec<Session> {
        self.records.lock().unwrap().clone()
    }
}

impl SessionRecorder for MemoryRecorder {
    fn record(&self, session: &Session) -> Result<PathBuf, DraftLoopError> {
        let mut records = self.records.lock().unwrap();
        records.push(session.clone());
        Ok(PathBuf::from(format!("/memory/record_{}.txt", records.len())))
    }
}

/// Always fails, the way a read-only output directory would.
#[derive(Default)]
struct DeniedRecorder {
    calls: Mutex<u32>,
}

impl SessionRecorder for DeniedRecorder {
    fn record(&self, _session: &Session) -> Result<PathBuf, DraftLoopError> {
        *self.calls.lock().unwrap() += 1;
        Err(DraftLoopError::persistence(
            "/read-only/final_draft.txt",
            io::Error::from(io::ErrorKind::PermissionDenied),
        ))
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<LoopEvent>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<LoopEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl LoopObserver for RecordingObserver {
    fn notify(&self, event: &LoopEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn controller(
    writer: Arc<ScriptedWriter>,
    reviewer: Arc<ScriptedReviewer>,
    recorder: Arc<dyn SessionRecorder>,
) -> LoopController {
    LoopController::from_collaborators(writer, reviewer, recorder, Arc::new(NullObserver))
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn approve_first_draft() {
    let writer = ScriptedWriter::replying(&["AI changes how firms work."]);
    let reviewer = ScriptedReviewer::new(&["yes"], &[]);
    let recorder = Arc::new(MemoryRecorder::default());

    let outcome = controller(writer.clone(), reviewer.clone(), recorder.clone())
        .run("Testing")
        .await
        .unwrap();

    assert_eq!(writer.prompts(), vec!["Write a document about Testing."]);
    assert_eq!(reviewer.feedback_asks(), 0);
    assert_eq!(outcome.generations, 1);
    assert_eq!(outcome.cycles, 1);
    assert!(outcome.record.is_saved());

    let records = recorder.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].topic(), "Testing");
    assert_eq!(records[0].satisfied, Some(true));
    assert!(records[0].feedback.is_none());
}

#[tokio::test]
async fn reject_once_then_approve() {
    let writer = ScriptedWriter::replying(&["first", "with example", "polished"]);
    let reviewer = ScriptedReviewer::new(&["no", "yes"], &["add an example"]);
    let recorder = Arc::new(MemoryRecorder::default());

    let outcome = controller(writer.clone(), reviewer.clone(), recorder.clone())
        .run("Testing")
        .await
        .unwrap();

    let prompts = writer.prompts();
    assert_eq!(prompts.len(), 3);
    assert_eq!(prompts[0], "Write a document about Testing.");
    assert!(prompts[1].contains("Feedback: add an example"));
    assert!(prompts[1].contains("Original Draft:\nfirst"));
    assert_eq!(prompts[2], "Refine the following document: with example");

    assert_eq!(outcome.generations, 2);
    assert_eq!(outcome.cycles, 2);
    assert_eq!(reviewer.feedback_asks(), 1);
    assert_eq!(reviewer.shown(), vec!["first", "polished"]);

    let records = recorder.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].topic(), "Testing");
    assert_eq!(records[0].draft_text(), Some("polished"));
    // Approval clears the previous round's feedback.
    assert!(records[0].feedback.is_none());
}

#[tokio::test]
async fn failed_save_still_terminates() {
    let writer = ScriptedWriter::replying(&["body"]);
    let reviewer = ScriptedReviewer::new(&["YES"], &[]);
    let recorder = Arc::new(DeniedRecorder::default());
    let observer = Arc::new(RecordingObserver::default());

    let outcome = LoopController::from_collaborators(
        writer,
        reviewer,
        recorder.clone(),
        observer.clone(),
    )
    .run("Testing")
    .await
    .unwrap();

    assert_eq!(*recorder.calls.lock().unwrap(), 1);
    match &outcome.record {
        RecordOutcome::Failed { reason } => assert!(reason.contains("/read-only/final_draft.txt")),
        other => panic!("expected failed record, got {other:?}"),
    }
    assert_eq!(
        outcome.transitions.last().map(|t| t.to),
        Some(LoopState::Terminated)
    );
    assert!(observer
        .events()
        .iter()
        .any(|e| matches!(e, LoopEvent::RecordFailed(_))));
}

#[tokio::test]
async fn generation_error_ends_run_without_record() {
    let writer = ScriptedWriter::new(vec![Err(GenerationError::Request(
        "connection refused".into(),
    ))]);
    let reviewer = ScriptedReviewer::new(&["yes"], &[]);
    let recorder = Arc::new(MemoryRecorder::default());

    let err = controller(writer.clone(), reviewer.clone(), recorder.clone())
        .run("Testing")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DraftLoopError::Generation(GenerationError::Request(_))
    ));
    assert!(err.ends_run());
    assert_eq!(writer.prompts().len(), 1);
    assert!(reviewer.shown().is_empty());
    assert!(recorder.records().is_empty());
}

/// Never completes.
struct StalledWriter;

#[async_trait]
impl TextGenerator for StalledWriter {
    async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_generation_times_out_without_record() {
    let limit = Duration::from_secs(30);
    let reviewer = ScriptedReviewer::new(&["yes"], &[]);
    let recorder = Arc::new(MemoryRecorder::default());

    let err = LoopController::from_collaborators(
        Arc::new(TimeoutGenerator::new(StalledWriter, limit)),
        reviewer.clone(),
        recorder.clone(),
        Arc::new(NullObserver),
    )
    .run("Testing")
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        DraftLoopError::Generation(GenerationError::Timeout(l)) if l == limit
    ));
    assert!(err.ends_run());
    assert!(reviewer.shown().is_empty());
    assert!(recorder.records().is_empty());
}

#[tokio::test]
async fn revision_error_ends_run_without_record() {
    let writer = ScriptedWriter::new(vec![
        Ok("first".into()),
        Err(GenerationError::EmptyCompletion),
    ]);
    let reviewer = ScriptedReviewer::new(&["no"], &["shorter"]);
    let recorder = Arc::new(MemoryRecorder::default());

    let err = controller(writer, reviewer, recorder.clone())
        .run("Testing")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DraftLoopError::Generation(GenerationError::EmptyCompletion)
    ));
    assert!(recorder.records().is_empty());
}

#[tokio::test]
async fn approval_does_not_announce_cleared_feedback() {
    let writer = ScriptedWriter::replying(&["first", "revised", "final"]);
    let reviewer = ScriptedReviewer::new(&["no", "yes"], &["shorter"]);
    let recorder = Arc::new(MemoryRecorder::default());
    let observer = Arc::new(RecordingObserver::default());

    LoopController::from_collaborators(writer, reviewer, recorder.clone(), observer.clone())
        .run("Testing")
        .await
        .unwrap();

    let feedback_events: Vec<_> = observer
        .events()
        .into_iter()
        .filter(|e| matches!(e, LoopEvent::FeedbackRecorded(_)))
        .collect();
    assert_eq!(
        feedback_events,
        vec![LoopEvent::FeedbackRecorded(Some("shorter".into()))]
    );
    assert!(recorder.records()[0].feedback.is_none());
}

// ── Boundaries ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn near_miss_answers_are_rejections() {
    let answers = ["Yes please", "", "y", "  yes  "];
    let writer = ScriptedWriter::replying(&["d0", "r1", "d1", "r2", "d2", "r3", "d3"]);
    let reviewer = ScriptedReviewer::new(&answers, &["a", "b", "c"]);
    let recorder = Arc::new(MemoryRecorder::default());

    let outcome = controller(writer.clone(), reviewer.clone(), recorder.clone())
        .run("Testing")
        .await
        .unwrap();

    assert_eq!(outcome.cycles, 4);
    assert_eq!(outcome.generations, 4);
    assert_eq!(reviewer.feedback_asks(), 3);
    assert_eq!(writer.prompts().len(), 7);
    assert_eq!(recorder.records().len(), 1);
}

#[tokio::test]
async fn empty_topic_and_empty_feedback_are_accepted() {
    let writer = ScriptedWriter::replying(&["d0", "r1", "d1"]);
    let reviewer = ScriptedReviewer::new(&["no", "yes"], &[""]);
    let recorder = Arc::new(MemoryRecorder::default());

    controller(writer.clone(), reviewer, recorder.clone())
        .run("")
        .await
        .unwrap();

    let prompts = writer.prompts();
    assert_eq!(prompts[0], "Write a document about .");
    assert!(prompts[1].contains("Feedback: \n"));
    assert_eq!(recorder.records()[0].topic(), "");
}

#[tokio::test]
async fn refine_prompt_uses_bare_draft_text() {
    let writer = ScriptedWriter::replying(&["d0", "revised", "final"]);
    let reviewer = ScriptedReviewer::new(&["no", "yes"], &["more detail"]);
    let recorder = Arc::new(MemoryRecorder::default());

    controller(writer.clone(), reviewer.clone(), recorder)
        .run("Testing")
        .await
        .unwrap();

    // The refine prompt carries the bare text, not the rendered header.
    assert_eq!(writer.prompts()[2], "Refine the following document: revised");
    assert_eq!(reviewer.shown()[1], "final");
}

#[tokio::test]
async fn closed_review_and_feedback_input_aborts() {
    let writer = ScriptedWriter::replying(&["d0"]);
    let reviewer = ScriptedReviewer::new(&[], &[]);
    let recorder = Arc::new(MemoryRecorder::default());

    let err = controller(writer, reviewer.clone(), recorder.clone())
        .run("Testing")
        .await
        .unwrap_err();

    assert!(matches!(err, DraftLoopError::Input(_)));
    assert_eq!(reviewer.feedback_asks(), 1);
    assert!(recorder.records().is_empty());
}

#[tokio::test]
async fn transition_log_is_bounded() {
    let writer = ScriptedWriter::replying(&["d0", "r1", "d1", "r2", "d2"]);
    let reviewer = ScriptedReviewer::new(&["no", "no", "yes"], &["a", "b"]);
    let recorder = Arc::new(MemoryRecorder::default());

    let outcome = controller(writer, reviewer, recorder)
        .with_log_capacity(3)
        .run("Testing")
        .await
        .unwrap();

    assert_eq!(outcome.transitions.len(), 3);
    let tail: Vec<_> = outcome.transitions.iter().map(|t| (t.from, t.to)).collect();
    assert_eq!(
        tail,
        vec![
            (LoopState::Generate, LoopState::Review),
            (LoopState::Review, LoopState::Record),
            (LoopState::Record, LoopState::Terminated),
        ]
    );
}

// ── Console reviewer and on-disk record ─────────────────────────────────────

#[tokio::test]
async fn console_session_writes_record_file() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ScriptedWriter::replying(&["first", "second", "third"]);
    let human = Arc::new(ConsoleHuman::new(
        &b"no\nadd an example\nyes\n"[..],
        Vec::new(),
    ));
    let recorder = Arc::new(FileRecorder::new(dir.path()));

    let outcome = LoopController::from_collaborators(
        writer,
        human,
        recorder,
        Arc::new(NullObserver),
    )
    .run("Testing")
    .await
    .unwrap();

    let path = outcome.record.path().expect("record saved").clone();
    let name = path.file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("final_draft_"));
    assert!(name.ends_with(".txt"));

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        written,
        format!("Topic: Testing\n\nDraft:\nthird\n\nFeedback: {NO_FEEDBACK}\n")
    );
}
