//! Loop controller. Drives one session through the state machine.
//!
//! ```text
//! LoopController::run(topic)
//!   → Session::new(topic)
//!   → loop until Terminated:
//!       run the step for the current state (generate / review / collect / revise / record)
//!       StateMachine::step(session.satisfied)
//!   → LoopOutcome { session, record, ... }
//! ```
//!
//! Generation and input failures end the run with `Err`. A failed save does
//! not: the run still reaches `Terminated` and the failure is carried in
//! `LoopOutcome::record`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use crate::errors::DraftLoopError;
use crate::generator::{DraftGenerator, TextGenerator};
use crate::human::{FeedbackPrompt, ReviewPrompt};
use crate::observer::{LoopEvent, LoopObserver};
use crate::recorder::SessionRecorder;
use crate::review::{FeedbackCollector, ReviewGate};
use crate::reviser::Reviser;
use crate::session::Session;
use crate::state_machine::{
    IllegalTransition, LoopState, StateMachine, TransitionRecord, DEFAULT_MAX_LOGGED_TRANSITIONS,
};

/// Result of the `Record` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RecordOutcome {
    Saved { path: PathBuf },
    Failed { reason: String },
}

impl RecordOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Saved { path } => Some(path),
            Self::Failed { .. } => None,
        }
    }
}

/// Everything a finished run leaves behind.
#[derive(Debug, Clone, Serialize)]
pub struct LoopOutcome {
    /// The approved session as it was handed to the recorder.
    pub session: Session,
    pub record: RecordOutcome,
    /// Review cycles taken (1 when the first draft was approved).
    pub cycles: u32,
    /// Number of `Generate` steps executed.
    pub generations: u32,
    /// Most recent transitions, oldest first.
    pub transitions: Vec<TransitionRecord>,
    pub summary: String,
}

pub struct LoopController {
    generator: DraftGenerator,
    gate: ReviewGate,
    collector: FeedbackCollector,
    reviser: Reviser,
    recorder: Arc<dyn SessionRecorder>,
    observer: Arc<dyn LoopObserver>,
    max_logged_transitions: usize,
}

impl LoopController {
    pub fn new(
        generator: DraftGenerator,
        gate: ReviewGate,
        collector: FeedbackCollector,
        reviser: Reviser,
        recorder: Arc<dyn SessionRecorder>,
        observer: Arc<dyn LoopObserver>,
    ) -> Self {
        Self {
            generator,
            gate,
            collector,
            reviser,
            recorder,
            observer,
            max_logged_transitions: DEFAULT_MAX_LOGGED_TRANSITIONS,
        }
    }

    /// Wire all steps from one text collaborator and one human.
    pub fn from_collaborators<H>(
        backend: Arc<dyn TextGenerator>,
        human: Arc<H>,
        recorder: Arc<dyn SessionRecorder>,
        observer: Arc<dyn LoopObserver>,
    ) -> Self
    where
        H: ReviewPrompt + FeedbackPrompt + 'static,
    {
        let generator = DraftGenerator::new(Arc::clone(&backend), Arc::clone(&observer));
        let reviser = Reviser::new(backend, Arc::clone(&observer));
        let gate = ReviewGate::new(human.clone());
        let collector = FeedbackCollector::new(human, Arc::clone(&observer));
        Self::new(generator, gate, collector, reviser, recorder, observer)
    }

    pub fn with_log_capacity(mut self, max_logged_transitions: usize) -> Self {
        self.max_logged_transitions = max_logged_transitions;
        self
    }

    /// Progress tick interval for both generation and revision waits.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.generator = self.generator.with_tick(tick);
        self.reviser = self.reviser.with_tick(tick);
        self
    }

    /// Run a fresh session for `topic` until the reviewer approves.
    pub async fn run(&self, topic: impl Into<String>) -> Result<LoopOutcome, DraftLoopError> {
        let mut session = Session::new(topic);
        let mut sm = StateMachine::with_log_capacity(self.max_logged_transitions);
        let mut generations = 0u32;

        info!(topic = %session.topic(), "drafting session starting");

        loop {
            match sm.current() {
                LoopState::Generate => {
                    if let Err(e) = self.generator.generate(&mut session).await {
                        error!(cycle = sm.cycle(), error = %e, "generation failed");
                        return Err(e.into());
                    }
                    generations += 1;
                }
                LoopState::Review => self.gate.review(&mut session).await,
                LoopState::CollectFeedback => self.collector.collect(&mut session).await?,
                LoopState::Revise => {
                    debug_assert!(
                        session.feedback.is_some(),
                        "reviser reached without feedback after a rejection"
                    );
                    if let Err(e) = self.reviser.revise(&mut session).await {
                        error!(cycle = sm.cycle(), error = %e, "revision failed");
                        return Err(e.into());
                    }
                }
                LoopState::Record => {
                    // Approved sessions are saved without the previous round's feedback.
                    session.feedback = None;
                    let record = self.persist(&session);
                    sm.step(session.satisfied)?;

                    let summary = sm.summary();
                    info!(summary = %summary, saved = record.is_saved(), "drafting session finished");
                    return Ok(LoopOutcome {
                        session,
                        record,
                        cycles: sm.cycle(),
                        generations,
                        transitions: sm.transitions(),
                        summary,
                    });
                }
                LoopState::Terminated => {
                    return Err(IllegalTransition {
                        from: LoopState::Terminated,
                        to: LoopState::Generate,
                    }
                    .into());
                }
            }
            sm.step(session.satisfied)?;
        }
    }

    fn persist(&self, session: &Session) -> RecordOutcome {
        match self.recorder.record(session) {
            Ok(path) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let dir = path.parent().map(PathBuf::from).unwrap_or_default();
                self.observer
                    .notify(&LoopEvent::RecordSaved { file_name, dir });
                RecordOutcome::Saved { path }
            }
            Err(e) => {
                error!(error = %e, "failed to save approved draft");
                let reason = e.to_string();
                self.observer.notify(&LoopEvent::RecordFailed(reason.clone()));
                RecordOutcome::Failed { reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_outcome_serializes_with_status_tag() {
        let saved = RecordOutcome::Saved {
            path: PathBuf::from("/tmp/final_draft_20240309_120507.txt"),
        };
        let json = serde_json::to_value(&saved).unwrap();
        assert_eq!(json["status"], "saved");
        assert_eq!(json["path"], "/tmp/final_draft_20240309_120507.txt");
        assert!(saved.is_saved());

        let failed = RecordOutcome::Failed {
            reason: "permission denied".into(),
        };
        assert_eq!(serde_json::to_value(&failed).unwrap()["status"], "failed");
        assert!(failed.path().is_none());
    }
}
