//! Review gate and feedback collector.

use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::DraftLoopError;
use crate::human::{FeedbackPrompt, ReviewPrompt};
use crate::observer::{LoopEvent, LoopObserver};
use crate::session::Session;

/// The only answer that counts as approval (after trimming and case-folding).
pub const AFFIRMATIVE: &str = "yes";

/// Strict allowlist: `true` only for `yes` in any case with surrounding
/// whitespace. Everything else, including `y`, `Yes please` and the empty
/// string, is `false`.
pub fn parse_satisfaction(raw: &str) -> bool {
    raw.trim().to_lowercase() == AFFIRMATIVE
}

/// Presents the draft and records the reviewer's decision.
pub struct ReviewGate {
    prompt: Arc<dyn ReviewPrompt>,
}

impl ReviewGate {
    pub fn new(prompt: Arc<dyn ReviewPrompt>) -> Self {
        Self { prompt }
    }

    /// Set `session.satisfied`. Never fails: an unreadable answer counts as "no".
    pub async fn review(&self, session: &mut Session) {
        let shown = session
            .draft
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        let satisfied = match self.prompt.ask_satisfied(&shown).await {
            Ok(answer) => parse_satisfaction(&answer),
            Err(e) => {
                warn!(error = %e, "review answer unreadable, treating as not satisfied");
                false
            }
        };

        info!(satisfied, "review recorded");
        session.satisfied = Some(satisfied);
    }
}

/// Gathers free-text feedback after a rejection.
pub struct FeedbackCollector {
    prompt: Arc<dyn FeedbackPrompt>,
    observer: Arc<dyn LoopObserver>,
}

impl FeedbackCollector {
    pub fn new(prompt: Arc<dyn FeedbackPrompt>, observer: Arc<dyn LoopObserver>) -> Self {
        Self { prompt, observer }
    }

    /// Store one line of feedback verbatim when the reviewer is not satisfied;
    /// clear it when they are.
    ///
    /// Fails only if the feedback channel cannot be read at all.
    pub async fn collect(&self, session: &mut Session) -> Result<(), DraftLoopError> {
        if session.is_approved() {
            session.feedback = None;
        } else {
            let feedback = self
                .prompt
                .ask_feedback()
                .await
                .map_err(DraftLoopError::Input)?;
            session.feedback = Some(feedback);
        }

        self.observer
            .notify(&LoopEvent::FeedbackRecorded(session.feedback.clone()));
        Ok(())
    }
}
