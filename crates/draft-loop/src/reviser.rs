//! Feedback-driven revision of the current draft.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::errors::GenerationError;
use crate::generator::TextGenerator;
use crate::observer::{with_progress, Activity, LoopEvent, LoopObserver, DEFAULT_TICK};
use crate::prompts;
use crate::session::{Draft, Session};

/// Rewrites the draft against reviewer feedback.
///
/// Shares its collaborator with the `DraftGenerator`. Only ever touches
/// `session.draft`.
pub struct Reviser {
    backend: Arc<dyn TextGenerator>,
    observer: Arc<dyn LoopObserver>,
    tick: Duration,
}

impl Reviser {
    pub fn new(backend: Arc<dyn TextGenerator>, observer: Arc<dyn LoopObserver>) -> Self {
        Self {
            backend,
            observer,
            tick: DEFAULT_TICK,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// With feedback present, replace the draft with a refined completion.
    /// Without feedback this is a no-op.
    ///
    /// Returns whether the draft changed.
    pub async fn revise(&self, session: &mut Session) -> Result<bool, GenerationError> {
        let Some(feedback) = session.feedback.as_deref() else {
            debug!("no feedback, skipping revision");
            self.observer.notify(&LoopEvent::RevisionSkipped);
            return Ok(false);
        };

        let prompt = prompts::revise(feedback, session.draft_text().unwrap_or_default());
        let text = with_progress(
            self.observer.as_ref(),
            Activity::Refining,
            self.tick,
            self.backend.complete(&prompt),
        )
        .await?;

        session.replace_draft(Draft::refined(text));
        info!(
            revision = session.draft.as_ref().map_or(0, |d| d.revision),
            "draft revised from feedback"
        );
        Ok(true)
    }
}
