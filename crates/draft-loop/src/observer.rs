//! Best-effort progress channel.
//!
//! Observers only watch; nothing they do feeds back into the session or the
//! state machine, and write failures are swallowed.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

/// Interval between progress ticks while a completion is pending.
pub const DEFAULT_TICK: Duration = Duration::from_millis(500);

/// What the loop is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// Initial or refine call from the generator.
    Generating,
    /// Feedback revision call from the reviser.
    Refining,
}

impl Activity {
    fn label(self) -> &'static str {
        match self {
            Self::Generating => "Generating response",
            Self::Refining => "Refining draft",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    WaitStarted(Activity),
    WaitTick(Activity),
    WaitFinished(Activity),
    /// Feedback stored on the session (`None` when cleared).
    FeedbackRecorded(Option<String>),
    /// The reviser ran without feedback and left the draft alone.
    RevisionSkipped,
    RecordSaved { file_name: String, dir: PathBuf },
    RecordFailed(String),
}

pub trait LoopObserver: Send + Sync {
    fn notify(&self, event: &LoopEvent);
}

/// Discards every event.
pub struct NullObserver;

impl LoopObserver for NullObserver {
    fn notify(&self, _event: &LoopEvent) {}
}

/// Routes events to `tracing` instead of the terminal.
pub struct TracingObserver;

impl LoopObserver for TracingObserver {
    fn notify(&self, event: &LoopEvent) {
        match event {
            LoopEvent::WaitStarted(activity) => info!(activity = activity.label(), "waiting"),
            LoopEvent::WaitTick(_) => {}
            LoopEvent::WaitFinished(activity) => info!(activity = activity.label(), "done"),
            LoopEvent::FeedbackRecorded(feedback) => {
                info!(feedback = feedback.as_deref().unwrap_or("None"), "feedback recorded")
            }
            LoopEvent::RevisionSkipped => info!("no feedback, revision skipped"),
            LoopEvent::RecordSaved { file_name, dir } => {
                info!(file = %file_name, dir = %dir.display(), "draft saved")
            }
            LoopEvent::RecordFailed(reason) => warn!(%reason, "draft not saved"),
        }
    }
}

/// Prints progress and notices to stdout.
pub struct ConsoleObserver {
    show_progress: bool,
}

impl ConsoleObserver {
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }
}

impl LoopObserver for ConsoleObserver {
    fn notify(&self, event: &LoopEvent) {
        let mut out = std::io::stdout().lock();
        let _ = match event {
            LoopEvent::WaitStarted(activity) if self.show_progress => {
                write!(out, "🧠 {}", activity.label())
            }
            LoopEvent::WaitTick(_) if self.show_progress => write!(out, "."),
            LoopEvent::WaitFinished(_) if self.show_progress => writeln!(out, "\n"),
            LoopEvent::WaitStarted(_) | LoopEvent::WaitTick(_) | LoopEvent::WaitFinished(_) => {
                Ok(())
            }
            LoopEvent::FeedbackRecorded(feedback) => writeln!(
                out,
                "Feedback recorded: {}",
                feedback.as_deref().unwrap_or("None")
            ),
            LoopEvent::RevisionSkipped => {
                writeln!(out, "No feedback provided, skipping refinement.")
            }
            LoopEvent::RecordSaved { file_name, dir } => {
                writeln!(out, "✅ Draft saved as {file_name} in {}", dir.display())
            }
            LoopEvent::RecordFailed(reason) => writeln!(out, "❌ Failed to save draft: {reason}"),
        };
        let _ = out.flush();
    }
}

/// Await `fut`, ticking the observer every `tick` until it resolves.
pub async fn with_progress<F, T>(
    observer: &dyn LoopObserver,
    activity: Activity,
    tick: Duration,
    fut: F,
) -> T
where
    F: Future<Output = T>,
{
    observer.notify(&LoopEvent::WaitStarted(activity));
    tokio::pin!(fut);
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
    let output = loop {
        tokio::select! {
            output = &mut fut => break output,
            _ = ticker.tick() => observer.notify(&LoopEvent::WaitTick(activity)),
        }
    };
    observer.notify(&LoopEvent::WaitFinished(activity));
    output
}
