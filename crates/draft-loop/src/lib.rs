//! Human-in-the-loop document drafting.
//!
//! A text-generation collaborator writes a draft, a human reviews it, and the
//! loop revises against their feedback until they approve; the approved
//! session is then written to disk.
//!
//! ```text
//! Generate → Review → Record → Terminated
//!              ↓ not satisfied
//!        CollectFeedback → Revise → Generate …
//! ```
//!
//! | Module          | Purpose                                                |
//! |-----------------|--------------------------------------------------------|
//! | `state_machine` | Loop states, transition table, transition log          |
//! | `controller`    | Drives a session through the state machine             |
//! | `generator`     | Text-generation seam and initial / refine drafting     |
//! | `reviser`       | Feedback-driven revision                               |
//! | `review`        | Review gate and feedback collector                     |
//! | `human`         | Reviewer capability traits and the console reviewer    |
//! | `recorder`      | Plain-text persistence of approved sessions            |
//! | `observer`      | Best-effort progress channel                           |
//! | `config`        | Endpoint / runtime configuration                       |
//! | `errors`        | Error taxonomy                                         |

pub mod config;
pub mod controller;
pub mod errors;
pub mod generator;
pub mod human;
pub mod observer;
pub mod prompts;
pub mod recorder;
pub mod review;
pub mod reviser;
pub mod session;
pub mod state_machine;

pub use config::DraftConfig;
pub use controller::{LoopController, LoopOutcome, RecordOutcome};
pub use errors::{DraftLoopError, ErrorCategory, GenerationError};
pub use generator::{DraftGenerator, RigGenerator, TextGenerator, TimeoutGenerator};
pub use human::{ConsoleHuman, FeedbackPrompt, ReviewPrompt};
pub use observer::{ConsoleObserver, LoopEvent, LoopObserver, NullObserver, TracingObserver};
pub use recorder::{FileRecorder, SessionRecorder};
pub use session::{Draft, DraftKind, Session};
pub use state_machine::{LoopState, StateMachine};
