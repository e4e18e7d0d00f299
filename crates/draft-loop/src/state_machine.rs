//! Drafting loop state machine: explicit states and legal transition guards.
//!
//! Provides a typed state model for the revision loop so that:
//! 1. The transition table is a first-class value that can be tested without
//!    any collaborator in place.
//! 2. Illegal transitions are rejected by `advance()` instead of silently
//!    taking effect.
//! 3. The sequence of states of a run can be reconstructed from the log.
//!
//! ```text
//! Generate → Review → Record → Terminated
//!              ↓ not satisfied
//!        CollectFeedback → Revise → Generate …
//! ```
//!
//! The graph has exactly one cycle and exactly one exit edge (`Review → Record`).
//! There is no iteration cap: the reviewer decides when the loop ends.

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Default number of transition records kept in memory.
pub const DEFAULT_MAX_LOGGED_TRANSITIONS: usize = 256;

/// The set of loop states.
///
/// Every run starts at `Generate` and the only terminal state is `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Producing a first draft, or refining the current one.
    Generate,
    /// Showing the draft to the reviewer and recording satisfaction.
    Review,
    /// Asking the reviewer what to change.
    CollectFeedback,
    /// Rewriting the draft against the collected feedback.
    Revise,
    /// Persisting the approved session.
    Record,
    /// Run finished. Terminal.
    Terminated,
}

impl LoopState {
    /// Whether this is a terminal state (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// The state that follows `self`, given the reviewer's latest decision.
    ///
    /// Only `Review` reads `satisfied`; anything other than `Some(true)` routes
    /// to feedback collection. `Terminated` maps to itself, which
    /// [`StateMachine::advance`] rejects.
    pub fn successor(self, satisfied: Option<bool>) -> LoopState {
        match self {
            Self::Generate => Self::Review,
            Self::Review if satisfied == Some(true) => Self::Record,
            Self::Review => Self::CollectFeedback,
            Self::CollectFeedback => Self::Revise,
            Self::Revise => Self::Generate,
            Self::Record => Self::Terminated,
            Self::Terminated => Self::Terminated,
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => write!(f, "Generate"),
            Self::Review => write!(f, "Review"),
            Self::CollectFeedback => write!(f, "CollectFeedback"),
            Self::Revise => write!(f, "Revise"),
            Self::Record => write!(f, "Record"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Legal transitions between loop states.
///
/// ```text
/// Generate → Review
/// Review → Record | CollectFeedback
/// CollectFeedback → Revise
/// Revise → Generate
/// Record → Terminated
/// ```
fn is_legal_transition(from: LoopState, to: LoopState) -> bool {
    use LoopState::*;

    matches!(
        (from, to),
        (Generate, Review)
            | (Review, Record)
            | (Review, CollectFeedback)
            | (CollectFeedback, Revise)
            | (Revise, Generate)
            | (Record, Terminated)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: LoopState,
    pub to: LoopState,
    /// Review cycle the transition belongs to (1-based).
    pub cycle: u32,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: LoopState,
    pub to: LoopState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal state transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// The loop state machine.
///
/// Tracks the current state and review cycle, enforces legal transitions and
/// keeps a bounded log of the most recent transitions. The loop itself is
/// unbounded, so the log drops its oldest entries once `max_logged` is reached.
pub struct StateMachine {
    current: LoopState,
    cycle: u32,
    created_at: Instant,
    transitions: VecDeque<TransitionRecord>,
    total_transitions: u64,
    max_logged: usize,
}

impl StateMachine {
    /// Create a new state machine starting at `Generate` in cycle 1.
    pub fn new() -> Self {
        Self::with_log_capacity(DEFAULT_MAX_LOGGED_TRANSITIONS)
    }

    pub fn with_log_capacity(max_logged: usize) -> Self {
        Self {
            current: LoopState::Generate,
            cycle: 1,
            created_at: Instant::now(),
            transitions: VecDeque::new(),
            total_transitions: 0,
            max_logged,
        }
    }

    pub fn current(&self) -> LoopState {
        self.current
    }

    /// The current review cycle (1-based, bumped on every `Revise → Generate`).
    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Attempt to move to `to`.
    ///
    /// Returns `Err(IllegalTransition)` if the edge is not in the graph.
    pub fn advance(&mut self, to: LoopState, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            cycle: self.cycle,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            from = %self.current,
            to = %to,
            cycle = self.cycle,
            "State transition"
        );

        if self.max_logged > 0 {
            if self.transitions.len() == self.max_logged {
                self.transitions.pop_front();
            }
            self.transitions.push_back(record);
        }
        self.total_transitions += 1;

        if self.current == LoopState::Revise && to == LoopState::Generate {
            self.cycle += 1;
        }
        self.current = to;
        Ok(())
    }

    /// Follow the transition table from the current state.
    ///
    /// Returns the new state.
    pub fn step(&mut self, satisfied: Option<bool>) -> Result<LoopState, IllegalTransition> {
        let to = self.current.successor(satisfied);
        let reason = match (self.current, to) {
            (LoopState::Review, LoopState::Record) => Some("reviewer approved"),
            (LoopState::Review, LoopState::CollectFeedback) => Some("reviewer not satisfied"),
            _ => None,
        };
        self.advance(to, reason)?;
        Ok(to)
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// The retained transition log, oldest first.
    pub fn transitions(&self) -> Vec<TransitionRecord> {
        self.transitions.iter().cloned().collect()
    }

    /// Number of transitions taken, including ones dropped from the log.
    pub fn total_transitions(&self) -> u64 {
        self.total_transitions
    }

    /// One-line summary of the run so far.
    pub fn summary(&self) -> String {
        let states: Vec<String> = self.transitions.iter().map(|t| t.to.to_string()).collect();
        let dropped = self.total_transitions - self.transitions.len() as u64;
        let head = format!(
            "{} → {} ({}ms, {} transitions, {} cycles)",
            LoopState::Generate,
            self.current,
            self.created_at.elapsed().as_millis(),
            self.total_transitions,
            self.cycle,
        );
        if states.is_empty() {
            head
        } else if dropped > 0 {
            format!("{head} [… {}]", states.join(" → "))
        } else {
            format!("{head} [{}]", states.join(" → "))
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
