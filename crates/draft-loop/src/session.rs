//! The session record threaded through every loop step.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Header written in front of refined drafts when they are rendered.
pub const REFINED_DRAFT_HEADER: &str = "Refined Draft:";

/// Whether a draft is a first pass or the result of a feedback revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftKind {
    /// Produced by the generator, from the topic or by refining the previous draft.
    Generated,
    /// Produced by the reviser from reviewer feedback.
    Refined,
}

/// One complete draft text. Each step replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub text: String,
    pub kind: DraftKind,
    /// How many drafts were produced before this one in the session.
    pub revision: u32,
}

impl Draft {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: DraftKind::Generated,
            revision: 0,
        }
    }

    pub fn refined(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: DraftKind::Refined,
            revision: 0,
        }
    }

    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }
}

/// Refined drafts render with a leading `Refined Draft:` line.
impl fmt::Display for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DraftKind::Generated => write!(f, "{}", self.text),
            DraftKind::Refined => write!(f, "{REFINED_DRAFT_HEADER}\n{}", self.text),
        }
    }
}

/// The mutable record for one run of the loop.
///
/// Created once with only a topic. Each step mutates it in place; the
/// controller owns it exclusively for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    topic: String,
    pub draft: Option<Draft>,
    pub feedback: Option<String>,
    pub satisfied: Option<bool>,
}

impl Session {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            draft: None,
            feedback: None,
            satisfied: None,
        }
    }

    /// The topic is fixed at construction.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn draft_text(&self) -> Option<&str> {
        self.draft.as_ref().map(|d| d.text.as_str())
    }

    pub fn is_approved(&self) -> bool {
        self.satisfied == Some(true)
    }

    /// Install a new draft, numbering it after the one it replaces.
    pub fn replace_draft(&mut self, draft: Draft) {
        let revision = self.draft.as_ref().map_or(0, |d| d.revision + 1);
        self.draft = Some(draft.with_revision(revision));
    }
}
