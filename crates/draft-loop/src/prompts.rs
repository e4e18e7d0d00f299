//! Instruction texts sent to the text-generation collaborator.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever any template below
//! changes, so logged generations can be traced back to the wording that
//! produced them.

/// Prompt version. Bump on any template change.
pub const PROMPT_VERSION: &str = "1.0.0";

/// System preamble for the writer agent.
pub const WRITER_PREAMBLE: &str = "\
You are a careful technical writer. Produce complete, well-structured documents \
in plain text. Answer with the document only.";

/// First-pass instruction built from the topic alone.
pub fn initial(topic: &str) -> String {
    format!("Write a document about {topic}.")
}

/// Refine instruction embedding the full existing draft (no diffing, no truncation).
pub fn refine(draft: &str) -> String {
    format!("Refine the following document: {draft}")
}

/// Revision instruction embedding the reviewer's feedback and the prior draft verbatim.
pub fn revise(feedback: &str, draft: &str) -> String {
    format!(
        "Please revise the following draft to better address the feedback provided. \
         Be clear, concise, and accurate.\n\n\
         Feedback: {feedback}\n\n\
         Original Draft:\n{draft}"
    )
}
