//! Human collaborator capabilities.
//!
//! The loop never touches stdin directly. It asks a `ReviewPrompt` for a
//! satisfaction answer and a `FeedbackPrompt` for free text, so tests can
//! script both and the binary can wire them to the terminal.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

pub const REVIEW_QUESTION: &str = "Are you satisfied with the draft? (yes/no): ";
pub const FEEDBACK_QUESTION: &str = "Please provide your feedback on the draft: ";

/// Shows a draft and returns the reviewer's raw one-line answer.
#[async_trait]
pub trait ReviewPrompt: Send + Sync {
    async fn ask_satisfied(&self, draft: &str) -> io::Result<String>;
}

/// Returns one raw line of reviewer feedback.
#[async_trait]
pub trait FeedbackPrompt: Send + Sync {
    async fn ask_feedback(&self) -> io::Result<String>;
}

/// Terminal-style reviewer over any buffered reader / writer pair.
///
/// End of input is reported as `UnexpectedEof`.
pub struct ConsoleHuman<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl ConsoleHuman<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleHuman<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Recover the writer, e.g. to inspect what was shown in tests.
    pub fn into_output(self) -> W {
        self.output.into_inner()
    }

    async fn show(&self, text: &str) -> io::Result<()> {
        let mut out = self.output.lock().await;
        out.write_all(text.as_bytes()).await?;
        out.flush().await
    }

    async fn read_line(&self) -> io::Result<String> {
        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed",
            ));
        }
        let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed_len);
        Ok(line)
    }
}

#[async_trait]
impl<R, W> ReviewPrompt for ConsoleHuman<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn ask_satisfied(&self, draft: &str) -> io::Result<String> {
        self.show(&format!("\n📝 Draft:\n{draft}\n\n{REVIEW_QUESTION}"))
            .await?;
        self.read_line().await
    }
}

#[async_trait]
impl<R, W> FeedbackPrompt for ConsoleHuman<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn ask_feedback(&self) -> io::Result<String> {
        self.show(FEEDBACK_QUESTION).await?;
        self.read_line().await
    }
}
