//! Terminal adapter.
//!
//! Replies are written to an async writer (stdout by default), one line per
//! reply, prefixed with a configurable marker.  [`TerminalInput`] reads
//! utterances line by line from an async reader (stdin by default).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

use lowbot_kernel::{AdapterConf, ChatClient, ClientFactory, RenderedResponse, Utterance};

use crate::error::{AdapterError, Result};

/// Adapter name the terminal registers under by default.
pub const TERMINAL_ADAPTER: &str = "terminal";

/// Prefix written before each reply when none is configured.
pub const DEFAULT_PREFIX: &str = "lowbot> ";

/// Words that end a terminal session.
const EXIT_WORDS: [&str; 2] = ["quit", "exit"];

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Writes replies to a terminal-like stream.
pub struct TerminalClient<W> {
    out: Mutex<W>,
    prefix: String,
}

impl TerminalClient<tokio::io::Stdout> {
    /// A client writing to the process's stdout.
    pub fn stdout(prefix: impl Into<String>) -> Self {
        Self::new(tokio::io::stdout(), prefix)
    }
}

impl<W> TerminalClient<W>
where
    W: AsyncWrite + Send + Unpin,
{
    pub fn new(out: W, prefix: impl Into<String>) -> Self {
        Self {
            out: Mutex::new(out),
            prefix: prefix.into(),
        }
    }

    /// Write one reply and flush.
    pub async fn write_reply(&self, text: &str) -> Result<()> {
        let mut out = self.out.lock().await;
        let line = format!("{}{}\n", self.prefix, text);
        out.write_all(line.as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }

    /// Consume the client and return its writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> ChatClient for TerminalClient<W>
where
    W: AsyncWrite + Send + Unpin,
{
    async fn send(&self, channel: &str, response: &RenderedResponse) -> lowbot_kernel::Result<()> {
        debug!(channel = %channel, bytes = response.as_str().len(), "terminal reply");
        self.write_reply(response.as_str()).await?;
        Ok(())
    }
}

/// Builds stdout-backed [`TerminalClient`]s.
#[derive(Debug, Clone)]
pub struct TerminalFactory {
    prefix: String,
}

impl TerminalFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for TerminalFactory {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl ClientFactory for TerminalFactory {
    fn construct(
        &self,
        _credentials: Option<&AdapterConf>,
    ) -> lowbot_kernel::Result<Arc<dyn ChatClient>> {
        Ok(Arc::new(TerminalClient::stdout(self.prefix.clone())))
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Reads utterances line by line.
///
/// Blank lines are skipped.  End of input, `quit` and `exit` all end the
/// session.
pub struct TerminalInput<R> {
    reader: R,
    adapter: String,
    channel: String,
    author: String,
    line: String,
}

impl TerminalInput<BufReader<Stdin>> {
    /// Read from the process's stdin.
    pub fn stdin(channel: impl Into<String>, author: impl Into<String>) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), channel, author)
    }
}

impl<R> TerminalInput<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, channel: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            reader,
            adapter: TERMINAL_ADAPTER.to_string(),
            channel: channel.into(),
            author: author.into(),
            line: String::new(),
        }
    }

    /// Attribute utterances to a different adapter name.
    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = adapter.into();
        self
    }

    /// The next utterance, or `None` when the session is over.
    pub async fn next_utterance(&mut self) -> Result<Option<Utterance>> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .await
                .map_err(AdapterError::from)?;
            if read == 0 {
                debug!("terminal input closed");
                return Ok(None);
            }

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }
            if EXIT_WORDS.contains(&text) {
                debug!("terminal session ended by user");
                return Ok(None);
            }

            return Ok(Some(Utterance::new(
                self.adapter.clone(),
                self.channel.clone(),
                self.author.clone(),
                text,
            )));
        }
    }
}
