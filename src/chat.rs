//! Chat view: an append-only transcript driven by one request per turn.
//!
//! ```text
//!   idle ──submit (non-empty)──▶ awaiting-reply ──reply / error──▶ idle
//! ```
//!
//! A turn appends the user's entry immediately and exactly one bot entry
//! when the request settles, so the transcript grows by two per completed
//! turn. Failures never leak into the transcript: the bot entry becomes
//! [`FALLBACK_REPLY`] and the error is logged.
//!
//! Turns are split into [`ChatView::begin_turn`] / [`ChatView::finish_turn`]
//! so a caller can race the request against cancellation. Each ticket
//! carries the transcript generation it was issued under; clearing the
//! transcript bumps the generation and any reply for the old transcript is
//! dropped.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::backend::{Backend, TextReply};
use crate::client::ApiError;
use crate::models::TranscriptEntry;

/// Bot entry appended when a turn fails for any reason.
pub const FALLBACK_REPLY: &str = "Something went wrong. Please try again.";

static CITATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[0-9]+\]").expect("citation pattern is valid"));

/// Remove bracketed numeric citation markers such as `[3]`.
///
/// Runs to a fixed point, so `"[1[2]]"` is fully removed and applying the
/// function twice always equals applying it once.
pub fn strip_citations(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        match CITATION_MARKER.replace_all(&current, "") {
            Cow::Borrowed(_) => return current,
            Cow::Owned(next) => current = next,
        }
    }
}

/// Why a submission did not start a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    /// Input is empty after trimming. Nothing was recorded.
    Empty,
    /// A turn is already in flight.
    Pending,
}

/// An in-flight turn. Hand it back to [`ChatView::finish_turn`].
#[derive(Debug)]
#[must_use = "a turn ticket must be finished to clear the pending flag"]
pub struct TurnTicket {
    generation: u64,
    message: String,
}

impl TurnTicket {
    /// The message exactly as typed (untrimmed).
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing happened: empty input or a turn already in flight.
    Rejected(SubmitRejected),
    /// The cleaned reply was appended.
    Replied,
    /// The request failed; [`FALLBACK_REPLY`] was appended.
    Failed(ApiError),
    /// The transcript was cleared while the request was in flight.
    Discarded,
}

#[derive(Debug, Default)]
pub struct ChatView {
    transcript: Vec<TranscriptEntry>,
    input: String,
    pending: bool,
    generation: u64,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Start a turn from the current input.
    ///
    /// On success the user entry is already in the transcript, the input is
    /// cleared, and the view is pending.
    pub fn begin_turn(&mut self) -> Result<TurnTicket, SubmitRejected> {
        if self.pending {
            return Err(SubmitRejected::Pending);
        }
        if self.input.trim().is_empty() {
            return Err(SubmitRejected::Empty);
        }

        let message = std::mem::take(&mut self.input);
        self.transcript.push(TranscriptEntry::user(message.clone()));
        self.pending = true;
        debug!(generation = self.generation, "chat turn started");

        Ok(TurnTicket {
            generation: self.generation,
            message,
        })
    }

    /// Settle a turn. Always clears the pending flag.
    pub fn finish_turn(
        &mut self,
        ticket: TurnTicket,
        result: Result<TextReply, ApiError>,
    ) -> TurnOutcome {
        self.pending = false;

        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "dropping reply for a cleared transcript"
            );
            return TurnOutcome::Discarded;
        }

        match result {
            Ok(reply) => {
                let text = strip_citations(reply.response.as_deref().unwrap_or(""));
                self.transcript.push(TranscriptEntry::bot(text));
                TurnOutcome::Replied
            }
            Err(err) => {
                warn!(error = %err, "chat request failed");
                self.transcript.push(TranscriptEntry::bot(FALLBACK_REPLY));
                TurnOutcome::Failed(err)
            }
        }
    }

    /// Submit the current input and wait for the reply.
    pub async fn submit(&mut self, backend: &dyn Backend) -> TurnOutcome {
        let ticket = match self.begin_turn() {
            Ok(ticket) => ticket,
            Err(rejected) => return TurnOutcome::Rejected(rejected),
        };
        let result = backend.chat(ticket.message()).await;
        self.finish_turn(ticket, result)
    }

    /// Start a fresh transcript. An in-flight turn stays pending until it
    /// settles, but its reply is discarded.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.input.clear();
        self.generation += 1;
    }

    /// Pretty-printed JSON copy of the transcript.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.transcript)
    }
}
