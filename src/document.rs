//! Document view: process one file, then ask questions about it.
//!
//! # Phase A: process
//!
//! - no file selected → [`DocumentError::NoFile`], nothing sent;
//! - `pdf` → multipart upload to `/summarize`; the reply's `summary` map
//!   replaces any previous content;
//! - anything else → read locally by [`crate::extract`], no network call.
//!
//! # Phase B: ask
//!
//! Once the view holds content, a question is sent to `/ask_with_context`
//! together with a context text derived from the current unit selection
//! (see [`DocumentView::context_text`]).
//!
//! # Invariants
//!
//! - Summaries and raw text never coexist: both live in one
//!   [`DocumentContent`] slot, replaced wholesale.
//! - A failed request changes nothing except the pending flag.
//! - Selecting a new file bumps the generation; a reply issued under an
//!   older generation is dropped when it arrives.

use std::fmt;
use tracing::{debug, warn};

use crate::backend::{Backend, SummarizeReply, TextReply};
use crate::client::ApiError;
use crate::extract::{extract_local, ExtractError, FileKind};
use crate::models::{SelectedFile, SummaryMap};

/// Label shown for the whole-document selection.
pub const ALL_PAGES: &str = "All pages";

/// Answer stored when the backend replies without text.
pub const NO_RESPONSE: &str = "No response.";

/// Which part of a summarized document a question is about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UnitSelection {
    #[default]
    AllPages,
    Unit(String),
}

impl UnitSelection {
    /// `"All pages"` (any case) or `"all"` select the whole document.
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case(ALL_PAGES) || label.eq_ignore_ascii_case("all") {
            UnitSelection::AllPages
        } else {
            UnitSelection::Unit(label.to_string())
        }
    }
}

impl fmt::Display for UnitSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitSelection::AllPages => f.write_str(ALL_PAGES),
            UnitSelection::Unit(label) => f.write_str(label),
        }
    }
}

/// What the view currently knows about the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentContent {
    Summaries(SummaryMap),
    RawText(String),
}

/// A user-facing failure. `Display` is the alert text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    NoFile,
    NotProcessed,
    EmptyQuestion,
    Busy,
    NoSummary,
    NoPages,
    UnknownUnit(String),
    Unreadable(ExtractError),
    ProcessFailed(ApiError),
    AskFailed(ApiError),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::NoFile => f.write_str("Please upload a file first."),
            DocumentError::NotProcessed => f.write_str("Please process a file first."),
            DocumentError::EmptyQuestion => f.write_str("Please type a question."),
            DocumentError::Busy => f.write_str("A request is already in progress."),
            DocumentError::NoSummary => f.write_str("No summary returned."),
            DocumentError::NoPages => f.write_str("Only summarized PDFs have pages to choose."),
            DocumentError::UnknownUnit(label) => write!(f, "No page named '{}'.", label),
            DocumentError::Unreadable(e) => write!(f, "Could not read the file: {}.", e),
            DocumentError::ProcessFailed(_) => {
                f.write_str("Something went wrong while processing the file.")
            }
            DocumentError::AskFailed(_) => {
                f.write_str("Something went wrong while asking the question.")
            }
        }
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocumentError::Unreadable(e) => Some(e),
            DocumentError::ProcessFailed(e) | DocumentError::AskFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// Result of a settled process action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// The backend summarized the PDF into this many units.
    Summarized { units: usize },
    /// The file was read locally.
    Loaded { chars: usize },
    /// A different file was selected while the upload was in flight.
    Discarded,
}

/// Result of a settled ask action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    Answered,
    Discarded,
}

/// What [`DocumentView::begin_process`] decided to do.
#[derive(Debug)]
pub enum ProcessPlan {
    /// Local read already finished.
    Done(Processed),
    /// Upload required. Send `ticket.file()` and hand the result to
    /// [`DocumentView::finish_upload`].
    Upload(UploadTicket),
}

#[derive(Debug)]
#[must_use = "an upload ticket must be finished to clear the pending flag"]
pub struct UploadTicket {
    generation: u64,
    file: SelectedFile,
}

impl UploadTicket {
    pub fn file(&self) -> &SelectedFile {
        &self.file
    }
}

#[derive(Debug)]
#[must_use = "an ask ticket must be finished to clear the pending flag"]
pub struct AskTicket {
    generation: u64,
    question: String,
    context: String,
}

impl AskTicket {
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

#[derive(Debug, Default)]
pub struct DocumentView {
    file: Option<SelectedFile>,
    content: Option<DocumentContent>,
    selection: UnitSelection,
    question: String,
    answer: Option<String>,
    pending: bool,
    generation: u64,
}

impl DocumentView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn content(&self) -> Option<&DocumentContent> {
        self.content.as_ref()
    }

    pub fn summaries(&self) -> Option<&SummaryMap> {
        match &self.content {
            Some(DocumentContent::Summaries(map)) => Some(map),
            _ => None,
        }
    }

    pub fn raw_text(&self) -> Option<&str> {
        match &self.content {
            Some(DocumentContent::RawText(text)) => Some(text),
            _ => None,
        }
    }

    pub fn selection(&self) -> &UnitSelection {
        &self.selection
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether questions can be asked.
    pub fn can_ask(&self) -> bool {
        self.content.is_some()
    }

    /// Replace the selected file. Clears content, answer, and unit
    /// selection; an in-flight request keeps the view pending but its
    /// result will be discarded.
    pub fn select_file(&mut self, file: SelectedFile) {
        debug!(name = %file.name, bytes = file.bytes.len(), "file selected");
        self.file = Some(file);
        self.content = None;
        self.answer = None;
        self.selection = UnitSelection::AllPages;
        self.generation += 1;
    }

    pub fn set_question(&mut self, question: impl Into<String>) {
        self.question = question.into();
    }

    /// Choose the unit that questions are grounded in.
    pub fn select_unit(&mut self, selection: UnitSelection) -> Result<(), DocumentError> {
        match (&self.content, &selection) {
            (None, _) => Err(DocumentError::NotProcessed),
            (Some(_), UnitSelection::AllPages) => {
                self.selection = selection;
                Ok(())
            }
            (Some(DocumentContent::RawText(_)), UnitSelection::Unit(_)) => {
                Err(DocumentError::NoPages)
            }
            (Some(DocumentContent::Summaries(map)), UnitSelection::Unit(label)) => {
                if !map.contains(label) {
                    return Err(DocumentError::UnknownUnit(label.clone()));
                }
                self.selection = selection;
                Ok(())
            }
        }
    }

    /// Select by a typed label. A page literally named `all` or
    /// `All pages` wins over the whole-document shorthand.
    pub fn select_label(&mut self, label: &str) -> Result<(), DocumentError> {
        let label = label.trim();
        let selection = match self.summaries() {
            Some(map) if map.contains(label) => UnitSelection::Unit(label.to_string()),
            _ => UnitSelection::parse(label),
        };
        self.select_unit(selection)
    }

    /// Context sent with a question, or `None` before processing.
    ///
    /// With summaries, `All pages` joins every summary with a blank line in
    /// map order and a specific unit uses only its own summary. Raw text is
    /// used verbatim.
    pub fn context_text(&self) -> Option<String> {
        match self.content.as_ref()? {
            DocumentContent::Summaries(map) => Some(match &self.selection {
                UnitSelection::AllPages => map.joined(),
                UnitSelection::Unit(label) => map.get(label).unwrap_or_default().to_string(),
            }),
            DocumentContent::RawText(text) => Some(text.clone()),
        }
    }

    /// Validate and start processing the selected file.
    pub fn begin_process(&mut self) -> Result<ProcessPlan, DocumentError> {
        if self.pending {
            return Err(DocumentError::Busy);
        }
        let file = self.file.as_ref().ok_or(DocumentError::NoFile)?;

        if FileKind::of(file) != FileKind::Pdf {
            let text = extract_local(file).map_err(|e| {
                warn!(name = %file.name, error = %e, "local extraction failed");
                DocumentError::Unreadable(e)
            })?;
            let chars = text.chars().count();
            self.content = Some(DocumentContent::RawText(text));
            self.selection = UnitSelection::AllPages;
            return Ok(ProcessPlan::Done(Processed::Loaded { chars }));
        }

        let ticket = UploadTicket {
            generation: self.generation,
            file: file.clone(),
        };
        self.pending = true;
        debug!(name = %ticket.file.name, "uploading for summarization");
        Ok(ProcessPlan::Upload(ticket))
    }

    /// Settle an upload. Always clears the pending flag; state changes
    /// only on a well-formed reply for the current file.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<SummarizeReply, ApiError>,
    ) -> Result<Processed, DocumentError> {
        self.pending = false;

        if ticket.generation != self.generation {
            debug!(name = %ticket.file.name, "dropping summary for a replaced file");
            return Ok(Processed::Discarded);
        }

        let reply = result.map_err(|e| {
            warn!(name = %ticket.file.name, error = %e, "error processing file");
            DocumentError::ProcessFailed(e)
        })?;
        let summary = reply.summary.ok_or_else(|| {
            warn!(name = %ticket.file.name, "summarize reply has no summary field");
            DocumentError::NoSummary
        })?;

        let units = summary.len();
        self.content = Some(DocumentContent::Summaries(summary));
        self.selection = UnitSelection::AllPages;
        Ok(Processed::Summarized { units })
    }

    /// Process the selected file end to end.
    pub async fn process(&mut self, backend: &dyn Backend) -> Result<Processed, DocumentError> {
        match self.begin_process()? {
            ProcessPlan::Done(processed) => Ok(processed),
            ProcessPlan::Upload(ticket) => {
                let result = backend.summarize(ticket.file()).await;
                self.finish_upload(ticket, result)
            }
        }
    }

    /// Validate the current question and start asking it.
    pub fn begin_ask(&mut self) -> Result<AskTicket, DocumentError> {
        if self.pending {
            return Err(DocumentError::Busy);
        }
        let context = self.context_text().ok_or(DocumentError::NotProcessed)?;
        if self.question.trim().is_empty() {
            return Err(DocumentError::EmptyQuestion);
        }

        self.pending = true;
        Ok(AskTicket {
            generation: self.generation,
            question: self.question.clone(),
            context,
        })
    }

    /// Settle a question. A failure keeps the previous answer.
    pub fn finish_ask(
        &mut self,
        ticket: AskTicket,
        result: Result<TextReply, ApiError>,
    ) -> Result<AskOutcome, DocumentError> {
        self.pending = false;

        if ticket.generation != self.generation {
            debug!("dropping answer for a replaced file");
            return Ok(AskOutcome::Discarded);
        }

        let reply = result.map_err(|e| {
            warn!(error = %e, "error asking question");
            DocumentError::AskFailed(e)
        })?;
        let answer = reply
            .response
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| NO_RESPONSE.to_string());
        self.answer = Some(answer);
        Ok(AskOutcome::Answered)
    }

    /// Ask the current question end to end.
    pub async fn ask(&mut self, backend: &dyn Backend) -> Result<AskOutcome, DocumentError> {
        let ticket = self.begin_ask()?;
        let result = backend
            .ask_with_context(ticket.question(), ticket.context())
            .await;
        self.finish_ask(ticket, result)
    }
}
