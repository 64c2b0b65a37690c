//! `pagewise docs <file>`: process a document, then answer questions.
//!
//! With `--ask` the command answers once and exits. Otherwise it reads
//! questions from stdin; lines starting with `/` are session commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/pages` | list summarized units, marking the selection |
//! | `/page <label\|all>` | ground questions in one unit or all of them |
//! | `/open <path>` | select and process another file |
//! | `/show` | reprint summaries or the text preview, and the last answer |
//! | `/quit` | leave |

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::backend::Backend;
use crate::config::Config;
use crate::document::{
    AskOutcome, DocumentContent, DocumentError, DocumentView, ProcessPlan, Processed,
    UnitSelection,
};
use crate::models::SelectedFile;
use crate::shell::{
    cancellable, next_line, parse_input, preview, prompt, stdin_is_tty, Input, LineRead,
    SessionEnd,
};

const COMMANDS: &[&str] = &[
    "quit", "exit", "help", "pages", "page", "show", "open",
];

const HELP: &str = "\
/pages             list summarized pages
/page <label|all>  ask about one page or all of them
/open <path>       process another file
/show              print the summaries or text preview again
/quit              leave";

/// Arguments of the `docs` subcommand.
#[derive(Debug, Clone)]
pub struct DocsArgs {
    pub file: PathBuf,
    pub ask: Option<String>,
    pub page: Option<String>,
}

/// Entry point for the `docs` subcommand.
pub async fn run_docs(
    config: &Config,
    backend: &dyn Backend,
    args: DocsArgs,
) -> Result<SessionEnd> {
    let mut view = DocumentView::new();
    let mut stdout = std::io::stdout();
    let preview_chars = config.document.preview_chars;

    open_file(&mut view, &args.file).await?;
    let processed = process(&mut view, backend).await?;
    print_processed(&view, &processed, preview_chars, &mut stdout)?;

    if let Some(page) = &args.page {
        view.select_label(page)?;
    }

    match args.ask {
        Some(question) => {
            view.set_question(question);
            ask(&mut view, backend).await?;
            print_answer(&view, &mut stdout)?;
            Ok(SessionEnd::Finished)
        }
        None => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let interactive = stdin_is_tty();
            docs_session(&mut view, backend, stdin, &mut stdout, preview_chars, interactive).await
        }
    }
}

/// Read `path` from disk and make it the selected file.
async fn open_file(view: &mut DocumentView, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    view.select_file(SelectedFile::new(name, bytes));
    Ok(())
}

async fn process(
    view: &mut DocumentView,
    backend: &dyn Backend,
) -> Result<Processed, DocumentError> {
    match view.begin_process()? {
        ProcessPlan::Done(processed) => Ok(processed),
        ProcessPlan::Upload(ticket) => {
            let result = cancellable(backend.summarize(ticket.file())).await;
            view.finish_upload(ticket, result)
        }
    }
}

async fn ask(view: &mut DocumentView, backend: &dyn Backend) -> Result<AskOutcome, DocumentError> {
    let ticket = view.begin_ask()?;
    let result = cancellable(backend.ask_with_context(ticket.question(), ticket.context())).await;
    view.finish_ask(ticket, result)
}

fn print_content(view: &DocumentView, preview_chars: usize, out: &mut impl Write) -> Result<()> {
    match view.content() {
        Some(DocumentContent::Summaries(map)) => {
            for unit in map.iter() {
                writeln!(out, "== {} ==", unit.label)?;
                writeln!(out, "{}", unit.text)?;
                writeln!(out)?;
            }
        }
        Some(DocumentContent::RawText(text)) => {
            writeln!(out, "{}", preview(text, preview_chars))?;
        }
        None => {}
    }
    Ok(())
}

fn print_processed(
    view: &DocumentView,
    processed: &Processed,
    preview_chars: usize,
    out: &mut impl Write,
) -> Result<()> {
    let name = view.file().map(|f| f.name.as_str()).unwrap_or_default();
    match processed {
        Processed::Summarized { units } => {
            writeln!(out, "Summarized {} into {} page(s).", name, units)?;
            print_content(view, preview_chars, out)?;
        }
        Processed::Loaded { chars } => {
            writeln!(out, "Loaded {} ({} characters).", name, chars)?;
            print_content(view, preview_chars, out)?;
        }
        Processed::Discarded => {}
    }
    Ok(())
}

fn print_answer(view: &DocumentView, out: &mut impl Write) -> Result<()> {
    if let Some(answer) = view.answer() {
        writeln!(out, "Answer:")?;
        writeln!(out, "{}", answer)?;
    }
    Ok(())
}

fn print_pages(view: &DocumentView, out: &mut impl Write) -> Result<()> {
    let Some(map) = view.summaries() else {
        writeln!(out, "! {}", DocumentError::NoPages)?;
        return Ok(());
    };
    let mark = |selected: bool| if selected { "*" } else { " " };
    writeln!(
        out,
        "{} {}",
        mark(view.selection() == &UnitSelection::AllPages),
        UnitSelection::AllPages
    )?;
    for label in map.labels() {
        let selected = matches!(view.selection(), UnitSelection::Unit(l) if l == label);
        writeln!(out, "{} {}", mark(selected), label)?;
    }
    Ok(())
}

/// Read commands and questions until EOF, `/quit`, or Ctrl-C at the
/// prompt. Failures are printed as alerts and the session carries on.
pub async fn docs_session<R, W>(
    view: &mut DocumentView,
    backend: &dyn Backend,
    reader: R,
    out: &mut W,
    preview_chars: usize,
    interactive: bool,
) -> Result<SessionEnd>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = reader.lines();
    if interactive {
        writeln!(out, "Ask a question about the document. /help lists commands.")?;
    }

    loop {
        prompt(out, interactive, "ask")?;
        let line = match next_line(&mut lines).await? {
            LineRead::Line(line) => line,
            LineRead::Eof => break,
            LineRead::Interrupted => {
                writeln!(out)?;
                return Ok(SessionEnd::Interrupted);
            }
        };

        let result: Result<()> = match parse_input(&line, COMMANDS) {
            Input::Command {
                name: "quit" | "exit",
                ..
            } => break,
            Input::Command { name: "help", .. } => writeln!(out, "{}", HELP).map_err(Into::into),
            Input::Command { name: "pages", .. } => print_pages(view, out),
            Input::Command { name: "page", arg } => {
                match view.select_label(arg) {
                    Ok(()) => writeln!(out, "(asking about {})", view.selection()).map_err(Into::into),
                    Err(e) => Err(e.into()),
                }
            }
            Input::Command { name: "show", .. } => {
                print_content(view, preview_chars, out).and_then(|()| print_answer(view, out))
            }
            Input::Command { name: "open", arg } if !arg.is_empty() => {
                match open_file(view, Path::new(arg)).await {
                    Ok(()) => match process(view, backend).await {
                        Ok(processed) => print_processed(view, &processed, preview_chars, out),
                        Err(e) => Err(e.into()),
                    },
                    Err(e) => Err(e),
                }
            }
            Input::Command { name: "open", .. } => {
                writeln!(out, "usage: /open <path>").map_err(Into::into)
            }
            Input::Command { name, .. } => {
                writeln!(out, "unknown command: /{}", name).map_err(Into::into)
            }
            Input::Text(text) if text.trim().is_empty() => Ok(()),
            Input::Text(text) => {
                view.set_question(text);
                if interactive {
                    writeln!(out, "(getting answer...)")?;
                }
                match ask(view, backend).await {
                    Ok(AskOutcome::Answered) => print_answer(view, out),
                    Ok(AskOutcome::Discarded) => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }
        };

        if let Err(e) = result {
            writeln!(out, "! {}", e)?;
        }
    }

    Ok(SessionEnd::Finished)
}
