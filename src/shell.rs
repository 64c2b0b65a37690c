//! Helpers shared by the interactive `chat` and `docs` sessions.

use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufRead, Lines};

use crate::client::ApiError;

/// One line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    /// `/name arg...`
    Command { name: &'a str, arg: &'a str },
    /// Anything else, untouched.
    Text(&'a str),
}

/// Split a line into a session command or free text. Only names listed in
/// `commands` are commands, so text such as `/etc/hosts?` is left alone.
pub fn parse_input<'a>(line: &'a str, commands: &[&str]) -> Input<'a> {
    let command = line
        .trim_start()
        .strip_prefix('/')
        .map(|rest| rest.split_once(char::is_whitespace).unwrap_or((rest, "")))
        .filter(|(name, _)| commands.contains(name));
    match command {
        Some((name, arg)) => Input::Command {
            name,
            arg: arg.trim(),
        },
        None => Input::Text(line),
    }
}

/// What waiting at the prompt produced.
#[derive(Debug, PartialEq, Eq)]
pub enum LineRead {
    Line(String),
    Eof,
    /// Ctrl-C while no request was in flight.
    Interrupted,
}

/// How an interactive session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// `/quit`, end of input, or a one-shot command.
    Finished,
    /// Ctrl-C at an idle prompt.
    Interrupted,
}

/// Wait for the next input line, or for Ctrl-C at an idle prompt.
///
/// Once a request has been raced against Ctrl-C the process keeps its
/// SIGINT handler, so the prompt has to listen for the signal itself.
pub async fn next_line<R>(lines: &mut Lines<R>) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => Ok(line?.map_or(LineRead::Eof, LineRead::Line)),
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted at the prompt");
            Ok(LineRead::Interrupted)
        }
    }
}

/// Race a request against Ctrl-C. Dropping the request future cancels it.
pub async fn cancellable<T>(
    request: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::select! {
        result = request => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("request cancelled by user");
            Err(ApiError::Cancelled)
        }
    }
}

/// Print a prompt when a person is typing.
pub fn prompt(out: &mut impl Write, interactive: bool, label: &str) -> std::io::Result<()> {
    if interactive {
        write!(out, "{}> ", label)?;
        out.flush()?;
    }
    Ok(())
}

/// Whether stdin is a terminal.
pub fn stdin_is_tty() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// First `max_chars` characters followed by `...`.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
