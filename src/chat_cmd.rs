//! `pagewise chat`: one-shot message or interactive transcript.
//!
//! Session commands: `/clear`, `/save <path>`, `/help`, `/quit`.

use anyhow::{anyhow, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::backend::Backend;
use crate::chat::{ChatView, SubmitRejected, TurnOutcome};
use crate::models::Sender;
use crate::shell::{
    cancellable, next_line, parse_input, prompt, stdin_is_tty, Input, LineRead, SessionEnd,
};

const COMMANDS: &[&str] = &["quit", "exit", "help", "clear", "save"];

const HELP: &str = "\
/clear         start a new transcript
/save <path>   write the transcript as JSON
/quit          leave the chat";

/// Entry point for the `chat` subcommand.
pub async fn run_chat(backend: &dyn Backend, message: Option<String>) -> Result<SessionEnd> {
    let mut view = ChatView::new();
    let mut stdout = std::io::stdout();

    match message {
        Some(message) => {
            send_once(&mut view, backend, message, &mut stdout).await?;
            Ok(SessionEnd::Finished)
        }
        None => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            chat_session(&mut view, backend, stdin, &mut stdout, stdin_is_tty()).await
        }
    }
}

/// Send one turn, racing it against Ctrl-C.
async fn send(view: &mut ChatView, backend: &dyn Backend) -> TurnOutcome {
    let ticket = match view.begin_turn() {
        Ok(ticket) => ticket,
        Err(rejected) => return TurnOutcome::Rejected(rejected),
    };
    let result = cancellable(backend.chat(ticket.message())).await;
    view.finish_turn(ticket, result)
}

/// Print bot entries appended since `from`.
fn print_replies(view: &ChatView, from: usize, out: &mut impl Write) -> std::io::Result<()> {
    for entry in &view.transcript()[from..] {
        if entry.sender == Sender::Bot {
            writeln!(out, "bot> {}", entry.text)?;
        }
    }
    Ok(())
}

/// `chat --message`: print the reply, fail the process if the turn failed.
pub async fn send_once(
    view: &mut ChatView,
    backend: &dyn Backend,
    message: String,
    out: &mut impl Write,
) -> Result<()> {
    view.set_input(message);
    let before = view.transcript().len();
    let outcome = send(view, backend).await;
    print_replies(view, before, out)?;

    match outcome {
        TurnOutcome::Failed(err) => Err(anyhow!(err).context("chat request failed")),
        _ => Ok(()),
    }
}

/// Read lines until EOF, `/quit`, or Ctrl-C at the prompt, one turn per line.
pub async fn chat_session<R, W>(
    view: &mut ChatView,
    backend: &dyn Backend,
    reader: R,
    out: &mut W,
    interactive: bool,
) -> Result<SessionEnd>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = reader.lines();
    if interactive {
        writeln!(out, "Type a message. /help lists commands.")?;
    }

    loop {
        prompt(out, interactive, "you")?;
        let line = match next_line(&mut lines).await? {
            LineRead::Line(line) => line,
            LineRead::Eof => break,
            LineRead::Interrupted => {
                writeln!(out)?;
                return Ok(SessionEnd::Interrupted);
            }
        };

        match parse_input(&line, COMMANDS) {
            Input::Command {
                name: "quit" | "exit",
                ..
            } => break,
            Input::Command { name: "help", .. } => writeln!(out, "{}", HELP)?,
            Input::Command { name: "clear", .. } => {
                view.clear();
                writeln!(out, "(transcript cleared)")?;
            }
            Input::Command { name: "save", arg } => {
                if arg.is_empty() {
                    writeln!(out, "usage: /save <path>")?;
                    continue;
                }
                let written = view
                    .export_json()
                    .map_err(anyhow::Error::from)
                    .and_then(|json| std::fs::write(arg, json).map_err(anyhow::Error::from));
                match written {
                    Ok(()) => writeln!(out, "(saved {} entries to {})", view.transcript().len(), arg)?,
                    Err(e) => writeln!(out, "! could not save transcript: {}", e)?,
                }
            }
            Input::Command { name, .. } => writeln!(out, "unknown command: /{}", name)?,
            Input::Text(text) => {
                view.set_input(text);
                let before = view.transcript().len();
                if interactive && !text.trim().is_empty() {
                    writeln!(out, "(bot is typing...)")?;
                }
                match send(view, backend).await {
                    TurnOutcome::Rejected(SubmitRejected::Empty) | TurnOutcome::Discarded => {}
                    TurnOutcome::Rejected(SubmitRejected::Pending) => {
                        writeln!(out, "(still waiting for the previous reply)")?;
                    }
                    TurnOutcome::Replied | TurnOutcome::Failed(_) => {
                        print_replies(view, before, out)?;
                    }
                }
            }
        }
    }

    Ok(SessionEnd::Finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::backend::TextReply;
    use crate::chat::FALLBACK_REPLY;
    use crate::client::ApiError;

    fn echo_backend() -> FakeBackend {
        FakeBackend {
            chat_reply: Ok(TextReply::new("Rust is fast [1].")),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_session_prints_one_reply_per_message() {
        let backend = echo_backend();
        let mut view = ChatView::new();
        let mut out = Vec::new();
        let input: &[u8] = b"hello\n\n   \nwhy rust?\n";

        chat_session(&mut view, &backend, input, &mut out, false)
            .await
            .unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed, "bot> Rust is fast .\nbot> Rust is fast .\n");
        assert_eq!(view.transcript().len(), 4);
        assert!(!view.is_pending());
    }

    #[tokio::test]
    async fn test_session_clear_and_save() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("transcript.json");
        let backend = echo_backend();
        let mut view = ChatView::new();
        let mut out = Vec::new();
        let script = format!("one\n/clear\ntwo\n/save {}\n/quit\nnever sent\n", path.display());

        chat_session(&mut view, &backend, script.as_bytes(), &mut out, false)
            .await
            .unwrap();

        assert_eq!(view.transcript().len(), 2);
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved[0]["text"], "two");
        assert_eq!(saved[1]["sender"], "bot");
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("(transcript cleared)"));
        assert!(printed.contains("(saved 2 entries"));
    }

    #[tokio::test]
    async fn test_session_sends_slash_led_text_as_message() {
        let backend = echo_backend();
        let mut view = ChatView::new();
        let mut out = Vec::new();
        let input: &[u8] = b"/etc/hosts is what?\n";

        chat_session(&mut view, &backend, input, &mut out, false)
            .await
            .unwrap();

        assert_eq!(view.transcript()[0].text, "/etc/hosts is what?");
        assert_eq!(view.transcript().len(), 2);
        assert_eq!(String::from_utf8(out).unwrap(), "bot> Rust is fast .\n");
    }

    #[tokio::test]
    async fn test_send_once_failure_prints_fallback_and_errors() {
        let backend = FakeBackend {
            chat_reply: Err(ApiError::Network("connection refused".to_string())),
            ..Default::default()
        };
        let mut view = ChatView::new();
        let mut out = Vec::new();

        let err = send_once(&mut view, &backend, "hi".to_string(), &mut out)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("chat request failed"));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("bot> {}\n", FALLBACK_REPLY)
        );
    }

    #[tokio::test]
    async fn test_send_once_empty_message_is_noop() {
        let backend = echo_backend();
        let mut view = ChatView::new();
        let mut out = Vec::new();
        send_once(&mut view, &backend, "  ".to_string(), &mut out)
            .await
            .unwrap();
        assert!(out.is_empty());
        assert!(backend.calls().is_empty());
    }
}
