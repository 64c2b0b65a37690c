//! # pagewise
//!
//! Terminal client for a remote chat, document summarization, and
//! contextual Q&A service.
//!
//! All computation happens on the backend; this crate owns the request
//! lifecycle around it: one request per user action, a pending flag per
//! view, and state that only changes when a well-formed reply for the
//! current session arrives.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐
//! │  ChatView  │   │DocumentView│──▶ extract (local text)
//! └─────┬──────┘   └─────┬──────┘
//!       └───────┬────────┘
//!               ▼
//!        ┌─────────────┐   ┌───────────────┐
//!        │   Backend   │──▶│ RequestClient │──▶ HTTP backend
//!        └─────────────┘   └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pagewise chat                              # interactive chat
//! pagewise chat -m "What is a monad?"        # one turn
//! pagewise docs report.pdf                   # summarize, then ask
//! pagewise docs data.csv --ask "How many rows?"
//! pagewise --backend https://qa.example.com docs report.pdf --page "Page 2" --ask "Key risk?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and backend origin overrides |
//! | [`client`] | HTTP request client (origin, JSON/multipart, timeouts) |
//! | [`backend`] | Typed backend calls behind the [`backend::Backend`] trait |
//! | [`models`] | Transcript entries, selected files, summary maps |
//! | [`chat`] | Chat view state machine |
//! | [`document`] | Document view: process, select unit, ask |
//! | [`extract`] | Client-side text extraction |
//! | [`chat_cmd`] | `pagewise chat` |
//! | [`docs_cmd`] | `pagewise docs` |
//! | [`shell`] | Input parsing and Ctrl-C cancellation for sessions |
//! | [`logging`] | `tracing` subscriber setup |

pub mod backend;
pub mod chat;
pub mod chat_cmd;
pub mod client;
pub mod config;
pub mod docs_cmd;
pub mod document;
pub mod extract;
pub mod logging;
pub mod models;
pub mod shell;
