//! Backend contract.
//!
//! The three calls the views make, typed on top of [`RequestClient`]:
//!
//! | Call | Path | Request | Response |
//! |------|------|---------|----------|
//! | chat turn | `POST /chat` | `{ "message" }` | `{ "response" }` |
//! | summarize | `POST /summarize` | multipart field `file` | `{ "summary": { label: text } }` |
//! | contextual ask | `POST /ask_with_context` | `{ "message", "page_text" }` | `{ "response" }` |
//!
//! The views only see the [`Backend`] trait, so tests drive them with an
//! in-memory implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::{ApiError, RequestBody, RequestClient, RequestOptions};
use crate::config::Config;
use crate::models::{SelectedFile, SummaryMap};

pub const CHAT_PATH: &str = "/chat";
pub const SUMMARIZE_PATH: &str = "/summarize";
pub const ASK_PATH: &str = "/ask_with_context";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    message: &'a str,
    page_text: &'a str,
}

/// Reply to `/chat` and `/ask_with_context`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TextReply {
    #[serde(default)]
    pub response: Option<String>,
}

impl TextReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }
}

/// Reply to `/summarize`. A missing `summary` is a malformed success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SummarizeReply {
    #[serde(default)]
    pub summary: Option<SummaryMap>,
}

/// Remote service used by both views.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn chat(&self, message: &str) -> Result<TextReply, ApiError>;

    async fn summarize(&self, file: &SelectedFile) -> Result<SummarizeReply, ApiError>;

    async fn ask_with_context(&self, question: &str, page_text: &str)
        -> Result<TextReply, ApiError>;
}

/// [`Backend`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: RequestClient,
    summarize_timeout: Duration,
    ask_timeout: Duration,
}

impl HttpBackend {
    pub fn new(client: RequestClient, summarize_timeout: Duration, ask_timeout: Duration) -> Self {
        Self {
            client,
            summarize_timeout,
            ask_timeout,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            RequestClient::from_config(config)?,
            config.summarize_timeout(),
            config.ask_timeout(),
        ))
    }

    pub fn client(&self) -> &RequestClient {
        &self.client
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn chat(&self, message: &str) -> Result<TextReply, ApiError> {
        let body = serde_json::to_value(ChatRequest { message })
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        self.client
            .post(CHAT_PATH, RequestBody::Json(body), RequestOptions::default())
            .await
    }

    async fn summarize(&self, file: &SelectedFile) -> Result<SummarizeReply, ApiError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str("application/pdf")
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        self.client
            .post(
                SUMMARIZE_PATH,
                RequestBody::Multipart(form),
                RequestOptions::with_timeout(self.summarize_timeout),
            )
            .await
    }

    async fn ask_with_context(
        &self,
        question: &str,
        page_text: &str,
    ) -> Result<TextReply, ApiError> {
        let body = serde_json::to_value(AskRequest {
            message: question,
            page_text,
        })
        .map_err(|e| ApiError::Decode(e.to_string()))?;
        self.client
            .post(
                ASK_PATH,
                RequestBody::Json(body),
                RequestOptions::with_timeout(self.ask_timeout),
            )
            .await
    }
}

/// Scripted in-memory backend for unit tests.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Chat(String),
        Summarize(String),
        Ask { question: String, page_text: String },
    }

    pub struct FakeBackend {
        pub chat_reply: Result<TextReply, ApiError>,
        pub summarize_reply: Result<SummarizeReply, ApiError>,
        pub ask_reply: Result<TextReply, ApiError>,
        pub calls: Mutex<Vec<Call>>,
    }

    impl Default for FakeBackend {
        fn default() -> Self {
            Self {
                chat_reply: Ok(TextReply::default()),
                summarize_reply: Ok(SummarizeReply::default()),
                ask_reply: Ok(TextReply::default()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl FakeBackend {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn chat(&self, message: &str) -> Result<TextReply, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Chat(message.to_string()));
            self.chat_reply.clone()
        }

        async fn summarize(&self, file: &SelectedFile) -> Result<SummarizeReply, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Summarize(file.name.clone()));
            self.summarize_reply.clone()
        }

        async fn ask_with_context(
            &self,
            question: &str,
            page_text: &str,
        ) -> Result<TextReply, ApiError> {
            self.calls.lock().unwrap().push(Call::Ask {
                question: question.to_string(),
                page_text: page_text.to_string(),
            });
            self.ask_reply.clone()
        }
    }
}
