// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fetch tool handler.
//!
//! Issues a single HTTP GET through the SSRF guard. Redirects are followed
//! manually (capped at 3) so every target is re-validated. The response
//! body is capped at 10 MiB; reaching the cap is an error, not a silent
//! truncation. HTML responses are converted to plain text unless the caller
//! asks for markup.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use scraper::{Html, Node};
use serde::Deserialize;

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::context::Context;
use crate::error::ToolError;
use crate::safety::validate_url;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::tools::{parse_arguments, FETCH_MAX_BODY_BYTES, FETCH_MAX_REDIRECTS, FETCH_TIMEOUT_MS};
use crate::types::{InputSchema, PropertySchema, ToolDefinition};

const USER_AGENT: &str = "code-editing-agent/1.0";

/// Handler for the `fetch` tool.
pub struct FetchHandler {
    client: reqwest::Client,
}

impl FetchHandler {
    pub fn new() -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ToolError::IoError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

/// Arguments for the fetch tool.
#[derive(Debug, Deserialize)]
struct FetchArgs {
    /// The URL to fetch.
    url: String,

    /// Return raw markup instead of extracted text.
    #[serde(default, rename = "includeMarkup")]
    include_markup: bool,
}

#[async_trait]
impl ToolHandler for FetchHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "fetch",
            "Fetch a public http(s) URL; HTML is converted to plain text unless includeMarkup is set",
        )
        .with_schema(
            InputSchema::new()
                .with_property("url", PropertySchema::string("The URL to fetch"))
                .with_property(
                    "includeMarkup",
                    PropertySchema::boolean("Return raw markup instead of extracted text"),
                )
                .with_required(&["url"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, ctx, input), fields(url, status)))]
    async fn execute(
        &self,
        ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: FetchArgs = parse_arguments(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("url", args.url.as_str());

        ctx.check()?;

        // Never extend a tighter parent deadline
        let deadline =
            Instant::now() + ctx.bounded_timeout(Duration::from_millis(FETCH_TIMEOUT_MS));

        let mut url = validate_url(&args.url).await?;
        let mut redirects = 0usize;

        let response = loop {
            let response = self
                .bounded(deadline, self.client.get(url.clone()).send())
                .await?
                .map_err(|e| ToolError::IoError(format!("request failed: {e}")))?;

            let status = response.status();

            #[cfg(feature = "telemetry")]
            tracing::Span::current().record("status", status.as_u16());

            if status.is_redirection() {
                redirects += 1;
                if redirects > FETCH_MAX_REDIRECTS {
                    return Err(ToolError::IoError(format!(
                        "too many redirects (limit {FETCH_MAX_REDIRECTS})"
                    )));
                }
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        ToolError::IoError(format!("redirect without Location header ({status})"))
                    })?;
                let target = url
                    .join(location)
                    .map_err(|e| ToolError::InvalidInput(format!("invalid redirect target: {e}")))?;
                // Every redirect target passes the full SSRF checks again
                url = validate_url(target.as_str()).await?;
                continue;
            }

            if status.as_u16() >= 400 {
                let reason = if status.as_u16() == 403 {
                    "authorization required"
                } else {
                    status.canonical_reason().unwrap_or("error")
                };
                return Err(ToolError::IoError(format!(
                    "HTTP {} ({reason})",
                    status.as_u16()
                )));
            }

            break response;
        };

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false);

        let mut body: Vec<u8> = Vec::new();
        let mut response = response;
        loop {
            let chunk = self
                .bounded(deadline, response.chunk())
                .await?
                .map_err(|e| ToolError::IoError(format!("failed to read body: {e}")))?;
            let Some(chunk) = chunk else { break };
            if body.len() + chunk.len() > FETCH_MAX_BODY_BYTES {
                return Err(ToolError::Truncated(format!(
                    "response body exceeds {FETCH_MAX_BODY_BYTES} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }

        let text = String::from_utf8_lossy(&body).into_owned();

        #[cfg(feature = "telemetry")]
        debug!(bytes = body.len(), html = is_html, "Fetch complete");

        if is_html && !args.include_markup {
            Ok(ToolOutput::success(html_to_text(&text)))
        } else {
            Ok(ToolOutput::success(text))
        }
    }
}

impl FetchHandler {
    /// Await a future, bounded by the remaining deadline.
    async fn bounded<T>(
        &self,
        deadline: Instant,
        future: impl std::future::Future<Output = T>,
    ) -> Result<T, ToolError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ToolError::Timeout(FETCH_TIMEOUT_MS));
        }
        tokio::time::timeout(remaining, future)
            .await
            .map_err(|_| ToolError::Timeout(FETCH_TIMEOUT_MS))
    }
}

/// Convert HTML to plain text: text nodes only, whitespace collapsed to
/// single spaces. Script/style bodies, comments, and doctypes are ignored.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut words: Vec<String> = Vec::new();

    for node in document.root_element().descendants() {
        if let Node::Text(text) = node.value() {
            let in_raw_element = node.ancestors().any(|ancestor| match ancestor.value() {
                Node::Element(element) => matches!(element.name(), "script" | "style"),
                _ => false,
            });
            if in_raw_element {
                continue;
            }
            words.extend(text.split_whitespace().map(str::to_string));
        }
    }

    words.join(" ")
}
