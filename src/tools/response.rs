use crate::dom::Snapshot;
use crate::engine::{ConsoleMessage, DownloadInfo, TabInfo};
use crate::error::BrowserError;
use crate::expectation::{ResolvedConsoleOptions, ResolvedSnapshotOptions, Section};
use crate::tools::{ToolContext, ToolResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

/// Binary payload attached to a response (screenshots)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub mime_type: String,
    /// Base64 encoded bytes
    pub data: String,
}

/// Shaped response of one tool call
///
/// Optional sections are present only when the resolved expectation asked
/// for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_messages: Option<Vec<ConsoleMessage>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tabs: Option<Vec<TabInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<Vec<DownloadInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modal_state: Option<String>,

    pub is_error: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ToolResponse {
    pub fn from_error(error: &BrowserError) -> Self {
        Self::error_text(error.to_string())
    }

    pub fn error_text(message: impl Into<String>) -> Self {
        Self {
            result: Some(message.into()),
            is_error: true,
            ..Default::default()
        }
    }

    /// Markdown rendering used as MCP text content
    pub fn to_markdown(&self) -> String {
        let mut sections = Vec::new();

        if let Some(result) = &self.result {
            let heading = if self.is_error { "Error" } else { "Result" };
            sections.push(format!("### {}\n{}", heading, result));
        }
        if let Some(code) = &self.code {
            sections.push(format!("### Ran code\n```js\n{}\n```", code));
        }
        if let Some(modal) = &self.modal_state {
            sections.push(format!("### Modal state\n- {}", modal));
        }
        if let Some(page_state) = &self.page_state {
            sections.push(format!("### Page state\n{}", page_state));
        }
        if let Some(tabs) = &self.tabs {
            let mut out = String::from("### Open tabs");
            if tabs.is_empty() {
                out.push_str("\nNo open tabs");
            }
            for tab in tabs {
                let current = if tab.active { " (current)" } else { "" };
                let _ = write!(out, "\n- {}:{} [{}]({})", tab.index, current, tab.title, tab.url);
            }
            sections.push(out);
        }
        if let Some(messages) = &self.console_messages {
            let mut out = String::from("### Console messages");
            if messages.is_empty() {
                out.push_str("\nNo console messages");
            }
            for message in messages {
                let _ = write!(out, "\n- [{}] {}", message.level, message.text);
            }
            sections.push(out);
        }
        if let Some(downloads) = &self.downloads {
            let mut out = String::from("### Downloads");
            if downloads.is_empty() {
                out.push_str("\nNo downloads");
            }
            for download in downloads {
                let state = if download.finished { "finished" } else { "in progress" };
                let _ = write!(out, "\n- {} ({}) from {}", download.file_name, state, download.url);
            }
            sections.push(out);
        }

        sections.join("\n\n")
    }
}

/// Build the response of a successful tool call under its resolved expectation
pub(crate) async fn build(result: ToolResult, context: ToolContext<'_>) -> ToolResponse {
    let ToolContext {
        page,
        expectation,
        code,
        attachments,
        attached_snapshot,
        ..
    } = context;

    let engine = page.engine().clone();
    let mut notes = Vec::new();
    let mut response = ToolResponse {
        attachments,
        ..Default::default()
    };

    if expectation.includes(Section::Code) && !code.is_empty() {
        response.code = Some(code.join("\n"));
    }

    if expectation.includes(Section::Snapshot) {
        let snapshot = match attached_snapshot {
            Some(snapshot) => Ok(snapshot),
            None => page.capture().await,
        };
        response.page_state = Some(match snapshot {
            Ok(snapshot) => render_page_state(&snapshot, &expectation.snapshot),
            Err(e) => {
                log::warn!("Snapshot unavailable for response: {}", e);
                format!("Snapshot unavailable: {}", e)
            }
        });

        match engine.modal_state().await {
            Ok(modal) => response.modal_state = modal,
            Err(e) => log::warn!("Modal state unavailable: {}", e),
        }
    }

    if expectation.includes(Section::Console) {
        match engine.console_messages().await {
            Ok(messages) => response.console_messages = Some(shape_console(messages, &expectation.console)),
            Err(e) => {
                log::warn!("Console messages unavailable: {}", e);
                notes.push(format!("Console messages unavailable: {}", e));
            }
        }
    }

    if expectation.includes(Section::Tabs) {
        match engine.tabs().await {
            Ok(tabs) => response.tabs = Some(tabs),
            Err(e) => {
                log::warn!("Tab list unavailable: {}", e);
                notes.push(format!("Tab list unavailable: {}", e));
            }
        }
    }

    if expectation.includes(Section::Downloads) {
        match engine.downloads().await {
            Ok(downloads) => response.downloads = Some(downloads),
            Err(e) => {
                log::warn!("Downloads unavailable: {}", e);
                notes.push(format!("Downloads unavailable: {}", e));
            }
        }
    }

    let mut text = result.render();
    for note in notes {
        text.push_str("\n(");
        text.push_str(&note);
        text.push(')');
    }
    response.result = Some(text);
    response
}

fn render_page_state(snapshot: &Arc<Snapshot>, options: &ResolvedSnapshotOptions) -> String {
    let rendered = match snapshot.render(options.format) {
        Ok(rendered) => rendered,
        Err(e) => {
            log::warn!("Snapshot rendering failed: {}", e);
            return format!("Snapshot unavailable: {}", e);
        }
    };
    let body = match options.max_length {
        Some(max) => truncate(&rendered, max),
        None => rendered,
    };
    format!(
        "- Page URL: {}\n- Page Title: {}\n- Page Snapshot:\n{}",
        snapshot.url, snapshot.title, body
    )
}

/// Cut `text` to at most `max` characters, marking the cut
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}\n[... snapshot truncated to {} characters]", &text[..cut], max),
        None => text.to_string(),
    }
}

/// Apply console options: level filter, optional de-duplication, newest `max_messages`
pub fn shape_console(messages: Vec<ConsoleMessage>, options: &ResolvedConsoleOptions) -> Vec<ConsoleMessage> {
    let mut kept: Vec<ConsoleMessage> = messages
        .into_iter()
        .filter(|message| options.levels.contains(&message.level))
        .collect();

    if options.remove_duplicates {
        // keep the latest occurrence of each message
        let mut seen = HashSet::new();
        kept.reverse();
        kept.retain(|message| seen.insert((message.level, message.text.clone())));
        kept.reverse();
    }

    let skip = kept.len().saturating_sub(options.max_messages);
    kept.drain(..skip);
    kept
}
