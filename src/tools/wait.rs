use crate::error::{BrowserError, Result};
use crate::tools::utils::js_string;
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Longest plain sleep a single call may request
pub const MAX_WAIT_MS: u64 = 30_000;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WaitForParams {
    /// Sleep for this many milliseconds (capped at 30000)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,

    /// Wait until this text appears on the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Wait until this text disappears from the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_gone: Option<String>,

    /// Give up on `text` / `text_gone` after this many milliseconds (default: 5000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5_000
}

/// Script returning whether `text` is visible in the main document
pub fn text_probe_script(text: &str) -> String {
    format!(
        "document.body !== null && document.body.innerText.includes({})",
        js_string(text)
    )
}

#[derive(Default)]
pub struct WaitForTool;

#[async_trait::async_trait]
impl Tool for WaitForTool {
    type Params = WaitForParams;

    fn name(&self) -> &str {
        "wait_for"
    }

    async fn execute_typed(&self, params: WaitForParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        if params.time_ms.is_none() && params.text.is_none() && params.text_gone.is_none() {
            return Err(BrowserError::InvalidArgument(
                "One of time_ms, text or text_gone is required".to_string(),
            ));
        }

        let mut done = Vec::new();

        if let Some(time_ms) = params.time_ms {
            let time_ms = time_ms.min(MAX_WAIT_MS);
            tokio::time::sleep(Duration::from_millis(time_ms)).await;
            context.add_code(format!("await new Promise(f => setTimeout(f, {}));", time_ms));
            done.push(format!("waited {}ms", time_ms));
        }

        let timeout = Duration::from_millis(params.timeout_ms);

        if let Some(text) = &params.text {
            wait_for_text(context, text, true, timeout).await?;
            context.add_code(format!("await page.getByText({}).first().waitFor({{ state: 'visible' }});", js_string(text)));
            done.push(format!("\"{}\" appeared", text));
        }

        if let Some(text) = &params.text_gone {
            wait_for_text(context, text, false, timeout).await?;
            context.add_code(format!("await page.getByText({}).first().waitFor({{ state: 'hidden' }});", js_string(text)));
            done.push(format!("\"{}\" disappeared", text));
        }

        Ok(ToolResult::success().with_text(format!("Done: {}", done.join(", "))))
    }
}

async fn wait_for_text(context: &ToolContext<'_>, text: &str, present: bool, timeout: Duration) -> Result<()> {
    let engine = context.page.engine().clone();
    let main = engine.main_frame();
    let script = text_probe_script(text);
    let deadline = Instant::now() + timeout;

    loop {
        match engine.evaluate(&main, &script).await {
            Ok(value) if value.as_bool() == Some(present) => return Ok(()),
            Ok(_) => {}
            Err(e) => log::debug!("Text probe failed, retrying: {}", e),
        }

        if Instant::now() >= deadline {
            let state = if present { "appear" } else { "disappear" };
            return Err(BrowserError::ToolExecutionFailed {
                tool: "wait_for".to_string(),
                reason: format!("Timed out after {}ms waiting for \"{}\" to {}", timeout.as_millis(), text, state),
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;
    use crate::tools::testing::form_page;
    use serde_json::json;

    #[test]
    fn test_text_probe_script_escapes() {
        assert_eq!(
            text_probe_script("say \"hi\""),
            r#"document.body !== null && document.body.innerText.includes("say \"hi\"")"#
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_time_is_capped() {
        let (_engine, mut page, _input, _button) = form_page();
        let registry = ToolRegistry::with_defaults();
        let started = Instant::now();

        let response = registry
            .execute(
                "wait_for",
                json!({"time_ms": 120_000, "expectation": {"includeSnapshot": false}}),
                &mut page,
            )
            .await;

        assert!(!response.is_error);
        assert_eq!(started.elapsed(), Duration::from_millis(MAX_WAIT_MS));
        assert_eq!(response.result.as_deref(), Some("Done: waited 30000ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_visible_text() {
        let (engine, mut page, _input, _button) = form_page();
        engine.set_evaluation(&text_probe_script("Saved"), json!(true));
        let registry = ToolRegistry::with_defaults();

        let response = registry.execute("wait_for", json!({"text": "Saved"}), &mut page).await;

        assert!(!response.is_error, "{:?}", response.result);
        assert!(response.page_state.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_text_times_out() {
        let (engine, mut page, _input, _button) = form_page();
        engine.set_evaluation(&text_probe_script("Spinner"), json!(true));
        let registry = ToolRegistry::with_defaults();

        let response = registry
            .execute("wait_for", json!({"text_gone": "Spinner", "timeout_ms": 1000}), &mut page)
            .await;

        assert!(response.is_error);
        assert!(response.result.unwrap().contains("Timed out after 1000ms"));
    }

    #[tokio::test]
    async fn test_wait_for_needs_a_condition() {
        let (_engine, mut page, _input, _button) = form_page();
        let registry = ToolRegistry::with_defaults();

        let response = registry.execute("wait_for", json!({}), &mut page).await;
        assert!(response.is_error);
    }
}
