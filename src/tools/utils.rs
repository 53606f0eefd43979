use crate::engine::ElementHandle;
use crate::error::{BrowserError, Result};
use crate::expectation::Section;
use crate::tools::ToolContext;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Normalize an incomplete URL by adding missing protocol and handling common patterns
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();

    // Already has a scheme
    if trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
        || trimmed.starts_with("file://")
        || trimmed.starts_with("data:")
        || trimmed.starts_with("about:")
        || trimmed.starts_with("chrome://")
        || trimmed.starts_with("chrome-extension://")
    {
        return trimmed.to_string();
    }

    if trimmed.starts_with('/') || trimmed.starts_with("./") || trimmed.starts_with("../") {
        return trimmed.to_string();
    }

    if trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1") {
        return format!("http://{}", trimmed);
    }

    if trimmed.contains('.') {
        return format!("https://{}", trimmed);
    }

    // "google" -> "https://www.google.com"
    format!("https://www.{}.com", trimmed)
}

/// Element addressed by a snapshot reference or a CSS selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Target {
    Reference {
        /// Exact element reference from the page snapshot, e.g. `f0s1e3`
        #[serde(rename = "ref")]
        reference: String,
    },
    Css {
        /// CSS selector matching exactly one element in the main document
        selector: String,
    },
}

/// Target fields shared by every element tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TargetParams {
    /// Human-readable element description, used in messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,

    #[serde(flatten)]
    pub target: Target,
}

impl TargetParams {
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            element: None,
            target: Target::Reference {
                reference: reference.into(),
            },
        }
    }

    pub fn selector(selector: impl Into<String>) -> Self {
        Self {
            element: None,
            target: Target::Css {
                selector: selector.into(),
            },
        }
    }

    /// Name used in result text
    pub fn label(&self) -> String {
        match (&self.element, &self.target) {
            (Some(element), Target::Reference { reference }) => format!("{} ({})", element, reference),
            (Some(element), Target::Css { selector }) => format!("{} ({})", element, selector),
            (None, Target::Reference { reference }) => reference.clone(),
            (None, Target::Css { selector }) => selector.clone(),
        }
    }
}

/// Live handle for a target, plus the selector used in generated code
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub handle: ElementHandle,
    pub selector: Option<String>,
    pub label: String,
}

impl ResolvedTarget {
    /// `page.locator(...)` expression for generated code
    pub fn locator(&self) -> String {
        match &self.selector {
            Some(selector) => format!("page.locator({})", js_string(selector)),
            None => format!("page.locator({})", js_string(&format!("aria-ref={}", self.label))),
        }
    }
}

/// Resolve a tool's element target to a live handle
pub async fn resolve_target(context: &ToolContext<'_>, params: &TargetParams) -> Result<ResolvedTarget> {
    let label = params.label();
    match &params.target {
        Target::Reference { reference } => {
            let handle = context.page.resolve(reference).await?;
            let selector = if context.should_include(Section::Code) {
                match context.page.selectors().generate_selector(&handle).await {
                    Ok(selector) => Some(selector),
                    Err(e) => {
                        log::debug!("No selector for generated code of {}: {}", reference, e);
                        None
                    }
                }
            } else {
                None
            };
            Ok(ResolvedTarget {
                handle,
                selector,
                label: reference.clone(),
            })
        }
        Target::Css { selector } => {
            let engine = context.page.engine().clone();
            let main = engine.main_frame();

            let handle = query_exactly_one(context, selector).await?;
            let canonical = context.page.selectors().generate_selector(&handle).await?;
            let handle = engine.query_unique(&main, &canonical).await?.ok_or_else(|| {
                BrowserError::AmbiguousSelector(format!(
                    "'{}' stopped matching a single element for {}",
                    canonical, label
                ))
            })?;

            Ok(ResolvedTarget {
                handle,
                selector: Some(canonical),
                label,
            })
        }
    }
}

async fn query_exactly_one(context: &ToolContext<'_>, selector: &str) -> Result<ElementHandle> {
    let engine = context.page.engine();
    let main = engine.main_frame();
    if let Some(handle) = engine.query_unique(&main, selector).await? {
        return Ok(handle);
    }
    match engine.count_matches(&main, selector).await? {
        0 => Err(BrowserError::ElementNotFound(format!("No element matches '{}'", selector))),
        n => Err(BrowserError::AmbiguousSelector(format!(
            "'{}' matches {} elements; use a snapshot reference or a narrower selector",
            selector, n
        ))),
    }
}

/// Press Enter on the focused element, keeping references valid unless the page changed
///
/// When the focused element is a form field or link, the page is captured
/// first so the response shows what Enter acted on. References are
/// invalidated only if the URL changed; otherwise the pre-action capture is
/// dropped and the response builder captures the page as usual.
pub async fn press_enter(context: &mut ToolContext<'_>) -> Result<()> {
    let engine = context.page.engine().clone();
    let submits = match engine.focus_submits().await {
        Ok(submits) => submits,
        Err(e) => {
            log::debug!("Could not inspect focused element: {}", e);
            false
        }
    };
    if submits {
        context.capture_pre_action_snapshot().await;
    }

    let before = engine.page_info().await.map(|info| info.url).ok();
    engine.press_key("Enter").await?;
    let after = engine.page_info().await.map(|info| info.url).ok();

    if before.is_none() || before != after {
        log::debug!("Enter changed the page from {:?} to {:?}", before, after);
        context.page.invalidate();
    } else {
        context.discard_attached_snapshot();
    }
    Ok(())
}

/// JavaScript string literal for `value`
pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_url_complete() {
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com/path"), "https://example.com/path");
    }

    #[test]
    fn test_normalize_url_missing_protocol() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("example.com/path"), "https://example.com/path");
        assert_eq!(normalize_url("sub.example.com"), "https://sub.example.com");
    }

    #[test]
    fn test_normalize_url_partial_domain() {
        assert_eq!(normalize_url("google"), "https://www.google.com");
        assert_eq!(normalize_url("github"), "https://www.github.com");
    }

    #[test]
    fn test_normalize_url_localhost() {
        assert_eq!(normalize_url("localhost:3000"), "http://localhost:3000");
        assert_eq!(normalize_url("127.0.0.1:8080"), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_normalize_url_special_protocols() {
        assert_eq!(normalize_url("about:blank"), "about:blank");
        assert_eq!(normalize_url("data:text/html,<h1>Test</h1>"), "data:text/html,<h1>Test</h1>");
        assert_eq!(normalize_url("  example.com  "), "https://example.com");
        assert_eq!(normalize_url("./relative"), "./relative");
    }

    #[test]
    fn test_target_params_parsing() {
        let params: TargetParams = serde_json::from_value(json!({"ref": "f0s1e2", "element": "Save"})).unwrap();
        assert_eq!(
            params.target,
            Target::Reference {
                reference: "f0s1e2".to_string()
            }
        );
        assert_eq!(params.label(), "Save (f0s1e2)");

        let params: TargetParams = serde_json::from_value(json!({"selector": "#save"})).unwrap();
        assert_eq!(params, TargetParams::selector("#save"));

        assert!(serde_json::from_value::<TargetParams>(json!({"element": "Save"})).is_err());
    }

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string("a\"b"), r#""a\"b""#);
        assert_eq!(js_string("line\nbreak"), r#""line\nbreak""#);
    }
}
