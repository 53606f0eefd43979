//! Unique selector synthesis for live elements
//!
//! Candidates are tried from most to least readable; each one is checked
//! against the element's own frame document and only a selector matching
//! exactly one element is returned.

use crate::dom::element::ElementDescription;
use crate::engine::{BrowserEngine, ElementHandle};
use crate::error::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which attributes the synthesizer may use, in priority order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorPolicy {
    /// Test-identifier attributes, tried first
    pub test_id_attributes: Vec<String>,

    /// Regular attributes tried after the test identifiers
    pub attributes: Vec<String>,

    /// Fall back to any remaining `data-*` attribute
    pub use_data_attributes: bool,
}

impl Default for SelectorPolicy {
    fn default() -> Self {
        Self {
            test_id_attributes: ["data-testid", "data-test-id", "data-test", "data-qa", "data-cy"]
                .into_iter()
                .map(String::from)
                .collect(),
            attributes: ["name", "type", "aria-label"].into_iter().map(String::from).collect(),
            use_data_attributes: true,
        }
    }
}

/// Produces selectors proven unique at call time
pub struct SelectorSynthesizer {
    engine: Arc<dyn BrowserEngine>,
    policy: SelectorPolicy,
}

impl SelectorSynthesizer {
    pub fn new(engine: Arc<dyn BrowserEngine>, policy: SelectorPolicy) -> Self {
        Self { engine, policy }
    }

    pub fn policy(&self) -> &SelectorPolicy {
        &self.policy
    }

    /// Build a selector that matches exactly `handle` in its frame document
    pub async fn generate_selector(&self, handle: &ElementHandle) -> Result<String> {
        let element = self.engine.describe_element(handle).await?;
        let candidates = candidate_selectors(&element, &self.policy);

        for candidate in &candidates {
            let matches = match self.engine.count_matches(&handle.frame, candidate).await {
                Ok(matches) => matches,
                Err(e) => {
                    log::debug!("Skipping selector candidate '{}': {}", candidate, e);
                    continue;
                }
            };
            log::debug!("Selector candidate '{}' matches {} element(s)", candidate, matches);
            if matches == 1 {
                return Ok(candidate.clone());
            }
        }

        Err(BrowserError::AmbiguousSelector(format!(
            "{} candidate(s) for {} in frame {} all matched zero or several elements",
            candidates.len(),
            element.to_simple_string(),
            handle.frame
        )))
    }
}

/// Every candidate selector for `element`, in the order they are validated
pub fn candidate_selectors(element: &ElementDescription, policy: &SelectorPolicy) -> Vec<String> {
    let tag = element.tag_name.as_str();
    let mut candidates = Vec::new();

    // 1. tag + id
    if let Some(id) = element.id() {
        candidates.push(format!("{}#{}", tag, css_escape(id)));
    }

    // 2. tag + attribute predicates, added one at a time
    let mut predicates = String::new();
    for (name, value) in prioritized_attributes(element, policy) {
        predicates.push_str(&attribute_predicate(name, value));
        candidates.push(format!("{}{}", tag, predicates));
    }

    // 3. tag + class list
    let classes = class_suffix(element);
    if !classes.is_empty() {
        candidates.push(format!("{}{}", tag, classes));
    }

    // 4. tag + classes + position under the nearest identifying ancestor
    let positioned = format!("{}{}:nth-of-type({})", tag, classes, element.nth_of_type);
    match nearest_identifying_ancestor(element, policy) {
        Some((0, anchor)) => candidates.push(format!("{} > {}", anchor, positioned)),
        Some((_, anchor)) => candidates.push(format!("{} {}", anchor, positioned)),
        None => candidates.push(positioned),
    }

    // 5. full ancestor-qualified path
    candidates.push(ancestor_path(element));

    candidates.dedup();
    candidates
}

fn prioritized_attributes<'a>(
    element: &'a ElementDescription,
    policy: &'a SelectorPolicy,
) -> Vec<(&'a str, &'a str)> {
    let mut chosen: Vec<(&str, &str)> = Vec::new();

    for name in policy.test_id_attributes.iter().chain(policy.attributes.iter()) {
        if let Some(value) = element.get_attribute(name).filter(|v| !v.is_empty()) {
            chosen.push((name.as_str(), value));
        }
    }

    if policy.use_data_attributes {
        for (name, value) in &element.attributes {
            if name.starts_with("data-")
                && !value.is_empty()
                && !chosen.iter().any(|(used, _)| *used == name.as_str())
            {
                chosen.push((name.as_str(), value.as_str()));
            }
        }
    }

    chosen
}

/// Closest ancestor with an id or test identifier, with its distance (0 = parent)
fn nearest_identifying_ancestor(
    element: &ElementDescription,
    policy: &SelectorPolicy,
) -> Option<(usize, String)> {
    element.ancestors.iter().enumerate().find_map(|(distance, ancestor)| {
        if let Some(id) = ancestor.id() {
            return Some((distance, format!("{}#{}", ancestor.tag_name, css_escape(id))));
        }
        policy.test_id_attributes.iter().find_map(|name| {
            ancestor
                .get_attribute(name)
                .filter(|v| !v.is_empty())
                .map(|value| (distance, format!("{}{}", ancestor.tag_name, attribute_predicate(name, value))))
        })
    })
}

fn ancestor_path(element: &ElementDescription) -> String {
    let mut segments = vec![format!("{}:nth-of-type({})", element.tag_name, element.nth_of_type)];

    for (depth, ancestor) in element.ancestors.iter().enumerate() {
        if let Some(id) = ancestor.id() {
            segments.push(format!("{}#{}", ancestor.tag_name, css_escape(id)));
            break;
        }
        if depth + 1 == element.ancestors.len() {
            // root element
            segments.push(ancestor.tag_name.clone());
        } else {
            segments.push(format!("{}:nth-of-type({})", ancestor.tag_name, ancestor.nth_of_type));
        }
    }

    segments.reverse();
    segments.join(" > ")
}

fn class_suffix(element: &ElementDescription) -> String {
    element
        .classes()
        .into_iter()
        .map(|class| format!(".{}", css_escape(class)))
        .collect()
}

fn attribute_predicate(name: &str, value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\a "),
            _ => escaped.push(c),
        }
    }
    format!("[{}=\"{}\"]", css_escape(name), escaped)
}

/// Escape a string for use as a CSS identifier (id or class name)
pub fn css_escape(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len());

    for (i, &c) in chars.iter().enumerate() {
        let code = c as u32;
        if c == '\0' {
            out.push('\u{FFFD}');
        } else if (1..=0x1f).contains(&code)
            || code == 0x7f
            || (i == 0 && c.is_ascii_digit())
            || (i == 1 && c.is_ascii_digit() && chars[0] == '-')
        {
            out.push_str(&format!("\\{:x} ", code));
        } else if i == 0 && c == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if code >= 0x80 || c == '-' || c == '_' || c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }

    out
}
