use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Facts about a live element, as reported by the engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDescription {
    /// Lowercase HTML tag name (e.g., "div", "button", "input")
    pub tag_name: String,

    /// Element attributes in document order
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// 1-based position among siblings with the same tag
    #[serde(default = "default_position")]
    pub nth_of_type: usize,

    /// Ancestor chain, nearest parent first, ending at the root element
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<ElementDescription>,
}

fn default_position() -> usize {
    1
}

impl ElementDescription {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: IndexMap::new(),
            nth_of_type: 1,
            ancestors: Vec::new(),
        }
    }

    /// Builder method: add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder method: set the same-tag sibling position
    pub fn with_nth_of_type(mut self, position: usize) -> Self {
        self.nth_of_type = position.max(1);
        self
    }

    /// Builder method: set the ancestor chain (nearest first)
    pub fn with_ancestors(mut self, ancestors: Vec<ElementDescription>) -> Self {
        self.ancestors = ancestors;
        self
    }

    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Non-empty id attribute
    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id").map(str::trim).filter(|id| !id.is_empty())
    }

    /// Class names, in attribute order
    pub fn classes(&self) -> Vec<&str> {
        self.get_attribute("class")
            .map(|classes| classes.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes().contains(&class_name)
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Short human-readable form, used in logs and error messages
    pub fn to_simple_string(&self) -> String {
        let mut parts = vec![format!("<{}", self.tag_name)];

        if let Some(id) = self.id() {
            parts.push(format!(" id=\"{}\"", id));
        }

        if let Some(class) = self.get_attribute("class") {
            parts.push(format!(" class=\"{}\"", class));
        }

        parts.push(">".to_string());
        parts.join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_creation() {
        let element = ElementDescription::new("BUTTON")
            .with_attribute("id", "test-id")
            .with_attribute("class", "btn primary")
            .with_nth_of_type(3);

        assert_eq!(element.tag_name, "button");
        assert_eq!(element.id(), Some("test-id"));
        assert_eq!(element.nth_of_type, 3);
        assert!(element.is_tag("Button"));
    }

    #[test]
    fn test_blank_id_is_ignored() {
        let element = ElementDescription::new("div").with_attribute("id", "   ");
        assert_eq!(element.id(), None);
    }

    #[test]
    fn test_classes() {
        let element = ElementDescription::new("div").with_attribute("class", "container  main active");

        assert_eq!(element.classes(), vec!["container", "main", "active"]);
        assert!(element.has_class("main"));
        assert!(!element.has_class("hidden"));
    }

    #[test]
    fn test_deserialization_defaults() {
        let json = r#"{"tag_name":"a","attributes":{"href":"/x","data-testid":"nav"}}"#;
        let element: ElementDescription = serde_json::from_str(json).unwrap();

        assert_eq!(element.nth_of_type, 1);
        assert!(element.ancestors.is_empty());
        let keys: Vec<_> = element.attributes.keys().cloned().collect();
        assert_eq!(keys, vec!["href", "data-testid"]);
    }

    #[test]
    fn test_to_simple_string() {
        let element = ElementDescription::new("button")
            .with_attribute("id", "my-btn")
            .with_attribute("class", "btn primary");

        let simple = element.to_simple_string();
        assert_eq!(simple, "<button id=\"my-btn\" class=\"btn primary\">");
    }
}
