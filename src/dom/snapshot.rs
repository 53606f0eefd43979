use crate::dom::reference::Reference;
use crate::engine::FrameId;
use crate::error::{BrowserError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Textual representation of a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    /// Indented `- role "name" [ref=...]` lines
    #[default]
    Outline,
    /// JSON tree
    Json,
}

/// One node of a captured accessibility snapshot
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SnapshotNode {
    pub role: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,

    /// Set on iframe nodes: the nested frame's own node list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameBoundary>,
}

/// Boundary between a frame and the nested frame it hosts
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrameBoundary {
    /// Depth-first frame index; `None` when the frame was never entered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,

    pub frame_id: FrameId,

    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub content: FrameContent,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", content = "nodes", rename_all = "snake_case")]
pub enum FrameContent {
    Captured(Vec<SnapshotNode>),
    Failed(String),
    Detached,
}

impl FrameContent {
    pub fn is_captured(&self) -> bool {
        matches!(self, FrameContent::Captured(_))
    }
}

/// Per-frame summary of one capture
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrameSummary {
    pub index: usize,
    pub frame_id: FrameId,
    pub url: String,
    pub node_count: usize,
    pub reference_count: usize,
}

/// A complete capture of one page at one generation
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub generation: u64,
    pub url: String,
    pub title: String,
    pub nodes: Vec<SnapshotNode>,

    /// Frames that were entered, main frame first
    pub frames: Vec<FrameSummary>,
}

impl SnapshotNode {
    pub fn new(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            reference: None,
            states: Vec::new(),
            children: Vec::new(),
            frame: None,
        }
    }

    /// Count nodes in this subtree, including captured nested frames
    pub fn count_nodes(&self) -> usize {
        let nested = match &self.frame {
            Some(FrameBoundary { content: FrameContent::Captured(nodes), .. }) => count_nodes(nodes),
            _ => 0,
        };
        1 + count_nodes(&self.children) + nested
    }

    fn find<'a>(&'a self, reference: &Reference) -> Option<&'a SnapshotNode> {
        if self.reference.as_ref() == Some(reference) {
            return Some(self);
        }

        if let Some(found) = find_in(&self.children, reference) {
            return Some(found);
        }

        match &self.frame {
            Some(FrameBoundary { content: FrameContent::Captured(nodes), .. }) => find_in(nodes, reference),
            _ => None,
        }
    }

    fn collect_references(&self, out: &mut Vec<Reference>) {
        if let Some(reference) = self.reference {
            out.push(reference);
        }
        for child in &self.children {
            child.collect_references(out);
        }
        if let Some(FrameBoundary { content: FrameContent::Captured(nodes), .. }) = &self.frame {
            for node in nodes {
                node.collect_references(out);
            }
        }
    }

    fn render_outline(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{}- {}", indent, self.role);
        if !self.name.is_empty() {
            let _ = write!(out, " \"{}\"", escape_name(&self.name));
        }
        for state in &self.states {
            let _ = write!(out, " [{}]", state);
        }
        if let Some(reference) = &self.reference {
            let _ = write!(out, " [ref={}]", reference);
        }

        let captured = match &self.frame {
            Some(boundary @ FrameBoundary { content: FrameContent::Captured(_), .. }) => Some(boundary),
            _ => None,
        };

        if self.children.is_empty() && captured.is_none() {
            out.push('\n');
            return;
        }
        out.push_str(":\n");

        for child in &self.children {
            child.render_outline(depth + 1, out);
        }

        if let Some(boundary) = captured {
            boundary.render_outline(depth + 1, out);
        }
    }

    /// Copy of the subtree with failed or detached frame content removed
    fn pruned(&self) -> SnapshotNode {
        SnapshotNode {
            role: self.role.clone(),
            name: self.name.clone(),
            reference: self.reference,
            states: self.states.clone(),
            children: self.children.iter().map(SnapshotNode::pruned).collect(),
            frame: self.frame.as_ref().and_then(|boundary| match &boundary.content {
                FrameContent::Captured(nodes) => Some(FrameBoundary {
                    content: FrameContent::Captured(nodes.iter().map(SnapshotNode::pruned).collect()),
                    ..boundary.clone()
                }),
                _ => None,
            }),
        }
    }
}

impl FrameBoundary {
    fn render_outline(&self, depth: usize, out: &mut String) {
        let FrameContent::Captured(nodes) = &self.content else {
            return;
        };

        let indent = "  ".repeat(depth);
        let _ = write!(out, "{}- frame", indent);
        if let Some(name) = &self.name {
            let _ = write!(out, " \"{}\"", escape_name(name));
        }
        if let Some(index) = self.index {
            let _ = write!(out, " [frame={}]", index);
        }
        let _ = write!(out, " <{}>", self.url);

        if nodes.is_empty() {
            out.push('\n');
            return;
        }
        out.push_str(":\n");
        for node in nodes {
            node.render_outline(depth + 1, out);
        }
    }
}

impl Snapshot {
    pub fn render(&self, format: SnapshotFormat) -> Result<String> {
        match format {
            SnapshotFormat::Outline => Ok(render_outline(&self.nodes)),
            SnapshotFormat::Json => {
                let pruned: Vec<SnapshotNode> = self.nodes.iter().map(SnapshotNode::pruned).collect();
                serde_json::to_string_pretty(&pruned).map_err(|e| {
                    BrowserError::InvalidArgument(format!("Failed to serialize snapshot to JSON: {}", e))
                })
            }
        }
    }

    pub fn count_nodes(&self) -> usize {
        count_nodes(&self.nodes)
    }

    /// All references in walk order
    pub fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_references(&mut out);
        }
        out
    }

    pub fn find_by_reference(&self, reference: &Reference) -> Option<&SnapshotNode> {
        find_in(&self.nodes, reference)
    }
}

/// Render a node list as an indented outline
pub fn render_outline(nodes: &[SnapshotNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.render_outline(0, &mut out);
    }
    out
}

fn count_nodes(nodes: &[SnapshotNode]) -> usize {
    nodes.iter().map(SnapshotNode::count_nodes).sum()
}

fn find_in<'a>(nodes: &'a [SnapshotNode], reference: &Reference) -> Option<&'a SnapshotNode> {
    nodes.iter().find_map(|node| node.find(reference))
}

fn escape_name(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(role: &str, name: &str, reference: Option<Reference>) -> SnapshotNode {
        let mut node = SnapshotNode::new(role, name);
        node.reference = reference;
        node
    }

    fn create_test_snapshot() -> Snapshot {
        let mut iframe = node("iframe", "Ads", Some(Reference::new(0, 1, 3)));
        iframe.frame = Some(FrameBoundary {
            index: Some(1),
            frame_id: FrameId::new("child-1"),
            url: "https://ads.example.com/".to_string(),
            name: Some("ads".to_string()),
            content: FrameContent::Captured(vec![node("link", "Buy", Some(Reference::new(1, 1, 1)))]),
        });

        let mut broken = node("iframe", "", Some(Reference::new(0, 1, 4)));
        broken.frame = Some(FrameBoundary {
            index: Some(2),
            frame_id: FrameId::new("child-2"),
            url: "https://other.example.com/".to_string(),
            name: None,
            content: FrameContent::Failed("cross-origin".to_string()),
        });

        let mut main = node("main", "", None);
        let mut button = node("button", "Say \"hi\"", Some(Reference::new(0, 1, 2)));
        button.states.push("disabled".to_string());
        main.children = vec![button, iframe, broken];

        Snapshot {
            generation: 1,
            url: "https://example.com/".to_string(),
            title: "Example".to_string(),
            nodes: vec![node("heading", "Welcome", Some(Reference::new(0, 1, 1))), main],
            frames: Vec::new(),
        }
    }

    #[test]
    fn test_render_outline() {
        let snapshot = create_test_snapshot();
        let outline = snapshot.render(SnapshotFormat::Outline).unwrap();

        let expected = concat!(
            "- heading \"Welcome\" [ref=f0s1e1]\n",
            "- main:\n",
            "  - button \"Say \\\"hi\\\"\" [disabled] [ref=f0s1e2]\n",
            "  - iframe \"Ads\" [ref=f0s1e3]:\n",
            "    - frame \"ads\" [frame=1] <https://ads.example.com/>:\n",
            "      - link \"Buy\" [ref=f1s1e1]\n",
            "  - iframe [ref=f0s1e4]\n",
        );
        assert_eq!(outline, expected);
    }

    #[test]
    fn test_render_json_omits_failed_frames() {
        let snapshot = create_test_snapshot();
        let json = snapshot.render(SnapshotFormat::Json).unwrap();

        assert!(json.contains("\"ref\": \"f1s1e1\""));
        assert!(json.contains("ads.example.com"));
        assert!(!json.contains("other.example.com"));
        assert!(!json.contains("cross-origin"));
    }

    #[test]
    fn test_count_and_references() {
        let snapshot = create_test_snapshot();

        // heading, main, button, iframe, link, iframe
        assert_eq!(snapshot.count_nodes(), 6);
        let refs: Vec<String> = snapshot.references().iter().map(|r| r.to_string()).collect();
        assert_eq!(refs, vec!["f0s1e1", "f0s1e2", "f0s1e3", "f1s1e1", "f0s1e4"]);
    }

    #[test]
    fn test_find_by_reference() {
        let snapshot = create_test_snapshot();

        let link = snapshot.find_by_reference(&Reference::new(1, 1, 1)).unwrap();
        assert_eq!(link.name, "Buy");
        assert!(snapshot.find_by_reference(&Reference::new(0, 2, 1)).is_none());
    }
}
