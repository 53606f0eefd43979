//! Page model: snapshots, references and selectors
//!
//! This module turns the engine's accessibility trees into addressable
//! snapshots. It includes:
//! - ElementDescription: attributes and ancestry of one live element
//! - Reference: the `f{frame}s{generation}e{ordinal}` handle printed in snapshots
//! - ReferenceRegistry: snapshot generations and reference resolution
//! - SelectorSynthesizer: unique CSS selectors for generated code

pub mod element;
pub mod reference;
pub mod reference_map;
pub mod registry;
pub mod selector;
pub mod snapshot;

pub use element::ElementDescription;
pub use reference::Reference;
pub use reference_map::ReferenceMap;
pub use registry::{ReferenceRegistry, SnapshotConfig};
pub use selector::{SelectorPolicy, SelectorSynthesizer, candidate_selectors, css_escape};
pub use snapshot::{FrameBoundary, FrameContent, FrameSummary, Snapshot, SnapshotFormat, SnapshotNode};
