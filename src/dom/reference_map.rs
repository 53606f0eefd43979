use crate::dom::reference::Reference;
use crate::engine::ElementHandle;
use indexmap::IndexMap;

/// Reverse index from reference to live element handle for one generation.
/// Uses IndexMap to preserve walk order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    map: IndexMap<Reference, ElementHandle>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self { map: IndexMap::new() }
    }

    /// Register a handle under a reference
    pub fn insert(&mut self, reference: Reference, handle: ElementHandle) {
        self.map.insert(reference, handle);
    }

    pub fn get(&self, reference: &Reference) -> Option<&ElementHandle> {
        self.map.get(reference)
    }

    pub fn contains(&self, reference: &Reference) -> bool {
        self.map.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Iterate over all (reference, handle) pairs in walk order
    pub fn iter(&self) -> impl Iterator<Item = (&Reference, &ElementHandle)> {
        self.map.iter()
    }

    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.map.keys()
    }

    /// Find the reference minted for a handle
    pub fn find_by_handle(&self, handle: &ElementHandle) -> Option<Reference> {
        self.map
            .iter()
            .find(|(_, candidate)| *candidate == handle)
            .map(|(reference, _)| *reference)
    }

    /// Number of references minted inside one frame
    pub fn count_in_frame(&self, frame: usize) -> usize {
        self.map.keys().filter(|reference| reference.frame == frame).count()
    }

    /// Export to JSON for debugging
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let entries: IndexMap<String, &ElementHandle> = self
            .map
            .iter()
            .map(|(reference, handle)| (reference.to_string(), handle))
            .collect();
        serde_json::to_string_pretty(&entries)
    }
}
