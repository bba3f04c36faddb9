//! Mounted-element table: activity key -> last known geometry.
//!
//! Elements mount after descriptors are computed, so scroll math has to
//! tolerate a missing entry. The table persists across render passes and is
//! pruned to the keys still present in the transcript on every recomputation.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::transcript::activity::ActivityKey;

/// Geometry of one mounted activity element, in the host surface's scroll
/// units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementRect {
    pub top: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Cross-pass association between activity keys and their mounted elements,
/// maintained through an acquire/release callback contract: hosts register
/// geometry on mount and release it on unmount.
#[derive(Debug, Default)]
pub struct ElementTable {
    elements: IndexMap<ActivityKey, ElementRect>,
}

impl ElementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or refresh the geometry for a mounted element.
    pub fn register(&mut self, key: ActivityKey, rect: ElementRect) {
        self.elements.insert(key, rect);
    }

    /// Drop the association when the element unmounts.
    pub fn release(&mut self, key: &ActivityKey) {
        self.elements.shift_remove(key);
    }

    pub fn get(&self, key: &ActivityKey) -> Option<ElementRect> {
        self.elements.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Keep only keys still present in the transcript.
    pub(crate) fn retain_keys(&mut self, live: &HashSet<ActivityKey>) {
        self.elements.retain(|key, _| live.contains(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::activity::ActivityId;

    fn key(id: &str) -> ActivityKey {
        ActivityKey::Id(ActivityId::new(id))
    }

    #[test]
    fn register_refresh_release() {
        let mut table = ElementTable::new();
        table.register(key("a"), ElementRect::new(0.0, 20.0));
        table.register(key("a"), ElementRect::new(0.0, 32.0));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&key("a")).map(|rect| rect.height), Some(32.0));

        table.release(&key("a"));
        assert!(table.is_empty());
        assert_eq!(table.get(&key("a")), None);
    }

    #[test]
    fn retain_prunes_departed_keys() {
        let mut table = ElementTable::new();
        table.register(key("a"), ElementRect::new(0.0, 20.0));
        table.register(key("b"), ElementRect::new(20.0, 20.0));

        let live: HashSet<ActivityKey> = [key("b")].into_iter().collect();
        table.retain_keys(&live);

        assert_eq!(table.get(&key("a")), None);
        assert!(table.get(&key("b")).is_some());
    }
}
