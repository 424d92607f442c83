//! Sets of lines touched by an edit.

use std::collections::HashSet;

use crate::line_manager::LineId;

/// The lines inserted, removed and edited by one text change.
///
/// A line is in at most one of the three sets. Marking a line inserted or removed takes it out
/// of the other sets; marking it edited is ignored once it was inserted or removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineChangeSet {
    inserted: HashSet<LineId>,
    removed: HashSet<LineId>,
    edited: HashSet<LineId>,
}

impl LineChangeSet {
    /// An empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines that did not exist before the change.
    pub fn inserted(&self) -> &HashSet<LineId> {
        &self.inserted
    }

    /// Lines that no longer exist.
    pub fn removed(&self) -> &HashSet<LineId> {
        &self.removed
    }

    /// Lines whose content or geometry changed.
    pub fn edited(&self) -> &HashSet<LineId> {
        &self.edited
    }

    /// Returns `true` if nothing was marked.
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.removed.is_empty() && self.edited.is_empty()
    }

    /// Returns `true` if the line count may have changed.
    pub fn did_add_or_remove_lines(&self) -> bool {
        !self.inserted.is_empty() || !self.removed.is_empty()
    }

    /// Mark a line as newly inserted.
    pub fn mark_inserted(&mut self, id: LineId) {
        self.removed.remove(&id);
        self.edited.remove(&id);
        self.inserted.insert(id);
    }

    /// Mark a line as removed.
    pub fn mark_removed(&mut self, id: LineId) {
        self.inserted.remove(&id);
        self.edited.remove(&id);
        self.removed.insert(id);
    }

    /// Mark a line as edited, unless it is already inserted or removed.
    pub fn mark_edited(&mut self, id: LineId) {
        if !self.inserted.contains(&id) && !self.removed.contains(&id) {
            self.edited.insert(id);
        }
    }

    /// Combine two change sets.
    ///
    /// The sets are unioned independently; an id edited in one set and removed in the other
    /// ends up in `removed` only.
    pub fn union(&self, other: &LineChangeSet) -> LineChangeSet {
        let mut result = LineChangeSet {
            inserted: self.inserted.union(&other.inserted).copied().collect(),
            removed: self.removed.union(&other.removed).copied().collect(),
            edited: HashSet::new(),
        };
        for id in self.edited.union(&other.edited) {
            result.mark_edited(*id);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marking_rules() {
        let mut set = LineChangeSet::new();
        let a = LineId::from_raw(1);
        set.mark_edited(a);
        assert!(set.edited().contains(&a));
        set.mark_removed(a);
        assert!(!set.edited().contains(&a));
        assert!(set.removed().contains(&a));
        set.mark_edited(a);
        assert!(!set.edited().contains(&a));
        set.mark_inserted(a);
        assert!(set.inserted().contains(&a));
        assert!(!set.removed().contains(&a));
    }

    #[test]
    fn test_union_keeps_sets_disjoint() {
        let (a, b) = (LineId::from_raw(1), LineId::from_raw(2));
        let mut first = LineChangeSet::new();
        first.mark_edited(a);
        first.mark_edited(b);
        let mut second = LineChangeSet::new();
        second.mark_removed(b);
        let union = first.union(&second);
        assert!(union.edited().contains(&a));
        assert!(!union.edited().contains(&b));
        assert!(union.removed().contains(&b));
        assert!(union.did_add_or_remove_lines());
    }
}
