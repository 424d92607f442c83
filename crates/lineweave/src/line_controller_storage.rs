//! Cache of line controllers keyed by line identity.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::line_controller::LineController;
use crate::line_manager::LineId;

/// Maps [`LineId`]s to their [`LineController`].
///
/// Controllers are created on first access and evicted when their line is removed or the host
/// asks to free memory. Removing a controller cancels its in-flight highlighting.
#[derive(Debug, Default)]
pub struct LineControllerStorage {
    controllers: HashMap<LineId, LineController>,
}

impl LineControllerStorage {
    /// An empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached controllers.
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Returns `true` if no controller is cached.
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Returns `true` if a controller for `id` is cached.
    pub fn contains(&self, id: LineId) -> bool {
        self.controllers.contains_key(&id)
    }

    /// The controller of `id`, created if missing.
    pub fn get_or_create(&mut self, id: LineId, estimated_line_height: f64) -> &mut LineController {
        self.controllers
            .entry(id)
            .or_insert_with(|| LineController::new(id, estimated_line_height))
    }

    /// The cached controller of `id`.
    pub fn get(&self, id: LineId) -> Option<&LineController> {
        self.controllers.get(&id)
    }

    /// The cached controller of `id`, mutably.
    pub fn get_mut(&mut self, id: LineId) -> Option<&mut LineController> {
        self.controllers.get_mut(&id)
    }

    /// Evict the controller of `id`.
    pub fn remove(&mut self, id: LineId) -> Option<LineController> {
        let mut controller = self.controllers.remove(&id)?;
        trace!(line = %id, "evicting line controller");
        controller.cancel_syntax_highlighting();
        Some(controller)
    }

    /// Evict every controller.
    pub fn remove_all(&mut self) {
        for controller in self.controllers.values_mut() {
            controller.cancel_syntax_highlighting();
        }
        self.controllers.clear();
    }

    /// Evict every controller except those of `keep` (typically the visible lines).
    pub fn remove_all_except(&mut self, keep: impl IntoIterator<Item = LineId>) {
        let keep: HashSet<LineId> = keep.into_iter().collect();
        let before = self.controllers.len();
        self.controllers.retain(|id, controller| {
            let retained = keep.contains(id);
            if !retained {
                controller.cancel_syntax_highlighting();
            }
            retained
        });
        trace!(evicted = before - self.controllers.len(), "trimmed line controller storage");
    }

    /// Ids of the cached controllers, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = LineId> + '_ {
        self.controllers.keys().copied()
    }

    pub(crate) fn controllers_mut(&mut self) -> impl Iterator<Item = &mut LineController> + '_ {
        self.controllers.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_reuses_controllers() {
        let mut storage = LineControllerStorage::new();
        let id = LineId::from_raw(1);
        storage.get_or_create(id, 20.0).invalidate_everything();
        storage.get_or_create(id, 20.0);
        assert_eq!(storage.len(), 1);
        assert!(storage.get(id).is_some());
        assert!(storage.remove(id).is_some());
        assert!(storage.remove(id).is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_remove_all_except_keeps_visible_lines() {
        let mut storage = LineControllerStorage::new();
        for raw in 0..10 {
            storage.get_or_create(LineId::from_raw(raw), 20.0);
        }
        storage.remove_all_except([LineId::from_raw(2), LineId::from_raw(3), LineId::from_raw(42)]);
        let mut ids: Vec<u64> = storage.ids().map(LineId::raw).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 3]);
        storage.remove_all();
        assert!(storage.is_empty());
    }
}
