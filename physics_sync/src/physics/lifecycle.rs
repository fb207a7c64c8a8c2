//! Per-entity lifecycle state for every kind of native physics object
//!
//! The stepper reconciles the components present in the scene against this
//! tracker once per tick. Reconciliation only reports transitions; the
//! caller performs the actual create/destroy and then confirms the new state.

use crate::core::entity::EntityId;
use std::collections::HashMap;
use tracing::trace;

/// Kind of native object tracked for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    Actor,
    Controller,
    Joint,
}

/// Lifecycle state of one native object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Component present, native object not created yet (or creation deferred)
    Pending,
    /// Native object exists and is registered
    Active,
    /// Native object torn down
    Destroyed,
}

/// Transitions produced by one reconciliation pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LifecycleDiff {
    /// Entities that gained the component and are now `Pending`
    pub added: Vec<EntityId>,
    /// Entities that lost the component while `Pending` or `Active`
    pub removed: Vec<EntityId>,
}

impl LifecycleDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct LifecycleTracker {
    states: HashMap<(RegistryKind, EntityId), LifecycleState>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, kind: RegistryKind, entity: EntityId) -> Option<LifecycleState> {
        self.states.get(&(kind, entity)).copied()
    }

    pub fn is_active(&self, kind: RegistryKind, entity: EntityId) -> bool {
        self.state(kind, entity) == Some(LifecycleState::Active)
    }

    fn set(&mut self, kind: RegistryKind, entity: EntityId, state: LifecycleState) {
        let previous = self.states.insert((kind, entity), state);
        if previous != Some(state) {
            trace!(entity = %entity, ?kind, ?previous, ?state, "Lifecycle transition");
        }
    }

    pub fn mark_pending(&mut self, kind: RegistryKind, entity: EntityId) {
        self.set(kind, entity, LifecycleState::Pending);
    }

    pub fn mark_active(&mut self, kind: RegistryKind, entity: EntityId) {
        self.set(kind, entity, LifecycleState::Active);
    }

    pub fn mark_destroyed(&mut self, kind: RegistryKind, entity: EntityId) {
        if self.states.contains_key(&(kind, entity)) {
            self.set(kind, entity, LifecycleState::Destroyed);
        }
    }

    /// Entities of `kind` currently in the given state, in UUID order
    pub fn in_state(&self, kind: RegistryKind, state: LifecycleState) -> Vec<EntityId> {
        let mut entities: Vec<EntityId> = self
            .states
            .iter()
            .filter(|((k, _), s)| *k == kind && **s == state)
            .map(|((_, entity), _)| *entity)
            .collect();
        entities.sort();
        entities
    }

    /// Compare the entities currently carrying the component for `kind`
    /// against the tracked states
    ///
    /// New or previously destroyed entities become `Pending` and are reported
    /// as added. Tracked live entities missing from `present` are reported as
    /// removed; their state is left for the caller to confirm.
    pub fn reconcile(&mut self, kind: RegistryKind, present: &[EntityId]) -> LifecycleDiff {
        let mut diff = LifecycleDiff::default();

        for &entity in present {
            match self.state(kind, entity) {
                None | Some(LifecycleState::Destroyed) => {
                    self.mark_pending(kind, entity);
                    diff.added.push(entity);
                }
                Some(_) => {}
            }
        }

        let mut present_sorted = present.to_vec();
        present_sorted.sort();
        for ((k, entity), state) in &self.states {
            if *k == kind
                && *state != LifecycleState::Destroyed
                && present_sorted.binary_search(entity).is_err()
            {
                diff.removed.push(*entity);
            }
        }
        diff.removed.sort();

        diff
    }

    /// Drop every record for an entity
    pub fn forget(&mut self, entity: EntityId) {
        self.states.retain(|(_, e), _| *e != entity);
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_reports_new_entities_once() {
        let mut tracker = LifecycleTracker::new();
        let a = EntityId(1);

        let diff = tracker.reconcile(RegistryKind::Actor, &[a]);
        assert_eq!(diff.added, vec![a]);
        assert_eq!(tracker.state(RegistryKind::Actor, a), Some(LifecycleState::Pending));

        let diff = tracker.reconcile(RegistryKind::Actor, &[a]);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_reconcile_reports_removed_live_entities() {
        let mut tracker = LifecycleTracker::new();
        let a = EntityId(1);
        tracker.reconcile(RegistryKind::Actor, &[a]);
        tracker.mark_active(RegistryKind::Actor, a);

        let diff = tracker.reconcile(RegistryKind::Actor, &[]);
        assert_eq!(diff.removed, vec![a]);

        tracker.mark_destroyed(RegistryKind::Actor, a);
        assert!(tracker.reconcile(RegistryKind::Actor, &[]).is_empty());
    }

    #[test]
    fn test_destroyed_entity_can_return() {
        let mut tracker = LifecycleTracker::new();
        let a = EntityId(5);
        tracker.mark_active(RegistryKind::Joint, a);
        tracker.mark_destroyed(RegistryKind::Joint, a);

        let diff = tracker.reconcile(RegistryKind::Joint, &[a]);
        assert_eq!(diff.added, vec![a]);
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut tracker = LifecycleTracker::new();
        let a = EntityId(2);
        tracker.mark_active(RegistryKind::Actor, a);

        assert!(tracker.is_active(RegistryKind::Actor, a));
        assert!(tracker.state(RegistryKind::Controller, a).is_none());
        assert_eq!(
            tracker.in_state(RegistryKind::Actor, LifecycleState::Active),
            vec![a]
        );

        tracker.forget(a);
        assert!(tracker.state(RegistryKind::Actor, a).is_none());
    }

    #[test]
    fn test_mark_destroyed_ignores_untracked() {
        let mut tracker = LifecycleTracker::new();
        tracker.mark_destroyed(RegistryKind::Actor, EntityId(9));
        assert!(tracker.state(RegistryKind::Actor, EntityId(9)).is_none());
    }
}
