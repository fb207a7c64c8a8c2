//! Contact and trigger notifications routed to script hooks
//!
//! The collector is the backend's event sink during a step. It only records
//! user-data keys; dispatch after the step resolves them to entities and
//! calls the hooks on both sides.
//!
//! Rapier reports one event per collider pair. Hooks work on entity pairs,
//! so dispatch counts touching shape pairs per entity pair and only fires on
//! the first touch and the last separation.

use super::user_data::{decode_user_data, BodyDataArena, BodyDataKey};
use crate::core::entity::{EntityId, Scene};
use crate::scripting::{ScriptHook, ScriptHooks, ScriptRef};
use rapier3d::prelude::*;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    CollisionBegin,
    CollisionEnd,
    TriggerBegin,
    TriggerEnd,
}

impl ContactKind {
    fn is_begin(self) -> bool {
        matches!(self, ContactKind::CollisionBegin | ContactKind::TriggerBegin)
    }

    fn is_trigger(self) -> bool {
        matches!(self, ContactKind::TriggerBegin | ContactKind::TriggerEnd)
    }

    fn hook(self, entity: EntityId, other: EntityId) -> ScriptHook {
        match self {
            ContactKind::CollisionBegin => ScriptHook::CollisionBegin { entity, other },
            ContactKind::CollisionEnd => ScriptHook::CollisionEnd { entity, other },
            ContactKind::TriggerBegin => ScriptHook::TriggerBegin { entity, other },
            ContactKind::TriggerEnd => ScriptHook::TriggerEnd { entity, other },
        }
    }
}

/// One backend notification with both sides' user-data keys, if resolvable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub kind: ContactKind,
    pub first: Option<BodyDataKey>,
    pub second: Option<BodyDataKey>,
}

/// Number of touching shape pairs between two entities, per touch type
#[derive(Debug, Default)]
pub struct TouchTracker {
    // (lower entity, higher entity, is_trigger)
    counts: HashMap<(EntityId, EntityId, bool), u32>,
}

impl TouchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: EntityId, b: EntityId, trigger: bool) -> (EntityId, EntityId, bool) {
        (a.min(b), a.max(b), trigger)
    }

    /// Apply one shape-pair transition; returns whether the entity pair changed state
    fn record(&mut self, kind: ContactKind, a: EntityId, b: EntityId) -> bool {
        let key = Self::key(a, b, kind.is_trigger());
        if kind.is_begin() {
            let count = self.counts.entry(key).or_insert(0);
            *count += 1;
            return *count == 1;
        }

        match self.counts.get_mut(&key) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.counts.remove(&key);
                true
            }
            // End without a matching begin, e.g. after the pair was forgotten
            None => false,
        }
    }

    /// Touching shape pairs between `a` and `b`
    pub fn touch_count(&self, a: EntityId, b: EntityId, trigger: bool) -> u32 {
        self.counts
            .get(&Self::key(a, b, trigger))
            .copied()
            .unwrap_or(0)
    }

    /// Drop every pair involving `entity`
    pub fn forget(&mut self, entity: EntityId) {
        self.counts.retain(|(a, b, _), _| *a != entity && *b != entity);
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

/// Event sink handed to the backend for a step
#[derive(Debug, Default)]
pub struct ContactCollector {
    events: Mutex<Vec<ContactEvent>>,
}

fn body_key(bodies: &RigidBodySet, colliders: &ColliderSet, handle: ColliderHandle) -> Option<BodyDataKey> {
    let parent = colliders.get(handle)?.parent()?;
    decode_user_data(bodies.get(parent)?.user_data)
}

impl ContactCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every event recorded so far
    pub fn drain(&self) -> Vec<ContactEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    fn push(&self, event: ContactEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        let kind = match (event.sensor(), event.started()) {
            // Overlaps lost because a shape was removed are not reported
            (true, _) if event.removed() => return,
            (true, true) => ContactKind::TriggerBegin,
            (true, false) => ContactKind::TriggerEnd,
            (false, true) => ContactKind::CollisionBegin,
            (false, false) => ContactKind::CollisionEnd,
        };

        self.push(ContactEvent {
            kind,
            first: body_key(bodies, colliders, event.collider1()),
            second: body_key(bodies, colliders, event.collider2()),
        });
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Deliver collected events to scripts on both sides
///
/// Each entity pair fires begin on its first touching shape pair and end
/// when its last one separates. Events whose actors no longer resolve are
/// dropped, and hooks are skipped when either side lacks a script. Returns
/// the number of hook calls made.
pub fn dispatch_contacts(
    events: Vec<ContactEvent>,
    arena: &BodyDataArena,
    touches: &mut TouchTracker,
    scene: &Scene,
    hooks: &mut dyn ScriptHooks,
) -> usize {
    let mut calls = 0;

    for event in events {
        let resolve = |key: Option<BodyDataKey>| key.and_then(|k| arena.body(k)).map(|d| d.entity);
        let (Some(a), Some(b)) = (resolve(event.first), resolve(event.second)) else {
            trace!(kind = ?event.kind, "Dropping contact with unresolved actor");
            continue;
        };
        if a == b {
            continue;
        }
        if !touches.record(event.kind, a, b) {
            trace!(kind = ?event.kind, first = %a, second = %b, "Entity pair already in this state");
            continue;
        }

        let scripts: Option<(ScriptRef, ScriptRef)> = scene
            .get::<ScriptRef>(a)
            .map(|s| (*s).clone())
            .zip(scene.get::<ScriptRef>(b).map(|s| (*s).clone()));
        let Some((script_a, script_b)) = scripts else {
            continue;
        };
        hooks.invoke(&script_a, event.kind.hook(a, b));
        hooks.invoke(&script_b, event.kind.hook(b, a));
        calls += 2;
    }

    calls
}
