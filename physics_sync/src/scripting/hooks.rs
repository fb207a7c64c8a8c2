//! Boundary between the physics bridge and the scripting runtime

use super::components::ScriptRef;
use crate::core::entity::EntityId;

/// Hook invoked on an entity's script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptHook {
    CollisionBegin { entity: EntityId, other: EntityId },
    CollisionEnd { entity: EntityId, other: EntityId },
    TriggerBegin { entity: EntityId, other: EntityId },
    TriggerEnd { entity: EntityId, other: EntityId },
    RaycastCollision { entity: EntityId },
}

impl ScriptHook {
    /// Name of the script function implementing this hook
    pub fn fn_name(&self) -> &'static str {
        match self {
            ScriptHook::CollisionBegin { .. } => "on_collision_begin",
            ScriptHook::CollisionEnd { .. } => "on_collision_end",
            ScriptHook::TriggerBegin { .. } => "on_trigger_begin",
            ScriptHook::TriggerEnd { .. } => "on_trigger_end",
            ScriptHook::RaycastCollision { .. } => "on_raycast_collision",
        }
    }

    /// Entity whose script receives the hook
    pub fn entity(&self) -> EntityId {
        match *self {
            ScriptHook::CollisionBegin { entity, .. }
            | ScriptHook::CollisionEnd { entity, .. }
            | ScriptHook::TriggerBegin { entity, .. }
            | ScriptHook::TriggerEnd { entity, .. }
            | ScriptHook::RaycastCollision { entity } => entity,
        }
    }

    /// The other party of a collision or trigger
    pub fn other(&self) -> Option<EntityId> {
        match *self {
            ScriptHook::CollisionBegin { other, .. }
            | ScriptHook::CollisionEnd { other, .. }
            | ScriptHook::TriggerBegin { other, .. }
            | ScriptHook::TriggerEnd { other, .. } => Some(other),
            ScriptHook::RaycastCollision { .. } => None,
        }
    }
}

/// Fire-and-forget sink for script hooks
///
/// Implementations must not fail the caller; errors are theirs to log.
pub trait ScriptHooks {
    fn invoke(&mut self, script: &ScriptRef, hook: ScriptHook);
}

/// Hook sink that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScriptHooks;

impl ScriptHooks for NoScriptHooks {
    fn invoke(&mut self, _script: &ScriptRef, _hook: ScriptHook) {}
}

/// Hook sink that records every invocation in order
#[derive(Debug, Default, Clone)]
pub struct RecordingHooks {
    pub calls: Vec<(String, ScriptHook)>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded hooks with the given function name
    pub fn named(&self, fn_name: &str) -> Vec<ScriptHook> {
        self.calls
            .iter()
            .filter(|(_, hook)| hook.fn_name() == fn_name)
            .map(|(_, hook)| *hook)
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl ScriptHooks for RecordingHooks {
    fn invoke(&mut self, script: &ScriptRef, hook: ScriptHook) {
        self.calls.push((script.name.clone(), hook));
    }
}
