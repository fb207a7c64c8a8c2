//! Reverse-lookup records attached to native physics objects
//!
//! Native bodies only store an integer in Rapier's `user_data` slot. The
//! integer is a tagged slotmap key into [`BodyDataArena`], so a stale or
//! foreign value resolves to `None` instead of a dangling record.

use crate::core::entity::{EntityId, SceneId};
use slotmap::{new_key_type, Key, KeyData, SlotMap};

new_key_type! {
    /// Handle to a [`PhysicsBodyData`] record
    pub struct BodyDataKey;
    /// Handle to a [`ConstrainedJointData`] record
    pub struct JointDataKey;
}

/// High bits marking a `user_data` value as one of ours; untouched objects carry 0
const USER_DATA_TAG: u128 = 0x5059_5359_u128 << 64;
const USER_DATA_TAG_MASK: u128 = u128::MAX << 64;

/// Encode a body-data key for a native `user_data` slot
pub fn encode_user_data(key: BodyDataKey) -> u128 {
    USER_DATA_TAG | key.data().as_ffi() as u128
}

/// Decode a native `user_data` slot back into a body-data key
pub fn decode_user_data(user_data: u128) -> Option<BodyDataKey> {
    if user_data & USER_DATA_TAG_MASK != USER_DATA_TAG {
        return None;
    }
    Some(BodyDataKey::from(KeyData::from_ffi(user_data as u64)))
}

/// Identity of the entity owning a native actor or controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsBodyData {
    pub entity: EntityId,
    pub scene: SceneId,
}

/// Identity and break state of a native joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstrainedJointData {
    pub entity: EntityId,
    pub is_broken: bool,
}

/// Arena owning every reverse-lookup record of one simulation run
#[derive(Debug, Default)]
pub struct BodyDataArena {
    bodies: SlotMap<BodyDataKey, PhysicsBodyData>,
    joints: SlotMap<JointDataKey, ConstrainedJointData>,
}

impl BodyDataArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_body(&mut self, data: PhysicsBodyData) -> BodyDataKey {
        self.bodies.insert(data)
    }

    pub fn remove_body(&mut self, key: BodyDataKey) -> Option<PhysicsBodyData> {
        self.bodies.remove(key)
    }

    pub fn body(&self, key: BodyDataKey) -> Option<&PhysicsBodyData> {
        self.bodies.get(key)
    }

    /// Resolve a native `user_data` value to its record
    pub fn resolve(&self, user_data: u128) -> Option<&PhysicsBodyData> {
        decode_user_data(user_data).and_then(|key| self.bodies.get(key))
    }

    pub fn insert_joint(&mut self, data: ConstrainedJointData) -> JointDataKey {
        self.joints.insert(data)
    }

    pub fn remove_joint(&mut self, key: JointDataKey) -> Option<ConstrainedJointData> {
        self.joints.remove(key)
    }

    pub fn joint(&self, key: JointDataKey) -> Option<&ConstrainedJointData> {
        self.joints.get(key)
    }

    pub fn joint_mut(&mut self, key: JointDataKey) -> Option<&mut ConstrainedJointData> {
        self.joints.get_mut(key)
    }

    /// Number of live body records
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of live joint records
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.joints.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64) -> PhysicsBodyData {
        PhysicsBodyData {
            entity: EntityId(id),
            scene: SceneId(1),
        }
    }

    #[test]
    fn test_user_data_resolves_live_record() {
        let mut arena = BodyDataArena::new();
        let key = arena.insert_body(record(7));

        let user_data = encode_user_data(key);
        assert_eq!(arena.resolve(user_data).map(|d| d.entity), Some(EntityId(7)));
    }

    #[test]
    fn test_untagged_user_data_never_resolves() {
        let mut arena = BodyDataArena::new();
        arena.insert_body(record(1));

        assert!(arena.resolve(0).is_none());
        assert!(decode_user_data(42).is_none());
    }

    #[test]
    fn test_removed_record_does_not_resolve_after_slot_reuse() {
        let mut arena = BodyDataArena::new();
        let old = arena.insert_body(record(1));
        let stale = encode_user_data(old);
        arena.remove_body(old);
        arena.insert_body(record(2));

        assert!(arena.resolve(stale).is_none());
        assert_eq!(arena.body_count(), 1);
    }

    #[test]
    fn test_joint_records() {
        let mut arena = BodyDataArena::new();
        let key = arena.insert_joint(ConstrainedJointData {
            entity: EntityId(3),
            is_broken: false,
        });

        arena.joint_mut(key).unwrap().is_broken = true;
        assert!(arena.joint(key).unwrap().is_broken);
        assert!(arena.remove_joint(key).is_some());
        assert_eq!(arena.joint_count(), 0);
    }
}
