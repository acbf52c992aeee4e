pub mod armature;
pub mod binding;
pub mod humanoid;
pub mod mask;
pub mod retarget;

pub use armature::{Armature, Hierarchy, NodeId};
pub use binding::{RigBinding, RigBone, RIG_SLOT_COUNT};
pub use mask::BoneMask;
pub use retarget::{RetargetSettings, RigRetargeter, SPINE_BACK_TILT_DEG};
