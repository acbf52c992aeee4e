pub mod frame;
pub mod joint;
pub mod orientation;

pub use frame::{SkeletonData, SkeletonFrame, MAX_TRACKED, SKELETON_COUNT};
pub use joint::{JointIndex, JointTrackingState, SkeletonTrackingState};
pub use orientation::{compute_bone_orientations, BoneOrientation};
