pub mod identity;
pub mod processor;
pub mod smooth;
pub mod space;

pub use identity::IdentityTracker;
pub use processor::{SkeletonFrameProcessor, TrackedSkeleton};
pub use smooth::JointSmoother;
pub use space::SpaceTransformer;
