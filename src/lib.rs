pub mod config;
pub mod math;
pub mod rig;
pub mod sensor;
pub mod skeleton;
pub mod tracker;
