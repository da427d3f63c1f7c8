//! Fusor Data Crate
//!
//! Leaf data types shared across the fusor scanning pipeline: synchronized
//! depth + color camera frames, rigid 4x4 transforms for camera poses, and
//! the image and point-cloud buffer types the pipeline kernels operate on.
//! This crate is engine-agnostic and does no I/O.

pub mod frame;
pub mod transform;
pub mod types;

pub use frame::{Frame, FrameError, FrameGeometry, map_depth_to_byte};
pub use transform::Transform;
pub use types::{ColorBuffer, DepthFloatFrame, PointCloudFrame};
