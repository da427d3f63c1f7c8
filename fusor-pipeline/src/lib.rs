//! Fusor Pipeline
//!
//! The tracking-and-integration core of the fusor scanner: per-frame camera
//! pose estimation by point-cloud alignment against a volumetric
//! reconstruction, tracking-health bookkeeping with keyframe-based
//! relocalization, gated depth integration, and raycast visualization
//! feedback.
//!
//! The volumetric engine and the pose-keyframe database are consumed through
//! the [`engine::ReconstructionEngine`] and [`posedb::PoseKeyframeDatabase`]
//! contracts; this crate never implements their internals.
//!
//! ## Modules
//!
//! - [`controller`]: per-frame orchestration and lifecycle
//! - [`tracking`]: frame-to-model pose tracking and health counters
//! - [`relocalize`]: pose recovery against the keyframe database
//! - [`integrate`]: depth fusion gating
//! - [`visualize`]: raycast surface shading for display
//! - [`resample`]: row-parallel image resampling kernels
//! - [`keyframes`]: keyframe database upkeep

pub mod buffers;
pub mod controller;
pub mod engine;
pub mod integrate;
pub mod keyframes;
pub mod posedb;
pub mod preferences;
pub mod relocalize;
pub mod resample;
pub mod tracking;
pub mod visualize;

pub use buffers::FrameBuffers;
pub use controller::{FrameOutcome, PipelineController, PipelineError, StopHandle};
pub use engine::{Alignment, EngineError, ReconstructionEngine};
pub use posedb::{PoseCandidates, PoseKeyframeDatabase};
pub use preferences::{PreferencesError, VolumeBuilderPreferences};
pub use tracking::{TrackOutcome, Tracker, TrackingHealth, TrackingState};

#[cfg(test)]
pub(crate) mod test_support;
