//! Shared mocks and fixtures for pipeline tests.

use std::collections::VecDeque;

use fusor_capture::{CaptureError, FrameSource};
use fusor_data::{
    ColorBuffer, DepthFloatFrame, Frame, FrameGeometry, PointCloudFrame, Transform,
};
use glam::Vec3;

use crate::engine::{Alignment, EngineError, ReconstructionEngine};
use crate::posedb::{PoseCandidates, PoseKeyframeDatabase};
use crate::preferences::VolumeBuilderPreferences;
use crate::tracking::Tracker;

/// Small geometry so tests stay fast: 16x8 color, 8x8 depth.
pub(crate) fn test_geometry() -> FrameGeometry {
    FrameGeometry::new(16, 8, 8, 8)
}

/// A frame at [`test_geometry`] with uniform mid-range depth.
pub(crate) fn test_frame() -> Frame {
    let geometry = test_geometry();
    let mut frame = Frame::new(geometry);
    let depth = vec![1500u16; geometry.depth_len()];
    frame
        .update_depth(geometry.depth_width, geometry.depth_height, &depth)
        .unwrap();
    frame
}

pub(crate) fn test_preferences() -> VolumeBuilderPreferences {
    VolumeBuilderPreferences::default()
}

/// A tracker that has accepted `frames` frames in a row, optionally with a
/// failure somewhere before the streak.
pub(crate) fn advance_tracker(frames: u64, failed_previously: bool) -> Tracker {
    let mut tracker = Tracker::new();
    if failed_previously {
        tracker.health_mut().record_failure();
    }
    for _ in 0..frames {
        tracker.health_mut().record_success();
    }
    tracker.force_progress(frames);
    tracker
}

/// Engine double with scripted alignment results and call counters.
///
/// The image-processing operations have simple functional behavior so data
/// actually flows through the pipeline buffers.
#[derive(Debug, Default)]
pub(crate) struct MockEngine {
    pub align_results: VecDeque<Alignment>,
    pub raycast_calls: usize,
    pub align_calls: usize,
    pub integrate_calls: usize,
    pub reset_calls: usize,
    pub fail_integrate: bool,
    pub fail_reset: bool,
    pub fail_align: bool,
}

impl ReconstructionEngine for MockEngine {
    fn world_to_volume(&self) -> Transform {
        Transform::IDENTITY
    }

    fn default_align_iterations(&self) -> u32 {
        7
    }

    fn depth_to_float(
        &mut self,
        depth: &[u16],
        min_clip: f32,
        max_clip: f32,
        out: &mut DepthFloatFrame,
    ) -> Result<(), EngineError> {
        for (dst, &raw) in out.pixels.iter_mut().zip(depth) {
            let meters = f32::from(raw) * 0.001;
            *dst = if meters < min_clip || meters > max_clip {
                0.0
            } else {
                meters
            };
        }
        Ok(())
    }

    fn smooth(
        &mut self,
        input: &DepthFloatFrame,
        _kernel_width: u32,
        _distance_threshold: f32,
        out: &mut DepthFloatFrame,
    ) -> Result<(), EngineError> {
        out.pixels.copy_from_slice(&input.pixels);
        Ok(())
    }

    fn point_cloud_from_depth(
        &mut self,
        depth: &DepthFloatFrame,
        out: &mut PointCloudFrame,
    ) -> Result<(), EngineError> {
        for (i, &d) in depth.pixels.iter().enumerate() {
            if d > 0.0 {
                out.points[i] = Vec3::new(0.0, 0.0, d);
                out.normals[i] = Vec3::new(0.0, 0.0, -1.0);
            } else {
                out.points[i] = Vec3::ZERO;
                out.normals[i] = Vec3::ZERO;
            }
        }
        Ok(())
    }

    fn raycast_point_cloud(
        &mut self,
        _pose: &Transform,
        out: &mut PointCloudFrame,
    ) -> Result<(), EngineError> {
        self.raycast_calls += 1;
        out.normals.fill(Vec3::new(0.0, 0.0, -1.0));
        Ok(())
    }

    fn align_point_clouds(
        &mut self,
        _model: &PointCloudFrame,
        _observed: &PointCloudFrame,
        _max_iterations: u32,
        pose: &Transform,
        delta: Option<&mut ColorBuffer>,
    ) -> Result<Alignment, EngineError> {
        self.align_calls += 1;
        if self.fail_align {
            return Err(EngineError::InvalidOperation("align failed".into()));
        }
        if let Some(delta) = delta {
            delta.pixels.fill(0xFF00_FF00);
        }
        Ok(self.align_results.pop_front().unwrap_or(Alignment {
            converged: true,
            energy: 0.003,
            pose: *pose,
        }))
    }

    fn integrate(
        &mut self,
        _depth: &DepthFloatFrame,
        _weight: u16,
        _pose: &Transform,
    ) -> Result<(), EngineError> {
        if self.fail_integrate {
            return Err(EngineError::InvalidOperation("integrate failed".into()));
        }
        self.integrate_calls += 1;
        Ok(())
    }

    fn reset(
        &mut self,
        _pose: &Transform,
        _world_to_volume: &Transform,
    ) -> Result<(), EngineError> {
        if self.fail_reset {
            return Err(EngineError::DeviceUnavailable("reset failed".into()));
        }
        self.reset_calls += 1;
        Ok(())
    }
}

/// Database double with a fixed candidate response.
#[derive(Debug, Default)]
pub(crate) struct MockDatabase {
    pub stored: usize,
    pub candidates: Option<PoseCandidates>,
    pub find_calls: usize,
    pub insert_calls: usize,
    pub reject_inserts: bool,
    pub reset_calls: usize,
}

impl PoseKeyframeDatabase for MockDatabase {
    fn stored_count(&self) -> usize {
        self.stored
    }

    fn find_pose(
        &mut self,
        _depth: &DepthFloatFrame,
        _color: &ColorBuffer,
    ) -> Option<PoseCandidates> {
        self.find_calls += 1;
        self.candidates.clone()
    }

    fn try_insert(
        &mut self,
        _depth: &DepthFloatFrame,
        _color: &ColorBuffer,
        _pose: &Transform,
        _accept_threshold: f32,
    ) -> bool {
        self.insert_calls += 1;
        if self.reject_inserts {
            return false;
        }
        self.stored += 1;
        true
    }

    fn reset(&mut self) {
        self.reset_calls += 1;
        self.stored = 0;
    }
}

/// One scripted capture tick.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Tick {
    /// A valid frame.
    Frame,
    /// A frame whose depth image disagrees with the session geometry.
    Mismatch,
    /// No synchronized pair ready this tick.
    Idle,
}

/// Frame source double driven by a queue of [`Tick`]s. The queue running
/// out ends the stream.
#[derive(Debug)]
pub(crate) struct ScriptedSource {
    frame: Frame,
    ticks: VecDeque<Tick>,
    active: bool,
    timestamp_ms: u32,
}

impl ScriptedSource {
    pub fn new(ticks: impl IntoIterator<Item = Tick>) -> Self {
        Self {
            frame: test_frame(),
            ticks: ticks.into_iter().collect(),
            active: true,
            timestamp_ms: 0,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn acquire(&mut self) -> Result<Option<&Frame>, CaptureError> {
        if !self.active {
            return Ok(None);
        }
        let Some(tick) = self.ticks.pop_front() else {
            self.active = false;
            return Ok(None);
        };

        match tick {
            Tick::Idle => Ok(None),
            Tick::Mismatch => {
                let geometry = self.frame.geometry();
                let bad_width = geometry.depth_width + 1;
                let bad =
                    vec![0u16; bad_width as usize * geometry.depth_height as usize];
                self.frame
                    .update_depth(bad_width, geometry.depth_height, &bad)?;
                Ok(Some(&self.frame))
            }
            Tick::Frame => {
                self.timestamp_ms += 33;
                self.frame.set_timestamp_ms(self.timestamp_ms);
                Ok(Some(&self.frame))
            }
        }
    }

    fn geometry(&self) -> FrameGeometry {
        self.frame.geometry()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn stop(&mut self) {
        self.active = false;
    }
}
