//! The per-session pipeline controller.
//!
//! One controller owns one scanning session: the capture source, the
//! reconstruction engine, the keyframe database, the working buffers, and
//! the tracker. Its frame loop is strictly sequential; concurrency lives in
//! the engine's internals and the recorder's writer thread.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fusor_capture::{CaptureError, FrameSource, RecorderError, TimelineRecorder};
use fusor_data::{FrameGeometry, Transform};
use glam::Vec3;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::buffers::FrameBuffers;
use crate::engine::{EngineError, ReconstructionEngine};
use crate::integrate;
use crate::keyframes;
use crate::posedb::PoseKeyframeDatabase;
use crate::preferences::{PreferencesError, VolumeBuilderPreferences};
use crate::tracking::{TrackOutcome, Tracker, TrackingState};
use crate::visualize;

/// Errors that end or refuse a scanning session. Per-frame problems are
/// absorbed by the frame loop and surface as [`FrameOutcome`]s instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Preferences(#[from] PreferencesError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(
        "unusable session geometry: color {}x{}, depth {}x{}",
        .0.color_width, .0.color_height, .0.depth_width, .0.depth_height
    )]
    BadGeometry(FrameGeometry),
}

/// What one frame-loop tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No synchronized frame was ready.
    NoFrame,
    /// A frame arrived but was skipped after a per-frame error.
    Dropped,
    /// Tracked, and the volume/visualization were updated.
    Tracked,
    /// Tracking had been lost and relocalization recovered it this frame.
    Recovered,
    /// Tracking is lost.
    Lost,
    /// A stop was requested; the source has been released.
    Stopped,
}

/// Cloneable handle for requesting a stop from another thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Owns and drives one scanning session.
pub struct PipelineController<S, E, D> {
    source: S,
    engine: E,
    database: D,
    preferences: VolumeBuilderPreferences,
    buffers: FrameBuffers,
    tracker: Tracker,
    recorder: Option<TimelineRecorder>,
    default_world_to_volume: Transform,
    stop: StopHandle,
    integrated_frames: u64,
}

impl<S, E, D> PipelineController<S, E, D>
where
    S: FrameSource,
    E: ReconstructionEngine,
    D: PoseKeyframeDatabase,
{
    /// Build a session around an open source, engine, and database.
    ///
    /// Validates the preferences and the source geometry, and homes the
    /// volume with an initial reset; a failure here is fatal, unlike the
    /// per-frame resets later.
    pub fn new(
        source: S,
        engine: E,
        database: D,
        preferences: VolumeBuilderPreferences,
    ) -> Result<Self, PipelineError> {
        preferences.validate()?;

        let geometry = source.geometry();
        let usable = geometry.color_len() > 0
            && geometry.depth_len() > 0
            && geometry.depth_width % preferences.downsample_factor == 0
            && geometry.depth_height % preferences.downsample_factor == 0;
        if !usable {
            return Err(PipelineError::BadGeometry(geometry));
        }
        if !source.is_active() {
            return Err(PipelineError::Capture(CaptureError::StreamEnded));
        }

        let buffers = FrameBuffers::new(geometry, preferences.downsample_factor);
        let default_world_to_volume = engine.world_to_volume();

        let mut controller = Self {
            source,
            engine,
            database,
            preferences,
            buffers,
            tracker: Tracker::new(),
            recorder: None,
            default_world_to_volume,
            stop: StopHandle::default(),
            integrated_frames: 0,
        };

        let world_to_volume = controller.reset_world_to_volume();
        controller
            .engine
            .reset(&Transform::IDENTITY, &world_to_volume)?;

        info!(
            color_width = geometry.color_width,
            color_height = geometry.color_height,
            depth_width = geometry.depth_width,
            depth_height = geometry.depth_height,
            "Scanning session started"
        );
        Ok(controller)
    }

    /// A handle other threads can use to request a stop.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.tracker.state()
    }

    pub fn pose(&self) -> &Transform {
        self.tracker.pose()
    }

    /// Frames fused into the volume since the last reset.
    pub fn integrated_frames(&self) -> u64 {
        self.integrated_frames
    }

    /// Working buffers of the session, for displaying the shaded surface,
    /// delta map, and clouds of the most recent frame.
    pub fn buffers(&self) -> &FrameBuffers {
        &self.buffers
    }

    /// Run one tick of the frame loop.
    ///
    /// Per-frame capture and engine errors are logged and reported as
    /// [`FrameOutcome::Dropped`]; the session keeps running and the previous
    /// pose stays in effect.
    pub fn process_next_frame(&mut self) -> FrameOutcome {
        if self.stop.is_stop_requested() {
            self.source.stop();
            return FrameOutcome::Stopped;
        }

        let frame = match self.source.acquire() {
            Ok(Some(frame)) => frame.clone(),
            Ok(None) => return FrameOutcome::NoFrame,
            Err(err) => {
                error!("Frame capture failed: {err}");
                return FrameOutcome::Dropped;
            }
        };

        if let Some(recorder) = &self.recorder {
            recorder.append(frame.color_data().to_vec(), frame.depth_data().to_vec());
        }

        let outcome = match self.tracker.track_frame(
            &mut self.engine,
            &mut self.database,
            &frame,
            &mut self.buffers,
            &self.preferences,
        ) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Tracking pass failed: {err}");
                return FrameOutcome::Dropped;
            }
        };

        match outcome {
            TrackOutcome::Tracked | TrackOutcome::Recovered => {
                let pose = *self.tracker.pose();
                match integrate::integrate_frame(
                    &mut self.engine,
                    self.tracker.health_mut(),
                    &pose,
                    &self.buffers,
                    &self.preferences,
                ) {
                    Ok(true) => {
                        self.integrated_frames += 1;
                        keyframes::maybe_store_keyframe(
                            &mut self.database,
                            &frame,
                            &mut self.buffers,
                            &self.tracker,
                            &self.preferences,
                        );
                    }
                    Ok(false) => {}
                    Err(err) => {
                        error!("Depth integration failed: {err}");
                        return FrameOutcome::Dropped;
                    }
                }

                if let Err(err) = visualize::render(&mut self.engine, &pose, &mut self.buffers) {
                    error!("Raycast visualization failed: {err}");
                    return FrameOutcome::Dropped;
                }

                match outcome {
                    TrackOutcome::Recovered => FrameOutcome::Recovered,
                    _ => FrameOutcome::Tracked,
                }
            }
            TrackOutcome::Lost => FrameOutcome::Lost,
        }
    }

    /// Discard the volume, the keyframes, and all tracking state, starting
    /// the scan over from identity.
    ///
    /// An engine reset failure here is logged, not fatal: the session keeps
    /// running and the next frame retries tracking against whatever volume
    /// state remains.
    pub fn reset_reconstruction(&mut self) {
        info!("Resetting reconstruction");
        self.tracker.reset();
        self.integrated_frames = 0;

        let world_to_volume = self.reset_world_to_volume();
        if let Err(err) = self.engine.reset(&Transform::IDENTITY, &world_to_volume) {
            warn!("Volume reset failed: {err}");
        }
        self.database.reset();
    }

    /// Start recording accepted frames to a timeline file.
    pub fn start_recording(&mut self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        self.recorder = Some(TimelineRecorder::create(path)?);
        Ok(())
    }

    /// Stop an active recording, returning the number of frames written.
    pub fn stop_recording(&mut self) -> Result<u64, PipelineError> {
        match self.recorder.take() {
            Some(recorder) => Ok(recorder.finish()?),
            None => Ok(0),
        }
    }

    /// Release the source and flush any active recording.
    pub fn shutdown(mut self) -> Result<(), PipelineError> {
        self.source.stop();
        if let Some(recorder) = self.recorder.take() {
            recorder.finish()?;
        }
        Ok(())
    }

    /// The world-to-volume transform used when (re)homing the volume,
    /// optionally pushed forward so the volume front face clears the
    /// sensor's minimum sensing distance.
    fn reset_world_to_volume(&self) -> Transform {
        if !self.preferences.translate_reset_pose_by_min_depth_threshold {
            return self.default_world_to_volume;
        }
        let shift = self.preferences.min_depth_clip.min(self.preferences.max_depth_clip)
            * self.preferences.voxels_per_meter;
        self.default_world_to_volume
            .translated(Vec3::new(0.0, 0.0, -shift))
    }
}
