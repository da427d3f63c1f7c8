//! Replay of recorded frame timelines as a `FrameSource`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use fusor_data::{Frame, FrameGeometry};
use tracing::{debug, info};

use crate::source::{CaptureError, FrameSource};
use crate::timeline::TimelineRecord;

/// Plays a recorded timeline back frame by frame.
///
/// The timeline format carries flat buffers only, so the caller supplies
/// the geometry the file was recorded with; records whose buffer sizes do
/// not match it are rejected like any other geometry mismatch.
pub struct ReplaySource {
    reader: Option<BufReader<File>>,
    geometry: FrameGeometry,
    frame: Frame,
    frames_read: u64,
}

impl ReplaySource {
    pub fn open(path: impl AsRef<Path>, geometry: FrameGeometry) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| CaptureError::OpenFailed(format!("{}: {e}", path.display())))?;

        info!("Replaying frame timeline from {}", path.display());

        Ok(Self {
            reader: Some(BufReader::new(file)),
            geometry,
            frame: Frame::new(geometry),
            frames_read: 0,
        })
    }

    /// Number of frames handed out so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl FrameSource for ReplaySource {
    fn acquire(&mut self) -> Result<Option<&Frame>, CaptureError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let Some(record) = TimelineRecord::read_from(reader)? else {
            debug!("Timeline ended after {} frames", self.frames_read);
            self.reader = None;
            return Ok(None);
        };

        // Buffer sizes are validated against the configured geometry by the
        // frame update itself.
        self.frame.update_color(
            self.geometry.color_width,
            self.geometry.color_height,
            &record.color_data,
        )?;
        self.frame.update_depth(
            self.geometry.depth_width,
            self.geometry.depth_height,
            &record.depth_data,
        )?;
        self.frame.set_timestamp_ms(record.time_ms);
        self.frames_read += 1;

        Ok(Some(&self.frame))
    }

    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    fn is_active(&self) -> bool {
        self.reader.is_some()
    }

    fn stop(&mut self) {
        self.reader = None;
    }
}
