//! Streaming timeline recorder.
//!
//! Frames are handed off to a background writer thread through a channel so
//! file I/O never blocks the tracking pipeline. The writer drains everything
//! queued each time it wakes, and a dedicated stop message flushes and
//! closes the stream on shutdown.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use thiserror::Error;
use tracing::{error, info, trace};

use crate::timeline::TimelineRecord;

/// Errors raised by the timeline recorder.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Recorder writer thread terminated unexpectedly")]
    WriterLost,
}

enum WriterMessage {
    Frame(TimelineRecord),
    Stop,
}

/// Records accepted frames to a timeline file on a background thread.
///
/// The recorder owns its copy of each frame's buffers once handed off;
/// callers clone before appending and are free to reuse or mutate their own
/// buffers afterwards. Time offsets are measured from recorder creation.
pub struct TimelineRecorder {
    sender: Sender<WriterMessage>,
    handle: Option<JoinHandle<io::Result<u64>>>,
    started: Instant,
    path: PathBuf,
}

impl TimelineRecorder {
    /// Create the timeline file and spawn the writer thread.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let path = path.as_ref().to_path_buf();
        let writer = BufWriter::new(File::create(&path)?);
        let (sender, receiver) = unbounded();
        let handle = thread::Builder::new()
            .name("timeline-writer".into())
            .spawn(move || write_loop(writer, receiver))?;

        info!("Recording frame timeline to {}", path.display());

        Ok(Self {
            sender,
            handle: Some(handle),
            started: Instant::now(),
            path,
        })
    }

    /// Queue one frame for writing. The buffers belong to the recorder from
    /// here on.
    pub fn append(&self, color_data: Vec<u8>, depth_data: Vec<u16>) {
        let record = TimelineRecord {
            time_ms: self.started.elapsed().as_millis() as u32,
            color_data,
            depth_data,
        };
        trace!(
            "Queue frame. Time: {}ms, ColorData: {} bytes, DepthData: {} samples",
            record.time_ms,
            record.color_data.len(),
            record.depth_data.len()
        );
        if self.sender.send(WriterMessage::Frame(record)).is_err() {
            error!("Timeline writer thread is gone; frame dropped");
        }
    }

    /// Stop the writer, flush everything still queued, and close the file.
    pub fn finish(mut self) -> Result<u64, RecorderError> {
        let _ = self.sender.send(WriterMessage::Stop);
        let handle = self.handle.take().ok_or(RecorderError::WriterLost)?;
        let frames = handle
            .join()
            .map_err(|_| RecorderError::WriterLost)??;
        info!("Saved {} frames to {}", frames, self.path.display());
        Ok(frames)
    }
}

impl Drop for TimelineRecorder {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.sender.send(WriterMessage::Stop);
            let _ = handle.join();
        }
    }
}

fn write_loop(
    mut writer: BufWriter<File>,
    receiver: Receiver<WriterMessage>,
) -> io::Result<u64> {
    let mut frames = 0u64;
    loop {
        // Each wake drains the queue in order; the stop message (or a
        // dropped sender) ends the loop after everything queued ahead of it
        // has been written.
        match receiver.recv() {
            Ok(WriterMessage::Frame(record)) => {
                record.write_to(&mut writer)?;
                frames += 1;
            }
            Ok(WriterMessage::Stop) | Err(_) => break,
        }
    }
    writer.flush()?;
    Ok(frames)
}
