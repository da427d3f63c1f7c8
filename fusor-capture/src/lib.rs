//! Fusor Capture - frame acquisition and timeline recording
//!
//! This crate defines the `FrameSource` contract the pipeline pulls
//! synchronized depth + color frames from, plus the frame timeline sink:
//!
//! - A length-prefixed binary timeline format for recorded frame streams
//! - A `TimelineRecorder` that writes accepted frames on a background thread
//! - A `ReplaySource` that plays a recorded timeline back as a `FrameSource`
//!
//! ## Example
//!
//! ```ignore
//! use fusor_capture::{FrameSource, ReplaySource};
//!
//! let mut source = ReplaySource::open("scan.ftl", geometry)?;
//! while let Some(frame) = source.acquire()? {
//!     // Process frame...
//! }
//! ```

mod recorder;
mod replay;
mod source;
mod timeline;

pub use recorder::{RecorderError, TimelineRecorder};
pub use replay::ReplaySource;
pub use source::{CaptureError, FrameSource};
pub use timeline::TimelineRecord;
