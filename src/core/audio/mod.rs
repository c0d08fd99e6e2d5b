//! Output side of the pipeline: anything that can take finished frames

mod output;

pub use self::output::{CpalSink, FrameReader, DEVICE_QUEUE_FRAMES};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use crate::core::mixer::Frame;

/// Receives mixed frames in tick order. `render` may block while the device
/// catches up; it is the only stage allowed to.
pub trait FrameSink {
    fn render(&mut self, frame: Frame) -> Result<()>;
}

/// Keeps every frame in memory, optionally clearing a run flag after a
/// number of frames
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub frames: Vec<Frame>,
    stop_after: Option<(usize, Arc<AtomicBool>)>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear `running` once `count` frames have been rendered
    pub fn stop_after(count: usize, running: Arc<AtomicBool>) -> Self {
        Self {
            frames: Vec::new(),
            stop_after: Some((count, running)),
        }
    }

    pub fn samples(&self) -> Vec<i16> {
        self.frames.iter().flat_map(|f| f.iter().copied()).collect()
    }
}

impl FrameSink for CollectingSink {
    fn render(&mut self, frame: Frame) -> Result<()> {
        self.frames.push(frame);
        if let Some((count, running)) = &self.stop_after {
            if self.frames.len() >= *count {
                running.store(false, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}
