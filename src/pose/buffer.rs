//! Caller-side rolling frame buffer.
//!
//! The server is stateless and expects a full window on every call, so any
//! streaming client keeps its own buffer and submits the complete window.

use std::collections::VecDeque;

use super::landmark::Frame;
use super::window::Window;

/// Rolling buffer holding the most recent `capacity` frames in chronological order
pub struct FrameBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a frame, evicting the oldest one when full
    pub fn push(&mut self, frame: Frame) {
        if self.capacity == 0 {
            return;
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Whether enough frames are buffered to form a window
    pub fn is_ready(&self) -> bool {
        self.capacity > 0 && self.frames.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot the buffer as a window, oldest frame first
    pub fn window(&self) -> Option<Window> {
        if !self.is_ready() {
            return None;
        }
        let frames: Vec<Frame> = self.frames.iter().cloned().collect();
        Some(Window::from_frames(&frames))
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
