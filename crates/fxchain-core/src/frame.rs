use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{FxError, FxResult};
use crate::time::Timestamp;

/// Bytes per pixel of every frame buffer (8-bit RGBA).
pub const BYTES_PER_PIXEL: usize = 4;

/// A single image as a raw RGBA8 pixel buffer, rows top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with zeros (transparent black).
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; byte_len(width, height)],
            width,
            height,
        }
    }

    /// Create a frame buffer filled with a solid color.
    pub fn solid(width: u32, height: u32, color: &Color) -> Self {
        let pixel = color.to_rgba8();
        let mut data = Vec::with_capacity(byte_len(width, height));
        for _ in 0..(width as usize) * (height as usize) {
            data.extend_from_slice(&pixel);
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Wrap existing RGBA8 bytes. Fails if the length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> FxResult<Self> {
        let expected = byte_len(width, height);
        if data.len() != expected {
            return Err(FxError::asset(
                format!(
                    "pixel data is {} bytes, expected {} for {}x{}",
                    data.len(),
                    expected,
                    width,
                    height
                ),
                "<memory>",
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// `(width, height)` pair.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[offset..offset + BYTES_PER_PIXEL]);
        Some(px)
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if let Some(offset) = self.offset(x, y) {
            self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&rgba);
        }
    }

    /// Pixel as a unit-range color.
    pub fn get_color(&self, x: u32, y: u32) -> Option<Color> {
        self.get_pixel(x, y).map(Color::from_rgba8)
    }

    /// Nearest-neighbour lookup at normalized coordinates, clamped to the edges.
    /// An empty buffer samples as transparent black.
    pub fn sample(&self, u: f32, v: f32) -> Color {
        if self.width == 0 || self.height == 0 {
            return Color::TRANSPARENT;
        }
        let x = ((u.clamp(0.0, 1.0) * self.width as f32) as u32).min(self.width - 1);
        let y = ((v.clamp(0.0, 1.0) * self.height as f32) as u32).min(self.height - 1);
        self.get_color(x, y).unwrap_or(Color::TRANSPARENT)
    }

    /// Change the dimensions, reusing the allocation. Contents become unspecified
    /// and are zeroed when the buffer grows.
    pub fn reshape(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.resize(byte_len(width, height), 0);
    }

    /// Overwrite this buffer with the contents and size of `other`.
    pub fn copy_from(&mut self, other: &FrameBuffer) {
        self.width = other.width;
        self.height = other.height;
        self.data.clear();
        self.data.extend_from_slice(&other.data);
    }

    /// Mean color over all pixels; transparent black for an empty buffer.
    pub fn average_color(&self) -> Color {
        let n = self.pixel_count();
        if n == 0 {
            return Color::TRANSPARENT;
        }
        let mut sum = [0u64; 4];
        for px in self.data.chunks_exact(BYTES_PER_PIXEL) {
            for (acc, c) in sum.iter_mut().zip(px) {
                *acc += *c as u64;
            }
        }
        let avg = |s: u64| s as f32 / (n as f32 * 255.0);
        Color::rgba(avg(sum[0]), avg(sum[1]), avg(sum[2]), avg(sum[3]))
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(((y as usize) * (self.width as usize) + (x as usize)) * BYTES_PER_PIXEL)
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    (width as usize) * (height as usize) * BYTES_PER_PIXEL
}

/// Index of a frame in the output sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Frame {
    /// Zero-based frame index.
    pub index: u64,
}

impl Frame {
    pub fn new(index: u64) -> Self {
        Self { index }
    }

    /// Convert a frame index to a timestamp given a frame rate.
    pub fn to_timestamp(&self, fps: f64) -> Timestamp {
        Timestamp::from_seconds(self.index as f64 / fps)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame({})", self.index)
    }
}

/// Per-frame data handed to every stage. Built fresh by the caller each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Elapsed time since the animation started.
    pub time: Timestamp,
    /// Frame being produced.
    pub frame: Frame,
    /// Output surface width.
    pub width: u32,
    /// Output surface height.
    pub height: u32,
}

impl FrameContext {
    pub fn new(time: Timestamp, frame: Frame, width: u32, height: u32) -> Self {
        Self {
            time,
            frame,
            width,
            height,
        }
    }

    /// Context for frame `index` of a fixed-rate sequence.
    pub fn at_frame(index: u64, fps: f64, width: u32, height: u32) -> Self {
        let frame = Frame::new(index);
        Self::new(frame.to_timestamp(fps), frame, width, height)
    }

    /// Elapsed time in seconds.
    pub fn seconds(&self) -> f64 {
        self.time.as_seconds()
    }
}
