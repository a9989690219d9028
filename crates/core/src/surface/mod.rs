//! The drawable target frames are painted onto.

use serde::{Deserialize, Serialize};

use crate::source::VisualSource;
use crate::Result;

/// Pixel dimensions of the drawable area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A 2D drawable target.
///
/// `resize` must be called before any blit after a size change; `blit` must
/// be safe to call before the source has decoded a frame (no-op or
/// last-known-good frame).
pub trait Surface {
    /// Current layout extent of the surface in the surrounding widget tree.
    fn layout_size(&self) -> ViewportSize;
    /// Sets the drawable pixel dimensions.
    fn resize(&mut self, size: ViewportSize);
    /// Copies the source's current frame, scaled to `size`, onto the target.
    fn blit(&mut self, source: &dyn VisualSource, size: ViewportSize) -> Result<()>;
}

/// In-memory RGBA surface.
///
/// Paints a synthetic frame whose shade encodes the source position, which
/// is enough for the simulated session and for asserting blit behavior in
/// tests.
pub struct PixelSurface {
    layout: ViewportSize,
    size: ViewportSize,
    pixels: Vec<u8>,
    blits: u64,
    last_position: Option<f64>,
}

impl PixelSurface {
    pub fn new(layout: ViewportSize) -> Self {
        Self {
            layout,
            size: ViewportSize::default(),
            pixels: Vec::new(),
            blits: 0,
            last_position: None,
        }
    }

    /// Simulates a layout change driven by the surrounding widget tree.
    pub fn set_layout_size(&mut self, layout: ViewportSize) {
        self.layout = layout;
    }

    /// Number of frames painted so far.
    pub fn blit_count(&self) -> u64 {
        self.blits
    }

    /// Source position of the most recently painted frame.
    pub fn last_position(&self) -> Option<f64> {
        self.last_position
    }

    /// The drawable pixel dimensions set by the last `resize`.
    pub fn pixel_size(&self) -> ViewportSize {
        self.size
    }
}

impl Surface for PixelSurface {
    fn layout_size(&self) -> ViewportSize {
        self.layout
    }

    fn resize(&mut self, size: ViewportSize) {
        self.size = size;
        self.pixels.clear();
        self.pixels.resize(size.pixel_count() * 4, 0);
    }

    fn blit(&mut self, source: &dyn VisualSource, _size: ViewportSize) -> Result<()> {
        let position = source.current_position();
        // Shade the frame by its position within the stream so successive
        // frames are distinguishable in the buffer.
        let shade = if source.duration() > 0.0 {
            ((position / source.duration()).clamp(0.0, 1.0) * 255.0) as u8
        } else {
            0
        };
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel[0] = shade;
            pixel[1] = shade;
            pixel[2] = shade;
            pixel[3] = 0xff;
        }
        self.blits += 1;
        self.last_position = Some(position);
        Ok(())
    }
}

impl std::fmt::Debug for PixelSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelSurface")
            .field("layout", &self.layout)
            .field("size", &self.size)
            .field("blits", &self.blits)
            .finish()
    }
}
