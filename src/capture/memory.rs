//! In-memory frame source.
//!
//! Replays a fixed list of packed frames, advancing one frame per refresh and
//! wrapping around. Offline scans and the test suite use it in place of a
//! live display.

use crate::capture::{ByteOrder, FrameSource, FrameView, PixelLayout, Point, Region};
use crate::util::{GrabError, GrabResult};

/// Owned packed frame in 4-byte LSB-first layout.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedFrame {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl PackedFrame {
    /// Builds a frame from a per-pixel `[c0, c1, c2]` generator.
    ///
    /// `c0` ends up in bits 0..8 of the packed value, `c2` in bits 16..24.
    pub fn from_components<F>(width: usize, height: usize, mut f: F) -> GrabResult<Self>
    where
        F: FnMut(usize, usize) -> [u8; 3],
    {
        if width == 0 || height == 0 {
            return Err(GrabError::InvalidDimensions { width, height });
        }
        let mut data = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                let [c0, c1, c2] = f(x, y);
                data.extend_from_slice(&[c0, c1, c2, 0]);
            }
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Builds a frame whose three components all equal the gray value.
    pub fn from_gray(gray: &[u8], width: usize, height: usize) -> GrabResult<Self> {
        let needed = width.saturating_mul(height);
        if gray.len() != needed {
            return Err(GrabError::BufferTooSmall {
                needed,
                got: gray.len(),
            });
        }
        Self::from_components(width, height, |x, y| {
            let v = gray[y * width + x];
            [v, v, v]
        })
    }

    /// Builds a frame from an RGB image, packing blue into the low byte.
    #[cfg(feature = "image-io")]
    pub fn from_rgb_image(img: &image::RgbImage) -> GrabResult<Self> {
        Self::from_components(img.width() as usize, img.height() as usize, |x, y| {
            let [r, g, b] = img.get_pixel(x as u32, y as u32).0;
            [b, g, r]
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width * 4,
            layout: PixelLayout {
                bytes_per_pixel: 4,
                byte_order: ByteOrder::LsbFirst,
            },
        }
    }
}

/// Frame source that cycles through preloaded frames.
pub struct MemoryFrameSource {
    frames: Vec<PackedFrame>,
    current: usize,
    region: Region,
    refreshes: usize,
}

impl MemoryFrameSource {
    /// Creates a source; every frame must share the first frame's size.
    pub fn new(frames: Vec<PackedFrame>, origin: Point) -> GrabResult<Self> {
        let first = frames
            .first()
            .ok_or(GrabError::InvalidConfig("memory source needs at least one frame"))?;
        let (width, height) = (first.width, first.height);
        if frames.iter().any(|f| f.width != width || f.height != height) {
            return Err(GrabError::InvalidConfig(
                "memory source frames must share one size",
            ));
        }
        Ok(Self {
            frames,
            current: 0,
            region: Region {
                origin,
                width,
                height,
            },
            refreshes: 0,
        })
    }

    /// Number of completed `refresh` calls.
    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

impl FrameSource for MemoryFrameSource {
    fn refresh(&mut self) -> GrabResult<()> {
        if self.refreshes > 0 {
            self.current = (self.current + 1) % self.frames.len();
        }
        self.refreshes += 1;
        Ok(())
    }

    fn frame(&self) -> FrameView<'_> {
        self.frames[self.current].view()
    }

    fn region(&self) -> Region {
        self.region
    }
}
