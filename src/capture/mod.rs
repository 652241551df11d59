//! Frame acquisition.
//!
//! A `FrameSource` owns a pixel buffer bound to a screen region and overwrites
//! it in place on every `refresh`. Consumers borrow the current contents as a
//! `FrameView`, so nothing can hold on to a frame across a refresh without
//! copying it first.

use crate::util::{GrabError, GrabResult};

pub mod memory;
#[cfg(feature = "x11")]
pub mod x11;

pub use memory::{MemoryFrameSource, PackedFrame};

/// Integer 2D point in pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise sum.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// Capture region in absolute screen coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Region {
    /// Top-left corner of the region on screen.
    pub origin: Point,
    pub width: usize,
    pub height: usize,
}

/// Byte order of the packed pixel values.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ByteOrder {
    #[default]
    LsbFirst,
    MsbFirst,
}

/// Storage layout of one packed pixel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PixelLayout {
    /// 3 or 4 bytes per pixel.
    pub bytes_per_pixel: usize,
    pub byte_order: ByteOrder,
}

impl Default for PixelLayout {
    fn default() -> Self {
        Self {
            bytes_per_pixel: 4,
            byte_order: ByteOrder::LsbFirst,
        }
    }
}

/// Borrowed view of the captured frame.
///
/// Each pixel packs three 8-bit components at bit offsets 0, 8 and 16.
#[derive(Copy, Clone, Debug)]
pub struct FrameView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    layout: PixelLayout,
}

impl<'a> FrameView<'a> {
    /// Creates a view; `stride` is in bytes.
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
        layout: PixelLayout,
    ) -> GrabResult<Self> {
        if width == 0 || height == 0 {
            return Err(GrabError::InvalidDimensions { width, height });
        }
        if !matches!(layout.bytes_per_pixel, 3 | 4) {
            return Err(GrabError::InvalidConfig("bytes_per_pixel must be 3 or 4"));
        }
        let row_len = width
            .checked_mul(layout.bytes_per_pixel)
            .ok_or(GrabError::InvalidDimensions { width, height })?;
        if stride < row_len {
            return Err(GrabError::InvalidStride { width, stride });
        }
        let needed = (height - 1)
            .checked_mul(stride)
            .and_then(|v| v.checked_add(row_len))
            .ok_or(GrabError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(GrabError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            layout,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Raw bytes of row `y`, without padding.
    pub fn row_bytes(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.stride;
        self.data
            .get(start..start + self.width * self.layout.bytes_per_pixel)
    }

    /// Packed pixel value at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width {
            return None;
        }
        let bpp = self.layout.bytes_per_pixel;
        let row = self.row_bytes(y)?;
        let bytes = row.get(x * bpp..(x + 1) * bpp)?;
        Some(unpack(bytes, self.layout.byte_order))
    }
}

#[inline]
pub(crate) fn unpack(bytes: &[u8], order: ByteOrder) -> u32 {
    match order {
        ByteOrder::LsbFirst => bytes
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32),
        ByteOrder::MsbFirst => bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32),
    }
}

/// Source of frames bound to a fixed capture region.
pub trait FrameSource {
    /// Overwrites the frame buffer with the current region contents.
    fn refresh(&mut self) -> GrabResult<()>;

    /// Borrows the most recently captured frame.
    fn frame(&self) -> FrameView<'_>;

    /// The region bound at initialization.
    fn region(&self) -> Region;

    /// Maps a frame-local point to absolute screen coordinates.
    ///
    /// Uses the origin recorded at initialization; moving the window later
    /// invalidates the translation.
    fn translate_local(&self, local: Point) -> Point {
        let origin = self.region().origin;
        origin.offset(local.x, local.y)
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn refresh(&mut self) -> GrabResult<()> {
        (**self).refresh()
    }

    fn frame(&self) -> FrameView<'_> {
        (**self).frame()
    }

    fn region(&self) -> Region {
        (**self).region()
    }

    fn translate_local(&self, local: Point) -> Point {
        (**self).translate_local(local)
    }
}
