//! Canonical images used for comparison.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride
//! and an interleaved channel count. The stride counts elements between the
//! starts of consecutive rows and must cover `width * channels`. `OwnedImage`
//! is the contiguous owned form produced by frame conversion and template
//! loading.

use crate::util::{GrabError, GrabResult};

#[cfg(feature = "image-io")]
pub mod io;

/// Pixel-channel mode shared by frames and templates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ChannelMode {
    /// Single 8-bit luminance channel.
    #[default]
    Grayscale,
    /// Three 8-bit channels in capture component order.
    Color,
}

impl ChannelMode {
    /// Number of interleaved channels per pixel.
    pub fn channels(self) -> usize {
        match self {
            ChannelMode::Grayscale => 1,
            ChannelMode::Color => 3,
        }
    }
}

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous single-channel view.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> GrabResult<Self> {
        Self::new(data, width, height, 1, width)
    }

    /// Creates a view with explicit channel count and stride.
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        channels: usize,
        stride: usize,
    ) -> GrabResult<Self> {
        let needed = required_len(width, height, channels, stride)?;
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
            channels,
            stride,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns row `y` as `width * channels` interleaved elements.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width * self.channels)?;
        self.data.get(start..end)
    }

    /// Returns the channels of the pixel at `(x, y)` if it is within bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&'a [T]> {
        if x >= self.width {
            return None;
        }
        let row = self.row(y)?;
        let start = x * self.channels;
        row.get(start..start + self.channels)
    }
}

fn required_len(width: usize, height: usize, channels: usize, stride: usize) -> GrabResult<usize> {
    if width == 0 || height == 0 || channels == 0 {
        return Err(GrabError::InvalidDimensions { width, height });
    }
    let row_len = width
        .checked_mul(channels)
        .ok_or(GrabError::InvalidDimensions { width, height })?;
    if stride < row_len {
        return Err(GrabError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(row_len))
        .ok_or(GrabError::InvalidDimensions { width, height })
}

/// Owned contiguous 8-bit image in a fixed channel mode.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    mode: ChannelMode,
}

impl OwnedImage {
    /// Wraps a contiguous buffer of exactly `width * height * channels` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize, mode: ChannelMode) -> GrabResult<Self> {
        let needed = contiguous_len(width, height, mode)?;
        if data.len() < needed {
            return Err(GrabError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(GrabError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
            mode,
        })
    }

    /// Allocates a zero-filled image.
    pub fn zeros(width: usize, height: usize, mode: ChannelMode) -> GrabResult<Self> {
        let needed = contiguous_len(width, height, mode)?;
        Ok(Self {
            data: vec![0; needed],
            width,
            height,
            mode,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        let channels = self.mode.channels();
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            channels,
            stride: self.width * channels,
        }
    }

    /// Resizes in place, keeping the allocation when the size is unchanged.
    pub(crate) fn reshape(&mut self, width: usize, height: usize, mode: ChannelMode) -> GrabResult<()> {
        if self.width == width && self.height == height && self.mode == mode {
            return Ok(());
        }
        let needed = contiguous_len(width, height, mode)?;
        self.data.resize(needed, 0);
        self.width = width;
        self.height = height;
        self.mode = mode;
        Ok(())
    }
}

fn contiguous_len(width: usize, height: usize, mode: ChannelMode) -> GrabResult<usize> {
    if width == 0 || height == 0 {
        return Err(GrabError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(mode.channels()))
        .ok_or(GrabError::InvalidDimensions { width, height })
}
