//! Conversion of captured frames into canonical images.
//!
//! Grayscale uses the unweighted truncating mean `(c0 + c1 + c2) / 3`, not a
//! perceptual luminance weighting. The default hit threshold is calibrated
//! against this formula.

use crate::capture::{unpack, FrameView};
use crate::image::{ChannelMode, OwnedImage};
use crate::trace::trace_span;
use crate::util::GrabResult;

/// Converts packed frames into `OwnedImage`s of one channel mode.
#[derive(Copy, Clone, Debug)]
pub struct FrameConverter {
    mode: ChannelMode,
}

impl FrameConverter {
    pub fn new(mode: ChannelMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    /// Converts into a freshly allocated image.
    pub fn convert(&self, frame: FrameView<'_>) -> GrabResult<OwnedImage> {
        let mut out = OwnedImage::zeros(frame.width(), frame.height(), self.mode)?;
        self.convert_into(frame, &mut out)?;
        Ok(out)
    }

    /// Converts into `out`, reusing its buffer when the size already matches.
    pub fn convert_into(&self, frame: FrameView<'_>, out: &mut OwnedImage) -> GrabResult<()> {
        let _span = trace_span!("convert", width = frame.width(), height = frame.height()).entered();

        let width = frame.width();
        out.reshape(width, frame.height(), self.mode)?;
        let layout = frame.layout();
        let bpp = layout.bytes_per_pixel;
        let channels = self.mode.channels();
        let dst_stride = width * channels;
        let dst = out.data_mut();

        for (y, dst_row) in dst.chunks_exact_mut(dst_stride).enumerate() {
            let Some(src_row) = frame.row_bytes(y) else {
                break;
            };
            for (src_px, dst_px) in src_row
                .chunks_exact(bpp)
                .zip(dst_row.chunks_exact_mut(channels))
            {
                let pixel = unpack(src_px, layout.byte_order);
                let c0 = pixel & 0xff;
                let c1 = (pixel >> 8) & 0xff;
                let c2 = (pixel >> 16) & 0xff;
                match self.mode {
                    ChannelMode::Grayscale => dst_px[0] = ((c0 + c1 + c2) / 3) as u8,
                    ChannelMode::Color => {
                        dst_px[0] = c0 as u8;
                        dst_px[1] = c1 as u8;
                        dst_px[2] = c2 as u8;
                    }
                }
            }
        }
        Ok(())
    }
}
