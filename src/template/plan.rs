//! Template plan precomputation for normalized squared difference.

use crate::image::ImageView;
use crate::util::{GrabError, GrabResult};

/// Precomputed template energy and row-major samples.
///
/// Energies are kept as exact integers so identical windows always produce
/// bit-identical errors.
#[derive(Clone, Debug)]
pub struct SqdiffPlan {
    width: usize,
    height: usize,
    channels: usize,
    sum_sq: u64,
    samples: Vec<u8>,
}

impl SqdiffPlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> GrabResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let channels = tpl.channels();
        let count = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(GrabError::InvalidDimensions { width, height })?;

        let mut samples = Vec::with_capacity(count);
        let mut sum_sq = 0u64;
        for y in 0..height {
            let row = tpl.row(y).ok_or(GrabError::BufferTooSmall {
                needed: (y + 1) * tpl.stride(),
                got: tpl.as_slice().len(),
            })?;
            for &value in row {
                let v = value as u64;
                sum_sq += v * v;
            }
            samples.extend_from_slice(row);
        }

        Ok(Self {
            width,
            height,
            channels,
            sum_sq,
            samples,
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

    /// Sum of squared template samples over all channels.
    pub fn sum_sq(&self) -> u64 {
        self.sum_sq
    }

    /// Template samples, `width * channels` per row.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}
